//! Provider behaviour end to end through the in-process broker.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axmdb::{
    ConsolidatedTrack, Error, LocalBroker, Message, MessageType, Provider, ProviderConfig,
    ProviderError, ProviderErrorKind, SceneDescription,
};

const WAIT: Duration = Duration::from_secs(5);

const SCENE: &str = r#"{"frame":{"timestamp":"2024-05-02T10:15:30Z","observations":[{"bounding_box":{"bottom":1,"left":0,"right":1,"top":0},"track_id":"1"}],"operations":[]}}"#;

fn connected<T: MessageType>(broker: &LocalBroker, source: &str) -> Provider<T> {
    connected_with(broker, source, ProviderConfig::default())
}

fn connected_with<T: MessageType>(
    broker: &LocalBroker,
    source: &str,
    config: ProviderConfig,
) -> Provider<T> {
    let provider = Provider::<T>::with_config(Arc::new(broker.clone()), source, config);
    provider.connect().expect("connect");
    assert!(broker.wait_for_subscribers(1, WAIT), "subscriber never became ready");
    provider
}

#[test]
fn decodes_published_scene_descriptions() {
    let broker = LocalBroker::new();
    let provider = connected::<SceneDescription>(&broker, "1");
    assert!(provider.is_connected());
    assert!(provider.is_subscribed());
    assert_eq!(provider.topic(), SceneDescription::TOPIC);

    assert_eq!(broker.publish(SceneDescription::TOPIC, "1", SCENE), 1);

    let scene = provider.recv_timeout(WAIT).expect("scene");
    assert_eq!(scene.frame.observations.len(), 1);
    assert!(provider.try_recv_error().is_none());
}

#[test]
fn other_sources_and_topics_are_not_delivered() {
    let broker = LocalBroker::new();
    let provider = connected::<SceneDescription>(&broker, "1");

    assert_eq!(broker.publish(SceneDescription::TOPIC, "2", SCENE), 0);
    assert_eq!(broker.publish(ConsolidatedTrack::TOPIC, "1", SCENE), 0);
    assert!(provider.try_recv().is_none());
}

#[test]
fn bad_payloads_are_reported_by_kind() {
    let broker = LocalBroker::new();
    let provider = connected::<SceneDescription>(&broker, "1");
    let topic = SceneDescription::TOPIC;

    broker.publish(topic, "1", Vec::<u8>::new());
    broker.publish_message(topic, "1", &Message::new(SystemTime::now(), vec![0xc3, 0x28]));
    broker.publish(topic, "1", "{\"frame\": 3}");

    let errors: Vec<ProviderError> = (0..3)
        .map(|_| provider.recv_error_timeout(WAIT).expect("error"))
        .collect();
    let kinds: Vec<ProviderErrorKind> = errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            ProviderErrorKind::EmptyPayload,
            ProviderErrorKind::ParseMessage,
            ProviderErrorKind::InvalidMessage,
        ]
    );
    assert_eq!(errors[0].error, Error::EmptyPayload);
    assert_eq!(errors[1].error, Error::InvalidUtf8);
    assert!(provider.try_recv().is_none());
}

#[test]
fn rejected_subscription_arrives_as_subscribe_done() {
    let broker = LocalBroker::new();
    broker.reject_topic(ConsolidatedTrack::TOPIC, "analytics disabled");
    let provider = Provider::<ConsolidatedTrack>::new(Arc::new(broker.clone()), "1");
    provider.connect().expect("request accepted");

    let err = provider.recv_error_timeout(WAIT).expect("done error");
    assert_eq!(err.kind, ProviderErrorKind::SubscribeDone);
    assert_eq!(err.error, Error::Rejected("analytics disabled".into()));
    assert!(!provider.is_subscribed());
}

#[test]
fn refused_connection_closes_provider() {
    let broker = LocalBroker::new();
    broker.refuse_connections("broker not running");
    let provider = Provider::<SceneDescription>::new(Arc::new(broker.clone()), "1");

    let err = provider.connect().unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Connection);
    assert!(!provider.is_connected());
    assert!(provider.recv().is_none(), "channels end after failed setup");
    assert!(provider.recv_error().is_none());

    let again = provider.connect().unwrap_err();
    assert_eq!(again.error, Error::Closed);
}

#[test]
fn connection_failures_reach_error_channel() {
    let broker = LocalBroker::new();
    let provider = connected::<SceneDescription>(&broker, "1");

    assert_eq!(broker.fail_connections(5, "connection reset"), 1);

    let err = provider.recv_error_timeout(WAIT).expect("connection error");
    assert_eq!(err.kind, ProviderErrorKind::Connection);
    assert_eq!(
        err.error,
        Error::Mdb {
            code: 5,
            message: "connection reset".into()
        }
    );
}

#[test]
fn second_connect_is_rejected() {
    let broker = LocalBroker::new();
    let provider = connected::<SceneDescription>(&broker, "1");
    let err = provider.connect().unwrap_err();
    assert_eq!(err.error, Error::AlreadyConnected);
    assert_eq!(broker.connection_count(), 1);
}

#[test]
fn disconnect_releases_and_drains() {
    let broker = LocalBroker::new();
    let provider = connected::<SceneDescription>(&broker, "1");
    broker.publish(SceneDescription::TOPIC, "1", SCENE);
    broker.publish(SceneDescription::TOPIC, "1", SCENE);

    provider.disconnect();
    provider.disconnect();

    assert_eq!(broker.connection_count(), 0);
    assert_eq!(broker.subscriber_count(), 0);
    assert_eq!(broker.publish(SceneDescription::TOPIC, "1", SCENE), 0);
    assert_eq!(provider.messages().count(), 2);
    assert!(provider.recv().is_none());
    assert!(!provider.is_connected());
}

#[test]
fn full_channel_drops_instead_of_blocking() {
    let broker = LocalBroker::new();
    let provider = connected_with::<SceneDescription>(
        &broker,
        "1",
        ProviderConfig::default().message_capacity(1),
    );

    for _ in 0..3 {
        broker.publish(SceneDescription::TOPIC, "1", SCENE);
    }

    assert!(provider.try_recv().is_some());
    assert!(provider.try_recv().is_none());
}

#[test]
fn dropping_provider_closes_connection() {
    let broker = LocalBroker::new();
    {
        let _provider = connected::<ConsolidatedTrack>(&broker, "1");
        assert_eq!(broker.connection_count(), 1);
    }
    assert_eq!(broker.connection_count(), 0);
}
