//! Typed analytics messages published on the broker.
//!
//! Each type implementing [`MessageType`] names the topic it is published on,
//! so a [`Provider`](crate::Provider) resolves its topic from the type alone.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// A message kind with a fixed topic and a JSON payload.
pub trait MessageType: DeserializeOwned + Send + 'static {
    /// Broker topic carrying this message kind.
    const TOPIC: &'static str;

    /// Short human-readable name.
    const NAME: &'static str;

    /// Decode a payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`](crate::Error::Decode) if the payload is not a
    /// valid document of this kind.
    fn transform(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// `(name, topic)` of every supported message kind.
#[must_use]
pub const fn topics() -> [(&'static str, &'static str); 2] {
    [
        (SceneDescription::NAME, SceneDescription::TOPIC),
        (ConsolidatedTrack::NAME, ConsolidatedTrack::TOPIC),
    ]
}

/// Per-frame scene description from the object analytics engine.
///
/// Missing or `null` fields decode as their defaults; timestamps default to
/// the Unix epoch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    /// The analysed frame.
    #[serde(default, deserialize_with = "null_as_default")]
    pub frame: Frame,
}

impl MessageType for SceneDescription {
    const TOPIC: &'static str = "com.axis.analytics_scene_description.v0.beta";
    const NAME: &'static str = "scene";
}

impl fmt::Display for SceneDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame: {}, Observations: {}, Operations: {}",
            self.frame.timestamp.to_rfc3339(),
            self.frame.observations.len(),
            self.frame.operations.len()
        )
    }
}

/// A finished track: one object followed from appearance to disappearance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsolidatedTrack {
    /// Classifications accumulated over the track.
    #[serde(default)]
    pub classes: Vec<Class>,
    /// Track length in seconds.
    #[serde(default)]
    pub duration: f64,
    /// When the object was last seen.
    #[serde(default)]
    pub end_time: DateTime<Utc>,
    /// Track identifier.
    #[serde(default)]
    pub id: String,
    /// Best snapshot of the object.
    #[serde(default)]
    pub image: Option<Image>,
    /// Sampled observations along the track.
    #[serde(default)]
    pub observations: Vec<Observation>,
    /// When the object was first seen.
    #[serde(default)]
    pub start_time: DateTime<Utc>,
}

impl MessageType for ConsolidatedTrack {
    const TOPIC: &'static str = "com.axis.consolidated_track.v1.beta";
    const NAME: &'static str = "track";
}

impl fmt::Display for ConsolidatedTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Track: {}, Duration: {:.2}s, Observations: {}",
            self.id,
            self.duration,
            self.observations.len()
        )
    }
}

/// One analysed video frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Capture time.
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    /// Objects seen in the frame.
    #[serde(default)]
    pub observations: Vec<Observation>,
    /// Track bookkeeping (create, delete, merge, ...).
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// An object observed in a frame or along a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Location in normalized image coordinates.
    #[serde(default)]
    pub bounding_box: BoundingBox,
    /// Observation time (consolidated tracks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Track the observation belongs to (scene descriptions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    /// Classification, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<Class>,
    /// Cropped image, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
}

/// A track operation in a scene description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation type.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Affected track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Source track of a merge or split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Target track of a merge or split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Object classification with optional color attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    /// Class name, e.g. `Human` or `Car`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub score: f64,
    /// Upper clothing colors (humans).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upper_clothing_colors: Vec<ColorInfo>,
    /// Lower clothing colors (humans).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lower_clothing_colors: Vec<ColorInfo>,
    /// Object colors (vehicles, consolidated tracks).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<ColorInfo>,
}

/// A named color with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorInfo {
    /// Color name.
    #[serde(default)]
    pub name: String,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub score: f64,
}

/// An encoded image crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Crop location in the full frame.
    #[serde(default)]
    pub bounding_box: BoundingBox,
    /// Base64-encoded image data.
    #[serde(default)]
    pub data: String,
    /// Capture time (consolidated tracks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Box edges in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Bottom edge.
    pub bottom: f64,
    /// Left edge.
    pub left: f64,
    /// Right edge.
    pub right: f64,
    /// Top edge.
    pub top: f64,
}

impl BoundingBox {
    /// Width of the box.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Height of the box.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SCENE: &str = r#"{
        "frame": {
            "timestamp": "2024-05-02T10:15:30.250Z",
            "observations": [
                {
                    "bounding_box": {"bottom": 0.8, "left": 0.1, "right": 0.3, "top": 0.2},
                    "track_id": "42",
                    "class": {
                        "type": "Human",
                        "score": 0.93,
                        "upper_clothing_colors": [{"name": "Red", "score": 0.7}]
                    }
                }
            ],
            "operations": [{"type": "DeleteTrack", "id": "17"}]
        }
    }"#;

    const TRACK: &str = r#"{
        "classes": [{"type": "Car", "score": 0.88, "colors": [{"name": "White", "score": 0.6}]}],
        "duration": 4.5,
        "end_time": "2024-05-02T10:15:34.750Z",
        "id": "track-9",
        "image": {
            "bounding_box": {"bottom": 1.0, "left": 0.0, "right": 0.5, "top": 0.5},
            "data": "aGVsbG8=",
            "timestamp": "2024-05-02T10:15:32Z"
        },
        "observations": [
            {
                "bounding_box": {"bottom": 0.9, "left": 0.2, "right": 0.4, "top": 0.6},
                "timestamp": "2024-05-02T10:15:31Z"
            }
        ],
        "start_time": "2024-05-02T10:15:30.250Z"
    }"#;

    #[test]
    fn decodes_scene_description() {
        let scene = SceneDescription::transform(SCENE).unwrap();
        let obs = &scene.frame.observations[0];
        assert_eq!(obs.track_id.as_deref(), Some("42"));
        let class = obs.class.as_ref().unwrap();
        assert_eq!(class.kind, "Human");
        assert_eq!(class.upper_clothing_colors[0].name, "Red");
        assert!(class.lower_clothing_colors.is_empty());
        assert_eq!(scene.frame.operations[0].kind, "DeleteTrack");
        assert_eq!(
            scene.to_string(),
            "Frame: 2024-05-02T10:15:30.250+00:00, Observations: 1, Operations: 1"
        );
    }

    #[test]
    fn decodes_consolidated_track() {
        let track = ConsolidatedTrack::transform(TRACK).unwrap();
        assert_eq!(track.id, "track-9");
        assert_eq!(track.classes[0].colors[0].name, "White");
        assert!((track.duration - 4.5).abs() < f64::EPSILON);
        assert!(track.end_time > track.start_time);
        assert!(track.observations[0].timestamp.is_some());
        assert_eq!(track.image.as_ref().map(|i| i.data.as_str()), Some("aGVsbG8="));
    }

    #[test]
    fn empty_frame_lists_default() {
        let scene =
            SceneDescription::transform(r#"{"frame":{"timestamp":"2024-01-01T00:00:00Z"}}"#)
                .unwrap();
        assert!(scene.frame.observations.is_empty());
        assert!(scene.frame.operations.is_empty());
    }

    #[test]
    fn missing_fields_decode_as_defaults() {
        let scene = SceneDescription::transform(r#"{"frame": null}"#).unwrap();
        assert_eq!(scene, SceneDescription::default());
        assert_eq!(scene.frame.timestamp, DateTime::<Utc>::UNIX_EPOCH);

        let track = ConsolidatedTrack::transform(
            r#"{"observations": [{}], "classes": [{"type": "Bus", "colors": [{"name": "Blue"}]}]}"#,
        )
        .unwrap();
        assert!(track.id.is_empty());
        assert_eq!(track.start_time, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(track.end_time, track.start_time);
        assert_eq!(track.observations[0].bounding_box, BoundingBox::default());
        assert!(track.classes[0].colors[0].score.abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        let err = SceneDescription::transform(r#"{"frame": 3}"#).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn topics_are_distinct() {
        let [(a_name, a_topic), (b_name, b_topic)] = topics();
        assert_ne!(a_name, b_name);
        assert_ne!(a_topic, b_topic);
        assert!(a_topic.starts_with("com.axis."));
    }

    #[test]
    fn bounding_box_extent() {
        let b = BoundingBox {
            bottom: 0.75,
            left: 0.25,
            right: 0.5,
            top: 0.25,
        };
        assert!((b.width() - 0.25).abs() < f64::EPSILON);
        assert!((b.height() - 0.5).abs() < f64::EPSILON);
    }
}
