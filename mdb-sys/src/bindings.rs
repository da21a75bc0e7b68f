// Bindings for libmdb, matching the output of bindgen over the mdb headers.

pub type __time_t = ::core::ffi::c_long;
pub type __syscall_slong_t = ::core::ffi::c_long;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct timespec {
    pub tv_sec: __time_t,
    pub tv_nsec: __syscall_slong_t,
}
#[allow(clippy::unnecessary_operation, clippy::identity_op)]
const _: () = {
    ["Size of timespec"][::core::mem::size_of::<timespec>() - 2 * ::core::mem::size_of::<__time_t>()];
    ["Offset of field: timespec::tv_nsec"]
        [::core::mem::offset_of!(timespec, tv_nsec) - ::core::mem::size_of::<__time_t>()];
};

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct mdb_error {
    pub code: ::core::ffi::c_int,
    pub message: *mut ::core::ffi::c_char,
}
#[allow(clippy::unnecessary_operation, clippy::identity_op)]
const _: () = {
    ["Size of mdb_error"]
        [::core::mem::size_of::<mdb_error>() - 2 * ::core::mem::size_of::<*mut ::core::ffi::c_char>()];
    ["Offset of field: mdb_error::code"][::core::mem::offset_of!(mdb_error, code) - 0usize];
    ["Offset of field: mdb_error::message"]
        [::core::mem::offset_of!(mdb_error, message) - ::core::mem::size_of::<*mut ::core::ffi::c_char>()];
};
pub type mdb_error_t = mdb_error;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct mdb_message_payload {
    pub data: *const u8,
    pub size: usize,
}
#[allow(clippy::unnecessary_operation, clippy::identity_op)]
const _: () = {
    ["Size of mdb_message_payload"]
        [::core::mem::size_of::<mdb_message_payload>() - 2 * ::core::mem::size_of::<usize>()];
    ["Offset of field: mdb_message_payload::size"]
        [::core::mem::offset_of!(mdb_message_payload, size) - ::core::mem::size_of::<usize>()];
};
pub type mdb_message_payload_t = mdb_message_payload;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct mdb_connection {
    _unused: [u8; 0],
}
pub type mdb_connection_t = mdb_connection;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct mdb_subscriber_config {
    _unused: [u8; 0],
}
pub type mdb_subscriber_config_t = mdb_subscriber_config;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct mdb_subscriber {
    _unused: [u8; 0],
}
pub type mdb_subscriber_t = mdb_subscriber;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct mdb_message {
    _unused: [u8; 0],
}
pub type mdb_message_t = mdb_message;

pub type mdb_on_error_t = ::core::option::Option<
    unsafe extern "C" fn(error: *const mdb_error_t, user_data: *mut ::core::ffi::c_void),
>;

pub type mdb_subscriber_on_message_t = ::core::option::Option<
    unsafe extern "C" fn(message: *const mdb_message_t, user_data: *mut ::core::ffi::c_void),
>;

pub type mdb_on_done_t = ::core::option::Option<
    unsafe extern "C" fn(error: *const mdb_error_t, user_data: *mut ::core::ffi::c_void),
>;

unsafe extern "C" {
    pub fn mdb_error_destroy(self_: *mut *mut mdb_error_t);

    pub fn mdb_connection_create(
        on_error: mdb_on_error_t,
        user_data: *mut ::core::ffi::c_void,
        error: *mut *mut mdb_error_t,
    ) -> *mut mdb_connection_t;

    pub fn mdb_connection_destroy(self_: *mut *mut mdb_connection_t);

    pub fn mdb_subscriber_config_create(
        topic: *const ::core::ffi::c_char,
        source: *const ::core::ffi::c_char,
        on_message: mdb_subscriber_on_message_t,
        user_data: *mut ::core::ffi::c_void,
        error: *mut *mut mdb_error_t,
    ) -> *mut mdb_subscriber_config_t;

    pub fn mdb_subscriber_config_destroy(self_: *mut *mut mdb_subscriber_config_t);

    pub fn mdb_subscriber_create_async(
        connection: *mut mdb_connection_t,
        config: *mut mdb_subscriber_config_t,
        on_done: mdb_on_done_t,
        user_data: *mut ::core::ffi::c_void,
        error: *mut *mut mdb_error_t,
    ) -> *mut mdb_subscriber_t;

    pub fn mdb_subscriber_destroy(self_: *mut *mut mdb_subscriber_t);

    pub fn mdb_message_get_payload(self_: *const mdb_message_t) -> *const mdb_message_payload_t;

    pub fn mdb_message_get_timestamp(self_: *const mdb_message_t) -> *const timespec;
}
