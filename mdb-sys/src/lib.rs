//! Raw FFI bindings to `libmdb` — the Axis Message Broker client library.
//!
//! The committed bindings mirror the `mdb/*.h` headers of the ACAP Native SDK.
//! Enable the `regenerate` feature to produce them with
//! [`bindgen`](https://docs.rs/bindgen) from the SDK sysroot instead.
//!
//! # Build
//!
//! The build script (`build.rs`) links `libmdb.so` dynamically. Point
//! `MDB_LIB_DIR` at the directory holding the library, or source the ACAP SDK
//! environment so that `SDKTARGETSYSROOT` is set.
//!
//! # Ownership
//!
//! Every `*_create` function hands out an object owned by the caller, released
//! with the matching `*_destroy` function. Destroy functions take a pointer to
//! the owning pointer and reset it to null. Error objects passed *into*
//! callbacks are owned by the library and must not be destroyed.

// sys crate: unsafe FFI, non-idiomatic generated code
#![allow(
    unsafe_code,
    missing_docs,
    non_camel_case_types,
    non_upper_case_globals,
    non_snake_case,
    clippy::missing_safety_doc,
    clippy::upper_case_acronyms
)]

#[cfg(feature = "regenerate")]
include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
#[cfg(not(feature = "regenerate"))]
include!("bindings.rs");
