#![allow(unsafe_code)]
//! Internal FFI utilities: RAII handle wrapper, callback contexts, error and
//! C string conversion.

use std::ffi::{CStr, CString, c_void};
use std::ptr::{self, NonNull};

use crate::error::{Error, Result};

/// RAII wrapper for an opaque libmdb object. Calls `destroy` on drop.
pub(crate) struct OwnedHandle<T> {
    ptr: NonNull<T>,
    destroy: unsafe extern "C" fn(*mut *mut T),
}

unsafe impl<T> Send for OwnedHandle<T> {}
unsafe impl<T> Sync for OwnedHandle<T> {}

impl<T> OwnedHandle<T> {
    /// Wrap a raw pointer. Returns [`Error::NullPointer`] if null.
    pub(crate) fn new(ptr: *mut T, destroy: unsafe extern "C" fn(*mut *mut T)) -> Result<Self> {
        NonNull::new(ptr)
            .map(|ptr| Self { ptr, destroy })
            .ok_or(Error::NullPointer)
    }

    /// Pointer for FFI calls. libmdb takes its handles mutably.
    #[inline]
    pub(crate) const fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T> Drop for OwnedHandle<T> {
    fn drop(&mut self) {
        let mut raw = self.ptr.as_ptr();
        unsafe { (self.destroy)(&raw mut raw) };
    }
}

impl<T> std::fmt::Debug for OwnedHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("ptr", &self.ptr)
            .finish()
    }
}

/// A callback moved to the heap so its address can travel as `user_data`.
///
/// The value is freed on drop; owners must destroy every library object that
/// may still call back before dropping the context.
pub(crate) struct CallbackContext<T> {
    ptr: NonNull<T>,
}

unsafe impl<T: Send + Sync> Send for CallbackContext<T> {}
unsafe impl<T: Send + Sync> Sync for CallbackContext<T> {}

impl<T> CallbackContext<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            ptr: NonNull::from(Box::leak(Box::new(value))),
        }
    }

    /// The `user_data` pointer to hand to libmdb.
    pub(crate) const fn user_data(&self) -> *mut c_void {
        self.ptr.as_ptr().cast()
    }
}

impl<T> Drop for CallbackContext<T> {
    fn drop(&mut self) {
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

/// Copy a library error without taking ownership of it.
pub(crate) unsafe fn borrow_error(err: *const mdb_sys::mdb_error_t) -> Error {
    let (code, message) = unsafe {
        let code = (*err).code;
        let message = if (*err).message.is_null() {
            String::from("unknown libmdb error")
        } else {
            CStr::from_ptr((*err).message)
                .to_string_lossy()
                .into_owned()
        };
        (code, message)
    };
    Error::Mdb { code, message }
}

/// Convert an out-parameter error and destroy it.
pub(crate) unsafe fn take_error(mut err: *mut mdb_sys::mdb_error_t) -> Error {
    let converted = unsafe { borrow_error(err) };
    unsafe { mdb_sys::mdb_error_destroy(&raw mut err) };
    converted
}

/// Outcome of a `*_create` call: the object, or the error it reported.
pub(crate) unsafe fn created<T>(
    ptr: *mut T,
    err: *mut mdb_sys::mdb_error_t,
    destroy: unsafe extern "C" fn(*mut *mut T),
) -> Result<OwnedHandle<T>> {
    if err.is_null() {
        return OwnedHandle::new(ptr, destroy);
    }
    if !ptr.is_null() {
        let mut raw = ptr;
        unsafe { destroy(&raw mut raw) };
    }
    Err(unsafe { take_error(err) })
}

/// Convert `&str` to `CString` for FFI.
pub(crate) fn to_c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InvalidArgument("string contains NUL".into()))
}

/// A fresh null out-parameter for libmdb error reporting.
pub(crate) const fn no_error() -> *mut mdb_sys::mdb_error_t {
    ptr::null_mut()
}
