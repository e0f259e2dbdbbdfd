//! Ownership tokens for native-allocated memory
//!
//! Memory the native side hands across the boundary (duplicated strings,
//! `char **` out-parameters) is allocated by native code and must be given
//! back to the native allocator. Decoding never frees it; the caller holds
//! a `NativeHandle` per allocation and releases it exactly once.

use core::ffi::c_void;
use core::ptr::NonNull;

use crate::logging;

/// Single-owner token over one native allocation
///
/// Releasing consumes the handle, so a double release is unrepresentable.
/// There is intentionally no `Drop` impl: a forgotten handle leaks, it is
/// never freed behind the caller's back.
#[derive(Debug)]
pub struct NativeHandle {
    ptr: NonNull<c_void>,
}

impl NativeHandle {
    /// Wrap a non-null native allocation. Returns `None` for NULL.
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Address of the native allocation
    #[inline]
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Give the allocation back to the native allocator.
    ///
    /// The memory must not be read again afterwards; the handle is gone
    /// and the type system enforces no second release.
    pub fn release(self) {
        logging::log_native_release(self.ptr.as_ptr() as *const u8);
        unsafe {
            libc::free(self.ptr.as_ptr());
        }
    }
}

// The pointee is owned exclusively by this handle.
unsafe impl Send for NativeHandle {}
