//! Native fixture functions the bridge is validated against
//!
//! A fixed set of C-ABI exports covering every marshaling shape the
//! bridge supports: scalar widths, strings in both owned-return and
//! out-parameter form, input and output arrays, multi-output parameters,
//! and the two callback shapes. The arithmetic is intentionally trivial;
//! the exports exist so the calling layer has a known contract to hit.
//!
//! Owned returns are allocated with the native allocator (`malloc`), so
//! the caller's release obligation is `free` - which is exactly what
//! [`NativeHandle::release`](crate::bridge::NativeHandle::release) does.
//!
//! The cdylib build of this crate exports all of these symbols, making
//! the crate its own loadable fixture library.

use core::ffi::c_void;
use core::ptr;
use core::slice;
use std::ffi::CStr;
use std::os::raw::c_char;

/// Integer addition, wrapping on overflow
#[no_mangle]
pub extern "C" fn add_i32(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

/// Unsigned integer addition, wrapping on overflow
#[no_mangle]
pub extern "C" fn add_u64(a: u64, b: u64) -> u64 {
    a.wrapping_add(b)
}

/// Float multiplication
#[no_mangle]
pub extern "C" fn mul_f32(a: f32, b: f32) -> f32 {
    a * b
}

/// Double multiplication
#[no_mangle]
pub extern "C" fn mul_f64(a: f64, b: f64) -> f64 {
    a * b
}

/// Byte length of a NUL-terminated string; 0 for NULL
#[no_mangle]
pub unsafe extern "C" fn str_length(s: *const c_char) -> i32 {
    if s.is_null() {
        return 0;
    }
    unsafe { CStr::from_ptr(s) }.to_bytes().len() as i32
}

/// Duplicate a string into a fresh native allocation the caller must free
#[no_mangle]
pub unsafe extern "C" fn echo_string(s: *const c_char) -> *mut c_char {
    if s.is_null() {
        return ptr::null_mut();
    }
    let len = unsafe { CStr::from_ptr(s) }.to_bytes().len();
    let copy = unsafe { libc::malloc(len + 1) } as *mut c_char;
    if copy.is_null() {
        return ptr::null_mut();
    }
    unsafe {
        ptr::copy_nonoverlapping(s, copy, len + 1);
    }
    copy
}

/// Void function, side effect only
#[no_mangle]
pub extern "C" fn print_hello() {
    // no-op for testing
}

/// Write version numbers through out-parameters; either may be NULL
#[no_mangle]
pub unsafe extern "C" fn get_version(major: *mut i32, minor: *mut i32) {
    if !major.is_null() {
        unsafe { *major = 1 };
    }
    if !minor.is_null() {
        unsafe { *minor = 2 };
    }
}

/// Duplicate a string through a `char **` out-parameter
#[no_mangle]
pub unsafe extern "C" fn out_echo_string(s: *const c_char, out: *mut *mut c_char) {
    if out.is_null() {
        return;
    }
    let copy = if s.is_null() {
        ptr::null_mut()
    } else {
        unsafe { echo_string(s) }
    };
    unsafe { *out = copy };
}

/// Sum of an i32 array; 0 for NULL
#[no_mangle]
pub unsafe extern "C" fn sum_i32_array(arr: *const i32, n: usize) -> i32 {
    if arr.is_null() {
        return 0;
    }
    let items = unsafe { slice::from_raw_parts(arr, n) };
    let mut sum: i64 = 0;
    for &v in items {
        sum += v as i64;
    }
    sum as i32
}

/// Fill `out` with the sequence 0..n
#[no_mangle]
pub unsafe extern "C" fn fill_seq_i32(out: *mut i32, n: usize) {
    if out.is_null() {
        return;
    }
    let items = unsafe { slice::from_raw_parts_mut(out, n) };
    for (i, slot) in items.iter_mut().enumerate() {
        *slot = i as i32;
    }
}

/// Apply a binary operator callback; 0 if the operator is NULL
#[no_mangle]
pub unsafe extern "C" fn apply_i32(
    a: i32,
    b: i32,
    op: Option<unsafe extern "C" fn(i32, i32) -> i32>,
) -> i32 {
    match op {
        Some(op) => unsafe { op(a, b) },
        None => 0,
    }
}

/// Default ascending comparator used when `sort_i32_copy` gets NULL
unsafe extern "C" fn cmp_i32_asc(a: *const c_void, b: *const c_void) -> i32 {
    let av = unsafe { *(a as *const i32) };
    let bv = unsafe { *(b as *const i32) };
    if av < bv {
        -1
    } else if av > bv {
        1
    } else {
        0
    }
}

/// Sort a copy of `input` into `out` with the given comparator.
///
/// NULL comparator sorts ascending; no-op when either buffer is NULL or
/// the length is 0.
#[no_mangle]
pub unsafe extern "C" fn sort_i32_copy(
    input: *const i32,
    out: *mut i32,
    n: usize,
    compar: Option<unsafe extern "C" fn(*const c_void, *const c_void) -> i32>,
) {
    if input.is_null() || out.is_null() || n == 0 {
        return;
    }
    unsafe {
        ptr::copy_nonoverlapping(input, out, n);
    }
    let items = unsafe { slice::from_raw_parts_mut(out, n) };
    let cmp = compar.unwrap_or(cmp_i32_asc);
    items.sort_by(|a, b| {
        let r = unsafe { cmp(a as *const i32 as *const c_void, b as *const i32 as *const c_void) };
        r.cmp(&0)
    });
}
