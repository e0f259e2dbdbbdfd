//! Value marshaling between host and native representations
//!
//! Encoding turns a host [`Value`] into the bit pattern one native
//! argument slot expects; decoding is the inverse for returns and
//! out-parameters. All scalar conversions are width-preserving. Memory
//! the native side hands back is never freed here; it surfaces as a
//! [`NativeHandle`] the caller releases.

use core::ffi::c_void;
use core::ptr;
use std::ffi::CStr;
use std::os::raw::c_char;

use super::handle::NativeHandle;
use super::types::{CStrOwnership, ParamKind, Value};

/// Marshaling failures, rejected before any native memory is touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// Host array length differs from the declared length
    LengthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
    /// Null passed for a kind that does not tolerate it
    NullNotAllowed { index: usize },
}

impl core::fmt::Display for MarshalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LengthMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "argument {index}: expected {expected} elements, got {actual}"
            ),
            Self::NullNotAllowed { index } => {
                write!(f, "argument {index}: null is not accepted for this kind")
            }
        }
    }
}

impl std::error::Error for MarshalError {}

/// Encoded native representation of one argument slot
#[derive(Debug, Clone, Copy)]
pub enum NativeArg {
    I32(i32),
    U64(u64),
    F32(f32),
    F64(f64),
    USize(usize),
    Ptr(*mut c_void),
}

/// Bridge-owned backing storage that must outlive the native call
#[derive(Debug)]
pub enum Scratch {
    CStr(Vec<u8>),
    I32Buf(Vec<i32>),
    U64Buf(Vec<u64>),
    F32Buf(Vec<f32>),
    F64Buf(Vec<f64>),
}

impl Scratch {
    /// Base address of the backing buffer; derived mutably because
    /// out-array buffers are written through it by the callee
    pub fn base_ptr(&mut self) -> *mut c_void {
        match self {
            Self::CStr(b) => b.as_mut_ptr() as *mut c_void,
            Self::I32Buf(b) => b.as_mut_ptr() as *mut c_void,
            Self::U64Buf(b) => b.as_mut_ptr() as *mut c_void,
            Self::F32Buf(b) => b.as_mut_ptr() as *mut c_void,
            Self::F64Buf(b) => b.as_mut_ptr() as *mut c_void,
        }
    }
}

/// Copy host string bytes into a NUL-terminated buffer.
///
/// Bytes after an embedded NUL are dropped silently, matching native
/// string semantics; the truncation is observable and tested, not an
/// error.
pub fn nul_terminated(bytes: &[u8]) -> Vec<u8> {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(bytes.len());
    let mut buf = Vec::with_capacity(end + 1);
    buf.extend_from_slice(&bytes[..end]);
    buf.push(0);
    buf
}

/// Encode one input argument.
///
/// Returns the native representation plus any bridge-owned storage that
/// must stay alive across the call. Out-parameter kinds and callbacks are
/// the invoker's business and never reach this function.
pub fn encode(
    index: usize,
    kind: &ParamKind,
    value: &Value,
) -> Result<(NativeArg, Option<Scratch>), MarshalError> {
    if value.is_null() && !kind.tolerates_null() {
        return Err(MarshalError::NullNotAllowed { index });
    }

    match (kind, value) {
        (ParamKind::I32, Value::I32(v)) => Ok((NativeArg::I32(*v), None)),
        (ParamKind::U64, Value::U64(v)) => Ok((NativeArg::U64(*v), None)),
        (ParamKind::F32, Value::F32(v)) => Ok((NativeArg::F32(*v), None)),
        (ParamKind::F64, Value::F64(v)) => Ok((NativeArg::F64(*v), None)),
        (ParamKind::USize, Value::USize(v)) => Ok((NativeArg::USize(*v), None)),

        (ParamKind::Ptr, Value::Ptr(addr)) => Ok((NativeArg::Ptr(*addr as *mut c_void), None)),
        (ParamKind::Ptr, Value::Null) => Ok((NativeArg::Ptr(ptr::null_mut()), None)),

        (ParamKind::CStr(_), Value::Null) => Ok((NativeArg::Ptr(ptr::null_mut()), None)),
        (ParamKind::CStr(CStrOwnership::Borrowed), Value::Str(s)) => {
            let mut keep = Scratch::CStr(nul_terminated(s.as_bytes()));
            let p = keep.base_ptr();
            Ok((NativeArg::Ptr(p), Some(keep)))
        }
        (ParamKind::CStr(CStrOwnership::Borrowed), Value::Bytes(b)) => {
            let mut keep = Scratch::CStr(nul_terminated(b));
            let p = keep.base_ptr();
            Ok((NativeArg::Ptr(p), Some(keep)))
        }
        (ParamKind::CStr(CStrOwnership::Transferred), Value::Str(s)) => {
            transfer_cstr(s.as_bytes())
        }
        (ParamKind::CStr(CStrOwnership::Transferred), Value::Bytes(b)) => transfer_cstr(b),

        (ParamKind::Array(_, _), Value::Null) => Ok((NativeArg::Ptr(ptr::null_mut()), None)),
        (ParamKind::Array(elem, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(MarshalError::LengthMismatch {
                    index,
                    expected: *len,
                    actual: items.len(),
                });
            }
            let mut scratch = fill_buffer(index, elem, items);
            let p = scratch.base_ptr();
            Ok((NativeArg::Ptr(p), Some(scratch)))
        }

        (kind, value) => panic!(
            "argument {index}: host value {value:?} does not match declared kind {kind:?}"
        ),
    }
}

/// Copy string bytes into a native allocation the callee will own
fn transfer_cstr(bytes: &[u8]) -> Result<(NativeArg, Option<Scratch>), MarshalError> {
    let buf = nul_terminated(bytes);
    let p = unsafe { libc::malloc(buf.len()) };
    assert!(!p.is_null(), "native allocator exhausted");
    unsafe {
        ptr::copy_nonoverlapping(buf.as_ptr(), p as *mut u8, buf.len());
    }
    Ok((NativeArg::Ptr(p), None))
}

/// Copy host array elements into a typed native buffer
fn fill_buffer(index: usize, elem: &ParamKind, items: &[Value]) -> Scratch {
    match elem {
        ParamKind::I32 => Scratch::I32Buf(items.iter().map(|v| expect_i32(index, v)).collect()),
        ParamKind::U64 => Scratch::U64Buf(items.iter().map(|v| expect_u64(index, v)).collect()),
        ParamKind::F32 => Scratch::F32Buf(items.iter().map(|v| expect_f32(index, v)).collect()),
        ParamKind::F64 => Scratch::F64Buf(items.iter().map(|v| expect_f64(index, v)).collect()),
        other => panic!("argument {index}: unsupported array element kind {other:?}"),
    }
}

fn expect_i32(index: usize, v: &Value) -> i32 {
    match v {
        Value::I32(x) => *x,
        other => panic!("argument {index}: array element {other:?} is not i32"),
    }
}

fn expect_u64(index: usize, v: &Value) -> u64 {
    match v {
        Value::U64(x) => *x,
        other => panic!("argument {index}: array element {other:?} is not u64"),
    }
}

fn expect_f32(index: usize, v: &Value) -> f32 {
    match v {
        Value::F32(x) => *x,
        other => panic!("argument {index}: array element {other:?} is not f32"),
    }
}

fn expect_f64(index: usize, v: &Value) -> f64 {
    match v {
        Value::F64(x) => *x,
        other => panic!("argument {index}: array element {other:?} is not f64"),
    }
}

/// Zeroed callee-fill buffer for an out-array of `len` elements
pub fn alloc_out_buffer(elem: &ParamKind, len: usize) -> Scratch {
    match elem {
        ParamKind::I32 => Scratch::I32Buf(vec![0; len]),
        ParamKind::U64 => Scratch::U64Buf(vec![0; len]),
        ParamKind::F32 => Scratch::F32Buf(vec![0.0; len]),
        ParamKind::F64 => Scratch::F64Buf(vec![0.0; len]),
        other => panic!("unsupported out-array element kind {other:?}"),
    }
}

/// Read an out-array buffer back into host values, element by element.
///
/// Always copies; never assumes the native side aliased the buffer with
/// some other argument.
pub fn decode_out_buffer(scratch: &Scratch) -> Value {
    match scratch {
        Scratch::I32Buf(b) => Value::Array(b.iter().map(|&v| Value::I32(v)).collect()),
        Scratch::U64Buf(b) => Value::Array(b.iter().map(|&v| Value::U64(v)).collect()),
        Scratch::F32Buf(b) => Value::Array(b.iter().map(|&v| Value::F32(v)).collect()),
        Scratch::F64Buf(b) => Value::Array(b.iter().map(|&v| Value::F64(v)).collect()),
        Scratch::CStr(_) => unreachable!("string scratch is never an out-array"),
    }
}

/// Writable scalar location for one out-parameter
#[derive(Debug)]
pub enum OutSlot {
    I32(Box<i32>),
    U64(Box<u64>),
    F32(Box<f32>),
    F64(Box<f64>),
    USize(Box<usize>),
    Ptr(Box<*mut c_void>),
    CStrPtr(Box<*mut c_char>),
}

impl OutSlot {
    /// Allocate a zeroed slot for the inner kind of an out-parameter
    pub fn for_kind(inner: &ParamKind) -> Self {
        match inner {
            ParamKind::I32 => Self::I32(Box::new(0)),
            ParamKind::U64 => Self::U64(Box::new(0)),
            ParamKind::F32 => Self::F32(Box::new(0.0)),
            ParamKind::F64 => Self::F64(Box::new(0.0)),
            ParamKind::USize => Self::USize(Box::new(0)),
            ParamKind::Ptr => Self::Ptr(Box::new(ptr::null_mut())),
            other => panic!("unsupported out-parameter inner kind {other:?}"),
        }
    }

    /// Slot for a `char **` out-parameter
    pub fn for_cstr() -> Self {
        Self::CStrPtr(Box::new(ptr::null_mut()))
    }

    /// Address the native side writes through
    pub fn as_ptr(&mut self) -> *mut c_void {
        match self {
            Self::I32(b) => &mut **b as *mut i32 as *mut c_void,
            Self::U64(b) => &mut **b as *mut u64 as *mut c_void,
            Self::F32(b) => &mut **b as *mut f32 as *mut c_void,
            Self::F64(b) => &mut **b as *mut f64 as *mut c_void,
            Self::USize(b) => &mut **b as *mut usize as *mut c_void,
            Self::Ptr(b) => &mut **b as *mut *mut c_void as *mut c_void,
            Self::CStrPtr(b) => &mut **b as *mut *mut c_char as *mut c_void,
        }
    }

    /// Read the slot after the call.
    ///
    /// A filled `char **` slot yields the copied string plus the release
    /// obligation; a NULL one decodes to the absent value with no handle.
    pub fn decode(self) -> (Value, Option<NativeHandle>) {
        match self {
            Self::I32(b) => (Value::I32(*b), None),
            Self::U64(b) => (Value::U64(*b), None),
            Self::F32(b) => (Value::F32(*b), None),
            Self::F64(b) => (Value::F64(*b), None),
            Self::USize(b) => (Value::USize(*b), None),
            Self::Ptr(b) => {
                let p = *b;
                if p.is_null() {
                    (Value::Null, None)
                } else {
                    (Value::Ptr(p as usize), None)
                }
            }
            Self::CStrPtr(b) => decode_owned_cstr(*b),
        }
    }
}

/// Decode a native-owned, NUL-terminated string.
///
/// Copies the bytes into the host value and hands back the release
/// obligation for the native allocation. Valid UTF-8 decodes to `Str`;
/// anything else is preserved verbatim as `Bytes`, never substituted or
/// dropped. NULL decodes to the absent value and carries no obligation.
pub fn decode_owned_cstr(p: *mut c_char) -> (Value, Option<NativeHandle>) {
    if p.is_null() {
        return (Value::Null, None);
    }
    let bytes = unsafe { CStr::from_ptr(p) }.to_bytes();
    let value = match core::str::from_utf8(bytes) {
        Ok(text) => Value::Str(text.to_string()),
        Err(_) => Value::Bytes(bytes.to_vec()),
    };
    let handle = NativeHandle::new(p as *mut c_void);
    (value, handle)
}
