//! Type definitions for the native call boundary
//!
//! Parameter kinds describe the native ABI shape of each argument slot;
//! host values are the safe-Rust side of the same slots.

use super::callback::HostCallback;
use super::signature::SignatureDescriptor;

/// Ownership of a C string passed into native code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CStrOwnership {
    /// Bridge-owned copy, released after the call returns
    Borrowed,
    /// Allocated with the native allocator; the callee takes ownership
    Transferred,
}

/// Native ABI kind of a single parameter or return slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// 32-bit signed integer
    I32,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
    /// Pointer-sized unsigned integer (C `size_t`)
    USize,
    /// Opaque pointer, passed through without interpretation
    Ptr,
    /// No value; return slots only
    Void,
    /// NUL-terminated string
    CStr(CStrOwnership),
    /// `char **` out-parameter; the callee stores a native-owned string
    OutCStr,
    /// Contiguous input buffer of exactly `len` elements
    Array(Box<ParamKind>, usize),
    /// Callee-filled buffer of exactly `len` elements
    OutArray(Box<ParamKind>, usize),
    /// Writable scalar location the callee fills in
    OutParam(Box<ParamKind>),
    /// Native function pointer calling back into host logic
    Callback(Box<SignatureDescriptor>),
}

impl ParamKind {
    /// Check if the kind is a direct scalar (no indirection)
    #[inline]
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::I32 | Self::U64 | Self::F32 | Self::F64 | Self::USize
        )
    }

    /// Check if a native NULL is a legal value for this kind
    ///
    /// Strings, arrays, callbacks and out-locations all tolerate null;
    /// scalar slots never do.
    #[inline]
    pub const fn tolerates_null(&self) -> bool {
        matches!(
            self,
            Self::Ptr
                | Self::CStr(_)
                | Self::OutCStr
                | Self::Array(_, _)
                | Self::OutArray(_, _)
                | Self::OutParam(_)
                | Self::Callback(_)
        )
    }

    /// Check if the callee writes through this slot
    #[inline]
    pub const fn is_out(&self) -> bool {
        matches!(self, Self::OutCStr | Self::OutArray(_, _) | Self::OutParam(_))
    }

    /// Check if the kind may appear in a parameter list
    #[inline]
    pub const fn valid_param(&self) -> bool {
        !matches!(self, Self::Void)
    }

    /// Check if the kind may appear as a return slot
    #[inline]
    pub const fn valid_return(&self) -> bool {
        matches!(
            self,
            Self::Void
                | Self::I32
                | Self::U64
                | Self::F32
                | Self::F64
                | Self::USize
                | Self::Ptr
                | Self::CStr(_)
        )
    }
}

/// Host-side value for one native slot
///
/// `Null` is the single absent value: it is accepted for every
/// null-tolerant parameter kind and produced when decoding a native NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I32(i32),
    U64(u64),
    F32(f32),
    F64(f64),
    USize(usize),
    /// Raw address, carried without interpretation
    Ptr(usize),
    Str(String),
    /// String bytes that are not valid UTF-8, preserved exactly as the
    /// native side produced (or the host supplied) them
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// Void return
    Unit,
    /// Native NULL in either direction
    Null,
}

impl Value {
    /// Check if the value is the absent marker
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One positional argument to [`invoke`](super::invoke::invoke)
///
/// Out-parameter slots take `Out` to request scratch allocation, or
/// `Value(Value::Null)` to pass native NULL and skip the write-back.
/// Callback slots carry a borrowed host closure; `Value::Null` there
/// passes a native null function pointer and the callee's default
/// behavior applies.
#[derive(Clone)]
pub enum CallArg<'a> {
    Value(Value),
    /// Invoker-allocated out-parameter or out-array slot
    Out,
    Callback(HostCallback<'a>),
}
