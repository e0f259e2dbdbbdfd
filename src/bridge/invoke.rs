//! Descriptor-driven native call invocation
//!
//! The invoker owns every unsafe step of a call: scratch allocation for
//! out-parameters, argument encoding, exactly one native call through a
//! libffi call interface built from the descriptor, and decoding of the
//! return value and out-parameters afterwards. Argument lists that
//! contradict the descriptor are programmer errors and fail loudly;
//! recoverable conditions surface as [`CallError`].

use core::ffi::c_void;
use core::ptr;
use std::os::raw::c_char;

use libffi::middle::{Arg, Cif, CodePtr, Closure, Type};

use super::callback::{CallbackBinding, HostCallback};
use super::handle::NativeHandle;
use super::library::EntryPoint;
use super::marshal::{self, MarshalError, NativeArg, OutSlot, Scratch};
use super::signature::SignatureDescriptor;
use super::types::{CallArg, ParamKind, Value};
use crate::logging;

/// Decoded out-parameter value at its argument position
#[derive(Debug, Clone, PartialEq)]
pub struct OutValue {
    pub index: usize,
    pub value: Value,
}

/// Everything one native call produced
///
/// Ephemeral: lives only until the caller has consumed the values and
/// released the owned handles.
#[derive(Debug)]
pub struct CallResult {
    /// Decoded return value (`Unit` for void)
    pub ret: Value,
    /// One entry per declared out-parameter, in positional order;
    /// skipped or native-NULL slots decode to `Value::Null`
    pub outputs: Vec<OutValue>,
    /// Release obligations for native-owned memory, in decode order
    pub owned: Vec<NativeHandle>,
}

impl CallResult {
    /// Out-parameter value at argument position `index`, if decoded
    pub fn output(&self, index: usize) -> Option<&Value> {
        self.outputs
            .iter()
            .find(|o| o.index == index)
            .map(|o| &o.value)
    }
}

/// Call failures
#[derive(Debug)]
pub enum CallError {
    Marshal(MarshalError),
    /// A native status code signalling failure; unused by the fixture
    /// functions but mapped rather than dropped when a callee has one
    Native { code: i32 },
}

impl core::fmt::Display for CallError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Marshal(e) => write!(f, "marshal: {}", e),
            Self::Native { code } => write!(f, "native call failed with code {}", code),
        }
    }
}

impl std::error::Error for CallError {}

impl From<MarshalError> for CallError {
    fn from(e: MarshalError) -> Self {
        Self::Marshal(e)
    }
}

/// Where each out-parameter's storage ended up
enum OutRef {
    Slot { index: usize, slot: OutSlot },
    Array { index: usize, buf: usize },
    Skipped { index: usize },
}

/// Call a native entry point as described by `desc`.
///
/// Arguments are positional and must match the descriptor's parameter
/// kinds; a count or kind mismatch panics. `LengthMismatch` and
/// `NullNotAllowed` are rejected before any native memory is touched.
/// The call itself is synchronous and blocks until the callee returns,
/// including any re-entry through callback trampolines.
pub fn invoke(
    entry: EntryPoint,
    desc: &SignatureDescriptor,
    args: &[CallArg],
) -> Result<CallResult, CallError> {
    assert_eq!(
        args.len(),
        desc.params.len(),
        "function '{}': descriptor declares {} parameters, {} arguments supplied",
        desc.name,
        desc.params.len(),
        args.len()
    );
    validate_callback_shapes(desc, args);

    // Bindings first, then the closures borrowing them; both vectors are
    // complete before any code pointer is taken.
    let bindings: Vec<CallbackBinding> = args
        .iter()
        .filter_map(|a| match a {
            CallArg::Callback(cb) => Some(CallbackBinding::new(*cb)),
            _ => None,
        })
        .collect();
    let closures: Vec<Closure> = bindings.iter().map(|b| b.closure()).collect();

    let mut encoded: Vec<NativeArg> = Vec::with_capacity(args.len());
    let mut ffi_types: Vec<Type> = Vec::with_capacity(args.len());
    let mut scratch: Vec<Scratch> = Vec::new();
    let mut out_refs: Vec<OutRef> = Vec::new();
    let mut next_closure = 0usize;

    for (i, (kind, arg)) in desc.params.iter().zip(args).enumerate() {
        match kind {
            ParamKind::OutParam(inner) => {
                ffi_types.push(Type::pointer());
                match arg {
                    CallArg::Out => {
                        let mut slot = OutSlot::for_kind(inner);
                        encoded.push(NativeArg::Ptr(slot.as_ptr()));
                        out_refs.push(OutRef::Slot { index: i, slot });
                    }
                    CallArg::Value(Value::Null) => {
                        encoded.push(NativeArg::Ptr(ptr::null_mut()));
                        out_refs.push(OutRef::Skipped { index: i });
                    }
                    _ => panic!(
                        "function '{}': argument {i} is an out-parameter and takes \
                         CallArg::Out or Value::Null",
                        desc.name
                    ),
                }
            }
            ParamKind::OutCStr => {
                ffi_types.push(Type::pointer());
                match arg {
                    CallArg::Out => {
                        let mut slot = OutSlot::for_cstr();
                        encoded.push(NativeArg::Ptr(slot.as_ptr()));
                        out_refs.push(OutRef::Slot { index: i, slot });
                    }
                    CallArg::Value(Value::Null) => {
                        encoded.push(NativeArg::Ptr(ptr::null_mut()));
                        out_refs.push(OutRef::Skipped { index: i });
                    }
                    _ => panic!(
                        "function '{}': argument {i} is a string out-parameter and takes \
                         CallArg::Out or Value::Null",
                        desc.name
                    ),
                }
            }
            ParamKind::OutArray(elem, len) => {
                ffi_types.push(Type::pointer());
                match arg {
                    CallArg::Out => {
                        let mut buf = marshal::alloc_out_buffer(elem, *len);
                        encoded.push(NativeArg::Ptr(buf.base_ptr()));
                        scratch.push(buf);
                        out_refs.push(OutRef::Array {
                            index: i,
                            buf: scratch.len() - 1,
                        });
                    }
                    CallArg::Value(Value::Null) => {
                        encoded.push(NativeArg::Ptr(ptr::null_mut()));
                        out_refs.push(OutRef::Skipped { index: i });
                    }
                    _ => panic!(
                        "function '{}': argument {i} is an out-array and takes \
                         CallArg::Out or Value::Null",
                        desc.name
                    ),
                }
            }
            ParamKind::Callback(_) => {
                ffi_types.push(Type::pointer());
                match arg {
                    CallArg::Callback(_) => {
                        let code = closure_code(&closures[next_closure]);
                        next_closure += 1;
                        encoded.push(NativeArg::Ptr(code));
                    }
                    // Null means the callee's default behavior, not an error
                    CallArg::Value(Value::Null) => {
                        encoded.push(NativeArg::Ptr(ptr::null_mut()));
                    }
                    _ => panic!(
                        "function '{}': argument {i} is a callback and takes host logic \
                         or Value::Null",
                        desc.name
                    ),
                }
            }
            _ => {
                let CallArg::Value(value) = arg else {
                    panic!(
                        "function '{}': argument {i} declared {kind:?} but a non-value \
                         argument was supplied",
                        desc.name
                    );
                };
                let (native, keep) = marshal::encode(i, kind, value).map_err(|e| {
                    super::record_marshal_error();
                    e
                })?;
                ffi_types.push(ffi_type_for(kind));
                encoded.push(native);
                if let Some(keep) = keep {
                    scratch.push(keep);
                }
            }
        }
    }

    let ffi_args: Vec<Arg> = encoded
        .iter()
        .map(|a| match a {
            NativeArg::I32(v) => Arg::new(v),
            NativeArg::U64(v) => Arg::new(v),
            NativeArg::F32(v) => Arg::new(v),
            NativeArg::F64(v) => Arg::new(v),
            NativeArg::USize(v) => Arg::new(v),
            NativeArg::Ptr(v) => Arg::new(v),
        })
        .collect();

    let cif = Cif::new(ffi_types, ffi_type_for(&desc.ret));
    let code = CodePtr(entry.addr() as *mut c_void);

    super::record_call();
    logging::log_call(&desc.name, args.len());

    for binding in &bindings {
        binding.arm();
    }

    let mut owned: Vec<NativeHandle> = Vec::new();
    let ret = match &desc.ret {
        ParamKind::Void => {
            unsafe { cif.call::<()>(code, &ffi_args) };
            Value::Unit
        }
        ParamKind::I32 => Value::I32(unsafe { cif.call::<i32>(code, &ffi_args) }),
        ParamKind::U64 => Value::U64(unsafe { cif.call::<u64>(code, &ffi_args) }),
        ParamKind::F32 => Value::F32(unsafe { cif.call::<f32>(code, &ffi_args) }),
        ParamKind::F64 => Value::F64(unsafe { cif.call::<f64>(code, &ffi_args) }),
        ParamKind::USize => Value::USize(unsafe { cif.call::<usize>(code, &ffi_args) }),
        ParamKind::Ptr => {
            let addr = unsafe { cif.call::<usize>(code, &ffi_args) };
            if addr == 0 {
                Value::Null
            } else {
                Value::Ptr(addr)
            }
        }
        ParamKind::CStr(_) => {
            let addr = unsafe { cif.call::<usize>(code, &ffi_args) };
            let (value, handle) = marshal::decode_owned_cstr(addr as *mut c_char);
            if let Some(handle) = handle {
                owned.push(handle);
            }
            value
        }
        other => unreachable!("non-returnable kind {other:?} escaped descriptor validation"),
    };

    for binding in &bindings {
        binding.disarm();
    }

    let mut outputs = Vec::with_capacity(out_refs.len());
    for out in out_refs {
        match out {
            OutRef::Slot { index, slot } => {
                let (value, handle) = slot.decode();
                if let Some(handle) = handle {
                    owned.push(handle);
                }
                outputs.push(OutValue { index, value });
            }
            OutRef::Array { index, buf } => outputs.push(OutValue {
                index,
                value: marshal::decode_out_buffer(&scratch[buf]),
            }),
            OutRef::Skipped { index } => outputs.push(OutValue {
                index,
                value: Value::Null,
            }),
        }
    }

    logging::log_call_done(&desc.name, outputs.len(), owned.len());
    Ok(CallResult { ret, outputs, owned })
}

/// Fatal check that supplied callbacks match their declared signatures
fn validate_callback_shapes(desc: &SignatureDescriptor, args: &[CallArg]) {
    for (i, (kind, arg)) in desc.params.iter().zip(args).enumerate() {
        let CallArg::Callback(cb) = arg else { continue };
        let ParamKind::Callback(sig) = kind else {
            panic!(
                "function '{}': argument {i} supplies a callback but is declared {kind:?}",
                desc.name
            );
        };
        let matches = match cb {
            HostCallback::Operator(_) => {
                sig.params == [ParamKind::I32, ParamKind::I32] && sig.ret == ParamKind::I32
            }
            HostCallback::Comparator(_) => {
                sig.params == [ParamKind::Ptr, ParamKind::Ptr] && sig.ret == ParamKind::I32
            }
        };
        assert!(
            matches,
            "function '{}': argument {i} host callback does not match declared \
             callback signature '{}'",
            desc.name, sig.name
        );
    }
}

/// libffi type for one descriptor kind
fn ffi_type_for(kind: &ParamKind) -> Type {
    match kind {
        ParamKind::I32 => Type::i32(),
        ParamKind::U64 => Type::u64(),
        ParamKind::F32 => Type::f32(),
        ParamKind::F64 => Type::f64(),
        ParamKind::USize => Type::usize(),
        ParamKind::Void => Type::void(),
        // Strings, arrays, out-locations and callbacks all travel as pointers
        _ => Type::pointer(),
    }
}

/// Raw code address of a trampoline closure
fn closure_code(closure: &Closure) -> *mut c_void {
    (*closure.code_ptr()) as *mut c_void
}
