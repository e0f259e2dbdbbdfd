//! callbridge - call C-ABI functions in shared libraries from safe Rust
//!
//! The crate has two halves. The bridge is the calling layer: signature
//! descriptors mirror native function signatures, the marshaler converts
//! values across the boundary, the resolver turns symbol names into entry
//! points, the invoker performs descriptor-driven calls, and trampolines
//! expose host closures as native function pointers. The fixture is the
//! fixed set of trivial C-ABI exports the bridge is validated against;
//! the cdylib build of this crate doubles as the loadable fixture
//! library.
//!
//! ```no_run
//! use callbridge::bridge::{invoke, CallArg, NativeLibrary, Value};
//! use callbridge::bridge::fixture_registry;
//!
//! let lib = NativeLibrary::load("libcallbridge.so")?;
//! let entry = lib.resolve("add_i32")?;
//! let desc = fixture_registry().get("add_i32").unwrap();
//! let result = invoke(entry, &desc, &[
//!     CallArg::Value(Value::I32(2)),
//!     CallArg::Value(Value::I32(3)),
//! ])?;
//! assert_eq!(result.ret, Value::I32(5));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![allow(dead_code)]

pub mod bridge;
pub mod fixture;
pub mod logging;
pub mod parse;

// Re-export the core call surface
pub use bridge::{
    invoke, CallArg, CallError, CallResult, EntryPoint, HostCallback, NativeHandle,
    NativeLibrary, ParamKind, SignatureDescriptor, Value,
};
