//! Native call bridge - invoke C-ABI functions from safe Rust
//!
//! Design: all unsafe memory traffic is confined to the invoker and the
//! callback trampolines; everything else is plain data.
//!
//! Architecture:
//! - `types.rs` - parameter kinds and host values
//! - `signature.rs` - function signature descriptors
//! - `marshal.rs` - host ↔ native value conversions
//! - `handle.rs` - ownership tokens for native-returned memory
//! - `library.rs` - library loading and cached symbol resolution
//! - `finder.rs` - locating libraries by bare name
//! - `invoke.rs` - descriptor-driven call execution
//! - `callback.rs` - host closures as native function pointers
//! - `registry.rs` - process-lifetime descriptor ownership

mod callback;
mod finder;
mod handle;
mod invoke;
mod library;
mod marshal;
mod registry;
mod signature;
mod types;

pub use callback::{CallbackBinding, HostCallback};
pub use finder::{FindError, LibraryFinder};
pub use handle::NativeHandle;
pub use invoke::{invoke, CallError, CallResult, OutValue};
pub use library::{platform_lib_name, EntryPoint, LoadError, NativeLibrary, SymbolError};
pub use marshal::MarshalError;
pub use registry::{
    fill_seq_i32_sig, fixture_registry, sort_i32_copy_sig, sum_i32_array_sig, BindingRegistry,
};
pub use signature::SignatureDescriptor;
pub use types::{CStrOwnership, CallArg, ParamKind, Value};

use std::sync::atomic::{AtomicUsize, Ordering};

static CALLS_MADE: AtomicUsize = AtomicUsize::new(0);
static MARSHAL_ERRORS: AtomicUsize = AtomicUsize::new(0);
static LIBRARIES_LOADED: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn record_call() {
    CALLS_MADE.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_marshal_error() {
    MARSHAL_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_library_loaded() {
    LIBRARIES_LOADED.fetch_add(1, Ordering::Relaxed);
}

/// Bridge statistics for monitoring
#[derive(Debug, Clone, Copy)]
pub struct BridgeStats {
    pub calls_made: usize,
    pub marshal_errors: usize,
    pub libraries_loaded: usize,
}

/// Get bridge statistics
pub fn stats() -> BridgeStats {
    BridgeStats {
        calls_made: CALLS_MADE.load(Ordering::Relaxed),
        marshal_errors: MARSHAL_ERRORS.load(Ordering::Relaxed),
        libraries_loaded: LIBRARIES_LOADED.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests;
