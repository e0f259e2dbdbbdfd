//! Logging utilities for the call bridge
//!
//! Lightweight structured logging for library loading, symbol
//! resolution, call execution and cross-boundary memory hand-off. Uses
//! `tracing` with minimal overhead at the call site.

// Re-export tracing macros for use throughout the crate
pub use tracing::{debug, error, info, trace, warn, Level};

/// Initialize logging with sensible defaults
///
/// Honors `RUST_LOG` when set. Debug builds default to `debug` level,
/// release builds to `info`.
pub fn init() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            EnvFilter::new("callbridge=debug")
        }
        #[cfg(not(debug_assertions))]
        {
            EnvFilter::new("callbridge=info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .ok(); // Ignore error if already initialized
}

/// Initialize logging at an explicit level, overriding the environment
pub fn init_at(level: Level) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::new(format!("callbridge={}", level.as_str().to_lowercase()));
    fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .ok();
}

/// Log a library load
#[inline]
pub fn log_library_loaded(path: &str) {
    debug!(target: "library", path, "loaded native library");
}

/// Log a symbol resolution
#[inline]
pub fn log_symbol_resolved(symbol: &str, addr: usize) {
    trace!(
        target: "library",
        symbol,
        addr = format_args!("{addr:#x}"),
        "resolved symbol"
    );
}

/// Log the start of a native call
#[inline]
pub fn log_call(function: &str, argc: usize) {
    trace!(target: "invoke", function, argc, "native call");
}

/// Log completion of a native call
#[inline]
pub fn log_call_done(function: &str, outputs: usize, owned: usize) {
    trace!(
        target: "invoke",
        function,
        outputs,
        owned,
        "native call complete"
    );
}

/// Log a trampoline entry from native code
#[inline]
pub fn log_callback_entry(kind: &str, invocation: u32) {
    trace!(target: "callback", kind, invocation, "callback invoked");
}

/// Log release of native-owned memory
#[inline]
pub fn log_native_release(ptr: *const u8) {
    trace!(target: "handle", ptr = ?ptr, "released native allocation");
}
