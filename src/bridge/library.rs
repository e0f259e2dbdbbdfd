//! Native library loading and symbol resolution
//!
//! Wraps `libloading` with a per-library resolution cache. Resolving the
//! same name twice is idempotent and returns an equivalent entry point;
//! the cache lives exactly as long as the library handle and is safe for
//! concurrent readers. Reload invalidation is out of scope: after an
//! unload/reload cycle callers must resolve again.

use core::ffi::c_void;
use std::ffi::CString;
use std::path::Path;

use dashmap::DashMap;
use libloading::Library;

use crate::logging;

/// Callable native code address
///
/// Obtained from [`NativeLibrary::resolve`], or wrapped directly around an
/// in-process `extern "C"` function pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    addr: *const c_void,
}

impl EntryPoint {
    /// Wrap a C-ABI code address
    #[inline]
    pub fn new(addr: *const c_void) -> Self {
        Self { addr }
    }

    /// The raw code address
    #[inline]
    pub fn addr(&self) -> usize {
        self.addr as usize
    }
}

// A code address carries no thread-affine state.
unsafe impl Send for EntryPoint {}
unsafe impl Sync for EntryPoint {}

/// A loaded native library with its symbol cache
pub struct NativeLibrary {
    library: Library,
    path: String,
    resolved: DashMap<String, usize>,
}

impl NativeLibrary {
    /// Load a native library from a path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }
            .map_err(|e| LoadError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        super::record_library_loaded();
        logging::log_library_loaded(&path.display().to_string());
        Ok(Self {
            library,
            path: path.display().to_string(),
            resolved: DashMap::new(),
        })
    }

    /// Load a library by base name, trying the platform file name in the
    /// current directory first and then the system loader paths.
    pub fn load_by_name(name: &str) -> Result<Self, LoadError> {
        let lib_name = platform_lib_name(name);
        if let Ok(lib) = Self::load(&lib_name) {
            return Ok(lib);
        }

        let library = unsafe { Library::new(&lib_name) }
            .map_err(|e| LoadError::LoadFailed(format!("{} (tried '{}'): {}", name, lib_name, e)))?;

        super::record_library_loaded();
        logging::log_library_loaded(&lib_name);
        Ok(Self {
            library,
            path: lib_name,
            resolved: DashMap::new(),
        })
    }

    /// Resolve an exported function name to an entry point.
    ///
    /// Cached per name for the lifetime of this handle; resolving twice
    /// yields entry points with the same code address.
    pub fn resolve(&self, name: &str) -> Result<EntryPoint, SymbolError> {
        if let Some(addr) = self.resolved.get(name) {
            return Ok(EntryPoint::new(*addr as *const c_void));
        }

        let c_name = CString::new(name).map_err(|_| SymbolError::InvalidName)?;
        let symbol: libloading::Symbol<'_, unsafe extern "C" fn()> = unsafe {
            self.library.get(c_name.as_bytes_with_nul())
        }
        .map_err(|_| SymbolError::NotFound {
            symbol: name.to_string(),
            library: self.path.clone(),
        })?;

        let addr = *symbol as usize;
        self.resolved.insert(name.to_string(), addr);
        logging::log_symbol_resolved(name, addr);
        Ok(EntryPoint::new(addr as *const c_void))
    }

    /// Path this library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Platform file name for a bare library base name
pub fn platform_lib_name(name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        format!("{}.dll", name)
    }
    #[cfg(target_os = "macos")]
    {
        format!("lib{}.dylib", name)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        format!("lib{}.so", name)
    }
}

/// Library loading errors
#[derive(Debug)]
pub enum LoadError {
    LoadFailed(String),
}

impl core::fmt::Display for LoadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LoadFailed(msg) => write!(f, "failed to load library: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// Symbol lookup errors
#[derive(Debug)]
pub enum SymbolError {
    InvalidName,
    NotFound { symbol: String, library: String },
}

impl core::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "invalid symbol name"),
            Self::NotFound { symbol, library } => {
                write!(f, "symbol '{}' not found in '{}'", symbol, library)
            }
        }
    }
}

impl std::error::Error for SymbolError {}
