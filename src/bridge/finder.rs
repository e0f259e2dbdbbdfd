//! Locating shared libraries by bare name
//!
//! Resolves a name like `m` to an on-disk path like
//! `/usr/lib/x86_64-linux-gnu/libm.so.6` by probing user-supplied
//! directories, then the platform's standard locations, with `lib`
//! prefixes, platform extensions and versioned suffixes. Pure path
//! probing; nothing is loaded here.

use std::path::{Path, PathBuf};

/// Library search over user dirs plus platform defaults
pub struct LibraryFinder {
    search_paths: Vec<PathBuf>,
}

impl LibraryFinder {
    /// Create a finder; `extra_paths` are searched before system paths.
    pub fn new(extra_paths: Vec<PathBuf>) -> Self {
        let mut search_paths = extra_paths;
        search_paths.extend(default_library_paths());
        Self { search_paths }
    }

    /// Find a library by name or path.
    ///
    /// A token containing a path separator, or naming an existing file,
    /// is returned as-is. Otherwise every search directory is probed for
    /// the direct name, then for `lib`-prefixed platform file names and
    /// their versioned variants (`libm.so.6`).
    pub fn find(&self, name: &str) -> Result<PathBuf, FindError> {
        if name.contains('/') || name.contains('\\') || Path::new(name).is_file() {
            return Ok(PathBuf::from(name));
        }

        if let Some(found) = self.probe(name) {
            return Ok(found);
        }

        Err(FindError::NotFound {
            name: name.to_string(),
            searched: self.search_paths.clone(),
        })
    }

    fn probe(&self, name: &str) -> Option<PathBuf> {
        // Direct name first (covers "libm.so" given verbatim)
        for dir in &self.search_paths {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        let prefixes: &[&str] = if name.starts_with("lib") {
            &[""]
        } else {
            &["lib", ""]
        };

        for prefix in prefixes {
            for ext in platform_extensions() {
                let file_name = format!("{prefix}{name}{ext}");
                for dir in &self.search_paths {
                    let candidate = dir.join(&file_name);
                    if candidate.is_file() {
                        return Some(candidate);
                    }
                    if !ext.is_empty() {
                        if let Some(versioned) = versioned_match(dir, &file_name) {
                            return Some(versioned);
                        }
                    }
                }
            }
        }
        None
    }
}

/// First file in `dir` named `<file_name>.<suffix>` (e.g. `libm.so.6`)
fn versioned_match(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let want = format!("{file_name}.");
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let candidate = entry.path();
        if !candidate.is_file() {
            continue;
        }
        if let Some(n) = candidate.file_name().and_then(|n| n.to_str()) {
            if n.starts_with(&want) {
                return Some(candidate);
            }
        }
    }
    None
}

/// File extensions to try, most specific first
fn platform_extensions() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &[".dll"]
    }
    #[cfg(target_os = "macos")]
    {
        &[".dylib", ".so"]
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        &[".so"]
    }
}

/// Standard library directories that exist on this machine
fn default_library_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from("C:/Windows/System32"));
        paths.push(PathBuf::from("C:/Windows/SysWOW64"));
        if let Ok(path_var) = std::env::var("PATH") {
            paths.extend(std::env::split_paths(&path_var));
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        paths.push(PathBuf::from("/lib"));
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/local/lib"));

        #[cfg(target_arch = "x86_64")]
        {
            paths.push(PathBuf::from("/lib/x86_64-linux-gnu"));
            paths.push(PathBuf::from("/usr/lib/x86_64-linux-gnu"));
        }
        #[cfg(target_arch = "aarch64")]
        {
            paths.push(PathBuf::from("/lib/aarch64-linux-gnu"));
            paths.push(PathBuf::from("/usr/lib/aarch64-linux-gnu"));
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        if let Ok(ld_path) = std::env::var("LD_LIBRARY_PATH") {
            paths.extend(std::env::split_paths(&ld_path));
        }
        #[cfg(target_os = "macos")]
        if let Ok(dyld_path) = std::env::var("DYLD_LIBRARY_PATH") {
            paths.extend(std::env::split_paths(&dyld_path));
        }
    }

    paths.retain(|p| p.is_dir());
    paths
}

/// Search failure with the directories that were probed
#[derive(Debug)]
pub enum FindError {
    NotFound { name: String, searched: Vec<PathBuf> },
}

impl core::fmt::Display for FindError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound { name, searched } => {
                let dirs: Vec<String> = searched
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                write!(f, "library not found: {} (searched: {})", name, dirs.join(", "))
            }
        }
    }
}

impl std::error::Error for FindError {}
