#![expect(unsafe_code, reason = "dlopen of the native Opus binary")]

//! Native Opus library location and loading.
//!
//! Finds the platform-specific shared-library image and maps it into the
//! process. The image name is selected by the pointer width of the running
//! process, so a 32-bit build never tries to load a 64-bit image. The
//! loaded [`libloading::Library`] is kept alive for the rest of the process;
//! this layer never unloads it.

use std::path::PathBuf;

use tracing::{debug, warn};

/// A successfully mapped Opus image together with the path (or bare name)
/// it was loaded from.
pub(crate) struct LoadedLibrary {
    pub library: libloading::Library,
    pub path: String,
}

/// Candidate image names for the running process, most specific first.
#[cfg(windows)]
fn candidate_names() -> &'static [&'static str] {
    #[cfg(target_pointer_width = "64")]
    {
        &["opus64.dll", "opus.dll", "libopus-0.dll"]
    }
    #[cfg(target_pointer_width = "32")]
    {
        &["opus32.dll", "opus.dll", "libopus-0.dll"]
    }
}

#[cfg(target_os = "macos")]
fn candidate_names() -> &'static [&'static str] {
    &["libopus.0.dylib", "libopus.dylib"]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn candidate_names() -> &'static [&'static str] {
    &["libopus.so.0", "libopus.so"]
}

/// Directories to scan when the system loader's default search fails.
#[cfg(all(unix, not(target_os = "macos")))]
const SEARCH_DIRS: &[&str] = &[
    // Debian/Ubuntu multiarch
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/aarch64-linux-gnu",
    // Fedora/RHEL
    "/usr/lib64",
    // Arch/generic
    "/usr/lib",
    "/usr/local/lib",
];

#[cfg(target_os = "macos")]
const SEARCH_DIRS: &[&str] = &["/opt/homebrew/lib", "/usr/local/lib", "/usr/lib"];

#[cfg(windows)]
const SEARCH_DIRS: &[&str] = &[];

/// Load the Opus shared library.
///
/// Search order:
/// 1. `OPUS_LIBRARY_PATH` environment variable (explicit override)
/// 2. Bare candidate names through the system loader's default search path
/// 3. Well-known library directories
pub(crate) fn load_native_library() -> Result<LoadedLibrary, String> {
    if let Ok(explicit_path) = std::env::var("OPUS_LIBRARY_PATH") {
        match try_load(&explicit_path) {
            Ok(loaded) => return Ok(loaded),
            Err(e) => {
                warn!("OPUS_LIBRARY_PATH={explicit_path} set but failed: {e}");
            }
        }
    }

    for name in candidate_names() {
        match try_load(name) {
            Ok(loaded) => return Ok(loaded),
            Err(e) => {
                debug!("Candidate {name} not loadable: {e}");
            }
        }
    }

    for dir in SEARCH_DIRS {
        if let Some(lib_path) = find_opus_in_dir(dir) {
            let path_str = lib_path.display().to_string();
            match try_load(&path_str) {
                Ok(loaded) => return Ok(loaded),
                Err(e) => {
                    debug!("Found {path_str} but failed: {e}");
                }
            }
        }
    }

    let hint = install_hint();
    Err(format!("Opus library not found. {hint}"))
}

#[cfg(windows)]
fn install_hint() -> &'static str {
    "Place opus64.dll (or opus32.dll for 32-bit processes) next to the \
     executable, or set OPUS_LIBRARY_PATH to the image"
}

#[cfg(not(windows))]
fn install_hint() -> &'static str {
    "Install the Opus runtime: libopus0 (Debian/Ubuntu), opus (Fedora/Arch), \
     or `brew install opus` (macOS); or set OPUS_LIBRARY_PATH to the image"
}

/// Scan a directory for a matching Opus image.
fn find_opus_in_dir(dir: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let names = candidate_names();

    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| names.contains(&n))
        })
}

/// Map a specific image into the process.
fn try_load(path: &str) -> Result<LoadedLibrary, String> {
    // Safety: loading a system-managed codec binary (distro package or an
    // image the operator pointed us at), not an arbitrary blob.
    let library =
        unsafe { libloading::Library::new(path) }.map_err(|e| format!("dlopen {path}: {e}"))?;

    Ok(LoadedLibrary {
        library,
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_names_match_pointer_width() {
        let names = candidate_names();
        assert!(!names.is_empty());
        #[cfg(all(windows, target_pointer_width = "64"))]
        assert_eq!(names[0], "opus64.dll");
        #[cfg(all(windows, target_pointer_width = "32"))]
        assert_eq!(names[0], "opus32.dll");
        #[cfg(all(unix, not(target_os = "macos")))]
        assert_eq!(names[0], "libopus.so.0");
    }

    #[test]
    fn missing_directory_scan_is_quiet() {
        assert!(find_opus_in_dir("/nonexistent/library/dir").is_none());
    }
}
