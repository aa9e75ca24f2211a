#![expect(unsafe_code, reason = "dlsym and raw FFI function pointer calls")]

//! Resolved Opus API, shared process-wide.
//!
//! [`OpusApi`] owns the loaded library image and the typed function pointers
//! resolved from it. The first handle construction triggers exactly one load
//! and one symbol-resolution pass; every later construction (from any
//! thread) reuses the cached result, including a cached failure.

use std::{
    ffi::CStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, OnceLock,
    },
};

use tracing::info;

use super::{
    loader,
    types::{
        OpusDecodeFn, OpusDecoderCreateFn, OpusDecoderDestroyFn, OpusEncodeFn,
        OpusEncoderCreateFn, OpusEncoderCtlGetFn, OpusEncoderCtlSetFn, OpusEncoderDestroyFn,
        OpusGetVersionStringFn, OpusStrerrorFn,
    },
};
use crate::error::{OpusError, OpusResult};

static API: OnceLock<Result<Arc<OpusApi>, OpusError>> = OnceLock::new();
static LOAD_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

/// Function pointers resolved from the loaded Opus image.
///
/// The `libloading::Library` is kept alive here so the resolved pointers
/// stay valid; the image is never unmapped.
pub(crate) struct OpusApi {
    _library: libloading::Library,
    library_path: String,
    version: Option<String>,
    pub encoder_create: OpusEncoderCreateFn,
    pub encoder_destroy: OpusEncoderDestroyFn,
    pub encode: OpusEncodeFn,
    pub decoder_create: OpusDecoderCreateFn,
    pub decoder_destroy: OpusDecoderDestroyFn,
    pub decode: OpusDecodeFn,
    pub encoder_ctl_set: OpusEncoderCtlSetFn,
    pub encoder_ctl_get: OpusEncoderCtlGetFn,
    pub strerror: Option<OpusStrerrorFn>,
}

// The library handle and function pointers are safe to share between
// threads. Per-stream native state lives in the codec handles, not here.
unsafe impl Send for OpusApi {}
unsafe impl Sync for OpusApi {}

impl OpusApi {
    /// Process-wide API accessor. Loads and resolves on first call; all
    /// subsequent calls observe the same fully initialized table.
    pub(crate) fn acquire() -> OpusResult<Arc<OpusApi>> {
        API.get_or_init(|| {
            LOAD_ATTEMPTS.fetch_add(1, Ordering::Relaxed);
            Self::load()
        })
        .clone()
    }

    /// Number of load-and-resolve passes performed so far. Stays at 1 after
    /// the first construction no matter how many handles exist.
    pub(crate) fn load_attempts() -> usize {
        LOAD_ATTEMPTS.load(Ordering::Relaxed)
    }

    fn load() -> Result<Arc<OpusApi>, OpusError> {
        let loaded = loader::load_native_library().map_err(OpusError::LibraryLoad)?;
        let api = Self::resolve(loaded)?;

        match &api.version {
            Some(version) => info!("Loaded {} from {}", version, api.library_path),
            None => info!("Loaded Opus (unknown version) from {}", api.library_path),
        }

        Ok(Arc::new(api))
    }

    /// Bind every required export to its typed signature. Optional probes
    /// resolve to `None` when absent instead of failing.
    fn resolve(loaded: loader::LoadedLibrary) -> Result<OpusApi, OpusError> {
        let lib = &loaded.library;

        let encoder_create: OpusEncoderCreateFn = required(lib, "opus_encoder_create")?;
        let encoder_destroy: OpusEncoderDestroyFn = required(lib, "opus_encoder_destroy")?;
        let encode: OpusEncodeFn = required(lib, "opus_encode")?;
        let decoder_create: OpusDecoderCreateFn = required(lib, "opus_decoder_create")?;
        let decoder_destroy: OpusDecoderDestroyFn = required(lib, "opus_decoder_destroy")?;
        let decode: OpusDecodeFn = required(lib, "opus_decode")?;
        // The ctl export is variadic in C; bind it once per argument shape.
        let encoder_ctl_set: OpusEncoderCtlSetFn = required(lib, "opus_encoder_ctl")?;
        let encoder_ctl_get: OpusEncoderCtlGetFn = required(lib, "opus_encoder_ctl")?;

        let strerror: Option<OpusStrerrorFn> = optional(lib, "opus_strerror");
        let get_version: Option<OpusGetVersionStringFn> = optional(lib, "opus_get_version_string");

        let version = get_version.map(|f| {
            // Safety: opus_get_version_string returns a static NUL-terminated
            // string owned by the library.
            unsafe { CStr::from_ptr(f()) }.to_string_lossy().into_owned()
        });

        Ok(OpusApi {
            _library: loaded.library,
            library_path: loaded.path,
            version,
            encoder_create,
            encoder_destroy,
            encode,
            decoder_create,
            decoder_destroy,
            decode,
            encoder_ctl_set,
            encoder_ctl_get,
            strerror,
        })
    }

    /// Version string reported by the library, if it exports one.
    pub(crate) fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Human-readable description of a native status code, if the library
    /// exports `opus_strerror`.
    pub(crate) fn error_string(&self, code: i32) -> Option<String> {
        self.strerror.map(|f| {
            // Safety: opus_strerror returns a static NUL-terminated string
            // for any input value.
            unsafe { CStr::from_ptr(f(code)) }
                .to_string_lossy()
                .into_owned()
        })
    }
}

/// Resolve an export that the binding cannot work without.
fn required<T: Copy>(lib: &libloading::Library, name: &'static str) -> Result<T, OpusError> {
    // Safety: the signature `T` is the documented ABI of the named export.
    let symbol: libloading::Symbol<'_, T> = unsafe { lib.get(name.as_bytes()) }
        .map_err(|_| OpusError::SymbolNotFound { symbol: name })?;
    Ok(*symbol)
}

/// Resolve an optional export; absence is a capability probe result, not an
/// error.
fn optional<T: Copy>(lib: &libloading::Library, name: &str) -> Option<T> {
    let symbol: libloading::Symbol<'_, T> = unsafe { lib.get(name.as_bytes()) }.ok()?;
    Some(*symbol)
}
