//! # lamco-opus
//!
//! Rust bindings to the Opus audio codec, loaded dynamically at runtime.
//!
//! This crate contains no codec algorithm and no bitstream logic. It locates
//! the platform's `libopus` image, resolves the encode/decode entry points
//! once per process, and wraps the opaque native codec states in safe,
//! deterministically released handles.
//!
//! # Architecture
//!
//! ```text
//! lamco-opus
//!   ├─> ffi::loader  (locate + dlopen the image, once per process)
//!   ├─> ffi::api     (resolve exported symbols to typed pointers)
//!   ├─> Encoder      (one native encoder state + output scratch buffer)
//!   └─> Decoder      (one native decoder state + output scratch buffer)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use lamco_opus::{Application, Decoder, Encoder};
//!
//! # fn main() -> lamco_opus::OpusResult<()> {
//! let mut encoder = Encoder::new(48000, 2, Application::Audio)?;
//! let mut decoder = Decoder::new(48000, 2)?;
//!
//! // 20ms of interleaved 16-bit PCM at 48kHz stereo.
//! let pcm = vec![0u8; 960 * 2 * 2];
//! let packet = encoder.encode(&pcm)?;
//! let frame = decoder.decode(&packet)?;
//! assert_eq!(frame.samples_per_channel, 960);
//! # Ok(())
//! # }
//! ```
//!
//! # Threading
//!
//! Library loading and symbol resolution are guarded by a process-wide
//! single-initialization; concurrent first use from many threads performs
//! exactly one load. Individual handles are `Send` but not `Sync`: the
//! native state is mutated in place on every call, so callers sharing a
//! handle across threads must serialize access.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Opus decoder handle.
pub mod decoder;

/// Opus encoder handle.
pub mod encoder;

/// Error taxonomy.
pub mod error;

mod ffi;

pub use decoder::{DecodedFrame, Decoder};
pub use encoder::{Application, Encoder};
pub use error::{ErrorCode, OpusError, OpusResult};

/// Sample rates the codec accepts, in Hz.
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Width of one PCM sample in bytes. The binding speaks 16-bit PCM only.
pub const SAMPLE_WIDTH_BYTES: usize = 2;

/// Default scratch-buffer capacity for encoded and decoded output, in bytes.
pub const DEFAULT_MAX_DATA_BYTES: usize = 4000;

/// Reject unsupported stream parameters before any native call is made.
pub(crate) fn check_stream_params(sample_rate: u32, channels: u32) -> OpusResult<()> {
    if !SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
        return Err(OpusError::InvalidSampleRate(sample_rate));
    }
    if channels != 1 && channels != 2 {
        return Err(OpusError::InvalidChannels(channels));
    }
    Ok(())
}

/// Force the native library to load and its symbols to resolve.
///
/// Handle constructors do this implicitly; calling it up front turns a
/// missing or broken installation into an early, inspectable error.
pub fn preload() -> OpusResult<()> {
    ffi::api::OpusApi::acquire().map(|_| ())
}

/// Version string reported by the loaded library, if it exports one.
///
/// Loads the library if it is not loaded yet.
pub fn native_version() -> OpusResult<Option<String>> {
    ffi::api::OpusApi::acquire().map(|api| api.version().map(str::to_owned))
}

/// Number of load-and-resolve passes performed by this process.
///
/// Diagnostic: stays at 1 after the first successful or failed load, no
/// matter how many handles are constructed or threads race the first use.
pub fn native_load_attempts() -> usize {
    ffi::api::OpusApi::load_attempts()
}
