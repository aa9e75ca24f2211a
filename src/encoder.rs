#![expect(unsafe_code, reason = "FFI calls through resolved Opus function pointers")]

//! Opus encoder handle.
//!
//! Owns one opaque native encoder state and a scratch buffer for encoded
//! output. Calls are synchronous and CPU-bound; the native state is mutated
//! in place and is not reentrant, so a handle must not be driven from two
//! threads at once. The type is `Send` but not `Sync`; callers that share
//! one handle must serialize access themselves.

use std::{os::raw::c_int, ptr::NonNull, sync::Arc};

use tracing::debug;

use crate::{
    error::{ErrorCode, OpusError, OpusResult},
    ffi::{
        api::OpusApi,
        types::{self, OpusEncoderState},
    },
    DEFAULT_MAX_DATA_BYTES, SAMPLE_WIDTH_BYTES,
};

/// Coding mode passed to the native encoder constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    /// Best for VoIP/videoconference applications where intelligibility
    /// matters most.
    Voip,
    /// Best for broadcast/high-fidelity use where decoded audio should stay
    /// close to the input.
    Audio,
    /// Only when lowest achievable latency matters most; voice-optimized
    /// modes are unavailable.
    RestrictedLowDelay,
}

impl Application {
    pub(crate) fn to_raw(self) -> c_int {
        match self {
            Application::Voip => types::OPUS_APPLICATION_VOIP,
            Application::Audio => types::OPUS_APPLICATION_AUDIO,
            Application::RestrictedLowDelay => types::OPUS_APPLICATION_RESTRICTED_LOWDELAY,
        }
    }
}

/// Opus encoder over a dynamically loaded native state.
///
/// Input is interleaved 16-bit little-endian PCM bytes; one call encodes one
/// frame. The native state is released exactly once, on [`close`](Self::close)
/// or drop, whichever comes first.
pub struct Encoder {
    api: Arc<OpusApi>,
    state: Option<NonNull<OpusEncoderState>>,
    sample_rate: u32,
    channels: u32,
    application: Application,
    scratch: Vec<u8>,
}

// The native encoder state has no thread affinity; it can move between
// threads. It is not reentrant, which the missing `Sync` impl enforces.
unsafe impl Send for Encoder {}

impl Encoder {
    /// Create an encoder for the given stream parameters.
    ///
    /// `sample_rate` must be one of 8000, 12000, 16000, 24000, or 48000 Hz
    /// and `channels` 1 or 2; both are rejected before any native call. The
    /// first construction in the process loads the native library.
    pub fn new(sample_rate: u32, channels: u32, application: Application) -> OpusResult<Self> {
        crate::check_stream_params(sample_rate, channels)?;

        let api = OpusApi::acquire()?;

        let mut error: c_int = types::OPUS_OK;
        // Safety: arguments validated above; error out-param is a live local.
        let state = unsafe {
            (api.encoder_create)(
                sample_rate as c_int,
                channels as c_int,
                application.to_raw(),
                &mut error,
            )
        };

        if error != types::OPUS_OK || state.is_null() {
            // A non-OK constructor never hands out ownership, but free any
            // state it produced anyway so nothing leaks on this path.
            if let Some(state) = NonNull::new(state) {
                unsafe { (api.encoder_destroy)(state.as_ptr()) };
            }
            let code = if error != types::OPUS_OK {
                ErrorCode::from(error)
            } else {
                ErrorCode::InternalError
            };
            return Err(OpusError::ConstructionFailed(code));
        }

        debug!(sample_rate, channels, ?application, "created Opus encoder");

        Ok(Self {
            api,
            state: NonNull::new(state),
            sample_rate,
            channels,
            application,
            scratch: vec![0u8; DEFAULT_MAX_DATA_BYTES],
        })
    }

    /// Encode one frame of interleaved 16-bit PCM.
    ///
    /// The frame size is derived from the input length; the returned buffer
    /// holds exactly the bytes the native encoder produced, never the full
    /// scratch capacity. A failed call (other than an invalid-state failure)
    /// leaves the handle usable for subsequent frames.
    pub fn encode(&mut self, pcm: &[u8]) -> OpusResult<Vec<u8>> {
        let state = self.live_state()?;
        let frame_size = pcm.len() / (SAMPLE_WIDTH_BYTES * self.channels as usize);

        // Safety: state is live, buffers outlive the call, frame_size matches
        // the PCM length handed to the native encoder.
        let written = unsafe {
            (self.api.encode)(
                state,
                pcm.as_ptr().cast::<i16>(),
                frame_size as c_int,
                self.scratch.as_mut_ptr(),
                self.scratch.len() as c_int,
            )
        };

        if written < 0 {
            return Err(OpusError::EncodeFailed(self.translate_failure(written)));
        }

        Ok(self.scratch[..written as usize].to_vec())
    }

    /// Set the target bitrate in bits per second.
    pub fn set_bitrate(&mut self, bitrate: u32) -> OpusResult<()> {
        let state = self.live_state()?;
        // Safety: state is live; the set form of the ctl takes the value by
        // value.
        let ret = unsafe {
            (self.api.encoder_ctl_set)(state, types::OPUS_SET_BITRATE_REQUEST, bitrate as c_int)
        };
        if ret != types::OPUS_OK {
            return Err(OpusError::CtlFailed(self.translate_failure(ret)));
        }
        Ok(())
    }

    /// Current target bitrate in bits per second, as reported by the native
    /// encoder.
    pub fn bitrate(&mut self) -> OpusResult<u32> {
        let state = self.live_state()?;
        let mut value: c_int = 0;
        // Safety: state is live; the get form of the ctl writes through the
        // out-pointer.
        let ret = unsafe {
            (self.api.encoder_ctl_get)(state, types::OPUS_GET_BITRATE_REQUEST, &mut value)
        };
        if ret != types::OPUS_OK {
            return Err(OpusError::CtlFailed(self.translate_failure(ret)));
        }
        Ok(value as u32)
    }

    /// Sample rate the encoder was created with, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count the encoder was created with.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Coding mode the encoder was created with.
    pub fn application(&self) -> Application {
        self.application
    }

    /// Current scratch-buffer capacity for encoded output, in bytes.
    pub fn max_data_bytes(&self) -> usize {
        self.scratch.len()
    }

    /// Resize the scratch buffer for encoded output.
    ///
    /// Undersizing silently truncates high-bitrate frames inside the native
    /// encoder; 4000 bytes is the recommended default.
    pub fn set_max_data_bytes(&mut self, max_data_bytes: usize) {
        self.scratch.resize(max_data_bytes, 0);
    }

    /// Release the native encoder state.
    ///
    /// Idempotent; later calls are no-ops. Any transform call after this
    /// fails with [`OpusError::UseAfterClose`] without touching the native
    /// layer.
    pub fn close(&mut self) {
        if let Some(state) = self.state.take() {
            // Safety: pointer came from opus_encoder_create and take() makes
            // this the only release.
            unsafe { (self.api.encoder_destroy)(state.as_ptr()) };
        }
    }

    fn live_state(&self) -> OpusResult<*mut OpusEncoderState> {
        self.state
            .map(NonNull::as_ptr)
            .ok_or(OpusError::UseAfterClose)
    }

    /// Translate a native failure code, poisoning the handle when the native
    /// state itself is reported corrupt.
    fn translate_failure(&mut self, raw: c_int) -> ErrorCode {
        if let Some(message) = self.api.error_string(raw) {
            debug!("native encoder call failed: {message}");
        }
        let code = ErrorCode::from(raw);
        if code == ErrorCode::InvalidState {
            // The native object is invalid or already freed; stop using it
            // and skip the destructor rather than risk a double free.
            self.state = None;
        }
        code
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("application", &self.application)
            .field("max_data_bytes", &self.scratch.len())
            .field("closed", &self.state.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native_available() -> bool {
        OpusApi::acquire().is_ok()
    }

    /// 20ms of silence at the given rate/channels, as interleaved 16-bit PCM.
    fn silent_frame(sample_rate: u32, channels: u32) -> Vec<u8> {
        let samples_per_channel = sample_rate as usize / 50;
        vec![0u8; samples_per_channel * channels as usize * SAMPLE_WIDTH_BYTES]
    }

    #[test]
    fn rejects_unsupported_sample_rate() {
        let err = Encoder::new(11025, 2, Application::Audio).unwrap_err();
        assert!(matches!(err, OpusError::InvalidSampleRate(11025)));
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        for channels in [0, 3, 8] {
            let err = Encoder::new(48000, channels, Application::Voip).unwrap_err();
            assert!(matches!(err, OpusError::InvalidChannels(c) if c == channels));
        }
    }

    #[test]
    fn creation_reports_configuration() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        for sample_rate in [8000, 12000, 16000, 24000, 48000] {
            for channels in [1, 2] {
                let encoder = Encoder::new(sample_rate, channels, Application::Audio).unwrap();
                assert_eq!(encoder.sample_rate(), sample_rate);
                assert_eq!(encoder.channels(), channels);
                assert_eq!(encoder.application(), Application::Audio);
                assert_eq!(encoder.max_data_bytes(), DEFAULT_MAX_DATA_BYTES);
            }
        }
    }

    #[test]
    fn encode_returns_right_sized_output() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        let mut encoder = Encoder::new(48000, 2, Application::Audio).unwrap();
        let packet = encoder.encode(&silent_frame(48000, 2)).unwrap();
        assert!(!packet.is_empty());
        // Silence compresses far below the scratch capacity; the result must
        // be the reported length, not the whole buffer.
        assert!(packet.len() < DEFAULT_MAX_DATA_BYTES);
    }

    #[test]
    fn bitrate_round_trips_through_ctl() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        let mut encoder = Encoder::new(48000, 1, Application::Voip).unwrap();
        encoder.set_bitrate(64_000).unwrap();
        assert_eq!(encoder.bitrate().unwrap(), 64_000);
    }

    #[test]
    fn close_is_idempotent() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        let mut encoder = Encoder::new(16000, 1, Application::Voip).unwrap();
        encoder.close();
        encoder.close();
        drop(encoder); // also a no-op release
    }

    #[test]
    fn operations_after_close_fail_without_native_call() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        let mut encoder = Encoder::new(16000, 1, Application::Voip).unwrap();
        encoder.close();

        let err = encoder.encode(&silent_frame(16000, 1)).unwrap_err();
        assert!(matches!(err, OpusError::UseAfterClose));
        assert!(matches!(
            encoder.set_bitrate(32_000).unwrap_err(),
            OpusError::UseAfterClose
        ));
        assert!(matches!(
            encoder.bitrate().unwrap_err(),
            OpusError::UseAfterClose
        ));
    }
}
