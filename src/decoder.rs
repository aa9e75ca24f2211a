#![expect(unsafe_code, reason = "FFI calls through resolved Opus function pointers")]

//! Opus decoder handle.
//!
//! Mirrors the encoder's lifecycle: one opaque native state, one scratch
//! buffer, release exactly once. Same threading contract: `Send`, not
//! `Sync`; serialize calls per handle.

use std::{os::raw::c_int, ptr::NonNull, sync::Arc};

use tracing::debug;

use crate::{
    error::{ErrorCode, OpusError, OpusResult},
    ffi::{
        api::OpusApi,
        types::{self, OpusDecoderState},
    },
    DEFAULT_MAX_DATA_BYTES, SAMPLE_WIDTH_BYTES,
};

/// One decoded frame of interleaved 16-bit PCM.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Interleaved 16-bit little-endian PCM bytes, sized exactly to the
    /// decoded audio (`samples_per_channel * channels * 2`).
    pub pcm: Vec<u8>,
    /// Number of decoded samples per channel.
    pub samples_per_channel: usize,
}

/// Opus decoder over a dynamically loaded native state.
pub struct Decoder {
    api: Arc<OpusApi>,
    state: Option<NonNull<OpusDecoderState>>,
    sample_rate: u32,
    channels: u32,
    scratch: Vec<u8>,
}

// Same rationale as the encoder: no thread affinity, not reentrant.
unsafe impl Send for Decoder {}

impl Decoder {
    /// Create a decoder for the given output stream parameters.
    ///
    /// Validation and failure semantics match [`Encoder::new`]; unsupported
    /// parameters are rejected before any native call.
    ///
    /// [`Encoder::new`]: crate::Encoder::new
    pub fn new(sample_rate: u32, channels: u32) -> OpusResult<Self> {
        crate::check_stream_params(sample_rate, channels)?;

        let api = OpusApi::acquire()?;

        let mut error: c_int = types::OPUS_OK;
        // Safety: arguments validated above; error out-param is a live local.
        let state = unsafe {
            (api.decoder_create)(sample_rate as c_int, channels as c_int, &mut error)
        };

        if error != types::OPUS_OK || state.is_null() {
            if let Some(state) = NonNull::new(state) {
                unsafe { (api.decoder_destroy)(state.as_ptr()) };
            }
            let code = if error != types::OPUS_OK {
                ErrorCode::from(error)
            } else {
                ErrorCode::InternalError
            };
            return Err(OpusError::ConstructionFailed(code));
        }

        debug!(sample_rate, channels, "created Opus decoder");

        Ok(Self {
            api,
            state: NonNull::new(state),
            sample_rate,
            channels,
            scratch: vec![0u8; DEFAULT_MAX_DATA_BYTES],
        })
    }

    /// Decode one Opus packet into PCM.
    ///
    /// The scratch capacity bounds the decodable frame size
    /// (`max_data_bytes / (2 * channels)` samples per channel). A failed call
    /// on corrupt input leaves the handle usable for the next packet.
    pub fn decode(&mut self, packet: &[u8]) -> OpusResult<DecodedFrame> {
        self.decode_inner(packet, false)
    }

    /// Decode with in-band forward error correction.
    ///
    /// Pass the packet *following* a lost frame to reconstruct the lost
    /// audio from its FEC data.
    pub fn decode_fec(&mut self, packet: &[u8]) -> OpusResult<DecodedFrame> {
        self.decode_inner(packet, true)
    }

    fn decode_inner(&mut self, packet: &[u8], fec: bool) -> OpusResult<DecodedFrame> {
        let state = self.live_state()?;
        let bytes_per_frame = SAMPLE_WIDTH_BYTES * self.channels as usize;
        let max_frame_size = self.scratch.len() / bytes_per_frame;

        // Safety: state is live, buffers outlive the call, and frame_size is
        // the scratch capacity in samples per channel.
        let decoded = unsafe {
            (self.api.decode)(
                state,
                packet.as_ptr(),
                packet.len() as c_int,
                self.scratch.as_mut_ptr().cast::<i16>(),
                max_frame_size as c_int,
                fec as c_int,
            )
        };

        if decoded < 0 {
            return Err(OpusError::DecodeFailed(self.translate_failure(decoded)));
        }

        let samples_per_channel = decoded as usize;
        Ok(DecodedFrame {
            pcm: self.scratch[..samples_per_channel * bytes_per_frame].to_vec(),
            samples_per_channel,
        })
    }

    /// Sample rate the decoder was created with, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count the decoder was created with.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Current scratch-buffer capacity for decoded output, in bytes.
    pub fn max_data_bytes(&self) -> usize {
        self.scratch.len()
    }

    /// Resize the scratch buffer for decoded output. Capacity caps the
    /// largest decodable frame; 4000 bytes is the recommended default.
    pub fn set_max_data_bytes(&mut self, max_data_bytes: usize) {
        self.scratch.resize(max_data_bytes, 0);
    }

    /// Release the native decoder state. Idempotent, same contract as
    /// [`Encoder::close`](crate::Encoder::close).
    pub fn close(&mut self) {
        if let Some(state) = self.state.take() {
            // Safety: pointer came from opus_decoder_create and take() makes
            // this the only release.
            unsafe { (self.api.decoder_destroy)(state.as_ptr()) };
        }
    }

    fn live_state(&self) -> OpusResult<*mut OpusDecoderState> {
        self.state
            .map(NonNull::as_ptr)
            .ok_or(OpusError::UseAfterClose)
    }

    fn translate_failure(&mut self, raw: c_int) -> ErrorCode {
        if let Some(message) = self.api.error_string(raw) {
            debug!("native decoder call failed: {message}");
        }
        let code = ErrorCode::from(raw);
        if code == ErrorCode::InvalidState {
            self.state = None;
        }
        code
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("max_data_bytes", &self.scratch.len())
            .field("closed", &self.state.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Application, Encoder};

    fn native_available() -> bool {
        OpusApi::acquire().is_ok()
    }

    #[test]
    fn rejects_unsupported_sample_rate() {
        let err = Decoder::new(44100, 2).unwrap_err();
        assert!(matches!(err, OpusError::InvalidSampleRate(44100)));
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        let err = Decoder::new(48000, 0).unwrap_err();
        assert!(matches!(err, OpusError::InvalidChannels(0)));
    }

    #[test]
    fn creation_reports_configuration() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        for sample_rate in [8000, 12000, 16000, 24000, 48000] {
            for channels in [1, 2] {
                let decoder = Decoder::new(sample_rate, channels).unwrap();
                assert_eq!(decoder.sample_rate(), sample_rate);
                assert_eq!(decoder.channels(), channels);
            }
        }
    }

    #[test]
    fn round_trips_a_silent_frame() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        let samples_per_channel = 960; // 20ms at 48kHz
        let channels = 2u32;
        let pcm = vec![0u8; samples_per_channel * channels as usize * SAMPLE_WIDTH_BYTES];

        let mut encoder = Encoder::new(48000, channels, Application::Audio).unwrap();
        let packet = encoder.encode(&pcm).unwrap();

        let mut decoder = Decoder::new(48000, channels).unwrap();
        let frame = decoder.decode(&packet).unwrap();

        assert_eq!(frame.samples_per_channel, samples_per_channel);
        assert_eq!(frame.pcm.len(), pcm.len());
    }

    #[test]
    fn stereo_output_accounts_for_both_channels() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        let mut encoder = Encoder::new(48000, 2, Application::Audio).unwrap();
        let packet = encoder.encode(&vec![0u8; 960 * 2 * SAMPLE_WIDTH_BYTES]).unwrap();

        let mut decoder = Decoder::new(48000, 2).unwrap();
        let frame = decoder.decode(&packet).unwrap();
        assert_eq!(
            frame.pcm.len(),
            frame.samples_per_channel * 2 * SAMPLE_WIDTH_BYTES
        );
    }

    #[test]
    fn corrupt_packet_maps_to_decode_error_and_leaves_handle_usable() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        let mut encoder = Encoder::new(48000, 1, Application::Voip).unwrap();
        let good = encoder
            .encode(&vec![0u8; 960 * SAMPLE_WIDTH_BYTES])
            .unwrap();

        let mut decoder = Decoder::new(48000, 1).unwrap();

        // A lone code-3 TOC byte with no frame-count byte is malformed.
        let err = decoder.decode(&[0xFF]).unwrap_err();
        assert!(matches!(
            err,
            OpusError::DecodeFailed(ErrorCode::InvalidPacket)
        ));

        // One bad packet does not invalidate the stream.
        let frame = decoder.decode(&good).unwrap();
        assert_eq!(frame.samples_per_channel, 960);
    }

    #[test]
    fn operations_after_close_fail_without_native_call() {
        if !native_available() {
            eprintln!("skipping: Opus library not available");
            return;
        }
        let mut decoder = Decoder::new(24000, 1).unwrap();
        decoder.close();
        decoder.close();

        let err = decoder.decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, OpusError::UseAfterClose));
    }
}
