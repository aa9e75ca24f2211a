//! Error taxonomy for the binding.
//!
//! Every failure surfaces through [`OpusError`], whether it comes from
//! library loading, symbol resolution, handle construction, or a transform
//! call. Raw native status codes never escape this crate; they are
//! translated into [`ErrorCode`] at the FFI boundary.

use std::fmt;

use thiserror::Error;

use crate::ffi::types;

/// Errors that can occur while loading the native library or driving a codec
/// handle.
#[derive(Debug, Clone, Error)]
pub enum OpusError {
    /// Sample rate outside the set accepted by the codec.
    #[error("unsupported sample rate: {0} Hz (must be 8000, 12000, 16000, 24000, or 48000)")]
    InvalidSampleRate(u32),

    /// Channel count other than mono or stereo.
    #[error("unsupported channel count: {0} (must be 1 or 2)")]
    InvalidChannels(u32),

    /// The native Opus image could not be found or mapped into the process.
    #[error("failed to load the Opus library: {0}")]
    LibraryLoad(String),

    /// A required entry point is missing from the loaded image, usually a
    /// version mismatch.
    #[error("Opus library is missing the `{symbol}` entry point")]
    SymbolNotFound {
        /// Name of the absent export.
        symbol: &'static str,
    },

    /// The native constructor reported a non-OK status.
    #[error("native codec construction failed: {0}")]
    ConstructionFailed(ErrorCode),

    /// `opus_encode` returned a negative status.
    #[error("encoding failed: {0}")]
    EncodeFailed(ErrorCode),

    /// `opus_decode` returned a negative status.
    #[error("decoding failed: {0}")]
    DecodeFailed(ErrorCode),

    /// An encoder control request (`opus_encoder_ctl`) was rejected.
    #[error("encoder control request failed: {0}")]
    CtlFailed(ErrorCode),

    /// Operation invoked on a handle whose native state has been released.
    #[error("codec handle used after close")]
    UseAfterClose,
}

/// Result type for all binding operations.
pub type OpusResult<T> = Result<T, OpusError>;

/// Native Opus status codes, translated from the raw negative return values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// One or more invalid or out-of-range arguments.
    BadArg,
    /// The supplied output buffer is too small.
    BufferTooSmall,
    /// The codec detected an internal error.
    InternalError,
    /// The compressed data passed to the decoder is corrupted.
    InvalidPacket,
    /// Invalid or unsupported request number.
    Unimplemented,
    /// The encoder or decoder structure is invalid or already freed.
    InvalidState,
    /// Memory allocation failed inside the codec.
    AllocFail,
    /// A status code this binding does not recognize.
    Unknown(i32),
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            types::OPUS_BAD_ARG => ErrorCode::BadArg,
            types::OPUS_BUFFER_TOO_SMALL => ErrorCode::BufferTooSmall,
            types::OPUS_INTERNAL_ERROR => ErrorCode::InternalError,
            types::OPUS_INVALID_PACKET => ErrorCode::InvalidPacket,
            types::OPUS_UNIMPLEMENTED => ErrorCode::Unimplemented,
            types::OPUS_INVALID_STATE => ErrorCode::InvalidState,
            types::OPUS_ALLOC_FAIL => ErrorCode::AllocFail,
            other => ErrorCode::Unknown(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::BadArg => write!(f, "invalid argument"),
            ErrorCode::BufferTooSmall => write!(f, "output buffer too small"),
            ErrorCode::InternalError => write!(f, "internal codec error"),
            ErrorCode::InvalidPacket => write!(f, "corrupted compressed data"),
            ErrorCode::Unimplemented => write!(f, "unimplemented request"),
            ErrorCode::InvalidState => write!(f, "invalid or freed codec state"),
            ErrorCode::AllocFail => write!(f, "memory allocation failed"),
            ErrorCode::Unknown(code) => write!(f, "unknown status code {code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_codes_map_to_named_variants() {
        assert_eq!(ErrorCode::from(-1), ErrorCode::BadArg);
        assert_eq!(ErrorCode::from(-2), ErrorCode::BufferTooSmall);
        assert_eq!(ErrorCode::from(-3), ErrorCode::InternalError);
        assert_eq!(ErrorCode::from(-4), ErrorCode::InvalidPacket);
        assert_eq!(ErrorCode::from(-5), ErrorCode::Unimplemented);
        assert_eq!(ErrorCode::from(-6), ErrorCode::InvalidState);
        assert_eq!(ErrorCode::from(-7), ErrorCode::AllocFail);
    }

    #[test]
    fn unrecognized_code_is_preserved() {
        assert_eq!(ErrorCode::from(-42), ErrorCode::Unknown(-42));
        assert_eq!(ErrorCode::from(0), ErrorCode::Unknown(0));
    }

    #[test]
    fn error_messages_name_the_failure() {
        let err = OpusError::InvalidSampleRate(11025);
        assert!(err.to_string().contains("11025"));

        let err = OpusError::DecodeFailed(ErrorCode::InvalidPacket);
        assert!(err.to_string().contains("corrupted"));

        let err = OpusError::SymbolNotFound {
            symbol: "opus_encode",
        };
        assert!(err.to_string().contains("opus_encode"));
    }
}
