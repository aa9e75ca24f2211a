// Constant and type names follow the Opus C API; renaming would obscure
// which export each binding targets.
#![allow(dead_code)]

//! Raw FFI surface of the native Opus library.
//!
//! Opaque state types, status-code and request constants, and the typed
//! function-pointer aliases the resolver binds exported symbols to. All
//! signatures use the C calling convention and match the documented Opus
//! ABI; nothing here calls into the library.

use std::os::raw::{c_char, c_int};

// Status codes returned by constructors (via out-param) and transforms
// (as negative return values).
pub(crate) const OPUS_OK: c_int = 0;
pub(crate) const OPUS_BAD_ARG: c_int = -1;
pub(crate) const OPUS_BUFFER_TOO_SMALL: c_int = -2;
pub(crate) const OPUS_INTERNAL_ERROR: c_int = -3;
pub(crate) const OPUS_INVALID_PACKET: c_int = -4;
pub(crate) const OPUS_UNIMPLEMENTED: c_int = -5;
pub(crate) const OPUS_INVALID_STATE: c_int = -6;
pub(crate) const OPUS_ALLOC_FAIL: c_int = -7;

// Coding-mode values accepted by `opus_encoder_create`.
pub(crate) const OPUS_APPLICATION_VOIP: c_int = 2048;
pub(crate) const OPUS_APPLICATION_AUDIO: c_int = 2049;
pub(crate) const OPUS_APPLICATION_RESTRICTED_LOWDELAY: c_int = 2051;

// `opus_encoder_ctl` request numbers.
pub(crate) const OPUS_SET_BITRATE_REQUEST: c_int = 4002;
pub(crate) const OPUS_GET_BITRATE_REQUEST: c_int = 4003;

/// Opaque native encoder state. Only ever handled behind a raw pointer.
#[repr(C)]
pub(crate) struct OpusEncoderState {
    _private: [u8; 0],
}

/// Opaque native decoder state. Only ever handled behind a raw pointer.
#[repr(C)]
pub(crate) struct OpusDecoderState {
    _private: [u8; 0],
}

/// `opus_encoder_create(Fs, channels, application, *error) -> *OpusEncoder`
pub(crate) type OpusEncoderCreateFn =
    unsafe extern "C" fn(c_int, c_int, c_int, *mut c_int) -> *mut OpusEncoderState;

/// `opus_encoder_destroy(*OpusEncoder)`
pub(crate) type OpusEncoderDestroyFn = unsafe extern "C" fn(*mut OpusEncoderState);

/// `opus_encode(*OpusEncoder, *pcm, frame_size, *data, max_data_bytes) -> i32`
///
/// Returns the number of bytes written, or a negative status code.
pub(crate) type OpusEncodeFn =
    unsafe extern "C" fn(*mut OpusEncoderState, *const i16, c_int, *mut u8, c_int) -> c_int;

/// `opus_decoder_create(Fs, channels, *error) -> *OpusDecoder`
pub(crate) type OpusDecoderCreateFn =
    unsafe extern "C" fn(c_int, c_int, *mut c_int) -> *mut OpusDecoderState;

/// `opus_decoder_destroy(*OpusDecoder)`
pub(crate) type OpusDecoderDestroyFn = unsafe extern "C" fn(*mut OpusDecoderState);

/// `opus_decode(*OpusDecoder, *data, len, *pcm, frame_size, decode_fec) -> i32`
///
/// Returns the number of decoded samples per channel, or a negative status
/// code.
pub(crate) type OpusDecodeFn =
    unsafe extern "C" fn(*mut OpusDecoderState, *const u8, c_int, *mut i16, c_int, c_int) -> c_int;

/// `opus_encoder_ctl(*OpusEncoder, request, value) -> i32`, set-by-value form.
pub(crate) type OpusEncoderCtlSetFn =
    unsafe extern "C" fn(*mut OpusEncoderState, c_int, c_int) -> c_int;

/// `opus_encoder_ctl(*OpusEncoder, request, *value) -> i32`, get-by-pointer
/// form. Same export as [`OpusEncoderCtlSetFn`]; the C function is variadic
/// and is bound once per argument shape we use.
pub(crate) type OpusEncoderCtlGetFn =
    unsafe extern "C" fn(*mut OpusEncoderState, c_int, *mut c_int) -> c_int;

/// `opus_strerror(error) -> *const char`. Optional capability probe.
pub(crate) type OpusStrerrorFn = unsafe extern "C" fn(c_int) -> *const c_char;

/// `opus_get_version_string() -> *const char`. Optional capability probe.
pub(crate) type OpusGetVersionStringFn = unsafe extern "C" fn() -> *const c_char;
