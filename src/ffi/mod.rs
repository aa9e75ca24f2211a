//! FFI boundary: library loading, symbol resolution, and the raw ABI types.
//!
//! Nothing outside this module touches `libloading` or a raw native
//! signature. Codec handles go through [`api::OpusApi`], which hands out
//! typed function pointers resolved exactly once per process.

pub(crate) mod api;
pub(crate) mod loader;
pub(crate) mod types;
