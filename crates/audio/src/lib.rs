//! Audio bridge between the voice service and the avatar renderer
//!
//! The voice service emits mono floating-point speech audio (commonly
//! 48 kHz); the avatar renderer consumes 16-bit PCM mono at 16 kHz. This
//! crate does the conversion: nearest-index decimation followed by PCM16
//! quantization. Everything here is pure and synchronous so it can run on
//! the real-time audio delivery path without blocking.

pub mod bridge;
pub mod frame;

pub use bridge::{convert, decode_pcm16, downsample, encode_pcm16, TranscodeError};
pub use frame::AudioFrame;

/// Sample rate the avatar renderer requires.
pub const AVATAR_SAMPLE_RATE: u32 = 16_000;

/// Sample rate the voice service commonly delivers.
pub const VOICE_SOURCE_SAMPLE_RATE: u32 = 48_000;
