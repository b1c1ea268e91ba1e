//! Audio frame wrapper

use std::time::Duration;

use crate::bridge::{convert, TranscodeError};

/// A mono chunk of speech audio with its sample rate.
///
/// Samples are normalized f32 in [-1.0, 1.0], as delivered by the voice
/// service.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Frame sequence number for ordering.
    pub sequence: u64,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32, sequence: u64) -> Self {
        Self {
            samples,
            sample_rate,
            sequence,
        }
    }

    /// Wall-clock duration covered by this frame.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Transcode this frame for the avatar renderer.
    pub fn to_pcm16(&self, target_rate: u32) -> Result<Vec<u8>, TranscodeError> {
        convert(&self.samples, self.sample_rate, target_rate)
    }
}
