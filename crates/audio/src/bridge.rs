//! Resampling and PCM16 quantization
//!
//! Resampling is nearest-index selection (sample-and-hold). There is no
//! anti-alias filtering; for speech fed to a lip-sync renderer the
//! aliasing is inaudible and the zero-latency, allocation-bounded path
//! matters more. This is a documented limitation, not an oversight.

use thiserror::Error;

/// Transcoding failures. The offending frame is dropped by callers;
/// streaming continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscodeError {
    #[error("invalid sample rate: source {source_rate} Hz, target {target_rate} Hz")]
    InvalidRate { source_rate: u32, target_rate: u32 },
}

impl From<TranscodeError> for sommelier_core::Error {
    fn from(err: TranscodeError) -> Self {
        sommelier_core::Error::Transcode(err.to_string())
    }
}

/// Resample a frame by nearest-index selection.
///
/// Output length is `round(len * target_rate / source_rate)`; the source
/// index for output `i` is `round(i * source_rate / target_rate)`, clamped
/// to the final sample. Equal rates pass the frame through unchanged.
pub fn downsample(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, TranscodeError> {
    if source_rate == 0 || target_rate == 0 {
        return Err(TranscodeError::InvalidRate {
            source_rate,
            target_rate,
        });
    }
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let last = samples.len() - 1;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src = ((i as f64 * ratio).round() as usize).min(last);
        out.push(samples[src]);
    }
    Ok(out)
}

/// Quantize normalized samples to little-endian 16-bit PCM.
///
/// Each sample is clamped to [-1, 1], scaled asymmetrically (negative
/// values by 32768, non-negative by 32767, so full-scale positive input
/// cannot overflow i16) and rounded to the nearest step.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let s = sample.clamp(-1.0, 1.0);
        let value = if s < 0.0 {
            (s * 32768.0).round() as i16
        } else {
            (s * 32767.0).round() as i16
        };
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a raw little-endian PCM16 buffer back to normalized samples.
///
/// Divides by the same asymmetric scale the encoder multiplied by, so the
/// round trip is exact to within half a quantization step (well inside
/// 1/32768 per sample). A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| {
            let value = i16::from_le_bytes([pair[0], pair[1]]);
            if value < 0 {
                value as f32 / 32768.0
            } else {
                value as f32 / 32767.0
            }
        })
        .collect()
}

/// Convert one speech frame from the voice service's rate to the avatar
/// renderer's PCM16 format. Empty input yields an empty buffer.
pub fn convert(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<u8>, TranscodeError> {
    let resampled = downsample(samples, source_rate, target_rate)?;
    Ok(encode_pcm16(&resampled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AVATAR_SAMPLE_RATE, VOICE_SOURCE_SAMPLE_RATE};

    #[test]
    fn test_zero_rate_is_error() {
        let err = convert(&[0.0; 10], 0, 16_000).unwrap_err();
        assert_eq!(
            err,
            TranscodeError::InvalidRate {
                source_rate: 0,
                target_rate: 16_000
            }
        );
        assert!(convert(&[0.0; 10], 48_000, 0).is_err());
    }

    #[test]
    fn test_empty_input_yields_empty_buffer() {
        let out = convert(&[], 48_000, 16_000).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_one_second_output_length() {
        // 1 second at 48 kHz must produce 2 * round(n * 16000/48000) bytes.
        let frame = vec![0.25_f32; VOICE_SOURCE_SAMPLE_RATE as usize];
        let out = convert(&frame, VOICE_SOURCE_SAMPLE_RATE, AVATAR_SAMPLE_RATE).unwrap();
        let expected_samples =
            (frame.len() as f64 * AVATAR_SAMPLE_RATE as f64 / VOICE_SOURCE_SAMPLE_RATE as f64)
                .round() as usize;
        assert_eq!(out.len(), 2 * expected_samples);
        assert_eq!(out.len(), 2 * AVATAR_SAMPLE_RATE as usize);
    }

    #[test]
    fn test_passthrough_on_equal_rates() {
        let frame = vec![0.5_f32, -0.5, 0.25];
        let out = downsample(&frame, 16_000, 16_000).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_clamps_out_of_range_samples() {
        let out = encode_pcm16(&[2.0, -2.0]);
        assert_eq!(out.len(), 4);
        let decoded = decode_pcm16(&out);
        assert!((decoded[0] - 1.0).abs() < 1e-6);
        assert!((decoded[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_asymmetric_scaling_avoids_positive_overflow() {
        let out = encode_pcm16(&[1.0]);
        let value = i16::from_le_bytes([out[0], out[1]]);
        assert_eq!(value, i16::MAX);
        let out = encode_pcm16(&[-1.0]);
        let value = i16::from_le_bytes([out[0], out[1]]);
        assert_eq!(value, i16::MIN);
    }

    #[test]
    fn test_round_trip_within_quantization_error() {
        let mut samples: Vec<f32> = (0..1024)
            .map(|i| ((i as f32) * 0.013).sin() * 0.8)
            .collect();
        // Values near a truncation boundary, where an unrounded encoder
        // drifts past the error bound.
        samples.extend([0.0933866, -0.0933866, 0.499_999, 1.0 / 32767.0]);
        let decoded = decode_pcm16(&encode_pcm16(&samples));
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() <= 1.0 / 32768.0, "{a} vs {b}");
        }
    }

    #[test]
    fn test_odd_trailing_byte_ignored() {
        let decoded = decode_pcm16(&[0x00, 0x40, 0x7f]);
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_sine_survives_wav_round_trip() {
        // Write the converted stream out as a WAV and read it back, the
        // way an avatar-side capture would see it.
        let samples: Vec<f32> = (0..48_000)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 48_000.0).sin() * 0.5)
            .collect();
        let pcm = convert(&samples, 48_000, 16_000).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for pair in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .unwrap();
        }
        writer.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read.len(), 16_000);
        let read_bytes: Vec<u8> = read.iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(decode_pcm16(&pcm), decode_pcm16(&read_bytes));
    }
}
