// SoundBuffer - decoded, immutable mono PCM
//
// Every asset, decoded or synthesized, ends up as one of these. Multi-channel
// WAV input is downmixed by averaging so the graph only ever mixes mono.

use std::io::Cursor;

use crate::error::AssetError;

/// Where a buffer's samples came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOrigin {
    Decoded,
    Synthesized,
}

/// Decoded mono audio ready to play
#[derive(Debug, Clone, PartialEq)]
pub struct SoundBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    origin: BufferOrigin,
}

impl SoundBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, origin: BufferOrigin) -> Self {
        Self {
            samples,
            sample_rate,
            origin,
        }
    }

    /// Decode a WAV file held in memory.
    ///
    /// Integer formats are normalized to [-1.0, 1.0]; channels are averaged.
    pub fn decode_wav(bytes: &[u8]) -> Result<Self, AssetError> {
        let reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        if samples.is_empty() {
            return Err(AssetError::EmptyBuffer);
        }

        Ok(Self::new(samples, spec.sample_rate, BufferOrigin::Decoded))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn origin(&self) -> BufferOrigin {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Linearly interpolated sample at a fractional frame position.
    ///
    /// With `looping`, positions past the end wrap to the start.
    #[inline]
    pub fn sample_at(&self, position: f64, looping: bool) -> f32 {
        let len = self.samples.len();
        if len == 0 {
            return 0.0;
        }
        let index = position.floor() as usize;
        if index >= len && !looping {
            return 0.0;
        }
        let index = index % len;
        let frac = (position - position.floor()) as f32;
        let next = if index + 1 < len {
            self.samples[index + 1]
        } else if looping {
            self.samples[0]
        } else {
            0.0
        };
        let current = self.samples[index];
        current + (next - current) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, frames: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in frames {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono_i16() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[0, 16384, -16384, i16::MAX]);
        let buffer = SoundBuffer::decode_wav(&bytes).unwrap();

        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.sample_rate(), 22_050);
        assert_eq!(buffer.origin(), BufferOrigin::Decoded);
        assert!((buffer.samples()[1] - 0.5).abs() < 1e-4);
        assert!((buffer.samples()[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_stereo_downmix() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[16384, 0, -16384, -16384]);
        let buffer = SoundBuffer::decode_wav(&bytes).unwrap();

        assert_eq!(buffer.len(), 2, "Two stereo frames should yield two mono samples");
        assert!((buffer.samples()[0] - 0.25).abs() < 1e-4);
        assert!((buffer.samples()[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = SoundBuffer::decode_wav(b"definitely not a wav file");
        assert!(matches!(result, Err(AssetError::DecodeFailed { .. })));
    }

    #[test]
    fn test_decode_empty_wav_fails() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[]);
        assert_eq!(SoundBuffer::decode_wav(&bytes), Err(AssetError::EmptyBuffer));
    }

    #[test]
    fn test_sample_at_interpolates_and_wraps() {
        let buffer = SoundBuffer::new(vec![0.0, 1.0, 0.0, -1.0], 4, BufferOrigin::Synthesized);
        assert_eq!(buffer.sample_at(0.5, false), 0.5);
        assert_eq!(buffer.sample_at(4.0, false), 0.0);
        assert_eq!(buffer.sample_at(5.0, true), 1.0);
        // last sample blends towards the first when looping
        assert_eq!(buffer.sample_at(3.5, true), -0.5);
        assert_eq!(buffer.duration_secs(), 1.0);
    }
}
