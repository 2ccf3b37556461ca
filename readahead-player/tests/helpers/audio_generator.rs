//! Test audio file generation
//!
//! Writes 16-bit WAV files whose samples encode their own frame index, so
//! decoded output can be checked for position without float comparisons.

use hound::{WavSpec, WavWriter};
use std::path::Path;

/// Standard test sample rate (44.1 kHz)
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Marker values wrap at this period
const MARKER_PERIOD: u64 = 1000;

/// Generate a WAV file where every sample of frame `i` is `i % 1000`
pub fn generate_marker_wav<P: AsRef<Path>>(
    path: P,
    frames: u64,
    channels: u16,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..frames {
        let marker = (frame % MARKER_PERIOD) as i16;
        for _ in 0..channels {
            writer.write_sample(marker)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Recover the marker from a decoded sample
pub fn decode_marker(sample: f32) -> u64 {
    (sample * 32768.0).round() as u64
}

/// Marker expected for file frame `frame`
pub fn marker_for(frame: u64) -> u64 {
    frame % MARKER_PERIOD
}
