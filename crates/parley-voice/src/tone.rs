//! Fallback audio used when speech synthesis is unavailable.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::TAU;
use std::io::Cursor;

const SAMPLE_RATE: u32 = 22_050;
const BEEP_FREQUENCY_HZ: f32 = 800.0;
const BEEP_DURATION_SECS: f32 = 0.5;
const AMPLITUDE: f32 = 0.3;

/// Renders a mono 16-bit sine tone as an in-memory WAV file.
pub fn sine_wav(frequency_hz: f32, duration_secs: f32, sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let total = (duration_secs * sample_rate as f32).round() as u32;
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for n in 0..total {
            let t = n as f32 / sample_rate as f32;
            let sample = (TAU * frequency_hz * t).sin() * AMPLITUDE * i16::MAX as f32;
            writer.write_sample(sample as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Short 800 Hz beep. Writing to memory cannot fail in practice; if it ever
/// does, a bare header-only WAV is returned so the caller still gets bytes.
pub fn fallback_beep() -> Vec<u8> {
    sine_wav(BEEP_FREQUENCY_HZ, BEEP_DURATION_SECS, SAMPLE_RATE).unwrap_or_else(|e| {
        tracing::error!("failed to render fallback tone: {}", e);
        empty_wav()
    })
}

fn empty_wav() -> Vec<u8> {
    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&36u32.to_le_bytes());
    header.extend_from_slice(b"WAVEfmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    header.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    header.extend_from_slice(&2u16.to_le_bytes());
    header.extend_from_slice(&16u16.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&0u32.to_le_bytes());
    header
}
