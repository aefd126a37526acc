//! Sample format and channel conversion.

use super::SampleFormat;

/// Converts an f32 sample to i16.
///
/// Input should be in the range [-1.0, 1.0]; values outside are clamped.
///
/// Uses × 32767 (not 32768) for symmetric scaling. This means -1.0 maps to
/// -32767 rather than -32768, losing 1 LSB at the negative extreme. This is
/// a common convention that avoids producing out-of-range values.
#[inline]
#[must_use]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Converts an i16 sample to f32 in [-1.0, 1.0].
#[inline]
#[must_use]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Converts an f32 sample to unsigned 8-bit (biased around 128).
#[inline]
#[must_use]
pub fn f32_to_u8(sample: f32) -> u8 {
    ((sample * 127.0).clamp(-128.0, 127.0) as i16 + 128) as u8
}

/// Converts an unsigned 8-bit sample to f32 in [-1.0, 1.0].
#[inline]
#[must_use]
pub fn u8_to_f32(sample: u8) -> f32 {
    f32::from(i16::from(sample) - 128) / 128.0
}

/// Converts an f32 sample to i32.
#[inline]
#[must_use]
pub fn f32_to_i32(sample: f32) -> i32 {
    (f64::from(sample) * 2_147_483_647.0).clamp(-2_147_483_648.0, 2_147_483_647.0) as i32
}

/// Converts an i32 sample to f32 in [-1.0, 1.0].
#[inline]
#[must_use]
pub fn i32_to_f32(sample: i32) -> f32 {
    (f64::from(sample) / 2_147_483_648.0) as f32
}

/// Converts an f32 sample to a packed little-endian 24-bit triplet.
#[inline]
#[must_use]
pub fn f32_to_i24(sample: f32) -> [u8; 3] {
    let value = (f64::from(sample) * 8_388_607.0).clamp(-8_388_608.0, 8_388_607.0) as i32;
    let bytes = value.to_le_bytes();
    [bytes[0], bytes[1], bytes[2]]
}

/// Converts a packed little-endian 24-bit triplet to f32 in [-1.0, 1.0].
#[inline]
#[must_use]
pub fn i24_to_f32(bytes: [u8; 3]) -> f32 {
    // Sign-extend through the top byte of an i32
    let value = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
    (f64::from(value) / 8_388_608.0) as f32
}

/// Decodes an interleaved block of raw sample bytes into f32 samples.
///
/// The byte length must be a multiple of the format's sample size; trailing
/// bytes that do not form a whole sample are ignored. `Unknown` decodes to
/// an empty vector.
#[must_use]
pub fn decode_to_f32(bytes: &[u8], format: SampleFormat) -> Vec<f32> {
    match format {
        SampleFormat::Unknown => Vec::new(),
        SampleFormat::U8 => bytes.iter().map(|&b| u8_to_f32(b)).collect(),
        SampleFormat::S16 => bytes
            .chunks_exact(2)
            .map(|b| i16_to_f32(i16::from_ne_bytes([b[0], b[1]])))
            .collect(),
        SampleFormat::S24 => bytes
            .chunks_exact(3)
            .map(|b| i24_to_f32([b[0], b[1], b[2]]))
            .collect(),
        SampleFormat::S32 => bytes
            .chunks_exact(4)
            .map(|b| i32_to_f32(i32::from_ne_bytes([b[0], b[1], b[2], b[3]])))
            .collect(),
        SampleFormat::F32 => bytes
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    }
}

/// Encodes f32 samples into an interleaved block of raw sample bytes.
#[must_use]
pub fn encode_from_f32(samples: &[f32], format: SampleFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * format.bytes_per_sample());
    for &sample in samples {
        match format {
            SampleFormat::Unknown => {}
            SampleFormat::U8 => out.push(f32_to_u8(sample)),
            SampleFormat::S16 => out.extend_from_slice(&f32_to_i16(sample).to_ne_bytes()),
            SampleFormat::S24 => out.extend_from_slice(&f32_to_i24(sample)),
            SampleFormat::S32 => out.extend_from_slice(&f32_to_i32(sample).to_ne_bytes()),
            SampleFormat::F32 => out.extend_from_slice(&sample.to_ne_bytes()),
        }
    }
    out
}

/// Remaps interleaved samples from one channel count to another.
///
/// - Same count: returned unchanged.
/// - Down to mono: channels are averaged.
/// - Up from mono: the sample is duplicated to every channel.
/// - Anything else: channel `c` takes source channel `min(c, from - 1)`.
///
/// Incomplete trailing frames are dropped.
#[must_use]
pub fn remap_channels(interleaved: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return interleaved.to_vec();
    }

    let from = from as usize;
    let to = to as usize;
    let frames = interleaved.len() / from;
    let mut out = Vec::with_capacity(frames * to);

    for frame in interleaved.chunks_exact(from) {
        if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            for c in 0..to {
                out.push(frame[c.min(from - 1)]);
            }
        }
    }

    out
}
