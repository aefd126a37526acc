//! Sample rate conversion.
//!
//! Basic resampling using linear interpolation. Fast, and adequate for the
//! block-streaming use cases this crate targets; for mastering-grade quality
//! use a dedicated resampling crate upstream of the source file.

/// Resamples a single channel of audio from one sample rate to another.
///
/// Uses linear interpolation, which may introduce artifacts for large rate
/// changes.
#[must_use]
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < samples.len() {
            // Linear interpolation between two samples
            let s1 = samples[src_idx];
            let s2 = samples[src_idx + 1];
            s1 + (s2 - s1) * frac
        } else if src_idx < samples.len() {
            samples[src_idx]
        } else {
            *samples.last().unwrap_or(&0.0)
        };

        output.push(sample);
    }

    output
}

/// Resamples interleaved multi-channel audio.
///
/// Channels are deinterleaved, resampled independently, and reinterleaved.
/// Incomplete trailing frames are dropped.
#[must_use]
pub fn resample_interleaved(
    samples: &[f32],
    channels: u16,
    from_rate: u32,
    to_rate: u32,
) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return resample(samples, from_rate, to_rate);
    }

    let frames = samples.len() / channels;
    let mut planes: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, &sample) in planes.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }

    let resampled: Vec<Vec<f32>> = planes
        .iter()
        .map(|plane| resample(plane, from_rate, to_rate))
        .collect();

    let out_frames = resampled.iter().map(Vec::len).min().unwrap_or(0);
    let mut output = Vec::with_capacity(out_frames * channels);
    for i in 0..out_frames {
        for plane in &resampled {
            output.push(plane[i]);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_empty() {
        let samples: Vec<f32> = vec![];
        assert!(resample(&samples, 16000, 8000).is_empty());
    }

    #[test]
    fn test_resample_downsample_length() {
        // 48kHz to 16kHz = 3:1 ratio
        let samples: Vec<f32> = (0..480).map(|i| i as f32 / 480.0).collect();
        let resampled = resample(&samples, 48000, 16000);
        assert_eq!(resampled.len(), 160);
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        let samples = vec![0.0f32, 1.0];
        let resampled = resample(&samples, 1, 2);
        assert_eq!(resampled.len(), 4);
        assert_eq!(resampled[0], 0.0);
        // Middle samples should be interpolated
        assert!(resampled[1] > 0.0 && resampled[1] < 1.0);
    }

    #[test]
    fn test_resample_boundary_lands_on_originals() {
        let samples = vec![0.0f32, 0.1, 0.2, 0.3];
        let result = resample(&samples, 1, 2);
        assert_eq!(result[0], 0.0);
        assert!((result[2] - 0.1).abs() < 1e-6);
        assert!((result[4] - 0.2).abs() < 1e-6);
        assert!((result[6] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_resample_single_sample() {
        let samples = vec![0.5f32];
        let result = resample(&samples, 1, 10);
        assert_eq!(result.len(), 10);
        assert!(result.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_resample_interleaved_stereo_passthrough() {
        let samples = vec![0.1f32, 0.2, 0.3, 0.4];
        assert_eq!(resample_interleaved(&samples, 2, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_interleaved_stereo_downsample() {
        let samples = vec![0.0f32, 0.0, 0.1, 0.1, 0.2, 0.2, 0.3, 0.3];
        let result = resample_interleaved(&samples, 2, 48000, 16000);
        assert!(result.len() < samples.len());
        assert_eq!(result.len() % 2, 0);
    }

    #[test]
    fn test_resample_interleaved_keeps_channels_independent() {
        // Left channel constant 0.5, right channel constant -0.5
        let samples: Vec<f32> = (0..32).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let result = resample_interleaved(&samples, 2, 16000, 32000);
        for frame in result.chunks_exact(2) {
            assert!((frame[0] - 0.5).abs() < 1e-6);
            assert!((frame[1] + 0.5).abs() < 1e-6);
        }
    }
}
