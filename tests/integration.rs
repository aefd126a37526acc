//! Integration tests for block-audio.
//!
//! Everything here runs against [`MockBackend`], so no audio hardware is
//! needed; tests that open a real device live in the library's cpal module
//! and are marked `#[ignore]`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use block_audio::backend::MockBackend;
use block_audio::{
    audio_file_info, BlockAudio, BlockAudioError, SampleFormat, StreamEvent,
};
use tempfile::tempdir;

const FRAME_COUNT: usize = 128;

/// Writes a mono 16-bit WAV whose samples are all non-zero, so silence
/// introduced anywhere in the pipeline is detectable.
fn write_ramp_wav(dir: &Path, name: &str, frames: usize) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample((i % 1000) as i16 + 1).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn read_samples(path: &Path) -> Vec<i16> {
    hound::WavReader::open(path)
        .unwrap()
        .samples::<i16>()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn test_offline_identity_round_trip() {
    let dir = tempdir().unwrap();
    // 1000 is deliberately not a multiple of the block size, so the final
    // block is short and zero-padded
    let input = write_ramp_wav(dir.path(), "in.wav", 1000);
    let output = dir.path().join("out.wav");

    let mut stream = BlockAudio::builder()
        .offline(true)
        .format(SampleFormat::S16)
        .channels(1)
        .sample_rate(44_100)
        .frame_count(FRAME_COUNT)
        .input_file(&input)
        .output_file(&output)
        .build()
        .unwrap();

    assert!(stream.is_offline());
    assert_eq!(stream.format(), SampleFormat::S16);
    assert_eq!(stream.channels(), 1);
    assert_eq!(stream.sample_rate(), 44_100);
    assert_eq!(stream.frame_count(), FRAME_COUNT);
    assert!(!stream.is_started());

    stream
        .start(|input, output, _| {
            let input = input.unwrap();
            let mut output = output.unwrap();
            output.as_bytes_mut().copy_from_slice(input.as_bytes());
        })
        .unwrap();

    assert!(!stream.is_started());
    // Sample-for-sample identical, padded tail not written
    assert_eq!(read_samples(&output), read_samples(&input));
}

#[test]
fn test_offline_gain_transform() {
    let dir = tempdir().unwrap();
    let input = write_ramp_wav(dir.path(), "in.wav", 500);
    let output = dir.path().join("out.wav");

    let mut stream = BlockAudio::builder()
        .offline(true)
        .format(SampleFormat::S16)
        .channels(1)
        .frame_count(FRAME_COUNT)
        .input_file(&input)
        .output_file(&output)
        .build()
        .unwrap();

    stream
        .start(|input, output, _| {
            let input = input.unwrap();
            let mut output = output.unwrap();
            for (i, o) in input
                .samples::<i16>()
                .iter()
                .zip(output.samples_mut::<i16>())
            {
                *o = i / 2;
            }
        })
        .unwrap();

    let in_samples = read_samples(&input);
    let out_samples = read_samples(&output);
    assert_eq!(out_samples.len(), in_samples.len());
    for (i, o) in in_samples.iter().zip(&out_samples) {
        assert_eq!(*o, i / 2);
    }
}

#[test]
fn test_offline_stop_callback_and_restartability() {
    let dir = tempdir().unwrap();
    let input = write_ramp_wav(dir.path(), "in.wav", 256);
    let output = dir.path().join("out.wav");

    let stops = Arc::new(AtomicUsize::new(0));
    let stops_cb = Arc::clone(&stops);

    let mut stream = BlockAudio::builder()
        .offline(true)
        .format(SampleFormat::S16)
        .channels(1)
        .frame_count(FRAME_COUNT)
        .input_file(&input)
        .output_file(&output)
        .build()
        .unwrap();

    stream
        .start_with_stop_callback(
            |_, _, _| {},
            Arc::new(move || {
                stops_cb.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert!(!stream.is_started());
}

#[test]
fn test_online_duplex_without_files() {
    let mut stream = BlockAudio::builder()
        .format(SampleFormat::F32)
        .channels(2)
        .sample_rate(48_000)
        .frame_count(FRAME_COUNT)
        .backend(Box::new(MockBackend::new()))
        .build()
        .unwrap();

    assert!(!stream.is_offline());
    // Looping controls are no-ops with no input file attached
    assert!(!stream.is_looping());
    stream.set_looping(true);
    assert!(!stream.is_looping());

    let (tx, rx) = mpsc::channel();
    stream
        .start(move |input, output, frame_count| {
            assert!(input.is_some());
            assert!(output.is_some());
            assert_eq!(frame_count, FRAME_COUNT);
            let _ = tx.send(());
        })
        .unwrap();
    assert!(stream.is_started());

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    stream.stop().unwrap();
    assert!(!stream.is_started());
}

#[test]
fn test_online_file_playback_self_stops_at_end() {
    let dir = tempdir().unwrap();
    let input = write_ramp_wav(dir.path(), "in.wav", 512);

    let events = Arc::new(Mutex::new(Vec::new()));
    let events_cb = Arc::clone(&events);

    let mut stream = BlockAudio::builder()
        .format(SampleFormat::S16)
        .channels(1)
        .sample_rate(44_100)
        .frame_count(FRAME_COUNT)
        .input_file(&input)
        .backend(Box::new(MockBackend::new()))
        .event_callback(Arc::new(move |event| {
            events_cb.lock().unwrap().push(event);
        }))
        .build()
        .unwrap();

    let frames_seen = Arc::new(AtomicUsize::new(0));
    let frames_cb = Arc::clone(&frames_seen);
    let (stopped_tx, stopped_rx) = mpsc::channel();

    stream
        .start_with_stop_callback(
            move |input, _, _| {
                let input = input.unwrap();
                let non_zero = input.samples::<i16>().iter().filter(|&&s| s != 0).count();
                frames_cb.fetch_add(non_zero, Ordering::SeqCst);
            },
            Arc::new(move || {
                let _ = stopped_tx.send(());
            }),
        )
        .unwrap();

    // The stream notices exhaustion on the driver thread and stops itself;
    // the stop callback is the completion signal
    stopped_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(!stream.is_started());
    assert_eq!(frames_seen.load(Ordering::SeqCst), 512);
    assert!(events
        .lock()
        .unwrap()
        .contains(&StreamEvent::SourceExhausted));
}

#[test]
fn test_online_looping_plays_past_file_end() {
    let dir = tempdir().unwrap();
    let input = write_ramp_wav(dir.path(), "in.wav", 256);

    let mut stream = BlockAudio::builder()
        .format(SampleFormat::S16)
        .channels(1)
        .sample_rate(44_100)
        .frame_count(FRAME_COUNT)
        .input_file(&input)
        .looping_input_file(true)
        .backend(Box::new(MockBackend::new()))
        .build()
        .unwrap();
    assert!(stream.is_looping());

    let frames_seen = Arc::new(AtomicUsize::new(0));
    let frames_cb = Arc::clone(&frames_seen);
    let (tx, rx) = mpsc::channel();

    stream
        .start(move |input, _, _| {
            let input = input.unwrap();
            let non_zero = input.samples::<i16>().iter().filter(|&&s| s != 0).count();
            if frames_cb.fetch_add(non_zero, Ordering::SeqCst) + non_zero > 2 * 256 {
                let _ = tx.send(());
            }
        })
        .unwrap();

    // More than two file lengths of non-silent frames means the loop wrapped
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(stream.is_started());
    stream.stop().unwrap();
    assert!(!stream.is_started());
}

#[test]
fn test_online_recording_captures_transform_output() {
    let dir = tempdir().unwrap();
    let input = write_ramp_wav(dir.path(), "in.wav", 512);
    let output = dir.path().join("rec.wav");

    let mut stream = BlockAudio::builder()
        .format(SampleFormat::S16)
        .channels(1)
        .sample_rate(44_100)
        .frame_count(FRAME_COUNT)
        .input_file(&input)
        .output_file(&output)
        .backend(Box::new(MockBackend::new()))
        .build()
        .unwrap();

    let (stopped_tx, stopped_rx) = mpsc::channel();
    stream
        .start_with_stop_callback(
            |input, output, _| {
                let input = input.unwrap();
                let mut output = output.unwrap();
                output.as_bytes_mut().copy_from_slice(input.as_bytes());
            },
            Arc::new(move || {
                let _ = stopped_tx.send(());
            }),
        )
        .unwrap();

    stopped_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    drop(stream);

    // The recording contains the whole input, block-aligned, with any tail
    // blocks silent
    let recorded = read_samples(&output);
    assert!(recorded.len() >= 512);
    assert_eq!(recorded.len() % FRAME_COUNT, 0);
    let in_samples = read_samples(&input);
    assert_eq!(&recorded[..512], &in_samples[..]);
    assert!(recorded[512..].iter().all(|&s| s == 0));
}

#[test]
fn test_reentrant_stop_from_transform() {
    let mut stream = BlockAudio::builder()
        .frame_count(FRAME_COUNT)
        .sample_rate(48_000)
        .backend(Box::new(MockBackend::new()))
        .build()
        .unwrap();

    let handle = stream.stop_handle();
    let (stopped_tx, stopped_rx) = mpsc::channel();

    stream
        .start_with_stop_callback(
            move |_, _, _| {
                // Stop our own stream from inside the data callback
                handle.stop();
            },
            Arc::new(move || {
                let _ = stopped_tx.send(());
            }),
        )
        .unwrap();

    stopped_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(!stream.is_started());

    // A stream that stopped itself can be started again
    let (tx, rx) = mpsc::channel();
    stream
        .start(move |_, _, _| {
            let _ = tx.send(());
        })
        .unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    stream.stop().unwrap();
}

#[test]
fn test_audio_file_info_matches_written_file() {
    let dir = tempdir().unwrap();
    let input = write_ramp_wav(dir.path(), "in.wav", 777);

    let info = audio_file_info(&input).unwrap();
    assert_eq!(info.format, SampleFormat::S16);
    assert_eq!(info.channels, 1);
    assert_eq!(info.sample_rate, 44_100);
    assert_eq!(info.total_frame_count, 777);

    let err = audio_file_info(dir.path().join("missing.wav")).unwrap_err();
    assert!(matches!(err, BlockAudioError::Open { .. }));
}

#[test]
fn test_offline_format_conversion() {
    let dir = tempdir().unwrap();
    let input = write_ramp_wav(dir.path(), "in.wav", 400);
    let output = dir.path().join("out.wav");

    // Stream in f32 stereo although the file is s16 mono
    let mut stream = BlockAudio::builder()
        .offline(true)
        .format(SampleFormat::F32)
        .channels(2)
        .sample_rate(44_100)
        .frame_count(FRAME_COUNT)
        .input_file(&input)
        .output_file(&output)
        .build()
        .unwrap();

    stream
        .start(|input, output, _| {
            let input = input.unwrap();
            let mut output = output.unwrap();
            output.as_bytes_mut().copy_from_slice(input.as_bytes());
        })
        .unwrap();

    let info = audio_file_info(&output).unwrap();
    assert_eq!(info.format, SampleFormat::F32);
    assert_eq!(info.channels, 2);
    assert_eq!(info.total_frame_count, 400);
}
