//! Audio pipeline integration tests: WAV on disk -> decoder -> track -> mixer.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use approx::assert_abs_diff_eq;

use spork::error::EngineError;
use spork::resources::audiotrack::TrackHandle;
use spork::resources::mixer::{FinishedPolicy, Mixer};
use spork::systems::audio::{CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE, WavDecoder};

fn write_int_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize, value: i16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..frames * channels as usize {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

fn write_float_wav(path: &Path, frames: usize, value: f32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: CANONICAL_SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..frames * 2 {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn mono_wav_is_normalised_to_canonical_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blip.wav");
    write_int_wav(&path, 1, 22_050, 1_000, 16_384);

    let track = TrackHandle::load(&path, &WavDecoder).unwrap();
    assert_eq!(track.channels(), CANONICAL_CHANNELS);
    track.with(|t| {
        assert_eq!(t.sample_rate(), CANONICAL_SAMPLE_RATE);
        assert_eq!(t.len(), 4_000);
        assert!(t.original().iter().all(|s| (s - 0.5).abs() < 1e-6));
    });
    assert_abs_diff_eq!(
        track.duration().as_secs_f64(),
        1_000.0 / 22_050.0,
        epsilon = 1e-4
    );
}

#[test]
fn missing_or_corrupt_files_are_decode_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("nope.wav");
    let err = TrackHandle::load(&missing, &WavDecoder).unwrap_err();
    assert!(matches!(err, EngineError::Decode { .. }));

    let corrupt = dir.path().join("corrupt.wav");
    std::fs::write(&corrupt, b"definitely not RIFF").unwrap();
    let err = TrackHandle::load(&corrupt, &WavDecoder).unwrap_err();
    match err {
        EngineError::Decode { path, .. } => assert!(path.ends_with("corrupt.wav")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn music_and_effect_mix_then_effect_drops_out() {
    let dir = tempfile::tempdir().unwrap();
    let music_path = dir.path().join("music.wav");
    let effect_path = dir.path().join("effect.wav");
    write_float_wav(&music_path, 256, 0.5);
    write_float_wav(&effect_path, 100, 0.25);

    let music = TrackHandle::load(&music_path, &WavDecoder).unwrap();
    let effect = TrackHandle::load(&effect_path, &WavDecoder).unwrap();
    music.set_looping(true);

    let mixer = Mixer::default();
    mixer.play(&music);
    mixer.play(&effect);

    // 200 frames: the effect covers the first 100.
    let mut out = vec![0.0f32; 400];
    mixer.fill(&mut out);
    for frame in out[..200].chunks_exact(2) {
        assert_abs_diff_eq!(frame[0], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(frame[1], 0.75, epsilon = 1e-6);
    }
    for s in &out[200..] {
        assert_abs_diff_eq!(*s, 0.5, epsilon = 1e-6);
    }

    // Finished but kept: it stays in the mix, silent.
    assert!(effect.is_finished());
    assert!(mixer.is_playing(&effect));

    // The music loops seamlessly past its end.
    mixer.fill(&mut out);
    assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-6));

    // Replaying a finished effect starts it over.
    mixer.stop(&effect);
    mixer.play(&effect);
    assert!(!effect.is_finished());
    mixer.fill(&mut out);
    assert_abs_diff_eq!(out[0], 0.75, epsilon = 1e-6);
}

#[test]
fn auto_stop_removes_finished_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot.wav");
    write_float_wav(&path, 10, 0.25);

    let mixer = Mixer::default();
    mixer.set_policy(FinishedPolicy::AutoStop);
    let shot = TrackHandle::load(&path, &WavDecoder).unwrap();
    mixer.play(&shot);

    let mut out = vec![0.0f32; 64];
    mixer.fill(&mut out);
    assert!(!mixer.is_playing(&shot));
    assert_eq!(mixer.active_count(), 0);
}

#[test]
fn volume_changes_while_device_thread_mixes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loop.wav");
    write_float_wav(&path, 4_096, 0.5);

    let track = TrackHandle::load(&path, &WavDecoder).unwrap();
    track.set_looping(true);
    let mixer = Mixer::default();
    mixer.play(&track);

    let running = Arc::new(AtomicBool::new(true));
    let device = {
        let mixer = mixer.clone();
        let running = running.clone();
        thread::spawn(move || {
            let mut block = vec![0.0f32; 1024];
            let mut blocks = 0usize;
            while running.load(Ordering::Relaxed) {
                mixer.fill(&mut block);
                blocks += 1;
            }
            blocks
        })
    };

    for step in 0..=10 {
        track.set_volume(step as f32 / 10.0);
        thread::sleep(Duration::from_millis(1));
    }
    running.store(false, Ordering::Relaxed);
    assert!(device.join().unwrap() > 0);

    let mut out = vec![0.0f32; 8];
    mixer.fill(&mut out);
    assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-6));
}
