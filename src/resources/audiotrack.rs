//! Decoded audio clips and their streaming read.
//!
//! A track keeps two buffers: the immutable decoded samples and a copy scaled
//! by the current volume. Volume changes rebuild the scaled copy once, so
//! [`AudioTrack::read`] is a plain memcpy with no per-sample multiply.
//!
//! All positions and counts are in interleaved samples (one frame of stereo
//! audio is two samples).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;
use crate::systems::audio::{CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE, Decoder, to_canonical};

/// A fully-buffered audio clip with a read cursor.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    original: Arc<[f32]>,
    data: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    volume: f32,
    looping: bool,
    cursor: usize,
    finished: bool,
}

impl AudioTrack {
    /// Wrap interleaved samples at the canonical sample rate.
    ///
    /// `channels` is the layout of `samples`; the mixer converts mono to stereo
    /// when it plays the track.
    pub fn from_samples(samples: Vec<f32>, channels: u16) -> Self {
        let original: Arc<[f32]> = samples.into();
        Self {
            data: original.to_vec(),
            original,
            channels: channels.max(1),
            sample_rate: CANONICAL_SAMPLE_RATE,
            volume: 1.0,
            looping: false,
            cursor: 0,
            finished: false,
        }
    }

    /// Decode `path` eagerly and normalise it to 44.1 kHz stereo.
    pub fn load(path: impl AsRef<Path>, decoder: &dyn Decoder) -> Result<Self> {
        let path = path.as_ref();
        let decoded = decoder.decode(path)?;
        let samples = to_canonical(&decoded);
        log::debug!(
            "loaded track '{}' ({} Hz, {} ch -> {} samples)",
            path.display(),
            decoded.sample_rate,
            decoded.channels,
            samples.len()
        );
        Ok(Self::from_samples(samples, CANONICAL_CHANNELS))
    }

    /// Copy up to `out.len()` samples starting at the cursor.
    ///
    /// Looping tracks wrap sample-exactly and always fill `out`. Non-looping
    /// tracks return a short count at the end of data; the cursor then resets to
    /// 0 and every later read returns 0 until [`rewind`](Self::rewind).
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        if self.finished {
            return 0;
        }

        let mut written = 0;
        while written < out.len() {
            if self.cursor >= self.data.len() {
                self.cursor = 0;
                if !self.looping || self.data.is_empty() {
                    self.finished = true;
                    break;
                }
            }
            let n = (self.data.len() - self.cursor).min(out.len() - written);
            out[written..written + n].copy_from_slice(&self.data[self.cursor..self.cursor + n]);
            self.cursor += n;
            written += n;
        }
        written
    }

    /// Rebuild the scaled buffer as `original * volume`.
    pub fn set_volume(&mut self, volume: f32) {
        self.data.clear();
        self.data.extend(self.original.iter().map(|s| s * volume));
        self.volume = volume;
    }

    /// Swap in a scaled buffer computed elsewhere from [`original`](Self::original).
    fn install_scaled(&mut self, volume: f32, data: Vec<f32>) {
        if data.len() == self.original.len() {
            self.data = data;
            self.volume = volume;
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Move the cursor back to the start and clear the end-of-data latch.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.finished = false;
    }

    /// True once a non-looping track has been read past its end.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total samples (all channels).
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        let frames = self.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    /// The unscaled decoded samples.
    pub fn original(&self) -> &Arc<[f32]> {
        &self.original
    }
}

/// Shared handle to an [`AudioTrack`], usable from the frame loop and the mixer thread.
///
/// Two handles are the same track when they point at the same allocation.
#[derive(Debug, Clone)]
pub struct TrackHandle(Arc<Mutex<AudioTrack>>);

impl TrackHandle {
    pub fn new(track: AudioTrack) -> Self {
        Self(Arc::new(Mutex::new(track)))
    }

    /// Decode `path` and wrap the result.
    pub fn load(path: impl AsRef<Path>, decoder: &dyn Decoder) -> Result<Self> {
        AudioTrack::load(path, decoder).map(Self::new)
    }

    /// Change the volume without holding the lock for the O(n) rewrite.
    ///
    /// The scaled buffer is built from a clone of the immutable original and
    /// swapped in under a short lock, so a concurrent mixer pull never waits on it.
    pub fn set_volume(&self, volume: f32) {
        let original = Arc::clone(self.0.lock().original());
        let scaled: Vec<f32> = original.iter().map(|s| s * volume).collect();
        self.0.lock().install_scaled(volume, scaled);
    }

    pub fn volume(&self) -> f32 {
        self.0.lock().volume()
    }

    pub fn set_looping(&self, looping: bool) {
        self.0.lock().set_looping(looping);
    }

    pub fn is_looping(&self) -> bool {
        self.0.lock().is_looping()
    }

    pub fn rewind(&self) {
        self.0.lock().rewind();
    }

    pub fn is_finished(&self) -> bool {
        self.0.lock().is_finished()
    }

    pub fn channels(&self) -> u16 {
        self.0.lock().channels()
    }

    pub fn duration(&self) -> Duration {
        self.0.lock().duration()
    }

    pub fn read(&self, out: &mut [f32]) -> usize {
        self.0.lock().read(out)
    }

    /// Run `f` with the track locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut AudioTrack) -> R) -> R {
        f(&mut self.0.lock())
    }

    pub fn same_track(&self, other: &TrackHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
