//! Live mixer shared between the frame loop and the audio device thread.
//!
//! [`Mixer`] is a cheap cloneable handle. The frame loop calls
//! [`play`](Mixer::play) / [`stop`](Mixer::stop); the device thread calls
//! [`fill`](Mixer::fill) once per output block. Both go through the same
//! `parking_lot` mutex, and lock order is always mixer then track.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::resources::audiotrack::TrackHandle;
use crate::systems::audio::{CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE};

/// Largest block, in frames, mixed in one pass. Longer `fill` requests are
/// mixed in several passes.
pub const MAX_BLOCK_FRAMES: usize = 1024;

/// What happens to non-looping tracks once they run out of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishedPolicy {
    /// Keep them in the active set, contributing silence, until `stop` is called.
    #[default]
    Keep,
    /// Drop them from the active set at the end of the pull that exhausted them.
    AutoStop,
}

/// How a track's layout maps onto the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Direct,
    MonoToStereo,
}

#[derive(Debug)]
struct MixerInput {
    track: TrackHandle,
    conversion: Conversion,
}

#[derive(Debug)]
struct MixerState {
    inputs: Vec<MixerInput>,
    channels: u16,
    gain: f32,
    policy: FinishedPolicy,
    /// Sized once for `MAX_BLOCK_FRAMES`; `fill` never grows it.
    scratch: Vec<f32>,
}

/// Cloneable handle to the set of audible tracks.
#[derive(Debug, Clone)]
pub struct Mixer {
    state: Arc<Mutex<MixerState>>,
    channels: u16,
    sample_rate: u32,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE)
    }
}

impl Mixer {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        Self {
            state: Arc::new(Mutex::new(MixerState {
                inputs: Vec::new(),
                channels,
                gain: 1.0,
                policy: FinishedPolicy::default(),
                scratch: vec![0.0; MAX_BLOCK_FRAMES * channels as usize],
            })),
            channels,
            sample_rate,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Start mixing `track`. Playing a track that is already audible does nothing.
    ///
    /// A finished non-looping track is rewound first. Mono tracks are duplicated
    /// to stereo outputs; any other layout mismatch is mixed unconverted.
    pub fn play(&self, track: &TrackHandle) {
        let (track_channels, finished) = track.with(|t| (t.channels(), t.is_finished()));

        let mut state = self.state.lock();
        if state.inputs.iter().any(|i| i.track.same_track(track)) {
            log::debug!("mixer: track already playing, ignoring");
            return;
        }

        let conversion = if track_channels == state.channels {
            Conversion::Direct
        } else if track_channels == 1 && state.channels == 2 {
            Conversion::MonoToStereo
        } else {
            log::warn!(
                "mixer: no conversion from {} to {} channels, mixing as-is",
                track_channels,
                state.channels
            );
            Conversion::Direct
        };

        if finished {
            track.rewind();
        }
        state.inputs.push(MixerInput {
            track: track.clone(),
            conversion,
        });
    }

    /// Stop mixing `track`; no-op if it is not playing.
    pub fn stop(&self, track: &TrackHandle) {
        self.state.lock().inputs.retain(|i| !i.track.same_track(track));
    }

    pub fn stop_all(&self) {
        self.state.lock().inputs.clear();
    }

    pub fn is_playing(&self, track: &TrackHandle) -> bool {
        self.state.lock().inputs.iter().any(|i| i.track.same_track(track))
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().inputs.len()
    }

    /// Output gain applied after summation.
    pub fn set_gain(&self, gain: f32) {
        self.state.lock().gain = gain.max(0.0);
    }

    pub fn gain(&self) -> f32 {
        self.state.lock().gain
    }

    pub fn set_policy(&self, policy: FinishedPolicy) {
        self.state.lock().policy = policy;
    }

    pub fn policy(&self) -> FinishedPolicy {
        self.state.lock().policy
    }

    /// Fill `out` (interleaved, output layout) with the sum of every active track.
    ///
    /// Called from the audio device thread, so nothing here allocates. Tracks
    /// that run short contribute silence for the rest of the block. No clipping
    /// is applied.
    pub fn fill(&self, out: &mut [f32]) {
        out.fill(0.0);

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let out_channels = state.channels as usize;
        let mut exhausted = false;

        for block in out.chunks_mut(MAX_BLOCK_FRAMES * out_channels) {
            exhausted |= mix_block(&state.inputs, &mut state.scratch, block, out_channels);
        }

        if state.gain != 1.0 {
            for o in out.iter_mut() {
                *o *= state.gain;
            }
        }

        if exhausted && state.policy == FinishedPolicy::AutoStop {
            state.inputs.retain(|i| !i.track.is_finished());
        }
    }
}

/// Add one block of every input into `out`. Returns whether any input ran short.
fn mix_block(inputs: &[MixerInput], scratch: &mut [f32], out: &mut [f32], out_channels: usize) -> bool {
    let frames = out.len() / out_channels;
    let mut exhausted = false;

    for input in inputs {
        let wanted = match input.conversion {
            Conversion::Direct => out.len(),
            Conversion::MonoToStereo => frames,
        };
        let scratch = &mut scratch[..wanted];

        let got = input.track.read(scratch);
        if got < wanted {
            exhausted = true;
        }

        match input.conversion {
            Conversion::Direct => {
                for (o, s) in out.iter_mut().zip(&scratch[..got]) {
                    *o += s;
                }
            }
            Conversion::MonoToStereo => {
                for (frame, s) in out.chunks_exact_mut(2).zip(&scratch[..got]) {
                    frame[0] += s;
                    frame[1] += s;
                }
            }
        }
    }
    exhausted
}
