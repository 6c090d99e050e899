//! Audio decoding, format normalisation and the output device.
//!
//! Every asset is decoded eagerly and normalised to the canonical format
//! (44.1 kHz, stereo, f32) before it becomes an
//! [`AudioTrack`](crate::resources::audiotrack::AudioTrack):
//! - [`WavDecoder`] reads WAV through `hound` and is always available.
//! - `RodioDecoder` (feature `rodio`) handles WAV/OGG/MP3/FLAC through rodio's
//!   symphonia-backed decoder and its own resampler.
//!
//! The live side is `MixerSource`, a rodio `Source` that pulls blocks from the
//! [`Mixer`](crate::resources::mixer::Mixer) on the device thread.

use std::path::Path;

use crate::error::{EngineError, Result};

/// Sample rate every track is normalised to.
pub const CANONICAL_SAMPLE_RATE: u32 = 44_100;
/// Channel count every decoded track is normalised to.
pub const CANONICAL_CHANNELS: u16 = 2;

/// Raw decoder output, before normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1, 1].
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Turns an asset path into samples.
pub trait Decoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio>;
}

/// Normalise decoded audio to 44.1 kHz stereo.
///
/// Mono is duplicated to both channels; anything wider keeps its first two
/// channels. Rate conversion is linear interpolation between frames.
pub fn to_canonical(audio: &DecodedAudio) -> Vec<f32> {
    let channels = audio.channels.max(1) as usize;
    let frames = audio.samples.len() / channels;

    let stereo: Vec<[f32; 2]> = (0..frames)
        .map(|f| {
            let frame = &audio.samples[f * channels..(f + 1) * channels];
            match frame {
                [mono] => [*mono, *mono],
                [left, right, ..] => [*left, *right],
                [] => [0.0, 0.0],
            }
        })
        .collect();

    let resampled = resample_linear(&stereo, audio.sample_rate, CANONICAL_SAMPLE_RATE);
    resampled.into_iter().flatten().collect()
}

fn resample_linear(frames: &[[f32; 2]], from_rate: u32, to_rate: u32) -> Vec<[f32; 2]> {
    if from_rate == to_rate || from_rate == 0 || frames.is_empty() {
        return frames.to_vec();
    }

    let out_len = (frames.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;
    let last = frames.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let next = (idx + 1).min(last);
            let t = (pos - idx as f64) as f32;
            let (a, b) = (frames[idx], frames[next]);
            [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
        })
        .collect()
}

/// WAV decoder backed by `hound`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl Decoder for WavDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio> {
        let name = path.display().to_string();
        let mut reader = hound::WavReader::open(path).map_err(|e| EngineError::decode(&name, e))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| EngineError::decode(&name, e))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| EngineError::decode(&name, e))?
            }
        };

        if spec.channels == 0 {
            return Err(EngineError::decode(name, "zero channels"));
        }

        Ok(DecodedAudio {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }
}

#[cfg(feature = "rodio")]
pub use self::device::{MixerSource, RodioDecoder, RodioOutput};

#[cfg(feature = "rodio")]
mod device {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use std::time::Duration;

    use rodio::source::UniformSourceIterator;
    use rodio::{OutputStream, Sink, Source};

    use super::{CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE, DecodedAudio, Decoder};
    use crate::error::{EngineError, Result};
    use crate::resources::mixer::{MAX_BLOCK_FRAMES, Mixer};
    use crate::systems::frameloop::AudioOutput;

    /// Multi-format decoder; resamples straight to the canonical format.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RodioDecoder;

    impl Decoder for RodioDecoder {
        fn decode(&self, path: &Path) -> Result<DecodedAudio> {
            let name = path.display().to_string();
            let file = File::open(path).map_err(|e| EngineError::decode(&name, e))?;
            let source =
                rodio::Decoder::new(BufReader::new(file)).map_err(|e| EngineError::decode(&name, e))?;
            let uniform: UniformSourceIterator<_, f32> =
                UniformSourceIterator::new(source, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE);
            Ok(DecodedAudio {
                samples: uniform.collect(),
                channels: CANONICAL_CHANNELS,
                sample_rate: CANONICAL_SAMPLE_RATE,
            })
        }
    }

    /// Endless rodio source reading from the mixer in blocks.
    ///
    /// The mixer lock is taken once per block, not per sample.
    pub struct MixerSource {
        mixer: Mixer,
        buffer: Vec<f32>,
        pos: usize,
    }

    impl MixerSource {
        pub fn new(mixer: Mixer) -> Self {
            let block = MAX_BLOCK_FRAMES * mixer.channels() as usize;
            Self {
                mixer,
                buffer: vec![0.0; block],
                pos: block,
            }
        }
    }

    impl Iterator for MixerSource {
        type Item = f32;

        fn next(&mut self) -> Option<f32> {
            if self.pos >= self.buffer.len() {
                self.mixer.fill(&mut self.buffer);
                self.pos = 0;
            }
            let sample = self.buffer[self.pos];
            self.pos += 1;
            Some(sample)
        }
    }

    impl Source for MixerSource {
        fn current_frame_len(&self) -> Option<usize> {
            Some(self.buffer.len() - self.pos.min(self.buffer.len()))
        }

        fn channels(&self) -> u16 {
            self.mixer.channels()
        }

        fn sample_rate(&self) -> u32 {
            self.mixer.sample_rate()
        }

        fn total_duration(&self) -> Option<Duration> {
            None
        }
    }

    /// Default output device playing a [`MixerSource`].
    pub struct RodioOutput {
        _stream: OutputStream,
        sink: Sink,
    }

    impl RodioOutput {
        pub fn open(mixer: &Mixer) -> Result<Self> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| EngineError::DeviceInit(format!("audio stream: {e}")))?;
            let sink = Sink::try_new(&handle)
                .map_err(|e| EngineError::DeviceInit(format!("audio sink: {e}")))?;
            sink.append(MixerSource::new(mixer.clone()));
            log::info!(
                "audio device open ({} Hz, {} ch)",
                mixer.sample_rate(),
                mixer.channels()
            );
            Ok(Self {
                _stream: stream,
                sink,
            })
        }
    }

    impl AudioOutput for RodioOutput {
        fn shutdown(&mut self) {
            self.sink.stop();
            log::info!("audio device closed");
        }
    }
}
