//! Sound - Recorded audio as input for offline analysis.
//!
//! The analysis core works on blocks handed to it by a capture loop. A
//! [`Sound`] stands in for that loop when the audio comes from a file: it
//! loads a WAV with `hound` and slices it into overlapping blocks.
//!
//! # Mono Audio Only
//!
//! Multi-channel files are rejected by [`Sound::from_file`]; pick a channel
//! explicitly with [`Sound::from_file_channel`].
//!
//! # Sample Format
//!
//! Integer samples are scaled to `[-1.0, 1.0]` by `2^(bits-1)`; float
//! samples are taken as they are.

use std::path::Path;

use ndarray::ArrayView1;

use crate::analyzer::{AnalysisResult, Analyzer};
use crate::error::{Error, Result};
use crate::settings::Settings;

/// Mono audio samples with their sample rate.
///
/// # Example
///
/// ```no_run
/// use pitchscope::{Settings, Sound};
///
/// let sound = Sound::from_file("voice.wav").unwrap();
/// let results = sound.analyze(Settings::default(), 1024).unwrap();
/// println!("{} frames over {:.2}s", results.len(), sound.duration());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    samples: Vec<f32>,
    sample_rate: f64,
}

/// Interleaved samples of every channel, normalised to f32.
fn read_interleaved<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, hound::WavSpec)> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| (v as f64 / max_val) as f32))
                .collect::<std::result::Result<Vec<f32>, _>>()?
        }
    };

    Ok((samples, spec))
}

impl Sound {
    /// Create a Sound from samples and sample rate.
    pub fn new(samples: Vec<f32>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create a Sound by copying a slice.
    pub fn from_slice(samples: &[f32], sample_rate: f64) -> Self {
        Self::new(samples.to_vec(), sample_rate)
    }

    /// Load a mono WAV file.
    ///
    /// # Errors
    ///
    /// - `Error::NotMono` if the file has more than one channel
    /// - `Error::AudioRead` if the file cannot be decoded
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (samples, spec) = read_interleaved(path)?;
        if spec.channels != 1 {
            return Err(Error::NotMono(spec.channels));
        }
        Ok(Self::new(samples, spec.sample_rate as f64))
    }

    /// Load one channel of a WAV file (0 = left).
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` if the channel does not exist
    /// - `Error::AudioRead` if the file cannot be decoded
    pub fn from_file_channel<P: AsRef<Path>>(path: P, channel: usize) -> Result<Self> {
        let (all_samples, spec) = read_interleaved(path)?;
        let n_channels = spec.channels as usize;
        if channel >= n_channels {
            return Err(Error::InvalidParameter(format!(
                "Channel {} does not exist. File has {} channels.",
                channel, n_channels
            )));
        }

        let samples = all_samples
            .iter()
            .skip(channel)
            .step_by(n_channels)
            .copied()
            .collect();
        Ok(Self::new(samples, spec.sample_rate as f64))
    }

    /// The samples.
    #[inline]
    pub fn samples(&self) -> ArrayView1<'_, f32> {
        ArrayView1::from(self.samples.as_slice())
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Duration in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate
    }

    /// Blocks of `size` samples starting every `hop` samples.
    ///
    /// A trailing partial block is not produced.
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` if `size` or `hop` is zero.
    pub fn frames(&self, size: usize, hop: usize) -> Result<impl Iterator<Item = &[f32]> + '_> {
        if size == 0 || hop == 0 {
            return Err(Error::InvalidParameter(format!(
                "frame size and hop must be positive, got {} and {}",
                size, hop
            )));
        }
        Ok(self.samples.windows(size).step_by(hop))
    }

    /// Run a fresh [`Analyzer`] over every block, `hop` samples apart.
    ///
    /// # Returns
    ///
    /// One result per block, in time order.
    pub fn analyze(&self, settings: Settings, hop: usize) -> Result<Vec<AnalysisResult>> {
        let mut analyzer = Analyzer::new(settings)?;
        let size = analyzer.fft_size();

        let mut results = Vec::new();
        for block in self.frames(size, hop)? {
            results.push(analyzer.process(block, self.sample_rate)?.clone());
        }
        Ok(results)
    }
}

impl std::fmt::Display for Sound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sound({} samples, {} Hz, {:.3}s)",
            self.n_samples(),
            self.sample_rate,
            self.duration()
        )
    }
}
