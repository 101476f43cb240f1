//! Scale - Mapping between display position and frequency.
//!
//! A display axis runs from 0 at [`FrequencyRange::lower_hz`] to 1 at
//! [`FrequencyRange::upper_hz`]. [`FrequencyScale::frequency`] turns a
//! position into Hz and [`FrequencyScale::position`] is its inverse. Positions
//! outside `[0, 1]` extrapolate.
//!
//! Mel uses `1127·ln(1 + f/700)`.

use crate::tracker::FrequencyRange;

const MEL_FACTOR: f64 = 1127.0;
const MEL_BREAK_HZ: f64 = 700.0;

/// Frequency axis layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FrequencyScale {
    /// Equal distance per octave.
    #[default]
    Log,
    /// Equal distance per Hz.
    Linear,
    /// Equal distance per mel.
    Mel,
}

#[inline]
fn hz_to_mel(hz: f64) -> f64 {
    MEL_FACTOR * (1.0 + hz / MEL_BREAK_HZ).ln()
}

#[inline]
fn mel_to_hz(mel: f64) -> f64 {
    MEL_BREAK_HZ * ((mel / MEL_FACTOR).exp() - 1.0)
}

impl FrequencyScale {
    /// Every scale, in menu order.
    pub const ALL: [FrequencyScale; 3] = [FrequencyScale::Log, FrequencyScale::Linear, FrequencyScale::Mel];

    /// Frequency at display position `x`.
    pub fn frequency(self, x: f64, range: FrequencyRange) -> f64 {
        let (a, b) = (range.lower_hz, range.upper_hz);
        match self {
            FrequencyScale::Log => {
                let (lower, upper) = (a.ln(), b.ln());
                (lower + x * (upper - lower)).exp()
            }
            FrequencyScale::Linear => a + x * (b - a),
            FrequencyScale::Mel => {
                let (lower, upper) = (hz_to_mel(a), hz_to_mel(b));
                mel_to_hz(lower + x * (upper - lower))
            }
        }
    }

    /// Display position of `frequency`.
    ///
    /// `NaN` for an empty range, or for a non-positive frequency on the log
    /// scale.
    pub fn position(self, frequency: f64, range: FrequencyRange) -> f64 {
        let (a, b) = (range.lower_hz, range.upper_hz);
        match self {
            FrequencyScale::Log => {
                let (lower, upper) = (a.ln(), b.ln());
                (frequency.ln() - lower) / (upper - lower)
            }
            FrequencyScale::Linear => (frequency - a) / (b - a),
            FrequencyScale::Mel => {
                let (lower, upper) = (hz_to_mel(a), hz_to_mel(b));
                (hz_to_mel(frequency) - lower) / (upper - lower)
            }
        }
    }
}

impl std::fmt::Display for FrequencyScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FrequencyScale::Log => "log",
            FrequencyScale::Linear => "linear",
            FrequencyScale::Mel => "mel",
        };
        f.write_str(name)
    }
}
