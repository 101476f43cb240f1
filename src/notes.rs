//! Notes - Equal-tempered note table for labelling frequencies.
//!
//! The table covers 84 notes from A1 (55 Hz) through G#7, tuned to
//! A4 = 440 Hz. Octave numbers advance at A, so the note after G#3 is A4.

use std::fmt;
use std::sync::OnceLock;

/// Note names within one octave, starting at A.
pub const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// Concert pitch.
pub const A4_HZ: f64 = 440.0;

const FIRST_OCTAVE: u8 = 1;
const OCTAVES: u8 = 7;

/// One entry of the note table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Note {
    /// Frequency in Hz.
    pub frequency_hz: f64,
    /// Name without octave, e.g. `"C#"`.
    pub name: &'static str,
    /// Octave number.
    pub octave: u8,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// The full note table, ascending, built on first use.
pub fn notes() -> &'static [Note] {
    static NOTES: OnceLock<Vec<Note>> = OnceLock::new();
    NOTES.get_or_init(|| {
        (FIRST_OCTAVE..FIRST_OCTAVE + OCTAVES)
            .flat_map(|octave| {
                NOTE_NAMES.iter().enumerate().map(move |(j, &name)| Note {
                    frequency_hz: A4_HZ * 2f64.powf(octave as f64 - 4.0 + j as f64 / 12.0),
                    name,
                    octave,
                })
            })
            .collect()
    })
}

/// Closest note to `frequency`, clamped to the ends of the table.
///
/// Returns `None` for non-positive or non-finite frequencies.
pub fn nearest_note(frequency: f64) -> Option<&'static Note> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return None;
    }

    let table = notes();
    let offset = (FIRST_OCTAVE as f64 - 4.0) * -12.0;
    let index = (12.0 * (frequency / A4_HZ).log2() + offset).round();
    let index = index.clamp(0.0, (table.len() - 1) as f64) as usize;
    table.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_layout() {
        let table = notes();
        assert_eq!(table.len(), 84);
        assert_eq!(table[0].to_string(), "A1");
        assert!((table[0].frequency_hz - 55.0).abs() < 1e-9);
        assert_eq!(table[table.len() - 1].to_string(), "G#7");
        for pair in table.windows(2) {
            assert!(pair[0].frequency_hz < pair[1].frequency_hz);
        }
    }

    #[test]
    fn test_nearest_note() {
        assert_eq!(nearest_note(440.0).unwrap().to_string(), "A4");
        // Octaves count from A, so middle C sits in octave 3
        assert_eq!(nearest_note(261.0).unwrap().to_string(), "C3");
        assert_eq!(nearest_note(225.0).unwrap().to_string(), "A3");
        // Quarter tone above A4 rounds up to A#4
        assert_eq!(nearest_note(440.0 * 2f64.powf(0.6 / 12.0)).unwrap().to_string(), "A#4");
    }

    #[test]
    fn test_nearest_note_clamps() {
        assert_eq!(nearest_note(10.0).unwrap().to_string(), "A1");
        assert_eq!(nearest_note(20_000.0).unwrap().to_string(), "G#7");
        assert!(nearest_note(0.0).is_none());
        assert!(nearest_note(f64::NAN).is_none());
    }
}
