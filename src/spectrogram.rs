//! Spectrogram - Rolling history of decibel spectra.
//!
//! [`HistoryRing`] keeps the most recent `capacity` spectra in one contiguous
//! `capacity × bin_count` block, so a renderer can upload it as a single
//! texture and scroll by the write offset instead of moving data.
//!
//! # Layout
//!
//! - Row `r` holds one spectrum, `values[[r, bin]]` in dB
//! - `offset` is the row the next push writes, modulo capacity
//! - Rows not yet written hold `-inf` (silence)
//!
//! The newest row is therefore `offset - 1` and the oldest is `offset` once
//! the ring has wrapped.

use ndarray::{Array2, ArrayView1};

use crate::error::{Error, Result};

/// Fixed-capacity circular buffer of spectra.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRing {
    /// Spectra (capacity × bin_count).
    values: Array2<f32>,

    /// Next row to write.
    offset: usize,

    /// Rows written so far, saturating at capacity.
    filled: usize,
}

impl HistoryRing {
    /// Create a ring of `capacity` rows of `bin_count` bins, all `-inf`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` if either dimension is zero.
    pub fn new(capacity: usize, bin_count: usize) -> Result<Self> {
        if capacity == 0 || bin_count == 0 {
            return Err(Error::InvalidParameter(format!(
                "history ring needs non-zero dimensions, got {} × {}",
                capacity, bin_count
            )));
        }

        Ok(Self {
            values: Array2::from_elem((capacity, bin_count), f32::NEG_INFINITY),
            offset: 0,
            filled: 0,
        })
    }

    /// Number of rows.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.nrows()
    }

    /// Bins per row.
    #[inline]
    pub fn bin_count(&self) -> usize {
        self.values.ncols()
    }

    /// Row the next push will write.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Rows written so far (at most `capacity`).
    #[inline]
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Whether nothing has been pushed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// The whole block in storage order.
    ///
    /// Access a bin with `values()[[row, bin]]`.
    #[inline]
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// Write one spectrum and advance the offset.
    ///
    /// # Errors
    ///
    /// `Error::DimensionMismatch` if `row.len() != bin_count`.
    pub fn push(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.bin_count() {
            return Err(Error::DimensionMismatch {
                expected: self.bin_count(),
                got: row.len(),
            });
        }

        self.values
            .row_mut(self.offset)
            .iter_mut()
            .zip(row)
            .for_each(|(dst, &src)| *dst = src);
        self.offset = (self.offset + 1) % self.capacity();
        self.filled = (self.filled + 1).min(self.capacity());
        Ok(())
    }

    /// Spectrum written `age` pushes ago (0 = newest).
    pub fn row_by_age(&self, age: usize) -> Option<ArrayView1<'_, f32>> {
        if age >= self.filled {
            return None;
        }
        let capacity = self.capacity();
        let row = (self.offset + capacity - 1 - age) % capacity;
        Some(self.values.row(row))
    }

    /// Most recent spectrum.
    #[inline]
    pub fn latest(&self) -> Option<ArrayView1<'_, f32>> {
        self.row_by_age(0)
    }

    /// Written spectra, newest first.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> + '_ {
        (0..self.filled).filter_map(move |age| self.row_by_age(age))
    }

    /// Reset every row to `-inf` and the offset to 0.
    pub fn clear(&mut self) {
        self.values.fill(f32::NEG_INFINITY);
        self.offset = 0;
        self.filled = 0;
    }
}
