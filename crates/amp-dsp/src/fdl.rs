//! Frequency-domain delay line
//!
//! Fixed-capacity ring of input spectra, newest first. Slots are allocated
//! once; `push` copies into the oldest slot and moves the head.

use rustfft::num_complex::Complex;

use amp_core::Sample;

#[derive(Debug, Clone)]
pub struct FrequencyDelayLine {
    slots: Vec<Vec<Complex<Sample>>>,
    /// Index of the newest slot
    head: usize,
}

impl FrequencyDelayLine {
    /// `len` slots of `bins` zeroed bins each
    pub fn new(len: usize, bins: usize) -> Self {
        Self {
            slots: vec![vec![Complex::new(0.0, 0.0); bins]; len],
            head: 0,
        }
    }

    /// Insert a new spectrum at the front, evicting the oldest
    pub fn push(&mut self, spectrum: &[Complex<Sample>]) {
        if self.slots.is_empty() {
            return;
        }
        self.head = if self.head == 0 {
            self.slots.len() - 1
        } else {
            self.head - 1
        };
        self.slots[self.head].copy_from_slice(spectrum);
    }

    /// The `p`-th most recent spectrum (0 = newest)
    #[inline]
    pub fn at(&self, p: usize) -> &[Complex<Sample>] {
        let idx = (self.head + p) % self.slots.len();
        &self.slots[idx]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.fill(Complex::new(0.0, 0.0));
        }
        self.head = 0;
    }
}
