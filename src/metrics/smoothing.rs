//! Rate smoothing ahead of the balance simulation.
//!
//! Physiological signals such as SmO2 acceleration are noisy enough that a
//! single spike would flip the depletion regime, so they are passed through a
//! trailing rolling mean first. The mean is undefined until a full window has
//! been seen; those leading values are back-filled with the first full-window
//! mean.

use std::collections::VecDeque;

use tracing::warn;

use super::analytics::Sample;

/// Default smoothing window in samples.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Rolling average calculator.
#[derive(Debug)]
pub struct RollingAverage {
    /// Buffer of recent values
    buffer: VecDeque<f64>,
    /// Window size in samples
    window_size: usize,
    /// Running sum for efficient calculation
    sum: f64,
}

impl RollingAverage {
    /// Create a new rolling average with the given window size.
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            buffer: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    /// Add a new value and return the current average.
    pub fn add(&mut self, value: f64) -> Option<f64> {
        self.buffer.push_back(value);
        self.sum += value;

        // Remove oldest if over window size
        if self.buffer.len() > self.window_size {
            if let Some(old) = self.buffer.pop_front() {
                self.sum -= old;
            }
        }

        self.average()
    }

    /// Get the current average without adding a value.
    pub fn average(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.sum / self.buffer.len() as f64)
        }
    }

    /// Check if the buffer is full (has enough samples for a valid average).
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.window_size
    }

    /// Reset the rolling average.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
    }

    /// Get the number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Full-window rolling mean followed by backward fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothingStage {
    window_size: usize,
}

impl SmoothingStage {
    /// Create a stage averaging over `window_size` samples (at least 1).
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }

    /// Window size in samples.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Smooth a sequence of values.
    ///
    /// Values before the first full window take the first full-window mean.
    /// A sequence shorter than the window has no defined mean at all and is
    /// returned unchanged.
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        let mut rolling = RollingAverage::new(self.window_size);
        let means: Vec<Option<f64>> = values
            .iter()
            .map(|&v| {
                let avg = rolling.add(v);
                if rolling.is_full() {
                    avg
                } else {
                    None
                }
            })
            .collect();

        let Some(first_defined) = means.iter().flatten().next().copied() else {
            if !values.is_empty() {
                warn!(
                    samples = values.len(),
                    window = self.window_size,
                    "series shorter than smoothing window, leaving it unsmoothed"
                );
            }
            return values.to_vec();
        };

        means
            .into_iter()
            .map(|m| m.unwrap_or(first_defined))
            .collect()
    }

    /// Smooth the rates of a sample series, keeping timestamps.
    pub fn apply_to_samples(&self, samples: &[Sample]) -> Vec<Sample> {
        let rates: Vec<f64> = samples.iter().map(|s| s.rate).collect();
        samples
            .iter()
            .zip(self.apply(&rates))
            .map(|(s, rate)| Sample::new(s.timestamp, rate))
            .collect()
    }
}

impl Default for SmoothingStage {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
