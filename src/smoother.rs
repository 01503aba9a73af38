//! Vertical signal smoothing
//!
//! A fixed-capacity window over the most recent valid vertical samples.
//! Eviction is oldest-first: once the window holds `capacity` values, every
//! push drops the value at the head. Frames without a signal never touch it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::DEFAULT_SMOOTH_WINDOW;
use crate::error::ConfigError;

/// Ordered window of recent samples, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SmoothingWindow {
    /// Create an empty window; a zero capacity is rejected
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidWindow(capacity));
        }
        Ok(Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a value, evicting the oldest when full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Arithmetic mean of the values currently held
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sum: f64 = self.values.iter().sum();
        Some(sum / self.values.len() as f64)
    }

    /// Smallest value currently held (highest point in image coordinates)
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    /// Value at the head of the window
    pub fn oldest(&self) -> Option<f64> {
        self.values.front().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}

/// Moving-average smoother gated on a full window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Smoother {
    window: SmoothingWindow,
}

impl Smoother {
    pub fn new(window_size: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            window: SmoothingWindow::new(window_size)?,
        })
    }

    /// Feed one frame's vertical value.
    ///
    /// `None` leaves the window untouched. A value is appended and the window
    /// mean is returned, but only once the window is full.
    pub fn push(&mut self, vertical: Option<f64>) -> Option<f64> {
        let value = vertical?;
        self.window.push(value);
        if self.window.is_full() {
            self.window.mean()
        } else {
            None
        }
    }

    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }

    /// Current mean if the window is full
    pub fn smoothed(&self) -> Option<f64> {
        if self.window.is_full() {
            self.window.mean()
        } else {
            None
        }
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self {
            window: SmoothingWindow {
                values: VecDeque::with_capacity(DEFAULT_SMOOTH_WINDOW),
                capacity: DEFAULT_SMOOTH_WINDOW,
            },
        }
    }
}
