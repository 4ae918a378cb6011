//! Streaming moving-average filter for probe readings.
//!
//! One window per monitored signal, alive for the whole process.  Storage
//! is a fixed [`heapless::Deque`]; the configured capacity may be smaller
//! and is validated once at boot.

use heapless::Deque;

use crate::error::FilterError;

/// Largest supported window.
pub const MAX_WINDOW: usize = 64;

/// Bounded FIFO of the most recent samples.
#[derive(Debug, Clone)]
pub struct MovingAverageWindow {
    capacity: usize,
    values: Deque<f32, MAX_WINDOW>,
}

impl MovingAverageWindow {
    pub fn new(capacity: usize) -> Result<Self, FilterError> {
        if capacity == 0 {
            return Err(FilterError::EmptyWindow);
        }
        if capacity > MAX_WINDOW {
            return Err(FilterError::CapacityTooLarge);
        }
        Ok(Self {
            capacity,
            values: Deque::new(),
        })
    }

    /// Append `value`, evicting the oldest sample once at capacity, and
    /// return the mean of the retained samples.
    pub fn push(&mut self, value: f32) -> f32 {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        // Cannot fail: capacity <= MAX_WINDOW and one slot was just freed.
        let _ = self.values.push_back(value);
        self.average().unwrap_or(value)
    }

    /// Mean of the retained samples; `None` before the first push.
    pub fn average(&self) -> Option<f32> {
        if self.values.is_empty() {
            return None;
        }
        let sum: f32 = self.values.iter().sum();
        Some(sum / self.values.len() as f32)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Retained samples, oldest first.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }
}
