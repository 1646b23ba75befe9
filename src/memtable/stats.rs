//! Rolling prune statistics

use std::collections::VecDeque;
use std::time::Duration;

/// Mean of the last `window` samples
#[derive(Debug)]
pub(crate) struct MovingAverage {
    window: usize,
    samples: VecDeque<Duration>,
    sum: Duration,
}

impl MovingAverage {
    pub(crate) fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            sum: Duration::ZERO,
        }
    }

    pub(crate) fn add(&mut self, sample: Duration) {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(sample);
        self.sum += sample;
    }

    /// Zero until the first sample
    pub(crate) fn average(&self) -> Duration {
        match self.samples.len() {
            0 => Duration::ZERO,
            n => self.sum / n as u32,
        }
    }
}
