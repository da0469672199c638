use std::{collections::VecDeque, time::Duration};

use web_time::Instant;

pub const DEFAULT_SAMPLES: usize = 60;

/// Rolling window of recent frame timings shown in the overlay.
#[derive(Debug)]
pub struct PerformanceTracker {
    samples: usize,
    frame_time: VecDeque<Duration>,
    frame_timestamp: VecDeque<Instant>,
    frame_time_sum: Duration,
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLES)
    }
}

impl PerformanceTracker {
    pub fn new(samples: usize) -> Self {
        Self {
            samples: samples.max(1),
            frame_time: VecDeque::new(),
            frame_timestamp: VecDeque::new(),
            frame_time_sum: Duration::ZERO,
        }
    }

    pub fn last_frame_time(&self) -> Option<Duration> {
        self.frame_time.back().copied()
    }

    pub fn avg_frame_time(&self) -> Option<Duration> {
        if self.frame_time.is_empty() {
            None
        } else {
            Some(self.frame_time_sum / self.frame_time.len() as u32)
        }
    }

    pub fn add_sample(&mut self, frame_time: Duration, frame_timestamp: Instant) {
        self.frame_time.push_back(frame_time);
        self.frame_time_sum += frame_time;
        while self.frame_time.len() > self.samples {
            if let Some(oldest) = self.frame_time.pop_front() {
                self.frame_time_sum -= oldest;
            }
        }

        self.frame_timestamp.push_back(frame_timestamp);
        while self.frame_timestamp.len() > self.samples {
            self.frame_timestamp.pop_front();
        }
    }

    pub fn fps(&self) -> Option<f32> {
        let first = self.frame_timestamp.front()?;
        let last = self.frame_timestamp.back()?;
        if first == last {
            return None;
        }
        let intervals = (self.frame_timestamp.len() - 1) as f32;
        let avg_interval = (*last - *first).as_secs_f32() / intervals;
        Some(1.0 / avg_interval)
    }
}
