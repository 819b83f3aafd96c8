// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::{Duration, Instant};

/// A restartable stopwatch used by the game loop's activity timers and by
/// the diagnostics monitors to measure callback durations.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Creates a new stopwatch, started at the moment of creation.
    #[inline]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Returns the elapsed time since the stopwatch was started or last
    /// restarted.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the elapsed time in whole milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Returns the elapsed time in fractional milliseconds, for
    /// sub-millisecond callback timing.
    #[inline]
    pub fn elapsed_ms_f64(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the elapsed time in seconds as `f64`.
    #[inline]
    pub fn elapsed_secs_f64(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Restarts the stopwatch from now.
    #[inline]
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn stopwatch_starts_near_zero() {
        let watch = Stopwatch::new();
        assert!(
            watch.elapsed() < Duration::from_millis(50),
            "Initial elapsed ({:?}) should be very small",
            watch.elapsed()
        );
    }

    #[test]
    fn stopwatch_measures_a_delay() {
        let watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(30));
        assert!(
            watch.elapsed_ms() >= 30,
            "Elapsed ms ({}) should cover the sleep",
            watch.elapsed_ms()
        );
        assert!(watch.elapsed_ms_f64() >= 30.0);
        assert!(watch.elapsed_secs_f64() >= 0.03);
    }

    #[test]
    fn restart_resets_the_origin() {
        let mut watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(20));
        watch.restart();
        assert!(
            watch.elapsed() < Duration::from_millis(15),
            "Elapsed after restart ({:?}) should be near zero",
            watch.elapsed()
        );
    }
}
