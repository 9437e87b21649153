//! Wall-clock timers for host-side phases (upload, launch, download)

use std::time::Instant;

/// Timer for one host phase
///
/// # Example
///
/// ```rust
/// use pim_mha::profiling::PhaseTimer;
///
/// let mut timer = PhaseTimer::for_phase("upload");
/// timer.start();
/// // ... copy tensors ...
/// timer.stop();
/// assert!(timer.elapsed_ms().is_some());
/// ```
#[derive(Debug)]
pub struct PhaseTimer {
    name: String,
    start: Option<Instant>,
    elapsed_ms: Option<f64>,
}

impl PhaseTimer {
    pub fn for_phase(name: impl Into<String>) -> Self {
        PhaseTimer {
            name: name.into(),
            start: None,
            elapsed_ms: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
        self.elapsed_ms = None;
    }

    /// Stop the timer; a timer that was never started stays empty
    pub fn stop(&mut self) {
        if let Some(start) = self.start.take() {
            let ms = start.elapsed().as_secs_f64() * 1e3;
            tracing::debug!("phase '{}' took {:.3} ms", self.name, ms);
            self.elapsed_ms = Some(ms);
        }
    }

    /// Elapsed milliseconds, once stopped
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.elapsed_ms
    }

    /// Run `f` inside the timer
    pub fn time<R>(&mut self, f: impl FnOnce() -> R) -> R {
        self.start();
        let out = f();
        self.stop();
        out
    }
}

/// Logs the time from creation until drop
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        ScopedTimer {
            name,
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1e3
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        tracing::debug!("'{}' finished in {:.3} ms", self.name, self.elapsed_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_phase_timer() {
        let mut timer = PhaseTimer::for_phase("launch");
        assert_eq!(timer.name(), "launch");
        assert!(timer.elapsed_ms().is_none());

        timer.start();
        std::thread::sleep(Duration::from_millis(2));
        timer.stop();
        assert!(timer.elapsed_ms().unwrap_or(0.0) >= 2.0);
    }

    #[test]
    fn test_stop_without_start() {
        let mut timer = PhaseTimer::for_phase("download");
        timer.stop();
        assert!(timer.elapsed_ms().is_none());
    }

    #[test]
    fn test_time_closure() {
        let mut timer = PhaseTimer::for_phase("upload");
        let value = timer.time(|| 41 + 1);
        assert_eq!(value, 42);
        assert!(timer.elapsed_ms().is_some());
    }

    #[test]
    fn test_scoped_timer() {
        let timer = ScopedTimer::new("scoped");
        std::thread::sleep(Duration::from_millis(1));
        assert!(timer.elapsed_ms() >= 1.0);
    }
}
