use std::time::{Duration, Instant};

/// Frame clock. Sampled once per frame so every system sees the same delta.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    previous: Instant,
    current: Instant,
    delta: f32,
    elapsed: f32,
    pub time_scale: f32,
}

impl Timer {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            start: now,
            previous: now,
            current: now,
            delta: 0.0,
            elapsed: 0.0,
            time_scale: 1.0,
        }
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    fn update_at(&mut self, now: Instant) {
        self.previous = self.current;
        self.current = now.max(self.current);

        self.delta = (self.current - self.previous).as_secs_f32() * self.time_scale;
        self.elapsed += self.delta;
    }

    /// Seconds between the last two updates.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Scaled seconds accumulated since creation or the last reset.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Wall clock time since the timer was created, ignoring `time_scale`.
    pub fn uptime(&self) -> Duration {
        self.current - self.start
    }

    pub fn reset(&mut self) {
        let time_scale = self.time_scale;
        *self = Self::starting_at(Instant::now());
        self.time_scale = time_scale;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
