use std::time::{Duration, Instant};

/// Decides when the next frame should be drawn.
///
/// A frame is due when state was invalidated since the last draw, or when
/// continuous mode (playback) is on and one cadence interval has passed.
#[derive(Debug)]
pub struct RenderScheduler {
    interval: Duration,
    dirty: bool,
    continuous: bool,
    last_frame: Option<Instant>,
}

impl RenderScheduler {
    pub fn new(fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            interval: Duration::from_secs_f64(1.0 / fps as f64),
            dirty: true,
            continuous: false,
            last_frame: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    pub fn should_render(&self, now: Instant) -> bool {
        if self.dirty {
            return true;
        }
        if !self.continuous {
            return false;
        }
        match self.last_frame {
            Some(last) => now.duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.dirty = false;
        self.last_frame = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_scheduler_renders_only_when_dirty() {
        let start = Instant::now();
        let mut s = RenderScheduler::new(30);
        assert!(s.should_render(start));
        s.mark_rendered(start);
        assert!(!s.should_render(start + Duration::from_secs(5)));
        s.invalidate();
        assert!(s.should_render(start));
    }

    #[test]
    fn continuous_mode_follows_cadence() {
        let start = Instant::now();
        let mut s = RenderScheduler::new(10);
        s.set_continuous(true);
        s.mark_rendered(start);
        assert!(!s.should_render(start + Duration::from_millis(50)));
        assert!(s.should_render(start + Duration::from_millis(100)));
    }

    #[test]
    fn zero_fps_is_treated_as_one() {
        assert_eq!(RenderScheduler::new(0).interval(), Duration::from_secs(1));
    }
}
