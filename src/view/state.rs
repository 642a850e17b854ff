use serde::Deserialize;

use crate::render::scale::{FrequencyAxis, FrequencyScale, TimeAxis};

/// Narrowest visible window, in seconds.
pub const MIN_ZOOM: f64 = 1.0;
/// Widest visible window, in seconds.
pub const MAX_ZOOM: f64 = 60.0;
pub const DEFAULT_WINDOW_SECONDS: f64 = 10.0;

/// User-facing view settings as read from configuration. `max_freq` left
/// unset means "up to nyquist".
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub window_seconds: f64,
    pub frequency_scale: FrequencyScale,
    pub min_freq: f64,
    pub max_freq: Option<f64>,
    pub intensity: f64,
    pub contrast: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            frequency_scale: FrequencyScale::default(),
            min_freq: 0.0,
            max_freq: None,
            intensity: 1.0,
            contrast: 1.0,
        }
    }
}

/// Pan/zoom and display parameters of the spectrogram pane.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub window_seconds: f64,
    pub scroll_offset_px: f64,
    pub frequency_scale: FrequencyScale,
    pub min_freq: f64,
    pub max_freq: f64,
    pub intensity: f64,
    pub contrast: f64,
}

impl ViewState {
    pub fn new(nyquist: f64) -> Self {
        Self::from_settings(&ViewSettings::default(), nyquist)
    }

    pub fn from_settings(settings: &ViewSettings, nyquist: f64) -> Self {
        let mut state = Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            scroll_offset_px: 0.0,
            frequency_scale: settings.frequency_scale,
            min_freq: 0.0,
            max_freq: nyquist.max(1.0),
            intensity: settings.intensity.max(0.0),
            contrast: settings.contrast.max(0.0),
        };
        state.set_window_seconds(settings.window_seconds);
        state.set_frequency_range(settings.min_freq, settings.max_freq.unwrap_or(nyquist), nyquist);
        state
    }

    /// Clamp and apply a new window length; returns the value actually used.
    pub fn set_window_seconds(&mut self, seconds: f64) -> f64 {
        let seconds = if seconds.is_finite() { seconds } else { DEFAULT_WINDOW_SECONDS };
        self.window_seconds = seconds.clamp(MIN_ZOOM, MAX_ZOOM);
        self.window_seconds
    }

    /// Apply a frequency range, clamped to `[0, nyquist]`. A range that is
    /// empty after clamping is rejected and the previous range kept.
    pub fn set_frequency_range(&mut self, min_freq: f64, max_freq: f64, nyquist: f64) -> bool {
        let nyquist = nyquist.max(1.0);
        let lo = min_freq.clamp(0.0, nyquist);
        let hi = max_freq.clamp(0.0, nyquist);
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            log::warn!("Ignoring empty frequency range {}..{} Hz", min_freq, max_freq);
            self.max_freq = self.max_freq.min(nyquist);
            self.min_freq = self.min_freq.min(self.max_freq - 1.0).max(0.0);
            return false;
        }
        self.min_freq = lo;
        self.max_freq = hi;
        true
    }

    pub fn pixels_per_second(&self, plot_width: f64) -> f64 {
        plot_width / self.window_seconds
    }

    pub fn time_axis(&self, plot_width: f64) -> TimeAxis {
        TimeAxis {
            scroll_offset_px: self.scroll_offset_px,
            pixels_per_second: self.pixels_per_second(plot_width),
        }
    }

    pub fn frequency_axis(&self, plot_height: f64) -> FrequencyAxis {
        FrequencyAxis {
            height: plot_height,
            scale: self.frequency_scale,
            min_freq: self.min_freq,
            max_freq: self.max_freq,
        }
    }

    /// Largest scroll offset that still shows audio at the left edge.
    pub fn max_scroll(&self, plot_width: f64, duration: f64) -> f64 {
        (duration * self.pixels_per_second(plot_width) - plot_width).max(0.0)
    }

    pub fn clamp_scroll(&mut self, plot_width: f64, duration: f64) {
        let max = self.max_scroll(plot_width, duration);
        self.scroll_offset_px = self.scroll_offset_px.clamp(0.0, max);
    }

    /// Visible `(start, end)` seconds.
    pub fn visible_range(&self, plot_width: f64) -> (f64, f64) {
        let axis = self.time_axis(plot_width);
        (axis.time_at(0.0), axis.time_at(plot_width))
    }

    /// Scroll so that `t` sits at plot x `x`.
    pub fn scroll_to(&mut self, t: f64, x: f64, plot_width: f64, duration: f64) {
        self.scroll_offset_px = t * self.pixels_per_second(plot_width) - x;
        self.clamp_scroll(plot_width, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_clamped() {
        let mut v = ViewState::new(22050.0);
        assert_eq!(v.set_window_seconds(0.2), MIN_ZOOM);
        assert_eq!(v.set_window_seconds(600.0), MAX_ZOOM);
        assert_eq!(v.set_window_seconds(f64::NAN), DEFAULT_WINDOW_SECONDS);
    }

    #[test]
    fn frequency_range_stays_inside_nyquist() {
        let mut v = ViewState::new(4000.0);
        assert!(v.set_frequency_range(-50.0, 9000.0, 4000.0));
        assert_eq!((v.min_freq, v.max_freq), (0.0, 4000.0));
        assert!(!v.set_frequency_range(3000.0, 1000.0, 4000.0));
        assert_eq!((v.min_freq, v.max_freq), (0.0, 4000.0));
    }

    #[test]
    fn settings_default_max_to_nyquist() {
        let s = ViewSettings { min_freq: 100.0, ..ViewSettings::default() };
        let v = ViewState::from_settings(&s, 8000.0);
        assert_eq!((v.min_freq, v.max_freq), (100.0, 8000.0));
        assert_eq!(v.frequency_scale, FrequencyScale::Mel);
    }

    #[test]
    fn scroll_is_bounded_by_duration() {
        let mut v = ViewState::new(8000.0);
        v.set_window_seconds(10.0);
        // 1000 px over 10 s, 30 s of audio
        assert_eq!(v.max_scroll(1000.0, 30.0), 2000.0);
        v.scroll_offset_px = 5000.0;
        v.clamp_scroll(1000.0, 30.0);
        assert_eq!(v.scroll_offset_px, 2000.0);
        assert_eq!(v.visible_range(1000.0), (20.0, 30.0));

        v.scroll_offset_px = -10.0;
        v.clamp_scroll(1000.0, 5.0);
        assert_eq!(v.scroll_offset_px, 0.0);
    }

    #[test]
    fn scroll_to_places_time_at_x() {
        let mut v = ViewState::new(8000.0);
        v.set_window_seconds(10.0);
        v.scroll_to(15.0, 500.0, 1000.0, 60.0);
        assert_eq!(v.time_axis(1000.0).time_at(500.0), 15.0);
    }
}
