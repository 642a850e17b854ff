//! Pixel ↔ time/frequency transforms.
//!
//! Every pixel position drawn by the renderer and every pointer position
//! interpreted by the annotation engine goes through these functions.

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyScale {
    Linear,
    #[serde(alias = "logarithmic")]
    Log,
    #[default]
    Mel,
}

impl std::str::FromStr for FrequencyScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "log" | "logarithmic" => Ok(Self::Log),
            "mel" => Ok(Self::Mel),
            other => Err(format!("unknown frequency scale {other:?}")),
        }
    }
}

pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Lower bound used by the log scale, which cannot reach 0 Hz.
fn log_floor(min_freq: f64) -> f64 {
    min_freq.max(1.0)
}

/// Frequency shown at pixel row `y` of a plot `height` pixels tall (row 0 = top).
pub fn row_to_frequency(y: f64, height: f64, scale: FrequencyScale, min_freq: f64, max_freq: f64) -> f64 {
    if height <= 0.0 {
        return min_freq;
    }
    let frac = 1.0 - y / height;
    match scale {
        FrequencyScale::Linear => min_freq + frac * (max_freq - min_freq),
        FrequencyScale::Log => {
            let lo = log_floor(min_freq);
            lo * (max_freq / lo).powf(frac)
        }
        FrequencyScale::Mel => {
            let lo = hz_to_mel(min_freq);
            let hi = hz_to_mel(max_freq);
            mel_to_hz(lo + frac * (hi - lo))
        }
    }
}

/// Inverse of [`row_to_frequency`]; returns a fractional row.
pub fn frequency_to_row(freq: f64, height: f64, scale: FrequencyScale, min_freq: f64, max_freq: f64) -> f64 {
    let frac = match scale {
        FrequencyScale::Linear => {
            let span = max_freq - min_freq;
            if span <= 0.0 {
                return height;
            }
            (freq - min_freq) / span
        }
        FrequencyScale::Log => {
            let lo = log_floor(min_freq);
            if max_freq <= lo || freq <= 0.0 {
                return height;
            }
            (freq / lo).ln() / (max_freq / lo).ln()
        }
        FrequencyScale::Mel => {
            let lo = hz_to_mel(min_freq);
            let hi = hz_to_mel(max_freq);
            if hi <= lo {
                return height;
            }
            (hz_to_mel(freq) - lo) / (hi - lo)
        }
    };
    (1.0 - frac) * height
}

/// Time under plot column `x` given the horizontal scroll and zoom.
pub fn column_to_time(x: f64, scroll_offset_px: f64, pixels_per_second: f64) -> f64 {
    (x + scroll_offset_px) / pixels_per_second
}

/// Inverse of [`column_to_time`]; returns a fractional column.
pub fn time_to_column(t: f64, scroll_offset_px: f64, pixels_per_second: f64) -> f64 {
    t * pixels_per_second - scroll_offset_px
}

/// Horizontal mapping for one rendered frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeAxis {
    pub scroll_offset_px: f64,
    pub pixels_per_second: f64,
}

impl TimeAxis {
    pub fn time_at(&self, x: f64) -> f64 {
        column_to_time(x, self.scroll_offset_px, self.pixels_per_second)
    }

    pub fn x_of(&self, t: f64) -> f64 {
        time_to_column(t, self.scroll_offset_px, self.pixels_per_second)
    }

    /// Length in seconds of `px` pixels.
    pub fn seconds(&self, px: f64) -> f64 {
        px / self.pixels_per_second
    }
}

/// Vertical mapping for one rendered frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyAxis {
    pub height: f64,
    pub scale: FrequencyScale,
    pub min_freq: f64,
    pub max_freq: f64,
}

impl FrequencyAxis {
    pub fn frequency_at(&self, y: f64) -> f64 {
        row_to_frequency(y, self.height, self.scale, self.min_freq, self.max_freq)
    }

    pub fn y_of(&self, freq: f64) -> f64 {
        frequency_to_row(freq, self.height, self.scale, self.min_freq, self.max_freq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALES: [FrequencyScale; 3] = [FrequencyScale::Linear, FrequencyScale::Log, FrequencyScale::Mel];

    #[test]
    fn rows_round_trip_on_every_scale() {
        let h = 480.0;
        for scale in SCALES {
            for (lo, hi) in [(0.0, 22050.0), (100.0, 8000.0), (20.0, 96000.0)] {
                for y in 0..480 {
                    let y = y as f64;
                    let f = row_to_frequency(y, h, scale, lo, hi);
                    let back = frequency_to_row(f, h, scale, lo, hi);
                    assert!((back - y).abs() < 1e-6, "{scale:?} [{lo},{hi}] y={y} back={back}");
                }
            }
        }
    }

    #[test]
    fn top_is_max_and_bottom_is_min() {
        for scale in [FrequencyScale::Linear, FrequencyScale::Mel] {
            assert!((row_to_frequency(0.0, 100.0, scale, 0.0, 8000.0) - 8000.0).abs() < 1e-6);
            assert!(row_to_frequency(100.0, 100.0, scale, 0.0, 8000.0).abs() < 1e-6);
        }
        // the log scale floors its lower bound at 1 Hz
        assert!((row_to_frequency(100.0, 100.0, FrequencyScale::Log, 0.0, 8000.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn log_midpoint_is_geometric_mean() {
        let f = row_to_frequency(50.0, 100.0, FrequencyScale::Log, 100.0, 10000.0);
        assert!((f - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn mel_is_denser_at_low_frequencies() {
        let mid_linear = row_to_frequency(50.0, 100.0, FrequencyScale::Linear, 0.0, 16000.0);
        let mid_mel = row_to_frequency(50.0, 100.0, FrequencyScale::Mel, 0.0, 16000.0);
        assert!(mid_mel < mid_linear);
    }

    #[test]
    fn mel_round_trip() {
        for hz in [0.0, 440.0, 1000.0, 20000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
        assert!((hz_to_mel(1000.0) - 999.985).abs() < 0.01);
    }

    #[test]
    fn time_axis_is_invertible() {
        let axis = TimeAxis { scroll_offset_px: 250.0, pixels_per_second: 100.0 };
        assert!((axis.time_at(0.0) - 2.5).abs() < 1e-12);
        assert!((axis.x_of(4.0) - 150.0).abs() < 1e-12);
        assert!((axis.time_at(axis.x_of(7.25)) - 7.25).abs() < 1e-12);
    }

    #[test]
    fn parses_scale_names() {
        assert_eq!("LOG".parse::<FrequencyScale>(), Ok(FrequencyScale::Log));
        assert_eq!("logarithmic".parse::<FrequencyScale>(), Ok(FrequencyScale::Log));
        assert!("bark".parse::<FrequencyScale>().is_err());
    }
}
