use super::scale::{FrequencyAxis, FrequencyScale, TimeAxis};

/// Smallest vertical gap between two frequency tick labels.
const MIN_FREQ_TICK_SPACING_PX: f64 = 22.0;
/// Target horizontal gap between time ruler ticks.
const TIME_TICK_SPACING_PX: f64 = 90.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    /// Pixel position along the axis, in plot coordinates.
    pub pos: f64,
    pub value: f64,
    pub label: String,
}

/// Smallest 1-2-5 multiple of a power of ten that is >= `raw`.
pub fn nice_step(raw: f64) -> f64 {
    if !(raw > 0.0) || !raw.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    for m in [1.0, 2.0, 5.0, 10.0] {
        let step = m * magnitude;
        if step >= raw * (1.0 - 1e-9) {
            return step;
        }
    }
    10.0 * magnitude
}

pub fn format_frequency(hz: f64) -> String {
    if hz >= 1000.0 {
        let k = hz / 1000.0;
        if (k - k.round()).abs() < 1e-6 {
            format!("{}k", k.round() as u64)
        } else {
            format!("{:.1}k", k)
        }
    } else {
        format!("{}", hz.round() as u64)
    }
}

pub fn format_time(seconds: f64, step: f64) -> String {
    if step < 1.0 {
        return format!("{:.1}s", seconds);
    }
    let total = seconds.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Frequency ticks for the left axis. Positions come from `FrequencyAxis::y_of`.
pub fn frequency_ticks(axis: &FrequencyAxis) -> Vec<Tick> {
    if axis.height <= 0.0 || axis.max_freq <= axis.min_freq {
        return Vec::new();
    }

    let candidates: Vec<f64> = match axis.scale {
        FrequencyScale::Linear => {
            let max_ticks = (axis.height / MIN_FREQ_TICK_SPACING_PX).floor().max(1.0);
            let step = nice_step((axis.max_freq - axis.min_freq) / max_ticks);
            let first = (axis.min_freq / step).ceil() as i64;
            let last = (axis.max_freq / step).floor() as i64;
            (first..=last).map(|k| k as f64 * step).collect()
        }
        FrequencyScale::Log | FrequencyScale::Mel => {
            let mut values = Vec::new();
            let mut decade = 10.0;
            while decade <= axis.max_freq {
                for m in [1.0, 2.0, 5.0] {
                    let f = m * decade;
                    if f >= axis.min_freq && f <= axis.max_freq {
                        values.push(f);
                    }
                }
                decade *= 10.0;
            }
            values
        }
    };

    let mut ticks: Vec<Tick> = Vec::new();
    let mut last_pos = f64::INFINITY;
    // walk bottom-up so the low end keeps its ticks when space is tight
    for f in candidates {
        let pos = axis.y_of(f);
        if pos < 0.0 || pos > axis.height {
            continue;
        }
        if last_pos - pos < MIN_FREQ_TICK_SPACING_PX {
            continue;
        }
        last_pos = pos;
        ticks.push(Tick {
            pos,
            value: f,
            label: format_frequency(f),
        });
    }
    ticks
}

/// Time ruler ticks for a plot `width` pixels wide, limited to `[0, duration]`.
pub fn time_ticks(axis: &TimeAxis, width: f64, duration: f64) -> Vec<Tick> {
    if width <= 0.0 || axis.pixels_per_second <= 0.0 {
        return Vec::new();
    }
    let step = nice_step(axis.seconds(TIME_TICK_SPACING_PX));
    let t0 = axis.time_at(0.0).max(0.0);
    let t1 = axis.time_at(width).min(duration);
    if t1 < t0 {
        return Vec::new();
    }

    let first = (t0 / step).ceil() as i64;
    let last = (t1 / step).floor() as i64;
    (first..=last)
        .map(|k| {
            let t = k as f64 * step;
            Tick {
                pos: axis.x_of(t),
                value: t,
                label: format_time(t, step),
            }
        })
        .collect()
}
