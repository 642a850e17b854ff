use serde::Deserialize;

/// One control point of a color ramp. `position` is in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStop {
    pub position: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorStop {
    pub const fn new(position: f32, r: u8, g: u8, b: u8) -> Self {
        Self { position, r, g, b }
    }
}

const CLASSIC: &[ColorStop] = &[
    ColorStop::new(0.00, 0, 0, 0),
    ColorStop::new(0.25, 30, 10, 110),
    ColorStop::new(0.50, 170, 20, 120),
    ColorStop::new(0.70, 240, 80, 30),
    ColorStop::new(0.88, 255, 200, 40),
    ColorStop::new(1.00, 255, 255, 230),
];

const MAGMA: &[ColorStop] = &[
    ColorStop::new(0.00, 0, 0, 4),
    ColorStop::new(0.13, 28, 16, 68),
    ColorStop::new(0.25, 79, 18, 123),
    ColorStop::new(0.38, 129, 37, 129),
    ColorStop::new(0.50, 181, 54, 122),
    ColorStop::new(0.63, 229, 80, 100),
    ColorStop::new(0.75, 251, 135, 97),
    ColorStop::new(0.88, 254, 194, 135),
    ColorStop::new(1.00, 252, 253, 191),
];

const GREYSCALE: &[ColorStop] = &[
    ColorStop::new(0.0, 0, 0, 0),
    ColorStop::new(1.0, 255, 255, 255),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPreset {
    #[default]
    Classic,
    Magma,
    Greyscale,
}

impl std::str::FromStr for ColorPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "magma" => Ok(Self::Magma),
            "greyscale" | "grayscale" => Ok(Self::Greyscale),
            other => Err(format!("unknown colormap {other:?}")),
        }
    }
}

impl ColorPreset {
    pub fn stops(self) -> &'static [ColorStop] {
        match self {
            ColorPreset::Classic => CLASSIC,
            ColorPreset::Magma => MAGMA,
            ColorPreset::Greyscale => GREYSCALE,
        }
    }
}

/// 256-entry intensity → RGB lookup table.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    lut: [[u8; 3]; 256],
}

impl ColorMap {
    /// Build the table by piecewise-linear interpolation between `stops`.
    ///
    /// Stops are sorted by position; intensities before the first or after the
    /// last stop take that stop's color.
    pub fn from_stops(stops: &[ColorStop]) -> Self {
        let mut sorted: Vec<ColorStop> = stops.to_vec();
        sorted.sort_by(|a, b| a.position.total_cmp(&b.position));

        let mut lut = [[0u8; 3]; 256];
        if sorted.is_empty() {
            return Self { lut };
        }

        for (i, entry) in lut.iter_mut().enumerate() {
            let t = i as f32 / 255.0;
            *entry = interpolate(&sorted, t);
        }
        Self { lut }
    }

    pub fn preset(preset: ColorPreset) -> Self {
        Self::from_stops(preset.stops())
    }

    #[inline]
    pub fn color_of(&self, intensity: u8) -> [u8; 3] {
        self.lut[intensity as usize]
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::preset(ColorPreset::default())
    }
}

fn interpolate(stops: &[ColorStop], t: f32) -> [u8; 3] {
    let first = stops[0];
    if t <= first.position {
        return [first.r, first.g, first.b];
    }
    let last = stops[stops.len() - 1];
    if t >= last.position {
        return [last.r, last.g, last.b];
    }

    let upper = stops.partition_point(|s| s.position <= t).min(stops.len() - 1);
    let s0 = stops[upper - 1];
    let s1 = stops[upper];
    let span = s1.position - s0.position;
    let f = if span <= f32::EPSILON { 0.0 } else { (t - s0.position) / span };
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * f).round() as u8;
    [lerp(s0.r, s1.r), lerp(s0.g, s1.g), lerp(s0.b, s1.b)]
}

/// Parse `#rrggbb` / `#rgb` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    let channel = |h: &str| u8::from_str_radix(h, 16).ok();
    match hex.len() {
        6 => Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?]),
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(out)
        }
        _ => None,
    }
}
