use std::sync::Arc;

/// Mono PCM input shared read-only with the engine.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }
}

/// Dense 8-bit time/frequency intensity grid produced by the STFT analyzer.
///
/// Storage is column-major: column `x` occupies `data[x * height..(x + 1) * height]`.
/// Within a column, row 0 is the highest frequency bin and row `height - 1`
/// is bin 0.
#[derive(Clone, Debug, PartialEq)]
pub struct MagnitudeField {
    width: usize,
    height: usize,
    data: Vec<u8>,
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,
}

/// Summary of the intensity distribution, reported by the `analyze` command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldStats {
    pub min: u8,
    pub max: u8,
    pub mean: f32,
}

impl MagnitudeField {
    pub(crate) fn from_columns(
        columns: Vec<Vec<u8>>,
        sample_rate: u32,
        fft_size: usize,
        hop_size: usize,
    ) -> Self {
        let height = fft_size / 2;
        let width = columns.len();
        let mut data = Vec::with_capacity(width * height);
        for col in columns {
            debug_assert_eq!(col.len(), height);
            data.extend_from_slice(&col);
        }
        Self {
            width,
            height,
            data,
            sample_rate,
            fft_size,
            hop_size,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn column(&self, x: usize) -> Option<&[u8]> {
        if x >= self.width {
            return None;
        }
        Some(&self.data[x * self.height..(x + 1) * self.height])
    }

    /// Intensity at storage row `row` (0 = highest bin) of column `x`.
    pub fn get(&self, x: usize, row: usize) -> Option<u8> {
        if row >= self.height {
            return None;
        }
        self.column(x).map(|c| c[row])
    }

    /// Width of one frequency bin in Hz.
    pub fn bin_hz(&self) -> f64 {
        self.sample_rate as f64 / self.fft_size as f64
    }

    /// Seconds between the starts of successive columns.
    pub fn seconds_per_column(&self) -> f64 {
        self.hop_size as f64 / self.sample_rate as f64
    }

    pub fn column_start_time(&self, x: usize) -> f64 {
        x as f64 * self.seconds_per_column()
    }

    /// Nearest column for time `t`, or `None` when `t` lies outside the analyzed span.
    pub fn column_at_time(&self, t: f64) -> Option<usize> {
        if self.width == 0 || !t.is_finite() || t < 0.0 {
            return None;
        }
        let col = (t / self.seconds_per_column()).round();
        if col >= self.width as f64 {
            return None;
        }
        Some(col as usize)
    }

    /// Storage row holding the bin nearest to `freq`, clamped to the field.
    pub fn row_at_frequency(&self, freq: f64) -> usize {
        let bin = (freq / self.bin_hz()).round().max(0.0) as usize;
        let bin = bin.min(self.height.saturating_sub(1));
        self.height - 1 - bin
    }

    pub fn frequency_of_row(&self, row: usize) -> f64 {
        let bin = self.height.saturating_sub(1).saturating_sub(row);
        bin as f64 * self.bin_hz()
    }

    pub fn stats(&self) -> Option<FieldStats> {
        if self.data.is_empty() {
            return None;
        }
        let mut min = u8::MAX;
        let mut max = 0u8;
        let mut sum = 0u64;
        for &v in &self.data {
            min = min.min(v);
            max = max.max(v);
            sum += v as u64;
        }
        Some(FieldStats {
            min,
            max,
            mean: sum as f32 / self.data.len() as f32,
        })
    }
}
