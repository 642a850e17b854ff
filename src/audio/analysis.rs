use rayon::prelude::*;
use rustfft::num_complex::Complex;
use serde::Deserialize;
use std::sync::Arc;

use super::fft::{hann_window, Radix2Fft};
use super::field::{MagnitudeField, SampleBuffer};
use crate::error::{EngineError, Result};

pub const DEFAULT_FFT_SIZE: usize = 1024;
pub const DEFAULT_HOP_SIZE: usize = 512;

/// Columns computed per `AnalysisJob::step`, between cooperative yields.
pub const COLUMN_BATCH: usize = 256;

const DB_EPSILON: f32 = 1e-6;
const DB_FLOOR: f32 = -60.0;
const DB_SCALE: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct AnalysisParams {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
        }
    }
}

fn default_fft_size() -> usize { DEFAULT_FFT_SIZE }
fn default_hop_size() -> usize { DEFAULT_HOP_SIZE }

impl AnalysisParams {
    pub fn new(fft_size: usize, hop_size: usize) -> Self {
        Self { fft_size, hop_size }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(EngineError::InvalidConfig(format!(
                "fft size {} is not a power of two >= 2",
                self.fft_size
            )));
        }
        if self.hop_size == 0 {
            return Err(EngineError::InvalidConfig("hop size must be positive".into()));
        }
        Ok(())
    }

    /// Number of analysis columns for `sample_count` samples.
    pub fn column_count(&self, sample_count: usize) -> usize {
        if sample_count < self.fft_size || self.hop_size == 0 {
            return 0;
        }
        (sample_count - self.fft_size) / self.hop_size
    }
}

/// Map a linear FFT magnitude to the stored 8-bit intensity.
///
/// Fixed -60..0 dB window; quiet material renders dark.
pub fn magnitude_to_intensity(mag: f32) -> u8 {
    let db = 20.0 * (mag + DB_EPSILON).log10();
    ((db - DB_FLOOR) * DB_SCALE).clamp(0.0, 255.0) as u8
}

/// Progress report from one cooperative analysis step.
#[derive(Debug)]
pub enum Progress {
    Pending { done: usize, total: usize },
    Ready(MagnitudeField),
}

/// Restartable STFT over a sample buffer, advanced in fixed column batches.
///
/// Each `step` analyzes up to `COLUMN_BATCH` columns in parallel and returns
/// control to the caller; the field is only produced once every column is done.
pub struct AnalysisJob {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    params: AnalysisParams,
    fft: Radix2Fft,
    window: Vec<f32>,
    columns: Vec<Vec<u8>>,
    total: usize,
}

impl AnalysisJob {
    pub fn new(buffer: &SampleBuffer, params: AnalysisParams) -> Result<Self> {
        params.validate()?;
        if buffer.sample_rate == 0 {
            return Err(EngineError::AnalysisUnavailable("sample rate is zero".into()));
        }
        if buffer.len() < params.fft_size {
            return Err(EngineError::AnalysisUnavailable(format!(
                "{} samples is shorter than one {}-point frame",
                buffer.len(),
                params.fft_size
            )));
        }
        if buffer.samples.iter().any(|s| !s.is_finite()) {
            return Err(EngineError::AnalysisUnavailable(
                "input contains non-finite samples".into(),
            ));
        }

        let total = params.column_count(buffer.len());
        Ok(Self {
            samples: Arc::clone(&buffer.samples),
            sample_rate: buffer.sample_rate,
            params,
            fft: Radix2Fft::new(params.fft_size)?,
            window: hann_window(params.fft_size),
            columns: Vec::with_capacity(total),
            total,
        })
    }

    pub fn total_columns(&self) -> usize {
        self.total
    }

    pub fn done_columns(&self) -> usize {
        self.columns.len()
    }

    /// Analyze the next batch of columns.
    pub fn step(&mut self) -> Progress {
        let start = self.columns.len();
        let end = (start + COLUMN_BATCH).min(self.total);

        let fft = &self.fft;
        let window = &self.window;
        let samples = &self.samples;
        let fft_size = self.params.fft_size;
        let hop = self.params.hop_size;

        let batch: Vec<Vec<u8>> = (start..end)
            .into_par_iter()
            .map(|col| analyze_column(&samples[col * hop..col * hop + fft_size], window, fft))
            .collect();
        self.columns.extend(batch);

        if self.columns.len() < self.total {
            return Progress::Pending {
                done: self.columns.len(),
                total: self.total,
            };
        }

        let columns = std::mem::take(&mut self.columns);
        log::debug!(
            "STFT complete: {} columns x {} bins (fft={}, hop={})",
            columns.len(),
            fft_size / 2,
            fft_size,
            hop
        );
        Progress::Ready(MagnitudeField::from_columns(
            columns,
            self.sample_rate,
            fft_size,
            hop,
        ))
    }
}

fn analyze_column(frame: &[f32], window: &[f32], fft: &Radix2Fft) -> Vec<u8> {
    let mut buffer: Vec<Complex<f32>> = frame
        .iter()
        .zip(window.iter())
        .map(|(&s, &w)| Complex::new(s * w, 0.0))
        .collect();
    fft.process(&mut buffer);

    let half = fft.size() / 2;
    // bin 0 goes to the last row
    buffer[..half]
        .iter()
        .rev()
        .map(|c| magnitude_to_intensity(c.norm()))
        .collect()
}

/// Run the full STFT and return the completed field.
pub fn analyze(buffer: &SampleBuffer, params: AnalysisParams) -> Result<MagnitudeField> {
    let mut job = AnalysisJob::new(buffer, params)?;
    loop {
        if let Progress::Ready(field) = job.step() {
            return Ok(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: u32, n: usize) -> SampleBuffer {
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (2.0 * std::f64::consts::PI * freq * t).sin() as f32
            })
            .collect();
        SampleBuffer::new(samples, sample_rate)
    }

    #[test]
    fn dimensions_follow_frame_count() {
        for &(n, fft, hop) in &[(4096usize, 1024usize, 512usize), (5000, 256, 100), (1025, 1024, 1), (2000, 2, 7)] {
            let field = analyze(&sine(440.0, 8000, n), AnalysisParams::new(fft, hop)).unwrap();
            assert_eq!(field.width(), (n - fft) / hop, "n={n} fft={fft} hop={hop}");
            assert_eq!(field.height(), fft / 2);
        }
    }

    #[test]
    fn many_batches_produce_same_shape() {
        let n = 1024 + 512 * (COLUMN_BATCH * 2 + 3);
        let field = analyze(&sine(440.0, 44100, n), AnalysisParams::default()).unwrap();
        assert_eq!(field.width(), COLUMN_BATCH * 2 + 3);
    }

    #[test]
    fn rejects_bad_config() {
        let buf = sine(440.0, 8000, 4096);
        assert!(matches!(
            analyze(&buf, AnalysisParams::new(1000, 512)),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(matches!(
            analyze(&buf, AnalysisParams::new(1024, 0)),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn short_input_is_unavailable() {
        let buf = sine(440.0, 8000, 100);
        assert!(matches!(
            analyze(&buf, AnalysisParams::default()),
            Err(EngineError::AnalysisUnavailable(_))
        ));
    }

    #[test]
    fn peak_lands_on_expected_row() {
        let sr = 8000;
        let freq = 1000.0;
        let field = analyze(&sine(freq, sr, 8192), AnalysisParams::new(1024, 512)).unwrap();
        let col = field.column(2).unwrap();
        let peak_row = col
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        let expected = field.row_at_frequency(freq);
        assert!(
            (peak_row as isize - expected as isize).abs() <= 1,
            "peak row {peak_row}, expected {expected}"
        );
        // bin 0 is stored last, so the peak sits in the lower half for a low tone
        assert!(peak_row > field.height() / 2);
    }

    #[test]
    fn silence_maps_to_zero() {
        let buf = SampleBuffer::new(vec![0.0; 4096], 8000);
        let field = analyze(&buf, AnalysisParams::default()).unwrap();
        assert!(field.column(0).unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn intensity_mapping_is_affine_in_db() {
        assert_eq!(magnitude_to_intensity(0.0), 0);
        assert_eq!(magnitude_to_intensity(1e-3), 0);
        assert_eq!(magnitude_to_intensity(1.0), 240);
        assert_eq!(magnitude_to_intensity(1000.0), 255);
    }

    #[test]
    fn analysis_is_deterministic() {
        let buf = sine(1234.5, 22050, 20000);
        let a = analyze(&buf, AnalysisParams::default()).unwrap();
        let b = analyze(&buf, AnalysisParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn step_reports_progress() {
        let n = 1024 + 512 * (COLUMN_BATCH + 10);
        let mut job = AnalysisJob::new(&sine(440.0, 44100, n), AnalysisParams::default()).unwrap();
        match job.step() {
            Progress::Pending { done, total } => {
                assert_eq!(done, COLUMN_BATCH);
                assert_eq!(total, COLUMN_BATCH + 10);
            }
            Progress::Ready(_) => panic!("expected pending after first batch"),
        }
        assert!(matches!(job.step(), Progress::Ready(_)));
    }
}
