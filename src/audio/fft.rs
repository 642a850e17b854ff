use rustfft::num_complex::Complex;

use crate::error::{EngineError, Result};

/// Precomputed plan for an in-place iterative radix-2 FFT.
///
/// Holds the bit-reversal permutation and the twiddle table for one size so
/// every analysis frame reuses them.
#[derive(Clone, Debug)]
pub struct Radix2Fft {
    size: usize,
    bit_reverse: Vec<usize>,
    twiddles: Vec<Complex<f32>>,
}

impl Radix2Fft {
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(EngineError::InvalidConfig(format!(
                "fft size {} is not a power of two >= 2",
                size
            )));
        }

        let bits = size.trailing_zeros();
        let bit_reverse = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - bits))
            .collect();

        // W_N^k = e^{-2πik/N} for k in 0..N/2
        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -2.0 * std::f64::consts::PI * k as f64 / size as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();

        Ok(Self {
            size,
            bit_reverse,
            twiddles,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform in place. `buffer.len()` must equal the plan size.
    pub fn process(&self, buffer: &mut [Complex<f32>]) {
        debug_assert_eq!(buffer.len(), self.size);
        let n = self.size;

        for i in 0..n {
            let j = self.bit_reverse[i];
            if i < j {
                buffer.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let w = self.twiddles[k * stride];
                    let even = buffer[start + k];
                    let odd = buffer[start + k + half] * w;
                    buffer[start + k] = even + odd;
                    buffer[start + k + half] = even - odd;
                }
            }
            len <<= 1;
        }
    }
}

/// Symmetric Hann window of length `size`.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
