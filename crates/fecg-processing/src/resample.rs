//! Fourier-domain resampling of real sequences
//!
//! The spectrum of the input is truncated or zero-padded to the new length and
//! transformed back, treating the signal as periodic. A Nyquist bin that
//! exists in the shorter of the two lengths is split (upsampling) or folded
//! (downsampling) so the output stays real.

use rustfft::{FftPlanner, num_complex::Complex};

/// FFT resampler that reuses plans across calls
pub struct FourierResampler {
    planner: FftPlanner<f64>,
}

impl FourierResampler {
    pub fn new() -> Self {
        FourierResampler {
            planner: FftPlanner::new(),
        }
    }

    /// Resample `signal` to `num` samples
    pub fn resample(&mut self, signal: &[f64], num: usize) -> Vec<f64> {
        let nx = signal.len();
        if num == 0 {
            return Vec::new();
        }
        if nx == 0 {
            return vec![0.0; num];
        }
        if num == nx {
            return signal.to_vec();
        }

        let forward = self.planner.plan_fft_forward(nx);
        let mut spectrum: Vec<Complex<f64>> = signal.iter()
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        forward.process(&mut spectrum);

        // Non-negative half of the output spectrum
        let n = num.min(nx);
        let nyq = n / 2 + 1;
        let half_len = num / 2 + 1;
        let mut half = vec![Complex::new(0.0, 0.0); half_len];
        half[..nyq].copy_from_slice(&spectrum[..nyq]);

        if n % 2 == 0 {
            if num < nx {
                half[n / 2] *= 2.0;
            } else {
                half[n / 2] *= 0.5;
            }
        }

        // Hermitian completion so the inverse transform is real
        let mut full = vec![Complex::new(0.0, 0.0); num];
        full[..half_len].copy_from_slice(&half);
        full[0].im = 0.0;
        if num % 2 == 0 {
            full[num / 2].im = 0.0;
        }
        for k in 1..half_len {
            let mirror = num - k;
            if mirror >= half_len {
                full[mirror] = half[k].conj();
            }
        }

        let inverse = self.planner.plan_fft_inverse(num);
        inverse.process(&mut full);

        // rustfft leaves the inverse unnormalized (× num); overall gain is num / nx
        let scale = 1.0 / nx as f64;
        full.iter().map(|c| c.re * scale).collect()
    }
}

impl Default for FourierResampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Resample `signal` to `num` samples with a one-off planner
pub fn resample(signal: &[f64], num: usize) -> Vec<f64> {
    FourierResampler::new().resample(signal, num)
}
