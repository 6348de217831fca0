//! FFT-based spectrum analysis over recorded time series (spec.md §4.8
//! support), carried forward from the teacher's `SpectrumAnalyzer`
//! (`examples/SpaceEngineerSS-PhotonLab/rust-core/src/sources.rs`) and
//! generalized from `f32`/`Complex<f32>` real samples to the solver's
//! native `Complex64` field samples.

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Hann-windowed FFT spectrum analyzer over a fixed-size sample buffer.
pub struct SpectrumAnalyzer {
    size: usize,
    window: Vec<f64>,
    spectrum_db: Vec<f64>,
}

impl SpectrumAnalyzer {
    pub fn new(size: usize) -> Self {
        let size = size.next_power_of_two();
        let mut window = vec![0.0; size];
        for i in 0..size {
            window[i] = 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos());
        }
        SpectrumAnalyzer { size, window, spectrum_db: vec![0.0; size / 2] }
    }

    pub fn fft_size(&self) -> usize {
        self.size
    }

    /// Magnitude spectrum in dB (`20*log10(|X|)`), `N/2` bins (real input
    /// assumed; complex probe samples use only their real part).
    pub fn compute(&mut self, samples: &[Complex64]) -> &[f64] {
        let n = self.size.min(samples.len());
        let mut scratch: Vec<Complex64> = (0..self.size)
            .map(|i| if i < n { samples[i] * self.window[i] } else { Complex64::new(0.0, 0.0) })
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(self.size);
        fft.process(&mut scratch);

        let scale = 1.0 / (self.size as f64).sqrt();
        for i in 0..self.size / 2 {
            let mag = scratch[i].norm() * scale;
            self.spectrum_db[i] = if mag > 1e-10 { 20.0 * mag.log10() } else { -200.0 };
        }
        &self.spectrum_db
    }

    pub fn peak_bin(&self) -> usize {
        self.spectrum_db
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
            .0
    }

    /// Bin index to a normalized frequency in `[0, 1)` of the sample rate.
    pub fn bin_to_frequency(&self, bin: usize) -> f64 {
        bin as f64 / self.size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_bin_tracks_input_tone() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        let samples: Vec<Complex64> = (0..64)
            .map(|i| Complex64::new((2.0 * std::f64::consts::PI * 8.0 * i as f64 / 64.0).sin(), 0.0))
            .collect();
        analyzer.compute(&samples);
        assert_eq!(analyzer.peak_bin(), 8);
    }
}
