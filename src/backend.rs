//! Numeric backend capability set (spec.md §9 "Device/host duality").
//!
//! Kernels never hard-code `host` or `device`; they go through this
//! trait so that the leapfrog/CPML/boundary code stays identical no
//! matter which [`crate::config::Engine`] was selected.

use ndarray::Array3;
use num_complex::Complex64;
use rustfft::FftPlanner;

/// Minimal capability set every backend must provide.
pub trait NumericBackend: Send + Sync {
    /// Forward FFT along a single axis (0, 1, or 2), in place.
    fn fft_1d(&self, data: &mut Array3<Complex64>, axis: usize);
    /// Inverse FFT along a single axis, in place, normalized by 1/N.
    fn ifft_1d(&self, data: &mut Array3<Complex64>, axis: usize);
    /// Forward FFT over two axes (used for the doubly-staggered
    /// derivatives of spec.md §4.3), in place.
    fn fft_2d(&self, data: &mut Array3<Complex64>, axes: (usize, usize)) {
        self.fft_1d(data, axes.0);
        self.fft_1d(data, axes.1);
    }
    /// Inverse FFT over two axes, in place, normalized.
    fn ifft_2d(&self, data: &mut Array3<Complex64>, axes: (usize, usize)) {
        self.ifft_1d(data, axes.1);
        self.ifft_1d(data, axes.0);
    }
}

/// CPU backend built on `rustfft`, the FFT engine the teacher already
/// depended on (`examples/SpaceEngineerSS-PhotonLab/rust-core/src/sources.rs`
/// `SpectrumAnalyzer::compute`).
#[derive(Default)]
pub struct HostBackend;

impl HostBackend {
    fn fft_along_axis(&self, data: &mut Array3<Complex64>, axis: usize, inverse: bool) {
        let len = data.len_of(ndarray::Axis(axis));
        if len <= 1 {
            return;
        }
        let mut planner = FftPlanner::new();
        let fft = if inverse {
            planner.plan_fft_inverse(len)
        } else {
            planner.plan_fft_forward(len)
        };

        let mut lane = vec![Complex64::new(0.0, 0.0); len];
        let scale = if inverse {
            1.0 / len as f64
        } else {
            1.0
        };

        for mut row in data.lanes_mut(ndarray::Axis(axis)) {
            for (dst, src) in lane.iter_mut().zip(row.iter()) {
                *dst = *src;
            }
            fft.process(&mut lane);
            for (dst, src) in row.iter_mut().zip(lane.iter()) {
                *dst = src * scale;
            }
        }
    }
}

impl NumericBackend for HostBackend {
    fn fft_1d(&self, data: &mut Array3<Complex64>, axis: usize) {
        self.fft_along_axis(data, axis, false);
    }

    fn ifft_1d(&self, data: &mut Array3<Complex64>, axis: usize) {
        self.fft_along_axis(data, axis, true);
    }
}

/// GPU compute backend (feature `device`), grounded in the WGSL
/// shift-and-add / Hadamard-product FDTD layering approach of
/// `examples/other_examples/e486b227_..._1D-FDTD/src/main.rs`.
///
/// Spectral (y,z) derivatives still route through [`HostBackend`] in this
/// revision: porting `rustfft` onto compute shaders is future work, not
/// required for any [MODULE] in SPEC_FULL.md (the leapfrog elementwise
/// update is the part spec.md actually asks to be backend-agnostic).
#[cfg(feature = "device")]
pub struct DeviceBackend {
    host_fallback: HostBackend,
    #[allow(dead_code)]
    device: wgpu::Device,
    #[allow(dead_code)]
    queue: wgpu::Queue,
}

#[cfg(feature = "device")]
impl DeviceBackend {
    /// Acquire a default adapter/device/queue; blocks on `pollster`.
    pub fn new() -> Option<Self> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor::default(),
            None,
        ))
        .ok()?;
        Some(DeviceBackend {
            host_fallback: HostBackend,
            device,
            queue,
        })
    }
}

#[cfg(feature = "device")]
impl NumericBackend for DeviceBackend {
    fn fft_1d(&self, data: &mut Array3<Complex64>, axis: usize) {
        self.host_fallback.fft_1d(data, axis);
    }

    fn ifft_1d(&self, data: &mut Array3<Complex64>, axis: usize) {
        self.host_fallback.ifft_1d(data, axis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn fft_then_ifft_round_trips() {
        let backend = HostBackend;
        let n = 8;
        let mut data = Array3::<Complex64>::zeros((1, n, 1));
        for j in 0..n {
            data[(0, j, 0)] = Complex64::new((j as f64).sin(), 0.0);
        }
        let original = data.clone();
        backend.fft_1d(&mut data, 1);
        backend.ifft_1d(&mut data, 1);
        for j in 0..n {
            assert!((data[(0, j, 0)] - original[(0, j, 0)]).norm() < 1e-10);
        }
    }
}
