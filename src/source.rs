//! Source injection (spec.md §4.7), generalized to 3-D from the
//! teacher's waveform library (`examples/SpaceEngineerSS-PhotonLab/
//! rust-core/src/sources.rs`) with rank-ownership resolution grounded in
//! `examples/original_source/.../space.py::set_src_pos`/`put_src`
//! (exactly one rank owns a given source position; silently injecting
//! in every rank would multiply the source's energy by `world_size`).

use ndarray::Array3;
use num_complex::Complex64;

use crate::config::{FieldId, InjectionMode};
use crate::grid::Grid;

/// Time-domain waveform shapes (teacher's `Waveform`, generalized to `f64`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sinusoidal,
    Gaussian,
    ModulatedGaussian,
    Ricker,
    Step,
}

/// A single time-domain source function (teacher's `SourceFunction`).
#[derive(Debug, Clone)]
pub struct SourceFunction {
    pub waveform: Waveform,
    pub frequency: f64,
    pub t0: f64,
    pub tau: f64,
    pub amplitude: f64,
}

impl SourceFunction {
    pub fn sinusoidal(frequency: f64, amplitude: f64) -> Self {
        SourceFunction { waveform: Waveform::Sinusoidal, frequency, t0: 0.0, tau: 1.0, amplitude }
    }

    pub fn gaussian(t0: f64, tau: f64, amplitude: f64) -> Self {
        SourceFunction { waveform: Waveform::Gaussian, frequency: 0.0, t0, tau, amplitude }
    }

    pub fn modulated_gaussian(frequency: f64, t0: f64, tau: f64, amplitude: f64) -> Self {
        SourceFunction { waveform: Waveform::ModulatedGaussian, frequency, t0, tau, amplitude }
    }

    pub fn ricker(t0: f64, tau: f64, amplitude: f64) -> Self {
        SourceFunction { waveform: Waveform::Ricker, frequency: 0.0, t0, tau, amplitude }
    }

    pub fn step(t0: f64, amplitude: f64) -> Self {
        SourceFunction { waveform: Waveform::Step, frequency: 0.0, t0, tau: 1.0, amplitude }
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        match self.waveform {
            Waveform::Sinusoidal => self.amplitude * (2.0 * std::f64::consts::PI * self.frequency * t).sin(),
            Waveform::Gaussian => {
                let arg = (t - self.t0) / self.tau;
                self.amplitude * (-arg * arg).exp()
            }
            Waveform::ModulatedGaussian => {
                let arg = (t - self.t0) / self.tau;
                let envelope = (-arg * arg).exp();
                let carrier = (2.0 * std::f64::consts::PI * self.frequency * t).sin();
                self.amplitude * envelope * carrier
            }
            Waveform::Ricker => {
                let arg = (t - self.t0) / self.tau;
                let arg2 = arg * arg;
                self.amplitude * (1.0 - 2.0 * arg2) * (-arg2).exp()
            }
            Waveform::Step => {
                if t >= self.t0 {
                    self.amplitude
                } else {
                    0.0
                }
            }
        }
    }
}

/// A global grid position a source targets, and which rank actually owns it.
#[derive(Debug, Clone, Copy)]
pub struct GlobalPos {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

/// Resolves which rank owns a source position (original's `set_src_pos`),
/// then injects only on that rank (`put_src`) so the source is never
/// double-counted.
pub struct PointSource {
    pub pos: GlobalPos,
    pub field: FieldId,
    pub mode: InjectionMode,
    pub source_fn: SourceFunction,
}

impl PointSource {
    /// Inject this source into `field_data` at timestep time `t`, if
    /// `grid` is the owning rank; a no-op on every other rank.
    pub fn inject(&self, grid: &Grid, field_data: &mut Array3<Complex64>, t: f64) {
        let Some(lx) = grid.global_to_local_x(self.pos.x) else {
            return;
        };
        let value = Complex64::new(self.source_fn.evaluate(t), 0.0);
        let cell = &mut field_data[(lx, self.pos.y, self.pos.z)];
        match self.mode {
            InjectionMode::Soft => *cell += value,
            InjectionMode::Hard => *cell = value,
        }
    }
}

/// A plane-wave source along a line/plane normal to one axis, scaled by
/// the Courant number for amplitude matching (teacher's `PlaneWaveSource`).
pub struct PlaneWaveSource {
    pub axis: crate::cpml::Axis,
    pub position: usize,
    pub field: FieldId,
    pub source_fn: SourceFunction,
    pub courant: f64,
}

impl PlaneWaveSource {
    pub fn inject(&self, grid: &Grid, field_data: &mut Array3<Complex64>, t: f64) {
        let value = Complex64::new(self.source_fn.evaluate(t) * self.courant, 0.0);
        match self.axis {
            crate::cpml::Axis::X => {
                let Some(lx) = grid.global_to_local_x(self.position) else {
                    return;
                };
                field_data.slice_mut(ndarray::s![lx, .., ..]).iter_mut().for_each(|c| *c += value);
            }
            crate::cpml::Axis::Y => {
                let (nx, _, _) = field_data.dim();
                for x in 0..nx {
                    field_data[(x, self.position, 0)] += value;
                }
            }
            crate::cpml::Axis::Z => {
                let (nx, ny, _) = field_data.dim();
                for x in 0..nx {
                    for y in 0..ny {
                        field_data[(x, y, self.position)] += value;
                    }
                }
            }
        }
    }
}

/// One radiating element of a [`PhasedArraySource`].
#[derive(Debug, Clone, Copy)]
pub struct SourceElement {
    pub pos: GlobalPos,
    pub phase_offset: f64,
    pub amplitude: f64,
}

/// Beamforming array: `E(t) = sum_n A_n * sin(omega*t + phi_n)`
/// (teacher's `PhasedArraySource`, generalized to 3-D positions).
pub struct PhasedArraySource {
    pub elements: Vec<SourceElement>,
    pub frequency: f64,
    pub courant: f64,
}

impl PhasedArraySource {
    pub fn linear_along_y(base: GlobalPos, num_elements: usize, spacing: usize, frequency: f64, courant: f64) -> Self {
        let elements = (0..num_elements)
            .map(|i| SourceElement {
                pos: GlobalPos { x: base.x, y: base.y + i * spacing, z: base.z },
                phase_offset: 0.0,
                amplitude: 1.0,
            })
            .collect();
        PhasedArraySource { elements, frequency, courant }
    }

    /// Progressive phase shift for beam steering, `phi_n = n * delta`.
    pub fn set_progressive_phase(&mut self, delta: f64) {
        for (i, elem) in self.elements.iter_mut().enumerate() {
            elem.phase_offset = i as f64 * delta;
        }
    }

    pub fn inject(&self, grid: &Grid, field_data: &mut Array3<Complex64>, t: f64) {
        let omega = 2.0 * std::f64::consts::PI * self.frequency;
        for elem in &self.elements {
            let Some(lx) = grid.global_to_local_x(elem.pos.x) else {
                continue;
            };
            let value = elem.amplitude * (omega * t + elem.phase_offset).sin() * self.courant;
            field_data[(lx, elem.pos.y, elem.pos.z)] += Complex64::new(value, 0.0);
        }
    }
}

/// Spatial Gaussian-profile beam along y, injected at a fixed x plane
/// (teacher's `GaussianBeamSource`, extended with a z waist too).
pub struct GaussianBeamSource {
    pub x: usize,
    pub center: (usize, usize),
    pub waist: f64,
    pub frequency: f64,
    pub amplitude: f64,
    pub courant: f64,
}

impl GaussianBeamSource {
    pub fn inject(&self, grid: &Grid, field_data: &mut Array3<Complex64>, t: f64) {
        let Some(lx) = grid.global_to_local_x(self.x) else {
            return;
        };
        let omega = 2.0 * std::f64::consts::PI * self.frequency;
        let time_factor = (omega * t).sin();
        let w2 = self.waist * self.waist;
        let (_, ny, nz) = field_data.dim();

        for y in 0..ny {
            for z in 0..nz {
                let dy = y as f64 - self.center.0 as f64;
                let dz = z as f64 - self.center.1 as f64;
                let profile = (-2.0 * (dy * dy + dz * dz) / w2).exp();
                let value = self.amplitude * profile * time_factor * self.courant;
                field_data[(lx, y, z)] += Complex64::new(value, 0.0);
            }
        }
    }
}

/// Records a field component at a fixed global position into a circular
/// buffer (teacher's `Probe`).
pub struct Probe {
    pub pos: GlobalPos,
    buffer: Vec<Complex64>,
    write_pos: usize,
}

impl Probe {
    pub fn new(pos: GlobalPos, capacity: usize) -> Self {
        Probe { pos, buffer: vec![Complex64::new(0.0, 0.0); capacity], write_pos: 0 }
    }

    pub fn record(&mut self, grid: &Grid, field_data: &Array3<Complex64>) {
        let Some(lx) = grid.global_to_local_x(self.pos.x) else {
            return;
        };
        let value = field_data[(lx, self.pos.y, self.pos.z)];
        self.buffer[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    pub fn history(&self) -> &[Complex64] {
        &self.buffer
    }

    pub fn current_value(&self) -> Complex64 {
        let prev = if self.write_pos == 0 { self.buffer.len() - 1 } else { self.write_pos - 1 };
        self.buffer[prev]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BbcSpec, DType, Engine, PbcSpec, PmlSpec, SimulationConfig};

    fn make_grid() -> Grid {
        let cfg = SimulationConfig {
            grid: (8, 8, 8),
            gridgap: (1e-9, 1e-9, 1e-9),
            dt: 1e-19,
            tsteps: 10,
            dtype: DType::Complex64,
            engine: Engine::Host,
            courant: 0.1,
            pml: PmlSpec::default(),
            pbc: PbcSpec::default(),
            bbc: BbcSpec::default(),
        };
        Grid::new(&cfg, 0, 1).unwrap()
    }

    #[test]
    fn gaussian_peaks_at_t0() {
        let src = SourceFunction::gaussian(50.0, 10.0, 2.0);
        assert!((src.evaluate(50.0) - 2.0).abs() < 1e-9);
        assert!(src.evaluate(60.0) < 2.0);
    }

    #[test]
    fn soft_injection_accumulates_hard_replaces() {
        let grid = make_grid();
        let mut field = Array3::<Complex64>::zeros((8, 8, 8));
        field[(2, 3, 4)] = Complex64::new(1.0, 0.0);

        let soft = PointSource {
            pos: GlobalPos { x: 2, y: 3, z: 4 },
            field: FieldId::Ez,
            mode: InjectionMode::Soft,
            source_fn: SourceFunction::step(0.0, 5.0),
        };
        soft.inject(&grid, &mut field, 1.0);
        assert!((field[(2, 3, 4)].re - 6.0).abs() < 1e-9);

        let hard = PointSource {
            pos: GlobalPos { x: 2, y: 3, z: 4 },
            field: FieldId::Ez,
            mode: InjectionMode::Hard,
            source_fn: SourceFunction::step(0.0, 9.0),
        };
        hard.inject(&grid, &mut field, 1.0);
        assert!((field[(2, 3, 4)].re - 9.0).abs() < 1e-9);
    }

    #[test]
    fn probe_records_current_value() {
        let grid = make_grid();
        let mut field = Array3::<Complex64>::zeros((8, 8, 8));
        field[(1, 1, 1)] = Complex64::new(0.5, 0.0);
        let mut probe = Probe::new(GlobalPos { x: 1, y: 1, z: 1 }, 4);
        probe.record(&grid, &field);
        assert!((probe.current_value().re - 0.5).abs() < 1e-9);
    }
}
