//! Field Store (spec.md §4.2).
//!
//! Allocates and owns the field/material/conductivity/derivative arrays
//! in a canonical `(x, y, z)` order so FFTs along `(y, z)` operate on the
//! two fastest axes (`ndarray`'s default row-major layout already puts z
//! fastest, y next, x slowest, matching the original's numpy/cupy layout
//! in `examples/original_source/.../space.py::Basic3D.__init__`).

use ndarray::Array3;
use num_complex::Complex64;

use crate::constants::PEC_SENTINEL;
use crate::grid::Grid;

/// Precomputed leapfrog coefficients for one field component (spec.md §4.4).
///
/// `c1` multiplies the previous field value, `c2` multiplies the curl
/// term. Caching these avoids recomputing `(2*eps - sigma*dt)/(2*eps +
/// sigma*dt)` etc. every step — the original recomputes them in every
/// call to `updateH`/`updateE` (SPEC_FULL.md §9 REDESIGN FLAGS).
#[derive(Clone)]
pub struct Coefficients {
    pub c1: Array3<Complex64>,
    pub c2: Array3<Complex64>,
}

impl Coefficients {
    /// `material` is eps (resp. mu) per cell, `conductivity` is sigma_E
    /// (resp. sigma_H) per cell. PEC/PEM cells (`material >= PEC_SENTINEL`)
    /// get both coefficients zeroed so the field stays pinned at its
    /// initial value (spec.md §4.4 "PEC mask").
    fn build(material: &Array3<Complex64>, conductivity: &Array3<Complex64>, dt: f64, e_update: bool) -> Self {
        let shape = material.raw_dim();
        let mut c1 = Array3::<Complex64>::zeros(shape);
        let mut c2 = Array3::<Complex64>::zeros(shape);

        for ((m, s), (c1v, c2v)) in material
            .iter()
            .zip(conductivity.iter())
            .zip(c1.iter_mut().zip(c2.iter_mut()))
        {
            if m.re >= PEC_SENTINEL {
                *c1v = Complex64::new(0.0, 0.0);
                *c2v = Complex64::new(0.0, 0.0);
                continue;
            }
            let two_m = *m * 2.0;
            let s_dt = *s * dt;
            let denom = two_m + s_dt;
            if e_update {
                *c1v = (two_m - s_dt) / denom;
                *c2v = Complex64::new(2.0 * dt, 0.0) / denom;
            } else {
                *c1v = (two_m - s_dt) / denom;
                *c2v = Complex64::new(-2.0 * dt, 0.0) / denom;
            }
        }

        Coefficients { c1, c2 }
    }
}

/// Owns the six field arrays, six material arrays, six conductivity
/// arrays, twelve derivative scratch arrays, and the cached leapfrog
/// coefficients, all shaped `(myNx, Ny, Nz)`.
pub struct FieldStore {
    pub ex: Array3<Complex64>,
    pub ey: Array3<Complex64>,
    pub ez: Array3<Complex64>,
    pub hx: Array3<Complex64>,
    pub hy: Array3<Complex64>,
    pub hz: Array3<Complex64>,

    pub eps_ex: Array3<Complex64>,
    pub eps_ey: Array3<Complex64>,
    pub eps_ez: Array3<Complex64>,
    pub mu_hx: Array3<Complex64>,
    pub mu_hy: Array3<Complex64>,
    pub mu_hz: Array3<Complex64>,

    pub econ_ex: Array3<Complex64>,
    pub econ_ey: Array3<Complex64>,
    pub econ_ez: Array3<Complex64>,
    pub mcon_hx: Array3<Complex64>,
    pub mcon_hy: Array3<Complex64>,
    pub mcon_hz: Array3<Complex64>,

    pub diff_x_ey: Array3<Complex64>,
    pub diff_x_ez: Array3<Complex64>,
    pub diff_y_ex: Array3<Complex64>,
    pub diff_y_ez: Array3<Complex64>,
    pub diff_z_ex: Array3<Complex64>,
    pub diff_z_ey: Array3<Complex64>,

    pub diff_x_hy: Array3<Complex64>,
    pub diff_x_hz: Array3<Complex64>,
    pub diff_y_hx: Array3<Complex64>,
    pub diff_y_hz: Array3<Complex64>,
    pub diff_z_hx: Array3<Complex64>,
    pub diff_z_hy: Array3<Complex64>,

    dt: f64,
    coeff_ex: Coefficients,
    coeff_ey: Coefficients,
    coeff_ez: Coefficients,
    coeff_hx: Coefficients,
    coeff_hy: Coefficients,
    coeff_hz: Coefficients,
}

impl FieldStore {
    pub fn new(grid: &Grid, dt: f64) -> Self {
        let shape = grid.local_shape();
        let zeros = || Array3::<Complex64>::zeros(shape);
        let eps0 = || Array3::<Complex64>::from_elem(shape, Complex64::new(crate::constants::EPS0, 0.0));
        let mu0 = || Array3::<Complex64>::from_elem(shape, Complex64::new(crate::constants::MU0, 0.0));

        let eps_ex = eps0();
        let eps_ey = eps0();
        let eps_ez = eps0();
        let mu_hx = mu0();
        let mu_hy = mu0();
        let mu_hz = mu0();
        let econ_ex = zeros();
        let econ_ey = zeros();
        let econ_ez = zeros();
        let mcon_hx = zeros();
        let mcon_hy = zeros();
        let mcon_hz = zeros();

        let coeff_ex = Coefficients::build(&eps_ex, &econ_ex, dt, true);
        let coeff_ey = Coefficients::build(&eps_ey, &econ_ey, dt, true);
        let coeff_ez = Coefficients::build(&eps_ez, &econ_ez, dt, true);
        let coeff_hx = Coefficients::build(&mu_hx, &mcon_hx, dt, false);
        let coeff_hy = Coefficients::build(&mu_hy, &mcon_hy, dt, false);
        let coeff_hz = Coefficients::build(&mu_hz, &mcon_hz, dt, false);

        FieldStore {
            ex: zeros(),
            ey: zeros(),
            ez: zeros(),
            hx: zeros(),
            hy: zeros(),
            hz: zeros(),
            eps_ex,
            eps_ey,
            eps_ez,
            mu_hx,
            mu_hy,
            mu_hz,
            econ_ex,
            econ_ey,
            econ_ez,
            mcon_hx,
            mcon_hy,
            mcon_hz,
            diff_x_ey: zeros(),
            diff_x_ez: zeros(),
            diff_y_ex: zeros(),
            diff_y_ez: zeros(),
            diff_z_ex: zeros(),
            diff_z_ey: zeros(),
            diff_x_hy: zeros(),
            diff_x_hz: zeros(),
            diff_y_hx: zeros(),
            diff_y_hz: zeros(),
            diff_z_hx: zeros(),
            diff_z_hy: zeros(),
            dt,
            coeff_ex,
            coeff_ey,
            coeff_ez,
            coeff_hx,
            coeff_hy,
            coeff_hz,
        }
    }

    pub fn coeff_e(&self, which: crate::config::FieldId) -> &Coefficients {
        use crate::config::FieldId::*;
        match which {
            Ex => &self.coeff_ex,
            Ey => &self.coeff_ey,
            Ez => &self.coeff_ez,
            _ => panic!("coeff_e called with an H field id"),
        }
    }

    pub fn coeff_h(&self, which: crate::config::FieldId) -> &Coefficients {
        use crate::config::FieldId::*;
        match which {
            Hx => &self.coeff_hx,
            Hy => &self.coeff_hy,
            Hz => &self.coeff_hz,
            _ => panic!("coeff_h called with an E field id"),
        }
    }

    /// Recompute cached leapfrog coefficients after material arrays have
    /// been mutated (setup-only, per spec.md §5 shared resource policy:
    /// "material arrays are written once during setup and read-only
    /// thereafter" — callers must invoke this once after all material
    /// painting is complete and before the time loop begins).
    pub fn refresh_coefficients(&mut self) {
        self.coeff_ex = Coefficients::build(&self.eps_ex, &self.econ_ex, self.dt, true);
        self.coeff_ey = Coefficients::build(&self.eps_ey, &self.econ_ey, self.dt, true);
        self.coeff_ez = Coefficients::build(&self.eps_ez, &self.econ_ez, self.dt, true);
        self.coeff_hx = Coefficients::build(&self.mu_hx, &self.mcon_hx, self.dt, false);
        self.coeff_hy = Coefficients::build(&self.mu_hy, &self.mcon_hy, self.dt, false);
        self.coeff_hz = Coefficients::build(&self.mu_hz, &self.mcon_hz, self.dt, false);
    }

    /// Total electromagnetic energy `sum(eps|E|^2 + mu|H|^2)/2`, used by
    /// the energy-conservation invariant (spec.md §8).
    pub fn total_energy(&self) -> f64 {
        let e = |field: &Array3<Complex64>, material: &Array3<Complex64>| -> f64 {
            field
                .iter()
                .zip(material.iter())
                .map(|(f, m)| m.re * f.norm_sqr())
                .sum()
        };
        0.5 * (e(&self.ex, &self.eps_ex)
            + e(&self.ey, &self.eps_ey)
            + e(&self.ez, &self.eps_ez)
            + e(&self.hx, &self.mu_hx)
            + e(&self.hy, &self.mu_hy)
            + e(&self.hz, &self.mu_hz))
    }

    /// Sample a handful of cells for NaN/Inf (cheap stability probe,
    /// grounded in the teacher's `FDTDGrid::is_stable`).
    pub fn is_stable(&self) -> bool {
        let check = |a: &Array3<Complex64>| {
            let len = a.len();
            if len == 0 {
                return true;
            }
            [0, len / 4, len / 2, 3 * len / 4, len - 1]
                .iter()
                .all(|&i| a.as_slice().unwrap()[i].is_finite())
        };
        check(&self.ex) && check(&self.ey) && check(&self.ez)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BbcSpec, DType, Engine, PbcSpec, PmlSpec, SimulationConfig};

    fn make_grid() -> Grid {
        let cfg = SimulationConfig {
            grid: (8, 8, 8),
            gridgap: (10e-9, 10e-9, 10e-9),
            dt: 1e-17,
            tsteps: 10,
            dtype: DType::Complex64,
            engine: Engine::Host,
            courant: 0.25,
            pml: PmlSpec::default(),
            pbc: PbcSpec::default(),
            bbc: BbcSpec::default(),
        };
        Grid::new(&cfg, 0, 1).unwrap()
    }

    #[test]
    fn vacuum_coefficients_are_unity_decay() {
        let grid = make_grid();
        let store = FieldStore::new(&grid, 1e-17);
        let c = store.coeff_e(crate::config::FieldId::Ex);
        assert!((c.c1[(0, 0, 0)] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn pec_cell_gets_zero_coefficients() {
        let grid = make_grid();
        let mut store = FieldStore::new(&grid, 1e-17);
        store.eps_ex[(0, 0, 0)] = Complex64::new(1e6, 0.0);
        store.refresh_coefficients();
        let c = store.coeff_e(crate::config::FieldId::Ex);
        assert_eq!(c.c1[(0, 0, 0)], Complex64::new(0.0, 0.0));
        assert_eq!(c.c2[(0, 0, 0)], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn zero_fields_have_zero_energy() {
        let grid = make_grid();
        let store = FieldStore::new(&grid, 1e-17);
        assert_eq!(store.total_energy(), 0.0);
        assert!(store.is_stable());
    }
}
