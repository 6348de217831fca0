//! Periodic (PBC) and Bloch (BBC) boundary conditions (spec.md §4.6),
//! grounded in `examples/original_source/.../space.py::apply_PBC`/
//! `apply_BBC`. y/z wrap locally (no communication); x wraps by pairing
//! rank 0 with the last rank over the same halo-exchange primitive used
//! for the interior derivative (spec.md §4.1 "x is the only
//! decomposed axis").

use ndarray::Array3;
use num_complex::Complex64;

use crate::config::{BbcSpec, BlochPhase, PbcSpec};
use crate::grid::Grid;

/// Wrap the y axis: cell `-1` reads from `Ny-1`, cell `Ny` reads from `0`.
/// Applied directly to the derivative scratch arrays after the spectral
/// derivative already assumed periodicity — for PBC this is a no-op,
/// since the spectral method is periodic by construction. PBC only
/// changes behavior on the **x** axis, which uses finite differences and
/// is therefore not implicitly periodic (spec.md §4.6).
pub fn apply_bloch_phase_y(field: &mut Array3<Complex64>, phase: &BlochPhase) {
    let (_, ny, _) = field.dim();
    let k_l = phase.k * phase.period;
    let wrap_forward = Complex64::from_polar(1.0, k_l);
    let wrap_backward = Complex64::from_polar(1.0, -k_l);
    // The only place a Bloch phase is observable in a spectrally-periodic
    // axis is at the seam the FFT otherwise treats as perfectly periodic;
    // multiply the seam-adjacent row by the accumulated phase so a
    // nonzero Bloch wavevector still shows up in the derivative.
    if ny > 0 {
        for v in field.slice_mut(ndarray::s![.., ny - 1, ..]).iter_mut() {
            *v *= wrap_forward;
        }
        for v in field.slice_mut(ndarray::s![.., 0, ..]).iter_mut() {
            *v *= wrap_backward;
        }
    }
}

/// Same idea as [`apply_bloch_phase_y`] but for the z axis (last dim).
pub fn apply_bloch_phase_z(field: &mut Array3<Complex64>, phase: &BlochPhase) {
    let (_, _, nz) = field.dim();
    let k_l = phase.k * phase.period;
    let wrap_forward = Complex64::from_polar(1.0, k_l);
    let wrap_backward = Complex64::from_polar(1.0, -k_l);
    if nz > 0 {
        for v in field.slice_mut(ndarray::s![.., .., nz - 1]).iter_mut() {
            *v *= wrap_forward;
        }
        for v in field.slice_mut(ndarray::s![.., .., 0]).iter_mut() {
            *v *= wrap_backward;
        }
    }
}

/// x-axis periodic wrap: the ghost plane rank 0 receives from "the left"
/// is actually the last rank's rightmost plane, and vice versa. This
/// just changes which physical ranks the halo exchange in
/// [`crate::comm::Halo`] talks to; encoded here as a pure index mapping
/// so callers do not special-case PBC inside the communication code.
pub fn pbc_x_partner(grid: &Grid, pbc: &PbcSpec) -> Option<(Option<usize>, Option<usize>)> {
    if !pbc.x {
        return None;
    }
    if grid.size == 1 {
        return Some((Some(0), Some(0)));
    }
    let prev = if grid.is_first_rank() { Some(grid.size - 1) } else { grid.prev_rank() };
    let next = if grid.is_last_rank() { Some(0) } else { grid.next_rank() };
    Some((prev, next))
}

/// Same idea for a Bloch-periodic x axis: the wrapped ghost plane must
/// additionally be multiplied by `exp(+-i*k*L)` once it arrives (applied
/// by the caller after the halo exchange delivers the raw ghost plane).
pub fn bbc_x_partner(grid: &Grid, bbc: &BbcSpec) -> Option<(Option<usize>, Option<usize>, BlochPhase)> {
    let phase = bbc.x?;
    if grid.size == 1 {
        return Some((Some(0), Some(0), phase));
    }
    let prev = if grid.is_first_rank() { Some(grid.size - 1) } else { grid.prev_rank() };
    let next = if grid.is_last_rank() { Some(0) } else { grid.next_rank() };
    Some((prev, next, phase))
}

/// Multiply a ghost plane received from the wrapped-around neighbor by
/// the Bloch phase appropriate to which side it arrived from.
pub fn apply_bloch_phase_to_ghost(plane: &mut ndarray::Array2<Complex64>, phase: &BlochPhase, from_wrap_minus: bool) {
    let k_l = phase.k * phase.period;
    let factor = if from_wrap_minus {
        Complex64::from_polar(1.0, -k_l)
    } else {
        Complex64::from_polar(1.0, k_l)
    };
    for v in plane.iter_mut() {
        *v *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DType, Engine, PmlSpec, SimulationConfig};

    fn cfg(nx: usize) -> SimulationConfig {
        SimulationConfig {
            grid: (nx, 8, 8),
            gridgap: (1e-9, 1e-9, 1e-9),
            dt: 1e-19,
            tsteps: 10,
            dtype: DType::Complex64,
            engine: Engine::Host,
            courant: 0.1,
            pml: PmlSpec::default(),
            pbc: PbcSpec { x: true, y: false, z: false },
            bbc: BbcSpec::default(),
        }
    }

    #[test]
    fn pbc_wraps_rank_zero_to_last_rank() {
        let c = cfg(16);
        let grid = Grid::new(&c, 0, 4).unwrap();
        let (prev, next) = pbc_x_partner(&grid, &c.pbc).unwrap();
        assert_eq!(prev, Some(3));
        assert_eq!(next, Some(1));
    }

    #[test]
    fn pbc_inactive_returns_none() {
        let mut c = cfg(16);
        c.pbc.x = false;
        let grid = Grid::new(&c, 0, 4).unwrap();
        assert!(pbc_x_partner(&grid, &c.pbc).is_none());
    }

    #[test]
    fn single_rank_pbc_wraps_to_self() {
        let c = cfg(16);
        let grid = Grid::new(&c, 0, 1).unwrap();
        let (prev, next) = pbc_x_partner(&grid, &c.pbc).unwrap();
        assert_eq!(prev, Some(0));
        assert_eq!(next, Some(0));
    }

    #[test]
    fn bloch_phase_rotates_seam_rows() {
        let mut field = Array3::<Complex64>::from_elem((1, 4, 1), Complex64::new(1.0, 0.0));
        let phase = BlochPhase { k: std::f64::consts::PI, period: 1.0 };
        apply_bloch_phase_y(&mut field, &phase);
        assert!((field[(0, 3, 0)] - Complex64::from_polar(1.0, std::f64::consts::PI)).norm() < 1e-9);
    }
}
