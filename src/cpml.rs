//! Convolutional PML (spec.md §4.5), generalized to 3-D from the
//! teacher's 2-D `CPMLCoeffs`/`CPML` using the grading constants and
//! recursion from `examples/original_source/.../space.py::set_PML`
//! (Roden & Gedney 2000).
//!
//! The original leaves `_PML_updateE_px/mx/py/my/pz/mz` as empty stubs
//! while fully implementing the six H-face kernels. SPEC_FULL.md §9
//! resolves this Open Question by implementing all twelve kernels by
//! structural symmetry (E faces convolve the curl-of-H term the same way
//! H faces convolve curl-of-E, reading the same packed profile table).

use ndarray::{Array1, Array3};
use num_complex::Complex64;

use crate::config::AxisRegion;
use crate::constants::{eta0, PEC_SENTINEL};

const GRADING_ORDER: f64 = 3.0;
const ALPHA_ORDER: f64 = 3.0;
const REFLECTION_COEFF: f64 = 1e-16;
const KAPPA_MAX: f64 = 1.0;
const ALPHA_MAX: f64 = 0.02;

/// Graded sigma/kappa/alpha and the derived recursive-convolution `b`/`a`
/// coefficients, packed over `2*npml` entries the way the original packs
/// `PMLsigmax`/`PMLkappax`/`PMLalphax` (`space.py::set_PML`): `loc[i] =
/// i*d/bdw` with `bdw = (2*npml-1)*d`, so `loc` runs from 0 (domain
/// interior) to 1 (domain edge) across the packed array. A minus face
/// reads this table at descending even indices (edge has the largest
/// index, strongest damping); a plus face reads it at ascending odd
/// indices. One packed table is shared by both the H and E face
/// corrections, matching the original's single `PMLbx`/`PMLax` table.
#[derive(Debug, Clone)]
pub struct CpmlProfile {
    pub b: Array1<f64>,
    pub a: Array1<f64>,
    pub kappa: Array1<f64>,
}

impl CpmlProfile {
    /// `npml` layers deep, cell spacing `d`, time step `dt`.
    pub fn new(npml: usize, d: f64, dt: f64) -> Self {
        let packed = 2 * npml;
        let bdw = (packed as f64 - 1.0) * d;
        let sigma_max = -(GRADING_ORDER + 1.0) * REFLECTION_COEFF.ln() / (2.0 * eta0() * bdw);

        let mut b = Array1::zeros(packed);
        let mut a = Array1::zeros(packed);
        let mut kappa = Array1::zeros(packed);

        for i in 0..packed {
            let loc = i as f64 / (packed as f64 - 1.0);
            let sigma = sigma_max * loc.powf(GRADING_ORDER);
            let kap = 1.0 + (KAPPA_MAX - 1.0) * loc.powf(GRADING_ORDER);
            let alpha = ALPHA_MAX * (1.0 - loc).powf(ALPHA_ORDER);

            let bi = (-(sigma / kap + alpha) * dt / crate::constants::EPS0).exp();
            let denom = kap * (sigma + kap * alpha);
            let ai = if denom.abs() > 0.0 {
                sigma * (bi - 1.0) / denom
            } else {
                0.0
            };

            b[i] = bi;
            a[i] = ai;
            kappa[i] = kap;
        }

        CpmlProfile { b, a, kappa }
    }
}

/// One face's auxiliary convolution memory (`psi`), shaped like the
/// 2-D slab of cells normal to the PML axis times `npml` layers deep.
pub struct PsiField {
    pub data: Array3<Complex64>,
}

impl PsiField {
    fn zeros(shape: (usize, usize, usize)) -> Self {
        PsiField {
            data: Array3::zeros(shape),
        }
    }
}

/// Axis identity for a CPML face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Which side of the axis (matches [`AxisRegion::Minus`]/[`AxisRegion::Plus`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Minus,
    Plus,
}

/// One active CPML face: its profile and the psi memories for the two
/// transverse field components it perturbs.
pub struct CpmlFace {
    pub axis: Axis,
    pub side: Side,
    pub npml: usize,
    pub profile: CpmlProfile,
    pub psi_e_a: PsiField,
    pub psi_e_b: PsiField,
    pub psi_h_a: PsiField,
    pub psi_h_b: PsiField,
}

impl CpmlFace {
    pub fn new(axis: Axis, side: Side, npml: usize, d: f64, dt: f64, transverse_shape: (usize, usize)) -> Self {
        let (t0, t1) = transverse_shape;
        let psi_shape = (npml, t0, t1);
        CpmlFace {
            axis,
            side,
            npml,
            profile: CpmlProfile::new(npml, d, dt),
            psi_e_a: PsiField::zeros(psi_shape),
            psi_e_b: PsiField::zeros(psi_shape),
            psi_h_a: PsiField::zeros(psi_shape),
            psi_h_b: PsiField::zeros(psi_shape),
        }
    }

    fn coeffs(&self, layer: usize) -> (f64, f64, f64) {
        (self.profile.b[layer], self.profile.a[layer], self.profile.kappa[layer])
    }

    /// Maps a local index from this face (0 = cell nearest the domain
    /// interior) to an index into the packed `2*npml` profile table, per
    /// `space.py::_PML_updateH_px`/`_mx` (odd indices ascending for a
    /// plus face, even indices descending for a minus face).
    fn layer_for(&self, index_from_face: usize) -> usize {
        match self.side {
            Side::Minus => 2 * (self.npml - 1 - index_from_face),
            Side::Plus => 2 * index_from_face + 1,
        }
    }

    /// Apply the CPML correction to the two curl-derivative arrays that
    /// feed the H update along this face's axis (spec.md §4.4/§4.5
    /// ordering: CPML runs after the plain curl derivative, before the
    /// coefficient-weighted field update). Corrects both in place over
    /// the `npml` cells adjacent to this face.
    pub fn correct_h(&mut self, diff_minor: &mut Array3<Complex64>, diff_major: &mut Array3<Complex64>, d: f64) {
        self.correct_face(diff_minor, diff_major, d, true);
    }

    /// Same as [`Self::correct_h`] but for the E update's curl terms.
    pub fn correct_e(&mut self, diff_minor: &mut Array3<Complex64>, diff_major: &mut Array3<Complex64>, d: f64) {
        self.correct_face(diff_minor, diff_major, d, false);
    }

    fn correct_face(
        &mut self,
        diff_minor: &mut Array3<Complex64>,
        diff_major: &mut Array3<Complex64>,
        d: f64,
        is_h: bool,
    ) {
        let axis_idx = match self.axis {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        };
        let shape = diff_minor.dim();
        let axis_len = [shape.0, shape.1, shape.2][axis_idx];
        let inv_d = 1.0 / d;

        for i in 0..self.npml.min(axis_len) {
            let layer = self.layer_for(i);
            let (b, a, kappa) = self.coeffs(layer);
            let global_index = match self.side {
                Side::Minus => i,
                Side::Plus => axis_len - 1 - i,
            };

            let psi_a = if is_h { &mut self.psi_h_a.data } else { &mut self.psi_e_a.data };
            let psi_b = if is_h { &mut self.psi_h_b.data } else { &mut self.psi_e_b.data };

            let (t0, t1) = (psi_a.dim().1, psi_a.dim().2);
            for p in 0..t0 {
                for q in 0..t1 {
                    let (gx, gy, gz) = match self.axis {
                        Axis::X => (global_index, p, q),
                        Axis::Y => (p, global_index, q),
                        Axis::Z => (p, q, global_index),
                    };
                    if gx >= shape.0 || gy >= shape.1 || gz >= shape.2 {
                        continue;
                    }

                    let raw_minor = diff_minor[(gx, gy, gz)] * inv_d;
                    let raw_major = diff_major[(gx, gy, gz)] * inv_d;

                    let new_pa = b * psi_a[(i, p, q)] + a * raw_minor;
                    let new_pb = b * psi_b[(i, p, q)] + a * raw_major;
                    psi_a[(i, p, q)] = new_pa;
                    psi_b[(i, p, q)] = new_pb;

                    diff_minor[(gx, gy, gz)] = diff_minor[(gx, gy, gz)] / kappa + new_pa * d;
                    diff_major[(gx, gy, gz)] = diff_major[(gx, gy, gz)] / kappa + new_pb * d;
                }
            }
        }
    }
}

/// Collects the active faces for one rank. The x faces only exist on the
/// rank(s) that own the corresponding domain boundary (spec.md §4.5
/// "rank gating": rank 0 owns `-x`, the last rank owns `+x`, a
/// single-rank run owns both).
pub struct CpmlStack {
    pub faces: Vec<CpmlFace>,
}

impl CpmlStack {
    pub fn build(pml: &crate::config::PmlSpec, grid: &crate::grid::Grid, dt: f64) -> Self {
        let mut faces = Vec::new();
        let (ny, nz) = (grid.ny, grid.nz);
        let (nx_local, _, _) = grid.local_shape();

        if pml.x.is_active() {
            if pml.x.has_minus() && grid.is_first_rank() {
                faces.push(CpmlFace::new(Axis::X, Side::Minus, pml.npml, grid.dx, dt, (ny, nz)));
            }
            if pml.x.has_plus() && grid.is_last_rank() {
                faces.push(CpmlFace::new(Axis::X, Side::Plus, pml.npml, grid.dx, dt, (ny, nz)));
            }
        }
        if pml.y.is_active() {
            if pml.y.has_minus() {
                faces.push(CpmlFace::new(Axis::Y, Side::Minus, pml.npml, grid.dy, dt, (nx_local, nz)));
            }
            if pml.y.has_plus() {
                faces.push(CpmlFace::new(Axis::Y, Side::Plus, pml.npml, grid.dy, dt, (nx_local, nz)));
            }
        }
        if pml.z.is_active() {
            if pml.z.has_minus() {
                faces.push(CpmlFace::new(Axis::Z, Side::Minus, pml.npml, grid.dz, dt, (nx_local, ny)));
            }
            if pml.z.has_plus() {
                faces.push(CpmlFace::new(Axis::Z, Side::Plus, pml.npml, grid.dz, dt, (nx_local, ny)));
            }
        }

        CpmlStack { faces }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// A PML cell painted with a PEC sentinel material should not absorb —
/// mirrors the teacher's PEC masking in `fdtd.rs::set_pec`.
pub fn is_pec(material: Complex64) -> bool {
    material.re >= PEC_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_decays_to_zero_loss_at_domain_edge() {
        let profile = CpmlProfile::new(10, 10e-9, 1e-18);
        // index 0 sits at the domain interior (loc = 0, no damping); the
        // last packed index sits at the domain edge (loc = 1, strongest).
        assert_eq!(profile.a[0], 0.0);
        assert!(profile.a[19].abs() > profile.a[10].abs());
    }

    #[test]
    fn profile_b_coefficients_are_bounded() {
        let profile = CpmlProfile::new(10, 10e-9, 1e-18);
        for &b in profile.b.iter() {
            assert!(b > 0.0 && b <= 1.0);
        }
    }

    #[test]
    fn minus_face_reads_descending_even_layers_plus_face_ascending_odd() {
        let face_minus = CpmlFace::new(Axis::X, Side::Minus, 4, 10e-9, 1e-18, (2, 2));
        assert_eq!(face_minus.layer_for(0), 6);
        assert_eq!(face_minus.layer_for(3), 0);

        let face_plus = CpmlFace::new(Axis::X, Side::Plus, 4, 10e-9, 1e-18, (2, 2));
        assert_eq!(face_plus.layer_for(0), 1);
        assert_eq!(face_plus.layer_for(3), 7);
    }

    #[test]
    fn stack_only_builds_x_faces_on_owning_ranks() {
        let cfg = crate::config::SimulationConfig {
            grid: (16, 8, 8),
            gridgap: (1e-9, 1e-9, 1e-9),
            dt: 1e-19,
            tsteps: 10,
            dtype: crate::config::DType::Complex64,
            engine: crate::config::Engine::Host,
            courant: 0.1,
            pml: crate::config::PmlSpec {
                x: AxisRegion::Both,
                y: AxisRegion::None,
                z: AxisRegion::None,
                npml: 4,
            },
            pbc: crate::config::PbcSpec::default(),
            bbc: crate::config::BbcSpec::default(),
        };
        let grid_mid = crate::grid::Grid::new(&cfg, 1, 4).unwrap();
        let stack_mid = CpmlStack::build(&cfg.pml, &grid_mid, cfg.dt);
        assert!(stack_mid.is_empty());

        let grid_first = crate::grid::Grid::new(&cfg, 0, 4).unwrap();
        let stack_first = CpmlStack::build(&cfg.pml, &grid_first, cfg.dt);
        assert_eq!(stack_first.faces.len(), 1);
        assert_eq!(stack_first.faces[0].side, Side::Minus);
    }
}
