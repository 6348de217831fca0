//! Leapfrog update kernels (spec.md §4.4).
//!
//! `update_h`/`update_e` apply the cached [`crate::field::Coefficients`]
//! against the curl terms assembled by [`crate::derivative`]. Structured
//! the same way as the original's `updateH`/`updateE` (compute all
//! Cartesian derivatives first, then a single coefficient-weighted
//! update pass), but the coefficients are read from cache instead of
//! recomputed (SPEC_FULL.md §9).

use crate::derivative::{DerivativeEngine, Stagger};
use crate::field::FieldStore;

/// Fill `fields.diff_{x,y,z}_{ey,ez,ex}` with the curl-of-E derivatives
/// the H update needs (spec.md §4.4 step 1, run before any CPML
/// correction so CPML has fresh derivatives to perturb).
pub fn compute_h_derivatives(
    fields: &mut FieldStore,
    backend: &dyn crate::backend::NumericBackend,
    deriv: &DerivativeEngine,
    ghost_ey_minus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_ey_plus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_ez_minus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_ez_plus: Option<&ndarray::Array2<num_complex::Complex64>>,
) {
    deriv.dy_cross_z(backend, &fields.ez, Stagger::Forward, Stagger::Forward, &mut fields.diff_y_ez);
    deriv.dz_cross_y(backend, &fields.ey, Stagger::Forward, Stagger::Forward, &mut fields.diff_z_ey);
    deriv.dx(&fields.ez, ghost_ez_minus, ghost_ez_plus, Stagger::Forward, &mut fields.diff_x_ez);
    deriv.dx(&fields.ey, ghost_ey_minus, ghost_ey_plus, Stagger::Forward, &mut fields.diff_x_ey);
    deriv.dz(backend, &fields.ex, Stagger::Forward, &mut fields.diff_z_ex);
    deriv.dy(backend, &fields.ex, Stagger::Forward, &mut fields.diff_y_ex);
}

/// Combine the (possibly CPML-corrected) curl derivatives into the
/// leapfrog H update (spec.md §4.4 step 3).
pub fn apply_h_update(fields: &mut FieldStore) {
    let curl_hx = &fields.diff_y_ez - &fields.diff_z_ey;
    let curl_hy = &fields.diff_z_ex - &fields.diff_x_ez;
    let curl_hz = &fields.diff_x_ey - &fields.diff_y_ex;

    let (c1, c2) = {
        let c = fields.coeff_h(crate::config::FieldId::Hx);
        (c.c1.clone(), c.c2.clone())
    };
    fields.hx = &fields.hx * &c1 + &curl_hx * &c2;

    let (c1, c2) = {
        let c = fields.coeff_h(crate::config::FieldId::Hy);
        (c.c1.clone(), c.c2.clone())
    };
    fields.hy = &fields.hy * &c1 + &curl_hy * &c2;

    let (c1, c2) = {
        let c = fields.coeff_h(crate::config::FieldId::Hz);
        (c.c1.clone(), c.c2.clone())
    };
    fields.hz = &fields.hz * &c1 + &curl_hz * &c2;
}

/// `H^(n+1/2) = c1*H^(n-1/2) + c2*curl(E^n)`, no CPML correction. Used
/// directly by callers that have no active PML faces (and by tests);
/// [`crate::orchestrator`] instead calls [`compute_h_derivatives`],
/// corrects the scratch arrays via [`crate::cpml::CpmlFace`], then calls
/// [`apply_h_update`].
pub fn update_h(
    fields: &mut FieldStore,
    backend: &dyn crate::backend::NumericBackend,
    deriv: &DerivativeEngine,
    ghost_ey_minus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_ey_plus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_ez_minus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_ez_plus: Option<&ndarray::Array2<num_complex::Complex64>>,
) {
    compute_h_derivatives(fields, backend, deriv, ghost_ey_minus, ghost_ey_plus, ghost_ez_minus, ghost_ez_plus);
    apply_h_update(fields);
}

/// Fill `fields.diff_{x,y,z}_{hy,hz,hx}` with the curl-of-H derivatives
/// the E update needs (spec.md §4.4 step 1).
pub fn compute_e_derivatives(
    fields: &mut FieldStore,
    backend: &dyn crate::backend::NumericBackend,
    deriv: &DerivativeEngine,
    ghost_hy_minus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_hy_plus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_hz_minus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_hz_plus: Option<&ndarray::Array2<num_complex::Complex64>>,
) {
    deriv.dy(backend, &fields.hz, Stagger::Backward, &mut fields.diff_y_hz);
    deriv.dz(backend, &fields.hy, Stagger::Backward, &mut fields.diff_z_hy);
    deriv.dx(&fields.hz, ghost_hz_minus, ghost_hz_plus, Stagger::Backward, &mut fields.diff_x_hz);
    deriv.dx(&fields.hy, ghost_hy_minus, ghost_hy_plus, Stagger::Backward, &mut fields.diff_x_hy);
    deriv.dz_cross_y(backend, &fields.hx, Stagger::Backward, Stagger::Backward, &mut fields.diff_z_hx);
    deriv.dy_cross_z(backend, &fields.hx, Stagger::Backward, Stagger::Backward, &mut fields.diff_y_hx);
}

/// Combine the (possibly CPML-corrected) curl derivatives into the
/// leapfrog E update, then PEC-masks via the cached zero coefficients
/// (already baked into `c1`/`c2` by [`crate::field::Coefficients::build`]).
pub fn apply_e_update(fields: &mut FieldStore) {
    let curl_ex = &fields.diff_y_hz - &fields.diff_z_hy;
    let curl_ey = &fields.diff_z_hx - &fields.diff_x_hz;
    let curl_ez = &fields.diff_x_hy - &fields.diff_y_hx;

    let (c1, c2) = {
        let c = fields.coeff_e(crate::config::FieldId::Ex);
        (c.c1.clone(), c.c2.clone())
    };
    fields.ex = &fields.ex * &c1 + &curl_ex * &c2;

    let (c1, c2) = {
        let c = fields.coeff_e(crate::config::FieldId::Ey);
        (c.c1.clone(), c.c2.clone())
    };
    fields.ey = &fields.ey * &c1 + &curl_ey * &c2;

    let (c1, c2) = {
        let c = fields.coeff_e(crate::config::FieldId::Ez);
        (c.c1.clone(), c.c2.clone())
    };
    fields.ez = &fields.ez * &c1 + &curl_ez * &c2;
}

/// `E^(n+1) = c1*E^n + c2*curl(H^(n+1/2))`, no CPML correction.
pub fn update_e(
    fields: &mut FieldStore,
    backend: &dyn crate::backend::NumericBackend,
    deriv: &DerivativeEngine,
    ghost_hy_minus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_hy_plus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_hz_minus: Option<&ndarray::Array2<num_complex::Complex64>>,
    ghost_hz_plus: Option<&ndarray::Array2<num_complex::Complex64>>,
) {
    compute_e_derivatives(fields, backend, deriv, ghost_hy_minus, ghost_hy_plus, ghost_hz_minus, ghost_hz_plus);
    apply_e_update(fields);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostBackend;
    use crate::config::{BbcSpec, DType, Engine, PbcSpec, PmlSpec, SimulationConfig};
    use crate::grid::Grid;

    fn make_grid(n: usize) -> Grid {
        let cfg = SimulationConfig {
            grid: (n, n, n),
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
    fn leapfrog_step_preserves_zero_state() {
        let grid = make_grid(8);
        let mut fields = FieldStore::new(&grid, 1e-19);
        let deriv = DerivativeEngine::new(&grid);
        let backend = HostBackend;

        update_h(&mut fields, &backend, &deriv, None, None, None, None);
        update_e(&mut fields, &backend, &deriv, None, None, None, None);

        assert_eq!(fields.total_energy(), 0.0);
        assert!(fields.is_stable());
    }

    #[test]
    fn single_pulse_injects_nonzero_energy_after_step() {
        let grid = make_grid(8);
        let mut fields = FieldStore::new(&grid, 1e-19);
        let deriv = DerivativeEngine::new(&grid);
        let backend = HostBackend;

        fields.ex[(4, 4, 4)] = num_complex::Complex64::new(1.0, 0.0);
        update_h(&mut fields, &backend, &deriv, None, None, None, None);
        assert!(fields.is_stable());
        // H should pick up some nonzero curl response near the pulse.
        let energy: f64 = fields
            .hy
            .iter()
            .map(|c| c.norm_sqr())
            .sum::<f64>()
            + fields.hz.iter().map(|c| c.norm_sqr()).sum::<f64>();
        assert!(energy > 0.0);
    }
}
