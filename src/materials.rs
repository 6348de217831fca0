//! Material presets and region painting (spec.md §4.2), generalized to
//! 3-D from the teacher's `Material`/`MaterialPresets`
//! (`examples/SpaceEngineerSS-PhotonLab/rust-core/src/materials.rs`).
//! PEC is represented via [`crate::constants::PEC_SENTINEL`] rather than
//! a separate enum tag, so the update kernels only need one numeric
//! comparison instead of branching on material type.

use num_complex::Complex64;

use crate::constants::{EPS0, MU0, PEC_SENTINEL};
use crate::field::FieldStore;

/// Relative permittivity, relative permeability, and conductivity (S/m)
/// for one material (teacher's `Material`, minus the wasm-bindgen surface).
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub epsilon_r: f64,
    pub mu_r: f64,
    pub sigma: f64,
}

impl Material {
    pub fn new(epsilon_r: f64, mu_r: f64, sigma: f64) -> Self {
        Material { epsilon_r: epsilon_r.max(0.01), mu_r: mu_r.max(0.01), sigma: sigma.max(0.0) }
    }

    pub fn pec() -> Self {
        Material { epsilon_r: PEC_SENTINEL, mu_r: PEC_SENTINEL, sigma: 0.0 }
    }

    pub fn is_pec(&self) -> bool {
        self.epsilon_r >= PEC_SENTINEL
    }

    fn eps(&self) -> Complex64 {
        Complex64::new(self.epsilon_r * EPS0, 0.0)
    }

    fn mu(&self) -> Complex64 {
        Complex64::new(self.mu_r * MU0, 0.0)
    }
}

pub struct MaterialPresets;

impl MaterialPresets {
    pub fn vacuum() -> Material {
        Material::new(1.0, 1.0, 0.0)
    }
    pub fn air() -> Material {
        Material::new(1.0006, 1.0, 0.0)
    }
    pub fn glass() -> Material {
        Material::new(2.25, 1.0, 0.0)
    }
    pub fn crystal() -> Material {
        Material::new(4.0, 1.0, 0.0)
    }
    pub fn water() -> Material {
        Material::new(78.0, 1.0, 0.05)
    }
    pub fn silicon() -> Material {
        Material::new(11.7, 1.0, 0.0)
    }
    pub fn metal() -> Material {
        Material::pec()
    }
    pub fn absorber() -> Material {
        Material::new(1.0, 1.0, 0.5)
    }
    pub fn strong_absorber() -> Material {
        Material::new(1.0, 1.0, 2.0)
    }
}

/// Axis-aligned box region in local-index space, `[x0, x1) x [y0, y1) x [z0, z1)`.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
    pub z0: usize,
    pub z1: usize,
}

/// Paints `material` over `region` in every E/H material array. Callers
/// must call [`FieldStore::refresh_coefficients`] once after all
/// painting for a run is complete (spec.md §5 "material arrays are
/// write-once at setup").
pub fn paint_region(fields: &mut FieldStore, region: Region, material: Material) {
    let eps = material.eps();
    let mu = material.mu();
    let sigma = Complex64::new(material.sigma, 0.0);

    for x in region.x0..region.x1 {
        for y in region.y0..region.y1 {
            for z in region.z0..region.z1 {
                if x >= fields.eps_ex.dim().0 || y >= fields.eps_ex.dim().1 || z >= fields.eps_ex.dim().2 {
                    continue;
                }
                fields.eps_ex[(x, y, z)] = eps;
                fields.eps_ey[(x, y, z)] = eps;
                fields.eps_ez[(x, y, z)] = eps;
                fields.mu_hx[(x, y, z)] = mu;
                fields.mu_hy[(x, y, z)] = mu;
                fields.mu_hz[(x, y, z)] = mu;
                fields.econ_ex[(x, y, z)] = sigma;
                fields.econ_ey[(x, y, z)] = sigma;
                fields.econ_ez[(x, y, z)] = sigma;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BbcSpec, DType, Engine, PbcSpec, PmlSpec, SimulationConfig};
    use crate::grid::Grid;

    fn make_fields() -> FieldStore {
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
        let grid = Grid::new(&cfg, 0, 1).unwrap();
        FieldStore::new(&grid, cfg.dt)
    }

    #[test]
    fn pec_material_is_detected_via_sentinel() {
        assert!(MaterialPresets::metal().is_pec());
        assert!(!MaterialPresets::glass().is_pec());
    }

    #[test]
    fn painting_a_region_updates_only_that_region() {
        let mut fields = make_fields();
        paint_region(
            &mut fields,
            Region { x0: 1, x1: 3, y0: 1, y1: 3, z0: 1, z1: 3 },
            MaterialPresets::glass(),
        );
        assert!((fields.eps_ex[(1, 1, 1)].re / EPS0 - 2.25).abs() < 1e-9);
        assert!((fields.eps_ex[(0, 0, 0)].re / EPS0 - 1.0).abs() < 1e-9);

        paint_region(
            &mut fields,
            Region { x0: 4, x1: 5, y0: 4, y1: 5, z0: 4, z1: 5 },
            MaterialPresets::metal(),
        );
        fields.refresh_coefficients();
        let c = fields.coeff_e(crate::config::FieldId::Ex);
        assert_eq!(c.c1[(4, 4, 4)], Complex64::new(0.0, 0.0));
    }
}
