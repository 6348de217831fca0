//! External configuration surface (spec.md §6, §9 "Design Notes").
//!
//! Region descriptors are closed tagged enums rather than the original's
//! free-form strings (`''`, `'+'`, `'-'`, `'+-'`) — see SPEC_FULL.md §9.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// One of the six Yee-staggered field components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldId {
    Ex,
    Ey,
    Ez,
    Hx,
    Hy,
    Hz,
}

impl FieldId {
    /// Case-insensitive parse of the original's string field selector
    /// (`'Ex'`, `'ex'`, ...), kept at the config boundary only.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ex" => Ok(FieldId::Ex),
            "ey" => Ok(FieldId::Ey),
            "ez" => Ok(FieldId::Ez),
            "hx" => Ok(FieldId::Hx),
            "hy" => Ok(FieldId::Hy),
            "hz" => Ok(FieldId::Hz),
            other => Err(SolverError::Configuration(format!(
                "unknown field component '{other}'"
            ))),
        }
    }

    pub fn is_electric(self) -> bool {
        matches!(self, FieldId::Ex | FieldId::Ey | FieldId::Ez)
    }
}

/// Source injection mode (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjectionMode {
    /// `F[region] += value`
    Soft,
    /// `F[region] = value`
    Hard,
}

/// A per-axis PML activation descriptor. `None` ports the original's
/// `''`, `Minus`/`Plus` the original's `'-'`/`'+'`, `Both` the original's
/// `'+-'`/`'-+'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisRegion {
    None,
    Minus,
    Plus,
    Both,
}

impl AxisRegion {
    pub fn has_minus(self) -> bool {
        matches!(self, AxisRegion::Minus | AxisRegion::Both)
    }

    pub fn has_plus(self) -> bool {
        matches!(self, AxisRegion::Plus | AxisRegion::Both)
    }

    pub fn is_active(self) -> bool {
        !matches!(self, AxisRegion::None)
    }
}

/// PML region spec: one [`AxisRegion`] per axis, plus layer count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PmlSpec {
    pub x: AxisRegion,
    pub y: AxisRegion,
    pub z: AxisRegion,
    pub npml: usize,
}

impl Default for PmlSpec {
    fn default() -> Self {
        PmlSpec {
            x: AxisRegion::None,
            y: AxisRegion::None,
            z: AxisRegion::None,
            npml: 10,
        }
    }
}

/// Periodic boundary condition region spec (spec.md §6, §9).
///
/// `x` follows the original's "None or '+-'" semantics: PBC along x only
/// ever pairs rank 0 with rank size-1, so there is no independent
/// minus/plus choice the way there is for PML.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PbcSpec {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

/// Bloch wavevector component carried by a Bloch-periodic axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlochPhase {
    /// Bloch wavenumber k (rad/m) along this axis.
    pub k: f64,
    /// Period length L (m) along this axis (usually Nx*dx etc).
    pub period: f64,
}

/// Bloch boundary condition region spec; shape mirrors [`PbcSpec`] but
/// each active axis additionally carries a [`BlochPhase`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BbcSpec {
    pub x: Option<BlochPhase>,
    pub y: Option<BlochPhase>,
    pub z: Option<BlochPhase>,
}

/// Field scalar kind (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    Real32,
    Real64,
    Complex64,
    Complex128,
}

impl DType {
    pub fn is_complex(self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }
}

/// Numeric backend selection (spec.md §6, §9 "Device/host duality").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Engine {
    Host,
    Device,
}

/// Immutable global configuration (spec.md §3 "Global configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub grid: (usize, usize, usize),
    pub gridgap: (f64, f64, f64),
    pub dt: f64,
    pub tsteps: usize,
    pub dtype: DType,
    pub engine: Engine,
    /// Informational only; does not recompute `dt` (spec.md §3).
    pub courant: f64,
    pub pml: PmlSpec,
    pub pbc: PbcSpec,
    pub bbc: BbcSpec,
}

impl SimulationConfig {
    /// Maximum stable `dt` under the 3-D Courant condition (spec.md §3).
    pub fn max_dt(&self) -> f64 {
        let (dx, dy, dz) = self.gridgap;
        1.0 / crate::constants::C0 / (1.0 / (dx * dx) + 1.0 / (dy * dy) + 1.0 / (dz * dz)).sqrt()
    }

    /// Validate construction-time invariants (spec.md §3, §7).
    ///
    /// `world_size` is the MPI communicator size the decomposition will
    /// run under; `Nx` must be divisible by it.
    pub fn validate(&self, world_size: usize) -> Result<()> {
        let (nx, ny, nz) = self.grid;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(SolverError::Configuration(
                "grid dimensions must be positive".into(),
            ));
        }
        let (dx, dy, dz) = self.gridgap;
        if dx <= 0.0 || dy <= 0.0 || dz <= 0.0 {
            return Err(SolverError::Configuration(
                "grid spacing must be positive".into(),
            ));
        }
        if self.tsteps == 0 {
            return Err(SolverError::Configuration(
                "tsteps must be positive".into(),
            ));
        }
        if nx % world_size != 0 {
            return Err(SolverError::Configuration(format!(
                "Nx ({nx}) must be a multiple of the number of ranks ({world_size})"
            )));
        }
        let max_dt = self.max_dt();
        if !(self.dt > 0.0 && self.dt < max_dt) {
            return Err(SolverError::Configuration(format!(
                "dt ({}) must satisfy 0 < dt < {max_dt} (Courant/CFL condition)",
                self.dt
            )));
        }
        Ok(())
    }
}
