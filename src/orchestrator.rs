//! Per-step orchestration (spec.md §5 "ordering guarantees").
//!
//! Mirrors the original's `Basic3D.updateH`/`updateE` call order inside
//! its time loop (`examples/original_source/.../space.py`): exchange
//! ghost planes, take the curl derivative, apply any active CPML
//! correction, combine into the leapfrog update, then inject sources and
//! accumulate flux collectors. `compute_h_derivatives`/`apply_h_update`
//! (and their E counterparts) are split in [`crate::update`] precisely so
//! this ordering can insert the CPML step in between.

use std::time::Instant;

use ndarray::Array2;
use num_complex::Complex64;

use crate::backend::{HostBackend, NumericBackend};
use crate::boundary::{apply_bloch_phase_to_ghost, apply_bloch_phase_y, apply_bloch_phase_z, bbc_x_partner, pbc_x_partner};
use crate::collectors::FluxCollector;
use crate::comm::{Halo, MessageTag, Neighborhood, PlaneKind};
use crate::config::SimulationConfig;
use crate::cpml::{Axis as CpmlAxis, CpmlStack};
use crate::derivative::DerivativeEngine;
use crate::diagnostics::{report_startup, report_step};
use crate::field::FieldStore;
use crate::grid::Grid;
use crate::source::{PhasedArraySource, PlaneWaveSource, PointSource, Probe};
use crate::update::{apply_e_update, apply_h_update, compute_e_derivatives, compute_h_derivatives};

/// Owns every per-run component and drives the time loop.
pub struct Simulation {
    pub config: SimulationConfig,
    pub grid: Grid,
    pub fields: FieldStore,
    deriv: DerivativeEngine,
    backend: Box<dyn NumericBackend>,
    cpml: CpmlStack,
    halo: Halo,
    pub point_sources: Vec<PointSource>,
    pub plane_sources: Vec<PlaneWaveSource>,
    pub array_sources: Vec<PhasedArraySource>,
    pub probes: Vec<Probe>,
    pub collectors: Vec<FluxCollector>,
    tstep: usize,
}

impl Simulation {
    #[cfg(feature = "mpi-comm")]
    pub fn new(config: SimulationConfig, world: mpi::topology::SimpleCommunicator) -> crate::error::Result<Self> {
        use mpi::traits::Communicator;
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        config.validate(size)?;
        let grid = Grid::new(&config, rank, size)?;
        let fields = FieldStore::new(&grid, config.dt);
        let deriv = DerivativeEngine::new(&grid);
        let cpml = CpmlStack::build(&config.pml, &grid, config.dt);
        let neighborhood = Neighborhood::from_grid(&grid);
        let halo = Halo::new(neighborhood, rank, world);

        if rank == 0 {
            report_startup(size, config.tsteps, config.dt);
        }

        Ok(Simulation {
            config,
            grid,
            fields,
            deriv,
            backend: Box::new(HostBackend),
            cpml,
            halo,
            point_sources: Vec::new(),
            plane_sources: Vec::new(),
            array_sources: Vec::new(),
            probes: Vec::new(),
            collectors: Vec::new(),
            tstep: 0,
        })
    }

    #[cfg(not(feature = "mpi-comm"))]
    pub fn new(config: SimulationConfig) -> crate::error::Result<Self> {
        config.validate(1)?;
        let grid = Grid::new(&config, 0, 1)?;
        let fields = FieldStore::new(&grid, config.dt);
        let deriv = DerivativeEngine::new(&grid);
        let cpml = CpmlStack::build(&config.pml, &grid, config.dt);
        let neighborhood = Neighborhood::from_grid(&grid);
        let halo = Halo::new(neighborhood, 0);

        report_startup(1, config.tsteps, config.dt);

        Ok(Simulation {
            config,
            grid,
            fields,
            deriv,
            backend: Box::new(HostBackend),
            cpml,
            halo,
            point_sources: Vec::new(),
            plane_sources: Vec::new(),
            array_sources: Vec::new(),
            probes: Vec::new(),
            collectors: Vec::new(),
            tstep: 0,
        })
    }

    fn boundary_plane(field: &ndarray::Array3<Complex64>, at_high_x: bool) -> Array2<Complex64> {
        let nx = field.dim().0;
        let x = if at_high_x { nx - 1 } else { 0 };
        field.slice(ndarray::s![x, .., ..]).to_owned()
    }

    /// Exchange ghost planes with this rank's x-neighbors, or with the
    /// wrapped-around partner when PBC/BBC is active on x (spec.md §4.6).
    /// A BBC wrap additionally rotates the received ghost plane by
    /// `exp(+-i*k*L)` once it arrives, since the plane came from the
    /// opposite physical edge of the domain rather than a true neighbor.
    fn exchange_ghosts(&self, kind_minor: PlaneKind, minor: &ndarray::Array3<Complex64>, kind_major: PlaneKind, major: &ndarray::Array3<Complex64>) -> ([Option<Array2<Complex64>>; 2], [Option<Array2<Complex64>>; 2]) {
        let send_minor_prev = Some(Self::boundary_plane(minor, false));
        let send_minor_next = Some(Self::boundary_plane(minor, true));
        let send_major_prev = Some(Self::boundary_plane(major, false));
        let send_major_next = Some(Self::boundary_plane(major, true));

        let grid_prev = self.grid.prev_rank();
        let grid_next = self.grid.next_rank();

        let (eff_prev, eff_next, wrap_phase) = if self.config.pbc.x {
            let (p, n) = pbc_x_partner(&self.grid, &self.config.pbc).unwrap_or((grid_prev, grid_next));
            (p, n, None)
        } else if let Some((p, n, phase)) = bbc_x_partner(&self.grid, &self.config.bbc) {
            (p, n, Some(phase))
        } else {
            (grid_prev, grid_next, None)
        };

        let wrapped_prev = eff_prev.is_some() && eff_prev != grid_prev;
        let wrapped_next = eff_next.is_some() && eff_next != grid_next;

        let tag_minor = MessageTag::new(self.tstep, kind_minor);
        let tag_major = MessageTag::new(self.tstep, kind_major);

        let mut minor_result = self
            .halo
            .exchange_plane(tag_minor, eff_prev, eff_next, send_minor_prev.as_ref().map(|a| a.view()), send_minor_next.as_ref().map(|a| a.view()))
            .unwrap_or((None, None));
        let mut major_result = self
            .halo
            .exchange_plane(tag_major, eff_prev, eff_next, send_major_prev.as_ref().map(|a| a.view()), send_major_next.as_ref().map(|a| a.view()))
            .unwrap_or((None, None));

        if let Some(phase) = wrap_phase {
            if wrapped_prev {
                if let Some(p) = minor_result.0.as_mut() {
                    apply_bloch_phase_to_ghost(p, &phase, true);
                }
                if let Some(p) = major_result.0.as_mut() {
                    apply_bloch_phase_to_ghost(p, &phase, true);
                }
            }
            if wrapped_next {
                if let Some(p) = minor_result.1.as_mut() {
                    apply_bloch_phase_to_ghost(p, &phase, false);
                }
                if let Some(p) = major_result.1.as_mut() {
                    apply_bloch_phase_to_ghost(p, &phase, false);
                }
            }
        }

        ([minor_result.0, minor_result.1], [major_result.0, major_result.1])
    }

    /// Multiplies the seam of `field` by the Bloch phase, or by its
    /// inverse when `revert` is set (undoing the multiply after the
    /// spectral derivative that needed it has run).
    fn toggle_bbc_y(field: &mut ndarray::Array3<Complex64>, phase: &crate::config::BlochPhase, revert: bool) {
        let applied = if revert { crate::config::BlochPhase { k: -phase.k, period: phase.period } } else { *phase };
        apply_bloch_phase_y(field, &applied);
    }

    fn toggle_bbc_z(field: &mut ndarray::Array3<Complex64>, phase: &crate::config::BlochPhase, revert: bool) {
        let applied = if revert { crate::config::BlochPhase { k: -phase.k, period: phase.period } } else { *phase };
        apply_bloch_phase_z(field, &applied);
    }

    /// Advance the simulation by one leapfrog step (H half-step then E
    /// full step), in the original's ordering. A Bloch-periodic y/z axis
    /// (spec.md §4.6 BBC) rotates the seam of the fields feeding the
    /// spectral derivative just for the duration of that derivative call,
    /// then rotates it back so the persisted field state is unaffected.
    pub fn step(&mut self) {
        let bbc_y = self.config.bbc.y;
        let bbc_z = self.config.bbc.z;

        let (ey_ghosts, ez_ghosts) = self.exchange_ghosts(PlaneKind::Ey, &self.fields.ey, PlaneKind::Ez, &self.fields.ez);

        if let Some(phase) = bbc_y {
            Self::toggle_bbc_y(&mut self.fields.ez, &phase, false);
            Self::toggle_bbc_y(&mut self.fields.ex, &phase, false);
        }
        if let Some(phase) = bbc_z {
            Self::toggle_bbc_z(&mut self.fields.ey, &phase, false);
            Self::toggle_bbc_z(&mut self.fields.ex, &phase, false);
        }

        compute_h_derivatives(
            &mut self.fields,
            self.backend.as_ref(),
            &self.deriv,
            ey_ghosts[0].as_ref(),
            ey_ghosts[1].as_ref(),
            ez_ghosts[0].as_ref(),
            ez_ghosts[1].as_ref(),
        );

        if let Some(phase) = bbc_y {
            Self::toggle_bbc_y(&mut self.fields.ez, &phase, true);
            Self::toggle_bbc_y(&mut self.fields.ex, &phase, true);
        }
        if let Some(phase) = bbc_z {
            Self::toggle_bbc_z(&mut self.fields.ey, &phase, true);
            Self::toggle_bbc_z(&mut self.fields.ex, &phase, true);
        }

        for face in &mut self.cpml.faces {
            match face.axis {
                CpmlAxis::X => face.correct_h(&mut self.fields.diff_x_ez, &mut self.fields.diff_x_ey, self.grid.dx),
                CpmlAxis::Y => face.correct_h(&mut self.fields.diff_y_ez, &mut self.fields.diff_y_ex, self.grid.dy),
                CpmlAxis::Z => face.correct_h(&mut self.fields.diff_z_ey, &mut self.fields.diff_z_ex, self.grid.dz),
            }
        }

        apply_h_update(&mut self.fields);

        for src in &self.point_sources {
            if !src.field.is_electric() {
                let target = match src.field {
                    crate::config::FieldId::Hx => &mut self.fields.hx,
                    crate::config::FieldId::Hy => &mut self.fields.hy,
                    crate::config::FieldId::Hz => &mut self.fields.hz,
                    _ => continue,
                };
                src.inject(&self.grid, target, self.tstep as f64 * self.config.dt);
            }
        }

        let (hy_ghosts, hz_ghosts) = self.exchange_ghosts(PlaneKind::Hy, &self.fields.hy, PlaneKind::Hz, &self.fields.hz);

        if let Some(phase) = bbc_y {
            Self::toggle_bbc_y(&mut self.fields.hz, &phase, false);
            Self::toggle_bbc_y(&mut self.fields.hx, &phase, false);
        }
        if let Some(phase) = bbc_z {
            Self::toggle_bbc_z(&mut self.fields.hy, &phase, false);
            Self::toggle_bbc_z(&mut self.fields.hx, &phase, false);
        }

        compute_e_derivatives(
            &mut self.fields,
            self.backend.as_ref(),
            &self.deriv,
            hy_ghosts[0].as_ref(),
            hy_ghosts[1].as_ref(),
            hz_ghosts[0].as_ref(),
            hz_ghosts[1].as_ref(),
        );

        if let Some(phase) = bbc_y {
            Self::toggle_bbc_y(&mut self.fields.hz, &phase, true);
            Self::toggle_bbc_y(&mut self.fields.hx, &phase, true);
        }
        if let Some(phase) = bbc_z {
            Self::toggle_bbc_z(&mut self.fields.hy, &phase, true);
            Self::toggle_bbc_z(&mut self.fields.hx, &phase, true);
        }

        for face in &mut self.cpml.faces {
            match face.axis {
                CpmlAxis::X => face.correct_e(&mut self.fields.diff_x_hz, &mut self.fields.diff_x_hy, self.grid.dx),
                CpmlAxis::Y => face.correct_e(&mut self.fields.diff_y_hz, &mut self.fields.diff_y_hx, self.grid.dy),
                CpmlAxis::Z => face.correct_e(&mut self.fields.diff_z_hy, &mut self.fields.diff_z_hx, self.grid.dz),
            }
        }

        apply_e_update(&mut self.fields);

        let t = self.tstep as f64 * self.config.dt;
        for src in &self.point_sources {
            if src.field.is_electric() {
                let target = match src.field {
                    crate::config::FieldId::Ex => &mut self.fields.ex,
                    crate::config::FieldId::Ey => &mut self.fields.ey,
                    crate::config::FieldId::Ez => &mut self.fields.ez,
                    _ => continue,
                };
                src.inject(&self.grid, target, t);
            }
        }
        for src in &self.plane_sources {
            let target = match src.field {
                crate::config::FieldId::Ex => &mut self.fields.ex,
                crate::config::FieldId::Ey => &mut self.fields.ey,
                crate::config::FieldId::Ez => &mut self.fields.ez,
                _ => continue,
            };
            src.inject(&self.grid, target, t);
        }
        for src in &self.array_sources {
            src.inject(&self.grid, &mut self.fields.ez, t);
        }

        for probe in &mut self.probes {
            probe.record(&self.grid, &self.fields.ez);
        }
        for collector in &mut self.collectors {
            // Tangential-to-the-plane E/H pairs, ordered so `do_rft`'s
            // `e_minor*conj(h_major) - e_major*conj(h_minor)` matches the
            // original's `get_Sx`/`get_Sy`/`get_Sz` formulas exactly:
            // Sx = Ey.Hz* - Ez.Hy*, Sy = Ez.Hx* - Ex.Hz*, Sz = Ex.Hy* - Ey.Hx*.
            let (e_minor, e_major, h_minor, h_major) = match collector.axis {
                crate::collectors::FluxAxis::X => (&self.fields.ey, &self.fields.ez, &self.fields.hy, &self.fields.hz),
                crate::collectors::FluxAxis::Y => (&self.fields.ez, &self.fields.ex, &self.fields.hz, &self.fields.hx),
                crate::collectors::FluxAxis::Z => (&self.fields.ex, &self.fields.ey, &self.fields.hx, &self.fields.hy),
            };
            collector.do_rft(&self.grid, self.tstep, self.config.dt, e_minor, e_major, h_minor, h_major);
        }

        self.tstep += 1;
    }

    /// Run the full configured number of steps, logging progress every
    /// `log_every` steps (rank 0 only).
    pub fn run(&mut self, log_every: usize) {
        let start = Instant::now();
        for n in 0..self.config.tsteps {
            self.step();
            if log_every > 0 && n % log_every == 0 {
                report_step(self.grid.rank, n, self.config.tsteps, start.elapsed(), self.fields.total_energy(), self.fields.is_stable());
            }
        }
    }
}
