//! Grid & Decomposition (spec.md §4.1).
//!
//! Partitions the global domain into equal x-slabs. Uniform slabs avoid
//! load-balance bookkeeping; decomposing only along x means halo
//! exchange only ever touches one axis (grounded in
//! `examples/original_source/.../space.py::Basic3D.__init__`, which
//! builds the same `myNx_slices`/`myNx_indice` table).

use log::info;

use crate::config::SimulationConfig;
use crate::error::{Result, SolverError};

/// Inclusive-exclusive global x-index range `[xsrt, xend)` owned by one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabRange {
    pub xsrt: usize,
    pub xend: usize,
}

impl SlabRange {
    pub fn len(&self) -> usize {
        self.xend - self.xsrt
    }

    pub fn is_empty(&self) -> bool {
        self.xsrt >= self.xend
    }

    pub fn contains_global(&self, x: usize) -> bool {
        x >= self.xsrt && x < self.xend
    }
}

/// Owns global dimensions, spacing, and the per-rank x-slab table.
#[derive(Debug, Clone)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub rank: usize,
    pub size: usize,
    pub my_nx: usize,
    /// `slabs[r]` is the global x-range owned by rank `r`.
    slabs: Vec<SlabRange>,
}

impl Grid {
    /// Construct the decomposition for `rank` out of `size` ranks.
    ///
    /// Precondition: `Nx % size == 0` (spec.md §4.1); violating it is a
    /// fatal configuration error.
    pub fn new(config: &SimulationConfig, rank: usize, size: usize) -> Result<Self> {
        let (nx, ny, nz) = config.grid;
        if nx % size != 0 {
            return Err(SolverError::Configuration(format!(
                "Nx ({nx}) must be a multiple of the number of ranks ({size})"
            )));
        }
        if rank >= size {
            return Err(SolverError::Configuration(format!(
                "rank {rank} out of range for communicator of size {size}"
            )));
        }

        let my_nx = nx / size;
        let slabs = (0..size)
            .map(|r| SlabRange {
                xsrt: r * my_nx,
                xend: (r + 1) * my_nx,
            })
            .collect();

        let (dx, dy, dz) = config.gridgap;
        let grid = Grid {
            nx,
            ny,
            nz,
            dx,
            dy,
            dz,
            rank,
            size,
            my_nx,
            slabs,
        };

        if rank == 0 {
            let volume = (nx as f64 * dx) * (ny as f64 * dy) * (nz as f64 * dz);
            info!(
                "grid: {}x{}x{} cells, spacing ({:.3e}, {:.3e}, {:.3e}) m, volume {:.3e} m^3, {} rank(s)",
                nx, ny, nz, dx, dy, dz, volume, size
            );
        }

        Ok(grid)
    }

    /// The local shape `(myNx, Ny, Nz)` every field/material array shares.
    pub fn local_shape(&self) -> (usize, usize, usize) {
        (self.my_nx, self.ny, self.nz)
    }

    pub fn slab(&self, rank: usize) -> SlabRange {
        self.slabs[rank]
    }

    pub fn my_slab(&self) -> SlabRange {
        self.slabs[self.rank]
    }

    pub fn is_first_rank(&self) -> bool {
        self.rank == 0
    }

    pub fn is_last_rank(&self) -> bool {
        self.rank == self.size - 1
    }

    /// Previous-rank neighbor, or `None` if this is rank 0.
    pub fn prev_rank(&self) -> Option<usize> {
        if self.rank == 0 {
            None
        } else {
            Some(self.rank - 1)
        }
    }

    /// Next-rank neighbor, or `None` if this is the last rank.
    pub fn next_rank(&self) -> Option<usize> {
        if self.rank + 1 < self.size {
            Some(self.rank + 1)
        } else {
            None
        }
    }

    /// Map a global x index to a local x index within this rank's slab,
    /// or `None` if the index lies outside it.
    pub fn global_to_local_x(&self, global_x: usize) -> Option<usize> {
        let slab = self.my_slab();
        if slab.contains_global(global_x) {
            Some(global_x - slab.xsrt)
        } else {
            None
        }
    }

    pub fn local_to_global_x(&self, local_x: usize) -> usize {
        self.my_slab().xsrt + local_x
    }

    /// Find which rank owns a given global x index, if any.
    pub fn owner_of(&self, global_x: usize) -> Option<usize> {
        self.slabs
            .iter()
            .position(|s| s.contains_global(global_x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BbcSpec, DType, Engine, PbcSpec, PmlSpec};

    fn cfg(nx: usize) -> SimulationConfig {
        SimulationConfig {
            grid: (nx, 16, 16),
            gridgap: (10e-9, 10e-9, 10e-9),
            dt: 1e-17,
            tsteps: 10,
            dtype: DType::Complex64,
            engine: Engine::Host,
            courant: 0.25,
            pml: PmlSpec::default(),
            pbc: PbcSpec::default(),
            bbc: BbcSpec::default(),
        }
    }

    #[test]
    fn rejects_non_divisible_nx() {
        let c = cfg(33);
        assert!(Grid::new(&c, 0, 4).is_err());
    }

    #[test]
    fn slab_partitions_cover_domain() {
        let c = cfg(32);
        let g = Grid::new(&c, 1, 4).unwrap();
        assert_eq!(g.my_nx, 8);
        assert_eq!(g.my_slab(), SlabRange { xsrt: 8, xend: 16 });
        assert_eq!(g.prev_rank(), Some(0));
        assert_eq!(g.next_rank(), Some(2));
        assert_eq!(g.owner_of(20), Some(2));
        assert_eq!(g.global_to_local_x(10), Some(2));
        assert_eq!(g.global_to_local_x(3), None);
    }

    #[test]
    fn single_rank_owns_both_x_faces() {
        let c = cfg(32);
        let g = Grid::new(&c, 0, 1).unwrap();
        assert!(g.is_first_rank());
        assert!(g.is_last_rank());
        assert_eq!(g.prev_rank(), None);
        assert_eq!(g.next_rank(), None);
    }
}
