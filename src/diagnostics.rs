//! Ambient logging/diagnostics (spec.md §6 "ambient stack").
//!
//! Grounded in the teacher's habit of printing grid/volume info at
//! startup (`examples/SpaceEngineerSS-PhotonLab/rust-core/src/fdtd.rs`)
//! and the original's periodic stability/progress prints in `space.py`'s
//! time loop, both replaced here with structured `log` calls instead of
//! raw `println!`.

use log::{info, warn};
use std::time::Duration;

/// Logs a per-N-steps progress line with elapsed wall time and energy,
/// and escalates to a warning if the stability probe trips.
pub fn report_step(rank: usize, tstep: usize, tsteps: usize, elapsed: Duration, energy: f64, stable: bool) {
    if rank != 0 {
        return;
    }
    if !stable {
        warn!("step {tstep}/{tsteps}: non-finite field value detected, simulation may have diverged");
        return;
    }
    info!(
        "step {tstep}/{tsteps}: elapsed {:.3}s, total energy {:.6e} J",
        elapsed.as_secs_f64(),
        energy
    );
}

/// One-time startup summary (rank 0 only).
pub fn report_startup(world_size: usize, tsteps: usize, dt: f64) {
    info!("starting run: {world_size} rank(s), {tsteps} steps, dt = {dt:.3e} s");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_step_does_not_panic_on_any_rank() {
        report_step(0, 1, 10, Duration::from_millis(5), 1.0e-10, true);
        report_step(1, 1, 10, Duration::from_millis(5), 1.0e-10, true);
        report_step(0, 2, 10, Duration::from_millis(5), 0.0, false);
    }
}
