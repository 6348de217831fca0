//! Persisted-state I/O (spec.md §6), behind the `hdf5-io` feature.
//!
//! Dataset names mirror `examples/original_source/.../space.py`
//! `save_pml_parameters`/`save_eps_mu` exactly (`PMLsigma{a}`, `eps_Ex`,
//! ...) so external post-processing tools written against the original
//! HDF5 layout keep working unchanged.

use crate::error::{Result, SolverError};
use crate::field::FieldStore;

#[cfg(feature = "hdf5-io")]
fn io_err(artifact: &str, e: hdf5::Error) -> SolverError {
    SolverError::Io {
        artifact: artifact.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
    }
}

/// Dump the material (eps/mu) arrays for this rank to `path`, one
/// dataset per component (`eps_Ex`, `eps_Ey`, ..., `mu_Hz`).
#[cfg(feature = "hdf5-io")]
pub fn save_eps_mu(path: &str, fields: &FieldStore) -> Result<()> {
    let file = hdf5::File::create(path).map_err(|e| io_err(path, e))?;
    let write = |name: &str, data: &ndarray::Array3<num_complex::Complex64>| -> Result<()> {
        let real: ndarray::Array3<f64> = data.mapv(|c| c.re);
        file.new_dataset_builder()
            .with_data(&real)
            .create(name)
            .map_err(|e| io_err(path, e))?;
        Ok(())
    };
    write("eps_Ex", &fields.eps_ex)?;
    write("eps_Ey", &fields.eps_ey)?;
    write("eps_Ez", &fields.eps_ez)?;
    write("mu_Hx", &fields.mu_hx)?;
    write("mu_Hy", &fields.mu_hy)?;
    write("mu_Hz", &fields.mu_hz)?;
    Ok(())
}

#[cfg(not(feature = "hdf5-io"))]
pub fn save_eps_mu(_path: &str, _fields: &FieldStore) -> Result<()> {
    Err(SolverError::Io {
        artifact: "eps_mu".to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "persistence requires the 'hdf5-io' feature",
        ),
    })
}

/// Dump one axis's CPML sigma/kappa/alpha-derived `b`/`a` profile,
/// matching the original's `PMLsigma{a}` naming where `{a}` is the axis
/// letter (`x`, `y`, or `z`).
#[cfg(feature = "hdf5-io")]
pub fn save_pml_parameters(path: &str, axis_letter: char, profile: &crate::cpml::CpmlProfile) -> Result<()> {
    let file = hdf5::File::create(path).map_err(|e| io_err(path, e))?;
    file.new_dataset_builder()
        .with_data(&profile.b)
        .create(format!("PMLsigma{axis_letter}_b").as_str())
        .map_err(|e| io_err(path, e))?;
    file.new_dataset_builder()
        .with_data(&profile.a)
        .create(format!("PMLsigma{axis_letter}_a").as_str())
        .map_err(|e| io_err(path, e))?;
    file.new_dataset_builder()
        .with_data(&profile.kappa)
        .create(format!("PMLkappa{axis_letter}").as_str())
        .map_err(|e| io_err(path, e))?;
    Ok(())
}

#[cfg(not(feature = "hdf5-io"))]
pub fn save_pml_parameters(_path: &str, _axis_letter: char, _profile: &crate::cpml::CpmlProfile) -> Result<()> {
    Err(SolverError::Io {
        artifact: "pml_parameters".to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "persistence requires the 'hdf5-io' feature",
        ),
    })
}

/// Persist one flux collector's assembled spectrum as a `(frequency, flux)`
/// dataset pair, named after the collector's axis (`Sx`, `Sy`, `Sz`).
#[cfg(feature = "hdf5-io")]
pub fn save_flux_spectrum(path: &str, name: &str, frequencies: &[f64], spectrum: &[f64]) -> Result<()> {
    let file = hdf5::File::create(path).map_err(|e| io_err(path, e))?;
    file.new_dataset_builder()
        .with_data(frequencies)
        .create(format!("{name}_freq").as_str())
        .map_err(|e| io_err(path, e))?;
    file.new_dataset_builder()
        .with_data(spectrum)
        .create(name)
        .map_err(|e| io_err(path, e))?;
    Ok(())
}

#[cfg(not(feature = "hdf5-io"))]
pub fn save_flux_spectrum(_path: &str, _name: &str, _frequencies: &[f64], _spectrum: &[f64]) -> Result<()> {
    Err(SolverError::Io {
        artifact: "flux_spectrum".to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "persistence requires the 'hdf5-io' feature",
        ),
    })
}
