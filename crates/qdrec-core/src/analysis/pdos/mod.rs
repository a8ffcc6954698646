//! Projected densities of states from per-orbital projection files.
//!
//! Electronic-structure codes emit one text file per atom (or per atomic
//! orbital) listing state energies together with their projections onto
//! local orbitals. This module bins those projections onto a regular energy
//! grid, optionally broadens the binned data with Gaussians, and writes
//! plain-text tables ready for plotting.
//!
//! Two input dialects are supported: [`qe`] reads the `projwfc.x` output of
//! Quantum ESPRESSO, while [`levels`] reads five-column level files from
//! semiempirical codes and places the Fermi level from the level spectrum
//! itself.

pub mod convolve;
pub mod levels;
pub mod qe;

pub use self::convolve::{Broadening, gaussian_convolve};
pub use self::levels::{LevelsConfig, LevelsDos, LevelsProjection, OrbitalChannel, levels_pdos};
pub use self::qe::{QeConfig, QeProjection, SpinResolvedDos, qe_pdos};

use crate::analysis::fermi::FermiError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdosError {
    #[error("nspin must be 1 (spin-unpolarized), 2 (spin-polarized) or 4 (spin-non-collinear), got {0}")]
    UnsupportedSpin(u8),
    #[error("Energy window [{emin}, {emax}] with grid spacing {de} holds no grid points")]
    EmptyWindow { emin: f64, emax: f64, de: f64 },
    #[error("Cannot parse projection data at line {line} of '{path}'", path = path.display())]
    MalformedRow { path: PathBuf, line: usize },
    #[error("Fermi level placement failed: {0}")]
    Fermi(#[from] FermiError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A closed energy interval `[emin, emax]` sampled every `de`.
///
/// The grid has `floor((emax - emin) / de) + 1` points; energies outside the
/// interval fall into no bin at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyWindow {
    pub emin: f64,
    pub emax: f64,
    pub de: f64,
}

impl EnergyWindow {
    pub fn validate(&self) -> Result<(), PdosError> {
        if self.de <= 0.0 || self.emax < self.emin {
            return Err(PdosError::EmptyWindow {
                emin: self.emin,
                emax: self.emax,
                de: self.de,
            });
        }
        Ok(())
    }

    /// Number of grid points in the window.
    pub fn bins(&self) -> usize {
        ((self.emax - self.emin) / self.de).floor() as usize + 1
    }

    /// Bin index of an energy, or `None` when it lies outside the window.
    pub fn bin_of(&self, energy: f64) -> Option<usize> {
        if energy < self.emin || energy > self.emax {
            return None;
        }
        Some(((energy - self.emin) / self.de).floor() as usize)
    }

    /// Grid energies relative to `origin` (usually the Fermi level).
    pub fn axis(&self, origin: f64) -> Array1<f64> {
        Array1::from_shape_fn(self.bins(), |i| self.emin + i as f64 * self.de - origin)
    }

    /// The same window expressed in different units.
    pub fn scaled(&self, factor: f64) -> EnergyWindow {
        EnergyWindow {
            emin: self.emin * factor,
            emax: self.emax * factor,
            de: self.de * factor,
        }
    }
}

/// Spin treatment of the electronic-structure calculation the projections
/// came from, following the `nspin` convention of Quantum ESPRESSO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinTreatment {
    Unpolarized,
    Polarized,
    NonCollinear,
}

impl SpinTreatment {
    pub fn from_nspin(nspin: u8) -> Result<Self, PdosError> {
        match nspin {
            1 => Ok(Self::Unpolarized),
            2 => Ok(Self::Polarized),
            4 => Ok(Self::NonCollinear),
            other => Err(PdosError::UnsupportedSpin(other)),
        }
    }

    pub fn nspin(&self) -> u8 {
        match self {
            Self::Unpolarized => 1,
            Self::Polarized => 2,
            Self::NonCollinear => 4,
        }
    }
}

/// Writes a pDOS table: one row per grid point holding the energy, every
/// projection and the trailing sum over projections.
pub(crate) fn write_table(
    path: &Path,
    header: Option<&str>,
    energies: ArrayView1<'_, f64>,
    dos: ArrayView2<'_, f64>,
) -> Result<(), PdosError> {
    let mut out = BufWriter::new(File::create(path)?);
    if let Some(line) = header {
        writeln!(out, "{line}")?;
    }
    for (i, &e) in energies.iter().enumerate() {
        write!(out, "{e}   ")?;
        let mut total = 0.0;
        for &y in dos.row(i) {
            total += y;
            write!(out, "{y}   ")?;
        }
        writeln!(out, "{total}")?;
    }
    out.flush()?;
    Ok(())
}

pub(crate) fn parse_column(
    tokens: &[&str],
    index: usize,
    path: &Path,
    line: usize,
) -> Result<f64, PdosError> {
    tokens
        .get(index)
        .and_then(|t| t.parse::<f64>().ok())
        .ok_or_else(|| PdosError::MalformedRow {
            path: path.to_path_buf(),
            line,
        })
}

pub(crate) fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
