//! pDOS from the atomic projection files of Quantum ESPRESSO.
//!
//! `projwfc.x` writes one file per atomic wavefunction, named like
//! `si.pdos_atm#3(Si)_wfc#2(p)`. The caller supplies everything up to the
//! atom index as the prefix; the selector loops probe every combination of
//! atom index, element symbol, orbital label and wavefunction index, and
//! files that do not exist are simply skipped.

use super::convolve::{Broadening, gaussian_convolve};
use super::{EnergyWindow, PdosError, SpinTreatment, parse_column, suffixed, write_table};
use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Total angular momentum labels probed for spinor wavefunctions.
const SPINOR_J: [f64; 8] = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0];

/// One projection group: every file matched by the three selectors is
/// summed into a single output column.
#[derive(Debug, Clone, PartialEq)]
pub struct QeProjection {
    /// Angular momentum labels as they appear in the filenames, e.g. "s", "p".
    pub orbitals: Vec<String>,
    /// Atom indices as in the filenames (one-based in Quantum ESPRESSO).
    pub atoms: Vec<usize>,
    /// Element symbols the atoms must carry.
    pub elements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QeConfig {
    /// Common prefix of the projection files, up to the atom index.
    pub prefix: String,
    /// Energy window in eV.
    pub window: EnergyWindow,
    pub projections: Vec<QeProjection>,
    /// Energy origin of the output axis in eV, usually the Fermi or HOMO level.
    pub fermi: f64,
    pub spin: SpinTreatment,
    /// Optional Gaussian broadening, in eV.
    pub broadening: Option<Broadening>,
}

/// Binned, spin-resolved densities of states on a shared energy axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinResolvedDos {
    /// Energy axis in eV, relative to the configured origin.
    pub energies: Array1<f64>,
    /// One column per projection group.
    pub alpha: Array2<f64>,
    pub beta: Array2<f64>,
}

/// Bins the matched projection files onto the energy grid and writes the
/// `{out_prefix}_alp.txt` and `{out_prefix}_bet.txt` tables.
#[instrument(skip_all)]
pub fn qe_pdos(config: &QeConfig, out_prefix: &Path) -> Result<SpinResolvedDos, PdosError> {
    config.window.validate()?;

    let nproj = config.projections.len();
    let bins = config.window.bins();
    let mut alpha = Array2::zeros((bins, nproj));
    let mut beta = Array2::zeros((bins, nproj));

    for (column, proj) in config.projections.iter().enumerate() {
        for &atom in &proj.atoms {
            for orbital in &proj.orbitals {
                for wfc in 0..5 {
                    for element in &proj.elements {
                        match config.spin {
                            SpinTreatment::NonCollinear => {
                                for j in SPINOR_J {
                                    let path = PathBuf::from(format!(
                                        "{}{atom}({element})_wfc#{wfc}({orbital}_j{j:.1})",
                                        config.prefix
                                    ));
                                    accumulate(&path, config, column, &mut alpha, &mut beta)?;
                                }
                            }
                            _ => {
                                let path = PathBuf::from(format!(
                                    "{}{atom}({element})_wfc#{wfc}({orbital})",
                                    config.prefix
                                ));
                                accumulate(&path, config, column, &mut alpha, &mut beta)?;
                            }
                        }
                    }
                }
            }
        }
    }

    let mut energies = config.window.axis(config.fermi);
    if let Some(broadening) = &config.broadening {
        let (e, a) = gaussian_convolve(energies.view(), alpha.view(), config.window.de, broadening);
        let (_, b) = gaussian_convolve(energies.view(), beta.view(), config.window.de, broadening);
        energies = e;
        alpha = a;
        beta = b;
    }

    write_table(
        &suffixed(out_prefix, "_alp.txt"),
        None,
        energies.view(),
        alpha.view(),
    )?;
    write_table(
        &suffixed(out_prefix, "_bet.txt"),
        None,
        energies.view(),
        beta.view(),
    )?;
    info!(
        projections = nproj,
        rows = energies.len(),
        "Wrote spin-resolved pDOS tables"
    );

    // Without spin polarization the beta channel was never filled; the
    // returned beta mirrors alpha, while the written file keeps the
    // accumulated channel.
    if config.spin != SpinTreatment::Polarized {
        beta = alpha.clone();
    }

    Ok(SpinResolvedDos {
        energies,
        alpha,
        beta,
    })
}

/// Adds one projection file into the given output column.
fn accumulate(
    path: &Path,
    config: &QeConfig,
    column: usize,
    alpha: &mut Array2<f64>,
    beta: &mut Array2<f64>,
) -> Result<(), PdosError> {
    if !path.exists() {
        return Ok(());
    }
    debug!(path = %path.display(), column, "Reading projection file");

    let text = std::fs::read_to_string(path)?;
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap_or("").split_whitespace().collect();
    let has_beta = config.spin == SpinTreatment::Polarized && header.get(4) == Some(&"ldosdw(E)");

    for (i, raw) in lines.enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let line = i + 2;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let energy = parse_column(&tokens, 0, path, line)?;
        let Some(bin) = config.window.bin_of(energy) else {
            continue;
        };
        alpha[[bin, column]] += parse_column(&tokens, 1, path, line)?;
        if has_beta {
            beta[[bin, column]] += parse_column(&tokens, 2, path, line)?;
        }
    }
    Ok(())
}
