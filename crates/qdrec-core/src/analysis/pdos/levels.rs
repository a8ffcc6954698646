//! pDOS from per-atom level files with s/p/d-resolved projections.
//!
//! Each atom contributes one five-column text file `{prefix}{atom}`: level
//! energy in Hartree, the total projection, then its s, p and d components.
//! The Fermi level is placed from the level spectrum of atom 0 and the
//! output axis is reported in eV relative to it.

use super::convolve::{Broadening, gaussian_convolve};
use super::{EnergyWindow, PdosError, parse_column, write_table};
use crate::analysis::fermi::fermi_energy;
use crate::units::{EV_TO_HA, HA_TO_EV};
use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Electronic temperature used when placing the Fermi level, in eV.
const FERMI_KT_EV: f64 = 0.1;
const FERMI_TOL: f64 = 1e-10;

/// Projection column of a level file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitalChannel {
    Total,
    S,
    P,
    D,
}

impl OrbitalChannel {
    fn column(&self) -> usize {
        match self {
            OrbitalChannel::Total => 1,
            OrbitalChannel::S => 2,
            OrbitalChannel::P => 3,
            OrbitalChannel::D => 4,
        }
    }
}

/// One projection group: the chosen channel of every listed atom is summed
/// into a single output column.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelsProjection {
    pub channel: OrbitalChannel,
    /// Atom indices as in the filenames (zero-based).
    pub atoms: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelsConfig {
    /// Common prefix of the level files; the atom index is appended.
    pub prefix: String,
    /// Energy window in eV; the files themselves are in Hartree.
    pub window: EnergyWindow,
    pub projections: Vec<LevelsProjection>,
    /// Number of electrons, for placing the Fermi level.
    pub electrons: f64,
    /// Optional Gaussian broadening, in eV.
    pub broadening: Option<Broadening>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelsDos {
    /// Fermi level in eV.
    pub fermi: f64,
    /// Energy axis in eV relative to the Fermi level.
    pub energies: Array1<f64>,
    /// One column per projection group.
    pub dos: Array2<f64>,
}

impl LevelsDos {
    /// Rows of the written table: energy, the projections, their sum.
    pub fn table(&self) -> Array2<f64> {
        let (rows, nproj) = self.dos.dim();
        Array2::from_shape_fn((rows, nproj + 2), |(i, j)| {
            if j == 0 {
                self.energies[i]
            } else if j <= nproj {
                self.dos[[i, j - 1]]
            } else {
                self.dos.row(i).sum()
            }
        })
    }
}

/// Bins the level files onto the energy grid, places the Fermi level and
/// writes the table to `outfile` under an `Ef = ... eV` header.
#[instrument(skip_all)]
pub fn levels_pdos(config: &LevelsConfig, outfile: &Path) -> Result<LevelsDos, PdosError> {
    config.window.validate()?;

    // The window is configured in eV; the level files are in Hartree.
    let window = config.window.scaled(EV_TO_HA);
    let bins = window.bins();
    let nproj = config.projections.len();

    let mut dos = Array2::zeros((bins, nproj));
    let mut levels = Vec::new();
    let mut levels_scanned = false;

    for (column, proj) in config.projections.iter().enumerate() {
        for &atom in &proj.atoms {
            let path = PathBuf::from(format!("{}{atom}", config.prefix));
            let text = std::fs::read_to_string(&path)?;
            let lines: Vec<&str> = text.lines().collect();
            // The first line is a header and the last four summarize the file.
            let body = if lines.len() > 5 {
                &lines[1..lines.len() - 4]
            } else {
                &[][..]
            };

            // Atom 0 doubles as the level spectrum for the Fermi search;
            // it enters once even when listed in several groups.
            let collect_levels = atom == 0 && !levels_scanned;
            for (i, raw) in body.iter().enumerate() {
                if raw.trim().is_empty() {
                    continue;
                }
                let line = i + 2;
                let tokens: Vec<&str> = raw.split_whitespace().collect();
                let energy = parse_column(&tokens, 0, &path, line)?;
                if collect_levels {
                    levels.push(energy);
                }
                let Some(bin) = window.bin_of(energy) else {
                    continue;
                };
                dos[[bin, column]] += parse_column(&tokens, proj.channel.column(), &path, line)?;
            }
            if collect_levels {
                levels_scanned = true;
            }
        }
    }

    let fermi = fermi_energy(
        &levels,
        config.electrons,
        2.0,
        FERMI_KT_EV * EV_TO_HA,
        FERMI_TOL,
    )?;
    debug!(
        fermi_ev = fermi * HA_TO_EV,
        levels = levels.len(),
        "Placed the Fermi level"
    );

    let mut energies = window.axis(fermi);
    if let Some(broadening) = &config.broadening {
        let scaled = Broadening {
            spacing: broadening.spacing * EV_TO_HA,
            width: broadening.width * EV_TO_HA,
        };
        let (e, d) = gaussian_convolve(energies.view(), dos.view(), window.de, &scaled);
        energies = e;
        dos = d;
    }
    energies *= HA_TO_EV;

    let header = format!("Ef = {:5.3} eV", fermi * HA_TO_EV);
    write_table(outfile, Some(&header), energies.view(), dos.view())?;
    info!(
        rows = energies.len(),
        projections = nproj,
        "Wrote pDOS table"
    );

    Ok(LevelsDos {
        fermi: fermi * HA_TO_EV,
        energies,
        dos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_level_file(dir: &Path, atom: usize, rows: &[(f64, f64, f64, f64, f64)]) {
        let mut text = String::from("E(Ha) total s p d\n");
        for (e, tot, s, p, d) in rows {
            text.push_str(&format!("{e} {tot} {s} {p} {d}\n"));
        }
        text.push_str("sum of states\nweights\noccupations\nend\n");
        fs::write(dir.join(format!("proj_atom{atom}")), text).unwrap();
    }

    #[test]
    fn levels_are_binned_and_referenced_to_the_fermi_level() {
        let dir = tempfile::tempdir().unwrap();
        // Two levels around zero; with two electrons and twofold degeneracy
        // the Fermi level sits exactly midway, at 0.05 eV.
        write_level_file(
            dir.path(),
            0,
            &[
                (-0.15 * EV_TO_HA, 1.0, 0.25, 0.5, 0.25),
                (0.25 * EV_TO_HA, 2.0, 1.0, 0.5, 0.5),
            ],
        );

        let config = LevelsConfig {
            prefix: dir.path().join("proj_atom").to_string_lossy().into_owned(),
            window: EnergyWindow {
                emin: -10.0,
                emax: 10.0,
                de: 5.0,
            },
            // Atom 0 appears in both groups; its spectrum enters the Fermi
            // search once.
            projections: vec![
                LevelsProjection {
                    channel: OrbitalChannel::Total,
                    atoms: vec![0],
                },
                LevelsProjection {
                    channel: OrbitalChannel::P,
                    atoms: vec![0],
                },
            ],
            electrons: 2.0,
            broadening: None,
        };
        let outfile = dir.path().join("dos.txt");
        let result = levels_pdos(&config, &outfile).unwrap();

        assert!((result.fermi - 0.05).abs() < 1e-6);
        assert_eq!(result.dos.dim(), (5, 2));
        assert!((result.dos[[1, 0]] - 1.0).abs() < 1e-12);
        assert!((result.dos[[2, 0]] - 2.0).abs() < 1e-12);
        assert!((result.dos[[1, 1]] - 0.5).abs() < 1e-12);
        assert!((result.dos[[2, 1]] - 0.5).abs() < 1e-12);
        assert!((result.energies[0] + 10.05).abs() < 1e-6);

        let text = fs::read_to_string(&outfile).unwrap();
        assert_eq!(text.lines().next(), Some("Ef = 0.050 eV"));

        let table = result.table();
        assert_eq!(table.dim(), (5, 4));
        assert!((table[[1, 3]] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn broadened_tables_keep_the_refined_grid() {
        let dir = tempfile::tempdir().unwrap();
        write_level_file(
            dir.path(),
            0,
            &[
                (-0.2 * EV_TO_HA, 1.0, 1.0, 0.0, 0.0),
                (0.3 * EV_TO_HA, 1.0, 1.0, 0.0, 0.0),
            ],
        );

        let config = LevelsConfig {
            prefix: dir.path().join("proj_atom").to_string_lossy().into_owned(),
            window: EnergyWindow {
                emin: -1.0,
                emax: 1.0,
                de: 1.0,
            },
            projections: vec![LevelsProjection {
                channel: OrbitalChannel::Total,
                atoms: vec![0],
            }],
            electrons: 2.0,
            broadening: Some(Broadening {
                spacing: 0.5,
                width: 0.3,
            }),
        };
        let outfile = dir.path().join("dos.txt");
        let result = levels_pdos(&config, &outfile).unwrap();

        assert_eq!(result.energies.len(), 6);
        assert_eq!(result.dos.dim(), (6, 1));

        // Header plus one row per refined grid point.
        let text = fs::read_to_string(&outfile).unwrap();
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn garbage_rows_are_reported_with_their_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proj_atom0");
        fs::write(&path, "header\nnot a number\nf1\nf2\nf3\nf4\n").unwrap();

        let config = LevelsConfig {
            prefix: dir.path().join("proj_atom").to_string_lossy().into_owned(),
            window: EnergyWindow {
                emin: -1.0,
                emax: 1.0,
                de: 1.0,
            },
            projections: vec![LevelsProjection {
                channel: OrbitalChannel::Total,
                atoms: vec![0],
            }],
            electrons: 2.0,
            broadening: None,
        };
        let result = levels_pdos(&config, &dir.path().join("dos.txt"));
        assert!(matches!(
            result,
            Err(PdosError::MalformedRow { line: 2, .. })
        ));
    }

    #[test]
    fn missing_level_files_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = LevelsConfig {
            prefix: dir.path().join("absent_atom").to_string_lossy().into_owned(),
            window: EnergyWindow {
                emin: -1.0,
                emax: 1.0,
                de: 1.0,
            },
            projections: vec![LevelsProjection {
                channel: OrbitalChannel::S,
                atoms: vec![3],
            }],
            electrons: 2.0,
            broadening: None,
        };
        let result = levels_pdos(&config, &dir.path().join("dos.txt"));
        assert!(matches!(result, Err(PdosError::Io(_))));
    }
}
