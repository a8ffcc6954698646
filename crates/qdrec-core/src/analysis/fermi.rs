//! Fermi level of a discrete level spectrum.

use thiserror::Error;
use tracing::debug;

const MAX_BISECTIONS: usize = 10_000;

#[derive(Debug, Error, PartialEq)]
pub enum FermiError {
    #[error("Cannot place a Fermi level in an empty level spectrum")]
    NoLevels,
    #[error("Electron count {nelec} is outside the open interval (0, {capacity})")]
    BadElectronCount { nelec: f64, capacity: f64 },
    #[error("Fermi level bisection did not converge after {iterations} iterations")]
    Convergence { iterations: usize },
}

/// Fermi-Dirac population of a single level at the given Fermi energy.
pub fn fermi_population(energy: f64, fermi: f64, degeneracy: f64, kt: f64) -> f64 {
    degeneracy / (1.0 + ((energy - fermi) / kt).exp())
}

fn total_population(levels: &[f64], fermi: f64, degeneracy: f64, kt: f64) -> f64 {
    levels
        .iter()
        .map(|&e| fermi_population(e, fermi, degeneracy, kt))
        .sum()
}

/// Places the Fermi level so that the levels hold `nelec` electrons.
///
/// The total population is monotonic in the Fermi energy, so a bracket a
/// safe margin beyond the spectrum is bisected until the population matches
/// `nelec` to within `tol`. `nelec` must lie strictly between zero and the
/// spectrum capacity `degeneracy * levels.len()`.
pub fn fermi_energy(
    levels: &[f64],
    nelec: f64,
    degeneracy: f64,
    kt: f64,
    tol: f64,
) -> Result<f64, FermiError> {
    if levels.is_empty() {
        return Err(FermiError::NoLevels);
    }
    let capacity = degeneracy * levels.len() as f64;
    if nelec <= 0.0 || nelec >= capacity {
        return Err(FermiError::BadElectronCount { nelec, capacity });
    }

    let (min, max) = levels.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| {
        (lo.min(e), hi.max(e))
    });
    let margin = 50.0 * kt + 1.0;
    let mut lo = min - margin;
    let mut hi = max + margin;

    for iteration in 0..MAX_BISECTIONS {
        let fermi = 0.5 * (lo + hi);
        let ntot = total_population(levels, fermi, degeneracy, kt);
        if (ntot - nelec).abs() <= tol {
            debug!(fermi, ntot, iteration, "Fermi level converged");
            return Ok(fermi);
        }
        if ntot > nelec {
            hi = fermi;
        } else {
            lo = fermi;
        }
    }

    Err(FermiError::Convergence {
        iterations: MAX_BISECTIONS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_filled_symmetric_spectrum_pins_the_midgap() {
        let levels = [0.0, 1.0];
        let fermi = fermi_energy(&levels, 2.0, 2.0, 0.01, 1e-10).unwrap();
        assert!((fermi - 0.5).abs() < 1e-8);

        let ntot = levels
            .iter()
            .map(|&e| fermi_population(e, fermi, 2.0, 0.01))
            .sum::<f64>();
        assert!((ntot - 2.0).abs() < 1e-10);
    }

    #[test]
    fn population_saturates_at_the_degeneracy() {
        assert!((fermi_population(-5.0, 0.0, 2.0, 0.01) - 2.0).abs() < 1e-12);
        assert!(fermi_population(5.0, 0.0, 2.0, 0.01) < 1e-12);
    }

    #[test]
    fn empty_spectrum_is_rejected() {
        assert_eq!(fermi_energy(&[], 1.0, 2.0, 0.01, 1e-10), Err(FermiError::NoLevels));
    }

    #[test]
    fn electron_count_must_fit_the_spectrum() {
        let levels = [0.0, 1.0];
        assert_eq!(
            fermi_energy(&levels, 0.0, 2.0, 0.01, 1e-10),
            Err(FermiError::BadElectronCount {
                nelec: 0.0,
                capacity: 4.0,
            })
        );
        assert_eq!(
            fermi_energy(&levels, 4.0, 2.0, 0.01, 1e-10),
            Err(FermiError::BadElectronCount {
                nelec: 4.0,
                capacity: 4.0,
            })
        );
    }
}
