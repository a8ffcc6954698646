//! Decoherence timescales of surface-hopping ensembles.
//!
//! All routines operate on recorded per-trajectory data: vibronic
//! Hamiltonians (Ha), nuclear kinetic energies (Ha) and electronic
//! amplitudes. Rates are in inverse atomic time units, intervals in atomic
//! time units.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecoherenceError {
    #[error("Ensemble size mismatch between {what}: {left} vs {right}")]
    EnsembleMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },
}

/// Energy-based decoherence rates of Granucci and Persico (J. Chem. Phys.
/// 126, 134114, 2007): rate(i,j) = |E_i - E_j| / (C + eps/Ekin), with the
/// state energies read off the diagonal of the vibronic Hamiltonian.
pub fn energy_based_rates(
    hvib: &DMatrix<Complex64>,
    ekin: f64,
    c_param: f64,
    eps_param: f64,
) -> DMatrix<f64> {
    let nstates = hvib.ncols();
    let damping = c_param + eps_param / ekin;
    DMatrix::from_fn(nstates, nstates, |i, j| {
        (hvib[(i, i)].re - hvib[(j, j)].re).abs() / damping
    })
}

/// Per-trajectory rates for a whole ensemble.
pub fn energy_based_rates_ensemble(
    hvib: &[DMatrix<Complex64>],
    ekin: &[f64],
    c_param: f64,
    eps_param: f64,
) -> Result<Vec<DMatrix<f64>>, DecoherenceError> {
    if hvib.len() != ekin.len() {
        return Err(DecoherenceError::EnsembleMismatch {
            what: "vibronic Hamiltonians and kinetic energies",
            left: hvib.len(),
            right: ekin.len(),
        });
    }
    Ok(hvib
        .iter()
        .zip(ekin)
        .map(|(h, &t)| energy_based_rates(h, t, c_param, eps_param))
        .collect())
}

/// Dephasing-informed correction of Sifain et al. (J. Chem. Phys. 150,
/// 194104, 2019): each rate is scaled by the instantaneous gap over the
/// time-averaged |gap|. A non-positive average gap means the pair never
/// split, so the rate is pinned to an effectively instant 1e25.
pub fn apply_dephasing_informed_correction(
    rates: &mut DMatrix<f64>,
    hvib: &DMatrix<Complex64>,
    ave_gaps: &DMatrix<f64>,
) {
    let nstates = hvib.ncols();
    for i in 0..nstates {
        for j in 0..nstates {
            let gap = (hvib[(i, i)].re - hvib[(j, j)].re).abs();
            if ave_gaps[(i, j)] > 0.0 {
                rates[(i, j)] *= gap / ave_gaps[(i, j)];
            } else {
                rates[(i, j)] = 1.0e25;
            }
        }
    }
}

pub fn apply_dephasing_informed_correction_ensemble(
    rates: &mut [DMatrix<f64>],
    hvib: &[DMatrix<Complex64>],
    ave_gaps: &DMatrix<f64>,
) -> Result<(), DecoherenceError> {
    if rates.len() != hvib.len() {
        return Err(DecoherenceError::EnsembleMismatch {
            what: "rate matrices and vibronic Hamiltonians",
            left: rates.len(),
            right: hvib.len(),
        });
    }
    for (r, h) in rates.iter_mut().zip(hvib) {
        apply_dephasing_informed_correction(r, h, ave_gaps);
    }
    Ok(())
}

/// Time-averaged |E_i - E_j| over a series of vibronic Hamiltonians; the
/// usual input of [`apply_dephasing_informed_correction`].
pub fn average_absolute_gaps(series: &[DMatrix<Complex64>]) -> DMatrix<f64> {
    let Some(first) = series.first() else {
        return DMatrix::zeros(0, 0);
    };
    let nstates = first.ncols();
    let mut acc = DMatrix::zeros(nstates, nstates);
    for h in series {
        for i in 0..nstates {
            for j in 0..nstates {
                acc[(i, j)] += (h[(i, i)].re - h[(j, j)].re).abs();
            }
        }
    }
    acc / series.len() as f64
}

/// Population-weighted coherence intervals, Eq. 11 of Jaeger, Fischer and
/// Prezhdo (J. Chem. Phys. 137, 22A545, 2012):
/// 1/tau_i = sum_{j != i} rho_jj * rate(i,j). States whose partners carry
/// no population get the 1e25 "never decoheres" sentinel.
///
/// Columns of `amplitudes` are ensemble members; the populations are the
/// diagonal of C C^H, so multi-column input sums over the ensemble.
pub fn coherence_intervals(
    amplitudes: &DMatrix<Complex64>,
    rates: &DMatrix<f64>,
) -> DVector<f64> {
    let nstates = amplitudes.nrows();
    let populations: Vec<f64> = (0..nstates)
        .map(|j| amplitudes.row(j).iter().map(|c| c.norm_sqr()).sum())
        .collect();

    DVector::from_fn(nstates, |i, _| {
        let total: f64 = (0..nstates)
            .filter(|&j| j != i)
            .map(|j| populations[j] * rates[(i, j)])
            .sum();
        if total > 0.0 { 1.0 / total } else { 1.0e25 }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_hvib(e0: f64, e1: f64) -> DMatrix<Complex64> {
        DMatrix::from_fn(2, 2, |i, j| {
            if i == j {
                Complex64::new(if i == 0 { e0 } else { e1 }, 0.0)
            } else {
                Complex64::new(0.01, 0.0)
            }
        })
    }

    #[test]
    fn rates_follow_the_energy_gap() {
        let hvib = two_state_hvib(0.0, 0.1);
        let rates = energy_based_rates(&hvib, 0.5, 1.0, 0.1);

        // damping = 1.0 + 0.1/0.5 = 1.2
        assert!((rates[(0, 1)] - 0.1 / 1.2).abs() < 1e-14);
        assert_eq!(rates[(0, 0)], 0.0);
        assert_eq!(rates[(1, 1)], 0.0);
        assert!((rates[(0, 1)] - rates[(1, 0)]).abs() < 1e-15);
    }

    #[test]
    fn ensemble_size_mismatch_is_an_error() {
        let hvib = vec![two_state_hvib(0.0, 0.1); 3];
        let ekin = vec![0.5; 2];
        let result = energy_based_rates_ensemble(&hvib, &ekin, 1.0, 0.1);
        assert_eq!(
            result.unwrap_err(),
            DecoherenceError::EnsembleMismatch {
                what: "vibronic Hamiltonians and kinetic energies",
                left: 3,
                right: 2,
            }
        );
    }

    #[test]
    fn dephasing_correction_scales_by_relative_gap() {
        let hvib = two_state_hvib(0.0, 0.2);
        let mut rates = energy_based_rates(&hvib, 0.5, 1.0, 0.1);
        let base = rates[(0, 1)];

        let ave_gaps = DMatrix::from_fn(2, 2, |i, j| if i == j { 0.0 } else { 0.1 });
        apply_dephasing_informed_correction(&mut rates, &hvib, &ave_gaps);

        // Instantaneous gap 0.2 over average 0.1 doubles the rate; the
        // diagonal had a zero average gap and is pinned.
        assert!((rates[(0, 1)] - 2.0 * base).abs() < 1e-12);
        assert_eq!(rates[(0, 0)], 1.0e25);
    }

    #[test]
    fn average_gaps_over_a_series() {
        let series = vec![two_state_hvib(0.0, 0.1), two_state_hvib(0.0, 0.3)];
        let gaps = average_absolute_gaps(&series);
        assert!((gaps[(0, 1)] - 0.2).abs() < 1e-14);
        assert_eq!(gaps[(0, 0)], 0.0);
        assert_eq!(average_absolute_gaps(&[]).nrows(), 0);
    }

    #[test]
    fn coherence_intervals_invert_population_weighted_rates() {
        let amps = DMatrix::from_column_slice(
            2,
            1,
            &[
                Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0),
                Complex64::new(0.0, std::f64::consts::FRAC_1_SQRT_2),
            ],
        );
        let rates = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 4.0, 0.0]);
        let tau = coherence_intervals(&amps, &rates);

        assert!((tau[0] - 1.0).abs() < 1e-12);
        assert!((tau[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unpopulated_partners_give_the_infinite_interval() {
        let amps = DMatrix::from_column_slice(
            2,
            1,
            &[Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
        );
        let rates = DMatrix::from_row_slice(2, 2, &[0.0, 3.0, 3.0, 0.0]);
        let tau = coherence_intervals(&amps, &rates);

        assert_eq!(tau[0], 1.0e25);
        assert!((tau[1] - 1.0 / 3.0).abs() < 1e-12);
    }
}
