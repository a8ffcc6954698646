//! Recording schema for trajectory surface hopping (TSH) ensembles.
//!
//! Tier 1 holds the step stamp and ensemble-averaged energies, tier 2 the
//! active state of every trajectory, tier 3 ensemble distributions
//! (populations, density matrices, phase-space coordinates, amplitudes),
//! tier 4 the per-trajectory electronic matrices.

use ndarray::{ArrayView1, ArrayView2, Axis};
use num_complex::Complex64;

use super::OutputLevel;
use crate::record::{DatasetSpec, RecordError, Recorder, ScalarKind};

/// Extents of a TSH recording: step count, ensemble size, nuclear degrees of
/// freedom and the sizes of the adiabatic and diabatic electronic bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TshDims {
    pub nsteps: usize,
    pub ntraj: usize,
    pub ndof: usize,
    pub nadi: usize,
    pub ndia: usize,
}

pub fn register<R: Recorder + ?Sized>(
    rec: &mut R,
    dims: &TshDims,
    level: OutputLevel,
) -> Result<(), RecordError> {
    let TshDims {
        nsteps,
        ntraj,
        ndof,
        nadi,
        ndia,
    } = *dims;

    if level.enables(1) {
        rec.register(&DatasetSpec::new("timestep", &[nsteps], ScalarKind::Integer))?;
        rec.register(&DatasetSpec::new("time", &[nsteps], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new("Ekin_ave", &[nsteps], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new("Epot_ave", &[nsteps], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new("Etot_ave", &[nsteps], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new("dEkin_ave", &[nsteps], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new("dEpot_ave", &[nsteps], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new("dEtot_ave", &[nsteps], ScalarKind::Real))?;
    }

    if level.enables(2) {
        rec.register(&DatasetSpec::new(
            "states",
            &[nsteps, ntraj],
            ScalarKind::Integer,
        ))?;
    }

    if level.enables(3) {
        rec.register(&DatasetSpec::new("SH_pop", &[nsteps, nadi, 1], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new(
            "D_adi",
            &[nsteps, nadi, nadi],
            ScalarKind::Complex,
        ))?;
        rec.register(&DatasetSpec::new(
            "D_dia",
            &[nsteps, ndia, ndia],
            ScalarKind::Complex,
        ))?;
        rec.register(&DatasetSpec::new("q", &[nsteps, ntraj, ndof], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new("p", &[nsteps, ntraj, ndof], ScalarKind::Real))?;
        rec.register(&DatasetSpec::new(
            "Cadi",
            &[nsteps, ntraj, nadi],
            ScalarKind::Complex,
        ))?;
        rec.register(&DatasetSpec::new(
            "Cdia",
            &[nsteps, ntraj, ndia],
            ScalarKind::Complex,
        ))?;
    }

    if level.enables(4) {
        rec.register(&DatasetSpec::new(
            "hvib_adi",
            &[nsteps, ntraj, nadi, nadi],
            ScalarKind::Complex,
        ))?;
        rec.register(&DatasetSpec::new(
            "hvib_dia",
            &[nsteps, ntraj, ndia, ndia],
            ScalarKind::Complex,
        ))?;
        rec.register(&DatasetSpec::new(
            "St",
            &[nsteps, ntraj, nadi, nadi],
            ScalarKind::Complex,
        ))?;
        rec.register(&DatasetSpec::new(
            "basis_transform",
            &[nsteps, ntraj, ndia, nadi],
            ScalarKind::Complex,
        ))?;
        rec.register(&DatasetSpec::new(
            "projector",
            &[nsteps, ntraj, nadi, nadi],
            ScalarKind::Complex,
        ))?;
    }

    Ok(())
}

/// Ensemble-averaged energies and their fluctuations at one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySummary {
    pub ekin: f64,
    pub epot: f64,
    pub etot: f64,
    pub dekin: f64,
    pub depot: f64,
    pub detot: f64,
}

pub fn save_summary<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    dt: f64,
    energies: &EnergySummary,
) -> Result<(), RecordError> {
    rec.save_int(step, "timestep", step as i64)?;
    rec.save_real(step, "time", dt * step as f64)?;
    rec.save_real(step, "Ekin_ave", energies.ekin)?;
    rec.save_real(step, "Epot_ave", energies.epot)?;
    rec.save_real(step, "Etot_ave", energies.etot)?;
    rec.save_real(step, "dEkin_ave", energies.dekin)?;
    rec.save_real(step, "dEpot_ave", energies.depot)?;
    rec.save_real(step, "dEtot_ave", energies.detot)?;
    Ok(())
}

/// Active electronic state of every trajectory at one step.
pub fn save_active_states<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    states: &[i64],
) -> Result<(), RecordError> {
    for (traj, &state) in states.iter().enumerate() {
        rec.save_int_at(step, traj, "states", state)?;
    }
    Ok(())
}

/// Ensemble-level data at one step. Coordinates, momenta and amplitudes are
/// laid out per trajectory: `(ntraj, ndof)` and `(ntraj, nstates)`.
#[derive(Clone, Copy)]
pub struct EnsembleSnapshot<'a> {
    pub sh_pop: ArrayView1<'a, f64>,
    pub denmat_adi: ArrayView2<'a, Complex64>,
    pub denmat_dia: ArrayView2<'a, Complex64>,
    pub q: ArrayView2<'a, f64>,
    pub p: ArrayView2<'a, f64>,
    pub amp_adi: ArrayView2<'a, Complex64>,
    pub amp_dia: ArrayView2<'a, Complex64>,
}

pub fn save_ensemble<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    snapshot: &EnsembleSnapshot<'_>,
) -> Result<(), RecordError> {
    rec.save_real_matrix(step, "SH_pop", snapshot.sh_pop.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "D_adi", snapshot.denmat_adi)?;
    rec.save_complex_matrix(step, "D_dia", snapshot.denmat_dia)?;
    rec.save_real_matrix(step, "q", snapshot.q)?;
    rec.save_real_matrix(step, "p", snapshot.p)?;
    rec.save_complex_matrix(step, "Cadi", snapshot.amp_adi)?;
    rec.save_complex_matrix(step, "Cdia", snapshot.amp_dia)?;
    Ok(())
}

/// Electronic matrices of a single trajectory at one step.
#[derive(Clone, Copy)]
pub struct TrajectoryMatrices<'a> {
    pub hvib_adi: ArrayView2<'a, Complex64>,
    pub hvib_dia: ArrayView2<'a, Complex64>,
    /// Time overlap of adiabatic states between consecutive steps.
    pub time_overlap: ArrayView2<'a, Complex64>,
    /// Diabatic-to-adiabatic transformation, `(ndia, nadi)`.
    pub basis_transform: ArrayView2<'a, Complex64>,
    /// Projector from raw to dynamically consistent adiabatic states.
    pub projector: ArrayView2<'a, Complex64>,
}

pub fn save_trajectory_matrices<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    traj: usize,
    matrices: &TrajectoryMatrices<'_>,
) -> Result<(), RecordError> {
    rec.save_complex_matrix_at(step, traj, "hvib_adi", matrices.hvib_adi)?;
    rec.save_complex_matrix_at(step, traj, "hvib_dia", matrices.hvib_dia)?;
    rec.save_complex_matrix_at(step, traj, "St", matrices.time_overlap)?;
    rec.save_complex_matrix_at(step, traj, "basis_transform", matrices.basis_transform)?;
    rec.save_complex_matrix_at(step, traj, "projector", matrices.projector)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemRecorder;

    fn dims() -> TshDims {
        TshDims {
            nsteps: 3,
            ntraj: 2,
            ndof: 1,
            nadi: 2,
            ndia: 2,
        }
    }

    #[test]
    fn level_one_registers_only_the_summary_datasets() {
        let mut rec = MemRecorder::new();
        register(&mut rec, &dims(), OutputLevel(1)).unwrap();
        assert_eq!(
            rec.dataset_names(),
            vec![
                "timestep", "time", "Ekin_ave", "Epot_ave", "Etot_ave", "dEkin_ave",
                "dEpot_ave", "dEtot_ave",
            ]
        );
    }

    #[test]
    fn level_four_registers_the_full_schema() {
        let mut rec = MemRecorder::new();
        register(&mut rec, &dims(), OutputLevel(4)).unwrap();
        let names = rec.dataset_names();
        assert_eq!(names.len(), 8 + 1 + 7 + 5);
        assert!(names.contains(&"states"));
        assert!(names.contains(&"SH_pop"));
        assert!(names.contains(&"basis_transform"));
    }

    #[test]
    fn saves_below_the_level_are_dropped() {
        let mut rec = MemRecorder::new();
        register(&mut rec, &dims(), OutputLevel(1)).unwrap();

        // The per-trajectory states belong to tier 2, which level 1 left
        // unregistered, so this write must be a silent no-op.
        save_active_states(&mut rec, 0, &[1, 0]).unwrap();
        assert!(rec.ints("states").is_none());
    }

    #[test]
    fn summary_values_land_on_the_time_axis() {
        let mut rec = MemRecorder::new();
        register(&mut rec, &dims(), OutputLevel(1)).unwrap();

        let energies = EnergySummary {
            ekin: 0.5,
            epot: -1.0,
            etot: -0.5,
            dekin: 0.01,
            depot: 0.02,
            detot: 0.003,
        };
        save_summary(&mut rec, 2, 0.1, &energies).unwrap();

        assert_eq!(rec.ints("timestep").unwrap()[[2]], 2);
        assert!((rec.reals("time").unwrap()[[2]] - 0.2).abs() < 1e-15);
        assert_eq!(rec.reals("Etot_ave").unwrap()[[2]], -0.5);
    }
}
