//! Recording schema for exact wavefunction propagation on a grid.
//!
//! Observables come in pairs, one per electronic representation (diabatic
//! and adiabatic): energies and norms at tier 1, populations and phase-space
//! moments at tier 2, density matrices at tier 3 and the full wavefunctions
//! (real-space and reciprocal-space) at tier 4. Custom population datasets
//! are registered separately and independently of the level.

use ndarray::{ArrayView1, ArrayView2, Axis};
use num_complex::Complex64;

use super::OutputLevel;
use crate::record::{DatasetSpec, RecordError, Recorder, ScalarKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactDims {
    pub nsteps: usize,
    pub ndof: usize,
    pub nstates: usize,
    /// Total number of grid points of the wavefunction discretization.
    pub ngrid: usize,
}

pub fn register<R: Recorder + ?Sized>(
    rec: &mut R,
    dims: &ExactDims,
    level: OutputLevel,
) -> Result<(), RecordError> {
    let ExactDims {
        nsteps,
        ndof,
        nstates,
        ngrid,
    } = *dims;

    if level.enables(1) {
        rec.register(&DatasetSpec::new("timestep", &[nsteps], ScalarKind::Integer))?;
        rec.register(&DatasetSpec::new("time", &[nsteps], ScalarKind::Real))?;
        for name in [
            "Ekin_dia", "Ekin_adi", "Epot_dia", "Epot_adi", "Etot_dia", "Etot_adi",
            "norm_dia", "norm_adi",
        ] {
            rec.register(&DatasetSpec::new(name, &[nsteps], ScalarKind::Real))?;
        }
    }

    if level.enables(2) {
        for name in ["pop_dia", "pop_adi"] {
            rec.register(&DatasetSpec::new(name, &[nsteps, nstates, 1], ScalarKind::Real))?;
        }
        for name in [
            "q_dia", "q_adi", "p_dia", "p_adi", "q2_dia", "q2_adi", "p2_dia", "p2_adi",
        ] {
            rec.register(&DatasetSpec::new(name, &[nsteps, ndof, 1], ScalarKind::Complex))?;
        }
    }

    if level.enables(3) {
        for name in ["denmat_dia", "denmat_adi"] {
            rec.register(&DatasetSpec::new(
                name,
                &[nsteps, nstates, nstates],
                ScalarKind::Complex,
            ))?;
        }
    }

    if level.enables(4) {
        for name in ["PSI_dia", "PSI_adi", "reciPSI_dia", "reciPSI_adi"] {
            rec.register(&DatasetSpec::new(
                name,
                &[nsteps, ngrid, nstates, 1],
                ScalarKind::Complex,
            ))?;
        }
    }

    Ok(())
}

/// Declares the dataset for user-defined population projections. Separate
/// from [`register`] on purpose: custom populations are recorded whenever
/// the caller defines them, regardless of the output level.
pub fn register_custom_pops<R: Recorder + ?Sized>(
    rec: &mut R,
    nsteps: usize,
    npops: usize,
    nstates: usize,
) -> Result<(), RecordError> {
    rec.register(&DatasetSpec::new(
        "custom_pops",
        &[nsteps, npops, nstates, 1],
        ScalarKind::Real,
    ))
}

/// Per-representation energies and norms at one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSummary {
    pub ekin_dia: f64,
    pub ekin_adi: f64,
    pub epot_dia: f64,
    pub epot_adi: f64,
    pub etot_dia: f64,
    pub etot_adi: f64,
    pub norm_dia: f64,
    pub norm_adi: f64,
}

pub fn save_summary<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    dt: f64,
    summary: &StepSummary,
) -> Result<(), RecordError> {
    rec.save_int(step, "timestep", step as i64)?;
    rec.save_real(step, "time", dt * step as f64)?;
    rec.save_real(step, "Ekin_dia", summary.ekin_dia)?;
    rec.save_real(step, "Ekin_adi", summary.ekin_adi)?;
    rec.save_real(step, "Epot_dia", summary.epot_dia)?;
    rec.save_real(step, "Epot_adi", summary.epot_adi)?;
    rec.save_real(step, "Etot_dia", summary.etot_dia)?;
    rec.save_real(step, "Etot_adi", summary.etot_adi)?;
    rec.save_real(step, "norm_dia", summary.norm_dia)?;
    rec.save_real(step, "norm_adi", summary.norm_adi)?;
    Ok(())
}

/// State populations and position/momentum moments at one step. Populations
/// have length `nstates`, the moment vectors length `ndof`.
#[derive(Clone, Copy)]
pub struct Moments<'a> {
    pub pop_dia: ArrayView1<'a, f64>,
    pub pop_adi: ArrayView1<'a, f64>,
    pub q_dia: ArrayView1<'a, Complex64>,
    pub q_adi: ArrayView1<'a, Complex64>,
    pub p_dia: ArrayView1<'a, Complex64>,
    pub p_adi: ArrayView1<'a, Complex64>,
    pub q2_dia: ArrayView1<'a, Complex64>,
    pub q2_adi: ArrayView1<'a, Complex64>,
    pub p2_dia: ArrayView1<'a, Complex64>,
    pub p2_adi: ArrayView1<'a, Complex64>,
}

pub fn save_moments<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    moments: &Moments<'_>,
) -> Result<(), RecordError> {
    rec.save_real_matrix(step, "pop_dia", moments.pop_dia.insert_axis(Axis(1)))?;
    rec.save_real_matrix(step, "pop_adi", moments.pop_adi.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "q_dia", moments.q_dia.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "q_adi", moments.q_adi.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "p_dia", moments.p_dia.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "p_adi", moments.p_adi.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "q2_dia", moments.q2_dia.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "q2_adi", moments.q2_adi.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "p2_dia", moments.p2_dia.insert_axis(Axis(1)))?;
    rec.save_complex_matrix(step, "p2_adi", moments.p2_adi.insert_axis(Axis(1)))?;
    Ok(())
}

pub fn save_density_matrices<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    denmat_dia: ArrayView2<'_, Complex64>,
    denmat_adi: ArrayView2<'_, Complex64>,
) -> Result<(), RecordError> {
    rec.save_complex_matrix(step, "denmat_dia", denmat_dia)?;
    rec.save_complex_matrix(step, "denmat_adi", denmat_adi)?;
    Ok(())
}

/// Wavefunction amplitudes at one step, laid out `(ngrid, nstates)` per
/// representation and space.
#[derive(Clone, Copy)]
pub struct Wavefunctions<'a> {
    pub psi_dia: ArrayView2<'a, Complex64>,
    pub psi_adi: ArrayView2<'a, Complex64>,
    pub recipsi_dia: ArrayView2<'a, Complex64>,
    pub recipsi_adi: ArrayView2<'a, Complex64>,
}

pub fn save_wavefunctions<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    wavefunctions: &Wavefunctions<'_>,
) -> Result<(), RecordError> {
    rec.save_complex_block(step, "PSI_dia", wavefunctions.psi_dia.insert_axis(Axis(2)))?;
    rec.save_complex_block(step, "PSI_adi", wavefunctions.psi_adi.insert_axis(Axis(2)))?;
    rec.save_complex_block(
        step,
        "reciPSI_dia",
        wavefunctions.recipsi_dia.insert_axis(Axis(2)),
    )?;
    rec.save_complex_block(
        step,
        "reciPSI_adi",
        wavefunctions.recipsi_adi.insert_axis(Axis(2)),
    )?;
    Ok(())
}

/// Custom population projections at one step, laid out `(npops, nstates)`.
pub fn save_custom_pops<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    pops: ArrayView2<'_, f64>,
) -> Result<(), RecordError> {
    rec.save_real_block(step, "custom_pops", pops.insert_axis(Axis(2)))
}
