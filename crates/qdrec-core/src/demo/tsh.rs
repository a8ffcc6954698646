//! Model surface-hopping ensemble: phase-shifted harmonic oscillators
//! carrying Rabi-oscillating electronic amplitudes.
//!
//! Nuclear coordinates follow `q = A cos(w t + phi)` with a random phase per
//! trajectory, so the ensemble energies are exactly conserved. The
//! electronic amplitudes Rabi-oscillate between the two lowest states and
//! each trajectory hops against its own random threshold.

use crate::progress::{Progress, ProgressReporter};
use crate::record::schema::{OutputLevel, tsh};
use crate::record::{RecordError, Recorder};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct TshDemoConfig {
    pub nsteps: usize,
    pub ntraj: usize,
    pub ndof: usize,
    /// Size of the electronic basis; the model populates the lowest two.
    pub nstates: usize,
    /// Time step in atomic units.
    pub dt: f64,
    /// Rabi frequency of the electronic amplitudes.
    pub rabi_frequency: f64,
    /// Frequency of the nuclear oscillators.
    pub nuclear_frequency: f64,
    pub mass: f64,
    /// Amplitude of the nuclear oscillation.
    pub amplitude: f64,
    /// Adiabatic energy spacing between neighboring states.
    pub energy_gap: f64,
    /// Nonadiabatic coupling entering the vibronic Hamiltonian.
    pub coupling: f64,
    /// Rotation angle between the diabatic and adiabatic bases.
    pub mixing_angle: f64,
    pub output_level: OutputLevel,
    pub seed: u64,
}

impl Default for TshDemoConfig {
    fn default() -> Self {
        Self {
            nsteps: 100,
            ntraj: 10,
            ndof: 1,
            nstates: 2,
            dt: 10.0,
            rabi_frequency: 0.005,
            nuclear_frequency: 0.01,
            mass: 2000.0,
            amplitude: 1.0,
            energy_gap: 0.1,
            coupling: 0.005,
            mixing_angle: 0.2,
            output_level: OutputLevel(3),
            seed: 0,
        }
    }
}

/// Runs the model ensemble and records it through `rec`. Every observable
/// is offered at every step; the recorder keeps what was registered for the
/// configured output level.
#[instrument(skip_all, name = "tsh_demo")]
pub fn run(
    config: &TshDemoConfig,
    rec: &mut dyn Recorder,
    reporter: &ProgressReporter,
) -> Result<(), RecordError> {
    // === Phase 1: Dataset registration ===
    reporter.report(Progress::PhaseStart {
        name: "Registration",
    });
    let dims = tsh::TshDims {
        nsteps: config.nsteps,
        ntraj: config.ntraj,
        ndof: config.ndof,
        nadi: config.nstates,
        ndia: config.nstates,
    };
    tsh::register(rec, &dims, config.output_level)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Ensemble preparation ===
    let mut rng = StdRng::seed_from_u64(config.seed);
    let phases: Vec<f64> = (0..config.ntraj).map(|_| rng.gen_range(0.0..TAU)).collect();
    let thresholds: Vec<f64> = (0..config.ntraj).map(|_| rng.gen_range(0.0..1.0)).collect();

    let transform = embedded_rotation(config.nstates, config.mixing_angle);
    let transform_dag = dagger(&transform);
    let hvib_adi = vibronic_hamiltonian(config.nstates, config.energy_gap, config.coupling);
    let hvib_dia = transform.dot(&hvib_adi).dot(&transform_dag);
    // The adiabatic basis rotates slowly between consecutive steps.
    let time_overlap = embedded_rotation(config.nstates, config.rabi_frequency * config.dt);
    let projector = Array2::<Complex64>::eye(config.nstates);

    // === Phase 3: Propagation and recording ===
    reporter.report(Progress::PhaseStart {
        name: "Ensemble Propagation",
    });
    reporter.report(Progress::TaskStart {
        total_steps: config.nsteps as u64,
    });

    let mut initial = (0.0, 0.0, 0.0);
    for step in 0..config.nsteps {
        let t = config.dt * step as f64;

        let q = Array2::from_shape_fn((config.ntraj, config.ndof), |(tr, k)| {
            config.amplitude * (config.nuclear_frequency * t + phases[tr] + k as f64).cos()
        });
        let p = Array2::from_shape_fn((config.ntraj, config.ndof), |(tr, k)| {
            -config.mass
                * config.nuclear_frequency
                * config.amplitude
                * (config.nuclear_frequency * t + phases[tr] + k as f64).sin()
        });

        let ekin = p.mapv(|v| v * v).sum() / (2.0 * config.mass * config.ntraj as f64);
        let epot = 0.5 * config.mass * config.nuclear_frequency.powi(2) * q.mapv(|v| v * v).sum()
            / config.ntraj as f64;
        let etot = ekin + epot;
        if step == 0 {
            initial = (ekin, epot, etot);
        }
        tsh::save_summary(
            rec,
            step,
            config.dt,
            &tsh::EnergySummary {
                ekin,
                epot,
                etot,
                dekin: ekin - initial.0,
                depot: epot - initial.1,
                detot: etot - initial.2,
            },
        )?;

        let excited = (config.rabi_frequency * t).sin().powi(2);
        let states: Vec<i64> = thresholds
            .iter()
            .map(|&threshold| i64::from(config.nstates > 1 && excited > threshold))
            .collect();
        tsh::save_active_states(rec, step, &states)?;

        let amp_adi = rabi_amplitudes(config.nstates, config.rabi_frequency * t);
        let amp_dia = transform.dot(&amp_adi);
        let denmat_adi = outer(&amp_adi);
        let denmat_dia = transform.dot(&denmat_adi).dot(&transform_dag);

        let mut sh_pop = Array1::zeros(config.nstates);
        for &state in &states {
            sh_pop[state as usize] += 1.0 / config.ntraj as f64;
        }
        let amp_adi_rows = Array2::from_shape_fn((config.ntraj, config.nstates), |(_, i)| {
            amp_adi[i]
        });
        let amp_dia_rows = Array2::from_shape_fn((config.ntraj, config.nstates), |(_, i)| {
            amp_dia[i]
        });
        tsh::save_ensemble(
            rec,
            step,
            &tsh::EnsembleSnapshot {
                sh_pop: sh_pop.view(),
                denmat_adi: denmat_adi.view(),
                denmat_dia: denmat_dia.view(),
                q: q.view(),
                p: p.view(),
                amp_adi: amp_adi_rows.view(),
                amp_dia: amp_dia_rows.view(),
            },
        )?;

        for traj in 0..config.ntraj {
            tsh::save_trajectory_matrices(
                rec,
                step,
                traj,
                &tsh::TrajectoryMatrices {
                    hvib_adi: hvib_adi.view(),
                    hvib_dia: hvib_dia.view(),
                    time_overlap: time_overlap.view(),
                    basis_transform: transform.view(),
                    projector: projector.view(),
                },
            )?;
        }

        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    info!(
        steps = config.nsteps,
        trajectories = config.ntraj,
        "TSH demo recording complete."
    );
    Ok(())
}

/// Amplitudes of a resonant Rabi oscillation between the two lowest states.
fn rabi_amplitudes(nstates: usize, angle: f64) -> Array1<Complex64> {
    let mut c = Array1::from_elem(nstates, Complex64::new(0.0, 0.0));
    if nstates == 1 {
        c[0] = Complex64::new(1.0, 0.0);
    } else {
        c[0] = Complex64::new(angle.cos(), 0.0);
        c[1] = Complex64::new(0.0, -angle.sin());
    }
    c
}

/// Identity with a rotation by `angle` embedded in the top-left 2x2 block.
fn embedded_rotation(n: usize, angle: f64) -> Array2<Complex64> {
    let mut u = Array2::eye(n);
    if n > 1 {
        u[[0, 0]] = Complex64::new(angle.cos(), 0.0);
        u[[0, 1]] = Complex64::new(-angle.sin(), 0.0);
        u[[1, 0]] = Complex64::new(angle.sin(), 0.0);
        u[[1, 1]] = Complex64::new(angle.cos(), 0.0);
    }
    u
}

fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|z| z.conj())
}

fn outer(c: &Array1<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((c.len(), c.len()), |(i, j)| c[i] * c[j].conj())
}

/// State energies on the diagonal, the antisymmetric coupling on the first
/// off-diagonals.
fn vibronic_hamiltonian(nstates: usize, gap: f64, coupling: f64) -> Array2<Complex64> {
    Array2::from_shape_fn((nstates, nstates), |(i, j)| {
        if i == j {
            Complex64::new(gap * i as f64, 0.0)
        } else if i.abs_diff(j) == 1 {
            let sign = if i < j { -1.0 } else { 1.0 };
            Complex64::new(0.0, sign * coupling)
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}
