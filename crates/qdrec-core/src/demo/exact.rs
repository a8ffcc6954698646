//! Model grid propagation: a coherent Gaussian wavepacket in a harmonic
//! trap, with Rabi-oscillating state amplitudes on top.
//!
//! The coherent state is exactly solvable: the packet keeps its width while
//! its center follows the classical trajectory, and the reciprocal-space
//! amplitudes are again Gaussian. Total energy is constant and includes the
//! zero-point term `w/2`.

use crate::progress::{Progress, ProgressReporter};
use crate::record::schema::{OutputLevel, exact};
use crate::record::{RecordError, Recorder};
use ndarray::{Array1, Array2, aview1};
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct ExactDemoConfig {
    pub nsteps: usize,
    pub ngrid: usize,
    /// Size of the electronic basis; the model populates the lowest two.
    pub nstates: usize,
    /// Time step in atomic units.
    pub dt: f64,
    /// Spatial extent of the grid, centered at zero.
    pub box_length: f64,
    pub mass: f64,
    /// Frequency of the trapping potential.
    pub frequency: f64,
    /// Initial displacement of the wavepacket center.
    pub displacement: f64,
    pub rabi_frequency: f64,
    /// Rotation angle between the diabatic and adiabatic bases.
    pub mixing_angle: f64,
    /// Record the left/right-half population projections.
    pub custom_pops: bool,
    pub output_level: OutputLevel,
}

impl Default for ExactDemoConfig {
    fn default() -> Self {
        Self {
            nsteps: 100,
            ngrid: 64,
            nstates: 2,
            dt: 10.0,
            box_length: 8.0,
            mass: 2000.0,
            frequency: 0.004,
            displacement: 0.5,
            rabi_frequency: 0.005,
            mixing_angle: 0.2,
            custom_pops: false,
            output_level: OutputLevel(3),
        }
    }
}

/// Number of custom population projections: the two halves of the grid.
const DEMO_NPOPS: usize = 2;

#[instrument(skip_all, name = "exact_demo")]
pub fn run(
    config: &ExactDemoConfig,
    rec: &mut dyn Recorder,
    reporter: &ProgressReporter,
) -> Result<(), RecordError> {
    // === Phase 1: Dataset registration ===
    reporter.report(Progress::PhaseStart {
        name: "Registration",
    });
    let dims = exact::ExactDims {
        nsteps: config.nsteps,
        ndof: 1,
        nstates: config.nstates,
        ngrid: config.ngrid,
    };
    exact::register(rec, &dims, config.output_level)?;
    if config.custom_pops {
        exact::register_custom_pops(rec, config.nsteps, DEMO_NPOPS, config.nstates)?;
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Grid preparation ===
    let dx = config.box_length / config.ngrid as f64;
    let dk = 2.0 * PI / config.box_length;
    let x_grid = Array1::from_shape_fn(config.ngrid, |i| {
        -0.5 * config.box_length + i as f64 * dx
    });
    let k_grid = Array1::from_shape_fn(config.ngrid, |j| {
        (j as f64 - 0.5 * config.ngrid as f64) * dk
    });

    let sigma2 = 1.0 / (2.0 * config.mass * config.frequency);
    let norm_x = (2.0 * PI * sigma2).powf(-0.25);
    let norm_k = (2.0 * sigma2 / PI).powf(0.25);

    let transform = mixing_rotation(config.nstates, config.mixing_angle);

    // === Phase 3: Propagation and recording ===
    reporter.report(Progress::PhaseStart {
        name: "Wavepacket Propagation",
    });
    reporter.report(Progress::TaskStart {
        total_steps: config.nsteps as u64,
    });
    for step in 0..config.nsteps {
        let t = config.dt * step as f64;
        let center = config.displacement * (config.frequency * t).cos();
        let momentum =
            -config.mass * config.frequency * config.displacement * (config.frequency * t).sin();

        let packet = x_grid.mapv(|x| {
            let u = x - center;
            norm_x * Complex64::new(-u * u / (4.0 * sigma2), momentum * u).exp()
        });
        let reci_packet = k_grid.mapv(|k| {
            let v = k - momentum;
            norm_k * (-sigma2 * v * v).exp() * Complex64::new(0.0, -k * center).exp()
        });

        let amp_dia = rabi_amplitudes(config.nstates, config.rabi_frequency * t);
        let amp_adi = transform.dot(&amp_dia);

        let psi_dia = spread(&packet, &amp_dia);
        let psi_adi = spread(&packet, &amp_adi);
        let recipsi_dia = spread(&reci_packet, &amp_dia);
        let recipsi_adi = spread(&reci_packet, &amp_adi);

        // The grid norm doubles as a discretization check; analytically it
        // is one in both representations.
        let norm = psi_dia.iter().map(|z| z.norm_sqr()).sum::<f64>() * dx;
        let ekin = (momentum * momentum + 0.25 / sigma2) / (2.0 * config.mass);
        let epot = 0.5
            * config.mass
            * config.frequency.powi(2)
            * (center * center + sigma2);
        exact::save_summary(
            rec,
            step,
            config.dt,
            &exact::StepSummary {
                ekin_dia: ekin,
                ekin_adi: ekin,
                epot_dia: epot,
                epot_adi: epot,
                etot_dia: ekin + epot,
                etot_adi: ekin + epot,
                norm_dia: norm,
                norm_adi: norm,
            },
        )?;

        let pop_dia = amp_dia.mapv(|c| c.norm_sqr());
        let pop_adi = amp_adi.mapv(|c| c.norm_sqr());
        let q_moment = [Complex64::new(center, 0.0)];
        let p_moment = [Complex64::new(momentum, 0.0)];
        let q2_moment = [Complex64::new(center * center + sigma2, 0.0)];
        let p2_moment = [Complex64::new(momentum * momentum + 0.25 / sigma2, 0.0)];
        exact::save_moments(
            rec,
            step,
            &exact::Moments {
                pop_dia: pop_dia.view(),
                pop_adi: pop_adi.view(),
                q_dia: aview1(&q_moment),
                q_adi: aview1(&q_moment),
                p_dia: aview1(&p_moment),
                p_adi: aview1(&p_moment),
                q2_dia: aview1(&q2_moment),
                q2_adi: aview1(&q2_moment),
                p2_dia: aview1(&p2_moment),
                p2_adi: aview1(&p2_moment),
            },
        )?;

        let denmat_dia = outer(&amp_dia);
        let denmat_adi = outer(&amp_adi);
        exact::save_density_matrices(rec, step, denmat_dia.view(), denmat_adi.view())?;

        exact::save_wavefunctions(
            rec,
            step,
            &exact::Wavefunctions {
                psi_dia: psi_dia.view(),
                psi_adi: psi_adi.view(),
                recipsi_dia: recipsi_dia.view(),
                recipsi_adi: recipsi_adi.view(),
            },
        )?;

        if config.custom_pops {
            let left: f64 = x_grid
                .iter()
                .zip(packet.iter())
                .filter(|&(&x, _)| x < 0.0)
                .map(|(_, z)| z.norm_sqr())
                .sum::<f64>()
                * dx;
            let right = norm - left;
            let pops = Array2::from_shape_fn((DEMO_NPOPS, config.nstates), |(half, s)| {
                let weight = if half == 0 { left } else { right };
                weight * pop_dia[s]
            });
            exact::save_custom_pops(rec, step, pops.view())?;
        }

        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    info!(
        steps = config.nsteps,
        grid = config.ngrid,
        "Exact propagation demo recording complete."
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
fn mixing_rotation(n: usize, angle: f64) -> Array2<Complex64> {
    let mut u = Array2::eye(n);
    if n > 1 {
        u[[0, 0]] = Complex64::new(angle.cos(), 0.0);
        u[[0, 1]] = Complex64::new(-angle.sin(), 0.0);
        u[[1, 0]] = Complex64::new(angle.sin(), 0.0);
        u[[1, 1]] = Complex64::new(angle.cos(), 0.0);
    }
    u
}

fn outer(c: &Array1<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((c.len(), c.len()), |(i, j)| c[i] * c[j].conj())
}

/// Spatial profile times state amplitudes, laid out `(ngrid, nstates)`.
fn spread(packet: &Array1<Complex64>, amplitudes: &Array1<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((packet.len(), amplitudes.len()), |(i, s)| {
        packet[i] * amplitudes[s]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemRecorder;

    fn config() -> ExactDemoConfig {
        ExactDemoConfig {
            nsteps: 3,
            ngrid: 128,
            dt: 20.0,
            custom_pops: true,
            output_level: OutputLevel(4),
            ..ExactDemoConfig::default()
        }
    }

    #[test]
    fn energies_and_norms_are_conserved() {
        let mut rec = MemRecorder::new();
        run(&config(), &mut rec, &ProgressReporter::new()).unwrap();

        let etot = rec.reals("Etot_dia").unwrap();
        let expected = 0.5 * 2000.0 * 0.004_f64.powi(2) * 0.5_f64.powi(2) + 0.004 / 2.0;
        for &e in etot.iter() {
            assert!((e - expected).abs() < 1e-12);
        }

        let norm = rec.reals("norm_dia").unwrap();
        for &n in norm.iter() {
            assert!((n - 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn grid_wavefunctions_carry_the_state_populations() {
        let mut rec = MemRecorder::new();
        run(&config(), &mut rec, &ProgressReporter::new()).unwrap();

        let psi = rec.complexes("PSI_dia").unwrap();
        let pop = rec.reals("pop_dia").unwrap();
        let dx = 8.0 / 128.0;
        for step in 0..3 {
            for s in 0..2 {
                let weight: f64 = (0..128)
                    .map(|i| psi[[step, i, s, 0]].norm_sqr())
                    .sum::<f64>()
                    * dx;
                assert!((weight - pop[[step, s, 0]]).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn reciprocal_packet_is_normalized_on_its_grid() {
        let mut rec = MemRecorder::new();
        run(&config(), &mut rec, &ProgressReporter::new()).unwrap();

        let reci = rec.complexes("reciPSI_dia").unwrap();
        let dk = 2.0 * PI / 8.0;
        let weight: f64 = (0..128)
            .map(|j| {
                (0..2)
                    .map(|s| reci[[0, j, s, 0]].norm_sqr())
                    .sum::<f64>()
            })
            .sum::<f64>()
            * dk;
        assert!((weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn custom_pops_record_independently_of_the_level() {
        let mut rec = MemRecorder::new();
        let config = ExactDemoConfig {
            output_level: OutputLevel(0),
            ..config()
        };
        run(&config, &mut rec, &ProgressReporter::new()).unwrap();

        assert!(rec.ints("timestep").is_none());
        assert!(rec.complexes("PSI_dia").is_none());
        let pops = rec.reals("custom_pops").unwrap();
        assert_eq!(pops.shape(), &[3, 2, 2, 1]);

        // Halves add up to the state population, which adds up to one.
        let total: f64 = (0..2).map(|h| (0..2).map(|s| pops[[0, h, s, 0]]).sum::<f64>()).sum();
        assert!((total - 1.0).abs() < 1e-8);
    }

    #[test]
    fn hdf5_files_round_trip_the_recording() {
        use crate::record::{Hdf5Reader, Hdf5Recorder, ScalarKind};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.hdf");
        let mut rec = Hdf5Recorder::create(&path).unwrap();
        run(&config(), &mut rec, &ProgressReporter::new()).unwrap();
        drop(rec);

        let reader = Hdf5Reader::open(&path).unwrap();
        let summaries = reader.summaries().unwrap();
        let psi = summaries.iter().find(|s| s.name == "PSI_dia").unwrap();
        assert_eq!(psi.kind, ScalarKind::Complex);
        assert_eq!(psi.shape, vec![3, 128, 2, 1]);

        let pops = reader.read_reals("custom_pops").unwrap();
        assert_eq!(pops.shape(), &[3, 2, 2, 1]);
        let etot = reader.read_reals("Etot_adi").unwrap();
        assert!((etot[[1]] - etot[[0]]).abs() < 1e-12);
    }
}
