use crate::cli::RatesArgs;
use crate::error::{CliError, Result};
use nalgebra::DMatrix;
use num_complex::Complex64;
use qdrec::analysis::decoherence::{
    apply_dephasing_informed_correction_ensemble, average_absolute_gaps, coherence_intervals,
    energy_based_rates_ensemble,
};
use qdrec::record::Hdf5Reader;
use tracing::{debug, info};

pub fn run(args: RatesArgs) -> Result<()> {
    if args.mass <= 0.0 {
        return Err(CliError::Argument(format!(
            "mass must be positive, got {}",
            args.mass
        )));
    }

    let reader = Hdf5Reader::open(&args.input)?;
    let hvib = reader.read_complexes("hvib_adi")?;
    let momenta = reader.read_reals("p")?;
    let amplitudes = reader.read_complexes("Cadi")?;

    if hvib.ndim() != 4 || momenta.ndim() != 3 || amplitudes.ndim() != 3 {
        return Err(CliError::Argument(
            "the file does not look like a surface-hopping recording".to_string(),
        ));
    }

    let nsteps = hvib.shape()[0];
    let ntraj = hvib.shape()[1];
    let nstates = hvib.shape()[2];
    let ndof = momenta.shape()[2];

    let step = args.step.unwrap_or(nsteps.saturating_sub(1));
    if step >= nsteps {
        return Err(CliError::Argument(format!(
            "step {} is out of range; the file holds {} steps",
            step, nsteps
        )));
    }
    info!(
        "Analyzing step {} of {} ({} trajectories, {} states).",
        step, nsteps, ntraj, nstates
    );

    let hamiltonians: Vec<DMatrix<Complex64>> = (0..ntraj)
        .map(|traj| DMatrix::from_fn(nstates, nstates, |i, j| hvib[[step, traj, i, j]]))
        .collect();
    let kinetic: Vec<f64> = (0..ntraj)
        .map(|traj| {
            (0..ndof)
                .map(|k| momenta[[step, traj, k]].powi(2))
                .sum::<f64>()
                / (2.0 * args.mass)
        })
        .collect();

    let mut rates =
        energy_based_rates_ensemble(&hamiltonians, &kinetic, args.c_param, args.eps_param)?;

    if args.dephasing_informed {
        let mut series = Vec::with_capacity(nsteps * ntraj);
        for s in 0..nsteps {
            for traj in 0..ntraj {
                series.push(DMatrix::from_fn(nstates, nstates, |i, j| {
                    hvib[[s, traj, i, j]]
                }));
            }
        }
        let ave_gaps = average_absolute_gaps(&series);
        debug!(
            "Applying the dephasing-informed correction from {} sampled Hamiltonians.",
            series.len()
        );
        apply_dephasing_informed_correction_ensemble(&mut rates, &hamiltonians, &ave_gaps)?;
    }

    let mut averaged: DMatrix<f64> = DMatrix::zeros(nstates, nstates);
    for r in &rates {
        averaged += r;
    }
    averaged /= ntraj as f64;

    // Columns are ensemble members; 1/sqrt(ntraj) turns their summed
    // populations into ensemble averages.
    let scale = 1.0 / (ntraj as f64).sqrt();
    let ensemble =
        DMatrix::from_fn(nstates, ntraj, |i, traj| amplitudes[[step, traj, i]] * scale);
    let intervals = coherence_intervals(&ensemble, &averaged);

    println!("Decoherence rates at step {} (1/a.u. of time):", step);
    for i in 0..nstates {
        let row: Vec<String> = (0..nstates)
            .map(|j| format!("{:>12.5e}", averaged[(i, j)]))
            .collect();
        println!("  {}", row.join(" "));
    }
    println!("Coherence intervals (a.u. of time):");
    for i in 0..nstates {
        println!("  state {}: {:.5e}", i, intervals[i]);
    }

    Ok(())
}
