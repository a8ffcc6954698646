//! Recording schema for HEOM (hierarchical equations of motion) runs: the
//! step stamp at tier 1 and the reduced density matrix of the system at
//! tier 3.

use ndarray::ArrayView2;
use num_complex::Complex64;

use super::OutputLevel;
use crate::record::{DatasetSpec, RecordError, Recorder, ScalarKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeomDims {
    pub nsteps: usize,
    /// Dimension of the system part of the hierarchy.
    pub nquant: usize,
}

pub fn register<R: Recorder + ?Sized>(
    rec: &mut R,
    dims: &HeomDims,
    level: OutputLevel,
) -> Result<(), RecordError> {
    let HeomDims { nsteps, nquant } = *dims;

    if level.enables(1) {
        rec.register(&DatasetSpec::new("timestep", &[nsteps], ScalarKind::Integer))?;
        rec.register(&DatasetSpec::new("time", &[nsteps], ScalarKind::Real))?;
    }

    if level.enables(3) {
        rec.register(&DatasetSpec::new(
            "denmat",
            &[nsteps, nquant, nquant],
            ScalarKind::Complex,
        ))?;
    }

    Ok(())
}

pub fn save_step<R: Recorder + ?Sized>(
    rec: &mut R,
    step: usize,
    dt: f64,
    denmat: ArrayView2<'_, Complex64>,
) -> Result<(), RecordError> {
    rec.save_int(step, "timestep", step as i64)?;
    rec.save_real(step, "time", dt * step as f64)?;
    rec.save_complex_matrix(step, "denmat", denmat)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemRecorder;
    use ndarray::arr2;

    #[test]
    fn density_matrix_requires_level_three() {
        let dims = HeomDims { nsteps: 2, nquant: 2 };

        let mut low = MemRecorder::new();
        register(&mut low, &dims, OutputLevel(2)).unwrap();
        assert_eq!(low.dataset_names(), vec!["timestep", "time"]);

        let mut full = MemRecorder::new();
        register(&mut full, &dims, OutputLevel(3)).unwrap();
        assert_eq!(full.dataset_names(), vec!["timestep", "time", "denmat"]);
    }

    #[test]
    fn save_step_records_stamp_and_density_matrix() {
        let dims = HeomDims { nsteps: 2, nquant: 2 };
        let mut rec = MemRecorder::new();
        register(&mut rec, &dims, OutputLevel(3)).unwrap();

        let rho = arr2(&[
            [Complex64::new(0.9, 0.0), Complex64::new(0.0, 0.1)],
            [Complex64::new(0.0, -0.1), Complex64::new(0.1, 0.0)],
        ]);
        save_step(&mut rec, 1, 0.5, rho.view()).unwrap();

        assert_eq!(rec.ints("timestep").unwrap()[[1]], 1);
        assert!((rec.reals("time").unwrap()[[1]] - 0.5).abs() < 1e-15);
        assert_eq!(
            rec.complexes("denmat").unwrap()[[1, 0, 1]],
            Complex64::new(0.0, 0.1)
        );
    }
}
