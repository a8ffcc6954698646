//! Schema-driven recording of per-timestep simulation observables.
//!
//! A recording session follows the same shape regardless of the backend:
//! datasets are declared up front with [`Recorder::register`] (name, full
//! shape with the step count as the leading axis, scalar kind), then the
//! simulation loop calls the `save_*` methods once per timestep. Writes
//! addressed to a name that was never registered are silently ignored; the
//! per-flavor helpers in [`schema`] rely on this to let the output level
//! decide what ends up in the file while the save calls stay unconditional.
//!
//! Two backends are provided: [`hdf5::Hdf5Recorder`] streams every write to
//! an HDF5 file as it happens, [`memory::MemRecorder`] buffers everything in
//! memory and can flush a chosen subset of datasets at the end.

pub mod hdf5;
pub mod memory;
pub mod schema;

use ndarray::{ArrayView2, ArrayView3};
use num_complex::Complex64;
use thiserror::Error;

pub use self::hdf5::{DatasetSummary, Hdf5Reader, Hdf5Recorder};
pub use self::memory::{FlushMode, MemRecorder};

/// Scalar type stored by a dataset, encoded on disk as the group attribute
/// `data_type` with values `"I"`, `"R"`, and `"C"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Integer,
    Real,
    Complex,
}

impl ScalarKind {
    pub fn code(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "I",
            ScalarKind::Real => "R",
            ScalarKind::Complex => "C",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "I" => Some(ScalarKind::Integer),
            "R" => Some(ScalarKind::Real),
            "C" => Some(ScalarKind::Complex),
            _ => None,
        }
    }
}

/// Declaration of one dataset: its name, full shape (leading axis = number
/// of timesteps) and scalar kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub kind: ScalarKind,
}

impl DatasetSpec {
    pub fn new(name: impl Into<String>, shape: &[usize], kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            shape: shape.to_vec(),
            kind,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), RecordError> {
        if self.shape.is_empty() || self.shape.contains(&0) {
            return Err(RecordError::EmptyDimension {
                name: self.name.clone(),
                shape: self.shape.clone(),
            });
        }
        Ok(())
    }
}

/// Per-kind gzip levels used by the HDF5 backend. Integer data (step
/// counters, state indices) compresses much harder than floating-point
/// trajectories, hence the asymmetric defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression {
    pub enabled: bool,
    pub complex_level: u8,
    pub real_level: u8,
    pub integer_level: u8,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            enabled: true,
            complex_level: 4,
            real_level: 4,
            integer_level: 9,
        }
    }
}

impl Compression {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Dataset '{0}' is already registered")]
    DuplicateDataset(String),

    #[error("Dataset '{name}' declares a zero-sized dimension: {shape:?}")]
    EmptyDimension { name: String, shape: Vec<usize> },

    #[error("Dataset '{name}' stores {expected:?} values, but a {found:?} value was written")]
    KindMismatch {
        name: String,
        expected: ScalarKind,
        found: ScalarKind,
    },

    #[error("Dataset '{name}' has rank {rank}, which this write does not address")]
    RankMismatch { name: String, rank: usize },

    #[error("Value shape {found:?} does not match the trailing dimensions {expected:?} of dataset '{name}'")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Step {step} is out of range for dataset '{name}' with {nsteps} steps")]
    StepOutOfRange {
        name: String,
        step: usize,
        nsteps: usize,
    },

    #[error("Slot {slot} is out of range for dataset '{name}' with {nslots} slots")]
    SlotOutOfRange {
        name: String,
        slot: usize,
        nslots: usize,
    },

    #[error("Dataset '{0}' does not exist in the file")]
    DatasetNotFound(String),

    #[error("Unrecognized data type code '{code}' on dataset '{name}'")]
    UnknownTypeCode { name: String, code: String },

    #[error("HDF5 operation failed: {0}")]
    Hdf5(#[from] ::hdf5::Error),
}

/// Sink for per-timestep observables.
///
/// All `save_*` methods are strict about the kind, rank and trailing shape of
/// a *registered* dataset and report [`RecordError`] on any mismatch, but an
/// unregistered name turns the write into a no-op. Scalars go into rank-1
/// datasets (or rank-2 with an explicit slot), matrices into rank-3 (rank-4
/// with a slot), and rank-3 blocks fill a whole step of a rank-4 dataset.
pub trait Recorder {
    fn register(&mut self, spec: &DatasetSpec) -> Result<(), RecordError>;

    fn save_int(&mut self, step: usize, name: &str, value: i64) -> Result<(), RecordError>;
    fn save_real(&mut self, step: usize, name: &str, value: f64) -> Result<(), RecordError>;

    fn save_int_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: i64,
    ) -> Result<(), RecordError>;
    fn save_real_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: f64,
    ) -> Result<(), RecordError>;

    fn save_real_matrix(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView2<'_, f64>,
    ) -> Result<(), RecordError>;
    fn save_complex_matrix(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView2<'_, Complex64>,
    ) -> Result<(), RecordError>;

    fn save_real_matrix_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: ArrayView2<'_, f64>,
    ) -> Result<(), RecordError>;
    fn save_complex_matrix_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: ArrayView2<'_, Complex64>,
    ) -> Result<(), RecordError>;

    fn save_real_block(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView3<'_, f64>,
    ) -> Result<(), RecordError>;
    fn save_complex_block(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView3<'_, Complex64>,
    ) -> Result<(), RecordError>;
}

/// Shared bookkeeping checks used by both backends.
pub(crate) fn check_kind(
    spec: &DatasetSpec,
    found: ScalarKind,
) -> Result<(), RecordError> {
    if spec.kind != found {
        return Err(RecordError::KindMismatch {
            name: spec.name.clone(),
            expected: spec.kind,
            found,
        });
    }
    Ok(())
}

pub(crate) fn check_rank(spec: &DatasetSpec, rank: usize) -> Result<(), RecordError> {
    if spec.shape.len() != rank {
        return Err(RecordError::RankMismatch {
            name: spec.name.clone(),
            rank: spec.shape.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_step(spec: &DatasetSpec, step: usize) -> Result<(), RecordError> {
    let nsteps = spec.shape[0];
    if step >= nsteps {
        return Err(RecordError::StepOutOfRange {
            name: spec.name.clone(),
            step,
            nsteps,
        });
    }
    Ok(())
}

pub(crate) fn check_slot(spec: &DatasetSpec, slot: usize) -> Result<(), RecordError> {
    let nslots = spec.shape[1];
    if slot >= nslots {
        return Err(RecordError::SlotOutOfRange {
            name: spec.name.clone(),
            slot,
            nslots,
        });
    }
    Ok(())
}

pub(crate) fn check_trailing(
    spec: &DatasetSpec,
    skip: usize,
    found: &[usize],
) -> Result<(), RecordError> {
    let expected = &spec.shape[skip..];
    if expected != found {
        return Err(RecordError::ShapeMismatch {
            name: spec.name.clone(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_kind_codes_round_trip() {
        for kind in [ScalarKind::Integer, ScalarKind::Real, ScalarKind::Complex] {
            assert_eq!(ScalarKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ScalarKind::from_code("X"), None);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let spec = DatasetSpec::new("q", &[10, 0, 3], ScalarKind::Real);
        assert!(matches!(
            spec.validate(),
            Err(RecordError::EmptyDimension { .. })
        ));
    }

    #[test]
    fn default_compression_levels_match_per_kind_defaults() {
        let c = Compression::default();
        assert!(c.enabled);
        assert_eq!((c.complex_level, c.real_level, c.integer_level), (4, 4, 9));
        assert!(!Compression::disabled().enabled);
    }

    #[test]
    fn trailing_shape_check_skips_leading_axes() {
        let spec = DatasetSpec::new("hvib", &[10, 4, 2, 2], ScalarKind::Complex);
        assert!(check_trailing(&spec, 2, &[2, 2]).is_ok());
        assert!(matches!(
            check_trailing(&spec, 1, &[2, 2]),
            Err(RecordError::ShapeMismatch { .. })
        ));
    }
}
