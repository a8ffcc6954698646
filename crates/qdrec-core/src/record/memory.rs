//! In-memory recording with postponed, selective flushes to HDF5.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use hdf5::File;
use ndarray::{ArrayD, ArrayView2, ArrayView3, Axis, IxDyn};
use num_complex::Complex64;
use tracing::{debug, info, warn};

use super::{
    DatasetSpec, RecordError, Recorder, ScalarKind, check_kind, check_rank, check_slot,
    check_step, check_trailing,
};

enum Buffer {
    Integer(ArrayD<i64>),
    Real(ArrayD<f64>),
    Complex(ArrayD<Complex64>),
}

/// How [`MemRecorder::flush_to`] treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    Truncate,
    Append,
}

/// Buffers every registered dataset in memory. Useful when the caller wants
/// to postpone I/O to the end of a run, or to keep only a subset of what the
/// save routines produce: [`MemRecorder::flush_to`] writes any chosen group
/// of datasets, truncating or appending to the target file.
#[derive(Default)]
pub struct MemRecorder {
    filter: Option<HashSet<String>>,
    order: Vec<String>,
    buffers: HashMap<String, (DatasetSpec, Buffer)>,
}

impl MemRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same contract as the HDF5 backend: only the named datasets survive
    /// registration, everything else becomes a no-op.
    pub fn set_filter<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(names.into_iter().map(Into::into).collect());
    }

    /// Registered dataset names in registration order.
    pub fn dataset_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn ints(&self, name: &str) -> Option<&ArrayD<i64>> {
        match self.buffers.get(name) {
            Some((_, Buffer::Integer(a))) => Some(a),
            _ => None,
        }
    }

    pub fn reals(&self, name: &str) -> Option<&ArrayD<f64>> {
        match self.buffers.get(name) {
            Some((_, Buffer::Real(a))) => Some(a),
            _ => None,
        }
    }

    pub fn complexes(&self, name: &str) -> Option<&ArrayD<Complex64>> {
        match self.buffers.get(name) {
            Some((_, Buffer::Complex(a))) => Some(a),
            _ => None,
        }
    }

    /// Writes the named buffered datasets to `path`, one `<name>/data` array
    /// per dataset. Names that were never recorded are skipped with a
    /// warning instead of failing the whole flush.
    pub fn flush_to(
        &self,
        path: impl AsRef<Path>,
        names: &[&str],
        mode: FlushMode,
    ) -> Result<(), RecordError> {
        let path = path.as_ref();
        let file = match mode {
            FlushMode::Truncate => File::create(path)?,
            FlushMode::Append => File::append(path)?,
        };

        for &name in names {
            let Some((_, buffer)) = self.buffers.get(name) else {
                warn!(name, "Requested dataset was never recorded; skipping");
                continue;
            };
            let group = file.create_group(name)?;
            match buffer {
                Buffer::Integer(a) => {
                    group.new_dataset_builder().with_data(a).create("data")?;
                }
                Buffer::Real(a) => {
                    group.new_dataset_builder().with_data(a).create("data")?;
                }
                Buffer::Complex(a) => {
                    group.new_dataset_builder().with_data(a).create("data")?;
                }
            }
        }

        info!(path = %path.display(), count = names.len(), "Flushed buffered datasets");
        Ok(())
    }

    fn entry(&mut self, name: &str) -> Option<&mut (DatasetSpec, Buffer)> {
        self.buffers.get_mut(name)
    }
}

impl Recorder for MemRecorder {
    fn register(&mut self, spec: &DatasetSpec) -> Result<(), RecordError> {
        if let Some(filter) = &self.filter {
            if !filter.contains(&spec.name) {
                debug!(name = %spec.name, "Dataset excluded by filter");
                return Ok(());
            }
        }
        if self.buffers.contains_key(&spec.name) {
            return Err(RecordError::DuplicateDataset(spec.name.clone()));
        }
        spec.validate()?;

        let shape = IxDyn(&spec.shape);
        let buffer = match spec.kind {
            ScalarKind::Integer => Buffer::Integer(ArrayD::zeros(shape)),
            ScalarKind::Real => Buffer::Real(ArrayD::zeros(shape)),
            ScalarKind::Complex => Buffer::Complex(ArrayD::zeros(shape)),
        };

        self.order.push(spec.name.clone());
        self.buffers
            .insert(spec.name.clone(), (spec.clone(), buffer));
        Ok(())
    }

    fn save_int(&mut self, step: usize, name: &str, value: i64) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Integer)?;
        check_rank(spec, 1)?;
        check_step(spec, step)?;
        if let Buffer::Integer(a) = buffer {
            a[[step]] = value;
        }
        Ok(())
    }

    fn save_real(&mut self, step: usize, name: &str, value: f64) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Real)?;
        check_rank(spec, 1)?;
        check_step(spec, step)?;
        if let Buffer::Real(a) = buffer {
            a[[step]] = value;
        }
        Ok(())
    }

    fn save_int_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: i64,
    ) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Integer)?;
        check_rank(spec, 2)?;
        check_step(spec, step)?;
        check_slot(spec, slot)?;
        if let Buffer::Integer(a) = buffer {
            a[[step, slot]] = value;
        }
        Ok(())
    }

    fn save_real_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: f64,
    ) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Real)?;
        check_rank(spec, 2)?;
        check_step(spec, step)?;
        check_slot(spec, slot)?;
        if let Buffer::Real(a) = buffer {
            a[[step, slot]] = value;
        }
        Ok(())
    }

    fn save_real_matrix(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView2<'_, f64>,
    ) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Real)?;
        check_rank(spec, 3)?;
        check_step(spec, step)?;
        check_trailing(spec, 1, value.shape())?;
        if let Buffer::Real(a) = buffer {
            a.index_axis_mut(Axis(0), step).assign(&value);
        }
        Ok(())
    }

    fn save_complex_matrix(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView2<'_, Complex64>,
    ) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Complex)?;
        check_rank(spec, 3)?;
        check_step(spec, step)?;
        check_trailing(spec, 1, value.shape())?;
        if let Buffer::Complex(a) = buffer {
            a.index_axis_mut(Axis(0), step).assign(&value);
        }
        Ok(())
    }

    fn save_real_matrix_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: ArrayView2<'_, f64>,
    ) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Real)?;
        check_rank(spec, 4)?;
        check_step(spec, step)?;
        check_slot(spec, slot)?;
        check_trailing(spec, 2, value.shape())?;
        if let Buffer::Real(a) = buffer {
            a.index_axis_mut(Axis(0), step)
                .index_axis_move(Axis(0), slot)
                .assign(&value);
        }
        Ok(())
    }

    fn save_complex_matrix_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: ArrayView2<'_, Complex64>,
    ) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Complex)?;
        check_rank(spec, 4)?;
        check_step(spec, step)?;
        check_slot(spec, slot)?;
        check_trailing(spec, 2, value.shape())?;
        if let Buffer::Complex(a) = buffer {
            a.index_axis_mut(Axis(0), step)
                .index_axis_move(Axis(0), slot)
                .assign(&value);
        }
        Ok(())
    }

    fn save_real_block(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView3<'_, f64>,
    ) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Real)?;
        check_rank(spec, 4)?;
        check_step(spec, step)?;
        check_trailing(spec, 1, value.shape())?;
        if let Buffer::Real(a) = buffer {
            a.index_axis_mut(Axis(0), step).assign(&value);
        }
        Ok(())
    }

    fn save_complex_block(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView3<'_, Complex64>,
    ) -> Result<(), RecordError> {
        let Some((spec, buffer)) = self.entry(name) else {
            return Ok(());
        };
        check_kind(spec, ScalarKind::Complex)?;
        check_rank(spec, 4)?;
        check_step(spec, step)?;
        check_trailing(spec, 1, value.shape())?;
        if let Buffer::Complex(a) = buffer {
            a.index_axis_mut(Axis(0), step).assign(&value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn registration_order_is_preserved() {
        let mut rec = MemRecorder::new();
        rec.register(&DatasetSpec::new("timestep", &[3], ScalarKind::Integer))
            .unwrap();
        rec.register(&DatasetSpec::new("time", &[3], ScalarKind::Real))
            .unwrap();
        assert_eq!(rec.dataset_names(), vec!["timestep", "time"]);
    }

    #[test]
    fn buffered_values_land_at_the_addressed_indices() {
        let mut rec = MemRecorder::new();
        rec.register(&DatasetSpec::new("states", &[2, 3], ScalarKind::Integer))
            .unwrap();
        rec.register(&DatasetSpec::new("denmat", &[2, 2, 2], ScalarKind::Complex))
            .unwrap();

        rec.save_int_at(1, 2, "states", 5).unwrap();
        let rho = arr2(&[
            [Complex64::new(0.7, 0.0), Complex64::new(0.1, -0.2)],
            [Complex64::new(0.1, 0.2), Complex64::new(0.3, 0.0)],
        ]);
        rec.save_complex_matrix(0, "denmat", rho.view()).unwrap();

        assert_eq!(rec.ints("states").unwrap()[[1, 2]], 5);
        assert_eq!(
            rec.complexes("denmat").unwrap()[[0, 1, 0]],
            Complex64::new(0.1, 0.2)
        );
    }

    #[test]
    fn typed_getters_reject_wrong_kind() {
        let mut rec = MemRecorder::new();
        rec.register(&DatasetSpec::new("time", &[2], ScalarKind::Real))
            .unwrap();
        assert!(rec.reals("time").is_some());
        assert!(rec.ints("time").is_none());
        assert!(rec.reals("missing").is_none());
    }

    #[test]
    fn flush_writes_only_the_requested_subset() {
        let mut rec = MemRecorder::new();
        rec.register(&DatasetSpec::new("time", &[2], ScalarKind::Real))
            .unwrap();
        rec.register(&DatasetSpec::new("Ekin_ave", &[2], ScalarKind::Real))
            .unwrap();
        rec.save_real(0, "time", 0.0).unwrap();
        rec.save_real(1, "time", 0.5).unwrap();
        rec.save_real(1, "Ekin_ave", 0.125).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mem.hdf");
        rec.flush_to(&path, &["time", "never_seen"], FlushMode::Truncate)
            .unwrap();

        let reader = super::super::Hdf5Reader::open(&path).unwrap();
        let summaries = reader.summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "time");
        assert_eq!(summaries[0].kind, ScalarKind::Real);
        let time = reader.read_reals("time").unwrap();
        assert_eq!(time[[1]], 0.5);
    }

    #[test]
    fn append_adds_datasets_to_an_existing_file() {
        let mut first = MemRecorder::new();
        first
            .register(&DatasetSpec::new("time", &[2], ScalarKind::Real))
            .unwrap();
        first.save_real(1, "time", 0.5).unwrap();

        let mut second = MemRecorder::new();
        second
            .register(&DatasetSpec::new("states", &[2, 2], ScalarKind::Integer))
            .unwrap();
        second.save_int_at(0, 1, "states", 3).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mem.hdf");
        first
            .flush_to(&path, &["time"], FlushMode::Truncate)
            .unwrap();
        second
            .flush_to(&path, &["states"], FlushMode::Append)
            .unwrap();

        let reader = super::super::Hdf5Reader::open(&path).unwrap();
        let names: Vec<String> = reader
            .summaries()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["states".to_string(), "time".to_string()]);
        assert_eq!(reader.read_ints("states").unwrap()[[0, 1]], 3);
    }
}
