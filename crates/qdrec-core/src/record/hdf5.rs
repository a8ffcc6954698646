//! HDF5-backed recording: one group per dataset with `dim` and `data_type`
//! attributes and a gzip-compressed `data` array, written slice by slice as
//! the simulation advances.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use hdf5::types::{TypeDescriptor, VarLenUnicode};
use hdf5::{Dataset, File, Group, H5Type};
use ndarray::{Array1, ArrayD, ArrayView2, ArrayView3, aview1, s};
use num_complex::Complex64;
use tracing::{debug, info};

use super::{
    Compression, DatasetSpec, RecordError, Recorder, ScalarKind, check_kind, check_rank,
    check_slot, check_step, check_trailing,
};

struct Entry {
    spec: DatasetSpec,
    data: Dataset,
}

/// Streams per-timestep writes into an HDF5 file created up front.
///
/// Every registered dataset is allocated at its full extent immediately, so
/// a crashed run leaves a readable file with zeros past the last saved step.
/// An optional name filter turns both registration and writes of unwanted
/// datasets into no-ops.
pub struct Hdf5Recorder {
    path: PathBuf,
    file: File,
    compression: Compression,
    filter: Option<HashSet<String>>,
    datasets: HashMap<String, Entry>,
}

impl Hdf5Recorder {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        Self::with_compression(path, Compression::default())
    }

    pub fn with_compression(
        path: impl AsRef<Path>,
        compression: Compression,
    ) -> Result<Self, RecordError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;

        // Placeholder group present in every recording file.
        let default = file.create_group("default")?;
        default
            .new_dataset_builder()
            .with_data(&Array1::<f64>::zeros(0))
            .create("data")?;

        info!(path = %path.display(), "Created HDF5 recording file");
        Ok(Self {
            path,
            file,
            compression,
            filter: None,
            datasets: HashMap::new(),
        })
    }

    /// Restricts recording to the named datasets. Registrations of any other
    /// name are dropped, which in turn silences all writes to them.
    pub fn set_filter<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(names.into_iter().map(Into::into).collect());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_data<T: H5Type>(
        &self,
        group: &Group,
        spec: &DatasetSpec,
        level: u8,
    ) -> Result<Dataset, hdf5::Error> {
        let builder = group.new_dataset::<T>().shape(spec.shape.clone());
        if self.compression.enabled {
            builder
                .chunk(chunk_shape(&spec.shape))
                .deflate(level)
                .create("data")
        } else {
            builder.create("data")
        }
    }
}

/// One chunk per timestep for multidimensional data; plain 1-D traces are
/// chunked in bounded runs.
fn chunk_shape(shape: &[usize]) -> Vec<usize> {
    if shape.len() == 1 {
        vec![shape[0].min(1024)]
    } else {
        let mut chunk = shape.to_vec();
        chunk[0] = 1;
        chunk
    }
}

impl Recorder for Hdf5Recorder {
    fn register(&mut self, spec: &DatasetSpec) -> Result<(), RecordError> {
        if let Some(filter) = &self.filter {
            if !filter.contains(&spec.name) {
                debug!(name = %spec.name, "Dataset excluded by filter");
                return Ok(());
            }
        }
        if self.datasets.contains_key(&spec.name) {
            return Err(RecordError::DuplicateDataset(spec.name.clone()));
        }
        spec.validate()?;

        let group = self.file.create_group(&spec.name)?;
        let dims: Vec<u64> = spec.shape.iter().map(|&d| d as u64).collect();
        group.new_attr_builder().with_data(&dims).create("dim")?;
        let code: VarLenUnicode = spec
            .kind
            .code()
            .parse()
            .map_err(|_| hdf5::Error::from("data_type code is not valid unicode"))?;
        group
            .new_attr::<VarLenUnicode>()
            .create("data_type")?
            .write_scalar(&code)?;

        let data = match spec.kind {
            ScalarKind::Integer => {
                self.create_data::<i64>(&group, spec, self.compression.integer_level)?
            }
            ScalarKind::Real => {
                self.create_data::<f64>(&group, spec, self.compression.real_level)?
            }
            ScalarKind::Complex => {
                self.create_data::<Complex64>(&group, spec, self.compression.complex_level)?
            }
        };

        debug!(name = %spec.name, shape = ?spec.shape, kind = spec.kind.code(), "Registered dataset");
        self.datasets
            .insert(spec.name.clone(), Entry { spec: spec.clone(), data });
        Ok(())
    }

    fn save_int(&mut self, step: usize, name: &str, value: i64) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Integer)?;
        check_rank(&entry.spec, 1)?;
        check_step(&entry.spec, step)?;
        entry.data.write_slice(aview1(&[value]), s![step..step + 1])?;
        Ok(())
    }

    fn save_real(&mut self, step: usize, name: &str, value: f64) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Real)?;
        check_rank(&entry.spec, 1)?;
        check_step(&entry.spec, step)?;
        entry.data.write_slice(aview1(&[value]), s![step..step + 1])?;
        Ok(())
    }

    fn save_int_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: i64,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Integer)?;
        check_rank(&entry.spec, 2)?;
        check_step(&entry.spec, step)?;
        check_slot(&entry.spec, slot)?;
        entry
            .data
            .write_slice(aview1(&[value]), s![step, slot..slot + 1])?;
        Ok(())
    }

    fn save_real_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: f64,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Real)?;
        check_rank(&entry.spec, 2)?;
        check_step(&entry.spec, step)?;
        check_slot(&entry.spec, slot)?;
        entry
            .data
            .write_slice(aview1(&[value]), s![step, slot..slot + 1])?;
        Ok(())
    }

    fn save_real_matrix(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView2<'_, f64>,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Real)?;
        check_rank(&entry.spec, 3)?;
        check_step(&entry.spec, step)?;
        check_trailing(&entry.spec, 1, value.shape())?;
        let data = value.as_standard_layout();
        entry.data.write_slice(data.view(), s![step, .., ..])?;
        Ok(())
    }

    fn save_complex_matrix(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView2<'_, Complex64>,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Complex)?;
        check_rank(&entry.spec, 3)?;
        check_step(&entry.spec, step)?;
        check_trailing(&entry.spec, 1, value.shape())?;
        let data = value.as_standard_layout();
        entry.data.write_slice(data.view(), s![step, .., ..])?;
        Ok(())
    }

    fn save_real_matrix_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: ArrayView2<'_, f64>,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Real)?;
        check_rank(&entry.spec, 4)?;
        check_step(&entry.spec, step)?;
        check_slot(&entry.spec, slot)?;
        check_trailing(&entry.spec, 2, value.shape())?;
        let data = value.as_standard_layout();
        entry.data.write_slice(data.view(), s![step, slot, .., ..])?;
        Ok(())
    }

    fn save_complex_matrix_at(
        &mut self,
        step: usize,
        slot: usize,
        name: &str,
        value: ArrayView2<'_, Complex64>,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Complex)?;
        check_rank(&entry.spec, 4)?;
        check_step(&entry.spec, step)?;
        check_slot(&entry.spec, slot)?;
        check_trailing(&entry.spec, 2, value.shape())?;
        let data = value.as_standard_layout();
        entry.data.write_slice(data.view(), s![step, slot, .., ..])?;
        Ok(())
    }

    fn save_real_block(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView3<'_, f64>,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Real)?;
        check_rank(&entry.spec, 4)?;
        check_step(&entry.spec, step)?;
        check_trailing(&entry.spec, 1, value.shape())?;
        let data = value.as_standard_layout();
        entry.data.write_slice(data.view(), s![step, .., .., ..])?;
        Ok(())
    }

    fn save_complex_block(
        &mut self,
        step: usize,
        name: &str,
        value: ArrayView3<'_, Complex64>,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.datasets.get(name) else {
            return Ok(());
        };
        check_kind(&entry.spec, ScalarKind::Complex)?;
        check_rank(&entry.spec, 4)?;
        check_step(&entry.spec, step)?;
        check_trailing(&entry.spec, 1, value.shape())?;
        let data = value.as_standard_layout();
        entry.data.write_slice(data.view(), s![step, .., .., ..])?;
        Ok(())
    }
}

/// Name, kind and shape of one recorded dataset, as reported by
/// [`Hdf5Reader::summaries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    pub name: String,
    pub kind: ScalarKind,
    pub shape: Vec<usize>,
}

/// Read-only access to recording files, for post-processing and inspection.
pub struct Hdf5Reader {
    file: File,
}

impl Hdf5Reader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        Ok(Self {
            file: File::open(path)?,
        })
    }

    /// Lists all recorded datasets in name order, skipping the placeholder
    /// group. The kind is taken from the `data_type` attribute when present
    /// and inferred from the on-disk element type otherwise (files flushed
    /// from memory carry no attributes).
    pub fn summaries(&self) -> Result<Vec<DatasetSummary>, RecordError> {
        let mut names = self.file.member_names()?;
        names.sort();

        let mut out = Vec::new();
        for name in names {
            if name == "default" {
                continue;
            }
            let group = self.file.group(&name)?;
            let data = group.dataset("data")?;
            let kind = match group.attr("data_type") {
                Ok(attr) => {
                    let code = attr.read_scalar::<VarLenUnicode>()?;
                    ScalarKind::from_code(code.as_str()).ok_or_else(|| {
                        RecordError::UnknownTypeCode {
                            name: name.clone(),
                            code: code.as_str().to_string(),
                        }
                    })?
                }
                Err(_) => kind_from_dtype(&name, &data)?,
            };
            out.push(DatasetSummary {
                name,
                kind,
                shape: data.shape(),
            });
        }
        Ok(out)
    }

    pub fn read_ints(&self, name: &str) -> Result<ArrayD<i64>, RecordError> {
        Ok(self.data(name)?.read_dyn::<i64>()?)
    }

    pub fn read_reals(&self, name: &str) -> Result<ArrayD<f64>, RecordError> {
        Ok(self.data(name)?.read_dyn::<f64>()?)
    }

    pub fn read_complexes(&self, name: &str) -> Result<ArrayD<Complex64>, RecordError> {
        Ok(self.data(name)?.read_dyn::<Complex64>()?)
    }

    fn data(&self, name: &str) -> Result<Dataset, RecordError> {
        let group = self
            .file
            .group(name)
            .map_err(|_| RecordError::DatasetNotFound(name.to_string()))?;
        group
            .dataset("data")
            .map_err(|_| RecordError::DatasetNotFound(name.to_string()))
    }
}

fn kind_from_dtype(name: &str, data: &Dataset) -> Result<ScalarKind, RecordError> {
    let descriptor = data.dtype()?.to_descriptor()?;
    match descriptor {
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => Ok(ScalarKind::Integer),
        TypeDescriptor::Float(_) => Ok(ScalarKind::Real),
        TypeDescriptor::Compound(_) => Ok(ScalarKind::Complex),
        other => Err(RecordError::UnknownTypeCode {
            name: name.to_string(),
            code: format!("{other:?}"),
        }),
    }
}
