use qdrec::analysis::decoherence::DecoherenceError;
use qdrec::analysis::pdos::PdosError;
use qdrec::record::RecordError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Pdos(#[from] PdosError),

    #[error(transparent)]
    Decoherence(#[from] DecoherenceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),
}
