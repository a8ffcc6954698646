use crate::cli::{RunArgs, RunCommands, RunModelArgs};
use crate::config::{PartialExactDemoConfig, PartialHeomDemoConfig, PartialTshDemoConfig};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use qdrec::demo;
use qdrec::progress::ProgressReporter;
use qdrec::record::{FlushMode, Hdf5Recorder, MemRecorder, RecordError, Recorder};
use tracing::{debug, info};

pub fn run(args: RunArgs) -> Result<()> {
    match args.command {
        RunCommands::Tsh(args) => {
            let partial = match &args.config {
                Some(path) => PartialTshDemoConfig::from_file(path)?,
                None => PartialTshDemoConfig::default(),
            };
            let config = partial.merge_with_cli(&args);
            debug!("Resolved model configuration: {:?}", config);
            record(&args, "surface-hopping ensemble", |rec, reporter| {
                demo::tsh::run(&config, rec, reporter)
            })
        }
        RunCommands::Heom(args) => {
            let partial = match &args.config {
                Some(path) => PartialHeomDemoConfig::from_file(path)?,
                None => PartialHeomDemoConfig::default(),
            };
            let config = partial.merge_with_cli(&args);
            debug!("Resolved model configuration: {:?}", config);
            record(&args, "damped Rabi density matrix", |rec, reporter| {
                demo::heom::run(&config, rec, reporter)
            })
        }
        RunCommands::Exact(args) => {
            let partial = match &args.config {
                Some(path) => PartialExactDemoConfig::from_file(path)?,
                None => PartialExactDemoConfig::default(),
            };
            let config = partial.merge_with_cli(&args);
            debug!("Resolved model configuration: {:?}", config);
            record(&args, "grid wavepacket", |rec, reporter| {
                demo::exact::run(&config, rec, reporter)
            })
        }
    }
}

fn record<F>(args: &RunModelArgs, label: &str, record_fn: F) -> Result<()>
where
    F: FnOnce(&mut dyn Recorder, &ProgressReporter) -> std::result::Result<(), RecordError>,
{
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Recording the {}...", label);
    if args.buffered {
        let mut rec = MemRecorder::new();
        record_fn(&mut rec, &reporter)?;
        let names = rec.dataset_names();
        rec.flush_to(&args.output, &names, FlushMode::Truncate)?;
        info!(
            "Flushed {} buffered dataset(s) to {:?}.",
            names.len(),
            args.output
        );
    } else {
        let mut rec = Hdf5Recorder::create(&args.output)?;
        record_fn(&mut rec, &reporter)?;
    }

    println!("✓ Recording written to: {}", args.output.display());
    Ok(())
}
