use crate::cli::InspectArgs;
use crate::error::{CliError, Result};
use qdrec::record::{DatasetSummary, Hdf5Reader, ScalarKind};
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let reader = Hdf5Reader::open(&args.input)?;
    let summaries = reader.summaries()?;
    info!("Opened {:?} holding {} dataset(s).", args.input, summaries.len());

    match &args.dataset {
        Some(name) => print_dataset(&reader, &summaries, name),
        None => {
            print_listing(&args, &summaries);
            Ok(())
        }
    }
}

fn print_listing(args: &InspectArgs, summaries: &[DatasetSummary]) {
    println!("{} dataset(s) in {}", summaries.len(), args.input.display());
    println!("{:<20} {:>4}  {}", "name", "type", "shape");
    for summary in summaries {
        println!(
            "{:<20} {:>4}  {}",
            summary.name,
            summary.kind.code(),
            format_shape(&summary.shape)
        );
    }
}

fn print_dataset(reader: &Hdf5Reader, summaries: &[DatasetSummary], name: &str) -> Result<()> {
    let summary = summaries.iter().find(|s| s.name == name).ok_or_else(|| {
        CliError::Argument(format!("dataset '{}' is not present in the file", name))
    })?;

    println!(
        "{} ({}, {})",
        summary.name,
        summary.kind.code(),
        format_shape(&summary.shape)
    );
    match summary.kind {
        ScalarKind::Integer => {
            let values = reader.read_ints(name)?;
            let min = values.iter().min().copied().unwrap_or(0);
            let max = values.iter().max().copied().unwrap_or(0);
            println!("  {} entries, min {}, max {}", values.len(), min, max);
        }
        ScalarKind::Real => {
            let values = reader.read_reals(name)?;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
            println!(
                "  {} entries, min {:.6}, max {:.6}, mean {:.6}",
                values.len(),
                min,
                max,
                mean
            );
        }
        ScalarKind::Complex => {
            let values = reader.read_complexes(name)?;
            let peak = values.iter().map(|c| c.norm()).fold(0.0, f64::max);
            println!("  {} entries, peak modulus {:.6}", values.len(), peak);
        }
    }
    Ok(())
}

fn format_shape(shape: &[usize]) -> String {
    shape
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(" x ")
}
