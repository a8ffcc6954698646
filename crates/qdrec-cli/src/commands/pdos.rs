use crate::cli::{LevelsPdosArgs, PdosArgs, PdosCommands, QePdosArgs};
use crate::config::{PartialLevelsPdosConfig, PartialQePdosConfig};
use crate::error::Result;
use qdrec::analysis::pdos::{levels_pdos, qe_pdos};
use tracing::info;

pub fn run(args: PdosArgs) -> Result<()> {
    match args.command {
        PdosCommands::Qe(args) => run_qe(args),
        PdosCommands::Levels(args) => run_levels(args),
    }
}

fn run_qe(args: QePdosArgs) -> Result<()> {
    let partial = PartialQePdosConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments.");
    let config = partial.merge_with_cli(&args)?;

    println!("Binning projected densities of states...");
    let dos = qe_pdos(&config, &args.output)?;

    println!(
        "✓ {} projection group(s) binned into {} energy bins.",
        config.projections.len(),
        dos.energies.len()
    );
    println!(
        "  Spin channels written to: {0}_alp.txt and {0}_bet.txt",
        args.output.display()
    );
    Ok(())
}

fn run_levels(args: LevelsPdosArgs) -> Result<()> {
    let partial = PartialLevelsPdosConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments.");
    let config = partial.merge_with_cli(&args)?;

    println!("Binning atomic-level densities of states...");
    let dos = levels_pdos(&config, &args.output)?;

    println!(
        "✓ Fermi level placed at {:.3} eV; table written to: {}",
        dos.fermi,
        args.output.display()
    );
    Ok(())
}
