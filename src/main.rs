extern crate env_logger;
#[macro_use]
extern crate log;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

mod alphabet;
mod cli;
mod dataset;
mod error;
mod generate;
mod motif;
mod preset;
mod report;
mod synth;

use alphabet::{WeightedAlphabet, Weights};
use cli::{Cli, Commands, GenerateArgs};
use dataset::{Dataset, DatasetSink};
use error::{SimError, SimResult};
use generate::GenerationSummary;
use report::RunReport;

struct Generated {
    dataset: Dataset,
    weights: Weights,
    summary: GenerationSummary,
    /// Outcome of closing the dataset file, reported once the dataset has been analysed.
    closed: SimResult<()>,
}

/// Builds the alphabet, opens the dataset file and runs the generation workers.
///
/// Configuration is fully checked before the dataset file is touched.
fn generate_dataset(args: &GenerateArgs) -> Result<Generated> {
    let weights = args.resolved_weights();
    if weights.is_all_zero() {
        return Err(SimError::invalid("all base weights are zero").into());
    }
    let opts = args.opts();
    opts.validate()?;

    let alphabet = WeightedAlphabet::new(weights)?;
    debug!("Built a base pool of {} entries", alphabet.len());

    let sink = DatasetSink::create(Path::new(&args.output))?;
    let summary = generate::generate(&opts, &alphabet, &sink)?;
    info!("Wrote {} sequences to {}", summary.persisted, args.output);

    let (dataset, closed) = close_sink(sink);
    Ok(Generated {
        dataset,
        weights,
        summary,
        closed,
    })
}

/// Closes the sink once every worker has joined. A close failure is logged here and handed back
/// so that analysis can still run on the in-memory dataset.
fn close_sink<W: Write>(sink: DatasetSink<W>) -> (Dataset, SimResult<()>) {
    let closed = sink.close();
    if let Err(e) = &closed {
        error!("{e}");
    }
    (sink.into_dataset(), closed)
}

/// Reports the most frequent motif, writes the JSON report if asked to, and only then surfaces
/// any error from closing the dataset file.
fn finish_run(
    dataset: &Dataset,
    report: &mut RunReport,
    report_path: Option<&str>,
    closed: SimResult<()>,
) -> Result<()> {
    analyse(dataset, report)?;

    if let Some(path) = report_path {
        report.write_json(path)?;
    }

    closed.context("Dataset file was not closed cleanly")
}

fn analyse(dataset: &Dataset, report: &mut RunReport) -> Result<()> {
    report.sequences_analysed = dataset.len();
    if dataset.is_empty() {
        warn!("The dataset holds no sequences");
    }
    report.most_frequent = motif::find_most_frequent(dataset, report.motif_size)?;
    report.print();
    Ok(())
}

fn try_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = Cli::parse();

    info!("basesim v{}", cli::VERSION);

    match &cli.command {
        Commands::Run {
            generation,
            motif_size,
            report: report_path,
        } => {
            if *motif_size == 0 {
                return Err(SimError::invalid("the motif size must be positive").into());
            }

            let generated = generate_dataset(generation)?;

            let mut report = RunReport::new(&generation.output, *motif_size);
            report.weights = Some(generated.weights);
            report.generation = Some(generated.summary);

            finish_run(
                &generated.dataset,
                &mut report,
                report_path.as_deref(),
                generated.closed,
            )?;
            info!("Completed successfully.")
        }
        Commands::Generate { generation } => {
            generate_dataset(generation)?
                .closed
                .context("Dataset file was not closed cleanly")?;
            info!("Completed successfully.")
        }
        Commands::Analyse {
            dataset: input,
            motif_size,
            report: report_path,
        } => {
            if *motif_size == 0 {
                return Err(SimError::invalid("the motif size must be positive").into());
            }

            info!("Reading dataset from {input}");
            let sequences = Dataset::from_path(Path::new(input))?;
            info!(
                "Loaded {} sequences ({} bases)",
                sequences.len(),
                sequences.total_bases()
            );

            let mut report = RunReport::new(input, *motif_size);
            finish_run(&sequences, &mut report, report_path.as_deref(), Ok(()))?;
            info!("Completed successfully.")
        }
    };
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        std::process::exit(1);
    }
}
