use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::alphabet::Weights;
use crate::generate::GenerationSummary;
use crate::motif::MotifHit;

#[derive(Serialize, Debug)]
pub struct RunReport {
    pub basesim_version: String,
    pub run_date: String,
    pub dataset_path: String,
    pub weights: Option<Weights>,
    pub generation: Option<GenerationSummary>,
    pub sequences_analysed: usize,
    pub motif_size: usize,
    /// `None` when no motif was observed at all.
    pub most_frequent: Option<MotifHit>,
}

impl RunReport {
    pub fn new(dataset_path: &str, motif_size: usize) -> Self {
        RunReport {
            basesim_version: crate::cli::VERSION.to_string(),
            run_date: format!("{:?}", chrono::offset::Local::now()),
            dataset_path: dataset_path.to_string(),
            weights: None,
            generation: None,
            sequences_analysed: 0,
            motif_size,
            most_frequent: None,
        }
    }

    /// Prints the result of the analysis to standard output.
    pub fn print(&self) {
        match &self.most_frequent {
            Some(hit) => {
                println!("Motif: {}", hit.motif);
                println!("Motif occurrences: {}", hit.occurrences);
            }
            None => println!("No motif observed (all counts are zero)"),
        }
    }

    /// Writes the report as pretty-printed JSON to `path`.
    pub fn write_json(&self, path: &str) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Unable to create report file {path}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).context("Could not serialize report")?;
        writer
            .flush()
            .with_context(|| format!("Unable to write report file {path}"))?;
        info!("Wrote run report to {path}");
        Ok(())
    }
}
