use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Args, Parser, Subcommand};

use crate::alphabet::Weights;
use crate::generate::{GenerateOpts, DEFAULT_MAX_LEN, DEFAULT_MIN_LEN, DEFAULT_WORKERS};
use crate::preset::{get_weights, PresetComposition};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const ABOUT: &str = concat!(
    "basesim ",
    env!("CARGO_PKG_VERSION"),
    ": draws random DNA from weighted A/C/G/T pools, then reports the motif of a given size that \
     occurs most often across the generated (or loaded) sequences"
);

const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().bold().underline())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::Cyan.on_default().bold())
    .placeholder(AnsiColor::Cyan.on_default())
    .error(AnsiColor::Red.on_default().bold());

#[derive(Parser)]
#[command(
    name = "basesim",
    version = VERSION,
    about = ABOUT,
    arg_required_else_help = true,
    styles = HELP_STYLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a dataset and report its most frequent motif
    #[command(arg_required_else_help = true)]
    Run {
        #[command(flatten)]
        generation: GenerateArgs,

        /// the motif size to search for
        #[arg(short = 'k', long)]
        motif_size: usize,

        /// write a JSON report of the run to this file
        #[arg(long)]
        report: Option<String>,
    },

    /// Generate a dataset without analysing it
    #[command(arg_required_else_help = true)]
    Generate {
        #[command(flatten)]
        generation: GenerateArgs,
    },

    /// Report the most frequent motif of an existing dataset file
    #[command(arg_required_else_help = true)]
    Analyse {
        /// the dataset file, one sequence per line
        dataset: String,

        /// the motif size to search for
        #[arg(short = 'k', long)]
        motif_size: usize,

        /// write a JSON report of the analysis to this file
        #[arg(long)]
        report: Option<String>,
    },
}

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// the total number of sequences. this is split evenly across the workers, and any
    /// remainder is dropped
    #[arg(short = 'n', long, verbatim_doc_comment)]
    pub sequences: usize,

    /// relative base weights in the order A,C,G,T. this will override the preset given.
    /// for example, for the `gc-rich` preset:
    ///     1,3,3,1
    #[arg(
        long,
        value_parser = |x: &str| Weights::try_from(x),
        verbatim_doc_comment
    )]
    pub weights: Option<Weights>,

    #[arg(long, value_enum, conflicts_with = "weights", default_value = "uniform")]
    pub preset: PresetComposition,

    /// the output dataset file. any existing file is overwritten
    #[arg(short, long, default_value = "dataset.txt")]
    pub output: String,

    /// the number of generation workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// the minimum sequence length (inclusive)
    #[arg(long, default_value_t = DEFAULT_MIN_LEN)]
    pub min_len: usize,

    /// the maximum sequence length (inclusive)
    #[arg(long, default_value_t = DEFAULT_MAX_LEN)]
    pub max_len: usize,

    /// seed for reproducible datasets
    #[arg(long)]
    pub seed: Option<u64>,
}

impl GenerateArgs {
    /// The explicit weights if given, otherwise those of the preset.
    pub fn resolved_weights(&self) -> Weights {
        match self.weights {
            Some(w) => {
                info!("Using specified base weights: {w}");
                w
            }
            None => {
                let w = get_weights(&self.preset);
                info!("Using preset base weights {w}");
                w
            }
        }
    }

    pub fn opts(&self) -> GenerateOpts {
        GenerateOpts {
            sequences: self.sequences,
            workers: self.workers,
            min_len: self.min_len,
            max_len: self.max_len,
            seed: self.seed,
        }
    }
}

/// Error type for parsing a weights string.
#[derive(Debug)]
pub struct ParseWeightsErr(String);

impl std::fmt::Display for ParseWeightsErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid weights format: {}", self.0)
    }
}

impl std::error::Error for ParseWeightsErr {}

impl<'a> TryFrom<&'a str> for Weights {
    type Error = ParseWeightsErr;

    fn try_from(arg: &'a str) -> Result<Weights, Self::Error> {
        let parts: Vec<&str> = arg.split(',').map(str::trim).collect();

        if parts.len() != 4 {
            return Err(ParseWeightsErr(indoc::formatdoc! {"
            Expected format '<A>,<C>,<G>,<T>', got '{arg}'. The expected format is \
            four non-negative integers, as in:
              --weights 1,1,1,1
              --weights 1,3,3,1
              --weights 0,5,0,2
            "}));
        }

        let mut values = [0u32; 4];
        for (i, (part, base)) in parts.iter().zip(["A", "C", "G", "T"]).enumerate() {
            values[i] = part.parse::<u32>().map_err(|_| {
                ParseWeightsErr(format!(
                    "Invalid weight for {base}: '{part}' (should be a non-negative integer)"
                ))
            })?;
        }

        let [a, c, g, t] = values;
        Ok(Weights::new(a, c, g, t))
    }
}
