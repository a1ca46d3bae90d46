use std::io::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::alphabet::WeightedAlphabet;
use crate::dataset::DatasetSink;
use crate::error::{SimError, SimResult};
use crate::synth::synthesize;

/// Number of generation workers used when none is specified.
pub const DEFAULT_WORKERS: usize = 10;
/// Inclusive bounds of the per-run sequence length.
pub const DEFAULT_MIN_LEN: usize = 5;
pub const DEFAULT_MAX_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct GenerateOpts {
    /// Total number of sequences requested. Only `workers * (sequences / workers)` are produced.
    pub sequences: usize,
    pub workers: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub seed: Option<u64>,
}

impl Default for GenerateOpts {
    fn default() -> Self {
        GenerateOpts {
            sequences: 0,
            workers: DEFAULT_WORKERS,
            min_len: DEFAULT_MIN_LEN,
            max_len: DEFAULT_MAX_LEN,
            seed: None,
        }
    }
}

impl GenerateOpts {
    pub fn validate(&self) -> SimResult<()> {
        if self.sequences == 0 {
            return Err(SimError::invalid("the sequence count must be positive"));
        }
        if self.workers == 0 {
            return Err(SimError::invalid("at least one worker is required"));
        }
        if self.min_len == 0 {
            return Err(SimError::invalid("the minimum sequence length must be positive"));
        }
        if self.min_len > self.max_len {
            return Err(SimError::invalid(format!(
                "minimum sequence length {} exceeds maximum {}",
                self.min_len, self.max_len
            )));
        }
        Ok(())
    }

    /// Sequences generated by each worker. The remainder of the division is dropped.
    pub fn per_worker(&self) -> usize {
        self.sequences / self.workers
    }
}

/// Outcome of a generation run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub requested: usize,
    pub workers: usize,
    pub per_worker: usize,
    /// Sequences lost to the truncating split across workers.
    pub dropped: usize,
    pub sequence_length: usize,
    /// Sequences synthesised by workers that completed.
    pub generated: usize,
    /// Sequences present in both the dataset file and the in-memory dataset.
    pub persisted: usize,
    pub failed_writes: usize,
    pub failed_workers: usize,
}

#[derive(Default, Debug)]
struct WorkerReport {
    generated: usize,
    failed_writes: usize,
}

/// Generates `opts.sequences` sequences across `opts.workers` threads, appending each one to
/// `sink` as soon as it is produced. Blocks until every worker has finished.
///
/// All sequences of a run share one length, drawn uniformly from `[min_len, max_len]` before the
/// workers start. Each worker owns an independently seeded generator. When `opts.seed` is set the
/// whole run is reproducible, although the order of lines across workers is not.
///
/// Individual write failures and worker panics are logged and counted in the returned summary;
/// they never abort sibling workers.
///
/// # Errors
///
/// Returns `InvalidConfiguration` before any worker starts if `opts` is invalid or `alphabet` is
/// empty.
pub fn generate<W: Write + Send>(
    opts: &GenerateOpts,
    alphabet: &WeightedAlphabet,
    sink: &DatasetSink<W>,
) -> SimResult<GenerationSummary> {
    opts.validate()?;
    if alphabet.is_empty() {
        return Err(SimError::invalid("all base weights are zero"));
    }

    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let sequence_length = rng.random_range(opts.min_len..=opts.max_len);
    let worker_seeds: Vec<u64> = (0..opts.workers).map(|_| rng.random()).collect();

    let per_worker = opts.per_worker();
    let dropped = opts.sequences - per_worker * opts.workers;
    if dropped > 0 {
        warn!(
            "{} sequences do not divide evenly across {} workers, dropping the remaining {}",
            opts.sequences, opts.workers, dropped
        );
    }

    info!(
        "Generating {} sequences of length {} with {} workers",
        per_worker * opts.workers,
        sequence_length,
        opts.workers
    );

    let mut summary = GenerationSummary {
        requested: opts.sequences,
        workers: opts.workers,
        per_worker,
        dropped,
        sequence_length,
        generated: 0,
        persisted: 0,
        failed_writes: 0,
        failed_workers: 0,
    };

    let outcomes = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = worker_seeds
            .into_iter()
            .enumerate()
            .map(|(worker, seed)| {
                let handle = scope
                    .builder()
                    .name(format!("basesim-{worker}"))
                    .spawn(move |_| {
                        run_worker(worker, per_worker, sequence_length, alphabet, sink, seed)
                    });
                (worker, handle)
            })
            .collect();

        // join barrier: every worker is waited on, whatever happened to the others
        handles
            .into_iter()
            .map(|(worker, handle)| match handle {
                Ok(handle) => handle.join().map_err(|panic| SimError::ConcurrencyFailure {
                    worker,
                    reason: panic_message(panic.as_ref()),
                }),
                Err(e) => Err(SimError::ConcurrencyFailure {
                    worker,
                    reason: format!("thread could not be spawned: {e}"),
                }),
            })
            .collect::<Vec<_>>()
    })
    .map_err(|panic| SimError::ConcurrencyFailure {
        worker: usize::MAX,
        reason: panic_message(panic.as_ref()),
    })?;

    for outcome in outcomes {
        match outcome {
            Ok(report) => {
                summary.generated += report.generated;
                summary.failed_writes += report.failed_writes;
            }
            Err(e) => {
                warn!("{e}");
                summary.failed_workers += 1;
            }
        }
    }
    summary.persisted = sink.len();

    info!(
        "Generated {} sequences ({} persisted, {} failed writes, {} failed workers)",
        summary.generated, summary.persisted, summary.failed_writes, summary.failed_workers
    );

    Ok(summary)
}

fn run_worker<W: Write>(
    worker: usize,
    count: usize,
    len: usize,
    alphabet: &WeightedAlphabet,
    sink: &DatasetSink<W>,
    seed: u64,
) -> WorkerReport {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut report = WorkerReport::default();

    debug!("Worker {worker} started, generating {count} sequences");

    for _ in 0..count {
        let seq = match synthesize(len, alphabet, &mut rng) {
            Ok(seq) => seq,
            Err(e) => {
                warn!("worker {worker}: {e}");
                break;
            }
        };
        report.generated += 1;

        match sink.append(seq) {
            Ok(()) => {}
            Err(e @ (SimError::SinkClosed | SimError::SinkFailed)) => {
                warn!("worker {worker}: {e}");
                report.failed_writes += 1;
                break;
            }
            Err(e) => {
                warn!("worker {worker}: {e}, sequence discarded");
                report.failed_writes += 1;
            }
        }
    }

    debug!("Worker {worker} finished");
    report
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
