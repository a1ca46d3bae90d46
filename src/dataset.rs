use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader, LineWriter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{SimError, SimResult};

/// A single generated sequence, stored as ASCII bases.
pub type Sequence = Vec<u8>;

/// An ordered, read-only collection of sequences, ready for motif analysis.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Dataset {
    sequences: Vec<Sequence>,
}

impl Dataset {
    pub fn from_sequences(sequences: Vec<Sequence>) -> Self {
        Dataset { sequences }
    }

    /// Loads a newline-delimited dataset file, as written by [`DatasetSink`]. Empty lines are
    /// skipped and a trailing `\r` is removed from each line.
    pub fn from_path(path: &Path) -> SimResult<Self> {
        let file = File::open(path).map_err(|e| {
            SimError::persistence(format!("open dataset file {}", path.display()), e)
        })?;

        let mut sequences = Vec::new();
        for (i, line) in BufReader::new(file).split(b'\n').enumerate() {
            let mut line = line.map_err(|e| {
                SimError::persistence(format!("read line {} of {}", i + 1, path.display()), e)
            })?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                sequences.push(line);
            }
        }

        Ok(Dataset { sequences })
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Total number of bases over every sequence.
    pub fn total_bases(&self) -> usize {
        self.sequences.iter().map(|s| s.len()).sum()
    }
}

struct SinkState<W> {
    sequences: Vec<Sequence>,
    /// `None` once the sink has been closed.
    writer: Option<W>,
    /// Set when a write stopped partway through a line.
    failed: bool,
}

/// Thread-safe, append-only destination for generated sequences.
///
/// Every append writes the sequence as one line to the underlying writer and then records it in
/// memory, both while holding the same lock. A sequence is only kept in memory if its whole line
/// was written, so the complete lines of the store and the in-memory dataset always agree.
///
/// A write that fails before any byte of the line was accepted only loses that sequence. A write
/// that fails partway through a line leaves the store without a line boundary; the sink then
/// refuses every further append with `SinkFailed`, and `close` reports it.
pub struct DatasetSink<W: Write> {
    state: Mutex<SinkState<W>>,
}

impl DatasetSink<LineWriter<File>> {
    /// Creates (or truncates) the file at `path` and opens a sink over it. Each appended line is
    /// handed to the OS before the append returns.
    pub fn create(path: &Path) -> SimResult<Self> {
        let file = File::create(path).map_err(|e| {
            SimError::persistence(format!("create dataset file {}", path.display()), e)
        })?;
        Ok(DatasetSink::new(LineWriter::new(file)))
    }
}

/// Writes all of `line`, returning the number of bytes accepted along with any error.
fn write_line<W: Write>(writer: &mut W, line: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while written < line.len() {
        match writer.write(&line[written..]) {
            Ok(0) => {
                return (
                    written,
                    Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write whole line")),
                )
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}

impl<W: Write> DatasetSink<W> {
    pub fn new(writer: W) -> Self {
        DatasetSink {
            state: Mutex::new(SinkState {
                sequences: Vec::new(),
                writer: Some(writer),
                failed: false,
            }),
        }
    }

    // a panicking worker never leaves the state half-updated, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, SinkState<W>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends `seq` to the persistent store and the in-memory dataset as one operation.
    ///
    /// # Errors
    ///
    /// * `SinkClosed` if [`DatasetSink::close`] has already been called.
    /// * `SinkFailed` if an earlier append left a partial line in the store.
    /// * `PersistenceFailure` if the line could not be written. The sequence is then not added
    ///   to the in-memory dataset either.
    pub fn append(&self, seq: Sequence) -> SimResult<()> {
        let mut line = Vec::with_capacity(seq.len() + 1);
        line.extend_from_slice(&seq);
        line.push(b'\n');

        let mut state = self.lock();
        if state.failed {
            return Err(SimError::SinkFailed);
        }
        let writer = state.writer.as_mut().ok_or(SimError::SinkClosed)?;

        if let (written, Err(e)) = write_line(writer, &line) {
            if written > 0 {
                state.failed = true;
            }
            return Err(SimError::persistence("append sequence to dataset file", e));
        }

        state.sequences.push(seq);
        Ok(())
    }

    /// Flushes and closes the persistent store. Appends after this call fail.
    ///
    /// # Errors
    ///
    /// * `SinkClosed` if the sink was already closed.
    /// * `PersistenceFailure` if the final flush fails.
    /// * `SinkFailed` if an append left a partial line in the store.
    pub fn close(&self) -> SimResult<()> {
        let (mut writer, failed) = {
            let mut state = self.lock();
            let writer = state.writer.take().ok_or(SimError::SinkClosed)?;
            (writer, state.failed)
        };
        writer
            .flush()
            .map_err(|e| SimError::persistence("flush dataset file", e))?;
        if failed {
            return Err(SimError::SinkFailed);
        }
        Ok(())
    }

    /// Number of sequences appended so far.
    pub fn len(&self) -> usize {
        self.lock().sequences.len()
    }

    /// Consumes the sink, freezing the collected sequences into a [`Dataset`].
    pub fn into_dataset(self) -> Dataset {
        let state = self.state.into_inner().unwrap_or_else(|e| e.into_inner());
        Dataset::from_sequences(state.sequences)
    }

    #[cfg(test)]
    pub(crate) fn into_parts(self) -> (Vec<Sequence>, Option<W>) {
        let state = self.state.into_inner().unwrap_or_else(|e| e.into_inner());
        (state.sequences, state.writer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writer that fails every `fail_every`-th write call and records the rest.
    pub(crate) struct FlakyWriter {
        pub calls: usize,
        pub fail_every: usize,
        pub fail_flush: bool,
        pub written: Vec<u8>,
    }

    impl FlakyWriter {
        pub fn new(fail_every: usize) -> Self {
            FlakyWriter {
                calls: 0,
                fail_every,
                fail_flush: false,
                written: Vec::new(),
            }
        }
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.fail_every > 0 && self.calls % self.fail_every == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.fail_flush {
                return Err(io::Error::new(io::ErrorKind::Other, "flush failed"));
            }
            Ok(())
        }
    }

    #[test]
    fn append_writes_line_and_memory() {
        let sink = DatasetSink::new(Vec::<u8>::new());
        sink.append(b"ACGT".to_vec()).unwrap();
        sink.append(b"TTAA".to_vec()).unwrap();
        assert_eq!(sink.len(), 2);

        let state = sink.state.into_inner().unwrap();
        assert_eq!(state.writer.unwrap(), b"ACGT\nTTAA\n".to_vec());
        assert_eq!(state.sequences, vec![b"ACGT".to_vec(), b"TTAA".to_vec()]);
    }

    #[test]
    fn append_after_close_fails() {
        let sink = DatasetSink::new(Vec::<u8>::new());
        sink.append(b"AC".to_vec()).unwrap();
        sink.close().unwrap();

        assert!(matches!(sink.append(b"GG".to_vec()), Err(SimError::SinkClosed)));
        assert!(matches!(sink.close(), Err(SimError::SinkClosed)));
        assert_eq!(sink.into_dataset().len(), 1);
    }

    #[test]
    fn failed_write_is_not_kept_in_memory() {
        let sink = DatasetSink::new(FlakyWriter::new(2));
        assert!(sink.append(b"AAAA".to_vec()).is_ok());
        assert!(matches!(
            sink.append(b"CCCC".to_vec()),
            Err(SimError::PersistenceFailure { .. })
        ));
        assert!(sink.append(b"GGGG".to_vec()).is_ok());

        let state = sink.state.into_inner().unwrap();
        assert_eq!(state.sequences, vec![b"AAAA".to_vec(), b"GGGG".to_vec()]);
        assert_eq!(state.writer.unwrap().written, b"AAAA\nGGGG\n".to_vec());
    }

    /// Writer that accepts `budget` bytes in total, then fails.
    struct ShortWriter {
        budget: usize,
        written: Vec<u8>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn partial_line_stops_further_appends() {
        // room for "AAAA\n" and two bytes of the next line
        let sink = DatasetSink::new(ShortWriter {
            budget: 7,
            written: Vec::new(),
        });
        assert!(sink.append(b"AAAA".to_vec()).is_ok());
        assert!(matches!(
            sink.append(b"CCCC".to_vec()),
            Err(SimError::PersistenceFailure { .. })
        ));
        assert!(matches!(sink.append(b"GGGG".to_vec()), Err(SimError::SinkFailed)));

        let (memory, writer) = sink.into_parts();
        let written = writer.unwrap().written;
        assert_eq!(written, b"AAAA\nCC".to_vec());

        let complete_lines: Vec<Vec<u8>> = written
            .split_inclusive(|b| *b == b'\n')
            .filter(|l| l.ends_with(b"\n"))
            .map(|l| l[..l.len() - 1].to_vec())
            .collect();
        assert_eq!(complete_lines, memory);
    }

    #[test]
    fn close_reports_partial_line() {
        let sink = DatasetSink::new(ShortWriter {
            budget: 2,
            written: Vec::new(),
        });
        assert!(sink.append(b"TTTT".to_vec()).is_err());
        assert!(matches!(sink.close(), Err(SimError::SinkFailed)));
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn interrupted_writes_are_retried() {
        struct Interrupting {
            interrupted: bool,
            written: Vec<u8>,
        }

        impl Write for Interrupting {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
                }
                // one byte at a time
                self.written.push(buf[0]);
                Ok(1)
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = DatasetSink::new(Interrupting {
            interrupted: false,
            written: Vec::new(),
        });
        sink.append(b"ACGT".to_vec()).unwrap();

        let (memory, writer) = sink.into_parts();
        assert_eq!(memory, vec![b"ACGT".to_vec()]);
        assert_eq!(writer.unwrap().written, b"ACGT\n".to_vec());
    }

    #[test]
    fn close_reports_flush_failure() {
        let mut writer = FlakyWriter::new(0);
        writer.fail_flush = true;
        let sink = DatasetSink::new(writer);
        assert!(matches!(
            sink.close(),
            Err(SimError::PersistenceFailure { .. })
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.txt");
        std::fs::write(&path, "stale contents\n").unwrap();

        let sink = DatasetSink::create(&path).unwrap();
        sink.append(b"ACGTAC".to_vec()).unwrap();
        sink.append(b"GGTTCA".to_vec()).unwrap();
        sink.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ACGTAC\nGGTTCA\n");
        assert_eq!(Dataset::from_path(&path).unwrap(), sink.into_dataset());
    }

    #[test]
    fn load_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.txt");
        std::fs::write(&path, "ACGT\r\n\nACAC\n\n").unwrap();

        let dataset = Dataset::from_path(&path).unwrap();
        assert_eq!(dataset.sequences(), &[b"ACGT".to_vec(), b"ACAC".to_vec()]);
        assert_eq!(dataset.total_bases(), 8);
    }

    #[test]
    fn missing_file_is_persistence_failure() {
        let err = Dataset::from_path(Path::new("does/not/exist.txt")).unwrap_err();
        assert!(matches!(err, SimError::PersistenceFailure { .. }));
    }
}
