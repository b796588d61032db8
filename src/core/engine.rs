use crate::core::decode;
use crate::core::discovery;
use crate::core::error::{Error, Result};
use crate::core::fastq::{RawRecord, RecordReader};
use crate::core::io::{self, InputKind, MmapSource, RecordChunker};
use crate::core::model::FileContext;
use crate::core::table::FeatureTable;
use crossbeam_channel as channel;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Records decoded between two looks at the cancellation flag.
const CANCEL_CHECK_INTERVAL: usize = 4096;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub input: PathBuf,
    pub threads: usize,
    pub decompress_threads: usize,
    /// Split plain files larger than this many bytes into record-aligned
    /// ranges. `None` keeps one task per file.
    pub chunk_size: Option<usize>,
}

impl EngineConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            threads: num_cpus::get(),
            decompress_threads: 1,
            chunk_size: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunStats {
    pub files: usize,
    pub tasks: usize,
    pub workers: usize,
    pub records: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct RunOutput {
    pub table: FeatureTable,
    pub stats: RunStats,
}

enum TaskInput {
    File,
    Range {
        source: Arc<MmapSource>,
        start: usize,
        end: usize,
        lines_before: u64,
        last: bool,
    },
}

struct Task {
    index: usize,
    ctx: FileContext,
    input: TaskInput,
}

/// Discovers the input files under `cfg.input` and dispatches them.
pub fn run(cfg: &EngineConfig) -> Result<RunOutput> {
    let files = discovery::discover(&cfg.input)?;
    tracing::info!(root = %cfg.input.display(), files = files.len(), "parsing fastq files");
    dispatch(&files, cfg)
}

/// Parses every file on a pool of worker threads and merges the per-task
/// fragments once all of them are in. Tasks are planned while the workers
/// already run. The first failing task cancels the rest; the workers are
/// joined before the error is returned.
pub fn dispatch(files: &[PathBuf], cfg: &EngineConfig) -> Result<RunOutput> {
    let t0 = Instant::now();
    let threads = if cfg.chunk_size.is_some() {
        cfg.threads.max(1)
    } else {
        cfg.threads.max(1).min(files.len().max(1))
    };

    let (task_tx, task_rx) = channel::unbounded::<Task>();
    let (result_tx, result_rx) = channel::unbounded::<(usize, FeatureTable)>();
    let (err_tx, err_rx) = channel::bounded::<Error>(1);
    let cancel = Arc::new(AtomicBool::new(false));

    let mut workers = Vec::with_capacity(threads);
    for id in 0..threads {
        let rx = task_rx.clone();
        let tx = result_tx.clone();
        let err = err_tx.clone();
        let worker_cancel = Arc::clone(&cancel);
        let decompress_threads = cfg.decompress_threads;
        let handle = thread::Builder::new()
            .name(format!("nanoqc-worker-{id}"))
            .spawn(move || {
                for task in rx.iter() {
                    if worker_cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let t_task = Instant::now();
                    match run_task(&task, decompress_threads, &worker_cancel) {
                        Ok(Some(fragment)) => {
                            tracing::debug!(
                                file = %task.ctx.path.display(),
                                task = task.index,
                                records = fragment.len(),
                                elapsed_ms = t_task.elapsed().as_millis() as u64,
                                "task done"
                            );
                            if tx.send((task.index, fragment)).is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            worker_cancel.store(true, Ordering::Relaxed);
                            let _ = err.try_send(Error::worker(task.ctx.path.to_path_buf(), e));
                            break;
                        }
                    }
                }
            });
        match handle {
            Ok(h) => workers.push(h),
            Err(e) => {
                cancel.store(true, Ordering::Relaxed);
                drop(task_tx);
                join_all(workers);
                return Err(io::io_error(&cfg.input, e));
            }
        }
    }
    drop(task_rx);
    drop(result_tx);
    drop(err_tx);

    let planned = feed_tasks(files, cfg, &task_tx, &cancel);
    drop(task_tx);
    let total = match planned {
        Ok(total) => total,
        Err(e) => {
            cancel.store(true, Ordering::Relaxed);
            join_all(workers);
            return Err(e);
        }
    };

    let mut parts: Vec<Option<FeatureTable>> = (0..total).map(|_| None).collect();
    let mut received = 0usize;
    let mut failure: Option<Error> = None;
    let mut err_open = true;
    while received < total {
        if err_open {
            channel::select! {
                recv(err_rx) -> err => match err {
                    Ok(err) => {
                        failure = Some(err);
                        break;
                    }
                    Err(_) => err_open = false,
                },
                recv(result_rx) -> msg => match msg {
                    Ok((index, fragment)) => {
                        parts[index] = Some(fragment);
                        received += 1;
                    }
                    Err(_) => break,
                },
            }
        } else {
            match result_rx.recv() {
                Ok((index, fragment)) => {
                    parts[index] = Some(fragment);
                    received += 1;
                }
                Err(_) => break,
            }
        }
    }

    if failure.is_some() || received < total {
        cancel.store(true, Ordering::Relaxed);
    }
    let panicked = join_all(workers);
    if failure.is_none() {
        // a worker may have failed after the loop stopped listening
        failure = err_rx.try_recv().ok();
    }
    if let Some(err) = failure {
        tracing::error!(error = %err, "run aborted");
        return Err(err);
    }
    if panicked || received < total {
        return Err(Error::WorkerPanic);
    }

    let t_merge = Instant::now();
    let mut table = FeatureTable::with_capacity(parts.iter().flatten().map(|p| p.len()).sum());
    for part in parts.into_iter().flatten() {
        table.merge(part)?;
    }
    tracing::debug!(
        elapsed_ms = t_merge.elapsed().as_millis() as u64,
        "fragments merged"
    );

    let stats = RunStats {
        files: files.len(),
        tasks: total,
        workers: threads,
        records: table.len(),
        elapsed: t0.elapsed(),
    };
    tracing::info!(
        files = stats.files,
        tasks = stats.tasks,
        workers = stats.workers,
        records = stats.records,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "ingestion finished"
    );
    Ok(RunOutput { table, stats })
}

/// Returns true if any worker panicked.
fn join_all(workers: Vec<thread::JoinHandle<()>>) -> bool {
    let mut panicked = false;
    for worker in workers {
        panicked |= worker.join().is_err();
    }
    panicked
}

/// Sends one task per file, or one per record-aligned range of a split
/// file, in discovery order. Returns the number of tasks sent; stops early
/// once the run is cancelled.
fn feed_tasks(
    files: &[PathBuf],
    cfg: &EngineConfig,
    tx: &channel::Sender<Task>,
    cancel: &AtomicBool,
) -> Result<usize> {
    let mut sent = 0usize;
    for path in files {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let ctx = FileContext::from_path(path);
        let Some(chunk_size) = split_size(path, cfg.chunk_size)? else {
            let task = Task {
                index: sent,
                ctx,
                input: TaskInput::File,
            };
            if tx.send(task).is_err() {
                break;
            }
            sent += 1;
            continue;
        };
        let source = Arc::new(MmapSource::open(path)?);
        let before = sent;
        for chunk in RecordChunker::new(Arc::clone(&source), chunk_size) {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let task = Task {
                index: sent,
                ctx: ctx.clone(),
                input: TaskInput::Range {
                    source: Arc::clone(&source),
                    start: chunk.start,
                    end: chunk.end,
                    lines_before: chunk.lines_before,
                    last: chunk.last,
                },
            };
            if tx.send(task).is_err() {
                return Ok(sent);
            }
            sent += 1;
        }
        tracing::debug!(
            file = %path.display(),
            chunks = sent - before,
            "split into record-aligned chunks"
        );
    }
    Ok(sent)
}

/// Chunk size to use for `path`, if it is a plain file above the threshold.
fn split_size(path: &Path, chunk_size: Option<usize>) -> Result<Option<usize>> {
    let Some(size) = chunk_size else {
        return Ok(None);
    };
    let len = std::fs::metadata(path)
        .map_err(|e| io::io_error(path, e))?
        .len();
    if len > size as u64 && io::detect_input_kind(path)? == InputKind::Plain {
        Ok(Some(size))
    } else {
        Ok(None)
    }
}

/// `Ok(None)` when cancelled.
fn run_task(
    task: &Task,
    decompress_threads: usize,
    cancel: &AtomicBool,
) -> Result<Option<FeatureTable>> {
    match &task.input {
        TaskInput::File => {
            let mut reader = RecordReader::open(&task.ctx.path, decompress_threads)?;
            decode_stream(&mut reader, &task.ctx, cancel)
        }
        TaskInput::Range {
            source,
            start,
            end,
            lines_before,
            last,
        } => {
            let bytes = &source.bytes()[*start..*end];
            let mut reader =
                RecordReader::new(bytes, task.ctx.path.to_path_buf()).lines_before(*lines_before);
            let fragment = decode_stream(&mut reader, &task.ctx, cancel)?;
            // past a blank line only whitespace may follow, up to the end of the file
            if !*last && reader.blank_line().is_some() {
                let rest = &source.bytes()[*end..];
                if let Some(offset) = rest.iter().position(|b| !b.is_ascii_whitespace()) {
                    let skipped = memchr::memchr_iter(b'\n', bytes).count()
                        + memchr::memchr_iter(b'\n', &rest[..offset]).count();
                    return Err(Error::TrailingData {
                        path: task.ctx.path.to_path_buf(),
                        line: *lines_before + skipped as u64 + 1,
                    });
                }
            }
            Ok(fragment)
        }
    }
}

/// Decodes one stream into a fresh fragment.
pub fn decode_stream<R: BufRead>(
    reader: &mut RecordReader<R>,
    ctx: &FileContext,
    cancel: &AtomicBool,
) -> Result<Option<FeatureTable>> {
    let mut fragment = FeatureTable::new();
    let mut batch = Vec::with_capacity(CANCEL_CHECK_INTERVAL);
    let mut raw = RawRecord::default();
    while reader.read_next(&mut raw)? {
        batch.push(decode::decode(&raw, ctx)?);
        if batch.len() == CANCEL_CHECK_INTERVAL {
            if cancel.load(Ordering::Relaxed) {
                return Ok(None);
            }
            fragment.insert_many(batch.drain(..))?;
        }
    }
    fragment.insert_many(batch)?;
    Ok(Some(fragment))
}
