use crate::cli::args::{Cli, Commands, RunArgs};
use crate::report;
use anyhow::{Context, Result, bail};
use clap::Parser;
use nanoqc::core::discovery;
use nanoqc::core::engine::{self, EngineConfig};
use nanoqc::core::metrics::RunSummary;
use std::env;
use std::fs;
use std::time::{Duration, Instant};

const SUMMARY_FILE: &str = "nanoqc_summary.tsv";
const YIELD_FILE: &str = "nanoqc_yield.tsv";
const QUALITY_FILE: &str = "nanoqc_quality_by_hour.tsv";
const HISTOGRAM_FILE: &str = "nanoqc_histograms.tsv";

pub fn entry() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let stats = stats_enabled();
    let t0 = Instant::now();

    stage(stats, "preflight", || {
        if !args.input.exists() {
            bail!("input not found: {}", args.input.display());
        }
        if args.threads == 0 {
            bail!("--threads must be >= 1");
        }
        if args.decompress_threads == 0 {
            bail!("--decompress-threads must be >= 1");
        }
        if args.chunk_mb == Some(0) {
            bail!("--chunk-mb must be >= 1");
        }
        Ok(())
    })?;

    let t_out = Instant::now();
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create output dir {}", args.out.display()))?;
    stage_done(stats, "mkdir", t_out);

    let t_scan = Instant::now();
    let files = discovery::discover(&args.input)
        .with_context(|| format!("failed to collect input from {}", args.input.display()))?;
    stage_done(stats, "discover", t_scan);
    tracing::info!(files = files.len(), "parsing fastq files");

    let config = EngineConfig {
        input: args.input.clone(),
        threads: args.threads,
        decompress_threads: args.decompress_threads,
        chunk_size: args.chunk_mb.map(|mb| mb * 1024 * 1024),
    };

    let t_engine = Instant::now();
    let output = engine::dispatch(&files, &config).context("ingestion failed")?;
    stage_done(stats, "engine", t_engine);
    if output.table.is_empty() {
        bail!("no reads found in {} file(s)", files.len());
    }
    if stats {
        tracing::info!(
            "NANOQC_STATS files={} tasks={} workers={} reads={}",
            output.stats.files,
            output.stats.tasks,
            output.stats.workers,
            output.stats.records
        );
    }

    let t_summary = Instant::now();
    let summary = RunSummary::from_table(&output.table);
    let summary_path = args.out.join(SUMMARY_FILE);
    report::summary_tsv::write(&summary_path, &summary)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    let yield_path = args.out.join(YIELD_FILE);
    report::yield_tsv::write(&yield_path, &output.table)
        .with_context(|| format!("failed to write {}", yield_path.display()))?;
    let quality_path = args.out.join(QUALITY_FILE);
    report::distribution_tsv::write_quality_by_hour(&quality_path, &output.table)
        .with_context(|| format!("failed to write {}", quality_path.display()))?;
    let histogram_path = args.out.join(HISTOGRAM_FILE);
    report::distribution_tsv::write_histograms(&histogram_path, &output.table)
        .with_context(|| format!("failed to write {}", histogram_path.display()))?;
    stage_done(stats, "summary", t_summary);

    for (flag, group) in &summary.by_flag {
        tracing::info!(
            flag = flag.as_str_lower(),
            reads = group.reads,
            bases = group.bases,
            n50 = group.n50(),
            mean_quality = format_args!("{:.2}", group.mean_quality()),
            "reads by flag"
        );
    }
    tracing::info!(
        reads = summary.total.reads,
        samples = summary.by_sample.len(),
        summary = %summary_path.display(),
        "total run time: {}",
        fmt_dur(t0.elapsed())
    );

    Ok(())
}

fn stats_enabled() -> bool {
    matches!(env::var("NANOQC_STATS").as_deref(), Ok("1"))
}

fn stage<F>(stats: bool, name: &str, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let t = Instant::now();
    let res = f();
    if stats {
        tracing::info!("NANOQC_STATS stage={} time={}", name, fmt_dur(t.elapsed()));
    }
    res
}

fn stage_done(stats: bool, name: &str, t: Instant) {
    if stats {
        tracing::info!("NANOQC_STATS stage={} time={}", name, fmt_dur(t.elapsed()));
    }
}

fn fmt_dur(d: Duration) -> String {
    if d.as_secs_f64() < 1.0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}
