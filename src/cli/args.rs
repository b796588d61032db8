use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "nanoqc",
    version,
    about = "Per-read features for nanopore FASTQ runs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Run(RunArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Folder searched recursively for .fastq/.fq(.gz) files, or a single file.
    pub input: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Threads per decompressor for BGZF/Mgzip input.
    #[arg(long, default_value_t = 1)]
    pub decompress_threads: usize,

    /// Split plain files larger than this many MiB across workers.
    #[arg(long)]
    pub chunk_mb: Option<usize>,
}
