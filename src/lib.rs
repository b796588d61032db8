//! Parallel ingestion of nanopore FASTQ runs into a table of per-read
//! features (length, mean quality, GC%, acquisition time, pass/fail).
//!
//! ```no_run
//! use nanoqc::core::{EngineConfig, engine};
//!
//! let out = engine::run(&EngineConfig::new("/data/run42/fastq"))?;
//! println!("{} reads", out.table.len());
//! # Ok::<(), nanoqc::core::Error>(())
//! ```

pub mod core;
mod simd;
