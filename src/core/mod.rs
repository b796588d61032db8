pub mod decode;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod fastq;
pub mod io;
pub mod metrics;
pub mod model;
pub mod table;

pub use engine::{EngineConfig, RunOutput, RunStats};
pub use error::{Error, Result};
pub use model::{FeatureRecord, FileContext, Flag};
pub use table::FeatureTable;
