pub mod distribution_tsv;
pub mod summary_tsv;
pub mod yield_tsv;
