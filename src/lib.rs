//! Topic discovery by divergence-objective non-negative matrix factorization.
//!
//! [`algo::nmf`] holds the engine: a word × document count matrix X is
//! factorized as X ≈ W·H with multiplicative updates. The remaining modules
//! load the sparse document format, map rows of W back to vocabulary terms,
//! and write the resulting tables.

pub mod algo;
pub mod config;
pub mod error;
pub mod ops;

pub use algo::nmf::{train, CountMatrix, DivergenceNmf, Factorization, NmfOptions, UpdateSchedule};
pub use config::TrainConfig;
pub use error::{NmfError, Result};
