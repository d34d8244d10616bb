//! Chart-data engine for tokenizer-evaluation result bundles.
//!
//! Imports a metadata + results bundle into labelled metric arrays, resolves
//! tokenizer / language labels to cells, and turns user figure configurations
//! into renderer-agnostic chart data.

pub mod chart;
pub mod color;
pub mod data;
pub mod error;
pub mod figure;
pub mod state;

pub use chart::{ChartData, ChartKind};
pub use data::model::{Dataset, LabelUniverse, LabeledArray, Rank};
pub use error::DataError;
pub use figure::FigureConfig;
pub use state::Session;
