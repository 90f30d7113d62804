#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
/// Error handling and custom [`Error`](std::error::Error) types
pub mod errors;
/// Functions for reading reports and writing results
pub mod io;
/// Aggregation of transactions into monthly and per-category results
pub mod ops;
/// Persistence of view preferences across sessions
pub mod prefs;
/// Data types used throughout Spendview
pub mod types;

pub use errors::Error;
pub use ops::{analyze, analyze_on};
pub use prefs::PreferenceStore;
