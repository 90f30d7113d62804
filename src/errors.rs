use std::path::PathBuf;

/// Error type that can be returned by fallible operations in this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error reading a CSV report; could wrap IO or parsing errors
    #[error("Error processing CSV: {0}")]
    Load(#[from] csv::Error),
    /// A report or the preferences file could not be opened, read or written
    #[error("Unable to access {}: {source}", path.display())]
    Io {
        /// Location of the file
        path: PathBuf,
        /// Underlying IO failure
        source: std::io::Error,
    },
    /// The preferences file exists but does not hold a valid [`Preferences`](crate::types::Preferences)
    /// record. This is never replaced by defaults inside the store; the caller decides what to do.
    #[error("Preferences file {} is malformed: {source}", path.display())]
    MalformedPersistedState {
        /// Location of the preferences file
        path: PathBuf,
        /// Parse failure
        source: serde_json::Error,
    },
    /// Error serializing JSON output
    #[error("Error encoding JSON: {0}")]
    Encode(#[source] serde_json::Error),
    /// Text that is not a `YYYY-MM` month key
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonthKey(String),
    /// Text that is not one of the supported [`ChartType`](crate::types::ChartType)s
    #[error("Invalid chart type '{0}', expected one of bar, line, pie")]
    InvalidChartType(String),
}
