use crate::store::error::StoreError;
use crate::types::query::DateRangeError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Parameter '{parameter}' must be in range of {min} to {max}. Given: {value}.")]
    InvalidCoordinate {
        parameter: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error(transparent)]
    InvalidDateRange(#[from] DateRangeError),

    #[error("Timezone is required when requesting daily variables")]
    TimezoneRequired,

    #[error("Invalid timezone '{0}'")]
    InvalidTimezone(String),

    #[error("No data is available for this location ({lat}, {lon})")]
    NoDataForLocation { lat: f32, lon: f32 },

    #[error("No domains configured for this model")]
    NoDomainsConfigured,

    #[error(transparent)]
    IoFailure(#[from] StoreError),

    #[error("Failed to determine archive directory")]
    ArchiveDirResolution(#[source] std::io::Error),

    #[error("Failed to create archive directory '{0}'")]
    ArchiveDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode result as JSON")]
    JsonEncoding(#[from] serde_json::Error),

    #[error("Failed to encode result as CSV")]
    CsvEncoding(#[from] PolarsError),
}

impl ArchiveError {
    /// Whether the error was caused by the request itself (4xx class) rather than by the
    /// archive or the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::InvalidCoordinate { .. }
                | ArchiveError::InvalidDateRange(_)
                | ArchiveError::TimezoneRequired
                | ArchiveError::InvalidTimezone(_)
                | ArchiveError::NoDataForLocation { .. }
        )
    }
}
