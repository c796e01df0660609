use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create archive directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing archive file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to scan parquet archive file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("Failed to read column '{column}' from '{path}'")]
    ColumnRead {
        path: PathBuf,
        column: &'static str,
        #[source]
        source: PolarsError,
    },

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Data download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Archive only holds hourly data, requested a time step of {0} seconds")]
    UnsupportedTimeStep(i64),
}
