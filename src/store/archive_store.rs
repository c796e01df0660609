use crate::store::error::StoreError;
use crate::types::time_axis::{TimeAxis, HOURLY_SECONDS};
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use polars::prelude::*;
use reqwest::{Client, StatusCode};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

/// Folder holding per-cell static fields of a domain.
pub const STATIC_FOLDER: &str = "static";

/// Local archive of yearly Parquet files, optionally backed by a bulk mirror.
///
/// Layout: `<root>/<domain>/<variable>/<year>.parquet` with columns `cell` (u64), `time`
/// (i64 unix seconds, hourly) and `value` (f32). Static fields live in
/// `<root>/<domain>/static/<field>.parquet` with columns `cell` and `value`.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
    mirror: Option<String>,
    download_client: Client,
}

impl ArchiveStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            mirror: None,
            download_client: Client::new(),
        }
    }

    /// Missing files are fetched from `<url>/<relative path>.gz` and kept locally.
    pub fn with_mirror(mut self, url: impl Into<String>) -> Self {
        self.mirror = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Reads the hourly series of one cell over `time`. Samples without data are NaN.
    ///
    /// Returns `None` when no yearly file exists for the range or every sample is missing.
    pub async fn read_series(
        &self,
        domain: &str,
        variable: &str,
        cell: u64,
        time: &TimeAxis,
    ) -> Result<Option<Vec<f32>>, StoreError> {
        if time.dt_seconds != HOURLY_SECONDS {
            return Err(StoreError::UnsupportedTimeStep(time.dt_seconds));
        }
        let mut data = vec![f32::NAN; time.count()];
        let mut found_file = false;

        for year in time.years() {
            let relative = format!("{}/{}/{}.parquet", domain, variable, year);
            let Some(path) = self.ensure_local(&relative).await? else {
                continue;
            };
            found_file = true;
            let rows = Self::scan_cell(path, cell, time.start, time.end).await?;
            for (timestamp, value) in rows {
                if let Some(index) = time.index_of(timestamp) {
                    data[index] = value;
                }
            }
        }

        if !found_file || data.iter().all(|v| v.is_nan()) {
            debug!("No {} data for {} cell {} in range", variable, domain, cell);
            return Ok(None);
        }
        Ok(Some(data))
    }

    /// Reads a static field (e.g. elevation) for a set of cells. Cells not present in the file
    /// are left out of the map; a missing file yields `None`.
    pub async fn read_static(
        &self,
        domain: &str,
        field: &str,
        cells: &[u64],
    ) -> Result<Option<HashMap<u64, f32>>, StoreError> {
        let (Some(&min), Some(&max)) = (cells.iter().min(), cells.iter().max()) else {
            return Ok(Some(HashMap::new()));
        };
        let relative = format!("{}/{}/{}.parquet", domain, STATIC_FOLDER, field);
        let Some(path) = self.ensure_local(&relative).await? else {
            return Ok(None);
        };

        let wanted: HashSet<u64> = cells.iter().copied().collect();
        let rows = task::spawn_blocking(move || {
            let df = LazyFrame::scan_parquet(&path, Default::default())
                .map_err(|e| StoreError::ParquetScan(path.clone(), e))?
                .filter(col("cell").gt_eq(lit(min)).and(col("cell").lt_eq(lit(max))))
                .select([col("cell"), col("value")])
                .collect()
                .map_err(|e| StoreError::ParquetScan(path.clone(), e))?;
            let cell_column = Self::column(&df, &path, "cell", |c| c.u64())?;
            let value_column = Self::column(&df, &path, "value", |c| c.f32())?;
            let rows: Vec<(u64, f32)> = cell_column
                .into_iter()
                .zip(value_column.into_iter())
                .filter_map(|(cell, value)| Some((cell?, value.unwrap_or(f32::NAN))))
                .collect();
            Ok::<_, StoreError>(rows)
        })
        .await??;

        Ok(Some(
            rows.into_iter()
                .filter(|(cell, _)| wanted.contains(cell))
                .collect(),
        ))
    }

    /// `(time, value)` rows of one cell inside `[start, end)`, scanned on the blocking pool.
    async fn scan_cell(
        path: PathBuf,
        cell: u64,
        start: i64,
        end: i64,
    ) -> Result<Vec<(i64, f32)>, StoreError> {
        task::spawn_blocking(move || {
            let df = LazyFrame::scan_parquet(&path, Default::default())
                .map_err(|e| StoreError::ParquetScan(path.clone(), e))?
                .filter(
                    col("cell")
                        .eq(lit(cell))
                        .and(col("time").gt_eq(lit(start)))
                        .and(col("time").lt(lit(end))),
                )
                .select([col("time"), col("value")])
                .collect()
                .map_err(|e| StoreError::ParquetScan(path.clone(), e))?;
            let times = Self::column(&df, &path, "time", |c| c.i64())?;
            let values = Self::column(&df, &path, "value", |c| c.f32())?;
            let rows: Vec<(i64, f32)> = times
                .into_iter()
                .zip(values.into_iter())
                .filter_map(|(t, v)| Some((t?, v.unwrap_or(f32::NAN))))
                .collect();
            Ok::<_, StoreError>(rows)
        })
        .await?
    }

    fn column<'a, T, F>(
        df: &'a DataFrame,
        path: &Path,
        name: &'static str,
        cast: F,
    ) -> Result<&'a ChunkedArray<T>, StoreError>
    where
        T: PolarsDataType,
        F: FnOnce(&'a Column) -> PolarsResult<&'a ChunkedArray<T>>,
    {
        df.column(name)
            .and_then(cast)
            .map_err(|source| StoreError::ColumnRead {
                path: path.to_path_buf(),
                column: name,
                source,
            })
    }

    /// Local path of an archive file, downloading it from the mirror if needed.
    /// `None` if the file exists neither locally nor on the mirror.
    async fn ensure_local(&self, relative: &str) -> Result<Option<PathBuf>, StoreError> {
        let path = self.root.join(relative);
        if fs::metadata(&path).await.is_ok() {
            debug!("Archive hit for {:?}", path);
            return Ok(Some(path));
        }
        let Some(mirror) = &self.mirror else {
            debug!("Archive miss for {:?}, no mirror configured", path);
            return Ok(None);
        };
        warn!("Archive miss for {:?}. Downloading from mirror.", path);

        let url = format!("{}/{}.gz", mirror, relative);
        let Some(bytes) = self.download(&url).await? else {
            info!("Mirror has no file at {}", url);
            return Ok(None);
        };

        let parent = path.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent)
            .await
            .map_err(|e| StoreError::CacheDirCreation(parent.clone(), e))?;
        let target = path.clone();
        task::spawn_blocking(move || {
            let mut temp_file = NamedTempFile::new_in(&parent)
                .map_err(|e| StoreError::CacheWrite(target.clone(), e))?;
            temp_file
                .write_all(&bytes)
                .map_err(|e| StoreError::CacheWrite(target.clone(), e))?;
            temp_file
                .persist(&target)
                .map_err(|e| StoreError::CacheWrite(target.clone(), e.error))?;
            Ok::<(), StoreError>(())
        })
        .await??;
        info!("Stored mirror file {} at {:?}", url, path);
        Ok(Some(path))
    }

    /// Downloads and gunzips a mirror file. 404 means the mirror does not have it.
    async fn download(&self, url: &str) -> Result<Option<Vec<u8>>, StoreError> {
        info!("Downloading data from {}", url);
        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::NetworkRequest(url.to_string(), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    StoreError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    StoreError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut decoder = GzipDecoder::new(StreamReader::new(stream));
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).await?;
        info!("Downloaded and decompressed {} bytes from {}", decompressed.len(), url);
        Ok(Some(decompressed))
    }
}
