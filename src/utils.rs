use log::debug;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const ARCHIVE_DIR_NAME: &str = "era5_archive";

pub fn get_archive_dir() -> io::Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(ARCHIVE_DIR_NAME))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system data directory",
            )
        })
}

/// Creates the archive root and any missing parents. Returns the canonical path; fails if the
/// path is a file.
pub async fn prepare_archive_dir(path: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(path).await?;
    let root = fs::canonicalize(path).await?;
    debug!("Archive root is {}", root.display());
    Ok(root)
}

/// Rounds to a fixed number of decimal places. NaN stays NaN.
pub fn round_to(value: f32, digits: i32) -> f32 {
    let scale = 10f32.powi(digits);
    (value * scale).round() / scale
}
