use crate::store::archive_store::ArchiveStore;
use crate::store::error::StoreError;
use crate::types::domain::{DEM_GRID, DEM_KEY};
use log::warn;

impl ArchiveStore {
    /// Terrain elevation in metres from the digital elevation model. NaN when the model is not
    /// available for this point.
    pub async fn dem_elevation(&self, lat: f32, lon: f32) -> Result<f32, StoreError> {
        let Some((x, y)) = DEM_GRID.find_point(lat, lon) else {
            return Ok(f32::NAN);
        };
        let cell = DEM_GRID.cell(x, y);
        match self.read_static(DEM_KEY, "elevation", &[cell]).await? {
            Some(values) => Ok(values.get(&cell).copied().unwrap_or(f32::NAN)),
            None => {
                warn!(
                    "Elevation model missing from archive, elevation unknown for ({}, {})",
                    lat, lon
                );
                Ok(f32::NAN)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::write_static;

    #[tokio::test]
    async fn test_dem_lookup() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let (x, y) = DEM_GRID.find_point(47.3, 8.5).unwrap();
        write_static(root.path(), DEM_KEY, "elevation", &[(DEM_GRID.cell(x, y), 412.0)])?;

        let store = ArchiveStore::new(root.path());
        assert_eq!(store.dem_elevation(47.3, 8.5).await?, 412.0);
        // Cell not covered by the file
        assert!(store.dem_elevation(-33.9, 151.2).await?.is_nan());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_dem_is_nan() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let store = ArchiveStore::new(root.path());
        assert!(store.dem_elevation(47.3, 8.5).await?.is_nan());
        Ok(())
    }
}
