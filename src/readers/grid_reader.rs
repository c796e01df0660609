use crate::readers::{DomainReader, ReaderMetadata};
use crate::store::archive_store::ArchiveStore;
use crate::store::error::StoreError;
use crate::types::domain::{Domain, GridSelectionMode, RegularGrid};
use crate::types::time_axis::{TimeAxis, HOURLY_SECONDS};
use crate::types::units::DataAndUnit;
use crate::types::variable::Era5Variable;
use async_trait::async_trait;
use haversine::{distance, Location as HaversineLocation, Units};
use log::debug;
use ordered_float::OrderedFloat;
use std::collections::{hash_map::Entry, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Static elevation at or below this marks a sea cell.
const SEA_ELEVATION: f32 = -999.0;

type SeriesCache = HashMap<(Era5Variable, TimeAxis), Option<Arc<Vec<f32>>>>;

/// Reads one grid cell of one domain from the archive store.
pub struct GridReader {
    store: Arc<ArchiveStore>,
    domain: Domain,
    cell: u64,
    metadata: ReaderMetadata,
    series_cache: Mutex<SeriesCache>,
}

impl GridReader {
    /// Snaps the point onto the domain grid using `mode`.
    ///
    /// Returns `None` if the point is outside the domain, or if the domain only covers land and
    /// no land cell is nearby.
    pub async fn new(
        store: Arc<ArchiveStore>,
        domain: Domain,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
    ) -> Result<Option<Self>, StoreError> {
        let grid = domain.grid();
        let Some((x, y)) = grid.find_point(lat, lon) else {
            debug!("({}, {}) is outside of domain {}", lat, lon, domain);
            return Ok(None);
        };
        let candidates = grid.neighbourhood(x, y, 1);
        let selected = match store.read_static(domain.as_str(), "elevation", &candidates).await? {
            Some(elevations) => select_cell(
                &grid,
                &candidates,
                &elevations,
                (lat, lon, elevation),
                mode,
                domain.is_land_only(),
            ),
            None => Some((grid.cell(x, y), f32::NAN)),
        };
        let Some((cell, model_elevation)) = selected else {
            debug!("No suitable grid cell in {} for ({}, {})", domain, lat, lon);
            return Ok(None);
        };
        let (model_lat, model_lon) = grid.coordinates(cell);
        debug!(
            "Domain {} uses cell {} at ({}, {}), elevation {}",
            domain, cell, model_lat, model_lon, model_elevation
        );

        Ok(Some(Self {
            store,
            domain,
            cell,
            metadata: ReaderMetadata {
                domain: domain.as_str().to_string(),
                model_lat,
                model_lon,
                model_elevation,
                target_elevation: elevation,
            },
            series_cache: Mutex::new(HashMap::new()),
        }))
    }

    pub fn cell(&self) -> u64 {
        self.cell
    }

    /// Reads a series once per `(variable, time)` and keeps it for later calls.
    async fn load(
        &self,
        variable: Era5Variable,
        time: &TimeAxis,
    ) -> Result<Option<Arc<Vec<f32>>>, StoreError> {
        if time.dt_seconds != HOURLY_SECONDS {
            return Err(StoreError::UnsupportedTimeStep(time.dt_seconds));
        }
        let key = (variable, *time);
        {
            let cache = self.series_cache.lock().await;
            if let Some(cached) = cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        let loaded = self
            .store
            .read_series(self.domain.as_str(), variable.as_str(), self.cell, time)
            .await?
            .map(Arc::new);

        let mut cache = self.series_cache.lock().await;
        match cache.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                entry.insert(loaded.clone());
                Ok(loaded)
            }
        }
    }
}

#[async_trait]
impl DomainReader for GridReader {
    fn metadata(&self) -> &ReaderMetadata {
        &self.metadata
    }

    async fn prefetch(&self, variable: Era5Variable, time: &TimeAxis) -> Result<(), StoreError> {
        if !self.domain.provides(variable) {
            return Ok(());
        }
        self.load(variable, time).await.map(|_| ())
    }

    async fn get(
        &self,
        variable: Era5Variable,
        time: &TimeAxis,
    ) -> Result<Option<DataAndUnit>, StoreError> {
        if !self.domain.provides(variable) {
            return Ok(None);
        }
        Ok(self
            .load(variable, time)
            .await?
            .map(|data| DataAndUnit::new(data.as_ref().clone(), variable.unit())))
    }
}

fn distance_km(grid: &RegularGrid, cell: u64, lat: f32, lon: f32) -> OrderedFloat<f64> {
    let (cell_lat, cell_lon) = grid.coordinates(cell);
    OrderedFloat(distance(
        HaversineLocation {
            latitude: lat as f64,
            longitude: lon as f64,
        },
        HaversineLocation {
            latitude: cell_lat as f64,
            longitude: cell_lon as f64,
        },
        Units::Kilometers,
    ))
}

/// Picks a cell out of `candidates` and returns it with its model elevation.
fn select_cell(
    grid: &RegularGrid,
    candidates: &[u64],
    elevations: &HashMap<u64, f32>,
    (lat, lon, elevation): (f32, f32, f32),
    mode: GridSelectionMode,
    land_only: bool,
) -> Option<(u64, f32)> {
    let known: Vec<(u64, f32)> = candidates
        .iter()
        .filter_map(|cell| elevations.get(cell).map(|e| (*cell, *e)))
        .filter(|(_, e)| !e.is_nan())
        .collect();
    let (sea, land): (Vec<(u64, f32)>, Vec<(u64, f32)>) =
        known.iter().copied().partition(|(_, e)| *e <= SEA_ELEVATION);
    let nearest = |cells: &[(u64, f32)]| {
        cells
            .iter()
            .copied()
            .min_by_key(|(cell, _)| distance_km(grid, *cell, lat, lon))
    };

    let selected = match mode {
        GridSelectionMode::Nearest if land_only => nearest(&land),
        GridSelectionMode::Nearest => nearest(&known),
        GridSelectionMode::Sea if !land_only => nearest(&sea),
        GridSelectionMode::Land if !elevation.is_nan() => {
            land.iter().copied().min_by_key(|(cell, e)| {
                (
                    OrderedFloat((e - elevation).abs()),
                    distance_km(grid, *cell, lat, lon),
                )
            })
        }
        GridSelectionMode::Land | GridSelectionMode::Sea => nearest(&land),
    };

    match selected {
        Some(found) => Some(found),
        None if land_only => None,
        None => nearest(&known).or_else(|| {
            let (x, y) = grid.find_point(lat, lon)?;
            Some((grid.cell(x, y), f32::NAN))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{write_series, write_static};
    use crate::types::time_axis::DAILY_SECONDS;

    const START: i64 = 1_640_995_200;

    /// 3x3 ERA5 neighbourhood around (47.25, 8.5) with given elevations, row by row from south.
    fn era5_neighbourhood(elevations: [f32; 9]) -> (RegularGrid, Vec<(u64, f32)>) {
        let grid = Domain::Era5.grid();
        let (x, y) = grid.find_point(47.25, 8.5).unwrap();
        let cells = grid.neighbourhood(x, y, 1);
        (grid, cells.into_iter().zip(elevations).collect())
    }

    #[test]
    fn test_land_mode_prefers_matching_elevation() {
        let (grid, cells) = era5_neighbourhood([
            300.0, 350.0, 900.0, //
            420.0, 1500.0, 600.0, //
            -999.0, 800.0, 700.0,
        ]);
        let ids: Vec<u64> = cells.iter().map(|c| c.0).collect();
        let map: HashMap<u64, f32> = cells.iter().copied().collect();
        let zurich = (47.25, 8.5, 409.0);
        let selected = select_cell(&grid, &ids, &map, zurich, GridSelectionMode::Land, false);
        assert_eq!(selected, Some((ids[3], 420.0)));

        let nearest = select_cell(&grid, &ids, &map, zurich, GridSelectionMode::Nearest, false);
        assert_eq!(nearest, Some((ids[4], 1500.0)));

        let sea = select_cell(&grid, &ids, &map, zurich, GridSelectionMode::Sea, false);
        assert_eq!(sea, Some((ids[6], -999.0)));
    }

    #[test]
    fn test_all_sea() {
        let (grid, cells) = era5_neighbourhood([-999.0; 9]);
        let ids: Vec<u64> = cells.iter().map(|c| c.0).collect();
        let map: HashMap<u64, f32> = cells.iter().copied().collect();
        // Land-only domains have nothing here
        assert_eq!(
            select_cell(&grid, &ids, &map, (47.25, 8.5, 0.0), GridSelectionMode::Land, true),
            None
        );
        // Other domains fall back to the nearest cell
        assert_eq!(
            select_cell(&grid, &ids, &map, (47.25, 8.5, 0.0), GridSelectionMode::Land, false),
            Some((ids[4], -999.0))
        );
    }

    #[tokio::test]
    async fn test_reader_reads_selected_cell() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let grid = Domain::Era5.grid();
        let (x, y) = grid.find_point(47.3, 8.5).unwrap();
        let cell = grid.cell(x, y);
        write_static(root.path(), "era5", "elevation", &[(cell, 410.0)])?;
        let rows: Vec<(u64, i64, f32)> =
            (0..24).map(|h| (cell, START + h * HOURLY_SECONDS, 2.0)).collect();
        write_series(root.path(), "era5", "temperature_2m", 2022, &rows)?;

        let store = Arc::new(ArchiveStore::new(root.path()));
        let mode = GridSelectionMode::Land;
        let reader = GridReader::new(store, Domain::Era5, 47.3, 8.5, 409.0, mode)
            .await?
            .unwrap();
        assert_eq!(reader.cell(), cell);
        assert_eq!(reader.metadata().model_elevation, 410.0);
        assert_eq!(reader.metadata().target_elevation, 409.0);
        assert_eq!(reader.metadata().domain, "era5");

        let time = TimeAxis::new(START, START + DAILY_SECONDS, HOURLY_SECONDS);
        reader.prefetch(Era5Variable::Temperature2m, &time).await?;
        let data = reader.get(Era5Variable::Temperature2m, &time).await?.unwrap();
        assert_eq!(data.data, vec![2.0; 24]);
        // Not stored at all
        assert!(reader.get(Era5Variable::Dewpoint2m, &time).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_variable_is_absent() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let store = Arc::new(ArchiveStore::new(root.path()));
        // No static file: nearest cell, land-only still resolves
        let mode = GridSelectionMode::Land;
        let reader = GridReader::new(store, Domain::Era5Land, 47.3, 8.5, 409.0, mode)
            .await?
            .unwrap();
        let time = TimeAxis::new(START, START + DAILY_SECONDS, HOURLY_SECONDS);
        reader.prefetch(Era5Variable::CloudcoverLow, &time).await?;
        assert!(reader.get(Era5Variable::CloudcoverLow, &time).await?.is_none());

        let daily = TimeAxis::new(START, START + DAILY_SECONDS, DAILY_SECONDS);
        assert!(matches!(
            reader.prefetch(Era5Variable::Temperature2m, &daily).await,
            Err(StoreError::UnsupportedTimeStep(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_outside_regional_domain() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let store = Arc::new(ArchiveStore::new(root.path()));
        let mode = GridSelectionMode::Land;
        let reader = GridReader::new(store, Domain::Cerra, -33.9, 151.2, 10.0, mode).await?;
        assert!(reader.is_none());
        Ok(())
    }
}
