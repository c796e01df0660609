//! Gridded datasets (domains), the user-facing models composed from them, and the regular
//! lat/lon grids used to snap a request point onto a grid cell.

use crate::types::variable::Era5Variable;
use serde::Deserialize;
use std::fmt;

/// A regular latitude/longitude grid. Cells are numbered row-major from the south-west corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularGrid {
    pub lat_min: f64,
    pub lon_min: f64,
    pub dlat: f64,
    pub dlon: f64,
    pub ny: usize,
    pub nx: usize,
    /// Longitudes wrap around the globe.
    pub global: bool,
}

impl RegularGrid {
    /// Nearest grid point `(x, y)` for a coordinate, or `None` outside the grid.
    pub fn find_point(&self, lat: f32, lon: f32) -> Option<(usize, usize)> {
        let y = ((lat as f64 - self.lat_min) / self.dlat).round();
        let mut x = ((lon as f64 - self.lon_min) / self.dlon).round();
        if self.global {
            x = x.rem_euclid(self.nx as f64);
        }
        if y < 0.0 || y >= self.ny as f64 || x < 0.0 || x >= self.nx as f64 {
            return None;
        }
        Some((x as usize, y as usize))
    }

    pub fn cell(&self, x: usize, y: usize) -> u64 {
        (y * self.nx + x) as u64
    }

    /// Centre coordinate `(lat, lon)` of a cell.
    pub fn coordinates(&self, cell: u64) -> (f32, f32) {
        let y = (cell / self.nx as u64) as f64;
        let x = (cell % self.nx as u64) as f64;
        let lat = self.lat_min + y * self.dlat;
        let mut lon = self.lon_min + x * self.dlon;
        if self.global && lon >= 180.0 {
            lon -= 360.0;
        }
        (lat as f32, lon as f32)
    }

    /// Cells within `radius` grid points of `(x, y)`, including the centre.
    pub fn neighbourhood(&self, x: usize, y: usize, radius: usize) -> Vec<u64> {
        let r = radius as isize;
        let mut cells = Vec::with_capacity((2 * radius + 1).pow(2));
        for dy in -r..=r {
            let yy = y as isize + dy;
            if yy < 0 || yy >= self.ny as isize {
                continue;
            }
            for dx in -r..=r {
                let mut xx = x as isize + dx;
                if self.global {
                    xx = xx.rem_euclid(self.nx as isize);
                } else if xx < 0 || xx >= self.nx as isize {
                    continue;
                }
                cells.push(self.cell(xx as usize, yy as usize));
            }
        }
        cells
    }
}

/// Global 3 arc-second elevation model.
pub const DEM_GRID: RegularGrid = RegularGrid {
    lat_min: -90.0,
    lon_min: -180.0,
    dlat: 1.0 / 1200.0,
    dlon: 1.0 / 1200.0,
    ny: 216_001,
    nx: 432_000,
    global: true,
};

/// Archive folder holding the elevation model.
pub const DEM_KEY: &str = "dem90";

/// One gridded reanalysis dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// ECMWF ERA5, 0.25° global, 1959 onwards.
    Era5,
    /// ERA5-Land, 0.1° global over land only.
    Era5Land,
    /// Copernicus European Regional Reanalysis, ~5 km over Europe.
    Cerra,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Era5 => "era5",
            Domain::Era5Land => "era5_land",
            Domain::Cerra => "cerra",
        }
    }

    pub fn grid(&self) -> RegularGrid {
        match self {
            Domain::Era5 => RegularGrid {
                lat_min: -90.0,
                lon_min: -180.0,
                dlat: 0.25,
                dlon: 0.25,
                ny: 721,
                nx: 1440,
                global: true,
            },
            Domain::Era5Land => RegularGrid {
                lat_min: -90.0,
                lon_min: -180.0,
                dlat: 0.1,
                dlon: 0.1,
                ny: 1801,
                nx: 3600,
                global: true,
            },
            // CERRA is on a Lambert conformal grid; the archive stores it regridded to 0.05°.
            Domain::Cerra => RegularGrid {
                lat_min: 20.0,
                lon_min: -58.0,
                dlat: 0.05,
                dlon: 0.05,
                ny: 1101,
                nx: 2640,
                global: false,
            },
        }
    }

    /// Sea cells carry no data at all.
    pub fn is_land_only(&self) -> bool {
        matches!(self, Domain::Era5Land)
    }

    /// Whether the domain stores `variable`. Readers report unsupported variables as absent.
    pub fn provides(&self, variable: Era5Variable) -> bool {
        use Era5Variable::*;
        match self {
            Domain::Era5 => true,
            Domain::Era5Land => matches!(
                variable,
                Temperature2m
                    | Dewpoint2m
                    | WindUComponent10m
                    | WindVComponent10m
                    | Precipitation
                    | SnowfallWaterEquivalent
                    | ShortwaveRadiation
                    | SoilTemperature0To7cm
                    | SoilTemperature7To28cm
                    | SoilTemperature28To100cm
                    | SoilTemperature100To255cm
                    | SoilMoisture0To7cm
                    | SoilMoisture7To28cm
                    | SoilMoisture28To100cm
                    | SoilMoisture100To255cm
            ),
            Domain::Cerra => !matches!(
                variable,
                SoilTemperature0To7cm
                    | SoilTemperature7To28cm
                    | SoilTemperature28To100cm
                    | SoilTemperature100To255cm
                    | SoilMoisture0To7cm
                    | SoilMoisture7To28cm
                    | SoilMoisture28To100cm
                    | SoilMoisture100To255cm
            ),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-facing model: one or more domains behaving as a single reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    BestMatch,
    Era5,
    Era5Land,
    Cerra,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::BestMatch => "best_match",
            Model::Era5 => "era5",
            Model::Era5Land => "era5_land",
            Model::Cerra => "cerra",
        }
    }

    /// Domains making up the model, ordered from coarse to fine. The last domain with data
    /// at a given time step wins.
    pub fn domains(&self) -> &'static [Domain] {
        match self {
            Model::BestMatch => &[Domain::Era5, Domain::Era5Land],
            Model::Era5 => &[Domain::Era5],
            Model::Era5Land => &[Domain::Era5Land],
            Model::Cerra => &[Domain::Cerra],
        }
    }
}

/// How a request point is snapped onto a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridSelectionMode {
    /// Prefer land cells whose elevation is closest to the requested elevation.
    #[default]
    Land,
    /// Prefer the closest sea cell.
    Sea,
    /// Closest cell regardless of terrain.
    Nearest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_point_era5() {
        let grid = Domain::Era5.grid();
        let (x, y) = grid.find_point(47.3, 8.5).unwrap();
        let (lat, lon) = grid.coordinates(grid.cell(x, y));
        assert!((lat - 47.25).abs() < 1e-4);
        assert!((lon - 8.5).abs() < 1e-4);
    }

    #[test]
    fn test_find_point_wraps_dateline() {
        let grid = Domain::Era5.grid();
        assert_eq!(grid.find_point(0.0, 180.0), Some((0, 360)));
        assert_eq!(grid.find_point(0.0, -180.0), Some((0, 360)));
        let (_, lon) = grid.coordinates(grid.cell(1439, 360));
        assert!((lon - 179.75).abs() < 1e-4);
    }

    #[test]
    fn test_regional_grid_bounds() {
        let grid = Domain::Cerra.grid();
        assert!(grid.find_point(47.3, 8.5).is_some());
        assert!(grid.find_point(-33.9, 151.2).is_none());
        assert!(grid.find_point(47.3, 100.0).is_none());
    }

    #[test]
    fn test_neighbourhood() {
        let grid = Domain::Era5.grid();
        assert_eq!(grid.neighbourhood(10, 10, 1).len(), 9);
        // South pole row has no row below
        assert_eq!(grid.neighbourhood(10, 0, 1).len(), 6);
        // Wraps in longitude
        let cells = grid.neighbourhood(0, 10, 1);
        assert!(cells.contains(&grid.cell(1439, 10)));

        let regional = Domain::Cerra.grid();
        assert_eq!(regional.neighbourhood(0, 0, 1).len(), 4);
    }

    #[test]
    fn test_model_domains_are_ordered_coarse_to_fine() {
        assert_eq!(
            Model::BestMatch.domains(),
            &[Domain::Era5, Domain::Era5Land]
        );
        for model in [Model::BestMatch, Model::Era5, Model::Era5Land, Model::Cerra] {
            assert!(!model.domains().is_empty());
        }
    }

    #[test]
    fn test_domain_variable_support() {
        assert!(Domain::Era5.provides(Era5Variable::CloudcoverLow));
        assert!(!Domain::Era5Land.provides(Era5Variable::CloudcoverLow));
        assert!(Domain::Era5Land.provides(Era5Variable::SoilMoisture0To7cm));
        assert!(!Domain::Cerra.provides(Era5Variable::SoilMoisture0To7cm));
    }

    #[test]
    fn test_model_deserialize() {
        let models: Vec<Model> = serde_json::from_str(r#"["best_match","era5_land"]"#).unwrap();
        assert_eq!(models, vec![Model::BestMatch, Model::Era5Land]);
        let mode: GridSelectionMode = serde_json::from_str(r#""sea""#).unwrap();
        assert_eq!(mode, GridSelectionMode::Sea);
    }
}
