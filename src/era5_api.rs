//! Entry point: resolves a request into readers, prefetches what it needs and assembles the
//! hourly and daily sections of the result.

use crate::aggregation::dependencies::prefetch_plan;
use crate::aggregation::hourly::HourlyEngine;
use crate::astronomy::RiseSetCache;
use crate::error::ArchiveError;
use crate::readers::grid_reader::GridReader;
use crate::readers::mixer::ReaderMixer;
use crate::readers::DomainReader;
use crate::store::archive_store::ArchiveStore;
use crate::types::domain::{GridSelectionMode, Model};
use crate::types::output::{
    ApiColumn, ApiSection, ArchiveResult, ColumnData, OutputFormat, Timeformat,
};
use crate::types::query::Era5Query;
use crate::types::time_axis::{DAILY_SECONDS, HOURLY_SECONDS};
use crate::types::units::{PrecipitationUnit, TemperatureUnit, WindspeedUnit};
use crate::types::variable::{DailyVariable, HourlyVariable};
use crate::utils::{get_archive_dir, prepare_archive_dir};
use bon::bon;
use chrono::NaiveDate;
use futures_util::future::try_join_all;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Client for the reanalysis archive.
///
/// Create it with [`Era5Api::new()`] to use the default data directory, or with
/// [`Era5Api::with_archive_folder()`] for an explicit one.
///
/// # Examples
///
/// ```rust,no_run
/// # use era5_archive::{Era5Api, ArchiveError, DailyVariable};
/// # use chrono::NaiveDate;
/// # #[tokio::main]
/// # async fn main() -> Result<(), ArchiveError> {
/// let api = Era5Api::new().await?;
/// let result = api
///     .query()
///     .latitude(47.3)
///     .longitude(8.5)
///     .start_date(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap())
///     .end_date(NaiveDate::from_ymd_opt(2022, 1, 7).unwrap())
///     .daily(vec![DailyVariable::PrecipitationSum])
///     .timezone("Europe/Zurich")
///     .call()
///     .await?;
/// println!("{}", result.to_json()?);
/// # Ok(())
/// # }
/// ```
pub struct Era5Api {
    store: Arc<ArchiveStore>,
}

/// One requested model, bound to the location.
struct ModelEngine {
    model: Model,
    engine: HourlyEngine,
}

#[bon]
impl Era5Api {
    /// Uses `archive_folder` as the local archive, creating it if it doesn't exist.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::ArchiveDirCreation`] if the folder cannot be created.
    pub async fn with_archive_folder(archive_folder: PathBuf) -> Result<Self, ArchiveError> {
        let root = prepare_archive_dir(&archive_folder)
            .await
            .map_err(|e| ArchiveError::ArchiveDirCreation(archive_folder, e))?;
        Ok(Self {
            store: Arc::new(ArchiveStore::new(&root)),
        })
    }

    /// Uses the default archive folder (e.g. `~/.local/share/era5_archive` on Linux).
    ///
    /// # Errors
    ///
    /// [`ArchiveError::ArchiveDirResolution`] if there is no data directory on this system, and
    /// [`ArchiveError::ArchiveDirCreation`] if the folder cannot be created.
    pub async fn new() -> Result<Self, ArchiveError> {
        let archive_folder = get_archive_dir().map_err(ArchiveError::ArchiveDirResolution)?;
        Self::with_archive_folder(archive_folder).await
    }

    /// Downloads archive files missing locally from a bulk mirror.
    pub fn with_mirror(self, url: impl Into<String>) -> Self {
        Self {
            store: Arc::new(self.store.as_ref().clone().with_mirror(url)),
        }
    }

    /// Runs a decoded request.
    ///
    /// Validation happens before any archive access. Variables without data at this location
    /// are left out of the result rather than failing the request.
    ///
    /// # Errors
    ///
    /// Validation errors ([`ArchiveError::is_client_error`]),
    /// [`ArchiveError::NoDataForLocation`] if none of the requested models covers the point and
    /// [`ArchiveError::IoFailure`] if the archive cannot be read.
    pub async fn execute(&self, query: &Era5Query) -> Result<ArchiveResult, ArchiveError> {
        let started = Instant::now();
        let location = query.validate()?;
        let tz = query.resolve_timezone()?;
        let timerange = query.get_timerange(tz, Era5Query::allowed_range())?;
        let daily_time = timerange.range.with_dt(DAILY_SECONDS);
        let hourly_time = timerange.range.with_dt(HOURLY_SECONDS);
        let models = query.models();
        info!(
            "Archive request for ({}, {}) from {} to {} ({} hourly, {} daily, {} model(s))",
            location.latitude,
            location.longitude,
            query.start_date,
            query.end_date,
            query.hourly.len(),
            query.daily.len(),
            models.len()
        );

        let elevation = match location.elevation {
            Some(elevation) => elevation,
            None => self.store.dem_elevation(location.latitude, location.longitude).await?,
        };

        let mut engines = Vec::with_capacity(models.len());
        for model in &models {
            let reader = self
                .model_reader(
                    *model,
                    location.latitude,
                    location.longitude,
                    elevation,
                    query.cell_selection,
                )
                .await?;
            match reader {
                Some(reader) => engines.push(ModelEngine {
                    model: *model,
                    engine: HourlyEngine::new(reader),
                }),
                None => debug!("Model {} has no reader at this location", model.as_str()),
            }
        }
        let Some(first) = engines.first() else {
            return Err(ArchiveError::NoDataForLocation {
                lat: location.latitude,
                lon: location.longitude,
            });
        };
        let metadata = first.engine.metadata().clone();

        let plan = prefetch_plan(&query.hourly, &query.daily);
        try_join_all(engines.iter().map(|m| m.engine.prefetch(&plan, &hourly_time))).await?;

        let units = query.units();
        let suffix_models = engines.len() > 1;
        let column_name = |variable: &str, model: Model| {
            if suffix_models {
                format!("{}_{}", variable, model.as_str())
            } else {
                variable.to_string()
            }
        };

        let mut sections = Vec::new();
        if !query.hourly.is_empty() {
            let mut columns = Vec::new();
            for m in &engines {
                for variable in &query.hourly {
                    if let Some(series) = m.engine.get(*variable, &hourly_time).await? {
                        columns.push(ApiColumn {
                            name: column_name(variable.as_str(), m.model),
                            data: ColumnData::Float(series.convert_and_round(&units)),
                        });
                    }
                }
            }
            sections.push(ApiSection {
                name: "hourly",
                time: hourly_time,
                columns,
            });
        }

        if !query.daily.is_empty() {
            let mut rise_set = RiseSetCache::new();
            let mut columns = Vec::new();
            for m in &engines {
                for variable in &query.daily {
                    let name = column_name(variable.as_str(), m.model);
                    let data = match variable {
                        DailyVariable::Sunrise | DailyVariable::Sunset => {
                            let times = rise_set.get_or_calculate(
                                &daily_time,
                                location.latitude,
                                location.longitude,
                                timerange.utc_offset_seconds,
                            );
                            let events = if *variable == DailyVariable::Sunrise {
                                &times.rise
                            } else {
                                &times.set
                            };
                            Some(ColumnData::Timestamp(events.clone()))
                        }
                        _ => m
                            .engine
                            .get_daily(*variable, &units, &daily_time)
                            .await?
                            .map(ColumnData::Float),
                    };
                    if let Some(data) = data {
                        columns.push(ApiColumn { name, data });
                    }
                }
            }
            sections.push(ApiSection {
                name: "daily",
                time: daily_time,
                columns,
            });
        }

        let generationtime_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!("Archive request answered in {:.2} ms", generationtime_ms);
        Ok(ArchiveResult {
            latitude: metadata.model_lat,
            longitude: metadata.model_lon,
            elevation: metadata.target_elevation,
            generationtime_ms,
            utc_offset_seconds: timerange.utc_offset_seconds,
            timezone: tz.name().to_string(),
            timeformat: query.timeformat,
            sections,
        })
    }

    /// Runs a decoded request and encodes the result in its `format`.
    ///
    /// # Errors
    ///
    /// See [`Era5Api::execute`], plus [`ArchiveError`] encoding failures.
    pub async fn respond(&self, query: &Era5Query) -> Result<String, ArchiveError> {
        self.execute(query).await?.encode(query.format)
    }

    /// Builds and runs a request.
    ///
    /// * `.latitude(f32)`, `.longitude(f32)`, `.start_date(NaiveDate)`, `.end_date(NaiveDate)`:
    ///   **Required.**
    /// * `.hourly(Vec<HourlyVariable>)`, `.daily(Vec<DailyVariable>)`: variables to return.
    /// * `.timezone(&str)`: IANA name, required with daily variables. Defaults to UTC.
    /// * `.elevation(f32)`: defaults to the elevation model.
    /// * `.models(Vec<Model>)`: defaults to [`Model::BestMatch`].
    /// * Unit and formatting options default like a decoded request.
    ///
    /// # Errors
    ///
    /// See [`Era5Api::execute`].
    #[builder]
    pub async fn query(
        &self,
        latitude: f32,
        longitude: f32,
        start_date: NaiveDate,
        end_date: NaiveDate,
        hourly: Option<Vec<HourlyVariable>>,
        daily: Option<Vec<DailyVariable>>,
        timezone: Option<&str>,
        elevation: Option<f32>,
        models: Option<Vec<Model>>,
        temperature_unit: Option<TemperatureUnit>,
        windspeed_unit: Option<WindspeedUnit>,
        precipitation_unit: Option<PrecipitationUnit>,
        timeformat: Option<Timeformat>,
        cell_selection: Option<GridSelectionMode>,
    ) -> Result<ArchiveResult, ArchiveError> {
        let query = Era5Query {
            latitude,
            longitude,
            hourly: hourly.unwrap_or_default(),
            daily: daily.unwrap_or_default(),
            elevation,
            temperature_unit: temperature_unit.unwrap_or_default(),
            windspeed_unit: windspeed_unit.unwrap_or_default(),
            precipitation_unit: precipitation_unit.unwrap_or_default(),
            timeformat: timeformat.unwrap_or_default(),
            format: OutputFormat::default(),
            timezone: timezone.map(str::to_string),
            models: models.unwrap_or_default(),
            cell_selection: cell_selection.unwrap_or_default(),
            start_date,
            end_date,
        };
        self.execute(&query).await
    }

    /// One reader per model: a single grid reader, or a mixer over the domains that cover the
    /// point. `None` if no domain of the model does.
    async fn model_reader(
        &self,
        model: Model,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
    ) -> Result<Option<Box<dyn DomainReader>>, ArchiveError> {
        let mut readers: Vec<Box<dyn DomainReader>> = Vec::new();
        for domain in model.domains() {
            if let Some(reader) =
                GridReader::new(self.store.clone(), *domain, lat, lon, elevation, mode).await?
            {
                readers.push(Box::new(reader));
            }
        }
        match readers.len() {
            0 => Ok(None),
            1 => Ok(readers.pop()),
            _ => Ok(Some(Box::new(ReaderMixer::new(readers)?))),
        }
    }
}
