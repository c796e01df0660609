//! The archive request and its validation, including time-range resolution.

use crate::error::ArchiveError;
use crate::types::domain::{GridSelectionMode, Model};
use crate::types::location::Location;
use crate::types::output::{OutputFormat, Timeformat};
use crate::types::time_axis::{TimeAxis, TimerangeLocal, DAILY_SECONDS};
use crate::types::units::{PrecipitationUnit, TemperatureUnit, UnitOptions, WindspeedUnit};
use crate::types::variable::{DailyVariable, HourlyVariable};
use chrono::{NaiveDate, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::ops::Range;
use thiserror::Error;

/// First day of the archive.
pub const ARCHIVE_START: NaiveDate = match NaiveDate::from_ymd_opt(1959, 1, 1) {
    Some(date) => date,
    None => NaiveDate::MIN,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("End date '{end}' is before start date '{start}'")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("Parameter '{parameter}' must be between {earliest} and {latest}. Given: {date}.")]
    OutOfRange {
        parameter: &'static str,
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },
}

/// A decoded archive request.
#[derive(Debug, Clone, Deserialize)]
pub struct Era5Query {
    pub latitude: f32,
    pub longitude: f32,
    #[serde(default)]
    pub hourly: Vec<HourlyVariable>,
    #[serde(default)]
    pub daily: Vec<DailyVariable>,
    /// Omitted means: look it up in the elevation model.
    pub elevation: Option<f32>,
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
    #[serde(default)]
    pub windspeed_unit: WindspeedUnit,
    #[serde(default)]
    pub precipitation_unit: PrecipitationUnit,
    #[serde(default)]
    pub timeformat: Timeformat,
    #[serde(default)]
    pub format: OutputFormat,
    /// IANA timezone name. Required as soon as daily variables are requested.
    pub timezone: Option<String>,
    /// Empty means `best_match`.
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub cell_selection: GridSelectionMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Era5Query {
    /// Checks everything that can be checked without touching the archive.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::InvalidCoordinate`], [`ArchiveError::InvalidDateRange`] (end before
    /// start), [`ArchiveError::TimezoneRequired`] and [`ArchiveError::InvalidTimezone`].
    pub fn validate(&self) -> Result<Location, ArchiveError> {
        let location = Location::new(self.latitude, self.longitude, self.elevation)?;
        if self.end_date < self.start_date {
            return Err(DateRangeError::EndBeforeStart {
                start: self.start_date,
                end: self.end_date,
            }
            .into());
        }
        if !self.daily.is_empty() && self.timezone.is_none() {
            return Err(ArchiveError::TimezoneRequired);
        }
        self.resolve_timezone()?;
        Ok(location)
    }

    /// Parses the requested timezone. No timezone means UTC.
    pub fn resolve_timezone(&self) -> Result<Tz, ArchiveError> {
        match &self.timezone {
            None => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ArchiveError::InvalidTimezone(name.clone())),
        }
    }

    /// Resolves the requested local days into a UTC range `[start - offset, end + 1 day - offset)`.
    ///
    /// The offset is the one in effect at local midnight of `start_date`, truncated to whole
    /// hours. Both dates must lie within `allowed` (unix seconds).
    pub fn get_timerange(
        &self,
        tz: Tz,
        allowed: Range<i64>,
    ) -> Result<TimerangeLocal, DateRangeError> {
        if self.end_date < self.start_date {
            return Err(DateRangeError::EndBeforeStart {
                start: self.start_date,
                end: self.end_date,
            });
        }
        let utc_offset_seconds = utc_offset_at_midnight(tz, self.start_date);
        let offset = utc_offset_seconds as i64;

        let start_midnight = midnight_timestamp(self.start_date);
        let end_midnight = midnight_timestamp(self.end_date);
        let earliest = date_of(allowed.start);
        let latest = date_of(allowed.end - 1);
        for (parameter, date, midnight) in [
            ("start_date", self.start_date, start_midnight),
            ("end_date", self.end_date, end_midnight),
        ] {
            if !allowed.contains(&(midnight - offset)) {
                return Err(DateRangeError::OutOfRange {
                    parameter,
                    date,
                    earliest,
                    latest,
                });
            }
        }

        Ok(TimerangeLocal {
            range: TimeAxis::new(
                start_midnight - offset,
                end_midnight + DAILY_SECONDS - offset,
                DAILY_SECONDS,
            ),
            utc_offset_seconds,
        })
    }

    pub fn units(&self) -> UnitOptions {
        UnitOptions {
            temperature: self.temperature_unit,
            windspeed: self.windspeed_unit,
            precipitation: self.precipitation_unit,
        }
    }

    /// Requested models, `best_match` if none were given.
    pub fn models(&self) -> Vec<Model> {
        if self.models.is_empty() {
            vec![Model::BestMatch]
        } else {
            self.models.clone()
        }
    }

    /// `[1959-01-01, now)` in unix seconds.
    pub fn allowed_range() -> Range<i64> {
        midnight_timestamp(ARCHIVE_START)..Utc::now().timestamp()
    }
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn date_of(timestamp: i64) -> NaiveDate {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|d| d.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

/// Offset at local midnight, truncated towards zero to whole hours.
fn utc_offset_at_midnight(tz: Tz, date: NaiveDate) -> i32 {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    let seconds = match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.offset().fix().local_minus_utc(),
        // Midnight skipped by a DST transition
        None => tz.offset_from_utc_datetime(&midnight).fix().local_minus_utc(),
    };
    seconds / 3600 * 3600
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn query(start: &str, end: &str) -> Era5Query {
        Era5Query {
            latitude: 47.3,
            longitude: 8.5,
            hourly: vec![],
            daily: vec![],
            elevation: None,
            temperature_unit: TemperatureUnit::default(),
            windspeed_unit: WindspeedUnit::default(),
            precipitation_unit: PrecipitationUnit::default(),
            timeformat: Timeformat::default(),
            format: OutputFormat::default(),
            timezone: None,
            models: vec![],
            cell_selection: GridSelectionMode::default(),
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
        }
    }

    fn allowed() -> Range<i64> {
        Era5Query::allowed_range()
    }

    #[test]
    fn test_timerange_zurich_winter() {
        let q = query("2022-01-01", "2022-01-01");
        let tz: Tz = "Europe/Zurich".parse().unwrap();
        let range = q.get_timerange(tz, allowed()).unwrap();
        assert_eq!(range.utc_offset_seconds, 3600);
        // 2022-01-01T00:00+01:00
        assert_eq!(range.range.start, 1_640_991_600);
        assert_eq!(range.range.end, 1_640_991_600 + 86400);
        assert_eq!(range.range.count(), 1);
        assert_eq!(range.range.with_dt(3600).count(), 24);
    }

    #[test]
    fn test_timerange_utc_multiple_days() {
        let q = query("2022-01-01", "2022-01-03");
        let range = q.get_timerange(Tz::UTC, allowed()).unwrap();
        assert_eq!(range.utc_offset_seconds, 0);
        assert_eq!(range.range.start, 1_640_995_200);
        assert_eq!(range.range.count(), 3);
    }

    #[test]
    fn test_fractional_offset_truncated_to_hours() {
        let q = query("2022-01-01", "2022-01-01");
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        let range = q.get_timerange(tz, allowed()).unwrap();
        assert_eq!(range.utc_offset_seconds, 5 * 3600);
    }

    #[test]
    fn test_end_before_start() {
        let q = query("2022-01-02", "2022-01-01");
        assert!(matches!(
            q.get_timerange(Tz::UTC, allowed()),
            Err(DateRangeError::EndBeforeStart { .. })
        ));
        let err = q.validate().unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidDateRange(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_out_of_range() {
        let q = query("1950-01-01", "1960-01-01");
        match q.get_timerange(Tz::UTC, allowed()) {
            Err(DateRangeError::OutOfRange { parameter, .. }) => {
                assert_eq!(parameter, "start_date")
            }
            other => panic!("unexpected {:?}", other),
        }
        let q = query("2022-01-01", "2100-01-01");
        match q.get_timerange(Tz::UTC, allowed()) {
            Err(DateRangeError::OutOfRange { parameter, .. }) => assert_eq!(parameter, "end_date"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validation() {
        let mut q = query("2022-01-01", "2022-01-01");
        q.latitude = 91.0;
        assert!(matches!(
            q.validate(),
            Err(ArchiveError::InvalidCoordinate { .. })
        ));

        let mut q = query("2022-01-01", "2022-01-01");
        q.daily = vec![DailyVariable::Temperature2mMax];
        assert!(matches!(q.validate(), Err(ArchiveError::TimezoneRequired)));

        q.timezone = Some("Mars/Olympus".to_string());
        assert!(matches!(q.validate(), Err(ArchiveError::InvalidTimezone(_))));

        q.timezone = Some("Europe/Zurich".to_string());
        let location = q.validate().unwrap();
        assert_eq!(location.latitude, 47.3);
    }

    #[test]
    fn test_deserialize_defaults() {
        let q: Era5Query = serde_json::from_str(
            r#"{"latitude":47.3,"longitude":8.5,"start_date":"2022-01-01","end_date":"2022-01-02",
                "daily":["precipitation_sum"],"timezone":"Europe/Zurich","windspeed_unit":"ms"}"#,
        )
        .unwrap();
        assert_eq!(q.models(), vec![Model::BestMatch]);
        assert_eq!(q.units().windspeed, WindspeedUnit::Ms);
        assert_eq!(q.units().temperature, TemperatureUnit::Celsius);
        assert_eq!(q.daily, vec![DailyVariable::PrecipitationSum]);
        assert_eq!(q.cell_selection, GridSelectionMode::Land);
    }
}
