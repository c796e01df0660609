//! Solar geometry: sunrise/sunset per local day and the solar zenith angle needed for
//! radiation-derived variables.

use crate::types::time_axis::{TimeAxis, DAILY_SECONDS};
use chrono::{DateTime, Datelike};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

/// Solar constant in W/m².
pub const SOLAR_CONSTANT: f32 = 1361.0;

/// Unix timestamp of J2000.0 (2000-01-01T12:00Z).
const J2000_UNIX: f64 = 946_728_000.0;
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;
const J2000_JULIAN_DAY: f64 = 2_451_545.0;

/// Apparent sunrise/sunset altitude including refraction and the solar disc radius.
const SUNRISE_ALTITUDE_DEGREES: f64 = -0.833;

/// Samples used to average solar geometry over the preceding hour.
const BACKWARDS_SUBSAMPLES: usize = 4;

fn sin_deg(x: f64) -> f64 {
    x.to_radians().sin()
}

fn cos_deg(x: f64) -> f64 {
    x.to_radians().cos()
}

/// Sunrise and sunset per local day, as unix timestamps. `None` during polar day or night.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiseSet {
    pub rise: Vec<Option<i64>>,
    pub set: Vec<Option<i64>>,
}

impl RiseSet {
    /// Sunrise equation evaluated for every day of a daily-stepped axis. Local days are
    /// determined with `utc_offset_seconds`.
    pub fn calculate(range: &TimeAxis, lat: f32, lon: f32, utc_offset_seconds: i32) -> Self {
        let lat = lat as f64;
        let lon = lon as f64;
        let mut rise = Vec::with_capacity(range.count());
        let mut set = Vec::with_capacity(range.count());

        for timestamp in range.timestamps() {
            let local_day = (timestamp + utc_offset_seconds as i64).div_euclid(DAILY_SECONDS);
            // Julian day number at local noon
            let n = local_day as f64 + UNIX_EPOCH_JULIAN_DAY + 0.5 - J2000_JULIAN_DAY;
            let mean_solar_time = n - lon / 360.0;
            let anomaly = (357.5291 + 0.985_600_28 * mean_solar_time).rem_euclid(360.0);
            let center = 1.9148 * sin_deg(anomaly)
                + 0.02 * sin_deg(2.0 * anomaly)
                + 0.0003 * sin_deg(3.0 * anomaly);
            let ecliptic_longitude = (anomaly + center + 180.0 + 102.9372).rem_euclid(360.0);
            let transit = J2000_JULIAN_DAY + mean_solar_time + 0.0053 * sin_deg(anomaly)
                - 0.0069 * sin_deg(2.0 * ecliptic_longitude);
            let sin_declination = sin_deg(ecliptic_longitude) * sin_deg(23.4397);
            let cos_declination = (1.0 - sin_declination * sin_declination).sqrt();
            let cos_hour_angle = (sin_deg(SUNRISE_ALTITUDE_DEGREES)
                - sin_deg(lat) * sin_declination)
                / (cos_deg(lat) * cos_declination);

            if !(-1.0..=1.0).contains(&cos_hour_angle) {
                rise.push(None);
                set.push(None);
                continue;
            }
            let hour_angle = cos_hour_angle.acos().to_degrees();
            let to_unix = |julian: f64| ((julian - UNIX_EPOCH_JULIAN_DAY) * 86400.0).round() as i64;
            rise.push(Some(to_unix(transit - hour_angle / 360.0)));
            set.push(Some(to_unix(transit + hour_angle / 360.0)));
        }
        RiseSet { rise, set }
    }
}

/// Memoizes [`RiseSet`] per `(range, lat, lon, utc offset)` for the lifetime of one request.
#[derive(Debug, Default)]
pub struct RiseSetCache {
    entries: HashMap<(TimeAxis, u32, u32, i32), Arc<RiseSet>>,
}

impl RiseSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_calculate(
        &mut self,
        range: &TimeAxis,
        lat: f32,
        lon: f32,
        utc_offset_seconds: i32,
    ) -> Arc<RiseSet> {
        let key = (*range, lat.to_bits(), lon.to_bits(), utc_offset_seconds);
        match self.entries.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => entry
                .insert(Arc::new(RiseSet::calculate(range, lat, lon, utc_offset_seconds)))
                .clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine of the solar zenith angle at an instant.
pub fn cos_solar_zenith(timestamp: f64, lat: f32, lon: f32) -> f64 {
    let d = (timestamp - J2000_UNIX) / 86400.0;
    let mean_anomaly = (357.529 + 0.985_600_28 * d).rem_euclid(360.0);
    let mean_longitude = (280.459 + 0.985_647_36 * d).rem_euclid(360.0);
    let ecliptic_longitude =
        mean_longitude + 1.915 * sin_deg(mean_anomaly) + 0.020 * sin_deg(2.0 * mean_anomaly);
    let obliquity = 23.439 - 0.000_000_36 * d;
    let right_ascension = (cos_deg(obliquity) * sin_deg(ecliptic_longitude))
        .atan2(cos_deg(ecliptic_longitude))
        .to_degrees();
    let declination = (sin_deg(obliquity) * sin_deg(ecliptic_longitude)).asin();
    // Equation of time in degrees, wrapped to [-180, 180)
    let equation_of_time = (mean_longitude - right_ascension + 180.0).rem_euclid(360.0) - 180.0;

    let utc_hours = timestamp.rem_euclid(86400.0) / 3600.0;
    let hour_angle = (utc_hours - 12.0) * 15.0 + lon as f64 + equation_of_time;
    let lat = (lat as f64).to_radians();
    lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.to_radians().cos()
}

/// Mean of `max(cos zenith, 0)` over the hour preceding each timestamp, matching radiation
/// values that are accumulated backwards.
pub fn cos_zenith_backwards(time: &TimeAxis, lat: f32, lon: f32) -> Vec<f32> {
    let dt = time.dt_seconds as f64;
    let step = dt / BACKWARDS_SUBSAMPLES as f64;
    time.timestamps()
        .map(|t| {
            let sum: f64 = (0..BACKWARDS_SUBSAMPLES)
                .map(|k| {
                    let instant = t as f64 - dt + (k as f64 + 0.5) * step;
                    cos_solar_zenith(instant, lat, lon).max(0.0)
                })
                .sum();
            (sum / BACKWARDS_SUBSAMPLES as f64) as f32
        })
        .collect()
}

/// Top-of-atmosphere shortwave radiation in W/m², averaged over the preceding hour.
pub fn extraterrestrial_radiation_backwards(time: &TimeAxis, lat: f32, lon: f32) -> Vec<f32> {
    cos_zenith_backwards(time, lat, lon)
        .into_iter()
        .zip(time.timestamps())
        .map(|(cosz, t)| {
            let day_of_year = DateTime::from_timestamp(t, 0)
                .map(|d| d.ordinal() as f64)
                .unwrap_or(1.0);
            let eccentricity = 1.0 + 0.033 * (2.0 * PI * day_of_year / 365.0).cos();
            SOLAR_CONSTANT * eccentricity as f32 * cosz
        })
        .collect()
}
