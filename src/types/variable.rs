//! Variable identities: stored base variables, hourly derived variables and daily aggregates.
//!
//! Behaviour keyed by variable (units, dependency tables, reducers) is attached through
//! `match` expressions on these enums.

use crate::types::units::SiUnit;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown variable '{0}'")]
pub struct UnknownVariable(pub String);

/// A variable physically stored in the archive for at least one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Era5Variable {
    Temperature2m,
    Windgusts10m,
    Dewpoint2m,
    CloudcoverLow,
    CloudcoverMid,
    CloudcoverHigh,
    PressureMsl,
    SnowfallWaterEquivalent,
    SoilTemperature0To7cm,
    SoilTemperature7To28cm,
    SoilTemperature28To100cm,
    SoilTemperature100To255cm,
    SoilMoisture0To7cm,
    SoilMoisture7To28cm,
    SoilMoisture28To100cm,
    SoilMoisture100To255cm,
    ShortwaveRadiation,
    Precipitation,
    DirectRadiation,
    WindUComponent10m,
    WindVComponent10m,
    WindUComponent100m,
    WindVComponent100m,
}

impl Era5Variable {
    pub const ALL: [Era5Variable; 23] = [
        Era5Variable::Temperature2m,
        Era5Variable::Windgusts10m,
        Era5Variable::Dewpoint2m,
        Era5Variable::CloudcoverLow,
        Era5Variable::CloudcoverMid,
        Era5Variable::CloudcoverHigh,
        Era5Variable::PressureMsl,
        Era5Variable::SnowfallWaterEquivalent,
        Era5Variable::SoilTemperature0To7cm,
        Era5Variable::SoilTemperature7To28cm,
        Era5Variable::SoilTemperature28To100cm,
        Era5Variable::SoilTemperature100To255cm,
        Era5Variable::SoilMoisture0To7cm,
        Era5Variable::SoilMoisture7To28cm,
        Era5Variable::SoilMoisture28To100cm,
        Era5Variable::SoilMoisture100To255cm,
        Era5Variable::ShortwaveRadiation,
        Era5Variable::Precipitation,
        Era5Variable::DirectRadiation,
        Era5Variable::WindUComponent10m,
        Era5Variable::WindVComponent10m,
        Era5Variable::WindUComponent100m,
        Era5Variable::WindVComponent100m,
    ];

    /// Name used in requests, output columns and archive folders.
    pub fn as_str(&self) -> &'static str {
        match self {
            Era5Variable::Temperature2m => "temperature_2m",
            Era5Variable::Windgusts10m => "windgusts_10m",
            Era5Variable::Dewpoint2m => "dewpoint_2m",
            Era5Variable::CloudcoverLow => "cloudcover_low",
            Era5Variable::CloudcoverMid => "cloudcover_mid",
            Era5Variable::CloudcoverHigh => "cloudcover_high",
            Era5Variable::PressureMsl => "pressure_msl",
            Era5Variable::SnowfallWaterEquivalent => "snowfall_water_equivalent",
            Era5Variable::SoilTemperature0To7cm => "soil_temperature_0_to_7cm",
            Era5Variable::SoilTemperature7To28cm => "soil_temperature_7_to_28cm",
            Era5Variable::SoilTemperature28To100cm => "soil_temperature_28_to_100cm",
            Era5Variable::SoilTemperature100To255cm => "soil_temperature_100_to_255cm",
            Era5Variable::SoilMoisture0To7cm => "soil_moisture_0_to_7cm",
            Era5Variable::SoilMoisture7To28cm => "soil_moisture_7_to_28cm",
            Era5Variable::SoilMoisture28To100cm => "soil_moisture_28_to_100cm",
            Era5Variable::SoilMoisture100To255cm => "soil_moisture_100_to_255cm",
            Era5Variable::ShortwaveRadiation => "shortwave_radiation",
            Era5Variable::Precipitation => "precipitation",
            Era5Variable::DirectRadiation => "direct_radiation",
            Era5Variable::WindUComponent10m => "wind_u_component_10m",
            Era5Variable::WindVComponent10m => "wind_v_component_10m",
            Era5Variable::WindUComponent100m => "wind_u_component_100m",
            Era5Variable::WindVComponent100m => "wind_v_component_100m",
        }
    }

    /// Unit the archive stores the variable in.
    pub fn unit(&self) -> SiUnit {
        match self {
            Era5Variable::Temperature2m
            | Era5Variable::Dewpoint2m
            | Era5Variable::SoilTemperature0To7cm
            | Era5Variable::SoilTemperature7To28cm
            | Era5Variable::SoilTemperature28To100cm
            | Era5Variable::SoilTemperature100To255cm => SiUnit::Celsius,
            Era5Variable::Windgusts10m
            | Era5Variable::WindUComponent10m
            | Era5Variable::WindVComponent10m
            | Era5Variable::WindUComponent100m
            | Era5Variable::WindVComponent100m => SiUnit::MetersPerSecond,
            Era5Variable::CloudcoverLow
            | Era5Variable::CloudcoverMid
            | Era5Variable::CloudcoverHigh => {
                SiUnit::Percent
            }
            Era5Variable::PressureMsl => SiUnit::Hectopascal,
            Era5Variable::SnowfallWaterEquivalent | Era5Variable::Precipitation => {
                SiUnit::Millimeter
            }
            Era5Variable::SoilMoisture0To7cm
            | Era5Variable::SoilMoisture7To28cm
            | Era5Variable::SoilMoisture28To100cm
            | Era5Variable::SoilMoisture100To255cm => SiUnit::CubicMeterPerCubicMeter,
            Era5Variable::ShortwaveRadiation | Era5Variable::DirectRadiation => {
                SiUnit::WattPerSquareMeter
            }
        }
    }

    /// Soil moisture differs systematically between ERA5 and ERA5-Land, so mixing them needs
    /// a bias offset to stay continuous.
    pub fn requires_offset_correction_for_mixing(&self) -> bool {
        matches!(
            self,
            Era5Variable::SoilMoisture0To7cm
                | Era5Variable::SoilMoisture7To28cm
                | Era5Variable::SoilMoisture28To100cm
                | Era5Variable::SoilMoisture100To255cm
        )
    }
}

/// Hourly variables computed from one or more base variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Era5VariableDerived {
    ApparentTemperature,
    Relativehumidity2m,
    Windspeed10m,
    Winddirection10m,
    Windspeed100m,
    Winddirection100m,
    VaporPressureDeficit,
    DiffuseRadiation,
    SurfacePressure,
    Snowfall,
    Rain,
    Et0FaoEvapotranspiration,
    Cloudcover,
    DirectNormalIrradiance,
    Weathercode,
}

impl Era5VariableDerived {
    pub const ALL: [Era5VariableDerived; 15] = [
        Era5VariableDerived::ApparentTemperature,
        Era5VariableDerived::Relativehumidity2m,
        Era5VariableDerived::Windspeed10m,
        Era5VariableDerived::Winddirection10m,
        Era5VariableDerived::Windspeed100m,
        Era5VariableDerived::Winddirection100m,
        Era5VariableDerived::VaporPressureDeficit,
        Era5VariableDerived::DiffuseRadiation,
        Era5VariableDerived::SurfacePressure,
        Era5VariableDerived::Snowfall,
        Era5VariableDerived::Rain,
        Era5VariableDerived::Et0FaoEvapotranspiration,
        Era5VariableDerived::Cloudcover,
        Era5VariableDerived::DirectNormalIrradiance,
        Era5VariableDerived::Weathercode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Era5VariableDerived::ApparentTemperature => "apparent_temperature",
            Era5VariableDerived::Relativehumidity2m => "relativehumidity_2m",
            Era5VariableDerived::Windspeed10m => "windspeed_10m",
            Era5VariableDerived::Winddirection10m => "winddirection_10m",
            Era5VariableDerived::Windspeed100m => "windspeed_100m",
            Era5VariableDerived::Winddirection100m => "winddirection_100m",
            Era5VariableDerived::VaporPressureDeficit => "vapor_pressure_deficit",
            Era5VariableDerived::DiffuseRadiation => "diffuse_radiation",
            Era5VariableDerived::SurfacePressure => "surface_pressure",
            Era5VariableDerived::Snowfall => "snowfall",
            Era5VariableDerived::Rain => "rain",
            Era5VariableDerived::Et0FaoEvapotranspiration => "et0_fao_evapotranspiration",
            Era5VariableDerived::Cloudcover => "cloudcover",
            Era5VariableDerived::DirectNormalIrradiance => "direct_normal_irradiance",
            Era5VariableDerived::Weathercode => "weathercode",
        }
    }

    pub fn unit(&self) -> SiUnit {
        match self {
            Era5VariableDerived::ApparentTemperature => SiUnit::Celsius,
            Era5VariableDerived::Relativehumidity2m | Era5VariableDerived::Cloudcover => {
                SiUnit::Percent
            }
            Era5VariableDerived::Windspeed10m | Era5VariableDerived::Windspeed100m => {
                SiUnit::MetersPerSecond
            }
            Era5VariableDerived::Winddirection10m | Era5VariableDerived::Winddirection100m => {
                SiUnit::DegreeDirection
            }
            Era5VariableDerived::VaporPressureDeficit => SiUnit::Kilopascal,
            Era5VariableDerived::DiffuseRadiation | Era5VariableDerived::DirectNormalIrradiance => {
                SiUnit::WattPerSquareMeter
            }
            Era5VariableDerived::SurfacePressure => SiUnit::Hectopascal,
            Era5VariableDerived::Snowfall => SiUnit::Centimeter,
            Era5VariableDerived::Rain | Era5VariableDerived::Et0FaoEvapotranspiration => {
                SiUnit::Millimeter
            }
            Era5VariableDerived::Weathercode => SiUnit::WmoCode,
        }
    }
}

/// Anything that can be requested in the `hourly` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HourlyVariable {
    Base(Era5Variable),
    Derived(Era5VariableDerived),
}

impl HourlyVariable {
    pub fn as_str(&self) -> &'static str {
        match self {
            HourlyVariable::Base(v) => v.as_str(),
            HourlyVariable::Derived(v) => v.as_str(),
        }
    }
}

impl From<Era5Variable> for HourlyVariable {
    fn from(value: Era5Variable) -> Self {
        HourlyVariable::Base(value)
    }
}

impl From<Era5VariableDerived> for HourlyVariable {
    fn from(value: Era5VariableDerived) -> Self {
        HourlyVariable::Derived(value)
    }
}

/// Daily aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DailyVariable {
    Weathercode,
    Temperature2mMax,
    Temperature2mMin,
    ApparentTemperatureMax,
    ApparentTemperatureMin,
    PrecipitationSum,
    SnowfallSum,
    RainSum,
    ShortwaveRadiationSum,
    Windspeed10mMax,
    Windgusts10mMax,
    Winddirection10mDominant,
    PrecipitationHours,
    Sunrise,
    Sunset,
    Et0FaoEvapotranspiration,
}

impl DailyVariable {
    pub const ALL: [DailyVariable; 16] = [
        DailyVariable::Weathercode,
        DailyVariable::Temperature2mMax,
        DailyVariable::Temperature2mMin,
        DailyVariable::ApparentTemperatureMax,
        DailyVariable::ApparentTemperatureMin,
        DailyVariable::PrecipitationSum,
        DailyVariable::SnowfallSum,
        DailyVariable::RainSum,
        DailyVariable::ShortwaveRadiationSum,
        DailyVariable::Windspeed10mMax,
        DailyVariable::Windgusts10mMax,
        DailyVariable::Winddirection10mDominant,
        DailyVariable::PrecipitationHours,
        DailyVariable::Sunrise,
        DailyVariable::Sunset,
        DailyVariable::Et0FaoEvapotranspiration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DailyVariable::Weathercode => "weathercode",
            DailyVariable::Temperature2mMax => "temperature_2m_max",
            DailyVariable::Temperature2mMin => "temperature_2m_min",
            DailyVariable::ApparentTemperatureMax => "apparent_temperature_max",
            DailyVariable::ApparentTemperatureMin => "apparent_temperature_min",
            DailyVariable::PrecipitationSum => "precipitation_sum",
            DailyVariable::SnowfallSum => "snowfall_sum",
            DailyVariable::RainSum => "rain_sum",
            DailyVariable::ShortwaveRadiationSum => "shortwave_radiation_sum",
            DailyVariable::Windspeed10mMax => "windspeed_10m_max",
            DailyVariable::Windgusts10mMax => "windgusts_10m_max",
            DailyVariable::Winddirection10mDominant => "winddirection_10m_dominant",
            DailyVariable::PrecipitationHours => "precipitation_hours",
            DailyVariable::Sunrise => "sunrise",
            DailyVariable::Sunset => "sunset",
            DailyVariable::Et0FaoEvapotranspiration => "et0_fao_evapotranspiration",
        }
    }

    /// Sunrise and sunset are timestamps computed astronomically, not reduced from data.
    pub fn is_astronomical(&self) -> bool {
        matches!(self, DailyVariable::Sunrise | DailyVariable::Sunset)
    }
}

impl FromStr for Era5Variable {
    type Err = UnknownVariable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Era5Variable::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariable(s.to_string()))
    }
}

impl FromStr for HourlyVariable {
    type Err = UnknownVariable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(base) = s.parse::<Era5Variable>() {
            return Ok(HourlyVariable::Base(base));
        }
        Era5VariableDerived::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .map(HourlyVariable::Derived)
            .ok_or_else(|| UnknownVariable(s.to_string()))
    }
}

impl FromStr for DailyVariable {
    type Err = UnknownVariable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DailyVariable::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariable(s.to_string()))
    }
}

impl fmt::Display for HourlyVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DailyVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HourlyVariable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for DailyVariable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
