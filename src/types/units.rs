//! Physical units, caller unit preferences and the conversion/rounding applied before output.

use crate::utils::round_to;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiUnit {
    Celsius,
    Fahrenheit,
    MetersPerSecond,
    KilometersPerHour,
    MilesPerHour,
    Knots,
    Millimeter,
    Centimeter,
    Inch,
    Percent,
    Hectopascal,
    Kilopascal,
    WattPerSquareMeter,
    MegajoulesPerSquareMeter,
    DegreeDirection,
    CubicMeterPerCubicMeter,
    Hours,
    WmoCode,
}

impl SiUnit {
    /// Label used in the `*_units` maps of the output.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            SiUnit::Celsius => "°C",
            SiUnit::Fahrenheit => "°F",
            SiUnit::MetersPerSecond => "m/s",
            SiUnit::KilometersPerHour => "km/h",
            SiUnit::MilesPerHour => "mp/h",
            SiUnit::Knots => "kn",
            SiUnit::Millimeter => "mm",
            SiUnit::Centimeter => "cm",
            SiUnit::Inch => "inch",
            SiUnit::Percent => "%",
            SiUnit::Hectopascal => "hPa",
            SiUnit::Kilopascal => "kPa",
            SiUnit::WattPerSquareMeter => "W/m²",
            SiUnit::MegajoulesPerSquareMeter => "MJ/m²",
            SiUnit::DegreeDirection => "°",
            SiUnit::CubicMeterPerCubicMeter => "m³/m³",
            SiUnit::Hours => "h",
            SiUnit::WmoCode => "wmo code",
        }
    }

    /// Decimal places kept on output.
    pub fn significant_digits(&self) -> i32 {
        match self {
            SiUnit::Celsius | SiUnit::Fahrenheit => 1,
            SiUnit::KilometersPerHour | SiUnit::MilesPerHour | SiUnit::Knots => 1,
            SiUnit::MetersPerSecond => 2,
            SiUnit::Millimeter | SiUnit::Centimeter => 2,
            SiUnit::Inch => 3,
            SiUnit::Percent => 0,
            SiUnit::Hectopascal => 1,
            SiUnit::Kilopascal => 2,
            SiUnit::WattPerSquareMeter => 1,
            SiUnit::MegajoulesPerSquareMeter => 2,
            SiUnit::DegreeDirection => 0,
            SiUnit::CubicMeterPerCubicMeter => 3,
            SiUnit::Hours => 0,
            SiUnit::WmoCode => 0,
        }
    }
}

impl fmt::Display for SiUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl Serialize for SiUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.abbreviation())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindspeedUnit {
    #[default]
    Kmh,
    Ms,
    Mph,
    Kn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipitationUnit {
    #[default]
    Mm,
    Inch,
}

/// The caller's unit system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnitOptions {
    pub temperature: TemperatureUnit,
    pub windspeed: WindspeedUnit,
    pub precipitation: PrecipitationUnit,
}

/// A series aligned with a time axis, together with its unit. Missing samples are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct DataAndUnit {
    pub data: Vec<f32>,
    pub unit: SiUnit,
}

impl DataAndUnit {
    pub fn new(data: Vec<f32>, unit: SiUnit) -> Self {
        Self { data, unit }
    }

    /// Converts into the caller's unit system. Units without a preference pass through.
    pub fn convert(self, options: &UnitOptions) -> Self {
        let (factor, offset, unit) = match (self.unit, options) {
            (
                SiUnit::Celsius,
                UnitOptions {
                    temperature: TemperatureUnit::Fahrenheit,
                    ..
                },
            ) => (9.0 / 5.0, 32.0, SiUnit::Fahrenheit),
            (SiUnit::MetersPerSecond, UnitOptions { windspeed, .. }) => match windspeed {
                WindspeedUnit::Ms => return self,
                WindspeedUnit::Kmh => (3.6, 0.0, SiUnit::KilometersPerHour),
                WindspeedUnit::Mph => (2.23694, 0.0, SiUnit::MilesPerHour),
                WindspeedUnit::Kn => (1.94384, 0.0, SiUnit::Knots),
            },
            (
                SiUnit::Millimeter,
                UnitOptions {
                    precipitation: PrecipitationUnit::Inch,
                    ..
                },
            ) => (1.0 / 25.4, 0.0, SiUnit::Inch),
            (
                SiUnit::Centimeter,
                UnitOptions {
                    precipitation: PrecipitationUnit::Inch,
                    ..
                },
            ) => (1.0 / 2.54, 0.0, SiUnit::Inch),
            _ => return self,
        };
        let mut data = self.data;
        for value in data.iter_mut() {
            *value = *value * factor + offset;
        }
        Self { data, unit }
    }

    /// Rounds every sample to the unit's decimal places.
    pub fn round(mut self) -> Self {
        let digits = self.unit.significant_digits();
        for value in self.data.iter_mut() {
            *value = round_to(*value, digits);
        }
        self
    }

    pub fn convert_and_round(self, options: &UnitOptions) -> Self {
        self.convert(options).round()
    }
}
