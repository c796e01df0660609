//! Closed-form meteorological formulas, evaluated one sample at a time.
//!
//! Units follow the archive: temperatures in °C, wind in m/s, pressure in hPa, radiation in
//! W/m² (hourly means), precipitation and snow water equivalent in mm.

/// Fraction of incoming shortwave radiation absorbed by a human body.
const ABSORBED_RADIATION_FRACTION: f32 = 0.1;

/// Stefan-Boltzmann constant in MJ/(K⁴·m²·h).
const STEFAN_BOLTZMANN_HOURLY: f32 = 2.043e-10;

/// Snow depth per mm of water equivalent, in cm.
const SNOW_DENSITY_FACTOR: f32 = 0.7;

/// Below this zenith cosine, direct normal irradiance is reported as 0.
const MIN_COS_ZENITH_DNI: f32 = 0.017;

/// Wind U component from speed and meteorological direction (degrees, blowing from).
pub fn u_wind(speed: f32, direction: f32) -> f32 {
    -speed * direction.to_radians().sin()
}

/// Wind V component from speed and meteorological direction (degrees, blowing from).
pub fn v_wind(speed: f32, direction: f32) -> f32 {
    -speed * direction.to_radians().cos()
}

pub fn wind_speed(u: f32, v: f32) -> f32 {
    (u * u + v * v).sqrt()
}

/// Direction the wind is blowing from, in degrees [0, 360).
pub fn wind_direction(u: f32, v: f32) -> f32 {
    (u.atan2(v).to_degrees() + 180.0).rem_euclid(360.0)
}

/// Saturation vapour pressure in hPa (Magnus formula).
fn saturation_vapour_pressure_hpa(temperature: f32) -> f32 {
    6.1094 * ((17.625 * temperature) / (temperature + 243.04)).exp()
}

/// Saturation vapour pressure in kPa (Tetens, as used by FAO-56).
fn saturation_vapour_pressure_kpa(temperature: f32) -> f32 {
    0.6108 * ((17.27 * temperature) / (temperature + 237.3)).exp()
}

/// Relative humidity in %, clamped to [0, 100].
pub fn relative_humidity(temperature: f32, dewpoint: f32) -> f32 {
    let rh = 100.0 * saturation_vapour_pressure_hpa(dewpoint)
        / saturation_vapour_pressure_hpa(temperature);
    if rh.is_nan() {
        return rh;
    }
    rh.clamp(0.0, 100.0)
}

/// Vapour pressure deficit in kPa.
pub fn vapor_pressure_deficit(temperature: f32, dewpoint: f32) -> f32 {
    let vpd =
        saturation_vapour_pressure_kpa(temperature) - saturation_vapour_pressure_kpa(dewpoint);
    if vpd.is_nan() {
        return vpd;
    }
    vpd.max(0.0)
}

/// Steadman apparent temperature including the effect of solar radiation.
///
/// `wind_speed` in m/s, `shortwave_radiation` in W/m².
pub fn apparent_temperature(
    temperature: f32,
    relative_humidity: f32,
    wind_speed: f32,
    shortwave_radiation: f32,
) -> f32 {
    let vapour_pressure =
        relative_humidity / 100.0 * 6.105 * ((17.27 * temperature) / (237.7 + temperature)).exp();
    let absorbed = ABSORBED_RADIATION_FRACTION * shortwave_radiation;
    temperature + 0.348 * vapour_pressure - 0.70 * wind_speed
        + 0.70 * absorbed / (wind_speed + 10.0)
        - 4.25
}

/// Pressure at `elevation` (m) from mean-sea-level pressure, in hPa.
pub fn surface_pressure(pressure_msl: f32, temperature: f32, elevation: f32) -> f32 {
    let elevation = if elevation.is_nan() { 0.0 } else { elevation };
    let lapse = 0.0065 * elevation;
    pressure_msl * (1.0 - lapse / (temperature + lapse + 273.15)).powf(5.257)
}

/// Share of shortwave radiation that is not direct, in W/m².
pub fn diffuse_radiation(shortwave: f32, direct: f32) -> f32 {
    (shortwave - direct).max(0.0)
}

/// Snowfall height in cm from snow water equivalent in mm.
pub fn snowfall_height(snowfall_water_equivalent: f32) -> f32 {
    snowfall_water_equivalent * SNOW_DENSITY_FACTOR
}

/// Liquid share of precipitation, in mm.
pub fn rain(precipitation: f32, snowfall_water_equivalent: f32) -> f32 {
    (precipitation - snowfall_water_equivalent).max(0.0)
}

/// Total cloud cover in % from three layers, assuming random overlap.
pub fn cloudcover_total(low: f32, mid: f32, high: f32) -> f32 {
    100.0 * (1.0 - (1.0 - low / 100.0) * (1.0 - mid / 100.0) * (1.0 - high / 100.0))
}

/// Direct radiation on a plane normal to the sun, in W/m².
pub fn direct_normal_irradiance(direct: f32, cos_zenith: f32) -> f32 {
    if direct.is_nan() {
        return direct;
    }
    if cos_zenith <= MIN_COS_ZENITH_DNI {
        return 0.0;
    }
    (direct / cos_zenith).min(crate::astronomy::SOLAR_CONSTANT)
}

/// Inputs for [`et0_evapotranspiration`].
#[derive(Debug, Clone, Copy)]
pub struct Et0Inputs {
    pub temperature: f32,
    pub dewpoint: f32,
    /// At 10 m, in m/s.
    pub windspeed_10m: f32,
    /// Hourly mean, W/m².
    pub shortwave_radiation: f32,
    /// Hourly mean, W/m².
    pub extraterrestrial_radiation: f32,
    /// Metres; NaN is treated as sea level.
    pub elevation: f32,
}

/// FAO-56 Penman-Monteith hourly reference evapotranspiration in mm.
pub fn et0_evapotranspiration(inputs: Et0Inputs) -> f32 {
    let Et0Inputs {
        temperature,
        dewpoint,
        windspeed_10m,
        shortwave_radiation,
        extraterrestrial_radiation,
        elevation,
    } = inputs;
    let elevation = if elevation.is_nan() { 0.0 } else { elevation };

    let windspeed_2m = windspeed_10m * 4.87 / (67.8f32 * 10.0 - 5.42).ln();
    let es = saturation_vapour_pressure_kpa(temperature);
    let ea = saturation_vapour_pressure_kpa(dewpoint);
    let slope = 4098.0 * es / (temperature + 237.3).powi(2);
    let pressure = 101.3 * ((293.0 - 0.0065 * elevation) / 293.0).powf(5.26);
    let psychrometric = 0.000665 * pressure;

    // W/m² hourly mean to MJ/m² per hour
    let rs = shortwave_radiation * 0.0036;
    let ra = extraterrestrial_radiation * 0.0036;
    let rso = (0.75 + 2e-5 * elevation) * ra;
    let relative_shortwave = if rso > 0.0 {
        (rs / rso).clamp(0.3, 1.0)
    } else {
        0.5
    };
    let net_shortwave = (1.0 - 0.23) * rs;
    let net_longwave = STEFAN_BOLTZMANN_HOURLY
        * (temperature + 273.16).powi(4)
        * (0.34 - 0.14 * ea.max(0.0).sqrt())
        * (1.35 * relative_shortwave - 0.35);
    let net_radiation = net_shortwave - net_longwave;
    let soil_heat_flux = if rs > 0.0 {
        0.1 * net_radiation
    } else {
        0.5 * net_radiation
    };

    let numerator = 0.408 * slope * (net_radiation - soil_heat_flux)
        + psychrometric * (37.0 / (temperature + 273.0)) * windspeed_2m * (es - ea);
    let denominator = slope + psychrometric * (1.0 + 0.34 * windspeed_2m);
    let et0 = numerator / denominator;
    if et0.is_nan() {
        return et0;
    }
    et0.max(0.0)
}

/// WMO weather code from snowfall (cm), precipitation (mm) and total cloud cover (%).
pub fn weathercode(cloudcover: f32, precipitation: f32, snowfall: f32) -> f32 {
    if cloudcover.is_nan() || precipitation.is_nan() || snowfall.is_nan() {
        return f32::NAN;
    }
    if snowfall >= 0.1 {
        return match snowfall {
            s if s >= 2.0 => 75.0,
            s if s >= 0.8 => 73.0,
            _ => 71.0,
        };
    }
    if precipitation >= 0.1 {
        return match precipitation {
            p if p >= 7.6 => 65.0,
            p if p >= 2.5 => 63.0,
            p if p >= 0.5 => 61.0,
            _ => 51.0,
        };
    }
    match cloudcover {
        c if c >= 85.0 => 3.0,
        c if c >= 50.0 => 2.0,
        c if c >= 20.0 => 1.0,
        _ => 0.0,
    }
}
