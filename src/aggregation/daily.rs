use crate::aggregation::hourly::HourlyEngine;
use crate::aggregation::window::WindowedReduce;
use crate::meteorology::{u_wind, v_wind, wind_direction};
use crate::store::error::StoreError;
use crate::types::time_axis::{TimeAxis, DAILY_SECONDS, HOURLY_SECONDS};
use crate::types::units::{DataAndUnit, SiUnit, UnitOptions};
use crate::types::variable::{DailyVariable, Era5Variable, Era5VariableDerived, HourlyVariable};
use crate::utils::round_to;

const HOURS_PER_DAY: usize = (DAILY_SECONDS / HOURLY_SECONDS) as usize;

/// W/m² hourly mean to MJ/m² per hour.
const WATT_HOURS_TO_MEGAJOULES: f32 = 0.0036;

/// Precipitation above this many mm counts as a wet hour.
const PRECIPITATION_HOUR_THRESHOLD: f32 = 0.001;

const SUM_DIGITS: i32 = 2;

fn rounded_sum(series: DataAndUnit) -> DataAndUnit {
    let data = series
        .data
        .sum_by(HOURS_PER_DAY)
        .into_iter()
        .map(|v| round_to(v, SUM_DIGITS))
        .collect();
    DataAndUnit::new(data, series.unit)
}

fn reduce(series: DataAndUnit, reducer: impl Fn(&[f32], usize) -> Vec<f32>) -> DataAndUnit {
    DataAndUnit::new(reducer(&series.data, HOURS_PER_DAY), series.unit).round()
}

impl HourlyEngine {
    /// One value per day of `time` (a daily axis), or `None` if an input series is absent.
    ///
    /// Hourly inputs are converted to the caller's units before the reduction and rounded after
    /// it. Sunrise and sunset are not data-driven and always give `None` here.
    pub async fn get_daily(
        &self,
        variable: DailyVariable,
        options: &UnitOptions,
        time: &TimeAxis,
    ) -> Result<Option<DataAndUnit>, StoreError> {
        let hourly = time.with_dt(HOURLY_SECONDS);
        let daily = match variable {
            DailyVariable::Temperature2mMax => self
                .converted(Era5Variable::Temperature2m.into(), options, &hourly)
                .await?
                .map(|s| reduce(s, <[f32] as WindowedReduce>::max_by)),
            DailyVariable::Temperature2mMin => self
                .converted(Era5Variable::Temperature2m.into(), options, &hourly)
                .await?
                .map(|s| reduce(s, <[f32] as WindowedReduce>::min_by)),
            DailyVariable::ApparentTemperatureMax => self
                .converted(Era5VariableDerived::ApparentTemperature.into(), options, &hourly)
                .await?
                .map(|s| reduce(s, <[f32] as WindowedReduce>::max_by)),
            DailyVariable::ApparentTemperatureMin => self
                .converted(Era5VariableDerived::ApparentTemperature.into(), options, &hourly)
                .await?
                .map(|s| reduce(s, <[f32] as WindowedReduce>::min_by)),
            DailyVariable::PrecipitationSum => self
                .converted(Era5Variable::Precipitation.into(), options, &hourly)
                .await?
                .map(rounded_sum),
            DailyVariable::SnowfallSum => self
                .converted(Era5VariableDerived::Snowfall.into(), options, &hourly)
                .await?
                .map(rounded_sum),
            DailyVariable::RainSum => self
                .converted(Era5VariableDerived::Rain.into(), options, &hourly)
                .await?
                .map(rounded_sum),
            DailyVariable::Et0FaoEvapotranspiration => self
                .converted(Era5VariableDerived::Et0FaoEvapotranspiration.into(), options, &hourly)
                .await?
                .map(rounded_sum),
            DailyVariable::ShortwaveRadiationSum => self
                .get(Era5Variable::ShortwaveRadiation.into(), &hourly)
                .await?
                .map(|s| {
                    let energy = s.data.iter().map(|v| v * WATT_HOURS_TO_MEGAJOULES).collect();
                    rounded_sum(DataAndUnit::new(energy, SiUnit::MegajoulesPerSquareMeter))
                }),
            DailyVariable::Windspeed10mMax => self
                .converted(Era5VariableDerived::Windspeed10m.into(), options, &hourly)
                .await?
                .map(|s| reduce(s, <[f32] as WindowedReduce>::max_by)),
            DailyVariable::Windgusts10mMax => self
                .converted(Era5Variable::Windgusts10m.into(), options, &hourly)
                .await?
                .map(|s| reduce(s, <[f32] as WindowedReduce>::max_by)),
            DailyVariable::Winddirection10mDominant => self.dominant_direction(&hourly).await?,
            DailyVariable::PrecipitationHours => self
                .get(Era5Variable::Precipitation.into(), &hourly)
                .await?
                .map(|s| {
                    let hours = s.data.count_above_by(HOURS_PER_DAY, PRECIPITATION_HOUR_THRESHOLD);
                    DataAndUnit::new(hours, SiUnit::Hours)
                }),
            DailyVariable::Weathercode => self
                .get(Era5VariableDerived::Weathercode.into(), &hourly)
                .await?
                .map(|s| reduce(s, <[f32] as WindowedReduce>::max_by)),
            DailyVariable::Sunrise | DailyVariable::Sunset => None,
        };
        if let Some(daily) = &daily {
            assert_eq!(daily.data.len(), time.count());
        }
        Ok(daily)
    }

    async fn converted(
        &self,
        variable: HourlyVariable,
        options: &UnitOptions,
        time: &TimeAxis,
    ) -> Result<Option<DataAndUnit>, StoreError> {
        Ok(self.get(variable, time).await?.map(|s| s.convert(options)))
    }

    /// Vector mean of hourly wind: components are summed per day and turned back into a
    /// direction, so calm hours carry no weight.
    async fn dominant_direction(&self, time: &TimeAxis) -> Result<Option<DataAndUnit>, StoreError> {
        let Some(speed) = self.get(Era5VariableDerived::Windspeed10m.into(), time).await? else {
            return Ok(None);
        };
        let direction = self.get(Era5VariableDerived::Winddirection10m.into(), time).await?;
        let Some(direction) = direction else {
            return Ok(None);
        };
        Ok(Some(
            DataAndUnit::new(
                dominant_direction(&speed.data, &direction.data, HOURS_PER_DAY),
                SiUnit::DegreeDirection,
            )
            .round(),
        ))
    }
}

fn dominant_direction(speed: &[f32], direction: &[f32], n: usize) -> Vec<f32> {
    assert_eq!(speed.len(), direction.len());
    let u: Vec<f32> = speed.iter().zip(direction).map(|(s, d)| u_wind(*s, *d)).collect();
    let v: Vec<f32> = speed.iter().zip(direction).map(|(s, d)| v_wind(*s, *d)).collect();
    u.sum_by(n)
        .into_iter()
        .zip(v.sum_by(n))
        .map(|(u, v)| wind_direction(u, v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::hourly::tests::{day, SOLSTICE};
    use crate::readers::testing::MemoryReader;
    use crate::types::units::{PrecipitationUnit, TemperatureUnit, WindspeedUnit};

    fn daily_axis(days: i64) -> TimeAxis {
        day(days).with_dt(DAILY_SECONDS)
    }

    fn engine(reader: MemoryReader) -> HourlyEngine {
        HourlyEngine::new(Box::new(reader))
    }

    #[tokio::test]
    async fn test_temperature_extremes() -> Result<(), StoreError> {
        let temperature: Vec<f32> = (0..48).map(|h| h as f32 * 0.5).collect();
        let e = engine(MemoryReader::new("era5").with(Era5Variable::Temperature2m, temperature));
        let options = UnitOptions::default();
        let max = e
            .get_daily(DailyVariable::Temperature2mMax, &options, &daily_axis(2))
            .await?
            .unwrap();
        let min = e
            .get_daily(DailyVariable::Temperature2mMin, &options, &daily_axis(2))
            .await?
            .unwrap();
        assert_eq!(max.data, vec![11.5, 23.5]);
        assert_eq!(min.data, vec![0.0, 12.0]);
        assert_eq!(max.unit, SiUnit::Celsius);
        Ok(())
    }

    #[tokio::test]
    async fn test_precipitation_sum_and_hours() -> Result<(), StoreError> {
        let mut precipitation = vec![0.0f32; 24];
        precipitation[3] = 0.1;
        precipitation[4] = 0.2;
        precipitation[5] = 0.0005;
        let e = engine(MemoryReader::new("era5").with(Era5Variable::Precipitation, precipitation));
        let options = UnitOptions::default();
        let sum = e
            .get_daily(DailyVariable::PrecipitationSum, &options, &daily_axis(1))
            .await?
            .unwrap();
        assert_eq!(sum.data, vec![0.3]);
        assert_eq!(sum.unit, SiUnit::Millimeter);
        let hours = e
            .get_daily(DailyVariable::PrecipitationHours, &options, &daily_axis(1))
            .await?
            .unwrap();
        assert_eq!(hours.data, vec![2.0]);
        assert_eq!(hours.unit, SiUnit::Hours);
        Ok(())
    }

    #[tokio::test]
    async fn test_sum_commutes_with_conversion() -> Result<(), StoreError> {
        let precipitation: Vec<f32> = (0..24).map(|h| 0.13 * h as f32).collect();
        let reader =
            MemoryReader::new("era5").with(Era5Variable::Precipitation, precipitation.clone());
        let e = engine(reader);
        let inch = UnitOptions {
            precipitation: PrecipitationUnit::Inch,
            ..UnitOptions::default()
        };
        let converted_first = e
            .get_daily(DailyVariable::PrecipitationSum, &inch, &daily_axis(1))
            .await?
            .unwrap();
        let summed_first = precipitation.iter().sum::<f32>() / 25.4;
        assert_eq!(converted_first.unit, SiUnit::Inch);
        assert!((converted_first.data[0] - summed_first).abs() <= 0.005);
        Ok(())
    }

    #[tokio::test]
    async fn test_nan_hour_makes_sum_missing() -> Result<(), StoreError> {
        let mut precipitation = vec![0.1f32; 48];
        precipitation[30] = f32::NAN;
        let e = engine(MemoryReader::new("era5").with(Era5Variable::Precipitation, precipitation));
        let sum = e
            .get_daily(DailyVariable::PrecipitationSum, &UnitOptions::default(), &daily_axis(2))
            .await?
            .unwrap();
        assert_eq!(sum.data[0], 2.4);
        assert!(sum.data[1].is_nan());
        Ok(())
    }

    #[tokio::test]
    async fn test_shortwave_energy_sum() -> Result<(), StoreError> {
        let reader =
            MemoryReader::new("era5").constant(Era5Variable::ShortwaveRadiation, 250.0, 24);
        let e = engine(reader);
        let sum = e
            .get_daily(
                DailyVariable::ShortwaveRadiationSum,
                &UnitOptions::default(),
                &daily_axis(1),
            )
            .await?
            .unwrap();
        assert_eq!(sum.unit, SiUnit::MegajoulesPerSquareMeter);
        assert!((sum.data[0] - 21.6).abs() < 1e-4);
        Ok(())
    }

    #[tokio::test]
    async fn test_windspeed_max_in_caller_units() -> Result<(), StoreError> {
        let mut u = vec![0.0f32; 24];
        u[12] = 10.0;
        let e = engine(
            MemoryReader::new("era5")
                .with(Era5Variable::WindUComponent10m, u)
                .constant(Era5Variable::WindVComponent10m, 0.0, 24),
        );
        let kmh = e
            .get_daily(DailyVariable::Windspeed10mMax, &UnitOptions::default(), &daily_axis(1))
            .await?
            .unwrap();
        assert_eq!(kmh.unit, SiUnit::KilometersPerHour);
        assert_eq!(kmh.data, vec![36.0]);

        let knots = UnitOptions {
            windspeed: WindspeedUnit::Kn,
            temperature: TemperatureUnit::Fahrenheit,
            ..UnitOptions::default()
        };
        let kn = e
            .get_daily(DailyVariable::Windspeed10mMax, &knots, &daily_axis(1))
            .await?
            .unwrap();
        assert_eq!(kn.data, vec![19.4]);
        Ok(())
    }

    #[test]
    fn test_vector_mean_direction() {
        let mut speed = vec![0.0f32; 24];
        let mut direction = vec![0.0f32; 24];
        speed[0] = 2.0;
        speed[1] = 4.0;
        direction[1] = 90.0;
        let dominant = dominant_direction(&speed, &direction, 24);
        assert!((dominant[0] - 63.43).abs() < 0.01, "{:?}", dominant);
    }

    #[tokio::test]
    async fn test_dominant_direction_from_components() -> Result<(), StoreError> {
        // Wind from the east all day
        let e = engine(
            MemoryReader::new("era5")
                .constant(Era5Variable::WindUComponent10m, -3.0, 24)
                .constant(Era5Variable::WindVComponent10m, 0.0, 24),
        );
        let dominant = e
            .get_daily(
                DailyVariable::Winddirection10mDominant,
                &UnitOptions::default(),
                &daily_axis(1),
            )
            .await?
            .unwrap();
        assert_eq!(dominant.data, vec![90.0]);
        assert_eq!(dominant.unit, SiUnit::DegreeDirection);
        Ok(())
    }

    #[tokio::test]
    async fn test_absent_input_and_astronomical_variables() -> Result<(), StoreError> {
        let e = engine(MemoryReader::new("era5"));
        let options = UnitOptions::default();
        for variable in [
            DailyVariable::RainSum,
            DailyVariable::Weathercode,
            DailyVariable::Sunrise,
            DailyVariable::Sunset,
        ] {
            assert!(e.get_daily(variable, &options, &daily_axis(1)).await?.is_none());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_every_daily_variable_has_one_value_per_day() -> Result<(), StoreError> {
        let mut reader = MemoryReader::new("era5");
        for v in Era5Variable::ALL {
            reader = reader.constant(v, 1.0, 72);
        }
        let e = engine(reader);
        let time = daily_axis(3);
        assert_eq!(time.start, SOLSTICE);
        for v in DailyVariable::ALL.into_iter().filter(|v| !v.is_astronomical()) {
            let out = e.get_daily(v, &UnitOptions::default(), &time).await?.unwrap();
            assert_eq!(out.data.len(), 3, "{v}");
        }
        Ok(())
    }
}
