use crate::astronomy::{cos_zenith_backwards, extraterrestrial_radiation_backwards};
use crate::meteorology::{self, Et0Inputs};
use crate::readers::{DomainReader, ReaderMetadata};
use crate::store::error::StoreError;
use crate::types::time_axis::TimeAxis;
use crate::types::units::DataAndUnit;
use crate::types::variable::{Era5Variable, Era5VariableDerived, HourlyVariable};
use futures_util::future::try_join_all;
use std::collections::HashMap;

/// Computes requested hourly variables, base or derived, on top of a reader.
pub struct HourlyEngine {
    reader: Box<dyn DomainReader>,
}

/// Dependency series of one derived variable, each aligned with the axis.
struct Inputs(HashMap<Era5Variable, Vec<f32>>);

impl Inputs {
    fn series(&self, variable: Era5Variable) -> &[f32] {
        &self.0[&variable]
    }
}

fn map1(a: &[f32], f: impl Fn(f32) -> f32) -> Vec<f32> {
    a.iter().map(|a| f(*a)).collect()
}

fn map2(a: &[f32], b: &[f32], f: impl Fn(f32, f32) -> f32) -> Vec<f32> {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(a, b)| f(*a, *b)).collect()
}

fn map3(a: &[f32], b: &[f32], c: &[f32], f: impl Fn(f32, f32, f32) -> f32) -> Vec<f32> {
    assert_eq!(a.len(), b.len());
    assert_eq!(a.len(), c.len());
    a.iter()
        .zip(b)
        .zip(c)
        .map(|((a, b), c)| f(*a, *b, *c))
        .collect()
}

impl HourlyEngine {
    pub fn new(reader: Box<dyn DomainReader>) -> Self {
        Self { reader }
    }

    pub fn metadata(&self) -> &ReaderMetadata {
        self.reader.metadata()
    }

    /// Prefetches all `variables` concurrently.
    pub async fn prefetch(
        &self,
        variables: &[Era5Variable],
        time: &TimeAxis,
    ) -> Result<(), StoreError> {
        try_join_all(variables.iter().map(|v| self.reader.prefetch(*v, time))).await?;
        Ok(())
    }

    /// A series of exactly `time.count()` samples, or `None` if any input is absent. Values are
    /// in the archive's units.
    pub async fn get(
        &self,
        variable: HourlyVariable,
        time: &TimeAxis,
    ) -> Result<Option<DataAndUnit>, StoreError> {
        match variable {
            HourlyVariable::Base(v) => Ok(self
                .base(v, time)
                .await?
                .map(|data| DataAndUnit::new(data, v.unit()))),
            HourlyVariable::Derived(v) => self.derived(v, time).await,
        }
    }

    async fn base(
        &self,
        variable: Era5Variable,
        time: &TimeAxis,
    ) -> Result<Option<Vec<f32>>, StoreError> {
        let Some(series) = self.reader.get(variable, time).await? else {
            return Ok(None);
        };
        let mut data = series.data;
        assert!(
            data.len() <= time.count(),
            "{} returned {} samples for an axis of {}",
            variable.as_str(),
            data.len(),
            time.count()
        );
        data.resize(time.count(), f32::NAN);
        Ok(Some(data))
    }

    async fn derived(
        &self,
        variable: Era5VariableDerived,
        time: &TimeAxis,
    ) -> Result<Option<DataAndUnit>, StoreError> {
        let mut inputs = HashMap::new();
        for dependency in variable.dependencies() {
            match self.base(*dependency, time).await? {
                Some(data) => inputs.insert(*dependency, data),
                None => return Ok(None),
            };
        }
        let inputs = Inputs(inputs);
        let data = self.compute(variable, &inputs, time);
        assert_eq!(data.len(), time.count());
        Ok(Some(DataAndUnit::new(data, variable.unit())))
    }

    fn compute(&self, variable: Era5VariableDerived, inputs: &Inputs, time: &TimeAxis) -> Vec<f32> {
        use Era5Variable::*;
        let metadata = self.metadata();
        let elevation = metadata.target_elevation;
        let wind_10m = || {
            map2(
                inputs.series(WindUComponent10m),
                inputs.series(WindVComponent10m),
                meteorology::wind_speed,
            )
        };
        let relative_humidity = || {
            map2(
                inputs.series(Temperature2m),
                inputs.series(Dewpoint2m),
                meteorology::relative_humidity,
            )
        };

        match variable {
            Era5VariableDerived::Windspeed10m => wind_10m(),
            Era5VariableDerived::Winddirection10m => map2(
                inputs.series(WindUComponent10m),
                inputs.series(WindVComponent10m),
                meteorology::wind_direction,
            ),
            Era5VariableDerived::Windspeed100m => map2(
                inputs.series(WindUComponent100m),
                inputs.series(WindVComponent100m),
                meteorology::wind_speed,
            ),
            Era5VariableDerived::Winddirection100m => map2(
                inputs.series(WindUComponent100m),
                inputs.series(WindVComponent100m),
                meteorology::wind_direction,
            ),
            Era5VariableDerived::Relativehumidity2m => relative_humidity(),
            Era5VariableDerived::VaporPressureDeficit => map2(
                inputs.series(Temperature2m),
                inputs.series(Dewpoint2m),
                meteorology::vapor_pressure_deficit,
            ),
            Era5VariableDerived::ApparentTemperature => {
                let rh = relative_humidity();
                let wind = wind_10m();
                let temperature = inputs.series(Temperature2m);
                let shortwave = inputs.series(ShortwaveRadiation);
                assert_eq!(temperature.len(), shortwave.len());
                temperature
                    .iter()
                    .zip(&rh)
                    .zip(&wind)
                    .zip(shortwave)
                    .map(|(((t, rh), ws), sw)| meteorology::apparent_temperature(*t, *rh, *ws, *sw))
                    .collect()
            }
            Era5VariableDerived::DiffuseRadiation => map2(
                inputs.series(ShortwaveRadiation),
                inputs.series(DirectRadiation),
                meteorology::diffuse_radiation,
            ),
            Era5VariableDerived::SurfacePressure => {
                map2(inputs.series(PressureMsl), inputs.series(Temperature2m), |msl, t| {
                    meteorology::surface_pressure(msl, t, elevation)
                })
            }
            Era5VariableDerived::Snowfall => {
                map1(inputs.series(SnowfallWaterEquivalent), meteorology::snowfall_height)
            }
            Era5VariableDerived::Rain => map2(
                inputs.series(Precipitation),
                inputs.series(SnowfallWaterEquivalent),
                meteorology::rain,
            ),
            Era5VariableDerived::Cloudcover => map3(
                inputs.series(CloudcoverLow),
                inputs.series(CloudcoverMid),
                inputs.series(CloudcoverHigh),
                meteorology::cloudcover_total,
            ),
            Era5VariableDerived::DirectNormalIrradiance => {
                let cos_zenith = cos_zenith_backwards(time, metadata.model_lat, metadata.model_lon);
                map2(
                    inputs.series(DirectRadiation),
                    &cos_zenith,
                    meteorology::direct_normal_irradiance,
                )
            }
            Era5VariableDerived::Et0FaoEvapotranspiration => {
                let wind = wind_10m();
                let (lat, lon) = (metadata.model_lat, metadata.model_lon);
                let extraterrestrial = extraterrestrial_radiation_backwards(time, lat, lon);
                let temperature = inputs.series(Temperature2m);
                let dewpoint = inputs.series(Dewpoint2m);
                let shortwave = inputs.series(ShortwaveRadiation);
                assert_eq!(temperature.len(), extraterrestrial.len());
                (0..temperature.len())
                    .map(|i| {
                        meteorology::et0_evapotranspiration(Et0Inputs {
                            temperature: temperature[i],
                            dewpoint: dewpoint[i],
                            windspeed_10m: wind[i],
                            shortwave_radiation: shortwave[i],
                            extraterrestrial_radiation: extraterrestrial[i],
                            elevation,
                        })
                    })
                    .collect()
            }
            Era5VariableDerived::Weathercode => {
                let cloudcover = map3(
                    inputs.series(CloudcoverLow),
                    inputs.series(CloudcoverMid),
                    inputs.series(CloudcoverHigh),
                    meteorology::cloudcover_total,
                );
                let snowfall =
                    map1(inputs.series(SnowfallWaterEquivalent), meteorology::snowfall_height);
                map3(
                    &cloudcover,
                    inputs.series(Precipitation),
                    &snowfall,
                    meteorology::weathercode,
                )
            }
        }
    }
}
