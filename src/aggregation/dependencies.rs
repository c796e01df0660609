use crate::types::variable::{DailyVariable, Era5Variable, Era5VariableDerived, HourlyVariable};

use Era5Variable::*;

impl Era5VariableDerived {
    /// Base variables the formula reads.
    pub fn dependencies(&self) -> &'static [Era5Variable] {
        match self {
            Era5VariableDerived::ApparentTemperature => &[
                Temperature2m,
                Dewpoint2m,
                WindUComponent10m,
                WindVComponent10m,
                ShortwaveRadiation,
            ],
            Era5VariableDerived::Relativehumidity2m | Era5VariableDerived::VaporPressureDeficit => {
                &[Temperature2m, Dewpoint2m]
            }
            Era5VariableDerived::Windspeed10m | Era5VariableDerived::Winddirection10m => {
                &[WindUComponent10m, WindVComponent10m]
            }
            Era5VariableDerived::Windspeed100m | Era5VariableDerived::Winddirection100m => {
                &[WindUComponent100m, WindVComponent100m]
            }
            Era5VariableDerived::DiffuseRadiation => &[ShortwaveRadiation, DirectRadiation],
            Era5VariableDerived::SurfacePressure => &[PressureMsl, Temperature2m],
            Era5VariableDerived::Snowfall => &[SnowfallWaterEquivalent],
            Era5VariableDerived::Rain => &[Precipitation, SnowfallWaterEquivalent],
            Era5VariableDerived::Et0FaoEvapotranspiration => &[
                Temperature2m,
                Dewpoint2m,
                WindUComponent10m,
                WindVComponent10m,
                ShortwaveRadiation,
            ],
            Era5VariableDerived::Cloudcover => &[CloudcoverLow, CloudcoverMid, CloudcoverHigh],
            Era5VariableDerived::DirectNormalIrradiance => &[DirectRadiation],
            Era5VariableDerived::Weathercode => &[
                CloudcoverLow,
                CloudcoverMid,
                CloudcoverHigh,
                Precipitation,
                SnowfallWaterEquivalent,
            ],
        }
    }
}

impl HourlyVariable {
    /// Base variables to prefetch. A base variable depends on itself.
    pub fn base_dependencies(&self) -> Vec<Era5Variable> {
        match self {
            HourlyVariable::Base(v) => vec![*v],
            HourlyVariable::Derived(v) => v.dependencies().to_vec(),
        }
    }
}

impl DailyVariable {
    /// Hourly series the daily reducer consumes. Sunrise and sunset need none.
    pub fn hourly_dependencies(&self) -> Vec<HourlyVariable> {
        use Era5VariableDerived as D;
        match self {
            DailyVariable::Weathercode => vec![D::Weathercode.into()],
            DailyVariable::Temperature2mMax | DailyVariable::Temperature2mMin => {
                vec![Temperature2m.into()]
            }
            DailyVariable::ApparentTemperatureMax | DailyVariable::ApparentTemperatureMin => {
                vec![D::ApparentTemperature.into()]
            }
            DailyVariable::PrecipitationSum | DailyVariable::PrecipitationHours => {
                vec![Precipitation.into()]
            }
            DailyVariable::SnowfallSum => vec![D::Snowfall.into()],
            DailyVariable::RainSum => vec![D::Rain.into()],
            DailyVariable::ShortwaveRadiationSum => vec![ShortwaveRadiation.into()],
            DailyVariable::Windspeed10mMax => vec![D::Windspeed10m.into()],
            DailyVariable::Windgusts10mMax => vec![Windgusts10m.into()],
            DailyVariable::Winddirection10mDominant => {
                vec![D::Windspeed10m.into(), D::Winddirection10m.into()]
            }
            DailyVariable::Sunrise | DailyVariable::Sunset => vec![],
            DailyVariable::Et0FaoEvapotranspiration => vec![D::Et0FaoEvapotranspiration.into()],
        }
    }

    /// Fully expanded base dependencies, deduplicated.
    pub fn base_dependencies(&self) -> Vec<Era5Variable> {
        let mut bases = Vec::new();
        for hourly in self.hourly_dependencies() {
            push_unique(&mut bases, hourly.base_dependencies());
        }
        bases
    }
}

fn push_unique(target: &mut Vec<Era5Variable>, items: impl IntoIterator<Item = Era5Variable>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

/// Every base variable a request needs, each listed once, in first-requested order.
pub fn prefetch_plan(hourly: &[HourlyVariable], daily: &[DailyVariable]) -> Vec<Era5Variable> {
    let mut plan = Vec::new();
    for variable in hourly {
        push_unique(&mut plan, variable.base_dependencies());
    }
    for variable in daily {
        push_unique(&mut plan, variable.base_dependencies());
    }
    plan
}
