//! The result of an archive request and its JSON/CSV encodings.

use crate::error::ArchiveError;
use crate::types::time_axis::{TimeAxis, DAILY_SECONDS};
use crate::types::units::DataAndUnit;
use chrono::DateTime;
use polars::prelude::*;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeformat {
    /// Local wall-clock time strings.
    #[default]
    Iso8601,
    /// Unix seconds (UTC).
    Unixtime,
}

impl Timeformat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeformat::Iso8601 => "iso8601",
            Timeformat::Unixtime => "unixtime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(DataAndUnit),
    /// Unix timestamps; `None` where the event does not happen (polar day or night).
    Timestamp(Vec<Option<i64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiColumn {
    pub name: String,
    pub data: ColumnData,
}

impl ApiColumn {
    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Float(d) => d.data.len(),
            ColumnData::Timestamp(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unit_label(&self, timeformat: Timeformat) -> &'static str {
        match &self.data {
            ColumnData::Float(d) => d.unit.abbreviation(),
            ColumnData::Timestamp(_) => timeformat.as_str(),
        }
    }
}

/// One output section (`hourly` or `daily`): columns aligned with `time`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSection {
    pub name: &'static str,
    pub time: TimeAxis,
    pub columns: Vec<ApiColumn>,
}

impl ApiSection {
    pub fn column(&self, name: &str) -> Option<&ApiColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveResult {
    /// Coordinates of the grid cell actually used.
    pub latitude: f32,
    pub longitude: f32,
    pub elevation: f32,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i32,
    pub timezone: String,
    pub timeformat: Timeformat,
    pub sections: Vec<ApiSection>,
}

impl ArchiveResult {
    pub fn section(&self, name: &str) -> Option<&ApiSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn encode(&self, format: OutputFormat) -> Result<String, ArchiveError> {
        match format {
            OutputFormat::Json => self.to_json(),
            OutputFormat::Csv => self.to_csv(),
        }
    }

    pub fn to_json(&self) -> Result<String, ArchiveError> {
        Ok(serde_json::to_string(self)?)
    }

    /// A metadata block followed by one block per section, separated by blank lines.
    pub fn to_csv(&self) -> Result<String, ArchiveError> {
        let mut buffer = Vec::new();
        let mut meta = DataFrame::new(vec![
            Column::new("latitude".into(), [self.latitude]),
            Column::new("longitude".into(), [self.longitude]),
            Column::new("elevation".into(), [self.elevation]),
            Column::new("utc_offset_seconds".into(), [self.utc_offset_seconds]),
            Column::new("timezone".into(), [self.timezone.as_str()]),
        ])?;
        CsvWriter::new(&mut buffer)
            .include_header(true)
            .finish(&mut meta)?;

        for section in &self.sections {
            buffer.push(b'\n');
            let mut df = self.section_frame(section)?;
            CsvWriter::new(&mut buffer)
                .include_header(true)
                .finish(&mut df)?;
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn section_frame(&self, section: &ApiSection) -> PolarsResult<DataFrame> {
        let time_header = format!("time ({})", self.timeformat.as_str());
        let mut columns = Vec::with_capacity(section.columns.len() + 1);
        let stamps: Vec<Option<i64>> = section.time.timestamps().map(Some).collect();
        columns.push(self.time_column(&time_header, &stamps, section.time.dt_seconds));

        for column in &section.columns {
            let header = format!("{} ({})", column.name, column.unit_label(self.timeformat));
            columns.push(match &column.data {
                ColumnData::Float(d) => Column::new(
                    header.as_str().into(),
                    d.data
                        .iter()
                        .map(|v| if v.is_nan() { None } else { Some(*v) })
                        .collect::<Vec<_>>(),
                ),
                ColumnData::Timestamp(t) => self.time_column(&header, t, 60),
            });
        }
        DataFrame::new(columns)
    }

    fn time_column(&self, header: &str, stamps: &[Option<i64>], dt_seconds: i64) -> Column {
        match self.timeformat {
            Timeformat::Unixtime => Column::new(header.into(), stamps.to_vec()),
            Timeformat::Iso8601 => Column::new(
                header.into(),
                stamps
                    .iter()
                    .map(|t| t.and_then(|t| self.format_local(t, dt_seconds)))
                    .collect::<Vec<_>>(),
            ),
        }
    }

    /// Local wall-clock representation: a date for daily steps, minutes otherwise.
    fn format_local(&self, timestamp: i64, dt_seconds: i64) -> Option<String> {
        let local = DateTime::from_timestamp(timestamp + self.utc_offset_seconds as i64, 0)?;
        let pattern = if dt_seconds >= DAILY_SECONDS {
            "%Y-%m-%d"
        } else {
            "%Y-%m-%dT%H:%M"
        };
        Some(local.naive_utc().format(pattern).to_string())
    }
}

struct SectionUnits<'a> {
    section: &'a ApiSection,
    timeformat: Timeformat,
}

impl Serialize for SectionUnits<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.section.columns.len() + 1))?;
        map.serialize_entry("time", self.timeformat.as_str())?;
        for column in &self.section.columns {
            map.serialize_entry(&column.name, column.unit_label(self.timeformat))?;
        }
        map.end()
    }
}

struct SectionValues<'a> {
    result: &'a ArchiveResult,
    section: &'a ApiSection,
}

impl SectionValues<'_> {
    fn times(&self, stamps: &[Option<i64>], dt_seconds: i64) -> Vec<serde_json::Value> {
        stamps
            .iter()
            .map(|t| match (t, self.result.timeformat) {
                (None, _) => serde_json::Value::Null,
                (Some(t), Timeformat::Unixtime) => serde_json::Value::from(*t),
                (Some(t), Timeformat::Iso8601) => self
                    .result
                    .format_local(*t, dt_seconds)
                    .map(serde_json::Value::from)
                    .unwrap_or(serde_json::Value::Null),
            })
            .collect()
    }
}

impl Serialize for SectionValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.section.columns.len() + 1))?;
        let stamps: Vec<Option<i64>> = self.section.time.timestamps().map(Some).collect();
        map.serialize_entry("time", &self.times(&stamps, self.section.time.dt_seconds))?;
        for column in &self.section.columns {
            match &column.data {
                ColumnData::Float(d) => {
                    let values: Vec<Option<f32>> = d
                        .data
                        .iter()
                        .map(|v| if v.is_nan() { None } else { Some(*v) })
                        .collect();
                    map.serialize_entry(&column.name, &values)?;
                }
                ColumnData::Timestamp(t) => {
                    map.serialize_entry(&column.name, &self.times(t, 60))?;
                }
            }
        }
        map.end()
    }
}

impl Serialize for ArchiveResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("latitude", &self.latitude)?;
        map.serialize_entry("longitude", &self.longitude)?;
        map.serialize_entry("generationtime_ms", &self.generationtime_ms)?;
        map.serialize_entry("utc_offset_seconds", &self.utc_offset_seconds)?;
        map.serialize_entry("timezone", &self.timezone)?;
        map.serialize_entry("elevation", &self.elevation)?;
        for section in &self.sections {
            map.serialize_entry(
                &format!("{}_units", section.name),
                &SectionUnits {
                    section,
                    timeformat: self.timeformat,
                },
            )?;
            map.serialize_entry(
                section.name,
                &SectionValues {
                    result: self,
                    section,
                },
            )?;
        }
        map.end()
    }
}
