mod aggregation;
mod astronomy;
mod era5_api;
mod error;
mod readers;
mod store;
mod types;
mod utils;

pub mod meteorology;

pub use era5_api::Era5Api;
pub use error::ArchiveError;

pub use aggregation::dependencies::prefetch_plan;
pub use aggregation::hourly::HourlyEngine;
pub use aggregation::window::WindowedReduce;
pub use astronomy::{RiseSet, RiseSetCache};

pub use readers::grid_reader::GridReader;
pub use readers::mixer::ReaderMixer;
pub use readers::{DomainReader, ReaderMetadata};

pub use store::archive_store::ArchiveStore;
pub use store::error::StoreError;

pub use types::domain::{Domain, GridSelectionMode, Model, RegularGrid};
pub use types::location::Location;
pub use types::output::*;
pub use types::query::{DateRangeError, Era5Query, ARCHIVE_START};
pub use types::time_axis::{TimeAxis, TimerangeLocal, DAILY_SECONDS, HOURLY_SECONDS};
pub use types::units::*;
pub use types::variable::*;
