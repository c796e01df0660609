//! Readers bound to one resolved location: single-domain grid readers and the mixer that
//! composes them.

pub mod grid_reader;
pub mod mixer;

use crate::store::error::StoreError;
use crate::types::time_axis::TimeAxis;
use crate::types::units::DataAndUnit;
use crate::types::variable::Era5Variable;
use async_trait::async_trait;

/// Where a reader actually reads from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderMetadata {
    /// Domain (or model) identifier.
    pub domain: String,
    /// Grid cell coordinates, which may differ from the requested point.
    pub model_lat: f32,
    pub model_lon: f32,
    /// Elevation of the grid cell in the model.
    pub model_elevation: f32,
    /// Elevation of the requested point, used for height corrections.
    pub target_elevation: f32,
}

/// Capability of a reader bound to a location.
///
/// Callers prefetch every variable they will need before the first `get`, so that reads can
/// run concurrently. `get` returns `None` when the domain does not carry the variable or has
/// no data for the period; that is not an error.
#[async_trait]
pub trait DomainReader: Send + Sync {
    fn metadata(&self) -> &ReaderMetadata;

    /// Loads `variable` over `time`. Fails only on impossible requests or broken storage.
    async fn prefetch(&self, variable: Era5Variable, time: &TimeAxis) -> Result<(), StoreError>;

    /// A series aligned with `time`. It may be shorter than `time` if the domain ends early.
    async fn get(
        &self,
        variable: Era5Variable,
        time: &TimeAxis,
    ) -> Result<Option<DataAndUnit>, StoreError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory reader. Series are aligned with the start of whatever axis is requested and
    /// cut to its length, so a short series behaves like a domain that ends early.
    pub(crate) struct MemoryReader {
        metadata: ReaderMetadata,
        series: HashMap<Era5Variable, Vec<f32>>,
        prefetch_log: Arc<Mutex<Vec<Era5Variable>>>,
        trim_to_axis: bool,
    }

    impl MemoryReader {
        pub(crate) fn new(domain: &str) -> Self {
            Self {
                metadata: ReaderMetadata {
                    domain: domain.to_string(),
                    model_lat: 47.25,
                    model_lon: 8.5,
                    model_elevation: 400.0,
                    target_elevation: 409.0,
                },
                series: HashMap::new(),
                prefetch_log: Arc::new(Mutex::new(Vec::new())),
                trim_to_axis: true,
            }
        }

        pub(crate) fn with(mut self, variable: Era5Variable, data: Vec<f32>) -> Self {
            self.series.insert(variable, data);
            self
        }

        pub(crate) fn constant(self, variable: Era5Variable, value: f32, count: usize) -> Self {
            self.with(variable, vec![value; count])
        }

        /// Returns series longer than the requested axis unchanged.
        pub(crate) fn untrimmed(mut self) -> Self {
            self.trim_to_axis = false;
            self
        }

        /// Shared log of prefetched variables, usable after the reader is boxed.
        pub(crate) fn prefetch_log(&self) -> Arc<Mutex<Vec<Era5Variable>>> {
            self.prefetch_log.clone()
        }
    }

    #[async_trait]
    impl DomainReader for MemoryReader {
        fn metadata(&self) -> &ReaderMetadata {
            &self.metadata
        }

        async fn prefetch(
            &self,
            variable: Era5Variable,
            _time: &TimeAxis,
        ) -> Result<(), StoreError> {
            if let Ok(mut prefetched) = self.prefetch_log.lock() {
                prefetched.push(variable);
            }
            Ok(())
        }

        async fn get(
            &self,
            variable: Era5Variable,
            time: &TimeAxis,
        ) -> Result<Option<DataAndUnit>, StoreError> {
            Ok(self.series.get(&variable).map(|data| {
                let n = if self.trim_to_axis {
                    data.len().min(time.count())
                } else {
                    data.len()
                };
                DataAndUnit::new(data[..n].to_vec(), variable.unit())
            }))
        }
    }
}
