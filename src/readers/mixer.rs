use crate::error::ArchiveError;
use crate::readers::{DomainReader, ReaderMetadata};
use crate::store::error::StoreError;
use crate::types::time_axis::TimeAxis;
use crate::types::units::DataAndUnit;
use crate::types::variable::Era5Variable;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use log::debug;
use std::ops::Range;

/// Presents an ordered list of readers, coarse to fine, as one reader.
///
/// For every time step the value of the last reader that has data wins. Variables flagged with
/// [`Era5Variable::requires_offset_correction_for_mixing`] are shifted where a lower-priority
/// reader fills a gap, so the merged series stays continuous.
pub struct ReaderMixer {
    readers: Vec<Box<dyn DomainReader>>,
    metadata: ReaderMetadata,
}

impl ReaderMixer {
    /// # Errors
    ///
    /// [`ArchiveError::NoDomainsConfigured`] if `readers` is empty.
    pub fn new(readers: Vec<Box<dyn DomainReader>>) -> Result<Self, ArchiveError> {
        let metadata = readers
            .last()
            .ok_or(ArchiveError::NoDomainsConfigured)?
            .metadata()
            .clone();
        Ok(Self { readers, metadata })
    }
}

#[async_trait]
impl DomainReader for ReaderMixer {
    /// Metadata of the highest-resolution reader.
    fn metadata(&self) -> &ReaderMetadata {
        &self.metadata
    }

    async fn prefetch(&self, variable: Era5Variable, time: &TimeAxis) -> Result<(), StoreError> {
        try_join_all(self.readers.iter().map(|r| r.prefetch(variable, time))).await?;
        Ok(())
    }

    async fn get(
        &self,
        variable: Era5Variable,
        time: &TimeAxis,
    ) -> Result<Option<DataAndUnit>, StoreError> {
        let count = time.count();
        let mut merged: Option<DataAndUnit> = None;

        for reader in self.readers.iter().rev() {
            let Some(series) = reader.get(variable, time).await? else {
                continue;
            };
            let mut data = series.data;
            assert!(
                data.len() <= count,
                "{} returned {} samples of {} for an axis of {}",
                reader.metadata().domain,
                data.len(),
                variable.as_str(),
                count
            );
            data.resize(count, f32::NAN);

            match merged.as_mut() {
                None => merged = Some(DataAndUnit::new(data, series.unit)),
                Some(m) if variable.requires_offset_correction_for_mixing() => {
                    debug!(
                        "Filling gaps of {} from {} with offset correction",
                        variable.as_str(),
                        reader.metadata().domain
                    );
                    fill_gaps_with_offset(&mut m.data, &data)
                }
                Some(m) => fill_gaps(&mut m.data, &data),
            }
            if merged
                .as_ref()
                .is_some_and(|m| m.data.iter().all(|v| !v.is_nan()))
            {
                break;
            }
        }
        Ok(merged)
    }
}

/// Fills NaN samples of `merged` from `lower`.
fn fill_gaps(merged: &mut [f32], lower: &[f32]) {
    assert_eq!(merged.len(), lower.len());
    for (m, l) in merged.iter_mut().zip(lower) {
        if m.is_nan() {
            *m = *l;
        }
    }
}

/// Maximal runs of NaN in `data`.
fn nan_runs(data: &[f32]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, v) in data.iter().enumerate() {
        match (v.is_nan(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..data.len());
    }
    runs
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f32)
}

/// Fills NaN runs of `merged` from `lower`, shifting each run by a bias offset. In order of
/// preference the offset is the mean difference at the samples adjacent to the run, the mean
/// difference over the whole overlap, continuity with the last value before the run, or
/// continuity with the first value after it.
fn fill_gaps_with_offset(merged: &mut [f32], lower: &[f32]) {
    assert_eq!(merged.len(), lower.len());
    let original = merged.to_vec();
    let is_overlap = |i: usize| !original[i].is_nan() && !lower[i].is_nan();
    let overall = mean(
        (0..original.len())
            .filter(|&i| is_overlap(i))
            .map(|i| original[i] - lower[i]),
    );

    for run in nan_runs(&original) {
        let Some(first_fill) = run.clone().find(|&i| !lower[i].is_nan()) else {
            continue;
        };
        let last_fill = run.clone().rev().find(|&i| !lower[i].is_nan()).unwrap_or(first_fill);

        let neighbours = [run.start.checked_sub(1), Some(run.end)]
            .into_iter()
            .flatten()
            .filter(|&i| i < original.len() && is_overlap(i));
        let offset = mean(neighbours.map(|i| original[i] - lower[i]))
            .or(overall)
            .or_else(|| {
                let before = merged[..run.start].iter().rev().find(|v| !v.is_nan())?;
                Some(before - lower[first_fill])
            })
            .or_else(|| {
                let after = original[run.end..].iter().find(|v| !v.is_nan())?;
                Some(after - lower[last_fill])
            })
            .unwrap_or(0.0);

        debug!("Offset {} applied to samples {:?}", offset, run);
        for i in run {
            merged[i] = lower[i] + offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::testing::MemoryReader;
    use crate::types::time_axis::HOURLY_SECONDS;

    const NAN: f32 = f32::NAN;

    fn time(count: i64) -> TimeAxis {
        TimeAxis::new(0, count * HOURLY_SECONDS, HOURLY_SECONDS)
    }

    fn mixer(coarse: Vec<f32>, fine: Vec<f32>, variable: Era5Variable) -> ReaderMixer {
        ReaderMixer::new(vec![
            Box::new(MemoryReader::new("coarse").with(variable, coarse)),
            Box::new(MemoryReader::new("fine").with(variable, fine)),
        ])
        .unwrap()
    }

    fn assert_series(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_empty_composition() {
        assert!(matches!(
            ReaderMixer::new(vec![]),
            Err(ArchiveError::NoDomainsConfigured)
        ));
    }

    #[tokio::test]
    async fn test_fine_domain_wins_where_it_has_data() -> Result<(), StoreError> {
        let v = Era5Variable::Temperature2m;
        let coarse = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let fine = vec![20.0, NAN, 22.0, NAN, 24.0, NAN];
        let merged = mixer(coarse.clone(), fine.clone(), v).get(v, &time(6)).await?.unwrap();
        for i in 0..6 {
            let expected = if fine[i].is_nan() { coarse[i] } else { fine[i] };
            assert_eq!(merged.data[i], expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_fine_series_is_padded() -> Result<(), StoreError> {
        let v = Era5Variable::Precipitation;
        let merged = mixer(vec![1.0; 6], vec![2.0, 2.0], v).get(v, &time(6)).await?.unwrap();
        assert_eq!(merged.data, vec![2.0, 2.0, 1.0, 1.0, 1.0, 1.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_all_absent() -> Result<(), StoreError> {
        let m = ReaderMixer::new(vec![
            Box::new(MemoryReader::new("coarse")),
            Box::new(MemoryReader::new("fine")),
        ])
        .unwrap();
        assert!(m.get(Era5Variable::Temperature2m, &time(6)).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_offset_from_neighbouring_overlap() -> Result<(), StoreError> {
        let v = Era5Variable::SoilMoisture0To7cm;
        let merged = mixer(
            vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
            vec![20.0, 21.0, 22.0, NAN, NAN, NAN],
            v,
        )
        .get(v, &time(6))
        .await?
        .unwrap();
        assert_series(&merged.data, &[20.0, 21.0, 22.0, 23.0, 24.0, 25.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_offset_from_distant_overlap() -> Result<(), StoreError> {
        let v = Era5Variable::SoilMoisture0To7cm;
        // Neither neighbour of the gap has a coarse value, the overlap at 0..2 sets the offset
        let merged = mixer(
            vec![10.0, 11.0, NAN, 13.0, 14.0, NAN],
            vec![20.0, 21.0, 22.0, NAN, NAN, 26.0],
            v,
        )
        .get(v, &time(6))
        .await?
        .unwrap();
        assert_series(&merged.data, &[20.0, 21.0, 22.0, 23.0, 24.0, 26.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_offset_without_overlap_uses_later_value() -> Result<(), StoreError> {
        let v = Era5Variable::SoilMoisture0To7cm;
        let merged = mixer(
            vec![10.0, 11.0, 12.0, NAN, NAN, NAN],
            vec![NAN, NAN, NAN, 30.0, 31.0, 32.0],
            v,
        )
        .get(v, &time(6))
        .await?
        .unwrap();
        assert_series(&merged.data, &[28.0, 29.0, 30.0, 30.0, 31.0, 32.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_offset_without_overlap_uses_earlier_value() -> Result<(), StoreError> {
        let v = Era5Variable::SoilMoisture0To7cm;
        let merged = mixer(
            vec![NAN, NAN, NAN, 13.0, 14.0, 15.0],
            vec![20.0, 21.0, 22.0, NAN, NAN, NAN],
            v,
        )
        .get(v, &time(6))
        .await?
        .unwrap();
        assert_series(&merged.data, &[20.0, 21.0, 22.0, 22.0, 23.0, 24.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_uncorrected_variable_jumps() -> Result<(), StoreError> {
        let v = Era5Variable::SoilTemperature0To7cm;
        let merged = mixer(
            vec![NAN, NAN, NAN, 13.0, 14.0, 15.0],
            vec![20.0, 21.0, 22.0, NAN, NAN, NAN],
            v,
        )
        .get(v, &time(6))
        .await?
        .unwrap();
        assert_eq!(merged.data, vec![20.0, 21.0, 22.0, 13.0, 14.0, 15.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_prefetch_reaches_every_reader() -> Result<(), StoreError> {
        let coarse = MemoryReader::new("coarse");
        let fine = MemoryReader::new("fine");
        let (coarse_log, fine_log) = (coarse.prefetch_log(), fine.prefetch_log());
        let m = ReaderMixer::new(vec![Box::new(coarse), Box::new(fine)]).unwrap();
        m.prefetch(Era5Variable::Dewpoint2m, &time(24)).await?;
        assert_eq!(*coarse_log.lock().unwrap(), vec![Era5Variable::Dewpoint2m]);
        assert_eq!(*fine_log.lock().unwrap(), vec![Era5Variable::Dewpoint2m]);
        Ok(())
    }

    #[tokio::test]
    async fn test_nested_mixers() -> Result<(), StoreError> {
        let v = Era5Variable::Temperature2m;
        let inner = mixer(vec![1.0; 4], vec![2.0, NAN, NAN, NAN], v);
        let outer = ReaderMixer::new(vec![
            Box::new(inner),
            Box::new(MemoryReader::new("finest").with(v, vec![NAN, NAN, 3.0, NAN])),
        ])
        .unwrap();
        assert_eq!(outer.metadata().domain, "finest");
        let merged = outer.get(v, &time(4)).await?.unwrap();
        assert_eq!(merged.data, vec![2.0, 1.0, 3.0, 1.0]);
        Ok(())
    }

    #[tokio::test]
    #[should_panic(expected = "returned 8 samples")]
    async fn test_series_longer_than_axis_panics() {
        let v = Era5Variable::Temperature2m;
        let m = ReaderMixer::new(vec![
            Box::new(MemoryReader::new("coarse").with(v, vec![1.0; 8]).untrimmed()),
            Box::new(MemoryReader::new("fine").with(v, vec![2.0, NAN, 2.0, 2.0])),
        ])
        .unwrap();
        let _ = m.get(v, &time(4)).await;
    }

    #[test]
    fn test_nan_runs() {
        assert_eq!(nan_runs(&[1.0, NAN, NAN, 2.0, NAN]), vec![1..3, 4..5]);
        assert!(nan_runs(&[1.0]).is_empty());
    }
}
