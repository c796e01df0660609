use crate::error::ArchiveError;

/// A validated request point.
///
/// `elevation` is `None` when the caller wants the digital elevation model to decide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f32,
    pub longitude: f32,
    pub elevation: Option<f32>,
}

impl Location {
    /// Validates coordinates. NaN is rejected along with out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidCoordinate`] naming the offending parameter.
    pub fn new(
        latitude: f32,
        longitude: f32,
        elevation: Option<f32>,
    ) -> Result<Self, ArchiveError> {
        if latitude.is_nan() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ArchiveError::InvalidCoordinate {
                parameter: "latitude",
                value: latitude,
                min: -90.0,
                max: 90.0,
            });
        }
        if longitude.is_nan() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ArchiveError::InvalidCoordinate {
                parameter: "longitude",
                value: longitude,
                min: -180.0,
                max: 180.0,
            });
        }
        Ok(Self {
            latitude,
            longitude,
            elevation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_location() {
        let location = Location::new(47.3, 8.5, None).unwrap();
        assert_eq!(location.latitude, 47.3);
        assert_eq!(location.elevation, None);
        assert!(Location::new(-90.0, 180.0, Some(0.0)).is_ok());
    }

    #[test]
    fn test_latitude_out_of_range() {
        let err = Location::new(91.0, 8.5, None).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::InvalidCoordinate {
                parameter: "latitude",
                ..
            }
        ));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_nan_rejected() {
        assert!(Location::new(f32::NAN, 0.0, None).is_err());
        assert!(matches!(
            Location::new(0.0, f32::NAN, None),
            Err(ArchiveError::InvalidCoordinate {
                parameter: "longitude",
                ..
            })
        ));
        assert!(Location::new(0.0, -180.5, None).is_err());
    }
}
