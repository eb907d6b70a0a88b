//! A provider that always reports the same configured position.

use chrono::Utc;

use super::{AuthorizationStatus, LocationProvider, LocationRequest, Position};
use crate::error::{Error, Result};
use crate::record::validate_coordinates;

/// Reports a fixed coordinate. Useful on hosts without a receiver.
#[derive(Debug, Clone)]
pub struct FixedProvider {
    latitude: f64,
    longitude: f64,
    status: AuthorizationStatus,
}

impl FixedProvider {
    /// Create a provider for the given coordinate.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCoordinates` if the coordinate is out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
            status: AuthorizationStatus::Granted,
        })
    }

    /// Report `status` for authorization checks instead of `Granted`.
    #[must_use]
    pub fn with_status(mut self, status: AuthorizationStatus) -> Self {
        self.status = status;
        self
    }
}

#[async_trait::async_trait]
impl LocationProvider for FixedProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        self.status
    }

    async fn current_position(&self, _request: &LocationRequest) -> Result<Position> {
        if !self.status.is_granted() {
            return Err(Error::permission_denied(
                "location",
                "The fixed provider is configured to refuse access",
            ));
        }
        Ok(Position {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: None,
            horizontal_accuracy_m: Some(0.0),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_provider_position() {
        let provider = FixedProvider::new(51.5, -0.12).unwrap();
        assert_eq!(
            provider.authorization_status().await,
            AuthorizationStatus::Granted
        );

        let position = provider
            .current_position(&LocationRequest::default())
            .await
            .unwrap();
        assert_eq!(position.latitude, 51.5);
        assert_eq!(position.longitude, -0.12);
    }

    #[tokio::test]
    async fn test_fixed_provider_denied() {
        let provider = FixedProvider::new(0.0, 0.0)
            .unwrap()
            .with_status(AuthorizationStatus::Denied);
        assert_eq!(
            provider.request_authorization().await,
            AuthorizationStatus::Denied
        );
        let err = provider
            .current_position(&LocationRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_permission_error());
    }

    #[test]
    fn test_fixed_provider_rejects_invalid() {
        assert!(FixedProvider::new(100.0, 0.0).is_err());
    }
}
