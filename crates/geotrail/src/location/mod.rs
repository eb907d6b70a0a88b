//! Platform-agnostic location provider abstraction.
//!
//! This module defines the trait and request/response types that concrete
//! position sources implement.

pub mod fixed;
pub mod gpsd;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use fixed::FixedProvider;
pub use gpsd::GpsdProvider;

/// Accuracy tier requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    /// A full 3D fix is required.
    #[default]
    High,
    /// Any 2D or 3D fix is acceptable.
    Any,
}

impl std::fmt::Display for Accuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Parameters for a single position request.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRequest {
    /// Accuracy tier the fix must meet.
    pub desired_accuracy: Accuracy,
    /// Minimum movement in meters between updates. Streaming providers use
    /// it as a filter; single-shot providers pass it through.
    pub update_distance_m: f64,
    /// Oldest cached fix that may be returned.
    pub maximum_age: Duration,
    /// Time allowed for the whole request.
    pub timeout: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            desired_accuracy: Accuracy::High,
            update_distance_m: 0.1,
            maximum_age: Duration::from_millis(5_000),
            timeout: Duration::from_millis(20_000),
        }
    }
}

/// Whether the application may query the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationStatus {
    /// Queries are allowed.
    Granted,
    /// The user or system refused access.
    Denied,
    /// No decision has been made yet.
    NotDetermined,
    /// The location service itself is not reachable.
    Unavailable,
}

impl AuthorizationStatus {
    /// Whether queries are allowed.
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::NotDetermined => write!(f, "not determined"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A position fix returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Altitude in meters, if known.
    pub altitude: Option<f64>,
    /// Estimated horizontal error in meters, if known.
    pub horizontal_accuracy_m: Option<f64>,
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
}

/// A trait for position sources.
///
/// Implementors wrap a platform location service. Callers check
/// authorization before asking for a position.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync + std::fmt::Debug {
    /// The name of this provider (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Current authorization state, without prompting.
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask for authorization, prompting where the platform supports it.
    async fn request_authorization(&self) -> AuthorizationStatus;

    /// Obtain a single fix satisfying `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if no acceptable fix can be obtained.
    async fn current_position(&self, request: &LocationRequest) -> Result<Position>;
}
