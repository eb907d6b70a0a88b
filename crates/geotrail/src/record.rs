//! Core record types for geotrail.
//!
//! This module defines the location record kept by the store and the wire
//! form sent to the upload endpoint.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Stable identifier of a location record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The raw bytes of the identifier.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A recorded position with an optional human-readable address.
///
/// Files written before identifiers existed carry only
/// `latitude`/`longitude`/`address`; such records get a fresh id on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Stable identifier.
    #[serde(default)]
    pub id: RecordId,

    /// Latitude in decimal degrees (WGS84).
    pub latitude: f64,

    /// Longitude in decimal degrees (WGS84).
    pub longitude: f64,

    /// Free-form address or label entered by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// When the position was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl LocationRecord {
    /// Create a record stamped with the current time.
    ///
    /// Blank addresses are stored as `None`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCoordinates` if either coordinate is not finite
    /// or outside its WGS84 range.
    pub fn new(latitude: f64, longitude: f64, address: Option<String>) -> Result<Self> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self {
            id: RecordId::new(),
            latitude,
            longitude,
            address: address.filter(|a| !a.trim().is_empty()),
            recorded_at: Some(Utc::now()),
        })
    }

    /// Convert to the form the upload endpoint expects.
    ///
    /// Coordinates use `f64`'s `Display`, which never switches to exponent
    /// notation: `1e-7` renders as `"0.0000001"`. Values in WGS84 range are
    /// unaffected apart from such tiny magnitudes.
    #[must_use]
    pub fn to_wire(&self) -> WireLocation {
        WireLocation {
            latitude: self.latitude.to_string(),
            longitude: self.longitude.to_string(),
            address: self.address.clone(),
        }
    }
}

/// Upload representation of a record: coordinates rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLocation {
    /// Latitude as a decimal string.
    pub latitude: String,
    /// Longitude as a decimal string.
    pub longitude: String,
    /// Optional address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Check that a coordinate pair is finite and within WGS84 bounds.
///
/// # Errors
///
/// Returns `Error::InvalidCoordinates` when the pair is out of range.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
    let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(Error::InvalidCoordinates {
            latitude,
            longitude,
        })
    }
}
