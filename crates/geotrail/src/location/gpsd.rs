//! gpsd client provider.
//!
//! Connects to a gpsd daemon, enables JSON watch mode and waits for a TPV
//! report that satisfies the request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use super::{Accuracy, AuthorizationStatus, LocationProvider, LocationRequest, Position};
use crate::error::{Error, Result};

/// Default gpsd port.
pub const DEFAULT_PORT: u16 = 2947;

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true}\n";

/// Fields of a gpsd report that matter for a position fix.
///
/// Every report carries `class`; the other fields are only present on TPV.
#[derive(Debug, Deserialize)]
struct Report {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    eph: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
    time: Option<DateTime<Utc>>,
}

/// Location provider backed by a gpsd daemon.
#[derive(Debug, Clone)]
pub struct GpsdProvider {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl GpsdProvider {
    /// Create a provider for the daemon at `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(2),
        }
    }

    /// Address of the daemon.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> Result<TcpStream> {
        let address = self.address();
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(Error::location_unavailable(format!(
                "failed to connect to gpsd at {address}: {e}"
            ))),
            Err(_) => Err(Error::location_unavailable(format!(
                "timed out connecting to gpsd at {address}"
            ))),
        }
    }
}

/// Decode one line from gpsd and return a position if it is a TPV report
/// acceptable for `request` at time `now`.
fn accept_report(line: &str, request: &LocationRequest, now: DateTime<Utc>) -> Option<Position> {
    let report: Report = match serde_json::from_str(line) {
        Ok(report) => report,
        Err(e) => {
            warn!("Skipping unparseable gpsd line: {}", e);
            return None;
        }
    };
    if report.class != "TPV" {
        trace!("Ignoring gpsd {} report", report.class);
        return None;
    }

    let required_mode = match request.desired_accuracy {
        Accuracy::High => 3,
        Accuracy::Any => 2,
    };
    if report.mode < required_mode {
        debug!("Fix mode {} below required {}", report.mode, required_mode);
        return None;
    }

    let (Some(latitude), Some(longitude)) = (report.lat, report.lon) else {
        return None;
    };

    let timestamp = report.time.unwrap_or(now);
    let age = now.signed_duration_since(timestamp);
    if age.to_std().is_ok_and(|age| age > request.maximum_age) {
        debug!("Fix from {} is older than the maximum age", timestamp);
        return None;
    }

    let horizontal_accuracy_m = report.eph.or(match (report.epx, report.epy) {
        (Some(x), Some(y)) => Some(x.max(y)),
        _ => None,
    });

    Some(Position {
        latitude,
        longitude,
        altitude: report.alt,
        horizontal_accuracy_m,
        timestamp,
    })
}

#[async_trait::async_trait]
impl LocationProvider for GpsdProvider {
    fn name(&self) -> &'static str {
        "gpsd"
    }

    async fn authorization_status(&self) -> AuthorizationStatus {
        match self.connect().await {
            Ok(_) => AuthorizationStatus::Granted,
            Err(e) => {
                debug!("gpsd not reachable: {}", e);
                AuthorizationStatus::Unavailable
            }
        }
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        // gpsd has no consent prompt; reachability is the only gate.
        self.authorization_status().await
    }

    async fn current_position(&self, request: &LocationRequest) -> Result<Position> {
        let mut stream = self.connect().await?;
        stream.write_all(WATCH_COMMAND).await?;

        let mut lines = BufReader::new(stream).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(position) = accept_report(&line, request, Utc::now()) {
                debug!(
                    "gpsd fix {:.6},{:.6} from {}",
                    position.latitude,
                    position.longitude,
                    self.address()
                );
                return Ok(position);
            }
        }

        Err(Error::location_unavailable(
            "gpsd closed the connection before reporting a fix",
        ))
    }
}
