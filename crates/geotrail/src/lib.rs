//! `geotrail` - Record, keep, and upload device location fixes
//!
//! This library provides the location journal: a store persisted to a private
//! JSON file and mirrored to a shared export, location providers, and the
//! uploader that sends the journal to a collection endpoint.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod location;
pub mod logging;
pub mod platform;
pub mod record;
pub mod store;
pub mod upload;

pub use config::Config;
pub use controller::Controller;
pub use error::{Error, Result};
pub use location::{LocationProvider, LocationRequest, Position};
pub use logging::init_logging;
pub use record::{LocationRecord, RecordId};
pub use store::LocationStore;
pub use upload::{HttpUploader, UploadReceipt};
