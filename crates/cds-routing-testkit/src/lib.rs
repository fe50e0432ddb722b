//! cds-routing test infrastructure
//!
//! A recording host service that stands in for a real service framework,
//! request fixtures, and tracing helpers for tests.
//!
//! ```rust,no_run
//! use cds_routing::{Registrar, RegisterOptions, MetadataStorage, SubscriptionPhase};
//! use cds_routing_testkit::*;
//! use std::sync::Arc;
//!
//! let service = RecordingService::new("CatalogService");
//! let storage = Arc::new(MetadataStorage::new());
//! Registrar::new(storage)
//!     .register(service.as_host(), &RegisterOptions::new())
//!     .unwrap();
//! assert!(service.calls().is_empty());
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod logging;
pub mod service;

pub use fixtures::*;
pub use logging::*;
pub use service::*;
