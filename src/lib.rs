//! Airwatch: Daily Air-Pollution Alerts
//!
//! Emails users once a day, at a time they choose, whether the pollution
//! index at a fixed monitored location is above their alert threshold.
//!
//! # Features
//!
//! - **Per-Rule Timers**: One daily timer per rule in the location's timezone
//! - **Full Rebuild**: Any rule change rebuilds the schedule from the store
//! - **Failure Isolation**: Fetch or send failures only affect one firing
//! - **Degraded Mode**: Runs without an email provider, logging skipped sends
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use airwatch::alerts::{AlertRule, AlertRunner, AlertScheduler};
//! use airwatch::provider::{Coordinates, OpenWeatherProvider};
//! use airwatch::store::InMemoryStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! store.insert_rule(AlertRule::new("r1", "u1", "07:30", 3.0, "ana@example.com"));
//!
//! let provider = OpenWeatherProvider::new(
//!     "https://api.openweathermap.org",
//!     "api-key",
//!     Duration::from_secs(30),
//! )?;
//! let runner = AlertRunner::new(
//!     Arc::new(provider),
//!     None,
//!     store.clone(),
//!     Coordinates::new(-6.2088, 106.8456),
//! );
//! let scheduler = AlertScheduler::new(store, Arc::new(runner), chrono_tz::Asia::Jakarta);
//! scheduler.rebuild().await;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod notify;
pub mod provider;
pub mod store;

// Re-export commonly used types
pub use alerts::{AlertRule, AlertRunner, AlertScheduler, Verdict};
pub use config::{AppConfig, ConfigError};
pub use provider::{Coordinates, Reading};
