//! Air-quality reading providers
//!
//! A provider fetches a fresh reading for the monitored coordinates on
//! every alert check. Readings are never cached.

pub mod openweather;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use openweather::OpenWeatherProvider;

/// Fixed monitored location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Point-in-time air-quality measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Ordinal pollution level (1..=5 for the OpenWeather scale)
    pub pollution_index: u32,
    /// Named sub-measurements, e.g. `pm2_5` in μg/m³
    pub components: BTreeMap<String, f64>,
    pub captured_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(pollution_index: u32) -> Self {
        Self {
            pollution_index,
            components: BTreeMap::new(),
            captured_at: Utc::now(),
        }
    }

    pub fn with_component(mut self, name: impl Into<String>, value: f64) -> Self {
        self.components.insert(name.into(), value);
        self
    }
}

/// Source of current readings
#[async_trait::async_trait]
pub trait ReadingProvider: Send + Sync {
    async fn fetch_reading(&self, coords: Coordinates) -> Result<Reading, FetchError>;
}

/// Reading fetch errors. All of them abort only the current check.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected payload: {0}")]
    Payload(String),
}
