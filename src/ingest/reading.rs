//! Reading data model.
//!
//! A `Reading` is created exactly once at ingestion and never mutated: the
//! gateway stamps the server timestamp, the AQI engine derives the index
//! fields, the history store assigns the id on append. `ReadingInput` is
//! the untrusted device-side shape decoded at the transport boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aqi::{AqiResult, Category, Concentrations, Pollutant};
use crate::utils::error::IngestError;

/// One enriched, persisted sensor observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Store-assigned append id, unique within the channel.
    pub id: u64,
    pub channel_id: String,
    pub co2: f64,
    pub co: f64,
    pub no2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    pub aqi: u16,
    pub category: Category,
    pub sub_indices: BTreeMap<Pollutant, u16>,
    pub dominant: Pollutant,
    /// Milliseconds since the UNIX epoch, assigned by the gateway. Device
    /// clocks are never authoritative here.
    pub timestamp: i64,
}

impl Reading {
    /// Build an enriched reading from validated concentrations and a
    /// computed AQI result. The id stays 0 until the store assigns one.
    pub fn enriched(
        channel_id: &str,
        input: &ReadingInput,
        result: AqiResult,
        timestamp: i64,
    ) -> Self {
        Self {
            id: 0,
            channel_id: channel_id.to_string(),
            co2: input.co2,
            co: input.co,
            no2: input.no2,
            temperature: input.temperature,
            humidity: input.humidity,
            aqi: result.aqi,
            category: result.category,
            sub_indices: result.sub_indices,
            dominant: result.dominant,
            timestamp,
        }
    }
}

/// The concentration fields a device submits, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingInput {
    pub co2: f64,
    pub co: f64,
    pub no2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Device-supplied send time, used only for client-side latency
    /// display. Never becomes the reading timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ReadingInput {
    /// Check every required field is a finite non-negative number and
    /// produce the concentrations the AQI engine is defined over.
    pub fn validate(&self) -> Result<Concentrations, IngestError> {
        for (name, value) in [("co2", self.co2), ("co", self.co), ("no2", self.no2)] {
            if !value.is_finite() || value < 0.0 {
                return Err(IngestError::InvalidPayload(format!(
                    "field '{name}' must be a finite non-negative number"
                )));
            }
        }
        Ok(Concentrations {
            co2: self.co2,
            co: self.co,
            no2: self.no2,
        })
    }
}
