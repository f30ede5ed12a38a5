//! Data models for the AirGradient ingest path.
//!
//! Covers the inbound reading, the sensor identifier carved out of the
//! request path, the five time-series records written per request and the
//! echo response returned to the sensor.

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

// ---

/// Characters dropped from the front of the path for the store dimension.
pub const DIMENSION_PREFIX_LEN: usize = 22;

/// Characters dropped from the front of the path for the echoed `SensorName`.
///
/// One shorter than [`DIMENSION_PREFIX_LEN`]: against
/// `/sensors/airgradient:<id>/measures` this rule yields `<id>` while the
/// dimension rule loses its first character. Both are kept as deployed until
/// the stored dimension values can be migrated.
pub const ECHO_PREFIX_LEN: usize = 21;

/// Characters dropped from the end of the path (`/measures`).
pub const PATH_SUFFIX_LEN: usize = 9;

/// Dimension name every record is tagged with.
pub const DIMENSION_NAME: &str = "Sensor";

/// Raw reading as posted by an AirGradient sensor.
///
/// Only the presence of the five keys is checked. Values are kept as posted
/// so they echo back unchanged; the store decides what it accepts.
#[derive(Debug, Clone)]
pub struct SensorReading {
    // ---
    pub wifi: Value,
    pub pm02: Value,
    pub rco2: Value,
    pub atmp: Value,
    pub rhum: Value,
}

impl SensorReading {
    // ---
    /// Parse a request body.
    ///
    /// Fails on malformed JSON, a non-object body or a missing key. A
    /// repeated key keeps its last value.
    pub fn parse(body: &str) -> Result<Self> {
        // ---
        let Value::Object(mut fields) = serde_json::from_str::<Value>(body)? else {
            bail!("body is not a JSON object");
        };

        let mut take = |key: &str| {
            fields
                .remove(key)
                .ok_or_else(|| anyhow!("missing key '{}'", key))
        };

        Ok(SensorReading {
            wifi: take("wifi")?,
            pm02: take("pm02")?,
            rco2: take("rco2")?,
            atmp: take("atmp")?,
            rhum: take("rhum")?,
        })
    }

    /// Value backing the given measure.
    pub fn value_of(&self, name: MeasureName) -> &Value {
        match name {
            MeasureName::WifiStrength => &self.wifi,
            MeasureName::Pm02 => &self.pm02,
            MeasureName::Co2 => &self.rco2,
            MeasureName::Temp => &self.atmp,
            MeasureName::Humidity => &self.rhum,
        }
    }

    /// Build one record per measure, each stamped when it is constructed.
    pub fn to_records(&self, sensor_id: &str) -> Vec<MeasurementRecord> {
        // ---
        MeasureName::ALL
            .iter()
            .map(|&name| MeasurementRecord {
                sensor_id: sensor_id.to_string(),
                measure_name: name,
                measure_value: measure_text(self.value_of(name)),
                time_ms: current_millis(),
            })
            .collect()
    }

    /// Echo payload returned to the caller.
    pub fn to_response(&self, path: &str, raw_body: &str) -> IngestResponse {
        // ---
        IngestResponse {
            sensor_name: echo_sensor_name(path).to_string(),
            sensor_raw_data: raw_body.to_string(),
            sensor_wifi: self.wifi.clone(),
            sensor_pm02: self.pm02.clone(),
            sensor_co2: self.rco2.clone(),
            sensor_temp: self.atmp.clone(),
            sensor_humidity: self.rhum.clone(),
        }
    }
}

/// Text sent as the measure value.
///
/// Numbers keep their JSON notation (`5`, `-42.0`) and strings go unquoted.
/// Other values keep the spelling already stored by earlier deployments:
/// `True`, `False`, `None`, and `[..]` / `{'k': v}` for containers.
pub fn measure_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => literal_text(other),
    }
}

fn literal_text(value: &Value) -> String {
    // ---
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(literal_text).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("'{}': {}", k, literal_text(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// The five measures written for every reading, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureName {
    WifiStrength,
    Pm02,
    Co2,
    Temp,
    Humidity,
}

impl MeasureName {
    // ---
    pub const ALL: [MeasureName; 5] = [
        MeasureName::WifiStrength,
        MeasureName::Pm02,
        MeasureName::Co2,
        MeasureName::Temp,
        MeasureName::Humidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureName::WifiStrength => "SensorWifiStrength",
            MeasureName::Pm02 => "SensorPM02",
            MeasureName::Co2 => "SensorCO2",
            MeasureName::Temp => "SensorTemp",
            MeasureName::Humidity => "SensorHumidity",
        }
    }
}

/// One time-series point. Always a `DOUBLE` measure with a millisecond timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    // ---
    pub sensor_id: String,
    pub measure_name: MeasureName,
    pub measure_value: String,
    pub time_ms: i64,
}

/// JSON body returned for every successfully parsed request.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    // ---
    #[serde(rename = "SensorName")]
    pub sensor_name: String,
    #[serde(rename = "SensorRawData")]
    pub sensor_raw_data: String,
    #[serde(rename = "SensorWifi")]
    pub sensor_wifi: Value,
    #[serde(rename = "SensorPM02")]
    pub sensor_pm02: Value,
    #[serde(rename = "SensorCO2")]
    pub sensor_co2: Value,
    #[serde(rename = "SensorTemp")]
    pub sensor_temp: Value,
    #[serde(rename = "SensorHumidity")]
    pub sensor_humidity: Value,
}

/// Sensor id used as the store dimension value.
pub fn dimension_sensor_id(path: &str) -> &str {
    trim_chars(path, DIMENSION_PREFIX_LEN, PATH_SUFFIX_LEN)
}

/// Sensor id echoed back as `SensorName`.
pub fn echo_sensor_name(path: &str) -> &str {
    trim_chars(path, ECHO_PREFIX_LEN, PATH_SUFFIX_LEN)
}

/// Drop `front` characters from the start and `back` from the end.
///
/// Yields an empty string when the two ranges overlap.
fn trim_chars(s: &str, front: usize, back: usize) -> &str {
    // ---
    let len = s.chars().count();
    let end = len.saturating_sub(back);
    if front >= end {
        return "";
    }

    let byte_at = |n: usize| s.char_indices().nth(n).map_or(s.len(), |(i, _)| i);
    &s[byte_at(front)..byte_at(end)]
}

fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}
