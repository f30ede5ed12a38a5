use axum::{
    body::Bytes, extract::State, http::StatusCode, http::Uri, response::IntoResponse,
    response::Response, routing::post, Json, Router,
};
use tracing::{debug, error, info, warn};

use crate::{
    dimension_sensor_id, MeasurementStore, SensorReading, WriteOutcome, DATABASE_NAME, TABLE_NAME,
};

// ---

pub fn router<S: MeasurementStore>() -> Router<S> {
    // ---
    Router::new().route("/sensors/{*rest}", post(handler::<S>))
}

/// Forward one AirGradient reading to the store and echo it back.
///
/// Only a body that fails to decode or parse is reported to the caller. Store
/// errors are logged and the response is still `200 OK`.
async fn handler<S: MeasurementStore>(State(store): State<S>, uri: Uri, body: Bytes) -> Response {
    // ---
    let path = uri.path();
    info!("POST {} - Received {} bytes", path, body.len());

    let parsed = std::str::from_utf8(&body)
        .map_err(anyhow::Error::from)
        .and_then(|text| Ok((text, SensorReading::parse(text)?)));

    let (raw_body, reading) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Failed to parse sensor reading: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Internal Server Error"),
            )
                .into_response();
        }
    };

    let sensor_id = dimension_sensor_id(path);
    let records = reading.to_records(sensor_id);
    debug!("Writing {} records for sensor '{}'", records.len(), sensor_id);

    let outcome = store.write_records(DATABASE_NAME, TABLE_NAME, records).await;
    report_outcome(&outcome);

    let response = reading.to_response(path, raw_body);
    debug!("POST {} - Returning OK for '{}'", path, response.sensor_name);
    (StatusCode::OK, Json(response)).into_response()
}

/// Log a write outcome. None of the variants are fatal.
fn report_outcome(outcome: &WriteOutcome) {
    // ---
    match outcome {
        WriteOutcome::Success {
            status,
            records_ingested,
        } => match records_ingested {
            Some(total) => info!("WriteRecords Status: [{}], {} record(s) ingested", status, total),
            None => info!("WriteRecords Status: [{}]", status),
        },
        WriteOutcome::PartialRejection(rejected) => {
            warn!("RejectedRecords: {} record(s) rejected", rejected.len());
            for rr in rejected {
                warn!("Rejected Index {}: {}", rr.index, rr.reason);
            }
            info!("Other records were written successfully");
        }
        WriteOutcome::OtherFailure(message) => {
            error!("WriteRecords failed: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::RejectedRecord;

    /// `io::Write` handle appending into a shared buffer.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        // ---
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_partial_rejection_logs_each_index() {
        // ---
        let outcome = WriteOutcome::PartialRejection(vec![
            RejectedRecord {
                index: 1,
                reason: "Measure value out of range".to_string(),
            },
            RejectedRecord {
                index: 3,
                reason: "Duplicate record".to_string(),
            },
        ]);

        let logs = capture_logs(|| report_outcome(&outcome));

        assert_eq!(logs.matches("Rejected Index ").count(), 2);
        assert!(logs.contains("Rejected Index 1: Measure value out of range"));
        assert!(logs.contains("Rejected Index 3: Duplicate record"));
    }

    #[test]
    fn test_success_logs_status() {
        // ---
        let outcome = WriteOutcome::Success {
            status: 200,
            records_ingested: Some(5),
        };
        let logs = capture_logs(|| report_outcome(&outcome));

        assert!(logs.contains("WriteRecords Status: [200], 5 record(s) ingested"));
        assert!(!logs.contains("Rejected Index"));
    }

    #[test]
    fn test_other_failure_is_logged() {
        // ---
        let outcome = WriteOutcome::OtherFailure("ThrottlingException".to_string());
        let logs = capture_logs(|| report_outcome(&outcome));

        assert!(logs.contains("ERROR"));
        assert!(logs.contains("ThrottlingException"));
    }
}
