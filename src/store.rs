//! Time-series store access.
//!
//! The ingest route talks to the store only through [`MeasurementStore`], so
//! the AWS client stays in this module. Every write is reported as a
//! [`WriteOutcome`]; the caller decides what to log and never fails on it.

use std::future::Future;

use anyhow::{anyhow, Result};
use aws_config::BehaviorVersion;
use aws_sdk_timestreamwrite::config::Region;
use aws_sdk_timestreamwrite::error::{BuildError, DisplayErrorContext, SdkError};
use aws_sdk_timestreamwrite::operation::write_records::{WriteRecordsError, WriteRecordsOutput};
use aws_sdk_timestreamwrite::types::{Dimension, MeasureValueType, Record, TimeUnit};
use aws_sdk_timestreamwrite::Client;

use crate::models::{MeasurementRecord, DIMENSION_NAME};

// ---

/// Timestream database receiving all readings.
pub const DATABASE_NAME: &str = "airgradient";

/// Timestream table receiving all readings.
pub const TABLE_NAME: &str = "sensors";

/// Region used when `TIMESTREAM_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// A record the store refused while accepting the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub index: i32,
    pub reason: String,
}

/// Result of one batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    // ---
    /// All records accepted. `records_ingested` is the store's own count.
    Success {
        status: u16,
        records_ingested: Option<i32>,
    },

    /// Some records rejected, the others presumed written.
    PartialRejection(Vec<RejectedRecord>),

    /// Anything else: network, auth, throttling, validation. Carries the
    /// full error chain.
    OtherFailure(String),
}

/// Batch writer for measurement records.
pub trait MeasurementStore: Clone + Send + Sync + 'static {
    // ---
    fn write_records(
        &self,
        database: &'static str,
        table: &'static str,
        records: Vec<MeasurementRecord>,
    ) -> impl Future<Output = WriteOutcome> + Send;
}

/// [`MeasurementStore`] backed by AWS Timestream.
///
/// Built once at startup and cloned into each request; clones share the
/// underlying connection pool.
#[derive(Clone, Debug)]
pub struct TimestreamStore {
    client: Client,
}

impl TimestreamStore {
    // ---
    /// Load AWS credentials for `region` and discover the write endpoint.
    ///
    /// Timestream only accepts writes on discovered endpoints, so this also
    /// spawns the endpoint refresh task onto the current tokio runtime.
    pub async fn connect(region: &str) -> Result<Self> {
        // ---
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let (client, reload) = Client::new(&sdk_config)
            .with_endpoint_discovery_enabled()
            .await
            .map_err(|e| anyhow!("Timestream endpoint discovery failed in '{}': {}", region, e))?;

        tokio::spawn(reload.reload_task());

        Ok(Self { client })
    }
}

impl MeasurementStore for TimestreamStore {
    // ---
    async fn write_records(
        &self,
        database: &'static str,
        table: &'static str,
        records: Vec<MeasurementRecord>,
    ) -> WriteOutcome {
        // ---
        let records = match records.iter().map(to_sdk_record).collect::<Result<Vec<_>, _>>() {
            Ok(records) => records,
            Err(e) => return WriteOutcome::OtherFailure(e.to_string()),
        };

        let result = self
            .client
            .write_records()
            .database_name(database)
            .table_name(table)
            .set_records(Some(records))
            .send()
            .await;

        classify_write(result)
    }
}

/// Sort the SDK result of one `WriteRecords` call into a [`WriteOutcome`].
///
/// The SDK only returns `Ok` for a 2xx response and does not expose the code,
/// hence the fixed `200`.
fn classify_write(
    result: Result<WriteRecordsOutput, SdkError<WriteRecordsError>>,
) -> WriteOutcome {
    // ---
    let err = match result {
        Ok(output) => {
            return WriteOutcome::Success {
                status: 200,
                records_ingested: output.records_ingested().map(|r| r.total()),
            }
        }
        Err(err) => err,
    };

    // Dispatch and timeout errors only name their cause in the source chain.
    let context = DisplayErrorContext(&err).to_string();

    match err.into_service_error() {
        WriteRecordsError::RejectedRecordsException(e) => WriteOutcome::PartialRejection(
            e.rejected_records()
                .iter()
                .map(|r| RejectedRecord {
                    index: r.record_index(),
                    reason: r.reason().unwrap_or_default().to_string(),
                })
                .collect(),
        ),
        _ => WriteOutcome::OtherFailure(context),
    }
}

fn to_sdk_record(record: &MeasurementRecord) -> Result<Record, BuildError> {
    // ---
    let dimension = Dimension::builder()
        .name(DIMENSION_NAME)
        .value(&record.sensor_id)
        .build()?;

    Ok(Record::builder()
        .dimensions(dimension)
        .measure_name(record.measure_name.as_str())
        .measure_value(&record.measure_value)
        .measure_value_type(MeasureValueType::Double)
        .time(record.time_ms.to_string())
        .time_unit(TimeUnit::Milliseconds)
        .build())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::MeasureName;
    use aws_sdk_timestreamwrite::types::error::RejectedRecordsException;
    use aws_sdk_timestreamwrite::types::{RecordsIngested, RejectedRecord as SdkRejectedRecord};
    use aws_smithy_runtime_api::http::{Response, StatusCode};
    use aws_smithy_types::body::SdkBody;

    fn http_response(status: u16) -> Response {
        Response::new(StatusCode::try_from(status).unwrap(), SdkBody::empty())
    }

    #[test]
    fn test_sdk_record_mapping() {
        // ---
        let record = MeasurementRecord {
            sensor_id: "bc123".to_string(),
            measure_name: MeasureName::Co2,
            measure_value: "410".to_string(),
            time_ms: 1_700_000_000_123,
        };

        let sdk = to_sdk_record(&record).unwrap();

        assert_eq!(sdk.measure_name(), Some("SensorCO2"));
        assert_eq!(sdk.measure_value(), Some("410"));
        assert_eq!(sdk.measure_value_type(), Some(&MeasureValueType::Double));
        assert_eq!(sdk.time(), Some("1700000000123"));
        assert_eq!(sdk.time_unit(), Some(&TimeUnit::Milliseconds));

        let dims = sdk.dimensions();
        assert_eq!(dims.len(), 1);
        assert_eq!(dims[0].name(), "Sensor");
        assert_eq!(dims[0].value(), "bc123");
    }

    #[test]
    fn test_classify_success_reports_ingested_count() {
        // ---
        let output = WriteRecordsOutput::builder()
            .records_ingested(RecordsIngested::builder().total(5).memory_store(5).build())
            .build();

        assert_eq!(
            classify_write(Ok(output)),
            WriteOutcome::Success {
                status: 200,
                records_ingested: Some(5)
            }
        );
    }

    #[test]
    fn test_classify_rejected_records() {
        // ---
        let rejected = RejectedRecordsException::builder()
            .message("One or more records have been rejected")
            .rejected_records(
                SdkRejectedRecord::builder()
                    .record_index(1)
                    .reason("The record timestamp is outside the time range")
                    .build(),
            )
            .rejected_records(SdkRejectedRecord::builder().record_index(4).build())
            .build();
        let err = SdkError::service_error(
            WriteRecordsError::RejectedRecordsException(rejected),
            http_response(419),
        );

        assert_eq!(
            classify_write(Err(err)),
            WriteOutcome::PartialRejection(vec![
                RejectedRecord {
                    index: 1,
                    reason: "The record timestamp is outside the time range".to_string(),
                },
                RejectedRecord {
                    index: 4,
                    reason: String::new(),
                },
            ])
        );
    }

    #[test]
    fn test_classify_timeout_keeps_cause() {
        // ---
        let err: SdkError<WriteRecordsError> =
            SdkError::timeout_error("connection to 127.0.0.1:1 timed out");

        match classify_write(Err(err)) {
            WriteOutcome::OtherFailure(message) => {
                assert!(message.contains("connection to 127.0.0.1:1 timed out"), "{message}");
            }
            other => panic!("expected OtherFailure, got {other:?}"),
        }
    }
}
