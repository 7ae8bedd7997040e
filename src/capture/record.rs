//! The record reported to the collector for each exchange.

use std::time::Duration;

use bytes::Bytes;
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Raw bytes of one finished exchange.
///
/// This is what the request path hands over. Decoding into a
/// [`CapturedRecord`] happens later, on the reporting task.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub correlation_id: Option<String>,
    pub request_body: Bytes,
    pub response_body: Bytes,
    pub elapsed: Duration,
    pub path: String,
}

impl Exchange {
    pub fn into_record(self) -> CapturedRecord {
        CapturedRecord::new(
            self.correlation_id,
            &self.request_body,
            &self.response_body,
            self.elapsed,
            self.path,
        )
    }
}

/// One captured request/response exchange.
///
/// Built from an [`Exchange`] on the reporting task, serialized, and
/// dropped after a single delivery attempt. Fields are private so a record
/// cannot change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    request_body: String,
    response_body: String,
    elapsed_seconds: f64,
    path: String,
    timestamp: String,
}

impl CapturedRecord {
    /// Assemble a record stamped with the current local time.
    ///
    /// Bodies are rendered as UTF-8; invalid sequences become U+FFFD.
    pub fn new(
        correlation_id: Option<String>,
        request_body: &[u8],
        response_body: &[u8],
        elapsed: Duration,
        path: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            request_body: String::from_utf8_lossy(request_body).into_owned(),
            response_body: String::from_utf8_lossy(response_body).into_owned(),
            elapsed_seconds: elapsed.as_secs_f64(),
            path: path.into(),
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn request_body(&self) -> &str {
        &self.request_body
    }

    pub fn response_body(&self) -> &str {
        &self.response_body
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Serialize to the flat JSON object the collector expects.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
