//! `/health` endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracelink_store::events::format_timestamp;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the listener is running.
    pub status: &'static str,
    /// Current UTC time, ISO 8601 with `Z`.
    pub time: String,
}

pub fn health_check(now: DateTime<Utc>) -> HealthResponse {
    HealthResponse {
        status: "ok",
        time: format_timestamp(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_is_ok() {
        assert_eq!(health_check(Utc::now()).status, "ok");
    }

    #[test]
    fn time_is_utc_iso8601() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let resp = health_check(at);
        assert_eq!(resp.time, "2024-05-06T07:08:09.000000Z");
    }

    #[test]
    fn serializes_two_fields() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let value = serde_json::to_value(health_check(at)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"status": "ok", "time": "2024-05-06T07:08:09.000000Z"})
        );
    }
}
