//! Serialization tests for the model types.

use chrono::{TimeZone, Utc};

use super::*;

#[test]
fn test_snapshot_roundtrip_preserves_every_field() {
    let fetched = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
    let snapshot = UsageSnapshot::new(45, Some(60), fetched)
        .with_short_window_reset(Some(fetched + chrono::Duration::hours(3)))
        .with_weekly_reset(Some(fetched + chrono::Duration::days(4)));

    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: UsageSnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, snapshot);
}

#[test]
fn test_snapshot_optional_fields_default() {
    let json = r#"{"short_window_percent": 12, "fetched_at": "2025-01-01T00:00:00Z"}"#;
    let parsed: UsageSnapshot = serde_json::from_str(json).unwrap();

    assert_eq!(parsed.short_window_percent(), 12);
    assert_eq!(parsed.weekly_percent(), None);
    assert_eq!(parsed.short_window_reset_at(), None);
    assert_eq!(parsed.weekly_reset_at(), None);
}

#[test]
fn test_snapshot_missing_fetched_at_is_rejected() {
    let json = r#"{"short_window_percent": 12}"#;
    assert!(serde_json::from_str::<UsageSnapshot>(json).is_err());
}

#[test]
fn test_source_serialization() {
    assert_eq!(serde_json::to_string(&SnapshotSource::Live).unwrap(), r#""live""#);
    assert_eq!(serde_json::to_string(&SnapshotSource::Cache).unwrap(), r#""cache""#);
}

#[test]
fn test_severity_serialization() {
    assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), r#""warning""#);
    assert_eq!(serde_json::to_string(&Staleness::Unknown).unwrap(), r#""unknown""#);
}

#[test]
fn test_credential_roundtrip() {
    let acquired = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
    let credential = Credential::new([("sessionKey", "sk"), ("lastActiveOrg", "org")], acquired);

    let json = serde_json::to_string(&credential).unwrap();
    let parsed: Credential = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, credential);
}

#[test]
fn test_refresh_outcome_serialization() {
    let json = serde_json::to_value(RefreshOutcome::TransportError("dns".to_string())).unwrap();
    assert_eq!(json["kind"], "transport_error");
    assert_eq!(json["detail"], "dns");

    let json = serde_json::to_value(RefreshOutcome::AuthExpired).unwrap();
    assert_eq!(json["kind"], "auth_expired");
}

#[test]
fn test_report_serialization() {
    let report = UsageReport {
        snapshot: None,
        staleness: Staleness::Unknown,
        severity: None,
        needs_renewal: true,
        refreshing: false,
        last_error: Some("Session expired, log in again".to_string()),
        generated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    };

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["staleness"], "unknown");
    assert!(json["severity"].is_null());
    assert_eq!(json["needs_renewal"], true);
}
