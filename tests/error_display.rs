use std::time::Duration;

use pagecap_lib::error::ErrorCategory;
use pagecap_lib::CaptureError;

#[test]
fn config_error_display_includes_message() {
    let err = CaptureError::Config("missing viewport".to_string());

    assert_eq!(format!("{}", err), "Configuration error: missing viewport");
}

#[test]
fn io_error_display_wraps_source() {
    let io_err = std::io::Error::other("disk full");
    let err: CaptureError = io_err.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("IO error: "));
    assert!(rendered.contains("disk full"));
}

#[test]
fn timeout_helper_names_operation() {
    let err = CaptureError::timeout("browser launch", Duration::from_secs(30));

    assert_eq!(
        format!("{}", err),
        "Timed out during browser launch after 30s"
    );
    assert!(err.is_transient());
}

#[test]
fn browser_helper_is_transient() {
    let err = CaptureError::browser("target closed");

    assert_eq!(format!("{}", err), "Browser error: target closed");
    assert!(err.is_transient());
    assert!(!CaptureError::Config("x".into()).is_transient());
}

#[test]
fn payload_categories_follow_variants() {
    assert_eq!(
        CaptureError::Config("x".into()).to_payload().category,
        ErrorCategory::Config
    );
    assert_eq!(
        CaptureError::Navigation("dns".into()).to_payload().category,
        ErrorCategory::Network
    );
    assert_eq!(
        CaptureError::Cache("x".into()).to_payload().category,
        ErrorCategory::Cache
    );
    assert!(CaptureError::browser("x").to_payload().remediation.is_some());
}
