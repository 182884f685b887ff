//! Test helper utilities and common testing patterns

use chrono::{DateTime, TimeZone, Utc};

/// Fixed evaluation clock used by builders: Monday 2024-01-01 00:00:00 UTC
pub fn test_now() -> DateTime<Utc> {
    utc(2024, 1, 1, 0, 0)
}

/// Shorthand for a UTC instant; panics on an invalid date
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid test date {year}-{month}-{day} {hour}:{minute}"))
}

/// Set up logging for tests (safe to call from every test)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// Assert that the collection contains exactly the expected items, in any order
pub fn assert_contains_exactly<T: PartialEq + std::fmt::Debug>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "length mismatch: actual {actual:?}, expected {expected:?}"
    );
    for item in expected {
        assert!(actual.contains(item), "missing {item:?} in {actual:?}");
    }
}
