use crate::sanitize::{sanitize_path, sanitize_peer_name, substitute_characters};
use crate::types::{format_value, Metric};
use chrono::Utc;

#[test]
fn metric_rejects_empty_path_and_non_finite_values() {
    let now = Utc::now();
    assert!(Metric::new("", 1.0, now).is_none());
    assert!(Metric::new("a.b", f64::NAN, now).is_none());
    assert!(Metric::new("a.b", f64::INFINITY, now).is_none());
    assert!(Metric::new("a.b", 1.0, now).is_some());
}

#[test]
fn with_prefix_prepends_dotted_prefix() {
    let m = Metric::new("connections.current", 42.0, Utc::now()).unwrap();
    assert_eq!(
        m.with_prefix("host1.mongo").path,
        "host1.mongo.connections.current"
    );
    assert_eq!(m.with_prefix("").path, "connections.current");
}

#[test]
fn format_value_avoids_scientific_notation_and_trailing_zero() {
    assert_eq!(format_value(42.0), "42");
    assert_eq!(format_value(-3.0), "-3");
    assert_eq!(format_value(0.5), "0.5");
    assert_eq!(format_value(1234567890123.0), "1234567890123");
}

#[test]
fn sanitize_replaces_illegal_characters() {
    assert_eq!(sanitize_path("a b/c"), "a_b_c");
    assert_eq!(sanitize_path("serverStatus.mem.resident"), "serverStatus.mem.resident");
    assert_eq!(sanitize_path("oplog_maxsizeMB"), "oplog_maxsizeMB");
}

#[test]
fn sanitize_collapses_and_trims_dots() {
    assert_eq!(sanitize_path(".a..b."), "a.b");
    assert_eq!(sanitize_path("...x..."), "x");
}

#[test]
fn sanitize_is_idempotent() {
    for s in ["a b/c", ".a..b.", "plain.path", "über.metric", "%usage"] {
        let once = sanitize_path(s);
        assert_eq!(sanitize_path(&once), once);
    }
}

#[test]
fn substitute_is_idempotent() {
    for s in ["cpu %used", "a,b", "it's \"quoted\""] {
        let once = substitute_characters(s);
        assert_eq!(substitute_characters(&once), once);
    }
}

#[test]
fn peer_names_become_path_safe() {
    assert_eq!(sanitize_peer_name("db-02.example.com:27017"), "db-02-example-com_27017");
}
