/// Promotional event scheduling
///
/// An event configuration describes a promotional window (celebration
/// music, themed UI) that the client apps switch on while the window is
/// open. Admins maintain a schedule of these; at most one is active at
/// any moment.

pub mod schedule;

pub use schedule::ScheduleStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scheduled event configuration.
///
/// Timestamps are stored as strings exactly as the admin UI wrote them;
/// they are parsed (and validated) only at resolution time. Unknown
/// display fields are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventConfig {
    #[serde(default)]
    pub is_active_global: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub celebration_music_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub celebration_music_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Display-only fields preserved verbatim for the clients
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventConfig {
    /// Parsed window bounds, or None if either bound is missing or
    /// unparseable. A candidate without a valid window never matches.
    fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = parse_timestamp(self.celebration_music_start.as_deref()?)?;
        let end = parse_timestamp(self.celebration_music_end.as_deref()?)?;
        Some((start, end))
    }
}

/// Parse a stored timestamp string, returning None on any failure.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Select the active event configuration, if any.
///
/// A candidate survives when its global flag is set, both window bounds
/// parse, and `now` lies inside the window (bounds inclusive). Among
/// survivors the one with the latest start wins, so a freshly started
/// event takes over from a still-open earlier one. Pure function; the
/// caller fetches the candidate pool per request.
pub fn resolve_active_event(
    candidates: &[EventConfig],
    now: DateTime<Utc>,
) -> Option<&EventConfig> {
    candidates
        .iter()
        .filter_map(|config| {
            if !config.is_active_global {
                return None;
            }
            let (start, end) = config.window()?;
            if start <= now && now <= end {
                Some((start, config))
            } else {
                None
            }
        })
        .max_by_key(|(start, _)| *start)
        .map(|(_, config)| config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(active: bool, start: &str, end: &str) -> EventConfig {
        EventConfig {
            is_active_global: active,
            celebration_music_start: Some(start.to_string()),
            celebration_music_end: Some(end.to_string()),
            title: None,
            message: None,
            theme: None,
            extra: serde_json::Map::new(),
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_no_active_candidates() {
        let candidates = vec![
            config(false, "2026-01-01T00:00:00Z", "2026-12-31T00:00:00Z"),
            config(false, "2026-06-01T00:00:00Z", "2026-06-30T00:00:00Z"),
        ];
        let now = at("2026-06-15T12:00:00Z");
        assert!(resolve_active_event(&candidates, now).is_none());
    }

    #[test]
    fn test_outside_every_window() {
        let candidates = vec![
            config(true, "2026-01-01T00:00:00Z", "2026-01-31T00:00:00Z"),
            config(true, "2026-03-01T00:00:00Z", "2026-03-31T00:00:00Z"),
        ];
        let now = at("2026-02-14T12:00:00Z");
        assert!(resolve_active_event(&candidates, now).is_none());
    }

    #[test]
    fn test_latest_start_wins_on_overlap() {
        let earlier = config(true, "2026-06-01T00:00:00Z", "2026-06-30T00:00:00Z");
        let later = config(true, "2026-06-10T00:00:00Z", "2026-06-20T00:00:00Z");
        let candidates = vec![earlier, later.clone()];
        let now = at("2026-06-15T12:00:00Z");
        assert_eq!(resolve_active_event(&candidates, now), Some(&later));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let candidates = vec![config(
            true,
            "2026-06-01T00:00:00Z",
            "2026-06-30T00:00:00Z",
        )];
        assert!(resolve_active_event(&candidates, at("2026-06-01T00:00:00Z")).is_some());
        assert!(resolve_active_event(&candidates, at("2026-06-30T00:00:00Z")).is_some());
        assert!(resolve_active_event(&candidates, at("2026-06-30T00:00:01Z")).is_none());
    }

    #[test]
    fn test_malformed_timestamps_excluded() {
        let candidates = vec![
            config(true, "not-a-date", "2026-06-30T00:00:00Z"),
            config(true, "2026-06-01T00:00:00Z", "also garbage"),
        ];
        let now = at("2026-06-15T12:00:00Z");
        assert!(resolve_active_event(&candidates, now).is_none());
    }

    #[test]
    fn test_missing_bounds_excluded() {
        let mut open_ended = config(true, "2026-06-01T00:00:00Z", "2026-06-30T00:00:00Z");
        open_ended.celebration_music_end = None;
        let now = at("2026-06-15T12:00:00Z");
        assert!(resolve_active_event(&[open_ended], now).is_none());
    }

    #[test]
    fn test_single_active_window_matches() {
        let candidates = vec![
            config(true, "2026-06-01T00:00:00Z", "2026-06-30T00:00:00Z"),
            config(true, "2026-08-01T00:00:00Z", "2026-08-31T00:00:00Z"),
        ];
        let now = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
        let active = resolve_active_event(&candidates, now).unwrap();
        assert_eq!(
            active.celebration_music_start.as_deref(),
            Some("2026-08-01T00:00:00Z")
        );
    }

    #[test]
    fn test_display_fields_pass_through_serde() {
        let raw = serde_json::json!({
            "is_active_global": true,
            "celebration_music_start": "2026-06-01T00:00:00Z",
            "celebration_music_end": "2026-06-30T00:00:00Z",
            "title": "Summer promo",
            "banner_color": "#ff9900"
        });
        let config: EventConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.title.as_deref(), Some("Summer promo"));
        assert_eq!(
            config.extra.get("banner_color").and_then(|v| v.as_str()),
            Some("#ff9900")
        );
    }
}
