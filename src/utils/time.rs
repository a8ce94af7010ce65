use chrono::{DateTime, SecondsFormat, Utc};

/// This is the standard way of naming a capture file in screenrelay.
pub fn capture_filename(moment: DateTime<Utc>) -> String {
    format!("screenshot_{}.png", moment.timestamp_millis())
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2018-07-04T10:00:00.000Z`.
pub fn iso_timestamp(moment: DateTime<Utc>) -> String {
    moment.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Human readable age of `then` relative to `now`. Future moments are treated as "just now".
pub fn relative_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    match seconds {
        s if s < 45 => "a few seconds ago".into(),
        s if s < 90 => "a minute ago".into(),
        s if s < 45 * 60 => format!("{} minutes ago", (s + 30) / 60),
        s if s < 90 * 60 => "an hour ago".into(),
        s if s < 22 * 3600 => format!("{} hours ago", (s + 1800) / 3600),
        s if s < 36 * 3600 => "a day ago".into(),
        s => format!("{} days ago", (s + 43200) / 86400),
    }
}
