use chrono::{DateTime, Local, NaiveDateTime, Timelike};

/// The one format deadlines are written in, both to the database and to JSON payloads.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Formats older databases may contain: minute precision, slashes, or the `T` separator.
const LEGACY_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

pub fn to_storage(deadline: &NaiveDateTime) -> String {
    deadline.format(STORAGE_FORMAT).to_string()
}

/// Parses a stored deadline. Accepts the canonical format first, then the legacy ones, then
/// RFC 3339 (the offset is dropped and the wall-clock part kept).
pub fn parse(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, STORAGE_FORMAT) {
        return Some(parsed);
    }
    for format in LEGACY_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| truncate_to_seconds(parsed.naive_local()))
}

pub fn truncate_to_seconds(deadline: NaiveDateTime) -> NaiveDateTime {
    deadline.with_nanosecond(0).unwrap_or(deadline)
}

/// Current local wall-clock time at second precision.
pub fn now_local() -> NaiveDateTime {
    truncate_to_seconds(Local::now().naive_local())
}

/// `#[serde(with = "crate::deadline::serde_format")]`
pub mod serde_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_storage(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid deadline: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn writes_the_canonical_format() {
        assert_eq!(to_storage(&at(2025, 1, 1, 9, 0, 5)), "2025-01-01 09:00:05");
    }

    #[test]
    fn reads_every_format_older_databases_used() {
        let expected = at(2025, 3, 4, 18, 30, 0);
        for raw in [
            "2025-03-04 18:30:00",
            "2025-03-04 18:30",
            "2025/03/04 18:30",
            "2025/03/04 18:30:00",
            "2025-03-04T18:30:00",
            "2025-03-04T18:30",
            "2025-03-04T18:30:00+09:00",
            "  2025-03-04 18:30:00 ",
        ] {
            assert_eq!(parse(raw), Some(expected), "format {raw:?}");
        }
    }

    #[test]
    fn rejects_garbage_and_empty_values() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("tomorrow"), None);
        assert_eq!(parse("2025-13-01 00:00:00"), None);
    }

    #[test]
    fn truncation_drops_subsecond_part() {
        let precise = at(2025, 1, 1, 9, 0, 0)
            .with_nanosecond(123_456_789)
            .unwrap();
        assert_eq!(truncate_to_seconds(precise), at(2025, 1, 1, 9, 0, 0));
        assert_eq!(now_local().nanosecond(), 0);
    }

    #[test]
    fn serde_format_uses_storage_layout() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "super::serde_format")]
            deadline: NaiveDateTime,
        }

        let value = serde_json::to_value(Wrapper {
            deadline: at(2099, 1, 1, 9, 0, 0),
        })
        .expect("serialize");
        assert_eq!(value, serde_json::json!({ "deadline": "2099-01-01 09:00:00" }));

        let back: Wrapper =
            serde_json::from_value(serde_json::json!({ "deadline": "2099/01/01 09:00" }))
                .expect("deserialize legacy layout");
        assert_eq!(back.deadline, at(2099, 1, 1, 9, 0, 0));

        assert!(serde_json::from_value::<Wrapper>(serde_json::json!({ "deadline": "soon" })).is_err());
    }
}
