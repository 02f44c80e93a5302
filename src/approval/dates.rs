use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire encodings for dates in approval payloads.
///
/// Gateways built on the standard OData v2 JSON format expect
/// `/Date(<millis>)/`; services that map straight onto ABAP `DATS`/`TIMESTAMP`
/// fields expect flat digit strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateEncoding {
    Edm,
    Abap,
}

impl DateEncoding {
    pub fn encode_date(self, value: NaiveDateTime) -> String {
        match self {
            DateEncoding::Edm => edm(value.and_utc()),
            DateEncoding::Abap => value.format("%Y%m%d").to_string(),
        }
    }

    pub fn encode_timestamp(self, value: DateTime<Utc>) -> String {
        match self {
            DateEncoding::Edm => edm(value),
            DateEncoding::Abap => value.format("%Y%m%d%H%M%S").to_string(),
        }
    }

    /// Re-encode a date read from the backend; unreadable values become `None`.
    pub fn reencode(self, raw: Option<&str>) -> Option<String> {
        raw.and_then(parse_backend_date)
            .map(|value| self.encode_date(value))
    }

    /// Like [`DateEncoding::reencode`], keeping the time of day.
    pub fn reencode_timestamp(self, raw: Option<&str>) -> Option<String> {
        raw.and_then(parse_backend_date)
            .map(|value| self.encode_timestamp(value.and_utc()))
    }
}

impl fmt::Display for DateEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DateEncoding::Edm => "edm",
            DateEncoding::Abap => "abap",
        })
    }
}

fn edm(value: DateTime<Utc>) -> String {
    format!("/Date({})/", value.timestamp_millis())
}

/// Parse any date form the payment services have been seen to return.
pub fn parse_backend_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(inner) = raw
        .strip_prefix("/Date(")
        .and_then(|rest| rest.strip_suffix(")/"))
    {
        // Optional "+hhmm"/"-hhmm" offset after the millis is informational only.
        let millis_end = inner
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '+' || *c == '-')
            .map(|(i, _)| i)
            .unwrap_or(inner.len());
        let millis: i64 = inner[..millis_end].parse().ok()?;
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    if raw.chars().all(|c| c.is_ascii_digit()) {
        return match raw.len() {
            8 => NaiveDate::parse_from_str(raw, "%Y%m%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            14 => NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S").ok(),
            _ => None,
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn june_10() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn edm_encoding_uses_epoch_millis() {
        assert_eq!(
            DateEncoding::Edm.encode_date(june_10()),
            "/Date(1717977600000)/"
        );
        let ts = Utc.with_ymd_and_hms(2024, 6, 10, 14, 30, 5).unwrap();
        assert_eq!(
            DateEncoding::Edm.encode_timestamp(ts),
            "/Date(1718029805000)/"
        );
    }

    #[test]
    fn abap_encoding_is_flat_digits() {
        assert_eq!(DateEncoding::Abap.encode_date(june_10()), "20240610");
        let ts = Utc.with_ymd_and_hms(2024, 6, 10, 14, 30, 5).unwrap();
        assert_eq!(DateEncoding::Abap.encode_timestamp(ts), "20240610143005");
    }

    #[test]
    fn parses_backend_forms() {
        let expected = Some(june_10());
        assert_eq!(parse_backend_date("/Date(1717977600000)/"), expected);
        assert_eq!(parse_backend_date("/Date(1717977600000+0530)/"), expected);
        assert_eq!(parse_backend_date("2024-06-10T00:00:00Z"), expected);
        assert_eq!(parse_backend_date("2024-06-10T00:00:00"), expected);
        assert_eq!(parse_backend_date("2024-06-10"), expected);
        assert_eq!(parse_backend_date("20240610"), expected);
        assert_eq!(parse_backend_date("20240610000000"), expected);
    }

    #[test]
    fn unreadable_dates_are_dropped() {
        assert_eq!(parse_backend_date(""), None);
        assert_eq!(parse_backend_date("00000000"), None);
        assert_eq!(parse_backend_date("soon"), None);
        assert_eq!(DateEncoding::Abap.reencode(None), None);
        assert_eq!(
            DateEncoding::Abap.reencode(Some("/Date(1717977600000)/")),
            Some("20240610".to_string())
        );
    }

    #[test]
    fn timestamps_keep_the_time_of_day() {
        assert_eq!(
            DateEncoding::Abap.reencode_timestamp(Some("20240601143005")),
            Some("20240601143005".to_string())
        );
        assert_eq!(
            DateEncoding::Abap.reencode_timestamp(Some("/Date(1718029805000)/")),
            Some("20240610143005".to_string())
        );
        assert_eq!(
            DateEncoding::Edm.reencode_timestamp(Some("20240610143005")),
            Some("/Date(1718029805000)/".to_string())
        );
        assert_eq!(DateEncoding::Abap.reencode_timestamp(Some("soon")), None);
    }

    #[test]
    fn negative_epoch_survives() {
        let parsed = parse_backend_date("/Date(-86400000)/").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "1969-12-31");
    }
}
