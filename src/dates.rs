use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    start_text: String,
    end_text: String,
}

impl DateRange {
    pub fn from_inputs(start: &str, end: &str) -> Result<Self, String> {
        let (start_at, start_text) = parse_bound(start, Bound::Start)
            .map_err(|err| format!("start: {err}"))?;
        let (end_at, end_text) =
            parse_bound(end, Bound::End).map_err(|err| format!("end: {err}"))?;
        if start_at > end_at {
            return Err("Start cannot be after end.".to_string());
        }
        Ok(Self {
            start: start_at,
            end: end_at,
            start_text,
            end_text,
        })
    }

    pub fn start(&self) -> &str {
        &self.start_text
    }

    pub fn end(&self) -> &str {
        &self.end_text
    }

    pub fn seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

pub fn format_utc(value: DateTime<Utc>) -> String {
    value.format(WIRE_FORMAT).to_string()
}

pub fn now_utc() -> String {
    format_utc(Utc::now())
}

/// Accepts RFC 3339 timestamps verbatim and widens bare `YYYY-MM-DD` dates
/// to the first or last second of that day in UTC.
pub fn normalize_timestamp(value: &str, bound: Bound) -> Result<String, String> {
    parse_bound(value, bound).map(|(_, text)| text)
}

fn parse_bound(value: &str, bound: Bound) -> Result<(DateTime<Utc>, String), String> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok((parsed.with_timezone(&Utc), value.to_string()));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        "Invalid timestamp. Use ISO 8601 (2024-01-01T09:00:00Z) or YYYY-MM-DD.".to_string()
    })?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
    };
    let at = Utc.from_utc_datetime(&date.and_time(time));
    Ok((at, format_utc(at)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_utc_uses_wire_layout() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(format_utc(at), "2024-03-05T07:08:09Z");
    }

    #[test]
    fn now_utc_is_parseable() {
        let now = now_utc();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), 20);
        assert!(DateTime::parse_from_rfc3339(&now).is_ok());
    }

    #[test]
    fn rfc3339_input_is_kept_verbatim() {
        let value = normalize_timestamp("2024-01-01T09:00:00+02:00", Bound::Start).unwrap();
        assert_eq!(value, "2024-01-01T09:00:00+02:00");
    }

    #[test]
    fn bare_dates_widen_to_day_bounds() {
        assert_eq!(
            normalize_timestamp("2024-01-01", Bound::Start).unwrap(),
            "2024-01-01T00:00:00Z"
        );
        assert_eq!(
            normalize_timestamp("2024-01-31", Bound::End).unwrap(),
            "2024-01-31T23:59:59Z"
        );
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        assert!(normalize_timestamp("01/02/2024", Bound::Start).is_err());
    }

    #[test]
    fn range_rejects_reversed_bounds() {
        let err = DateRange::from_inputs("2024-01-02T00:00:00Z", "2024-01-01T00:00:00Z")
            .unwrap_err();
        assert_eq!(err, "Start cannot be after end.");
    }

    #[test]
    fn range_keeps_inputs_and_measures_length() {
        let range = DateRange::from_inputs("2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z").unwrap();
        assert_eq!(range.start(), "2024-01-01T09:00:00Z");
        assert_eq!(range.end(), "2024-01-01T10:00:00Z");
        assert_eq!(range.seconds(), 3600);
    }

    #[test]
    fn single_day_range_is_valid() {
        let range = DateRange::from_inputs("2024-01-01", "2024-01-01").unwrap();
        assert_eq!(range.seconds(), 86_399);
    }
}
