use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A sub-interval of an entry excluded from worked time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BreakPeriod {
    #[serde(with = "hhmm")]
    #[schema(example = "12:00", value_type = String)]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    #[schema(example = "13:00", value_type = String)]
    pub end_time: NaiveTime,
}

/// One continuous clocked-in/clocked-out record for a single date.
///
/// `in_time` and `out_time` are optional on read paths: an entry missing
/// either one is carried along for display but contributes nothing to totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 1)]
    pub id: Option<u64>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(default, with = "hhmm::option")]
    #[schema(example = "09:00", value_type = Option<String>)]
    pub in_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option")]
    #[schema(example = "17:00", value_type = Option<String>)]
    pub out_time: Option<NaiveTime>,
    #[serde(default, alias = "break_periods")]
    pub breaks: Vec<BreakPeriod>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Break as typed into the add-entry form; both ends may still be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewBreakPeriod {
    #[serde(default, alias = "start", with = "hhmm::option")]
    #[schema(example = "12:00", value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[serde(default, alias = "end", with = "hhmm::option")]
    #[schema(example = "13:00", value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
}

/// Payload for `POST /timesheets/{id}/entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewTimeEntry {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(default, with = "hhmm::option")]
    #[schema(example = "09:00", value_type = Option<String>)]
    pub in_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option")]
    #[schema(example = "17:00", value_type = Option<String>)]
    pub out_time: Option<NaiveTime>,
    #[serde(default)]
    pub breaks: Vec<NewBreakPeriod>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewTimeEntry {
    /// Converts a validated payload into an entry. Returns `None` if a
    /// required time is missing; callers run `validation::validate_new_entry`
    /// first.
    pub fn into_entry(self) -> Option<TimeEntry> {
        let breaks = self
            .breaks
            .into_iter()
            .map(|b| {
                Some(BreakPeriod {
                    start_time: b.start_time?,
                    end_time: b.end_time?,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(TimeEntry {
            id: None,
            date: self.date,
            in_time: Some(self.in_time?),
            out_time: Some(self.out_time?),
            breaks,
            project: self.project,
            note: self.note,
        })
    }
}

/// `HH:mm` wall-clock times. Seconds are accepted on input and dropped on
/// output.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%H:%M";

    pub fn parse(s: &str) -> Option<NaiveTime> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid time '{raw}', expected HH:mm")))
    }

    pub mod option {
        use super::{FORMAT, parse};
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_str(&t.format(FORMAT).to_string()),
                None => s.serialize_none(),
            }
        }

        /// Blank strings are treated like `null`, the way an empty time input
        /// arrives from a form.
        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid time '{raw}', expected HH:mm"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_reads_break_periods_alias_and_hhmm() {
        let entry: TimeEntry = serde_json::from_value(json!({
            "id": 7,
            "date": "2026-01-05",
            "in_time": "09:00:00",
            "out_time": "17:30",
            "break_periods": [{ "start_time": "12:00", "end_time": "12:45" }]
        }))
        .unwrap();

        assert_eq!(entry.in_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(entry.breaks.len(), 1);

        let out = serde_json::to_value(&entry).unwrap();
        assert_eq!(out["in_time"], "09:00");
        assert_eq!(out["out_time"], "17:30");
    }

    #[test]
    fn blank_form_times_become_none() {
        let entry: NewTimeEntry = serde_json::from_value(json!({
            "date": "2026-01-05",
            "in_time": "",
            "out_time": "17:00",
            "breaks": [{ "start": "12:00", "end": "" }]
        }))
        .unwrap();

        assert!(entry.in_time.is_none());
        assert!(entry.breaks[0].end_time.is_none());
        assert!(entry.into_entry().is_none());
    }

    #[test]
    fn garbage_time_is_rejected() {
        let res: Result<BreakPeriod, _> =
            serde_json::from_value(json!({ "start_time": "noon", "end_time": "13:00" }));
        assert!(res.is_err());
    }
}
