use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ReminderId = String;

#[derive(Debug, Error)]
#[error("Epoch milliseconds {0} are out of the representable range")]
pub struct InvalidFireTime(pub i64);

/// Instant at which a reminder fires, kept at millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ReminderFireTime(DateTime<Utc>);

impl ReminderFireTime {
    pub fn new(inner: DateTime<Utc>) -> Self {
        let normalized = DateTime::from_timestamp_millis(inner.timestamp_millis())
            .expect("Millis taken from a valid DateTime are always in range.");
        Self(normalized)
    }

    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    pub fn time(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn into_time(self) -> DateTime<Utc> {
        self.0
    }

    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl TryFrom<i64> for ReminderFireTime {
    type Error = InvalidFireTime;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_millis(value).ok_or(InvalidFireTime(value))
    }
}

impl From<ReminderFireTime> for i64 {
    fn from(value: ReminderFireTime) -> Self {
        value.as_millis()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    #[serde(default)]
    pub id: ReminderId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "dateTime")]
    pub fire_at: ReminderFireTime,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Reminder {
    pub fn alarm_key(&self) -> i32 {
        alarm_key(&self.id)
    }
}

/// 31-multiplier hash over UTF-16 code units. Armed timers are keyed by this value.
pub fn alarm_key(id: &str) -> i32 {
    id.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDateTime, TimeZone};
    use proptest_arbitrary_interop::arb;

    use super::*;

    #[test]
    fn alarm_key_matches_known_values() {
        assert_eq!(alarm_key(""), 0);
        assert_eq!(alarm_key("a"), 97);
        assert_eq!(alarm_key("r1"), 114 * 31 + 49);
    }

    #[test]
    fn colliding_identifiers_share_an_alarm_key() {
        assert_eq!(alarm_key("Aa"), alarm_key("BB"));
    }

    #[test]
    fn reminder_maps_to_document_shape() {
        let reminder = Reminder {
            id: "r1".to_string(),
            title: "Water plants".to_string(),
            fire_at: ReminderFireTime::from_millis(1_700_000_000_000).unwrap(),
            notes: None,
            image_url: Some("file:///img".to_string()),
        };

        let value = serde_json::to_value(&reminder).unwrap();

        assert_eq!(value["dateTime"], 1_700_000_000_000i64);
        assert_eq!(value["imageUrl"], "file:///img");
        assert!(value["notes"].is_null());
    }

    #[test]
    fn document_without_optional_fields_decodes() {
        let value = serde_json::json!({ "title": "Call mom", "dateTime": 5 });

        let reminder: Reminder = serde_json::from_value(value).unwrap();

        assert_eq!(reminder.id, "");
        assert_eq!(reminder.fire_at.as_millis(), 5);
        assert_eq!(reminder.notes, None);
    }

    proptest::proptest! {
        #[test]
        fn fire_time_drops_sub_millisecond_precision(naive in arb::<NaiveDateTime>()) {
            let time = Utc.from_utc_datetime(&naive);
            let fire_at = ReminderFireTime::new(time);

            assert_eq!(fire_at.as_millis(), time.timestamp_millis());
            assert!(fire_at.time().timestamp_subsec_nanos() % 1_000_000 == 0);
        }
    }
}
