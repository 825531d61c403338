use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

pub type TripId = i64;
pub type LocationId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub name: String,
    #[serde(with = "calendar_date")]
    pub start_date: NaiveDate,
    #[serde(with = "calendar_date")]
    pub end_date: NaiveDate,
    pub locations: Vec<Location>,
}

impl Trip {
    pub fn location_mut(&mut self, location_id: LocationId) -> Option<&mut Location> {
        self.locations.iter_mut().find(|loc| loc.id == location_id)
    }

    pub fn date_range_text(&self) -> String {
        format!(
            "{} - {}",
            self.start_date.format("%b %-d, %Y"),
            self.end_date.format("%b %-d, %Y")
        )
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub description: String,
    /// `(latitude, longitude)`, stored as a two-element array.
    pub coordinates: (f64, f64),
    #[serde(default)]
    pub comments: Option<Vec<String>>,
}

impl Location {
    pub fn comments(&self) -> &[String] {
        self.comments.as_deref().unwrap_or(&[])
    }

    pub fn push_comment(&mut self, comment: impl Into<String>) {
        self.comments.get_or_insert_with(Vec::new).push(comment.into());
    }
}

/// Calendar dates are written as `YYYY-MM-DD`. Older data holds full
/// timestamps such as `2024-05-01T22:00:00.000Z`; those read back as their UTC date.
pub mod calendar_date {
    use super::*;
    use serde::{de::Error as _, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw:?}")))
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, FORMAT) {
            return Some(date);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.naive_utc().date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_and_timestamp_dates() {
        assert_eq!(
            calendar_date::parse("2024-05-01"),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert_eq!(
            calendar_date::parse("2024-05-01T22:00:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert_eq!(
            calendar_date::parse("2024-05-02T01:30:00+03:00"),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert_eq!(calendar_date::parse("next tuesday"), None);
    }

    #[test]
    fn json_layout_matches_stored_shape() {
        let raw = r#"{"id":1,"name":"Paris Trip","startDate":"2024-05-01T00:00:00.000Z","endDate":"2024-05-03","locations":[{"id":7,"name":"Louvre","description":"Museum","coordinates":[48.86,2.33]}]}"#;
        let trip: Trip = serde_json::from_str(raw).unwrap();
        assert_eq!(trip.locations[0].coordinates, (48.86, 2.33));
        assert!(trip.locations[0].comments().is_empty());

        let value = serde_json::to_value(&trip).unwrap();
        assert_eq!(value["startDate"], "2024-05-01");
        assert_eq!(value["endDate"], "2024-05-03");
        assert!(value["locations"][0].get("comments").is_none());
        assert_eq!(value["locations"][0]["coordinates"][1], 2.33);
    }
}
