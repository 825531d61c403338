use chrono::Utc;

use crate::{
    error::AppError,
    models::trip::{LocationId, Trip, TripId},
};

/// Trips whose name contains `query`, ignoring case. Whitespace in the query
/// is matched literally, so only the empty query keeps everything.
pub fn filter_trips<'a>(trips: &'a [Trip], query: &str) -> Vec<&'a Trip> {
    let needle = query.to_lowercase();
    trips
        .iter()
        .filter(|trip| needle.is_empty() || trip.name.to_lowercase().contains(&needle))
        .collect()
}

/// Returns whether a trip was removed.
pub fn delete_trip(trips: &mut Vec<Trip>, trip_id: TripId) -> bool {
    let before = trips.len();
    trips.retain(|trip| trip.id != trip_id);
    trips.len() != before
}

pub fn add_comment(
    trips: &mut [Trip],
    trip_id: TripId,
    location_id: LocationId,
    comment: &str,
) -> Result<(), AppError> {
    let location = trips
        .iter_mut()
        .find(|trip| trip.id == trip_id)
        .and_then(|trip| trip.location_mut(location_id))
        .ok_or(AppError::NotFound)?;
    location.push_comment(comment);
    Ok(())
}

/// Millisecond timestamp, bumped past `taken` so two saves in the same
/// millisecond still get distinct ids.
pub fn next_id(taken: impl IntoIterator<Item = i64>) -> i64 {
    let now = Utc::now().timestamp_millis();
    match taken.into_iter().max() {
        Some(max) if max >= now => max + 1,
        _ => now,
    }
}

pub fn next_trip_id(trips: &[Trip]) -> TripId {
    next_id(trips.iter().map(|trip| trip.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::Location;
    use chrono::NaiveDate;

    fn trip(id: TripId, name: &str) -> Trip {
        Trip {
            id,
            name: name.into(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            locations: vec![
                Location {
                    id: 10,
                    name: "Louvre".into(),
                    description: "Museum".into(),
                    coordinates: (48.86, 2.33),
                    comments: None,
                },
                Location {
                    id: 11,
                    name: "Eiffel Tower".into(),
                    description: "Tower".into(),
                    coordinates: (48.85, 2.29),
                    comments: Some(vec!["Evening visit".into()]),
                },
            ],
        }
    }

    #[test]
    fn filter_ignores_case_and_keeps_all_on_empty_query() {
        let trips = vec![trip(1, "Paris Trip"), trip(2, "Roman Holiday")];
        let names = |q: &str| {
            filter_trips(&trips, q)
                .into_iter()
                .map(|t| t.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names("paris"), vec!["Paris Trip"]);
        assert_eq!(names("TRIP"), vec!["Paris Trip"]);
        assert!(names("tokyo").is_empty());
        assert_eq!(names("").len(), 2);
    }

    #[test]
    fn filter_matches_whitespace_literally() {
        let trips = vec![trip(1, "Paris Trip"), trip(2, "Roman Holiday")];
        let count = |q: &str| filter_trips(&trips, q).len();
        assert_eq!(count("trip "), 0);
        assert_eq!(count("   "), 0);
        assert_eq!(count("s t"), 1);
        assert_eq!(count(" "), 2);
    }

    #[test]
    fn delete_removes_only_the_matching_trip() {
        let mut trips = vec![trip(1, "Paris Trip"), trip(2, "Rome"), trip(3, "Oslo")];
        assert!(delete_trip(&mut trips, 2));
        assert_eq!(trips.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(!delete_trip(&mut trips, 2));
        assert_eq!(trips.len(), 2);
    }

    #[test]
    fn comment_touches_only_the_target_location() {
        let mut trips = vec![trip(1, "Paris Trip"), trip(2, "Rome")];
        add_comment(&mut trips, 1, 10, "Book tickets").unwrap();

        assert_eq!(trips[0].locations[0].comments(), ["Book tickets".to_string()]);
        assert_eq!(trips[0].locations[1].comments(), ["Evening visit".to_string()]);
        assert_eq!(trips[1], trip(2, "Rome"));

        assert!(matches!(
            add_comment(&mut trips, 1, 99, "lost"),
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            add_comment(&mut trips, 9, 10, "lost"),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn ids_stay_unique_when_clock_is_behind() {
        let far_future = Utc::now().timestamp_millis() + 60_000;
        assert_eq!(next_id([far_future]), far_future + 1);
        assert!(next_id([]) > 0);
    }
}
