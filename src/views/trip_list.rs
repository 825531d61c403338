use tracing::info;

use crate::{
    error::AppError,
    models::trip::{LocationId, Trip, TripId},
    services::{storage::TripStorage, trips},
};

/// The saved-trips page: every stored trip, a name filter and the trip on display.
///
/// The displayed trip is held as an id and looked up in `trips` on every
/// read, so it can never go stale after a mutation.
#[derive(Debug, Clone, Default)]
pub struct TripListView {
    trips: Vec<Trip>,
    query: String,
    selected: Option<TripId>,
}

impl TripListView {
    pub async fn load(storage: &TripStorage) -> Result<Self, AppError> {
        Ok(Self::from_trips(storage.load_trips().await?))
    }

    pub fn from_trips(trips: Vec<Trip>) -> Self {
        Self {
            trips,
            ..Self::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn visible(&self) -> Vec<&Trip> {
        trips::filter_trips(&self.trips, &self.query)
    }

    /// Unknown ids leave nothing on display.
    pub fn select(&mut self, trip_id: TripId) {
        self.selected = self
            .trips
            .iter()
            .any(|trip| trip.id == trip_id)
            .then_some(trip_id);
    }

    pub fn selected_id(&self) -> Option<TripId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Trip> {
        let id = self.selected?;
        self.trips.iter().find(|trip| trip.id == id)
    }

    pub async fn delete(&mut self, storage: &TripStorage, trip_id: TripId) -> Result<bool, AppError> {
        let mut removed = false;
        self.trips = storage
            .update(|stored| {
                removed = trips::delete_trip(stored, trip_id);
                Ok(())
            })
            .await?;
        if self.selected == Some(trip_id) {
            self.selected = None;
        }
        if removed {
            info!(trip_id, "deleted trip");
        }
        Ok(removed)
    }

    /// Appends to a location of the displayed trip. Blank comments are ignored.
    pub async fn add_comment(
        &mut self,
        storage: &TripStorage,
        location_id: LocationId,
        comment: &str,
    ) -> Result<(), AppError> {
        let trip_id = self.selected.ok_or(AppError::NotFound)?;
        let comment = comment.trim();
        if comment.is_empty() {
            return Ok(());
        }
        self.trips = storage
            .update(|stored| trips::add_comment(stored, trip_id, location_id, comment))
            .await?;
        info!(trip_id, location_id, "added comment");
        Ok(())
    }
}
