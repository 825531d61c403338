use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{
    error::AppError,
    map::{MapView, MarkerPlacement},
    models::trip::{Location, LocationId, Trip},
    services::{storage::TripStorage, trips},
};

pub const INCOMPLETE_TRIP_MESSAGE: &str =
    "Please fill in all required fields and add at least one location";
pub const NO_DRAFT_MESSAGE: &str = "Start a new trip first";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Editing,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripDraft {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub locations: Vec<Location>,
    /// Location that receives the next comment.
    pub selected_location: Option<LocationId>,
}

impl TripDraft {
    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && self.start_date.is_some()
            && self.end_date.is_some()
            && !self.locations.is_empty()
    }
}

/// The planner page. Nothing here is durable until [`TripEditor::save`] succeeds.
#[derive(Debug, Clone, Default)]
pub struct TripEditor {
    draft: Option<TripDraft>,
    is_editing: bool,
    show_route: bool,
    placement: MarkerPlacement,
}

impl TripEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditorState {
        match self.draft {
            Some(_) => EditorState::Editing,
            None => EditorState::Idle,
        }
    }

    pub fn draft(&self) -> Option<&TripDraft> {
        self.draft.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.is_editing
    }

    pub fn show_route(&self) -> bool {
        self.show_route
    }

    pub fn locations(&self) -> &[Location] {
        self.draft
            .as_ref()
            .map(|draft| draft.locations.as_slice())
            .unwrap_or(&[])
    }

    pub fn map_view(&self) -> MapView {
        MapView::new(self.locations(), self.show_route, self.is_editing)
    }

    pub fn new_trip(&mut self) {
        self.draft = Some(TripDraft::default());
        self.placement = MarkerPlacement::default();
        self.is_editing = true;
    }

    fn draft_mut(&mut self) -> Result<&mut TripDraft, AppError> {
        self.draft
            .as_mut()
            .ok_or_else(|| AppError::Validation(NO_DRAFT_MESSAGE.into()))
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), AppError> {
        self.draft_mut()?.name = name.into();
        Ok(())
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) -> Result<(), AppError> {
        self.draft_mut()?.start_date = date;
        Ok(())
    }

    pub fn set_end_date(&mut self, date: Option<NaiveDate>) -> Result<(), AppError> {
        self.draft_mut()?.end_date = date;
        Ok(())
    }

    pub fn toggle_editing(&mut self) {
        self.is_editing = !self.is_editing;
    }

    pub fn toggle_route(&mut self) {
        self.show_route = !self.show_route;
    }

    /// Appends a location reported by the map. A clashing id is replaced with a fresh one.
    pub fn add_location(&mut self, mut location: Location) -> Result<LocationId, AppError> {
        let draft = self.draft_mut()?;
        if draft.locations.iter().any(|loc| loc.id == location.id) {
            location.id = trips::next_id(draft.locations.iter().map(|loc| loc.id));
        }
        let id = location.id;
        debug!(location_id = id, name = %location.name, "added location to draft");
        draft.locations.push(location);
        Ok(id)
    }

    /// Click-and-name placement as the map widget does it. Returns the new
    /// location id, or `None` when the click or name was not accepted.
    pub fn place_marker(
        &mut self,
        latitude: f64,
        longitude: f64,
        name: &str,
        description: &str,
    ) -> Result<Option<LocationId>, AppError> {
        let draft = self.draft_mut()?;
        let id = trips::next_id(draft.locations.iter().map(|loc| loc.id));
        let is_editing = self.is_editing;
        if !self.placement.click(is_editing, latitude, longitude) {
            return Ok(None);
        }
        match self.placement.confirm(name, description, id) {
            Some(location) => self.add_location(location).map(Some),
            None => Ok(None),
        }
    }

    pub fn remove_location(&mut self, location_id: LocationId) -> Result<bool, AppError> {
        let draft = self.draft_mut()?;
        let before = draft.locations.len();
        draft.locations.retain(|loc| loc.id != location_id);
        if draft.selected_location == Some(location_id) {
            draft.selected_location = None;
        }
        Ok(draft.locations.len() != before)
    }

    pub fn select_location(&mut self, location_id: LocationId) -> Result<(), AppError> {
        let draft = self.draft_mut()?;
        if !draft.locations.iter().any(|loc| loc.id == location_id) {
            return Err(AppError::NotFound);
        }
        draft.selected_location = Some(location_id);
        Ok(())
    }

    /// Blank comments are ignored and keep the selection.
    pub fn add_comment(&mut self, comment: &str) -> Result<(), AppError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Ok(());
        }
        let draft = self.draft_mut()?;
        let location_id = draft.selected_location.ok_or(AppError::NotFound)?;
        let location = draft
            .locations
            .iter_mut()
            .find(|loc| loc.id == location_id)
            .ok_or(AppError::NotFound)?;
        location.push_comment(comment);
        draft.selected_location = None;
        Ok(())
    }

    /// Stores the draft as a new trip and returns to idle. An incomplete
    /// draft is rejected and left exactly as it was.
    pub async fn save(&mut self, storage: &TripStorage) -> Result<Trip, AppError> {
        let draft = match &self.draft {
            Some(draft) if draft.is_complete() => draft.clone(),
            _ => return Err(AppError::Validation(INCOMPLETE_TRIP_MESSAGE.into())),
        };
        let (Some(start_date), Some(end_date)) = (draft.start_date, draft.end_date) else {
            return Err(AppError::Validation(INCOMPLETE_TRIP_MESSAGE.into()));
        };

        let mut saved = None;
        storage
            .update(|stored| {
                let trip = Trip {
                    id: trips::next_trip_id(stored),
                    name: draft.name,
                    start_date,
                    end_date,
                    locations: draft.locations,
                };
                stored.push(trip.clone());
                saved = Some(trip);
                Ok(())
            })
            .await?;
        let trip = saved.ok_or(AppError::NotFound)?;

        self.draft = None;
        self.is_editing = false;
        self.placement = MarkerPlacement::default();
        info!(trip_id = trip.id, name = %trip.name, "saved trip");
        Ok(trip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::{MemoryKeyValueStore, TRIPS_SLOT};
    use std::sync::Arc;

    fn storage() -> TripStorage {
        TripStorage::new(Arc::new(MemoryKeyValueStore::new()), TRIPS_SLOT)
    }

    fn date(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 5, day)
    }

    fn filled_editor() -> TripEditor {
        let mut editor = TripEditor::new();
        editor.new_trip();
        editor.set_name("Paris Trip").unwrap();
        editor.set_start_date(date(1)).unwrap();
        editor.set_end_date(date(3)).unwrap();
        editor
            .place_marker(48.8566, 2.3522, "Paris", "The City of Light")
            .unwrap()
            .unwrap();
        editor
    }

    #[test]
    fn idle_editor_rejects_edits() {
        let mut editor = TripEditor::new();
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(matches!(
            editor.set_name("Paris"),
            Err(AppError::Validation(_))
        ));
        editor.new_trip();
        assert_eq!(editor.state(), EditorState::Editing);
        assert!(editor.is_editing());
    }

    #[test]
    fn markers_need_edit_mode() {
        let mut editor = TripEditor::new();
        editor.new_trip();
        editor.toggle_editing();
        assert_eq!(editor.place_marker(1.0, 2.0, "A", "").unwrap(), None);
        editor.toggle_editing();
        assert!(editor.place_marker(1.0, 2.0, "A", "").unwrap().is_some());
        assert_eq!(editor.locations().len(), 1);
    }

    #[test]
    fn duplicate_location_ids_are_replaced() {
        let mut editor = filled_editor();
        let existing = editor.locations()[0].clone();
        let id = editor.add_location(existing.clone()).unwrap();
        assert_ne!(id, existing.id);
        assert!(editor.remove_location(existing.id).unwrap());
        assert_eq!(editor.locations().len(), 1);
        assert!(!editor.remove_location(existing.id).unwrap());
    }

    #[test]
    fn comments_go_to_the_selected_location() {
        let mut editor = filled_editor();
        let id = editor.locations()[0].id;
        assert!(matches!(editor.add_comment("x"), Err(AppError::NotFound)));
        editor.select_location(id).unwrap();
        editor.add_comment("   ").unwrap();
        assert_eq!(editor.draft().unwrap().selected_location, Some(id));
        editor.add_comment("Must visit the Louvre").unwrap();
        assert_eq!(
            editor.locations()[0].comments(),
            ["Must visit the Louvre".to_string()]
        );
        assert_eq!(editor.draft().unwrap().selected_location, None);
    }

    #[tokio::test]
    async fn incomplete_drafts_are_not_saved() {
        let storage = storage();
        let mut editor = filled_editor();
        editor.set_end_date(None).unwrap();
        let before = editor.draft().cloned();

        let err = editor.save(&storage).await.unwrap_err();
        assert_eq!(err.to_string(), INCOMPLETE_TRIP_MESSAGE);
        assert_eq!(editor.draft().cloned(), before);
        assert!(storage.load_trips().await.unwrap().is_empty());

        let mut idle = TripEditor::new();
        assert!(matches!(
            idle.save(&storage).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn save_appends_and_resets() {
        let storage = storage();
        let first = filled_editor().save(&storage).await.unwrap();

        let mut editor = filled_editor();
        editor.set_name("Rome").unwrap();
        let second = editor.save(&storage).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(!editor.is_editing());
        let stored = storage.load_trips().await.unwrap();
        assert_eq!(stored, vec![first, second]);
    }

    #[tokio::test]
    async fn saved_name_keeps_its_spacing() {
        let storage = storage();
        let mut editor = filled_editor();
        editor.set_name(" Paris Trip ").unwrap();

        let trip = editor.save(&storage).await.unwrap();
        assert_eq!(trip.name, " Paris Trip ");
        assert_eq!(storage.load_trips().await.unwrap()[0].name, " Paris Trip ");
    }
}
