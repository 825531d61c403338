use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    map::MapView,
    models::trip::{LocationId, Trip, TripId},
    state::AppState,
    views::{nav::HeaderNav, trip_list::TripListView},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(trips_list))
        .route("/api/trips", get(trips_json))
        .route("/:id/delete", post(delete_trip))
        .route("/:id/locations/:location_id/comments", post(add_comment))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    q: String,
    selected: Option<TripId>,
}

impl ListQuery {
    fn apply(&self, view: &mut TripListView) {
        view.set_query(self.q.clone());
        if let Some(id) = self.selected {
            view.select(id);
        }
    }
}

fn list_url(query: &str, selected: Option<TripId>) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    if !query.is_empty() {
        params.append_pair("q", query);
    }
    if let Some(id) = selected {
        params.append_pair("selected", &id.to_string());
    }
    let params = params.finish();
    if params.is_empty() {
        "/active-trips".to_string()
    } else {
        format!("/active-trips?{params}")
    }
}

struct TripRow {
    id: TripId,
    name: String,
    dates: String,
    destination_count: usize,
    selected: bool,
    select_url: String,
    delete_url: String,
}

struct LocationDetail {
    id: LocationId,
    name: String,
    description: String,
    comments: Vec<String>,
}

struct TripDetail {
    id: TripId,
    name: String,
    dates: String,
    locations: Vec<LocationDetail>,
    map_json: String,
}

impl TripDetail {
    fn from_trip(trip: &Trip) -> Self {
        Self {
            id: trip.id,
            name: trip.name.clone(),
            dates: trip.date_range_text(),
            locations: trip
                .locations
                .iter()
                .map(|loc| LocationDetail {
                    id: loc.id,
                    name: loc.name.clone(),
                    description: loc.description.clone(),
                    comments: loc.comments().to_vec(),
                })
                .collect(),
            map_json: MapView::new(&trip.locations, true, false).to_json(),
        }
    }
}

#[derive(Template)]
#[template(path = "trips_list.html")]
struct TripsListTemplate {
    nav: HeaderNav,
    query: String,
    trips: Vec<TripRow>,
    has_selection: bool,
    selected: Vec<TripDetail>,
}

async fn trips_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let storage = state.trip_storage(user.id).await;
    let mut view = TripListView::load(&storage).await?;
    query.apply(&mut view);

    let selected_id = view.selected_id();
    let trips = view
        .visible()
        .into_iter()
        .map(|trip| TripRow {
            id: trip.id,
            name: trip.name.clone(),
            dates: trip.date_range_text(),
            destination_count: trip.locations.len(),
            selected: selected_id == Some(trip.id),
            select_url: list_url(view.query(), Some(trip.id)),
            delete_url: format!(
                "/active-trips/{}/delete{}",
                trip.id,
                list_url(view.query(), selected_id).trim_start_matches("/active-trips")
            ),
        })
        .collect();
    let selected: Vec<TripDetail> = view.selected().map(TripDetail::from_trip).into_iter().collect();

    Ok(AskamaTemplateResponse::into_response(TripsListTemplate {
        nav: HeaderNav::for_user(&current),
        query: view.query().to_string(),
        trips,
        has_selection: !selected.is_empty(),
        selected,
    }))
}

async fn trips_json(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Trip>>, AppError> {
    let user = current.require_user()?;
    let storage = state.trip_storage(user.id).await;
    Ok(Json(storage.load_trips().await?))
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<TripId>,
    Query(query): Query<ListQuery>,
) -> Result<Redirect, AppError> {
    let user = current.require_user()?;
    let storage = state.trip_storage(user.id).await;
    let mut view = TripListView::load(&storage).await?;
    query.apply(&mut view);
    view.delete(&storage, trip_id).await?;
    Ok(Redirect::to(&list_url(view.query(), view.selected_id())))
}

#[derive(Deserialize)]
struct CommentForm {
    comment: String,
}

async fn add_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, location_id)): Path<(TripId, LocationId)>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let user = current.require_user()?;
    let storage = state.trip_storage(user.id).await;
    let mut view = TripListView::load(&storage).await?;
    view.select(trip_id);
    view.add_comment(&storage, location_id, &form.comment).await?;
    Ok(Redirect::to(&list_url("", view.selected_id())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_urls_carry_query_and_selection() {
        assert_eq!(list_url("", None), "/active-trips");
        assert_eq!(list_url("", Some(5)), "/active-trips?selected=5");
        assert_eq!(
            list_url("paris trip", Some(5)),
            "/active-trips?q=paris+trip&selected=5"
        );
    }
}
