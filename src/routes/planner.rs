use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};
use tracing::warn;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::LocationId,
    state::AppState,
    views::{editor::TripEditor, nav::HeaderNav},
};

const PLANNER: &str = "/start-planning";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(planner_page))
        .route("/new", post(new_trip))
        .route("/details", post(update_details))
        .route("/locations", post(place_location))
        .route("/locations/:id/delete", post(remove_location))
        .route("/locations/:id/select", post(select_location))
        .route("/comment", post(add_comment))
        .route("/toggle-editing", post(toggle_editing))
        .route("/toggle-route", post(toggle_route))
        .route("/save", post(save_trip))
}

struct LocationRow {
    id: LocationId,
    stop: usize,
    name: String,
    description: String,
    comments: Vec<String>,
    selected: bool,
}

#[derive(Template)]
#[template(path = "planner.html")]
struct PlannerTemplate {
    nav: HeaderNav,
    has_draft: bool,
    name: String,
    start_date: String,
    end_date: String,
    is_editing: bool,
    show_route: bool,
    locations: Vec<LocationRow>,
    map_json: String,
    show_error: bool,
    error_message: String,
}

fn render(nav: HeaderNav, editor: &TripEditor, error: Option<String>) -> Response {
    let draft = editor.draft();
    let selected = draft.and_then(|d| d.selected_location);
    let format_date = |date: Option<NaiveDate>| {
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };
    let template = PlannerTemplate {
        nav,
        has_draft: draft.is_some(),
        name: draft.map(|d| d.name.clone()).unwrap_or_default(),
        start_date: format_date(draft.and_then(|d| d.start_date)),
        end_date: format_date(draft.and_then(|d| d.end_date)),
        is_editing: editor.is_editing(),
        show_route: editor.show_route(),
        locations: editor
            .locations()
            .iter()
            .enumerate()
            .map(|(index, loc)| LocationRow {
                id: loc.id,
                stop: index + 1,
                name: loc.name.clone(),
                description: loc.description.clone(),
                comments: loc.comments().to_vec(),
                selected: selected == Some(loc.id),
            })
            .collect(),
        map_json: editor.map_view().to_json(),
        show_error: error.is_some(),
        error_message: error.unwrap_or_default(),
    };
    if template.show_error {
        (
            StatusCode::BAD_REQUEST,
            AskamaTemplateResponse::into_response(template),
        )
            .into_response()
    } else {
        AskamaTemplateResponse::into_response(template)
    }
}

/// Runs `action` against the user's editor. Validation failures re-render
/// the planner with the message; anything else propagates.
async fn with_editor<F>(state: &AppState, current: &CurrentUser, action: F) -> Result<Response, AppError>
where
    F: FnOnce(&mut TripEditor) -> Result<(), AppError>,
{
    let user = current.require_user()?;
    let editor = state.drafts.for_user(user.id).await;
    let mut editor = editor.lock().await;
    match action(&mut *editor) {
        Ok(()) => Ok(Redirect::to(PLANNER).into_response()),
        Err(AppError::Validation(message)) => {
            Ok(render(HeaderNav::for_user(current), &editor, Some(message)))
        }
        Err(err) => Err(err),
    }
}

async fn planner_page(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let editor = state.drafts.for_user(user.id).await;
    let editor = editor.lock().await;
    Ok(render(HeaderNav::for_user(&current), &editor, None))
}

async fn new_trip(State(state): State<AppState>, current: CurrentUser) -> Result<Response, AppError> {
    with_editor(&state, &current, |editor| {
        editor.new_trip();
        Ok(())
    })
    .await
}

#[derive(Deserialize)]
struct DetailsForm {
    name: String,
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    end_date: String,
}

fn parse_date_field(label: &str, raw: &str) -> Result<Option<NaiveDate>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{label} is not a valid date")))
}

async fn update_details(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<DetailsForm>,
) -> Result<Response, AppError> {
    with_editor(&state, &current, |editor| {
        let start = parse_date_field("Start date", &form.start_date)?;
        let end = parse_date_field("End date", &form.end_date)?;
        editor.set_name(form.name)?;
        editor.set_start_date(start)?;
        editor.set_end_date(end)
    })
    .await
}

/// The coordinates come from hidden inputs that stay empty until the map is clicked.
#[serde_as]
#[derive(Deserialize)]
struct PlaceForm {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    latitude: Option<f64>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

async fn place_location(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<PlaceForm>,
) -> Result<Response, AppError> {
    with_editor(&state, &current, |editor| {
        let (Some(lat), Some(lng)) = (form.latitude, form.longitude) else {
            warn!("marker placement ignored: no map position chosen");
            return Ok(());
        };
        let placed = editor.place_marker(lat, lng, &form.name, &form.description)?;
        if placed.is_none() {
            warn!("marker placement ignored");
        }
        Ok(())
    })
    .await
}

async fn remove_location(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(location_id): Path<LocationId>,
) -> Result<Response, AppError> {
    with_editor(&state, &current, |editor| {
        editor.remove_location(location_id).map(|_| ())
    })
    .await
}

async fn select_location(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(location_id): Path<LocationId>,
) -> Result<Response, AppError> {
    with_editor(&state, &current, |editor| editor.select_location(location_id)).await
}

#[derive(Deserialize)]
struct CommentForm {
    comment: String,
}

async fn add_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    with_editor(&state, &current, |editor| editor.add_comment(&form.comment)).await
}

async fn toggle_editing(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    with_editor(&state, &current, |editor| {
        editor.toggle_editing();
        Ok(())
    })
    .await
}

async fn toggle_route(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    with_editor(&state, &current, |editor| {
        editor.toggle_route();
        Ok(())
    })
    .await
}

async fn save_trip(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let storage = state.trip_storage(user.id).await;
    let editor = state.drafts.for_user(user.id).await;
    let mut editor = editor.lock().await;
    match editor.save(&storage).await {
        Ok(trip) => Ok(Redirect::to(&format!("/active-trips?selected={}", trip.id)).into_response()),
        Err(AppError::Validation(message)) => {
            Ok(render(HeaderNav::for_user(&current), &editor, Some(message)))
        }
        Err(err) => Err(err),
    }
}
