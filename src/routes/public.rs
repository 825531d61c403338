use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    models::user::Credentials,
    state::AppState,
    views::nav::HeaderNav,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/learn-more", get(learn_more))
        .route("/sign-in", get(sign_in_form).post(sign_in_submit))
        .route("/sign-out", post(sign_out))
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    nav: HeaderNav,
}

async fn landing(current: CurrentUser) -> impl IntoResponse {
    AskamaTemplateResponse::into_response(LandingTemplate {
        nav: HeaderNav::for_user(&current),
    })
}

#[derive(Template)]
#[template(path = "learn_more.html")]
struct LearnMoreTemplate {
    nav: HeaderNav,
}

async fn learn_more(current: CurrentUser) -> impl IntoResponse {
    AskamaTemplateResponse::into_response(LearnMoreTemplate {
        nav: HeaderNav::for_user(&current),
    })
}

#[derive(Template)]
#[template(path = "auth/sign_in.html")]
pub struct SignInTemplate {
    nav: HeaderNav,
    show_error: bool,
    error_message: String,
    name: String,
    email: String,
}

async fn sign_in_form(current: CurrentUser) -> Response {
    if current.0.is_some() {
        return Redirect::to("/start-planning").into_response();
    }
    AskamaTemplateResponse::into_response(SignInTemplate {
        nav: HeaderNav::for_user(&current),
        show_error: false,
        error_message: String::new(),
        name: String::new(),
        email: String::new(),
    })
}

async fn sign_in_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<Response, AppError> {
    match auth::sign_in(
        state.identity.as_ref(),
        jar,
        &credentials,
        state.config.session_max_age,
    )
    .await
    {
        Ok((jar, _identity)) => Ok((jar, Redirect::to("/start-planning")).into_response()),
        Err(AppError::Unauthorized) => Ok(render_sign_in_error(
            credentials,
            "Sign in failed. Please enter your name.".into(),
        )),
        Err(AppError::Validation(msg)) => Ok(render_sign_in_error(credentials, msg)),
        Err(err) => Err(err),
    }
}

fn render_sign_in_error(credentials: Credentials, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(SignInTemplate {
            nav: HeaderNav::new(Default::default(), None),
            show_error: true,
            error_message: message,
            name: credentials.name,
            email: credentials.email,
        }),
    )
        .into_response()
}

async fn sign_out(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (auth::clear_session_cookie(jar), Redirect::to("/"))
}
