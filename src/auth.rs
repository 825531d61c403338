use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::{
    error::AppError,
    models::{
        session::{SessionClaims, SessionStatus},
        user::{Credentials, Identity},
    },
};

pub const SESSION_COOKIE: &str = "travel_session";

/// Turns submitted credentials into an identity. Real deployments plug in
/// their own identity system here.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authorize(&self, credentials: &Credentials) -> Result<Identity, AppError>;
}

/// Accepts any non-empty name. Passwords are not checked.
#[derive(Debug, Clone, Default)]
pub struct StubCredentialsProvider;

#[async_trait]
impl IdentityProvider for StubCredentialsProvider {
    async fn authorize(&self, credentials: &Credentials) -> Result<Identity, AppError> {
        if credentials.name.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(Identity::derive(&credentials.name, &credentials.email))
    }
}

pub async fn sign_in(
    provider: &dyn IdentityProvider,
    jar: PrivateCookieJar,
    credentials: &Credentials,
    max_age: Duration,
) -> Result<(PrivateCookieJar, Identity), AppError> {
    let identity = provider.authorize(credentials).await?;
    let claims = SessionClaims::issue(&identity, max_age);
    info!(user = %identity.id, "signed in");
    Ok((apply_session_cookie(jar, &claims)?, identity))
}

pub fn apply_session_cookie(
    jar: PrivateCookieJar,
    claims: &SessionClaims,
) -> Result<PrivateCookieJar, AppError> {
    let value = serde_json::to_string(claims)?;
    let cookie = Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    Ok(jar.add(cookie))
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

pub fn read_session(jar: &PrivateCookieJar) -> Option<SessionClaims> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let claims: SessionClaims = match serde_json::from_str(cookie.value()) {
        Ok(claims) => claims,
        Err(err) => {
            debug!("dropping undecodable session: {err}");
            return None;
        }
    };
    if claims.is_expired_at(Utc::now()) {
        debug!(user = %claims.sub, "session expired");
        return None;
    }
    Some(claims)
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(Self(Some(identity.clone())));
        }

        let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };
        Ok(Self(read_session(&jar).map(|claims| claims.identity())))
    }
}

impl CurrentUser {
    pub fn status(&self) -> SessionStatus {
        match self.0 {
            Some(_) => SessionStatus::Authenticated,
            None => SessionStatus::Unauthenticated,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.0.as_ref().map(|identity| identity.name.as_str())
    }

    pub fn require_user(&self) -> Result<&Identity, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(name: &str, email: &str) -> Credentials {
        Credentials {
            name: name.into(),
            email: email.into(),
            password: "whatever".into(),
        }
    }

    #[tokio::test]
    async fn stub_accepts_any_named_user() {
        let provider = StubCredentialsProvider;
        let identity = provider
            .authorize(&credentials("Ada", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(identity.name, "Ada");
        let again = provider
            .authorize(&credentials("Ada L.", "ADA@example.com"))
            .await
            .unwrap();
        assert_eq!(identity.id, again.id);

        assert!(matches!(
            provider.authorize(&credentials("  ", "x@example.com")).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn session_cookie_round_trips_and_expires() {
        let jar = PrivateCookieJar::new(Key::from(&[7u8; 64]));
        let identity = Identity::derive("Ada", "ada@example.com");

        let live = SessionClaims::issue(&identity, Duration::hours(24));
        let jar = apply_session_cookie(jar, &live).unwrap();
        assert_eq!(read_session(&jar), Some(live));

        let stale = SessionClaims::issue(&identity, Duration::seconds(-1));
        let jar = apply_session_cookie(jar, &stale).unwrap();
        assert_eq!(read_session(&jar), None);

        let jar = clear_session_cookie(jar);
        assert!(jar.get(SESSION_COOKIE).is_none());
    }
}
