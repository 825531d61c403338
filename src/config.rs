use std::{env, net::SocketAddr, path::PathBuf};

use chrono::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub data_root: PathBuf,
    pub cookie_secret: String,
    pub session_max_age: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let data_root = env::var("DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-travel-companion-cookie-secret".to_string());

        let max_age_hours: i64 = env::var("SESSION_MAX_AGE_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid SESSION_MAX_AGE_HOURS: {err}")))?;
        if max_age_hours <= 0 {
            return Err(AppError::Config(
                "SESSION_MAX_AGE_HOURS must be positive".into(),
            ));
        }

        Ok(Self {
            listen_addr,
            data_root,
            cookie_secret,
            session_max_age: Duration::hours(max_age_hours),
        })
    }
}
