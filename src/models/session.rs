use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Loading,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub exp: DateTime<Utc>,
}

impl SessionClaims {
    pub fn issue(identity: &Identity, max_age: Duration) -> Self {
        Self {
            sub: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            exp: Utc::now() + max_age,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}
