use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Same email (or name, when no email is given) always maps to the same id,
    /// so a returning user finds their trips again.
    pub fn derive(name: &str, email: &str) -> Self {
        let key = if email.trim().is_empty() {
            name.trim()
        } else {
            email.trim()
        };
        Self {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, key.to_lowercase().as_bytes()),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}
