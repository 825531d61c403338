use crate::{auth::CurrentUser, models::session::SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
}

/// Header navigation, driven by the session status only.
#[derive(Debug, Clone)]
pub struct HeaderNav {
    pub status: SessionStatus,
    pub display_name: String,
}

impl HeaderNav {
    pub fn new(status: SessionStatus, display_name: Option<&str>) -> Self {
        Self {
            status,
            display_name: display_name.unwrap_or_default().to_string(),
        }
    }

    pub fn for_user(current: &CurrentUser) -> Self {
        Self::new(current.status(), current.display_name())
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn links(&self) -> Vec<NavLink> {
        match self.status {
            SessionStatus::Loading => Vec::new(),
            SessionStatus::Unauthenticated => vec![
                NavLink {
                    href: "/learn-more",
                    label: "Learn More",
                },
                NavLink {
                    href: "/sign-in",
                    label: "Sign In",
                },
            ],
            SessionStatus::Authenticated => vec![
                NavLink {
                    href: "/start-planning",
                    label: "Start Planning",
                },
                NavLink {
                    href: "/active-trips",
                    label: "Active Trips",
                },
            ],
        }
    }
}
