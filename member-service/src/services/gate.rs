//! Navigation gate: classifies a requested path for the current session.
//!
//! The gate is read-only. It maps the session to one of four states, looks up
//! the path's [`Surface`] in a [`RouteTable`], and answers with a
//! [`GateOutcome`]. Paths the table does not know are treated as app surfaces.

use serde::Serialize;

use super::access_policy::AccessPolicy;
use super::session::SessionState;
use crate::models::{ProfileRecord, Role};

/// What kind of screen a path leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Public,
    App,
    Moderation,
    Admin,
    AwaitingScreen,
    BannedScreen,
    SignOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    Allow,
    RedirectPublic { redirect_to: String },
    ShowAwaiting { redirect_to: String },
    ShowBanned { redirect_to: String },
    RedirectInsufficientPrivilege { redirect_to: String },
}

impl GateOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            GateOutcome::Allow => "allow",
            GateOutcome::RedirectPublic { .. } => "redirect_public",
            GateOutcome::ShowAwaiting { .. } => "show_awaiting",
            GateOutcome::ShowBanned { .. } => "show_banned",
            GateOutcome::RedirectInsufficientPrivilege { .. } => "redirect_insufficient_privilege",
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GateOutcome::Allow)
    }
}

/// Gate view of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No session, an unresolved session, or a visitor-level profile.
    Unauthenticated,
    Awaiting,
    Banned,
    Active {
        role: Role,
        leadership_onboarding_done: bool,
    },
}

impl GateState {
    pub fn from_session(session: &SessionState) -> Self {
        match session {
            SessionState::Resolved(profile) => Self::from_profile(profile),
            SessionState::Unauthenticated | SessionState::Unresolved { .. } => {
                GateState::Unauthenticated
            }
        }
    }

    pub fn from_profile(profile: &ProfileRecord) -> Self {
        let role = profile.role;
        if AccessPolicy::is_banned(role) {
            GateState::Banned
        } else if AccessPolicy::is_awaiting_approval(role) {
            GateState::Awaiting
        } else if AccessPolicy::may_use_app(role) {
            GateState::Active {
                role,
                leadership_onboarding_done: profile.leadership_onboarding_done,
            }
        } else {
            GateState::Unauthenticated
        }
    }
}

/// Redirect targets used by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePaths {
    pub public_home: String,
    pub app_home: String,
    pub awaiting: String,
    pub suspended: String,
    pub leadership_onboarding: String,
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            public_home: "/".to_string(),
            app_home: "/app".to_string(),
            awaiting: "/awaiting-approval".to_string(),
            suspended: "/suspended".to_string(),
            leadership_onboarding: "/onboarding/leadership".to_string(),
        }
    }
}

/// Path-prefix to surface declarations, matched on whole path segments.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<(String, Surface)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, prefix: &str, surface: Surface) -> Self {
        let prefix = normalize_path(prefix);
        self.routes.retain(|(existing, _)| *existing != prefix);
        self.routes.push((prefix, surface));
        self
    }

    /// Surface for `path`. The longest matching prefix wins; an unmatched
    /// path is an app surface.
    pub fn surface_for(&self, path: &str) -> Surface {
        let path = normalize_path(path);
        self.routes
            .iter()
            .filter(|(prefix, _)| prefix_matches(prefix, &path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, surface)| *surface)
            .unwrap_or(Surface::App)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, Surface)> {
        self.routes.iter().map(|(p, s)| (p.as_str(), *s))
    }
}

/// Routes of the platform's screens.
pub fn default_routes(paths: &GatePaths) -> RouteTable {
    RouteTable::new()
        .route(&paths.public_home, Surface::Public)
        .route("/login", Surface::Public)
        .route("/signup", Surface::Public)
        .route("/about", Surface::Public)
        .route("/terms", Surface::Public)
        .route("/privacy", Surface::Public)
        .route(&paths.awaiting, Surface::AwaitingScreen)
        .route(&paths.suspended, Surface::BannedScreen)
        .route("/sign-out", Surface::SignOut)
        .route(&paths.app_home, Surface::App)
        .route("/feed", Surface::App)
        .route("/communities", Surface::App)
        .route("/events", Surface::App)
        .route("/chat", Surface::App)
        .route("/profile", Surface::App)
        .route("/onboarding", Surface::App)
        .route("/moderation", Surface::Moderation)
        .route("/admin", Surface::Admin)
}

/// Canonical form of `path`: query and fragment dropped, empty and `.`
/// segments removed, `..` resolved (never above the root). Percent-encoded
/// dots count as dots.
fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment.to_ascii_lowercase().replace("%2e", ".").as_str() {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

// "/" only matches the root itself, otherwise everything would be public.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    routes: RouteTable,
    paths: GatePaths,
}

impl Default for AccessGate {
    fn default() -> Self {
        let paths = GatePaths::default();
        Self::new(default_routes(&paths), paths)
    }
}

impl AccessGate {
    pub fn new(routes: RouteTable, paths: GatePaths) -> Self {
        Self { routes, paths }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn classify_session(&self, session: &SessionState, path: &str) -> GateOutcome {
        self.classify(GateState::from_session(session), path)
    }

    pub fn classify(&self, state: GateState, path: &str) -> GateOutcome {
        let surface = self.routes.surface_for(path);
        let outcome = self.decide(state, surface);
        metrics::counter!("member_gate_decisions_total", "outcome" => outcome.label())
            .increment(1);
        outcome
    }

    fn decide(&self, state: GateState, surface: Surface) -> GateOutcome {
        match state {
            GateState::Unauthenticated => match surface {
                Surface::Public => GateOutcome::Allow,
                _ => GateOutcome::RedirectPublic {
                    redirect_to: self.paths.public_home.clone(),
                },
            },
            GateState::Awaiting => match surface {
                Surface::Public | Surface::AwaitingScreen | Surface::SignOut => GateOutcome::Allow,
                _ => GateOutcome::ShowAwaiting {
                    redirect_to: self.paths.awaiting.clone(),
                },
            },
            GateState::Banned => match surface {
                Surface::BannedScreen | Surface::SignOut => GateOutcome::Allow,
                _ => GateOutcome::ShowBanned {
                    redirect_to: self.paths.suspended.clone(),
                },
            },
            GateState::Active {
                role,
                leadership_onboarding_done,
            } => match surface {
                Surface::Moderation if !AccessPolicy::may_moderate(role) => {
                    self.insufficient(&self.paths.app_home)
                }
                Surface::Moderation
                    if AccessPolicy::must_complete_leadership_onboarding(
                        role,
                        leadership_onboarding_done,
                    ) =>
                {
                    self.insufficient(&self.paths.leadership_onboarding)
                }
                Surface::Admin if !AccessPolicy::is_top_admin(role) => {
                    self.insufficient(&self.paths.app_home)
                }
                _ => GateOutcome::Allow,
            },
        }
    }

    fn insufficient(&self, to: &str) -> GateOutcome {
        GateOutcome::RedirectInsufficientPrivilege {
            redirect_to: to.to_string(),
        }
    }
}
