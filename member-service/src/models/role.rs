//! Role model - canonical member roles and normalization of legacy labels.
//!
//! Stored role labels have gone through more than one taxonomy migration, so
//! every read goes through [`Role::normalize`]. Normalization is total and
//! idempotent, and never grants more than the lowest member tier to a label
//! it does not recognise.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical member role, ordered by [`Role::power`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No persisted profile.
    Visitor,
    AwaitingApproval,
    Banned,
    Member,
    Founder,
    Moderator,
    SuperAdmin,
}

/// Legacy and aliased labels, matched after lower-casing and trimming.
const ALIASES: &[(&str, Role)] = &[
    ("founder_paid", Role::Founder),
    ("founding_member", Role::Founder),
    ("admin", Role::SuperAdmin),
    ("superadmin", Role::SuperAdmin),
    ("owner", Role::SuperAdmin),
    ("mod", Role::Moderator),
    ("pending", Role::AwaitingApproval),
    ("waitlist", Role::AwaitingApproval),
    ("waitlisted", Role::AwaitingApproval),
    ("beta_pending", Role::AwaitingApproval),
    ("suspended", Role::Banned),
    ("blocked", Role::Banned),
    ("user", Role::Member),
    ("beta", Role::Member),
    ("beta_member", Role::Member),
    ("approved", Role::Member),
    ("guest", Role::Visitor),
    ("anonymous", Role::Visitor),
];

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Visitor,
        Role::AwaitingApproval,
        Role::Banned,
        Role::Member,
        Role::Founder,
        Role::Moderator,
        Role::SuperAdmin,
    ];

    /// Where unrecognised labels land.
    pub const FALLBACK: Role = Role::AwaitingApproval;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Visitor => "visitor",
            Role::AwaitingApproval => "awaiting_approval",
            Role::Banned => "banned",
            Role::Member => "member",
            Role::Founder => "founder",
            Role::Moderator => "moderator",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Privilege ranking. Founder and moderator share a rank.
    pub fn power(&self) -> u8 {
        match self {
            Role::Visitor => 0,
            Role::AwaitingApproval => 1,
            Role::Banned => 2,
            Role::Member => 3,
            Role::Founder | Role::Moderator => 4,
            Role::SuperAdmin => 5,
        }
    }

    /// Whether a holder of this role occupies a founding-cohort seat.
    pub fn consumes_seat(&self) -> bool {
        self.power() >= Role::Member.power()
    }

    /// Map any stored label (or its absence) onto a canonical role.
    pub fn normalize(raw: Option<&str>) -> Role {
        let Some(raw) = raw else {
            return Self::FALLBACK;
        };
        Self::lookup(&raw.trim().to_ascii_lowercase()).unwrap_or(Self::FALLBACK)
    }

    /// Every stored label (canonical or alias) that normalizes to a
    /// seat-consuming role. Used by server-side seat counts.
    pub fn seat_labels() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|role| role.consumes_seat())
            .map(|role| role.as_str())
            .chain(
                ALIASES
                    .iter()
                    .filter(|(_, role)| role.consumes_seat())
                    .map(|(label, _)| *label),
            )
            .collect()
    }

    fn lookup(label: &str) -> Option<Role> {
        Self::ALL
            .iter()
            .find(|role| role.as_str() == label)
            .copied()
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == label)
                    .map(|(_, role)| *role)
            })
    }
}

/// Free-function form of [`Role::normalize`].
pub fn normalize(raw: Option<&str>) -> Role {
    Role::normalize(raw)
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse for operator input: unlike [`Role::normalize`], unknown
/// labels are an error rather than a silent fallback.
impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(&s.trim().to_ascii_lowercase()).ok_or_else(|| format!("Unknown role: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_labels_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::normalize(Some(role.as_str())), role);
        }
    }

    #[test]
    fn legacy_labels_map_onto_current_taxonomy() {
        assert_eq!(normalize(Some("founder_paid")), Role::Founder);
        assert_eq!(normalize(Some("admin")), Role::SuperAdmin);
        assert_eq!(normalize(Some("  Suspended ")), Role::Banned);
        assert_eq!(normalize(Some("PENDING")), Role::AwaitingApproval);
        assert_eq!(normalize(Some("mod")), Role::Moderator);
    }

    #[test]
    fn unknown_and_absent_labels_never_escalate() {
        let lowest_member_tier = Role::AwaitingApproval.power();
        for raw in [
            None,
            Some(""),
            Some("   "),
            Some("root"),
            Some("super-admin"),
            Some("god_mode"),
            Some("founder paid"),
            Some("\u{0}admin"),
        ] {
            let role = normalize(raw);
            assert!(
                role.power() <= lowest_member_tier,
                "{:?} normalized to {:?}",
                raw,
                role
            );
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = ["admin", "founder_paid", "member", "garbage", "", "Moderator", "guest"];
        for raw in inputs {
            let once = normalize(Some(raw));
            assert_eq!(normalize(Some(once.as_str())), once, "input {:?}", raw);
        }
    }

    #[test]
    fn power_orders_roles() {
        assert!(Role::Visitor.power() < Role::AwaitingApproval.power());
        assert!(Role::AwaitingApproval.power() < Role::Banned.power());
        assert!(Role::Banned.power() < Role::Member.power());
        assert_eq!(Role::Founder.power(), Role::Moderator.power());
        assert!(Role::Moderator.power() < Role::SuperAdmin.power());
    }

    #[test]
    fn seat_labels_cover_legacy_seat_holders() {
        let labels = Role::seat_labels();
        assert!(labels.contains(&"member"));
        assert!(labels.contains(&"founder_paid"));
        assert!(labels.contains(&"admin"));
        assert!(!labels.contains(&"pending"));
        assert!(!labels.contains(&"banned"));
    }

    #[test]
    fn strict_parse_rejects_unknown_labels() {
        assert_eq!("founder".parse::<Role>(), Ok(Role::Founder));
        assert_eq!("Admin".parse::<Role>(), Ok(Role::SuperAdmin));
        assert!("foundr".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_canonical_labels() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
        let role: Role = serde_json::from_str("\"awaiting_approval\"").unwrap();
        assert_eq!(role, Role::AwaitingApproval);
    }
}
