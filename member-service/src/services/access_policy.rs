//! Access policy predicates.
//!
//! Pure functions over a canonical [`Role`]. `is_banned`, `is_awaiting_approval`
//! and `may_use_app` partition the non-visitor roles: at most one holds for
//! any role.

use serde::Serialize;

use crate::models::{ProfileRecord, Role};

#[derive(Debug, Clone)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn may_use_app(role: Role) -> bool {
        role.power() >= Role::Member.power()
    }

    pub fn may_moderate(role: Role) -> bool {
        matches!(role, Role::Founder | Role::Moderator | Role::SuperAdmin)
    }

    pub fn is_top_admin(role: Role) -> bool {
        role == Role::SuperAdmin
    }

    /// Moderating roles must acknowledge leadership onboarding once before
    /// they get full moderation capability. Top admins are exempt.
    pub fn must_complete_leadership_onboarding(role: Role, onboarding_done: bool) -> bool {
        matches!(role, Role::Founder | Role::Moderator) && !onboarding_done
    }

    pub fn is_awaiting_approval(role: Role) -> bool {
        role == Role::AwaitingApproval
    }

    pub fn is_banned(role: Role) -> bool {
        role == Role::Banned
    }
}

/// Every policy boolean for one profile, as consumed by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessSummary {
    pub may_use_app: bool,
    pub may_moderate: bool,
    pub is_top_admin: bool,
    pub must_complete_leadership_onboarding: bool,
    pub is_awaiting_approval: bool,
    pub is_banned: bool,
}

impl AccessSummary {
    pub fn for_profile(profile: &ProfileRecord) -> Self {
        let role = profile.role;
        Self {
            may_use_app: AccessPolicy::may_use_app(role),
            may_moderate: AccessPolicy::may_moderate(role),
            is_top_admin: AccessPolicy::is_top_admin(role),
            must_complete_leadership_onboarding: AccessPolicy::must_complete_leadership_onboarding(
                role,
                profile.leadership_onboarding_done,
            ),
            is_awaiting_approval: AccessPolicy::is_awaiting_approval(role),
            is_banned: AccessPolicy::is_banned(role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn classifications_are_mutually_exclusive() {
        for role in Role::ALL {
            let hits = [
                AccessPolicy::is_banned(role),
                AccessPolicy::is_awaiting_approval(role),
                AccessPolicy::may_use_app(role),
            ]
            .iter()
            .filter(|b| **b)
            .count();

            if role == Role::Visitor {
                assert_eq!(hits, 0);
            } else {
                assert_eq!(hits, 1, "{:?} matched {} classifications", role, hits);
            }
        }
    }

    #[test]
    fn banned_never_uses_app() {
        for role in Role::ALL {
            assert!(!(AccessPolicy::is_banned(role) && AccessPolicy::may_use_app(role)));
        }
    }

    #[test]
    fn moderation_implies_app_access() {
        for role in Role::ALL {
            if AccessPolicy::may_moderate(role) {
                assert!(AccessPolicy::may_use_app(role));
            }
        }
    }

    #[test]
    fn top_admin_is_super_admin_only() {
        let admins: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| AccessPolicy::is_top_admin(*r))
            .collect();
        assert_eq!(admins, vec![Role::SuperAdmin]);
    }

    #[test]
    fn leadership_onboarding_applies_to_founders_and_moderators() {
        assert!(AccessPolicy::must_complete_leadership_onboarding(Role::Founder, false));
        assert!(AccessPolicy::must_complete_leadership_onboarding(Role::Moderator, false));
        assert!(!AccessPolicy::must_complete_leadership_onboarding(Role::Moderator, true));
        assert!(!AccessPolicy::must_complete_leadership_onboarding(Role::SuperAdmin, false));
        assert!(!AccessPolicy::must_complete_leadership_onboarding(Role::Member, false));
    }

    #[test]
    fn summary_reads_leadership_flag() {
        let mut profile = ProfileRecord::provisional(Uuid::new_v4());
        profile.role = Role::Moderator;
        let summary = AccessSummary::for_profile(&profile);
        assert!(summary.may_moderate);
        assert!(summary.must_complete_leadership_onboarding);

        profile.leadership_onboarding_done = true;
        assert!(!AccessSummary::for_profile(&profile).must_complete_leadership_onboarding);
    }
}
