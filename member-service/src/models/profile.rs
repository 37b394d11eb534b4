//! Profile model - one durable record per authenticated identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::Role;

/// Durable member profile. `role` is always canonical; legacy labels are
/// normalized when the row is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub role: Role,
    pub access_released: bool,
    pub onboarding_done: bool,
    pub leadership_onboarding_done: bool,
    pub show_email: bool,
    pub show_phone: bool,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub legal_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub deactivated_utc: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    /// Minimal record auto-provisioned for an identity that has no profile yet.
    pub fn provisional(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            role: Role::FALLBACK,
            access_released: false,
            onboarding_done: false,
            leadership_onboarding_done: false,
            show_email: false,
            show_phone: false,
            display_name: None,
            bio: None,
            photo_url: None,
            legal_name: None,
            contact_email: None,
            phone: None,
            created_utc: now,
            updated_utc: now,
            deactivated_utc: None,
        }
    }

    pub fn is_deactivated(&self) -> bool {
        self.deactivated_utc.is_some()
    }

    /// Clear every personal field and mark the record deactivated.
    pub fn anonymize(&mut self, at: DateTime<Utc>) {
        self.display_name = None;
        self.bio = None;
        self.photo_url = None;
        self.legal_name = None;
        self.contact_email = None;
        self.phone = None;
        self.show_email = false;
        self.show_phone = false;
        self.updated_utc = at;
        self.deactivated_utc = Some(at);
    }
}

/// Raw `member_profiles` row.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub role: Option<String>,
    pub access_released: bool,
    pub onboarding_done: bool,
    pub leadership_onboarding_done: bool,
    pub show_email: bool,
    pub show_phone: bool,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub legal_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub deactivated_utc: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            role: Role::normalize(row.role.as_deref()),
            access_released: row.access_released,
            onboarding_done: row.onboarding_done,
            leadership_onboarding_done: row.leadership_onboarding_done,
            show_email: row.show_email,
            show_phone: row.show_phone,
            display_name: row.display_name,
            bio: row.bio,
            photo_url: row.photo_url,
            legal_name: row.legal_name,
            contact_email: row.contact_email,
            phone: row.phone,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
            deactivated_utc: row.deactivated_utc,
        }
    }
}

/// Self-service profile edit. Role and capability flags are not editable here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 80, message = "Display name must be 1-80 characters"))]
    pub display_name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
    #[validate(url(message = "Photo URL must be a valid URL"))]
    pub photo_url: Option<String>,
    #[validate(length(max = 200))]
    pub legal_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub contact_email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub show_email: Option<bool>,
    pub show_phone: Option<bool>,
}

impl ProfileUpdate {
    pub fn apply(&self, profile: &mut ProfileRecord) {
        if let Some(v) = &self.display_name {
            profile.display_name = Some(v.clone());
        }
        if let Some(v) = &self.bio {
            profile.bio = Some(v.clone());
        }
        if let Some(v) = &self.photo_url {
            profile.photo_url = Some(v.clone());
        }
        if let Some(v) = &self.legal_name {
            profile.legal_name = Some(v.clone());
        }
        if let Some(v) = &self.contact_email {
            profile.contact_email = Some(v.clone());
        }
        if let Some(v) = &self.phone {
            profile.phone = Some(v.clone());
        }
        if let Some(v) = self.show_email {
            profile.show_email = v;
        }
        if let Some(v) = self.show_phone {
            profile.show_phone = v;
        }
        profile.updated_utc = Utc::now();
    }
}

/// One-time acknowledgement flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    General,
    Leadership,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_profile_has_no_access() {
        let profile = ProfileRecord::provisional(Uuid::new_v4());
        assert_eq!(profile.role, Role::AwaitingApproval);
        assert!(!profile.access_released);
        assert!(!profile.onboarding_done);
        assert!(!profile.leadership_onboarding_done);
        assert!(!profile.is_deactivated());
    }

    #[test]
    fn row_with_legacy_role_is_normalized() {
        let base = ProfileRecord::provisional(Uuid::new_v4());
        let row = ProfileRow {
            id: base.id,
            role: Some("founder_paid".to_string()),
            access_released: true,
            onboarding_done: true,
            leadership_onboarding_done: false,
            show_email: false,
            show_phone: false,
            display_name: Some("Ada".to_string()),
            bio: None,
            photo_url: None,
            legal_name: None,
            contact_email: None,
            phone: None,
            created_utc: base.created_utc,
            updated_utc: base.updated_utc,
            deactivated_utc: None,
        };

        let profile = ProfileRecord::from(row);
        assert_eq!(profile.role, Role::Founder);
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn anonymize_clears_personal_fields() {
        let mut profile = ProfileRecord::provisional(Uuid::new_v4());
        profile.display_name = Some("Ada".to_string());
        profile.contact_email = Some("ada@example.com".to_string());
        profile.show_email = true;

        let now = Utc::now();
        profile.anonymize(now);

        assert!(profile.display_name.is_none());
        assert!(profile.contact_email.is_none());
        assert!(!profile.show_email);
        assert_eq!(profile.deactivated_utc, Some(now));
    }

    #[test]
    fn update_validation_rejects_bad_email() {
        let update = ProfileUpdate {
            contact_email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn update_only_touches_provided_fields() {
        let mut profile = ProfileRecord::provisional(Uuid::new_v4());
        profile.bio = Some("hello".to_string());
        let update = ProfileUpdate {
            display_name: Some("Grace".to_string()),
            show_phone: Some(true),
            ..Default::default()
        };

        update.apply(&mut profile);

        assert_eq!(profile.display_name.as_deref(), Some("Grace"));
        assert_eq!(profile.bio.as_deref(), Some("hello"));
        assert!(profile.show_phone);
        assert_eq!(profile.role, Role::AwaitingApproval);
    }
}
