use serde::{Deserialize, Serialize};

use super::user::PublicProfile;

/// Lightweight version from the DB row before loading the partner roster.
#[derive(Debug, Clone, Serialize)]
pub struct SpaceRow {
    pub id: String,
    pub anniversary_date: String,
    pub created_at: String,
}

/// A space with its partner roster attached. `invite_code` is present only
/// while the space has a single partner; it is retired the instant the
/// second partner commits.
#[derive(Debug, Clone, Serialize)]
pub struct Space {
    pub id: String,
    pub anniversary_date: String,
    pub invite_code: Option<String>,
    pub partners: Vec<PublicProfile>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSpace {
    pub anniversary_date: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSpace {
    pub anniversary_date: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

/// The caller's pet-name pair, stored on their own membership row. Each
/// partner keeps an independent pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetNames {
    pub pet_name: Option<String>,
    pub partner_pet_name: Option<String>,
}

/// Read-only snapshot returned by `redeem`. Carries no authority: `confirm`
/// re-resolves the code server-side and never trusts this snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMatch {
    pub code: String,
    pub space_id: String,
    pub anniversary_date: String,
    pub partner: PublicProfile,
    pub acting_user_id: String,
}
