use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub created_at: String,
}

/// The fields of a user that are safe to show to someone who is not that
/// user, e.g. on the pairing preview screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

impl From<User> for PublicProfile {
    fn from(u: User) -> Self {
        PublicProfile {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            avatar: u.avatar,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub display_name: Option<String>,
}
