use serde::{Deserialize, Serialize};

/// Identity returned by the external API's `GET /auth/me` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthedUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

/// A document-group member as broadcast in `users:list` / `user:joined`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedUser {
    pub user_id: String,
    pub user_full_name: String,
    pub user_email: String,
}

impl From<&AuthedUser> for ConnectedUser {
    fn from(user: &AuthedUser) -> Self {
        Self {
            user_id: user.id.clone(),
            user_full_name: user.full_name.clone(),
            user_email: user.email.clone(),
        }
    }
}
