use serde::{Deserialize, Serialize};

use crate::auth::TokenPayload;

/// Profile of the caller, built from a verified token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Option<String>,
    /// `preferred_username`, falling back to email
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `name`, or given + family name
    pub full_name: Option<String>,
    /// Realm roles from `realm_access.roles`
    pub roles: Vec<String>,
    pub is_authenticated: bool,
    /// Every claim of the token
    pub token_payload: TokenPayload,
}

impl UserProfile {
    pub fn from_payload(payload: &TokenPayload) -> Self {
        let owned = |v: Option<&str>| v.map(str::to_string);

        let full_name = payload
            .name()
            .map(str::to_string)
            .or_else(|| {
                let joined = [payload.given_name(), payload.family_name()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(joined.trim().to_string())
            })
            .filter(|s| !s.is_empty());

        Self {
            user_id: owned(payload.sub()),
            username: owned(payload.preferred_username().or_else(|| payload.email())),
            email: owned(payload.email()),
            first_name: owned(payload.given_name()),
            last_name: owned(payload.family_name()),
            full_name,
            roles: payload.roles(),
            is_authenticated: true,
            token_payload: payload.clone(),
        }
    }
}
