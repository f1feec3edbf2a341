//! Response payloads read from the GitHub REST API.
//!
//! Only the fields the collector needs are modelled; everything else in the
//! payload is ignored by serde.

use serde::{Deserialize, Serialize};

/// Entry of `GET /user/following`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedUser {
    pub login: String,
}

/// Entry of `GET /users/{login}/events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Creation time as sent by the API (`%Y-%m-%dT%H:%M:%SZ`).
    ///
    /// Kept as a string so that malformed values surface when the time
    /// window is applied rather than failing the whole page decode.
    pub created_at: String,
    pub repo: EventRepo,
    /// Action type, e.g. `PushEvent`.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRepo {
    /// `owner/name`
    pub name: String,
}
