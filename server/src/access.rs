//! Hooks for the collaborators that sit in front of the gateway: the
//! authentication filter and the room repository.

use axum::http::HeaderMap;
use std::collections::HashSet;

/// Verified identity attached to a connection before admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentity {
    Anonymous,
    User(String),
}

/// Authentication filter. Returning `None` rejects the upgrade with 401.
pub trait IdentityFilter: Send + Sync {
    fn verify(&self, headers: &HeaderMap) -> Option<UserIdentity>;
}

/// Admits every connection as anonymous.
pub struct AllowAnonymous;

impl IdentityFilter for AllowAnonymous {
    fn verify(&self, _headers: &HeaderMap) -> Option<UserIdentity> {
        Some(UserIdentity::Anonymous)
    }
}

/// Trusts an identity header set by an upstream auth proxy; rejects
/// connections without it.
pub struct TrustedHeader {
    pub header: &'static str,
}

impl IdentityFilter for TrustedHeader {
    fn verify(&self, headers: &HeaderMap) -> Option<UserIdentity> {
        let user = headers.get(self.header)?.to_str().ok()?.trim();
        if user.is_empty() {
            return None;
        }
        Some(UserIdentity::User(user.to_string()))
    }
}

/// Room lookup. Unknown rooms are rejected with 404.
pub trait RoomDirectory: Send + Sync {
    fn room_exists(&self, room_id: &str) -> bool;
}

/// Accepts any room id.
pub struct AnyRoom;

impl RoomDirectory for AnyRoom {
    fn room_exists(&self, _room_id: &str) -> bool {
        true
    }
}

/// Fixed set of room ids.
pub struct KnownRooms(pub HashSet<String>);

impl RoomDirectory for KnownRooms {
    fn room_exists(&self, room_id: &str) -> bool {
        self.0.contains(room_id)
    }
}
