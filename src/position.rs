use serde::Deserialize;

use crate::models::{null_as_default, Position};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<RegisteredUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub registrations: Vec<Registration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub event: Vec<EventRow>,
}

/// First roster entry with a matching user id. The roster is filtered
/// server-side, so at most one entry is expected.
pub fn find_position(registrations: &[Registration], user_id: i64) -> Position {
    registrations
        .iter()
        .flat_map(|registration| registration.users.iter())
        .find(|user| user.id == user_id)
        .and_then(|user| user.position.clone())
}

pub fn position_for(data: Option<PositionData>, user_id: i64) -> Position {
    data.and_then(|data| data.event.into_iter().next())
        .and_then(|event| find_position(&event.registrations, user_id))
}
