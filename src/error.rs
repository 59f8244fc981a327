use serde::Deserialize;
use thiserror::Error;

/// Marker the GraphQL engine puts in the message of an expired bearer token.
pub const EXPIRED_TOKEN_MARKER: &str = "JWTExpired";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GraphQlErrorEntry {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("session expired, sign in again")]
    SessionExpired,

    #[error("GraphQL error: {}", join_messages(.0))]
    GraphQl(Vec<GraphQlErrorEntry>),

    #[error("login failed: {0}")]
    AuthFailure(String),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("session storage: {0}")]
    Storage(#[from] std::io::Error),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("cannot {action} while {from}")]
    InvalidTransition { from: &'static str, action: &'static str },
}

impl DashboardError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, DashboardError::SessionExpired)
    }
}

fn join_messages(errors: &[GraphQlErrorEntry]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_error_joins_messages() {
        let err = DashboardError::GraphQl(vec![
            GraphQlErrorEntry {
                message: "field not found".to_string(),
                extensions: None,
            },
            GraphQlErrorEntry {
                message: "permission denied".to_string(),
                extensions: None,
            },
        ]);
        assert_eq!(
            err.to_string(),
            "GraphQL error: field not found; permission denied"
        );
    }

    #[test]
    fn only_expiry_reports_session_expired() {
        assert!(DashboardError::SessionExpired.is_session_expired());
        assert!(!DashboardError::NotLoggedIn.is_session_expired());
        assert!(!DashboardError::AuthFailure("bad".to_string()).is_session_expired());
    }
}
