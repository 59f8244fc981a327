//! GraphQL documents issued by the dashboard.
//!
//! Filtering, ordering and dedup happen server-side; the aggregation code
//! relies on the `where`, `order_by` and `distinct_on` clauses below.

pub const PROFILE: &str = r#"
{
  user {
    id
    login
    firstName
    lastName
    email
    campus
  }
}
"#;

pub const AUDIT_STATS: &str = r#"
{
  user {
    auditRatio
    totalUp
    totalDown
  }
}
"#;

/// One row per skill type, most recent first.
pub const SKILLS: &str = r#"
{
  transaction(
    where: { type: { _like: "%skill%" }, object: { type: { _eq: "project" } } }
    order_by: [{ type: asc }, { createdAt: desc }]
    distinct_on: type
  ) {
    amount
    type
  }
}
"#;

/// XP rows ascending by creation time.
pub const XP: &str = r#"
{
  transaction(
    where: { type: { _eq: "xp" } }
    order_by: { createdAt: asc }
  ) {
    amount
    createdAt
  }
}
"#;

/// Pass/fail split is done by the grade filters.
pub const AUDITS: &str = r#"
{
  user {
    validAudits: audits(where: { grade: { _gte: 1 } }) {
      group { captainLogin path }
    }
    failedAudits: audits(where: { grade: { _lt: 1 } }) {
      group { captainLogin path }
    }
  }
}
"#;

pub const POSITION: &str = r#"
query getUserPosition($eventID: Int!, $userID: Int!) {
  event(where: { id: { _eq: $eventID } }) {
    id
    registrations {
      users(where: { id: { _eq: $userID } }) {
        id
        position
      }
    }
  }
}
"#;
