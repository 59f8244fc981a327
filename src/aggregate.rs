//! The aggregation layer: one read per view model, each mapping a raw
//! GraphQL shape into what the renderer consumes.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::audits::{self, AuditRow, AuditStatsRow};
use crate::error::{DashboardError, Result};
use crate::models::{AuditData, AuditStats, ClassifiedSkills, Position, ProfileSummary, SkillRecord, XpSeries};
use crate::position::{self, PositionData};
use crate::queries;
use crate::session::{SessionContext, SessionController};
use crate::skills;
use crate::transport::GraphQlClient;
use crate::xp::{self, XpTransaction};

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Users<T> {
    #[serde(default)]
    user: Vec<T>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Transactions<T> {
    #[serde(default)]
    transaction: Vec<T>,
}

fn first_user<T>(data: Option<Users<T>>) -> Option<T> {
    data.and_then(|d| d.user.into_iter().next())
}

fn transactions<T>(data: Option<Transactions<T>>) -> Vec<T> {
    data.map(|d| d.transaction).unwrap_or_default()
}

/// Every read of one load, tagged with the session epoch it ran under.
/// Each read fails independently.
#[derive(Debug)]
pub struct Snapshot {
    pub epoch: u64,
    pub profile: Result<Option<ProfileSummary>>,
    pub position: Result<Position>,
    pub audit_stats: Result<AuditStats>,
    pub skills: Result<ClassifiedSkills>,
    pub xp: Result<XpSeries>,
    pub audits: Result<AuditData>,
}

impl Snapshot {
    #[cfg(test)]
    pub fn empty(epoch: u64) -> Self {
        Self {
            epoch,
            profile: Ok(None),
            position: Ok(None),
            audit_stats: Ok(AuditStats::default()),
            skills: Ok(ClassifiedSkills::default()),
            xp: Ok(Vec::new()),
            audits: Ok(AuditData::default()),
        }
    }

    pub fn errors(&self) -> Vec<(&'static str, &DashboardError)> {
        [
            ("profile", self.profile.as_ref().err()),
            ("position", self.position.as_ref().err()),
            ("audit stats", self.audit_stats.as_ref().err()),
            ("skills", self.skills.as_ref().err()),
            ("XP", self.xp.as_ref().err()),
            ("audits", self.audits.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(label, err)| err.map(|e| (label, e)))
        .collect()
    }

    pub fn session_expired(&self) -> bool {
        self.errors().iter().any(|(_, e)| e.is_session_expired())
    }
}

pub struct Dashboard {
    client: GraphQlClient,
    event_id: i64,
}

impl Dashboard {
    pub fn new(client: GraphQlClient, event_id: i64) -> Self {
        Self { client, event_id }
    }

    /// Identity exchange driving the controller through its login states.
    pub async fn login(
        &self,
        controller: &mut SessionController,
        username: &str,
        password: &str,
    ) -> Result<SessionContext> {
        controller.begin_login()?;
        match self.client.login(username, password).await {
            Ok(token) => controller.complete_login(token, username.to_string()),
            Err(DashboardError::AuthFailure(reason)) => Err(controller.fail_login(reason)),
            Err(e) => {
                controller.fail_login(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn fetch_profile(&self, ctx: &SessionContext) -> Result<Option<ProfileSummary>> {
        let data = self
            .client
            .query::<Users<ProfileSummary>>(ctx.token(), queries::PROFILE, None)
            .await?;
        Ok(first_user(data))
    }

    pub async fn fetch_audit_stats(&self, ctx: &SessionContext) -> Result<AuditStats> {
        let data = self
            .client
            .query::<Users<AuditStatsRow>>(ctx.token(), queries::AUDIT_STATS, None)
            .await?;
        Ok(audits::audit_stats(first_user(data)))
    }

    pub async fn fetch_skills(&self, ctx: &SessionContext) -> Result<ClassifiedSkills> {
        let data = self
            .client
            .query::<Transactions<SkillRecord>>(ctx.token(), queries::SKILLS, None)
            .await?;
        let rows = transactions(data);
        debug!("Classifying {} skill rows", rows.len());
        Ok(skills::classify_skills(rows))
    }

    pub async fn fetch_xp(&self, ctx: &SessionContext) -> Result<XpSeries> {
        let data = self
            .client
            .query::<Transactions<XpTransaction>>(ctx.token(), queries::XP, None)
            .await?;
        Ok(xp::accumulate_xp(&transactions(data)))
    }

    pub async fn fetch_audits(&self, ctx: &SessionContext) -> Result<AuditData> {
        let data = self
            .client
            .query::<Users<AuditRow>>(ctx.token(), queries::AUDITS, None)
            .await?;
        Ok(audits::audit_data(first_user(data)))
    }

    pub async fn fetch_position(&self, ctx: &SessionContext, user_id: i64) -> Result<Position> {
        let variables = json!({ "eventID": self.event_id, "userID": user_id });
        let data = self
            .client
            .query::<PositionData>(ctx.token(), queries::POSITION, Some(&variables))
            .await?;
        Ok(position::position_for(data, user_id))
    }

    /// Profile, then position for that profile's id.
    pub async fn fetch_profile_and_position(
        &self,
        ctx: &SessionContext,
    ) -> (Result<Option<ProfileSummary>>, Result<Position>) {
        let profile = self.fetch_profile(ctx).await;
        let position = match &profile {
            Ok(Some(p)) => self.fetch_position(ctx, p.id).await,
            _ => Ok(None),
        };
        (profile, position)
    }

    /// Runs every read concurrently.
    pub async fn load(&self, ctx: &SessionContext) -> Snapshot {
        let ((profile, position), audit_stats, skills, xp, audits) = tokio::join!(
            self.fetch_profile_and_position(ctx),
            self.fetch_audit_stats(ctx),
            self.fetch_skills(ctx),
            self.fetch_xp(ctx),
            self.fetch_audits(ctx),
        );

        let snapshot = Snapshot {
            epoch: ctx.epoch,
            profile,
            position,
            audit_stats,
            skills,
            xp,
            audits,
        };

        for (label, err) in snapshot.errors() {
            warn!("Error fetching {label}: {err}");
        }
        info!(
            "Dashboard loaded for {} with {} failed read(s)",
            ctx.session.display_name,
            snapshot.errors().len()
        );
        snapshot
    }
}
