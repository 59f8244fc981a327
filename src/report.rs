use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::Snapshot;
use crate::audits;
use crate::error::DashboardError;
use crate::models::{AuditData, AuditEdge, AuditStats, ClassifiedSkills, Position, ProfileSummary, SkillRecord, XpPoint};
use crate::skills::skill_token;
use crate::xp::total_xp;

pub const DASHBOARD_AUDITS: usize = 4;
const GAUGE_WIDTH: usize = 20;

pub fn skill_label(record: &SkillRecord) -> &str {
    skill_token(&record.skill_type)
}

pub fn gauge(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * GAUGE_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:.0}%",
        "#".repeat(filled),
        "-".repeat(GAUGE_WIDTH - filled),
        fraction.clamp(0.0, 1.0) * 100.0
    )
}

/// Full valid-audit list, most recent first.
pub fn all_audits(data: &AuditData) -> Vec<&AuditEdge> {
    data.valid_audits.iter().rev().collect()
}

pub fn write_profile(output: &mut String, profile: Option<&ProfileSummary>, position: &Position) {
    let _ = writeln!(output, "## User Information");
    match profile {
        Some(profile) => {
            let _ = writeln!(output, "- Name: {}", profile.full_name());
            if let Some(login) = &profile.login {
                let _ = writeln!(output, "- Login: {login}");
            }
            let _ = writeln!(output, "- Email: {}", profile.email);
            let _ = writeln!(
                output,
                "- Position: {}",
                position.as_deref().unwrap_or("Not registered")
            );
            let _ = writeln!(output, "- Campus: {}", profile.campus);
        }
        None => {
            let _ = writeln!(output, "No profile data available.");
        }
    }
}

pub fn write_audit_stats(output: &mut String, stats: &AuditStats) {
    let _ = writeln!(output, "## Audit Ratio");
    let _ = writeln!(output, "- Ratio: {}", stats.audit_ratio);
    let _ = writeln!(
        output,
        "- Gauge: {}",
        gauge(audits::ratio_fraction(stats.audit_ratio))
    );
    let _ = writeln!(output, "- Done: {} kB", audits::format_kilo(stats.total_up));
    let _ = writeln!(output, "- Received: {} kB", audits::format_kilo(stats.total_down));
}

fn write_audit_list(output: &mut String, title: &str, audits: &[&AuditEdge], empty: &str) {
    let _ = writeln!(output, "## {title}");
    if audits.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }
    for audit in audits {
        let _ = writeln!(output, "- {} - {}", audit.captain_login, audit.project());
    }
}

pub fn write_audits(output: &mut String, data: &AuditData, limit: usize) {
    let valid: Vec<&AuditEdge> = data.valid_audits.iter().take(limit).collect();
    let failed: Vec<&AuditEdge> = data.failed_audits.iter().take(limit).collect();
    write_audit_list(output, "Valid Audits", &valid, "No valid audits available.");
    let _ = writeln!(output);
    write_audit_list(output, "Failed Audits", &failed, "No failed audits available.");
}

/// Every valid audit with its full project path.
pub fn write_all_audits(output: &mut String, data: &AuditData) {
    let _ = writeln!(output, "## All Audits");
    let audits = all_audits(data);
    if audits.is_empty() {
        let _ = writeln!(output, "No audits available.");
        return;
    }
    for audit in audits {
        let _ = writeln!(output, "- {}: {}", audit.captain_login, audit.path);
    }
}

fn write_skill_list(output: &mut String, title: &str, records: &[SkillRecord]) {
    let _ = writeln!(output, "### {title}");
    if records.is_empty() {
        let _ = writeln!(output, "No skills recorded.");
        return;
    }
    for record in records {
        let _ = writeln!(output, "- {}: {:.0}%", skill_label(record), record.amount);
    }
}

pub fn write_skills(output: &mut String, skills: &ClassifiedSkills) {
    let _ = writeln!(output, "## Skill Radar");
    write_skill_list(output, "Technical Skills", &skills.technical_skills);
    let _ = writeln!(output);
    write_skill_list(output, "Technologies", &skills.technologies);
    if !skills.unclassified.is_empty() {
        let _ = writeln!(output);
        write_skill_list(output, "Unclassified", &skills.unclassified);
    }
}

pub fn write_xp(output: &mut String, series: &[XpPoint]) {
    let _ = writeln!(output, "## XP Progress");
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => {
            let _ = writeln!(output, "- Total: {:.1} kB", total_xp(series));
            let _ = writeln!(output, "- Transactions: {}", series.len());
            let _ = writeln!(
                output,
                "- Period: {} to {}",
                first.created_at.date_naive(),
                last.created_at.date_naive()
            );
        }
        _ => {
            let _ = writeln!(output, "No XP recorded.");
        }
    }
}

fn write_failure(output: &mut String, title: &str, err: &DashboardError) {
    let _ = writeln!(output, "## {title}");
    let _ = writeln!(output, "Unavailable: {err}");
}

pub fn build_report(display_name: &str, generated_at: DateTime<Utc>, snapshot: &Snapshot) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Hello, {display_name}!");
    let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);

    match (&snapshot.profile, &snapshot.position) {
        (Ok(profile), Ok(position)) => write_profile(&mut output, profile.as_ref(), position),
        (Ok(profile), Err(_)) => write_profile(&mut output, profile.as_ref(), &None),
        (Err(err), _) => write_failure(&mut output, "User Information", err),
    }
    let _ = writeln!(output);

    match &snapshot.audit_stats {
        Ok(stats) => write_audit_stats(&mut output, stats),
        Err(err) => write_failure(&mut output, "Audit Ratio", err),
    }
    let _ = writeln!(output);

    match &snapshot.audits {
        Ok(data) => write_audits(&mut output, data, DASHBOARD_AUDITS),
        Err(err) => write_failure(&mut output, "Audits", err),
    }
    let _ = writeln!(output);

    match &snapshot.xp {
        Ok(series) => write_xp(&mut output, series),
        Err(err) => write_failure(&mut output, "XP Progress", err),
    }
    let _ = writeln!(output);

    match &snapshot.skills {
        Ok(skills) => write_skills(&mut output, skills),
        Err(err) => write_failure(&mut output, "Skill Radar", err),
    }

    output
}

#[derive(Serialize)]
struct XpCsvRow {
    index: usize,
    created_at: DateTime<Utc>,
    xp: f64,
}

pub fn write_xp_csv(path: &Path, series: &[XpPoint]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (index, point) in series.iter().enumerate() {
        writer.serialize(XpCsvRow {
            index: index + 1,
            created_at: point.created_at,
            xp: point.xp,
        })?;
    }
    writer.flush()?;
    Ok(())
}
