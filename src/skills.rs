//! Skill classification.
//!
//! Labels are matched by exact token against two fixed vocabularies. The
//! token is the lower-cased label without its leading `skill_`, so
//! `skill_algo` is technical and never a technology just because it
//! contains `go`.

use tracing::warn;

use crate::models::{ClassifiedSkills, SkillRecord};

pub const TOP_SKILLS: usize = 6;
pub const SKILL_PREFIX: &str = "skill_";

pub const TECHNICAL: &[&str] = &[
    "prog",
    "algo",
    "sys-admin",
    "front-end",
    "back-end",
    "stats",
    "game",
    "ai",
    "tcp",
    "tcp/ip",
    "cybersecurity",
    "elementary programming",
    "elementary algorithms",
    "blockchain",
    "mobile",
];

pub const TECHNOLOGY: &[&str] = &[
    "go",
    "js",
    "sql",
    "html",
    "css",
    "unix",
    "docker",
    "c",
    "shell",
    "php",
    "python",
    "rust",
    "ruby",
    "git",
    "graphql",
    "c++",
    "ruby on rails",
    "laravel",
    "django",
    "electron",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillCategory {
    Technical,
    Technology,
}

pub fn skill_token(label: &str) -> &str {
    label.strip_prefix(SKILL_PREFIX).unwrap_or(label)
}

pub fn categorize(label: &str) -> Option<SkillCategory> {
    let token = skill_token(label);
    if TECHNICAL.iter().any(|t| *t == token) {
        Some(SkillCategory::Technical)
    } else if TECHNOLOGY.iter().any(|t| *t == token) {
        Some(SkillCategory::Technology)
    } else {
        None
    }
}

/// Splits deduplicated skill rows into the two ranked lists.
pub fn classify_skills(rows: Vec<SkillRecord>) -> ClassifiedSkills {
    let mut classified = ClassifiedSkills::default();

    for row in rows {
        let record = SkillRecord {
            skill_type: row.skill_type.to_lowercase(),
            amount: row.amount,
        };
        match categorize(&record.skill_type) {
            Some(SkillCategory::Technical) => classified.technical_skills.push(record),
            Some(SkillCategory::Technology) => classified.technologies.push(record),
            None => {
                warn!("Unrecognized skill: {}", record.skill_type);
                classified.unclassified.push(record);
            }
        }
    }

    rank(&mut classified.technical_skills);
    rank(&mut classified.technologies);
    classified
}

/// Amount descending, stable on ties, top six.
fn rank(records: &mut Vec<SkillRecord>) {
    records.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    records.truncate(TOP_SKILLS);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(label: &str, amount: f64) -> SkillRecord {
        SkillRecord::new(label, amount)
    }

    #[test]
    fn splits_technologies_from_technical_skills() {
        let classified = classify_skills(vec![skill("skill_go", 50.0), skill("skill_front-end", 80.0)]);
        assert_eq!(classified.technologies, vec![skill("skill_go", 50.0)]);
        assert_eq!(classified.technical_skills, vec![skill("skill_front-end", 80.0)]);
        assert!(classified.unclassified.is_empty());
    }

    #[test]
    fn exact_tokens_avoid_substring_collisions() {
        assert_eq!(categorize("skill_algo"), Some(SkillCategory::Technical));
        assert_eq!(categorize("skill_c"), Some(SkillCategory::Technology));
        assert_eq!(categorize("skill_c++"), Some(SkillCategory::Technology));
        assert_eq!(categorize("skill_graphql"), Some(SkillCategory::Technology));
        assert_eq!(categorize("skill_cooking"), None);
    }

    #[test]
    fn labels_are_lowercased_and_keep_their_prefix() {
        let classified = classify_skills(vec![skill("Skill_Docker", 10.0)]);
        assert_eq!(classified.technologies, vec![skill("skill_docker", 10.0)]);
    }

    #[test]
    fn unknown_labels_are_surfaced() {
        let classified = classify_skills(vec![skill("skill_knitting", 5.0), skill("skill_js", 20.0)]);
        assert_eq!(classified.unclassified, vec![skill("skill_knitting", 5.0)]);
        assert_eq!(classified.technologies.len(), 1);
    }

    #[test]
    fn lists_are_ranked_and_capped() {
        let rows = TECHNOLOGY
            .iter()
            .enumerate()
            .map(|(i, token)| skill(&format!("skill_{token}"), i as f64))
            .collect::<Vec<_>>();
        let input_len = rows.len();
        let classified = classify_skills(rows);

        assert_eq!(classified.technologies.len(), TOP_SKILLS);
        assert!(classified
            .technologies
            .windows(2)
            .all(|pair| pair[0].amount >= pair[1].amount));
        assert_eq!(classified.technologies[0].amount, (input_len - 1) as f64);
    }

    #[test]
    fn ties_keep_upstream_order() {
        let classified = classify_skills(vec![
            skill("skill_back-end", 30.0),
            skill("skill_ai", 30.0),
            skill("skill_algo", 40.0),
        ]);
        let order: Vec<&str> = classified
            .technical_skills
            .iter()
            .map(|s| s.skill_type.as_str())
            .collect();
        assert_eq!(order, vec!["skill_algo", "skill_back-end", "skill_ai"]);
    }

    #[test]
    fn output_is_disjoint_subset_of_input() {
        let rows = vec![
            skill("skill_go", 5.0),
            skill("skill_prog", 7.0),
            skill("skill_stats", 3.0),
            skill("skill_html", 9.0),
            skill("skill_dance", 1.0),
        ];
        let classified = classify_skills(rows.clone());
        for record in classified.technical_skills.iter() {
            assert!(rows.contains(record));
            assert!(!classified.technologies.contains(record));
        }
        for record in classified.technologies.iter() {
            assert!(rows.contains(record));
        }
    }

    #[test]
    fn vocabularies_do_not_overlap() {
        for token in TECHNICAL {
            assert!(!TECHNOLOGY.contains(token), "{token} is in both vocabularies");
        }
    }
}
