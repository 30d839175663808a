//! Keyword search over stored scripts.
//!
//! Every whitespace-separated term of the query is matched case-insensitively
//! against a script. A term found anywhere in the name, explanation, tags or
//! source scores 2, a term in the name scores another 3 and a term in a tag
//! another 2. Scripts scoring zero are dropped; the rest are ranked by score,
//! ties keeping index order.

use serde::{Deserialize, Serialize};

use crate::record::ScriptRecord;

pub const MAX_SEARCH_RESULTS: usize = 50;
pub const CODE_PREVIEW_LINES: usize = 12;
pub const EXPLANATION_PREVIEW_CHARS: usize = 240;

const ANYWHERE_SCORE: u32 = 2;
const NAME_SCORE: u32 = 3;
const TAG_SCORE: u32 = 2;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub record: ScriptRecord,
    pub score: u32,
    pub code_preview: String,
    pub explanation_preview: String,
}

/// Lowercased query terms; empty when the query is blank.
pub fn query_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

pub fn score(record: &ScriptRecord, code: &str, terms: &[String]) -> u32 {
    let name = record.name.to_lowercase();
    let tags: Vec<String> = record.tags.iter().map(|tag| tag.to_lowercase()).collect();
    let haystack = format!(
        "{} {} {} {}",
        record.name,
        record.explanation,
        record.tags.join(" "),
        code
    )
    .to_lowercase();

    terms
        .iter()
        .map(|term| {
            let mut score = 0;
            if haystack.contains(term.as_str()) {
                score += ANYWHERE_SCORE;
            }
            if name.contains(term.as_str()) {
                score += NAME_SCORE;
            }
            if tags.iter().any(|tag| tag.contains(term.as_str())) {
                score += TAG_SCORE;
            }
            score
        })
        .sum()
}

pub fn code_preview(code: &str) -> String {
    code.split('\n')
        .take(CODE_PREVIEW_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn explanation_preview(explanation: &str) -> String {
    explanation.chars().take(EXPLANATION_PREVIEW_CHARS).collect()
}

/// Score, filter, rank and cap `(record, source)` pairs.
pub fn rank(scripts: impl IntoIterator<Item = (ScriptRecord, String)>, query: &str) -> Vec<SearchHit> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = scripts
        .into_iter()
        .filter_map(|(record, code)| {
            let score = score(&record, &code, &terms);
            (score > 0).then(|| SearchHit {
                code_preview: code_preview(&code),
                explanation_preview: explanation_preview(&record.explanation),
                record,
                score,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(MAX_SEARCH_RESULTS);
    hits
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record(id: &str, name: &str, explanation: &str, tags: &[&str]) -> ScriptRecord {
        ScriptRecord {
            id: String::from(id),
            name: String::from(name),
            file_path: format!("/scripts/{name}").into(),
            explanation: String::from(explanation),
            tags: tags.iter().map(|tag| String::from(*tag)).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_score_weights() {
        let terms = query_terms("Backup");
        assert_eq!(score(&record("a", "backup.sh", "", &[]), "", &terms), 5);
        assert_eq!(score(&record("a", "x.sh", "", &["backups"]), "", &terms), 4);
        assert_eq!(score(&record("a", "x.sh", "Nightly BACKUP", &[]), "", &terms), 2);
        assert_eq!(score(&record("a", "x.sh", "", &[]), "tar czf backup.tgz", &terms), 2);
        assert_eq!(score(&record("a", "x.sh", "", &[]), "echo", &terms), 0);
    }

    #[test]
    fn test_terms_add_up() {
        let terms = query_terms("  disk   usage ");
        assert_eq!(terms, vec!["disk", "usage"]);
        assert_eq!(score(&record("a", "disk-usage.py", "", &[]), "", &terms), 10);
    }

    #[test]
    fn test_rank_orders_and_filters() {
        let scripts = vec![
            (record("code", "a.sh", "", &[]), String::from("rsync backup")),
            (record("none", "b.sh", "", &[]), String::from("echo hi")),
            (record("name", "backup.sh", "", &[]), String::new()),
            (record("code2", "c.sh", "", &[]), String::from("backup again")),
        ];
        let ids: Vec<String> = rank(scripts, "backup")
            .into_iter()
            .map(|hit| hit.record.id)
            .collect();
        assert_eq!(ids, vec!["name", "code", "code2"]);
    }

    #[test]
    fn test_blank_query_finds_nothing() {
        let scripts = vec![(record("a", "a.sh", "", &[]), String::new())];
        assert!(rank(scripts, "   ").is_empty());
    }

    #[test]
    fn test_results_are_capped() {
        let scripts = (0..60).map(|i| (record(&i.to_string(), "job.sh", "", &[]), String::new()));
        assert_eq!(rank(scripts, "job").len(), MAX_SEARCH_RESULTS);
    }

    #[test]
    fn test_previews() {
        let code: String = (1..=20).map(|i| format!("line {i}\n")).collect();
        let preview = code_preview(&code);
        assert_eq!(preview.lines().count(), 12);
        assert!(preview.ends_with("line 12"));

        let explanation = "é".repeat(300);
        assert_eq!(explanation_preview(&explanation).chars().count(), 240);
        assert_eq!(explanation_preview("short"), "short");
    }
}
