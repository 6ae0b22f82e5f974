//! Ranking/Formatting layer: flattens ranked matches into the record shape the
//! result consumer renders.
//!
//! Deliberately lenient: a malformed metadata field becomes a blank value instead of
//! failing the batch, so one corrupt posting never hides an otherwise valid result set.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::matching::index::JobMetadata;
use crate::matching::matcher::{MatchResult, RankedResultSet};

/// Metadata key for the pre-composed "title - company" string.
pub const KEY_TITLE_COMPANY: &str = "Job Title - Company";
pub const KEY_LOCATION: &str = "Location";
pub const KEY_SUMMARY: &str = "Summary";
pub const KEY_SKILLS: &str = "Skills";
pub const KEY_LINK: &str = "Link";
pub const KEY_SIMILARITY_SCORE: &str = "Similarity Score";

/// Fractional digits in the rendered similarity score.
pub const SCORE_PRECISION: usize = 4;

/// One flat output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecommendation {
    #[serde(rename = "Job Title - Company")]
    pub title_company: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Summary")]
    pub summary: String,
    /// A string or a list of strings, passed through as stored.
    #[serde(rename = "Skills")]
    pub skills: Value,
    #[serde(rename = "Link")]
    pub link: String,
    /// Higher is better, fixed 4-digit precision.
    #[serde(rename = "Similarity Score")]
    pub similarity_score: String,
}

/// Flat records in rank order. Total: the empty set yields an empty list.
pub fn to_output(results: &RankedResultSet) -> Vec<JobRecommendation> {
    results.into_iter().map(to_recommendation).collect()
}

/// The keyed shape `{"job1": {...}, "job2": {...}}`, numbered from 1 in rank order.
pub fn to_keyed_output(results: &RankedResultSet) -> Map<String, Value> {
    to_output(results)
        .into_iter()
        .enumerate()
        .map(|(i, rec)| (format!("job{}", i + 1), Value::Object(rec.into_map())))
        .collect()
}

impl JobRecommendation {
    /// Same keys and order as the serialized record.
    pub fn into_map(self) -> Map<String, Value> {
        let mut map = Map::with_capacity(6);
        map.insert(KEY_TITLE_COMPANY.to_string(), Value::String(self.title_company));
        map.insert(KEY_LOCATION.to_string(), Value::String(self.location));
        map.insert(KEY_SUMMARY.to_string(), Value::String(self.summary));
        map.insert(KEY_SKILLS.to_string(), self.skills);
        map.insert(KEY_LINK.to_string(), Value::String(self.link));
        map.insert(
            KEY_SIMILARITY_SCORE.to_string(),
            Value::String(self.similarity_score),
        );
        map
    }
}

fn to_recommendation(result: &MatchResult) -> JobRecommendation {
    let metadata = &result.job.metadata;
    JobRecommendation {
        title_company: title_company(metadata),
        location: text_field(metadata, KEY_LOCATION, "location"),
        summary: text_field(metadata, KEY_SUMMARY, "summary"),
        skills: skills(metadata),
        link: text_field(metadata, KEY_LINK, "link"),
        similarity_score: format_score(result.similarity_score),
    }
}

pub fn format_score(score: f32) -> String {
    format!("{:.*}", SCORE_PRECISION, score)
}

/// The composite key when present; otherwise built from separate title/company fields.
fn title_company(metadata: &JobMetadata) -> String {
    if let Some(composite) = metadata.text(KEY_TITLE_COMPANY) {
        return composite.to_string();
    }
    let title = metadata
        .text("title")
        .or_else(|| metadata.text("Job Title"))
        .filter(|s| !s.is_empty());
    let company = metadata
        .text("company")
        .or_else(|| metadata.text("Company"))
        .filter(|s| !s.is_empty());
    match (title, company) {
        (Some(t), Some(c)) => format!("{t} - {c}"),
        (Some(t), None) => t.to_string(),
        (None, Some(c)) => c.to_string(),
        (None, None) => String::new(),
    }
}

fn text_field(metadata: &JobMetadata, key: &str, fallback_key: &str) -> String {
    metadata
        .text(key)
        .or_else(|| metadata.text(fallback_key))
        .unwrap_or_default()
        .to_string()
}

fn skills(metadata: &JobMetadata) -> Value {
    let raw = metadata.get(KEY_SKILLS).or_else(|| metadata.get("skills"));
    match raw {
        Some(Value::String(s)) => Value::String(s.clone()),
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => {
            Value::Array(items.clone())
        }
        _ => Value::String(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::matcher::{rank, MatchedJob};
    use serde_json::json;
    use std::num::NonZeroUsize;

    fn result(id: &str, metadata: Value, score: f32) -> MatchResult {
        MatchResult {
            job: MatchedJob {
                id: id.to_string(),
                metadata: serde_json::from_value(metadata).unwrap(),
            },
            similarity_score: score,
        }
    }

    fn ranked(results: Vec<MatchResult>) -> RankedResultSet {
        rank(results, NonZeroUsize::new(100).unwrap())
    }

    #[test]
    fn test_empty_set_yields_empty_output() {
        assert!(to_output(&RankedResultSet::default()).is_empty());
        assert!(to_keyed_output(&RankedResultSet::default()).is_empty());
    }

    #[test]
    fn test_full_record_maps_every_field() {
        let set = ranked(vec![result(
            "job1",
            json!({
                "Job Title - Company": "Backend Engineer - Acme",
                "Location": "Austin",
                "Summary": "Build APIs",
                "Skills": ["Python", "SQL"],
                "Link": "https://acme.example/jobs/1"
            }),
            0.87654,
        )]);

        let out = to_output(&set);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title_company, "Backend Engineer - Acme");
        assert_eq!(out[0].location, "Austin");
        assert_eq!(out[0].summary, "Build APIs");
        assert_eq!(out[0].skills, json!(["Python", "SQL"]));
        assert_eq!(out[0].link, "https://acme.example/jobs/1");
        assert_eq!(out[0].similarity_score, "0.8765");
    }

    #[test]
    fn test_serialized_keys_match_consumer_schema() {
        let set = ranked(vec![result("job1", json!({"Location": "Remote"}), 1.0)]);
        let value = serde_json::to_value(&to_output(&set)[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "Job Title - Company": "",
                "Location": "Remote",
                "Summary": "",
                "Skills": "",
                "Link": "",
                "Similarity Score": "1.0000"
            })
        );
    }

    #[test]
    fn test_malformed_fields_become_blank() {
        let set = ranked(vec![result(
            "job1",
            json!({
                "Job Title - Company": 42,
                "Location": ["Austin"],
                "Summary": null,
                "Skills": {"primary": "Rust"},
                "Link": false
            }),
            0.5,
        )]);
        let out = &to_output(&set)[0];
        assert_eq!(out.title_company, "");
        assert_eq!(out.location, "");
        assert_eq!(out.summary, "");
        assert_eq!(out.skills, json!(""));
        assert_eq!(out.link, "");
        assert_eq!(out.similarity_score, "0.5000");
    }

    #[test]
    fn test_title_company_composed_from_parts() {
        let set = ranked(vec![
            result("a", json!({"title": "SRE", "company": "Initech"}), 0.9),
            result("b", json!({"title": "SRE"}), 0.8),
            result("c", json!({"company": "Initech"}), 0.7),
        ]);
        let out = to_output(&set);
        assert_eq!(out[0].title_company, "SRE - Initech");
        assert_eq!(out[1].title_company, "SRE");
        assert_eq!(out[2].title_company, "Initech");
    }

    #[test]
    fn test_skills_string_passes_through() {
        let set = ranked(vec![result("a", json!({"Skills": "Rust, Go"}), 0.9)]);
        assert_eq!(to_output(&set)[0].skills, json!("Rust, Go"));
    }

    #[test]
    fn test_keyed_output_numbers_from_one_in_rank_order() {
        let set = ranked(vec![
            result("x", json!({"Location": "Austin"}), 0.9),
            result("y", json!({"Location": "Denver"}), 0.4),
        ]);
        let keyed = to_keyed_output(&set);
        let keys: Vec<&String> = keyed.keys().collect();
        assert_eq!(keys, vec!["job1", "job2"]);
        assert_eq!(keyed["job2"]["Location"], json!("Denver"));
    }

    #[test]
    fn test_keyed_entry_matches_flat_record() {
        let set = ranked(vec![result(
            "x",
            json!({"Job Title - Company": "SRE - Initech", "Skills": "Go", "Link": "https://x"}),
            0.75,
        )]);
        let flat = serde_json::to_value(&to_output(&set)[0]).unwrap();
        let keyed = to_keyed_output(&set);
        assert_eq!(keyed["job1"], flat);
        let keys: Vec<&String> = keyed["job1"].as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                KEY_TITLE_COMPANY,
                KEY_LOCATION,
                KEY_SUMMARY,
                KEY_SKILLS,
                KEY_LINK,
                KEY_SIMILARITY_SCORE
            ]
        );
    }

    #[test]
    fn test_output_is_stable_across_calls() {
        let set = ranked(vec![result("x", json!({"Location": "Austin"}), 0.123456)]);
        assert_eq!(to_output(&set), to_output(&set));
    }

    #[test]
    fn test_negative_scores_keep_precision() {
        assert_eq!(format_score(-0.25), "-0.2500");
    }
}
