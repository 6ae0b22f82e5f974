//! Profile Normalizer: resolves resume-summary input into a `Profile` and flattens it
//! into the single text blob that gets embedded.
//!
//! Input arrives either as raw text (usually JSON emitted by the extraction stage) or
//! as an already-structured mapping. The variant is resolved once, here, at the boundary.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::matching::MatchError;

/// Recognized profile fields, in the canonical order used for `ProfileText`.
pub const FIELD_ROLE: &str = "role";
pub const FIELD_SKILLS: &str = "skills";
pub const FIELD_SUMMARY: &str = "summary";
pub const FIELD_EXPERIENCE: &str = "experience";
pub const FIELD_LAST_LOCATION: &str = "last_location";

pub const KNOWN_FIELDS: [&str; 5] = [
    FIELD_ROLE,
    FIELD_SKILLS,
    FIELD_SUMMARY,
    FIELD_EXPERIENCE,
    FIELD_LAST_LOCATION,
];

/// Key used when raw text cannot be read as a JSON object.
pub const FIELD_TEXT: &str = "text";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Seniority bucket assigned by the extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperienceLevel {
    Junior,
    Mid,
    MidSenior,
    Senior,
    /// Anything the extraction stage produced that is not one of the four buckets.
    Other(String),
}

impl ExperienceLevel {
    pub fn parse(raw: &str) -> Self {
        let canonical = raw.trim().to_lowercase().replace(['_', ' '], "-");
        match canonical.as_str() {
            "junior" => ExperienceLevel::Junior,
            "mid" => ExperienceLevel::Mid,
            "mid-senior" => ExperienceLevel::MidSenior,
            "senior" => ExperienceLevel::Senior,
            _ => ExperienceLevel::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::MidSenior => "mid-senior",
            ExperienceLevel::Senior => "senior",
            ExperienceLevel::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExperienceLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Structured resume summary. Built once per resume; the matcher only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<ExperienceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_location: Option<String>,
    /// Unrecognized fields, kept in encounter order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Embedding input derived from a `Profile`. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileText(String);

impl ProfileText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Profile as received at the boundary, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileInput {
    RawText(String),
    Structured(Map<String, Value>),
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

impl ProfileInput {
    /// Accepts a JSON string or object. Any other JSON shape is a caller bug.
    pub fn from_value(value: Value) -> Result<Self, MatchError> {
        match value {
            Value::String(text) => Ok(ProfileInput::RawText(text)),
            Value::Object(map) => Ok(ProfileInput::Structured(map)),
            other => Err(MatchError::MalformedProfile(format!(
                "expected a string or an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn resolve(self) -> Profile {
        match self {
            ProfileInput::Structured(map) => Profile::from_map(map),
            ProfileInput::RawText(text) => Profile::from_map(parse_raw_text(&text)),
        }
    }
}

/// Reads raw text as a JSON object. The extraction stage sometimes emits the object
/// body without its braces, so a second attempt wraps it. Anything else becomes
/// `{"text": <raw>}`.
fn parse_raw_text(text: &str) -> Map<String, Value> {
    let trimmed = text.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return map;
    }
    if !trimmed.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&format!("{{{trimmed}}}")) {
            return map;
        }
    }
    let mut map = Map::new();
    map.insert(FIELD_TEXT.to_string(), Value::String(text.to_string()));
    map
}

impl Profile {
    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut profile = Profile::default();
        for (key, value) in map {
            match key.as_str() {
                FIELD_ROLE => profile.role = scalar_text(&value),
                FIELD_SKILLS => profile.skills = skill_list(&value),
                FIELD_SUMMARY => profile.summary = scalar_text(&value),
                FIELD_EXPERIENCE => {
                    profile.experience = scalar_text(&value).map(|s| ExperienceLevel::parse(&s))
                }
                FIELD_LAST_LOCATION => profile.last_location = scalar_text(&value),
                _ => {
                    profile.extra.insert(key, value);
                }
            }
        }
        profile
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    if is_falsy(value) {
        return None;
    }
    Some(render_value(value))
}

fn skill_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !is_falsy(item))
            .map(render_value)
            .collect(),
        other if !is_falsy(other) => vec![render_value(other)],
        _ => Vec::new(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

/// Flattens a profile into `key: value` pairs joined by a single space.
///
/// Known fields come first in canonical order, then extras in encounter order.
/// Empty fields are skipped, so the output is stable for equal profiles.
pub fn normalize(profile: &Profile) -> ProfileText {
    let mut parts: Vec<String> = Vec::with_capacity(KNOWN_FIELDS.len() + profile.extra.len());

    let mut push = |key: &str, value: &str| {
        if !value.is_empty() {
            parts.push(format!("{key}: {value}"));
        }
    };

    if let Some(role) = &profile.role {
        push(FIELD_ROLE, role);
    }
    push(FIELD_SKILLS, profile.skills.join(", ").as_str());
    if let Some(summary) = &profile.summary {
        push(FIELD_SUMMARY, summary);
    }
    if let Some(experience) = &profile.experience {
        push(FIELD_EXPERIENCE, experience.as_str());
    }
    if let Some(location) = &profile.last_location {
        push(FIELD_LAST_LOCATION, location);
    }
    for (key, value) in &profile.extra {
        if !is_falsy(value) {
            push(key.as_str(), render_value(value).as_str());
        }
    }

    ProfileText(parts.join(" "))
}

/// Null, false, zero, and empty strings/arrays/objects carry no signal.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(value: Value) -> Profile {
        ProfileInput::from_value(value).unwrap().resolve()
    }

    #[test]
    fn test_normalize_uses_canonical_field_order() {
        let profile = structured(json!({
            "last_location": "Austin",
            "experience": "mid",
            "skills": ["Python", "SQL"],
            "role": "Backend Engineer"
        }));
        assert_eq!(
            normalize(&profile).as_str(),
            "role: Backend Engineer skills: Python, SQL experience: mid last_location: Austin"
        );
    }

    #[test]
    fn test_normalize_is_independent_of_input_key_order() {
        let a = structured(json!({
            "role": "Data Engineer",
            "skills": ["Spark"],
            "summary": "Built pipelines",
            "experience": "senior",
            "last_location": "Berlin"
        }));
        let b = structured(json!({
            "summary": "Built pipelines",
            "last_location": "Berlin",
            "skills": ["Spark"],
            "experience": "senior",
            "role": "Data Engineer"
        }));
        assert_eq!(normalize(&a), normalize(&b));
    }

    #[test]
    fn test_normalize_skips_empty_fields() {
        let profile = structured(json!({"role": "Engineer", "skills": [], "summary": ""}));
        let text = normalize(&profile);
        assert!(text.as_str().contains("role: Engineer"));
        assert!(!text.as_str().contains("skills:"));
        assert!(!text.as_str().contains("summary:"));
    }

    #[test]
    fn test_extra_fields_follow_known_fields_in_encounter_order() {
        let profile = structured(json!({
            "zeta": "last",
            "role": "SRE",
            "alpha": "first-seen-second",
            "empty": null
        }));
        assert_eq!(
            normalize(&profile).as_str(),
            "role: SRE zeta: last alpha: first-seen-second"
        );
    }

    #[test]
    fn test_raw_json_text_is_parsed() {
        let input = ProfileInput::from_value(json!(r#"{"role": "QA", "skills": ["Selenium"]}"#))
            .unwrap();
        let profile = input.resolve();
        assert_eq!(profile.role.as_deref(), Some("QA"));
        assert_eq!(profile.skills, vec!["Selenium".to_string()]);
    }

    #[test]
    fn test_raw_text_without_braces_is_parsed() {
        let raw = r#""role": "ML Engineer", "skills": ["PyTorch", "CUDA"], "experience": "Mid-Senior""#;
        let profile = ProfileInput::RawText(raw.to_string()).resolve();
        assert_eq!(profile.role.as_deref(), Some("ML Engineer"));
        assert_eq!(profile.experience, Some(ExperienceLevel::MidSenior));
    }

    #[test]
    fn test_unparseable_text_is_wrapped() {
        let profile = ProfileInput::RawText("just some resume prose".to_string()).resolve();
        assert_eq!(normalize(&profile).as_str(), "text: just some resume prose");
    }

    #[test]
    fn test_json_text_that_is_not_an_object_is_wrapped() {
        let profile = ProfileInput::RawText("[1, 2, 3]".to_string()).resolve();
        assert_eq!(profile.extra.get(FIELD_TEXT), Some(&json!("[1, 2, 3]")));
    }

    #[test]
    fn test_non_string_non_object_input_is_malformed() {
        for value in [json!(42), json!([1, 2]), json!(null), json!(true)] {
            let err = ProfileInput::from_value(value).unwrap_err();
            assert!(matches!(err, MatchError::MalformedProfile(_)));
        }
    }

    #[test]
    fn test_experience_levels_parse_case_insensitively() {
        assert_eq!(ExperienceLevel::parse("Junior"), ExperienceLevel::Junior);
        assert_eq!(ExperienceLevel::parse("mid_senior"), ExperienceLevel::MidSenior);
        assert_eq!(ExperienceLevel::parse("SENIOR"), ExperienceLevel::Senior);
        assert_eq!(
            ExperienceLevel::parse("7 years"),
            ExperienceLevel::Other("7 years".to_string())
        );
    }

    #[test]
    fn test_single_string_skills_become_one_entry() {
        let profile = structured(json!({"skills": "Rust"}));
        assert_eq!(profile.skills, vec!["Rust".to_string()]);
    }

    #[test]
    fn test_falsy_values() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!("")));
        assert!(is_falsy(&json!([])));
        assert!(is_falsy(&json!({})));
        assert!(!is_falsy(&json!(3)));
        assert!(!is_falsy(&json!("x")));
    }

    #[test]
    fn test_profile_serializes_experience_as_label() {
        let profile = structured(json!({"role": "PM", "experience": "mid"}));
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value, json!({"role": "PM", "experience": "mid"}));
    }
}
