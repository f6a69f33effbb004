//! Pull a JSON object out of a model reply.
//!
//! Even in JSON mode some models wrap the object in a ```json fence or add a
//! sentence before it.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use cvtailor_shared::{Result, TailorError};

/// The JSON object inside `reply`, or `None` if there is no `{...}` span.
///
/// With several fenced blocks, the first one wins.
pub fn json_object(reply: &str) -> Option<&str> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid regex")
    });

    if let Some(caps) = FENCE_RE.captures(reply) {
        return caps.get(1).map(|m| m.as_str());
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Deserialize the JSON object in `reply` into `T`.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let object = json_object(reply)
        .ok_or_else(|| TailorError::parse("reply contains no JSON object"))?;
    serde_json::from_str(object)
        .map_err(|e| TailorError::parse(format!("reply does not match schema: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvtailor_shared::{ComplianceAssessment, Severity, TargetSpec};

    #[test]
    fn bare_object() {
        assert_eq!(json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn fenced_object_with_prose() {
        let reply = "Here you go:\n```json\n{\"job_title\": \"Engineer\"}\n```\nGood luck!";
        assert_eq!(json_object(reply), Some("{\"job_title\": \"Engineer\"}"));
    }

    #[test]
    fn first_of_several_fenced_blocks() {
        let reply = "Draft:\n```json\n{\"passed\": true, \"issues\": [{\"severity\": \"Minor\", \"issue\": \"x\"}]}\n```\n\
                     Alternative:\n```json\n{\"passed\": false}\n```";
        assert_eq!(
            json_object(reply),
            Some("{\"passed\": true, \"issues\": [{\"severity\": \"Minor\", \"issue\": \"x\"}]}")
        );
        let audit: ComplianceAssessment = parse_reply(reply).unwrap();
        assert!(audit.passed);
        assert_eq!(audit.issues[0].issue, "x");
    }

    #[test]
    fn leading_prose_without_fence() {
        let reply = "Sure. {\"passed\": true} Hope that helps.";
        assert_eq!(json_object(reply), Some("{\"passed\": true}"));
    }

    #[test]
    fn no_object() {
        assert_eq!(json_object("I cannot help with that."), None);
        assert!(parse_reply::<TargetSpec>("no json here").is_err());
    }

    #[test]
    fn model_field_spellings_are_accepted() {
        let target: TargetSpec = parse_reply(
            r#"{"job_title": "Compiler Engineer", "company_name": "Initech",
                "keywords_to_target": ["LLVM"]}"#,
        )
        .unwrap();
        assert_eq!(target.title, "Compiler Engineer");
        assert_eq!(target.organization, "Initech");
        assert_eq!(target.keywords, vec!["LLVM".to_string()]);

        let audit: ComplianceAssessment = parse_reply(
            r#"```json
            {"passed": false, "hallucination_score": 7, "ai_cliche_score": 2,
             "issues": [{"severity": "critical", "issue": "invented skill", "suggestion": "remove skill X"}],
             "feedback_summary": "Remove invented skills."}
            ```"#,
        )
        .unwrap();
        assert_eq!(audit.fabrication_risk, 7);
        assert_eq!(audit.issues[0].severity, Severity::Critical);
    }

    #[test]
    fn schema_mismatch_is_a_parse_error() {
        let err = parse_reply::<ComplianceAssessment>(r#"{"passed": "maybe"}"#).unwrap_err();
        assert!(matches!(err, TailorError::Parse { .. }));
    }
}
