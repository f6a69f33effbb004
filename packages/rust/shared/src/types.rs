//! Domain types shared by every stage of a tailoring run.
//!
//! [`SourceProfile`] is ground truth: nothing in a [`DraftArtifact`] may claim more
//! than it does. Both wrap the same [`Resume`] shape but are distinct types so a
//! draft can never be handed to a stage that expects the original.

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Current schema version for the emitted [`RunRecord`].
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Summary used in the audit report when no assessment was ever produced.
pub const NO_AUDIT_SUMMARY: &str = "No audit result available.";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Resume shape
// ---------------------------------------------------------------------------

/// One position held, with its achievement bullets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(alias = "company")]
    pub organization: String,
    pub role: String,
    /// Free-form date range as written in the source (e.g. `2019 - 2023`).
    #[serde(default, alias = "date_range")]
    pub dates: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// The structured résumé shape shared by source profiles and drafts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    #[serde(default, alias = "name")]
    pub full_name: String,
    /// Contact fields such as `email`, `phone`, `location`.
    #[serde(default, alias = "contact_info", deserialize_with = "contact_fields")]
    pub contact: BTreeMap<String, String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub publications: Vec<String>,
}

/// Accept contact details either as a field map or as one free-text line.
fn contact_fields<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Contact {
        Fields(BTreeMap<String, String>),
        Line(String),
        Missing(()),
    }

    Ok(match Contact::deserialize(deserializer)? {
        Contact::Fields(map) => map,
        Contact::Line(line) if line.trim().is_empty() => BTreeMap::new(),
        Contact::Line(line) => BTreeMap::from([("contact".to_string(), line)]),
        Contact::Missing(()) => BTreeMap::new(),
    })
}

/// Ground-truth profile parsed from the source document. Read-only after parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceProfile(pub Resume);

impl Deref for SourceProfile {
    type Target = Resume;

    fn deref(&self) -> &Resume {
        &self.0
    }
}

impl SourceProfile {
    /// The first required part that is absent. A profile needs a name and at
    /// least one position to tailor from.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.full_name.trim().is_empty() {
            Some("full name")
        } else if self.experience.is_empty() {
            Some("experience")
        } else {
            None
        }
    }
}

/// A generated candidate. Each refinement or regeneration yields a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftArtifact(pub Resume);

impl Deref for DraftArtifact {
    type Target = Resume;

    fn deref(&self) -> &Resume {
        &self.0
    }
}

impl DraftArtifact {
    /// Skills in the draft that never appear in the source profile.
    pub fn untraced_skills(&self, source: &SourceProfile) -> Vec<String> {
        untraced(&self.skills, &source.skills)
    }

    /// Employers in the draft that never appear in the source profile.
    pub fn untraced_organizations(&self, source: &SourceProfile) -> Vec<String> {
        let drafted: Vec<String> = self
            .experience
            .iter()
            .map(|e| e.organization.clone())
            .collect();
        let known: Vec<String> = source
            .experience
            .iter()
            .map(|e| e.organization.clone())
            .collect();
        untraced(&drafted, &known)
    }
}

fn untraced(candidates: &[String], known: &[String]) -> Vec<String> {
    let known: Vec<String> = known.iter().map(|k| k.trim().to_lowercase()).collect();
    candidates
        .iter()
        .filter(|c| !known.contains(&c.trim().to_lowercase()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// TargetSpec
// ---------------------------------------------------------------------------

/// Requirements extracted from the target posting. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(default, alias = "job_title")]
    pub title: String,
    #[serde(default, alias = "company_name", alias = "company")]
    pub organization: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub hard_skills: Vec<String>,
    #[serde(default)]
    pub soft_skills: Vec<String>,
    #[serde(default)]
    pub key_responsibilities: Vec<String>,
    #[serde(default, alias = "keywords_to_target")]
    pub keywords: Vec<String>,
}

impl TargetSpec {
    /// The first required part that is absent: a title, then an organization.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.organization.trim().is_empty() {
            Some("organization")
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Assessments
// ---------------------------------------------------------------------------

/// Reviewer verdict for one review iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// 0-10, higher is better.
    #[serde(default)]
    pub quality_score: f32,
    #[serde(default)]
    pub needs_improvement: bool,
    #[serde(default, alias = "specific_suggestions")]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
}

/// Issue severity as reported by the auditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Fabricated or untraceable content.
    Critical,
    Major,
    /// Style and wording.
    Minor,
    Other(String),
}

impl From<String> for Severity {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "major" => Self::Major,
            "minor" => Self::Minor,
            _ => Self::Other(tag),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.to_string()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => f.write_str("Critical"),
            Self::Major => f.write_str("Major"),
            Self::Minor => f.write_str("Minor"),
            Self::Other(tag) if tag.trim().is_empty() => f.write_str("Unknown"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// One problem found by the auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub severity: Severity,
    #[serde(alias = "description")]
    pub issue: String,
    #[serde(default, alias = "suggested_fix")]
    pub suggestion: String,
}

/// Auditor verdict for one write cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAssessment {
    pub passed: bool,
    /// 0-10, 0 means nothing invented.
    #[serde(default, alias = "hallucination_score")]
    pub fabrication_risk: u8,
    /// 0-10, 10 means very robotic.
    #[serde(default, alias = "ai_cliche_score")]
    pub unnatural_language_risk: u8,
    #[serde(default)]
    pub issues: Vec<ComplianceIssue>,
    #[serde(default)]
    pub feedback_summary: String,
}

// ---------------------------------------------------------------------------
// Result contract
// ---------------------------------------------------------------------------

/// Flattened audit issue, independent of the auditor's own types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    pub severity: String,
    pub issue: String,
    pub suggestion: String,
}

/// Flat compliance report handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub passed: bool,
    pub fabrication_risk: Option<u8>,
    pub unnatural_language_risk: Option<u8>,
    pub feedback_summary: String,
    pub issues: Vec<AuditIssue>,
}

impl AuditReport {
    /// Placeholder report for runs where no audit ever completed.
    pub fn unavailable() -> Self {
        Self {
            passed: false,
            fabrication_risk: None,
            unnatural_language_risk: None,
            feedback_summary: NO_AUDIT_SUMMARY.to_string(),
            issues: Vec::new(),
        }
    }
}

impl From<&ComplianceAssessment> for AuditReport {
    fn from(assessment: &ComplianceAssessment) -> Self {
        Self {
            passed: assessment.passed,
            fabrication_risk: Some(assessment.fabrication_risk),
            unnatural_language_risk: Some(assessment.unnatural_language_risk),
            feedback_summary: assessment.feedback_summary.clone(),
            issues: assessment
                .issues
                .iter()
                .map(|i| AuditIssue {
                    severity: i.severity.to_string(),
                    issue: i.issue.clone(),
                    suggestion: i.suggestion.clone(),
                })
                .collect(),
        }
    }
}

/// Terminal output of a pipeline run, produced whether or not the audit passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Organization named in the target posting.
    pub organization: String,
    /// JSON-serialized [`DraftArtifact`], or empty if none was ever generated.
    pub tailored_resume: String,
    pub audit_report: AuditReport,
    pub passed: bool,
    /// Write cycles started before the run ended.
    pub write_cycles: u32,
}

impl PipelineResult {
    /// Decode the tailored résumé, if one was produced.
    pub fn draft(&self) -> Option<DraftArtifact> {
        if self.tailored_resume.is_empty() {
            return None;
        }
        serde_json::from_str(&self.tailored_resume).ok()
    }
}

/// The document emitted by the CLI for downstream renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub schema_version: u32,
    pub run_id: RunId,
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub result: PipelineResult,
}
