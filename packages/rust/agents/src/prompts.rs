//! System prompts for the five roles and the user prompt for each request.

use serde::Serialize;

use cvtailor_core::{AuditRequest, GenerationRequest, ParseRequest, ReviewRequest};

// ---------------------------------------------------------------------------
// Output schemas
// ---------------------------------------------------------------------------

const RESUME_SCHEMA: &str = r#"{
  "full_name": "string",
  "contact_info": {"email": "string", "phone": "string", "location": "string"},
  "summary": "string",
  "skills": ["string"],
  "experience": [{"company": "string", "role": "string", "dates": "string", "highlights": ["string"]}],
  "projects": ["string"],
  "education": ["string"],
  "certifications": ["string"],
  "publications": ["string"]
}"#;

const JOB_SCHEMA: &str = r#"{
  "job_title": "string",
  "company_name": "string",
  "summary": "string",
  "hard_skills": ["string"],
  "soft_skills": ["string"],
  "key_responsibilities": ["string"],
  "keywords_to_target": ["string"]
}"#;

const REVIEW_SCHEMA: &str = r#"{
  "quality_score": 0.0,
  "needs_improvement": true,
  "specific_suggestions": ["string"],
  "strengths": ["string"]
}"#;

const AUDIT_SCHEMA: &str = r#"{
  "passed": false,
  "hallucination_score": 0,
  "ai_cliche_score": 0,
  "issues": [{"severity": "Critical | Major | Minor", "issue": "string", "suggestion": "string"}],
  "feedback_summary": "string"
}"#;

// ---------------------------------------------------------------------------
// System prompts
// ---------------------------------------------------------------------------

pub const PARSER_SYSTEM: &str = "You are an expert resume parser. \
Parse a resume written in Markdown into structured data.

RULES:
1. Extract all information accurately.
2. Preserve every skill, position, project, education entry and certification.
3. Do not add or change any information. Keep the original wording.
4. Record each position with its company, role, dates and highlight bullets.
5. List every technical and soft skill mentioned.";

pub const ANALYST_SYSTEM: &str = "You are an expert technical recruiter. \
Analyze a job posting and extract structured data.
Identify the core requirements, not just the nice-to-haves.
Look for hidden keywords that applicant tracking systems scan for.
If the posting text starts with 'Error retrieving', the posting could not be read: \
return empty strings and empty lists.";

pub const WRITER_SYSTEM: &str = "You are a senior resume writer. \
You receive a structured resume and a job analysis, and rewrite the resume to target the job.

CRITICAL RULES:
1. Only use skills, experience and facts from the original resume. Never invent anything.
2. You may rephrase existing content to match job keywords, but never add skills or experience.
3. Put the experience that matches the job requirements first.
4. Work job keywords naturally into existing content.
5. Use active voice and quantified achievements where the original provides numbers.
6. Avoid cliches such as \"orchestrated\", \"spearheaded\", \"leveraged\", \"synergy\", \"tapestry\".
7. Keep a professional, natural tone.
8. Keep chronological order and the original dates.
9. If the original lacks a required skill, do not add it. Highlight transferable skills instead.";

pub const REVIEWER_SYSTEM: &str = "You are a hiring manager reviewing a tailored resume \
against a job analysis.
Score how well the resume targets the job from 0 to 10.
Set needs_improvement to true only if concrete changes would clearly raise the score.
Give specific, actionable suggestions that only reorder, rephrase or emphasize content \
already in the resume. Never suggest adding skills or experience.
List the strongest aspects of the resume as strengths.";

pub const AUDITOR_SYSTEM: &str = "You are a strict compliance auditor. \
You receive the original resume, a newly generated resume and the job analysis. \
Make sure the new resume is honest, natural and well targeted.

1. FABRICATION CHECK (critical):
   - No skill in the new resume may be missing from the original.
   - No company, role or experience may be invented.
   - No dates or responsibilities may be exaggerated.
   - Every bullet must trace back to the original.
   Score hallucination_score from 0 (perfect) to 10 (severe fabrication).
2. LANGUAGE CHECK:
   - Flag overused phrases such as \"orchestrated\", \"spearheaded\", \"leveraged\", \"synergy\", \
\"tapestry\", and overuse of \"dynamic\" or \"innovative\".
   - Flag robotic or unnatural language.
   Score ai_cliche_score from 0 (natural) to 10 (very robotic).
3. RELEVANCE CHECK: job keywords are used naturally and the most relevant experience is prominent.
4. QUALITY CHECK: structure is clear and dates are consistent.

PASS CRITERIA (all must hold for passed = true):
- hallucination_score is 0 to 2
- ai_cliche_score is 0 to 3
- no unresolved Critical issue

Report every issue with a severity of Critical, Major or Minor and an actionable suggestion.";

/// A role's system prompt followed by its output schema.
pub fn with_schema(system: &str, schema: &str) -> String {
    format!("{system}\n\nRespond with a single JSON object of this shape and nothing else:\n{schema}")
}

pub fn parser_system() -> String {
    with_schema(PARSER_SYSTEM, RESUME_SCHEMA)
}

pub fn analyst_system() -> String {
    with_schema(ANALYST_SYSTEM, JOB_SCHEMA)
}

pub fn writer_system() -> String {
    with_schema(WRITER_SYSTEM, RESUME_SCHEMA)
}

pub fn reviewer_system() -> String {
    with_schema(REVIEWER_SYSTEM, REVIEW_SCHEMA)
}

pub fn auditor_system() -> String {
    with_schema(AUDITOR_SYSTEM, AUDIT_SCHEMA)
}

// ---------------------------------------------------------------------------
// User prompts
// ---------------------------------------------------------------------------

/// A request that can be phrased as a user message.
pub trait PromptRequest {
    fn render(&self) -> String;
}

/// Retrieved posting text handed to the analyst.
#[derive(Debug, Clone)]
pub struct JobContent {
    pub locator: String,
    pub content: String,
}

fn json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

const TRACEABILITY_RULES: &str = "CRITICAL RULES:
1. Only use skills and experience from the original resume. Do not add new skills.
2. Every statement must trace back to the original resume.
3. Avoid cliches and use natural language.
4. You may rephrase existing content but cannot add new information.
5. Keep all dates and facts accurate.";

impl PromptRequest for ParseRequest {
    fn render(&self) -> String {
        format!(
            "Parse this resume into structured data.\n\n---\n{}\n---",
            self.source_text
        )
    }
}

impl PromptRequest for JobContent {
    fn render(&self) -> String {
        format!(
            "Analyze the job posting retrieved from {} and extract structured job data.\n\n---\n{}\n---",
            self.locator, self.content
        )
    }
}

impl PromptRequest for GenerationRequest {
    fn render(&self) -> String {
        let job = json(self.target());
        let original = json(self.profile());

        match self {
            Self::Initial { .. } => format!(
                "Here is the job analysis:\n{job}\n\n\
                 Here is the original resume (structured):\n{original}\n\n\
                 Rewrite the resume to match the job analysis. Use only the information in the \
                 original resume. Rephrase and reorganize to highlight relevant experience, but do \
                 not add new skills or experience."
            ),
            Self::AuditRetry { feedback, .. } => {
                let issues = feedback
                    .issues
                    .iter()
                    .map(|i| format!("- [{}] {} -> {}", i.severity, i.issue, i.suggestion))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "The previous draft failed the audit. Here is the feedback:\n\n\
                     Audit feedback: {}\n\n\
                     Issues to fix:\n{issues}\n\n\
                     Here is the job analysis:\n{job}\n\n\
                     Here is the original resume (structured):\n{original}\n\n\
                     {TRACEABILITY_RULES}\n\n\
                     Rewrite the resume to match the job analysis while fixing every issue above.",
                    feedback.summary
                )
            }
            Self::Refine {
                current,
                suggestions,
                ..
            } => {
                let suggestions = suggestions
                    .iter()
                    .map(|s| format!("- {s}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "Improve this resume based on reviewer feedback.\n\n\
                     Current resume:\n{}\n\n\
                     Original resume:\n{original}\n\n\
                     Job analysis:\n{job}\n\n\
                     Improvements to make:\n{suggestions}\n\n\
                     {TRACEABILITY_RULES}\n\n\
                     Focus on highlighting relevant experience and using job keywords naturally.",
                    json(current)
                )
            }
        }
    }
}

impl PromptRequest for ReviewRequest {
    fn render(&self) -> String {
        format!(
            "Review this resume against the job requirements.\n\n\
             Resume:\n{}\n\n\
             Job analysis:\n{}\n\n\
             Assess its quality and suggest improvements if needed.",
            json(&self.draft),
            json(self.target.as_ref())
        )
    }
}

impl PromptRequest for AuditRequest {
    fn render(&self) -> String {
        format!(
            "ORIGINAL RESUME (structured):\n{}\n\n\
             NEW GENERATED RESUME (structured):\n{}\n\n\
             JOB REQUIREMENTS:\n{}\n\n\
             Compare the two resumes carefully. Make sure that:\n\
             1. No skill appears in the new resume that is not in the original.\n\
             2. No company or role was invented.\n\
             3. Every experience in the new resume traces back to the original.\n\
             4. The language is professional and does not sound machine-written.\n\
             5. The new resume targets the job using only original information.",
            json(self.profile.as_ref()),
            json(&self.draft),
            json(self.target.as_ref())
        )
    }
}
