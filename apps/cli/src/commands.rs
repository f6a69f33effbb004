//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use cvtailor_core::{
    JOB_POSTING_PLACEHOLDERS, PipelineOrchestrator, PipelineState, ProgressReporter,
    RESUME_PLACEHOLDERS, validate_input_file,
};
use cvtailor_shared::{
    AppConfig, CURRENT_SCHEMA_VERSION, LlmConfig, PipelineConfig, PipelineResult,
    RetrievalConfig, RunId, RunRecord, init_config, load_config, validate_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// cvtailor: tailor a résumé to a job posting, audited for fabrication.
#[derive(Parser)]
#[command(
    name = "cvtailor",
    version,
    about = "Tailor a résumé to a job posting without inventing anything.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Tailor a résumé to a job posting and emit the run record as JSON.
    Run {
        /// Résumé in Markdown.
        #[arg(long)]
        resume: PathBuf,

        /// Job posting URL or local file.
        #[arg(long)]
        job: String,

        /// Write the run record here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Chat model id (overrides config).
        #[arg(long)]
        model: Option<String>,

        /// Write cycles before giving up (overrides config).
        #[arg(long)]
        max_write_attempts: Option<u32>,

        /// Review rounds per write cycle (overrides config).
        #[arg(long)]
        max_review_iterations: Option<u32>,
    },

    /// Check the input files without calling any model.
    Validate {
        /// Résumé in Markdown.
        #[arg(long)]
        resume: PathBuf,

        /// Job posting URL or local file.
        #[arg(long)]
        job: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "cvtailor=info",
        1 => "cvtailor=debug",
        _ => "cvtailor=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries the run record.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            resume,
            job,
            out,
            model,
            max_write_attempts,
            max_review_iterations,
        } => {
            let overrides = Overrides {
                model,
                max_write_attempts,
                max_review_iterations,
            };
            cmd_run(&resume, &job, out.as_deref(), overrides).await
        }
        Command::Validate { resume, job } => cmd_validate(&resume, &job),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Flag values that take precedence over the config file.
#[derive(Debug, Default)]
struct Overrides {
    model: Option<String>,
    max_write_attempts: Option<u32>,
    max_review_iterations: Option<u32>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(n) = self.max_write_attempts {
            config.pipeline.max_write_attempts = n;
        }
        if let Some(n) = self.max_review_iterations {
            config.pipeline.max_review_iterations = n;
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// Validate both inputs and return the résumé text.
///
/// Remote postings are fetched later by the analyzer, so only local ones are
/// checked here.
fn check_inputs(resume: &Path, job: &str) -> Result<String> {
    let resume_text = validate_input_file(resume, "Resume", RESUME_PLACEHOLDERS)?;

    if cvtailor_retrieval::is_remote(job) {
        info!(job, "job posting is remote, skipping local validation");
    } else {
        validate_input_file(Path::new(job), "Job posting", JOB_POSTING_PLACEHOLDERS)?;
    }

    Ok(resume_text)
}

async fn cmd_run(resume: &Path, job: &str, out: Option<&Path>, overrides: Overrides) -> Result<()> {
    let started = Instant::now();
    let resume_text = check_inputs(resume, job)?;

    let mut config = load_config()?;
    overrides.apply(&mut config);
    validate_api_key(&config)?;

    let transformers = cvtailor_agents::build_transformers(
        &LlmConfig::from(&config),
        &RetrievalConfig::from(&config),
    )?;
    let orchestrator = PipelineOrchestrator::new(transformers, PipelineConfig::from(&config))?;

    info!(
        resume = %resume.display(),
        job,
        model = %config.llm.model,
        max_write_attempts = config.pipeline.max_write_attempts,
        "tailoring résumé"
    );

    let reporter = CliProgress::new();
    let outcome = orchestrator
        .run_with_progress(&resume_text, job, &reporter)
        .await;
    reporter.clear();
    let result = outcome?;

    print_summary(&result, started.elapsed());

    let record = RunRecord {
        schema_version: CURRENT_SCHEMA_VERSION,
        run_id: RunId::new(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: chrono::Utc::now(),
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        result,
    };
    let json = serde_json::to_string_pretty(&record)?;

    match out {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| eyre!("failed to write {}: {e}", path.display()))?;
            eprintln!("  Record: {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Human summary on stderr so stdout stays machine-readable.
fn print_summary(result: &PipelineResult, elapsed: Duration) {
    let report = &result.audit_report;
    let risk = |score: Option<u8>| score.map_or_else(|| "n/a".to_string(), |s| format!("{s}/10"));

    eprintln!();
    if result.passed {
        eprintln!("  Tailored résumé passed the audit.");
    } else {
        eprintln!("  Tailored résumé did NOT pass the audit.");
    }
    eprintln!("  Target:       {}", result.organization);
    eprintln!("  Cycles:       {}", result.write_cycles);
    eprintln!("  Fabrication:  {}", risk(report.fabrication_risk));
    eprintln!("  Language:     {}", risk(report.unnatural_language_risk));
    eprintln!("  Feedback:     {}", report.feedback_summary);
    for issue in &report.issues {
        eprintln!("    - [{}] {} -> {}", issue.severity, issue.issue, issue.suggestion);
    }
    eprintln!("  Time:         {:.1}s", elapsed.as_secs_f64());
    eprintln!();
}

fn cmd_validate(resume: &Path, job: &str) -> Result<()> {
    check_inputs(resume, job)?;
    println!("Inputs look good.");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .expect("valid spinner template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn state(&self, state: &PipelineState) {
        self.spinner.set_message(state.to_string());
    }

    fn done(&self, _result: &PipelineResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "cvtailor",
            "-vv",
            "run",
            "--resume",
            "resume.md",
            "--job",
            "https://jobs.example.com/42",
            "--max-write-attempts",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run {
                resume,
                job,
                out,
                max_write_attempts,
                max_review_iterations,
                ..
            } => {
                assert_eq!(resume, PathBuf::from("resume.md"));
                assert_eq!(job, "https://jobs.example.com/42");
                assert!(out.is_none());
                assert_eq!(max_write_attempts, Some(5));
                assert_eq!(max_review_iterations, None);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn run_requires_a_job() {
        assert!(Cli::try_parse_from(["cvtailor", "run", "--resume", "resume.md"]).is_err());
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let mut config = AppConfig::default();
        let review_default = config.pipeline.max_review_iterations;

        Overrides {
            model: Some("local/model".into()),
            max_write_attempts: Some(7),
            max_review_iterations: None,
        }
        .apply(&mut config);

        assert_eq!(config.llm.model, "local/model");
        assert_eq!(config.pipeline.max_write_attempts, 7);
        assert_eq!(config.pipeline.max_review_iterations, review_default);
    }

    #[test]
    fn remote_postings_skip_local_validation() {
        let dir = std::env::temp_dir().join(format!("cvtailor-cli-{}", RunId::new()));
        std::fs::create_dir_all(&dir).unwrap();
        let resume = dir.join("resume.md");
        std::fs::write(&resume, "# Grace Hopper\n\nCOBOL, compilers").unwrap();

        let text = check_inputs(&resume, "https://jobs.example.com/42").unwrap();
        assert!(text.contains("Grace Hopper"));
        assert!(check_inputs(&resume, &dir.join("missing.md").to_string_lossy()).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
