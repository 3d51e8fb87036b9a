//! CLI binary for r42-copilot.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, drives the analysis entry points, and renders
//! insights and profile state for the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use r42_copilot::{
    analyze_files, extract_file, ingest_file, reanalyze_report, AnalysisConfig, CopilotError,
    ExtractionStrategy, Insights, MetricStatus, ProfileStore, TrendDirection, UserProfile,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a report without touching the profile store
  r42 analyze labs.pdf --platform "Jona Health"

  # Analyze several reports in one combined call
  r42 analyze q1.pdf q2.pdf q3.pdf --platform Iollo

  # Ingest into the profile store (extract, record, analyze, attach)
  r42 ingest neuroage-2025.pdf --platform NeuroAge

  # What would the model see? (no API key needed)
  r42 extract labs.pdf

  # Create or update the profile
  r42 profile --first-name Ada --email ada@example.com

  # List stored reports, newest first
  r42 reports --platform NeuroAge

  # Re-run analysis for a stored report
  r42 reanalyze 6f9cbb0e-…

  # Structured output for scripting
  r42 analyze labs.pdf --platform Iollo --json

SUPPORTED PROVIDERS & MODELS:
  Provider   Default model      Key variable
  ─────────  ─────────────────  ──────────────
  gemini     gemini-1.5-flash   GEMINI_API_KEY
  openai     gpt-4o-mini        OPENAI_API_KEY

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   Google Gemini API key (checked first)
  OPENAI_API_KEY   OpenAI API key
  R42_PROVIDER     Override provider (gemini, openai)
  R42_MODEL        Override model ID

SETUP:
  1. Set an API key:   export GEMINI_API_KEY=...
  2. Analyze:          r42 analyze report.pdf --platform "Jona Health"
"#;

/// Analyze longevity and biomarker PDF reports with LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "r42",
    version,
    about = "Analyze longevity and biomarker PDF reports with LLMs",
    long_about = "Upload PDF health reports from partner diagnostic platforms (NeuroAge, \
Jona Health, Iollo, Function Health, TokuEyes), extract their text, and turn them into \
normalized summaries, key metrics, recommendations, and risk factors.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM provider: gemini or openai. Auto-detected from API keys if unset.
    #[arg(long, global = true, env = "R42_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-1.5-flash, gpt-4o-mini).
    #[arg(long, global = true, env = "R42_MODEL")]
    model: Option<String>,

    /// Extraction strategy: heuristic or structured.
    #[arg(long, global = true, env = "R42_STRATEGY", value_enum, default_value = "heuristic")]
    strategy: StrategyArg,

    /// Per-LLM-call timeout in seconds.
    #[arg(long, global = true, env = "R42_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Output structured JSON instead of formatted text.
    #[arg(long, global = true)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "R42_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "R42_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one or more reports (several files share one combined call).
    Analyze {
        /// PDF report file(s).
        files: Vec<PathBuf>,

        /// Partner platform tag, e.g. "NeuroAge", "Jona Health".
        #[arg(short, long)]
        platform: String,
    },

    /// Ingest a report into the profile store and analyze it.
    Ingest {
        /// PDF report file.
        file: PathBuf,

        /// Partner platform tag.
        #[arg(short, long)]
        platform: String,
    },

    /// Extract report text only — no API key needed.
    Extract {
        /// PDF report file.
        file: PathBuf,
    },

    /// Show or update the user profile.
    Profile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        age: Option<String>,
        #[arg(long)]
        sex: Option<String>,
        /// Height, either total inches ("71") or formatted ("5'11\"").
        #[arg(long)]
        height: Option<String>,
        #[arg(long)]
        weight: Option<String>,
        #[arg(long)]
        goals: Option<String>,
        #[arg(long)]
        supplements: Option<String>,
        /// Opt in or out of research data sharing.
        #[arg(long)]
        research_consent: Option<bool>,
    },

    /// List stored reports, newest first.
    Reports {
        /// Only reports from this platform.
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Re-run analysis for a stored report using its saved text.
    Reanalyze {
        /// Report id (see `r42 reports`).
        report_id: String,
    },

    /// Delete the profile and all stored reports.
    Clear {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Print a randomized demo report (chart fixtures, no analysis).
    #[cfg(feature = "demo")]
    Demo {
        /// Fixture category: cognitive or metabolic.
        #[arg(value_enum)]
        category: DemoCategory,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Heuristic,
    Structured,
}

impl From<StrategyArg> for ExtractionStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Heuristic => ExtractionStrategy::Heuristic,
            StrategyArg::Structured => ExtractionStrategy::Structured,
        }
    }
}

#[cfg(feature = "demo")]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DemoCategory {
    Cognitive,
    Metabolic,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(copilot) = e.downcast_ref::<CopilotError>() {
                eprintln!("{} {}", red("✗"), bold(copilot.user_message()));
                eprintln!("{}", dim(&copilot.to_string()));
                std::process::exit(1);
            }
            Err(e)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let show_progress = !cli.quiet && !cli.json;

    match cli.command {
        Command::Analyze { ref files, ref platform } => {
            if files.is_empty() {
                anyhow::bail!("no input files; pass at least one PDF");
            }
            let spinner = progress_spinner(show_progress, "Analyzing report…");
            let insights = analyze_files(files, platform, &config).await?;
            finish(spinner);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                print_insights(&insights);
            }
        }

        Command::Ingest { ref file, ref platform } => {
            let mut store = open_store()?;
            ensure_profile(&mut store);

            let spinner = progress_spinner(show_progress, "Ingesting report…");
            let record = ingest_file(&mut store, file, platform, &config).await?;
            finish(spinner);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!(
                    "{} Stored report {} ({} / {})",
                    green("✔"),
                    bold(&record.id),
                    record.filename,
                    record.platform
                );
                if let Some(ref insights) = record.insights {
                    print_insights(insights);
                }
            }
        }

        Command::Extract { ref file } => {
            let text = extract_file(file, &config).await?;
            if cli.json {
                println!("{}", serde_json::json!({ "chars": text.len(), "text": text }));
            } else {
                println!("{text}");
                eprintln!("{}", dim(&format!("{} characters extracted", text.len())));
            }
        }

        Command::Profile {
            first_name,
            last_name,
            email,
            age,
            sex,
            height,
            weight,
            goals,
            supplements,
            research_consent,
        } => {
            let mut store = open_store()?;
            let mut profile = store.get().cloned().unwrap_or_default();

            let mut changed = false;
            let mut apply = |target: &mut String, value: Option<String>| {
                if let Some(v) = value {
                    *target = v;
                    changed = true;
                }
            };
            apply(&mut profile.first_name, first_name);
            apply(&mut profile.last_name, last_name);
            apply(&mut profile.email, email);
            apply(&mut profile.age, age);
            apply(&mut profile.sex, sex);
            apply(&mut profile.height, height);
            apply(&mut profile.weight, weight);
            apply(&mut profile.health_goals, goals);
            apply(&mut profile.current_supplements, supplements);
            if let Some(consent) = research_consent {
                profile.research_consent = consent;
                changed = true;
            }

            if changed {
                store.set(profile.clone());
            }

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                print_profile(&profile);
            }
        }

        Command::Reports { ref platform } => {
            let mut store = open_store()?;
            let Some(profile) = store.get() else {
                println!("No profile yet. Run {} first.", bold("r42 profile"));
                return Ok(());
            };

            let mut reports: Vec<_> = match platform {
                Some(p) => profile.reports_for_platform(p),
                None => profile.reports.iter().collect(),
            };
            reports.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
                return Ok(());
            }

            if reports.is_empty() {
                println!("No reports stored.");
                return Ok(());
            }
            for report in reports {
                let insight_mark = if report.insights.is_some() {
                    green("✓ analyzed")
                } else {
                    yellow("… pending")
                };
                println!(
                    "{}  {}  {:<12} {}  {}",
                    dim(&report.uploaded_at.format("%Y-%m-%d %H:%M").to_string()),
                    bold(&report.id),
                    report.platform,
                    report.filename,
                    insight_mark,
                );
            }
        }

        Command::Reanalyze { ref report_id } => {
            let mut store = open_store()?;
            let spinner = progress_spinner(show_progress, "Re-analyzing report…");
            let insights = reanalyze_report(&mut store, report_id, &config).await?;
            finish(spinner);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                print_insights(&insights);
            }
        }

        Command::Clear { yes } => {
            if !yes {
                println!(
                    "This deletes the profile and all stored reports. Re-run with {}.",
                    bold("--yes")
                );
                return Ok(());
            }
            let mut store = open_store()?;
            store.clear();
            println!("{} Profile and reports cleared", green("✔"));
        }

        #[cfg(feature = "demo")]
        Command::Demo { category } => {
            let json = match category {
                DemoCategory::Cognitive => {
                    serde_json::to_string_pretty(&r42_copilot::demo::cognitive_report("demo.pdf"))?
                }
                DemoCategory::Metabolic => {
                    serde_json::to_string_pretty(&r42_copilot::demo::metabolic_report("demo.pdf"))?
                }
            };
            println!("{json}");
        }
    }

    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .strategy(cli.strategy.into())
        .api_timeout_secs(cli.api_timeout);
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    builder.build().context("Invalid configuration")
}

fn open_store() -> Result<ProfileStore> {
    ProfileStore::open_default().context("Failed to open the profile store")
}

/// Ingesting without an onboarded profile should still work; an empty
/// profile is created on the fly and can be filled in later.
fn ensure_profile(store: &mut ProfileStore) {
    if store.get().is_none() {
        store.set(UserProfile::default());
    }
}

fn progress_spinner(show: bool, message: &str) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

fn finish(spinner: Option<ProgressBar>) {
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

fn status_glyph(status: MetricStatus) -> String {
    match status {
        MetricStatus::Normal => green("●"),
        MetricStatus::Elevated => yellow("▲"),
        MetricStatus::Low => yellow("▼"),
        MetricStatus::Critical => red("◆"),
    }
}

fn direction_glyph(direction: TrendDirection) -> String {
    match direction {
        TrendDirection::Improving => green("↗"),
        TrendDirection::Declining => red("↘"),
        TrendDirection::Stable => dim("→"),
    }
}

fn print_insights(insights: &Insights) {
    println!();
    println!("{} {}", cyan("◆"), bold("Summary"));
    println!("  {}", insights.summary);

    if !insights.key_metrics.is_empty() {
        println!();
        println!("{} {}", cyan("◆"), bold("Key Metrics"));
        for metric in &insights.key_metrics {
            let range = metric
                .reference_range
                .as_deref()
                .map(|r| dim(&format!("  [{r}]")))
                .unwrap_or_default();
            println!(
                "  {} {} {}  {}{}",
                status_glyph(metric.status),
                bold(&metric.name),
                metric.value,
                dim(&metric.description),
                range,
            );
        }
    }

    println!();
    println!("{} {}", cyan("◆"), bold("Recommendations"));
    for recommendation in &insights.recommendations {
        println!("  {} {}", green("→"), recommendation);
    }

    println!();
    println!("{} {}", cyan("◆"), bold("Risk Factors"));
    for risk in &insights.risk_factors {
        println!("  {} {}", yellow("!"), risk);
    }

    if !insights.trends.is_empty() {
        println!();
        println!("{} {}", cyan("◆"), bold("Trends"));
        for trend in &insights.trends {
            println!(
                "  {} {}  {} {}",
                direction_glyph(trend.direction),
                bold(&trend.metric),
                trend.change,
                dim(&format!("({})", trend.period)),
            );
        }
    }
    println!();
    let _ = io::stdout().flush();
}

fn print_profile(profile: &UserProfile) {
    println!("{} {}", cyan("◆"), bold(&profile.full_name()));
    if !profile.email.is_empty() {
        println!("  Email:        {}", profile.email);
    }
    if !profile.age.is_empty() {
        println!("  Age:          {}", profile.age);
    }
    if !profile.sex.is_empty() {
        println!("  Sex:          {}", profile.sex);
    }
    if !profile.height.is_empty() {
        println!("  Height:       {}", profile.height);
    }
    if !profile.weight.is_empty() {
        println!("  Weight:       {}", profile.weight);
    }
    if !profile.health_goals.is_empty() {
        println!("  Goals:        {}", profile.health_goals);
    }
    if !profile.current_supplements.is_empty() {
        println!("  Supplements:  {}", profile.current_supplements);
    }
    println!(
        "  Research:     {}",
        if profile.research_consent {
            "consented"
        } else {
            "not consented"
        }
    );
    println!(
        "  Reports:      {} stored{}",
        profile.report_count(),
        profile
            .latest_report()
            .map(|r| format!(", latest {} ({})", r.filename, r.uploaded_at.format("%Y-%m-%d")))
            .unwrap_or_default(),
    );
}
