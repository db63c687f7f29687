//! CLI binary for paper2q.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig`, runs one extraction and prints the questions.

use anyhow::{bail, Context, Result};
use clap::Parser;
use paper2q::output::describe_estimate;
use paper2q::pipeline::input::mime_from_path;
use paper2q::{
    audit, download, estimate_processing_time, extract_document, parse_response, write_download,
    ApiKey, ExtractError, ExtractionConfig, ExtractionProgressCallback, GeminiBackend,
    ImageFidelity, MarksAudit, ModelBackend, ModelVariant, ProgressCallback, ProviderBackend,
    QuestionPaper, QuestionType, ReasoningEffort,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while the document is rasterised and the single model
/// request is in flight.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_rasterized(&self, page_count: usize, elapsed: Duration) {
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("{page_count} page(s) ready")),
            dim(&format!(
                "{:.1}s, estimated wait {}",
                elapsed.as_secs_f64(),
                describe_estimate(estimate_processing_time(page_count))
            )),
        ));
    }

    fn on_request_start(&self, model: &str, page_count: usize) {
        self.bar.set_prefix("Analysing");
        self.bar
            .set_message(format!("{page_count} page(s) with {model}…"));
    }

    fn on_request_complete(&self, elapsed: Duration, response_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Model replied  {}",
            green("✓"),
            dim(&format!(
                "{response_len} chars in {:.1}s",
                elapsed.as_secs_f64()
            )),
        );
    }

    fn on_request_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let msg = if error.chars().count() > 100 {
            format!("{}\u{2026}", error.chars().take(99).collect::<String>())
        } else {
            error.to_string()
        };
        eprintln!("{} {}", red("✗"), red(&msg));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a PDF question paper and print the questions
  paper2q paper.pdf

  # High fidelity, save the JSON download
  paper2q --fidelity high --dpi 300 paper.pdf -o extracted_questions.json

  # Scanned page as an image, older model
  paper2q --model gemini-2.5-flash page1.jpg

  # Print the validated JSON and the marks audit
  paper2q --json --audit paper.pdf > paper.json

  # Re-parse a saved model reply without calling the model
  paper2q --from-response reply.json

  # Any edgequake-llm vision provider instead of the Gemini REST API
  paper2q --provider openai --provider-model gpt-4.1 paper.pdf

MODELS:
  gemini-3-flash-preview (default)   reasoning effort low / medium / high
  gemini-2.5-flash                   no reasoning effort (flag ignored)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY     API key for the Gemini REST backend
  PDFIUM_LIB_PATH    Path to libpdfium (file or directory)
  RUST_LOG           Log filter, overrides -v / -q
"#;

/// Extract exam questions from PDFs and images into structured JSON.
#[derive(Parser, Debug)]
#[command(
    name = "paper2q",
    version,
    about = "Extract exam questions from PDFs and images into structured JSON",
    long_about = "Rasterise a question paper (PDF, PNG or JPEG), send every page in one \
request to a multimodal model together with an extraction policy and a JSON schema, \
and validate the reply into question number, type, LaTeX text, marks, choice \
instructions, diagram descriptions and sub-part breakdowns.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Question paper: PDF, PNG or JPEG. Omit with --from-response.
    #[arg(required_unless_present = "from_response")]
    input: Option<PathBuf>,

    /// Media type of the input; inferred from the extension when omitted.
    #[arg(long)]
    mime: Option<String>,

    /// Model variant.
    #[arg(long, env = "PAPER2Q_MODEL", value_enum, default_value = "gemini-3-flash-preview")]
    model: ModelArg,

    /// Reasoning effort (ignored by models without support).
    #[arg(long, env = "PAPER2Q_REASONING", value_enum, default_value = "medium")]
    reasoning: EffortArg,

    /// Image fidelity sent to the model.
    #[arg(long, env = "PAPER2Q_FIDELITY", value_enum, default_value = "medium")]
    fidelity: FidelityArg,

    /// PDF rendering DPI (72–600).
    #[arg(long, env = "PAPER2Q_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAPER2Q_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PAPER2Q_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Model request timeout in seconds.
    #[arg(long, env = "PAPER2Q_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PAPER2Q_TEMPERATURE", default_value_t = 1.0)]
    temperature: f32,

    /// Cap on output tokens.
    #[arg(long, env = "PAPER2Q_MAX_OUTPUT_TOKENS")]
    max_output_tokens: Option<u32>,

    /// Write the JSON download to this file (or directory).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the validated JSON on stdout instead of the question listing.
    #[arg(long)]
    json: bool,

    /// Print the marks audit.
    #[arg(long)]
    audit: bool,

    /// Parse a saved model reply instead of calling the model.
    #[arg(long, conflicts_with_all = ["input", "provider"])]
    from_response: Option<PathBuf>,

    /// Use an edgequake-llm provider (openai, anthropic, gemini, ollama, …).
    #[arg(long, requires = "provider_model")]
    provider: Option<String>,

    /// Model id for --provider.
    #[arg(long, requires = "provider")]
    provider_model: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPER2Q_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "PAPER2Q_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModelArg {
    #[value(name = "gemini-3-flash-preview")]
    Gemini3FlashPreview,
    #[value(name = "gemini-2.5-flash")]
    Gemini25Flash,
}

impl From<ModelArg> for ModelVariant {
    fn from(v: ModelArg) -> Self {
        match v {
            ModelArg::Gemini3FlashPreview => ModelVariant::Gemini3FlashPreview,
            ModelArg::Gemini25Flash => ModelVariant::Gemini25Flash,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EffortArg {
    Low,
    Medium,
    High,
}

impl From<EffortArg> for ReasoningEffort {
    fn from(v: EffortArg) -> Self {
        match v {
            EffortArg::Low => ReasoningEffort::Low,
            EffortArg::Medium => ReasoningEffort::Medium,
            EffortArg::High => ReasoningEffort::High,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FidelityArg {
    Low,
    Medium,
    High,
}

impl From<FidelityArg> for ImageFidelity {
    fn from(v: FidelityArg) -> Self {
        match v {
            FidelityArg::Low => ImageFidelity::Low,
            FidelityArg::Medium => ImageFidelity::Medium,
            FidelityArg::High => ImageFidelity::High,
        }
    }
}

/// Default log filter when `RUST_LOG` is unset. Without `-v` the spinner
/// (or nothing, under `-q`) replaces INFO output.
fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "error"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers INFO-level feedback; only -v brings the logs back.
    let show_progress = !cli.quiet && !cli.verbose;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose))),
        )
        .with_writer(io::stderr)
        .init();

    // ── Saved-reply mode ─────────────────────────────────────────────────
    if let Some(ref path) = cli.from_response {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read saved reply {:?}", path))?;
        let paper = parse_response(&raw)
            .map_err(report_parse_failure)
            .context("Saved reply is not a valid question paper")?;
        let audit = audit(&paper);
        return emit(&cli, &paper, &audit).await;
    }

    // ── Read input ───────────────────────────────────────────────────────
    let Some(ref input) = cli.input else {
        bail!("No input file given");
    };
    let mime = match cli.mime.as_deref() {
        Some(m) => m.to_string(),
        None => mime_from_path(input)
            .with_context(|| {
                format!(
                    "Cannot infer the media type of {:?}; pass --mime",
                    input
                )
            })?
            .to_string(),
    };
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {:?}", input))?;

    // ── Build config and backend ─────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> =
        spinner.clone().map(|s| s as Arc<dyn ExtractionProgressCallback>);
    let config = build_config(&cli, progress_cb).await?;
    let backend = build_backend(&cli)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let result = extract_document(bytes, &mime, &config, backend.as_ref()).await;
    if result.is_err() {
        // Rasterisation failures fire no callback; the spinner would stay drawn.
        if let Some(ref s) = spinner {
            s.bar.finish_and_clear();
        }
    }
    let output = result
        .map_err(report_parse_failure)
        .context("Extraction failed")?;

    if !cli.quiet {
        let tokens = match (output.stats.input_tokens, output.stats.output_tokens) {
            (Some(i), Some(o)) => format!("{i} tokens in  /  {o} tokens out  —  "),
            _ => String::new(),
        };
        eprintln!(
            "{} {} questions from {} page(s)  {}",
            green("✔"),
            bold(&output.stats.question_count.to_string()),
            output.stats.page_count,
            dim(&format!("{tokens}{}ms total", output.stats.total_ms)),
        );
    }

    emit(&cli, &output.paper, &output.audit).await
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .model(cli.model.into())
        .reasoning_effort(cli.reasoning.into())
        .image_fidelity(cli.fidelity.into())
        .temperature(cli.temperature)
        .api_timeout_secs(cli.timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(n) = cli.max_output_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn build_backend(cli: &Cli) -> Result<Box<dyn ModelBackend>> {
    if let (Some(provider), Some(model)) = (&cli.provider, &cli.provider_model) {
        let backend = ProviderBackend::from_name(provider, model)
            .context("Failed to configure provider")?;
        return Ok(Box::new(backend));
    }

    let key = match cli.api_key.as_deref() {
        Some(k) => ApiKey::new(k),
        None => ApiKey::from_env(),
    }
    .context("A Gemini API key is required (set GEMINI_API_KEY or pass --api-key)")?;
    let backend = GeminiBackend::new(key, Duration::from_secs(cli.timeout))
        .context("Failed to build HTTP client")?;
    Ok(Box::new(backend))
}

/// Show the raw reply of a parse failure before it is wrapped by anyhow.
fn report_parse_failure(e: ExtractError) -> ExtractError {
    if let Some(raw) = e.raw_response() {
        eprintln!("{}", yellow("Raw model response:"));
        eprintln!("{raw}");
    }
    e
}

/// Print, and optionally save, an extracted paper.
async fn emit(cli: &Cli, paper: &QuestionPaper, audit: &MarksAudit) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            paper.to_json_pretty().context("Failed to serialise paper")?
        );
    } else {
        print_paper(paper);
    }

    if cli.audit {
        print_audit(audit);
    } else if !cli.quiet {
        for w in &audit.warnings {
            eprintln!("{} {}", yellow("⚠"), w);
        }
    }

    if let Some(ref path) = cli.output {
        let file = download(paper).context("Failed to prepare download")?;
        let written = write_download(&file, path)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!("{} saved  →  {}", green("✔"), bold(&written.display().to_string()));
        }
    }
    Ok(())
}

fn fmt_marks(m: f64) -> String {
    if m.fract() == 0.0 {
        format!("{}", m as i64)
    } else {
        format!("{m}")
    }
}

fn print_paper(paper: &QuestionPaper) {
    println!(
        "{}",
        bold(&format!(
            "Total maximum marks: {}",
            fmt_marks(paper.total_max_marks)
        ))
    );
    println!("{}", dim(&"─".repeat(60)));

    for q in &paper.questions {
        let kind = match q.question_type {
            QuestionType::Mcq => cyan(q.question_type.as_str()),
            QuestionType::Subjective => green(q.question_type.as_str()),
        };
        println!(
            "{}  [{}]  {}",
            bold(&format!("Question {}", q.question_number)),
            kind,
            dim(&format!("{} marks", fmt_marks(q.marks))),
        );
        if q.is_choice_question {
            println!("  {} {}", yellow("Choice:"), q.choice_instruction);
        }
        for line in q.question_text.lines() {
            println!("  {line}");
        }
        if q.has_diagram() {
            println!("  {} {}", cyan("Diagram:"), q.diagram_description);
        }
        if q.has_sub_parts() {
            println!("  {} {}", dim("Sub-parts:"), q.sub_parts_mapping);
        }
        println!("{}", dim(&"─".repeat(60)));
    }
}

fn print_audit(a: &MarksAudit) {
    eprintln!("{}", bold("Marks audit"));
    eprintln!("  declared total     {}", fmt_marks(a.declared_total));
    eprintln!("  sum of all marks   {}", fmt_marks(a.marks_sum));
    eprintln!("  non-choice marks   {}", fmt_marks(a.mandatory_sum));
    eprintln!("  choice questions   {}", a.choice_questions);
    eprintln!(
        "  totals match       {}",
        if a.totals_match { green("yes") } else { yellow("no (approximate with choice)") }
    );
    if a.warnings.is_empty() {
        eprintln!("  {} no warnings", green("✓"));
    }
    for w in &a.warnings {
        eprintln!("  {} {}", yellow("⚠"), w);
    }
}
