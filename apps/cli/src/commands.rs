//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use formscribe_core::{
    AssistOptions, AssistProgress, AssistReport, Distributor, append_transcript, assist,
};
use formscribe_generation::ContentRequester;
use formscribe_page::{FieldLocator, Page};
use formscribe_shared::{
    AppConfig, FieldName, FormscribeError, GenerationRequest, GenerationResult, PlatformId,
    ResponseFormat, SectionKey, StyleOption, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// formscribe: AI-assisted content for Jira and Clarity forms.
#[derive(Parser)]
#[command(
    name = "formscribe",
    version,
    about = "Generate acceptance criteria, test cases and more, and write them into issue form fields.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.formscribe/formscribe.toml.
    #[arg(long, global = true, env = "FORMSCRIBE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Page and platform shared by page commands.
#[derive(clap::Args, Debug)]
pub(crate) struct PageArgs {
    /// HTML page to operate on.
    #[arg(long)]
    pub page: PathBuf,

    /// Platform whose field table applies: jira or clarity.
    #[arg(long, default_value = "jira")]
    pub platform: PlatformId,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate content from a source text and print it.
    Generate {
        /// Source text.
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// Read the source text from a file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Writing style: standard, concise, detailed, or creative.
        #[arg(long, default_value = "standard")]
        style: String,

        /// Response format: json or text (defaults to the configured format).
        #[arg(long)]
        format: Option<ResponseFormat>,

        /// Print a readable preview instead of the raw result.
        #[arg(long)]
        preview: bool,
    },

    /// Write previously generated content into a page.
    Apply {
        #[command(flatten)]
        target: PageArgs,

        /// Content file: a JSON object of sections, or `## Title` text.
        #[arg(long)]
        content: PathBuf,

        /// Only apply these sections (comma-separated, e.g. testCases,estimation).
        #[arg(long, value_delimiter = ',')]
        only: Vec<SectionKey>,

        /// Write the updated page here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Read the source field, generate, and apply in one go.
    Assist {
        #[command(flatten)]
        target: PageArgs,

        /// Field holding the source text.
        #[arg(long, default_value = "DESCRIPTION")]
        source: FieldName,

        /// Writing style: standard, concise, detailed, or creative.
        #[arg(long, default_value = "standard")]
        style: String,

        /// Response format: json or text (defaults to the configured format).
        #[arg(long)]
        format: Option<ResponseFormat>,

        /// Only apply these sections (comma-separated).
        #[arg(long, value_delimiter = ',')]
        only: Vec<SectionKey>,

        /// Write the updated page here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Resolve a field and describe the element found.
    Locate {
        #[command(flatten)]
        target: PageArgs,

        /// Field name (e.g. ACCEPTANCE_CRITERIA) or platform field id.
        field: String,
    },

    /// Append a dictated transcript to a field.
    Dictate {
        #[command(flatten)]
        target: PageArgs,

        /// Field receiving the transcript.
        #[arg(long, default_value = "DESCRIPTION")]
        field: FieldName,

        /// Transcript text.
        transcript: String,

        /// Write the updated page here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
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
    /// Show resolved configuration, including the merged field tables.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so page output
/// on stdout stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "formscribe=info",
        1 => "formscribe=debug",
        _ => "formscribe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    let config_path = cli.config;
    match cli.command {
        Command::Generate {
            text,
            file,
            style,
            format,
            preview,
        } => {
            let config = app_config(config_path.as_deref())?;
            cmd_generate(&config, text, file.as_deref(), &style, format, preview).await
        }
        Command::Apply {
            target,
            content,
            only,
            out,
        } => {
            let config = app_config(config_path.as_deref())?;
            cmd_apply(&config, &target, &content, &only, out.as_deref())
        }
        Command::Assist {
            target,
            source,
            style,
            format,
            only,
            out,
        } => {
            let config = app_config(config_path.as_deref())?;
            let options = AssistOptions {
                source,
                style: StyleOption::from_name(&style),
                format: format.unwrap_or(config.api.expected_format),
                sections: (!only.is_empty()).then(|| only.into_iter().collect()),
            };
            cmd_assist(&config, &target, &options, out.as_deref()).await
        }
        Command::Locate { target, field } => {
            let config = app_config(config_path.as_deref())?;
            cmd_locate(&config, &target, &field)
        }
        Command::Dictate {
            target,
            field,
            transcript,
            out,
        } => {
            let config = app_config(config_path.as_deref())?;
            cmd_dictate(&config, &target, field, &transcript, out.as_deref())
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn locator_for(config: &AppConfig, platform: PlatformId) -> Result<FieldLocator> {
    let registry = config.registry()?;
    let table = registry
        .get(platform)
        .cloned()
        .ok_or_else(|| eyre!("no field table for platform {platform}"))?;
    Ok(FieldLocator::new(Arc::new(table)))
}

fn read_file(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path).map_err(|e| FormscribeError::io(path, e))?)
}

fn load_page(path: &Path) -> Result<Page> {
    let html = read_file(path)?;
    Ok(Page::parse(&html))
}

fn emit_page(page: &Page, out: Option<&Path>) -> Result<()> {
    let html = page.to_html();
    match out {
        Some(path) => {
            std::fs::write(path, html).map_err(|e| FormscribeError::io(path, e))?;
            info!(path = %path.display(), "page written");
        }
        None => print!("{html}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(
    config: &AppConfig,
    text: Option<String>,
    file: Option<&Path>,
    style: &str,
    format: Option<ResponseFormat>,
    preview: bool,
) -> Result<()> {
    let source = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => read_file(path)?,
        (None, None) => return Err(eyre!("provide --text or --file")),
    };
    if source.trim().is_empty() {
        return Err(FormscribeError::EmptySource {
            field: "source text".into(),
        }
        .into());
    }

    let request = GenerationRequest::new(source)
        .with_style(StyleOption::from_name(style))
        .with_format(format.unwrap_or(config.api.expected_format));
    info!(id = %request.id, style = %request.style, "generating");

    let requester = ContentRequester::new(config.api.clone())?;
    let spinner = spinner("Generating content");
    let result = requester.request(&request).await;
    spinner.finish_and_clear();
    let result = result?;

    if preview {
        println!("{}", result.preview());
    } else {
        println!("{}", result.to_editable());
    }
    Ok(())
}

fn cmd_apply(
    config: &AppConfig,
    target: &PageArgs,
    content: &Path,
    only: &[SectionKey],
    out: Option<&Path>,
) -> Result<()> {
    let mut result = GenerationResult::from_edited(&read_file(content)?);
    if !only.is_empty() {
        result.restrict_to(&only.iter().copied().collect());
    }

    let distributor = Distributor::new(locator_for(config, target.platform)?);
    let mut page = load_page(&target.page)?;
    let outcome = distributor.distribute(&mut page, &result);

    emit_page(&page, out)?;
    eprintln!("{}", outcome.summary());
    Ok(())
}

async fn cmd_assist(
    config: &AppConfig,
    target: &PageArgs,
    options: &AssistOptions,
    out: Option<&Path>,
) -> Result<()> {
    let distributor = Distributor::new(locator_for(config, target.platform)?);
    let requester = ContentRequester::new(config.api.clone())?;
    let mut page = load_page(&target.page)?;

    let progress = CliProgress::new();
    let report = assist(&mut page, &distributor, &requester, options, &progress).await;
    progress.spinner.finish_and_clear();
    let report = report?;

    emit_page(&page, out)?;
    eprintln!();
    eprintln!("{}", report.result.preview());
    eprintln!();
    eprintln!("  {}", report.outcome.summary());
    for field in report.outcome.fields() {
        eprintln!("    - {}", field.humanized());
    }
    eprintln!("  Time: {:.1}s", report.elapsed.as_secs_f64());
    Ok(())
}

fn cmd_locate(config: &AppConfig, target: &PageArgs, field: &str) -> Result<()> {
    let locator = locator_for(config, target.platform)?;
    let page = load_page(&target.page)?;
    match locator.locate(&page, field) {
        Some(el) => println!("{field}: {}", page.describe(el)),
        None => println!("{field}: not found"),
    }
    Ok(())
}

fn cmd_dictate(
    config: &AppConfig,
    target: &PageArgs,
    field: FieldName,
    transcript: &str,
    out: Option<&Path>,
) -> Result<()> {
    let locator = locator_for(config, target.platform)?;
    let mut page = load_page(&target.page)?;
    let el = locator
        .locate_field(&page, field)
        .ok_or_else(|| eyre!("field {field} not found on page"))?;

    if !append_transcript(&mut page, el, transcript) {
        return Err(eyre!("transcript was not written to {field}"));
    }
    emit_page(&page, out)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let mut config = app_config(path)?;
    config.platforms = config
        .registry()?
        .iter()
        .map(|(id, table)| (id, table.clone()))
        .collect();
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message.to_string());
    spinner
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: spinner("Starting"),
        }
    }
}

impl AssistProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn generated(&self, result: &GenerationResult) {
        let kind = if result.is_structured() { "sections" } else { "text" };
        self.spinner.set_message(format!("Received {kind}"));
    }

    fn done(&self, _report: &AssistReport) {
        self.spinner.finish_and_clear();
    }
}
