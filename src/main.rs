//! doctr - CLI entry point.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use tracing_subscriber::EnvFilter;

use doctr::config::{self, Config, OutputFormat, PROJECT_CONFIG_FILE, create_default_config};
use doctr::diff::{collect_diff_text, open_repository, read_diff_input};
use doctr::docs::{DraftOptions, GenerateOptions, GenerateOutcome, generate_change_docs};
use doctr::error::ConfigError;
use doctr::llm::{CompletionClient, Enhancement, HttpCompletionClient, UnavailableReason, client_for};
use doctr::wiki::{generate_wiki, scan_project, write_wiki};

/// Generate documentation from git diffs, optionally enhanced by an LLM.
#[derive(Parser, Debug)]
#[command(name = "doctr")]
#[command(about = "Generate documentation from git diffs, optionally enhanced by an LLM")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Document the changes of a diff target.
    #[command(alias = "generate-docs")]
    Generate(GenerateArgs),
    /// Generate a multi-page wiki for the whole project.
    Wiki(WikiArgs),
    /// Write a commented default .doctr.toml.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct AiArgs {
    /// Force AI enhancement on
    #[arg(long, overrides_with = "no_ai")]
    ai: bool,

    /// Disable AI enhancement
    #[arg(long = "no-ai", overrides_with = "ai")]
    no_ai: bool,

    /// Model name (overrides default_model)
    #[arg(short, long)]
    model: Option<String>,
}

impl AiArgs {
    fn use_ai(&self, config: &Config) -> bool {
        if self.no_ai {
            false
        } else {
            self.ai || config.use_ai
        }
    }

    fn model<'a>(&'a self, config: &'a Config) -> &'a str {
        self.model.as_deref().unwrap_or(&config.default_model)
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Repository path
    #[arg(default_value = ".")]
    repo: PathBuf,

    /// Output directory (overrides output_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Diff target: a revision or range such as HEAD~1 or main..feature
    #[arg(short = 'd', long = "diff-target")]
    diff_target: Option<String>,

    /// Read unified diff text from a file instead of git ("-" for stdin)
    #[arg(long, conflicts_with = "diff_target")]
    diff_file: Option<PathBuf>,

    #[command(flatten)]
    ai: AiArgs,

    /// Output format (overrides output_format)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Print the document instead of writing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct WikiArgs {
    /// Project path
    #[arg(default_value = ".")]
    repo: PathBuf,

    /// Output directory; pages go to <DIR>/wiki
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    ai: AiArgs,
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Repository path
    #[arg(default_value = ".")]
    repo: PathBuf,

    /// Overwrite an existing .doctr.toml
    #[arg(long)]
    force: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Markdown,
    Mdx,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Mdx => OutputFormat::Mdx,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate(args) => run_generate(args).await,
        Commands::Wiki(args) => run_wiki(args).await,
        Commands::Init(args) => run_init(args),
    }
}

/// Log to stderr; `RUST_LOG` wins over the default level.
fn init_logging(verbose: bool) {
    let default = if verbose { "doctr=debug" } else { "doctr=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Where `generate` reads its diff from.
enum DiffSource {
    Git(git2::Repository),
    File(PathBuf),
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    // A diff file does not need a repository; the path only locates config.
    let source = match &args.diff_file {
        Some(path) => DiffSource::File(path.clone()),
        None => DiffSource::Git(open_repository(&args.repo).context("Not a git repository")?),
    };
    let root = match &source {
        DiffSource::Git(repo) => repo
            .workdir()
            .map(Path::to_path_buf)
            .context("Bare repositories are not supported")?,
        DiffSource::File(_) => args.repo.clone(),
    };

    let config = config::load_config(&root).context("Failed to load configuration")?;

    let (diff_text, target) = match &source {
        DiffSource::Git(repo) => {
            let target = args
                .diff_target
                .clone()
                .unwrap_or_else(|| config.default_diff_target.clone());
            let text = collect_diff_text(repo, &target)
                .with_context(|| format!("Failed to collect diff for {}", target))?;
            (text, target)
        }
        DiffSource::File(path) => {
            let text = read_diff_input(path)
                .with_context(|| format!("Failed to read diff from {}", path.display()))?;
            (text, diff_file_label(path))
        }
    };

    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => config.output_dir_in(&root),
    };
    let format = args.format.map(OutputFormat::from).unwrap_or(config.output_format);
    let ignore = config.ignore_matcher().context("Invalid ignore pattern in configuration")?;

    println!("Repository: {}", root.display());
    println!("Output: {}", output_dir.display());
    println!("Diff target: {}", target);

    let http = client_for(&config, args.ai.model(&config), args.ai.use_ai(&config));
    warn_if_unavailable(&http);

    let options = GenerateOptions {
        diff_target: target,
        output_dir,
        format,
        draft: DraftOptions::from(&config),
        dry_run: args.dry_run,
    };

    let outcome = generate_change_docs(&diff_text, &ignore, &options, as_client(&http))
        .await
        .context("Failed to generate documentation")?;

    match outcome {
        GenerateOutcome::NoChanges => println!("No changes detected."),
        GenerateOutcome::DryRun {
            file_name,
            content,
            files,
            enhancement,
        } => {
            println!("Found {} changed file(s)", files);
            report_enhancement(&enhancement);
            println!("\n--- Dry Run Output ({}) ---\n", file_name);
            print!("{}", content);
        }
        GenerateOutcome::Written {
            path,
            files,
            enhancement,
        } => {
            println!("Found {} changed file(s)", files);
            report_enhancement(&enhancement);
            println!("✓ Documentation written to {}", path.display());
        }
    }

    Ok(())
}

async fn run_wiki(args: WikiArgs) -> Result<()> {
    let root = args.repo.clone();
    let config = config::load_config(&root).context("Failed to load configuration")?;
    let ignore = config.ignore_matcher().context("Invalid ignore pattern in configuration")?;
    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => config.output_dir_in(&root),
    };

    println!("Scanning {}...", root.display());
    let structure = scan_project(&root, &ignore).context("Failed to scan project")?;
    println!(
        "Found {} module(s), main language: {}",
        structure.modules.len(),
        structure.main_language_name()
    );

    let http = client_for(&config, args.ai.model(&config), args.ai.use_ai(&config));
    warn_if_unavailable(&http);

    let report = generate_wiki(&structure, as_client(&http)).await;
    if let (Ok(_), Some(reason)) = (&http, &report.unavailable) {
        eprintln!(
            "Warning: AI enhancement stopped after {} page(s): {}",
            report.enhanced, reason
        );
    }

    let written = write_wiki(&report.pages, &output_dir).context("Failed to write wiki")?;
    println!(
        "✓ Wrote {} wiki page(s) to {}",
        report.pages.len(),
        output_dir.join("wiki").display()
    );
    tracing::debug!("Wiki files: {:?}", written);

    Ok(())
}

fn run_init(args: InitArgs) -> Result<()> {
    let path = match create_default_config(&args.repo, args.force) {
        Ok(path) => path,
        Err(ConfigError::AlreadyExists(existing)) => {
            if !std::io::stdin().is_terminal() {
                bail!(ConfigError::AlreadyExists(existing));
            }
            let overwrite = Confirm::new()
                .with_prompt(format!("{} already exists. Overwrite?", existing.display()))
                .default(false)
                .interact()
                .context("Failed to read confirmation")?;
            if !overwrite {
                println!("Kept existing {}", PROJECT_CONFIG_FILE);
                return Ok(());
            }
            create_default_config(&args.repo, true).context("Failed to write configuration")?
        }
        Err(e) => return Err(e).context("Failed to write configuration"),
    };

    println!("✓ Created {}", path.display());
    Ok(())
}

/// Label used in place of a revision when the diff comes from a file.
fn diff_file_label(path: &Path) -> String {
    if path == Path::new("-") {
        return "stdin".to_string();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "diff".to_string())
}

fn as_client(
    http: &std::result::Result<HttpCompletionClient, UnavailableReason>,
) -> std::result::Result<&dyn CompletionClient, UnavailableReason> {
    match http {
        Ok(client) => Ok(client as &dyn CompletionClient),
        Err(reason) => Err(reason.clone()),
    }
}

fn warn_if_unavailable(http: &std::result::Result<HttpCompletionClient, UnavailableReason>) {
    match http {
        Ok(client) => println!("Using {} ({})", client.provider(), client.model()),
        Err(UnavailableReason::Disabled) => {}
        Err(reason) => eprintln!("Warning: AI enhancement unavailable: {}", reason),
    }
}

fn report_enhancement(enhancement: &Enhancement) {
    match enhancement {
        Enhancement::Generated(content) => println!(
            "Enhanced with {} ({}), impact: {}",
            content.provider, content.model, content.analysis.impact_level
        ),
        Enhancement::Unavailable(UnavailableReason::ProviderFailed(message)) => {
            eprintln!("Warning: AI enhancement failed, wrote structure-only document: {}", message)
        }
        Enhancement::Unavailable(_) => {}
    }
}
