use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use herald_core::{HeraldConfig, OutputFormat};
use herald_review::azure::AzureDevOpsClient;
use herald_review::capability::Capabilities;
use herald_review::llm::LlmClient;
use herald_review::pipeline::ReviewPipeline;
use herald_review::slack::SlackClient;

const CONFIG_FILE: &str = ".herald.toml";

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "AI pull-request reviewer for Azure DevOps with Slack announcements",
    long_about = "Herald reviews the latest iteration of an Azure DevOps pull request.\n\n\
                   It diffs every edited file, asks an LLM for a narrative review and short\n\
                   per-hunk summaries, posts the summaries as inline comments, and announces\n\
                   the review in Slack with reviewer mentions.\n\n\
                   Examples:\n  \
                     herald init                  Write a starter .herald.toml\n  \
                     herald review 1234           Review pull request 1234\n  \
                     herald review 1234 --dry-run Generate everything, post nothing\n  \
                     PR_ID=1234 herald review     Take the id from the environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .herald.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for the run report.\n\n\
                       Formats:\n  \
                         text      Human-readable summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Review a pull request and publish the results
    #[command(long_about = "Review a pull request and publish the results.\n\n\
        Resolves the repository and latest iteration, fetches before/after content of\n\
        every edited or renamed file, generates a narrative review and up to\n\
        review.max_comments_per_file inline comments per file, posts the comments and\n\
        announces the review in the first configured Slack channel.\n\n\
        Examples:\n  herald review 1234\n  herald review 1234 --dry-run --format markdown")]
    Review {
        /// Pull request id
        #[arg(env = "PR_ID")]
        pr_id: u64,

        /// Generate comments and the announcement without posting anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a default .herald.toml in the current directory
    Init,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# Herald Configuration
#
# Every secret can also come from the environment; environment values win.

[azure]
# org_url = "https://dev.azure.com/your-org"     # AZURE_DEVOPS_ORG_URL
# project = "YourProject"                        # AZURE_DEVOPS_DEFAULT_PROJECT
# repository = "your-repo"                       # AZURE_DEVOPS_DEFAULT_REPO
# pat = "..."                                    # AZURE_DEVOPS_PAT
# resolve_by_name = false

[slack]
# bot_token = "xoxb-..."                         # SLACK_BOT_TOKEN
# team_id = "T0000000"                           # SLACK_TEAM_ID
# channel_ids = "C0000000"                       # SLACK_CHANNEL_IDS (first one is used)

[llm]
# model = "gpt-4o-mini"                          # GPT_MODEL
# api_key = "sk-..."                             # OPENAI_API_KEY
# base_url = "https://api.openai.com"
# temperature = 0.1
# comment_temperature = 0.2

[review]
# max_comments_per_file = 3
# excerpt_lines = 200
# concurrency = 4
"#;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<HeraldConfig> {
    let mut config = match path {
        Some(path) => HeraldConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                HeraldConfig::from_file(default_path)?
            } else {
                HeraldConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

fn wire(config: &HeraldConfig) -> Result<Capabilities> {
    let azure = Arc::new(AzureDevOpsClient::new(&config.azure)?);
    let slack = Arc::new(SlackClient::new(&config.slack)?);
    let narrator = LlmClient::new(&config.llm)?;
    let summarizer = narrator
        .clone()
        .with_temperature(config.llm.comment_temperature);
    Ok(Capabilities {
        source: azure.clone(),
        content: azure.clone(),
        comments: azure,
        directory: slack.clone(),
        chat: slack,
        narrator: Arc::new(narrator),
        summarizer: Arc::new(summarizer),
    })
}

fn spinner(message: &'static str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Review { pr_id, dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            config.validate(!dry_run)?;
            tracing::debug!(pr_id, dry_run, model = %config.llm.model, "configuration loaded");

            let caps = wire(&config)?;
            let pipeline = ReviewPipeline::from_config(caps, &config, dry_run)?;

            let pb = spinner("Reviewing pull request...");
            let report = pipeline.run(pr_id).await.inspect_err(|_e| {
                if let Some(pb) = &pb {
                    pb.finish_with_message("Failed");
                }
            })?;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&report).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => print!("{}", report.to_markdown()),
                OutputFormat::Text => print!("{report}"),
            }
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!(miette::miette!(
                    help = "edit the existing file or remove it first",
                    "{CONFIG_FILE} already exists"
                ));
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "herald", &mut std::io::stdout());
        }
    }

    Ok(())
}
