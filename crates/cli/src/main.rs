//! CLI for streaming, browsing and exporting generated presentations.

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use deck_client::config::DEFAULT_BASE_URL;
use deck_client::{client::DEFAULT_LIST_LIMIT, ClientConfig, PresentationClient};
use deck_core::{
    drive, DirectoryRepository, GenerationConfig, Presentation, PresentationAccumulator,
    PresentationRepository, PresentationSummary, RunOutcome, StreamEvent, TextExporter,
};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Generate presentations from a streaming service and keep a local history.
#[derive(Parser, Debug)]
#[command(name = "deck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the generation service
    #[arg(long, env = "DECK_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    api_url: String,

    /// Directory holding saved presentations
    #[arg(long, env = "DECK_HISTORY_DIR", default_value = "presentations", global = true)]
    history_dir: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a new presentation, printing slides as they arrive
    Generate(GenerateArgs),

    /// List saved presentations
    History,

    /// Print a saved presentation
    Show {
        /// Presentation id
        id: String,
    },

    /// Write a saved presentation in the stored text format
    ExportText {
        /// Presentation id
        id: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Talk to presentations persisted by the service
    #[command(subcommand)]
    Remote(RemoteCommand),
}

#[derive(Subcommand, Debug)]
enum RemoteCommand {
    /// List presentations known to the service
    List {
        /// Maximum number of entries
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },

    /// Print a presentation persisted by the service
    Show {
        /// Presentation id
        id: String,
    },

    /// Download the rendered slide deck
    Download {
        /// Presentation id
        id: String,

        /// Output file (default: <id>.pptx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the service is up
    Health,
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Presentation title
    #[arg(short, long)]
    title: String,

    /// Restrict generation to a specific topic
    #[arg(long)]
    topic: Option<String>,

    /// Level of detail
    #[arg(long, default_value = "detailed")]
    detail_level: String,

    /// Target audience difficulty
    #[arg(long, default_value = "intermediate")]
    difficulty: String,

    /// Slide style
    #[arg(long, default_value = "professional")]
    style: String,

    /// Number of slides (5-30)
    #[arg(short = 'n', long, default_value_t = 10)]
    slides: u32,

    /// Ask for diagrams
    #[arg(long)]
    diagrams: bool,

    /// Ask for code examples
    #[arg(long)]
    code_examples: bool,

    /// Do not save the finished presentation
    #[arg(long)]
    no_save: bool,
}

impl GenerateArgs {
    fn to_config(&self) -> GenerationConfig {
        let mut config = GenerationConfig::new(&self.title).with_num_slides(self.slides);
        if let Some(topic) = &self.topic {
            config = config.with_topic(topic);
        }
        config.detail_level = self.detail_level.clone();
        config.difficulty = self.difficulty.clone();
        config.slide_style = self.style.clone();
        config.include_diagrams = self.diagrams;
        config.include_code_examples = self.code_examples;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let client = PresentationClient::new(ClientConfig::new(&args.api_url))
        .context("Failed to build HTTP client")?;

    match &args.command {
        Command::Generate(generate_args) => {
            let repo = open_history(&args.history_dir)?;
            generate(generate_args, &client, &repo).await
        }
        Command::History => {
            let repo = open_history(&args.history_dir)?;
            print_summaries(&repo.list()?);
            Ok(())
        }
        Command::Show { id } => {
            let repo = open_history(&args.history_dir)?;
            print_presentation(&load_saved(&repo, id)?);
            Ok(())
        }
        Command::ExportText { id, output } => {
            let repo = open_history(&args.history_dir)?;
            let presentation = load_saved(&repo, id)?;
            let text = TextExporter::new().format(&presentation.slides);
            match output {
                Some(path) => {
                    write_output(path, text.as_bytes())?;
                    if args.verbose {
                        eprintln!("Written to: {}", path.display());
                    }
                }
                None => println!("{}", text),
            }
            Ok(())
        }
        Command::Remote(command) => remote(command, &client, args.verbose).await,
    }
}

fn open_history(dir: &Path) -> Result<DirectoryRepository> {
    DirectoryRepository::open(dir)
        .with_context(|| format!("Failed to open history directory {}", dir.display()))
}

fn load_saved(repo: &DirectoryRepository, id: &str) -> Result<Presentation> {
    repo.get(id)
        .with_context(|| format!("Failed to load presentation {}", id))?
        .with_context(|| format!("No saved presentation with id {}", id))
}

/// Stream one presentation, rendering each slide as soon as it completes.
async fn generate(
    args: &GenerateArgs,
    client: &PresentationClient,
    repo: &DirectoryRepository,
) -> Result<()> {
    let config = args.to_config();
    let chunks = client
        .generate(&config)
        .await
        .context("Failed to start generation")?;

    let mut acc = PresentationAccumulator::new(Presentation::new(&config.title));
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            render_event(&event);
        }
    });

    let result = drive(chunks, &mut acc, &cancel, Some(&events_tx)).await;
    drop(events_tx);
    let _ = renderer.await;

    let presentation = acc.into_presentation();
    let count = presentation.slides.len();

    match result {
        Ok(RunOutcome::Completed) => {
            if args.no_save {
                eprintln!("Done: {} slides", count);
            } else {
                repo.save(&presentation)
                    .context("Failed to save presentation")?;
                log::info!("Saved presentation {} to history", presentation.id);
                eprintln!(
                    "Saved {} slides as {} in {}",
                    count,
                    presentation.id,
                    repo.root().display()
                );
            }
            Ok(())
        }
        Ok(RunOutcome::Cancelled) => bail!("Cancelled after {} slides", count),
        Err(e) => Err(e).context(format!("Generation failed after {} slides", count)),
    }
}

fn render_event(event: &StreamEvent) {
    match event {
        StreamEvent::Started => eprintln!("Generating..."),
        StreamEvent::SlideAppended(slide) => println!("{}\n", slide),
        StreamEvent::RecordSkipped { reason } => eprintln!("Skipped a malformed record: {}", reason),
        StreamEvent::Completed { .. } | StreamEvent::Failed { .. } => {}
    }
}

async fn remote(command: &RemoteCommand, client: &PresentationClient, verbose: bool) -> Result<()> {
    match command {
        RemoteCommand::List { limit } => {
            let summaries = client
                .list(*limit)
                .await
                .context("Failed to list presentations")?;
            print_summaries(&summaries);
        }
        RemoteCommand::Show { id } => {
            let presentation = client
                .fetch_presentation(id)
                .await
                .with_context(|| format!("Failed to fetch presentation {}", id))?;
            print_presentation(&presentation);
        }
        RemoteCommand::Download { id, output } => {
            let deck = client
                .download_deck(id)
                .await
                .with_context(|| format!("Failed to download presentation {}", id))?;
            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.pptx", id)));
            write_output(&path, &deck)?;
            if verbose {
                eprintln!("Written to: {}", path.display());
            }
        }
        RemoteCommand::Health => {
            if !client.health().await.context("Health check failed")? {
                bail!("Service at {} reports unhealthy", client.config().base_url);
            }
            println!("ok");
        }
    }
    Ok(())
}

fn print_summaries(summaries: &[PresentationSummary]) {
    for summary in summaries {
        let created = summary
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<9}  {}  {}",
            summary.id,
            summary.status.as_str(),
            created,
            summary.title
        );
    }
}

fn print_presentation(presentation: &Presentation) {
    println!("{} ({})\n", presentation.title, presentation.status);
    for slide in &presentation.slides {
        println!("{}\n", slide);
    }
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
