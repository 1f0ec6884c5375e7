use ai_tools_tracker::git::{CommitIdentity, GitRepo};
use ai_tools_tracker::notify::ChannelNotifier;
use ai_tools_tracker::storage::{self, TOOLS_CSV};
use ai_tools_tracker::{pipeline, search};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "ai-tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track newly launched AI tools in a CSV dataset")]
struct Args {
    /// Directory holding data/ (and the git checkout)
    #[arg(long, env = "ROOT", default_value = ".", global = true)]
    root: String,

    /// Enable verbose logging (to stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch enabled sources and append unseen tools to the dataset
    Scrape,
    /// Deduplicate, sort and diff the dataset against the last commit
    Merge,
    /// Send alerts for new tools, then commit the dataset
    Publish {
        #[arg(long)]
        no_commit: bool,
    },
    /// Scrape, merge and publish
    Run {
        #[arg(long)]
        no_commit: bool,
    },
    /// Search the dataset; reads prompts from stdin when none is given
    Search {
        /// Category used when the prompt does not name one
        /// (finance, customer-support, content, devtools, marketing, productivity)
        #[arg(short, long)]
        category: Option<String>,
        prompt: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let root = args.root.as_str();
    match args.command {
        Commands::Scrape => {
            pipeline::scrape(root)?;
        }
        Commands::Merge => {
            merge(root)?;
        }
        Commands::Publish { no_commit } => publish(root, no_commit),
        Commands::Run { no_commit } => {
            pipeline::scrape(root)?;
            merge(root)?;
            publish(root, no_commit);
        }
        Commands::Search { category, prompt } => search_cmd(root, category.as_deref(), prompt.as_deref())?,
    }

    Ok(())
}

fn merge(root: &str) -> Result<()> {
    let repo = GitRepo::new(Path::new(root));
    let summary = pipeline::merge(root, &repo)?;
    for tool in summary.new_tools.iter().take(5) {
        info!("  new: {} ({})", tool.name, tool.url);
    }
    Ok(())
}

fn publish(root: &str, no_commit: bool) {
    let repo = GitRepo::new(Path::new(root));
    let notifier = ChannelNotifier::from_env();
    pipeline::publish(root, &notifier, &repo);

    if !no_commit {
        repo.commit_dataset(TOOLS_CSV, &CommitIdentity::from_env());
    }
}

fn search_cmd(root: &str, category: Option<&str>, prompt: Option<&str>) -> Result<()> {
    let category = match category {
        Some(name) => match search::known_category(name) {
            Some(known) => Some(known),
            None => bail!(
                "Unknown category '{}'. Choose one of: {}",
                name,
                search::CATEGORIES.join(", ")
            ),
        },
        None => None,
    };
    let records = storage::load_dataset_for_search(root);

    if let Some(prompt) = prompt {
        let answer = search::answer(&records, prompt, category);
        print!("{}", search::render_answer(&answer));
        return Ok(());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("Ask about AI tools (e.g. 'Show me finance tools'). Ctrl-D to quit.");
    print!("> ");
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let prompt = line.trim();
        if !prompt.is_empty() {
            let answer = search::answer(&records, prompt, category);
            println!("{}", search::render_answer(&answer));
        }
        print!("> ");
        stdout.flush()?;
    }
    println!();
    Ok(())
}
