//! Benchdeck CLI - terminal front end for the evaluation dashboard core

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use benchdeck_core::prelude::*;

#[derive(Parser)]
#[command(name = "benchdeck")]
#[command(about = "Ground-truth test sets and evaluation runs", long_about = None)]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides configuration)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test-set commands
    TestSets {
        #[command(subcommand)]
        command: TestSetCommands,
    },
    /// Run an evaluation against all test sets in a domain
    Run {
        /// Domain ID
        domain: String,
    },
    /// Version information
    Version,
}

#[derive(Subcommand)]
enum TestSetCommands {
    /// List a domain's test sets
    List {
        /// Domain ID
        domain: String,
    },
    /// Add a test set
    Add {
        /// Domain ID
        domain: String,
        /// Evaluation question
        #[arg(long)]
        question: String,
        /// Expected answer
        #[arg(long)]
        ground_truth: String,
        /// Difficulty: easy, medium, or hard
        #[arg(long, default_value = "medium")]
        difficulty: String,
    },
    /// Delete a test set permanently
    Delete {
        /// Domain ID
        domain: String,
        /// Test set ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

struct App {
    cache: QueryCache,
    coordinator: MutationCoordinator,
    notifier: Arc<BufferingNotifier>,
}

impl App {
    fn new(config: &BenchdeckConfig) -> Result<Self> {
        let repo: Arc<dyn TestSetRepository> =
            Arc::new(HttpTestSetRepository::from_config(&config.server)?);
        let cache = QueryCache::with_config(repo.clone(), &config.cache);
        let notifier = Arc::new(BufferingNotifier::new());
        let coordinator = MutationCoordinator::new(repo, cache.clone(), notifier.clone());
        Ok(Self {
            cache,
            coordinator,
            notifier,
        })
    }

    /// Fetch a domain's collection and wait for it to settle.
    async fn load(&self, domain: &str) -> CacheSnapshot {
        let key = CacheKey::test_sets(domain);
        let _watch = self.cache.subscribe(&key);
        let version_before = self.cache.peek(&key).version;
        self.cache.get(&key);
        self.cache
            .wait_for(&key, |s| s.is_settled() && s.version >= version_before)
            .await
    }

    fn render(&self, domain: &str, snapshot: &CacheSnapshot) {
        let view = project_test_sets(
            domain,
            snapshot,
            &self.coordinator.pending_snapshot(domain),
        );

        if let Some(error) = &view.error {
            println!("error: {}", error);
        }

        match &view.table {
            TableState::Loading => println!("Loading test sets..."),
            TableState::Empty => {
                println!("No test sets yet. Add one with `benchdeck test-sets add`.");
            }
            TableState::Rows(rows) => {
                println!(
                    "{:<8}  {:<40}  {:<30}  {:<10}  {}",
                    "ID", "QUESTION", "GROUND TRUTH", "DIFFICULTY", "LAST RESULT"
                );
                for row in rows {
                    println!(
                        "{:<8}  {:<40}  {:<30}  {:<10}  {} {}",
                        row.id,
                        truncate(&row.question, 40),
                        truncate(&row.ground_truth, 30),
                        row.difficulty.as_str(),
                        row.status.symbol(),
                        row.status.label()
                    );
                }
            }
        }
    }

    fn flush_notifications(&self) {
        for notification in self.notifier.drain() {
            match notification.level {
                NotificationLevel::Success => println!("✓ {}", notification.message),
                NotificationLevel::Error => eprintln!("✗ {}", notification.message),
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = BenchdeckConfig::load()?;
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }

    match cli.command {
        Commands::Version => {
            println!("benchdeck {}", env!("CARGO_PKG_VERSION"));
            println!("benchdeck-core {}", benchdeck_core::VERSION);
        }
        Commands::TestSets { command } => match command {
            TestSetCommands::List { domain } => {
                let app = App::new(&config)?;
                let snapshot = app.load(&domain).await;
                app.render(&domain, &snapshot);
            }
            TestSetCommands::Add {
                domain,
                question,
                ground_truth,
                difficulty,
            } => {
                let app = App::new(&config)?;
                let difficulty = Difficulty::parse(&difficulty).ok_or_else(|| {
                    anyhow::anyhow!("difficulty must be easy, medium, or hard")
                })?;

                app.coordinator.set_draft(
                    &domain,
                    TestSetDraft::new(question, ground_truth).with_difficulty(difficulty),
                );
                let result = app.coordinator.create_test_set(&domain).await;
                app.flush_notifications();
                let created = result?;
                println!("Created test set {}", created.id);
            }
            TestSetCommands::Delete { domain, id, yes } => {
                let app = App::new(&config)?;
                if !yes && !confirm(&format!("Delete test set {}? This cannot be undone.", id))? {
                    println!("Aborted.");
                    return Ok(());
                }
                let result = app.coordinator.delete_test_set(&domain, &id).await;
                app.flush_notifications();
                result?;
            }
        },
        Commands::Run { domain } => {
            let app = App::new(&config)?;

            // Load the collection first so the client-side empty guard and
            // the projected run control see real data
            let key = CacheKey::test_sets(&domain);
            let _watch = app.cache.subscribe(&key);
            let snapshot = app.load(&domain).await;
            if let Some(error) = &snapshot.error {
                anyhow::bail!("could not load test sets: {}", error);
            }

            let view =
                project_test_sets(&domain, &snapshot, &app.coordinator.pending_snapshot(&domain));
            if !view.run_enabled {
                anyhow::bail!("no test sets to evaluate in domain {}", domain);
            }

            let version_before = snapshot.version;
            let result = app.coordinator.run_evaluation(&domain).await;
            app.flush_notifications();
            result?;

            // The run invalidated the collection; show the refreshed statuses
            let refreshed = app
                .cache
                .wait_for(&key, |s| s.is_settled() && s.version > version_before)
                .await;
            app.render(&domain, &refreshed);
        }
    }

    Ok(())
}
