//! Blacklist CLI
//!
//! CLI tool for classifying comments and maintaining the local rule list.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use bl_update::{Blacklist, BlacklistConfig, DEFAULT_BLACKLIST_URL};

mod report;

use report::{describe_outcome, format_freshness, validate_file, verdict_line, InfoReport};

#[derive(Parser)]
#[command(name = "bl-cli")]
#[command(about = "Comment-spam blacklist classifier and tools")]
struct Cli {
    #[command(flatten)]
    location: LocationArgs,

    /// Verbose output (debug logging, reports which rule hit)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LocationArgs {
    /// Directory holding blacklist.txt
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Application base path (rules read from <BASE_PATH>/resources/blacklist.txt)
    #[arg(long, global = true)]
    base_path: Option<PathBuf>,

    /// Remote rule list URL
    #[arg(long, global = true, default_value = DEFAULT_BLACKLIST_URL)]
    url: String,

    /// HTTP timeout for updates
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,
}

impl LocationArgs {
    fn to_config(&self) -> BlacklistConfig {
        BlacklistConfig {
            upload_dir: self.upload_dir.clone(),
            base_path: self.base_path.clone(),
            remote_url: self.url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            ..BlacklistConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify text against the active rules
    Check {
        /// Text to classify
        text: Vec<String>,

        /// Classify the contents of a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Fetch a newer rule list if one is available
    Update,

    /// Show the active rule set
    Info {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a rule file and report problems
    Validate {
        /// Rule file to validate
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check for updates periodically until interrupted
    Watch {
        /// Seconds between update checks
        #[arg(long, default_value_t = 3600)]
        interval_secs: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = cli.location.to_config();
    let result = match cli.command {
        Commands::Check { text, file } => cmd_check(config, &text, file.as_deref()),
        Commands::Update => cmd_update(config),
        Commands::Info { json } => cmd_info(config, json),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Watch { interval_secs } => cmd_watch(config, interval_secs),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load(config: BlacklistConfig) -> Result<&'static Blacklist, String> {
    bl_update::init(config).map_err(|e| format!("Failed to load blacklist: {e}"))
}

fn cmd_check(config: BlacklistConfig, texts: &[String], file: Option<&Path>) -> Result<(), String> {
    let mut inputs = texts.to_vec();
    if let Some(path) = file {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        inputs.push(content);
    }
    if inputs.is_empty() {
        return Err("Nothing to check: pass text or --file".to_string());
    }

    let blacklist = load(config)?;
    let rule_set = blacklist.rule_set();

    let mut hits = 0usize;
    for input in &inputs {
        let (hit, line) = verdict_line(&rule_set, input);
        if hit {
            hits += 1;
        }
        println!("{line}");
    }

    println!("{} of {} inputs blacklisted", hits, inputs.len());
    Ok(())
}

fn cmd_update(config: BlacklistConfig) -> Result<(), String> {
    let blacklist = load(config)?;
    let before = blacklist.freshness();

    let outcome = blacklist.refresh();

    println!("Update: {}", describe_outcome(outcome));
    println!("  Last update: {} -> {}", format_freshness(before), format_freshness(blacklist.freshness()));
    Ok(())
}

fn cmd_info(config: BlacklistConfig, json: bool) -> Result<(), String> {
    let blacklist = load(config)?;
    let report = InfoReport::from_blacklist(blacklist);

    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to encode report: {}", e))?;
        println!("{text}");
    } else {
        println!("{}", report.to_text());
    }
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), String> {
    let summary = validate_file(input)?;

    println!("Rule file '{}' is valid", input.display());
    println!("  Literals:    {}", summary.literals);
    println!("  Patterns:    {}", summary.patterns);
    println!("  Last update: {}", format_freshness(summary.freshness));
    Ok(())
}

fn cmd_watch(config: BlacklistConfig, interval_secs: u64) -> Result<(), String> {
    if interval_secs == 0 {
        return Err("--interval-secs must be greater than zero".to_string());
    }

    let blacklist = load(config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    runtime.block_on(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // The HTTP client blocks; keep it off the async workers.
                    match tokio::task::spawn_blocking(move || blacklist.refresh()).await {
                        Ok(outcome) => println!(
                            "Update: {} (last update {})",
                            describe_outcome(outcome),
                            format_freshness(blacklist.freshness())
                        ),
                        Err(e) => return Err(format!("Update task failed: {}", e)),
                    }
                }
                _ = &mut shutdown => {
                    println!("Stopping");
                    return Ok(());
                }
            }
        }
    })
}
