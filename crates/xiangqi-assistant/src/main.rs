//! Xiangqi assistant - console front end for the move arbiter.
//!
//! Loads `assistant.toml`, applies command-line overrides, and prints the
//! progress and decision of one analysis run. Ctrl+C cancels the run.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use xiangqi_arbiter::{
    AnalysisEvent, ArbiterEvent, Decision, MoveArbiter, Rejection, SearchParameters,
};
use xiangqi_engine::{notation, Position, RuleEngine, RuleVariant};
use xiangqi_openings::{builtin_database, BookLibrary, MoveDatabase};

use config::{AssistantConfig, BookConfig};

#[derive(Parser)]
#[command(name = "xiangqi-assistant")]
#[command(about = "Xiangqi move validation and analysis")]
struct Cli {
    /// Configuration file (defaults to ./assistant.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Rule variant: standard, relaxed or platform_specific
    #[arg(short, long, global = true)]
    rules: Option<RuleVariant>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PositionArgs {
    /// Starting position (FEN; only the placement is required)
    #[arg(long)]
    fen: Option<String>,

    /// Moves played from the starting position, in any notation
    #[arg(value_name = "MOVE")]
    moves: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a move and print the analysis
    Analyse {
        #[command(flatten)]
        position: PositionArgs,
        /// Maximum search depth
        #[arg(short, long)]
        depth: Option<u8>,
        /// Thinking time in milliseconds
        #[arg(short, long)]
        time: Option<u64>,
        /// Search threads
        #[arg(long)]
        threads: Option<usize>,
        /// Transposition table size in MB
        #[arg(long)]
        hash: Option<usize>,
        /// Opening book (JSON) replacing the built-in one
        #[arg(long)]
        book: Option<PathBuf>,
        /// Skip the opening book
        #[arg(long)]
        no_book: bool,
        /// Do not report the expected reply
        #[arg(long)]
        no_ponder: bool,
        /// Pause after each depth, in milliseconds
        #[arg(long)]
        pacing: Option<u64>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Judge one move under the selected rules
    Check {
        /// The move to judge
        #[arg(value_name = "CANDIDATE")]
        candidate: String,
        #[command(flatten)]
        position: PositionArgs,
    },
    /// List the legal moves under the selected rules
    Moves {
        #[command(flatten)]
        position: PositionArgs,
    },
    /// List the configured opening books
    Books,
}

/// Serializable view of an arbiter event.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Progress(&'a AnalysisEvent),
    Rejected(&'a Rejection),
    Decision(&'a Decision),
    Failed { error: String },
    Cancelled,
}

impl<'a> From<&'a ArbiterEvent> for JsonEvent<'a> {
    fn from(event: &'a ArbiterEvent) -> Self {
        match event {
            ArbiterEvent::Progress(p) => JsonEvent::Progress(p),
            ArbiterEvent::Rejected(r) => JsonEvent::Rejected(r),
            ArbiterEvent::Decision(d) => JsonEvent::Decision(d),
            ArbiterEvent::Failed(e) => JsonEvent::Failed {
                error: e.to_string(),
            },
            ArbiterEvent::Cancelled => JsonEvent::Cancelled,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AssistantConfig::load(cli.config.as_deref())?;
    if let Some(rules) = cli.rules {
        config.rules = rules;
    }

    match cli.command {
        Commands::Analyse {
            position,
            depth,
            time,
            threads,
            hash,
            book,
            no_book,
            no_ponder,
            pacing,
            json,
        } => {
            let engine = &mut config.engine;
            if let Some(depth) = depth {
                engine.max_depth = depth;
            }
            if let Some(time) = time {
                engine.thinking_time_ms = time;
            }
            if let Some(threads) = threads {
                engine.threads = threads;
            }
            if let Some(hash) = hash {
                engine.hash_mb = hash;
            }
            if no_book {
                engine.book_enabled = false;
            }
            if no_ponder {
                engine.ponder_enabled = false;
            }
            if let Some(book) = book {
                config.book.path = Some(book);
            }
            if let Some(pacing) = pacing {
                config.pacing_ms = pacing;
            }
            let position = build_position(&position, config.rules)?;
            analyse(config, position, json).await
        }
        Commands::Check {
            candidate,
            position,
        } => {
            let position = build_position(&position, config.rules)?;
            let legal = config.rules.is_legal(&candidate, &position)?;
            println!(
                "{candidate}: {} under {} rules",
                if legal { "legal" } else { "illegal" },
                config.rules
            );
            Ok(())
        }
        Commands::Moves { position } => {
            let position = build_position(&position, config.rules)?;
            let moves = config.rules.legal_moves(&position)?;
            for m in &moves {
                println!("{}  {}", m, notation::describe(&position, *m));
            }
            println!("{} legal moves", moves.len());
            Ok(())
        }
        Commands::Books => {
            let library = build_library(&config.book)?;
            let active = library.active().map(|b| b.info().name.clone());
            for name in library.names() {
                let Some(book) = library.get(name) else {
                    continue;
                };
                let info = book.info();
                println!(
                    "{} {}  {} positions  author {}  version {}",
                    if active.as_deref() == Some(name) { "*" } else { " " },
                    name,
                    book.len(),
                    info.author.as_deref().unwrap_or("-"),
                    info.version.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
    }
}

/// The built-in book plus the configured ones, with the selected book active.
fn build_library(config: &BookConfig) -> anyhow::Result<BookLibrary> {
    let mut library = BookLibrary::new();
    library.add(builtin_database())?;
    for path in &config.library {
        library
            .add_file(path)
            .with_context(|| format!("loading opening book {}", path.display()))?;
    }
    if let Some(path) = &config.path {
        let book = MoveDatabase::load(path)
            .with_context(|| format!("loading opening book {}", path.display()))?;
        let name = book.info().name.clone();
        if library.get(&name).is_some() {
            library.update(book)?;
        } else {
            library.add(book)?;
        }
        library.select(&name)?;
    }
    if let Some(name) = &config.active {
        library.select(name)?;
    }
    Ok(library)
}

/// Replays the given moves, rejecting any the rules do not allow.
fn build_position(args: &PositionArgs, rules: RuleVariant) -> anyhow::Result<Position> {
    let mut position = match &args.fen {
        Some(fen) => Position::from_fen(fen).context("invalid FEN")?,
        None => Position::startpos(),
    };
    for text in &args.moves {
        if !rules.is_legal(text, &position)? {
            bail!("{text} is illegal under {rules} rules");
        }
        let m = notation::decode(&position, text)?;
        position = position.play(m);
    }
    Ok(position)
}

async fn analyse(config: AssistantConfig, position: Position, json: bool) -> anyhow::Result<()> {
    let book = build_library(&config.book)?;
    let book_name = book.active().map(|b| b.info().name.clone());

    let mut arbiter = MoveArbiter::with_rules(config.rules)
        .with_book(book)
        .with_pacing(Duration::from_millis(config.pacing_ms));
    arbiter.configure(config.engine.clone())?;
    arbiter.set_position(position)?;
    print_header(&config.engine, config.rules, json);
    if let (false, Some(name)) = (json, &book_name) {
        println!("Opening book {name}");
    }

    let run = arbiter.start()?;
    let control = run.control();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling analysis");
            control.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || {
        let mut last = None;
        for event in run {
            if json {
                match serde_json::to_string(&JsonEvent::from(&event)) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::error!("Failed to encode event: {}", e),
                }
            } else {
                print_event(&event);
            }
            last = Some(event);
        }
        last
    })
    .await?;

    match outcome {
        Some(ArbiterEvent::Decision(_)) | Some(ArbiterEvent::Cancelled) => Ok(()),
        Some(ArbiterEvent::Failed(e)) => Err(e.into()),
        _ => bail!("analysis ended without an outcome"),
    }
}

fn print_header(params: &SearchParameters, rules: RuleVariant, json: bool) {
    if json {
        return;
    }
    println!(
        "Analysing with {} rules: depth {}, {} ms, {} threads, {} MB hash, book {}",
        rules,
        params.max_depth,
        params.thinking_time_ms,
        params.threads,
        params.hash_mb,
        if params.book_enabled { "on" } else { "off" }
    );
}

fn print_event(event: &ArbiterEvent) {
    match event {
        ArbiterEvent::Progress(p) if p.is_book() => {
            println!("book      {}", p.notation);
        }
        ArbiterEvent::Progress(p) => {
            let pv: Vec<String> = p.pv.iter().map(|m| m.to_string()).collect();
            println!(
                "depth {:>2}  {:<8} {:>7}  nodes {:>10}  {:>6} ms  pv {}",
                p.depth,
                p.notation,
                p.evaluation.to_string(),
                p.nodes,
                p.elapsed.as_millis(),
                pv.join(" ")
            );
        }
        ArbiterEvent::Rejected(r) => {
            println!("rejected  {} (attempt {}): {}", r.notation, r.attempt, r.reason);
        }
        ArbiterEvent::Decision(d) => {
            print!("bestmove  {} ({})", d.notation, d.mv);
            if let Some(ponder) = d.ponder {
                print!("  ponder {ponder}");
            }
            println!("  [{:?}, {} rules, {} retries]", d.source, d.rule_variant, d.retries);
        }
        ArbiterEvent::Failed(e) => println!("failed    {e}"),
        ArbiterEvent::Cancelled => println!("cancelled"),
    }
}
