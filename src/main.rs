//! repstore command line: inspect and edit a repertoire directory.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use shakmaty::{Chess, Color, Position};

use repstore::codec;
use repstore::opening::{export_subtree, MoveTree};
use repstore::schedule::now_minutes;
use repstore::visitor::{due_schedule, set_subtree_learnable, upcoming};
use repstore::{parse_fen, Config, PositionKey, Repertoire, Section};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repertoire directory, overrides the configuration
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SectionArg {
    White,
    Black,
    Tactics,
}

impl From<SectionArg> for Section {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::White => Section::WHITE,
            SectionArg::Black => Section::BLACK,
            SectionArg::Tactics => Section::Tactics,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty repertoire
    Init,
    /// Record counts per table
    Stats,
    /// Moves stored for a position
    Moves {
        fen: String,
        #[arg(short, long, value_enum, default_value_t = SectionArg::White)]
        section: SectionArg,
    },
    /// Store a move
    Add {
        fen: String,
        uci: String,
        #[arg(short, long, value_enum, default_value_t = SectionArg::White)]
        section: SectionArg,
    },
    /// Remove one move, or every move of a position
    Remove {
        fen: String,
        uci: Option<String>,
        #[arg(short, long, value_enum, default_value_t = SectionArg::White)]
        section: SectionArg,
    },
    /// Schedule a position and everything below it for review
    Learnable {
        fen: String,
        #[arg(short, long, value_enum, default_value_t = SectionArg::White)]
        section: SectionArg,
        /// Reset records that already have a schedule
        #[arg(long)]
        reset: bool,
    },
    /// Entries due for review below a position
    Due {
        fen: Option<String>,
        #[arg(short, long, value_enum, default_value_t = SectionArg::White)]
        section: SectionArg,
    },
    /// Upcoming reviews across a section
    Schedule {
        #[arg(short, long, value_enum, default_value_t = SectionArg::White)]
        section: SectionArg,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Read or write position comments
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
    /// Tactics entry points
    Initial {
        /// FEN to add; lists the entry points when absent
        fen: Option<String>,
    },
    /// Print every stored line below a position
    Export {
        fen: Option<String>,
        #[arg(short, long, value_enum, default_value_t = SectionArg::White)]
        section: SectionArg,
    },
}

#[derive(Subcommand, Debug)]
enum CommentAction {
    Get { fen: String },
    Set { fen: String, text: String },
    Remove { fen: String },
}

fn position(fen: Option<&str>) -> anyhow::Result<Chess> {
    match fen {
        Some(fen) => Ok(parse_fen(fen)?),
        None => Ok(Chess::default()),
    }
}

fn format_due(minutes: u32) -> String {
    match Utc.timestamp_opt(i64::from(minutes) * 60, 0).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => minutes.to_string(),
    }
}

fn color_name(color: Color) -> &'static str {
    color.fold_wb("white", "black")
}

fn open(root: &PathBuf, config: &Config) -> anyhow::Result<Repertoire> {
    let rep = Repertoire::open(root)
        .with_context(|| format!("no repertoire loaded: {}", root.display()))?;
    Ok(rep.with_params(config.scheduler.clone()))
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::new(),
    };
    let root = args.root.clone().unwrap_or_else(|| config.root.clone());

    match args.command {
        Command::Init => {
            let rep = Repertoire::create(&root)?;
            println!("repertoire ready at {}", rep.root().display());
        }
        Command::Stats => {
            let rep = open(&root, &config)?;
            println!("{}", rep.stats());
        }
        Command::Moves { fen, section } => {
            let rep = open(&root, &config)?;
            let pos = parse_fen(&fen)?;
            let section = Section::from(section);
            println!("{} ({} to move)", PositionKey::of(&pos), color_name(pos.turn()));
            for record in rep.find_records(section, &pos) {
                let shape = codec::BookMove::decode(record.raw_move);
                let triple = record.triple();
                if record.is_scheduled() {
                    println!(
                        "  {:<6} weight {:#06x}  e={:.3} c={} due {}",
                        shape.to_string(),
                        record.weight,
                        triple.easiness,
                        triple.consecutive,
                        format_due(triple.due)
                    );
                } else {
                    println!("  {:<6} weight {:#06x}  not scheduled", shape.to_string(), record.weight);
                }
            }
            if let Some(comment) = rep.get_comment(&pos) {
                println!("  comment: {}", comment);
            }
        }
        Command::Add { fen, uci, section } => {
            let mut rep = open(&root, &config)?;
            let pos = parse_fen(&fen)?;
            let mv = codec::parse_uci(&pos, &uci)?;
            if rep.append(section.into(), &pos, &mv, 1, 0)? {
                rep.flush()?;
                println!("added {}", codec::to_uci(&mv));
            } else {
                println!("{} already stored", codec::to_uci(&mv));
            }
        }
        Command::Remove { fen, uci, section } => {
            let mut rep = open(&root, &config)?;
            let pos = parse_fen(&fen)?;
            let mv = uci.map(|uci| codec::parse_uci(&pos, &uci)).transpose()?;
            let removed = rep.remove(section.into(), &pos, mv.as_ref())?;
            rep.flush()?;
            println!("removed {} record(s)", removed);
        }
        Command::Learnable { fen, section, reset } => {
            let mut rep = open(&root, &config)?;
            let pos = parse_fen(&fen)?;
            let section = Section::from(section);
            let changed = set_subtree_learnable(&mut rep, section, &pos, reset);
            rep.flush()?;
            println!("{} record(s) scheduled", changed);
        }
        Command::Due { fen, section } => {
            let rep = open(&root, &config)?;
            let start = position(fen.as_deref())?;
            let now = now_minutes();
            let visits = due_schedule(&rep, section.into(), &start, config.report.max_lines);
            let due: Vec<_> = visits.iter().filter(|v| v.record.is_due(now)).collect();
            if due.is_empty() {
                println!("nothing due");
            }
            for visit in due {
                println!(
                    "{}{} at {}",
                    "  ".repeat(visit.depth),
                    codec::to_uci(&visit.mv),
                    PositionKey::of(&visit.position)
                );
            }
        }
        Command::Schedule { section, limit } => {
            let rep = open(&root, &config)?;
            let limit = limit.unwrap_or(config.report.max_lines);
            for record in upcoming(&rep, section.into(), limit) {
                let triple = record.triple();
                println!(
                    "{}  {} {}  e={:.3} c={}",
                    format_due(triple.due),
                    record.key,
                    codec::BookMove::decode(record.raw_move),
                    triple.easiness,
                    triple.consecutive
                );
            }
        }
        Command::Comment { action } => {
            let mut rep = open(&root, &config)?;
            match action {
                CommentAction::Get { fen } => {
                    let pos = parse_fen(&fen)?;
                    match rep.get_comment(&pos) {
                        Some(text) => println!("{}", text),
                        None => println!("no comment"),
                    }
                }
                CommentAction::Set { fen, text } => {
                    let pos = parse_fen(&fen)?;
                    rep.set_comment(&pos, &text)?;
                    rep.flush()?;
                }
                CommentAction::Remove { fen } => {
                    let pos = parse_fen(&fen)?;
                    if !rep.remove_comment(&pos)? {
                        bail!("no comment stored for {}", PositionKey::of(&pos));
                    }
                    rep.flush()?;
                }
            }
        }
        Command::Initial { fen } => {
            let mut rep = open(&root, &config)?;
            match fen {
                Some(fen) => {
                    if rep.initial_positions_mut().add(&fen)? {
                        rep.flush()?;
                        println!("added");
                    } else {
                        println!("already present");
                    }
                }
                None => {
                    for (key, fen) in rep.initial_positions().iter() {
                        println!("{}  {}", key, fen);
                    }
                }
            }
        }
        Command::Export { fen, section } => {
            let rep = open(&root, &config)?;
            let start = position(fen.as_deref())?;
            let tree = export_subtree(&rep, section.into(), &start, &[])?;
            print_lines(&tree);
        }
    }
    Ok(())
}

fn print_lines(tree: &MoveTree) {
    for line in tree.lines().into_iter().filter(|l| !l.is_empty()) {
        let moves: Vec<String> = line.iter().map(codec::to_uci).collect();
        println!("{}", moves.join(" "));
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
