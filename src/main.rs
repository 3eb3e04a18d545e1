//! CLI tool to check, format and query Lua source files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use luapls::{FileTable, NodeRef, ParsedFile, Position, render};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "luapls", about = "Check, format and query Lua source files")]
struct Cli {
    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report syntax errors
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print files in canonical form
    Fmt {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the innermost node at a position and its ancestors
    NodeAt {
        file: PathBuf,
        /// 1-based position as LINE:COL
        #[arg(value_parser = parse_position)]
        position: Position,
    },
    /// List the locals visible at a position
    Locals {
        file: PathBuf,
        /// 1-based position as LINE:COL
        #[arg(value_parser = parse_position)]
        position: Position,
        /// Include a declaration the position is touching
        #[arg(long)]
        include_self: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let table = FileTable::new();
    let ok = match cli.command {
        Command::Check { files } => files.iter().fold(true, |ok, path| {
            load(&table, path).is_some_and(|file| check(path, &file)) && ok
        }),
        Command::Fmt { files } => files.iter().fold(true, |ok, path| {
            load(&table, path).is_some_and(|file| fmt(path, &file)) && ok
        }),
        Command::NodeAt { file, position } => {
            load(&table, &file).is_some_and(|parsed| node_at(&parsed, position))
        }
        Command::Locals {
            file,
            position,
            include_self,
        } => load(&table, &file)
            .is_some_and(|parsed| locals(&parsed, position, include_self)),
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "luapls=info",
        1 => "luapls=debug",
        _ => "luapls=trace",
    }
}

fn parse_position(s: &str) -> Result<Position, String> {
    let (line, column) = s
        .split_once(':')
        .ok_or_else(|| format!("expected LINE:COL, got '{s}'"))?;
    let line = line
        .parse::<usize>()
        .map_err(|e| format!("invalid line '{line}': {e}"))?;
    let column = column
        .parse::<usize>()
        .map_err(|e| format!("invalid column '{column}': {e}"))?;
    if line == 0 || column == 0 {
        return Err("line and column are 1-based".to_string());
    }
    Ok(Position::new(line, column))
}

fn load(table: &FileTable, path: &Path) -> Option<std::sync::Arc<ParsedFile>> {
    match fs::read_to_string(path) {
        Ok(source) => {
            debug!(path = %path.display(), bytes = source.len(), "read file");
            Some(table.put(path.display().to_string(), source))
        }
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            None
        }
    }
}

fn check(path: &Path, file: &ParsedFile) -> bool {
    if file.errors.is_empty() {
        eprintln!(
            "{}: ok ({} statement(s))",
            path.display(),
            file.block.stmts.len()
        );
        return true;
    }
    for error in &file.errors {
        eprintln!(
            "{}:{}: {}",
            path.display(),
            error.position,
            error.kind
        );
    }
    false
}

fn fmt(path: &Path, file: &ParsedFile) -> bool {
    if let Some(error) = file.errors.first() {
        eprintln!("{}: {error}", path.display());
        return false;
    }
    let mut out = render(NodeRef::Block(&file.block));
    if !out.is_empty() {
        out.push('\n');
    }
    print!("{out}");
    true
}

fn node_at(file: &ParsedFile, position: Position) -> bool {
    let path = file.node_at_position(position);
    let Some(node) = path.node else {
        info!(%position, "no node at position");
        println!("no node at {position}");
        return true;
    };
    for (depth, parent) in path.parents.iter().enumerate() {
        println!("{}{} {}", "  ".repeat(depth), parent.kind_name(), parent.span());
    }
    println!(
        "{}{} {}: {}",
        "  ".repeat(path.parents.len()),
        node.kind_name(),
        node.span(),
        render(node)
    );
    true
}

fn locals(file: &ParsedFile, position: Position, include_self: bool) -> bool {
    let locals = file.locals_at_position(position, include_self);
    debug!(%position, count = locals.len(), "resolved locals");
    for (name, ident) in &locals {
        println!("{name} {}", file.line_index.position(ident.span.start));
    }
    true
}
