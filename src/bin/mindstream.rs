//! mindstream CLI: live transcript to mind map, with an MCP server.
//!
//! Usage:
//!   mindstream mcp [--transport stdio]
//!   mindstream run <session> [FILE] [--mode fixed|planned]
//!   mindstream show <session> [--outline]
//!   mindstream sessions
//!   mindstream parse [FILE] [--strict]
//!
//! Global flags: --config <yaml> (env MINDSTREAM_CONFIG), --db <path>.

use clap::{Parser, Subcommand, ValueEnum};
use mindstream::{
    CommandBackend, Config, MindstreamApi, OpenStore, ParserChain, PipelineMode, SqliteStore,
    TranscriptPayload,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mindstream",
    version,
    about = "Turn a live transcript into an evolving mind map"
)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true, env = "MINDSTREAM_CONFIG")]
    config: Option<PathBuf>,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP (Model Context Protocol) server
    Mcp {
        /// Transport type (currently only stdio)
        #[arg(long, default_value = "stdio")]
        transport: String,
    },
    /// Append transcript chunks to a session and run the pipeline
    Run {
        /// Session id
        session: String,
        /// JSON chunks ({"chunks": [...]} or a bare array); stdin if omitted
        input: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ModeArg::Fixed)]
        mode: ModeArg,
    },
    /// Print a session's persisted map
    Show {
        /// Session id
        session: String,
        /// Print an indented outline instead of JSON
        #[arg(long)]
        outline: bool,
    },
    /// List sessions with a persisted map
    Sessions,
    /// Run the parser chain over raw backend output (no backend call)
    Parse {
        /// File with the raw text; stdin if omitted
        input: Option<PathBuf>,
        /// Fail instead of producing a stub map
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Fixed,
    Planned,
}

impl From<ModeArg> for PipelineMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fixed => PipelineMode::Fixed,
            ModeArg::Planned => PipelineMode::Planned,
        }
    }
}

/// Get the default database path (~/.local/share/mindstream/mindstream.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("mindstream").join("mindstream.db")
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mindstream=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => Config::load(path).map_err(|e| e.to_string()),
        None => Ok(Config::default()),
    }
}

fn read_input(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(text)
        }
    }
}

fn open_api(config: &Config, db_path: &Path) -> Result<MindstreamApi, String> {
    let store = SqliteStore::open(db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    let backend = CommandBackend::from_argv(&config.backend.command).map_err(|e| e.to_string())?;
    Ok(MindstreamApi::new(Arc::new(backend), Arc::new(store), config))
}

fn with_api(config: &Config, db_path: &Path, f: impl FnOnce(&MindstreamApi) -> i32) -> i32 {
    match open_api(config, db_path) {
        Ok(api) => f(&api),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_run(api: &MindstreamApi, session: &str, input: Option<&Path>, mode: ModeArg) -> i32 {
    let text = match read_input(input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let chunks = match serde_json::from_str::<TranscriptPayload>(&text) {
        Ok(payload) => payload.into_chunks(),
        Err(e) => {
            eprintln!("Error: invalid chunk JSON: {}", e);
            return 1;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    match rt.block_on(api.run_pipeline(session, chunks, mode.into())) {
        Ok(run) => print_json(&run),
        Err(failure) => {
            eprintln!("Error: {}", failure);
            print_json(&failure);
            1
        }
    }
}

fn cmd_show(api: &MindstreamApi, session: &str, outline: bool) -> i32 {
    match api.session_map(session) {
        Ok(map) if outline => {
            print!("{}", map.to_outline());
            0
        }
        Ok(map) => print_json(&map),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_sessions(api: &MindstreamApi) -> i32 {
    match api.list_sessions() {
        Ok(ids) if ids.is_empty() => {
            println!("No sessions found.");
            0
        }
        Ok(ids) => {
            for id in ids {
                println!("{}", id);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_parse(config: &Config, input: Option<&Path>, strict: bool) -> i32 {
    let text = match read_input(input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let policy = config.parser.dangling_parent;
    let chain = if strict || config.parser.strict {
        ParserChain::strict(policy)
    } else {
        ParserChain::new(policy)
    };
    match chain.parse(&text) {
        Ok(outcome) => print_json(&outcome),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let db_path = cli
        .db
        .or_else(|| config.storage.path.clone())
        .unwrap_or_else(default_db_path);

    let code = match cli.command {
        Commands::Mcp { transport } => {
            if transport != "stdio" {
                eprintln!("error: only 'stdio' transport is currently supported");
                std::process::exit(1);
            }
            mindstream::mcp::run_mcp_server(&config, &db_path)
        }
        Commands::Parse { input, strict } => cmd_parse(&config, input.as_deref(), strict),
        Commands::Run {
            session,
            input,
            mode,
        } => with_api(&config, &db_path, |api| {
            cmd_run(api, &session, input.as_deref(), mode)
        }),
        Commands::Show { session, outline } => {
            with_api(&config, &db_path, |api| cmd_show(api, &session, outline))
        }
        Commands::Sessions => with_api(&config, &db_path, cmd_sessions),
    };
    std::process::exit(code);
}
