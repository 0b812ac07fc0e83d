use clap::Parser;
use std::path::PathBuf;

use bids::hash::HashFunction;
use bids::id::ChunkId;
use bids::pass::PassId;
use bids::pipeline::{compute_build_info, run_pipeline, CompilationState};
use bids::snapshot::{GraphSnapshot, IdAssignments};

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    /// Module ids only (chunk pass skipped)
    ModuleIds,
    /// Module and chunk ids
    Ids,
    /// Fingerprint of the assigned ids plus build dependencies
    BuildInfo,
    /// Loaded graph summary, no passes run
    Graph,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum HashArg {
    Md4,
    Sha256,
    Sha512,
}

#[derive(Parser, Debug)]
#[command(
    name = "bids",
    version,
    about = "Bundler ID core — assigns stable module and chunk ids to a chunk graph snapshot"
)]
struct Cli {
    /// Graph snapshot (.json)
    snapshot: PathBuf,

    /// Build context directory (overrides the snapshot's)
    #[arg(long)]
    context: Option<String>,

    /// Rank chunks reachable from more initial chunk groups first
    #[arg(long)]
    prioritise_initial: bool,

    /// Digest used for module name suffixes
    #[arg(long, value_enum)]
    hash: Option<HashArg>,

    /// Chunk id that must not be assigned (repeatable)
    #[arg(long = "reserve")]
    reserve: Vec<u32>,

    /// Build dependency to record (repeatable)
    #[arg(long = "build-dependency")]
    build_dependency: Vec<String>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Ids)]
    emit: EmitStage,

    /// Print assignments as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Print passes and timing
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("bids=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!(snapshot = %cli.snapshot.display(), emit = ?cli.emit, "bids starting");

    // ── Load snapshot ──
    let source = match std::fs::read_to_string(&cli.snapshot) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("bids: error: {}: {}", cli.snapshot.display(), e);
            std::process::exit(2);
        }
    };
    let mut snapshot = match GraphSnapshot::from_json(&source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("bids: error: {}: {}", cli.snapshot.display(), e);
            std::process::exit(2);
        }
    };

    // ── Apply command-line overrides ──
    if let Some(context) = cli.context {
        snapshot.context = context;
    }
    if cli.prioritise_initial {
        snapshot.config.chunk_ids.prioritise_initial = true;
    }
    if let Some(hash) = cli.hash {
        snapshot.config.naming.hash_function = match hash {
            HashArg::Md4 => HashFunction::Md4,
            HashArg::Sha256 => HashFunction::Sha256,
            HashArg::Sha512 => HashFunction::Sha512,
        };
    }
    snapshot
        .config
        .used_chunk_ids
        .extend(cli.reserve.into_iter().map(ChunkId));

    let graph = match snapshot.to_graph() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("bids: error: {}: {}", cli.snapshot.display(), e);
            std::process::exit(2);
        }
    };

    if let EmitStage::Graph = cli.emit {
        print!("{}", graph);
        return;
    }

    let mut state = CompilationState::new(graph, snapshot.context, snapshot.config);
    state.add_build_dependencies(cli.build_dependency);

    // ── Run passes ──
    let terminal = match cli.emit {
        EmitStage::ModuleIds => PassId::ModuleIds,
        _ => PassId::ChunkIds,
    };
    let result = run_pipeline(&mut state, terminal, |_, diags| {
        for diag in diags {
            eprintln!("bids: {}", diag);
        }
    });
    if let Err(e) = result {
        eprintln!("bids: error: {}", e);
        std::process::exit(1);
    }

    // ── Emit ──
    match cli.emit {
        EmitStage::BuildInfo => match compute_build_info(&state).and_then(|info| info.to_json()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("bids: error: {}", e);
                std::process::exit(1);
            }
        },
        _ => {
            let assignments = IdAssignments::collect(&state.graph);
            if cli.json {
                match serde_json::to_string_pretty(&assignments) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("bids: error: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                print!("{}", assignments);
            }
        }
    }
}
