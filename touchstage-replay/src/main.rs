use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use touchstage_core::EngineConfig;

mod replay;
mod script;

use replay::{ElementSummary, Replay};
use script::Script;

/// Touchstage Replay - run a pointer event script against a stage
#[derive(Parser, Debug)]
#[command(name = "touchstage-replay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script with the stage elements and pointer events (JSON)
    script: PathBuf,

    /// Engine config file (defaults to config.json in the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print each output record
    #[arg(long)]
    pretty: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("touchstage-replay: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        // An explicitly named config must load
        Some(path) => EngineConfig::try_load(path)?,
        None => default_config_path()
            .map(|path| EngineConfig::load(&path))
            .unwrap_or_default(),
    };

    let script = Script::load(&args.script)?;
    let base_dir = args.script.parent().unwrap_or_else(|| Path::new("."));
    let stage = script.build_stage(base_dir)?;
    log::info!(
        "Replaying {} events against {} elements",
        script.events.len(),
        stage.len()
    );

    let mut replay = Replay::new(stage, config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for record in replay.run(&script) {
        write_record(&mut out, &record, args.pretty)?;
    }

    #[derive(Serialize)]
    struct Summary {
        elements: Vec<ElementSummary>,
    }
    let summary = Summary {
        elements: replay.finish(),
    };
    write_record(&mut out, &summary, args.pretty)?;

    Ok(())
}

fn write_record<W: Write, T: Serialize>(out: &mut W, record: &T, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let json = if pretty {
        serde_json::to_string_pretty(record)?
    } else {
        serde_json::to_string(record)?
    };
    writeln!(out, "{}", json)?;
    Ok(())
}

/// Per-user config location
fn default_config_path() -> Option<PathBuf> {
    use directories::ProjectDirs;

    let proj_dirs = ProjectDirs::from("", "", "touchstage")?;
    Some(proj_dirs.config_dir().join("config.json"))
}
