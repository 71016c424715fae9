use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use avatar_stage::{
    BoneMap, HeadlessRenderer, LoadReport, StageConfig, StageSession, StageSnapshot,
    load_native_clip, load_rig, load_source_clip, retarget_mapped, retarget_native,
};

#[derive(Parser, Debug)]
#[command(name = "avatar-stage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a stage headlessly with scripted triggers and print a JSON trace.
    Simulate(SimulateArgs),
    /// Retarget one clip onto a rig and write the result as JSON.
    Retarget(RetargetArgs),
    /// Load a stage and report which actions are usable.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Stage configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Simulated duration in seconds.
    #[arg(long, default_value_t = 5.0)]
    seconds: f32,

    /// Frames per second of the simulated display.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Trigger `NAME` at `SECONDS`, written `SECONDS:NAME`. Repeatable.
    #[arg(long = "trigger", value_parser = parse_trigger)]
    triggers: Vec<Trigger>,

    /// Record every Nth frame.
    #[arg(long, default_value_t = 6)]
    every: u64,

    /// Write the trace here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RetargetArgs {
    /// Rig asset (`.json`, `.gltf`, `.glb`, `.vrm`).
    #[arg(long)]
    rig: PathBuf,

    /// Clip to retarget.
    #[arg(long)]
    clip: PathBuf,

    /// The clip already uses humanoid bone names.
    #[arg(long)]
    native: bool,

    /// JSON object of extra `source bone -> humanoid bone` entries.
    #[arg(long)]
    bone_map: Option<PathBuf>,

    /// Output clip JSON.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Stage configuration JSON.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Clone, Debug)]
struct Trigger {
    at: f32,
    action: String,
}

fn parse_trigger(s: &str) -> Result<Trigger, String> {
    let (at, action) = s
        .split_once(':')
        .ok_or_else(|| format!("expected SECONDS:NAME, got '{s}'"))?;
    let at: f32 = at
        .trim()
        .parse()
        .map_err(|e| format!("invalid trigger time '{at}': {e}"))?;
    if !at.is_finite() || at < 0.0 {
        return Err(format!("trigger time must be >= 0, got {at}"));
    }
    let action = action.trim();
    if action.is_empty() {
        return Err("trigger action name is empty".to_owned());
    }
    Ok(Trigger {
        at,
        action: action.to_owned(),
    })
}

#[derive(serde::Serialize)]
struct Trace {
    report: LoadReport,
    triggers: Vec<TriggerOutcome>,
    frames: Vec<StageSnapshot>,
}

#[derive(serde::Serialize)]
struct TriggerOutcome {
    at: f32,
    action: String,
    accepted: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Simulate(args) => cmd_simulate(args),
        Command::Retarget(args) => cmd_retarget(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn open_session(config_path: &Path) -> anyhow::Result<StageSession> {
    let config = StageConfig::from_path(config_path)
        .with_context(|| format!("load stage config '{}'", config_path.display()))?;
    let root = StageConfig::asset_root(config_path);
    let mut session = StageSession::new(config, root, Box::new(HeadlessRenderer::keep_last(1)))?;
    session.load();
    Ok(session)
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    if args.fps == 0 {
        anyhow::bail!("--fps must be > 0");
    }
    if !args.seconds.is_finite() || args.seconds < 0.0 {
        anyhow::bail!("--seconds must be >= 0");
    }
    let every = args.every.max(1);
    let dt = 1.0 / args.fps as f32;
    let total = (args.seconds * args.fps as f32).round() as u64;

    let mut session = open_session(&args.config)?;
    let mut triggers = args.triggers;
    triggers.sort_by(|a, b| a.at.total_cmp(&b.at));
    let mut pending = triggers.into_iter().peekable();

    let mut outcomes = Vec::new();
    let mut frames = Vec::new();
    for frame in 0..total {
        let now = frame as f32 * dt;
        while let Some(t) = pending.next_if(|t| t.at <= now) {
            let accepted = session.play_action(&t.action);
            outcomes.push(TriggerOutcome {
                at: now,
                action: t.action,
                accepted,
            });
        }
        session.tick(dt);
        if (frame + 1) % every == 0 || frame + 1 == total {
            frames.push(session.snapshot());
        }
    }
    session.dispose();

    let trace = Trace {
        report: session.report().clone(),
        triggers: outcomes,
        frames,
    };
    write_json(&trace, args.out.as_deref())
}

fn cmd_retarget(args: RetargetArgs) -> anyhow::Result<()> {
    let rig = load_rig(&args.rig).with_context(|| format!("load rig '{}'", args.rig.display()))?;

    let clip = if args.native {
        let clip = load_native_clip(&args.clip)
            .with_context(|| format!("load clip '{}'", args.clip.display()))?;
        retarget_native(&clip, &rig)?
    } else {
        let source = load_source_clip(&args.clip)
            .with_context(|| format!("load clip '{}'", args.clip.display()))?;
        let overrides: BTreeMap<String, String> = match &args.bone_map {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read bone map '{}'", path.display()))?;
                serde_json::from_str(&text).with_context(|| "parse bone map JSON")?
            }
            None => BTreeMap::new(),
        };
        let map = BoneMap::mixamo().with_overrides(&overrides);
        retarget_mapped(&source, &map, &rig)?
    };

    eprintln!(
        "retargeted '{}': {} tracks, {:.3}s",
        clip.name,
        clip.tracks.len(),
        clip.duration
    );
    write_json(&clip, Some(&args.out))
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.config)?;
    let report = session.report().clone();
    session.dispose();
    write_json(&report, None)?;
    if report.usable_actions() == 0 {
        anyhow::bail!("no usable actions");
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            let f = std::fs::File::create(path)
                .with_context(|| format!("create '{}'", path.display()))?;
            serde_json::to_writer_pretty(f, value)
                .with_context(|| format!("write '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), value).context("write stdout")?;
            println!();
        }
    }
    Ok(())
}
