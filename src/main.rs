use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::bounded;
use lottie_core::{EngineConfig, NodeId, RecordingRenderer, Scene, Snapshot, TrimMode, Tree};
use lottie_svg::render_svg;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

/// Snapshots in flight between the logic and render threads.
const PIPELINE_DEPTH: usize = 4;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Force every trim path into one mode (simultaneous or individual)
    #[arg(long, global = true)]
    trim_mode: Option<TrimMode>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the node tree and the render calls of one frame
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Frame to evaluate; defaults to the document's in point
        #[arg(long)]
        frame: Option<f32>,
    },
    /// Export frames as SVG documents
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory
        #[arg(long, value_name = "DIR")]
        out: PathBuf,

        /// First frame, inclusive
        #[arg(long)]
        from: Option<i32>,

        /// Last frame, inclusive
        #[arg(long)]
        to: Option<i32>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(level).into())
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // The command line wins over the environment.
    let config = EngineConfig::from_env().with_trim_mode(cli.trim_mode);

    match cli.command {
        Command::Inspect { file, frame } => {
            let mut scene = load_scene(&file, &config)?;
            if let Some(frame) = frame {
                scene.update_properties(frame);
            }
            let stdout = io::stdout();
            inspect(&scene, &mut stdout.lock())?;
        }
        Command::Render {
            file,
            out,
            from,
            to,
        } => {
            let scene = load_scene(&file, &config)?;
            let (first, last) = frame_range(&scene, from, to)?;
            info!(first, last, out = %out.display(), "Rendering frames");
            let written = render_frames(scene, &out, first, last)?;
            info!(written, "Render complete");
        }
    }
    Ok(())
}

fn load_scene(path: &Path, config: &EngineConfig) -> Result<Scene> {
    info!(file = %path.display(), "Loading animation");
    Scene::from_path(path, config).with_context(|| format!("Failed to load {}", path.display()))
}

/// Requested range clamped to the document's `[ip, op)` frames.
fn frame_range(scene: &Scene, from: Option<i32>, to: Option<i32>) -> Result<(i32, i32)> {
    let info = scene.info();
    let first_frame = info.in_point.ceil() as i32;
    let last_frame = (info.out_point.ceil() as i32 - 1).max(first_frame);
    let first = from.unwrap_or(first_frame).max(first_frame);
    let last = to.unwrap_or(last_frame).min(last_frame);
    if first > last {
        bail!("Empty frame range {}..={}", first, last);
    }
    Ok((first, last))
}

fn inspect(scene: &Scene, out: &mut impl Write) -> Result<()> {
    let info = scene.info();
    writeln!(
        out,
        "{} {}x{} @ {} fps, frames {}..{}",
        info.name.as_deref().unwrap_or("<unnamed>"),
        info.width,
        info.height,
        info.frame_rate,
        info.in_point,
        info.out_point
    )?;
    writeln!(out, "frame {}", scene.frame())?;

    let tree = scene.tree();
    for &child in tree.children(tree.root()) {
        write_node(tree, child, 0, out)?;
    }

    let mut recorder = RecordingRenderer::new();
    scene.render(&mut recorder);
    writeln!(out, "calls")?;
    for call in &recorder.calls {
        writeln!(out, "  {} {} {:?}", call.method, call.node, call.trimming)?;
    }
    Ok(())
}

fn write_node(tree: &Tree, id: NodeId, depth: usize, out: &mut impl Write) -> io::Result<()> {
    let Some(node) = tree.get(id) else {
        return Ok(());
    };
    let hidden = if node.hidden { " hidden" } else { "" };
    writeln!(
        out,
        "{:indent$}{} [{:?}]{}",
        "",
        node.name,
        node.node_type(),
        hidden,
        indent = depth * 2
    )?;
    if let Some(layer) = node.as_layer() {
        for &effect in layer.effects() {
            write_node(tree, effect, depth + 1, out)?;
        }
    }
    for &child in tree.children(id) {
        write_node(tree, child, depth + 1, out)?;
    }
    Ok(())
}

/// Evaluates frames on a logic thread and writes them from this one. Returns
/// the number of files written.
fn render_frames(scene: Scene, out_dir: &Path, first: i32, last: i32) -> Result<usize> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let (tx, rx) = bounded::<Snapshot>(PIPELINE_DEPTH);
    let logic = thread::spawn(move || {
        let mut scene = scene;
        for frame in first..=last {
            scene.update_properties(frame as f32);
            if tx.send(scene.snapshot()).is_err() {
                break;
            }
        }
    });

    let mut written = 0;
    for snapshot in rx.iter() {
        let path = out_dir.join(format!("frame_{:05}.svg", snapshot.frame() as i32));
        fs::write(&path, render_svg(&snapshot))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }

    logic.join().map_err(|_| anyhow!("Logic thread panicked"))?;
    Ok(written)
}
