use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{debug, info, warn};
use serde::Deserialize;

use depthmesh::{
    capture::{
        CaptureEvent, CaptureState, CaptureWorkflow, Cue, CuePlayer, Exporter,
        PlyExporter, export_mesh, worker::ExportWorker,
    },
    config::{CaptureConfig, ClipRange, EmptyMeshPolicy},
    mesh::{Mesh, PlyFormat},
    source::{DepthFrame, Pinhole, SampleSource},
};

mod input;

/// Reconstructs meshes from depth images and captures them to PLY files
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    #[clap(flatten)]
    input: InputSettings,

    /// JSON settings file; flags given on the command line take priority
    #[clap(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Reconstruct a single frame and write it to a `.ply` file
    Mesh {
        /// Name of a `.ply` file to write
        #[clap(short, long)]
        out: PathBuf,

        /// Output encoding
        #[clap(short, long, value_enum)]
        format: Option<Format>,

        /// Number of times to reconstruct (for benchmarking)
        #[clap(short = 'N', default_value_t = 1)]
        n: usize,
    },

    /// Run a live frame loop and capture a frame after a countdown
    Capture {
        #[clap(flatten)]
        settings: CaptureSettings,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum Format {
    Ascii,
    Binary,
}

impl From<Format> for PlyFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Ascii => PlyFormat::Ascii,
            Format::Binary => PlyFormat::BinaryLittleEndian,
        }
    }
}

#[derive(Parser)]
struct InputSettings {
    /// 16-bit depth image, in millimeters
    #[clap(short, long, required_unless_present = "synthetic")]
    depth: Option<PathBuf>,

    /// RGB image registered to the depth image
    #[clap(long, requires = "depth")]
    color: Option<PathBuf>,

    /// Use a synthetic hemisphere instead of a depth image
    #[clap(long, conflicts_with = "depth")]
    synthetic: bool,

    /// Near clip distance
    #[clap(long)]
    near: Option<u32>,

    /// Far clip distance
    #[clap(long)]
    far: Option<u32>,

    /// Clamp clip distances to their usual ranges
    #[clap(long)]
    clamp: bool,

    /// Focal length along X, in pixels
    #[clap(long)]
    fx: Option<f32>,

    /// Focal length along Y, in pixels
    #[clap(long)]
    fy: Option<f32>,

    /// Principal point X, in pixels
    #[clap(long)]
    cx: Option<f32>,

    /// Principal point Y, in pixels
    #[clap(long)]
    cy: Option<f32>,
}

#[derive(Parser)]
struct CaptureSettings {
    /// Frame rate of the update loop
    #[clap(long, default_value_t = 30)]
    fps: u32,

    /// Countdown before the capture
    #[clap(long)]
    countdown: Option<u32>,

    /// Delay between countdown steps, in milliseconds
    #[clap(long)]
    delay_ms: Option<u64>,

    /// Countdown after the capture
    #[clap(long)]
    cooldown: Option<u32>,

    /// Directory in which to write captures
    #[clap(short, long)]
    out_dir: Option<PathBuf>,

    /// Output encoding
    #[clap(short, long, value_enum)]
    format: Option<Format>,

    /// Keep retrying if the mesh is empty when the countdown ends
    #[clap(long)]
    retry: bool,

    /// Write the capture file on a background thread
    #[clap(long)]
    background: bool,

    /// Give up after this many seconds
    #[clap(long, default_value_t = 60)]
    timeout: u64,
}

/// Settings loaded from `--config`
#[derive(Default, Deserialize)]
#[serde(default)]
struct Settings {
    clip: ClipRange,
    camera: Pinhole,
    capture: CaptureConfig,
}

impl Settings {
    fn load(args: &Args) -> Result<Self> {
        let mut s = match &args.config {
            Some(path) => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("could not open {path:?}"))?;
                serde_json::from_reader(std::io::BufReader::new(file))
                    .with_context(|| format!("could not parse {path:?}"))?
            }
            None => Settings::default(),
        };

        let i = &args.input;
        s.clip.near = i.near.unwrap_or(s.clip.near);
        s.clip.far = i.far.unwrap_or(s.clip.far);
        if i.clamp {
            s.clip = s.clip.clamped();
        }
        s.camera.fx = i.fx.unwrap_or(s.camera.fx);
        s.camera.fy = i.fy.unwrap_or(s.camera.fy);
        s.camera.cx = i.cx.unwrap_or(s.camera.cx);
        s.camera.cy = i.cy.unwrap_or(s.camera.cy);

        if let Command::Capture { settings: c } = &args.cmd {
            let cfg = &mut s.capture;
            cfg.countdown = c.countdown.unwrap_or(cfg.countdown);
            cfg.step_delay_ms = c.delay_ms.unwrap_or(cfg.step_delay_ms);
            cfg.cooldown = c.cooldown.unwrap_or(cfg.cooldown);
            if let Some(dir) = &c.out_dir {
                cfg.output_dir = dir.clone();
            }
            if let Some(f) = c.format {
                cfg.format = f.into();
            }
            if c.retry {
                cfg.on_empty_mesh = EmptyMeshPolicy::Retry;
            }
        }
        Ok(s)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Spells out cues in the log, since we have no speakers
struct LogCues;

impl CuePlayer for LogCues {
    fn play(&mut self, cue: Cue) {
        match cue {
            Cue::Countdown => debug!("*beep*"),
            Cue::Shutter => debug!("*click*"),
        }
    }
}

fn load_source(input: &InputSettings, camera: &Pinhole) -> Result<DepthFrame> {
    let start = Instant::now();
    let frame = match &input.depth {
        Some(depth) => {
            input::load_frame(depth, input.color.as_deref(), camera)?
        }
        None => input::synthetic_frame(640, 480, camera),
    };
    info!("Loaded frame in {:?}", start.elapsed());
    Ok(frame)
}

fn run_capture<E: Exporter>(
    source: &DepthFrame,
    clip: ClipRange,
    config: CaptureConfig,
    exporter: E,
    settings: &CaptureSettings,
) -> Result<usize> {
    let frame_time = Duration::from_secs(1) / settings.fps.max(1);
    let timeout = Duration::from_secs(settings.timeout);

    let mut capture = CaptureWorkflow::with_cues(config, exporter, LogCues);
    let mut mesh = Mesh::new();
    let mut saved = 0;
    let mut attempted = false;
    let mut label = None;

    let start = Instant::now();
    capture.trigger(start);
    loop {
        let now = Instant::now();
        mesh.rebuild(source, clip);
        if let Some(event) = capture.tick(now, &mut mesh) {
            attempted = true;
            match event {
                CaptureEvent::Saved(_) => saved += 1,
                CaptureEvent::Failed(e) => warn!("capture failed: {e}"),
            }
        }

        let state = capture.state();
        if state.countdown_label() != label {
            label = state.countdown_label();
            if let Some(n) = label {
                info!(
                    "{n}... (verts: {} | faces: {})",
                    mesh.vertex_count(),
                    mesh.face_count()
                );
            }
        }

        let busy = capture.exporter().busy();
        let settled = matches!(
            state,
            CaptureState::Idle | CaptureState::JustSaved(_)
        );
        if attempted && settled && !busy {
            break;
        }
        if start.elapsed() > timeout {
            warn!("timed out after {timeout:?}");
            break;
        }
        std::thread::sleep(frame_time.saturating_sub(now.elapsed()));
    }
    Ok(saved)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args)?;
    let source = load_source(&args.input, &settings.camera)?;
    info!(
        "Clipping to {}..={} (frame is {}x{})",
        settings.clip.near,
        settings.clip.far,
        source.width(),
        source.height(),
    );

    match args.cmd {
        Command::Mesh { out, format, n } => {
            let n = n.max(1);
            let start = Instant::now();
            let mut mesh = Mesh::new();
            for _ in 0..n {
                mesh.rebuild(&source, settings.clip);
            }
            info!(
                "Reconstructed {} faces in {:?} ({n} runs)",
                mesh.face_count(),
                start.elapsed() / n as u32
            );
            if !mesh.has_cloud() {
                anyhow::bail!("no vertices in mesh; skipping save");
            }

            let format =
                format.map(PlyFormat::from).unwrap_or(settings.capture.format);
            info!("Writing PLY to {out:?}");
            let mut exporter = PlyExporter::new(format);
            if let Some(r) = export_mesh(&mut exporter, &out, &mut mesh)? {
                info!(
                    "Saved {:?} verts={} indices={}",
                    r.path, r.vertex_count, r.index_count
                );
            }
        }
        Command::Capture { settings: c } => {
            let config = settings.capture.clone();
            let saved = if c.background {
                let worker = ExportWorker::spawn(config.format)?;
                run_capture(&source, settings.clip, config, worker, &c)?
            } else {
                let exporter = PlyExporter::new(config.format);
                run_capture(&source, settings.clip, config, exporter, &c)?
            };
            if saved == 0 {
                anyhow::bail!("no capture was saved");
            }
        }
    }

    Ok(())
}
