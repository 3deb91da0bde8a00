//! Headless marble course runner.
//!
//! Builds the demo course, plays it with scripted input and prints a JSON
//! summary to stdout. Logs go to stderr.
//!
//! Run from repo root:
//!   `cargo run -p marble-run`                              - defaults
//!   `cargo run -p marble-run -- physics.json`              - physics config from file
//!   `cargo run -p marble-run -- --frames 1200 --balls 8`   - longer, busier run
//!   `RUST_LOG=marble_bind=debug cargo run -p marble-run`   - log every reaction

mod course;

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use marble_bind::BindError;
use marble_physics::PhysicsConfig;

use crate::course::Course;

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("bad argument: {0}")]
    Usage(String),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Command line options.
#[derive(Debug)]
struct Options {
    config: Option<PathBuf>,
    frames: u32,
    balls: usize,
    /// Seconds per rendered frame.
    frame_time: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: None,
            frames: 600,
            balls: 4,
            frame_time: 1.0 / 60.0,
        }
    }
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, RunError> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| RunError::Usage(format!("{name} needs a value")))
            };
            match arg.as_str() {
                "--frames" => options.frames = number(&value("--frames")?)?,
                "--balls" => options.balls = number(&value("--balls")?)?,
                "--frame-time" => options.frame_time = number(&value("--frame-time")?)?,
                flag if flag.starts_with("--") => {
                    return Err(RunError::Usage(format!("unknown flag {flag}")));
                }
                path => options.config = Some(PathBuf::from(path)),
            }
        }
        Ok(options)
    }

    fn physics(&self) -> Result<PhysicsConfig, RunError> {
        let Some(path) = &self.config else {
            return Ok(PhysicsConfig::default());
        };
        let text = fs::read_to_string(path).map_err(|source| RunError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| RunError::Config {
            path: path.clone(),
            source,
        })
    }
}

fn number<T: std::str::FromStr>(text: &str) -> Result<T, RunError> {
    text.parse()
        .map_err(|_| RunError::Usage(format!("not a number: {text}")))
}

/// Final state of one node.
#[derive(Debug, Serialize)]
struct NodeSummary {
    name: String,
    tag: Option<String>,
    position: [f32; 3],
    awake: bool,
}

/// What the run did.
#[derive(Debug, Serialize)]
struct Summary {
    frames: u32,
    seconds: f32,
    substeps: u64,
    reactions: u64,
    cannon_fired: bool,
    hits: BTreeMap<String, usize>,
    balls: Vec<NodeSummary>,
}

fn run(options: &Options) -> Result<Summary, RunError> {
    let config = options.physics()?;
    info!(?config, "physics config");
    let mut course = Course::build(config, options.balls)?;

    let mut substeps = 0u64;
    let mut reactions = 0u64;
    for frame in 0..options.frames {
        let t = frame as f32 * options.frame_time;
        course.drive(t)?;
        let report = course.sim.step(options.frame_time)?;
        substeps += u64::from(report.substeps);
        reactions += report.reactions as u64;
    }

    let balls = course
        .balls
        .iter()
        .filter_map(|&body| {
            let node = course.sim.node_of(body)?;
            let visual = course.sim.scene().node(node)?;
            let world = course.sim.scene().world_transform(node).ok()?;
            Some(NodeSummary {
                name: visual.name.clone(),
                tag: visual.tag.as_ref().map(|t| t.to_string()),
                position: world.position.to_array(),
                awake: course.sim.world().body(body)?.is_awake(),
            })
        })
        .collect();

    let hits = course.tally.borrow().clone();
    Ok(Summary {
        frames: options.frames,
        seconds: options.frames as f32 * options.frame_time,
        substeps,
        reactions,
        cannon_fired: course.cannon_fired(),
        hits,
        balls,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = Options::parse(env::args().skip(1))
        .and_then(|options| run(&options))
        .and_then(|summary| Ok(serde_json::to_string_pretty(&summary)?));
    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
