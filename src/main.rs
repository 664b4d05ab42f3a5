use clap::Parser;
use log::{error, info};
use motion_viewer::{
    anim::{bvh, AnimError, SkeletalAnimator},
    boss::Boss,
    config::ViewerConfig,
    mv_error::MvError,
};
use std::path::PathBuf;
use winit::event_loop::EventLoop;

/// View a BVH motion capture recording, or export part of it
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// BVH file to load
    bvh: PathBuf,

    /// YAML viewer settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a frame range to this file instead of opening a window
    #[arg(long, value_name = "OUT")]
    export: Option<PathBuf>,

    /// First exported frame, counted from 0
    #[arg(long, requires = "export")]
    from: Option<usize>,

    /// Last exported frame, inclusive
    #[arg(long, requires = "export")]
    to: Option<usize>,

    /// Keep position channels on every joint, not only the roots
    #[arg(long, requires = "export")]
    all_positions: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), MvError> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    let (skeleton, motion) = bvh::load(&args.bvh)?;
    let mut animator = SkeletalAnimator::new(
        skeleton,
        motion,
        config.timeline_fps,
        config.interpolation,
    )?;

    if let Some(out) = &args.export {
        let total = animator.cursor().total();
        let start = args.from.unwrap_or(0);
        let end = args.to.unwrap_or(total - 1);
        if start > end || end >= total {
            return Err(AnimError::InvalidRange { start, end, total }.into());
        }
        let cursor = animator.cursor_mut();
        cursor.set_loop_end(end);
        cursor.set_loop_start(start);
        let text = animator.export_loop(args.all_positions)?;
        std::fs::write(out, text)?;
        info!("Exported frames {}..={} to {}", start, end, out.display());
        return Ok(());
    }

    if let Some(name) = args.bvh.file_name() {
        config.window.title = format!(
            "{} - {}",
            config.window.title,
            name.to_string_lossy()
        );
    }
    let event_loop = EventLoop::new();
    let boss = Boss::new(&event_loop, &config, animator)?;
    boss.run(event_loop)
}
