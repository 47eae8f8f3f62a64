//! Desktop viewer: webcam pose estimation with skeleton overlay.
//!
//! Mounts the capture/infer/render pipeline with the OpenCV camera and the
//! ONNX pose model, then presents the shared surface in a minifb window.
//! ESC to exit.

use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;

use pose_overlay::camera::{FrameSource, OpenCvSource};
use pose_overlay::config::Config;
use pose_overlay::model::{OnnxPoseModel, PoseModel};
use pose_overlay::pipeline::{self, LoopState};
use pose_overlay::render::OverlayWindow;

const CONFIG_PATH: &str = "config.toml";

// ---------------------------------------------------------------------------
// Logging (console + timestamped file under logs/)
// ---------------------------------------------------------------------------

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/viewer_{}.log", ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }};
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let logfile = open_log_file()?;

    log!(logfile, "Overlay Viewer ({})", env!("GIT_VERSION"));
    log!(
        logfile,
        "[config] camera={} {}x{} mirror={}",
        config.capture.camera_index,
        config.capture.width,
        config.capture.height,
        config.capture.mirror
    );
    log!(
        logfile,
        "[config] model={:?} stride={} input={}x{} path={}",
        config.model.architecture,
        config.model.output_stride,
        config.model.input_width,
        config.model.input_height,
        config.model.model_path
    );
    log!(
        logfile,
        "[config] thresholds pose={} part={}, target_fps={}",
        config.render.min_pose_confidence,
        config.render.min_part_confidence,
        config.app.target_fps
    );
    log!(logfile, "Press ESC to exit");

    let target_fps = config.app.target_fps;
    let window_width = config.capture.width as usize;
    let window_height = config.capture.height as usize;

    // 毎秒のFPSと平均スコアをオブザーバで計測
    let pose_count = Arc::new(AtomicU32::new(0));
    let score_milli = Arc::new(AtomicU32::new(0));
    let observer = {
        let pose_count = Arc::clone(&pose_count);
        let score_milli = Arc::clone(&score_milli);
        Box::new(move |pose: &pose_overlay::pose::Pose| {
            pose_count.fetch_add(1, Ordering::Relaxed);
            score_milli.store((pose.score * 1000.0) as u32, Ordering::Relaxed);
        })
    };

    let mut handle = pipeline::mount(
        config,
        Box::new(|capture| {
            OpenCvSource::acquire(capture).map(|s| Box::new(s) as Box<dyn FrameSource>)
        }),
        Box::new(|model| OnnxPoseModel::load(model).map(|m| Box::new(m) as Box<dyn PoseModel>)),
        Some(observer),
    );

    let mut window = OverlayWindow::new("Pose Overlay", window_width, window_height, target_fps)?;
    let surface = handle.surface();
    let mut fps_timer = Instant::now();

    while window.is_open() {
        match handle.state() {
            LoopState::Failed(reason) => {
                log!(logfile, "[pipeline] failed: {}", reason);
                break;
            }
            LoopState::Stopped => break,
            _ => {}
        }

        {
            let surface = surface.lock().unwrap();
            window.present(&surface)?;
        }

        if fps_timer.elapsed() >= Duration::from_secs(1) {
            let fps = pose_count.swap(0, Ordering::Relaxed);
            let score = score_milli.load(Ordering::Relaxed) as f32 / 1000.0;
            log!(logfile, "[fps] {} (pose score {:.2})", fps, score);
            fps_timer = Instant::now();
        }
    }

    log!(logfile, "Shutting down...");
    handle.unmount();
    Ok(())
}
