use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::{Frame, FrameSource};
use crate::config::CaptureConfig;
use crate::error::PipelineError;

/// 最初のフレーム到着をこれだけ待つ。超えたらアクセス拒否とみなす。
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// OpenCVを使用したカメラソース
///
/// 別スレッドでキャプチャを回し、最新フレームを保持する。
/// `acquire` は最初のフレームが読めるようになってから返るため、
/// 以降の `latest` は常に有効なピクセルを返す。
pub struct OpenCvSource {
    latest: Arc<Mutex<Option<Frame>>>,
    frame_id: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    width: u32,
    height: u32,
    handle: Option<thread::JoinHandle<()>>,
}

impl OpenCvSource {
    /// カメラを開いてキャプチャスレッドを開始する
    pub fn acquire(config: &CaptureConfig) -> Result<Self, PipelineError> {
        let mut capture = VideoCapture::new(config.camera_index, videoio::CAP_ANY)
            .map_err(|e| PipelineError::CameraUnavailable(e.to_string()))?;

        let opened = capture
            .is_opened()
            .map_err(|e| PipelineError::CameraUnavailable(e.to_string()))?;
        if !opened {
            return Err(PipelineError::CameraUnavailable(format!(
                "camera {} could not be opened",
                config.camera_index
            )));
        }

        // 解像度を要求（デバイスは無視してもよい）
        let _ = capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64);
        let _ = capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64);
        let _ = capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0);

        let width = capture
            .get(videoio::CAP_PROP_FRAME_WIDTH)
            .map_err(|e| PipelineError::CameraUnavailable(e.to_string()))? as u32;
        let height = capture
            .get(videoio::CAP_PROP_FRAME_HEIGHT)
            .map_err(|e| PipelineError::CameraUnavailable(e.to_string()))? as u32;

        let latest: Arc<Mutex<Option<Frame>>> = Arc::new(Mutex::new(None));
        let frame_id = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let latest_ref = Arc::clone(&latest);
        let frame_id_ref = Arc::clone(&frame_id);
        let running_ref = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let mut mat = Mat::default();
            while running_ref.load(Ordering::Relaxed) {
                match capture.read(&mut mat) {
                    Ok(true) if !mat.empty() => match mat_to_frame(&mat) {
                        Ok(frame) => {
                            *latest_ref.lock().unwrap() = Some(frame);
                            frame_id_ref.fetch_add(1, Ordering::Release);
                        }
                        Err(e) => {
                            eprintln!("[camera] frame convert error: {}", e);
                        }
                    },
                    Ok(_) => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(e) => {
                        eprintln!("[camera] read error: {}", e);
                        thread::sleep(Duration::from_millis(100));
                    }
                }
            }
            // ループ終了でVideoCaptureがdropされ、デバイスが解放される
        });

        let source = Self {
            latest,
            frame_id,
            running,
            width,
            height,
            handle: Some(handle),
        };

        // 最初のフレームが届くまで待つ。開けたのに映像が来ない場合は
        // OSレベルのアクセス拒否として扱う。
        let deadline = Instant::now() + FIRST_FRAME_TIMEOUT;
        while source.frame_id.load(Ordering::Acquire) == 0 {
            if Instant::now() >= deadline {
                Box::new(source).release();
                return Err(PipelineError::PermissionDenied);
            }
            thread::sleep(Duration::from_millis(10));
        }

        Ok(source)
    }
}

impl FrameSource for OpenCvSource {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    fn latest(&self) -> Option<Frame> {
        self.latest.lock().unwrap().clone()
    }

    fn release(mut self: Box<Self>) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// BGR Mat を 0RGB packed の Frame に変換
fn mat_to_frame(mat: &Mat) -> opencv::Result<Frame> {
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    let mut frame = Frame::new(width, height);

    for y in 0..mat.rows() {
        for x in 0..mat.cols() {
            let pixel = mat.at_2d::<opencv::core::Vec3b>(y, x)?;
            let r = pixel[2] as u32;
            let g = pixel[1] as u32;
            let b = pixel[0] as u32;
            frame.pixels[(y as u32 * width + x as u32) as usize] = (r << 16) | (g << 8) | b;
        }
    }

    Ok(frame)
}
