//! Capture → infer → render pipeline.
//!
//! The lifecycle controller owns setup order (camera → model → frame loop),
//! the loop state, and teardown. The frame loop runs on one supervising
//! worker thread: cycles are strictly sequential, so at most one inference
//! call is in flight at any instant and a slow call throttles the visible
//! frame rate instead of queuing backlog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::camera::{FrameSource, SourceAcquirer};
use crate::config::Config;
use crate::error::PipelineError;
use crate::model::{ModelLoader, PoseModel};
use crate::pose::Pose;
use crate::render::{self, PixelSurface, Surface};

// ---------------------------------------------------------------------------
// Loop state
// ---------------------------------------------------------------------------

/// パイプラインの状態。インスタンスごとに常にちょうど1つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    AcquiringCamera,
    LoadingModel,
    Running,
    Stopped,
    Failed(String),
}

impl LoopState {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// フレームごとに姿勢を受け取る外部オブザーバ
pub type PoseObserver = Box<dyn FnMut(&Pose) + Send>;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// マウント済みパイプラインのハンドル
///
/// dropすると `unmount` と同じくワーカーを停止してカメラを解放する。
pub struct PipelineHandle {
    state: Arc<Mutex<LoopState>>,
    surface: Arc<Mutex<PixelSurface>>,
    cancel: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl PipelineHandle {
    /// 現在の状態
    pub fn state(&self) -> LoopState {
        self.state.lock().unwrap().clone()
    }

    /// 描画先の共有サーフェス。呼び出し側はこれを表示する。
    pub fn surface(&self) -> Arc<Mutex<PixelSurface>> {
        Arc::clone(&self.surface)
    }

    /// パイプラインを停止してカメラを解放する。冪等。
    ///
    /// キャンセルは協調的: 実行中の推論呼び出しは中断されないが、
    /// その結果は破棄され、描画もオブザーバ通知もされない。
    pub fn unmount(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}

// ---------------------------------------------------------------------------
// Mount / lifecycle
// ---------------------------------------------------------------------------

/// パイプラインをマウントしてワーカースレッドを起動する
///
/// セットアップ順序: カメラ取得 → モデル読み込み（その間プレースホルダ表示）
/// → フレームループ開始。どちらかの段階で失敗したら `Failed` に遷移して
/// 呼び出し側に理由を公開する。自動リトライはなく、再試行には破棄と
/// 再マウントが必要。
pub fn mount(
    config: Config,
    acquire: SourceAcquirer,
    load: ModelLoader,
    observer: Option<PoseObserver>,
) -> PipelineHandle {
    let state = Arc::new(Mutex::new(LoopState::Uninitialized));
    let surface = Arc::new(Mutex::new(PixelSurface::new(
        config.capture.width,
        config.capture.height,
    )));
    let cancel = Arc::new(AtomicBool::new(false));

    let worker_state = Arc::clone(&state);
    let worker_surface = Arc::clone(&surface);
    let worker_cancel = Arc::clone(&cancel);

    let worker = thread::spawn(move || {
        run(
            config,
            acquire,
            load,
            observer,
            worker_state,
            worker_surface,
            worker_cancel,
        );
    });

    PipelineHandle {
        state,
        surface,
        cancel,
        worker: Some(worker),
    }
}

fn set_state(state: &Arc<Mutex<LoopState>>, next: LoopState) {
    *state.lock().unwrap() = next;
}

/// ワーカー本体。セットアップからティアダウンまでを1スレッドで順に行う。
fn run(
    config: Config,
    acquire: SourceAcquirer,
    load: ModelLoader,
    mut observer: Option<PoseObserver>,
    state: Arc<Mutex<LoopState>>,
    surface: Arc<Mutex<PixelSurface>>,
    cancel: Arc<AtomicBool>,
) {
    // --- カメラ取得 ---
    set_state(&state, LoopState::AcquiringCamera);
    let source = match acquire(&config.capture) {
        Ok(source) => source,
        Err(e) => {
            set_state(&state, LoopState::Failed(e.to_string()));
            return;
        }
    };

    // サーフェスを実際のストリーム解像度に合わせる
    let (width, height) = source.resolution();
    surface.lock().unwrap().resize(width, height);

    // --- モデル読み込み ---
    // 読み込み中はプレースホルダを塗っておく（数秒かかることがある）
    set_state(&state, LoopState::LoadingModel);
    surface.lock().unwrap().fill(config.render.skeleton_color);

    let mut model = match load(&config.model) {
        Ok(model) => model,
        Err(e) => {
            source.release();
            set_state(&state, LoopState::Failed(e.to_string()));
            return;
        }
    };

    if cancel.load(Ordering::Relaxed) {
        source.release();
        set_state(&state, LoopState::Stopped);
        return;
    }

    // --- フレームループ ---
    set_state(&state, LoopState::Running);
    let tick = Duration::from_secs_f64(1.0 / config.app.target_fps.max(1) as f64);
    let failure = frame_loop(
        &config,
        source.as_ref(),
        model.as_mut(),
        &mut observer,
        &surface,
        &cancel,
        tick,
    );

    // --- ティアダウン ---
    // カメラ解放は失敗時も必須。デバイスを占有したままにしない。
    source.release();
    match failure {
        Some(e) => set_state(&state, LoopState::Failed(e.to_string())),
        None => set_state(&state, LoopState::Stopped),
    }
}

/// フレームループ。キャンセルされるまで無限に回る。
///
/// 1サイクル: フレーム取得 → 推論（完了まで待つ） → 描画 → オブザーバ通知
/// → 次のティックまで待機。推論エラーはループを止めて `Failed` になる
/// （フレーム単位のリトライはしない）。
fn frame_loop(
    config: &Config,
    source: &dyn FrameSource,
    model: &mut dyn PoseModel,
    observer: &mut Option<PoseObserver>,
    surface: &Arc<Mutex<PixelSurface>>,
    cancel: &Arc<AtomicBool>,
    tick: Duration,
) -> Option<PipelineError> {
    loop {
        let cycle_start = Instant::now();

        if cancel.load(Ordering::Relaxed) {
            return None;
        }

        let frame = match source.latest() {
            Some(frame) => frame,
            None => {
                thread::sleep(Duration::from_millis(1));
                continue;
            }
        };

        let pose = match model.estimate(
            &frame,
            config.model.image_scale_factor,
            config.capture.mirror,
            config.model.output_stride,
        ) {
            Ok(pose) => pose,
            Err(e) => return Some(e),
        };

        // 推論中にキャンセルされていたら、遅れて届いた結果は捨てる
        if cancel.load(Ordering::Relaxed) {
            return None;
        }

        {
            let mut surface = surface.lock().unwrap();
            render::render(
                &mut *surface,
                &frame,
                &pose,
                &config.render,
                config.capture.mirror,
            );
        }

        if let Some(observer) = observer.as_mut() {
            observer(&pose);
        }

        let elapsed = cycle_start.elapsed();
        if elapsed < tick {
            thread::sleep(tick - elapsed);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
