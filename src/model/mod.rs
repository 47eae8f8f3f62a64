#[cfg(feature = "desktop")]
pub mod onnx;
pub mod preprocess;

#[cfg(feature = "desktop")]
pub use onnx::OnnxPoseModel;

use crate::camera::Frame;
use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::pose::Pose;

/// 姿勢推定エンジンの能力インターフェース
///
/// 推論の中身は不透明。パイプラインは呼び出しと出力スキーマの解釈のみを行う。
/// スケジューラの構造上、同時に複数の `estimate` が走ることはない。
pub trait PoseModel: Send {
    /// ライブフレームから最も信頼度の高い1つの姿勢を推定する
    fn estimate(
        &mut self,
        frame: &Frame,
        scale_factor: f32,
        mirror: bool,
        output_stride: u32,
    ) -> Result<Pose, PipelineError>;
}

/// モデル読み込み関数。ライフサイクルコントローラが一度だけ呼ぶ。
///
/// 数秒かかることがある。失敗は `ModelLoadFailure` でパイプラインに致命的。
pub type ModelLoader =
    Box<dyn FnOnce(&ModelConfig) -> Result<Box<dyn PoseModel>, PipelineError> + Send>;
