use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::preprocess::frame_to_tensor;
use super::PoseModel;
use crate::camera::Frame;
use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::pose::{BodyPart, Keypoint, Pose};

/// TFエクスポート時の出力テンソル名
const OUTPUT_NAME: &str = "StatefulPartitionedCall_0";

/// ONNX Runtime を使用した姿勢推定モデル
///
/// 出力は [1, 1, 17, 3] (y, x, confidence)、座標は0〜1に正規化されている。
pub struct OnnxPoseModel {
    session: Session,
    input_width: u32,
    input_height: u32,
}

impl OnnxPoseModel {
    /// ONNXモデルを読み込んで初期化。失敗はパイプラインに致命的。
    pub fn load(config: &ModelConfig) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(&config.model_path))
            .map_err(|e| PipelineError::ModelLoadFailure(e.to_string()))?;

        Ok(Self {
            session,
            input_width: config.input_width,
            input_height: config.input_height,
        })
    }
}

impl PoseModel for OnnxPoseModel {
    fn estimate(
        &mut self,
        frame: &Frame,
        _scale_factor: f32,
        mirror: bool,
        _output_stride: u32,
    ) -> Result<Pose, PipelineError> {
        // scale factor と output stride はONNXエクスポート時に焼き込まれている
        let input = frame_to_tensor(frame, self.input_width, self.input_height);
        let input_tensor =
            Tensor::from_array(input).map_err(|e| PipelineError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs!["serving_default_input_0" => input_tensor])
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        let output: ndarray::ArrayViewD<f32> = outputs[OUTPUT_NAME]
            .try_extract_array()
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        let mut keypoints: [Keypoint; BodyPart::COUNT] =
            std::array::from_fn(|i| Keypoint::new(BodyPart::ALL[i], 0.0, 0.0, 0.0));
        let mut confidence_sum = 0.0f32;

        for (i, part) in BodyPart::ALL.iter().enumerate() {
            let ny = output[[0, 0, i, 0]];
            let nx = output[[0, 0, i, 1]];
            let confidence = output[[0, 0, i, 2]];

            // 正規化座標をフレームのピクセル空間へ
            let mut x = nx * frame.width as f32;
            let y = ny * frame.height as f32;
            if mirror {
                x = frame.width as f32 - x;
            }

            keypoints[i] = Keypoint::new(*part, x, y, confidence);
            confidence_sum += confidence;
        }

        let score = confidence_sum / BodyPart::COUNT as f32;
        Ok(Pose::new(score, keypoints))
    }
}
