use thiserror::Error;

/// パイプラインのエラー種別
///
/// カメラ取得とモデル読み込みの失敗はマウントに対して致命的。
/// 呼び出し側が破棄して再構築するまで復旧しない。
#[derive(Debug, Error)]
pub enum PipelineError {
    /// キャプチャデバイスが存在しない、または開けない
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// カメラへのアクセスが拒否された
    #[error("camera permission denied")]
    PermissionDenied,

    /// モデルの読み込みに失敗（致命的、部分起動なし）
    #[error("model failed to load: {0}")]
    ModelLoadFailure(String),

    /// フレーム単位の推論エラー
    #[error("inference failed: {0}")]
    Inference(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_camera() {
        let e = PipelineError::CameraUnavailable("no device".to_string());
        let msg = format!("{}", e);
        assert!(msg.contains("camera unavailable"));
        assert!(msg.contains("no device"));
    }

    #[test]
    fn test_error_display_permission() {
        let msg = format!("{}", PipelineError::PermissionDenied);
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_error_display_model() {
        let e = PipelineError::ModelLoadFailure("bad file".to_string());
        assert!(format!("{}", e).contains("model failed to load"));
    }
}
