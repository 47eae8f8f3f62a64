#[cfg(feature = "desktop")]
pub mod capture;

#[cfg(feature = "desktop")]
pub use capture::OpenCvSource;

use crate::config::CaptureConfig;
use crate::error::PipelineError;

/// 1フレーム分のピクセルデータ (0RGB packed)
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl Frame {
    /// 黒で初期化されたフレーム
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u32; (width * height) as usize],
        }
    }

    /// 単色フレーム
    pub fn solid(width: u32, height: u32, color: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    /// ピクセル取得（範囲外は黒）
    pub fn get(&self, x: u32, y: u32) -> u32 {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize]
        } else {
            0
        }
    }
}

/// ライブ映像ソース
///
/// 実装は最新フレームを保持し、取得のたびに同じフレームを返してよい。
/// `frame_id` は新フレーム到着ごとに単調増加する。
pub trait FrameSource: Send {
    /// 実際のストリーム解像度
    fn resolution(&self) -> (u32, u32);

    /// 現在のフレームID。新フレームが到着するたびにインクリメントされる。
    fn frame_id(&self) -> u64;

    /// 最新フレームを取得。取得成功後は常にSome。
    fn latest(&self) -> Option<Frame>;

    /// キャプチャを停止しデバイスのハードウェアロックを解放する。
    /// ティアダウン時に必ず呼ばれる。
    fn release(self: Box<Self>);
}

/// カメラ取得関数。ライフサイクルコントローラが一度だけ呼ぶ。
///
/// デバイスが存在しなければ `CameraUnavailable`、アクセスが拒否されれば
/// `PermissionDenied` で失敗する。成功時は最初のフレームが読める状態で返る。
pub type SourceAcquirer =
    Box<dyn FnOnce(&CaptureConfig) -> Result<Box<dyn FrameSource>, PipelineError> + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new_is_black() {
        let frame = Frame::new(4, 3);
        assert_eq!(frame.pixels.len(), 12);
        assert!(frame.pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_frame_get_bounds() {
        let frame = Frame::solid(2, 2, 0x123456);
        assert_eq!(frame.get(1, 1), 0x123456);
        assert_eq!(frame.get(2, 0), 0);
        assert_eq!(frame.get(0, 2), 0);
    }
}
