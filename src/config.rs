use anyhow::Result;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub app: AppConfig,
}

/// カメラキャプチャ設定。取得後は変更不可。
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    /// カメラインデックス（デフォルトカメラ: 0）
    #[serde(default = "default_camera_index")]
    pub camera_index: i32,
    /// 要求する横解像度
    #[serde(default = "default_capture_width")]
    pub width: u32,
    /// 要求する縦解像度
    #[serde(default = "default_capture_height")]
    pub height: u32,
    /// 映像を左右反転して描画するか
    #[serde(default)]
    pub mirror: bool,
}

/// モデルアーキテクチャ
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    MobileNetV1,
    ResNet50,
}

/// 量子化精度（バイト数）
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "u8")]
pub enum QuantBytes {
    One,
    Two,
    Four,
}

impl TryFrom<u8> for QuantBytes {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            other => Err(format!("quant_bytes must be 1, 2 or 4, got {}", other)),
        }
    }
}

/// 姿勢推定モデルの設定。読み込み時に一度だけ消費される。
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_architecture")]
    pub architecture: Architecture,
    /// 出力ストライド
    #[serde(default = "default_output_stride")]
    pub output_stride: u32,
    /// モデル入力の横解像度
    #[serde(default = "default_input_width")]
    pub input_width: u32,
    /// モデル入力の縦解像度
    #[serde(default = "default_input_height")]
    pub input_height: u32,
    #[serde(default = "default_quant_bytes")]
    pub quant_bytes: QuantBytes,
    /// 推論前の画像スケール係数
    #[serde(default = "default_image_scale_factor")]
    pub image_scale_factor: f32,
    /// ONNXモデルファイルのパス
    #[serde(default = "default_model_path")]
    pub model_path: String,
}

/// オーバーレイ描画の設定
#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_true")]
    pub show_video: bool,
    #[serde(default = "default_true")]
    pub show_skeleton: bool,
    #[serde(default = "default_true")]
    pub show_points: bool,
    /// これ未満のスコアの姿勢はオーバーレイを描かない
    #[serde(default = "default_min_pose_confidence")]
    pub min_pose_confidence: f32,
    /// これ未満の信頼度のキーポイントは描かない
    #[serde(default = "default_min_part_confidence")]
    pub min_part_confidence: f32,
    /// 骨格・マーカーの色 (設定ファイルでは "#RRGGBB")
    #[serde(
        default = "default_skeleton_color",
        deserialize_with = "deserialize_color"
    )]
    pub skeleton_color: u32,
    /// 骨格線の太さ（ピクセル）
    #[serde(default = "default_skeleton_line_width")]
    pub skeleton_line_width: u32,
    /// 検出する姿勢の最大数（シングルポーズ版では常に1）
    #[serde(default = "default_max_pose_detections")]
    pub max_pose_detections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// フレームループの目標レート（表示リフレッシュ相当）
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

fn default_camera_index() -> i32 { 0 }
fn default_capture_width() -> u32 { 900 }
fn default_capture_height() -> u32 { 700 }
fn default_architecture() -> Architecture { Architecture::ResNet50 }
fn default_output_stride() -> u32 { 32 }
fn default_input_width() -> u32 { 257 }
fn default_input_height() -> u32 { 200 }
fn default_quant_bytes() -> QuantBytes { QuantBytes::Two }
fn default_image_scale_factor() -> f32 { 0.5 }
fn default_model_path() -> String { "models/posenet_resnet50.onnx".to_string() }
fn default_true() -> bool { true }
fn default_min_pose_confidence() -> f32 { 0.1 }
fn default_min_part_confidence() -> f32 { 0.4 }
fn default_skeleton_color() -> u32 { 0x41B4A1 }
fn default_skeleton_line_width() -> u32 { 6 }
fn default_max_pose_detections() -> u32 { 1 }
fn default_target_fps() -> u32 { 60 }

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: default_camera_index(),
            width: default_capture_width(),
            height: default_capture_height(),
            mirror: false,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            architecture: default_architecture(),
            output_stride: default_output_stride(),
            input_width: default_input_width(),
            input_height: default_input_height(),
            quant_bytes: default_quant_bytes(),
            image_scale_factor: default_image_scale_factor(),
            model_path: default_model_path(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_video: true,
            show_skeleton: true,
            show_points: true,
            min_pose_confidence: default_min_pose_confidence(),
            min_part_confidence: default_min_part_confidence(),
            skeleton_color: default_skeleton_color(),
            skeleton_line_width: default_skeleton_line_width(),
            max_pose_detections: default_max_pose_detections(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
        }
    }
}

/// "#RRGGBB" 形式の色文字列をパース
pub fn parse_color(s: &str) -> Option<u32> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn deserialize_color<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_color(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color: {}", s)))
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルが無い・壊れている場合はデフォルトにフォールバック
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("[config] {} unavailable, using defaults ({})", path.as_ref().display(), e);
                Self::default()
            }
        }
    }
}
