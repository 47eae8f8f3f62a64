/// PoseNet の 17 身体部位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyPart {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl BodyPart {
    pub const COUNT: usize = 17;

    /// モデル出力順の全部位
    pub const ALL: [BodyPart; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 部位ラベル（モデルの出力スキーマと同じ表記）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
            Self::LeftEar => "leftEar",
            Self::RightEar => "rightEar",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub part: BodyPart,
    /// X座標（フレームのピクセル空間）
    pub x: f32,
    /// Y座標（フレームのピクセル空間）
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(part: BodyPart, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            part,
            x,
            y,
            confidence,
        }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    /// 描画用の整数ピクセル座標
    pub fn pixel(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

/// 1回の推論結果。全体スコアと17キーポイント。
///
/// 推論ごとに生成され、描画とオブザーバ通知の後に破棄される。
#[derive(Debug, Clone)]
pub struct Pose {
    /// 姿勢全体の信頼度 (0.0〜1.0)
    pub score: f32,
    pub keypoints: [Keypoint; BodyPart::COUNT],
}

impl Pose {
    pub fn new(score: f32, keypoints: [Keypoint; BodyPart::COUNT]) -> Self {
        Self { score, keypoints }
    }

    /// 全キーポイントが信頼度0の空の姿勢
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            keypoints: std::array::from_fn(|i| Keypoint::new(BodyPart::ALL[i], 0.0, 0.0, 0.0)),
        }
    }

    /// 部位でキーポイントを取得
    pub fn get(&self, part: BodyPart) -> &Keypoint {
        &self.keypoints[part as usize]
    }

    /// 全キーポイントの平均信頼度
    pub fn mean_confidence(&self) -> f32 {
        let sum: f32 = self.keypoints.iter().map(|k| k.confidence).sum();
        sum / BodyPart::COUNT as f32
    }
}
