use crate::camera::Frame;
use crate::config::RenderConfig;
use crate::pose::Pose;
use crate::render::skeleton::SKELETON_EDGES;

/// キーポイントマーカーの半径（ピクセル）
const MARKER_RADIUS: i32 = 4;

/// 描画ターゲット
///
/// 本番は `PixelSurface`、テストは描画呼び出しを記録するフェイクを使う。
pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// 全面を単色で塗りつぶす
    fn fill(&mut self, color: u32);

    /// 生フレームを貼り付ける。mirror時は左右反転。
    fn blit(&mut self, frame: &Frame, mirror: bool);

    /// キーポイントマーカーを描く
    fn draw_marker(&mut self, x: i32, y: i32, color: u32);

    /// 骨格線を描く
    fn draw_segment(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32, width: u32);
}

/// 1サイクル分のオーバーレイ描画。同期、サスペンドなし。
///
/// - 全面クリア
/// - show_video ならフレームを先に貼る（オーバーレイが上に載る）
/// - 姿勢スコアが min_pose_confidence 以上のときだけキーポイントと骨格を描く
/// - 個々のキーポイントは min_part_confidence 未満なら描かない
/// - 骨格線は両端がともに閾値を超えた場合のみ
///
/// スコア不足の姿勢は映像だけが残る。これはエラーではなく描画の抑制。
pub fn render<S: Surface>(
    surface: &mut S,
    frame: &Frame,
    pose: &Pose,
    config: &RenderConfig,
    mirror: bool,
) {
    surface.fill(0);

    if config.show_video {
        surface.blit(frame, mirror);
    }

    if pose.score < config.min_pose_confidence {
        return;
    }

    if config.show_points {
        for kp in pose.keypoints.iter() {
            if kp.is_valid(config.min_part_confidence) {
                let (x, y) = kp.pixel();
                surface.draw_marker(x, y, config.skeleton_color);
            }
        }
    }

    if config.show_skeleton {
        for (start, end) in SKELETON_EDGES.iter() {
            let a = pose.get(*start);
            let b = pose.get(*end);
            if a.is_valid(config.min_part_confidence) && b.is_valid(config.min_part_confidence) {
                let (x0, y0) = a.pixel();
                let (x1, y1) = b.pixel();
                surface.draw_segment(
                    x0,
                    y0,
                    x1,
                    y1,
                    config.skeleton_color,
                    config.skeleton_line_width,
                );
            }
        }
    }
}

/// u32ピクセルバッファへの描画実装
pub struct PixelSurface {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: vec![0u32; (width * height) as usize],
            width: width as usize,
            height: height as usize,
        }
    }

    /// サイズ変更（バッファは黒で再確保）
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width as usize;
        self.height = height as usize;
        self.buffer = vec![0u32; self.width * self.height];
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    /// ピクセルをセット（境界チェック付き）
    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }

    /// 円を描画（塗りつぶし）
    fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }
}

impl Surface for PixelSurface {
    fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    fn fill(&mut self, color: u32) {
        self.buffer.fill(color);
    }

    fn blit(&mut self, frame: &Frame, mirror: bool) {
        let copy_w = self.width.min(frame.width as usize);
        let copy_h = self.height.min(frame.height as usize);
        for y in 0..copy_h {
            for x in 0..copy_w {
                let src_x = if mirror {
                    frame.width as usize - 1 - x
                } else {
                    x
                };
                self.buffer[y * self.width + x] = frame.get(src_x as u32, y as u32);
            }
        }
    }

    fn draw_marker(&mut self, x: i32, y: i32, color: u32) {
        self.fill_circle(x, y, MARKER_RADIUS, color);
    }

    /// Bresenhamのアルゴリズムで線を描画。太さは円のスタンプで出す。
    fn draw_segment(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32, width: u32) {
        let radius = (width as i32 / 2).max(0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            if radius > 0 {
                self.fill_circle(x, y, radius, color);
            } else {
                self.set_pixel(x, y, color);
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{BodyPart, Keypoint};

    /// 描画呼び出しを記録するテスト用サーフェス
    #[derive(Debug, PartialEq)]
    enum Op {
        Fill(u32),
        Blit { mirror: bool },
        Marker(i32, i32),
        Segment(i32, i32, i32, i32),
    }

    struct RecordingSurface {
        ops: Vec<Op>,
    }

    impl RecordingSurface {
        fn new() -> Self {
            Self { ops: Vec::new() }
        }

        fn markers(&self) -> Vec<(i32, i32)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Marker(x, y) => Some((*x, *y)),
                    _ => None,
                })
                .collect()
        }

        fn segment_count(&self) -> usize {
            self.ops
                .iter()
                .filter(|op| matches!(op, Op::Segment(..)))
                .count()
        }

        fn blit_count(&self) -> usize {
            self.ops
                .iter()
                .filter(|op| matches!(op, Op::Blit { .. }))
                .count()
        }
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (900, 700)
        }
        fn fill(&mut self, color: u32) {
            self.ops.push(Op::Fill(color));
        }
        fn blit(&mut self, _frame: &Frame, mirror: bool) {
            self.ops.push(Op::Blit { mirror });
        }
        fn draw_marker(&mut self, x: i32, y: i32, _color: u32) {
            self.ops.push(Op::Marker(x, y));
        }
        fn draw_segment(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, _color: u32, _width: u32) {
            self.ops.push(Op::Segment(x0, y0, x1, y1));
        }
    }

    fn test_config() -> RenderConfig {
        RenderConfig::default() // show all, 0.1 / 0.4 thresholds
    }

    fn pose_with(parts: &[(BodyPart, f32, f32, f32)], score: f32) -> Pose {
        let mut pose = Pose::empty();
        pose.score = score;
        for (part, x, y, confidence) in parts {
            pose.keypoints[*part as usize] = Keypoint::new(*part, *x, *y, *confidence);
        }
        pose
    }

    #[test]
    fn test_low_score_pose_suppresses_all_overlay() {
        // スコア 0.05 < 0.1: 映像のみ、オーバーレイなし
        let frame = Frame::new(900, 700);
        let pose = pose_with(
            &[(BodyPart::Nose, 100.0, 50.0, 0.95)],
            0.05,
        );
        let mut surface = RecordingSurface::new();
        render(&mut surface, &frame, &pose, &test_config(), false);

        assert_eq!(surface.blit_count(), 1, "video still painted");
        assert!(surface.markers().is_empty());
        assert_eq!(surface.segment_count(), 0);
    }

    #[test]
    fn test_low_confidence_keypoint_not_drawn() {
        let frame = Frame::new(900, 700);
        let pose = pose_with(
            &[
                (BodyPart::Nose, 100.0, 50.0, 0.95),
                (BodyPart::LeftEye, 90.0, 45.0, 0.2),
            ],
            0.9,
        );
        let mut surface = RecordingSurface::new();
        render(&mut surface, &frame, &pose, &test_config(), false);

        // nose は描かれ、leftEye (0.2 < 0.4) は描かれない。顔の骨格線もない。
        assert_eq!(surface.markers(), vec![(100, 50)]);
        assert_eq!(surface.segment_count(), 0);
    }

    #[test]
    fn test_edge_requires_both_endpoints() {
        let frame = Frame::new(900, 700);

        // 片端だけ閾値超え: 線なし
        let pose = pose_with(
            &[
                (BodyPart::LeftShoulder, 200.0, 200.0, 0.9),
                (BodyPart::LeftElbow, 220.0, 300.0, 0.3),
            ],
            0.9,
        );
        let mut surface = RecordingSurface::new();
        render(&mut surface, &frame, &pose, &test_config(), false);
        assert_eq!(surface.segment_count(), 0);

        // 両端とも閾値超え: 線が引かれる
        let pose = pose_with(
            &[
                (BodyPart::LeftShoulder, 200.0, 200.0, 0.9),
                (BodyPart::LeftElbow, 220.0, 300.0, 0.8),
            ],
            0.9,
        );
        let mut surface = RecordingSurface::new();
        render(&mut surface, &frame, &pose, &test_config(), false);
        assert_eq!(surface.segment_count(), 1);
        assert!(surface.ops.contains(&Op::Segment(200, 200, 220, 300)));
    }

    #[test]
    fn test_show_points_off_draws_no_markers() {
        let frame = Frame::new(900, 700);
        let pose = pose_with(&[(BodyPart::Nose, 100.0, 50.0, 0.95)], 0.9);
        let mut config = test_config();
        config.show_points = false;

        let mut surface = RecordingSurface::new();
        render(&mut surface, &frame, &pose, &config, false);
        assert!(surface.markers().is_empty());
    }

    #[test]
    fn test_show_video_off_skips_blit() {
        let frame = Frame::new(900, 700);
        let pose = pose_with(&[(BodyPart::Nose, 100.0, 50.0, 0.95)], 0.9);
        let mut config = test_config();
        config.show_video = false;

        let mut surface = RecordingSurface::new();
        render(&mut surface, &frame, &pose, &config, false);
        assert_eq!(surface.blit_count(), 0);
        // オーバーレイ自体は描かれる
        assert_eq!(surface.markers(), vec![(100, 50)]);
    }

    #[test]
    fn test_mirror_forwarded_to_blit() {
        let frame = Frame::new(900, 700);
        let pose = Pose::empty();
        let mut surface = RecordingSurface::new();
        render(&mut surface, &frame, &pose, &test_config(), true);
        assert!(surface.ops.contains(&Op::Blit { mirror: true }));
    }

    #[test]
    fn test_full_body_draws_all_edges() {
        let frame = Frame::new(900, 700);
        let mut pose = Pose::empty();
        pose.score = 0.9;
        for kp in pose.keypoints.iter_mut() {
            kp.confidence = 0.9;
            kp.x = 100.0;
            kp.y = 100.0;
        }
        let mut surface = RecordingSurface::new();
        render(&mut surface, &frame, &pose, &test_config(), false);
        assert_eq!(surface.segment_count(), SKELETON_EDGES.len());
        assert_eq!(surface.markers().len(), 17);
    }

    #[test]
    fn test_pixel_surface_marker_and_clear() {
        let mut surface = PixelSurface::new(20, 20);
        surface.fill(0);
        surface.draw_marker(10, 10, 0xFF0000);
        assert_eq!(surface.buffer()[10 * 20 + 10], 0xFF0000);

        surface.fill(0);
        assert!(surface.buffer().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_pixel_surface_segment_endpoints() {
        let mut surface = PixelSurface::new(40, 40);
        surface.draw_segment(5, 5, 30, 30, 0x00FF00, 1);
        assert_eq!(surface.buffer()[5 * 40 + 5], 0x00FF00);
        assert_eq!(surface.buffer()[30 * 40 + 30], 0x00FF00);
    }

    #[test]
    fn test_pixel_surface_blit_mirror() {
        let mut frame = Frame::new(4, 1);
        frame.pixels = vec![1, 2, 3, 4];
        let mut surface = PixelSurface::new(4, 1);

        surface.blit(&frame, false);
        assert_eq!(surface.buffer(), &[1, 2, 3, 4]);

        surface.blit(&frame, true);
        assert_eq!(surface.buffer(), &[4, 3, 2, 1]);
    }

    #[test]
    fn test_pixel_surface_out_of_bounds_ignored() {
        let mut surface = PixelSurface::new(10, 10);
        // 端のマーカーや範囲外の線でパニックしない
        surface.draw_marker(-5, -5, 0xFFFFFF);
        surface.draw_marker(9, 9, 0xFFFFFF);
        surface.draw_segment(-10, 0, 20, 0, 0xFFFFFF, 3);
        assert_eq!(surface.buffer()[9 * 10 + 9], 0xFFFFFF);
    }
}
