use ndarray::Array4;

use crate::camera::Frame;

/// Frame をモデル入力テンソルに変換
///
/// - 最近傍サンプリングで input_width x input_height にリサイズ
/// - [1, H, W, 3] の f32 テンソル (0.0-255.0, RGB順)
pub fn frame_to_tensor(frame: &Frame, input_width: u32, input_height: u32) -> Array4<f32> {
    let mut tensor =
        Array4::<f32>::zeros((1, input_height as usize, input_width as usize, 3));

    if frame.width == 0 || frame.height == 0 || input_width == 0 || input_height == 0 {
        return tensor;
    }

    for y in 0..input_height {
        for x in 0..input_width {
            let src_x = x * frame.width / input_width;
            let src_y = y * frame.height / input_height;
            let pixel = frame.get(src_x, src_y);
            tensor[[0, y as usize, x as usize, 0]] = ((pixel >> 16) & 0xFF) as f32;
            tensor[[0, y as usize, x as usize, 1]] = ((pixel >> 8) & 0xFF) as f32;
            tensor[[0, y as usize, x as usize, 2]] = (pixel & 0xFF) as f32;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape() {
        let frame = Frame::new(640, 480);
        let tensor = frame_to_tensor(&frame, 257, 200);
        assert_eq!(tensor.shape(), &[1, 200, 257, 3]);
    }

    #[test]
    fn test_solid_color_sampling() {
        // 0xFF8040 -> R=255, G=128, B=64
        let frame = Frame::solid(100, 100, 0xFF8040);
        let tensor = frame_to_tensor(&frame, 10, 10);
        assert_eq!(tensor[[0, 5, 5, 0]], 255.0);
        assert_eq!(tensor[[0, 5, 5, 1]], 128.0);
        assert_eq!(tensor[[0, 5, 5, 2]], 64.0);
    }

    #[test]
    fn test_zero_sized_frame_does_not_panic() {
        let frame = Frame::new(0, 0);
        let tensor = frame_to_tensor(&frame, 4, 4);
        assert_eq!(tensor.shape(), &[1, 4, 4, 3]);
        assert!(tensor.iter().all(|&v| v == 0.0));
    }
}
