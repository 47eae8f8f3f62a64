use anyhow::Result;
use minifb::{Key, Window, WindowOptions};

use super::overlay::PixelSurface;

/// minifbを使用した表示ウィンドウ
///
/// パイプラインが描いた共有サーフェスをリフレッシュごとに表示する。
pub struct OverlayWindow {
    window: Window,
}

impl OverlayWindow {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize, target_fps: u32) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(target_fps as usize);

        Ok(Self { window })
    }

    /// ウィンドウが開いているか（ESCで閉じる）
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// サーフェスの内容を表示する
    pub fn present(&mut self, surface: &PixelSurface) -> Result<()> {
        let (width, height) = surface.dimensions();
        self.window
            .update_with_buffer(surface.buffer(), width as usize, height as usize)?;
        Ok(())
    }
}
