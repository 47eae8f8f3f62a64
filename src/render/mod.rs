pub mod overlay;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

pub use overlay::{render, PixelSurface, Surface};
pub use skeleton::SKELETON_EDGES;
#[cfg(feature = "desktop")]
pub use window::OverlayWindow;
