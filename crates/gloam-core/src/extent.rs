/// Pixel dimensions of a render target.
///
/// Always at least 1×1: the only constructor clamps degenerate sizes so a
/// zero-sized window (e.g. minimized) never reaches texture allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    width: u32,
    height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            tracing::debug!("Clamping degenerate extent {}x{} to at least 1x1", width, height);
        }
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Viewport rectangle `(x, y, w, h)` covering the whole target.
    pub fn viewport(&self) -> [f32; 4] {
        [0.0, 0.0, self.width as f32, self.height as f32]
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
