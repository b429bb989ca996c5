/// Pixel border between the four viewports. Must be even.
pub const VIEWPORT_BORDER: u32 = 4;

/// One viewport rectangle in window coordinates, origin at the top-left
/// (winit convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// The 2x2 viewport layout. Quadrant order matches the camera order: 0 main
/// (top-left), 1 light (top-right), 2 third-person (bottom-left), 3
/// post-perspective (bottom-right).
#[derive(Debug, Clone, Copy)]
pub struct ViewportGrid {
    width: u32,
    height: u32,
    pub viewports: [ViewportRect; 4],
    /// All four viewports share the same size, hence the same aspect ratio.
    pub aspect_ratio: f32,
}

impl ViewportGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let mut grid = Self {
            width: 0,
            height: 0,
            viewports: [ViewportRect { x: 0, y: 0, w: 1, h: 1 }; 4],
            aspect_ratio: 1.0,
        };
        grid.resize(width, height);
        grid
    }

    /// Recompute the four viewports, leaving a small border between them and
    /// around the window edge.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(VIEWPORT_BORDER * 4);
        self.height = height.max(VIEWPORT_BORDER * 4);

        let hw = self.width / 2;
        let hh = self.height / 2;
        let w = hw - VIEWPORT_BORDER * 3 / 2;
        let h = hh - VIEWPORT_BORDER * 3 / 2;
        let left = VIEWPORT_BORDER;
        let right = hw + VIEWPORT_BORDER / 2;
        let top = VIEWPORT_BORDER;
        let bottom = hh + VIEWPORT_BORDER / 2;

        self.viewports = [
            ViewportRect { x: left, y: top, w, h },
            ViewportRect { x: right, y: top, w, h },
            ViewportRect { x: left, y: bottom, w, h },
            ViewportRect { x: right, y: bottom, w, h },
        ];
        self.aspect_ratio = w as f32 / h as f32;
    }

    /// Which quadrant (0-3) a mouse position falls in.
    pub fn quadrant(&self, x: f32, y: f32) -> usize {
        let right = x >= self.width as f32 / 2.0;
        let bottom = y >= self.height as f32 / 2.0;
        match (right, bottom) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_mapping() {
        let grid = ViewportGrid::new(1280, 720);
        assert_eq!(grid.quadrant(100.0, 100.0), 0);
        assert_eq!(grid.quadrant(1000.0, 100.0), 1);
        assert_eq!(grid.quadrant(100.0, 600.0), 2);
        assert_eq!(grid.quadrant(1000.0, 600.0), 3);
        // Dead center belongs to the bottom-right quadrant.
        assert_eq!(grid.quadrant(640.0, 360.0), 3);
    }

    #[test]
    fn test_viewports_leave_border() {
        let grid = ViewportGrid::new(1280, 720);
        let [tl, tr, bl, br] = grid.viewports;
        assert_eq!(tl, ViewportRect { x: 4, y: 4, w: 634, h: 354 });
        assert_eq!(tr.x, 642);
        assert_eq!(bl.y, 362);
        assert_eq!(br, ViewportRect { x: 642, y: 362, w: 634, h: 354 });

        // Viewports never cross the window midline.
        assert!(tl.x + tl.w <= 640);
        assert!(tl.y + tl.h <= 360);
    }

    #[test]
    fn test_all_viewports_share_aspect() {
        let grid = ViewportGrid::new(1920, 1080);
        for vp in &grid.viewports {
            assert!((vp.w as f32 / vp.h as f32 - grid.aspect_ratio).abs() < 1e-6);
        }
    }

    #[test]
    fn test_resize_recomputes() {
        let mut grid = ViewportGrid::new(1280, 720);
        let before = grid.aspect_ratio;
        grid.resize(720, 1280);
        assert!((grid.aspect_ratio - 1.0 / before).abs() < 1e-5);
        assert!(grid.aspect_ratio < 1.0);
        assert_eq!(grid.quadrant(700.0, 100.0), 1);
    }

    #[test]
    fn test_tiny_window_does_not_underflow() {
        let grid = ViewportGrid::new(1, 1);
        for vp in &grid.viewports {
            assert!(vp.w > 0 && vp.h > 0);
        }
    }
}
