//! Drag Geometry
//!
//! Placeholder sizing and containment box for a drag in progress.

/// Extra room below the list, in multiples of the dragged row's height
pub const BOTTOM_SLACK_FACTOR: f64 = 2.5;

/// Box the dragged helper's top edge is confined to (client coordinates)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Containment {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Containment {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn clamp_y(&self, y: f64) -> f64 {
        if self.bottom < self.top {
            return self.top;
        }
        y.clamp(self.top, self.bottom)
    }

    pub fn clamp_x(&self, x: f64) -> f64 {
        if self.right < self.left {
            return self.left;
        }
        x.clamp(self.left, self.right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragGeometry {
    pub placeholder_height: f64,
    pub click_offset_top: f64,
    pub containment: Containment,
}

impl DragGeometry {
    /// Geometry at drag start.
    ///
    /// The container box is measured while the dragged row is still in
    /// flow, so the bottom gains `2.5 × helper_height` and the top gives up
    /// the pointer's offset inside the row. Without that the first and last
    /// rows cannot reach an adjacent empty group.
    pub fn start(helper_height: f64, click_offset_top: f64, container: Containment) -> Self {
        let containment = Containment {
            top: container.top - click_offset_top,
            bottom: container.bottom + helper_height * BOTTOM_SLACK_FACTOR,
            ..container
        };
        Self {
            placeholder_height: helper_height,
            click_offset_top,
            containment,
        }
    }

    /// Top of the helper for a pointer at `pointer_y`
    pub fn helper_top(&self, pointer_y: f64) -> f64 {
        self.containment.clamp_y(pointer_y - self.click_offset_top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_widens_containment() {
        let container = Containment::new(0.0, 100.0, 300.0, 400.0);
        let geometry = DragGeometry::start(40.0, 12.0, container);

        assert_eq!(geometry.placeholder_height, 40.0);
        assert_eq!(geometry.containment.top, 88.0);
        assert_eq!(geometry.containment.bottom, 500.0);
        assert_eq!(geometry.containment.left, 0.0);
        assert_eq!(geometry.containment.right, 300.0);
    }

    #[test]
    fn test_helper_top_is_clamped() {
        let geometry = DragGeometry::start(20.0, 5.0, Containment::new(0.0, 50.0, 100.0, 150.0));

        // Upper bound is 45, lower bound 200
        assert_eq!(geometry.helper_top(10.0), 45.0);
        assert_eq!(geometry.helper_top(105.0), 100.0);
        assert_eq!(geometry.helper_top(1000.0), 200.0);
    }

    #[test]
    fn test_degenerate_box() {
        let c = Containment::new(10.0, 10.0, 5.0, 5.0);
        assert_eq!(c.clamp_y(0.0), 10.0);
        assert_eq!(c.clamp_x(99.0), 10.0);
    }
}
