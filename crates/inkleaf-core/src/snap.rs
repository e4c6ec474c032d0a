//! Snapping of edges and centers to page guides.

use crate::geometry::NormalizedRect;
use kurbo::Vec2;

/// The nearest guide within the snap threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    /// Guide position the value snaps to.
    pub guide: f64,
    /// Signed distance to add to the value to land on the guide.
    pub offset: f64,
}

/// Guides that engaged during the last move or transform, for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapGuides {
    /// Vertical guide lines, given by their x position.
    pub verticals: Vec<f64>,
    /// Horizontal guide lines, given by their y position.
    pub horizontals: Vec<f64>,
}

impl SnapGuides {
    /// No active guides.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.verticals.is_empty() && self.horizontals.is_empty()
    }
}

/// Slack for rounding in `guide - value`, so a distance of exactly the
/// threshold snaps at every guide.
const SNAP_EPSILON: f64 = 1e-9;

/// Find the guide nearest to `value` within `threshold`.
///
/// Ties keep the earlier guide.
pub fn find_snap_candidate(value: f64, guides: &[f64], threshold: f64) -> Option<SnapCandidate> {
    let mut best: Option<SnapCandidate> = None;
    for &guide in guides {
        let offset = guide - value;
        if offset.abs() > threshold + SNAP_EPSILON {
            continue;
        }
        if best.is_none_or(|b| offset.abs() < b.offset.abs()) {
            best = Some(SnapCandidate { guide, offset });
        }
    }
    best
}

/// Best candidate among several values along one axis.
fn best_candidate(values: [f64; 3], guides: &[f64], threshold: f64) -> Option<SnapCandidate> {
    let mut best: Option<SnapCandidate> = None;
    for value in values {
        let Some(candidate) = find_snap_candidate(value, guides, threshold) else {
            continue;
        };
        if best.is_none_or(|b| candidate.offset.abs() < b.offset.abs()) {
            best = Some(candidate);
        }
    }
    best
}

/// Adjust a move delta so the moved bounds snap to guides.
///
/// Left edge, center and right edge compete for the x axis. Top, center
/// and bottom compete for the y axis. The best candidate per axis is added
/// to the delta.
pub fn snap_delta_for_bounds(
    bounds: &NormalizedRect,
    delta: Vec2,
    guides: &[f64],
    threshold: f64,
) -> (Vec2, SnapGuides) {
    let center = bounds.center();
    let x = best_candidate(
        [bounds.left + delta.x, center.x + delta.x, bounds.right + delta.x],
        guides,
        threshold,
    );
    let y = best_candidate(
        [bounds.top + delta.y, center.y + delta.y, bounds.bottom + delta.y],
        guides,
        threshold,
    );

    let mut snapped = delta;
    let mut active = SnapGuides::none();
    if let Some(x) = x {
        snapped.x += x.offset;
        active.verticals.push(x.guide);
    }
    if let Some(y) = y {
        snapped.y += y.offset;
        active.horizontals.push(y.guide);
    }
    (snapped, active)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUIDES: [f64; 3] = [0.0, 0.5, 1.0];

    #[test]
    fn test_snap_threshold_boundary() {
        let at = find_snap_candidate(0.015, &GUIDES, 0.015);
        assert!(at.is_some());
        assert_eq!(at.unwrap().guide, 0.0);

        let past = find_snap_candidate(0.0151, &GUIDES, 0.015);
        assert!(past.is_none());
    }

    #[test]
    fn test_snap_threshold_boundary_every_guide() {
        for (value, guide) in [(0.485, 0.5), (0.515, 0.5), (0.985, 1.0)] {
            let candidate = find_snap_candidate(value, &GUIDES, 0.015);
            assert_eq!(candidate.map(|c| c.guide), Some(guide), "value {}", value);
        }
        for value in [0.4849, 0.5151, 0.9849] {
            assert!(find_snap_candidate(value, &GUIDES, 0.015).is_none(), "value {}", value);
        }
    }

    #[test]
    fn test_snap_offset_sign() {
        let candidate = find_snap_candidate(0.99, &GUIDES, 0.015).unwrap();
        assert_eq!(candidate.guide, 1.0);
        assert!((candidate.offset - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_snap_prefers_nearest_guide() {
        let guides = [0.5, 0.52];
        let candidate = find_snap_candidate(0.515, &guides, 0.015).unwrap();
        assert_eq!(candidate.guide, 0.52);
    }

    #[test]
    fn test_snap_delta_centers_box() {
        let bounds = NormalizedRect::new(0.2, 0.3, 0.4, 0.35);
        // Center x would land at 0.49 after the move.
        let (delta, guides) = snap_delta_for_bounds(&bounds, Vec2::new(0.19, 0.0), &GUIDES, 0.015);
        assert!((delta.x - 0.2).abs() < 1e-9);
        assert_eq!(delta.y, 0.0);
        assert_eq!(guides.verticals, vec![0.5]);
        assert!(guides.horizontals.is_empty());
    }

    #[test]
    fn test_snap_delta_edge_to_page() {
        let bounds = NormalizedRect::new(0.3, 0.0, 0.6, 0.2);
        let (delta, guides) = snap_delta_for_bounds(&bounds, Vec2::new(0.0, -0.01), &GUIDES, 0.015);
        assert!((delta.y - 0.0).abs() < 1e-9);
        assert_eq!(guides.horizontals, vec![0.0]);
    }

    #[test]
    fn test_no_snap_far_from_guides() {
        let bounds = NormalizedRect::new(0.1, 0.1, 0.2, 0.2);
        let (delta, guides) = snap_delta_for_bounds(&bounds, Vec2::new(0.1, 0.1), &GUIDES, 0.015);
        assert_eq!(delta, Vec2::new(0.1, 0.1));
        assert!(guides.is_empty());
    }
}
