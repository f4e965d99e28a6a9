use glam::Vec3;
use regionview_common::RegionCoord;

/// All region coordinates within Chebyshev distance `range` of `center`.
///
/// Recomputed from scratch on every update; the window carries no history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingWindow {
    pub center: RegionCoord,
    pub range: u32,
}

impl StreamingWindow {
    pub fn new(center: RegionCoord, range: u32) -> Self {
        Self { center, range }
    }

    /// Window around the region containing a world position.
    pub fn around(position: Vec3, range: u32, region_size: f32) -> Self {
        Self::new(RegionCoord::from_world(position, region_size), range)
    }

    pub fn contains(&self, coord: RegionCoord) -> bool {
        self.center.chebyshev(coord) <= self.range
    }

    /// Inclusive `(min, max)` corners, clipped to the `i32` grid.
    pub fn bounds(&self) -> (RegionCoord, RegionCoord) {
        let (x0, x1) = axis_bounds(self.center.x, self.range);
        let (z0, z1) = axis_bounds(self.center.z, self.range);
        (RegionCoord::new(x0, z0), RegionCoord::new(x1, z1))
    }

    /// Number of grid coordinates in the window, saturating at `u64::MAX`.
    pub fn area(&self) -> u64 {
        let (min, max) = self.bounds();
        let width = max.x.abs_diff(min.x) as u64 + 1;
        let depth = max.z.abs_diff(min.z) as u64 + 1;
        width.saturating_mul(depth)
    }

    /// Every coordinate in the window, nearest first. Allocates the whole
    /// window; prefer [`select`](Self::select) when the candidates are known.
    pub fn coords_nearest_first(&self) -> Vec<RegionCoord> {
        let (min, max) = self.bounds();
        let mut coords: Vec<RegionCoord> = (min.z..=max.z)
            .flat_map(|z| (min.x..=max.x).map(move |x| RegionCoord::new(x, z)))
            .collect();
        self.sort_nearest_first(&mut coords);
        coords
    }

    /// The candidates inside the window, nearest first. Duplicates are kept.
    pub fn select(&self, candidates: impl IntoIterator<Item = RegionCoord>) -> Vec<RegionCoord> {
        let mut coords: Vec<RegionCoord> = candidates
            .into_iter()
            .filter(|c| self.contains(*c))
            .collect();
        self.sort_nearest_first(&mut coords);
        coords
    }

    /// Ordered by distance from the center, then by coordinate, so budgeted
    /// loading fills in from the middle outwards.
    fn sort_nearest_first(&self, coords: &mut [RegionCoord]) {
        coords.sort_by_key(|c| (self.center.chebyshev(*c), *c));
    }
}

fn axis_bounds(center: i32, range: u32) -> (i32, i32) {
    let lo = (i64::from(center) - i64::from(range)).max(i64::from(i32::MIN));
    let hi = (i64::from(center) + i64::from(range)).min(i64::from(i32::MAX));
    // Both values are clamped into i32 above.
    (lo as i32, hi as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regionview_common::REGION_SIZE;

    #[test]
    fn window_is_square() {
        let w = StreamingWindow::new(RegionCoord::new(3, -2), 2);
        let coords = w.coords_nearest_first();
        assert_eq!(coords.len(), 25);
        assert_eq!(w.area(), 25);
        assert!(coords.iter().all(|c| w.contains(*c)));
        assert!(!w.contains(RegionCoord::new(6, -2)));
        assert!(w.contains(RegionCoord::new(5, 0)));
    }

    #[test]
    fn nearest_first_starts_at_center() {
        let w = StreamingWindow::new(RegionCoord::new(0, 0), 1);
        let coords = w.coords_nearest_first();
        assert_eq!(coords[0], RegionCoord::new(0, 0));
        assert!(coords[1..].iter().all(|c| w.center.chebyshev(*c) == 1));
    }

    /// Chebyshev distance computed without any i32 arithmetic.
    fn reference_contains(center: RegionCoord, range: u32, c: RegionCoord) -> bool {
        let dx = (i64::from(center.x) - i64::from(c.x)).abs();
        let dz = (i64::from(center.z) - i64::from(c.z)).abs();
        dx.max(dz) <= i64::from(range)
    }

    #[test]
    fn far_viewpoint_clips_to_grid() {
        let w = StreamingWindow::around(Vec3::new(1.0e13, 0.0, -1.0e13), 1, REGION_SIZE);
        assert_eq!(w.center, RegionCoord::new(i32::MAX, i32::MIN));

        let coords = w.coords_nearest_first();
        assert_eq!(coords.len(), 4);
        assert_eq!(w.area(), 4);
        assert_eq!(coords[0], w.center);
        assert!(coords.contains(&RegionCoord::new(i32::MAX - 1, i32::MIN + 1)));
    }

    #[test]
    fn unbounded_range_saturates_area() {
        let w = StreamingWindow::new(RegionCoord::new(0, 0), u32::MAX);
        assert_eq!(w.area(), u64::MAX);
        assert_eq!(
            w.bounds(),
            (RegionCoord::new(i32::MIN, i32::MIN), RegionCoord::new(i32::MAX, i32::MAX))
        );
        assert!(w.contains(RegionCoord::new(i32::MIN, i32::MAX)));
    }

    #[test]
    fn select_skips_enumerating_large_windows() {
        let w = StreamingWindow::new(RegionCoord::new(0, 0), 3000);
        let picked = w.select([
            RegionCoord::new(3001, 0),
            RegionCoord::new(-2999, 5),
            RegionCoord::new(1, 1),
        ]);
        assert_eq!(picked, vec![RegionCoord::new(1, 1), RegionCoord::new(-2999, 5)]);
    }

    #[test]
    fn window_matches_reference_across_centers_and_ranges() {
        let candidates: Vec<RegionCoord> = [
            (0, 0),
            (1, 0),
            (0, 1),
            (-1, -1),
            (-3, 2),
            (4, -4),
            (i32::MAX, i32::MAX),
            (i32::MAX - 1, i32::MAX),
            (i32::MIN, i32::MIN),
            (i32::MIN + 2, i32::MIN),
            (i32::MIN, i32::MAX),
        ]
        .into_iter()
        .map(|(x, z)| RegionCoord::new(x, z))
        .collect();
        let centers = [
            RegionCoord::new(0, 0),
            RegionCoord::new(-2, 1),
            RegionCoord::new(5, 5),
            RegionCoord::new(i32::MAX, i32::MAX),
            RegionCoord::new(i32::MIN, i32::MIN),
            RegionCoord::new(i32::MIN + 1, i32::MAX - 1),
        ];

        for center in centers {
            for range in [0, 1, 2, 3, u32::MAX] {
                let w = StreamingWindow::new(center, range);
                let mut expected: Vec<RegionCoord> = candidates
                    .iter()
                    .copied()
                    .filter(|c| reference_contains(center, range, *c))
                    .collect();
                expected.sort();

                let mut picked = w.select(candidates.iter().copied());
                picked.sort();
                assert_eq!(picked, expected, "center {center} range {range}");

                if w.area() <= 49 {
                    let mut enumerated: Vec<RegionCoord> = w
                        .coords_nearest_first()
                        .into_iter()
                        .filter(|c| candidates.contains(c))
                        .collect();
                    enumerated.sort();
                    assert_eq!(enumerated, expected, "center {center} range {range}");
                }
            }
        }
    }

    #[test]
    fn around_floors_negative_positions() {
        let w = StreamingWindow::around(Vec3::new(-1.0, 40.0, 1920.0), 0, REGION_SIZE);
        assert_eq!(w.center, RegionCoord::new(-1, 1));
        assert_eq!(w.coords_nearest_first(), vec![RegionCoord::new(-1, 1)]);
    }
}
