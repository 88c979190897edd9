/// Axis-aligned rectangle in clip space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClipRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

/// Cell addressed by instance `index` in an `n` by `n` grid: `(index mod n, index / n)`.
///
/// Same integer math as `vs_main` in `grid.wgsl`.
#[inline]
pub fn cell_for_instance(index: u32, n: u32) -> (u32, u32) {
    debug_assert!(n > 0);
    (index % n, index / n)
}

/// Maps a quad corner `pos` in `[-1, 1]` into cell `cell`:
/// `(pos + 1) / n - 1 + 2 * cell / n`.
#[inline]
fn grid_position(pos: [f32; 2], cell: (u32, u32), n: u32) -> [f32; 2] {
    let n = n as f32;
    let (cx, cy) = (cell.0 as f32, cell.1 as f32);
    [
        (pos[0] + 1.0) / n - 1.0 + 2.0 * cx / n,
        (pos[1] + 1.0) / n - 1.0 + 2.0 * cy / n,
    ]
}

/// Clip-space rectangle covered by the unit quad once placed in `cell`.
pub fn cell_clip_rect(cell: (u32, u32), n: u32) -> ClipRect {
    ClipRect {
        min: grid_position([-1.0, -1.0], cell, n),
        max: grid_position([1.0, 1.0], cell, n),
    }
}

/// Fragment color of `cell`: `(x / n, y / n, 1 - x / n, 1)`.
#[inline]
pub fn cell_color(cell: (u32, u32), n: u32) -> [f32; 4] {
    let n = n as f32;
    let (u, v) = (cell.0 as f32 / n, cell.1 as f32 / n);
    [u, v, 1.0 - u, 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    // ── cell_for_instance ─────────────────────────────────────────────────

    #[test]
    fn first_and_last_instance_stay_in_bounds() {
        for n in [1u32, 2, 7, 32, 4097, 65_535] {
            assert_eq!(cell_for_instance(0, n), (0, 0));
            assert_eq!(cell_for_instance(n * n - 1, n), (n - 1, n - 1));
        }
    }

    #[test]
    fn every_instance_maps_to_a_distinct_cell() {
        let n = 5;
        let mut seen = std::collections::HashSet::new();
        for i in 0..n * n {
            let (x, y) = cell_for_instance(i, n);
            assert!(x < n && y < n);
            assert!(seen.insert((x, y)));
        }
        assert_eq!(seen.len(), (n * n) as usize);
    }

    #[test]
    fn instance_527_of_32_is_cell_15_16() {
        assert_eq!(cell_for_instance(527, 32), (15, 16));
    }

    // ── cell_clip_rect ────────────────────────────────────────────────────

    #[test]
    fn single_cell_fills_clip_space() {
        let r = cell_clip_rect((0, 0), 1);
        assert_eq!(r.min, [-1.0, -1.0]);
        assert_eq!(r.max, [1.0, 1.0]);
    }

    #[test]
    fn cells_tile_clip_space() {
        let n = 4;
        let first = cell_clip_rect((0, 0), n);
        let last = cell_clip_rect((n - 1, n - 1), n);
        assert!(approx(first.min[0], -1.0) && approx(first.min[1], -1.0));
        assert!(approx(first.max[0], -0.5) && approx(first.max[1], -0.5));
        assert!(approx(last.max[0], 1.0) && approx(last.max[1], 1.0));

        let next = cell_clip_rect((1, 0), n);
        assert!(approx(next.min[0], first.max[0]));
    }

    // ── cell_color ────────────────────────────────────────────────────────

    #[test]
    fn corner_colors() {
        let n = 32;
        assert_eq!(cell_color((0, 0), n), [0.0, 0.0, 1.0, 1.0]);

        let c = cell_color((n - 1, n - 1), n);
        assert!(approx(c[0], 31.0 / 32.0));
        assert!(approx(c[1], 31.0 / 32.0));
        assert!(approx(c[2], 1.0 / 32.0));
        assert_eq!(c[3], 1.0);
    }

    #[test]
    fn single_cell_is_blue() {
        assert_eq!(cell_color(cell_for_instance(0, 1), 1), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn instance_527_of_32_color() {
        let c = cell_color(cell_for_instance(527, 32), 32);
        assert!(approx(c[0], 0.46875));
        assert!(approx(c[1], 0.5));
        assert!(approx(c[2], 0.53125));
        assert!(approx(c[3], 1.0));
    }
}
