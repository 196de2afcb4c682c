//! Pure mapping from (slot count, viewport shape) to screen placements.
//!
//! All coordinates are percentages of the viewport (0..=100) so the
//! function is deterministic and testable without a rendering context.

/// Target placement for one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

const PAIR_SCALE: f32 = 0.8;
const TRIO_SCALE: f32 = 0.65;
const GRID_SCALE_FACTOR: f32 = 1.6;
/// Gap between paired slots, as a fraction of the shorter viewport dimension.
const GAP_FRACTION: f32 = 0.05;
/// Visual slot diameter at scale 1.0, as a fraction of the shorter dimension.
const DIAMETER_FRACTION: f32 = 0.8;

pub fn layout(count: usize, viewport_width: f32, viewport_height: f32) -> Vec<Placement> {
    match count {
        0 => Vec::new(),
        1 => vec![Placement { x: 50.0, y: 50.0, scale: 1.0 }],
        2 => pair(viewport_width, viewport_height),
        3 => trio(viewport_width, viewport_height),
        _ => grid(count, viewport_width, viewport_height),
    }
}

/// Half the center-to-center spacing of a pair, in device units.
fn pair_half_spacing(scale: f32, width: f32, height: f32) -> f32 {
    let shorter = width.min(height);
    (DIAMETER_FRACTION * scale + GAP_FRACTION) * shorter / 2.0
}

fn pair(width: f32, height: f32) -> Vec<Placement> {
    let half = pair_half_spacing(PAIR_SCALE, width, height);
    if height > width {
        // Portrait: stack vertically, centered as a group.
        let dy = half / height * 100.0;
        vec![
            Placement { x: 50.0, y: 50.0 - dy, scale: PAIR_SCALE },
            Placement { x: 50.0, y: 50.0 + dy, scale: PAIR_SCALE },
        ]
    } else {
        let dx = half / width * 100.0;
        vec![
            Placement { x: 50.0 - dx, y: 50.0, scale: PAIR_SCALE },
            Placement { x: 50.0 + dx, y: 50.0, scale: PAIR_SCALE },
        ]
    }
}

fn trio(width: f32, height: f32) -> Vec<Placement> {
    let top_y = if height > width { 25.0 } else { 30.0 };
    let half = pair_half_spacing(TRIO_SCALE, width, height);
    let dx = half / width * 100.0;
    vec![
        Placement { x: 50.0, y: top_y, scale: TRIO_SCALE },
        Placement { x: 50.0 - dx, y: 70.0, scale: TRIO_SCALE },
        Placement { x: 50.0 + dx, y: 70.0, scale: TRIO_SCALE },
    ]
}

fn grid(count: usize, width: f32, height: f32) -> Vec<Placement> {
    // Bias toward more columns in landscape, more rows in portrait.
    let root = (count as f32).sqrt();
    let (cols, rows) = if width >= height {
        let cols = root.ceil() as usize;
        (cols, (count + cols - 1) / cols)
    } else {
        let rows = root.ceil() as usize;
        ((count + rows - 1) / rows, rows)
    };

    let scale = GRID_SCALE_FACTOR / cols.max(rows) as f32;
    let cell_w = 100.0 / cols as f32;
    let cell_h = 100.0 / rows as f32;

    (0..count)
        .map(|i| {
            let row = i / cols;
            let col = i % cols;
            // The final row may be short; re-center it instead of
            // leaving it left-aligned.
            let in_row = (count - row * cols).min(cols);
            let offset = (cols - in_row) as f32 * cell_w / 2.0;
            Placement {
                x: offset + (col as f32 + 0.5) * cell_w,
                y: (row as f32 + 0.5) * cell_h,
                scale,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn empty_and_single() {
        assert!(layout(0, 1920.0, 1080.0).is_empty());
        let single = layout(1, 1920.0, 1080.0);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0], Placement { x: 50.0, y: 50.0, scale: 1.0 });
    }

    #[test]
    fn pair_landscape_is_horizontal_and_symmetric() {
        let placements = layout(2, 1920.0, 1080.0);
        assert_eq!(placements.len(), 2);
        for p in &placements {
            assert!((p.scale - 0.8).abs() < EPS);
            assert!((p.y - 50.0).abs() < EPS);
        }
        // Symmetric about x = 50, in list order.
        assert!((placements[0].x + placements[1].x - 100.0).abs() < EPS);
        assert!(placements[0].x < 50.0 && placements[1].x > 50.0);
    }

    #[test]
    fn pair_portrait_stacks_vertically() {
        let placements = layout(2, 1080.0, 1920.0);
        for p in &placements {
            assert!((p.x - 50.0).abs() < EPS);
        }
        assert!((placements[0].y + placements[1].y - 100.0).abs() < EPS);
        assert!(placements[0].y < placements[1].y);
    }

    #[test]
    fn trio_portrait_rows() {
        let placements = layout(3, 1080.0, 1920.0);
        assert_eq!(placements.len(), 3);
        assert!((placements[0].y - 25.0).abs() < 3.0);
        assert!((placements[0].x - 50.0).abs() < EPS);
        for p in &placements[1..] {
            assert!((p.y - 70.0).abs() < EPS);
            assert!((p.scale - 0.65).abs() < EPS);
        }
        assert!((placements[1].x + placements[2].x - 100.0).abs() < EPS);
    }

    #[test]
    fn grid_orientation_bias() {
        // Six slots: 3x2 in landscape, 2x3 in portrait. Widest row count
        // shows up as the largest number of distinct x values per row.
        let landscape = layout(6, 1920.0, 1080.0);
        let portrait = layout(6, 1080.0, 1920.0);
        let row_width = |ps: &[Placement]| {
            let first_y = ps[0].y;
            ps.iter().filter(|p| (p.y - first_y).abs() < EPS).count()
        };
        assert_eq!(row_width(&landscape), 3);
        assert_eq!(row_width(&portrait), 2);
        for p in landscape.iter().chain(portrait.iter()) {
            assert!((p.scale - 1.6 / 3.0).abs() < EPS);
        }
    }

    #[test]
    fn grid_recenters_final_row() {
        // Five slots in landscape: 3 + 2, with the short row centered.
        let placements = layout(5, 1920.0, 1080.0);
        let last_row: Vec<_> = placements[3..].to_vec();
        assert_eq!(last_row.len(), 2);
        let mid = (last_row[0].x + last_row[1].x) / 2.0;
        assert!((mid - 50.0).abs() < EPS);
        // And the short row sits strictly inside the full row's extent.
        assert!(last_row[0].x > placements[0].x);
        assert!(last_row[1].x < placements[2].x);
    }

    #[test]
    fn everything_stays_on_screen() {
        for count in 0..24 {
            for (w, h) in [(1920.0, 1080.0), (1080.0, 1920.0), (1024.0, 1024.0)] {
                for p in layout(count, w, h) {
                    assert!((0.0..=100.0).contains(&p.x), "x={} count={count}", p.x);
                    assert!((0.0..=100.0).contains(&p.y), "y={} count={count}", p.y);
                    assert!(p.scale > 0.0);
                }
            }
        }
    }
}
