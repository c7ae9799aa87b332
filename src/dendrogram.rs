//! Layout of a linkage as a dendrogram (U-shaped links over evenly spaced
//! leaves) and its drawing onto a figure panel.

use image::Rgb;

use crate::figure::{Figure, PanelId};
use crate::linkage::Linkage;

/// Horizontal spacing between leaves in layout units.
pub const LEAF_SPACING: f64 = 10.0;

/// Color of links above the color threshold.
pub const ABOVE_THRESHOLD_COLOR: Rgb<u8> = Rgb([0x1f, 0x77, 0xb4]);

/// Colors cycled through for the subtrees below the threshold.
pub const LINK_PALETTE: [Rgb<u8>; 9] = [
    Rgb([0xff, 0x7f, 0x0e]),
    Rgb([0x2c, 0xa0, 0x2c]),
    Rgb([0xd6, 0x27, 0x28]),
    Rgb([0x94, 0x67, 0xbd]),
    Rgb([0x8c, 0x56, 0x4b]),
    Rgb([0xe3, 0x77, 0xc2]),
    Rgb([0x7f, 0x7f, 0x7f]),
    Rgb([0xbc, 0xbd, 0x22]),
    Rgb([0x17, 0xbe, 0xcf]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Root at the top, leaves along the bottom edge.
    Top,
    /// Root at the left, leaves along the right edge, first leaf at the bottom.
    Left,
}

/// Drawing coordinates of a dendrogram. Link `i` belongs to merge `i`:
/// `icoord` holds the positions along the leaf axis, `dcoord` the heights.
#[derive(Debug, Clone, PartialEq)]
pub struct DendrogramLayout {
    pub icoord: Vec<[f64; 4]>,
    pub dcoord: Vec<[f64; 4]>,
    pub colors: Vec<Rgb<u8>>,
    pub leaves: Vec<usize>,
    pub max_height: f64,
}

impl DendrogramLayout {
    /// Lays out `linkage` without drawing. Links strictly below
    /// `color_threshold` are colored per subtree.
    pub fn compute(linkage: &Linkage, color_threshold: f64) -> Self {
        let n = linkage.n_leaves();
        let leaves = linkage.leaves();
        let merges = linkage.merges();

        let mut position = vec![0.0; 2 * n - 1];
        let mut height = vec![0.0; 2 * n - 1];
        for (rank, &leaf) in leaves.iter().enumerate() {
            position[leaf] = LEAF_SPACING / 2.0 + LEAF_SPACING * rank as f64;
        }

        let mut icoord = Vec::with_capacity(merges.len());
        let mut dcoord = Vec::with_capacity(merges.len());
        for (i, m) in merges.iter().enumerate() {
            let (xl, xr) = (position[m.left], position[m.right]);
            icoord.push([xl, xl, xr, xr]);
            dcoord.push([height[m.left], m.height, m.height, height[m.right]]);
            position[n + i] = (xl + xr) / 2.0;
            height[n + i] = m.height;
        }

        let colors = link_colors(linkage, color_threshold);
        DendrogramLayout { icoord, dcoord, colors, leaves, max_height: linkage.max_height() }
    }

    pub fn n_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Extent of the height axis, with 5% headroom above the root.
    pub fn height_extent(&self) -> f64 {
        if self.max_height > 0.0 {
            self.max_height * 1.05
        } else {
            1.0
        }
    }

    pub fn leaf_extent(&self) -> f64 {
        LEAF_SPACING * self.n_leaves() as f64
    }

    /// Panel limits `(xlim, ylim)` for the given orientation.
    pub fn limits(&self, orientation: Orientation) -> ((f64, f64), (f64, f64)) {
        match orientation {
            Orientation::Top => ((0.0, self.leaf_extent()), (0.0, self.height_extent())),
            Orientation::Left => ((self.height_extent(), 0.0), (0.0, self.leaf_extent())),
        }
    }

    /// Draws every link onto a panel created with [`DendrogramLayout::limits`].
    pub fn draw(&self, figure: &mut Figure, panel: PanelId, orientation: Orientation, width_pt: f64) {
        for ((xs, ds), color) in self.icoord.iter().zip(&self.dcoord).zip(&self.colors) {
            let points: Vec<(f64, f64)> = match orientation {
                Orientation::Top => xs.iter().zip(ds).map(|(&x, &d)| (x, d)).collect(),
                Orientation::Left => xs.iter().zip(ds).map(|(&x, &d)| (d, x)).collect(),
            };
            figure.line(panel, &points, *color, width_pt);
        }
    }
}

fn link_colors(linkage: &Linkage, threshold: f64) -> Vec<Rgb<u8>> {
    let n = linkage.n_leaves();
    let merges = linkage.merges();
    let mut colors = vec![ABOVE_THRESHOLD_COLOR; merges.len()];
    let mut next_color = 0usize;

    // (node, color inherited from the nearest below-threshold ancestor)
    let mut stack: Vec<(usize, Option<Rgb<u8>>)> = vec![(2 * n - 2, None)];
    while let Some((node, inherited)) = stack.pop() {
        if node < n {
            continue;
        }
        let m = &merges[node - n];
        let color = match inherited {
            Some(c) => Some(c),
            None if m.height < threshold => {
                let c = LINK_PALETTE[next_color % LINK_PALETTE.len()];
                next_color += 1;
                Some(c)
            }
            None => None,
        };
        if let Some(c) = color {
            colors[node - n] = c;
        }
        stack.push((m.right, color));
        stack.push((m.left, color));
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{FracRect, PanelKind};

    fn four_leaves() -> Linkage {
        // (0, 3) and (1, 2) joined at the root
        Linkage::from_rows(&[
            [0.0, 3.0, 1.0, 2.0],
            [1.0, 2.0, 2.0, 2.0],
            [4.0, 5.0, 8.0, 4.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_layout_coordinates() {
        let layout = DendrogramLayout::compute(&four_leaves(), 5.6);
        assert_eq!(layout.leaves, vec![0, 3, 1, 2]);
        assert_eq!(layout.icoord[0], [5.0, 5.0, 15.0, 15.0]);
        assert_eq!(layout.icoord[1], [25.0, 25.0, 35.0, 35.0]);
        assert_eq!(layout.icoord[2], [10.0, 10.0, 30.0, 30.0]);
        assert_eq!(layout.dcoord[2], [1.0, 8.0, 8.0, 2.0]);
        assert_eq!(layout.leaf_extent(), 40.0);
        assert!((layout.height_extent() - 8.4).abs() < 1e-12);
    }

    #[test]
    fn test_link_colors_follow_threshold() {
        let layout = DendrogramLayout::compute(&four_leaves(), 5.6);
        assert_eq!(layout.colors[0], LINK_PALETTE[0]);
        assert_eq!(layout.colors[1], LINK_PALETTE[1]);
        assert_eq!(layout.colors[2], ABOVE_THRESHOLD_COLOR);

        let everything_below = DendrogramLayout::compute(&four_leaves(), 100.0);
        assert!(everything_below.colors.iter().all(|c| *c == LINK_PALETTE[0]));
    }

    #[test]
    fn test_limits_flip_for_left_orientation() {
        let layout = DendrogramLayout::compute(&four_leaves(), 5.6);
        let (xlim, ylim) = layout.limits(Orientation::Left);
        assert_eq!(xlim.1, 0.0);
        assert_eq!(ylim, (0.0, 40.0));
    }

    #[test]
    fn test_draw_emits_one_line_per_merge() {
        let layout = DendrogramLayout::compute(&four_leaves(), 5.6);
        let mut fig = Figure::new(2.0, 2.0);
        let (xlim, ylim) = layout.limits(Orientation::Left);
        let id = fig.add_panel(PanelKind::LeftDendrogram, FracRect::new(0.0, 0.0, 1.0, 1.0), xlim, ylim);
        layout.draw(&mut fig, id, Orientation::Left, 1.0);
        assert_eq!(fig.items().len(), 3);
    }
}
