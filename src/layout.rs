//! Panel placement and sizing. Positions and sizes are fractions of the
//! figure, window sizes are inches.

use crate::colormap::CLUSTER_PALETTE_SIZE;
use crate::figure::FracRect;

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub window_height: f64,
    pub window_width: f64,
    pub color_bar_width: f64,

    pub left_dendro_x: f64,
    pub left_dendro_y: f64,
    pub left_dendro_width: f64,
    pub left_dendro_height: f64,
    pub left_dendro_x_distance_to_row_cb: f64,
    pub left_dendro_y_distance_to_col_cb: f64,

    pub top_dendro_x: f64,
    pub top_dendro_y: f64,
    pub top_dendro_width: f64,
    pub top_dendro_height: f64,

    pub row_cb_x: f64,
    pub row_cb_y: f64,
    pub row_cb_width: f64,
    pub row_cb_height: f64,
    pub row_cb_on: bool,

    pub col_cb_x: f64,
    pub col_cb_y: f64,
    pub col_cb_width: f64,
    pub col_cb_height: f64,
    pub col_cb_on: bool,

    pub heat_x: f64,
    pub heat_y: f64,
    pub heat_width: f64,
    pub heat_height: f64,

    pub color_legend_x: f64,
    pub color_legend_y: f64,
    pub color_legend_width: f64,
    pub color_legend_height: f64,
    /// Upper bound on legend tick intervals.
    pub color_legend_ticks: usize,

    /// Row labels are drawn only when there are fewer than this many.
    pub max_row_labels: usize,
    pub row_labels_size: f64,
    pub max_col_labels: usize,
    pub col_labels_size: f64,

    /// Base text size in points for titles and tick labels.
    pub font_size: f64,
    pub export_dpi: f64,
    pub screen_dpi: f64,
    pub dendrogram_line_width: f64,

    /// Colors in the discrete palette of the derived cluster bars.
    pub cluster_palette_size: usize,
    /// Fraction of the maximum merge height at which dendrograms are cut.
    pub color_threshold_ratio: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            window_height: 10.0,
            window_width: 14.0,
            color_bar_width: 0.015,

            left_dendro_x: 0.05,
            left_dendro_y: 0.22,
            left_dendro_width: 0.2,
            left_dendro_height: 0.6,
            left_dendro_x_distance_to_row_cb: 0.004,
            left_dendro_y_distance_to_col_cb: 0.004,

            top_dendro_x: 0.273,
            top_dendro_y: 0.843,
            top_dendro_width: 0.5,
            top_dendro_height: 0.117,

            row_cb_x: 0.254,
            row_cb_y: 0.22,
            row_cb_width: 0.015,
            row_cb_height: 0.6,
            row_cb_on: true,

            col_cb_x: 0.273,
            col_cb_y: 0.824,
            col_cb_width: 0.5,
            col_cb_height: 0.015,
            col_cb_on: true,

            heat_x: 0.273,
            heat_y: 0.22,
            heat_width: 0.5,
            heat_height: 0.6,

            color_legend_x: 0.07,
            color_legend_y: 0.88,
            color_legend_width: 0.2,
            color_legend_height: 0.09,
            color_legend_ticks: 7,

            max_row_labels: 100,
            row_labels_size: 8.0,
            max_col_labels: 100,
            col_labels_size: 8.0,

            font_size: 20.0,
            export_dpi: 600.0,
            screen_dpi: 100.0,
            dendrogram_line_width: 1.0,

            cluster_palette_size: CLUSTER_PALETTE_SIZE,
            color_threshold_ratio: 0.7,
        }
    }
}

impl Layout {
    pub fn top_dendrogram_rect(&self) -> FracRect {
        FracRect::new(self.top_dendro_x, self.top_dendro_y, self.top_dendro_width, self.top_dendro_height)
    }

    pub fn left_dendrogram_rect(&self) -> FracRect {
        FracRect::new(self.left_dendro_x, self.left_dendro_y, self.left_dendro_width, self.left_dendro_height)
    }

    pub fn heat_map_rect(&self) -> FracRect {
        FracRect::new(self.heat_x, self.heat_y, self.heat_width, self.heat_height)
    }

    pub fn row_color_bar_rect(&self) -> FracRect {
        FracRect::new(self.row_cb_x, self.row_cb_y, self.row_cb_width, self.row_cb_height)
    }

    pub fn col_color_bar_rect(&self) -> FracRect {
        FracRect::new(self.col_cb_x, self.col_cb_y, self.col_cb_width, self.col_cb_height)
    }

    pub fn color_legend_rect(&self) -> FracRect {
        FracRect::new(
            self.color_legend_x,
            self.color_legend_y,
            self.color_legend_width,
            self.color_legend_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_panels_line_up() {
        let layout = Layout::default();
        let heat = layout.heat_map_rect();
        let top = layout.top_dendrogram_rect();
        let col_cb = layout.col_color_bar_rect();
        let row_cb = layout.row_color_bar_rect();
        assert_eq!(top.x, heat.x);
        assert_eq!(top.width, heat.width);
        assert_eq!(col_cb.x, heat.x);
        assert_eq!(row_cb.y, heat.y);
        assert_eq!(row_cb.height, heat.height);
        // column bar sits between the heat map and the top dendrogram
        assert!(col_cb.y >= heat.top());
        assert!(col_cb.top() <= top.y);
        // row bar sits between the left dendrogram and the heat map
        assert!(row_cb.x >= layout.left_dendrogram_rect().right());
        assert!(row_cb.right() <= heat.x);
    }
}
