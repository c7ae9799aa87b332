//! The clustered heat map: a data matrix flanked by dendrograms, cluster color
//! bars and a color legend.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use image::Rgb;
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::colormap::{Colormap, Normalize};
use crate::dendrogram::{DendrogramLayout, Orientation};
use crate::error::{Axis, HeatmapError, LabelWarning, Result};
use crate::figure::{Figure, FracRect, HAlign, PanelId, PanelKind, TextStyle, VAlign, BLACK};
use crate::font::Rotation;
use crate::layout::Layout;
use crate::linkage::{IntoLinkage, Linkage};
use crate::ticks;
use crate::viewer::{SystemViewer, Viewer};

const TITLE_PAD_PT: f64 = 6.0;
const TICK_LENGTH_PT: f64 = 3.5;
const TICK_LABEL_SCALE: f64 = 0.6;
const SUPTITLE_SCALE: f64 = 1.2;

/// Inputs accepted as heat map data.
pub trait IntoMatrix {
    fn into_matrix(self) -> Result<Array2<f64>>;
}

fn checked(data: Array2<f64>) -> Result<Array2<f64>> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(HeatmapError::InvalidData(format!(
            "matrix has shape {}x{}",
            data.nrows(),
            data.ncols()
        )));
    }
    if !data.iter().any(|v| v.is_finite()) {
        return Err(HeatmapError::InvalidData("matrix has no finite values".to_string()));
    }
    Ok(data)
}

fn from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(HeatmapError::InvalidData(format!(
            "row {} has {} values, expected {}",
            i,
            row.len(),
            ncols
        )));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let data = Array2::from_shape_vec((rows.len(), ncols), flat)
        .map_err(|e| HeatmapError::InvalidData(e.to_string()))?;
    checked(data)
}

impl IntoMatrix for Array2<f64> {
    fn into_matrix(self) -> Result<Array2<f64>> {
        checked(self)
    }
}

impl IntoMatrix for &Array2<f64> {
    fn into_matrix(self) -> Result<Array2<f64>> {
        checked(self.clone())
    }
}

impl IntoMatrix for ArrayView2<'_, f64> {
    fn into_matrix(self) -> Result<Array2<f64>> {
        checked(self.to_owned())
    }
}

impl IntoMatrix for Vec<Vec<f64>> {
    fn into_matrix(self) -> Result<Array2<f64>> {
        from_rows(&self)
    }
}

impl IntoMatrix for &[Vec<f64>] {
    fn into_matrix(self) -> Result<Array2<f64>> {
        from_rows(self)
    }
}

/// Outcome of [`DendroHeatMap::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Written(PathBuf),
    /// The path had no extension; nothing was rendered or written.
    Skipped { suggested: PathBuf },
}

/// Cursor readout over the heat map panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordReadout {
    pub x: f64,
    pub y: f64,
    pub value: Option<f64>,
}

impl fmt::Display for CoordReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(z) => write!(f, "x={:.4}, y={:.4}, z={:.4}", self.x, self.y, z),
            None => write!(f, "x={:.4}, y={:.4}", self.x, self.y),
        }
    }
}

/// Controller holding the data, the clustering results and the layout, and
/// owning at most one rendered figure. Every mutation that changes what would
/// be drawn releases the current figure.
#[derive(Debug, Clone)]
pub struct DendroHeatMap {
    layout: Layout,
    verbose: bool,

    data: Option<Array2<f64>>,
    norm: Option<Normalize>,
    colormap: Colormap,

    top_dendrogram: Option<Linkage>,
    left_dendrogram: Option<Linkage>,
    top_colorbar_labels: Option<Vec<u32>>,
    left_colorbar_labels: Option<Vec<u32>>,

    row_labels: Option<Vec<String>>,
    col_labels: Option<Vec<String>>,
    row_colorbar_override: Option<Vec<i64>>,
    row_colorbar_legend_names: Option<Vec<String>>,

    title: String,
    top_dendro_title: String,
    left_dendro_title: String,
    color_legend_title: String,

    figure: Option<Figure>,
    rendered: bool,
}

impl Default for DendroHeatMap {
    fn default() -> Self {
        DendroHeatMap::new(Layout::default())
    }
}

impl DendroHeatMap {
    pub fn new(layout: Layout) -> Self {
        DendroHeatMap {
            layout,
            verbose: false,
            data: None,
            norm: None,
            colormap: Colormap::default(),
            top_dendrogram: None,
            left_dendrogram: None,
            top_colorbar_labels: None,
            left_colorbar_labels: None,
            row_labels: None,
            col_labels: None,
            row_colorbar_override: None,
            row_colorbar_legend_names: None,
            title: String::new(),
            top_dendro_title: String::new(),
            left_dendro_title: String::new(),
            color_legend_title: String::new(),
            figure: None,
            rendered: false,
        }
    }

    pub fn with_data(data: impl IntoMatrix) -> Result<Self> {
        let mut heatmap = DendroHeatMap::default();
        heatmap.set_heat_map_data(data)?;
        Ok(heatmap)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut Layout {
        &mut self.layout
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn figure(&self) -> Option<&Figure> {
        self.figure.as_ref()
    }

    /// Releases the current figure.
    pub fn reset_plot(&mut self) {
        self.rendered = false;
        if self.figure.take().is_some() {
            debug!("Released rendered figure");
        }
    }

    // ---- data ----

    pub fn heat_map_data(&self) -> Option<&Array2<f64>> {
        self.data.as_ref()
    }

    /// Normalization captured when the data was assigned.
    pub fn normalization(&self) -> Option<Normalize> {
        self.norm
    }

    pub fn set_heat_map_data(&mut self, data: impl IntoMatrix) -> Result<()> {
        let data = data.into_matrix()?;
        let norm = Normalize::from_values(data.iter().copied())
            .ok_or_else(|| HeatmapError::InvalidData("matrix has no finite values".to_string()))?;
        debug!(
            "Heat map data {}x{}, value range {} .. {}",
            data.nrows(),
            data.ncols(),
            norm.vmin,
            norm.vmax
        );
        self.reset_plot();
        self.data = Some(data);
        self.norm = Some(norm);
        Ok(())
    }

    pub fn colormap(&self) -> &Colormap {
        &self.colormap
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
        self.reset_plot();
    }

    // ---- dendrograms ----

    pub fn top_dendrogram(&self) -> Option<&Linkage> {
        self.top_dendrogram.as_ref()
    }

    pub fn left_dendrogram(&self) -> Option<&Linkage> {
        self.left_dendrogram.as_ref()
    }

    /// Cluster ids of the column color bar, in leaf order.
    pub fn top_colorbar_labels(&self) -> Option<&[u32]> {
        self.top_colorbar_labels.as_deref()
    }

    /// Cluster ids of the row color bar, in leaf order.
    pub fn left_colorbar_labels(&self) -> Option<&[u32]> {
        self.left_colorbar_labels.as_deref()
    }

    fn derive_colorbar_labels(&self, linkage: &Linkage) -> Vec<u32> {
        let threshold = self.layout.color_threshold_ratio * linkage.max_height();
        let labels = linkage.leaf_ordered_clusters(threshold);
        debug!(
            "Cut {} leaves at {:.4}: {} clusters",
            linkage.n_leaves(),
            threshold,
            distinct(labels.iter().map(|&l| l as i64))
        );
        labels
    }

    pub fn set_top_dendrogram(&mut self, linkage: impl IntoLinkage) -> Result<()> {
        let linkage = linkage.into_linkage()?;
        self.reset_plot();
        self.top_colorbar_labels = Some(self.derive_colorbar_labels(&linkage));
        self.top_dendrogram = Some(linkage);
        Ok(())
    }

    pub fn set_left_dendrogram(&mut self, linkage: impl IntoLinkage) -> Result<()> {
        let linkage = linkage.into_linkage()?;
        self.reset_plot();
        self.left_colorbar_labels = Some(self.derive_colorbar_labels(&linkage));
        self.left_dendrogram = Some(linkage);
        Ok(())
    }

    pub fn clear_top_dendrogram(&mut self) {
        self.top_dendrogram = None;
        self.top_colorbar_labels = None;
        self.reset_plot();
    }

    pub fn clear_left_dendrogram(&mut self) {
        self.left_dendrogram = None;
        self.left_colorbar_labels = None;
        self.reset_plot();
    }

    // ---- labels ----

    pub fn row_labels(&self) -> Option<&[String]> {
        self.row_labels.as_deref()
    }

    pub fn col_labels(&self) -> Option<&[String]> {
        self.col_labels.as_deref()
    }

    /// Checks labels against the matrix. Returns the labels to store and the
    /// warning to surface, if any.
    fn check_labels(
        &self,
        labels: Option<Vec<String>>,
        axis: Axis,
    ) -> (Option<Vec<String>>, Option<LabelWarning>) {
        let labels = match labels {
            Some(l) => l,
            None => return (None, None),
        };
        let expected = match (&self.data, axis) {
            (None, _) => return (Some(labels), Some(LabelWarning::DataNotSet { axis })),
            (Some(d), Axis::Rows) => d.nrows(),
            (Some(d), Axis::Columns) => d.ncols(),
        };
        if labels.len() != expected {
            let warning = LabelWarning::LengthMismatch { axis, expected, found: labels.len() };
            return (None, Some(warning));
        }
        (Some(labels), None)
    }

    fn surface(&self, warning: Option<LabelWarning>) -> Option<LabelWarning> {
        if self.verbose {
            if let Some(w) = &warning {
                warn!("{}", w);
            }
        }
        warning
    }

    /// Stores row labels. A count that does not match the matrix rows clears
    /// the labels instead; the returned warning may be ignored.
    pub fn set_row_labels(&mut self, labels: Option<Vec<String>>) -> Option<LabelWarning> {
        let (labels, warning) = self.check_labels(labels, Axis::Rows);
        self.row_labels = labels;
        self.reset_plot();
        self.surface(warning)
    }

    /// Column counterpart of [`DendroHeatMap::set_row_labels`].
    pub fn set_col_labels(&mut self, labels: Option<Vec<String>>) -> Option<LabelWarning> {
        let (labels, warning) = self.check_labels(labels, Axis::Columns);
        self.col_labels = labels;
        self.reset_plot();
        self.surface(warning)
    }

    /// Explicit row classes, drawn as the row color bar when no left
    /// dendrogram is set.
    pub fn set_row_colorbar_override(&mut self, classes: Option<Vec<i64>>) {
        self.row_colorbar_override = classes;
        self.reset_plot();
    }

    pub fn row_colorbar_override(&self) -> Option<&[i64]> {
        self.row_colorbar_override.as_deref()
    }

    /// Names listed beside the row color bar override, one per class in
    /// ascending class order.
    pub fn set_row_colorbar_legend_names(&mut self, names: Option<Vec<String>>) {
        self.row_colorbar_legend_names = names;
        self.reset_plot();
    }

    // ---- titles ----

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn set_top_dendro_title(&mut self, title: &str) {
        self.top_dendro_title = title.to_string();
    }

    pub fn set_left_dendro_title(&mut self, title: &str) {
        self.left_dendro_title = title.to_string();
    }

    pub fn set_color_legend_title(&mut self, title: &str) {
        self.color_legend_title = title.to_string();
    }

    // ---- rendering ----

    pub fn render(&mut self) -> Result<()> {
        self.render_with_frames(false)
    }

    /// Builds a fresh figure. With `show_frames` every panel gets an outline;
    /// color bars and the legend are always outlined.
    pub fn render_with_frames(&mut self, show_frames: bool) -> Result<()> {
        self.reset_plot();
        if self.verbose {
            info!("Rendering plot...");
        }
        let layout = &self.layout;
        let mut fig = Figure::new(layout.window_width, layout.window_height);
        let pad = TITLE_PAD_PT / 72.0 / layout.window_height;
        let threshold_ratio = layout.color_threshold_ratio;

        if let Some(z) = &self.top_dendrogram {
            let dendro = DendrogramLayout::compute(z, threshold_ratio * z.max_height());
            let (xlim, ylim) = dendro.limits(Orientation::Top);
            let rect = layout.top_dendrogram_rect();
            let panel = fig.add_panel(PanelKind::TopDendrogram, rect, xlim, ylim);
            dendro.draw(&mut fig, panel, Orientation::Top, layout.dendrogram_line_width);
            if show_frames {
                fig.frame(panel);
            }
            fig.figure_text(
                rect.x + rect.width / 2.0,
                rect.top() + pad,
                &self.top_dendro_title,
                TextStyle::new(layout.font_size).aligned(HAlign::Center, VAlign::Bottom),
            );
        }

        if let Some(z) = &self.left_dendrogram {
            let dendro = DendrogramLayout::compute(z, threshold_ratio * z.max_height());
            let (xlim, ylim) = dendro.limits(Orientation::Left);
            let rect = layout.left_dendrogram_rect();
            let panel = fig.add_panel(PanelKind::LeftDendrogram, rect, xlim, ylim);
            dendro.draw(&mut fig, panel, Orientation::Left, layout.dendrogram_line_width);
            if show_frames {
                fig.frame(panel);
            }
            fig.figure_text(
                rect.x + rect.width / 2.0,
                rect.top() + pad,
                &self.left_dendro_title,
                TextStyle::new(layout.font_size)
                    .rotated(Rotation::CounterClockwise)
                    .aligned(HAlign::Center, VAlign::Bottom),
            );
        }

        if let (Some(data), Some(norm)) = (&self.data, self.norm) {
            self.draw_heat_map(&mut fig, data, norm, show_frames);
        }

        if let (Some(labels), true) = (&self.top_colorbar_labels, layout.col_cb_on) {
            let palette = Colormap::cluster_palette(layout.cluster_palette_size);
            let classes: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
            let rect = layout.col_color_bar_rect();
            let panel = color_bar(&mut fig, PanelKind::ColumnColorBar, rect, &classes, &palette, false);
            fig.frame(panel);
        }

        if let (Some(labels), true) = (&self.left_colorbar_labels, layout.row_cb_on) {
            let palette = Colormap::cluster_palette(layout.cluster_palette_size);
            let classes: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
            let rect = layout.row_color_bar_rect();
            let panel = color_bar(&mut fig, PanelKind::RowColorBar, rect, &classes, &palette, true);
            fig.frame(panel);
        }

        if let Some(norm) = self.norm {
            self.draw_color_legend(&mut fig, norm, pad);
        }

        if let (Some(classes), None) = (&self.row_colorbar_override, &self.left_dendrogram) {
            self.draw_row_override(&mut fig, classes);
        }

        fig.figure_text(
            0.5,
            0.98,
            &self.title,
            TextStyle::new(layout.font_size * SUPTITLE_SCALE).aligned(HAlign::Center, VAlign::Top),
        );

        debug!("Figure has panels {:?}", fig.panel_kinds());
        self.figure = Some(fig);
        self.rendered = true;
        if self.verbose {
            info!("Plot rendered...");
        }
        Ok(())
    }

    fn draw_heat_map(&self, fig: &mut Figure, data: &Array2<f64>, norm: Normalize, show_frames: bool) {
        let layout = &self.layout;
        let (rows, cols) = data.dim();
        let panel = fig.add_panel(
            PanelKind::HeatMap,
            layout.heat_map_rect(),
            (-0.5, cols as f64 - 0.5),
            (-0.5, rows as f64 - 0.5),
        );
        let cmap = &self.colormap;
        let colors: Vec<Rgb<u8>> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|i| (0..cols).map(move |j| cmap.map(norm.apply(data[[i, j]]))))
            .collect();
        fig.raster(panel, rows, cols, colors);
        if show_frames {
            fig.frame(panel);
        }

        if let Some(labels) = &self.row_labels {
            if labels.len() < layout.max_row_labels {
                let style = TextStyle::new(layout.row_labels_size);
                for (i, label) in labels.iter().take(rows).enumerate() {
                    fig.text(panel, cols as f64 - 0.5, i as f64 - 0.5, &format!(" {}", label), style);
                }
            }
        }
        if let Some(labels) = &self.col_labels {
            if labels.len() < layout.max_col_labels {
                let style = TextStyle::new(layout.col_labels_size)
                    .rotated(Rotation::Clockwise)
                    .aligned(HAlign::Left, VAlign::Top);
                for (j, label) in labels.iter().take(cols).enumerate() {
                    fig.text(panel, j as f64 - 0.2, -0.5, &format!(" {}", label), style);
                }
            }
        }
    }

    fn draw_color_legend(&self, fig: &mut Figure, norm: Normalize, pad: f64) {
        let layout = &self.layout;
        let rect = layout.color_legend_rect();
        let (lo, hi) = if norm.vmax > norm.vmin { (norm.vmin, norm.vmax) } else { (norm.vmin - 0.5, norm.vmin + 0.5) };
        let panel = fig.add_panel(PanelKind::ColorLegend, rect, (lo, hi), (0.0, 1.0));
        let gradient: Vec<Rgb<u8>> = (0..self.colormap.len()).map(|i| self.colormap.get(i)).collect();
        fig.raster(panel, 1, gradient.len(), gradient);
        fig.frame(panel);

        let tick_len = TICK_LENGTH_PT / 72.0 / layout.window_height;
        let tick_style = TextStyle::new(layout.font_size * TICK_LABEL_SCALE).aligned(HAlign::Center, VAlign::Top);
        let values = ticks::max_n_ticks(lo, hi, layout.color_legend_ticks);
        for (value, label) in values.iter().zip(ticks::format_ticks(&values)) {
            let (fx, _) = fig.panel(panel).to_figure(*value, 0.0);
            fig.line(panel, &[(*value, 0.0), (*value, -tick_len / rect.height)], BLACK, 0.8);
            fig.figure_text(fx, rect.y - tick_len * 1.5, &label, tick_style);
        }

        fig.figure_text(
            rect.x + rect.width / 2.0,
            rect.top() + pad,
            &self.color_legend_title,
            TextStyle::new(layout.font_size).aligned(HAlign::Center, VAlign::Bottom),
        );
    }

    fn draw_row_override(&self, fig: &mut Figure, classes: &[i64]) {
        if classes.is_empty() {
            return;
        }
        let layout = &self.layout;
        let n_classes = distinct(classes.iter().copied());
        debug!("Row color bar override with {} classes", n_classes);
        let palette = Colormap::cluster_palette(n_classes);
        let rect = layout.row_color_bar_rect();
        let panel = color_bar(fig, PanelKind::RowColorBar, rect, classes, &palette, true);
        fig.frame(panel);

        let names = match &self.row_colorbar_legend_names {
            Some(names) => names,
            None => return,
        };
        let mut sorted: Vec<i64> = classes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let (lo, hi) = (sorted[0], sorted[sorted.len() - 1]);
        let norm = Normalize::new(lo as f64, hi as f64);

        let line = layout.row_labels_size * 1.6 / 72.0 / layout.window_height;
        let swatch = layout.color_bar_width;
        let right = rect.x - layout.left_dendro_x_distance_to_row_cb;
        let style = TextStyle::new(layout.row_labels_size).aligned(HAlign::Right, VAlign::Center);
        for (k, (class, name)) in sorted.iter().zip(names).enumerate() {
            let y = rect.top() - line * (k as f64 + 0.5);
            let swatch_rect = FracRect::new(right - swatch, y - line * 0.35, swatch, line * 0.7);
            let legend = fig.add_panel(PanelKind::RowColorBar, swatch_rect, (0.0, 1.0), (0.0, 1.0));
            fig.fill(legend, (0.0, 0.0), (1.0, 1.0), palette.map(norm.apply(*class as f64)));
            fig.frame(legend);
            fig.figure_text(right - swatch * 1.3, y, name, style);
        }
    }

    pub fn show(&mut self) -> Result<()> {
        self.show_with(&mut SystemViewer::new())
    }

    /// Renders afresh and hands the figure to `viewer`, returning once the
    /// viewer is done.
    pub fn show_with<V: Viewer>(&mut self, viewer: &mut V) -> Result<()> {
        self.reset_plot();
        self.render()?;
        if let Some(fig) = &self.figure {
            let image = fig.rasterize(self.layout.screen_dpi);
            viewer.display(&image, &self.title)?;
        }
        Ok(())
    }

    /// Renders and writes the figure at `export_dpi`. A path without an
    /// extension is left alone: nothing is rendered or written and the
    /// `.png` name it would have used is returned.
    pub fn export(&mut self, path: impl AsRef<Path>) -> Result<ExportStatus> {
        self.reset_plot();
        let path = path.as_ref();
        if path.extension().is_none() {
            let mut name = OsString::from(path.as_os_str());
            name.push(".png");
            let suggested = PathBuf::from(name);
            if self.verbose {
                warn!("No extension on {:?}, nothing exported (did you mean {:?}?)", path, suggested);
            }
            return Ok(ExportStatus::Skipped { suggested });
        }

        if self.verbose {
            info!("Saving plot to: {:?}", path);
        }
        self.render()?;
        if let Some(fig) = &self.figure {
            fig.save(path, self.layout.export_dpi)?;
        }
        Ok(ExportStatus::Written(path.to_path_buf()))
    }

    /// Value under a cursor placed in heat map data coordinates. The cell is
    /// the nearest one, `floor(v + 0.5)` on each axis, so a cursor more than
    /// half a cell left of or below the grid (e.g. `x = -0.7`) reads no value.
    /// Truncating toward zero instead would report cell 0 there.
    pub fn format_coord(&self, x: f64, y: f64) -> CoordReadout {
        let value = self.data.as_ref().and_then(|data| {
            let col = (x + 0.5).floor();
            let row = (y + 0.5).floor();
            if col >= 0.0 && row >= 0.0 && (col as usize) < data.ncols() && (row as usize) < data.nrows() {
                Some(data[[row as usize, col as usize]])
            } else {
                None
            }
        });
        CoordReadout { x, y, value }
    }
}

fn distinct<I: IntoIterator<Item = i64>>(values: I) -> usize {
    values.into_iter().collect::<FxHashSet<i64>>().len()
}

/// Draws a one-cell-wide strip of class colors; `vertical` strips have the
/// first class at the bottom.
fn color_bar(
    fig: &mut Figure,
    kind: PanelKind,
    rect: FracRect,
    classes: &[i64],
    palette: &Colormap,
    vertical: bool,
) -> PanelId {
    let n = classes.len().max(1);
    let (lo, hi) = classes
        .iter()
        .fold((i64::MAX, i64::MIN), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    let norm = Normalize::new(lo as f64, hi as f64);
    let colors: Vec<Rgb<u8>> = classes.iter().map(|&c| palette.map(norm.apply(c as f64))).collect();
    if vertical {
        let panel = fig.add_panel(kind, rect, (-0.5, 0.5), (-0.5, n as f64 - 0.5));
        if !colors.is_empty() {
            fig.raster(panel, colors.len(), 1, colors);
        }
        panel
    } else {
        let panel = fig.add_panel(kind, rect, (-0.5, n as f64 - 0.5), (-0.5, 0.5));
        if !colors.is_empty() {
            fig.raster(panel, 1, colors.len(), colors);
        }
        panel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{cluster_axis, Method, Metric};
    use crate::figure::Item;
    use crate::viewer::Viewer;
    use image::RgbImage;

    fn matrix(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(i, j)| ((i * 7 + j * 13) as f64).sin() * 50.0 + i as f64)
    }

    fn linkage_for(data: &Array2<f64>) -> Linkage {
        cluster_axis(data.view(), Axis::Rows, Metric::Euclidean, Method::Average).unwrap()
    }

    fn small_export_layout() -> Layout {
        Layout { export_dpi: 20.0, ..Layout::default() }
    }

    #[test]
    fn test_data_sets_normalization_range() {
        let data = matrix(10, 10);
        let lo = data.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let heatmap = DendroHeatMap::with_data(data).unwrap();
        assert_eq!(heatmap.normalization(), Some(Normalize::new(lo, hi)));
    }

    #[test]
    fn test_invalid_data_leaves_state_unchanged() {
        let mut heatmap = DendroHeatMap::with_data(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(heatmap.set_heat_map_data(ragged), Err(HeatmapError::InvalidData(_))));
        let empty: Vec<Vec<f64>> = Vec::new();
        assert!(matches!(heatmap.set_heat_map_data(empty), Err(HeatmapError::InvalidData(_))));
        let all_nan = vec![vec![f64::NAN]];
        assert!(matches!(heatmap.set_heat_map_data(all_nan), Err(HeatmapError::InvalidData(_))));

        assert_eq!(heatmap.heat_map_data().unwrap().dim(), (2, 2));
        assert_eq!(heatmap.normalization(), Some(Normalize::new(1.0, 4.0)));
    }

    #[test]
    fn test_invalid_dendrogram_is_rejected() {
        let mut heatmap = DendroHeatMap::default();
        let bad = vec![[0.0, 5.0, 1.0, 2.0]];
        assert!(matches!(heatmap.set_top_dendrogram(bad), Err(HeatmapError::InvalidLinkage(_))));
        assert!(heatmap.top_dendrogram().is_none());
        assert!(heatmap.top_colorbar_labels().is_none());
    }

    #[test]
    fn test_dendrogram_derives_one_label_per_leaf() {
        let data = matrix(10, 10);
        let z = linkage_for(&data);
        assert_eq!(z.merges().len(), 9);

        let mut heatmap = DendroHeatMap::default();
        heatmap.set_left_dendrogram(&z).unwrap();
        let labels = heatmap.left_colorbar_labels().unwrap();
        assert_eq!(labels.len(), 10);
        assert_eq!(labels.to_vec(), z.leaf_ordered_clusters(0.7 * z.max_height()));
    }

    #[test]
    fn test_permuted_leaves_keep_cluster_multiset() {
        let data = matrix(12, 4);
        let z = linkage_for(&data);
        let swapped: Vec<_> = z
            .merges()
            .iter()
            .map(|m| crate::linkage::Merge::new(m.right, m.left, m.height, m.size))
            .collect();

        let mut heatmap = DendroHeatMap::default();
        heatmap.set_top_dendrogram(&z).unwrap();
        let mut original = heatmap.top_colorbar_labels().unwrap().to_vec();
        heatmap.set_top_dendrogram(swapped).unwrap();
        let mut permuted = heatmap.top_colorbar_labels().unwrap().to_vec();

        let mut reversed_leaves = z.leaves();
        reversed_leaves.reverse();
        assert_eq!(heatmap.top_dendrogram().unwrap().leaves(), reversed_leaves);

        // ids are numbered in traversal order, so compare cluster sizes
        let sizes = |v: &mut Vec<u32>| {
            v.sort_unstable();
            let mut sizes: Vec<usize> = v.chunk_by(|a, b| a == b).map(|c| c.len()).collect();
            sizes.sort_unstable();
            sizes
        };
        assert_eq!(sizes(&mut original), sizes(&mut permuted));
        assert_eq!(original.len(), permuted.len());
    }

    #[test]
    fn test_relabelled_observations_keep_cluster_ids() {
        let z = linkage_for(&matrix(5, 4));
        let n = z.n_leaves();
        let p = [4, 2, 0, 3, 1];
        let relabel = |c: usize| if c < n { p[c] } else { c };
        let relabelled: Vec<_> = z
            .merges()
            .iter()
            .map(|m| crate::linkage::Merge::new(relabel(m.left), relabel(m.right), m.height, m.size))
            .collect();

        let mut heatmap = DendroHeatMap::default();
        heatmap.set_left_dendrogram(&z).unwrap();
        let mut original = heatmap.left_colorbar_labels().unwrap().to_vec();
        heatmap.set_left_dendrogram(relabelled).unwrap();
        let mut permuted = heatmap.left_colorbar_labels().unwrap().to_vec();

        let expected_leaves: Vec<usize> = z.leaves().into_iter().map(|l| p[l]).collect();
        assert_eq!(heatmap.left_dendrogram().unwrap().leaves(), expected_leaves);

        original.sort_unstable();
        permuted.sort_unstable();
        assert_eq!(original, permuted);
    }

    #[test]
    fn test_clearing_dendrogram_drops_its_panels() {
        let data = matrix(10, 10);
        let z = linkage_for(&data);
        let mut heatmap = DendroHeatMap::with_data(data).unwrap();
        heatmap.set_top_dendrogram(&z).unwrap();
        heatmap.render().unwrap();
        assert!(heatmap.is_rendered());

        heatmap.clear_top_dendrogram();
        assert!(!heatmap.is_rendered());
        assert!(heatmap.figure().is_none());
        assert!(heatmap.top_colorbar_labels().is_none());

        heatmap.render().unwrap();
        let kinds = heatmap.figure().unwrap().panel_kinds();
        assert!(!kinds.contains(&PanelKind::TopDendrogram));
        assert!(!kinds.contains(&PanelKind::ColumnColorBar));
    }

    #[test]
    fn test_mismatched_labels_are_cleared_without_error() {
        let mut heatmap = DendroHeatMap::with_data(matrix(4, 3)).unwrap();
        let names = |n: usize| Some((0..n).map(|i| format!("r{}", i)).collect::<Vec<_>>());

        assert_eq!(heatmap.set_row_labels(names(4)), None);
        assert_eq!(heatmap.row_labels().unwrap().len(), 4);

        let warning = heatmap.set_row_labels(names(3));
        assert_eq!(warning, Some(LabelWarning::LengthMismatch { axis: Axis::Rows, expected: 4, found: 3 }));
        assert!(heatmap.row_labels().is_none());

        // columns are checked against the column count
        assert_eq!(heatmap.set_col_labels(names(3)), None);
        assert!(heatmap.set_col_labels(names(4)).is_some());
        assert!(heatmap.col_labels().is_none());
    }

    #[test]
    fn test_labels_before_data_are_kept() {
        let mut heatmap = DendroHeatMap::default();
        let warning = heatmap.set_col_labels(Some(vec!["a".to_string()]));
        assert_eq!(warning, Some(LabelWarning::DataNotSet { axis: Axis::Columns }));
        assert_eq!(heatmap.col_labels().unwrap(), ["a".to_string()]);
    }

    #[test]
    fn test_mutations_invalidate_figure() {
        let mut heatmap = DendroHeatMap::with_data(matrix(3, 3)).unwrap();
        heatmap.render().unwrap();
        heatmap.set_colormap(Colormap::yellow_black_blue());
        assert!(!heatmap.is_rendered());

        heatmap.render().unwrap();
        heatmap.set_row_labels(None);
        assert!(heatmap.figure().is_none());

        heatmap.render().unwrap();
        heatmap.set_heat_map_data(matrix(2, 2)).unwrap();
        assert!(heatmap.figure().is_none());
    }

    #[test]
    fn test_render_data_only() {
        let mut heatmap = DendroHeatMap::with_data(matrix(10, 10)).unwrap();
        heatmap.render().unwrap();
        assert!(heatmap.is_rendered());
        assert_eq!(
            heatmap.figure().unwrap().panel_kinds(),
            vec![PanelKind::HeatMap, PanelKind::ColorLegend]
        );
    }

    #[test]
    fn test_render_all_six_panels() {
        let data = matrix(10, 10);
        let z = linkage_for(&data);
        let mut heatmap = DendroHeatMap::with_data(data).unwrap();
        heatmap.set_top_dendrogram(&z).unwrap();
        heatmap.set_left_dendrogram(&z).unwrap();
        heatmap.set_title("An example heatmap");
        heatmap.render().unwrap();

        assert_eq!(
            heatmap.figure().unwrap().panel_kinds(),
            vec![
                PanelKind::TopDendrogram,
                PanelKind::LeftDendrogram,
                PanelKind::HeatMap,
                PanelKind::ColumnColorBar,
                PanelKind::RowColorBar,
                PanelKind::ColorLegend,
            ]
        );
        assert_eq!(heatmap.top_colorbar_labels().unwrap().len(), 10);
        assert_eq!(heatmap.left_colorbar_labels().unwrap().len(), 10);
        let has_title = heatmap.figure().unwrap().items().iter().any(
            |item| matches!(item, Item::Text { text, .. } if text == "An example heatmap"),
        );
        assert!(has_title);
    }

    #[test]
    fn test_color_bars_can_be_switched_off() {
        let data = matrix(10, 10);
        let z = linkage_for(&data);
        let mut heatmap = DendroHeatMap::with_data(data).unwrap();
        heatmap.set_top_dendrogram(&z).unwrap();
        heatmap.layout_mut().col_cb_on = false;
        heatmap.render().unwrap();
        assert!(!heatmap.figure().unwrap().panel_kinds().contains(&PanelKind::ColumnColorBar));
    }

    #[test]
    fn test_label_cap() {
        let mut heatmap = DendroHeatMap::with_data(matrix(5, 5)).unwrap();
        heatmap.set_row_labels(Some((0..5).map(|i| format!("row{}", i)).collect()));
        heatmap.render().unwrap();
        let texts = |h: &DendroHeatMap| {
            h.figure()
                .unwrap()
                .items()
                .iter()
                .filter(|item| matches!(item, Item::Text { text, .. } if text.starts_with(" row")))
                .count()
        };
        assert_eq!(texts(&heatmap), 5);

        heatmap.layout_mut().max_row_labels = 5;
        heatmap.render().unwrap();
        assert_eq!(texts(&heatmap), 0);
    }

    #[test]
    fn test_row_override_without_left_dendrogram() {
        let mut heatmap = DendroHeatMap::with_data(matrix(6, 2)).unwrap();
        heatmap.set_row_colorbar_override(Some(vec![3, 3, 7, 7, 9, 9]));
        heatmap.set_row_colorbar_legend_names(Some(vec!["a".into(), "b".into(), "c".into()]));
        heatmap.render().unwrap();
        let fig = heatmap.figure().unwrap();
        let bars = fig.panel_kinds().iter().filter(|k| **k == PanelKind::RowColorBar).count();
        // the strip plus one swatch per class
        assert_eq!(bars, 4);
        let names: Vec<&str> = fig
            .items()
            .iter()
            .filter_map(|item| match item {
                Item::Text { text, .. } if ["a", "b", "c"].contains(&text.as_str()) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        // a left dendrogram takes precedence
        heatmap.set_left_dendrogram(linkage_for(&matrix(6, 2))).unwrap();
        heatmap.render().unwrap();
        let bars = heatmap
            .figure()
            .unwrap()
            .panel_kinds()
            .iter()
            .filter(|k| **k == PanelKind::RowColorBar)
            .count();
        assert_eq!(bars, 1);
    }

    #[test]
    fn test_export_without_extension_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut heatmap = DendroHeatMap::with_data(matrix(10, 10)).unwrap();
        heatmap.render().unwrap();

        let target = dir.path().join("out");
        let status = heatmap.export(&target).unwrap();
        assert_eq!(status, ExportStatus::Skipped { suggested: dir.path().join("out.png") });
        assert!(!heatmap.is_rendered());
        assert!(!target.exists());
        assert!(!dir.path().join("out.png").exists());
    }

    #[test]
    fn test_export_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut heatmap = DendroHeatMap::new(small_export_layout());
        heatmap.set_heat_map_data(matrix(10, 10)).unwrap();

        let target = dir.path().join("out.png");
        let status = heatmap.export(&target).unwrap();
        assert_eq!(status, ExportStatus::Written(target.clone()));
        assert!(heatmap.is_rendered());
        let img = image::open(&target).unwrap();
        assert_eq!((img.width(), img.height()), (280, 200));
    }

    #[test]
    fn test_export_svg_and_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut heatmap = DendroHeatMap::new(small_export_layout());
        heatmap.set_heat_map_data(matrix(4, 4)).unwrap();

        let svg = dir.path().join("out.svg");
        heatmap.export(&svg).unwrap();
        assert!(std::fs::read_to_string(&svg).unwrap().starts_with("<svg"));

        let res = heatmap.export(dir.path().join("out.nope"));
        assert!(matches!(res, Err(HeatmapError::UnsupportedFormat(_))));
    }

    struct RecordingViewer {
        sizes: Vec<(u32, u32)>,
    }

    impl Viewer for RecordingViewer {
        fn display(&mut self, image: &RgbImage, _title: &str) -> Result<()> {
            self.sizes.push(image.dimensions());
            Ok(())
        }
    }

    #[test]
    fn test_show_renders_at_screen_dpi() {
        let mut heatmap = DendroHeatMap::with_data(matrix(3, 3)).unwrap();
        let mut viewer = RecordingViewer { sizes: Vec::new() };
        heatmap.show_with(&mut viewer).unwrap();
        assert_eq!(viewer.sizes, vec![(1400, 1000)]);
        assert!(heatmap.is_rendered());
    }

    #[test]
    fn test_format_coord() {
        let heatmap = DendroHeatMap::with_data(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let inside = heatmap.format_coord(0.6, 0.4);
        assert_eq!(inside.value, Some(2.0));
        assert_eq!(inside.to_string(), "x=0.6000, y=0.4000, z=2.0000");

        let outside = heatmap.format_coord(-0.7, 1.0);
        assert_eq!(outside.value, None);
        assert_eq!(outside.to_string(), "x=-0.7000, y=1.0000");
        // within half a cell of the grid still reads the edge cell
        assert_eq!(heatmap.format_coord(-0.4, -0.4).value, Some(1.0));

        assert_eq!(DendroHeatMap::default().format_coord(0.0, 0.0).value, None);
    }
}
