//! A figure is an ordered display list of primitives placed in figure-fraction
//! coordinates (origin bottom-left, both axes 0..1). It can be rasterized at
//! any resolution or written out as SVG.

use std::fmt::Write as _;
use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use log::debug;
use rayon::prelude::*;

use crate::error::{HeatmapError, Result};
use crate::font::{self, Rotation};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Points per inch; text sizes and line widths are given in points.
const POINTS_PER_INCH: f64 = 72.0;
const FRAME_WIDTH_PT: f64 = 0.8;

/// Rectangle in figure fractions: left, bottom, width, height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FracRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FracRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        FracRect { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    TopDendrogram,
    LeftDendrogram,
    HeatMap,
    ColumnColorBar,
    RowColorBar,
    ColorLegend,
}

/// Handle to a panel of a [`Figure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelId(usize);

/// A rectangular region with its own data coordinates. `xlim`/`ylim` give the
/// data values at the left/right and bottom/top edges; reversed limits flip
/// the axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub kind: PanelKind,
    pub rect: FracRect,
    pub xlim: (f64, f64),
    pub ylim: (f64, f64),
}

impl Panel {
    pub fn to_figure(&self, x: f64, y: f64) -> (f64, f64) {
        let fx = (x - self.xlim.0) / (self.xlim.1 - self.xlim.0);
        let fy = (y - self.ylim.0) / (self.ylim.1 - self.ylim.0);
        (self.rect.x + fx * self.rect.width, self.rect.y + fy * self.rect.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size_pt: f64,
    pub color: Rgb<u8>,
    pub rotation: Rotation,
    pub halign: HAlign,
    pub valign: VAlign,
}

impl TextStyle {
    pub fn new(size_pt: f64) -> Self {
        TextStyle {
            size_pt,
            color: BLACK,
            rotation: Rotation::None,
            halign: HAlign::Left,
            valign: VAlign::Bottom,
        }
    }

    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn aligned(mut self, halign: HAlign, valign: VAlign) -> Self {
        self.halign = halign;
        self.valign = valign;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Rect { rect: FracRect, color: Rgb<u8> },
    Frame { rect: FracRect },
    /// Cell grid with row 0 at the bottom, `colors` row-major.
    Raster { rect: FracRect, rows: usize, cols: usize, colors: Vec<Rgb<u8>> },
    Line { points: Vec<(f64, f64)>, color: Rgb<u8>, width_pt: f64 },
    Text { x: f64, y: f64, text: String, style: TextStyle },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    width_in: f64,
    height_in: f64,
    panels: Vec<Panel>,
    items: Vec<Item>,
}

impl Figure {
    pub fn new(width_in: f64, height_in: f64) -> Self {
        Figure { width_in, height_in, panels: Vec::new(), items: Vec::new() }
    }

    pub fn size_inches(&self) -> (f64, f64) {
        (self.width_in, self.height_in)
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, id: PanelId) -> &Panel {
        &self.panels[id.0]
    }

    pub fn panel_kinds(&self) -> Vec<PanelKind> {
        self.panels.iter().map(|p| p.kind).collect()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn add_panel(&mut self, kind: PanelKind, rect: FracRect, xlim: (f64, f64), ylim: (f64, f64)) -> PanelId {
        self.panels.push(Panel { kind, rect, xlim, ylim });
        PanelId(self.panels.len() - 1)
    }

    pub fn frame(&mut self, panel: PanelId) {
        let rect = self.panels[panel.0].rect;
        self.items.push(Item::Frame { rect });
    }

    /// Filled rectangle between two corners given in panel data coordinates.
    pub fn fill(&mut self, panel: PanelId, (x0, y0): (f64, f64), (x1, y1): (f64, f64), color: Rgb<u8>) {
        let p = &self.panels[panel.0];
        let (ax, ay) = p.to_figure(x0, y0);
        let (bx, by) = p.to_figure(x1, y1);
        let rect = FracRect::new(ax.min(bx), ay.min(by), (bx - ax).abs(), (by - ay).abs());
        self.items.push(Item::Rect { rect, color });
    }

    /// Fills the whole panel with a cell grid, row 0 at the bottom.
    pub fn raster(&mut self, panel: PanelId, rows: usize, cols: usize, colors: Vec<Rgb<u8>>) {
        debug_assert_eq!(colors.len(), rows * cols);
        let rect = self.panels[panel.0].rect;
        self.items.push(Item::Raster { rect, rows, cols, colors });
    }

    pub fn line(&mut self, panel: PanelId, points: &[(f64, f64)], color: Rgb<u8>, width_pt: f64) {
        let p = &self.panels[panel.0];
        let points = points.iter().map(|&(x, y)| p.to_figure(x, y)).collect();
        self.items.push(Item::Line { points, color, width_pt });
    }

    /// Text anchored at a point in panel data coordinates.
    pub fn text(&mut self, panel: PanelId, x: f64, y: f64, text: &str, style: TextStyle) {
        let (fx, fy) = self.panels[panel.0].to_figure(x, y);
        self.figure_text(fx, fy, text, style);
    }

    /// Text anchored at a point in figure fractions.
    pub fn figure_text(&mut self, x: f64, y: f64, text: &str, style: TextStyle) {
        if text.is_empty() {
            return;
        }
        self.items.push(Item::Text { x, y, text: text.to_string(), style });
    }

    pub fn pixel_size(&self, dpi: f64) -> (u32, u32) {
        let w = (self.width_in * dpi).round().max(1.0) as u32;
        let h = (self.height_in * dpi).round().max(1.0) as u32;
        (w, h)
    }

    /// Rasterizes the display list on a white canvas.
    pub fn rasterize(&self, dpi: f64) -> RgbImage {
        let (w, h) = self.pixel_size(dpi);
        debug!("Rasterizing figure at {} dpi ({}x{} px)", dpi, w, h);
        let mut canvas = Canvas { img: RgbImage::from_pixel(w, h, WHITE), dpi };
        for item in &self.items {
            canvas.draw(item);
        }
        canvas.img
    }

    /// SVG document in points, one user unit per point.
    pub fn to_svg(&self) -> String {
        let w = self.width_in * POINTS_PER_INCH;
        let h = self.height_in * POINTS_PER_INCH;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}pt" height="{h}pt" viewBox="0 0 {w} {h}">"#
        );
        let _ = writeln!(svg, r#"<rect x="0" y="0" width="{w}" height="{h}" fill="white"/>"#);
        for item in &self.items {
            svg_item(&mut svg, item, w, h);
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Writes the figure; `.svg` is written as vector output, everything else
    /// is rasterized at `dpi` and encoded by its extension.
    pub fn save(&self, path: &Path, dpi: f64) -> Result<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if ext == "svg" {
            std::fs::write(path, self.to_svg())?;
            return Ok(());
        }
        let format = ImageFormat::from_path(path).map_err(|_| HeatmapError::UnsupportedFormat(ext.clone()))?;
        if !format.can_write() {
            return Err(HeatmapError::UnsupportedFormat(ext));
        }
        self.rasterize(dpi).save_with_format(path, format)?;
        Ok(())
    }
}

struct Canvas {
    img: RgbImage,
    dpi: f64,
}

impl Canvas {
    fn px(&self, fx: f64) -> f64 {
        fx * self.img.width() as f64
    }

    fn py(&self, fy: f64) -> f64 {
        (1.0 - fy) * self.img.height() as f64
    }

    fn pt_to_px(&self, pt: f64) -> f64 {
        pt * self.dpi / POINTS_PER_INCH
    }

    /// Pixel bounds (left, top, right, bottom), right/bottom exclusive.
    fn bounds(&self, rect: &FracRect) -> (i32, i32, i32, i32) {
        let left = self.px(rect.x).round() as i32;
        let right = (self.px(rect.right()).round() as i32).max(left + 1);
        let top = self.py(rect.top()).round() as i32;
        let bottom = (self.py(rect.y).round() as i32).max(top + 1);
        (left, top, right, bottom)
    }

    fn fill_px(&mut self, left: i32, top: i32, right: i32, bottom: i32, color: Rgb<u8>) {
        if right > left && bottom > top {
            let r = Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32);
            draw_filled_rect_mut(&mut self.img, r, color);
        }
    }

    fn draw(&mut self, item: &Item) {
        match item {
            Item::Rect { rect, color } => {
                let (l, t, r, b) = self.bounds(rect);
                self.fill_px(l, t, r, b, *color);
            }
            Item::Frame { rect } => {
                let (l, t, r, b) = self.bounds(rect);
                let lw = self.pt_to_px(FRAME_WIDTH_PT).round().max(1.0) as i32;
                self.fill_px(l, t, r, t + lw, BLACK);
                self.fill_px(l, b - lw, r, b, BLACK);
                self.fill_px(l, t, l + lw, b, BLACK);
                self.fill_px(r - lw, t, r, b, BLACK);
            }
            Item::Raster { rect, rows, cols, colors } => self.draw_raster(rect, *rows, *cols, colors),
            Item::Line { points, color, width_pt } => {
                let lw = self.pt_to_px(*width_pt).max(1.0);
                for seg in points.windows(2) {
                    let a = (self.px(seg[0].0), self.py(seg[0].1));
                    let b = (self.px(seg[1].0), self.py(seg[1].1));
                    self.draw_segment(a, b, lw, *color);
                }
            }
            Item::Text { x, y, text, style } => self.draw_text(*x, *y, text, style),
        }
    }

    fn draw_raster(&mut self, rect: &FracRect, rows: usize, cols: usize, colors: &[Rgb<u8>]) {
        if rows == 0 || cols == 0 {
            return;
        }
        let (l, t, r, b) = self.bounds(rect);
        let (w, h) = (self.img.width() as i32, self.img.height() as i32);
        let (l, t, r, b) = (l.max(0), t.max(0), r.min(w), b.min(h));
        if r <= l || b <= t {
            return;
        }
        let (x0, x1) = (self.px(rect.x), self.px(rect.right()));
        let (y0, y1) = (self.py(rect.top()), self.py(rect.y));
        let lines: Vec<(i32, Vec<Rgb<u8>>)> = (t..b)
            .into_par_iter()
            .map(|py| {
                let fy = ((py as f64 + 0.5 - y0) / (y1 - y0)).clamp(0.0, 1.0);
                let row_from_top = ((fy * rows as f64) as usize).min(rows - 1);
                let row = rows - 1 - row_from_top;
                let line = (l..r)
                    .map(|px| {
                        let fx = ((px as f64 + 0.5 - x0) / (x1 - x0)).clamp(0.0, 1.0);
                        let col = ((fx * cols as f64) as usize).min(cols - 1);
                        colors[row * cols + col]
                    })
                    .collect();
                (py, line)
            })
            .collect();
        for (py, line) in lines {
            for (i, color) in line.into_iter().enumerate() {
                self.img.put_pixel((l + i as i32) as u32, py as u32, color);
            }
        }
    }

    fn draw_segment(&mut self, a: (f64, f64), b: (f64, f64), lw: f64, color: Rgb<u8>) {
        let half = lw / 2.0;
        if (a.0 - b.0).abs() < 1e-9 || (a.1 - b.1).abs() < 1e-9 {
            // axis aligned, draw as a box of the line width
            let left = (a.0.min(b.0) - half).round() as i32;
            let right = ((a.0.max(b.0) + half).round() as i32).max(left + 1);
            let top = (a.1.min(b.1) - half).round() as i32;
            let bottom = ((a.1.max(b.1) + half).round() as i32).max(top + 1);
            self.fill_px(left, top, right, bottom, color);
            return;
        }
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = (-dy / len, dx / len);
        let steps = lw.round().max(1.0) as i32;
        for k in 0..steps {
            let off = k as f64 - (steps - 1) as f64 / 2.0;
            let start = ((a.0 + nx * off) as f32, (a.1 + ny * off) as f32);
            let end = ((b.0 + nx * off) as f32, (b.1 + ny * off) as f32);
            draw_line_segment_mut(&mut self.img, start, end, color);
        }
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle) {
        let scale = font::scale_for(self.pt_to_px(style.size_pt));
        let (w, h) = font::rotated_extent(text, scale, style.rotation);
        let (ax, ay) = (self.px(x), self.py(y));
        let left = match style.halign {
            HAlign::Left => ax,
            HAlign::Center => ax - w as f64 / 2.0,
            HAlign::Right => ax - w as f64,
        };
        let top = match style.valign {
            VAlign::Top => ay,
            VAlign::Center => ay - h as f64 / 2.0,
            VAlign::Bottom => ay - h as f64,
        };
        font::draw_text(
            &mut self.img,
            left.round() as i64,
            top.round() as i64,
            text,
            scale,
            style.color,
            style.rotation,
        );
    }
}

fn hex(c: &Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", c.0[0], c.0[1], c.0[2])
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn svg_item(svg: &mut String, item: &Item, w: f64, h: f64) {
    let sx = |fx: f64| fx * w;
    let sy = |fy: f64| (1.0 - fy) * h;
    match item {
        Item::Rect { rect, color } => {
            let _ = writeln!(
                svg,
                r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="{}"/>"#,
                sx(rect.x),
                sy(rect.top()),
                rect.width * w,
                rect.height * h,
                hex(color)
            );
        }
        Item::Frame { rect } => {
            let _ = writeln!(
                svg,
                r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="none" stroke="black" stroke-width="{}"/>"#,
                sx(rect.x),
                sy(rect.top()),
                rect.width * w,
                rect.height * h,
                FRAME_WIDTH_PT
            );
        }
        Item::Raster { rect, rows, cols, colors } => {
            let cw = rect.width * w / *cols as f64;
            let ch = rect.height * h / *rows as f64;
            for row in 0..*rows {
                let y = sy(rect.top()) + (*rows - 1 - row) as f64 * ch;
                // merge runs of equal color along the row
                let mut start = 0;
                while start < *cols {
                    let color = colors[row * cols + start];
                    let mut end = start + 1;
                    while end < *cols && colors[row * cols + end] == color {
                        end += 1;
                    }
                    let _ = writeln!(
                        svg,
                        r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="{}"/>"#,
                        sx(rect.x) + start as f64 * cw,
                        y,
                        (end - start) as f64 * cw,
                        ch,
                        hex(&color)
                    );
                    start = end;
                }
            }
        }
        Item::Line { points, color, width_pt } => {
            let pts: Vec<String> = points.iter().map(|&(x, y)| format!("{:.3},{:.3}", sx(x), sy(y))).collect();
            let _ = writeln!(
                svg,
                r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                pts.join(" "),
                hex(color),
                width_pt
            );
        }
        Item::Text { x, y, text, style } => {
            let anchor = match style.halign {
                HAlign::Left => "start",
                HAlign::Center => "middle",
                HAlign::Right => "end",
            };
            let baseline = match style.valign {
                VAlign::Top => "hanging",
                VAlign::Center => "central",
                VAlign::Bottom => "text-after-edge",
            };
            let angle = match style.rotation {
                Rotation::None => 0,
                Rotation::Clockwise => 90,
                Rotation::CounterClockwise => -90,
            };
            let _ = writeln!(
                svg,
                r#"<text x="{x:.3}" y="{y:.3}" font-family="monospace" font-size="{size}" fill="{fill}" text-anchor="{anchor}" dominant-baseline="{baseline}" transform="rotate({angle} {x:.3} {y:.3})">{text}</text>"#,
                x = sx(*x),
                y = sy(*y),
                size = style.size_pt,
                fill = hex(&style.color),
                anchor = anchor,
                baseline = baseline,
                angle = angle,
                text = escape(text)
            );
        }
    }
}
