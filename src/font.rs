//! Built-in 5x8 bitmap font so text renders without system fonts.

use image::{Rgb, RgbImage};

pub const GLYPH_HEIGHT: u32 = 8;
/// Horizontal advance per character, one blank column after the 5 glyph columns.
pub const ADVANCE: u32 = 6;

/// Printable ASCII from ' ' to '~', one byte per glyph row, MSB leftmost.
const GLYPHS: [[u8; 8]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // space
    [0x20, 0x20, 0x20, 0x20, 0x20, 0x00, 0x20, 0x00], // !
    [0x50, 0x50, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00], // "
    [0x50, 0x50, 0xF8, 0x50, 0xF8, 0x50, 0x50, 0x00], // #
    [0x20, 0x78, 0xA0, 0x70, 0x28, 0xF0, 0x20, 0x00], // $
    [0xC0, 0xC8, 0x10, 0x20, 0x40, 0x98, 0x18, 0x00], // %
    [0x40, 0xA0, 0xA0, 0x40, 0xA8, 0x90, 0x68, 0x00], // &
    [0x20, 0x20, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00], // '
    [0x10, 0x20, 0x40, 0x40, 0x40, 0x20, 0x10, 0x00], // (
    [0x40, 0x20, 0x10, 0x10, 0x10, 0x20, 0x40, 0x00], // )
    [0x00, 0x20, 0xA8, 0x70, 0xA8, 0x20, 0x00, 0x00], // *
    [0x00, 0x20, 0x20, 0xF8, 0x20, 0x20, 0x00, 0x00], // +
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x20, 0x40], // ,
    [0x00, 0x00, 0x00, 0xF8, 0x00, 0x00, 0x00, 0x00], // -
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x20, 0x00], // .
    [0x00, 0x08, 0x10, 0x20, 0x40, 0x80, 0x00, 0x00], // /
    [0x70, 0x88, 0x98, 0xA8, 0xC8, 0x88, 0x70, 0x00], // 0
    [0x20, 0x60, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // 1
    [0x70, 0x88, 0x08, 0x30, 0x40, 0x80, 0xF8, 0x00], // 2
    [0xF8, 0x10, 0x20, 0x10, 0x08, 0x88, 0x70, 0x00], // 3
    [0x10, 0x30, 0x50, 0x90, 0xF8, 0x10, 0x10, 0x00], // 4
    [0xF8, 0x80, 0xF0, 0x08, 0x08, 0x88, 0x70, 0x00], // 5
    [0x30, 0x40, 0x80, 0xF0, 0x88, 0x88, 0x70, 0x00], // 6
    [0xF8, 0x08, 0x10, 0x20, 0x40, 0x40, 0x40, 0x00], // 7
    [0x70, 0x88, 0x88, 0x70, 0x88, 0x88, 0x70, 0x00], // 8
    [0x70, 0x88, 0x88, 0x78, 0x08, 0x10, 0x60, 0x00], // 9
    [0x00, 0x00, 0x20, 0x00, 0x00, 0x20, 0x00, 0x00], // :
    [0x00, 0x00, 0x20, 0x00, 0x00, 0x20, 0x20, 0x40], // ;
    [0x08, 0x10, 0x20, 0x40, 0x20, 0x10, 0x08, 0x00], // <
    [0x00, 0x00, 0xF8, 0x00, 0xF8, 0x00, 0x00, 0x00], // =
    [0x80, 0x40, 0x20, 0x10, 0x20, 0x40, 0x80, 0x00], // >
    [0x70, 0x88, 0x08, 0x10, 0x20, 0x00, 0x20, 0x00], // ?
    [0x70, 0x88, 0xB8, 0xA8, 0xB8, 0x80, 0x70, 0x00], // @
    [0x70, 0x88, 0x88, 0xF8, 0x88, 0x88, 0x88, 0x00], // A
    [0xF0, 0x88, 0x88, 0xF0, 0x88, 0x88, 0xF0, 0x00], // B
    [0x70, 0x88, 0x80, 0x80, 0x80, 0x88, 0x70, 0x00], // C
    [0xE0, 0x90, 0x88, 0x88, 0x88, 0x90, 0xE0, 0x00], // D
    [0xF8, 0x80, 0x80, 0xF0, 0x80, 0x80, 0xF8, 0x00], // E
    [0xF8, 0x80, 0x80, 0xF0, 0x80, 0x80, 0x80, 0x00], // F
    [0x70, 0x88, 0x80, 0xB8, 0x88, 0x88, 0x70, 0x00], // G
    [0x88, 0x88, 0x88, 0xF8, 0x88, 0x88, 0x88, 0x00], // H
    [0x70, 0x20, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // I
    [0x38, 0x10, 0x10, 0x10, 0x10, 0x90, 0x60, 0x00], // J
    [0x88, 0x90, 0xA0, 0xC0, 0xA0, 0x90, 0x88, 0x00], // K
    [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0xF8, 0x00], // L
    [0x88, 0xD8, 0xA8, 0xA8, 0x88, 0x88, 0x88, 0x00], // M
    [0x88, 0xC8, 0xA8, 0x98, 0x88, 0x88, 0x88, 0x00], // N
    [0x70, 0x88, 0x88, 0x88, 0x88, 0x88, 0x70, 0x00], // O
    [0xF0, 0x88, 0x88, 0xF0, 0x80, 0x80, 0x80, 0x00], // P
    [0x70, 0x88, 0x88, 0x88, 0xA8, 0x90, 0x68, 0x00], // Q
    [0xF0, 0x88, 0x88, 0xF0, 0xA0, 0x90, 0x88, 0x00], // R
    [0x70, 0x88, 0x80, 0x70, 0x08, 0x88, 0x70, 0x00], // S
    [0xF8, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00], // T
    [0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x70, 0x00], // U
    [0x88, 0x88, 0x88, 0x88, 0x88, 0x50, 0x20, 0x00], // V
    [0x88, 0x88, 0x88, 0xA8, 0xA8, 0xD8, 0x88, 0x00], // W
    [0x88, 0x88, 0x50, 0x20, 0x50, 0x88, 0x88, 0x00], // X
    [0x88, 0x88, 0x50, 0x20, 0x20, 0x20, 0x20, 0x00], // Y
    [0xF8, 0x08, 0x10, 0x20, 0x40, 0x80, 0xF8, 0x00], // Z
    [0x70, 0x40, 0x40, 0x40, 0x40, 0x40, 0x70, 0x00], // [
    [0x00, 0x80, 0x40, 0x20, 0x10, 0x08, 0x00, 0x00], // \
    [0x70, 0x10, 0x10, 0x10, 0x10, 0x10, 0x70, 0x00], // ]
    [0x20, 0x50, 0x88, 0x00, 0x00, 0x00, 0x00, 0x00], // ^
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF8, 0x00], // _
    [0x40, 0x20, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00], // `
    [0x00, 0x00, 0x70, 0x08, 0x78, 0x88, 0x78, 0x00], // a
    [0x80, 0x80, 0xB0, 0xC8, 0x88, 0x88, 0xF0, 0x00], // b
    [0x00, 0x00, 0x70, 0x80, 0x80, 0x88, 0x70, 0x00], // c
    [0x08, 0x08, 0x68, 0x98, 0x88, 0x88, 0x78, 0x00], // d
    [0x00, 0x00, 0x70, 0x88, 0xF8, 0x80, 0x70, 0x00], // e
    [0x30, 0x48, 0x40, 0xE0, 0x40, 0x40, 0x40, 0x00], // f
    [0x00, 0x00, 0x78, 0x88, 0x78, 0x08, 0x70, 0x00], // g
    [0x80, 0x80, 0xB0, 0xC8, 0x88, 0x88, 0x88, 0x00], // h
    [0x20, 0x00, 0x60, 0x20, 0x20, 0x20, 0x70, 0x00], // i
    [0x10, 0x00, 0x30, 0x10, 0x10, 0x90, 0x60, 0x00], // j
    [0x80, 0x80, 0x90, 0xA0, 0xC0, 0xA0, 0x90, 0x00], // k
    [0x60, 0x20, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // l
    [0x00, 0x00, 0xD0, 0xA8, 0xA8, 0xA8, 0xA8, 0x00], // m
    [0x00, 0x00, 0xB0, 0xC8, 0x88, 0x88, 0x88, 0x00], // n
    [0x00, 0x00, 0x70, 0x88, 0x88, 0x88, 0x70, 0x00], // o
    [0x00, 0x00, 0xF0, 0x88, 0xF0, 0x80, 0x80, 0x00], // p
    [0x00, 0x00, 0x78, 0x88, 0x78, 0x08, 0x08, 0x00], // q
    [0x00, 0x00, 0xB0, 0xC8, 0x80, 0x80, 0x80, 0x00], // r
    [0x00, 0x00, 0x70, 0x80, 0x70, 0x08, 0xF0, 0x00], // s
    [0x40, 0x40, 0xE0, 0x40, 0x40, 0x48, 0x30, 0x00], // t
    [0x00, 0x00, 0x88, 0x88, 0x88, 0x98, 0x68, 0x00], // u
    [0x00, 0x00, 0x88, 0x88, 0x88, 0x50, 0x20, 0x00], // v
    [0x00, 0x00, 0x88, 0x88, 0xA8, 0xA8, 0x50, 0x00], // w
    [0x00, 0x00, 0x88, 0x50, 0x20, 0x50, 0x88, 0x00], // x
    [0x00, 0x00, 0x88, 0x88, 0x78, 0x08, 0x70, 0x00], // y
    [0x00, 0x00, 0xF8, 0x10, 0x20, 0x40, 0xF8, 0x00], // z
    [0x10, 0x20, 0x20, 0x40, 0x20, 0x20, 0x10, 0x00], // {
    [0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00], // |
    [0x40, 0x20, 0x20, 0x10, 0x20, 0x20, 0x40, 0x00], // }
    [0x00, 0x00, 0x40, 0xA8, 0x10, 0x00, 0x00, 0x00], // ~
];

const UNKNOWN: [u8; 8] = [0x70, 0x88, 0x08, 0x10, 0x20, 0x00, 0x20, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    /// Reads top to bottom.
    Clockwise,
    /// Reads bottom to top.
    CounterClockwise,
}

fn glyph(c: char) -> &'static [u8; 8] {
    let code = c as u32;
    if (0x20..0x7f).contains(&code) {
        &GLYPHS[(code - 0x20) as usize]
    } else {
        &UNKNOWN
    }
}

/// Integer pixel scale that brings the 8 pixel glyph closest to `pixel_height`.
pub fn scale_for(pixel_height: f64) -> u32 {
    ((pixel_height / GLYPH_HEIGHT as f64).round() as u32).max(1)
}

/// Size of the text box before rotation: (length along the text, height).
pub fn text_extent(text: &str, scale: u32) -> (u32, u32) {
    let n = text.chars().count() as u32;
    (n * ADVANCE * scale, GLYPH_HEIGHT * scale)
}

/// Size of the text box once rotated, as (width, height) in the image.
pub fn rotated_extent(text: &str, scale: u32, rotation: Rotation) -> (u32, u32) {
    let (along, across) = text_extent(text, scale);
    match rotation {
        Rotation::None => (along, across),
        Rotation::Clockwise | Rotation::CounterClockwise => (across, along),
    }
}

fn fill_block(img: &mut RgbImage, x: i64, y: i64, scale: u32, color: Rgb<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    for dy in 0..scale as i64 {
        for dx in 0..scale as i64 {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && px < w && py < h {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Draws `text` with the top-left corner of its rotated box at `(x, y)`.
/// Pixels falling outside the image are dropped.
pub fn draw_text(
    img: &mut RgbImage,
    x: i64,
    y: i64,
    text: &str,
    scale: u32,
    color: Rgb<u8>,
    rotation: Rotation,
) {
    let s = scale as i64;
    let columns = text.chars().count() as i64 * ADVANCE as i64;
    for (i, c) in text.chars().enumerate() {
        let rows = glyph(c);
        for (v, row) in rows.iter().enumerate() {
            for bit in 0..8i64 {
                if (row >> (7 - bit)) & 1 == 0 {
                    continue;
                }
                let u = i as i64 * ADVANCE as i64 + bit;
                let v = v as i64;
                let (px, py) = match rotation {
                    Rotation::None => (x + u * s, y + v * s),
                    Rotation::Clockwise => (x + (GLYPH_HEIGHT as i64 - 1 - v) * s, y + u * s),
                    Rotation::CounterClockwise => (x + v * s, y + (columns - 1 - u) * s),
                };
                fill_block(img, px, py, scale, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn inked(img: &RgbImage) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, p)| **p == BLACK)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_extent_and_scale() {
        assert_eq!(text_extent("abc", 2), (36, 16));
        assert_eq!(rotated_extent("abc", 1, Rotation::Clockwise), (8, 18));
        assert_eq!(scale_for(3.0), 1);
        assert_eq!(scale_for(24.0), 3);
    }

    #[test]
    fn test_draw_text_horizontal() {
        let mut img = RgbImage::from_pixel(20, 10, Rgb([255, 255, 255]));
        draw_text(&mut img, 0, 0, "-", 1, BLACK, Rotation::None);
        // '-' is a single row of five pixels on glyph row 3
        assert_eq!(inked(&img), vec![(0, 3), (1, 3), (2, 3), (3, 3), (4, 3)]);
    }

    #[test]
    fn test_draw_text_rotated() {
        let mut img = RgbImage::from_pixel(10, 20, Rgb([255, 255, 255]));
        draw_text(&mut img, 0, 0, "-", 1, BLACK, Rotation::Clockwise);
        assert_eq!(inked(&img), vec![(4, 0), (4, 1), (4, 2), (4, 3), (4, 4)]);

        let mut img = RgbImage::from_pixel(10, 20, Rgb([255, 255, 255]));
        draw_text(&mut img, 0, 0, "-", 1, BLACK, Rotation::CounterClockwise);
        assert_eq!(inked(&img), vec![(3, 1), (3, 2), (3, 3), (3, 4), (3, 5)]);
    }

    #[test]
    fn test_draw_text_clips_at_border() {
        let mut img = RgbImage::from_pixel(3, 3, Rgb([255, 255, 255]));
        draw_text(&mut img, -1, -1, "W", 2, BLACK, Rotation::None);
        assert!(!inked(&img).is_empty());
    }
}
