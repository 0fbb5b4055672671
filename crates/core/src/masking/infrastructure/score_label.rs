use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;

const LABEL_COLOUR: [u8; 3] = [0, 255, 0];
const GLYPH_WIDTH: i32 = 5;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;
const LABEL_INSET: i32 = 2;

/// Formats a detection score the way it is drawn: two decimal places.
pub fn format_score(score: f32) -> String {
    format!("{score:.2}")
}

/// Draws `score` in green just inside the region's top-left corner.
///
/// Pixels falling outside the frame are clipped. Characters without a glyph
/// are skipped but still advance the cursor.
pub fn draw_score(frame: &mut Frame, region: &MaskRegion, score: f32) {
    draw_text(
        frame,
        region.x1 + LABEL_INSET,
        region.y1 + LABEL_INSET,
        &format_score(score),
    );
}

fn draw_text(frame: &mut Frame, mut x: i32, y: i32, text: &str) {
    let width = frame.width() as i32;
    let height = frame.height() as i32;
    let channels = frame.channels() as usize;
    let data = frame.data_mut();

    for ch in text.chars() {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                let py = y + row as i32;
                if py < 0 || py >= height {
                    continue;
                }
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let px = x + col;
                    if px < 0 || px >= width {
                        continue;
                    }
                    let offset = (py as usize * width as usize + px as usize) * channels;
                    paint(&mut data[offset..offset + channels]);
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

fn paint(pixel: &mut [u8]) {
    if pixel.len() >= 3 {
        pixel[..3].copy_from_slice(&LABEL_COLOUR);
        for alpha in &mut pixel[3..] {
            *alpha = u8::MAX;
        }
    } else {
        pixel.fill(u8::MAX);
    }
}

/// 5x7 bitmap glyphs, one byte per row, most significant of the low five
/// bits on the left.
fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        '0' => Some([0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
        '1' => Some([0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
        '2' => Some([0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
        '3' => Some([0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110]),
        '4' => Some([0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
        '5' => Some([0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
        '6' => Some([0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
        '7' => Some([0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
        '8' => Some([0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
        '9' => Some([0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
        '.' => Some([0, 0, 0, 0, 0, 0b00110, 0b00110]),
        '-' => Some([0, 0, 0, 0b11111, 0, 0, 0]),
        _ => None,
    }
}
