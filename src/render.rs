//! Terminal backend: maps the RGBA subpixel canvas onto braille cells and
//! presents them with diff-based updates, plus the HUD and help overlay.

use crate::surface::{PixelCanvas, Rgba};
use crate::theme::Palette;
use anyhow::Result;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Rows reserved at the top for status text; the field renders below them.
pub(crate) const HUD_ROWS: u16 = 2;

/// How far a composited subpixel's luminance must differ from the themed
/// background before its braille dot lights up. Keeps the translucent trail
/// wash from lighting the whole grid.
const DOT_THRESHOLD: f32 = 0.06;

pub(crate) fn braille_char(mask: u8) -> char {
    // Unicode braille starts at 0x2800; the mask already uses dot order.
    char::from_u32(0x2800 + mask as u32).unwrap_or(' ')
}

pub(crate) fn dot_bit(dx: usize, dy: usize) -> u8 {
    match (dx, dy) {
        (0, 0) => 0x01, // dot1
        (0, 1) => 0x02, // dot2
        (0, 2) => 0x04, // dot3
        (0, 3) => 0x40, // dot7
        (1, 0) => 0x08, // dot4
        (1, 1) => 0x10, // dot5
        (1, 2) => 0x20, // dot6
        (1, 3) => 0x80, // dot8
        _ => 0,
    }
}

fn luminance(r: u8, g: u8, b: u8) -> f32 {
    (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0
}

/// Composite a canvas pixel over the opaque themed background.
fn over_background(px: crate::surface::Pixel, bg: Rgba) -> (u8, u8, u8) {
    let a = px.a as f32 / 255.0;
    let mix = |src: u8, dst: u8| -> u8 {
        (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8
    };
    (mix(px.r, bg.r), mix(px.g, bg.g), mix(px.b, bg.b))
}

/// Collapse one cell's 2x4 subpixels into a braille mask and a foreground
/// color (average of the lit dots).
pub(crate) fn cell_from_subpixels(
    canvas: &PixelCanvas,
    cell_x: u32,
    cell_y: u32,
    bg: Rgba,
) -> (u8, (u8, u8, u8)) {
    let bg_lum = luminance(bg.r, bg.g, bg.b);
    let mut mask: u8 = 0;
    let mut sum = (0u32, 0u32, 0u32);
    let mut lit = 0u32;

    for dy in 0..4 {
        for dx in 0..2 {
            let sx = cell_x * 2 + dx as u32;
            let sy = cell_y * 4 + dy as u32;
            if sx >= canvas.w || sy >= canvas.h {
                continue;
            }
            let (r, g, b) = over_background(canvas.px[canvas.idx(sx, sy)], bg);
            if (luminance(r, g, b) - bg_lum).abs() > DOT_THRESHOLD {
                mask |= dot_bit(dx, dy);
                sum.0 += r as u32;
                sum.1 += g as u32;
                sum.2 += b as u32;
                lit += 1;
            }
        }
    }

    let color = if lit == 0 {
        (bg.r, bg.g, bg.b)
    } else {
        ((sum.0 / lit) as u8, (sum.1 / lit) as u8, (sum.2 / lit) as u8)
    };
    (mask, color)
}

fn term_color(rgb: (u8, u8, u8)) -> Color {
    Color::Rgb {
        r: rgb.0,
        g: rgb.1,
        b: rgb.2,
    }
}

fn to_color(c: Rgba) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

pub(crate) fn pad_to(s: &str, w: usize) -> String {
    if s.chars().count() >= w {
        s.chars().take(w).collect()
    } else {
        let mut out = String::with_capacity(w);
        out.push_str(s);
        for _ in 0..w - s.chars().count() {
            out.push(' ');
        }
        out
    }
}

pub(crate) struct Terminal {
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    prev_mask: Vec<u8>,
    prev_color: Vec<(u8, u8, u8)>,
    prev_valid: bool,
    ended: bool,
}

impl Terminal {
    pub(crate) fn begin() -> Result<Self> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            DisableLineWrap,
            cursor::Hide,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;
        let (cols, rows) = terminal::size()?;
        let mut term = Self {
            cols,
            rows,
            prev_mask: Vec::new(),
            prev_color: Vec::new(),
            prev_valid: false,
            ended: false,
        };
        term.resize(cols, rows);
        Ok(term)
    }

    pub(crate) fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        let cells = (cols as usize) * (rows as usize);
        self.prev_mask.clear();
        self.prev_mask.resize(cells, 0);
        self.prev_color.clear();
        self.prev_color.resize(cells, (0, 0, 0));
        self.prev_valid = false;
    }

    /// Force a full repaint on the next present (overlays dismissed, theme
    /// changed, anything that bypassed the diff cache).
    pub(crate) fn invalidate(&mut self) {
        self.prev_valid = false;
    }

    pub(crate) fn present(
        &mut self,
        canvas: Option<&PixelCanvas>,
        palette: &Palette,
        hud: &[String],
        help: bool,
    ) -> Result<()> {
        let mut out = io::stdout();
        queue!(out, BeginSynchronizedUpdate)?;
        queue!(out, SetBackgroundColor(to_color(palette.background)))?;

        let cols = self.cols as usize;

        for (i, line) in hud.iter().enumerate().take(HUD_ROWS as usize) {
            let color = if i == 0 { palette.hud_text } else { palette.hud_dim };
            queue!(
                out,
                cursor::MoveTo(0, i as u16),
                SetForegroundColor(to_color(color)),
                Print(pad_to(line, cols))
            )?;
        }

        if let Some(canvas) = canvas {
            // The canvas covers the whole grid; the HUD rows above are
            // overwritten with text every frame.
            for row in HUD_ROWS as u32..self.rows as u32 {
                for cx in 0..cols as u32 {
                    let (mask, color) = cell_from_subpixels(canvas, cx, row, palette.background);
                    let row = row as usize;
                    let cell_i = row * cols + cx as usize;

                    if self.prev_valid
                        && self.prev_mask[cell_i] == mask
                        && self.prev_color[cell_i] == color
                    {
                        continue;
                    }
                    self.prev_mask[cell_i] = mask;
                    self.prev_color[cell_i] = color;

                    let ch = if mask == 0 { ' ' } else { braille_char(mask) };
                    queue!(
                        out,
                        cursor::MoveTo(cx as u16, row as u16),
                        SetForegroundColor(term_color(color)),
                        Print(ch)
                    )?;
                }
            }
            self.prev_valid = true;
        }

        if help {
            self.draw_help(&mut out, palette)?;
            // The box punches through the diff cache; repaint fully once it
            // goes away.
            self.prev_valid = false;
        }

        queue!(out, ResetColor, EndSynchronizedUpdate)?;
        out.flush()?;
        Ok(())
    }

    fn draw_help<W: Write>(&self, out: &mut W, palette: &Palette) -> Result<()> {
        let w = self.cols as usize;
        let h = self.rows as usize;
        let lines = [
            "Q / Esc      Quit",
            "T            Toggle light/dark theme",
            "S            Streaks / dots",
            "W            Warp vignette",
            "Space        Pause",
            "Up/Down      Speed",
            "Left/Right   Star density",
            "R            Reseed",
            "H            Toggle this overlay",
        ];
        let box_w = std::cmp::min(w.saturating_sub(4), 46);
        let box_h = std::cmp::min(h.saturating_sub(4), lines.len() + 4);
        if box_w < 8 || box_h < 4 {
            return Ok(());
        }
        let x0 = (w - box_w) / 2;
        let y0 = (h - box_h) / 2;

        queue!(
            out,
            SetBackgroundColor(to_color(palette.background)),
            SetForegroundColor(to_color(palette.hud_dim)),
            cursor::MoveTo(x0 as u16, y0 as u16),
            Print(format!("+{}+", "-".repeat(box_w - 2)))
        )?;
        for i in 1..box_h - 1 {
            queue!(
                out,
                cursor::MoveTo(x0 as u16, (y0 + i) as u16),
                Print(format!("|{}|", " ".repeat(box_w - 2)))
            )?;
        }
        queue!(
            out,
            cursor::MoveTo(x0 as u16, (y0 + box_h - 1) as u16),
            Print(format!("+{}+", "-".repeat(box_w - 2)))
        )?;

        queue!(
            out,
            SetForegroundColor(to_color(palette.hud_text)),
            cursor::MoveTo((x0 + 2) as u16, (y0 + 1) as u16),
            Print(pad_to("CONTROLS", box_w - 4))
        )?;
        for (i, line) in lines.iter().enumerate() {
            let yy = y0 + 2 + i;
            if yy >= y0 + box_h - 1 {
                break;
            }
            queue!(
                out,
                cursor::MoveTo((x0 + 2) as u16, yy as u16),
                Print(pad_to(line, box_w - 4))
            )?;
        }
        Ok(())
    }

    pub(crate) fn end(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        let mut out = io::stdout();
        execute!(out, EndSynchronizedUpdate).ok();
        execute!(
            out,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Surface;

    const BLACK: Rgba = Rgba::new(0, 0, 0, 1.0);

    #[test]
    fn dot_bits_cover_the_braille_layout() {
        let mut all = 0u8;
        for dy in 0..4 {
            for dx in 0..2 {
                let bit = dot_bit(dx, dy);
                assert_eq!(all & bit, 0, "bit reused at ({}, {})", dx, dy);
                all |= bit;
            }
        }
        assert_eq!(all, 0xFF);
    }

    #[test]
    fn braille_char_maps_into_the_block() {
        assert_eq!(braille_char(0x00), '\u{2800}');
        assert_eq!(braille_char(0xFF), '\u{28FF}');
    }

    #[test]
    fn single_lit_pixel_sets_exactly_one_dot() {
        let mut c = PixelCanvas::new(2, 4);
        c.fill_circle(1.0, 2.0, 0.3, Rgba::new(255, 255, 255, 1.0));
        let (mask, color) = cell_from_subpixels(&c, 0, 0, BLACK);
        assert_eq!(mask, dot_bit(1, 2));
        assert_eq!(color, (255, 255, 255));
    }

    #[test]
    fn trail_wash_alone_lights_nothing() {
        let mut c = PixelCanvas::new(4, 8);
        // The per-frame translucent overlay: black over a black background
        // must stay invisible.
        c.fill_rect(0.0, 0.0, 4.0, 8.0, Rgba::new(0, 0, 0, 0.25));
        for cy in 0..2 {
            for cx in 0..2 {
                let (mask, _) = cell_from_subpixels(&c, cx, cy, BLACK);
                assert_eq!(mask, 0);
            }
        }
    }

    #[test]
    fn light_background_inverts_the_threshold() {
        let light = Rgba::new(236, 239, 244, 1.0);
        let mut c = PixelCanvas::new(2, 4);
        // White wash over a light background: invisible.
        c.fill_rect(0.0, 0.0, 2.0, 4.0, Rgba::new(255, 255, 255, 0.25));
        let (mask, _) = cell_from_subpixels(&c, 0, 0, light);
        assert_eq!(mask, 0);
        // A dark star is visible.
        c.fill_circle(0.0, 0.0, 0.3, Rgba::new(24, 30, 46, 1.0));
        let (mask, _) = cell_from_subpixels(&c, 0, 0, light);
        assert_eq!(mask, dot_bit(0, 0));
    }

    #[test]
    fn empty_cell_color_is_background() {
        let c = PixelCanvas::new(2, 4);
        let (mask, color) = cell_from_subpixels(&c, 0, 0, BLACK);
        assert_eq!(mask, 0);
        assert_eq!(color, (0, 0, 0));
    }

    #[test]
    fn pad_to_truncates_and_pads() {
        assert_eq!(pad_to("abc", 5), "abc  ");
        assert_eq!(pad_to("abcdef", 3), "abc");
        assert_eq!(pad_to("", 2), "  ");
    }
}
