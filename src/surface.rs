//! 2D immediate-mode drawing surface and its braille-subpixel backing store.
//!
//! The starfield only ever talks to the [`Surface`] trait; the terminal
//! backend renders a [`PixelCanvas`] (2x4 subpixels per cell) into braille
//! glyphs. Alpha compositing happens here so translucent overlays behave
//! like they do on a real canvas.

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Rgba {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    /// Straight (non-premultiplied) alpha in 0.0..=1.0.
    pub(crate) a: f32,
}

impl Rgba {
    pub(crate) const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub(crate) const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0.0);
}

/// The drawing operations the starfield consumes. Mirrors a minimal 2D
/// canvas context: clear, alpha fills, stroked segments, filled circles,
/// a radial gradient for the vignette, and a transform reset.
pub(crate) trait Surface {
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba);
    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Rgba);
    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba);
    fn fill_radial(&mut self, cx: f32, cy: f32, radius: f32, inner: Rgba, outer: Rgba);
    fn reset_transform(&mut self);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// RGBA buffer at braille-subpixel resolution (2 wide, 4 tall per terminal
/// cell). Supports a translate-only transform; that is all the starfield's
/// `reset_transform` contract needs.
pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Pixel>,
    tx: f32,
    ty: f32,
}

impl PixelCanvas {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn set_translate(&mut self, tx: f32, ty: f32) {
        self.tx = tx;
        self.ty = ty;
    }

    /// Source-over blend of `src` onto the pixel at (x, y), in canvas
    /// coordinates after the translate has already been applied.
    fn blend_over(&mut self, x: i32, y: i32, src: Rgba) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a.clamp(0.0, 1.0);
        let da = dst.a as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }

    /// Stamp a filled disc; radius below one subpixel degrades to a single
    /// plotted point so distant stars stay visible.
    fn stamp(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        let xi = x.round() as i32;
        let yi = y.round() as i32;
        if radius <= 0.5 {
            self.blend_over(xi, yi, color);
            return;
        }
        let r = radius.ceil() as i32;
        let r2 = radius * radius;
        for oy in -r..=r {
            for ox in -r..=r {
                let d2 = (ox * ox + oy * oy) as f32;
                if d2 <= r2 {
                    self.blend_over(xi + ox, yi + oy, color);
                }
            }
        }
    }
}

impl Surface for PixelCanvas {
    fn clear(&mut self) {
        self.px.fill(Pixel::default());
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        let x0 = (x + self.tx).floor().max(0.0) as i32;
        let y0 = (y + self.ty).floor().max(0.0) as i32;
        let x1 = ((x + self.tx + w).ceil() as i32).min(self.w as i32);
        let y1 = ((y + self.ty + h).ceil() as i32).min(self.h as i32);
        for yy in y0..y1 {
            for xx in x0..x1 {
                self.blend_over(xx, yy, color);
            }
        }
    }

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Rgba) {
        let (x0, y0) = (x0 + self.tx, y0 + self.ty);
        let (x1, y1) = (x1 + self.tx, y1 + self.ty);
        let dx = x1 - x0;
        let dy = y1 - y0;
        let dist = (dx * dx + dy * dy).sqrt();
        let steps = (dist.ceil() as i32).max(1);
        let radius = width * 0.5;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.stamp(x0 + dx * t, y0 + dy * t, radius, color);
        }
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        self.stamp(cx + self.tx, cy + self.ty, radius, color);
    }

    fn fill_radial(&mut self, cx: f32, cy: f32, radius: f32, inner: Rgba, outer: Rgba) {
        if radius <= 0.0 {
            return;
        }
        let cx = cx + self.tx;
        let cy = cy + self.ty;
        for yy in 0..self.h {
            for xx in 0..self.w {
                let dx = xx as f32 - cx;
                let dy = yy as f32 - cy;
                let t = ((dx * dx + dy * dy).sqrt() / radius).clamp(0.0, 1.0);
                let lerp8 = |a: u8, b: u8| -> u8 {
                    (a as f32 + (b as f32 - a as f32) * t).round() as u8
                };
                let color = Rgba {
                    r: lerp8(inner.r, outer.r),
                    g: lerp8(inner.g, outer.g),
                    b: lerp8(inner.b, outer.b),
                    a: inner.a + (outer.a - inner.a) * t,
                };
                self.blend_over(xx as i32, yy as i32, color);
            }
        }
    }

    fn reset_transform(&mut self) {
        self.tx = 0.0;
        self.ty = 0.0;
    }
}
