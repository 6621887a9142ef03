//! Control bar, status line and placeholder panels, rasterised on the CPU and
//! uploaded as a single overlay texture.

use ab_glyph::{Font, FontArc, FontVec, PxScale, ScaleFont, point};
use fontdb::Database;
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::controller::{ControlButton, Status};

const BUTTON_W: f32 = 132.0;
const BUTTON_H: f32 = 40.0;
const BUTTON_GAP: f32 = 10.0;
const STATUS_H: f32 = 30.0;
const PAD: f32 = 10.0;
const TEXT_PX: f32 = 17.0;

const BAR_BG: [u8; 4] = [0, 0, 0, 190];
const BUTTON_BG: [u8; 4] = [0x33, 0x33, 0x33, 255];
const BUTTON_ON: [u8; 4] = [0x00, 0x66, 0x00, 255];
const BUTTON_QUIT: [u8; 4] = [0x66, 0x00, 0x00, 255];
const BORDER: [u8; 4] = [0x55, 0x55, 0x55, 255];
const TEXT: [u8; 4] = [255, 255, 255, 255];

/// Axis-aligned rectangle in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// Where the control bar and each of its buttons sit in the window.
#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    pub bar: Rect,
    pub status: Rect,
    pub buttons: Vec<(ControlButton, Rect)>,
}

impl BarLayout {
    /// Lay the bar out along the bottom edge of a `width`×`height` window.
    /// Buttons shrink to fit narrow windows.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(width: u32, height: u32, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let win_w = width.max(1) as f32;
        let win_h = height.max(1) as f32;
        let count = ControlButton::ALL.len() as f32;

        let gap = BUTTON_GAP * scale;
        let pad = PAD * scale;
        let room = (win_w - 2.0 * pad - gap * (count - 1.0)) / count;
        let button_w = (BUTTON_W * scale).min(room).max(1.0);
        let button_h = BUTTON_H * scale;
        let status_h = STATUS_H * scale;

        let bar_h = (pad + status_h + button_h + pad).min(win_h);
        let bar = Rect {
            x: 0.0,
            y: win_h - bar_h,
            w: win_w,
            h: bar_h,
        };
        let status = Rect {
            x: pad,
            y: bar.y + pad,
            w: (win_w - 2.0 * pad).max(1.0),
            h: status_h,
        };

        let row_w = button_w * count + gap * (count - 1.0);
        let start_x = ((win_w - row_w) / 2.0).max(0.0);
        let row_y = status.y + status_h;
        let buttons = ControlButton::ALL
            .iter()
            .zip(0u8..)
            .map(|(button, i)| {
                let rect = Rect {
                    x: start_x + f32::from(i) * (button_w + gap),
                    y: row_y,
                    w: button_w,
                    h: button_h,
                };
                (*button, rect)
            })
            .collect();

        Self {
            bar,
            status,
            buttons,
        }
    }

    /// Button under the pointer, if any.
    #[must_use]
    pub fn hit(&self, x: f32, y: f32) -> Option<ControlButton> {
        self.buttons
            .iter()
            .find(|(_, rect)| rect.contains(x, y))
            .map(|(button, _)| *button)
    }
}

/// Caption for `button` given the current status.
#[must_use]
pub fn button_label(button: ControlButton, status: &Status) -> &'static str {
    match button {
        ControlButton::Previous => "< Previous",
        ControlButton::Auto if status.auto_advance => "Auto [ON]",
        ControlButton::Auto => "Auto [OFF]",
        ControlButton::Pause if status.paused => "Resume",
        ControlButton::Pause => "Pause",
        ControlButton::Random if status.mode == crate::playback::Mode::Random => "Random [ON]",
        ControlButton::Random => "Random",
        ControlButton::Fullscreen if status.fullscreen => "Windowed",
        ControlButton::Fullscreen => "Fullscreen",
        ControlButton::Next => "Next >",
        ControlButton::Quit => "Quit",
    }
}

/// A rasterised overlay and where it goes in the window.
pub struct OverlayImage {
    pub rect: Rect,
    pub image: RgbaImage,
}

/// Paints overlay panels with the UI font.
pub struct OverlayPainter {
    font: Option<FontArc>,
}

impl OverlayPainter {
    /// Look up a sans-serif system font. Without one the bar is still drawn,
    /// only without captions.
    #[must_use]
    pub fn new() -> Self {
        let font = load_ui_font();
        if font.is_none() {
            warn!("no usable system font found; overlay text disabled");
        }
        Self { font }
    }

    #[must_use]
    pub const fn with_font(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Control bar with the status line and all buttons.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn control_bar(&self, layout: &BarLayout, status: &Status, scale: f32) -> OverlayImage {
        let bar = layout.bar;
        let mut img = RgbaImage::from_pixel(
            (bar.w.round() as u32).max(1),
            (bar.h.round() as u32).max(1),
            Rgba(BAR_BG),
        );
        let px = PxScale::from(TEXT_PX * scale.max(0.5));

        let local = |r: Rect| Rect {
            x: r.x - bar.x,
            y: r.y - bar.y,
            ..r
        };

        if let Some(font) = &self.font {
            draw_text_centered(&mut img, font, px, local(layout.status), TEXT, &status.line());
        }

        for (button, rect) in &layout.buttons {
            let rect = local(*rect);
            let fill = match button {
                ControlButton::Quit => BUTTON_QUIT,
                b if status.is_active(*b) => BUTTON_ON,
                _ => BUTTON_BG,
            };
            fill_rect(&mut img, rect, BORDER);
            let inset = (1.0 * scale).max(1.0);
            fill_rect(
                &mut img,
                Rect {
                    x: rect.x + inset,
                    y: rect.y + inset,
                    w: rect.w - 2.0 * inset,
                    h: rect.h - 2.0 * inset,
                },
                fill,
            );
            if let Some(font) = &self.font {
                draw_text_centered(&mut img, font, px, rect, TEXT, button_label(*button, status));
            }
        }

        OverlayImage { rect: bar, image: img }
    }

    /// Centred message panel, used for the "no images" placeholder.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn message(&self, width: u32, height: u32, scale: f32, text: &str) -> OverlayImage {
        let px = PxScale::from(28.0 * scale.max(0.5));
        let text_w = self
            .font
            .as_ref()
            .map_or(320.0 * scale, |font| measure_text(font, px, text));
        let panel_w = (text_w + 80.0 * scale).min(width.max(1) as f32);
        let panel_h = (px.y * 3.0).min(height.max(1) as f32);
        let rect = Rect {
            x: ((width as f32 - panel_w) / 2.0).max(0.0),
            y: ((height as f32 - panel_h) / 2.0).max(0.0),
            w: panel_w,
            h: panel_h,
        };
        let mut img = RgbaImage::from_pixel(
            (panel_w.round() as u32).max(1),
            (panel_h.round() as u32).max(1),
            Rgba([0x1a, 0x1a, 0x1a, 230]),
        );
        if let Some(font) = &self.font {
            let local = Rect {
                x: 0.0,
                y: 0.0,
                w: rect.w,
                h: rect.h,
            };
            draw_text_centered(&mut img, font, px, local, TEXT, text);
        }
        OverlayImage { rect, image: img }
    }
}

impl Default for OverlayPainter {
    fn default() -> Self {
        Self::new()
    }
}

fn load_ui_font() -> Option<FontArc> {
    let mut db = Database::new();
    db.load_system_fonts();
    let query = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        weight: fontdb::Weight::BOLD,
        ..fontdb::Query::default()
    };
    let face_id = db
        .query(&query)
        .or_else(|| db.faces().next().map(|face| face.id))?;
    debug!(faces = db.len(), "system fonts loaded");
    db.with_face_data(face_id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index)
            .ok()
            .map(FontArc::new)
    })?
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn fill_rect(img: &mut RgbaImage, rect: Rect, color: [u8; 4]) {
    let x0 = rect.x.max(0.0).round() as u32;
    let y0 = rect.y.max(0.0).round() as u32;
    let x1 = ((rect.x + rect.w).round().max(0.0) as u32).min(img.width());
    let y1 = ((rect.y + rect.h).round().max(0.0) as u32).min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, Rgba(color));
        }
    }
}

/// Advance width of `text` at `scale`, kerning included.
#[must_use]
pub fn measure_text(font: &FontArc, scale: PxScale, text: &str) -> f32 {
    let scaled_font = font.as_scaled(scale);
    let mut width = 0.0;
    let mut previous = None;
    for ch in text.chars() {
        let glyph_id = scaled_font.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
    width
}

fn draw_text_centered(
    image: &mut RgbaImage,
    font: &FontArc,
    scale: PxScale,
    area: Rect,
    color: [u8; 4],
    text: &str,
) {
    let scaled_font = font.as_scaled(scale);
    let width = measure_text(font, scale, text);
    let x = area.x + ((area.w - width) / 2.0).max(0.0);
    let baseline =
        area.y + (area.h + scaled_font.ascent() + scaled_font.descent()) / 2.0;
    draw_text(image, font, scale, x, baseline, area, color, text);
}

#[allow(
    clippy::too_many_arguments,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn draw_text(
    image: &mut RgbaImage,
    font: &FontArc,
    scale: PxScale,
    x: f32,
    baseline: f32,
    clip: Rect,
    color: [u8; 4],
    text: &str,
) {
    let mut caret = point(x, baseline);
    let scaled_font = font.as_scaled(scale);
    let mut previous = None;
    let (img_w, img_h) = image.dimensions();
    for ch in text.chars() {
        let glyph_id = scaled_font.glyph_id(ch);
        if let Some(prev) = previous {
            caret.x += scaled_font.kern(prev, glyph_id);
        }
        let glyph = glyph_id.with_scale_and_position(scale, caret);
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            let origin_x = bounds.min.x.floor() as i32;
            let origin_y = bounds.min.y.floor() as i32;
            outlined.draw(|gx, gy, v| {
                let px = origin_x + gx as i32;
                let py = origin_y + gy as i32;
                if px < 0 || py < 0 {
                    return;
                }
                let (fx, fy) = (px as f32, py as f32);
                if !clip.contains(fx, fy) {
                    return;
                }
                let (px, py) = (px as u32, py as u32);
                if px >= img_w || py >= img_h {
                    return;
                }
                let alpha = u16::from((v.clamp(0.0, 1.0) * 255.0).round() as u8);
                let inv = 255 - alpha;
                let dst = image.get_pixel_mut(px, py);
                for c in 0..3 {
                    dst[c] = ((u16::from(dst[c]) * inv + u16::from(color[c]) * alpha) / 255) as u8;
                }
                dst[3] = dst[3].max(alpha as u8);
            });
        }
        caret.x += scaled_font.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
}
