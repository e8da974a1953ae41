//! Text messages for the display.
//!
//! Text is word-wrapped onto the panel with the largest font of a ladder that keeps it
//! within a line budget, then centred: the block vertically, each line horizontally.

use embedded_graphics::mono_font::{ascii, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use image::{Rgb, RgbImage};

use crate::BoxError;

/// Monospace bitmap fonts by name.
pub fn font_by_name(name: &str) -> Option<&'static MonoFont<'static>> {
    match name {
        "10x20" => Some(&ascii::FONT_10X20),
        "9x18" => Some(&ascii::FONT_9X18),
        "8x13" => Some(&ascii::FONT_8X13),
        "7x13" => Some(&ascii::FONT_7X13),
        "6x13" => Some(&ascii::FONT_6X13),
        "6x10" => Some(&ascii::FONT_6X10),
        "5x8" => Some(&ascii::FONT_5X8),
        _ => None,
    }
}

/// Font ladder plus line budget.
#[derive(Clone)]
pub struct MessageStyle {
    ladder: Vec<&'static MonoFont<'static>>,
    max_lines: usize,
}

impl MessageStyle {
    /// `ladder` lists font names, largest first.
    pub fn new(ladder: &[String], max_lines: usize) -> Result<Self, BoxError> {
        let ladder = ladder
            .iter()
            .map(|name| font_by_name(name).ok_or_else(|| format!("Unknown font {:?}", name)))
            .collect::<Result<Vec<_>, _>>()?;
        if ladder.is_empty() {
            return Err("The font ladder is empty".into());
        }
        Ok(Self { ladder, max_lines })
    }

    pub fn from_conf(conf: &crate::module::util::conf::Message) -> Result<Self, BoxError> {
        Self::new(&conf.font_ladder, conf.max_lines)
    }
}

/// Horizontal advance of one glyph.
fn advance(font: &MonoFont) -> u32 {
    font.character_size.width + font.character_spacing
}

/// Rendered width of a single line.
fn line_width(font: &MonoFont, line: &str) -> u32 {
    let n = line.chars().count() as u32;
    if n == 0 {
        0
    } else {
        n * font.character_size.width + (n - 1) * font.character_spacing
    }
}

/// Greedy word wrap to `width` characters. Words longer than a line are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![];
    let mut current = String::new();
    let mut current_len = 0;
    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        loop {
            let gap = usize::from(current_len > 0);
            if current_len + gap + chars.len() <= width {
                if gap == 1 {
                    current.push(' ');
                }
                current.extend(chars.iter());
                current_len += gap + chars.len();
                break;
            }
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            // Alone on the line and still too long.
            let rest = chars.split_off(width);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }
    }
    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Where each line of a message goes.
pub struct Layout {
    /// Position of the chosen font in the ladder.
    pub rung: usize,
    pub font: &'static MonoFont<'static>,
    /// Lines with the top-left corner of each.
    pub lines: Vec<(String, Point)>,
}

/// Choose the font and place every line of `text` on a `width` x `height` canvas.
pub fn layout(text: &str, width: u32, height: u32, style: &MessageStyle) -> Layout {
    let last = style.ladder.len() - 1;
    let mut rung = 0;
    let mut lines;
    loop {
        let font = style.ladder[rung];
        let per_line = (width / advance(font)).max(1) as usize;
        lines = wrap(text, per_line);
        if lines.len() <= style.max_lines || rung == last {
            if lines.len() > style.max_lines && style.max_lines > 0 {
                truncate(&mut lines, style.max_lines, per_line);
            }
            break;
        }
        log::debug!(
            "{} lines at rung {} exceed {}, trying a smaller font",
            lines.len(),
            rung,
            style.max_lines
        );
        rung += 1;
    }

    let font = style.ladder[rung];
    let line_height = font.character_size.height as i32;
    let total = line_height * lines.len() as i32;
    let mut y = (height as i32 - total) / 2;
    let placed = lines
        .into_iter()
        .map(|line| {
            let x = (width as i32 - line_width(font, &line) as i32) / 2;
            let origin = Point::new(x, y);
            y += line_height;
            (line, origin)
        })
        .collect();
    Layout {
        rung,
        font,
        lines: placed,
    }
}

/// Keep the first `max_lines` lines and mark the cut with an ellipsis.
fn truncate(lines: &mut Vec<String>, max_lines: usize, per_line: usize) {
    lines.truncate(max_lines);
    if let Some(tail) = lines.last_mut() {
        let keep = per_line.saturating_sub(3);
        let mut cut: String = tail.chars().take(keep).collect();
        cut.push_str("...");
        *tail = cut;
    }
}

/// Render `text` as white-on-black bitmap of the given size.
pub fn compose(text: &str, width: u32, height: u32, style: &MessageStyle) -> RgbImage {
    let layout = layout(text, width, height, style);
    let mut canvas = Canvas(RgbImage::new(width, height));
    let text_style = MonoTextStyle::new(layout.font, Rgb888::WHITE);
    for (line, origin) in &layout.lines {
        // Drawing on an in-memory canvas can't fail.
        let _ = Text::with_baseline(line, *origin, text_style, Baseline::Top).draw(&mut canvas);
    }
    canvas.0
}

/// Draw target backed by an image buffer. Pixels outside the buffer are dropped.
struct Canvas(RgbImage);

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = self.0.dimensions();
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < w && y < h {
                self.0.put_pixel(x, y, Rgb([color.r(), color.g(), color.b()]));
            }
        }
        Ok(())
    }
}
