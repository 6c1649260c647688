use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};
use std::io::{Cursor, Write};

use crate::display::DisplayMode;

// --- Cell rendering ---

/// Draws an image into terminal cells, scaled to fit `area` and centered.
/// Draws nothing in Kitty mode; that path goes through [`kitty_render_image`].
pub struct IconWidget<'a> {
  pub image: &'a DynamicImage,
  pub display_mode: DisplayMode,
}

const ASCII_RAMP: [&str; 10] = [" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];

impl Widget for IconWidget<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
      return;
    }
    match self.display_mode {
      DisplayMode::Direct => render_half_blocks(self.image, area, buf),
      DisplayMode::Ascii => render_ascii(self.image, area, buf),
      DisplayMode::Kitty => {}
    }
  }
}

/// Offset that centers `len` cells inside `avail` cells.
fn centered(start: u16, avail: u16, len: u32) -> u16 {
  start.saturating_add(avail.saturating_sub(len.min(u16::MAX as u32) as u16) / 2)
}

/// Two pixels per cell: the upper one as foreground of `▀`, the lower one as background.
fn render_half_blocks(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let fitted = image.thumbnail(area.width as u32, area.height as u32 * 2).to_rgba8();
  let (w, h) = fitted.dimensions();
  let rows = h.div_ceil(2);
  let x0 = centered(area.x, area.width, w);
  let y0 = centered(area.y, area.height, rows);

  for row in 0..rows {
    for col in 0..w {
      let top = fitted.get_pixel(col, row * 2);
      let fg = blend(top.0);
      let bg = if row * 2 + 1 < h { blend(fitted.get_pixel(col, row * 2 + 1).0) } else { Color::Reset };
      buf.set_string(x0 + col as u16, y0 + row as u16, "▀", Style::default().fg(fg).bg(bg));
    }
  }
}

fn render_ascii(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let fitted = image.thumbnail(area.width as u32, area.height as u32).to_luma_alpha8();
  let (w, h) = fitted.dimensions();
  let x0 = centered(area.x, area.width, w);
  let y0 = centered(area.y, area.height, h);

  for y in 0..h {
    for x in 0..w {
      let [luma, alpha] = fitted.get_pixel(x, y).0;
      // Icons are mostly transparent; ink density follows coverage, not brightness.
      let ink = (255 - luma as u32) * alpha as u32 / 255;
      let idx = ((ink as f32 / 255.0) * (ASCII_RAMP.len() - 1) as f32).round() as usize;
      buf.set_string(x0 + x as u16, y0 + y as u16, ASCII_RAMP[idx.min(ASCII_RAMP.len() - 1)], Style::default());
    }
  }
}

/// Transparent pixels show the terminal background; the rest are opaque RGB.
fn blend([r, g, b, a]: [u8; 4]) -> Color {
  if a < 32 { Color::Reset } else { Color::Rgb(r, g, b) }
}

// --- Kitty Graphics Protocol ---
//
//   Transmit:  \x1B_G a=T,f=100,t=d,i=1,p=1,c=<cols>,r=<rows>,q=2,m=1;<base64 chunk>\x1B\\
//   Continue:  \x1B_G m=1;<base64 chunk>\x1B\\
//   Last:      \x1B_G m=0;<base64 chunk>\x1B\\
//   Delete all:       \x1B_G a=d,d=a,q=2\x1B\\
//
// A fixed image/placement id makes each send replace the previous preview.

const KITTY_CHUNK_SIZE: usize = 4096;

pub fn kitty_delete_all() -> Result<()> {
  let mut stdout = std::io::stdout();
  write!(stdout, "\x1B_Ga=d,d=a,q=2\x1B\\").context("Failed to write kitty delete all")?;
  stdout.flush().context("Failed to flush kitty delete")?;
  Ok(())
}

/// Build the escape sequence that places `image` over `area`.
fn kitty_sequence(image: &DynamicImage, area: Rect) -> Result<String> {
  let mut png = Vec::new();
  image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).context("Failed to encode preview as PNG for kitty")?;
  let encoded = BASE64.encode(&png);

  let mut out = format!("\x1B[{};{}H", area.y.saturating_add(1), area.x.saturating_add(1));
  let chunks: Vec<&str> = encoded
    .as_bytes()
    .chunks(KITTY_CHUNK_SIZE)
    .map(std::str::from_utf8)
    .collect::<std::result::Result<_, _>>()
    .context("base64 chunk was not valid UTF-8")?;
  let last = chunks.len().saturating_sub(1);
  for (i, chunk) in chunks.iter().enumerate() {
    let more = u8::from(i < last);
    if i == 0 {
      out.push_str(&format!(
        "\x1B_Ga=T,f=100,t=d,i=1,p=1,c={},r={},q=2,m={};{}\x1B\\",
        area.width, area.height, more, chunk
      ));
    } else {
      out.push_str(&format!("\x1B_Gm={};{}\x1B\\", more, chunk));
    }
  }
  Ok(out)
}

pub fn kitty_render_image(image: &DynamicImage, area: Rect) -> Result<()> {
  if area.is_empty() {
    return Ok(());
  }
  let sequence = kitty_sequence(image, area)?;
  let mut stdout = std::io::stdout();
  stdout.write_all(sequence.as_bytes()).context("Failed to write kitty image")?;
  stdout.flush().context("Failed to flush kitty image")?;
  Ok(())
}
