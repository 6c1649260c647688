use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Margin, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph},
};

use crate::app::{App, AppMode, PREVIEW_SLOT, Thumb};
use crate::constants::constants;
use crate::display::DisplayMode;
use crate::graphics::IconWidget;
use crate::model::{IconRecord, IconType};
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn kind_label(icon: &IconRecord) -> &'static str {
  match icon.kind {
    IconType::Raster => "raster",
    IconType::Vector => "vector",
  }
}

fn rounded(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  app.gfx.preview_area = None;

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, theme, header_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let left = Line::from(Span::styled(" ◆ icon-search ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  if !app.has_results() {
    // Nothing on screen may keep a row binding alive.
    app.sync_visible_slots(0, 0);
    app.sync_preview();
    render_welcome(frame, app.theme(), area);
    return;
  }

  let pct = constants().preview_width_percent.min(80);
  let [list_area, preview_area] =
    Layout::horizontal([Constraint::Percentage(100 - pct), Constraint::Percentage(pct)]).areas(area);
  render_results(frame, app, list_area);
  render_preview(frame, app, preview_area);
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("◆  Welcome to icon-search", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Search Iconfinder. Preview icons. Save them locally.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Type a query below and press Enter.", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(rounded(theme));
  frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let c = constants();
  let row_h = c.row_thumb_height.max(1);
  let thumb_w = c.row_thumb_width;
  let gutter = " ".repeat(thumb_w as usize + 1);

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4).saturating_sub(thumb_w + 1) as usize;

  let Some(result) = app.results.as_ref() else { return };
  let selected = app.list_state.selected();
  let items: Vec<ListItem> = result
    .icons
    .iter()
    .enumerate()
    .map(|(i, icon)| {
      let is_selected = Some(i) == selected;
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let meta = if is_selected { theme.highlight_fg } else { theme.muted };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let mut head = vec![
        Span::raw(gutter.clone()),
        Span::styled(format!("#{}", icon.icon_id), Style::default().fg(fg).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}  {}", icon.dimensions_label(), kind_label(icon)), Style::default().fg(meta)),
      ];
      if icon.is_premium {
        head.push(Span::styled("  premium", Style::default().fg(theme.status)));
      }
      if icon.saved_locally {
        head.push(Span::styled("  ✓ saved", Style::default().fg(theme.success)));
      }

      let mut lines = vec![Line::from(head)];
      lines.push(Line::from(vec![
        Span::raw(gutter.clone()),
        Span::styled(truncate_str(&icon.tags_summary(), inner_w), Style::default().fg(meta)),
      ]));
      lines.resize_with(row_h as usize, Line::default);

      ListItem::new(lines).bg(bg)
    })
    .collect();

  let title = format!(" Results · {} of {} ", result.icons.len(), result.total_count);
  let list = List::new(items)
    .block(rounded(theme).title(title).title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);

  // Rows are slots: rebind them to whatever is on screen now, then draw their thumbnails.
  let inner = area.inner(Margin::new(1, 1));
  let offset = app.list_state.offset();
  let total = app.results.as_ref().map_or(0, |r| r.icons.len());
  let visible = ((inner.height / row_h) as usize).min(total.saturating_sub(offset));
  app.sync_visible_slots(offset, visible);

  let cell_mode = app.display_mode.cell_mode();
  for slot in 0..visible {
    let cell = Rect { x: inner.x + 2, y: inner.y + slot as u16 * row_h, width: thumb_w.min(inner.width), height: row_h };
    match app.thumbnails.get(&slot) {
      Some(Thumb::Ready(asset)) => {
        frame.render_widget(IconWidget { image: asset.image.as_ref(), display_mode: cell_mode }, cell)
      }
      Some(Thumb::Failed) => frame.render_widget(Span::styled(" ✕", Style::default().fg(theme.error)), cell),
      None if app.slot_loading(slot) => frame.render_widget(Span::styled(" …", Style::default().fg(theme.muted)), cell),
      None => {}
    }
  }
}

fn render_preview(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  app.sync_preview();

  let block = rounded(theme)
    .title(" Preview ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .padding(Padding::horizontal(1));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let Some(icon) = app.selected_icon() else { return };
  let [image_area, info_area] = Layout::vertical([Constraint::Min(3), Constraint::Length(7)]).areas(inner);
  let inner_w = info_area.width as usize;

  let mut lines = vec![Line::from(Span::styled(
    format!("Icon #{}", icon.icon_id),
    Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
  ))];
  let published = icon.published().map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| icon.published_at.clone());
  let categories: Vec<&str> = icon.categories.iter().map(|c| c.name.as_str()).collect();
  let styles: Vec<&str> = icon.styles.iter().map(|s| s.name.as_str()).collect();
  for (label, value) in [
    ("Size      ", icon.dimensions_label()),
    ("Published ", published),
    ("Category  ", categories.join(", ")),
    ("Style     ", styles.join(", ")),
  ] {
    lines.push(Line::from(vec![
      Span::styled(label, Style::default().fg(theme.muted)),
      Span::styled(truncate_str(&value, inner_w.saturating_sub(label.len())), Style::default().fg(theme.fg)),
    ]));
  }
  let saved = if icon.saved_locally {
    Span::styled("✓ Saved locally", Style::default().fg(theme.success))
  } else {
    Span::styled("Enter to save", Style::default().fg(theme.muted))
  };
  lines.push(Line::from(saved));
  frame.render_widget(Paragraph::new(lines), info_area);

  match app.thumbnails.get(&PREVIEW_SLOT) {
    Some(Thumb::Ready(asset)) => {
      if app.display_mode == DisplayMode::Kitty {
        app.gfx.preview_area = Some(image_area);
      } else {
        frame.render_widget(IconWidget { image: asset.image.as_ref(), display_mode: app.display_mode }, image_area);
      }
    }
    Some(Thumb::Failed) => {
      frame.render_widget(
        Paragraph::new("Image unavailable").alignment(Alignment::Center).style(Style::default().fg(theme.error)),
        image_area,
      );
    }
    None => {
      frame.render_widget(
        Paragraph::new("Loading…").alignment(Alignment::Center).style(Style::default().fg(theme.muted)),
        image_area,
      );
    }
  }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.success))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Input { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search Iconfinder ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.mode == AppMode::Input {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Search"), ("^t", "Theme"), ("^l", "Free cache")];
      if app.has_results() {
        k.push(("↓", "Results"));
        k.push(("Esc", "Results"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    AppMode::Results => {
      vec![("Enter", "Save"), ("j/k", "Navigate"), ("^t", "Theme"), ("^l", "Free cache"), ("Esc", "Back")]
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let right_label = format!("{} · {} ", app.display_mode.label(), theme.name);
  let width = right_label.chars().count() as u16;
  let right = Line::from(Span::styled(&right_label, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}
