use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub success: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Dusk",
    bg: Color::Rgb(26, 27, 38),
    fg: Color::Rgb(192, 202, 245),
    accent: Color::Rgb(122, 162, 247),
    muted: Color::Rgb(86, 95, 137),
    border: Color::Rgb(59, 66, 97),
    highlight_fg: Color::Rgb(26, 27, 38),
    highlight_bg: Color::Rgb(122, 162, 247),
    stripe_bg: Color::Rgb(31, 33, 46),
    status: Color::Rgb(224, 175, 104),
    success: Color::Rgb(158, 206, 106),
    error: Color::Rgb(247, 118, 142),
    key_fg: Color::Rgb(26, 27, 38),
    key_bg: Color::Rgb(86, 95, 137),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 240),
    fg: Color::Rgb(60, 56, 54),
    accent: Color::Rgb(175, 58, 3),
    muted: Color::Rgb(146, 131, 116),
    border: Color::Rgb(213, 196, 161),
    highlight_fg: Color::Rgb(250, 248, 240),
    highlight_bg: Color::Rgb(175, 58, 3),
    stripe_bg: Color::Rgb(242, 238, 222),
    status: Color::Rgb(181, 118, 20),
    success: Color::Rgb(121, 116, 14),
    error: Color::Rgb(157, 0, 6),
    key_fg: Color::Rgb(250, 248, 240),
    key_bg: Color::Rgb(146, 131, 116),
  },
  Theme {
    name: "Mono",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Yellow,
    success: Color::Green,
    error: Color::Red,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn theme_lookup_is_case_insensitive() {
    assert_eq!(theme_index(Some("paper")), 1);
    assert_eq!(theme_index(Some("MONO")), 2);
  }

  #[test]
  fn unknown_or_missing_theme_falls_back_to_first() {
    assert_eq!(theme_index(Some("neon")), 0);
    assert_eq!(theme_index(None), 0);
  }
}
