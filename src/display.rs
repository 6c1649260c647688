use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDisplayMode {
  Auto,
  Kitty,
  Direct,
  Ascii,
}

/// How icon images are drawn in the terminal.
///
/// List rows always use cell rendering (half-block or ASCII); Kitty only
/// changes how the larger preview pane is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  Ascii,
  Direct,
  Kitty,
}

impl DisplayMode {
  pub fn label(self) -> &'static str {
    match self {
      DisplayMode::Ascii => "ASCII",
      DisplayMode::Direct => "Half-block",
      DisplayMode::Kitty => "Kitty",
    }
  }

  /// Cell renderer used where a graphics protocol can't be placed (list rows).
  pub fn cell_mode(self) -> DisplayMode {
    match self {
      DisplayMode::Kitty => DisplayMode::Direct,
      other => other,
    }
  }
}

/// Probe order: Kitty graphics > true-color half-block > ASCII.
pub fn detect_display_mode() -> DisplayMode {
  let term = std::env::var("TERM").unwrap_or_default();
  let term_program = std::env::var("TERM_PROGRAM").unwrap_or_default().to_lowercase();
  let colorterm = std::env::var("COLORTERM").unwrap_or_default().to_lowercase();
  classify(&term, &term_program, &colorterm)
}

fn classify(term: &str, term_program: &str, colorterm: &str) -> DisplayMode {
  if term == "xterm-kitty" || matches!(term_program, "kitty" | "wezterm" | "ghostty") {
    return DisplayMode::Kitty;
  }
  if colorterm == "truecolor" || colorterm == "24bit" {
    return DisplayMode::Direct;
  }
  DisplayMode::Ascii
}

pub fn resolve_display_mode(cli: CliDisplayMode) -> DisplayMode {
  match cli {
    CliDisplayMode::Auto => detect_display_mode(),
    CliDisplayMode::Kitty => DisplayMode::Kitty,
    CliDisplayMode::Direct => DisplayMode::Direct,
    CliDisplayMode::Ascii => DisplayMode::Ascii,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kitty_terms_are_detected() {
    assert_eq!(classify("xterm-kitty", "", ""), DisplayMode::Kitty);
    assert_eq!(classify("xterm-256color", "wezterm", ""), DisplayMode::Kitty);
  }

  #[test]
  fn truecolor_falls_back_to_half_block() {
    assert_eq!(classify("xterm-256color", "apple_terminal", "truecolor"), DisplayMode::Direct);
  }

  #[test]
  fn plain_terminal_is_ascii() {
    assert_eq!(classify("vt100", "", ""), DisplayMode::Ascii);
  }

  #[test]
  fn rows_never_use_kitty() {
    assert_eq!(DisplayMode::Kitty.cell_mode(), DisplayMode::Direct);
    assert_eq!(DisplayMode::Ascii.cell_mode(), DisplayMode::Ascii);
  }
}
