//! Dialoguer theme and entry banner for interactive mode.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// `ColorfulTheme` with Hue's colors; everything renders on stderr.
pub fn hue_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().magenta(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        active_item_prefix: style("▸".to_string()).for_stderr().magenta(),
        active_item_style: Style::new().for_stderr().magenta(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// Boxed version banner on stderr.
pub fn print_banner() {
    for line in banner_lines(hue_core::VERSION) {
        eprintln!("{}", Style::new().for_stderr().magenta().apply_to(line));
    }
    eprintln!();
}

fn banner_lines(version: &str) -> Vec<String> {
    let title = format!("Hue v{version}");
    let tagline = "Vision-model image analysis";
    let inner_width = title.chars().count().max(tagline.len()) + 4;

    vec![
        String::new(),
        format!("  ╔{:═<width$}╗", "", width = inner_width),
        format!("  ║{:^width$}║", title, width = inner_width),
        format!("  ║{:^width$}║", tagline, width = inner_width),
        format!("  ╚{:═<width$}╝", "", width = inner_width),
    ]
}
