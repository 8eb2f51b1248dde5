//! Bar line rendering.
//!
//! Produces lemonbar-style markup: each window becomes one fragment with an
//! underline color, a click action, an icon in the icon font, and the title.
//! Fragments are ordered by workspace and joined with an offset token.

use std::io::Write;

use anyhow::Result;

use crate::config::BarConfig;
use crate::types::WindowAttributes;

/// Underline color for a window. Focus wins over urgency.
pub fn underline_color<'a>(config: &'a BarConfig, window: &WindowAttributes) -> &'a str {
    if window.focused {
        &config.colors.focused
    } else if window.urgent {
        &config.colors.urgent
    } else {
        &config.colors.unfocused
    }
}

/// Separator placed between two window fragments.
pub fn separator(config: &BarConfig) -> String {
    format!("%{{O{}}}", config.separator_offset)
}

/// Render the markup fragment for a single window.
pub fn render_entry(config: &BarConfig, window: &WindowAttributes) -> String {
    let icon = config.icons.resolve(window);
    let title = escape_text(&config.titles.format(&window.window_class, &window.name));

    let mut label = format!("%{{T{}}}{}%{{T-}}  {}", config.icon_font, icon, title);
    if window.focused {
        label = format!("%{{F{}}}{}%{{F}}", config.colors.focused_text, label);
    }

    let action = format!(
        "%{{A1:{} {}:}}{}%{{A}}",
        escape_action(&config.click_command),
        window.id,
        label
    );

    format!("%{{u{}}} {} %{{u-}}", underline_color(config, window), action)
}

/// Render every window, ordered by workspace name.
///
/// The sort is stable, so windows on the same workspace keep the order of
/// the snapshot.
pub fn render_all(config: &BarConfig, windows: &[WindowAttributes]) -> String {
    let mut ordered: Vec<&WindowAttributes> = windows.iter().collect();
    ordered.sort_by(|a, b| a.workspace_name.cmp(&b.workspace_name));

    ordered
        .into_iter()
        .map(|window| render_entry(config, window))
        .collect::<Vec<_>>()
        .join(&separator(config))
}

/// Write `line` and a newline in one call, then flush.
pub fn emit_line<W: Write + ?Sized>(out: &mut W, line: &str) -> Result<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    out.write_all(buf.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Drop every `%` directly in front of a `{` so a title cannot open a tag.
/// Other `%` characters are left alone.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '{' {
            while out.ends_with('%') {
                out.pop();
            }
        }
        out.push(c);
    }
    out
}

/// `:` closes an action command early.
fn escape_action(command: &str) -> String {
    command.replace(':', "\\:")
}
