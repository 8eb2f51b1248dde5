//! Window title cleanup and truncation.

use anyhow::{bail, Context, Result};
use regex::Regex;

/// Marker appended to truncated titles.
pub const ELLIPSIS: &str = "...";

/// Per-application title transform, selected by window class.
#[derive(Debug, Clone)]
pub struct FormatterRule {
    class: Regex,
    strip: String,
    replace: String,
}

impl FormatterRule {
    /// `class_pattern` is anchored at the start of the window class, so
    /// `"Firefox"` matches `"Firefox"` and `"Firefox-esr"` but not
    /// `"MyFirefox"`.
    pub fn new(class_pattern: &str, strip: &str, replace: &str) -> Result<Self> {
        if strip.is_empty() {
            bail!("formatter for {:?} has an empty strip string", class_pattern);
        }
        let class = Regex::new(&format!("^(?:{})", class_pattern))
            .with_context(|| format!("invalid class pattern {:?}", class_pattern))?;
        Ok(Self {
            class,
            strip: strip.to_string(),
            replace: replace.to_string(),
        })
    }

    pub fn matches(&self, window_class: &str) -> bool {
        self.class.is_match(window_class)
    }

    pub fn apply(&self, title: &str) -> String {
        title.replace(&self.strip, &self.replace)
    }
}

/// Ordered formatter table plus the truncation limit.
#[derive(Debug, Clone)]
pub struct TitleFormatter {
    rules: Vec<FormatterRule>,
    max_length: usize,
}

impl TitleFormatter {
    pub fn new(rules: Vec<FormatterRule>, max_length: usize) -> Result<Self> {
        if max_length <= ELLIPSIS.len() {
            bail!(
                "max_length must be greater than {} (got {})",
                ELLIPSIS.len(),
                max_length
            );
        }
        Ok(Self { rules, max_length })
    }

    /// Apply the first matching rule, then truncate.
    pub fn format(&self, window_class: &str, raw_name: &str) -> String {
        match self.rules.iter().find(|rule| rule.matches(window_class)) {
            Some(rule) => shorten(&rule.apply(raw_name), self.max_length),
            None => shorten(raw_name, self.max_length),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

/// Truncate to at most `max_length` characters, ending in [`ELLIPSIS`] when cut.
pub fn shorten(title: &str, max_length: usize) -> String {
    if title.chars().count() <= max_length {
        return title.to_string();
    }
    let keep = max_length.saturating_sub(ELLIPSIS.len());
    let mut out: String = title.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
