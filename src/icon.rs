//! Icon glyph selection.
//!
//! Maps a window to a font glyph through an ordered list of rules. Each rule
//! is either the wildcard `*` or a `field=value` predicate over the window's
//! attributes. The first matching rule wins.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::types::WindowAttributes;

/// Window attribute a rule can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowField {
    Class,
    Name,
}

impl WindowField {
    fn value<'a>(&self, window: &'a WindowAttributes) -> &'a str {
        match self {
            WindowField::Class => &window.window_class,
            WindowField::Name => &window.name,
        }
    }
}

impl FromStr for WindowField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "class" => Ok(WindowField::Class),
            "name" => Ok(WindowField::Name),
            _ => bail!("unknown window field {:?} (expected class or name)", s),
        }
    }
}

/// Predicate part of an icon rule.
///
/// Field matches are exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Any,
    Field { field: WindowField, value: String },
}

impl Matcher {
    pub fn matches(&self, window: &WindowAttributes) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Field { field, value } => field.value(window) == value,
        }
    }
}

impl FromStr for Matcher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "*" {
            return Ok(Matcher::Any);
        }
        let Some((field, value)) = s.split_once('=') else {
            bail!("invalid icon match {:?} (expected \"*\" or field=value)", s);
        };
        Ok(Matcher::Field {
            field: field.trim().parse()?,
            value: value.to_string(),
        })
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Any => write!(f, "*"),
            Matcher::Field { field, value } => {
                let name = match field {
                    WindowField::Class => "class",
                    WindowField::Name => "name",
                };
                write!(f, "{}={}", name, value)
            }
        }
    }
}

/// A single `(matcher, glyph)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRule {
    pub matcher: Matcher,
    pub glyph: String,
}

impl IconRule {
    /// Parse a rule from its textual match expression.
    pub fn parse(expression: &str, glyph: &str) -> Result<Self> {
        Ok(Self {
            matcher: expression.parse()?,
            glyph: glyph.to_string(),
        })
    }
}

/// Ordered, first-match-wins icon lookup.
///
/// Construction fails unless at least one wildcard rule exists, so
/// `resolve` is total.
#[derive(Debug, Clone)]
pub struct IconResolver {
    rules: Vec<IconRule>,
    fallback: String,
}

impl IconResolver {
    pub fn new(rules: Vec<IconRule>) -> Result<Self> {
        let Some(position) = rules.iter().position(|rule| rule.matcher == Matcher::Any) else {
            bail!("icon rules must include a wildcard \"*\" rule");
        };
        if position + 1 < rules.len() {
            log::warn!(
                "{} icon rule(s) after the wildcard rule can never match",
                rules.len() - position - 1
            );
        }
        let fallback = rules[position].glyph.clone();
        Ok(Self { rules, fallback })
    }

    /// Glyph of the first rule matching `window`.
    pub fn resolve(&self, window: &WindowAttributes) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(window))
            .map(|rule| rule.glyph.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    pub fn rules(&self) -> &[IconRule] {
        &self.rules
    }
}
