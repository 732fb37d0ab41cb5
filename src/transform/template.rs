// src/transform/template.rs

//! Minimal text-template renderer used by the transform pipeline.
//!
//! Supports literal text and `{{ name "arg" }}` actions against a registered
//! function set; templates execute with no variable context. This is sized to
//! what decrypted values actually contain — inline decryption calls — not a
//! general template language.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};

/// A named template function: takes the quoted argument, returns the
/// replacement text.
pub type TemplateFunc = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

enum Segment {
    Literal(String),
    Call { func: String, arg: String },
}

/// A parsed template, ready to execute.
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source into literal and action segments.
    ///
    /// An unterminated `{{` or a malformed action is a parse error.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }

            let after = &rest[open + 2..];
            let close = after.find("}}").context("unterminated '{{' action")?;
            segments.push(parse_action(after[..close].trim())?);
            rest = &after[close + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Execute the template with the given function set and no data context.
    pub fn render(&self, funcs: &HashMap<String, TemplateFunc>) -> Result<String> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Call { func, arg } => {
                    let f = funcs
                        .get(func)
                        .with_context(|| format!("unknown template function '{func}'"))?;
                    let rendered =
                        f(arg).with_context(|| format!("template function '{func}' failed"))?;
                    out.push_str(&rendered);
                }
            }
        }

        Ok(out)
    }
}

/// Parse one action body: `func "arg"`.
fn parse_action(action: &str) -> Result<Segment> {
    let (func, rest) = action
        .split_once(char::is_whitespace)
        .unwrap_or((action, ""));

    if func.is_empty() {
        bail!("empty template action");
    }

    let arg = rest.trim();
    let arg = arg
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .with_context(|| format!("argument to '{func}' must be a quoted string"))?;

    Ok(Segment::Call {
        func: func.to_string(),
        arg: arg.to_string(),
    })
}
