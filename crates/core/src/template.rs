//! Named-field format templates.
//!
//! Templates are parsed once, when a block is built, and checked against
//! the fields that block declares. An unknown placeholder is a
//! configuration error, not something discovered at render time.
//!
//! Syntax: `{field}`, `{field:spec}`, `{field!conv}`, `{field!conv:spec}`,
//! with `{{` and `}}` for literal braces. `spec` is
//! `[align][width][.precision][type]` where align is one of `<>^` and type
//! is one of `d`, `f`, `s`. `conv` is `u` (upper), `l` (lower),
//! `c` (capitalize) or `t` (title).

use once_cell::sync::Lazy;
use regex::Regex;
use rg_blocks_types::FieldMetadata;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("Invalid regex"));

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?:!(?P<conv>.))?(?::(?P<spec>.*))?$")
        .expect("Invalid regex")
});

static SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<align>[<>^])?(?P<width>\d+)?(?:\.(?P<precision>\d+))?(?P<kind>[dfs])?$")
        .expect("Invalid regex")
});

/// Template problems found while parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}' in '{template}' (available: {available})")]
    UnknownField {
        name: String,
        template: String,
        available: String,
    },

    #[error("malformed placeholder '{{{placeholder}}}' in '{template}'")]
    Malformed { placeholder: String, template: String },

    #[error("unknown conversion '!{conversion}' in '{template}'")]
    UnknownConversion { conversion: String, template: String },

    #[error("unbalanced brace in '{0}'")]
    Unbalanced(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Upper,
    Lower,
    Capitalize,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Integer,
    Float,
    Text,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FormatSpec {
    align: Option<Alignment>,
    width: Option<usize>,
    precision: Option<usize>,
    kind: Option<Kind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    name: String,
    conversion: Option<Conversion>,
    spec: FormatSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A parsed, validated template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`, accepting only placeholders named in `fields`
    pub fn parse(source: &str, fields: &[FieldMetadata]) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in TOKEN.captures_iter(source) {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let start = caps.get(0).map_or(last, |m| m.start());
            push_literal(&mut literal, &source[last..start], source)?;
            last = start + whole.len();

            match caps.get(1) {
                None if whole == "{{" => literal.push('{'),
                None => literal.push('}'),
                Some(inner) => {
                    let placeholder = parse_placeholder(inner.as_str(), source)?;
                    if !fields.iter().any(|f| f.id == placeholder.name) {
                        return Err(TemplateError::UnknownField {
                            name: placeholder.name,
                            template: source.to_string(),
                            available: fields
                                .iter()
                                .map(|f| f.id.as_str())
                                .collect::<Vec<_>>()
                                .join(", "),
                        });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(placeholder));
                }
            }
        }

        push_literal(&mut literal, &source[last..], source)?;
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Template with no placeholders allowed
    pub fn literal(source: &str) -> Result<Self, TemplateError> {
        Self::parse(source, &[])
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the fields this template references, in order
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(p) => Some(p.name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute values. Fields missing from `values` render empty.
    pub fn render(&self, values: &HashMap<String, Value>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(p) => match values.get(&p.name) {
                    Some(value) => out.push_str(&format_value(value, p)),
                    None => log::trace!("No value for '{}' in '{}'", p.name, self.source),
                },
            }
        }
        out
    }
}

fn push_literal(literal: &mut String, text: &str, source: &str) -> Result<(), TemplateError> {
    if text.contains('{') || text.contains('}') {
        return Err(TemplateError::Unbalanced(source.to_string()));
    }
    literal.push_str(text);
    Ok(())
}

fn parse_placeholder(inner: &str, source: &str) -> Result<Placeholder, TemplateError> {
    let malformed = || TemplateError::Malformed {
        placeholder: inner.to_string(),
        template: source.to_string(),
    };

    let caps = PLACEHOLDER.captures(inner.trim()).ok_or_else(malformed)?;
    let name = caps["name"].to_string();

    let conversion = match caps.name("conv").map(|m| m.as_str()) {
        None => None,
        Some("u") => Some(Conversion::Upper),
        Some("l") => Some(Conversion::Lower),
        Some("c") => Some(Conversion::Capitalize),
        Some("t") => Some(Conversion::Title),
        Some(other) => {
            return Err(TemplateError::UnknownConversion {
                conversion: other.to_string(),
                template: source.to_string(),
            })
        }
    };

    let spec = match caps.name("spec") {
        None => FormatSpec::default(),
        Some(spec) => {
            let caps = SPEC.captures(spec.as_str()).ok_or_else(malformed)?;
            FormatSpec {
                align: caps.name("align").map(|m| match m.as_str() {
                    "<" => Alignment::Left,
                    ">" => Alignment::Right,
                    _ => Alignment::Center,
                }),
                width: caps.name("width").and_then(|m| m.as_str().parse().ok()),
                precision: caps.name("precision").and_then(|m| m.as_str().parse().ok()),
                kind: caps.name("kind").map(|m| match m.as_str() {
                    "d" => Kind::Integer,
                    "f" => Kind::Float,
                    _ => Kind::Text,
                }),
            }
        }
    };

    Ok(Placeholder {
        name,
        conversion,
        spec,
    })
}

fn format_value(value: &Value, placeholder: &Placeholder) -> String {
    let spec = &placeholder.spec;

    // A conversion turns the value into text first; the format spec then
    // pads and truncates that text.
    let (text, numeric) = match (placeholder.conversion, value) {
        (Some(conversion), _) => (convert(&plain(value), conversion), false),
        (None, Value::Number(n)) if spec.kind != Some(Kind::Text) => {
            (format_number(n, spec), true)
        }
        (None, _) => (plain(value), false),
    };

    let text = match (numeric, spec.precision) {
        (false, Some(precision)) => text.chars().take(precision).collect(),
        _ => text,
    };

    let default_align = if numeric {
        Alignment::Right
    } else {
        Alignment::Left
    };
    pad(text, spec.width, spec.align.unwrap_or(default_align))
}

fn format_number(n: &serde_json::Number, spec: &FormatSpec) -> String {
    let as_float = n.as_f64().unwrap_or_default();
    match (spec.kind, spec.precision) {
        (Some(Kind::Integer), _) => format!("{}", as_float.round() as i64),
        (_, Some(precision)) => format!("{:.*}", precision, as_float),
        (Some(Kind::Float), None) => format!("{:.6}", as_float),
        _ => n.to_string(),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn convert(text: &str, conversion: Conversion) -> String {
    match conversion {
        Conversion::Upper => text.to_uppercase(),
        Conversion::Lower => text.to_lowercase(),
        Conversion::Capitalize => {
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        }
        Conversion::Title => {
            let mut out = String::with_capacity(text.len());
            let mut in_word = false;
            for c in text.chars() {
                if c.is_alphabetic() {
                    if in_word {
                        out.extend(c.to_lowercase());
                    } else {
                        out.extend(c.to_uppercase());
                    }
                    in_word = true;
                } else {
                    out.push(c);
                    in_word = false;
                }
            }
            out
        }
    }
}

fn pad(text: String, width: Option<usize>, align: Alignment) -> String {
    let len = text.chars().count();
    let width = match width {
        Some(w) if w > len => w,
        _ => return text,
    };

    let fill = width - len;
    let (left, right) = match align {
        Alignment::Left => (0, fill),
        Alignment::Right => (fill, 0),
        Alignment::Center => (fill / 2, fill - fill / 2),
    };
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}
