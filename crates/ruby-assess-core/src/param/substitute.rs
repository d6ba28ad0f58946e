//! Parameter substitution.
//!
//! Templates reference symbols as `<name>`, `<name%sep>`, `<name?+text>` or
//! `<name?-text>`. After all references are replaced, environment variables
//! in the result are expanded as well.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

use super::env::expand_env;
use super::symbol::{SymbolTable, SymbolValue};

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?P<name>[a-zA-Z][a-zA-Z0-9_-]*)(?:(?P<op>%|\?\+|\?-)(?P<text>[^>]+))?>")
        .expect("parameter pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubstituteError {
    #[error("parameter <{0}> is not defined")]
    Undefined(String),

    #[error("parameter <{0}> has no text value")]
    NotText(String),

    #[error("parameter <{0}> is an empty list")]
    EmptyList(String),

    #[error("parameter <{name}%{sep}> has a whitespace separator other than a single space")]
    MalformedSeparator { name: String, sep: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `%`: join or interleave a list.
    Separator,
    /// `?+`: emit text when the symbol is true.
    IfTrue,
    /// `?-`: emit text when the symbol is false.
    IfFalse,
}

impl Operator {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "%" => Some(Operator::Separator),
            "?+" => Some(Operator::IfTrue),
            "?-" => Some(Operator::IfFalse),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Operator::Separator => "%",
            Operator::IfTrue => "?+",
            Operator::IfFalse => "?-",
        }
    }
}

/// One `<...>` reference found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub op: Option<(Operator, String)>,
}

impl Reference {
    fn from_captures(caps: &Captures) -> Self {
        let op = match (caps.name("op"), caps.name("text")) {
            (Some(op), Some(text)) => {
                Operator::parse(op.as_str()).map(|op| (op, text.as_str().to_string()))
            }
            _ => None,
        };
        Self {
            name: caps["name"].to_string(),
            op,
        }
    }

    /// Parse `input` when it consists of exactly one reference.
    pub fn parse_whole(input: &str) -> Option<Self> {
        let caps = PARAM.captures(input)?;
        let whole = caps.get(0)?;
        (whole.start() == 0 && whole.end() == input.len()).then(|| Self::from_captures(&caps))
    }

    fn display(&self) -> String {
        match &self.op {
            None => format!("<{}>", self.name),
            Some((op, text)) => format!("<{}{}{}>", self.name, op.as_str(), text),
        }
    }
}

/// Result of resolving a single reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Text(String),
    List(Vec<String>),
    /// A conditional whose condition did not hold.
    Nothing,
}

impl Expansion {
    /// Collapse to one string; list items are joined with a single space.
    pub fn into_string(self) -> String {
        match self {
            Expansion::Text(s) => s,
            Expansion::List(items) => items.join(" "),
            Expansion::Nothing => String::new(),
        }
    }
}

/// Resolve one reference against `symbols`.
pub fn resolve(reference: &Reference, symbols: &SymbolTable) -> Result<Expansion, SubstituteError> {
    let name = &reference.name;
    let value = symbols
        .get(name)
        .ok_or_else(|| SubstituteError::Undefined(name.clone()))?;

    match &reference.op {
        None => match value {
            SymbolValue::Text(s) => Ok(Expansion::Text(s.clone())),
            SymbolValue::Int(n) => Ok(Expansion::Text(n.to_string())),
            SymbolValue::List(items) => {
                warn!(
                    "Deprecated functionality - expanding param {} should be a string not a list",
                    reference.display()
                );
                items
                    .first()
                    .map(|first| Expansion::Text(first.clone()))
                    .ok_or_else(|| SubstituteError::EmptyList(name.clone()))
            }
            SymbolValue::Unset => Err(SubstituteError::NotText(name.clone())),
        },
        Some((Operator::Separator, sep)) => {
            let items = match value {
                SymbolValue::List(items) => items,
                scalar => {
                    warn!(
                        "Deprecated functionality - expanding param {} should be a list not a string",
                        reference.display()
                    );
                    return match scalar {
                        SymbolValue::Text(s) => Ok(Expansion::Text(s.clone())),
                        SymbolValue::Int(n) => Ok(Expansion::Text(n.to_string())),
                        _ => Err(SubstituteError::NotText(name.clone())),
                    };
                }
            };
            separate(name, items, sep)
        }
        Some((Operator::IfTrue, text)) => Ok(conditional(value.is_truthy(), text)),
        Some((Operator::IfFalse, text)) => Ok(conditional(!value.is_truthy(), text)),
    }
}

fn conditional(holds: bool, text: &str) -> Expansion {
    if holds {
        Expansion::Text(text.to_string())
    } else {
        Expansion::Nothing
    }
}

fn separate(name: &str, items: &[String], sep: &str) -> Result<Expansion, SubstituteError> {
    if sep.chars().all(char::is_whitespace) {
        if sep != " " {
            return Err(SubstituteError::MalformedSeparator {
                name: name.to_string(),
                sep: sep.to_string(),
            });
        }
        return Ok(Expansion::List(items.to_vec()));
    }

    let trimmed = sep.trim();
    if trimmed == sep {
        return Ok(Expansion::Text(items.join(sep)));
    }

    let mut tokens = Vec::with_capacity(items.len() * 2);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            tokens.push(trimmed.to_string());
        }
        tokens.push(item.clone());
    }
    Ok(Expansion::List(tokens))
}

/// Replace every reference in `template` and expand environment variables
/// in the result.
pub fn substitute(template: &str, symbols: &SymbolTable) -> Result<String, SubstituteError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PARAM.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        let reference = Reference::from_captures(&caps);
        out.push_str(&resolve(&reference, symbols)?.into_string());
        last = whole.end();
    }
    out.push_str(&template[last..]);

    Ok(expand_env(&out))
}
