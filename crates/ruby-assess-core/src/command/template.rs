//! Tool-invoke template documents.
//!
//! One argument template per line. `[name?+` and `[name?-` open a group
//! that is emitted only when `name` is true (respectively false); `]`
//! closes the innermost group. Blank lines and `#` lines are ignored.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use super::TemplateError;

static GROUP_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<name>[a-zA-Z][a-zA-Z0-9_-]*)\?(?P<sign>[+-])$")
        .expect("group pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// One argument template.
    Arg(String),
    /// Lines emitted only when the truthiness of `name` equals `when`.
    Group {
        name: String,
        when: bool,
        children: Vec<TemplateNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandTemplate {
    pub nodes: Vec<TemplateNode>,
}

struct OpenGroup {
    name: String,
    when: bool,
    line: usize,
    children: Vec<TemplateNode>,
}

impl CommandTemplate {
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let text = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            file: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut top = Vec::new();
        let mut open: Vec<OpenGroup> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let number = index + 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line == "]" {
                let group = open.pop().ok_or_else(|| TemplateError::Syntax {
                    line: number,
                    message: "`]` without an open group".to_string(),
                })?;
                let node = TemplateNode::Group {
                    name: group.name,
                    when: group.when,
                    children: group.children,
                };
                match open.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => top.push(node),
                }
                continue;
            }

            if line.starts_with('[') {
                let caps = GROUP_OPEN
                    .captures(line)
                    .ok_or_else(|| TemplateError::Syntax {
                        line: number,
                        message: format!("malformed group opener `{line}`"),
                    })?;
                open.push(OpenGroup {
                    name: caps["name"].to_string(),
                    when: &caps["sign"] == "+",
                    line: number,
                    children: Vec::new(),
                });
                continue;
            }

            let node = TemplateNode::Arg(line.to_string());
            match open.last_mut() {
                Some(parent) => parent.children.push(node),
                None => top.push(node),
            }
        }

        if let Some(group) = open.pop() {
            return Err(TemplateError::Syntax {
                line: group.line,
                message: format!("group `{}` is never closed", group.name),
            });
        }

        Ok(Self { nodes: top })
    }
}
