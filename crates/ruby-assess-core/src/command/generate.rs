use serde::Serialize;
use std::path::Path;

use super::TemplateError;
use super::template::{CommandTemplate, TemplateNode};
use crate::param::env::expand_env;
use crate::param::{Expansion, Reference, SubstituteError, SymbolTable, resolve, substitute};

/// An option as it appears on a generated command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOption {
    pub flag: String,
    pub value: Option<String>,
}

/// A concrete argument vector; `argv[0]` is the executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedCommand {
    pub argv: Vec<String>,
}

impl GeneratedCommand {
    pub fn executable(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Options in order of appearance. A `-`-prefixed argument takes the
    /// following argument as its value unless that one is an option too.
    pub fn options(&self) -> Vec<CommandOption> {
        let args = self.args();
        let mut options = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            if arg.starts_with('-') && arg.len() > 1 {
                let value = args.get(i + 1).filter(|next| !next.starts_with('-')).cloned();
                if value.is_some() {
                    i += 1;
                }
                options.push(CommandOption {
                    flag: arg.clone(),
                    value,
                });
            }
            i += 1;
        }
        options
    }
}

/// Expand `template` against `symbols` into an argument vector.
///
/// A line that is exactly one reference keeps list results as separate
/// arguments; any other line becomes one argument, or none if it
/// substitutes to the empty string.
pub fn generate(
    template: &CommandTemplate,
    symbols: &SymbolTable,
) -> Result<GeneratedCommand, TemplateError> {
    let mut argv = Vec::new();
    emit(&template.nodes, symbols, &mut argv)?;
    if argv.is_empty() {
        return Err(TemplateError::Empty);
    }
    Ok(GeneratedCommand { argv })
}

/// Read the template at `path` and generate the command for `symbols`.
pub fn gencmd(path: &Path, symbols: &SymbolTable) -> Result<GeneratedCommand, TemplateError> {
    generate(&CommandTemplate::from_file(path)?, symbols)
}

fn emit(
    nodes: &[TemplateNode],
    symbols: &SymbolTable,
    argv: &mut Vec<String>,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            TemplateNode::Arg(line) => emit_line(line, symbols, argv)?,
            TemplateNode::Group {
                name,
                when,
                children,
            } => {
                let value = symbols
                    .get(name)
                    .ok_or_else(|| SubstituteError::Undefined(name.clone()))?;
                if value.is_truthy() == *when {
                    emit(children, symbols, argv)?;
                }
            }
        }
    }
    Ok(())
}

fn emit_line(line: &str, symbols: &SymbolTable, argv: &mut Vec<String>) -> Result<(), TemplateError> {
    if let Some(reference) = Reference::parse_whole(line) {
        match resolve(&reference, symbols)? {
            Expansion::Text(text) => argv.push(expand_env(&text)),
            Expansion::List(items) => argv.extend(items.iter().map(|item| expand_env(item))),
            Expansion::Nothing => {}
        }
        return Ok(());
    }

    let arg = substitute(line, symbols)?;
    if !arg.is_empty() {
        argv.push(arg);
    }
    Ok(())
}
