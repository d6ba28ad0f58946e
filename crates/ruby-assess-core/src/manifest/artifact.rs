use std::collections::BTreeMap;
use std::path::Path;

use super::ManifestError;
use super::build_summary::{BuildSummary, RawArtifact};
use crate::param::{SymbolTable, SymbolValue};

/// Kind of a `build-artifacts` child element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `ruby-src`: Ruby sources to assess.
    RubySrc,
    /// `no-build`: sources that could not be built.
    NoBuild,
    Other(String),
}

impl ArtifactKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ruby-src" => ArtifactKind::RubySrc,
            "no-build" => ArtifactKind::NoBuild,
            other => ArtifactKind::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            ArtifactKind::RubySrc => "ruby-src",
            ArtifactKind::NoBuild => "no-build",
            ArtifactKind::Other(tag) => tag,
        }
    }
}

/// One unit of source to assess, with absolute file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// 1-based position among the `build-artifacts` children.
    pub id: u32,
    pub kind: ArtifactKind,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub dependency: Option<Vec<String>>,
    /// Build-summary fields inherited from the manifest.
    pub build_summary: BTreeMap<String, Option<String>>,
}

impl BuildArtifact {
    pub fn sources(&self) -> &[String] {
        self.include.as_deref().unwrap_or_default()
    }

    pub fn has_sources(&self) -> bool {
        !self.sources().is_empty()
    }

    /// Symbol table of the inherited build-summary fields and this
    /// artifact's own fields. `srcfile` aliases `include`.
    pub fn symbols(&self) -> SymbolTable {
        let mut table = SymbolTable::new();
        for (key, value) in &self.build_summary {
            table.insert(key.clone(), SymbolValue::from(value.clone()));
        }
        table.insert("id", i64::from(self.id));
        if let Some(include) = &self.include {
            table.insert("include", include.clone());
            table.insert("srcfile", include.clone());
        }
        if let Some(exclude) = &self.exclude {
            table.insert("exclude", exclude.clone());
        }
        if let Some(dependency) = &self.dependency {
            table.insert("dependency", dependency.clone());
        }
        table
    }
}

/// Lazy, single-pass sequence of artifacts from a [`BuildSummary`].
///
/// Stops for good after yielding an error.
pub struct BuildArtifacts<'a> {
    summary: &'a BuildSummary,
    elements: std::slice::Iter<'a, RawArtifact>,
    kinds: &'a [ArtifactKind],
    position: u32,
    failed: bool,
}

impl<'a> BuildArtifacts<'a> {
    pub(crate) fn new(
        summary: &'a BuildSummary,
        elements: &'a [RawArtifact],
        kinds: &'a [ArtifactKind],
    ) -> Self {
        Self {
            summary,
            elements: elements.iter(),
            kinds,
            position: 0,
            failed: false,
        }
    }
}

impl Iterator for BuildArtifacts<'_> {
    type Item = Result<BuildArtifact, ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        for raw in self.elements.by_ref() {
            self.position += 1;
            if !self.kinds.contains(&raw.kind) {
                continue;
            }
            match raw.kind {
                ArtifactKind::RubySrc => {
                    return Some(Ok(build_artifact(self.summary, self.position, raw)));
                }
                ArtifactKind::NoBuild => {
                    self.failed = true;
                    return Some(Err(ManifestError::Unsupported(raw.kind.tag().to_string())));
                }
                ArtifactKind::Other(_) => {}
            }
        }
        None
    }
}

fn build_artifact(summary: &BuildSummary, id: u32, raw: &RawArtifact) -> BuildArtifact {
    let root = summary.build_root_dir();
    let mut artifact = BuildArtifact {
        id,
        kind: raw.kind.clone(),
        include: None,
        exclude: None,
        dependency: None,
        build_summary: summary.fields().clone(),
    };

    for (tag, files) in &raw.filesets {
        let resolved: Vec<String> = files.iter().map(|f| absolute(root, f)).collect();
        match tag.as_str() {
            "include" => artifact.include = Some(resolved),
            "exclude" => artifact.exclude = Some(resolved),
            "dependency" => artifact.dependency = Some(resolved),
            _ => {}
        }
    }
    artifact
}

fn absolute(root: &str, file: &str) -> String {
    let path = Path::new(file);
    if path.is_absolute() {
        file.to_string()
    } else {
        Path::new(root).join(path).display().to_string()
    }
}
