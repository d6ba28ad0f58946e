use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::ManifestError;
use super::artifact::{ArtifactKind, BuildArtifacts};

/// Top-level elements that are structure rather than build-summary fields.
const NON_FIELD_TAGS: [&str; 6] = [
    "package-conf",
    "command",
    "build-artifacts",
    "gem-install",
    "gem-unpack",
    "build-command",
];

/// File-set elements recognised inside an artifact.
pub(crate) const FILESET_TAGS: [&str; 3] = ["include", "exclude", "dependency"];

/// An artifact element as it appeared in the document.
#[derive(Debug, Clone)]
pub(crate) struct RawArtifact {
    pub kind: ArtifactKind,
    /// `(fileset tag, paths as written)` in document order.
    pub filesets: Vec<(String, Vec<String>)>,
}

/// A validated build-summary manifest.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    path: PathBuf,
    fields: BTreeMap<String, Option<String>>,
    package_conf: BTreeMap<String, Option<String>>,
    artifacts: Vec<RawArtifact>,
}

impl BuildSummary {
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            file: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse and validate manifest `text`; `path` is used for messages only.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ManifestError> {
        let file = path.display().to_string();
        let doc = Document::parse(text).map_err(|e| ManifestError::Parse {
            file: file.clone(),
            message: e.to_string(),
        })?;
        let root = doc.root_element();

        let missing = |field: &str| ManifestError::MissingField {
            field: field.to_string(),
            file: file.clone(),
        };

        if root.tag_name().name() != "build-summary" {
            return Err(missing("build-summary"));
        }

        let exit_code = child(root, "exit-code").ok_or_else(|| missing("exit-code"))?;
        let exit_code = element_text(exit_code).unwrap_or_default();
        match exit_code.trim().parse::<i64>() {
            Ok(0) => {}
            Ok(code) => {
                return Err(ManifestError::BuildFailed {
                    file: file.clone(),
                    exit_code: code,
                });
            }
            Err(_) => {
                return Err(ManifestError::Parse {
                    file: file.clone(),
                    message: format!("exit-code `{exit_code}` is not an integer"),
                });
            }
        }

        if child(root, "build-root-dir").is_none() {
            return Err(missing("build-root-dir"));
        }

        let build_artifacts = child(root, "build-artifacts").ok_or(ManifestError::NoArtifacts)?;

        let fields = root
            .children()
            .filter(Node::is_element)
            .filter(|e| !NON_FIELD_TAGS.contains(&e.tag_name().name()))
            .map(|e| (e.tag_name().name().to_string(), element_text(e)))
            .collect();

        let package_conf = child(root, "package-conf")
            .map(|conf| {
                conf.children()
                    .filter(Node::is_element)
                    .map(|e| (e.tag_name().name().to_string(), element_text(e)))
                    .collect()
            })
            .unwrap_or_default();

        let artifacts = build_artifacts
            .children()
            .filter(Node::is_element)
            .map(read_artifact)
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            fields,
            package_conf,
            artifacts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `key` is a top-level build-summary field.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Look up a top-level field, falling back to the package configuration.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(value) => value.as_deref(),
            None => self.package_conf.get(key).and_then(|v| v.as_deref()),
        }
    }

    pub fn build_root_dir(&self) -> &str {
        self.get("build-root-dir").unwrap_or_default()
    }

    pub fn package_conf(&self) -> &BTreeMap<String, Option<String>> {
        &self.package_conf
    }

    pub(crate) fn fields(&self) -> &BTreeMap<String, Option<String>> {
        &self.fields
    }

    /// Lazily yield the artifacts of the requested kinds in document order.
    ///
    /// Requesting [`ArtifactKind::NoBuild`] yields
    /// [`ManifestError::Unsupported`] when such an element is reached.
    pub fn get_build_artifacts<'a>(&'a self, kinds: &'a [ArtifactKind]) -> BuildArtifacts<'a> {
        BuildArtifacts::new(self, &self.artifacts, kinds)
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn element_text(node: Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn read_artifact(node: Node) -> RawArtifact {
    let filesets = node
        .children()
        .filter(Node::is_element)
        .filter(|e| FILESET_TAGS.contains(&e.tag_name().name()))
        .map(|set| {
            let files = set
                .children()
                .filter(Node::is_element)
                .filter_map(element_text)
                .collect();
            (set.tag_name().name().to_string(), files)
        })
        .collect();

    RawArtifact {
        kind: ArtifactKind::from_tag(node.tag_name().name()),
        filesets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"<?xml version="1.0"?>
<build-summary>
  <exit-code>0</exit-code>
  <build-root-dir>/build</build-root-dir>
  <package-root-dir>pkg-1.0</package-root-dir>
  <build-fw>ruby-build</build-fw>
  <command><cwd>/build</cwd></command>
  <package-conf>
    <package-short-name>pkg</package-short-name>
    <package-version>1.0</package-version>
  </package-conf>
  <build-artifacts>
    <ruby-src><include><file>lib/a.rb</file></include></ruby-src>
  </build-artifacts>
</build-summary>"#;

    fn parse(text: &str) -> Result<BuildSummary, ManifestError> {
        BuildSummary::parse(text, Path::new("build_summary.xml"))
    }

    #[test]
    fn reads_fields_and_package_conf() {
        let summary = parse(GOOD).unwrap();
        assert_eq!(summary.build_root_dir(), "/build");
        assert_eq!(summary.get("build-fw"), Some("ruby-build"));
        assert_eq!(summary.get("package-short-name"), Some("pkg"));
        assert!(summary.contains("package-root-dir"));
        assert!(!summary.contains("command"));
        assert!(!summary.contains("package-short-name"));
        assert_eq!(summary.get("nope"), None);
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = parse("<other><exit-code>0</exit-code></other>").unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { ref field, .. } if field == "build-summary"));
    }

    #[test]
    fn missing_exit_code_is_rejected() {
        let err = parse("<build-summary><build-root-dir>/b</build-root-dir></build-summary>")
            .unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { ref field, .. } if field == "exit-code"));
    }

    #[test]
    fn nonzero_exit_code_fails_before_anything_else() {
        let err = parse("<build-summary><exit-code>2</exit-code></build-summary>").unwrap_err();
        assert!(matches!(err, ManifestError::BuildFailed { exit_code: 2, .. }));
    }

    #[test]
    fn missing_build_root_is_rejected() {
        let err = parse(
            "<build-summary><exit-code>0</exit-code><build-artifacts/></build-summary>",
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { ref field, .. } if field == "build-root-dir"));
    }

    #[test]
    fn missing_artifacts_is_a_distinct_failure() {
        let err = parse(
            "<build-summary><exit-code>0</exit-code><build-root-dir>/b</build-root-dir></build-summary>",
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::NoArtifacts));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        assert!(matches!(
            parse("<build-summary>").unwrap_err(),
            ManifestError::Parse { .. }
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = BuildSummary::from_file(Path::new("/nonexistent/build_summary.xml")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }
}
