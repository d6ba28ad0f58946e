use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::path::Path;

use super::SummaryError;
use super::model::{InvocationRecord, RecordKind, SummaryHeader, basename};

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), SummaryError> {
        self.writer
            .write_event(event)
            .map_err(|e| SummaryError::Xml(e.to_string()))
    }

    fn open(&mut self, tag: &str) -> Result<(), SummaryError> {
        self.event(Event::Start(BytesStart::new(tag)))
    }

    fn close(&mut self, tag: &str) -> Result<(), SummaryError> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    /// `<tag>text</tag>`, or `<tag/>` when there is no text.
    fn leaf(&mut self, tag: &str, text: Option<&str>) -> Result<(), SummaryError> {
        match text.filter(|t| !t.is_empty()) {
            Some(text) => {
                self.open(tag)?;
                self.event(Event::Text(BytesText::new(text)))?;
                self.close(tag)
            }
            None => self.event(Event::Empty(BytesStart::new(tag))),
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Serialize a complete summary document.
pub fn render_summary(
    header: &SummaryHeader,
    records: &[InvocationRecord],
    stop_ts: &str,
) -> Result<Vec<u8>, SummaryError> {
    let mut out = XmlOut::new();
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    out.open("assessment-summary")?;
    out.leaf("assessment-summary-uuid", Some(&header.uuid))?;
    if let Some(fw) = &header.assess_fw {
        out.leaf("assess-fw", Some(fw))?;
    }
    if let Some(version) = &header.assess_fw_version {
        out.leaf("assess-fw-version", Some(version))?;
    }
    out.leaf("build-root-dir", Some(&header.build_root_dir))?;
    out.leaf("package-root-dir", Some(&header.package_root_dir))?;
    out.leaf("package-name", header.package_name.as_deref())?;
    out.leaf("package-version", header.package_version.as_deref())?;
    if let Some(uuid) = &header.build_summary_uuid {
        out.leaf("build-summary-uuid", Some(uuid))?;
    }
    out.leaf("tool-type", Some(&header.tool_type))?;
    out.leaf("tool-version", header.tool_version.as_deref())?;
    out.leaf("platform-name", Some(&header.platform_name))?;
    out.leaf("start-ts", Some(&header.start_ts))?;

    if records.is_empty() {
        out.leaf("assessment-artifacts", None)?;
    } else {
        out.open("assessment-artifacts")?;
        for record in records {
            write_record(&mut out, record)?;
        }
        out.close("assessment-artifacts")?;
    }

    out.leaf("stop-ts", Some(stop_ts))?;
    out.close("assessment-summary")?;

    let mut bytes = out.into_bytes();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize and write the document to `path`.
pub fn write_summary(
    path: &Path,
    header: &SummaryHeader,
    records: &[InvocationRecord],
    stop_ts: &str,
) -> Result<(), SummaryError> {
    let bytes = render_summary(header, records, stop_ts)?;
    fs::write(path, bytes).map_err(|source| SummaryError::Io {
        file: path.display().to_string(),
        source,
    })
}

fn write_record(out: &mut XmlOut, record: &InvocationRecord) -> Result<(), SummaryError> {
    let tag = record.kind.tag();
    let exec = &record.execution;

    out.open(tag)?;
    if let Some(id) = &record.build_artifact_id {
        out.leaf("build-artifact-id", Some(id))?;
    }
    if record.kind == RecordKind::Assessment {
        let report = record.report.as_deref().map(basename);
        out.leaf("report", report.as_deref())?;
    }
    if let Some(stdout) = &record.stdout {
        out.leaf("stdout", Some(&basename(stdout)))?;
    }
    if let Some(stderr) = &record.stderr {
        out.leaf("stderr", Some(&basename(stderr)))?;
    }
    out.leaf("exit-code", Some(&exec.exit_code.to_string()))?;
    out.leaf(
        "execution-successful",
        Some(if record.execution_successful { "true" } else { "false" }),
    )?;
    out.leaf("start-ts", Some(&exec.start_ts))?;
    out.leaf("stop-ts", Some(&exec.stop_ts))?;

    out.open("command")?;
    out.leaf("cwd", Some(&exec.cwd.display().to_string()))?;
    if exec.environment.is_empty() {
        out.leaf("environment", None)?;
    } else {
        out.open("environment")?;
        for (key, value) in &exec.environment {
            out.leaf("env", Some(&format!("{key}={value}")))?;
        }
        out.close("environment")?;
    }
    out.leaf("executable", Some(exec.executable()))?;
    out.open("args")?;
    for arg in &exec.argv {
        out.leaf("arg", Some(arg))?;
    }
    out.close("args")?;
    out.close("command")?;

    out.close(tag)
}
