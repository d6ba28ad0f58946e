use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::ConfigError;

/// Read a `key=value` document from `path`.
pub fn read_conf(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        file: path.display().to_string(),
        source,
    })?;
    parse_conf(&text, &path.display().to_string())
}

/// Parse a `key=value` document.
///
/// Lines split on the first `=`; key and value are trimmed. Blank lines and
/// lines starting with `#` are ignored. A later duplicate key wins.
pub fn parse_conf(text: &str, origin: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut conf = BTreeMap::new();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(ConfigError::Syntax {
                file: origin.to_string(),
                line: index + 1,
                text: trimmed.to_string(),
            });
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::Syntax {
                file: origin.to_string(),
                line: index + 1,
                text: trimmed.to_string(),
            });
        }
        conf.insert(key.to_string(), value.trim().to_string());
    }

    Ok(conf)
}

/// Write `conf` as sorted `key=value` lines.
pub fn write_conf(path: &Path, conf: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    let body: String = conf.iter().map(|(k, v)| format!("{k}={v}\n")).collect();
    fs::write(path, body).map_err(|source| ConfigError::Io {
        file: path.display().to_string(),
        source,
    })
}
