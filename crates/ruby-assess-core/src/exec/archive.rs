use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder};
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

use super::process::{Program, inherited_env, run_cmd};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("unsupported archive format: `{0}`")]
    Unsupported(String),

    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read zip archive `{path}`: {message}")]
    Zip { path: String, message: String },

    #[error("entry `{entry}` in `{archive}` escapes the destination")]
    UnsafeEntry { archive: String, entry: String },

    #[error("`tar` exited with {exit_code} while unpacking `{archive}`")]
    External { archive: String, exit_code: i32 },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Tar,
    TarGz,
    Zip,
    /// Compressed tar handed to the system `tar` with the given flag.
    ExternalTar(&'static str),
}

fn detect(archive: &Path) -> Option<Format> {
    let name = archive.file_name()?.to_str()?;
    const TABLE: [(&str, Format); 13] = [
        (".tar.gz", Format::TarGz),
        (".tgz", Format::TarGz),
        (".tar", Format::Tar),
        (".zip", Format::Zip),
        (".jar", Format::Zip),
        (".war", Format::Zip),
        (".ear", Format::Zip),
        (".tar.bz2", Format::ExternalTar("-j")),
        (".tbz2", Format::ExternalTar("-j")),
        (".tar.xz", Format::ExternalTar("-J")),
        (".txz", Format::ExternalTar("-J")),
        (".tar.Z", Format::ExternalTar("-Z")),
        (".taz", Format::ExternalTar("-Z")),
    ];
    TABLE
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix))
        .map(|(_, format)| *format)
}

/// Unpack `archive` into `dest`, choosing the format from the file name.
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let format =
        detect(archive).ok_or_else(|| ArchiveError::Unsupported(archive.display().to_string()))?;
    debug!(archive = %archive.display(), ?format, "unpacking");

    fs::create_dir_all(dest).map_err(io_err(dest))?;

    match format {
        Format::Tar => unpack_tar(File::open(archive).map_err(io_err(archive))?, archive, dest),
        Format::TarGz => unpack_tar(
            GzDecoder::new(File::open(archive).map_err(io_err(archive))?),
            archive,
            dest,
        ),
        Format::Zip => unpack_zip(archive, dest),
        Format::ExternalTar(flag) => {
            let program = Program::Argv(vec![
                "tar".to_string(),
                "-x".to_string(),
                flag.to_string(),
                "-f".to_string(),
                absolute(archive).display().to_string(),
            ]);
            let exit_code =
                run_cmd(&program, dest, &inherited_env(), None).map_err(io_err(archive))?;
            if exit_code != 0 {
                return Err(ArchiveError::External {
                    archive: archive.display().to_string(),
                    exit_code,
                });
            }
            Ok(())
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn unpack_tar<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let mut tar = Archive::new(reader);
    tar.set_preserve_permissions(true);

    for entry in tar.entries().map_err(io_err(archive))? {
        let mut entry = entry.map_err(io_err(archive))?;
        let entry_path = entry.path().map_err(io_err(archive))?.to_path_buf();

        if contained_path(dest, &entry_path).is_none() {
            return Err(ArchiveError::UnsafeEntry {
                archive: archive.display().to_string(),
                entry: entry_path.display().to_string(),
            });
        }
        entry.unpack_in(dest).map_err(io_err(&entry_path))?;
    }
    Ok(())
}

fn unpack_zip(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let zip_err = |e: zip::result::ZipError| ArchiveError::Zip {
        path: archive.display().to_string(),
        message: e.to_string(),
    };
    let file = File::open(archive).map_err(io_err(archive))?;
    let mut zip = ZipArchive::new(file).map_err(zip_err)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(zip_err)?;
        let name = entry.name().to_owned();
        let out_path =
            contained_path(dest, Path::new(&name)).ok_or_else(|| ArchiveError::UnsafeEntry {
                archive: archive.display().to_string(),
                entry: name.clone(),
            })?;

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(io_err(&out_path))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut out = File::create(&out_path).map_err(io_err(&out_path))?;
        io::copy(&mut entry, &mut out).map_err(io_err(&out_path))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                .map_err(io_err(&out_path))?;
        }
    }
    Ok(())
}

/// `dest` joined with `entry`, or `None` if the entry would land outside
/// `dest`. Works on the lexical path; nothing needs to exist.
fn contained_path(dest: &Path, entry: &Path) -> Option<PathBuf> {
    let mut resolved = dest.to_path_buf();
    let mut depth = 0usize;
    for component in entry.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Write `root` as a gzip-compressed tar to `out`. Entries are rooted at
/// the final component of `root`.
pub fn make_results_archive(root: &Path, out: &Path) -> Result<(), ArchiveError> {
    let base = root
        .file_name()
        .ok_or_else(|| ArchiveError::Unsupported(root.display().to_string()))?;

    let file = File::create(out).map_err(io_err(out))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    builder.append_dir_all(base, root).map_err(io_err(root))?;
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(io_err(out))?;
    Ok(())
}
