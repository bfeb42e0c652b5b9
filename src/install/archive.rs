//! Archive extraction and installation layouts.
//!
//! Extraction rejects entries that would land outside the destination:
//! absolute paths, `..` components and writes through escaping links.

use crate::tools::{ArchiveFormat, ArchiveLayout};
use regex::bytes::{Captures, Regex};
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Top-level directory of the Clojure CLI tarball.
const CLOJURE_TOOLS_DIR: &str = "clojure-tools";

/// Launchers shipped in the Clojure CLI tarball.
const CLOJURE_SCRIPTS: [&str; 2] = ["clojure", "clj"];

/// PowerShell module directory inside the Windows Clojure CLI zip.
const POWERSHELL_MODULE_DIR: &str = "ClojureTools";

/// Errors arising from extraction or layout.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ExtractError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container could not be read.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An entry tries to escape the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry path.
        path: String,
    },

    /// An entry the layout depends on is missing.
    #[error("archive is missing {name}")]
    MissingEntry {
        /// Name of the missing entry.
        name: String,
    },
}

/// Extract `archive` into `dest`.
pub(crate) fn extract(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<(), ExtractError> {
    std::fs::create_dir_all(dest)?;
    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive, dest),
        ArchiveFormat::Zip => extract_zip(archive, dest),
    }
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        // unpack_in also refuses writes through links that leave dest
        if !entry.unpack_in(dest)? {
            return Err(ExtractError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }
    }
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractError::PathTraversal {
                path: entry.name().to_string(),
            })?;
        let dest_path = dest.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest_path)?;
        std::io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dest_path, std::fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

fn validate_entry_path(path: &Path) -> Result<(), ExtractError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Extract `archive` and arrange it per `layout` under `dest`, returning
/// the install root.
pub(crate) fn install(
    layout: ArchiveLayout,
    archive: &Path,
    format: ArchiveFormat,
    dest: &Path,
) -> Result<PathBuf, ExtractError> {
    match layout {
        ArchiveLayout::ClojureTools => {
            let staging = dest.join("archive");
            extract(archive, format, &staging)?;
            let root = dest.join("clojure");
            lay_out_clojure_tools(&staging.join(CLOJURE_TOOLS_DIR), &root)?;
            Ok(root)
        }
        ArchiveLayout::PowerShellModule => {
            let root = dest.join("clojure");
            extract(archive, format, &root)?;
            require(&root.join(POWERSHELL_MODULE_DIR), POWERSHELL_MODULE_DIR)?;
            Ok(root)
        }
        ArchiveLayout::Executables(names) => {
            let bin_dir = dest.join("bin");
            extract(archive, format, &bin_dir)?;
            for name in names {
                let binary = bin_dir.join(name);
                require(&binary, name)?;
                make_executable(&binary)?;
            }
            Ok(dest.to_path_buf())
        }
    }
}

/// Arrange an extracted `clojure-tools/` directory into `root`:
///
/// - `clojure`, `clj` → `bin/` (executable, placeholders kept until
///   [`finalize`] knows the final root)
/// - `*.edn` → `lib/clojure/`
/// - `*.jar` → `lib/clojure/libexec/`
/// - `*.1` man pages → `share/man/man1/`
fn lay_out_clojure_tools(source: &Path, root: &Path) -> Result<(), ExtractError> {
    require(source, CLOJURE_TOOLS_DIR)?;

    let bin_dir = root.join("bin");
    let lib_dir = root.join("lib").join("clojure");
    let libexec_dir = lib_dir.join("libexec");
    let man_dir = root.join("share").join("man").join("man1");
    for dir in [&bin_dir, &lib_dir, &libexec_dir, &man_dir] {
        std::fs::create_dir_all(dir)?;
    }

    for script in CLOJURE_SCRIPTS {
        let from = source.join(script);
        require(&from, script)?;
        let to = bin_dir.join(script);
        std::fs::copy(&from, &to)?;
        make_executable(&to)?;
    }

    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let target_dir = if name_str.ends_with(".edn") {
            &lib_dir
        } else if name_str.ends_with(".jar") {
            &libexec_dir
        } else if name_str.ends_with(".1") {
            &man_dir
        } else {
            continue;
        };
        std::fs::copy(entry.path(), target_dir.join(&name))?;
    }

    debug!(root = %root.display(), "Laid out Clojure CLI tools");
    Ok(())
}

/// Point the installation staged at `staged` at its final location `root`.
///
/// The Clojure CLI launchers carry `PREFIX` and `BINDIR` placeholders that
/// must name the directory the tool is used from, i.e. the tool cache
/// entry rather than the working directory it was laid out in. Launchers
/// are rewritten as bytes; their encoding is not assumed.
pub(crate) fn finalize(layout: ArchiveLayout, staged: &Path, root: &Path) -> Result<(), ExtractError> {
    if layout != ArchiveLayout::ClojureTools {
        return Ok(());
    }

    let bin_dir = root.join("bin");
    let lib_dir = root.join("lib").join("clojure");
    let bin_dir = bin_dir.to_string_lossy();
    let lib_dir = lib_dir.to_string_lossy();

    for script in CLOJURE_SCRIPTS {
        let path = staged.join("bin").join(script);
        let contents = std::fs::read(&path)?;
        let rewritten = placeholder_regex().replace_all(&contents, |caps: &Captures<'_>| {
            if &caps[0] == b"PREFIX" {
                lib_dir.as_bytes().to_vec()
            } else {
                bin_dir.as_bytes().to_vec()
            }
        });
        std::fs::write(&path, rewritten)?;
    }
    debug!(root = %root.display(), "Substituted launcher placeholders");
    Ok(())
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("PREFIX|BINDIR").expect("Invalid placeholder regex"))
}

fn require(path: &Path, name: &str) -> Result<(), ExtractError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ExtractError::MissingEntry {
            name: name.to_string(),
        })
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
