//! Site packaging.
//!
//! Turns the configured site source into the zip archive uploaded as the
//! package blob. Directories are zipped in memory with a deterministic
//! entry order and fixed timestamps, so an unchanged site always produces
//! the same content hash; a pre-built `.zip` is read as-is.

use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PackageError, Result, StratusError};

/// A packaged site ready for upload.
#[derive(Debug, Clone)]
pub struct SitePackage {
    /// Source the package was built from.
    source: PathBuf,
    /// Zip archive bytes.
    content: Vec<u8>,
    /// SHA-256 of the archive bytes, hex encoded.
    content_hash: String,
}

impl SitePackage {
    /// Loads and packages the site source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing, unsupported, empty, or
    /// cannot be archived.
    pub fn load(source: impl AsRef<Path>) -> Result<Self> {
        let source = source.as_ref();

        if !source.exists() {
            return Err(StratusError::Package(PackageError::SourceNotFound {
                path: source.to_path_buf(),
            }));
        }

        let content = if source.is_dir() {
            info!("Packaging site directory: {}", source.display());
            zip_directory(source)?
        } else if source
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        {
            info!("Using pre-built site archive: {}", source.display());
            std::fs::read(source)?
        } else {
            return Err(StratusError::Package(PackageError::UnsupportedSource {
                path: source.to_path_buf(),
            }));
        };

        if content.is_empty() {
            return Err(StratusError::Package(PackageError::EmptyPackage {
                path: source.to_path_buf(),
            }));
        }

        let content_hash = hex::encode(Sha256::digest(&content));
        debug!(
            "Packaged {} bytes, content hash {}",
            content.len(),
            &content_hash[..8]
        );

        Ok(Self {
            source: source.to_path_buf(),
            content,
            content_hash,
        })
    }

    /// Returns the source path the package was built from.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the archive bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consumes the package, returning the archive bytes.
    #[must_use]
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// Returns the hex-encoded SHA-256 of the archive bytes.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Returns the archive size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Zips a directory into an in-memory archive with deterministic entry
/// order and fixed timestamps.
fn zip_directory(dir: &Path) -> Result<Vec<u8>> {
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;
    files.sort();

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    for relative in &files {
        let entry_name = relative
            .to_str()
            .ok_or_else(|| PackageError::archive(format!("Non-UTF8 path: {}", relative.display())))?
            .replace('\\', "/");

        writer
            .start_file(entry_name.as_str(), options)
            .map_err(|e| PackageError::archive(format!("Failed to add {entry_name}: {e}")))?;

        let bytes = std::fs::read(dir.join(relative))?;
        writer
            .write_all(&bytes)
            .map_err(|e| PackageError::archive(format!("Failed to write {entry_name}: {e}")))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| PackageError::archive(format!("Failed to finish archive: {e}")))?;

    Ok(cursor.into_inner())
}

/// Recursively collects file paths relative to `root`.
fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let relative = path.strip_prefix(root).map_err(|e| {
                PackageError::archive(format!("Path outside source root: {e}"))
            })?;
            files.push(relative.to_path_buf());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_site(dir: &Path) {
        std::fs::create_dir_all(dir.join("assets")).unwrap();
        std::fs::write(dir.join("index.html"), "<html>hello</html>").unwrap();
        std::fs::write(dir.join("assets/app.css"), "body {}").unwrap();
    }

    #[test]
    fn test_package_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_site(dir.path());

        let package = SitePackage::load(dir.path()).unwrap();

        assert!(!package.content().is_empty());
        assert_eq!(package.content_hash().len(), 64);
        // Zip local file header magic.
        assert_eq!(&package.content()[..2], b"PK");
    }

    #[test]
    fn test_packaging_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write_site(dir.path());

        let first = SitePackage::load(dir.path()).unwrap();
        let second = SitePackage::load(dir.path()).unwrap();

        assert_eq!(first.content_hash(), second.content_hash());
    }

    #[test]
    fn test_content_change_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        write_site(dir.path());
        let before = SitePackage::load(dir.path()).unwrap();

        std::fs::write(dir.path().join("index.html"), "<html>changed</html>").unwrap();
        let after = SitePackage::load(dir.path()).unwrap();

        assert_ne!(before.content_hash(), after.content_hash());
    }

    #[test]
    fn test_prebuilt_zip_is_read_as_is() {
        let dir = tempfile::tempdir().unwrap();
        write_site(dir.path());
        let built = SitePackage::load(dir.path()).unwrap();

        let zip_dir = tempfile::tempdir().unwrap();
        let zip_path = zip_dir.path().join("site.zip");
        std::fs::write(&zip_path, built.content()).unwrap();

        let reloaded = SitePackage::load(&zip_path).unwrap();
        assert_eq!(reloaded.content_hash(), built.content_hash());
    }

    #[test]
    fn test_missing_source_fails() {
        let result = SitePackage::load("/nonexistent/site");
        assert!(matches!(
            result,
            Err(StratusError::Package(PackageError::SourceNotFound { .. }))
        ));
    }

    #[test]
    fn test_unsupported_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("site.tar");
        std::fs::write(&file, "not a zip").unwrap();

        let result = SitePackage::load(&file);
        assert!(matches!(
            result,
            Err(StratusError::Package(PackageError::UnsupportedSource { .. }))
        ));
    }
}
