use crate::error::CommonError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::FileOptions;

/// A file to place in the deploy bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Path inside the archive, `/`-separated.
    pub archive_path: String,
    pub source: PathBuf,
}

impl BundleEntry {
    pub fn new(archive_path: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            source: source.into(),
        }
    }
}

/// Write `entries` into a deflate-compressed zip at `output`.
pub fn create_bundle(output: &Path, entries: &[BundleEntry]) -> Result<(), CommonError> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(output)?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in entries {
        let data = fs::read(&entry.source)?;
        writer
            .start_file(entry.archive_path.as_str(), options)
            .map_err(|err| CommonError::Archive(err.to_string()))?;
        writer.write_all(&data)?;
    }

    writer
        .finish()
        .map_err(|err| CommonError::Archive(err.to_string()))?;
    tracing::debug!(path = %output.display(), entries = entries.len(), "wrote bundle");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn bundle_contains_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "console.log('a')").unwrap();
        fs::write(&b, "console.log('b')").unwrap();

        let output = dir.path().join("out/bundle.zip");
        create_bundle(
            &output,
            &[
                BundleEntry::new("checkout/dist/a.js", &a),
                BundleEntry::new("theme/dist/b.js", &b),
            ],
        )
        .unwrap();

        let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut contents = String::new();
        archive
            .by_name("checkout/dist/a.js")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "console.log('a')");
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_bundle(
            &dir.path().join("bundle.zip"),
            &[BundleEntry::new("x", dir.path().join("missing"))],
        )
        .unwrap_err();
        assert!(matches!(err, CommonError::Io(_)));
    }
}
