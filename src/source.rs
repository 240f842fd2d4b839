//! Document sources: where control/target pairs come from.

use std::path::{Path, PathBuf};

use crate::dom::Document;
use crate::error::{Error, Result, Side};

/// Supplies the control and target documents for a record identifier.
pub trait DocumentSource {
    /// Fetch both documents for `id`. Either side failing is
    /// [`Error::SourceUnavailable`] carrying the missing side.
    fn fetch(&self, id: &str) -> Result<(Document, Document)>;
}

/// Directory-backed source: reads `<id>.xml` from a control directory and a
/// target directory.
#[derive(Debug, Clone)]
pub struct DirPairSource {
    control_dir: PathBuf,
    target_dir: PathBuf,
}

impl DirPairSource {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(control_dir: P, target_dir: Q) -> Self {
        DirPairSource {
            control_dir: control_dir.into(),
            target_dir: target_dir.into(),
        }
    }
}

impl DocumentSource for DirPairSource {
    fn fetch(&self, id: &str) -> Result<(Document, Document)> {
        let control = load(&self.control_dir, id, Side::Control)?;
        let target = load(&self.target_dir, id, Side::Target)?;
        Ok((control, target))
    }
}

/// A file that cannot be read or parsed produced no usable document; both
/// conditions report as the side being unavailable.
fn load(dir: &Path, id: &str, side: Side) -> Result<Document> {
    let path = dir.join(format!("{id}.xml"));
    let unavailable = || Error::SourceUnavailable {
        id: id.to_string(),
        side,
    };
    let bytes = std::fs::read(&path).map_err(|_| unavailable())?;
    let text = decode_text(&bytes);
    Document::parse(&text).map_err(|_| unavailable())
}

/// Decode bytes to a string: UTF-8 first (handles a BOM), falling back to
/// Windows-1252 for legacy exports.
fn decode_text(bytes: &[u8]) -> String {
    let (result, _, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result.into_owned();
    }
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_fetch_pair_from_directories() {
        let dir = tempfile::tempdir().unwrap();
        let control_dir = dir.path().join("control");
        let target_dir = dir.path().join("target");
        fs::create_dir_all(&control_dir).unwrap();
        fs::create_dir_all(&target_dir).unwrap();
        fs::write(control_dir.join("r1.xml"), "<Root><A>c</A></Root>").unwrap();
        fs::write(target_dir.join("r1.xml"), "<Root><A>t</A></Root>").unwrap();

        let source = DirPairSource::new(&control_dir, &target_dir);
        let (control, target) = source.fetch("r1").unwrap();
        assert_eq!(control.root.child_elements().next().unwrap().direct_text(), "c");
        assert_eq!(target.root.child_elements().next().unwrap().direct_text(), "t");
    }

    #[test]
    fn test_missing_target_reports_target_side() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("r1.xml"), "<Root/>").unwrap();
        let empty = tempfile::tempdir().unwrap();

        let source = DirPairSource::new(dir.path(), empty.path());
        match source.fetch("r1") {
            Err(Error::SourceUnavailable { id, side }) => {
                assert_eq!(id, "r1");
                assert_eq!(side, Side::Target);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_control_reports_control_side() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("r1.xml"), "<Root/>").unwrap();
        let empty = tempfile::tempdir().unwrap();

        let source = DirPairSource::new(empty.path(), dir.path());
        match source.fetch("r1") {
            Err(Error::SourceUnavailable { side, .. }) => assert_eq!(side, Side::Control),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("r1.xml"), "<Root><Broken></Root>").unwrap();

        let source = DirPairSource::new(dir.path(), dir.path());
        assert!(matches!(
            source.fetch("r1"),
            Err(Error::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempfile::tempdir().unwrap();
        // 0xE9 is 'é' in Windows-1252 and invalid UTF-8
        fs::write(dir.path().join("r1.xml"), b"<Root>caf\xe9</Root>".as_slice()).unwrap();

        let source = DirPairSource::new(dir.path(), dir.path());
        let (control, _) = source.fetch("r1").unwrap();
        assert_eq!(control.root.direct_text(), "café");
    }
}
