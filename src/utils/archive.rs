//! Export archive handling: ZIP extraction into a scoped temporary directory
//! and CSV reading.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;
use zip::ZipArchive;

use crate::search::SearchError;

/// CSV with one row per publication
pub const PUBLICATIONS_FILE_NAME: &str = "Publikationen.csv";

/// CSV with the aggregated key figures (not read by the pipeline)
pub const ANALYSIS_FILE_NAME: &str = "Analyse.csv";

/// A parsed CSV file: header names plus the raw rows in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Extract every entry of a ZIP archive into a fresh temporary directory.
///
/// The directory and its contents are removed when the returned [`TempDir`]
/// is dropped.
pub fn unpack(bytes: &[u8]) -> Result<TempDir, SearchError> {
    unpack_in(bytes, None)
}

/// Like [`unpack`], but creates the directory under `root` when given
pub fn unpack_in(bytes: &[u8], root: Option<&Path>) -> Result<TempDir, SearchError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("kitopen-");
    let dir = match root {
        Some(root) => builder.tempdir_in(root)?,
        None => builder.tempdir()?,
    };
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                return Err(SearchError::Archive(format!(
                    "entry \"{}\" escapes the extraction directory",
                    entry.name()
                )))
            }
        };
        let out_path = dir.path().join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;
            out_file.flush()?;
        }
    }

    debug!(entries = archive.len(), dir = %dir.path().display(), "unpacked export archive");
    Ok(dir)
}

/// Read a CSV file with a header row.
///
/// Rows may have differing lengths; values are kept as-is and in order.
pub fn read_rows(path: &Path) -> Result<CsvTable, SearchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(String::from).collect()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

    Ok(CsvTable { headers, rows })
}

/// Read the publications file out of an unpacked export
pub fn read_publications(dir: &Path) -> Result<CsvTable, SearchError> {
    let path = dir.join(PUBLICATIONS_FILE_NAME);
    if !path.is_file() {
        return Err(SearchError::Archive(format!(
            "export does not contain {}",
            PUBLICATIONS_FILE_NAME
        )));
    }
    read_rows(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::build_export;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_unpack_and_read_publications() {
        let bytes = build_export(
            &["DOI", "Titel"],
            &[vec!["10.1/a", "First"], vec!["10.1/b", "Second, with comma"]],
        )
        .unwrap();

        let dir = unpack(&bytes).unwrap();
        assert!(dir.path().join(ANALYSIS_FILE_NAME).is_file());

        let table = read_publications(dir.path()).unwrap();
        assert_eq!(table.headers, ["DOI", "Titel"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], ["10.1/b", "Second, with comma"]);
    }

    #[test]
    fn test_temp_dir_removed_on_drop() {
        let bytes = build_export(&["a"], &[vec!["1"]]).unwrap();
        let dir = unpack(&bytes).unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.exists());

        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_publications_file() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(ANALYSIS_FILE_NAME, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"a,b\n1,2\n").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let dir = unpack(&bytes).unwrap();
        let err = read_publications(dir.path()).unwrap_err();
        assert!(matches!(err, SearchError::Archive(_)));
    }

    #[test]
    fn test_unpack_in_root() {
        let root = tempfile::tempdir().unwrap();
        let bytes = build_export(&["a"], &[vec!["1"]]).unwrap();

        let dir = unpack_in(&bytes, Some(root.path())).unwrap();
        assert_eq!(dir.path().parent(), Some(root.path()));
        assert!(dir.path().join(PUBLICATIONS_FILE_NAME).is_file());

        drop(dir);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_garbage_is_not_an_archive() {
        let err = unpack(b"<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, SearchError::Archive(_)));
    }

    #[test]
    fn test_read_rows_keeps_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n4,5\n").unwrap();

        let table = read_rows(&path).unwrap();
        assert_eq!(table.rows, vec![vec!["1", "2", "3"], vec!["4", "5"]]);
    }
}
