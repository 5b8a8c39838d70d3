use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use tempfile::Builder;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::CanvasError;

pub struct ArchiveEntry {
    pub name: String,
    pub content: Vec<u8>,
}

/// Writes `entries` into a deflated zip at `zip_path`, replacing it atomically.
pub fn write_zip(zip_path: &Utf8Path, entries: &[ArchiveEntry]) -> Result<(), CanvasError> {
    let parent = zip_path
        .parent()
        .ok_or_else(|| CanvasError::Archive("invalid archive path".to_string()))?;
    fs::create_dir_all(parent.as_std_path()).map_err(|err| CanvasError::Archive(err.to_string()))?;
    let temp = Builder::new()
        .prefix("penn-canvas-archive")
        .suffix(".zip")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CanvasError::Archive(err.to_string()))?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(
        temp.reopen()
            .map_err(|err| CanvasError::Archive(err.to_string()))?,
    );
    for entry in entries {
        writer
            .start_file(entry.name.as_str(), options)
            .map_err(|err| CanvasError::Archive(err.to_string()))?;
        writer
            .write_all(&entry.content)
            .map_err(|err| CanvasError::Archive(err.to_string()))?;
    }
    let file = writer
        .finish()
        .map_err(|err| CanvasError::Archive(err.to_string()))?;
    file.sync_all()
        .map_err(|err| CanvasError::Archive(err.to_string()))?;

    temp.persist(zip_path.as_std_path())
        .map_err(|err| CanvasError::Archive(err.to_string()))?;
    Ok(())
}

/// Reads every entry back to confirm the archive is intact. Returns the
/// entry names.
pub fn validate_zip(zip_path: &Utf8Path) -> Result<Vec<String>, CanvasError> {
    let file = fs::File::open(zip_path.as_std_path())
        .map_err(|err| CanvasError::Archive(format!("open zip {zip_path}: {err}")))?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| CanvasError::Archive(err.to_string()))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| CanvasError::Archive(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        names.push(entry.name().to_string());
        io::copy(&mut entry, &mut io::sink())
            .map_err(|err| CanvasError::Archive(err.to_string()))?;
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn written_archive_validates() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = root.join("archives").join("course.zip");

        write_zip(
            &path,
            &[
                ArchiveEntry {
                    name: "discussions.csv".to_string(),
                    content: b"topic_id,title\n1,Welcome\n".to_vec(),
                },
                ArchiveEntry {
                    name: "assignments.csv".to_string(),
                    content: b"id,name\n".to_vec(),
                },
            ],
        )
        .unwrap();

        let names = validate_zip(&path).unwrap();
        assert_eq!(names, vec!["discussions.csv", "assignments.csv"]);
    }

    #[test]
    fn corrupt_archive_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = root.join("broken.zip");
        fs::write(path.as_std_path(), b"not a zip").unwrap();

        assert!(validate_zip(&path).is_err());
    }
}
