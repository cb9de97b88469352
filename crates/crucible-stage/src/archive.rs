//! Archive extraction dispatch: type detection by filename, one extractor per format, unix
//! permission preservation. Covers the tar/zip family only — no shelling out to 7z/rar.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

use crucible_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Zip,
    TarGz,
    Tar,
    TarBz2,
    TarXz,
}

impl ArchiveType {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::from_filename(name)
    }

    #[must_use]
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") || lower.ends_with(".tbz") {
            Some(Self::TarBz2)
        } else if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
            Some(Self::TarXz)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// What `expand_archive` found inside the archive: a single top-level directory (the common
/// case — the source tree *is* that directory) or multiple top-level entries (the stage root
/// itself is the source tree), per
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub files_extracted: u64,
    pub total_size: u64,
    pub single_top_level_dir: Option<PathBuf>,
}

/// Extracts `archive` into `dest`, which must already exist.
///
/// # Errors
/// Returns [`crucible_core::Error::install`] if the archive type is unrecognized or extraction
/// fails.
pub fn extract(archive: &Path, dest: &Path) -> Result<ExtractionResult> {
    let archive_type = ArchiveType::from_path(archive)
        .ok_or_else(|| Error::install(format!("unknown archive type: {}", archive.display())))?;

    let (files_extracted, total_size) = match archive_type {
        ArchiveType::Zip => extract_zip(archive, dest)?,
        ArchiveType::TarGz => extract_tar_reader(GzDecoder::new(open(archive)?), dest)?,
        ArchiveType::Tar => extract_tar_reader(open(archive)?, dest)?,
        ArchiveType::TarBz2 => extract_tar_reader(BzDecoder::new(open(archive)?), dest)?,
        ArchiveType::TarXz => extract_tar_reader(XzDecoder::new(open(archive)?), dest)?,
    };

    Ok(ExtractionResult {
        files_extracted,
        total_size,
        single_top_level_dir: find_single_top_level_dir(dest),
    })
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::io(path, e))
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(u64, u64)> {
    let file = open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| Error::install(format!("bad zip archive: {e}")))?;

    let mut files_extracted = 0;
    let mut total_size = 0u64;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| Error::install(format!("bad zip entry: {e}")))?;
        let Some(path) = entry.enclosed_name() else {
            continue;
        };
        let out_path = dest.join(&path);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| Error::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut out_file = File::create(&out_path).map_err(|e| Error::io(&out_path, e))?;
        let size = std::io::copy(&mut entry, &mut out_file).map_err(|e| Error::io(&out_path, e))?;
        files_extracted += 1;
        total_size += size;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }

    Ok((files_extracted, total_size))
}

fn extract_tar_reader<R: Read>(reader: R, dest: &Path) -> Result<(u64, u64)> {
    let mut archive = tar::Archive::new(reader);
    let mut files_extracted = 0;
    let mut total_size = 0u64;

    for entry in archive
        .entries()
        .map_err(|e| Error::install(format!("bad tar archive: {e}")))?
    {
        let mut entry = entry.map_err(|e| Error::install(format!("bad tar entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| Error::install(format!("bad tar entry path: {e}")))?
            .into_owned();
        let out_path = dest.join(&path);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| Error::io(&out_path, e))?;
        } else if entry_type.is_file() {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            let mut out_file = File::create(&out_path).map_err(|e| Error::io(&out_path, e))?;
            let size = std::io::copy(&mut entry, &mut out_file).map_err(|e| Error::io(&out_path, e))?;
            files_extracted += 1;
            total_size += size;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(mode) = entry.header().mode() {
                    let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
                }
            }
        }
    }

    Ok((files_extracted, total_size))
}

fn find_single_top_level_dir(dest: &Path) -> Option<PathBuf> {
    let mut entries = std::fs::read_dir(dest).ok()?.filter_map(std::result::Result::ok);
    let first = entries.next()?;
    if entries.next().is_some() {
        return None;
    }
    let path = first.path();
    path.is_dir().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn detects_types_from_filename() {
        assert_eq!(ArchiveType::from_filename("pkg-1.0.tar.gz"), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_filename("pkg.tgz"), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_filename("pkg.zip"), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_filename("pkg.tar.bz2"), Some(ArchiveType::TarBz2));
        assert_eq!(ArchiveType::from_filename("pkg.tar.xz"), Some(ArchiveType::TarXz));
        assert_eq!(ArchiveType::from_filename("pkg.exe"), None);
    }

    #[test]
    fn extracts_single_top_level_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("pkg-1.0.tar.gz");
        write_tar_gz(
            &archive_path,
            &[("pkg-1.0/README", b"hi"), ("pkg-1.0/src/main.c", b"int main(){}")],
        );

        let dest = tmp.path().join("stage");
        std::fs::create_dir_all(&dest).unwrap();
        let result = extract(&archive_path, &dest).unwrap();
        assert_eq!(result.files_extracted, 2);
        assert_eq!(result.single_top_level_dir, Some(dest.join("pkg-1.0")));
    }

    #[test]
    fn detects_multiple_top_level_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("pkg.tar.gz");
        write_tar_gz(&archive_path, &[("a.txt", b"a"), ("b.txt", b"b")]);

        let dest = tmp.path().join("stage");
        std::fs::create_dir_all(&dest).unwrap();
        let result = extract(&archive_path, &dest).unwrap();
        assert_eq!(result.single_top_level_dir, None);
    }

    #[test]
    fn unknown_extension_is_an_install_error() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("pkg.exe");
        std::fs::write(&archive_path, b"junk").unwrap();
        let dest = tmp.path().join("stage");
        std::fs::create_dir_all(&dest).unwrap();
        let err = extract(&archive_path, &dest).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Install);
    }
}
