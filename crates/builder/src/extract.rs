//! Archive extraction into a staging folder that is renamed into place
//!
//! Compressed tarballs are first decompressed with `async-compression` into a
//! temporary `.tar`, then unpacked on a blocking thread. The extracted tree
//! only becomes visible at its destination once every entry was written; on
//! failure the staging folder is dropped and the destination is untouched.

use cpkg_errors::{BuildError, Error};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

/// Archive formats found in source tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    TarZst,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from a file name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let table: &[(&str, Self)] = &[
            (".tar.gz", Self::TarGz),
            (".tgz", Self::TarGz),
            (".tar.bz2", Self::TarBz2),
            (".tbz2", Self::TarBz2),
            (".tar.xz", Self::TarXz),
            (".txz", Self::TarXz),
            (".tar.zst", Self::TarZst),
            (".tar", Self::Tar),
            (".zip", Self::Zip),
        ];
        table
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, format)| *format)
    }

    /// Detect the format from the leading bytes of a file
    #[must_use]
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        match header {
            [0x1f, 0x8b, ..] => Some(Self::TarGz),
            [b'B', b'Z', b'h', ..] => Some(Self::TarBz2),
            [0xfd, b'7', b'z', b'X', b'Z', 0x00, ..] => Some(Self::TarXz),
            [0x28, 0xb5, 0x2f, 0xfd, ..] => Some(Self::TarZst),
            [b'P', b'K', 0x03, 0x04, ..] => Some(Self::Zip),
            _ if header.len() >= 262 && &header[257..262] == b"ustar" => Some(Self::Tar),
            _ => None,
        }
    }

    /// Detect by name, falling back to magic numbers for files without a
    /// recognizable extension
    ///
    /// # Errors
    /// Returns `UnsupportedArchiveFormat` when neither check matches.
    pub async fn detect(path: &Path) -> Result<Self, Error> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(format) = Self::from_name(&name) {
            return Ok(format);
        }

        let mut header = vec![0u8; 512];
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        let mut filled = 0;
        while filled < header.len() {
            let n = file.read(&mut header[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        header.truncate(filled);

        Self::from_magic(&header).ok_or_else(|| {
            BuildError::UnsupportedArchiveFormat { format: name }.into()
        })
    }
}

fn extraction_error(message: impl Into<String>) -> Error {
    BuildError::ExtractionFailed {
        message: message.into(),
    }
    .into()
}

/// Extract `archive` so that its contents end up at `destination`
///
/// With `strip_root`, the archive must hold a single top-level directory,
/// which is dropped. An existing
/// destination is replaced. Returns the number of files extracted.
///
/// # Errors
/// Returns `ExtractionFailed` or `UnsupportedArchiveFormat`; the destination
/// is left as it was.
pub async fn extract_archive(
    archive: &Path,
    destination: &Path,
    strip_root: bool,
) -> Result<usize, Error> {
    let format = ArchiveFormat::detect(archive).await?;

    let parent = destination
        .parent()
        .ok_or_else(|| extraction_error(format!("no parent for {}", destination.display())))?;
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::io_with_path(&e, parent))?;

    // Staging on the same filesystem keeps the final rename atomic
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)
        .map_err(|e| extraction_error(format!("failed to create staging folder: {e}")))?;
    let unpack_dir = staging.path().join("tree");

    let entries = match format {
        ArchiveFormat::Zip => unpack_zip(archive.to_path_buf(), unpack_dir.clone()).await?,
        ArchiveFormat::Tar => unpack_tar(archive.to_path_buf(), unpack_dir.clone()).await?,
        compressed => {
            let tar_dir = tempfile::tempdir()
                .map_err(|e| extraction_error(format!("failed to create temp directory: {e}")))?;
            let tar_path = tar_dir.path().join("archive.tar");
            decompress(archive, &tar_path, compressed).await?;
            let count = unpack_tar(tar_path, unpack_dir.clone()).await?;
            drop(tar_dir);
            count
        }
    };

    let root = if strip_root {
        single_root(&unpack_dir)?
    } else {
        unpack_dir
    };

    if tokio::fs::try_exists(destination).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(destination)
            .await
            .map_err(|e| Error::io_with_path(&e, destination))?;
    }
    tokio::fs::rename(&root, destination)
        .await
        .map_err(|e| extraction_error(format!("failed to move tree into place: {e}")))?;

    Ok(entries)
}

/// The only entry of `dir`, which must be a directory
fn single_root(dir: &Path) -> Result<PathBuf, Error> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::io_with_path(&e, dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::io_with_path(&e, dir))?;
    match entries.as_slice() {
        [only] if only.path().is_dir() => Ok(only.path()),
        [only] => Err(extraction_error(format!(
            "cannot strip root: {} is not a directory",
            only.file_name().to_string_lossy()
        ))),
        [] => Err(extraction_error("cannot strip root: archive is empty")),
        many => Err(extraction_error(format!(
            "cannot strip root: archive has {} top-level entries",
            many.len()
        ))),
    }
}

async fn decompress(archive: &Path, dest: &Path, format: ArchiveFormat) -> Result<(), Error> {
    use async_compression::tokio::bufread::{BzDecoder, GzipDecoder, XzDecoder, ZstdDecoder};

    let input = tokio::fs::File::open(archive)
        .await
        .map_err(|e| extraction_error(format!("failed to open archive: {e}")))?;
    let mut output = tokio::fs::File::create(dest)
        .await
        .map_err(|e| extraction_error(format!("failed to create temp file: {e}")))?;
    let reader = BufReader::new(input);

    let copied = match format {
        ArchiveFormat::TarGz => tokio::io::copy(&mut GzipDecoder::new(reader), &mut output).await,
        ArchiveFormat::TarBz2 => tokio::io::copy(&mut BzDecoder::new(reader), &mut output).await,
        ArchiveFormat::TarXz => tokio::io::copy(&mut XzDecoder::new(reader), &mut output).await,
        ArchiveFormat::TarZst => tokio::io::copy(&mut ZstdDecoder::new(reader), &mut output).await,
        ArchiveFormat::Tar | ArchiveFormat::Zip => {
            return Err(Error::internal("decompress called for an uncompressed archive"))
        }
    };
    copied.map_err(|e| extraction_error(format!("failed to decompress {format:?} archive: {e}")))?;

    output
        .flush()
        .await
        .map_err(|e| extraction_error(format!("failed to flush temp file: {e}")))
}

async fn unpack_tar(tar_path: PathBuf, dest: PathBuf) -> Result<usize, Error> {
    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&dest).map_err(|e| Error::io_with_path(&e, &dest))?;
        let file = File::open(&tar_path)
            .map_err(|e| extraction_error(format!("failed to open tar: {e}")))?;
        let mut archive = tar::Archive::new(file);
        archive.set_preserve_permissions(true);

        let mut count = 0;
        let entries = archive
            .entries()
            .map_err(|e| extraction_error(format!("failed to read tar: {e}")))?;
        for entry in entries {
            let mut entry =
                entry.map_err(|e| extraction_error(format!("failed to read tar entry: {e}")))?;
            let is_file = entry.header().entry_type().is_file();
            // unpack_in refuses entries that would escape `dest`
            let unpacked = entry
                .unpack_in(&dest)
                .map_err(|e| extraction_error(format!("failed to extract entry: {e}")))?;
            if unpacked && is_file {
                count += 1;
            }
        }
        Ok(count)
    })
    .await
    .map_err(|e| extraction_error(format!("task join error: {e}")))?
}

async fn unpack_zip(zip_path: PathBuf, dest: PathBuf) -> Result<usize, Error> {
    tokio::task::spawn_blocking(move || {
        let file = File::open(&zip_path)
            .map_err(|e| extraction_error(format!("failed to open zip archive: {e}")))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| extraction_error(format!("failed to read zip archive: {e}")))?;
        std::fs::create_dir_all(&dest).map_err(|e| Error::io_with_path(&e, &dest))?;

        let mut count = 0;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| extraction_error(format!("failed to read zip entry: {e}")))?;
            let Some(relative) = entry.enclosed_name() else {
                continue;
            };
            let outpath = dest.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath).map_err(|e| Error::io_with_path(&e, &outpath))?;
                continue;
            }
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(&e, parent))?;
            }
            let mut outfile =
                File::create(&outpath).map_err(|e| Error::io_with_path(&e, &outpath))?;
            std::io::copy(&mut entry, &mut outfile)
                .map_err(|e| extraction_error(format!("failed to extract file: {e}")))?;
            count += 1;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
                }
            }
        }
        Ok(count)
    })
    .await
    .map_err(|e| extraction_error(format!("task join error: {e}")))?
}
