//! Image I/O operations service
//!
//! This module separates file I/O operations from the stage logic,
//! making the passes testable against plain temp directories.

use crate::error::{CurationError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, Limits};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::Path;

/// Read buffer size used when hashing file contents
const HASH_CHUNK_SIZE: usize = 4096;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// The extension is tried first; when that fails the content is sniffed,
    /// so a PNG saved under a `.jpg` name still loads.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use dataset_curator::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("inputs/raw/cats/Persian/a.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(CurationError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    CurationError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    CurationError::processing_stage_error(
                        "image loading",
                        &format!(
                            "Extension error: {}. Content error: {}",
                            e, content_err
                        ),
                        Some(&format!(
                            "path: {}, size: {} bytes",
                            path_ref.display(),
                            data.len()
                        )),
                    )
                })
            },
        }
    }

    /// Fully decode an image to prove it is readable
    ///
    /// Header-only checks miss truncated files, so the whole pixel buffer is
    /// decoded and then dropped. Decoding is not capped, so large but valid
    /// photos pass.
    pub fn verify_image<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::verify_image_with_limits(path.as_ref(), Limits::no_limits())
    }

    fn verify_image_with_limits(path: &Path, limits: Limits) -> Result<()> {
        let mut reader = ImageReader::open(path)
            .map_err(|e| CurationError::file_io_error("open image", path, &e))?
            .with_guessed_format()
            .map_err(|e| CurationError::file_io_error("sniff image format", path, &e))?;

        if reader.format().is_none() {
            return Err(CurationError::processing_stage_error(
                "validity check",
                "unrecognised image format",
                Some(&path.display().to_string()),
            ));
        }

        reader.limits(limits);
        reader.decode()?;
        Ok(())
    }

    /// Encode an image as JPEG and write it to `path`
    ///
    /// The parent directory is created if missing.
    pub fn save_jpeg<P: AsRef<Path>>(image: &DynamicImage, path: P, quality: u8) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            Self::ensure_dir(parent)?;
        }

        let file = File::create(path_ref)
            .map_err(|e| CurationError::file_io_error("create output file", path_ref, &e))?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));

        image.write_with_encoder(encoder).map_err(|e| {
            CurationError::processing_stage_error(
                "image save",
                &format!("Failed to save as JPEG: {}", e),
                Some(&path_ref.display().to_string()),
            )
        })
    }

    /// Create a directory (and parents) if absent
    ///
    /// Concurrent callers racing on the same folder all succeed.
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path_ref = path.as_ref();
        match std::fs::create_dir_all(path_ref) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path_ref.is_dir() => Ok(()),
            Err(e) => Err(CurationError::file_io_error("create directory", path_ref, &e)),
        }
    }

    /// SHA-256 of the full file contents, hex encoded
    pub fn content_hash<P: AsRef<Path>>(path: P) -> Result<String> {
        let path_ref = path.as_ref();
        let mut file = File::open(path_ref)
            .map_err(|e| CurationError::file_io_error("open file for hashing", path_ref, &e))?;

        let mut hasher = Sha256::new();
        let mut buffer = [0u8; HASH_CHUNK_SIZE];
        loop {
            let read = file
                .read(&mut buffer)
                .map_err(|e| CurationError::file_io_error("read file for hashing", path_ref, &e))?;
            if read == 0 {
                break;
            }
            hasher.update(buffer.get(..read).unwrap_or(&[]));
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Delete a single file
    pub fn remove_file<P: AsRef<Path>>(path: P) -> Result<()> {
        let path_ref = path.as_ref();
        std::fs::remove_file(path_ref)
            .map_err(|e| CurationError::file_io_error("delete file", path_ref, &e))
    }
}
