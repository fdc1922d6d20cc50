//! File I/O around the frame finishing pipeline
//!
//! Keeps filesystem concerns out of the pixel and queue code so those stay
//! testable against in-memory images.

use crate::error::{PawdrobeError, Result};
use crate::types::FrameSet;
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};

/// Service for reading source art and writing finished frames
pub struct FrameIOService;

impl FrameIOService {
    /// Load an image from a file path
    ///
    /// Tries extension-based format detection first and falls back to
    /// sniffing the file contents, since item art uploaded by users is
    /// frequently misnamed.
    ///
    /// # Errors
    /// - File does not exist or cannot be read
    /// - Contents are not a decodable image
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(PawdrobeError::file_io_error(
                "read image file",
                path_ref,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
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
                    PawdrobeError::file_io_error("read image data", path_ref, io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    PawdrobeError::decode(format!(
                        "Failed to decode {} with both extension-based and content-based detection. Extension error: {}. Content error: {}",
                        path_ref.display(),
                        e,
                        content_err
                    ))
                })
            },
        }
    }

    /// Decode an image from raw bytes
    ///
    /// # Errors
    /// - Bytes are not a decodable image
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes)
            .map_err(|e| PawdrobeError::decode(format!("Failed to decode image from bytes: {e}")))
    }

    /// Decode an image read from any async source
    ///
    /// # Errors
    /// - Reading from the source fails
    /// - Bytes are not a decodable image
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(
        mut reader: R,
    ) -> Result<DynamicImage> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        AsyncReadExt::read_to_end(&mut reader, &mut buffer)
            .await
            .map_err(|e| PawdrobeError::decode(format!("Failed to read from stream: {e}")))?;

        Self::load_from_bytes(&buffer)
    }

    /// Save an RGBA image as PNG, creating parent directories as needed
    ///
    /// # Errors
    /// - Failed to create the output directory
    /// - Failed to encode or write the file
    pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PawdrobeError::file_io_error("create output directory", parent, e)
            })?;
        }

        image
            .save_with_format(path_ref, image::ImageFormat::Png)
            .map_err(|e| {
                PawdrobeError::decode(format!(
                    "Failed to save PNG to {}: {e}",
                    path_ref.display()
                ))
            })
    }

    /// Write every frame of a finished set into a directory as `<kind>.png`
    ///
    /// Frames are already PNG-encoded, so this is a plain byte copy.
    ///
    /// # Errors
    /// - Failed to create the directory or write a frame file
    pub fn export_frame_set<P: AsRef<Path>>(frames: &FrameSet, dir: P) -> Result<Vec<PathBuf>> {
        let dir_ref = dir.as_ref();
        std::fs::create_dir_all(dir_ref)
            .map_err(|e| PawdrobeError::file_io_error("create frame directory", dir_ref, e))?;

        let mut written = Vec::with_capacity(frames.len());
        for frame in frames.iter() {
            let path = dir_ref.join(format!("{}.png", frame.kind));
            std::fs::write(&path, &frame.png)
                .map_err(|e| PawdrobeError::file_io_error("write frame", &path, e))?;
            written.push(path);
        }
        Ok(written)
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        let Some(extension) = path.as_ref().extension().and_then(|s| s.to_str()) else {
            return false;
        };
        let ext_lower = extension.to_lowercase();

        let supported = matches!(ext_lower.as_str(), "jpg" | "jpeg" | "png" | "tiff" | "tif");
        #[cfg(feature = "webp-support")]
        let supported = supported || ext_lower == "webp";
        supported
    }
}
