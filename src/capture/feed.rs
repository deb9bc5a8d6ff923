// src/capture/feed.rs
use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use super::frame::{Frame, Rotation};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// Anything that can hand out frames on demand, like a camera.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame>;
}

/// Stand-in camera that cycles through still images on disk.
pub struct ImageFeed {
    images: Vec<DynamicImage>,
    rotation: Rotation,
    position: usize,
}

impl ImageFeed {
    /// Load every path given. Directories contribute all images they contain.
    pub fn open(paths: &[PathBuf], target: (u32, u32), rotation: Rotation) -> Result<Self> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                files.extend(images_in_dir(path)?);
            } else {
                files.push(path.clone());
            }
        }

        if files.is_empty() {
            return Err(anyhow!("No images found in {:?}", paths));
        }

        let mut images = Vec::with_capacity(files.len());
        for file in &files {
            let image = image::open(file)
                .with_context(|| format!("Failed to open image {}", file.display()))?;
            images.push(fit_to_target(image, target));
        }

        info!(
            "Image feed ready: {} frame(s), target {}x{}, rotation {}",
            images.len(),
            target.0,
            target.1,
            rotation
        );

        Ok(Self {
            images,
            rotation,
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl FrameSource for ImageFeed {
    fn next_frame(&mut self) -> Result<Frame> {
        let image = self.images[self.position].clone();
        self.position = (self.position + 1) % self.images.len();
        Ok(Frame::new(image, self.rotation))
    }
}

/// Load a single still as one frame, at the target resolution.
pub fn load_frame(path: &Path, target: (u32, u32), rotation: Rotation) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?;
    Ok(Frame::new(fit_to_target(image, target), rotation))
}

fn fit_to_target(image: DynamicImage, (width, height): (u32, u32)) -> DynamicImage {
    if image.width() <= width && image.height() <= height {
        return image;
    }
    debug!(
        "Downscaling {}x{} to fit {}x{}",
        image.width(),
        image.height(),
        width,
        height
    );
    image.thumbnail(width, height)
}

fn images_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            files.push(path);
        } else if path.is_file() {
            warn!("Skipping non-image file: {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn feed_cycles_through_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 4, 4);
        write_png(dir.path(), "b.png", 6, 3);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut feed =
            ImageFeed::open(&[dir.path().to_path_buf()], (1280, 720), Rotation::Deg0).unwrap();
        assert_eq!(feed.len(), 2);
        assert!(!feed.is_empty());

        let sizes: Vec<_> = (0..3)
            .map(|_| {
                let frame = feed.next_frame().unwrap();
                (frame.width(), frame.height())
            })
            .collect();
        assert_eq!(sizes, vec![(4, 4), (6, 3), (4, 4)]);
    }

    #[test]
    fn large_images_are_fitted_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "big.png", 400, 100);

        let frame = load_frame(&path, (200, 200), Rotation::Deg180).unwrap();
        assert_eq!((frame.width(), frame.height()), (200, 50));
        assert_eq!(frame.rotation(), Rotation::Deg180);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageFeed::open(&[dir.path().to_path_buf()], (64, 64), Rotation::Deg0).is_err());
    }
}
