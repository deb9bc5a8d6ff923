// src/capture/frame.rs
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;
use std::fmt;
use std::io::Cursor;

/// Clockwise rotation the feed reports for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = anyhow::Error;

    fn try_from(degrees: u32) -> Result<Self> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(anyhow!("Unsupported rotation: {} (expected 0, 90, 180 or 270)", other)),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// One image sample from the feed. Consumed once by a classifier, then dropped.
pub struct Frame {
    image: DynamicImage,
    rotation: Rotation,
}

impl Frame {
    pub fn new(image: DynamicImage, rotation: Rotation) -> Self {
        Self { image, rotation }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Apply the reported rotation to the pixels so the result is upright.
    pub fn upright(self) -> Self {
        let image = match self.rotation {
            Rotation::Deg0 => self.image,
            Rotation::Deg90 => self.image.rotate90(),
            Rotation::Deg180 => self.image.rotate180(),
            Rotation::Deg270 => self.image.rotate270(),
        };
        Self {
            image,
            rotation: Rotation::Deg0,
        }
    }

    /// Encode the pixels as JPEG. Alpha is dropped since JPEG has none.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        if self.image.width() == 0 || self.image.height() == 0 {
            return Err(anyhow!("Frame has no pixel data"));
        }
        let rgb = DynamicImage::ImageRgb8(self.image.to_rgb8());
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        rgb.write_to(&mut cursor, image::ImageOutputFormat::Jpeg(quality))?;
        Ok(buffer)
    }

    /// JPEG bytes wrapped as standard padded base64, ready for a JSON body.
    pub fn to_jpeg_base64(&self, quality: u8) -> Result<String> {
        let jpeg = self.to_jpeg(quality)?;
        Ok(general_purpose::STANDARD.encode(jpeg))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("rotation", &self.rotation)
            .finish()
    }
}

#[cfg(test)]
pub fn test_frame(width: u32, height: u32) -> Frame {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 180, 40]));
    Frame::new(DynamicImage::ImageRgb8(image), Rotation::Deg0)
}
