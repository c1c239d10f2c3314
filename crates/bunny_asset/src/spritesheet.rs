//! Spritesheet generation
//!
//! Every sprite gets a cell of the size of the largest image, laid out
//! row-major on a near-square grid and centered inside its cell.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to load sprite '{name}' from {path}: {source}")]
    Load {
        name: String,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("spritesheet needs at least one sprite")]
    Empty,
}

/// Texel rectangle of one sprite inside the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteFrame {
    pub frame_number: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub struct Spritesheet {
    pixels: RgbaImage,
    frames: BTreeMap<String, SpriteFrame>,
}

/// Grid for `count` equally sized cells.
pub fn grid_layout(count: u32) -> (u32, u32) {
    let columns = (count as f64).sqrt().ceil() as u32;
    let rows = count.div_ceil(columns.max(1));
    (columns, rows)
}

/// Load `<dir>/<name>.png` for every name and pack them into one atlas.
///
/// Fails on the first image that cannot be read; no partial sheet is
/// produced.
pub fn build_atlas<S: AsRef<str>>(dir: impl AsRef<Path>, names: &[S]) -> Result<Spritesheet, AssetError> {
    let dir = dir.as_ref();
    let images = names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let path = dir.join(format!("{name}.png"));
            let image = image::open(&path).map_err(|source| AssetError::Load {
                name: name.to_string(),
                path: path.clone(),
                source,
            })?;
            tracing::debug!(sprite = name, width = image.width(), height = image.height(), "loaded sprite");
            Ok((name.to_string(), image.to_rgba8()))
        })
        .collect::<Result<Vec<_>, AssetError>>()?;

    Spritesheet::from_images(images)
}

impl Spritesheet {
    /// Pack already decoded images, keeping their order as frame numbers.
    pub fn from_images(images: Vec<(String, RgbaImage)>) -> Result<Self, AssetError> {
        if images.is_empty() {
            return Err(AssetError::Empty);
        }

        let cell_width = images.iter().map(|(_, img)| img.width()).max().unwrap_or(0);
        let cell_height = images.iter().map(|(_, img)| img.height()).max().unwrap_or(0);
        let (columns, rows) = grid_layout(images.len() as u32);

        let mut pixels = RgbaImage::new(columns * cell_width, rows * cell_height);
        let mut frames = BTreeMap::new();

        for (frame_number, (name, img)) in (0u32..).zip(images) {
            let x = (frame_number % columns) * cell_width;
            let y = (frame_number / columns) * cell_height;
            let offset_x = (cell_width - img.width()) / 2;
            let offset_y = (cell_height - img.height()) / 2;
            imageops::overlay(&mut pixels, &img, (x + offset_x) as i64, (y + offset_y) as i64);

            frames.insert(
                name,
                SpriteFrame {
                    frame_number,
                    x,
                    y,
                    width: cell_width,
                    height: cell_height,
                },
            );
        }

        tracing::info!(
            width = pixels.width(),
            height = pixels.height(),
            columns,
            rows,
            sprites = frames.len(),
            "built spritesheet"
        );

        Ok(Self { pixels, frames })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Tightly packed RGBA8 rows.
    pub fn texture_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn frames(&self) -> &BTreeMap<String, SpriteFrame> {
        &self.frames
    }

    pub fn frame(&self, name: &str) -> Option<&SpriteFrame> {
        self.frames.get(name)
    }

    /// The atlas scaled to a fixed pixel footprint for upload.
    pub fn resized(&self, width: u32, height: u32) -> RgbaImage {
        imageops::resize(&self.pixels, width, height, FilterType::Triangle)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let path = path.as_ref();
        self.pixels.save(path).map_err(|source| AssetError::Save {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Frame table as pretty JSON: `{ meta: {width, height, frameCount}, frames }`.
    pub fn frame_data_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Meta {
            width: u32,
            height: u32,
            frame_count: usize,
        }

        #[derive(Serialize)]
        struct FrameData<'a> {
            meta: Meta,
            frames: &'a BTreeMap<String, SpriteFrame>,
        }

        serde_json::to_string_pretty(&FrameData {
            meta: Meta {
                width: self.width(),
                height: self.height(),
                frame_count: self.frames.len(),
            },
            frames: &self.frames,
        })
    }
}
