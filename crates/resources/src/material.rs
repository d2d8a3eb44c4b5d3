//! Per-category materials: one sampled texture and descriptor set each.
//!
//! Textures are read from `<dir>/<category>.png` (or `.jpg`). A category
//! without a file gets a generated pattern so the demo runs without assets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use ringframe_rhi::descriptor::{DescriptorPool, DescriptorSetLayout, write_image};
use ringframe_rhi::device::Device;
use ringframe_rhi::texture::{Sampler, Texture};
use ringframe_rhi::vk;
use ringframe_scene::ObjectCategory;
use tracing::{debug, info};

use crate::error::{ResourceError, ResourceResult};

/// Set number materials are bound at; set 0 is per-frame data.
pub const MATERIAL_SET: u32 = 1;

const GENERATED_SIZE: u32 = 64;
const EXTENSIONS: [&str; 2] = ["png", "jpg"];

/// First existing `<dir>/<category>.<ext>`.
pub fn texture_path(dir: &Path, category: ObjectCategory) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{ext}", category.name())))
        .find(|path| path.is_file())
}

/// Decodes the category's texture from `dir`, or generates one.
pub fn load_category_image(dir: &Path, category: ObjectCategory) -> ResourceResult<RgbaImage> {
    let Some(path) = texture_path(dir, category) else {
        debug!("No texture for {:?} in {}, generating one", category, dir.display());
        return Ok(generate_category_image(category));
    };
    let image = image::open(&path)
        .map_err(|source| ResourceError::Image {
            path: path.clone(),
            source,
        })?
        .to_rgba8();
    info!(
        "Loaded {:?} texture {} ({}x{})",
        category,
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// A small opaque pattern that tells the categories apart.
pub fn generate_category_image(category: ObjectCategory) -> RgbaImage {
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    match category {
        ObjectCategory::Triangle => RgbaImage::from_fn(GENERATED_SIZE, GENERATED_SIZE, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgba([90, 200, 120, 255])
            } else {
                WHITE
            }
        }),
        ObjectCategory::Square => RgbaImage::from_fn(GENERATED_SIZE, GENERATED_SIZE, |_, y| {
            if (y / 4) % 2 == 0 {
                Rgba([200, 70, 60, 255])
            } else {
                Rgba([240, 220, 200, 255])
            }
        }),
        ObjectCategory::Star => {
            let center = GENERATED_SIZE as f32 / 2.0;
            RgbaImage::from_fn(GENERATED_SIZE, GENERATED_SIZE, |x, y| {
                let dx = x as f32 + 0.5 - center;
                let dy = y as f32 + 0.5 - center;
                let t = ((dx * dx + dy * dy).sqrt() / center).min(1.0);
                let fade = |from: f32, to: f32| (from + (to - from) * t) as u8;
                Rgba([fade(255.0, 200.0), fade(230.0, 120.0), fade(120.0, 20.0), 255])
            })
        }
    }
}

/// Uploaded textures plus one descriptor set per category.
pub struct MaterialSet {
    // Sets are freed with the pool.
    sets: [vk::DescriptorSet; ObjectCategory::ALL.len()],
    _pool: DescriptorPool,
    _textures: Vec<Texture>,
    _sampler: Sampler,
    layout: DescriptorSetLayout,
}

impl MaterialSet {
    pub fn upload(device: Arc<Device>, dir: &Path) -> ResourceResult<Self> {
        let layout = DescriptorSetLayout::per_material(device.clone())?;
        let sampler = Sampler::linear_repeat(device.clone())?;
        let pool = DescriptorPool::materials(device.clone(), ObjectCategory::ALL.len() as u32)?;

        let mut sets = [vk::DescriptorSet::null(); ObjectCategory::ALL.len()];
        let mut textures = Vec::with_capacity(ObjectCategory::ALL.len());
        for category in ObjectCategory::ALL {
            let image = load_category_image(dir, category)?;
            let extent = vk::Extent2D {
                width: image.width(),
                height: image.height(),
            };
            let texture = Texture::upload(device.clone(), category.name(), extent, image.as_raw())?;

            let set = pool.allocate(layout.handle())?;
            write_image(&device, set, 0, texture.descriptor_info(&sampler));
            sets[category.index()] = set;
            textures.push(texture);
        }

        Ok(Self {
            sets,
            _pool: pool,
            _textures: textures,
            _sampler: sampler,
            layout,
        })
    }

    #[inline]
    pub fn layout(&self) -> &DescriptorSetLayout {
        &self.layout
    }

    /// Descriptor sets indexed by [`ObjectCategory::index`].
    #[inline]
    pub fn sets(&self) -> [vk::DescriptorSet; ObjectCategory::ALL.len()] {
        self.sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ringframe-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_generated_images_are_opaque_and_distinct() {
        let images: Vec<RgbaImage> = ObjectCategory::ALL
            .iter()
            .map(|&c| generate_category_image(c))
            .collect();

        for image in &images {
            assert_eq!(image.dimensions(), (GENERATED_SIZE, GENERATED_SIZE));
            assert!(image.pixels().all(|p| p[3] == 255));
        }
        assert_ne!(images[0], images[1]);
        assert_ne!(images[1], images[2]);
        assert_ne!(images[0], images[2]);
    }

    #[test]
    fn test_missing_texture_falls_back_to_generated() {
        let dir = scratch_dir("empty");
        assert_eq!(texture_path(&dir, ObjectCategory::Star), None);

        let image = load_category_image(&dir, ObjectCategory::Star).unwrap();
        assert_eq!(image, generate_category_image(ObjectCategory::Star));
    }

    #[test]
    fn test_texture_file_is_decoded() {
        let dir = scratch_dir("decode");
        let written = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        written.save(dir.join("square.png")).unwrap();

        assert_eq!(
            texture_path(&dir, ObjectCategory::Square),
            Some(dir.join("square.png"))
        );
        let loaded = load_category_image(&dir, ObjectCategory::Square).unwrap();
        assert_eq!(loaded, written);
    }

    #[test]
    fn test_corrupt_texture_reports_path() {
        let dir = scratch_dir("corrupt");
        let path = dir.join("triangle.png");
        std::fs::write(&path, b"not a png").unwrap();

        match load_category_image(&dir, ObjectCategory::Triangle) {
            Err(ResourceError::Image { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected an image error, got {other:?}"),
        }
    }
}
