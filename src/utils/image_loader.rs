use std::fs;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use eframe::wgpu::{
    Device, Extent3d, Queue, TexelCopyBufferLayout, Texture, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension,
};
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::utils::errors::ImageError;
use crate::utils::shader_constants::MAX_CHANNELS;

/// Larger images are downscaled before upload.
pub const MAX_IMAGE_DIMENSION: u32 = 4096;

/// Where the multi-channel image comes from. A location is a file path or
/// an http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Synthetic three-channel test image.
    #[default]
    Demo,
    /// One image; every colour component becomes a channel.
    Composite { location: String },
    /// One grayscale plane per channel, in channel order.
    Channels { locations: Vec<String> },
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Demo => "demo image".to_string(),
            ImageSource::Composite { location } => location.clone(),
            ImageSource::Channels { locations } => format!("{} channel files", locations.len()),
        }
    }
}

/// Channel planes of one image, 8 bits per sample, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelImage {
    pub width: u32,
    pub height: u32,
    pub channels: Vec<Vec<u8>>,
}

impl ChannelImage {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deterministic three-channel pattern: two blobs and a ring.
    pub fn demo(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let blob = |x: f32, y: f32, cx: f32, cy: f32, r: f32| {
            let d2 = (x - cx).powi(2) + (y - cy).powi(2);
            (-d2 / (2.0 * r * r)).exp()
        };
        let mut channels = vec![Vec::with_capacity((width * height) as usize); 3];
        for py in 0..height {
            for px in 0..width {
                let x = px as f32 / w;
                let y = py as f32 / h;
                let a = blob(x, y, 0.35, 0.4, 0.12);
                let b = blob(x, y, 0.65, 0.6, 0.1);
                let ring_d = ((x - 0.5).powi(2) + (y - 0.5).powi(2)).sqrt();
                let c = (-((ring_d - 0.3) / 0.03).powi(2)).exp();
                channels[0].push((a * 255.0) as u8);
                channels[1].push((b * 255.0) as u8);
                channels[2].push((c * 255.0) as u8);
            }
        }
        Self { width, height, channels }
    }

    /// Stacks the channels into six planes, zero-filling the missing ones.
    pub fn layer_data(&self) -> Vec<u8> {
        let plane = (self.width * self.height) as usize;
        let mut data = vec![0u8; plane * MAX_CHANNELS];
        for (layer, channel) in self.channels.iter().take(MAX_CHANNELS).enumerate() {
            data[layer * plane..(layer + 1) * plane].copy_from_slice(&channel[..plane]);
        }
        data
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn read_location(location: &str) -> Result<Vec<u8>, ImageError> {
    if is_remote(location) {
        log::info!("Fetching image from: {}", location);
        let response = reqwest::blocking::get(location)
            .and_then(|r| r.error_for_status())
            .map_err(|source| ImageError::Fetch {
                url: location.to_string(),
                source,
            })?;
        let bytes = response.bytes().map_err(|source| ImageError::Fetch {
            url: location.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    } else {
        log::info!("Loading image from: {}", location);
        fs::read(location).map_err(|source| ImageError::Io {
            path: location.to_string(),
            source,
        })
    }
}

fn decode_location(location: &str) -> Result<DynamicImage, ImageError> {
    let bytes = read_location(location)?;
    let img = image::load_from_memory(&bytes).map_err(|source| ImageError::Decode {
        location: location.to_string(),
        source,
    })?;
    if img.width().max(img.height()) > MAX_IMAGE_DIMENSION {
        log::warn!(
            "Image {} is {}x{}, downscaling to fit {}",
            location,
            img.width(),
            img.height(),
            MAX_IMAGE_DIMENSION
        );
        return Ok(img.resize(MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION, FilterType::Triangle));
    }
    Ok(img)
}

fn deinterleave(samples: &[u8], count: usize) -> Vec<Vec<u8>> {
    let mut channels = vec![Vec::with_capacity(samples.len() / count.max(1)); count];
    for pixel in samples.chunks_exact(count) {
        for (c, value) in pixel.iter().enumerate() {
            channels[c].push(*value);
        }
    }
    channels
}

/// Split one decoded image into per-component channels.
pub fn channels_from_composite(img: &DynamicImage) -> ChannelImage {
    let (width, height) = (img.width(), img.height());
    let channels = match img.color().channel_count() {
        1 => vec![img.to_luma8().into_raw()],
        2 => deinterleave(img.to_luma_alpha8().as_raw(), 2),
        3 => deinterleave(img.to_rgb8().as_raw(), 3),
        _ => deinterleave(img.to_rgba8().as_raw(), 4),
    };
    ChannelImage { width, height, channels }
}

/// Stack grayscale planes; all planes must share the first plane's size.
pub fn channels_from_planes(planes: &[DynamicImage]) -> Result<ChannelImage, ImageError> {
    let first = planes.first().ok_or(ImageError::NoChannels)?;
    let (width, height) = (first.width(), first.height());
    if planes.len() > MAX_CHANNELS {
        log::warn!(
            "Image has {} channels, only the first {} are rendered",
            planes.len(),
            MAX_CHANNELS
        );
    }
    let mut channels = Vec::with_capacity(planes.len().min(MAX_CHANNELS));
    for (index, plane) in planes.iter().take(MAX_CHANNELS).enumerate() {
        if (plane.width(), plane.height()) != (width, height) {
            return Err(ImageError::SizeMismatch {
                index,
                expected: [width, height],
                actual: [plane.width(), plane.height()],
            });
        }
        channels.push(plane.to_luma8().into_raw());
    }
    Ok(ChannelImage { width, height, channels })
}

pub fn load_channel_image(source: &ImageSource) -> Result<ChannelImage, ImageError> {
    let image = match source {
        ImageSource::Demo => ChannelImage::demo(512, 512),
        ImageSource::Composite { location } => channels_from_composite(&decode_location(location)?),
        ImageSource::Channels { locations } => {
            let planes = locations
                .iter()
                .take(MAX_CHANNELS)
                .map(|l| decode_location(l))
                .collect::<Result<Vec<_>, _>>()?;
            if locations.len() > MAX_CHANNELS {
                log::warn!(
                    "{} channel files given, only the first {} are loaded",
                    locations.len(),
                    MAX_CHANNELS
                );
            }
            channels_from_planes(&planes)?
        }
    };
    if image.channel_count() == 0 {
        return Err(ImageError::NoChannels);
    }
    log::info!(
        "Image loaded: {}x{} pixels, {} channel(s)",
        image.width,
        image.height,
        image.channel_count()
    );
    Ok(image)
}

/// Load on a background thread; the receiver yields exactly one result.
pub fn spawn_image_load(source: ImageSource) -> Receiver<Result<ChannelImage, ImageError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = load_channel_image(&source);
        if tx.send(result).is_err() {
            log::debug!("Image load finished after the app closed");
        }
    });
    rx
}

/// Channel planes uploaded as one six-layer `R8Unorm` array texture.
pub struct ChannelTextures {
    pub texture: Texture,
    pub view: TextureView,
    pub size: [u32; 2],
}

impl ChannelTextures {
    pub fn upload(device: &Device, queue: &Queue, image: &ChannelImage) -> Self {
        let texture_size = Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: MAX_CHANNELS as u32,
        };

        let texture = device.create_texture(&TextureDescriptor {
            label: Some("channel_textures"),
            size: texture_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::R8Unorm,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            texture.as_image_copy(),
            &image.layer_data(),
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width),
                rows_per_image: Some(image.height),
            },
            texture_size,
        );

        let view = texture.create_view(&TextureViewDescriptor {
            label: Some("channel_textures_view"),
            dimension: Some(TextureViewDimension::D2Array),
            ..Default::default()
        });

        log::debug!(
            "Uploaded {} channel layer(s) at {}x{}",
            image.channel_count(),
            image.width,
            image.height
        );

        Self {
            texture,
            view,
            size: [image.width, image.height],
        }
    }
}

impl Drop for ChannelTextures {
    fn drop(&mut self) {
        self.texture.destroy();
        log::debug!("Released channel textures ({}x{})", self.size[0], self.size[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    #[test]
    fn test_composite_rgb_gives_three_channels() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([10, 20, 30]));
        img.put_pixel(1, 0, image::Rgb([40, 50, 60]));
        let channels = channels_from_composite(&DynamicImage::ImageRgb8(img));
        assert_eq!(channels.channel_count(), 3);
        assert_eq!(channels.channels[0], vec![10, 40]);
        assert_eq!(channels.channels[2], vec![30, 60]);
    }

    #[test]
    fn test_planes_are_truncated_to_six() {
        let planes: Vec<DynamicImage> = (0..8)
            .map(|i| DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, image::Luma([i as u8]))))
            .collect();
        let channels = channels_from_planes(&planes).unwrap();
        assert_eq!(channels.channel_count(), MAX_CHANNELS);
        assert_eq!(channels.channels[5], vec![5; 9]);
    }

    #[test]
    fn test_planes_must_match_size() {
        let planes = vec![
            DynamicImage::ImageLuma8(GrayImage::new(4, 4)),
            DynamicImage::ImageLuma8(GrayImage::new(2, 4)),
        ];
        assert!(matches!(
            channels_from_planes(&planes),
            Err(ImageError::SizeMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_no_channels_is_an_error() {
        assert!(matches!(channels_from_planes(&[]), Err(ImageError::NoChannels)));
        let source = ImageSource::Channels { locations: Vec::new() };
        assert!(matches!(load_channel_image(&source), Err(ImageError::NoChannels)));
    }

    #[test]
    fn test_layer_data_zero_fills_missing_layers() {
        let image = ChannelImage {
            width: 2,
            height: 2,
            channels: vec![vec![1; 4], vec![2; 4]],
        };
        let data = image.layer_data();
        assert_eq!(data.len(), 4 * MAX_CHANNELS);
        assert_eq!(&data[..8], &[1, 1, 1, 1, 2, 2, 2, 2]);
        assert!(data[8..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_demo_image_is_deterministic() {
        let a = ChannelImage::demo(32, 16);
        assert_eq!(a, ChannelImage::demo(32, 16));
        assert_eq!(a.channel_count(), 3);
        assert!(a.channels.iter().all(|c| c.len() == 32 * 16));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let source = ImageSource::Composite {
            location: "/definitely/not/here.png".to_string(),
        };
        match load_channel_image(&source) {
            Err(ImageError::Io { path, .. }) => assert_eq!(path, "/definitely/not/here.png"),
            other => panic!("unexpected result: {:?}", other.map(|i| i.channel_count())),
        }
    }
}
