//! Channel palette: colour padding and the uniform block handed to the GPU.

use serde::{Deserialize, Serialize};

use crate::utils::shader_constants::MAX_CHANNELS;
use crate::utils::surface_manager::CameraTransform;

pub type Rgb = [u8; 3];

/// Fallback colours for visible channels without a user colour:
/// blue, green, magenta, yellow, orange, cyan.
pub const DEFAULT_PALETTE: [Rgb; MAX_CHANNELS] = [
    [0, 0, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 255, 0],
    [255, 128, 0],
    [0, 255, 255],
];

const BLACK: Rgb = [0, 0, 0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Colours by channel index; fewer than the channel count is fine.
    #[serde(default)]
    pub colors: Vec<Rgb>,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub transparent_color: Option<Rgb>,
    #[serde(default)]
    pub use_transparent_color: bool,
    /// Per-channel visibility; channels past the end are visible.
    #[serde(default)]
    pub channels_visible: Vec<bool>,
}

fn default_opacity() -> f32 {
    1.0
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: Vec::new(),
            opacity: default_opacity(),
            transparent_color: None,
            use_transparent_color: false,
            channels_visible: Vec::new(),
        }
    }
}

impl PaletteConfig {
    /// Visibility mask for the first `channel_count` channels (at most 6).
    pub fn visibility_mask(&self, channel_count: usize) -> Vec<bool> {
        (0..channel_count.min(MAX_CHANNELS))
            .map(|i| self.channels_visible.get(i).copied().unwrap_or(true))
            .collect()
    }

    /// Colour shown in the UI for a channel before padding.
    pub fn color_for(&self, channel: usize) -> Rgb {
        self.colors
            .get(channel)
            .copied()
            .unwrap_or(DEFAULT_PALETTE[channel % MAX_CHANNELS])
    }

    /// Turn the transparent colour on or off. Turning it on with no colour
    /// chosen yet picks black, the colour the picker shows.
    pub fn set_transparent_enabled(&mut self, enabled: bool) {
        self.use_transparent_color = enabled;
        if enabled && self.transparent_color.is_none() {
            self.transparent_color = Some(BLACK);
        }
    }

    /// Grow the colour and visibility lists so `channel` can be edited in place.
    pub fn ensure_channel(&mut self, channel: usize) {
        while self.colors.len() <= channel {
            let next = self.colors.len();
            self.colors.push(DEFAULT_PALETTE[next % MAX_CHANNELS]);
        }
        while self.channels_visible.len() <= channel {
            self.channels_visible.push(true);
        }
    }
}

/// Always returns six colours: visible slots take the supplied colour for
/// that index or the default palette entry, everything else is black.
pub fn pad_colors(colors: &[Rgb], visible: &[bool]) -> [Rgb; MAX_CHANNELS] {
    let mut padded = [BLACK; MAX_CHANNELS];
    for (i, slot) in padded.iter_mut().enumerate() {
        if visible.get(i).copied().unwrap_or(false) {
            *slot = colors.get(i).copied().unwrap_or(DEFAULT_PALETTE[i]);
        }
    }
    padded
}

fn normalize(color: Rgb) -> [f32; 4] {
    [
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
        1.0,
    ]
}

/// std140 mirror of the `PaletteParams` block in the fragment prelude.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PaletteUniforms {
    pub colors: [[f32; 4]; MAX_CHANNELS],
    pub transparent_color: [f32; 4],
    pub opacity: f32,
    pub use_transparent_color: i32,
    pub channel_count: i32,
    pub _reserved: f32,
    /// target.x, target.y, zoom, unused
    pub view_transform: [f32; 4],
}

impl PaletteUniforms {
    pub fn new(config: &PaletteConfig, channel_count: usize, camera: CameraTransform) -> Self {
        let visible = config.visibility_mask(channel_count);
        let padded = pad_colors(&config.colors, &visible);
        let use_matte = config.use_transparent_color && config.transparent_color.is_some();
        Self {
            colors: padded.map(normalize),
            transparent_color: normalize(config.transparent_color.unwrap_or(BLACK)),
            opacity: config.opacity.clamp(0.0, 1.0),
            use_transparent_color: use_matte as i32,
            channel_count: channel_count.min(MAX_CHANNELS) as i32,
            _reserved: 0.0,
            view_transform: [camera.target[0], camera.target[1], camera.zoom, 0.0],
        }
    }

    /// Same palette seen through another camera.
    pub fn with_camera(mut self, camera: CameraTransform) -> Self {
        self.view_transform = [camera.target[0], camera.target[1], camera.zoom, 0.0];
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_colors_always_six() {
        for supplied in 0..=MAX_CHANNELS {
            let colors: Vec<Rgb> = (0..supplied).map(|i| [i as u8, 1, 2]).collect();
            for mask_len in 0..=8 {
                let visible = vec![true; mask_len];
                assert_eq!(pad_colors(&colors, &visible).len(), MAX_CHANNELS);
            }
        }
    }

    #[test]
    fn test_missing_visible_color_uses_default_palette_entry() {
        let colors = [[10, 20, 30], [40, 50, 60]];
        let padded = pad_colors(&colors, &[true, true, true]);
        assert_eq!(padded[0], [10, 20, 30]);
        assert_eq!(padded[1], [40, 50, 60]);
        assert_eq!(padded[2], DEFAULT_PALETTE[2]);
        assert_eq!(&padded[3..], &[BLACK; 3]);
    }

    #[test]
    fn test_hidden_and_overflow_slots_are_black() {
        let colors = [[255, 255, 255]; 6];
        let padded = pad_colors(&colors, &[true, false, true]);
        assert_eq!(padded[0], [255, 255, 255]);
        assert_eq!(padded[1], BLACK);
        assert_eq!(padded[2], [255, 255, 255]);
        assert_eq!(&padded[3..], &[BLACK; 3]);
    }

    #[test]
    fn test_empty_input_fills_visible_from_defaults() {
        let padded = pad_colors(&[], &[true; 6]);
        assert_eq!(padded, DEFAULT_PALETTE);
    }

    #[test]
    fn test_uniform_layout_matches_glsl_block() {
        assert_eq!(std::mem::size_of::<PaletteUniforms>(), 144);
    }

    #[test]
    fn test_uniforms_from_config() {
        let config = PaletteConfig {
            colors: vec![[255, 0, 0]],
            opacity: 1.7,
            transparent_color: None,
            use_transparent_color: true,
            channels_visible: vec![true, false],
        };
        let camera = CameraTransform { target: [0.25, 0.75], zoom: 2.0 };
        let u = PaletteUniforms::new(&config, 3, camera);
        assert_eq!(u.colors[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(u.colors[1], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(u.colors[2], normalize(DEFAULT_PALETTE[2]));
        assert_eq!(u.opacity, 1.0);
        // flag without a colour is ignored
        assert_eq!(u.use_transparent_color, 0);
        assert_eq!(u.channel_count, 3);
        assert_eq!(u.view_transform, [0.25, 0.75, 2.0, 0.0]);
    }

    #[test]
    fn test_enabling_transparent_colour_takes_effect() {
        let mut config = PaletteConfig::default();
        config.set_transparent_enabled(true);
        assert_eq!(config.transparent_color, Some(BLACK));
        let u = PaletteUniforms::new(&config, 3, CameraTransform::default());
        assert_eq!(u.use_transparent_color, 1);
        assert_eq!(u.transparent_color, [0.0, 0.0, 0.0, 1.0]);

        config.transparent_color = Some([255, 255, 255]);
        config.set_transparent_enabled(false);
        config.set_transparent_enabled(true);
        assert_eq!(config.transparent_color, Some([255, 255, 255]));
        config.set_transparent_enabled(false);
        let u = PaletteUniforms::new(&config, 3, CameraTransform::default());
        assert_eq!(u.use_transparent_color, 0);
    }

    #[test]
    fn test_ensure_channel_extends_lists() {
        let mut config = PaletteConfig::default();
        config.ensure_channel(2);
        assert_eq!(config.colors, DEFAULT_PALETTE[..3].to_vec());
        assert_eq!(config.channels_visible, vec![true; 3]);
        assert_eq!(config.visibility_mask(9).len(), MAX_CHANNELS);
    }
}
