use std::collections::VecDeque;
use std::sync::Arc;

use eframe::epaint;
use eframe::wgpu::{self, BindGroup, Buffer, Device, Queue, RenderPipeline, TextureFormat};

use crate::utils::image_loader::{ChannelImage, ChannelTextures};
use crate::utils::palette::{PaletteConfig, PaletteUniforms};
use crate::utils::panic_handler::catch_panic_mut;
use crate::utils::shader_constants::{FRAGMENT_ENTRY_POINT, STANDARD_VERTEX};
use crate::utils::shader_program::ShaderProgram;
use crate::utils::shader_validator::{compile_program, CompiledFragment};
use crate::utils::surface_manager::{CameraTransform, Pane, RenderSurface, SurfaceFactory};
use crate::utils::ShaderError;

// Render pipeline for one pane
pub struct PaletteShaderPipeline {
    pub pipeline: RenderPipeline,
    pub uniform_buffer: Buffer,
    pub uniform_bind_group: BindGroup,
    pub channel_bind_group: BindGroup,
    /// Zero-filled backing for the template's own uniforms (group 2).
    pub user_uniform_buffer: Buffer,
    pub user_bind_group: BindGroup,
    pub label: String,
    channels: Arc<ChannelTextures>,
}

impl PaletteShaderPipeline {
    pub fn new(
        device: &Device,
        format: TextureFormat,
        fragment: &CompiledFragment,
        label: &str,
        channels: Arc<ChannelTextures>,
    ) -> Self {
        log::debug!("Creating shader pipeline {} ({} bytes WGSL)", label, fragment.wgsl.len());

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("palette_vertex"),
            source: wgpu::ShaderSource::Wgsl(STANDARD_VERTEX.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(fragment.wgsl.as_str().into()),
        });

        let uniform_size = std::mem::size_of::<PaletteUniforms>() as u64;
        log::trace!("Creating uniform buffer ({} bytes)", uniform_size);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("palette_uniforms"),
            size: uniform_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
            mapped_at_creation: false,
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("palette_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("palette_uniform_bg"),
            layout: &uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let channel_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("channel_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("channel_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let channel_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("channel_bg"),
            layout: &channel_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&channels.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        // std140 blocks are 16-byte aligned; wgpu zero-initializes new buffers
        let user_size = fragment.user_uniform_bytes.max(16).next_multiple_of(16);
        let user_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("user_uniforms"),
            size: user_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
            mapped_at_creation: false,
        });

        let user_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("user_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let user_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("user_uniform_bg"),
            layout: &user_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: user_uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("palette_pipeline_layout"),
            bind_group_layouts: &[&uniform_bgl, &channel_bgl, &user_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(FRAGMENT_ENTRY_POINT),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::info!("Shader pipeline {} created (format: {:?})", label, format);

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            channel_bind_group,
            user_uniform_buffer,
            user_bind_group,
            label: label.to_string(),
            channels,
        }
    }

    pub fn channel_size(&self) -> [u32; 2] {
        self.channels.size
    }
}

impl Drop for PaletteShaderPipeline {
    fn drop(&mut self) {
        self.uniform_buffer.destroy();
        self.user_uniform_buffer.destroy();
        log::debug!("Released shader pipeline {}", self.label);
    }
}

/// GPU-backed pane surface.
pub struct PaletteSurface {
    pipeline: Arc<PaletteShaderPipeline>,
    uniforms: PaletteUniforms,
    channel_count: usize,
    camera: CameraTransform,
}

impl PaletteSurface {
    /// Paint callback carrying a copy of the current uniforms.
    pub fn callback(&self) -> PaletteCallback {
        PaletteCallback {
            shader: self.pipeline.clone(),
            uniforms: self.uniforms,
        }
    }

    pub fn label(&self) -> &str {
        &self.pipeline.label
    }

    pub fn image_size(&self) -> [u32; 2] {
        self.pipeline.channel_size()
    }
}

impl RenderSurface for PaletteSurface {
    fn set_camera(&mut self, camera: CameraTransform) {
        self.camera = camera;
        self.uniforms = self.uniforms.with_camera(camera);
    }

    fn set_palette(&mut self, palette: &PaletteConfig) {
        self.uniforms = PaletteUniforms::new(palette, self.channel_count, self.camera);
    }
}

/// Compiled modules kept across rebinds; the baseline plus a few recent edits.
const MODULE_CACHE_CAPACITY: usize = 8;

/// Compiled fragments by `module_key`, least recently used evicted first.
struct ModuleCache {
    capacity: usize,
    entries: VecDeque<(String, Arc<CompiledFragment>)>,
}

impl ModuleCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&mut self, key: &str) -> Option<Arc<CompiledFragment>> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(index)?;
        let compiled = entry.1.clone();
        self.entries.push_back(entry);
        Some(compiled)
    }

    fn insert(&mut self, key: String, compiled: Arc<CompiledFragment>) {
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push_back((key, compiled));
        while self.entries.len() > self.capacity {
            if let Some((evicted, _)) = self.entries.pop_front() {
                log::debug!("Evicted cached module {}", evicted);
            }
        }
    }
}

/// Builds pane surfaces on the eframe wgpu device.
pub struct WgpuSurfaceFactory {
    device: Device,
    queue: Queue,
    format: TextureFormat,
    module_cache: ModuleCache,
    channels: Option<(Arc<ChannelImage>, Arc<ChannelTextures>)>,
}

impl WgpuSurfaceFactory {
    pub fn new(render_state: &egui_wgpu::RenderState) -> Self {
        Self {
            device: render_state.device.clone(),
            queue: render_state.queue.clone(),
            format: render_state.target_format,
            module_cache: ModuleCache::new(MODULE_CACHE_CAPACITY),
            channels: None,
        }
    }

    pub fn cached_modules(&self) -> usize {
        self.module_cache.len()
    }

    fn fragment_module(&mut self, program: &ShaderProgram) -> Result<Arc<CompiledFragment>, ShaderError> {
        let key = program.module_key();
        if let Some(compiled) = self.module_cache.get(&key) {
            log::debug!("Using cached module {}", key);
            return Ok(compiled);
        }
        let compiled = Arc::new(compile_program(program)?);
        self.module_cache.insert(key, compiled.clone());
        Ok(compiled)
    }

    /// Both panes share one upload per image.
    fn channel_textures(&mut self, image: &Arc<ChannelImage>) -> Result<Arc<ChannelTextures>, ShaderError> {
        if let Some((current, textures)) = &self.channels {
            if Arc::ptr_eq(current, image) {
                return Ok(textures.clone());
            }
        }
        // drop our handle to the old upload before creating the new one
        self.channels = None;
        let (device, queue) = (&self.device, &self.queue);
        let textures = Arc::new(catch_panic_mut(|| ChannelTextures::upload(device, queue, image))?);
        self.channels = Some((image.clone(), textures.clone()));
        Ok(textures)
    }
}

impl SurfaceFactory for WgpuSurfaceFactory {
    type Surface = PaletteSurface;

    fn create(
        &mut self,
        pane: Pane,
        program: &ShaderProgram,
        image: &Arc<ChannelImage>,
        palette: &PaletteConfig,
        camera: CameraTransform,
    ) -> Result<PaletteSurface, ShaderError> {
        let fragment = self.fragment_module(program)?;
        let channels = self.channel_textures(image)?;
        let label = format!("{}_{}", pane.label().to_lowercase(), program.module_key());
        let (device, format) = (&self.device, self.format);
        let pipeline = catch_panic_mut(|| {
            PaletteShaderPipeline::new(device, format, &fragment, &label, channels)
        })?;
        Ok(PaletteSurface {
            pipeline: Arc::new(pipeline),
            uniforms: PaletteUniforms::new(palette, image.channel_count(), camera),
            channel_count: image.channel_count(),
            camera,
        })
    }
}

// Callback for rendering one pane
pub struct PaletteCallback {
    pub shader: Arc<PaletteShaderPipeline>,
    pub uniforms: PaletteUniforms,
}

impl egui_wgpu::CallbackTrait for PaletteCallback {
    fn prepare(
        &self,
        _device: &eframe::wgpu::Device,
        queue: &eframe::wgpu::Queue,
        _screen_descriptor: &egui_wgpu::ScreenDescriptor,
        _encoder: &mut eframe::wgpu::CommandEncoder,
        _resources: &mut egui_wgpu::CallbackResources,
    ) -> Vec<eframe::wgpu::CommandBuffer> {
        queue.write_buffer(
            &self.shader.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );
        Vec::new()
    }

    fn paint(
        &self,
        _info: epaint::PaintCallbackInfo,
        render_pass: &mut eframe::wgpu::RenderPass<'static>,
        _resources: &egui_wgpu::CallbackResources,
    ) {
        render_pass.set_pipeline(&self.shader.pipeline);
        render_pass.set_bind_group(0, &self.shader.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, &self.shader.channel_bind_group, &[]);
        render_pass.set_bind_group(2, &self.shader.user_bind_group, &[]);
        render_pass.draw(0..6, 0..1); // Draw 6 vertices (2 triangles)

        // Log first render only
        static FIRST_RENDER: std::sync::Once = std::sync::Once::new();
        FIRST_RENDER.call_once(|| {
            log::debug!("First palette render executed");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(tag: &str) -> Arc<CompiledFragment> {
        Arc::new(CompiledFragment {
            wgsl: tag.to_string(),
            user_uniform_bytes: 0,
        })
    }

    #[test]
    fn test_module_cache_is_bounded() {
        let mut cache = ModuleCache::new(2);
        cache.insert("a".to_string(), compiled("a"));
        cache.insert("b".to_string(), compiled("b"));
        cache.insert("c".to_string(), compiled("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c").unwrap().wgsl, "c");
    }

    #[test]
    fn test_module_cache_keeps_recently_used() {
        let mut cache = ModuleCache::new(2);
        cache.insert("baseline".to_string(), compiled("baseline"));
        cache.insert("edit1".to_string(), compiled("edit1"));
        assert!(cache.get("baseline").is_some());
        cache.insert("edit2".to_string(), compiled("edit2"));
        assert!(cache.get("baseline").is_some());
        assert!(cache.get("edit1").is_none());
    }
}
