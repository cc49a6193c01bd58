//! Lifecycle of the two comparison panes.
//!
//! Each pane owns at most one surface (pipeline + GPU resources). A surface
//! releases everything in its `Drop`, and a pane always drops the old
//! surface before asking the factory for a new one. Both panes render
//! through one shared camera.

use std::sync::Arc;

use crate::utils::image_loader::ChannelImage;
use crate::utils::palette::PaletteConfig;
use crate::utils::shader_constants::build_default_program;
use crate::utils::shader_program::ShaderProgram;
use crate::utils::ShaderError;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    /// Always renders the built-in program.
    Baseline,
    /// Renders the last successfully compiled program.
    Custom,
}

impl Pane {
    pub const ALL: [Pane; 2] = [Pane::Baseline, Pane::Custom];

    pub fn label(&self) -> &'static str {
        match self {
            Pane::Baseline => "Baseline",
            Pane::Custom => "Custom",
        }
    }
}

/// Pan target in image uv (0..1) plus zoom factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub target: [f32; 2],
    pub zoom: f32,
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self {
            target: [0.5, 0.5],
            zoom: 1.0,
        }
    }
}

impl CameraTransform {
    /// Move by a drag measured in pane fractions; content follows the pointer.
    pub fn pan_by(self, delta: [f32; 2]) -> Self {
        Self {
            target: [
                self.target[0] - delta[0] / self.zoom,
                self.target[1] - delta[1] / self.zoom,
            ],
            zoom: self.zoom,
        }
    }

    pub fn zoom_by(self, factor: f32) -> Self {
        Self {
            target: self.target,
            zoom: (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }
}

/// One pane's live render target. Resources are released on drop.
pub trait RenderSurface {
    fn set_camera(&mut self, camera: CameraTransform);
    fn set_palette(&mut self, palette: &PaletteConfig);
}

/// Builds surfaces; the GPU implementation lives in pipeline.rs.
pub trait SurfaceFactory {
    type Surface: RenderSurface;

    fn create(
        &mut self,
        pane: Pane,
        program: &ShaderProgram,
        image: &Arc<ChannelImage>,
        palette: &PaletteConfig,
        camera: CameraTransform,
    ) -> Result<Self::Surface, ShaderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneStatus {
    Uninitialized,
    Bound,
    Rebinding,
    Destroyed,
}

enum PaneState<S> {
    Uninitialized,
    Bound(S),
    Rebinding,
    Destroyed,
}

impl<S> PaneState<S> {
    fn status(&self) -> PaneStatus {
        match self {
            PaneState::Uninitialized => PaneStatus::Uninitialized,
            PaneState::Bound(_) => PaneStatus::Bound,
            PaneState::Rebinding => PaneStatus::Rebinding,
            PaneState::Destroyed => PaneStatus::Destroyed,
        }
    }
}

pub struct RenderSurfaceManager<F: SurfaceFactory> {
    factory: F,
    image: Option<Arc<ChannelImage>>,
    baseline_program: ShaderProgram,
    applied: ShaderProgram,
    palette: PaletteConfig,
    camera: CameraTransform,
    baseline: PaneState<F::Surface>,
    custom: PaneState<F::Surface>,
}

impl<F: SurfaceFactory> RenderSurfaceManager<F> {
    pub fn new(factory: F, applied: ShaderProgram, palette: PaletteConfig) -> Self {
        Self {
            factory,
            image: None,
            baseline_program: build_default_program(),
            applied,
            palette,
            camera: CameraTransform::default(),
            baseline: PaneState::Uninitialized,
            custom: PaneState::Uninitialized,
        }
    }

    pub fn status(&self, pane: Pane) -> PaneStatus {
        self.slot(pane).status()
    }

    pub fn surface(&self, pane: Pane) -> Option<&F::Surface> {
        match self.slot(pane) {
            PaneState::Bound(surface) => Some(surface),
            _ => None,
        }
    }

    pub fn camera(&self) -> CameraTransform {
        self.camera
    }

    pub fn applied_program(&self) -> &ShaderProgram {
        &self.applied
    }

    pub fn image(&self) -> Option<&Arc<ChannelImage>> {
        self.image.as_ref()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// New image data rebinds both panes.
    pub fn set_image(&mut self, image: Arc<ChannelImage>) -> Result<(), ShaderError> {
        log::info!(
            "Binding image {}x{} ({} channels)",
            image.width,
            image.height,
            image.channel_count()
        );
        self.image = Some(image);
        let baseline = self.rebind(Pane::Baseline);
        let custom = self.rebind(Pane::Custom);
        baseline.and(custom)
    }

    /// Make `program` the applied program and rebind the custom pane.
    ///
    /// If the new surface cannot be built, the previous program is restored.
    pub fn apply_program(&mut self, program: ShaderProgram) -> Result<(), ShaderError> {
        if program == self.applied && self.status(Pane::Custom) == PaneStatus::Bound {
            log::debug!("Program unchanged, keeping custom pane");
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.applied, program);
        if self.image.is_none() {
            log::debug!("No image yet, custom program stored for later");
            return Ok(());
        }
        match self.rebind(Pane::Custom) {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!("Custom pane rebind failed, restoring previous program");
                self.applied = previous;
                if let Err(restore_err) = self.rebind(Pane::Custom) {
                    log::error!("Restoring previous program failed: {}", restore_err);
                }
                Err(err)
            }
        }
    }

    pub fn set_palette(&mut self, palette: PaletteConfig) {
        self.palette = palette;
        for slot in [&mut self.baseline, &mut self.custom] {
            if let PaneState::Bound(surface) = slot {
                surface.set_palette(&self.palette);
            }
        }
    }

    /// Last write wins; the new transform is copied into both panes.
    pub fn update_camera(&mut self, origin: Pane, camera: CameraTransform) {
        if camera == self.camera {
            return;
        }
        log::trace!("Camera change from {} pane: {:?}", origin.label(), camera);
        self.camera = camera;
        for pane in Pane::ALL {
            if let PaneState::Bound(surface) = self.slot_mut(pane) {
                surface.set_camera(camera);
            }
        }
    }

    /// Release both panes; nothing is rebound afterwards.
    pub fn destroy(&mut self) {
        for pane in Pane::ALL {
            let previous = std::mem::replace(self.slot_mut(pane), PaneState::Destroyed);
            if let PaneState::Bound(surface) = previous {
                drop(surface);
                log::info!("{} pane destroyed", pane.label());
            }
        }
    }

    fn rebind(&mut self, pane: Pane) -> Result<(), ShaderError> {
        if self.status(pane) == PaneStatus::Destroyed {
            return Ok(());
        }
        let Some(image) = self.image.clone() else {
            return Ok(());
        };

        let previous = std::mem::replace(self.slot_mut(pane), PaneState::Rebinding);
        if let PaneState::Bound(surface) = previous {
            drop(surface);
            log::debug!("{} pane released previous surface", pane.label());
        }

        let program = match pane {
            Pane::Baseline => &self.baseline_program,
            Pane::Custom => &self.applied,
        };
        match self
            .factory
            .create(pane, program, &image, &self.palette, self.camera)
        {
            Ok(surface) => {
                log::info!("{} pane bound ({})", pane.label(), program.module_key());
                *self.slot_mut(pane) = PaneState::Bound(surface);
                Ok(())
            }
            Err(err) => {
                log::error!("{} pane failed to bind: {}", pane.label(), err);
                *self.slot_mut(pane) = PaneState::Uninitialized;
                Err(err)
            }
        }
    }

    fn slot(&self, pane: Pane) -> &PaneState<F::Surface> {
        match pane {
            Pane::Baseline => &self.baseline,
            Pane::Custom => &self.custom,
        }
    }

    fn slot_mut(&mut self, pane: Pane) -> &mut PaneState<F::Surface> {
        match pane {
            Pane::Baseline => &mut self.baseline,
            Pane::Custom => &mut self.custom,
        }
    }
}

impl<F: SurfaceFactory> Drop for RenderSurfaceManager<F> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Recording surfaces for lifecycle tests; no GPU involved.

    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    pub(crate) type Events = Rc<RefCell<Vec<String>>>;

    pub(crate) struct FakeSurface {
        pub(crate) pane: Pane,
        pub(crate) key: String,
        pub(crate) camera: CameraTransform,
        pub(crate) opacity: f32,
        events: Events,
    }

    impl RenderSurface for FakeSurface {
        fn set_camera(&mut self, camera: CameraTransform) {
            self.camera = camera;
        }

        fn set_palette(&mut self, palette: &PaletteConfig) {
            self.opacity = palette.opacity;
        }
    }

    impl Drop for FakeSurface {
        fn drop(&mut self) {
            self.events
                .borrow_mut()
                .push(format!("drop {} {}", self.pane.label(), self.key));
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeFactory {
        pub(crate) events: Events,
        pub(crate) fail_key: Option<String>,
    }

    impl SurfaceFactory for FakeFactory {
        type Surface = FakeSurface;

        fn create(
            &mut self,
            pane: Pane,
            program: &ShaderProgram,
            _image: &Arc<ChannelImage>,
            palette: &PaletteConfig,
            camera: CameraTransform,
        ) -> Result<FakeSurface, ShaderError> {
            let key = program.module_key();
            if self.fail_key.as_deref() == Some(key.as_str()) {
                self.events
                    .borrow_mut()
                    .push(format!("fail {} {}", pane.label(), key));
                return Err(ShaderError::Gpu("device lost".to_string()));
            }
            self.events
                .borrow_mut()
                .push(format!("create {} {}", pane.label(), key));
            Ok(FakeSurface {
                pane,
                key,
                camera,
                opacity: palette.opacity,
                events: self.events.clone(),
            })
        }
    }

    pub(crate) fn image() -> Arc<ChannelImage> {
        Arc::new(ChannelImage::demo(4, 4))
    }

    pub(crate) fn manager() -> (RenderSurfaceManager<FakeFactory>, Events) {
        let factory = FakeFactory::default();
        let events = factory.events.clone();
        let manager =
            RenderSurfaceManager::new(factory, build_default_program(), PaletteConfig::default());
        (manager, events)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn custom_program() -> ShaderProgram {
        ShaderProgram::new("void mutate_color() {}", "rgba = vec4(1.0);")
    }

    #[test]
    fn test_panes_wait_for_image() {
        let (mut manager, events) = manager();
        manager.apply_program(custom_program()).unwrap();
        assert_eq!(manager.status(Pane::Baseline), PaneStatus::Uninitialized);
        assert_eq!(manager.status(Pane::Custom), PaneStatus::Uninitialized);
        assert_eq!(manager.applied_program(), &custom_program());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_image_binds_both_panes() {
        let (mut manager, events) = manager();
        manager.set_image(image()).unwrap();
        let default_key = build_default_program().module_key();
        assert_eq!(manager.status(Pane::Baseline), PaneStatus::Bound);
        assert_eq!(manager.status(Pane::Custom), PaneStatus::Bound);
        assert_eq!(
            *events.borrow(),
            vec![
                format!("create Baseline {}", default_key),
                format!("create Custom {}", default_key),
            ]
        );
    }

    #[test]
    fn test_apply_program_destroys_before_create() {
        let (mut manager, events) = manager();
        manager.set_image(image()).unwrap();
        events.borrow_mut().clear();

        manager.apply_program(custom_program()).unwrap();
        let default_key = build_default_program().module_key();
        let custom_key = custom_program().module_key();
        assert_eq!(
            *events.borrow(),
            vec![
                format!("drop Custom {}", default_key),
                format!("create Custom {}", custom_key),
            ]
        );
        assert_eq!(manager.surface(Pane::Baseline).unwrap().key, default_key);
        assert_eq!(manager.surface(Pane::Custom).unwrap().key, custom_key);
    }

    #[test]
    fn test_same_program_is_not_rebound() {
        let (mut manager, events) = manager();
        manager.set_image(image()).unwrap();
        events.borrow_mut().clear();
        manager.apply_program(build_default_program()).unwrap();
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_new_image_rebinds_both_in_order() {
        let (mut manager, events) = manager();
        manager.set_image(image()).unwrap();
        events.borrow_mut().clear();
        manager.set_image(image()).unwrap();
        let log = events.borrow();
        assert_eq!(log.len(), 4);
        assert!(log[0].starts_with("drop Baseline"));
        assert!(log[1].starts_with("create Baseline"));
        assert!(log[2].starts_with("drop Custom"));
        assert!(log[3].starts_with("create Custom"));
    }

    #[test]
    fn test_camera_is_shared() {
        let (mut manager, _events) = manager();
        manager.set_image(image()).unwrap();
        let camera = CameraTransform::default().pan_by([0.1, -0.2]).zoom_by(2.0);
        manager.update_camera(Pane::Custom, camera);
        assert_eq!(manager.camera(), camera);
        assert_eq!(manager.surface(Pane::Baseline).unwrap().camera, camera);
        assert_eq!(manager.surface(Pane::Custom).unwrap().camera, camera);

        // a rebound pane starts from the shared camera
        manager.apply_program(custom_program()).unwrap();
        assert_eq!(manager.surface(Pane::Custom).unwrap().camera, camera);
    }

    #[test]
    fn test_palette_reaches_bound_panes() {
        let (mut manager, _events) = manager();
        manager.set_image(image()).unwrap();
        let palette = PaletteConfig {
            opacity: 0.25,
            ..PaletteConfig::default()
        };
        manager.set_palette(palette);
        assert_eq!(manager.surface(Pane::Baseline).unwrap().opacity, 0.25);
        assert_eq!(manager.surface(Pane::Custom).unwrap().opacity, 0.25);
    }

    #[test]
    fn test_failed_rebind_restores_previous_program() {
        let (mut manager, events) = manager();
        manager.set_image(image()).unwrap();
        manager.factory.fail_key = Some(custom_program().module_key());
        events.borrow_mut().clear();

        let err = manager.apply_program(custom_program()).unwrap_err();
        assert_eq!(err, ShaderError::Gpu("device lost".to_string()));
        assert_eq!(manager.applied_program(), &build_default_program());
        assert_eq!(manager.status(Pane::Custom), PaneStatus::Bound);
        let default_key = build_default_program().module_key();
        assert_eq!(manager.surface(Pane::Custom).unwrap().key, default_key);
        assert_eq!(events.borrow()[0], format!("drop Custom {}", default_key));
    }

    #[test]
    fn test_destroy_releases_and_stays_destroyed() {
        let (mut manager, events) = manager();
        manager.set_image(image()).unwrap();
        events.borrow_mut().clear();

        manager.destroy();
        assert_eq!(manager.status(Pane::Baseline), PaneStatus::Destroyed);
        assert_eq!(manager.status(Pane::Custom), PaneStatus::Destroyed);
        assert_eq!(events.borrow().len(), 2);

        manager.set_image(image()).unwrap();
        manager.apply_program(custom_program()).unwrap();
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_drop_releases_surfaces() {
        let (mut manager, events) = manager();
        manager.set_image(image()).unwrap();
        events.borrow_mut().clear();
        drop(manager);
        let log = events.borrow();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.starts_with("drop")));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let camera = CameraTransform::default().zoom_by(1000.0);
        assert_eq!(camera.zoom, MAX_ZOOM);
        let camera = camera.zoom_by(0.0);
        assert_eq!(camera.zoom, MIN_ZOOM);
    }
}
