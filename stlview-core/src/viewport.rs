//! Render surface lifecycle, camera and scene ownership

use std::sync::Arc;

use log::{debug, warn};

use crate::color::Rgb;
use crate::error::Result;
use crate::geometry::Mesh;
use crate::picker::{self, PickHit};
use crate::projection::Camera;
use crate::raster::{self, Frame};
use crate::scene::{ActorId, ActorStyle, Scene};
use crate::transform::OrbitState;

/// Host-provided drawing target
pub trait RenderSurface {
    /// Size in surface units (pixels or terminal cells)
    fn size(&self) -> (u32, u32);

    /// Height over width of one surface unit
    fn pixel_aspect(&self) -> f32 {
        1.0
    }

    fn present(&mut self, frame: &Frame) -> Result<()>;

    /// Called once on teardown
    fn release(&mut self) {}
}

struct ViewportContext<S> {
    surface: S,
    camera: Camera,
    scene: Scene,
    frame: Frame,
    orbit: OrbitState,
    redraws: u64,
}

pub struct Viewport<S: RenderSurface> {
    context: Option<ViewportContext<S>>,
    fov: f32,
    background: Rgb,
}

impl<S: RenderSurface> Viewport<S> {
    pub fn new(fov: f32, background: Rgb) -> Self {
        Self {
            context: None,
            fov,
            background,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Create camera, frame and empty scene over `surface`, replacing any
    /// previous context.
    pub fn initialize(&mut self, surface: S) {
        if self.context.is_some() {
            self.teardown();
        }

        let (width, height) = surface.size();
        let mut camera = Camera::new(width, height, surface.pixel_aspect());
        camera.fov = self.fov;

        self.context = Some(ViewportContext {
            frame: Frame::new(width as usize, height as usize, self.background),
            surface,
            camera,
            scene: Scene::new(),
            orbit: OrbitState::default(),
            redraws: 0,
        });
        debug!("viewport initialized at {width}x{height}");
        self.render();
    }

    /// Release every actor and the surface; returns the released surface
    pub fn teardown(&mut self) -> Option<S> {
        let mut context = self.context.take()?;
        let released = context.scene.clear();
        context.surface.release();
        debug!("viewport torn down, released {released} actor(s)");
        Some(context.surface)
    }

    pub fn add_actor(&mut self, mesh: Arc<Mesh>, style: ActorStyle) -> Option<ActorId> {
        let context = self.context.as_mut()?;
        Some(context.scene.add_actor(mesh, style))
    }

    /// Remove and dispose every actor
    pub fn clear_actors(&mut self) -> usize {
        self.context.as_mut().map_or(0, |c| c.scene.clear())
    }

    /// Re-fit the camera to the current scene bounds
    pub fn reset_camera(&mut self) {
        if let Some(context) = self.context.as_mut() {
            if let Some(bounds) = context.scene.bounds() {
                context.camera.fit_to_bounds(&bounds);
            }
        }
    }

    /// Rotate the camera around its target
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        if let Some(context) = self.context.as_mut() {
            context.orbit.rotate(dx, dy);
            context.camera.orbit(&context.orbit);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(context) = self.context.as_mut() {
            let aspect = context.surface.pixel_aspect();
            context.camera.set_viewport(width, height, aspect);
            context.frame.resize(width as usize, height as usize);
        }
    }

    /// Rasterize the scene and present it; no-op before `initialize`
    pub fn render(&mut self) {
        let Some(context) = self.context.as_mut() else {
            return;
        };
        if context.frame.width() == 0 || context.frame.height() == 0 {
            return;
        }
        raster::render_scene(&mut context.frame, &context.scene, &context.camera);
        context.redraws += 1;
        if let Err(e) = context.surface.present(&context.frame) {
            warn!("failed to present frame: {e}");
        }
    }

    /// Nearest actor under screen position `(x, y)`
    pub fn pick(&self, x: f32, y: f32) -> Option<PickHit> {
        let context = self.context.as_ref()?;
        if context.frame.width() == 0 || context.frame.height() == 0 {
            return None;
        }
        picker::pick_screen(
            &context.scene,
            &context.camera,
            x,
            y,
            context.frame.width() as u32,
            context.frame.height() as u32,
        )
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.context.as_ref().map(|c| &c.scene)
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.context.as_ref().map(|c| &c.camera)
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.context.as_ref().map(|c| &c.frame)
    }

    pub fn surface(&self) -> Option<&S> {
        self.context.as_ref().map(|c| &c.surface)
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.context.as_mut().map(|c| &mut c.surface)
    }

    /// Frames rendered since initialization
    pub fn redraws(&self) -> u64 {
        self.context.as_ref().map_or(0, |c| c.redraws)
    }
}

impl<S: RenderSurface> Drop for Viewport<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records presents and release for assertions
    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        pub width: u32,
        pub height: u32,
        pub presented: usize,
        pub released: bool,
        pub last_covered: usize,
    }

    impl RecordingSurface {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ..Default::default()
            }
        }
    }

    impl RenderSurface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn present(&mut self, frame: &Frame) -> Result<()> {
            self.presented += 1;
            self.last_covered = frame.covered_pixels();
            Ok(())
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    fn style() -> ActorStyle {
        ActorStyle {
            representation: crate::representation::Representation::Surface,
            color: Rgb::WHITE,
        }
    }

    #[test]
    fn uninitialized_viewport_is_inert() {
        let mut viewport: Viewport<RecordingSurface> = Viewport::new(0.8, Rgb::BLACK);
        viewport.render();
        assert!(viewport.add_actor(Arc::new(Mesh::cube(1.0)), style()).is_none());
        assert!(viewport.pick(0.0, 0.0).is_none());
        assert!(viewport.teardown().is_none());
    }

    #[test]
    fn initialize_presents_an_empty_frame() {
        let mut viewport = Viewport::new(0.8, Rgb::BLACK);
        viewport.initialize(RecordingSurface::new(32, 16));
        let surface = viewport.surface().unwrap();
        assert_eq!(surface.presented, 1);
        assert_eq!(surface.last_covered, 0);
    }

    #[test]
    fn teardown_releases_actors_and_surface() {
        let mut viewport = Viewport::new(0.8, Rgb::BLACK);
        viewport.initialize(RecordingSurface::new(32, 16));
        viewport.add_actor(Arc::new(Mesh::cube(1.0)), style());
        viewport.reset_camera();
        viewport.render();
        assert!(viewport.surface().unwrap().last_covered > 0);

        let surface = viewport.teardown().unwrap();
        assert!(surface.released);
        assert!(!viewport.is_initialized());
        assert!(viewport.scene().is_none());
    }

    #[test]
    fn reinitialize_starts_from_an_empty_scene() {
        let mut viewport = Viewport::new(0.8, Rgb::BLACK);
        viewport.initialize(RecordingSurface::new(8, 8));
        viewport.add_actor(Arc::new(Mesh::cube(1.0)), style());
        viewport.initialize(RecordingSurface::new(8, 8));
        assert_eq!(viewport.scene().unwrap().len(), 0);
    }

    #[test]
    fn resize_changes_frame() {
        let mut viewport = Viewport::new(0.8, Rgb::BLACK);
        viewport.initialize(RecordingSurface::new(8, 8));
        viewport.resize(20, 10);
        let frame = viewport.frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (20, 10));
    }
}
