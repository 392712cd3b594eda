//! The annotated mesh viewer: selection, style and color state driving the
//! load pipeline, plus click-to-identify.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::{rngs::SmallRng, SeedableRng};

use crate::color::{self, ColorScheme, Rgb, Rgb8};
use crate::config::ViewerConfig;
use crate::pipeline::{DecodeExecutor, DecodeOutcome, LoadedFile, MeshLoadPipeline, ThreadedExecutor};
use crate::representation::Representation;
use crate::scene::{Actor, ActorLookup, ActorStyle};
use crate::stl::StlError;
use crate::viewport::{RenderSurface, Viewport};

/// A file of the current selection that failed to decode
#[derive(Debug, Clone, PartialEq)]
pub struct LoadError {
    pub file_name: String,
    pub error: StlError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub button: PointerButton,
    /// Scene-relative position, `None` when the press was outside the scene
    pub position: Option<(f32, f32)>,
}

impl PointerEvent {
    pub fn primary(x: f32, y: f32) -> Self {
        Self {
            button: PointerButton::Primary,
            position: Some((x, y)),
        }
    }
}

pub struct AnnotatedViewer<S: RenderSurface> {
    config: ViewerConfig,
    viewport: Viewport<S>,
    pipeline: MeshLoadPipeline,
    files: Vec<LoadedFile>,
    representation: Representation,
    colors: ColorScheme,
    lookup: ActorLookup,
    clicked: Option<String>,
    load_errors: Vec<LoadError>,
    rng: SmallRng,
}

impl<S: RenderSurface> AnnotatedViewer<S> {
    /// Viewer decoding on worker threads
    pub fn new(config: ViewerConfig) -> Self {
        Self::with_executor(config, Box::new(ThreadedExecutor))
    }

    pub fn with_executor(config: ViewerConfig, executor: Box<dyn DecodeExecutor>) -> Self {
        let rng = match config.color_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        Self {
            viewport: Viewport::new(config.fov_radians(), config.background),
            pipeline: MeshLoadPipeline::new(executor),
            files: Vec::new(),
            representation: config.representation,
            colors: ColorScheme::new(),
            lookup: ActorLookup::new(),
            clicked: None,
            load_errors: Vec::new(),
            rng,
            config,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Mount on `surface`; honors any selection made before mounting
    pub fn initialize(&mut self, surface: S) {
        if self.viewport.is_initialized() {
            self.teardown();
        }
        self.viewport.initialize(surface);
        self.reconcile();
    }

    /// Unmount: release actors and the surface, forget in-flight decodes
    pub fn teardown(&mut self) -> Option<S> {
        self.pipeline.invalidate();
        self.lookup.clear();
        self.load_errors.clear();
        self.clicked = None;
        self.viewport.teardown()
    }

    /// Replace the selection; every file gets a fresh random color
    pub fn select_files(&mut self, files: Vec<LoadedFile>) {
        self.colors = if self.config.annotations {
            ColorScheme::random_for(files.iter().map(LoadedFile::name), &mut self.rng)
        } else {
            ColorScheme::new()
        };
        self.files = files;

        if let Some(name) = &self.clicked {
            if !self.files.iter().any(|f| f.name() == name) {
                self.clicked = None;
            }
        }
        self.reconcile();
    }

    /// Append to the selection; only new names get a color
    pub fn add_files(&mut self, files: Vec<LoadedFile>) {
        if files.is_empty() {
            return;
        }
        if self.config.annotations {
            self.colors
                .fill_missing(files.iter().map(LoadedFile::name), &mut self.rng);
        }
        self.files.extend(files);
        self.reconcile();
    }

    pub fn set_representation(&mut self, representation: Representation) {
        if representation == self.representation {
            return;
        }
        self.representation = representation;
        self.reconcile();
    }

    /// Set one file's color from 0-255 channels. Ignored by the plain viewer.
    pub fn set_color(&mut self, file_name: &str, color: Rgb8) -> bool {
        if !self.config.annotations {
            return false;
        }
        self.colors.set(file_name, Rgb::from(color));
        self.reconcile();
        true
    }

    /// Set one file's color from `#rrggbb`; malformed input changes nothing
    pub fn set_color_hex(&mut self, file_name: &str, hex: &str) -> bool {
        match color::parse_hex(hex) {
            Some(color) => self.set_color(file_name, color),
            None => {
                debug!("ignoring malformed color {hex:?} for {file_name}");
                false
            }
        }
    }

    /// Rebuild the scene from the current selection, mode and colors
    fn reconcile(&mut self) {
        if !self.viewport.is_initialized() {
            debug!("reconcile deferred until the viewport is initialized");
            return;
        }

        let released = self.viewport.clear_actors();
        self.lookup.clear();
        self.load_errors.clear();

        let representation = self.representation;
        let annotations = self.config.annotations;
        let colors = &self.colors;
        let generation = self.pipeline.start(&self.files, |name| ActorStyle {
            representation,
            color: if annotations {
                colors.color_or_default(name)
            } else {
                Rgb::WHITE
            },
        });
        debug!(
            "reconcile: released {released} actor(s), generation {generation}, {} file(s), {representation}",
            self.files.len()
        );

        self.viewport.render();
    }

    /// Apply every decode completion that has arrived; returns actors added
    pub fn poll(&mut self) -> usize {
        let mut added = 0;
        while let Some(outcome) = self.pipeline.try_next() {
            if self.apply(outcome) {
                added += 1;
            }
        }
        added
    }

    /// Wait until the current generation has no decodes in flight or
    /// `timeout` passes; returns actors added
    pub fn settle(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut added = self.poll();
        while self.pipeline.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.pipeline.next_timeout(remaining) {
                Some(outcome) => {
                    if self.apply(outcome) {
                        added += 1;
                    }
                }
                None => break,
            }
        }
        added
    }

    fn apply(&mut self, outcome: DecodeOutcome) -> bool {
        match outcome.result {
            Ok(mesh) => {
                let triangles = mesh.triangle_count();
                let Some(id) = self.viewport.add_actor(mesh, outcome.style) else {
                    return false;
                };
                self.lookup.insert(id, &outcome.file_name);
                self.viewport.reset_camera();
                self.viewport.render();
                info!("loaded {} ({triangles} triangles)", outcome.file_name);
                true
            }
            Err(error) => {
                warn!("failed to decode {}: {error}", outcome.file_name);
                self.load_errors.push(LoadError {
                    file_name: outcome.file_name,
                    error,
                });
                false
            }
        }
    }

    /// Route a pointer press; a primary press picks and updates the label
    pub fn pointer_press(&mut self, event: PointerEvent) -> Option<&str> {
        if self.config.annotations && event.button == PointerButton::Primary {
            if let (Some((x, y)), true) = (event.position, self.viewport.is_initialized()) {
                let hit = self.viewport.pick(x, y);
                self.clicked = hit
                    .and_then(|h| self.lookup.file_name(h.actor))
                    .map(str::to_owned);
                debug!("pick at ({x}, {y}): {:?}", self.clicked);
            }
        }
        self.clicked.as_deref()
    }

    pub fn clicked_file(&self) -> Option<&str> {
        self.clicked.as_deref()
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.viewport.orbit(dx, dy);
        self.viewport.render();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.resize(width, height);
        self.viewport.render();
    }

    pub fn redraw(&mut self) {
        self.viewport.render();
    }

    pub fn files(&self) -> &[LoadedFile] {
        &self.files
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn color_scheme(&self) -> &ColorScheme {
        &self.colors
    }

    pub fn load_errors(&self) -> &[LoadError] {
        &self.load_errors
    }

    /// Decodes of the current generation still running
    pub fn pending(&self) -> usize {
        self.pipeline.in_flight()
    }

    pub fn generation(&self) -> u64 {
        self.pipeline.generation()
    }

    pub fn viewport(&self) -> &Viewport<S> {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport<S> {
        &mut self.viewport
    }

    pub fn lookup(&self) -> &ActorLookup {
        &self.lookup
    }

    pub fn actor_count(&self) -> usize {
        self.viewport.scene().map_or(0, |s| s.len())
    }

    /// Live actors paired with their file names
    pub fn actors_by_file(&self) -> Vec<(&str, &Actor)> {
        let Some(scene) = self.viewport.scene() else {
            return Vec::new();
        };
        scene
            .actors()
            .iter()
            .filter_map(|a| self.lookup.file_name(a.id()).map(|name| (name, a)))
            .collect()
    }

    /// The lookup's keys are exactly the live actors
    pub fn lookup_is_consistent(&self) -> bool {
        match self.viewport.scene() {
            Some(scene) => self.lookup.matches(scene),
            None => self.lookup.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use crate::pipeline::InlineExecutor;
    use crate::stl::encode_binary_stl;
    use crate::viewport::tests::RecordingSurface;
    use nalgebra::Vector3;

    fn viewer(config: ViewerConfig) -> AnnotatedViewer<RecordingSurface> {
        AnnotatedViewer::with_executor(
            ViewerConfig {
                color_seed: Some(11),
                ..config
            },
            Box::new(InlineExecutor),
        )
    }

    fn cube_file(name: &str, offset_x: f32) -> LoadedFile {
        let mesh = Mesh::cube(2.0).translated(Vector3::new(offset_x, 0.0, 0.0));
        LoadedFile::new(name, encode_binary_stl(&mesh, name))
    }

    #[test]
    fn selection_before_mount_loads_on_initialize() {
        let mut v = viewer(ViewerConfig::default());
        v.select_files(vec![cube_file("a.stl", 0.0)]);
        assert_eq!(v.poll(), 0);
        assert_eq!(v.actor_count(), 0);

        v.initialize(RecordingSurface::new(40, 20));
        assert_eq!(v.poll(), 1);
        assert_eq!(v.actor_count(), 1);
        assert!(v.lookup_is_consistent());
    }

    #[test]
    fn redraw_after_each_addition() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(40, 20));
        let before = v.viewport().redraws();
        v.select_files(vec![cube_file("a.stl", 0.0), cube_file("b.stl", 5.0)]);
        v.poll();
        // one for the cleared scene, one per added actor
        assert_eq!(v.viewport().redraws() - before, 3);
    }

    #[test]
    fn malformed_hex_keeps_color() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(40, 20));
        v.select_files(vec![cube_file("a.stl", 0.0)]);
        v.poll();
        let before = v.color_scheme().get("a.stl");
        let generation = v.generation();

        assert!(!v.set_color_hex("a.stl", "#12345"));
        assert_eq!(v.color_scheme().get("a.stl"), before);
        assert_eq!(v.generation(), generation);
    }

    #[test]
    fn same_representation_does_not_rebuild() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(40, 20));
        let generation = v.generation();
        v.set_representation(Representation::Surface);
        assert_eq!(v.generation(), generation);
    }

    #[test]
    fn empty_selection_clears_scene() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(40, 20));
        v.select_files(vec![cube_file("a.stl", 0.0)]);
        v.poll();
        v.select_files(Vec::new());
        v.poll();
        assert_eq!(v.actor_count(), 0);
        assert!(v.lookup().is_empty());
    }

    #[test]
    fn plain_viewer_draws_white_and_ignores_picks() {
        let mut v = viewer(ViewerConfig {
            annotations: false,
            ..Default::default()
        });
        v.initialize(RecordingSurface::new(40, 20));
        v.select_files(vec![cube_file("a.stl", 0.0)]);
        v.poll();

        assert!(v.color_scheme().is_empty());
        assert_eq!(v.actors_by_file()[0].1.style().color, Rgb::WHITE);
        assert!(!v.set_color("a.stl", Rgb8::new(255, 0, 0)));
        assert_eq!(v.pointer_press(PointerEvent::primary(20.0, 10.0)), None);
    }

    #[test]
    fn non_primary_and_off_scene_presses_keep_label() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(40, 20));
        v.select_files(vec![cube_file("cube.stl", 0.0)]);
        v.poll();
        assert_eq!(v.pointer_press(PointerEvent::primary(20.0, 10.0)), Some("cube.stl"));

        let secondary = PointerEvent {
            button: PointerButton::Secondary,
            position: Some((0.0, 0.0)),
        };
        assert_eq!(v.pointer_press(secondary), Some("cube.stl"));

        let outside = PointerEvent {
            button: PointerButton::Primary,
            position: None,
        };
        assert_eq!(v.pointer_press(outside), Some("cube.stl"));
    }

    #[test]
    fn pick_without_viewport_is_noop() {
        let mut v = viewer(ViewerConfig::default());
        assert_eq!(v.pointer_press(PointerEvent::primary(1.0, 1.0)), None);
    }

    #[test]
    fn reselection_drops_label_of_removed_file() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(40, 20));
        v.select_files(vec![cube_file("cube.stl", 0.0)]);
        v.poll();
        v.pointer_press(PointerEvent::primary(20.0, 10.0));
        v.select_files(vec![cube_file("other.stl", 0.0)]);
        assert_eq!(v.clicked_file(), None);
    }

    #[test]
    fn zero_width_mount_loads_without_drawing() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(0, 20));
        v.select_files(vec![cube_file("a.stl", 0.0)]);
        assert_eq!(v.poll(), 1);
        assert_eq!(v.actor_count(), 1);
        assert_eq!(v.viewport().surface().unwrap().presented, 0);
        assert_eq!(v.pointer_press(PointerEvent::primary(0.0, 0.0)), None);
    }

    #[test]
    fn collapsing_to_zero_width_and_back() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(40, 20));
        v.select_files(vec![cube_file("a.stl", 0.0)]);
        v.poll();

        v.resize(0, 20);
        v.orbit(0.1, 0.1);
        v.redraw();
        assert_eq!(v.pointer_press(PointerEvent::primary(20.0, 10.0)), None);

        v.resize(40, 20);
        assert!(v.viewport().surface().unwrap().last_covered > 0);
        assert_eq!(v.pointer_press(PointerEvent::primary(20.0, 10.0)), Some("a.stl"));
    }

    #[test]
    fn unseeded_viewers_draw_independent_colors() {
        let unseeded = || {
            let mut v: AnnotatedViewer<RecordingSurface> = AnnotatedViewer::with_executor(
                ViewerConfig::default(),
                Box::new(InlineExecutor),
            );
            v.select_files(vec![cube_file("a.stl", 0.0)]);
            v.color_scheme().get("a.stl")
        };
        assert_ne!(unseeded(), unseeded());
    }

    #[test]
    fn teardown_invalidates_pending_decodes() {
        let mut v = viewer(ViewerConfig::default());
        v.initialize(RecordingSurface::new(40, 20));
        v.select_files(vec![cube_file("a.stl", 0.0)]);
        let surface = v.teardown().unwrap();
        assert!(surface.released);
        assert_eq!(v.poll(), 0);
        assert_eq!(v.actor_count(), 0);
        assert!(v.lookup_is_consistent());
    }
}
