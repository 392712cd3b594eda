/// stlview web - the annotated STL viewer on an HTML canvas
///
/// Frames from the core rasterizer are copied into the canvas through
/// `ImageData`. Decoding runs inline since the page has no worker threads
/// wired up.
use log::{info, warn};
use stlview_core::{
    AnnotatedViewer, Frame, InlineExecutor, LoadedFile, PointerEvent, RenderSurface,
    Representation, ViewerConfig, ViewerError,
};
use wasm_bindgen::{prelude::*, Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

/// Route `log` output and panic messages to the browser console
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // Already installed when a page loads the module twice
    let _ = console_log::init_with_level(log::Level::Info);
}

fn js_error(error: ViewerError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Render surface backed by a 2D canvas context
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn from_id(canvas_id: &str) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id {canvas_id}")))?
            .dyn_into::<HtmlCanvasElement>()?;
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, context })
    }
}

impl RenderSurface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn present(&mut self, frame: &Frame) -> stlview_core::Result<()> {
        let rgba = frame.to_rgba8();
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&rgba),
            frame.width() as u32,
            frame.height() as u32,
        )
        .map_err(|e| ViewerError::Surface(format!("{e:?}")))?;
        self.context
            .put_image_data(&image, 0.0, 0.0)
            .map_err(|e| ViewerError::Surface(format!("{e:?}")))
    }

    fn release(&mut self) {
        let (width, height) = self.size();
        self.context
            .clear_rect(0.0, 0.0, width as f64, height as f64);
    }
}

#[wasm_bindgen]
pub struct WebViewer {
    viewer: AnnotatedViewer<CanvasSurface>,
    staged: Vec<LoadedFile>,
}

#[wasm_bindgen]
impl WebViewer {
    /// Bind a viewer to the canvas with id `canvas_id`
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, seed: u32) -> Result<WebViewer, JsValue> {
        let surface = CanvasSurface::from_id(canvas_id)?;
        let config = ViewerConfig {
            color_seed: Some(seed as u64),
            ..Default::default()
        };
        let mut viewer = AnnotatedViewer::with_executor(config, Box::new(InlineExecutor));
        viewer.initialize(surface);
        info!("viewer bound to #{canvas_id}");

        Ok(WebViewer {
            viewer,
            staged: Vec::new(),
        })
    }

    /// Stage one file of the next selection
    pub fn stage_file(&mut self, name: String, bytes: &[u8]) {
        self.staged.push(LoadedFile::new(name, bytes.to_vec()));
    }

    /// Replace the selection with the staged files
    pub fn commit_files(&mut self) {
        let files = std::mem::take(&mut self.staged);
        self.viewer.select_files(files);
        self.viewer.poll();
    }

    /// Append the staged files to the selection
    pub fn append_files(&mut self) {
        let files = std::mem::take(&mut self.staged);
        self.viewer.add_files(files);
        self.viewer.poll();
    }

    /// 0 = points, 1 = wireframe, 2 = surface
    pub fn set_representation(&mut self, code: u8) -> Result<(), JsValue> {
        let representation = Representation::try_from(code).map_err(js_error)?;
        self.viewer.set_representation(representation);
        self.viewer.poll();
        Ok(())
    }

    /// Returns false for a malformed color or on a plain viewer
    pub fn set_color(&mut self, name: &str, hex: &str) -> bool {
        let changed = self.viewer.set_color_hex(name, hex);
        if !changed {
            warn!("rejected color {hex:?} for {name}");
        }
        self.viewer.poll();
        changed
    }

    pub fn color_hex(&self, name: &str) -> Option<String> {
        self.viewer.color_scheme().get(name).map(|color| color.to_hex())
    }

    /// Canvas-relative press; returns the file under the pointer
    pub fn pointer_press(&mut self, x: f32, y: f32) -> Option<String> {
        self.viewer
            .pointer_press(PointerEvent::primary(x, y))
            .map(str::to_string)
    }

    pub fn clicked_file(&self) -> Option<String> {
        self.viewer.clicked_file().map(str::to_string)
    }

    pub fn file_names(&self) -> Vec<String> {
        self.viewer
            .files()
            .iter()
            .map(|file| file.name().to_string())
            .collect()
    }

    /// `file: error` for every file of the selection that failed to decode
    pub fn load_errors(&self) -> Vec<String> {
        self.viewer
            .load_errors()
            .iter()
            .map(|e| format!("{}: {}", e.file_name, e.error))
            .collect()
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.viewer.orbit(dx, dy);
    }

    /// Pick up a new canvas size
    pub fn resize(&mut self) {
        let size = self.viewer.viewport().surface().map(|s| s.size());
        if let Some((width, height)) = size {
            self.viewer.resize(width, height);
        }
    }

    pub fn dispose(&mut self) {
        self.staged.clear();
        self.viewer.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_installs_logger_once() {
        start();
        start();
        assert!(log::max_level() >= log::LevelFilter::Info);
    }
}
