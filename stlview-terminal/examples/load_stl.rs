/// Example: Print a one-shot ASCII snapshot of STL files
///
/// Usage: cargo run --example load_stl -- a.stl b.stl
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use stlview_core::{
    AnnotatedViewer, Frame, InlineExecutor, Representation, RenderSurface, ViewerConfig,
};
use stlview_terminal::{read_files, renderer::cell_char};

struct Snapshot {
    width: u32,
    height: u32,
}

impl RenderSurface for Snapshot {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_aspect(&self) -> f32 {
        2.0
    }

    fn present(&mut self, _frame: &Frame) -> stlview_core::Result<()> {
        Ok(())
    }
}

fn main() -> Result<()> {
    let paths: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        bail!("usage: load_stl <stl-file>...");
    }

    let (files, errors) = read_files(&paths);
    for error in &errors {
        eprintln!("{error}");
    }

    let config = ViewerConfig {
        representation: Representation::Surface,
        color_seed: Some(0),
        ..Default::default()
    };
    let mut viewer = AnnotatedViewer::with_executor(config, Box::new(InlineExecutor));
    viewer.initialize(Snapshot {
        width: 80,
        height: 30,
    });
    viewer.select_files(files);
    viewer.settle(Duration::from_secs(5));

    for error in viewer.load_errors() {
        eprintln!("{}: {}", error.file_name, error.error);
    }
    for (name, color) in viewer.color_scheme().iter() {
        println!("{} {name}", color.to_hex());
    }

    if let Some(frame) = viewer.viewport().frame() {
        for y in 0..frame.height() {
            let row: String = (0..frame.width())
                .map(|x| cell_char(frame.fragment(x, y)))
                .collect();
            println!("{}", row.trim_end());
        }
    }

    viewer.teardown();
    Ok(())
}
