/// stlview core - annotated multi-file STL viewer
///
/// Decodes STL files into meshes, keeps one actor per selected file in a
/// software-rendered viewport, and maps clicks back to the file they hit.
/// Front ends supply a [`RenderSurface`] and drive an [`AnnotatedViewer`].

pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod picker;
pub mod pipeline;
pub mod projection;
pub mod raster;
pub mod representation;
pub mod scene;
pub mod stl;
pub mod transform;
pub mod viewer;
pub mod viewport;

// Re-export commonly used types
pub use color::{ColorScheme, Rgb, Rgb8};
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use geometry::{Aabb, Mesh, Triangle, Vertex};
pub use pipeline::{DecodeExecutor, InlineExecutor, LoadedFile, ThreadedExecutor};
pub use projection::Camera;
pub use raster::{Fragment, Frame};
pub use representation::Representation;
pub use scene::{Actor, ActorId, ActorLookup, ActorStyle, Scene};
pub use transform::OrbitState;
pub use viewer::{AnnotatedViewer, LoadError, PointerButton, PointerEvent};
pub use viewport::{RenderSurface, Viewport};
