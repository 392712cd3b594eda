/// Software rasterizer producing a color + depth frame
use nalgebra::Matrix4;

use crate::color::Rgb;
use crate::projection::Camera;
use crate::representation::Representation;
use crate::scene::{Actor, Scene};

/// Ambient floor of the headlight shading
const AMBIENT: f32 = 0.2;

/// A covered pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub color: Rgb,
    /// Light intensity in [0, 1] the color was shaded with
    pub intensity: f32,
}

/// Render target shared by every front end
#[derive(Debug, Clone)]
pub struct Frame {
    width: usize,
    height: usize,
    background: Rgb,
    depth_buffer: Vec<f32>,
    fragments: Vec<Option<Fragment>>,
}

impl Frame {
    pub fn new(width: usize, height: usize, background: Rgb) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            background,
            depth_buffer: vec![f32::INFINITY; size],
            fragments: vec![None; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.fragments.fill(None);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Frame::new(width, height, self.background);
    }

    pub fn fragment(&self, x: usize, y: usize) -> Option<Fragment> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.fragments[y * self.width + x]
    }

    pub fn covered_pixels(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_some()).count()
    }

    /// Row-major RGBA bytes, background where nothing was drawn
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.fragments.len() * 4);
        for fragment in &self.fragments {
            let c = fragment.map(|f| f.color).unwrap_or(self.background).to_rgb8();
            out.extend_from_slice(&[c.r, c.g, c.b, 255]);
        }
        out
    }

    fn plot(&mut self, x: i32, y: i32, depth: f32, fragment: Fragment) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth <= self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.fragments[idx] = Some(fragment);
        }
    }
}

/// Draw every actor of `scene` into `frame` as seen from `camera`
pub fn render_scene(frame: &mut Frame, scene: &Scene, camera: &Camera) {
    frame.clear();
    let view_projection = camera.view_projection();
    for actor in scene.actors() {
        render_actor(frame, actor, camera, &view_projection);
    }
}

type ScreenPoint = (f32, f32, f32);

fn render_actor(frame: &mut Frame, actor: &Actor, camera: &Camera, view_projection: &Matrix4<f32>) {
    let style = actor.style();
    let (w, h) = (frame.width as u32, frame.height as u32);
    let eye = camera.eye_direction();

    for triangle in &actor.mesh().triangles {
        let mut screen = [(0.0, 0.0, 0.0); 3];
        let mut visible = true;
        for (slot, vertex) in screen.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(&vertex.position, view_projection, w, h) {
                Some(p) => *slot = p,
                None => {
                    visible = false;
                    break;
                }
            }
        }
        // Triangle crosses the near plane or lies behind the camera
        if !visible {
            continue;
        }

        match style.representation {
            Representation::Surface => {
                // Two-sided headlight so back faces are not black
                let intensity = AMBIENT + (1.0 - AMBIENT) * triangle.calculate_normal().dot(&eye).abs();
                let fragment = Fragment {
                    color: style.color.scaled(intensity),
                    intensity,
                };
                rasterize_triangle(frame, &screen, fragment);
            }
            Representation::Wireframe => {
                let fragment = Fragment {
                    color: style.color,
                    intensity: 1.0,
                };
                for i in 0..3 {
                    rasterize_line(frame, screen[i], screen[(i + 1) % 3], fragment);
                }
            }
            Representation::Points => {
                let fragment = Fragment {
                    color: style.color,
                    intensity: 1.0,
                };
                for &(x, y, z) in &screen {
                    frame.plot(x.floor() as i32, y.floor() as i32, z, fragment);
                }
            }
        }
    }
}

fn rasterize_triangle(frame: &mut Frame, coords: &[ScreenPoint; 3], fragment: Fragment) {
    let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

    // Bounding box
    let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
    let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
    let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
    let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

    // Clip to screen bounds
    let min_x = min_x.max(0);
    let max_x = max_x.min(frame.width as i32 - 1);
    let min_y = min_y.max(0);
    let max_y = max_y.min(frame.height as i32 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            if let Some((w0, w1, w2)) = barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py)) {
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                    frame.plot(x, y, depth, fragment);
                }
            }
        }
    }
}

fn rasterize_line(frame: &mut Frame, a: ScreenPoint, b: ScreenPoint, fragment: Fragment) {
    let Some((a, b)) = clip_segment(a, b, frame.width as f32, frame.height as f32) else {
        return;
    };

    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = a.0 + (b.0 - a.0) * t;
        let y = a.1 + (b.1 - a.1) * t;
        let z = a.2 + (b.2 - a.2) * t;
        frame.plot(x.floor() as i32, y.floor() as i32, z, fragment);
    }
}

/// Liang-Barsky clip of a screen segment to `[0, width] x [0, height]`
fn clip_segment(a: ScreenPoint, b: ScreenPoint, width: f32, height: f32) -> Option<(ScreenPoint, ScreenPoint)> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    for (p, q) in [(-dx, a.0), (dx, width - a.0), (-dy, a.1), (dy, height - a.1)] {
        if p.abs() < 1e-9 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    let lerp = |t: f32| (a.0 + dx * t, a.1 + dy * t, a.2 + (b.2 - a.2) * t);
    Some((lerp(t0), lerp(t1)))
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(v0: (f32, f32), v1: (f32, f32), v2: (f32, f32), p: (f32, f32)) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
