/// Camera orbit angles
use nalgebra::{Matrix4, Vector3};

/// Pitch stays this far short of the poles so the view never flips over
const POLE_MARGIN: f32 = 0.01;

/// Accumulated orbit around the camera target (radians)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitState {
    /// Rotation about the world x axis, positive looks down from above
    pub pitch: f32,
    /// Rotation about the world y axis
    pub yaw: f32,
}

impl OrbitState {
    pub fn new(pitch: f32, yaw: f32) -> Self {
        let mut state = Self { pitch: 0.0, yaw };
        state.rotate(pitch, 0.0);
        state
    }

    pub fn rotate(&mut self, d_pitch: f32, d_yaw: f32) {
        let limit = std::f32::consts::FRAC_PI_2 - POLE_MARGIN;
        self.pitch = (self.pitch + d_pitch).clamp(-limit, limit);
        self.yaw = (self.yaw + d_yaw) % std::f32::consts::TAU;
    }

    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        let yaw = Matrix4::new_rotation(Vector3::new(0.0, self.yaw, 0.0));
        let pitch = Matrix4::new_rotation(Vector3::new(-self.pitch, 0.0, 0.0));
        yaw * pitch
    }

    /// Unit vector from the target towards the camera
    pub fn eye_direction(&self) -> Vector3<f32> {
        self.rotation_matrix().transform_vector(&Vector3::z())
    }
}
