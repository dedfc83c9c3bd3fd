use super::Vec3;

/// Earth-centered, Earth-fixed Cartesian coordinates (meters).
///
/// This is the native Cartesian frame of the globe engine.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ecef {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Ecef {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl std::ops::Sub for Ecef {
    type Output = Vec3;

    fn sub(self, other: Self) -> Vec3 {
        self.as_vec3() - other.as_vec3()
    }
}
