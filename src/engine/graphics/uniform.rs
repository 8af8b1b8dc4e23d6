use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::engine::graphics::driver::GraphicsDriver;

/// A host value that can be written into a uniform slot.
pub trait UniformValue {
    fn upload<D: GraphicsDriver>(&self, driver: &D, location: &D::UniformLocation);
}

impl UniformValue for i32 {
    fn upload<D: GraphicsDriver>(&self, driver: &D, location: &D::UniformLocation) {
        driver.uniform_1_i32(location, *self);
    }
}

impl UniformValue for f32 {
    fn upload<D: GraphicsDriver>(&self, driver: &D, location: &D::UniformLocation) {
        driver.uniform_1_f32(location, *self);
    }
}

impl UniformValue for Vec2 {
    fn upload<D: GraphicsDriver>(&self, driver: &D, location: &D::UniformLocation) {
        driver.uniform_2_f32(location, self.x, self.y);
    }
}

impl UniformValue for Vec3 {
    fn upload<D: GraphicsDriver>(&self, driver: &D, location: &D::UniformLocation) {
        driver.uniform_3_f32(location, self.x, self.y, self.z);
    }
}

impl UniformValue for Vec4 {
    fn upload<D: GraphicsDriver>(&self, driver: &D, location: &D::UniformLocation) {
        driver.uniform_4_f32(location, self.x, self.y, self.z, self.w);
    }
}

// Column-major, which is what GLSL expects without transposing.
impl UniformValue for Mat4 {
    fn upload<D: GraphicsDriver>(&self, driver: &D, location: &D::UniformLocation) {
        driver.uniform_matrix_4_f32(location, &self.to_cols_array());
    }
}
