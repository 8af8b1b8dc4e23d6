//! Owning wrapper around a driver that mirrors its global binding state.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use log::trace;

use crate::engine::graphics::driver::{BufferKind, GraphicsDriver};

/// The single graphics context every resource wrapper hangs off.
///
/// OpenGL keeps "currently bound" objects as global state: one program in
/// use, one vertex array, one active texture unit and one 2D texture per
/// unit. Every bind issued through this type is mirrored here so callers and
/// tests can see which object a draw call will pick up. Binding a new object
/// replaces the previous occupant of that slot; deleting a bound object
/// leaves the slot empty, as the driver does.
///
/// The context is shared as `Rc<GraphicsContext<D>>`, which keeps wrappers on
/// the thread that owns the context.
pub struct GraphicsContext<D: GraphicsDriver> {
    driver: D,
    program: Cell<Option<D::Program>>,
    vertex_array: Cell<Option<D::VertexArray>>,
    array_buffer: Cell<Option<D::Buffer>>,
    active_unit: Cell<u32>,
    textures: RefCell<BTreeMap<u32, D::Texture>>,
}

impl<D: GraphicsDriver> GraphicsContext<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            program: Cell::new(None),
            vertex_array: Cell::new(None),
            array_buffer: Cell::new(None),
            active_unit: Cell::new(0),
            textures: RefCell::new(BTreeMap::new()),
        }
    }

    /// Raw driver access for calls that do not touch binding state.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn use_program(&self, program: Option<D::Program>) {
        trace!("use program {:?}", program);
        self.driver.use_program(program);
        self.program.set(program);
    }

    pub fn current_program(&self) -> Option<D::Program> {
        self.program.get()
    }

    pub fn bind_vertex_array(&self, vertex_array: Option<D::VertexArray>) {
        trace!("bind vertex array {:?}", vertex_array);
        self.driver.bind_vertex_array(vertex_array);
        self.vertex_array.set(vertex_array);
    }

    pub fn bound_vertex_array(&self) -> Option<D::VertexArray> {
        self.vertex_array.get()
    }

    /// Index-buffer bindings are part of the bound vertex array's state, so
    /// only the vertex-data target is mirrored here.
    pub fn bind_buffer(&self, kind: BufferKind, buffer: Option<D::Buffer>) {
        trace!("bind {:?} buffer {:?}", kind, buffer);
        self.driver.bind_buffer(kind, buffer);
        if kind == BufferKind::VertexData {
            self.array_buffer.set(buffer);
        }
    }

    pub fn bound_array_buffer(&self) -> Option<D::Buffer> {
        self.array_buffer.get()
    }

    /// Selects `unit` and binds `texture` to its 2D target.
    pub fn bind_texture(&self, unit: u32, texture: Option<D::Texture>) {
        trace!("bind texture {:?} to unit {}", texture, unit);
        self.driver.active_texture(unit);
        self.active_unit.set(unit);
        self.driver.bind_texture_2d(texture);
        let mut textures = self.textures.borrow_mut();
        match texture {
            Some(texture) => {
                textures.insert(unit, texture);
            }
            None => {
                textures.remove(&unit);
            }
        }
    }

    pub fn active_texture_unit(&self) -> u32 {
        self.active_unit.get()
    }

    pub fn bound_texture(&self, unit: u32) -> Option<D::Texture> {
        self.textures.borrow().get(&unit).copied()
    }

    pub(crate) fn delete_program(&self, program: D::Program) {
        self.driver.delete_program(program);
        if self.program.get() == Some(program) {
            self.program.set(None);
        }
    }

    pub(crate) fn delete_texture(&self, texture: D::Texture) {
        self.driver.delete_texture(texture);
        self.textures.borrow_mut().retain(|_, bound| *bound != texture);
    }

    pub(crate) fn delete_buffer(&self, buffer: D::Buffer) {
        self.driver.delete_buffer(buffer);
        if self.array_buffer.get() == Some(buffer) {
            self.array_buffer.set(None);
        }
    }

    pub(crate) fn delete_vertex_array(&self, vertex_array: D::VertexArray) {
        self.driver.delete_vertex_array(vertex_array);
        if self.vertex_array.get() == Some(vertex_array) {
            self.vertex_array.set(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graphics::headless::HeadlessDriver;

    #[test]
    fn test_binding_replaces_previous_texture_on_unit() {
        let ctx = GraphicsContext::new(HeadlessDriver::new());
        let a = ctx.driver().create_texture().unwrap();
        let b = ctx.driver().create_texture().unwrap();

        ctx.bind_texture(0, Some(a));
        ctx.bind_texture(1, Some(b));
        assert_eq!(ctx.bound_texture(0), Some(a));
        assert_eq!(ctx.active_texture_unit(), 1);

        ctx.bind_texture(0, Some(b));
        assert_eq!(ctx.bound_texture(0), Some(b));
        assert_eq!(ctx.active_texture_unit(), 0);
    }

    #[test]
    fn test_deleting_bound_objects_clears_slots() {
        let ctx = GraphicsContext::new(HeadlessDriver::new());
        let texture = ctx.driver().create_texture().unwrap();
        let vao = ctx.driver().create_vertex_array().unwrap();

        ctx.bind_texture(3, Some(texture));
        ctx.bind_vertex_array(Some(vao));
        ctx.delete_texture(texture);
        ctx.delete_vertex_array(vao);

        assert_eq!(ctx.bound_texture(3), None);
        assert_eq!(ctx.bound_vertex_array(), None);
        assert_eq!(ctx.driver().state().bound_vertex_array, None);
    }
}
