use std::marker::PhantomData;
use std::mem::size_of;
use std::rc::Rc;

use bytemuck::Pod;
use log::{debug, warn};

use crate::engine::graphics::buffer::{BufferObject, IndexElement};
use crate::engine::graphics::context::GraphicsContext;
use crate::engine::graphics::driver::{AttribType, BufferKind, GraphicsDriver, Primitive};
use crate::engine::graphics::error::{GraphicsError, GraphicsResult};

/// How one shader input reads the vertex buffer. Stride and offset are in
/// units of the vertex buffer's element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub index: u32,
    pub components: u32,
    pub ty: AttribType,
    pub stride: usize,
    pub offset: usize,
}

/// Attribute layout plus the vertex and index buffers a draw reads from.
///
/// The buffers are referenced, not owned: only their handles and lengths are
/// kept, and they must stay alive for as long as this array is drawn.
pub struct VertexArrayObject<D: GraphicsDriver, V: Pod, I: IndexElement> {
    context: Rc<GraphicsContext<D>>,
    handle: D::VertexArray,
    vertex_buffer: D::Buffer,
    vertex_len: usize,
    index_count: usize,
    attributes: Vec<VertexAttribute>,
    _layout: PhantomData<(V, I)>,
}

impl<D: GraphicsDriver, V: Pod, I: IndexElement> VertexArrayObject<D, V, I> {
    /// Allocates the array, binds it and records both buffers as its sources.
    pub fn create(
        context: &Rc<GraphicsContext<D>>,
        vertices: &BufferObject<D, V>,
        indices: &BufferObject<D, I>,
    ) -> GraphicsResult<Self> {
        let handle = context
            .driver()
            .create_vertex_array()
            .map_err(GraphicsError::allocation("vertex array"))?;
        let vao = Self {
            context: Rc::clone(context),
            handle,
            vertex_buffer: vertices.handle(),
            vertex_len: vertices.len(),
            index_count: indices.len(),
            attributes: Vec::new(),
            _layout: PhantomData,
        };

        vao.bind();
        context.bind_buffer(BufferKind::VertexData, Some(vertices.handle()));
        context.bind_buffer(BufferKind::IndexData, Some(indices.handle()));
        debug!(
            "[vao] Created {:?} over {} vertex elements and {} indices",
            handle, vao.vertex_len, vao.index_count
        );

        Ok(vao)
    }

    /// Enables slot `index` and describes how it reads the vertex buffer.
    ///
    /// Setting the same index again replaces the earlier description.
    pub fn set_attribute(
        &mut self,
        index: u32,
        components: u32,
        ty: AttribType,
        stride: usize,
        offset: usize,
    ) -> GraphicsResult<()> {
        if !(1..=4).contains(&components) {
            return Err(GraphicsError::InvalidAttribute {
                index,
                reason: format!("component count must be 1 to 4, got {components}"),
            });
        }
        let stride_bytes = byte_span::<V>(index, "stride", stride)?;
        let offset_bytes = byte_span::<V>(index, "offset", offset)?;

        // The pointer captures the current array buffer, so both bindings
        // must be ours at this point.
        if self.context.bound_vertex_array() != Some(self.handle) {
            self.bind();
        }
        if self.context.bound_array_buffer() != Some(self.vertex_buffer) {
            self.context.bind_buffer(BufferKind::VertexData, Some(self.vertex_buffer));
        }
        let driver = self.context.driver();
        driver.enable_vertex_attrib_array(index);
        driver.vertex_attrib_pointer(index, components as i32, ty, false, stride_bytes, offset_bytes);

        let attribute = VertexAttribute { index, components, ty, stride, offset };
        match self.attributes.iter_mut().find(|a| a.index == index) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
        Ok(())
    }

    pub fn bind(&self) {
        self.context.bind_vertex_array(Some(self.handle));
    }

    /// Draws every index.
    pub fn draw(&self, primitive: Primitive) {
        self.draw_count(primitive, self.index_count);
    }

    /// Draws the first `count` indices, capped at the index buffer length.
    pub fn draw_count(&self, primitive: Primitive, count: usize) {
        let count = if count > self.index_count {
            warn!("[vao] Requested {} indices but only {} exist", count, self.index_count);
            self.index_count
        } else {
            count
        };
        self.bind();
        self.context
            .driver()
            .draw_elements(primitive, count as i32, I::INDEX_TYPE, 0);
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Whole vertices every described attribute can read, which bounds the
    /// largest valid index.
    pub fn vertex_count(&self) -> usize {
        let total = self.vertex_len * size_of::<V>();
        self.attributes
            .iter()
            .map(|a| {
                let element = a.components as usize * a.ty.size_in_bytes();
                let stride = if a.stride == 0 { element } else { a.stride * size_of::<V>() };
                let first = a.offset * size_of::<V>();
                if total < first + element {
                    0
                } else {
                    (total - first - element) / stride + 1
                }
            })
            .min()
            .unwrap_or(0)
    }

    pub fn handle(&self) -> D::VertexArray {
        self.handle
    }

    /// Releases the vertex array. The referenced buffers are untouched.
    pub fn dispose(self) {}
}

impl<D: GraphicsDriver, V: Pod, I: IndexElement> Drop for VertexArrayObject<D, V, I> {
    fn drop(&mut self) {
        self.context.delete_vertex_array(self.handle);
    }
}

/// Converts a length in elements of `V` to the byte count GL expects.
fn byte_span<V>(index: u32, what: &str, elements: usize) -> GraphicsResult<i32> {
    elements
        .checked_mul(size_of::<V>())
        .and_then(|bytes| i32::try_from(bytes).ok())
        .ok_or_else(|| GraphicsError::InvalidAttribute {
            index,
            reason: format!("{what} of {elements} elements is out of range"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graphics::headless::{AttribPointer, HeadlessDriver};

    fn quad(ctx: &Rc<GraphicsContext<HeadlessDriver>>) -> (BufferObject<HeadlessDriver, f32>, BufferObject<HeadlessDriver, u32>) {
        let vertices: [f32; 20] = [
            0.5, 0.5, 0.0, 1.0, 0.0,
            0.5, -0.5, 0.0, 1.0, 1.0,
            -0.5, -0.5, 0.0, 0.0, 1.0,
            -0.5, 0.5, 0.0, 0.0, 0.0,
        ];
        let vbo = BufferObject::create(ctx, &vertices, BufferKind::VertexData).unwrap();
        let ebo = BufferObject::create(ctx, &[0u32, 1, 3, 1, 2, 3], BufferKind::IndexData).unwrap();
        (vbo, ebo)
    }

    #[test]
    fn test_attribute_bytes_scale_with_vertex_type() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let (vbo, ebo) = quad(&ctx);
        let mut vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
        vao.set_attribute(0, 3, AttribType::Float, 5, 0).unwrap();
        vao.set_attribute(1, 2, AttribType::Float, 5, 3).unwrap();

        let snapshot = ctx.driver().vertex_array(vao.handle()).unwrap();
        assert_eq!(snapshot.element_buffer, Some(ebo.handle()));
        assert_eq!(
            snapshot.attributes[&1],
            AttribPointer {
                enabled: true,
                components: 2,
                ty: AttribType::Float,
                normalized: false,
                stride: 20,
                offset: 12,
                buffer: Some(vbo.handle()),
            }
        );
        assert_eq!(vao.vertex_count(), 4);
    }

    #[test]
    fn test_invalid_component_count_rejected() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let (vbo, ebo) = quad(&ctx);
        let mut vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
        ctx.driver().clear_calls();

        let err = vao.set_attribute(2, 5, AttribType::Float, 5, 0).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidAttribute { index: 2, .. }));
        assert!(ctx.driver().calls().is_empty());
        assert!(vao.attributes().is_empty());
    }

    #[test]
    fn test_oversized_stride_and_offset_rejected() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let (vbo, ebo) = quad(&ctx);
        let mut vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
        ctx.driver().clear_calls();

        let err = vao.set_attribute(0, 3, AttribType::Float, usize::MAX / 2, 0).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidAttribute { index: 0, .. }));
        let err = vao.set_attribute(1, 2, AttribType::Float, 5, usize::MAX).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidAttribute { index: 1, .. }));
        // Fits in usize but not in a GL int.
        let err = vao.set_attribute(1, 2, AttribType::Float, 5, i32::MAX as usize).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidAttribute { index: 1, .. }));

        assert!(ctx.driver().calls().is_empty());
        assert!(vao.attributes().is_empty());
    }

    #[test]
    fn test_set_attribute_rebinds_own_vertex_buffer() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let (vbo, ebo) = quad(&ctx);
        let mut vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
        let other = BufferObject::create(&ctx, &[0.0f32; 3], BufferKind::VertexData).unwrap();
        assert_eq!(ctx.bound_array_buffer(), Some(other.handle()));

        vao.set_attribute(0, 3, AttribType::Float, 5, 0).unwrap();
        let snapshot = ctx.driver().vertex_array(vao.handle()).unwrap();
        assert_eq!(snapshot.attributes[&0].buffer, Some(vbo.handle()));
    }

    #[test]
    fn test_dispose_keeps_buffers() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let (vbo, ebo) = quad(&ctx);
        let vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
        vao.dispose();
        assert_eq!(ctx.driver().live_vertex_arrays(), 0);
        assert_eq!(ctx.driver().live_buffers(), 2);
        assert_eq!(ctx.bound_vertex_array(), None);
    }

    #[test]
    fn test_draw_count_is_capped() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let (vbo, ebo) = quad(&ctx);
        let mut vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
        vao.set_attribute(0, 3, AttribType::Float, 5, 0).unwrap();
        vao.draw_count(Primitive::Triangles, 100);

        let calls = ctx.driver().calls().to_vec();
        assert!(matches!(
            calls.last(),
            Some(crate::engine::graphics::headless::DriverCall::DrawElements { count: 6, .. })
        ));
    }
}
