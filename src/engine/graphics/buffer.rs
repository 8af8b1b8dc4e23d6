use std::marker::PhantomData;
use std::rc::Rc;

use bytemuck::Pod;
use log::debug;

use crate::engine::graphics::context::GraphicsContext;
use crate::engine::graphics::driver::{BufferKind, GraphicsDriver, IndexType};
use crate::engine::graphics::error::{GraphicsError, GraphicsResult};

/// Element types a draw call can read indices as.
pub trait IndexElement: Pod {
    const INDEX_TYPE: IndexType;
}

impl IndexElement for u8 {
    const INDEX_TYPE: IndexType = IndexType::UnsignedByte;
}

impl IndexElement for u16 {
    const INDEX_TYPE: IndexType = IndexType::UnsignedShort;
}

impl IndexElement for u32 {
    const INDEX_TYPE: IndexType = IndexType::UnsignedInt;
}

/// A write-once GPU buffer holding a slice of `T`.
pub struct BufferObject<D: GraphicsDriver, T: Pod> {
    context: Rc<GraphicsContext<D>>,
    handle: D::Buffer,
    kind: BufferKind,
    len: usize,
    _element: PhantomData<T>,
}

impl<D: GraphicsDriver, T: Pod> BufferObject<D, T> {
    /// Allocates a buffer, binds it to `kind`'s target and uploads `data` as
    /// static storage.
    ///
    /// Index data is uploaded with no vertex array bound, since the element
    /// binding belongs to whichever array is current.
    pub fn create(context: &Rc<GraphicsContext<D>>, data: &[T], kind: BufferKind) -> GraphicsResult<Self> {
        let handle = context
            .driver()
            .create_buffer()
            .map_err(GraphicsError::allocation("buffer"))?;
        let buffer = Self {
            context: Rc::clone(context),
            handle,
            kind,
            len: data.len(),
            _element: PhantomData,
        };

        if kind == BufferKind::IndexData && context.bound_vertex_array().is_some() {
            context.bind_vertex_array(None);
        }
        buffer.bind();
        let bytes: &[u8] = bytemuck::cast_slice(data);
        context.driver().buffer_data_static(kind, bytes);
        debug!("[buffer] Uploaded {} bytes of {:?} to {:?}", bytes.len(), kind, handle);

        Ok(buffer)
    }

    pub fn bind(&self) {
        self.context.bind_buffer(self.kind, Some(self.handle));
    }

    /// Number of `T` elements uploaded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn handle(&self) -> D::Buffer {
        self.handle
    }

    pub fn dispose(self) {}
}

impl<D: GraphicsDriver, T: Pod> Drop for BufferObject<D, T> {
    fn drop(&mut self) {
        self.context.delete_buffer(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graphics::headless::HeadlessDriver;

    #[test]
    fn test_upload_is_byte_exact() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let data = [1.0f32, -2.5, 0.0];
        let buffer = BufferObject::create(&ctx, &data, BufferKind::VertexData).unwrap();

        assert_eq!(buffer.len(), 3);
        assert_eq!(ctx.bound_array_buffer(), Some(buffer.handle()));
        let contents = ctx.driver().buffer_contents(buffer.handle()).unwrap();
        assert_eq!(contents, bytemuck::cast_slice::<f32, u8>(&data));
    }

    #[test]
    fn test_index_upload_leaves_bound_vertex_array_alone() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let vao = ctx.driver().create_vertex_array().unwrap();
        ctx.bind_vertex_array(Some(vao));

        let indices = BufferObject::create(&ctx, &[0u16, 1, 2], BufferKind::IndexData).unwrap();
        assert_eq!(ctx.bound_vertex_array(), None);
        assert_eq!(ctx.driver().vertex_array(vao).unwrap().element_buffer, None);
        assert_eq!(ctx.driver().buffer_contents(indices.handle()).unwrap().len(), 6);
        assert!(ctx.driver().take_errors().is_empty());
    }

    #[test]
    fn test_dispose_releases_handle() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let buffer = BufferObject::create(&ctx, &[7u32; 4], BufferKind::VertexData).unwrap();
        buffer.dispose();
        assert_eq!(ctx.driver().live_buffers(), 0);
        assert_eq!(ctx.bound_array_buffer(), None);
    }
}
