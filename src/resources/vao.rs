//! Vertex array object with its vertex and index buffers.

use std::rc::Rc;

use crate::backend::{
    BackendError, BackendResult, BufferTarget, GraphicsBackend, IndexData, PrimitiveTopology,
    VertexArrayHandle, VertexData,
};
use crate::resources::Buffer;

/// A vertex array object.
///
/// Slot `i` holds the buffer feeding vertex attribute `i`. Slot buffers are
/// reference-counted so a slave vertex array can reuse them with its own
/// attribute bindings. The index buffer is owned exclusively.
pub struct Vao<B: GraphicsBackend> {
    backend: Rc<B>,
    handle: VertexArrayHandle,
    vbos: Vec<Option<Rc<Buffer<B>>>>,
    ibo: Buffer<B>,
}

impl<B: GraphicsBackend> Vao<B> {
    /// Create a vertex array with `vbo_count` attribute slots.
    pub fn new(backend: Rc<B>, vbo_count: u32) -> BackendResult<Self> {
        let max = backend.max_vertex_attribs();
        if vbo_count > max {
            return Err(BackendError::TooManyAttributes {
                requested: vbo_count,
                max,
            });
        }

        let ibo = Buffer::new(backend.clone(), BufferTarget::ElementArray)?;
        let handle = backend.create_vertex_array()?;
        log::trace!(
            "Created vertex array {} with {} slots",
            handle.raw(),
            vbo_count
        );

        Ok(Self {
            backend,
            handle,
            vbos: (0..vbo_count).map(|_| None).collect(),
            ibo,
        })
    }

    pub fn bind(&self) {
        self.backend.bind_vertex_array(Some(self.handle));
    }

    pub fn unbind(&self) {
        self.backend.bind_vertex_array(None);
    }

    /// Upload `data` into a fresh buffer and bind it to attribute `index`.
    pub fn set_vbo<T: VertexData>(&mut self, index: u32, data: &[T]) -> BackendResult<()> {
        self.check_slot(index)?;
        let mut buffer = Buffer::new(self.backend.clone(), BufferTarget::Array)?;
        buffer.set_data(data);
        self.set_shared_vbo(index, Rc::new(buffer))
    }

    /// Bind an existing, possibly shared, buffer to attribute `index`.
    pub fn set_shared_vbo(&mut self, index: u32, buffer: Rc<Buffer<B>>) -> BackendResult<()> {
        self.check_slot(index)?;
        if buffer.target() != BufferTarget::Array {
            return Err(BackendError::InvalidParameter(format!(
                "attribute {index} needs an array buffer, got {:?}",
                buffer.target()
            )));
        }
        if buffer.is_empty() {
            return Err(BackendError::EmptyBuffer(format!(
                "buffer for attribute slot {index} has no data"
            )));
        }
        self.vbos[index as usize] = Some(buffer);

        self.bind();
        let result = self.encapsulate_vbo(index);
        self.unbind();
        result
    }

    /// Upload the index buffer. It stays attached to this vertex array.
    pub fn set_ibo<I: IndexData>(&mut self, indices: &[I]) {
        self.bind();
        self.ibo.bind();
        self.ibo.upload(indices);
        self.unbind();
    }

    /// Describe attribute `index` from its slot buffer. The vertex array must be bound.
    pub fn encapsulate_vbo(&self, index: u32) -> BackendResult<()> {
        self.check_slot(index)?;
        let buffer = self.vbos[index as usize].as_ref().ok_or_else(|| {
            BackendError::EmptyBuffer(format!("no buffer in attribute slot {index}"))
        })?;
        if buffer.is_empty() {
            return Err(BackendError::EmptyBuffer(format!(
                "buffer in attribute slot {index} has no data"
            )));
        }

        self.backend.enable_vertex_attrib_array(index);
        buffer.bind();
        self.backend.vertex_attrib_pointer(
            index,
            buffer.attribute_size(),
            buffer.attribute_type(),
            false,
        );
        buffer.unbind();
        Ok(())
    }

    /// Create a vertex array sharing this one's vertex buffers.
    ///
    /// The slave gets its own attribute bindings and an empty index buffer.
    pub fn make_slave_vao(&self) -> BackendResult<Vao<B>> {
        let mut slave = Vao::new(self.backend.clone(), self.vbo_count())?;
        slave.vbos = self.vbos.clone();

        slave.bind();
        let result = (0..slave.vbo_count())
            .filter(|index| slave.vbos[*index as usize].is_some())
            .try_for_each(|index| slave.encapsulate_vbo(index));
        slave.unbind();
        result?;

        log::debug!(
            "Created slave vertex array {} of {}",
            slave.handle.raw(),
            self.handle.raw()
        );
        Ok(slave)
    }

    /// Draw the indexed geometry.
    pub fn draw(&self, topology: PrimitiveTopology) -> BackendResult<()> {
        if self.ibo.is_empty() {
            return Err(BackendError::EmptyBuffer(format!(
                "vertex array {} has no indices",
                self.handle.raw()
            )));
        }
        if !self.ibo.attribute_type().is_index_type() {
            return Err(BackendError::InvalidParameter(format!(
                "{:?} cannot index vertices",
                self.ibo.attribute_type()
            )));
        }

        self.bind();
        self.backend.draw_elements(
            topology,
            self.ibo.attribute_count(),
            self.ibo.attribute_type(),
        );
        self.unbind();
        Ok(())
    }

    /// Buffer in attribute slot `index`, if any.
    pub fn vbo(&self, index: u32) -> Option<&Rc<Buffer<B>>> {
        self.vbos.get(index as usize).and_then(|slot| slot.as_ref())
    }

    pub fn vbo_count(&self) -> u32 {
        self.vbos.len() as u32
    }

    pub fn ibo(&self) -> &Buffer<B> {
        &self.ibo
    }

    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }

    fn check_slot(&self, index: u32) -> BackendResult<()> {
        if index >= self.vbo_count() {
            return Err(BackendError::InvalidAttributeSlot {
                index,
                count: self.vbo_count(),
            });
        }
        Ok(())
    }
}

impl<B: GraphicsBackend> Drop for Vao<B> {
    fn drop(&mut self) {
        log::trace!("Deleting vertex array {}", self.handle.raw());
        self.backend.delete_vertex_array(self.handle);
    }
}
