//! GPU buffer resource.

use std::rc::Rc;

use crate::backend::{
    BackendResult, BufferHandle, BufferTarget, BufferUsage, GraphicsBackend, ScalarType,
    VertexData,
};

/// A GPU buffer object.
///
/// The handle is allocated on construction and released on drop. After
/// [`Buffer::set_data`] the buffer knows how many elements it holds and how each
/// element is laid out, which is what vertex arrays need to describe attributes
/// and draw calls.
///
/// # Example
///
/// ```ignore
/// let mut positions = Buffer::new(backend.clone(), BufferTarget::Array)?;
/// positions.set_data(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
/// assert_eq!(positions.attribute_size(), 3);
/// ```
pub struct Buffer<B: GraphicsBackend> {
    backend: Rc<B>,
    handle: BufferHandle,
    target: BufferTarget,
    usage: BufferUsage,
    attribute_count: u32,
    attribute_size: u32,
    attribute_type: ScalarType,
}

impl<B: GraphicsBackend> Buffer<B> {
    /// Allocate a buffer for `target` with static draw usage.
    pub fn new(backend: Rc<B>, target: BufferTarget) -> BackendResult<Self> {
        Self::with_usage(backend, target, BufferUsage::StaticDraw)
    }

    /// Allocate a buffer with an explicit usage hint.
    pub fn with_usage(
        backend: Rc<B>,
        target: BufferTarget,
        usage: BufferUsage,
    ) -> BackendResult<Self> {
        let handle = backend.create_buffer()?;
        log::trace!("Created {:?} buffer {}", target, handle.raw());
        Ok(Self {
            backend,
            handle,
            target,
            usage,
            attribute_count: 0,
            attribute_size: 0,
            attribute_type: ScalarType::default(),
        })
    }

    pub fn bind(&self) {
        self.backend.bind_buffer(self.target, Some(self.handle));
    }

    pub fn unbind(&self) {
        self.backend.bind_buffer(self.target, None);
    }

    /// Replace the buffer contents. The buffer is bound for the upload and
    /// unbound afterwards.
    pub fn set_data<T: VertexData>(&mut self, data: &[T]) {
        self.bind();
        self.upload(data);
        self.unbind();
    }

    /// Upload into the buffer, which the caller has bound.
    ///
    /// Index buffers use this while their vertex array is bound, since unbinding
    /// them there would detach them from the vertex array.
    pub(crate) fn upload<T: VertexData>(&mut self, data: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.backend.buffer_data(self.target, bytes, self.usage);
        self.attribute_count = data.len() as u32;
        self.attribute_size = T::COMPONENTS;
        self.attribute_type = T::SCALAR;
        log::debug!(
            "Uploaded {} x {}{:?} ({} bytes) to buffer {}",
            self.attribute_count,
            self.attribute_size,
            self.attribute_type,
            bytes.len(),
            self.handle.raw()
        );
    }

    /// Number of elements uploaded.
    pub fn attribute_count(&self) -> u32 {
        self.attribute_count
    }

    /// Number of scalar components per element.
    pub fn attribute_size(&self) -> u32 {
        self.attribute_size
    }

    /// Scalar type of each component.
    pub fn attribute_type(&self) -> ScalarType {
        self.attribute_type
    }

    /// Whether data has been uploaded.
    pub fn is_empty(&self) -> bool {
        self.attribute_count == 0
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }
}

impl<B: GraphicsBackend> Drop for Buffer<B> {
    fn drop(&mut self) {
        log::trace!("Deleting buffer {}", self.handle.raw());
        self.backend.delete_buffer(self.handle);
    }
}

impl<B: GraphicsBackend> std::fmt::Debug for Buffer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("handle", &self.handle.raw())
            .field("target", &self.target)
            .field("count", &self.attribute_count)
            .field("size", &self.attribute_size)
            .field("type", &self.attribute_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, DummyBackend};
    use glam::Vec3;

    #[test]
    fn test_buffer_lifetime() {
        let backend = Rc::new(DummyBackend::new());
        let buffer = Buffer::new(backend.clone(), BufferTarget::Array).unwrap();
        let raw = buffer.handle().raw();
        assert_ne!(raw, 0);
        assert!(backend.is_live(raw));

        drop(buffer);
        assert!(backend.was_deleted(raw));
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_set_data_records_layout() {
        let backend = Rc::new(DummyBackend::new());
        let mut buffer = Buffer::new(backend.clone(), BufferTarget::Array).unwrap();
        assert!(buffer.is_empty());

        buffer.set_data(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        assert_eq!(buffer.attribute_count(), 4);
        assert_eq!(buffer.attribute_size(), 3);
        assert_eq!(buffer.attribute_type(), ScalarType::Float);
        assert_eq!(
            backend.buffer_contents(buffer.handle()).map(|bytes| bytes.len()),
            Some(48)
        );
        assert_eq!(backend.bound_buffer(BufferTarget::Array), None);
    }

    #[test]
    fn test_set_data_replaces_previous_upload() {
        let backend = Rc::new(DummyBackend::new());
        let mut buffer = Buffer::new(backend.clone(), BufferTarget::ElementArray).unwrap();
        buffer.set_data(&[0u32, 1, 2]);
        buffer.set_data(&[0u16, 1, 2, 2, 3, 0]);

        assert_eq!(buffer.attribute_count(), 6);
        assert_eq!(buffer.attribute_type(), ScalarType::UnsignedShort);
        let uploads = backend
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::BufferData { .. }))
            .count();
        assert_eq!(uploads, 2);
    }

    #[test]
    fn test_buffer_debug() {
        let backend = Rc::new(DummyBackend::new());
        let buffer = Buffer::new(backend, BufferTarget::Uniform).unwrap();
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("Buffer"));
        assert!(debug.contains("Uniform"));
    }
}
