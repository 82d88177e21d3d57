//! Common types shared between backends

use glam::{IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};

/// Binding point of a buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data
    Array,
    /// Vertex indices, attached to the bound vertex array
    ElementArray,
    Uniform,
}

/// Expected update frequency of a buffer's data store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// Scalar component type of vertex and index data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalarType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    #[default]
    Float,
}

impl ScalarType {
    /// Size of one component in bytes
    pub fn size(&self) -> u32 {
        match self {
            ScalarType::Byte | ScalarType::UnsignedByte => 1,
            ScalarType::Short | ScalarType::UnsignedShort => 2,
            ScalarType::Int | ScalarType::UnsignedInt | ScalarType::Float => 4,
        }
    }

    /// Whether the type can index vertices in a draw call
    pub fn is_index_type(&self) -> bool {
        matches!(
            self,
            ScalarType::UnsignedByte | ScalarType::UnsignedShort | ScalarType::UnsignedInt
        )
    }
}

/// Element type that can be uploaded into a [`Buffer`](crate::resources::Buffer).
///
/// `COMPONENTS` is the number of scalars per element (the attribute size) and
/// `SCALAR` their type.
pub trait VertexData: bytemuck::Pod {
    const COMPONENTS: u32;
    const SCALAR: ScalarType;
}

/// Element types accepted by index buffers
pub trait IndexData: VertexData {}

macro_rules! impl_vertex_data {
    ($($ty:ty => ($components:expr, $scalar:ident)),* $(,)?) => {
        $(
            impl VertexData for $ty {
                const COMPONENTS: u32 = $components;
                const SCALAR: ScalarType = ScalarType::$scalar;
            }
        )*
    };
}

impl_vertex_data! {
    i8 => (1, Byte),
    u8 => (1, UnsignedByte),
    i16 => (1, Short),
    u16 => (1, UnsignedShort),
    i32 => (1, Int),
    u32 => (1, UnsignedInt),
    f32 => (1, Float),
    [f32; 2] => (2, Float),
    [f32; 3] => (3, Float),
    [f32; 4] => (4, Float),
    Vec2 => (2, Float),
    Vec3 => (3, Float),
    Vec4 => (4, Float),
    IVec2 => (2, Int),
    IVec3 => (3, Int),
    IVec4 => (4, Int),
    UVec2 => (2, UnsignedInt),
    UVec3 => (3, UnsignedInt),
    UVec4 => (4, UnsignedInt),
}

impl IndexData for u8 {}
impl IndexData for u16 {}
impl IndexData for u32 {}

/// Primitive assembly mode for draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTarget {
    #[default]
    Texture2d,
    Texture3d,
}

/// 8-bit per channel pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Format for an image with the given channel count, if supported
    pub fn from_channels(channels: u32) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::R8),
            2 => Some(PixelFormat::Rg8),
            3 => Some(PixelFormat::Rgb8),
            4 => Some(PixelFormat::Rgba8),
            _ => None,
        }
    }

    pub fn channels(&self) -> u32 {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Pixel upload description passed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageExtent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Filter mode for samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Address mode for samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// A single sampler state value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplerParameter {
    /// Minification filter, with an optional filter between mip levels
    MinFilter {
        filter: FilterMode,
        mipmap: Option<FilterMode>,
    },
    MagFilter(FilterMode),
    WrapS(AddressMode),
    WrapT(AddressMode),
    WrapR(AddressMode),
    MinLod(f32),
    MaxLod(f32),
    MaxAnisotropy(f32),
}

/// Sampler descriptor
#[derive(Debug, Clone)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    /// `None` disables sampling from mip levels
    pub mipmap_filter: Option<FilterMode>,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
}

impl SamplerDescriptor {
    /// Trilinear filtering with repeating coordinates
    pub fn linear_repeat() -> Self {
        Self {
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Expand the descriptor into individual sampler parameters
    pub fn parameters(&self) -> [SamplerParameter; 5] {
        [
            SamplerParameter::MinFilter {
                filter: self.min_filter,
                mipmap: self.mipmap_filter,
            },
            SamplerParameter::MagFilter(self.mag_filter),
            SamplerParameter::WrapS(self.address_mode_u),
            SamplerParameter::WrapT(self.address_mode_v),
            SamplerParameter::WrapR(self.address_mode_w),
        ]
    }
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: Some(FilterMode::Linear),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
        }
    }
}

/// Server-side capabilities toggled with enable/disable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
}

/// Buffers cleared by a clear call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearFlags(u32);

impl ClearFlags {
    pub const COLOR: Self = Self(1 << 0);
    pub const DEPTH: Self = Self(1 << 1);
    pub const STENCIL: Self = Self(1 << 2);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for ClearFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Value assigned to a uniform variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Uint(u32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

/// Host types that can be assigned to a uniform
pub trait Uniform {
    fn to_uniform(&self) -> UniformValue;
}

macro_rules! impl_uniform {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Uniform for $ty {
                fn to_uniform(&self) -> UniformValue {
                    UniformValue::$variant(*self)
                }
            }
        )*
    };
}

impl_uniform! {
    i32 => Int,
    u32 => Uint,
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat2 => Mat2,
    Mat3 => Mat3,
    Mat4 => Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_data_layouts() {
        assert_eq!(<Vec3 as VertexData>::COMPONENTS, 3);
        assert_eq!(<Vec3 as VertexData>::SCALAR, ScalarType::Float);
        assert_eq!(<u16 as VertexData>::SCALAR, ScalarType::UnsignedShort);
        assert_eq!(<[f32; 2] as VertexData>::COMPONENTS, 2);
        assert_eq!(<UVec4 as VertexData>::SCALAR, ScalarType::UnsignedInt);
    }

    #[test]
    fn test_index_types() {
        assert!(ScalarType::UnsignedInt.is_index_type());
        assert!(ScalarType::UnsignedByte.is_index_type());
        assert!(!ScalarType::Float.is_index_type());
        assert!(!ScalarType::Int.is_index_type());
    }

    #[test]
    fn test_pixel_format_from_channels() {
        assert_eq!(PixelFormat::from_channels(1), Some(PixelFormat::R8));
        assert_eq!(PixelFormat::from_channels(4), Some(PixelFormat::Rgba8));
        assert_eq!(PixelFormat::from_channels(0), None);
        assert_eq!(PixelFormat::from_channels(5), None);
        assert_eq!(PixelFormat::Rgb8.channels(), 3);
    }

    #[test]
    fn test_clear_flags() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert!(flags.contains(ClearFlags::COLOR));
        assert!(flags.contains(ClearFlags::DEPTH));
        assert!(!flags.contains(ClearFlags::STENCIL));
    }

    #[test]
    fn test_sampler_descriptor_parameters() {
        let params = SamplerDescriptor::linear_repeat().parameters();
        assert_eq!(params[1], SamplerParameter::MagFilter(FilterMode::Linear));
        assert_eq!(params[2], SamplerParameter::WrapS(AddressMode::Repeat));
        assert_eq!(
            params[0],
            SamplerParameter::MinFilter {
                filter: FilterMode::Linear,
                mipmap: Some(FilterMode::Linear),
            }
        );
    }

    #[test]
    fn test_uniform_conversion() {
        assert_eq!(2.5f32.to_uniform(), UniformValue::Float(2.5));
        assert_eq!(Mat4::IDENTITY.to_uniform(), UniformValue::Mat4(Mat4::IDENTITY));
    }
}
