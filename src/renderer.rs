use crate::bitmap::Bitmap;
use crate::error::PanoramaResult;
use crate::format::PixelFormat;
use crate::node::NodeId;
use bitflags::bitflags;
use glam::Vec3;
use std::fmt;
use std::rc::Rc;

pub mod headless;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u8 {
        const GENERATE_MIPMAPS = 1 << 0;
        const SRGB = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub format: PixelFormat,
    pub flags: TextureFlags,
    pub stereo_mode: Option<String>,
}

impl TextureDescriptor {
    /// Background textures are mipmapped and sampled linearly.
    pub fn background(format: PixelFormat, stereo_mode: Option<&str>) -> Self {
        Self { format, flags: TextureFlags::GENERATE_MIPMAPS, stereo_mode: stereo_mode.map(str::to_string) }
    }
}

/// A renderer object that wraps native memory and must be released explicitly.
pub trait GpuResource {
    fn id(&self) -> ResourceId;
    fn release(&mut self);
}

pub trait ImageResource: GpuResource {
    fn dimensions(&self) -> (u32, u32);
    fn format(&self) -> PixelFormat;
}

pub trait TextureResource: GpuResource {
    fn descriptor(&self) -> &TextureDescriptor;
    fn source_image(&self) -> ResourceId;
}

/// Object model of the rendering engine the node hands its resources to.
pub trait RenderBackend {
    fn create_image(&self, bitmap: &Bitmap, format: PixelFormat) -> PanoramaResult<Box<dyn ImageResource>>;
    fn create_texture(
        &self,
        image: &dyn ImageResource,
        descriptor: &TextureDescriptor,
    ) -> PanoramaResult<Box<dyn TextureResource>>;
}

/// Background attachment point of a scene.
pub trait PortalScene {
    fn set_background_texture(&self, texture: &dyn TextureResource);
    fn set_background_rotation(&self, rotation: Vec3);
}

/// Resolves the portal enclosing a node, if the node currently sits under one.
pub trait SceneHandle {
    fn portal_for(&self, node: NodeId) -> Option<Rc<dyn PortalScene>>;
}

/// Exclusive owner of one renderer resource. Releases it exactly once, either through
/// [`Owned::release`] or when dropped.
pub struct Owned<R: GpuResource + ?Sized> {
    inner: Box<R>,
    released: bool,
}

impl<R: GpuResource + ?Sized> Owned<R> {
    pub fn new(inner: Box<R>) -> Self {
        Self { inner, released: false }
    }

    pub fn id(&self) -> ResourceId {
        self.inner.id()
    }

    pub fn get(&self) -> &R {
        &self.inner
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.release();
        }
    }
}

impl<R: GpuResource + ?Sized> Drop for Owned<R> {
    fn drop(&mut self) {
        self.release_inner();
    }
}
