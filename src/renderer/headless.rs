//! Recording renderer used when no native engine is attached (probe runs, tests).

use super::{
    GpuResource, ImageResource, PortalScene, RenderBackend, ResourceId, SceneHandle, TextureDescriptor,
    TextureResource,
};
use crate::bitmap::Bitmap;
use crate::error::{PanoramaError, PanoramaResult};
use crate::format::PixelFormat;
use crate::node::NodeId;
use glam::Vec3;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: ResourceId,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub byte_len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureRecord {
    pub id: ResourceId,
    pub source_image: ResourceId,
    pub descriptor: TextureDescriptor,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessStats {
    pub images_created: usize,
    pub images_released: usize,
    pub textures_created: usize,
    pub textures_released: usize,
    pub double_releases: usize,
    pub last_image: Option<ImageRecord>,
    pub last_texture: Option<TextureRecord>,
}

impl HeadlessStats {
    pub fn live_images(&self) -> usize {
        self.images_created - self.images_released
    }

    pub fn live_textures(&self) -> usize {
        self.textures_created - self.textures_released
    }
}

#[derive(Default)]
pub struct HeadlessRenderer {
    stats: Rc<RefCell<HeadlessStats>>,
    next_id: Cell<u64>,
    texture_failure: RefCell<Option<String>>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats.borrow().clone()
    }

    /// Makes the next `create_texture` call fail with `message`.
    pub fn fail_next_texture(&self, message: impl Into<String>) {
        *self.texture_failure.borrow_mut() = Some(message.into());
    }

    fn allocate_id(&self) -> ResourceId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        ResourceId(id)
    }
}

impl RenderBackend for HeadlessRenderer {
    fn create_image(&self, bitmap: &Bitmap, format: PixelFormat) -> PanoramaResult<Box<dyn ImageResource>> {
        let record = ImageRecord {
            id: self.allocate_id(),
            width: bitmap.width(),
            height: bitmap.height(),
            format,
            byte_len: bitmap.byte_len(),
        };
        {
            let mut stats = self.stats.borrow_mut();
            stats.images_created += 1;
            stats.last_image = Some(record.clone());
        }
        Ok(Box::new(HeadlessImage { record, stats: Rc::clone(&self.stats), released: false }))
    }

    fn create_texture(
        &self,
        image: &dyn ImageResource,
        descriptor: &TextureDescriptor,
    ) -> PanoramaResult<Box<dyn TextureResource>> {
        if let Some(message) = self.texture_failure.borrow_mut().take() {
            return Err(PanoramaError::Renderer(message));
        }
        let record =
            TextureRecord { id: self.allocate_id(), source_image: image.id(), descriptor: descriptor.clone() };
        {
            let mut stats = self.stats.borrow_mut();
            stats.textures_created += 1;
            stats.last_texture = Some(record.clone());
        }
        Ok(Box::new(HeadlessTexture { record, stats: Rc::clone(&self.stats), released: false }))
    }
}

struct HeadlessImage {
    record: ImageRecord,
    stats: Rc<RefCell<HeadlessStats>>,
    released: bool,
}

impl GpuResource for HeadlessImage {
    fn id(&self) -> ResourceId {
        self.record.id
    }

    fn release(&mut self) {
        let mut stats = self.stats.borrow_mut();
        if self.released {
            stats.double_releases += 1;
            return;
        }
        self.released = true;
        stats.images_released += 1;
    }
}

impl ImageResource for HeadlessImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.record.width, self.record.height)
    }

    fn format(&self) -> PixelFormat {
        self.record.format
    }
}

struct HeadlessTexture {
    record: TextureRecord,
    stats: Rc<RefCell<HeadlessStats>>,
    released: bool,
}

impl GpuResource for HeadlessTexture {
    fn id(&self) -> ResourceId {
        self.record.id
    }

    fn release(&mut self) {
        let mut stats = self.stats.borrow_mut();
        if self.released {
            stats.double_releases += 1;
            return;
        }
        self.released = true;
        stats.textures_released += 1;
    }
}

impl TextureResource for HeadlessTexture {
    fn descriptor(&self) -> &TextureDescriptor {
        &self.record.descriptor
    }

    fn source_image(&self) -> ResourceId {
        self.record.source_image
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortalState {
    pub texture: Option<ResourceId>,
    pub rotation: Vec3,
    pub texture_pushes: usize,
    pub rotation_pushes: usize,
}

#[derive(Default)]
pub struct HeadlessPortal {
    state: RefCell<PortalState>,
}

impl HeadlessPortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PortalState {
        self.state.borrow().clone()
    }
}

impl PortalScene for HeadlessPortal {
    fn set_background_texture(&self, texture: &dyn TextureResource) {
        let mut state = self.state.borrow_mut();
        state.texture = Some(texture.id());
        state.texture_pushes += 1;
    }

    fn set_background_rotation(&self, rotation: Vec3) {
        let mut state = self.state.borrow_mut();
        state.rotation = rotation;
        state.rotation_pushes += 1;
    }
}

/// Scene with a single background portal that every node resolves to while attached.
#[derive(Default)]
pub struct HeadlessScene {
    portal: RefCell<Option<Rc<HeadlessPortal>>>,
}

impl HeadlessScene {
    pub fn with_portal(portal: Rc<HeadlessPortal>) -> Self {
        Self { portal: RefCell::new(Some(portal)) }
    }

    pub fn detach_portal(&self) -> Option<Rc<HeadlessPortal>> {
        self.portal.borrow_mut().take()
    }
}

impl SceneHandle for HeadlessScene {
    fn portal_for(&self, _node: NodeId) -> Option<Rc<dyn PortalScene>> {
        self.portal.borrow().as_ref().map(|portal| Rc::clone(portal) as Rc<dyn PortalScene>)
    }
}
