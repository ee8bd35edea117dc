use crate::bitmap::Bitmap;
use crate::dispatch::UiQueue;
use crate::downloader::{FetchRequest, ImageDownloader};
use crate::error::PanoramaResult;
use crate::events::{EventChannel, NodeEvent};
use crate::format::PixelFormat;
use crate::listener::{DownloadListener, ListenerToken};
use crate::renderer::{
    ImageResource, Owned, PortalScene, RenderBackend, ResourceId, SceneHandle, TextureDescriptor,
    TextureResource,
};
use crate::source::ImageSource;
use glam::Vec3;
use serde::Deserialize;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_ROTATION: Vec3 = Vec3::ZERO;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A batch of properties as sent by the declarative layer. Absent fields are left untouched;
/// `rotation: null` resets to the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PanoramaProps {
    pub source: Option<ImageSource>,
    #[serde(deserialize_with = "deserialize_present")]
    pub rotation: Option<Option<[f32; 3]>>,
    pub stereo_mode: Option<String>,
    pub format: Option<String>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<[f32; 3]>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<[f32; 3]>::deserialize(deserializer).map(Some)
}

/// Scene node that shows a 360° image as the background of its enclosing portal.
///
/// All state lives on the UI context. Fetches run inside the downloader and report back through
/// the node's UI queue, which the host drains with [`PanoramaNode::pump`].
pub struct PanoramaNode {
    id: NodeId,
    source: Option<ImageSource>,
    rotation: Vec3,
    stereo_mode: Option<String>,
    format: PixelFormat,
    needs_download: bool,
    listener: Option<ListenerToken>,
    image: Option<Owned<dyn ImageResource>>,
    texture: Option<Owned<dyn TextureResource>>,
    scene: Option<Rc<dyn SceneHandle>>,
    renderer: Rc<dyn RenderBackend>,
    downloader: Arc<dyn ImageDownloader>,
    events: Rc<dyn EventChannel>,
    queue: UiQueue<PanoramaNode>,
}

impl PanoramaNode {
    pub fn new(
        renderer: Rc<dyn RenderBackend>,
        downloader: Arc<dyn ImageDownloader>,
        events: Rc<dyn EventChannel>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            source: None,
            rotation: DEFAULT_ROTATION,
            stereo_mode: None,
            format: PixelFormat::default(),
            needs_download: false,
            listener: None,
            image: None,
            texture: None,
            scene: None,
            renderer,
            downloader,
            events,
            queue: UiQueue::new(),
        }
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn source(&self) -> Option<&ImageSource> {
        self.source.as_ref()
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn stereo_mode(&self) -> Option<&str> {
        self.stereo_mode.as_deref()
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn needs_download(&self) -> bool {
        self.needs_download
    }

    pub fn has_pending_download(&self) -> bool {
        self.listener.is_some()
    }

    pub fn image_id(&self) -> Option<ResourceId> {
        self.image.as_ref().map(Owned::id)
    }

    pub fn texture_id(&self) -> Option<ResourceId> {
        self.texture.as_ref().map(Owned::id)
    }

    pub fn is_attached(&self) -> bool {
        self.portal().is_some()
    }

    pub fn set_stereo_mode(&mut self, mode: Option<&str>) {
        self.stereo_mode = mode.map(str::to_string);
    }

    pub fn set_source(&mut self, source: Option<ImageSource>) {
        self.source = source;
        self.needs_download = true;
    }

    pub fn set_rotation(&mut self, rotation: Option<[f32; 3]>) {
        self.rotation = rotation.map(Vec3::from_array).unwrap_or(DEFAULT_ROTATION);
        self.sync_portal();
    }

    pub fn set_format(&mut self, name: &str) -> PanoramaResult<()> {
        self.format = PixelFormat::from_name(name)?;
        self.needs_download = true;
        Ok(())
    }

    pub fn set_scene(&mut self, scene: Option<Rc<dyn SceneHandle>>) {
        self.scene = scene;
        if self.texture.is_some() {
            self.sync_portal();
        }
    }

    /// Applies a property batch and commits it. A bad format name aborts before anything is
    /// applied.
    pub fn apply_props(&mut self, props: PanoramaProps) -> PanoramaResult<()> {
        let format = props.format.as_deref().map(PixelFormat::from_name).transpose()?;
        if let Some(mode) = props.stereo_mode.as_deref() {
            self.set_stereo_mode(Some(mode));
        }
        if let Some(source) = props.source {
            self.set_source(Some(source));
        }
        if let Some(rotation) = props.rotation {
            self.set_rotation(rotation);
        }
        if let Some(format) = format {
            self.format = format;
            self.needs_download = true;
        }
        self.on_props_set();
        Ok(())
    }

    pub fn on_props_set(&mut self) {
        if !self.needs_download {
            return;
        }
        let Some(source) = self.source.clone() else {
            return;
        };
        self.events.emit(self.id, NodeEvent::LoadStart);

        if let Some(previous) = self.listener.take() {
            log::debug!("[panorama] node={} superseding fetch {}", self.id, previous.id());
            previous.invalidate();
        }
        let token = ListenerToken::new();
        self.listener = Some(token.clone());
        let listener = DownloadListener::new(token, self.queue.sender());
        log::debug!(
            "[panorama] node={} fetching {} as {}",
            self.id,
            source.uri().unwrap_or("<no uri>"),
            self.format
        );
        self.downloader.fetch(FetchRequest { source, format: self.format }, listener);
        self.needs_download = false;
    }

    pub fn on_tear_down(&mut self) {
        if let Some(token) = self.listener.take() {
            token.invalidate();
        }
        self.release_resources();
    }

    /// Runs callbacks posted by in-flight fetches. Call from the UI context.
    pub fn pump(&mut self) -> usize {
        let tasks = self.queue.drain();
        let count = tasks.len();
        for task in tasks {
            task(self);
        }
        count
    }

    pub(crate) fn finish_download(&mut self, token: &ListenerToken, bitmap: Bitmap) {
        if !token.is_valid() {
            log::debug!("[panorama] node={} ignoring stale fetch {}", self.id, token.id());
            return;
        }
        self.release_resources();
        match self.build_resources(&bitmap) {
            Ok((image, texture)) => {
                self.image = Some(image);
                self.texture = Some(texture);
                self.sync_portal();
                self.events.emit(self.id, NodeEvent::LoadEnd);
            }
            Err(err) => {
                log::warn!("[panorama] node={} failed to build background: {err}", self.id);
                self.events.emit(self.id, err.into());
            }
        }
        self.clear_listener(token);
    }

    pub(crate) fn fail_download(&mut self, token: &ListenerToken, message: String) {
        if !token.is_valid() {
            log::debug!("[panorama] node={} ignoring stale failure {}", self.id, token.id());
            return;
        }
        log::warn!("[panorama] node={} fetch failed: {message}", self.id);
        self.events.emit(self.id, NodeEvent::Error { message });
        self.clear_listener(token);
    }

    fn build_resources(
        &self,
        bitmap: &Bitmap,
    ) -> PanoramaResult<(Owned<dyn ImageResource>, Owned<dyn TextureResource>)> {
        let image = Owned::new(self.renderer.create_image(bitmap, self.format)?);
        let descriptor = TextureDescriptor::background(self.format, self.stereo_mode.as_deref());
        let texture = Owned::new(self.renderer.create_texture(image.get(), &descriptor)?);
        Ok((image, texture))
    }

    fn clear_listener(&mut self, token: &ListenerToken) {
        if self.listener.as_ref() == Some(token) {
            self.listener = None;
        }
    }

    fn release_resources(&mut self) {
        if let Some(image) = self.image.take() {
            image.release();
        }
        if let Some(texture) = self.texture.take() {
            texture.release();
        }
    }

    fn portal(&self) -> Option<Rc<dyn PortalScene>> {
        self.scene.as_ref().and_then(|scene| scene.portal_for(self.id))
    }

    /// Pushes the current texture (when present) and rotation to the enclosing portal.
    fn sync_portal(&self) {
        let Some(portal) = self.portal() else {
            return;
        };
        if let Some(texture) = self.texture.as_ref() {
            portal.set_background_texture(texture.get());
        }
        portal.set_background_rotation(self.rotation);
    }
}

impl Drop for PanoramaNode {
    fn drop(&mut self) {
        if let Some(token) = self.listener.take() {
            token.invalidate();
        }
    }
}
