use glam::Vec3;
use kestrel_panorama::bitmap::Bitmap;
use kestrel_panorama::downloader::{FetchRequest, ImageDownloader};
use kestrel_panorama::events::EventBus;
use kestrel_panorama::format::PixelFormat;
use kestrel_panorama::listener::DownloadListener;
use kestrel_panorama::renderer::headless::{HeadlessPortal, HeadlessRenderer, HeadlessScene};
use kestrel_panorama::renderer::SceneHandle;
use kestrel_panorama::source::ImageSource;
use kestrel_panorama::PanoramaNode;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Default)]
struct ManualDownloader {
    pending: RefCell<Vec<DownloadListener>>,
}

impl ImageDownloader for ManualDownloader {
    fn fetch(&self, _request: FetchRequest, listener: DownloadListener) {
        self.pending.borrow_mut().push(listener);
    }
}

struct Fixture {
    node: PanoramaNode,
    downloader: Arc<ManualDownloader>,
    portal: Rc<HeadlessPortal>,
    scene: Rc<HeadlessScene>,
}

fn fixture() -> Fixture {
    let renderer = Rc::new(HeadlessRenderer::new());
    let downloader = Arc::new(ManualDownloader::default());
    let events = Rc::new(EventBus::new());
    let node = PanoramaNode::new(renderer, downloader.clone(), events);
    let portal = Rc::new(HeadlessPortal::new());
    let scene = Rc::new(HeadlessScene::with_portal(Rc::clone(&portal)));
    Fixture { node, downloader, portal, scene }
}

impl Fixture {
    fn attach(&mut self) {
        let scene: Rc<dyn SceneHandle> = self.scene.clone();
        self.node.set_scene(Some(scene));
    }

    fn load(&mut self) {
        self.node.set_source(Some(ImageSource::from_uri("sky.png")));
        self.node.on_props_set();
        let listener = self.downloader.pending.borrow_mut().pop().expect("fetch started");
        listener.completed(Bitmap::from_rgba8(2, 1, PixelFormat::Rgba8, &[10; 8]).expect("bitmap"));
        self.node.pump();
    }
}

#[test]
fn texture_created_while_detached_is_pushed_once_on_attach() {
    let mut f = fixture();
    f.load();
    f.node.set_rotation(Some([0.0, 90.0, 0.0]));
    assert!(!f.node.is_attached());
    assert_eq!(f.portal.state().texture_pushes, 0);

    f.attach();

    let state = f.portal.state();
    assert_eq!(state.texture, f.node.texture_id());
    assert_eq!(state.texture_pushes, 1);
    assert_eq!(state.rotation_pushes, 1);
    assert_eq!(state.rotation, Vec3::new(0.0, 90.0, 0.0));
}

#[test]
fn attaching_without_a_texture_pushes_nothing() {
    let mut f = fixture();
    f.attach();
    assert!(f.node.is_attached());
    let state = f.portal.state();
    assert_eq!(state.texture_pushes, 0);
    assert_eq!(state.rotation_pushes, 0);
}

#[test]
fn rotation_change_propagates_to_an_attached_portal() {
    let mut f = fixture();
    f.attach();
    f.node.set_rotation(Some([10.0, 20.0, 30.0]));
    let state = f.portal.state();
    assert_eq!(state.rotation, Vec3::new(10.0, 20.0, 30.0));
    assert_eq!(state.rotation_pushes, 1);
    assert_eq!(state.texture, None);

    f.node.set_rotation(None);
    assert_eq!(f.portal.state().rotation, Vec3::ZERO);
}

#[test]
fn completion_pushes_texture_and_rotation_when_attached() {
    let mut f = fixture();
    f.node.set_rotation(Some([0.0, 180.0, 0.0]));
    f.attach();
    f.load();

    let state = f.portal.state();
    assert_eq!(state.texture, f.node.texture_id());
    assert_eq!(state.texture_pushes, 1);
    assert_eq!(state.rotation, Vec3::new(0.0, 180.0, 0.0));
}

#[test]
fn rotation_change_resends_existing_texture() {
    let mut f = fixture();
    f.attach();
    f.load();
    f.node.set_rotation(Some([1.0, 0.0, 0.0]));
    let state = f.portal.state();
    assert_eq!(state.texture_pushes, 2);
    assert_eq!(state.texture, f.node.texture_id());
}

#[test]
fn detached_portal_stops_propagation() {
    let mut f = fixture();
    f.attach();
    f.load();
    let before = f.portal.state();

    f.scene.detach_portal();
    assert!(!f.node.is_attached());
    f.node.set_rotation(Some([3.0, 3.0, 3.0]));

    assert_eq!(f.portal.state(), before);
}
