use anyhow::{bail, Result};
use kestrel_panorama::cli::ProbeArgs;
use kestrel_panorama::config::PanoramaConfig;
use kestrel_panorama::downloader::FileDownloader;
use kestrel_panorama::events::{EventBus, NodeEvent};
use kestrel_panorama::renderer::headless::{HeadlessPortal, HeadlessRenderer, HeadlessScene};
use kestrel_panorama::renderer::{SceneHandle, TextureFlags};
use kestrel_panorama::source::ImageSource;
use kestrel_panorama::PanoramaNode;
use std::process;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = match ProbeArgs::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            process::exit(2);
        }
    };
    if let Err(err) = run(args) {
        eprintln!("error: {err:?}");
        process::exit(1);
    }
}

fn run(args: ProbeArgs) -> Result<()> {
    let mut config = match args.config.as_ref() {
        Some(path) => PanoramaConfig::load(path)?,
        None => PanoramaConfig::default(),
    };
    let overrides = args.config_overrides();
    if !overrides.is_empty() {
        log::info!("[probe] overriding {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);
    let format = config.format()?;

    let renderer = Rc::new(HeadlessRenderer::new());
    let portal = Rc::new(HeadlessPortal::new());
    let scene: Rc<dyn SceneHandle> = Rc::new(HeadlessScene::with_portal(Rc::clone(&portal)));
    let events = Rc::new(EventBus::new());
    let downloader = Arc::new(FileDownloader::new(&config.downloader)?);

    let mut node = PanoramaNode::new(renderer.clone(), downloader, events.clone()).with_format(format);
    node.set_scene(Some(scene));
    node.set_stereo_mode(args.stereo_mode.as_deref());
    node.set_rotation(args.rotation);
    node.set_source(Some(ImageSource::from_uri(args.image.to_string_lossy())));
    node.on_props_set();

    let started = Instant::now();
    let timeout = Duration::from_millis(config.probe.timeout_ms);
    let poll = Duration::from_millis(config.probe.poll_interval_ms.max(1));
    while node.has_pending_download() {
        node.pump();
        if !node.has_pending_download() {
            break;
        }
        if started.elapsed() >= timeout {
            node.on_tear_down();
            bail!("timed out after {} ms waiting for '{}'", timeout.as_millis(), args.image.display());
        }
        thread::sleep(poll);
    }

    for (_, event) in events.drain() {
        if let NodeEvent::Error { message } = event {
            node.on_tear_down();
            bail!("loading '{}' failed: {message}", args.image.display());
        }
    }

    let stats = renderer.stats();
    let portal_state = portal.state();
    if let Some(image) = stats.last_image.as_ref() {
        println!("image    {}x{} {} ({} bytes)", image.width, image.height, image.format, image.byte_len);
    }
    if let Some(texture) = stats.last_texture.as_ref() {
        println!(
            "texture  {} mipmaps={} stereo={}",
            texture.id,
            texture.descriptor.flags.contains(TextureFlags::GENERATE_MIPMAPS),
            texture.descriptor.stereo_mode.as_deref().unwrap_or("none")
        );
    }
    let rotation = portal_state.rotation;
    println!("portal   rotation=({:.2}, {:.2}, {:.2})", rotation.x, rotation.y, rotation.z);
    println!("elapsed  {} ms", started.elapsed().as_millis());

    node.on_tear_down();
    Ok(())
}
