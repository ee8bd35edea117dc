pub mod bitmap;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod downloader;
pub mod error;
pub mod events;
pub mod format;
pub mod listener;
pub mod node;
pub mod renderer;
pub mod source;

pub use error::{PanoramaError, PanoramaResult};
pub use node::{NodeId, PanoramaNode, PanoramaProps};
