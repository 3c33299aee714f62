pub mod cli;
pub mod config;
pub mod logging;
pub mod server;
pub mod watcher;

pub use config::Settings;
pub use watcher::{
    AttachedHandle, EventCategories, FsEvent, FsEventKind, NormalizedMessage, OptionRequest,
    SubscribeError, Subscriber, WatchHandler, WatchRegistry,
};
