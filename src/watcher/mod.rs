//! Shared filesystem watches fanned out to many subscribers.
//!
//! # Architecture
//!
//! ```text
//! WatchRegistry (path -> entry, one per canonical path)
//!   - Monitor: notify::RecommendedWatcher + dispatch task
//!       notify thread --mpsc--> EventTranslator --> WatchHandler::on_event
//!   - WatchHandler: options + subscribers
//!         |
//!    +---------+---------+
//!    |         |         |
//! Subscriber Subscriber Subscriber   (bounded queue per session)
//! ```

mod error;
mod event;
mod handler;
mod monitor;
mod options;
mod registry;
mod rename;
mod translate;

pub use error::{DeliveryError, SubscribeError, WatchError};
pub use event::{FsEvent, FsEventKind, NormalizedMessage, should_forward};
pub use handler::{Payload, Subscriber, WatchHandler};
pub use monitor::Monitor;
pub use options::{DISABLE_ALL, EventCategories};
pub use registry::{AttachedHandle, OptionRequest, WatchRegistry};
pub use translate::EventTranslator;
