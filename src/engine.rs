//! Engine Layer
//!
//! One explicit [`Engine`] instance per widget, shared by handle between the
//! renderer, the timers, and the host.
//!
//! - [`Engine`]: inventory, selection, metrics, events, placements
//! - [`Renderer`]: presentation boundary ([`LogRenderer`], [`ChannelRenderer`])
//! - [`EngineService`]: engine plus timers with a single `shutdown()`

mod builder;
mod instance;
mod renderer;
mod service;
mod slots;

pub use builder::{DEFAULT_VISIBILITY_THRESHOLD, EngineBuilder, EngineSettings};
pub use instance::{Engine, Outcome, PendingEvents, ReportRow};
pub use renderer::{ChannelRenderer, LogRenderer, NO_ADS_MESSAGE, RenderEvent, Renderer};
pub use service::{EngineService, TimerSettings};
pub use slots::{Placement, PlacementId, Slots};
