//! Renderer boundary.
//!
//! The engine decides what goes where; a [`Renderer`] turns that into
//! something a user sees. Renderers are called while the engine holds its
//! state lock, so they must not call back into the engine synchronously.
//! Hosts that need to react (e.g. report visibility) should forward through a
//! channel, as [`ChannelRenderer`] does.

use tokio::sync::mpsc;

use crate::engine::slots::{Placement, PlacementId};

/// Text shown in a slot with nothing to display.
pub const NO_ADS_MESSAGE: &str = "No ads available";

/// Presentation side of the engine.
pub trait Renderer: Send + Sync + 'static {
    /// Show `placement` in its slot.
    fn mount(&self, placement: &Placement);

    /// Show the "no ads" fallback in `slot`.
    fn mount_empty(&self, slot: usize);

    /// Tear down `placement` (replaced, dismissed, or engine shutdown).
    fn unmount(&self, placement: &Placement);
}

/// Pair of renderers; both see every call, left first.
impl<A: Renderer, B: Renderer> Renderer for (A, B) {
    fn mount(&self, placement: &Placement) {
        self.0.mount(placement);
        self.1.mount(placement);
    }

    fn mount_empty(&self, slot: usize) {
        self.0.mount_empty(slot);
        self.1.mount_empty(slot);
    }

    fn unmount(&self, placement: &Placement) {
        self.0.unmount(placement);
        self.1.unmount(placement);
    }
}

/// Logs every placement change.
#[derive(Debug, Clone, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn mount(&self, placement: &Placement) {
        let ad = &placement.ad;
        tracing::info!(
            slot = placement.slot,
            placement = %placement.id,
            ad = %ad.id,
            title = %ad.title,
            sponsor = %ad.sponsor_name,
            href = %ad.href,
            "Ad mounted"
        );
    }

    fn mount_empty(&self, slot: usize) {
        tracing::info!(slot, "{}", NO_ADS_MESSAGE);
    }

    fn unmount(&self, placement: &Placement) {
        tracing::debug!(slot = placement.slot, placement = %placement.id, "Ad unmounted");
    }
}

/// A renderer notification.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Mounted(Placement),
    Empty(usize),
    Unmounted(PlacementId),
}

/// Forwards every call as a [`RenderEvent`] over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelRenderer {
    tx: mpsc::UnboundedSender<RenderEvent>,
}

impl ChannelRenderer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RenderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: RenderEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl Renderer for ChannelRenderer {
    fn mount(&self, placement: &Placement) {
        self.send(RenderEvent::Mounted(placement.clone()));
    }

    fn mount_empty(&self, slot: usize) {
        self.send(RenderEvent::Empty(slot));
    }

    fn unmount(&self, placement: &Placement) {
        self.send(RenderEvent::Unmounted(placement.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::slots::Slots;
    use crate::inventory::AdRecord;

    #[test]
    fn test_channel_renderer_forwards() {
        let (renderer, mut rx) = ChannelRenderer::new();
        let mut slots = Slots::new(1);
        let (placement, _) = slots.place(0, AdRecord::new("https://a.example", "A"));

        let pair = (LogRenderer, renderer);
        pair.mount(&placement);
        pair.unmount(&placement);
        pair.mount_empty(0);

        assert_eq!(rx.try_recv().unwrap(), RenderEvent::Mounted(placement.clone()));
        assert_eq!(rx.try_recv().unwrap(), RenderEvent::Unmounted(placement.id));
        assert_eq!(rx.try_recv().unwrap(), RenderEvent::Empty(0));
    }

    #[test]
    fn test_channel_renderer_survives_dropped_receiver() {
        let (renderer, rx) = ChannelRenderer::new();
        drop(rx);
        renderer.mount_empty(3);
    }
}
