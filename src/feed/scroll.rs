use super::state::FeedState;

/// Distance from the bottom, in scroll units, at which the window grows.
pub const SCROLL_THRESHOLD: u32 = 100;

/// Scroll position of the feed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_top: u32,
    pub scroll_height: u32,
    pub client_height: u32,
}

impl ScrollMetrics {
    pub fn distance_to_bottom(&self) -> u32 {
        self.scroll_height
            .saturating_sub(self.scroll_top)
            .saturating_sub(self.client_height)
    }
}

/// Handle for the one scroll listener a controller may have attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Grows the feed window when the container is scrolled near its bottom.
#[derive(Debug, Clone)]
pub struct ScrollController {
    threshold: u32,
    listener: Option<ListenerId>,
    next_listener: u64,
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(SCROLL_THRESHOLD)
    }
}

impl ScrollController {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            listener: None,
            next_listener: 0,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Attach to the container, replacing any previous listener.
    pub fn attach(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listener = Some(id);
        id
    }

    pub fn detach(&mut self) {
        self.listener = None;
    }

    /// Re-attach after the rendered window changed.
    pub fn rebind(&mut self) -> ListenerId {
        self.detach();
        self.attach()
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    pub fn listener_count(&self) -> usize {
        usize::from(self.listener.is_some())
    }

    /// Handle a scroll event delivered to `listener`. Events for a detached
    /// listener, or with no mounted container, are ignored. Returns true if
    /// the window grew.
    pub fn on_scroll(&mut self, listener: ListenerId, metrics: Option<ScrollMetrics>, feed: &mut FeedState) -> bool {
        if self.listener != Some(listener) {
            return false;
        }
        let Some(metrics) = metrics else {
            return false;
        };
        if metrics.distance_to_bottom() >= self.threshold || feed.is_fully_grown() {
            return false;
        }
        let added = feed.grow_window();
        if added > 0 {
            tracing::debug!(added, visible = feed.visible().len(), "feed window grew");
            self.rebind();
        }
        added > 0
    }

    /// `on_scroll` for the currently attached listener.
    pub fn on_scroll_current(&mut self, metrics: Option<ScrollMetrics>, feed: &mut FeedState) -> bool {
        match self.listener {
            Some(id) => self.on_scroll(id, metrics, feed),
            None => false,
        }
    }
}
