//! Windowed discovery aggregator.
//!
//! Deduplicates raw discoveries into per-window unique-neighbor sets. Records
//! are created lazily at the tail and retired only from the head, once their
//! window has fully elapsed plus a grace period. An open window can be read
//! any number of times; a closed window is returned exactly once more, as it
//! is retired.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{error, trace, warn};

use crate::types::{Platform, WindowCount};
use crate::window::WindowSize;

/// Aggregator shared between the scheduler task and readers.
pub type SharedQueue = Arc<Mutex<DiscoveryQueue>>;

/// The set of nodes discovered during one window.
#[derive(Debug, Clone)]
pub struct DiscoveryWindow {
    window_start: DateTime<Utc>,
    apple_nodes: HashSet<String>,
    android_nodes: HashSet<String>,
}

impl DiscoveryWindow {
    fn new(window_start: DateTime<Utc>) -> Self {
        Self {
            window_start,
            apple_nodes: HashSet::new(),
            android_nodes: HashSet::new(),
        }
    }

    /// Returns true if the node was not yet known in this window.
    fn insert(&mut self, node_id: &str, platform: Platform) -> bool {
        let nodes = match platform {
            Platform::Apple => &mut self.apple_nodes,
            Platform::Android => &mut self.android_nodes,
        };

        if nodes.contains(node_id) {
            return false;
        }
        nodes.insert(node_id.to_string())
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn contains(&self, node_id: &str, platform: Platform) -> bool {
        match platform {
            Platform::Apple => self.apple_nodes.contains(node_id),
            Platform::Android => self.android_nodes.contains(node_id),
        }
    }

    pub fn count(&self) -> WindowCount {
        WindowCount {
            window_start: self.window_start,
            apple_count: self.apple_nodes.len(),
            android_count: self.android_nodes.len(),
        }
    }
}

/// FIFO of discovery windows ordered by window start.
#[derive(Debug)]
pub struct DiscoveryQueue {
    windows: VecDeque<DiscoveryWindow>,
    window_size: WindowSize,
}

impl DiscoveryQueue {
    pub fn new(window_size: WindowSize) -> Self {
        Self {
            windows: VecDeque::new(),
            window_size,
        }
    }

    /// Wrap a new queue for sharing with the scheduler.
    pub fn shared(window_size: WindowSize) -> SharedQueue {
        Arc::new(Mutex::new(Self::new(window_size)))
    }

    pub fn window_size(&self) -> WindowSize {
        self.window_size
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Record a discovery in the window starting at `window_start`.
    ///
    /// Window starts must be non-decreasing. A start older than the tail is
    /// merged into its existing record when one is still queued; otherwise the
    /// discovery is dropped and logged, leaving the queue untouched.
    pub fn record(&mut self, window_start: DateTime<Utc>, node_id: &str, platform: Platform) {
        match self.windows.back_mut() {
            Some(tail) if tail.window_start == window_start => {
                if tail.insert(node_id, platform) {
                    trace!(node_id, %platform, window = %window_start, "New neighbor in window");
                }
            }
            Some(tail) if tail.window_start > window_start => {
                let tail_start = tail.window_start;
                match self
                    .windows
                    .iter_mut()
                    .find(|w| w.window_start == window_start)
                {
                    Some(window) => {
                        warn!(
                            window = %window_start,
                            tail = %tail_start,
                            "Out-of-order discovery merged into earlier window"
                        );
                        window.insert(node_id, platform);
                    }
                    None => {
                        error!(
                            window = %window_start,
                            tail = %tail_start,
                            node_id,
                            "Discovery for a window older than the queue tail dropped"
                        );
                    }
                }
            }
            _ => {
                let mut window = DiscoveryWindow::new(window_start);
                window.insert(node_id, platform);
                self.windows.push_back(window);
                trace!(window = %window_start, queued = self.windows.len(), "Opened window");
            }
        }
    }

    /// Counts for the head window, without removing it.
    pub fn peek(&self) -> Option<WindowCount> {
        self.windows.front().map(DiscoveryWindow::count)
    }

    /// The head window itself.
    pub fn front(&self) -> Option<&DiscoveryWindow> {
        self.windows.front()
    }

    /// Retire the head if `now - head.window_start > window + grace`.
    ///
    /// The boundary is exclusive: a head exactly at the horizon stays.
    pub fn advance_if_stale(&mut self, now: DateTime<Utc>, grace: Duration) -> bool {
        let Some(head) = self.windows.front() else {
            return false;
        };

        if !self.is_stale(head.window_start, now, grace) {
            return false;
        }

        self.windows.pop_front();
        true
    }

    /// Peek the head and retire it if its window has closed.
    ///
    /// Returns the record being considered either way, so a caller polling
    /// this sees an open window repeatedly and a closed one exactly once.
    pub fn read_latest_window(&mut self, now: DateTime<Utc>, grace: Duration) -> Option<WindowCount> {
        let head = self.peek()?;
        self.advance_if_stale(now, grace);
        Some(head)
    }

    /// Retire and return every closed window, oldest first.
    pub fn drain_closed(&mut self, now: DateTime<Utc>, grace: Duration) -> Vec<WindowCount> {
        let mut closed = Vec::new();
        while let Some(head) = self.peek() {
            if !self.advance_if_stale(now, grace) {
                break;
            }
            closed.push(head);
        }
        closed
    }

    /// Remove and return every window, open or closed.
    pub fn drain_all(&mut self) -> Vec<WindowCount> {
        self.windows.drain(..).map(|w| w.count()).collect()
    }

    /// Counts for every queued window, oldest first.
    pub fn snapshot(&self) -> Vec<WindowCount> {
        self.windows.iter().map(DiscoveryWindow::count).collect()
    }

    fn is_stale(&self, window_start: DateTime<Utc>, now: DateTime<Utc>, grace: Duration) -> bool {
        let horizon = self.window_size.length()
            + chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::zero());
        now - window_start > horizon
    }
}
