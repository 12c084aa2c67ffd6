use crate::snapshot::HtmlSnapshot;
use async_trait::async_trait;
use pinpoint_common::{DomError, DomProvider, NodeHandle, ReadyState};
use std::cell::Cell;
use std::time::Duration;
use tracing::debug;

/// A page that changes over time: a series of snapshots, advanced by one
/// every time the caller waits for [`ReadyState::ContentParsed`].
///
/// Models content that renders late (spinners, lazy lists, client-side
/// routing). After the last snapshot the page stays put.
pub struct SnapshotSequence {
    frames: Vec<HtmlSnapshot>,
    current: Cell<usize>,
    waits: Cell<usize>,
}

impl SnapshotSequence {
    /// Build from HTML frames sharing one URL. An empty list yields a single
    /// empty page.
    pub fn new(url: &str, frames: &[&str]) -> Self {
        let mut snapshots: Vec<HtmlSnapshot> =
            frames.iter().map(|html| HtmlSnapshot::parse(url, html)).collect();
        if snapshots.is_empty() {
            snapshots.push(HtmlSnapshot::parse(url, "<html><body></body></html>"));
        }
        Self {
            frames: snapshots,
            current: Cell::new(0),
            waits: Cell::new(0),
        }
    }

    /// Index of the frame currently served.
    pub fn frame_index(&self) -> usize {
        self.current.get()
    }

    /// Number of content-parsed waits observed so far.
    pub fn waits(&self) -> usize {
        self.waits.get()
    }

    /// The frame currently served.
    pub fn frame(&self) -> &HtmlSnapshot {
        &self.frames[self.current.get()]
    }

    /// Count the wait and move to the next frame, except on the first wait.
    fn advance(&self) {
        self.waits.set(self.waits.get() + 1);
        // The first wait happens before any search; the page is still on frame 0.
        if self.waits.get() > 1 && self.current.get() + 1 < self.frames.len() {
            self.current.set(self.current.get() + 1);
            debug!(frame = self.current.get(), "page advanced");
        }
    }
}

#[async_trait(?Send)]
impl DomProvider for SnapshotSequence {
    async fn current_url(&self) -> Result<String, DomError> {
        self.frame().current_url().await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<NodeHandle>, DomError> {
        self.frame().query_all(selector).await
    }

    async fn query_within(
        &self,
        node: NodeHandle,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, DomError> {
        self.frame().query_within(node, selector).await
    }

    async fn is_visible(&self, node: NodeHandle) -> Result<bool, DomError> {
        self.frame().is_visible(node).await
    }

    async fn attribute(&self, node: NodeHandle, name: &str) -> Result<Option<String>, DomError> {
        self.frame().attribute(node, name).await
    }

    async fn text(&self, node: NodeHandle) -> Result<String, DomError> {
        self.frame().text(node).await
    }

    async fn tag_name(&self, node: NodeHandle) -> Result<String, DomError> {
        self.frame().tag_name(node).await
    }

    async fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, DomError> {
        self.frame().parent(node).await
    }

    async fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>, DomError> {
        self.frame().children(node).await
    }

    async fn wait_for_ready(&self, state: ReadyState, _timeout: Duration) -> Result<(), DomError> {
        if state == ReadyState::ContentParsed {
            self.advance();
        }
        Ok(())
    }
}
