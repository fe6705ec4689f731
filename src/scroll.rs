//! Keeps the transcript viewport pinned to the newest message

/// Tracks the transcript's vertical offset. Any change to the message list
/// forces the offset to the bottom; manual paging lasts until the next change.
#[derive(Debug, Clone, Default)]
pub struct ScrollController {
    offset: usize,
    seen_revision: Option<u64>,
}

impl ScrollController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with the current content and return the first visible line
    pub fn observe(&mut self, revision: u64, total_lines: usize, viewport_height: usize) -> usize {
        let max_offset = total_lines.saturating_sub(viewport_height);
        if self.seen_revision != Some(revision) {
            self.seen_revision = Some(revision);
            self.offset = max_offset;
        }
        self.offset = self.offset.min(max_offset);
        self.offset
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    /// Clamped on the next `observe`
    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_add(lines);
    }
}
