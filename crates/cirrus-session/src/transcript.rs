//! Conversation transcript with an explicit open-entry handle.

use cirrus_api::ConversationEntry;

/// Ordered conversation entries.
///
/// At most one entry is open (still accumulating reply text); it is always the
/// last one. Appending any other entry, or closing, seals it for good.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<ConversationEntry>,
    open: Option<usize>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry still accumulating text, if any
    pub fn open_index(&self) -> Option<usize> {
        self.open
    }

    /// The entry still accumulating text, if any
    pub fn open_entry(&self) -> Option<&ConversationEntry> {
        self.open.map(|i| &self.entries[i])
    }

    /// Append a sealed entry, closing the open one. Returns its index.
    pub fn push_closed(&mut self, entry: ConversationEntry) -> usize {
        self.open = None;
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Append a user text entry. Returns its index.
    pub fn push_user(&mut self, content: impl Into<String>) -> usize {
        self.push_closed(ConversationEntry::user(content))
    }

    /// Add a reply fragment.
    ///
    /// Extends the open entry in place when there is one, otherwise opens a new
    /// assistant entry. A present `agent` overwrites the entry's author.
    /// Returns the entry index and whether it was newly created.
    pub fn append_text(&mut self, content: &str, agent: Option<&str>) -> (usize, bool) {
        if let Some(index) = self.open {
            let entry = &mut self.entries[index];
            entry.content.push_str(content);
            if let Some(agent) = agent {
                entry.source_agent = Some(agent.to_string());
            }
            return (index, false);
        }

        self.entries.push(ConversationEntry::assistant(
            content,
            agent.map(str::to_string),
        ));
        let index = self.entries.len() - 1;
        self.open = Some(index);
        (index, true)
    }

    /// Seal the open entry, if any
    pub fn close(&mut self) {
        self.open = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_api::{EntryKind, Role};

    #[test]
    fn test_fragments_accumulate_into_one_entry() {
        let mut t = Transcript::new();
        t.push_user("deploy my app");
        assert_eq!(t.append_text("Looking at", Some("cloud-architecture")), (1, true));
        assert_eq!(t.append_text(" your app...", None), (1, false));

        assert_eq!(t.len(), 2);
        let reply = &t.entries()[1];
        assert_eq!(reply.content, "Looking at your app...");
        assert_eq!(reply.source_agent.as_deref(), Some("cloud-architecture"));
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(t.open_index(), Some(1));
    }

    #[test]
    fn test_agent_overwritten_when_present() {
        let mut t = Transcript::new();
        t.append_text("a", Some("requirements-analysis"));
        t.append_text("b", Some("cloud-architecture"));
        assert_eq!(
            t.open_entry().unwrap().source_agent.as_deref(),
            Some("cloud-architecture")
        );
    }

    #[test]
    fn test_closed_entry_seals_open_reply() {
        let mut t = Transcript::new();
        t.append_text("partial", None);
        t.push_closed(ConversationEntry::error("backend failed"));
        assert!(t.open_entry().is_none());

        let (index, created) = t.append_text("fresh", None);
        assert!(created);
        assert_eq!(index, 2);
        assert_eq!(t.entries()[0].content, "partial");
        assert_eq!(t.entries()[1].kind, EntryKind::Error);
    }

    #[test]
    fn test_close_starts_new_reply_next_time() {
        let mut t = Transcript::new();
        t.append_text("first", None);
        t.close();
        let (index, created) = t.append_text("second", None);
        assert!(created);
        assert_eq!(index, 1);
        assert_eq!(t.entries()[0].content, "first");
    }

    #[test]
    fn test_user_entry_is_never_open() {
        let mut t = Transcript::new();
        t.push_user("hi");
        assert!(t.open_entry().is_none());
        assert!(!t.is_empty());
    }
}
