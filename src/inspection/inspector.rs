use crate::framing::Message;

/// Outcome of inspecting a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the message unmodified.
    Allow,
    /// Drop the message. The `String` is a human-readable reason.
    Block(String),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Classifies a complete message as allowed or blocked.
///
/// Implementations receive their configuration at construction and are never
/// mutated afterwards. Inspection must not perform I/O.
pub trait ContentInspector: Send + Sync {
    /// Short blade name used in logs.
    fn name(&self) -> &'static str;

    fn inspect(&self, message: &Message) -> Verdict;
}
