use std::sync::Arc;

use super::command_filter::CommandAccessFilter;
use super::embedded_code::EmbeddedCodeDetector;
use super::inspector::{ContentInspector, Verdict};
use super::mime_type::MimeTypeBlocklist;
use crate::configuration::types::BladeKind;
use crate::configuration::Config;
use crate::framing::Message;

/// Ordered list of blades applied to one relay direction.
#[derive(Clone, Default)]
pub struct InspectorChain {
    blades: Vec<Arc<dyn ContentInspector>>,
}

impl InspectorChain {
    pub fn new(blades: Vec<Arc<dyn ContentInspector>>) -> Self {
        Self { blades }
    }

    /// Builds the blades named in `kinds`, configured from `config`.
    pub fn from_kinds(kinds: &[BladeKind], config: &Config) -> Self {
        Self::new(kinds.iter().map(|kind| build_blade(*kind, config)).collect())
    }

    pub fn len(&self) -> usize {
        self.blades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blades.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.blades.iter().map(|b| b.name()).collect()
    }

    /// Runs every blade in order and stops at the first block. The reason of a
    /// block is prefixed with the blade name.
    pub fn evaluate(&self, message: &Message) -> Verdict {
        for blade in &self.blades {
            if let Verdict::Block(reason) = blade.inspect(message) {
                return Verdict::Block(format!("{}: {}", blade.name(), reason));
            }
        }
        Verdict::Allow
    }
}

pub fn build_blade(kind: BladeKind, config: &Config) -> Arc<dyn ContentInspector> {
    match kind {
        BladeKind::Dlp => Arc::new(EmbeddedCodeDetector::new(config.dlp.clone())),
        BladeKind::Mime => Arc::new(MimeTypeBlocklist::default()),
        BladeKind::Ips => Arc::new(CommandAccessFilter::new(&config.ips)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        verdict: Verdict,
    }

    impl ContentInspector for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn inspect(&self, _message: &Message) -> Verdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone()
        }
    }

    #[test]
    fn test_empty_chain_allows() {
        let chain = InspectorChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.evaluate(&Message::opaque(b"x".to_vec())), Verdict::Allow);
    }

    #[test]
    fn test_first_block_short_circuits() {
        let blocker = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            verdict: Verdict::Block("no".to_string()),
        });
        let after = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            verdict: Verdict::Allow,
        });
        let chain = InspectorChain::new(vec![blocker.clone(), after.clone()]);

        let verdict = chain.evaluate(&Message::opaque(b"x".to_vec()));
        assert_eq!(verdict, Verdict::Block("counting: no".to_string()));
        assert_eq!(blocker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_kinds_keeps_order() {
        let chain = InspectorChain::from_kinds(
            &[BladeKind::Ips, BladeKind::Dlp, BladeKind::Mime],
            &Config::default(),
        );
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.names(), vec!["ips", "dlp", "mime"]);

        let verdict = chain.evaluate(&Message::opaque(b"stat".to_vec()));
        assert!(matches!(verdict, Verdict::Block(reason) if reason.starts_with("ips:")));
    }
}
