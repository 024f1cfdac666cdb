//! Heuristic detection of C source code leaving the network.
//!
//! The payload is cut into statement-like fragments on `;`, `{` and `}`. A
//! fragment is suspicious when it starts with a control-flow keyword, a type or
//! storage declarator, a comment opener, or is an assignment to an identifier
//! seen in an earlier declaration. Suspicious fragments following each other
//! form runs; long enough runs are counted as code blocks. The thresholds in
//! [`DlpThresholds`] turn those counts into a verdict.

use std::collections::HashSet;

use super::inspector::{ContentInspector, Verdict};
use crate::configuration::types::DlpThresholds;
use crate::framing::Message;

const CONTROL_KEYWORDS: &[&str] = &[
    "for", "while", "do", "break", "continue", "if", "else", "switch", "case", "goto", "return",
];

const DECLARATORS: &[&str] = &[
    "char", "int", "short", "float", "double", "long", "auto", "volatile", "const", "unsigned",
    "signed", "struct", "enum", "union", "extern", "register", "inline", "static",
];

const COMMENT_OPENERS: &[&str] = &["//", "/*", "/**"];

/// Counts gathered from one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeScan {
    pub fragments: usize,
    pub suspicious: usize,
    pub blocks: usize,
}

impl CodeScan {
    pub fn suspicious_fraction(&self) -> f64 {
        if self.fragments == 0 {
            0.0
        } else {
            self.suspicious as f64 / self.fragments as f64
        }
    }
}

pub struct EmbeddedCodeDetector {
    thresholds: DlpThresholds,
}

impl EmbeddedCodeDetector {
    pub fn new(thresholds: DlpThresholds) -> Self {
        Self { thresholds }
    }

    /// Collects fragment statistics for `text`.
    pub fn scan(&self, text: &str) -> CodeScan {
        let flattened = text.replace('\n', "");
        let fragments: Vec<&str> = flattened
            .split(|c: char| c == ';' || c == '{' || c == '}')
            .map(str::trim)
            .collect();

        let mut declared: HashSet<&str> = HashSet::new();
        let mut locations = Vec::new();

        for (index, fragment) in fragments.iter().enumerate() {
            let words: Vec<&str> = fragment.split_whitespace().collect();
            let Some(&starter) = words.first() else {
                continue;
            };

            let is_control = CONTROL_KEYWORDS.contains(&starter);
            let is_declaration = DECLARATORS.contains(&starter);
            let is_comment = COMMENT_OPENERS.contains(&starter);

            if is_declaration {
                declared.extend(
                    words
                        .iter()
                        .copied()
                        .filter(|w| !DECLARATORS.contains(w)),
                );
            }

            let target = assignment_target(starter);
            let is_assignment = words.len() > 2 && words[1] == "=" && declared.contains(target);

            if is_control || is_declaration || is_comment || is_assignment {
                locations.push(index);
            }
        }

        CodeScan {
            fragments: fragments.len(),
            suspicious: locations.len(),
            blocks: count_blocks(&locations, self.thresholds.block_size_min),
        }
    }

    /// Applies the thresholds to a scan result. `true` means the payload looks
    /// like source code.
    pub fn judge(&self, scan: &CodeScan) -> bool {
        let t = &self.thresholds;
        if scan.suspicious < t.lines_min_to_judge {
            return false;
        }
        scan.blocks >= t.blocks_min
            || scan.suspicious >= t.lines_amount_min
            || scan.suspicious_fraction() >= t.frac_min
    }
}

/// `ptr->field.x` assigns to `ptr`.
fn assignment_target(starter: &str) -> &str {
    let end = [starter.find("->"), starter.find('.')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(starter.len());
    &starter[..end]
}

/// Number of runs of consecutive indices at least `min_run` long.
fn count_blocks(locations: &[usize], min_run: usize) -> usize {
    let mut blocks = 0;
    let mut run = 0;
    let mut previous: Option<usize> = None;

    for &location in locations {
        run = match previous {
            Some(p) if p + 1 == location => run + 1,
            _ => {
                if run >= min_run {
                    blocks += 1;
                }
                1
            }
        };
        previous = Some(location);
    }
    if run >= min_run {
        blocks += 1;
    }

    blocks
}

impl ContentInspector for EmbeddedCodeDetector {
    fn name(&self) -> &'static str {
        "dlp"
    }

    fn inspect(&self, message: &Message) -> Verdict {
        let scan = self.scan(&message.text());
        if self.judge(&scan) {
            Verdict::Block(format!(
                "C code detected ({} suspicious of {} fragments, {} blocks)",
                scan.suspicious, scan.fragments, scan.blocks
            ))
        } else {
            Verdict::Allow
        }
    }
}
