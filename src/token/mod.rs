//! Token counting for prompt budgeting.
//!
//! The counter prefers an exact count from a local tokenizer snapshot
//! (`models/tokenizer/tokenizer.json`) and falls back to a CJK-aware
//! character heuristic when the snapshot is absent or encoding fails. Counts
//! feed token budgets, never billing, so the heuristic only has to be safe
//! for budgeting.

pub mod batching;

use std::path::PathBuf;
use std::sync::OnceLock;

use tokenizers::Tokenizer;

use crate::config::ProjectPaths;

/// Process-wide tokenizer handle, loaded once on first use.
///
/// `None` is cached when the snapshot is missing or unreadable so every
/// subsequent count goes straight to the heuristic without retrying the
/// filesystem.
static TOKENIZER: OnceLock<Option<Tokenizer>> = OnceLock::new();

/// Token counter with an exact path and a heuristic fallback.
///
/// # Examples
///
/// ```
/// use issuelens::config::ProjectPaths;
/// use issuelens::token::TokenCounter;
///
/// let counter = TokenCounter::new(&ProjectPaths::at("/tmp/no-snapshot"));
/// assert!(counter.count("订单列表分页") > 0);
/// ```
#[derive(Debug, Clone)]
pub struct TokenCounter {
    snapshot: PathBuf,
}

impl TokenCounter {
    /// Creates a counter reading the snapshot under `models/tokenizer/`.
    #[must_use]
    pub fn new(paths: &ProjectPaths) -> Self {
        Self {
            snapshot: paths.tokenizer_dir().join("tokenizer.json"),
        }
    }

    /// Counts tokens in `text`.
    ///
    /// Exact when the tokenizer snapshot loads and encodes successfully;
    /// otherwise [`estimate_tokens`].
    #[must_use]
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        if let Some(tokenizer) = self.tokenizer()
            && let Ok(encoding) = tokenizer.encode(text, false)
        {
            return encoding.get_ids().len();
        }

        estimate_tokens(text)
    }

    fn tokenizer(&self) -> Option<&'static Tokenizer> {
        TOKENIZER
            .get_or_init(|| match Tokenizer::from_file(&self.snapshot) {
                Ok(tokenizer) => Some(tokenizer),
                Err(e) => {
                    tracing::debug!(
                        path = %self.snapshot.display(),
                        error = %e,
                        "tokenizer snapshot unavailable, using heuristic"
                    );
                    None
                }
            })
            .as_ref()
    }
}

/// Estimates a token count from character classes:
/// `ceil(cjk / 1.5) + ceil(other / 4)`.
///
/// CJK ideographs average well under 1.5 characters per token on the models
/// in use; Latin text averages about 4. The estimate is only consumed by
/// budget math.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    let mut cjk = 0usize;
    let mut other = 0usize;
    for c in text.chars() {
        if is_cjk(c) {
            cjk += 1;
        } else {
            other += 1;
        }
    }
    // ceil(cjk / 1.5) == ceil(2 * cjk / 3)
    (2 * cjk).div_ceil(3) + other.div_ceil(4)
}

/// Returns true for code points in the CJK ideograph ranges.
#[must_use]
pub const fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'      // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}'    // Extension A
        | '\u{F900}'..='\u{FAFF}'    // Compatibility Ideographs
        | '\u{20000}'..='\u{2A6DF}'  // Extension B
    )
}
