use crate::log_debug;
use tiktoken_rs::cl100k_base;

/// Estimates prompt size in tokens.
///
/// Uses the `cl100k_base` encoding; when the encoder can't be built the
/// estimate degrades to one token per four bytes.
pub struct TokenCounter {
    encoder: Option<tiktoken_rs::CoreBPE>,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    pub fn new() -> Self {
        let encoder = match cl100k_base() {
            Ok(encoder) => Some(encoder),
            Err(e) => {
                log_debug!("Token encoder unavailable, using byte estimate: {}", e);
                None
            }
        };
        Self { encoder }
    }

    // Count the number of tokens in a string
    pub fn count_tokens(&self, s: &str) -> usize {
        match &self.encoder {
            Some(encoder) => encoder.encode_ordinary(s).len(),
            None => s.len().div_ceil(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(TokenCounter::new().count_tokens(""), 0);
    }

    #[test]
    fn test_longer_text_has_more_tokens() {
        let counter = TokenCounter::new();
        let short = counter.count_tokens("fn main() {}");
        let long = counter.count_tokens(&"fn main() { println!(\"hello\"); }\n".repeat(20));
        assert!(short > 0);
        assert!(long > short);
    }
}
