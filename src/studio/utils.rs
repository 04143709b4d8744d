//! Small text helpers for rendering.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncate to a display width, ending in "…" when cut.
pub fn truncate_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let target = max_width - 1;
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > target {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Spaces needed to right-align `right` after `left` within `width`
pub fn gap_between(left: &str, right: &str, width: usize) -> usize {
    width
        .saturating_sub(left.width())
        .saturating_sub(right.width())
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_width() {
        assert_eq!(truncate_width("hello", 10), "hello");
        assert_eq!(truncate_width("hello world", 6), "hello…");
        assert_eq!(truncate_width("hello", 0), "");
        assert!(truncate_width("你好世界", 5).width() <= 5);
    }

    #[test]
    fn test_gap_between() {
        assert_eq!(gap_between("ab", "cd", 10), 6);
        assert_eq!(gap_between("abcdef", "ghijk", 8), 1);
    }
}
