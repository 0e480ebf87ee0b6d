use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Shortens `label` to at most `max_columns` terminal columns, ending in an
/// ellipsis when anything was cut.
pub fn truncate_label(label: &str, max_columns: usize) -> String {
    if max_columns == 0 {
        return String::new();
    }
    if label.width() <= max_columns {
        return label.to_owned();
    }

    let mut truncated = String::new();
    let mut used = 0;
    for glyph in label.chars() {
        let columns = glyph.width().unwrap_or(0);
        if used + columns > max_columns - 1 {
            break;
        }
        used += columns;
        truncated.push(glyph);
    }
    truncated.push('…');
    truncated
}

pub fn stable_pair(id: &str) -> (f64, f64) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = (hash & 0xffff_ffff) as f64 / u32::MAX as f64;
    let y = ((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_labels_are_kept() {
        assert_eq!(truncate_label("graph", 10), "graph");
        assert_eq!(truncate_label("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn long_labels_end_with_ellipsis() {
        assert_eq!(truncate_label("architecture decision", 8), "archite…");
        assert_eq!(truncate_label("ab", 1), "…");
        assert_eq!(truncate_label("anything", 0), "");
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        assert_eq!(truncate_label("ünïcödé", 4), "ünï…");
    }

    #[test]
    fn truncation_counts_terminal_columns() {
        assert_eq!(truncate_label("日本語メモ", 10), "日本語メモ");
        assert_eq!(truncate_label("日本語メモ", 6), "日本…");
        assert_eq!(truncate_label("日本語メモ", 5), "日本…");
        assert_eq!(truncate_label("a日本", 4), "a日…");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let first = stable_pair("mem-42");
        assert_eq!(first, stable_pair("mem-42"));
        assert_ne!(first, stable_pair("mem-43"));
        for id in ["a", "b", "c", "memory", ""] {
            let (x, y) = stable_pair(id);
            assert!((-1.0..=1.0).contains(&x));
            assert!((-1.0..=1.0).contains(&y));
        }
    }
}
