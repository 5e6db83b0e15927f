/// テキスト処理ユーティリティ。
///
/// ハッシング、文字数での切り詰め、単語数カウントを提供します。
use unicode_segmentation::UnicodeSegmentation;
use xxhash_rust::xxh3::xxh3_64;

/// テキストをXXH3でハッシュする。
#[must_use]
pub fn hash_text(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// 先頭から `max_chars` 文字までに切り詰める。
///
/// バイト境界ではなく文字境界で切るため、マルチバイト文字を壊さない。
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// UAX#29 の単語境界で数えた単語数。
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_text_is_deterministic() {
        assert_eq!(hash_text("loved ride"), hash_text("loved ride"));
        assert_ne!(hash_text("loved ride"), hash_text("hated ride"));
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("café au lait", 4), "café");
        assert_eq!(truncate_chars("short", 450), "short");
        assert_eq!(truncate_chars("", 3), "");
        assert_eq!(truncate_chars("香港迪士尼", 2), "香港");
    }

    #[test]
    fn word_count_ignores_punctuation() {
        assert_eq!(word_count("I loved the park!!!"), 4);
        assert_eq!(word_count("   "), 0);
    }
}
