//! Word / character / reading-time statistics over flattened text.

use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    pub words: usize,
    /// Grapheme clusters, whitespace included.
    pub characters: usize,
    pub characters_no_spaces: usize,
    /// Non-blank lines of the flattened text.
    pub paragraphs: usize,
    pub reading_minutes: usize,
}

impl TextStats {
    pub fn compute(text: &str, words_per_minute: usize) -> Self {
        let words = text.unicode_words().count();
        let mut characters = 0usize;
        let mut characters_no_spaces = 0usize;
        for g in text.graphemes(true) {
            characters += 1;
            if !g.chars().all(char::is_whitespace) {
                characters_no_spaces += 1;
            }
        }
        let paragraphs = text.split('\n').filter(|l| !l.trim().is_empty()).count();
        let reading_minutes = if words == 0 {
            0
        } else {
            words.div_ceil(words_per_minute.max(1))
        };
        Self {
            words,
            characters,
            characters_no_spaces,
            paragraphs,
            reading_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_graphemes() {
        let s = TextStats::compute("Hello world.\nCafe\u{301} time", 200);
        assert_eq!(s.words, 4);
        assert_eq!(s.characters, 22);
        assert_eq!(s.characters_no_spaces, 19);
        assert_eq!(s.paragraphs, 2);
        assert_eq!(s.reading_minutes, 1);
    }

    #[test]
    fn reading_time_rounds_up() {
        let text = "word ".repeat(401);
        assert_eq!(TextStats::compute(&text, 200).reading_minutes, 3);
    }

    #[test]
    fn empty_text_is_all_zero() {
        assert_eq!(TextStats::compute("", 200), TextStats::default());
    }
}
