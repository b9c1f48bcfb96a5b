//! Text normalization with a reversible offset mapping.
//!
//! Search and cross-run text assembly operate over a normalized page string:
//! folded punctuation, decomposed compatibility characters, stripped
//! diacritics and collapsed line breaks. Every rewrite records a shift entry
//! so a position in the normalized string maps back to the character it came
//! from in the raw text.
//!
//! Offsets on both sides are character indices, not byte offsets.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// One entry of the offset table: from normalized index `new_index` onward
/// (until the next entry), `original = normalized + shift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetEntry {
    pub new_index: usize,
    pub shift: isize,
}

/// Result of [`normalize`]: the rewritten text plus the table mapping its
/// character indices back to the raw text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizedText {
    pub text: String,
    /// Strictly increasing by `new_index`; always starts at index 0.
    pub offsets: Vec<OffsetEntry>,
    /// Whether the raw text carried combining marks (including stripped
    /// ones). Drives diacritic-tolerant query compilation.
    pub has_diacritics: bool,
}

impl NormalizedText {
    /// Map a normalized character index (`0..=len`) to its raw index.
    pub fn original_index(&self, i: usize) -> usize {
        let k = self.offsets.partition_point(|e| e.new_index <= i);
        let shift = self.offsets[k - 1].shift;
        (i as isize + shift) as usize
    }

    /// Map a normalized `(start, len)` character range to the raw range it
    /// was rewritten from. Both bounds remap independently through the entry
    /// at or before them.
    pub fn remap_range(&self, start: usize, len: usize) -> (usize, usize) {
        let orig_start = self.original_index(start);
        let orig_end = self.original_index(start + len);
        (orig_start, orig_end.saturating_sub(orig_start))
    }
}

/// Combining marks that are never stripped: they change the identity of the
/// cluster rather than decorating it (kana voicing, viramas and a few
/// Tibetan vowel signs).
pub fn is_diacritic_exception(c: char) -> bool {
    matches!(
        c as u32,
        // kana voicing
        0x3099 | 0x309a
        // viramas
        | 0x094d | 0x09cd | 0x0a4d | 0x0acd | 0x0b4d | 0x0bcd | 0x0c4d
        | 0x0ccd | 0x0d3b | 0x0d3c | 0x0d4d | 0x0dca | 0x0e3a | 0x0eba
        | 0x0f84 | 0x1039 | 0x103a | 0x1714 | 0x1734 | 0x17d2 | 0x1a60
        | 0x1b44 | 0x1baa | 0x1bab | 0x1bf2 | 0x1bf3 | 0x2d7f | 0xa806
        | 0xa82c | 0xa8c4 | 0xa953 | 0xa9c0 | 0xaaf6 | 0xabed
        // combining classes 91, 129, 130 and 132
        | 0x0c56
        | 0x0f71
        | 0x0f72 | 0x0f7a | 0x0f7b | 0x0f7c | 0x0f7d | 0x0f80
        | 0x0f74
    )
}

/// Punctuation and vulgar-fraction folds applied before any decomposition.
fn fold_char(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{2010}' => "-",
        '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{201b}' => "'",
        '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' => "\"",
        '\u{00bc}' => "1/4",
        '\u{00bd}' => "1/2",
        '\u{00be}' => "3/4",
        _ => return None,
    })
}

/// Characters folded through compatibility decomposition: circled
/// numbers/letters, enclosed CJK, and the half/full-width block.
fn needs_compat_fold(c: char) -> bool {
    matches!(
        c as u32,
        0x2460..=0x2473 | 0x24b6..=0x24ff | 0x3244..=0x32bf
        | 0x32d0..=0x32fe | 0xff00..=0xffef
    )
}

/// Scripts whose line breaks carry no word gap, so an end-of-line after them
/// collapses without an inserted space.
fn joins_without_space(c: char) -> bool {
    matches!(
        c,
        '\u{3040}'..='\u{30ff}'          // hiragana, katakana
        | '\u{3400}'..='\u{4dbf}'        // CJK extension A
        | '\u{4e00}'..='\u{9fff}'        // CJK unified
        | '\u{f900}'..='\u{faff}'        // CJK compatibility
        | '\u{ff66}'..='\u{ff9f}'        // halfwidth katakana
    )
}

struct TableBuilder {
    out: String,
    out_len: usize,
    offsets: Vec<OffsetEntry>,
    cur_shift: isize,
}

impl TableBuilder {
    fn new() -> Self {
        TableBuilder {
            out: String::new(),
            out_len: 0,
            offsets: vec![OffsetEntry {
                new_index: 0,
                shift: 0,
            }],
            cur_shift: 0,
        }
    }

    /// Emit the rewrite of a segment starting at raw index `raw_index` and
    /// consuming `consumed` raw characters. Every emitted character beyond
    /// the first maps back to the segment's last raw character, so the
    /// original index stays monotone across length-changing rewrites.
    fn emit(&mut self, raw_index: usize, consumed: usize, text: impl Iterator<Item = char>) {
        for (j, ch) in text.enumerate() {
            let desired = raw_index + j.min(consumed - 1);
            let shift = desired as isize - self.out_len as isize;
            if shift != self.cur_shift {
                self.offsets.push(OffsetEntry {
                    new_index: self.out_len,
                    shift,
                });
                self.cur_shift = shift;
            }
            self.out.push(ch);
            self.out_len += 1;
        }
    }

    fn finish(mut self, raw_len: usize, has_diacritics: bool) -> NormalizedText {
        // Close the table so index len(normalized) maps to len(raw) even
        // when trailing raw characters were consumed without output.
        let final_shift = raw_len as isize - self.out_len as isize;
        match self.offsets.last_mut() {
            Some(last) if last.new_index == self.out_len => last.shift = final_shift,
            _ => {
                if final_shift != self.cur_shift {
                    self.offsets.push(OffsetEntry {
                        new_index: self.out_len,
                        shift: final_shift,
                    });
                }
            }
        }
        NormalizedText {
            text: self.out,
            offsets: self.offsets,
            has_diacritics,
        }
    }
}

/// Normalize `raw` in a single scan, building the offset table as rewrites
/// happen.
///
/// Rules, in match order per character: punctuation/fraction folding,
/// compatibility decomposition for enclosed and width-variant characters,
/// line-break collapsing (dropped after CJK/kana, dropped together with a
/// preceding word-attached hyphen, a single space otherwise), and canonical
/// decomposition of everything else with non-exception combining marks
/// stripped. Hangul syllables decompose into their jamo through the same
/// canonical pass.
pub fn normalize(raw: &str) -> NormalizedText {
    let chars: Vec<char> = raw.chars().collect();
    let mut b = TableBuilder::new();
    let mut has_diacritics = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            if i > 0 && joins_without_space(chars[i - 1]) {
                // Consumed without output; the table catches up at the next
                // emitted character.
            } else {
                b.emit(i, 1, std::iter::once(' '));
            }
            i += 1;
            continue;
        }

        if let Some(folded) = fold_char(c) {
            b.emit(i, 1, folded.chars());
            i += 1;
            continue;
        }

        if needs_compat_fold(c) {
            let mut kept = String::new();
            for ch in std::iter::once(c).nfkc() {
                if is_combining_mark(ch) {
                    has_diacritics = true;
                    if !is_diacritic_exception(ch) {
                        continue;
                    }
                }
                kept.push(ch);
            }
            b.emit(i, 1, kept.chars());
            i += 1;
            continue;
        }

        // Base character plus any directly following combining marks.
        let mut cluster_len = 1;
        while i + cluster_len < chars.len() && is_combining_mark(chars[i + cluster_len]) {
            cluster_len += 1;
        }

        // A word character, a hyphen, then an end-of-line is a hyphenation
        // artifact: keep the word character, drop the rest.
        let mut consumed = cluster_len;
        if c.is_alphanumeric()
            && i + consumed + 1 < chars.len()
            && chars[i + consumed] == '-'
            && chars[i + consumed + 1] == '\n'
        {
            consumed += 2;
        }

        let mut kept = String::new();
        for ch in chars[i..i + cluster_len].iter().copied().nfd() {
            if is_combining_mark(ch) {
                has_diacritics = true;
                if !is_diacritic_exception(ch) {
                    continue;
                }
            }
            kept.push(ch);
        }
        b.emit(i, consumed, kept.chars());
        i += consumed;
    }

    b.finish(chars.len(), has_diacritics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_slice(s: &str, start: usize, len: usize) -> String {
        s.chars().skip(start).take(len).collect()
    }

    fn check_table(n: &NormalizedText, raw: &str) {
        for pair in n.offsets.windows(2) {
            assert!(pair[0].new_index < pair[1].new_index, "table not strictly increasing");
        }
        let out_len = n.text.chars().count();
        let mut prev = 0;
        for i in 0..=out_len {
            let orig = n.original_index(i);
            assert!(orig >= prev, "original index not monotone at {i}");
            prev = orig;
        }
        assert_eq!(n.original_index(out_len), raw.chars().count());
    }

    #[test]
    fn plain_ascii_is_identity() {
        let n = normalize("hello world");
        assert_eq!(n.text, "hello world");
        assert_eq!(n.offsets, vec![OffsetEntry { new_index: 0, shift: 0 }]);
        assert!(!n.has_diacritics);
        check_table(&n, "hello world");
    }

    #[test]
    fn empty_input() {
        let n = normalize("");
        assert_eq!(n.text, "");
        assert_eq!(n.original_index(0), 0);
    }

    #[test]
    fn curly_quotes_fold_to_straight() {
        let n = normalize("\u{201c}hi\u{201d} it\u{2019}s");
        assert_eq!(n.text, "\"hi\" it's");
        check_table(&n, "\u{201c}hi\u{201d} it\u{2019}s");
    }

    #[test]
    fn vulgar_fraction_expands_and_remaps() {
        let raw = "a\u{00bd}b";
        let n = normalize(raw);
        assert_eq!(n.text, "a1/2b");
        check_table(&n, raw);
        // The whole fraction maps back to the single raw character.
        assert_eq!(n.remap_range(1, 3), (1, 1));
        // A match covering the fraction and its neighbor spans both.
        assert_eq!(n.remap_range(1, 4), (1, 2));
    }

    #[test]
    fn circled_number_folds() {
        let n = normalize("\u{2460}");
        assert_eq!(n.text, "1");
        check_table(&n, "\u{2460}");
    }

    #[test]
    fn fullwidth_forms_fold() {
        let raw = "\u{ff28}\u{ff49}"; // "Ｈｉ"
        let n = normalize(raw);
        assert_eq!(n.text, "Hi");
        check_table(&n, raw);
    }

    #[test]
    fn hyphen_line_break_collapses() {
        let raw = "work-\naround";
        let n = normalize(raw);
        assert_eq!(n.text, "workaround");
        check_table(&n, raw);
        // Remapping "work" picks up the consumed hyphen and newline.
        let (start, len) = n.remap_range(0, 4);
        assert_eq!((start, len), (0, 6));
        let sliced = char_slice(raw, start, len);
        assert_eq!(normalize(&sliced).text, "work");
    }

    #[test]
    fn hyphen_after_non_word_char_survives() {
        let n = normalize("x -\ny");
        assert_eq!(n.text, "x - y");
    }

    #[test]
    fn line_break_becomes_space() {
        let raw = "foo\nbar";
        let n = normalize(raw);
        assert_eq!(n.text, "foo bar");
        assert_eq!(n.remap_range(4, 3), (4, 3));
        check_table(&n, raw);
    }

    #[test]
    fn line_break_after_cjk_collapses_silently() {
        let raw = "\u{4e2d}\n\u{6587}";
        let n = normalize(raw);
        assert_eq!(n.text, "\u{4e2d}\u{6587}");
        check_table(&n, raw);
        // The second ideograph sits at raw index 2.
        assert_eq!(n.remap_range(1, 1), (2, 1));
    }

    #[test]
    fn line_break_after_kana_collapses_silently() {
        let n = normalize("\u{30ab}\n\u{30ca}");
        assert_eq!(n.text, "\u{30ab}\u{30ca}");
    }

    #[test]
    fn diacritics_stripped_and_flagged() {
        // Composed and decomposed forms normalize to the bare letter.
        let composed = normalize("caf\u{e9}");
        assert_eq!(composed.text, "cafe");
        assert!(composed.has_diacritics);
        let decomposed = normalize("cafe\u{301}");
        assert_eq!(decomposed.text, "cafe");
        assert!(decomposed.has_diacritics);
        check_table(&decomposed, "cafe\u{301}");
    }

    #[test]
    fn exception_marks_are_never_stripped() {
        // Devanagari virama.
        let raw = "\u{0915}\u{094d}\u{0915}";
        let n = normalize(raw);
        assert!(n.text.contains('\u{094d}'));
        check_table(&n, raw);
        // Kana voicing mark.
        let n = normalize("\u{30ab}\u{3099}");
        assert!(n.text.contains('\u{3099}'));
    }

    #[test]
    fn hangul_decomposes_to_jamo() {
        let raw = "\u{d55c}x";
        let n = normalize(raw);
        assert_eq!(n.text, "\u{1112}\u{1161}\u{11ab}x");
        check_table(&n, raw);
        // All three jamo remap to the single syllable.
        assert_eq!(n.remap_range(0, 3), (0, 1));
        assert_eq!(n.remap_range(3, 1), (1, 1));
    }

    #[test]
    fn reslice_round_trip() {
        let cases = [
            ("work-\naround plan", 0, 10),   // "workaround"
            ("a\u{00bc}b cd", 1, 3),         // "1/4"
            ("\u{4e2d}\n\u{6587} ok", 0, 2), // the two ideographs
            ("caf\u{e9} bar", 0, 4),         // "cafe"
        ];
        for (raw, start, len) in cases {
            let n = normalize(raw);
            let matched = char_slice(&n.text, start, len);
            let (ostart, olen) = n.remap_range(start, len);
            let resliced = char_slice(raw, ostart, olen);
            assert_eq!(
                normalize(&resliced).text,
                matched,
                "round trip failed for {raw:?}"
            );
        }
    }

    #[test]
    fn table_properties_hold_on_mixed_input() {
        let raws = [
            "",
            "plain",
            "line-\nbreak",
            "\u{201c}q\u{201d}\n\u{00bd}",
            "\u{d55c}\u{d55c}\n\u{4e2d}",
            "e\u{301}\u{0915}\u{094d}",
            "tail-\n",
        ];
        for raw in raws {
            check_table(&normalize(raw), raw);
        }
    }

    #[test]
    fn zero_width_range_remaps_to_position() {
        let n = normalize("work-\naround");
        let (start, len) = n.remap_range(4, 0);
        assert_eq!(len, 0);
        assert_eq!(start, 6); // position of 'a' in the raw text
    }
}
