//! Greedy fixed-width line wrapping with punctuation-aware break points.
//!
//! Widths are counted in chars: the preview renders CJK ability text where one
//! char is roughly one em, so a char budget per line is a good enough proxy for
//! measured width.

/// Characters after which a line may break.
pub const BREAK_CHARS: &[char] = &[
    ' ', '\t', '\n', ',', '.', ';', ':', '!', '?', ')', ']', '-', '，', '。', '、', '；', '：',
    '！', '？', '）', '】', '」', '』', '”', '’', '—', '…',
];

/// How far back from the hard cut point a break character is searched for.
pub const BREAK_LOOKBACK: usize = 5;

/// Appended to the last line when text had to be dropped.
pub const ELLIPSIS: char = '…';

/// Wraps `text` into at most `max_lines` lines of at most `max_chars` chars.
///
/// Breaks land just after a character from [`BREAK_CHARS`] when one occurs in
/// the last [`BREAK_LOOKBACK`] chars of a full line, otherwise the line is hard-cut.
/// When the line cap leaves text over, the final line is shortened and ends
/// with [`ELLIPSIS`]. Stripping that ellipsis, the concatenated lines are always
/// a prefix of `text`.
pub fn wrap_text(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    if text.is_empty() || max_lines == 0 {
        return Vec::new();
    }
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    let mut pos = 0;
    while pos < chars.len() && lines.len() < max_lines {
        let remaining = chars.len() - pos;
        if remaining <= max_chars {
            lines.push(chars[pos..].iter().collect());
            pos = chars.len();
            break;
        }

        let cut = pos + max_chars;
        let floor = cut.saturating_sub(BREAK_LOOKBACK).max(pos);
        let end = (floor..cut)
            .rev()
            .find(|&i| BREAK_CHARS.contains(&chars[i]))
            .map(|i| i + 1)
            .unwrap_or(cut);

        lines.push(chars[pos..end].iter().collect());
        pos = end;
    }

    if pos < chars.len() {
        if let Some(last) = lines.last_mut() {
            let kept: String = last.chars().take(max_chars - 1).collect();
            *last = format!("{}{ELLIPSIS}", kept.trim_end());
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(lines: &[String]) -> String {
        let mut joined = lines.concat();
        if joined.ends_with(ELLIPSIS) {
            joined.pop();
        }
        joined
    }

    #[test]
    fn test_short_text_is_one_line() {
        assert_eq!(wrap_text("每晚选择一名玩家", 19, 5), vec!["每晚选择一名玩家"]);
    }

    #[test]
    fn test_empty_text_and_zero_cap() {
        assert!(wrap_text("", 19, 5).is_empty());
        assert!(wrap_text("abc", 19, 0).is_empty());
    }

    #[test]
    fn test_long_ability_is_capped_with_ellipsis() {
        let ability = "毒".repeat(120);
        let lines = wrap_text(&ability, 19, 5);
        assert_eq!(lines.len(), 5);
        assert!(lines.last().unwrap().ends_with(ELLIPSIS));
        assert!(lines.iter().all(|l| l.chars().count() <= 19));
        assert!(ability.starts_with(&strip(&lines)));
    }

    #[test]
    fn test_breaks_after_punctuation_within_lookback() {
        // Full-width comma sits 2 chars before the 10-char cut point.
        let text = "每晚选择一名玩家，他今晚中毒。";
        let lines = wrap_text(text, 10, 5);
        assert_eq!(lines[0], "每晚选择一名玩家，");
        assert_eq!(lines[1], "他今晚中毒。");
    }

    #[test]
    fn test_breaks_at_space_inclusive() {
        let lines = wrap_text("Each night choose a player", 12, 5);
        assert_eq!(lines[0], "Each night ");
        assert_eq!(lines.concat(), "Each night choose a player");
    }

    #[test]
    fn test_hard_cut_when_no_break_nearby() {
        let lines = wrap_text("abcdefghijklmnop", 5, 10);
        assert_eq!(lines, vec!["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn test_break_beyond_lookback_is_ignored() {
        // The only space is 7 chars before the cut point.
        let lines = wrap_text("ab cdefghijklmn", 10, 5);
        assert_eq!(lines[0], "ab cdefghi");
    }

    #[test]
    fn test_never_exceeds_cap_and_stays_a_prefix() {
        let samples = [
            "你的能力：每个夜晚，选择一名玩家：如果他是恶魔，你会得知。否则你会得知他的阵营。",
            "If you die at night, choose a player; they learn a true fact, a false fact.",
            "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        ];
        for text in samples {
            for width in 1..25 {
                for cap in 1..6 {
                    let lines = wrap_text(text, width, cap);
                    assert!(lines.len() <= cap, "{text:?} w={width} cap={cap}");
                    assert!(
                        text.starts_with(&strip(&lines)),
                        "{text:?} w={width} cap={cap}: {lines:?}"
                    );
                }
            }
        }
    }
}
