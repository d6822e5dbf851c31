//! Fixed-width text rendering of ranked entries.
//!
//! Every width decision here is made in terminal columns, not characters:
//! wide East Asian characters and most emoji take two columns, combining
//! marks and control characters take none. A gist is shown in a monospace
//! font, so counting characters would misalign the columns as soon as a
//! title contains CJK text.

use crate::types::{RankedEntry, RenderMode};
use crate::{GistError, Result};
use std::borrow::Cow;
use unicode_width::UnicodeWidthChar;

/// Suffix appended to truncated text.
pub const ELLIPSIS: &str = "...";
/// Glyph for the filled part of a bar.
pub const BAR_FILLED: char = '█';
/// Glyph for the empty part of a bar.
pub const BAR_EMPTY: char = '░';
/// Filler between the title and artist columns in dot-leader mode.
pub const LEADER: char = '.';
/// Fewest filler characters a dot-leader line can have.
pub const MIN_LEADER: usize = 3;

const ELLIPSIS_WIDTH: usize = ELLIPSIS.len();

/// Column budgets for the rendered lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Columns reserved for the track title
    pub title_width: usize,
    /// Columns reserved for the artist name (dot-leader mode)
    pub artist_width: usize,
    /// Total glyphs in a bar (bar-chart mode)
    pub bar_length: usize,
    /// Columns the play count is right-aligned in
    pub count_width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            title_width: 28,
            artist_width: 20,
            bar_length: 16,
            count_width: 4,
        }
    }
}

impl Layout {
    /// Field budgets must leave room for at least one character plus the ellipsis.
    pub fn validate(&self) -> Result<()> {
        if self.title_width <= ELLIPSIS_WIDTH {
            return Err(GistError::Config(format!(
                "title width must be at least {}",
                ELLIPSIS_WIDTH + 1
            )));
        }
        if self.artist_width <= ELLIPSIS_WIDTH {
            return Err(GistError::Config(format!(
                "artist width must be at least {}",
                ELLIPSIS_WIDTH + 1
            )));
        }
        if self.bar_length == 0 {
            return Err(GistError::Config("bar length must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Columns occupied by a single character.
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Columns occupied by a string, summed per character.
pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Replace control characters (newlines, tabs and the like) with spaces so
/// a name always stays on its own line.
pub fn single_line(text: &str) -> Cow<'_, str> {
    if text.chars().any(char::is_control) {
        Cow::Owned(
            text.chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

/// Truncate `text` to at most `max_width` columns, marking the cut with [`ELLIPSIS`].
///
/// Text that already fits is returned unchanged. Otherwise characters are
/// kept from the front while they still leave room for the ellipsis; a wide
/// character that would straddle the limit is dropped rather than split, so
/// the result can be one column short of `max_width`.
///
/// ```rust
/// use lastfm_gist::render::{display_width, ellipsis};
///
/// assert_eq!(ellipsis("Karma Police", 28), "Karma Police");
/// assert_eq!(ellipsis("Everything In Its Right Place", 16), "Everything In...");
///
/// let cut = ellipsis("夜に駆ける夜に駆ける", 9);
/// assert_eq!(cut, "夜に駆...");
/// assert!(display_width(&cut) <= 9);
/// ```
pub fn ellipsis(text: &str, max_width: usize) -> String {
    if display_width(text) <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(ELLIPSIS_WIDTH);
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let width = char_width(c);
        if used + width > budget {
            break;
        }
        out.push(c);
        used += width;
    }
    out.push_str(ELLIPSIS);
    out
}

/// Append spaces until `text` is `width` columns wide. Never truncates.
pub fn pad_right(text: &str, width: usize) -> String {
    let current = display_width(text);
    if current >= width {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + width - current);
    out.push_str(text);
    out.extend(std::iter::repeat(' ').take(width - current));
    out
}

/// A bar of `length` glyphs, `percent` of them filled (rounded to nearest).
pub fn progress_bar(percent: f64, length: usize) -> String {
    let filled = ((percent / 100.0) * length as f64).round();
    let filled = if filled.is_finite() && filled > 0.0 {
        (filled as usize).min(length)
    } else {
        0
    };
    let mut bar = String::with_capacity(length * BAR_FILLED.len_utf8());
    bar.extend(std::iter::repeat(BAR_FILLED).take(filled));
    bar.extend(std::iter::repeat(BAR_EMPTY).take(length - filled));
    bar
}

/// The line published when nothing was played inside the window.
pub fn placeholder(window_days: i64) -> String {
    if window_days == 1 {
        "No scrobbles in the last day.".to_string()
    } else {
        format!("No scrobbles in the last {window_days} days.")
    }
}

/// `title ████████░░░░░░░░    2`
pub fn bar_chart_line(entry: &RankedEntry, total: u64, layout: &Layout) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        f64::from(entry.play_count) / total as f64 * 100.0
    };
    let title = pad_right(
        &ellipsis(&single_line(&entry.track), layout.title_width),
        layout.title_width,
    );
    let bar = progress_bar(percent, layout.bar_length);
    format!(
        "{title} {bar} {count:>width$}",
        count = entry.play_count,
        width = layout.count_width
    )
}

/// `title ......... artist    2`
///
/// The artist always starts at column `title_width + MIN_LEADER + 2`,
/// whatever the title's width.
pub fn dot_leader_line(entry: &RankedEntry, layout: &Layout) -> String {
    let title = ellipsis(&single_line(&entry.track), layout.title_width);
    let leader_len = (layout.title_width + MIN_LEADER)
        .saturating_sub(display_width(&title))
        .max(1);
    let leader: String = std::iter::repeat(LEADER).take(leader_len).collect();
    let artist = pad_right(
        &ellipsis(&single_line(&entry.artist), layout.artist_width),
        layout.artist_width,
    );
    format!(
        "{title} {leader} {artist} {count:>width$}",
        count = entry.play_count,
        width = layout.count_width
    )
}

/// Render the entries one per line, or the placeholder when there are none.
///
/// In bar-chart mode each bar's share is relative to the total of the
/// rendered entries, not of every play in the window.
pub fn render(
    entries: &[RankedEntry],
    mode: RenderMode,
    layout: &Layout,
    window_days: i64,
) -> String {
    if entries.is_empty() {
        return placeholder(window_days);
    }

    match mode {
        RenderMode::BarChart => {
            let total: u64 = entries.iter().map(|e| u64::from(e.play_count)).sum();
            entries
                .iter()
                .map(|entry| bar_chart_line(entry, total, layout))
                .collect::<Vec<_>>()
                .join("\n")
        }
        RenderMode::DotLeader => entries
            .iter()
            .map(|entry| dot_leader_line(entry, layout))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_width() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("漢字"), 4);
        assert_eq!(display_width("ｱ"), 1); // halfwidth katakana
        assert_eq!(display_width("Ａ"), 2); // fullwidth latin
        assert_eq!(display_width("e\u{301}"), 1); // combining acute
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn test_ellipsis_short_text_unchanged() {
        assert_eq!(ellipsis("Creep", 28), "Creep");
        assert_eq!(ellipsis("exactly-ten", 11), "exactly-ten");
    }

    #[test]
    fn test_ellipsis_ascii() {
        let cut = ellipsis("abcdefghijklmnopqrstuvwxyz", 10);
        assert_eq!(cut, "abcdefg...");
        assert_eq!(display_width(&cut), 10);
    }

    #[test]
    fn test_ellipsis_wide_characters() {
        let title: String = std::iter::repeat('漢').take(30).collect();
        let cut = ellipsis(&title, 28);
        assert!(display_width(&cut) <= 28);
        assert!(cut.ends_with(ELLIPSIS));
        // 25 columns of budget fit 12 wide characters, the 13th would straddle
        assert_eq!(cut.chars().filter(|c| *c == '漢').count(), 12);
        assert_eq!(display_width(&cut), 27);
    }

    #[test]
    fn test_ellipsis_mixed_width() {
        let cut = ellipsis("Lemon 米津玄師 Official", 12);
        assert_eq!(cut, "Lemon 米...");
        assert!(display_width(&cut) <= 12);
    }

    #[test]
    fn test_pad_right() {
        assert_eq!(pad_right("ab", 5), "ab   ");
        assert_eq!(pad_right("漢", 5), "漢   ");
        assert_eq!(pad_right("abcdef", 3), "abcdef");
        assert_eq!(pad_right("abc", 3), "abc");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(100.0, 4), "████");
        assert_eq!(progress_bar(0.0, 4), "░░░░");
        assert_eq!(progress_bar(50.0, 4), "██░░");
        // 12.5% of 4 is exactly half a glyph and rounds up
        assert_eq!(progress_bar(12.5, 4), "█░░░");
        assert_eq!(progress_bar(f64::NAN, 3), "░░░");
        assert_eq!(progress_bar(250.0, 3), "███");
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(placeholder(7), "No scrobbles in the last 7 days.");
        assert_eq!(placeholder(1), "No scrobbles in the last day.");
    }

    #[test]
    fn test_empty_render_is_placeholder() {
        for mode in [RenderMode::BarChart, RenderMode::DotLeader] {
            let out = render(&[], mode, &Layout::default(), 7);
            assert_eq!(out, "No scrobbles in the last 7 days.");
        }
    }

    #[test]
    fn test_bar_chart_lines() {
        let entries = vec![RankedEntry::new("A", "X", 2), RankedEntry::new("B", "Y", 1)];
        let out = render(&entries, RenderMode::BarChart, &Layout::default(), 7);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let filled = |line: &str| line.chars().filter(|c| *c == BAR_FILLED).count();
        assert!(filled(lines[0]) > filled(lines[1]));
        assert_eq!(filled(lines[0]), 11);
        assert_eq!(filled(lines[1]), 5);

        assert_eq!(&lines[0][lines[0].len() - 4..], "   2");
        assert_eq!(&lines[1][lines[1].len() - 4..], "   1");

        assert_eq!(
            lines[0],
            format!(
                "{}{} {}{} {}",
                "A",
                " ".repeat(27),
                "█".repeat(11),
                "░".repeat(5),
                "   2"
            )
        );
    }

    #[test]
    fn test_bar_chart_alignment_with_wide_titles() {
        let entries = vec![
            RankedEntry::new("紅蓮華", "LiSA", 3),
            RankedEntry::new("Bohemian Rhapsody", "Queen", 2),
            RankedEntry::new(&"ア".repeat(20), "Someone", 1),
        ];
        let layout = Layout::default();
        let out = render(&entries, RenderMode::BarChart, &layout, 7);
        for line in out.lines() {
            let bar_start = line.find(|c: char| c == BAR_FILLED || c == BAR_EMPTY).unwrap();
            assert_eq!(display_width(&line[..bar_start]), layout.title_width + 1);
            assert_eq!(
                display_width(line),
                layout.title_width + layout.bar_length + layout.count_width + 2
            );
        }
    }

    #[test]
    fn test_dot_leader_alignment() {
        let entries = vec![
            RankedEntry::new("Short", "Alpha", 9),
            RankedEntry::new("千本桜 (feat. 初音ミク) Extended Version", "Bravo", 4),
            RankedEntry::new("A title that is very much longer than the budget", "Charlie", 1),
        ];
        let layout = Layout::default();
        let out = render(&entries, RenderMode::DotLeader, &layout, 7);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);

        for (line, artist) in lines.iter().zip(["Alpha", "Bravo", "Charlie"]) {
            let pos = line.find(artist).unwrap();
            assert_eq!(display_width(&line[..pos]), layout.title_width + MIN_LEADER + 2);
            assert!(line.contains(&LEADER.to_string().repeat(MIN_LEADER)));
        }
        assert!(lines[0].ends_with("   9"));
    }

    #[test]
    fn test_dot_leader_truncates_artist() {
        let layout = Layout {
            artist_width: 8,
            ..Layout::default()
        };
        let line = dot_leader_line(
            &RankedEntry::new("Song", "The Artist Formerly Known", 1),
            &layout,
        );
        assert!(line.contains("The A..."));
        assert!(!line.contains("Formerly"));
    }

    #[test]
    fn test_control_characters_stay_on_one_line() {
        assert_eq!(single_line("Karma Police"), "Karma Police");
        assert_eq!(single_line("Line\nBreak\tTab"), "Line Break Tab");

        let entries = vec![
            RankedEntry::new("Paranoid\nAndroid", "Radio\thead", 2),
            RankedEntry::new("Airbag", "Radiohead", 1),
        ];
        let layout = Layout::default();
        for mode in [RenderMode::BarChart, RenderMode::DotLeader] {
            let out = render(&entries, mode, &layout, 7);
            let lines: Vec<&str> = out.lines().collect();
            assert_eq!(lines.len(), 2, "{mode:?}: {out:?}");
            assert!(lines[0].starts_with("Paranoid Android"));
            assert!(!out.contains('\t'));
            assert_eq!(display_width(lines[0]), display_width(lines[1]));
        }
    }

    #[test]
    fn test_layout_validation() {
        assert!(Layout::default().validate().is_ok());
        let narrow = Layout {
            title_width: 3,
            ..Layout::default()
        };
        assert!(narrow.validate().is_err());
        let no_bar = Layout {
            bar_length: 0,
            ..Layout::default()
        };
        assert!(no_bar.validate().is_err());
    }

    proptest! {
        #[test]
        fn ellipsis_fits_budget(text in "\\PC{0,60}", width in 4usize..60) {
            prop_assert!(display_width(&ellipsis(&text, width)) <= width);
        }

        #[test]
        fn ellipsis_fits_budget_any_string(text in any::<String>(), width in 4usize..40) {
            prop_assert!(display_width(&ellipsis(&text, width)) <= width);
        }

        #[test]
        fn ellipsis_is_idempotent(text in "[a-z漢字😀 ]{0,40}", width in 4usize..40) {
            let once = ellipsis(&text, width);
            prop_assert_eq!(ellipsis(&once, width), once);
        }

        #[test]
        fn pad_right_never_shrinks(text in "[a-z漢字😀 ]{0,20}", width in 0usize..40) {
            let padded = pad_right(&text, width);
            let original = display_width(&text);
            prop_assert!(display_width(&padded) >= width.min(original));
            if original >= width {
                prop_assert_eq!(padded, text);
            } else {
                prop_assert_eq!(display_width(&padded), width);
            }
        }

        #[test]
        fn bar_has_fixed_length(count in 0u32..1000, extra in 0u64..1000, length in 1usize..40) {
            let entry = RankedEntry::new("t", "a", count);
            let total = u64::from(count) + extra;
            let layout = Layout { bar_length: length, ..Layout::default() };
            let line = bar_chart_line(&entry, total, &layout);
            let glyphs = line.chars().filter(|c| *c == BAR_FILLED || *c == BAR_EMPTY).count();
            prop_assert_eq!(glyphs, length);
        }
    }
}
