//! Resolve where an entry point's body really starts in the source text

use crate::data::EntrypointLineRanges;
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

/// Read access to the live text of a source file, by 1-based line number.
///
/// Returns `None` past the end of the file.
pub trait SourceTextAccessor {
    fn line_text(&self, line: u32) -> Option<Cow<'_, str>>;
}

/// Source text split into lines, for callers without an editor buffer
#[derive(Debug, Clone, Default)]
pub struct SourceLines {
    lines: Vec<String>,
}

impl SourceLines {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_text(&text))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl SourceTextAccessor for SourceLines {
    fn line_text(&self, line: u32) -> Option<Cow<'_, str>> {
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        self.lines.get(index).map(|text| Cow::Borrowed(text.as_str()))
    }
}

/// Walk forward from a declaration-line hint to the line holding the
/// entry point's opening brace.
///
/// When nothing alphanumeric follows the brace on its line, the body
/// starts on the next line and that line is returned instead. If the file
/// ends first, the last line that could be read is returned (or the hint
/// itself when not even that line exists).
pub fn find_real_start_line<S>(hint: u32, source: &S) -> u32
where
    S: SourceTextAccessor + ?Sized,
{
    let mut search_line = hint;
    let mut last_examined = hint;

    while let Some(text) = source.line_text(search_line) {
        last_examined = search_line;

        if let Some(brace) = text.find('{') {
            let after_brace = &text[brace + 1..];
            if after_brace.chars().any(|c| c.is_ascii_alphanumeric()) {
                return search_line;
            }
            return search_line + 1;
        }

        search_line += 1;
    }

    debug!(
        "No opening brace after line {}; falling back to line {}",
        hint, last_examined
    );
    last_examined
}

/// Resolved start line of a recorded entry point, if its range is known
pub fn entry_start_line<S>(
    ranges: &EntrypointLineRanges,
    file_path: &str,
    entry_name: &str,
    source: &S,
) -> Option<u32>
where
    S: SourceTextAccessor + ?Sized,
{
    let (declared_start, _) = ranges.range(file_path, entry_name)?;
    Some(find_real_start_line(declared_start, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERNEL: &str = "\
#define N 4
__kernel void knr(__global float* out)
{
    out[0] = 1.0f;
}

__kernel void inline_brace(__global float* out) { out[0] = 2.0f;
}
__kernel void trailing(__global float* out) {   // body follows
    out[0] = 3.0f;
}";

    #[test]
    fn test_brace_alone_advances_one_line() {
        let source = SourceLines::from_text(KERNEL);
        // Brace on line 3 with nothing after it: body starts on line 4.
        assert_eq!(find_real_start_line(2, &source), 4);
    }

    #[test]
    fn test_code_after_brace_keeps_brace_line() {
        let source = SourceLines::from_text(KERNEL);
        assert_eq!(find_real_start_line(7, &source), 7);
    }

    #[test]
    fn test_comment_after_brace_counts_as_content() {
        let source = SourceLines::from_text(KERNEL);
        assert_eq!(find_real_start_line(9, &source), 9);
    }

    #[test]
    fn test_eof_without_brace_falls_back() {
        let source = SourceLines::from_text("void f()\n\n// no body yet\n");
        assert_eq!(find_real_start_line(1, &source), 3);
        assert_eq!(find_real_start_line(40, &source), 40);
        assert_eq!(find_real_start_line(0, &source), 0);
    }

    #[test]
    fn test_entry_start_line_uses_recorded_range() {
        let source = SourceLines::from_text(KERNEL);
        let mut ranges = EntrypointLineRanges::new();
        ranges.set_range("/k.cl", "knr", 2, 5);

        assert_eq!(entry_start_line(&ranges, "/k.cl", "knr", &source), Some(4));
        assert_eq!(entry_start_line(&ranges, "/k.cl", "missing", &source), None);
    }
}
