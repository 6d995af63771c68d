//! Source-position tracking, shared by the lexer, parser and error types.

use std::fmt::{self, Display, Formatter};

/// A region of the original source text. Carried by every token and AST
/// node so that parse/semantic/runtime errors can point back at the
/// offending source.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    /// A zero-width span at the very start of a source, used when no more
    /// precise location is available (e.g. "end of input" errors).
    pub fn initial() -> Self {
        Self {
            offset: 0,
            length: 0,
            start_line: 1,
            start_col: 1,
            end_line: 1,
            end_col: 1,
        }
    }

    /// Get the slice of source text this span covers. Clamped to the bounds
    /// of `src`, so a slightly-stale span (e.g. after `src` was trimmed)
    /// never panics.
    pub fn get_source_slice<'a>(&self, src: &'a str) -> &'a str {
        let start = self.offset.min(src.len());
        let end = (self.offset + self.length).min(src.len());
        &src[start..end]
    }

    /// Combine two spans into one that covers both, e.g. for a binary
    /// expression's span covering `left op right`.
    pub fn through(&self, other: Span) -> Span {
        Span {
            offset: self.offset,
            length: (other.offset + other.length).saturating_sub(self.offset),
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: other.end_line,
            end_col: other.end_col,
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Pretty-print a `^^^` highlight under the line covered by `span`, appended
/// to an error's `Display` output when the alternate (`{:#}`) format flag is
/// set.
pub fn fmt_src_highlights(
    f: &mut Formatter<'_>,
    span: &Span,
    source: &str,
) -> fmt::Result {
    if let Some(line) = source.lines().nth(span.start_line.saturating_sub(1)) {
        writeln!(f)?;
        writeln!(f, "  {}", line)?;
        let indent = " ".repeat(2 + span.start_col.saturating_sub(1));
        let carets = "^".repeat(span.length.max(1));
        write!(f, "{}{}", indent, carets)?;
    }
    Ok(())
}
