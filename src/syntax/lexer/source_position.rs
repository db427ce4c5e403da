use std::fmt;

/// A zero-based position in a document. Columns count characters, not bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn increment_column(&mut self) {
        self.column += 1;
    }

    pub fn increment_line(&mut self) {
        self.line += 1;
        self.column = 0;
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Half-open range `[start, end)` between two positions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourcePositionSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourcePositionSpan {
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// Span on a single line, e.g. `on_line(0, 6, 9)` for columns 6..9 of the first line.
    pub fn on_line(line: usize, start: usize, end: usize) -> Self {
        Self::new(SourcePosition::new(line, start), SourcePosition::new(line, end))
    }

    /// Zero width span at `position`.
    pub fn empty(position: SourcePosition) -> Self {
        Self::new(position, position)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(&self, other: SourcePositionSpan) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// True when `position` lies within the span. The end is inclusive so that a cursor placed
    /// right after a word still hits it.
    pub fn contains(&self, position: SourcePosition) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn contains_span(&self, other: &SourcePositionSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for SourcePositionSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
