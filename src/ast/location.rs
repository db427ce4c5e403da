use std::fmt;

use crate::program::Uri;
use crate::syntax::lexer::{SourcePosition, SourcePositionSpan};

/// Where a node is found: the document and the range inside it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub uri: Uri,
    pub span: SourcePositionSpan,
}

impl Location {
    pub fn new(uri: Uri, span: SourcePositionSpan) -> Self {
        Self { uri, span }
    }

    pub fn contains(&self, position: SourcePosition) -> bool {
        self.span.contains(position)
    }

    /// Range from the start of `self` to the end of `other`, in the document of `self`.
    pub fn to(&self, other: &Location) -> Location {
        Location::new(self.uri.clone(), self.span.to(other.span))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uri, self.span.start)
    }
}
