use std::fmt;

use strum_macros::Display;

use crate::ast::Location;
use crate::syntax::lexer::LexError;
use crate::syntax::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// Closed catalogue of everything the analyzer reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum Message {
    #[error("Unknown opcode '{0}'")]
    UnknownOpcode(String),
    #[error("Wrong addressing mode for '{0}'")]
    WrongAddressingMode(String),
    #[error("'{0}' only supports implied addressing")]
    ImpliedModeOnly(String),
    #[error("'{0}' requires an argument")]
    ImpliedModeUnavailable(String),
    #[error("'{0}' does not support immediate addressing")]
    ImmediateModeUnavailable(String),
    #[error("Too many arguments")]
    TooManyArguments,
    #[error("Missing command name")]
    MissingCommandName,
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Label '{0}' is not defined")]
    LabelNotDefined(String),
    #[error("Label '{0}' is defined both as a variable and as a constant")]
    LabelAsVariableAndConstant(String),
    #[error("Label '{0}' is defined more than once")]
    TooManyDefinitions(String),
    #[error("Circular include of '{0}'")]
    CircularInclude(String),
    #[error("File '{0}' can not be resolved")]
    FileNotResolvable(String),
    #[error("Folder '{0}' can not be resolved")]
    FolderNotResolvable(String),
    #[error("Empty string argument")]
    EmptyStringArgument,
    #[error("String literal expected")]
    StringLiteralExpected,
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("Relocation directive requires an argument")]
    NoArgumentForRelocationDirective,
    #[error("Relocation region is already open")]
    RelocationRegionOpenedTwice,
    #[error("'{0}' outside of a relocation region")]
    CommandOutsideRelocationRegion(String),
    #[error("Unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Missing character after quote")]
    MissingCharacter,
    #[error("Unterminated block comment")]
    UnterminatedComment,
    #[error("{0}")]
    SyntaxError(String),
}

impl Message {
    pub fn severity(&self) -> Severity {
        match self {
            Message::FolderNotResolvable(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A finding located in one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Diagnostic {
    pub location: Location,
    pub severity: Severity,
    pub message: Message,
}

impl Diagnostic {
    /// Diagnostic with the severity the message carries.
    pub fn new(message: Message, location: Location) -> Self {
        Self {
            location,
            severity: message.severity(),
            message,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn from_syntax_error(error: &SyntaxError, location: Location) -> Self {
        let message = match error {
            SyntaxError::Lex(LexError::UnexpectedCharacter { character, .. }) => {
                Message::UnexpectedCharacter(*character)
            }
            SyntaxError::Lex(LexError::UnterminatedString(_)) => Message::UnterminatedString,
            SyntaxError::Lex(LexError::MissingCharacter(_)) => Message::MissingCharacter,
            SyntaxError::Lex(LexError::UnterminatedComment(_)) => Message::UnterminatedComment,
            SyntaxError::Parse(error) => Message::SyntaxError(error.to_string()),
        };
        Diagnostic::new(message, location)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// Order diagnostics by location and drop exact duplicates.
///
/// The same finding can be reached twice, e.g. a file included from two places.
pub fn assemble(mut diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    diagnostics.sort();
    diagnostics.dedup();
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Uri;
    use crate::syntax::lexer::SourcePositionSpan;
    use crate::syntax::parse_document;

    use pretty_assertions::assert_eq;

    fn location(line: usize, start: usize, end: usize) -> Location {
        Location::new(
            Uri::parse("file:///diagnostics.asm").unwrap(),
            SourcePositionSpan::on_line(line, start, end),
        )
    }

    #[test]
    fn test_severity() {
        let tests = vec![
            (Message::FolderNotResolvable("inc/".to_string()), Severity::Warning),
            (Message::FileNotResolvable("a.asm".to_string()), Severity::Error),
            (Message::TooManyArguments, Severity::Error),
            (Message::UnexpectedCharacter('@'), Severity::Error),
        ];
        for (message, expected) in tests {
            assert_eq!(Diagnostic::new(message.clone(), location(0, 0, 1)).severity, expected, "{}", message);
        }
    }

    #[test]
    fn test_display() {
        let diagnostic = Diagnostic::new(Message::UnknownOpcode("FOO".to_string()), location(2, 4, 7));
        assert_eq!(
            diagnostic.to_string(),
            "file:///diagnostics.asm:3:5: error: Unknown opcode 'FOO'"
        );
    }

    #[test]
    fn test_assemble_sorts_and_deduplicates() {
        let late = Diagnostic::new(Message::TooManyArguments, location(3, 0, 1));
        let early = Diagnostic::new(Message::MissingCommandName, location(1, 2, 3));
        let assembled = assemble(vec![late.clone(), early.clone(), late.clone()]);
        assert_eq!(assembled, vec![early, late]);
    }

    #[test]
    fn test_from_syntax_error() {
        let document = parse_document("  LDA @\n  LDA (\n", &location(0, 0, 0).uri);
        let messages: Vec<Message> = document
            .errors
            .iter()
            .map(|error| Diagnostic::from_syntax_error(error, location(0, 0, 0)).message)
            .collect();
        assert_eq!(
            messages,
            vec![
                Message::UnexpectedCharacter('@'),
                Message::SyntaxError("Expected expression, found end of line".to_string()),
            ]
        );
    }
}
