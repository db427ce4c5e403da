/// Splits source text into tokens.
///
/// Whitespace and newlines are kept as tokens since the grammar is line and column sensitive.
/// Comments are collected on the side. For example `  lda #$10 ; load` becomes:
///
/// ```text
/// [
///     Token { token: Whitespace, literal: "  " },
///     Token { token: Identifier, literal: "lda" },
///     Token { token: Whitespace, literal: " " },
///     Token { token: Hash, literal: "#" },
///     Token { token: Hex, literal: "$10" },
///     Token { token: Whitespace, literal: " " },
///     Token { token: Eof, literal: "" },
/// ]
/// ```
pub mod lexer;

/// Numeric and character literal values.
pub mod number;

/// Builds a concrete syntax tree from tokens.
pub mod parser;

/// Turns a concrete syntax tree into the AST.
pub mod lower;

use crate::ast;
use crate::program::Uri;
use lexer::SourcePositionSpan;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("{0}")]
    Lex(#[from] lexer::LexError),
    #[error("{0}")]
    Parse(#[from] parser::ParseError),
}

impl SyntaxError {
    pub fn span(&self) -> SourcePositionSpan {
        match self {
            SyntaxError::Lex(error) => error.span(),
            SyntaxError::Parse(error) => error.span(),
        }
    }
}

/// One parsed source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub uri: Uri,
    pub file: ast::File,
    /// Lexer errors first, then parser errors, each in source order
    pub errors: Vec<SyntaxError>,
}

/// Lex, parse and lower the text of a document.
///
/// Never fails. Whatever could not be read is reported in [`Document::errors`] and the tree holds
/// the rest.
#[tracing::instrument(skip(text), fields(uri = %uri, len = text.len()))]
pub fn parse_document(text: &str, uri: &Uri) -> Document {
    let tokens = lexer::tokenize(text);
    let cst = parser::parse(&tokens, text);
    let file = lower::lower(&cst.file, uri);

    // Macro bodies are only text until the macro is expanded
    let errors: Vec<SyntaxError> = tokens
        .errors
        .into_iter()
        .filter(|error| {
            let row = error.span().start.line;
            !cst.raw_rows.iter().any(|rows| rows.contains(&row))
        })
        .map(SyntaxError::from)
        .chain(cst.errors.into_iter().map(SyntaxError::from))
        .collect();
    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "syntax errors");
    }

    Document {
        uri: uri.clone(),
        file,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn uri() -> Uri {
        Uri::parse("file:///syntax.asm").unwrap()
    }

    #[test]
    fn test_clean_document() {
        let document = parse_document("START\n  LDA #$10\n  RTS\n", &uri());
        assert_eq!(document.errors, vec![]);
        assert_eq!(document.file.lines.len(), 3);
        assert_eq!(document.uri, uri());
    }

    #[test]
    fn test_macro_body_is_not_checked() {
        let document = parse_document("  MAC M\n  LDA @ ; note\n  ENDM\n  LDA @\n", &uri());
        assert_eq!(document.errors.len(), 1);
        assert_eq!(document.errors[0].span(), SourcePositionSpan::on_line(3, 6, 7));
    }

    #[test]
    fn test_errors_from_both_stages() {
        let document = parse_document("  LDA @\n  LDA (\n", &uri());
        assert_eq!(document.errors.len(), 2);
        assert!(matches!(document.errors[0], SyntaxError::Lex(_)));
        assert!(matches!(document.errors[1], SyntaxError::Parse(_)));
        assert_eq!(document.errors[0].span(), SourcePositionSpan::on_line(0, 6, 7));
    }

    #[test]
    fn test_document_is_reproducible() {
        let text = "  IF FOO\n  NOP\n  ELSE\n  BRK\n  ENDIF ; done\n";
        assert_eq!(parse_document(text, &uri()), parse_document(text, &uri()));
    }
}
