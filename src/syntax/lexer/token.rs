use super::source_position::SourcePositionSpan;

/// TokenType defines the types of tokens that are found in source code.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenType {
    /// Label, mnemonic, directive or symbol name, optionally prefixed with a dot
    Identifier,
    /// `%` Binary number including the prefix
    Binary,
    /// Number with a leading zero, e.g. `017`
    Octal,
    /// Decimal number
    Decimal,
    /// `$` Hex number including the prefix
    Hex,
    /// `"..."` including the quotes
    StringLiteral,
    /// `'` followed by a single character
    CharLiteral,

    /// `#` Immediate prefix character
    Hash,
    /// `,`
    Comma,
    /// `:` Label suffix character
    Colon,
    /// `(`
    ParenLeft,
    /// `)`
    ParenRight,
    /// `[`
    BracketLeft,
    /// `]`
    BracketRight,
    /// `{`
    BraceLeft,
    /// `}`
    BraceRight,
    /// `.` Current program counter
    Dot,
    /// `..`
    DoubleDot,
    /// `...`
    TripleDot,
    /// `*` Multiplication or current program counter
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Ampersand,
    DoubleAmpersand,
    Pipe,
    DoublePipe,
    Caret,
    Tilde,
    Bang,
    Question,
    /// `=` Constant assignment
    Equals,
    DoubleEquals,
    NotEquals,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,

    /// `,X` ending of an X indexed address
    CommaX,
    /// `,Y` ending of an Y indexed address
    CommaY,
    /// `,X)` ending of an indexed indirect address
    CommaXParen,
    /// `),Y` ending of an indirect indexed address
    ParenCommaY,

    /// `IF`
    If,
    /// `IFCONST`
    IfConst,
    /// `IFNCONST`
    IfNConst,
    /// `ELSE`
    Else,
    /// `ENDIF` or `EIF`
    EndIf,
    /// `REPEAT`
    Repeat,
    /// `REPEND`
    Repend,
    /// `MAC` or `MACRO`
    Mac,
    /// `ENDM`
    EndM,

    /// `; ...` or `/* ... */`. Only ever found in the comment list of a lexer run.
    Comment,
    Newline,
    Whitespace,
    /// Eof marks the end of file
    Eof,
}

impl TokenType {
    /// Directive keyword for an identifier, matched case-insensitively on the whole word.
    pub fn keyword(identifier: &str) -> Option<TokenType> {
        let word = identifier.strip_prefix('.').unwrap_or(identifier);
        let keyword = match word.to_ascii_uppercase().as_str() {
            "IF" => TokenType::If,
            "IFCONST" => TokenType::IfConst,
            "IFNCONST" => TokenType::IfNConst,
            "ELSE" => TokenType::Else,
            "ENDIF" | "EIF" => TokenType::EndIf,
            "REPEAT" => TokenType::Repeat,
            "REPEND" => TokenType::Repend,
            "MAC" | "MACRO" => TokenType::Mac,
            "ENDM" => TokenType::EndM,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenType::If
                | TokenType::IfConst
                | TokenType::IfNConst
                | TokenType::Else
                | TokenType::EndIf
                | TokenType::Repeat
                | TokenType::Repend
                | TokenType::Mac
                | TokenType::EndM
        )
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            TokenType::Binary | TokenType::Octal | TokenType::Decimal | TokenType::Hex
        )
    }

    /// Identifiers and keywords both name symbols when they appear in label or operand position.
    pub fn is_word(&self) -> bool {
        *self == TokenType::Identifier || self.is_keyword()
    }

    /// Operators joining two operands in an expression.
    pub fn is_binary_sign(&self) -> bool {
        matches!(
            self,
            TokenType::Plus
                | TokenType::Minus
                | TokenType::Star
                | TokenType::Slash
                | TokenType::Percent
                | TokenType::Ampersand
                | TokenType::DoubleAmpersand
                | TokenType::Pipe
                | TokenType::DoublePipe
                | TokenType::Caret
                | TokenType::DoubleEquals
                | TokenType::NotEquals
                | TokenType::Less
                | TokenType::LessEqual
                | TokenType::Greater
                | TokenType::GreaterEqual
                | TokenType::ShiftLeft
                | TokenType::ShiftRight
        )
    }

    pub fn is_unary_sign(&self) -> bool {
        matches!(
            self,
            TokenType::Minus | TokenType::Tilde | TokenType::Bang | TokenType::Less | TokenType::Greater
        )
    }

    /// Tokens after which a `%` is an operator rather than a binary number prefix.
    pub fn ends_operand(&self) -> bool {
        self.is_word()
            || self.is_number()
            || matches!(
                self,
                TokenType::ParenRight
                    | TokenType::BracketRight
                    | TokenType::BraceRight
                    | TokenType::CharLiteral
                    | TokenType::StringLiteral
            )
    }

    pub fn is_line_end(&self) -> bool {
        matches!(self, TokenType::Newline | TokenType::Eof)
    }
}

impl Default for TokenType {
    fn default() -> Self {
        Self::Eof
    }
}

/// Token is a lexical unit of source code.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Token {
    /// Type of Token
    pub token: TokenType,
    /// Raw text of the token exactly as written, e.g. `"LDA"`, `"$00"`, `",X)"`
    pub literal: String,
    /// Where in the document the token is found
    pub span: SourcePositionSpan,
}

impl Token {
    pub fn new(token: TokenType, literal: &str, span: SourcePositionSpan) -> Self {
        Self {
            token,
            literal: literal.to_owned(),
            span,
        }
    }

    pub fn is(&self, token_type: TokenType) -> bool {
        self.token == token_type
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.token {
            TokenType::Newline => write!(f, "{}: {:?}", self.span, self.token),
            TokenType::Eof => write!(f, "{}: <eof>", self.span),
            _ => write!(f, "{}: {:?} '{}'", self.span, self.token, self.literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        let tests = vec![
            ("if", Some(TokenType::If)),
            ("IfConst", Some(TokenType::IfConst)),
            ("IFNCONST", Some(TokenType::IfNConst)),
            ("eif", Some(TokenType::EndIf)),
            ("ENDIF", Some(TokenType::EndIf)),
            ("macro", Some(TokenType::Mac)),
            (".mac", Some(TokenType::Mac)),
            ("repend", Some(TokenType::Repend)),
            ("iff", None),
            ("LDA", None),
        ];
        for (input, expected) in tests {
            assert_eq!(TokenType::keyword(input), expected, "{}", input);
        }
    }
}
