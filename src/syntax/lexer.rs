pub mod source_position;
pub mod token;

pub use source_position::{SourcePosition, SourcePositionSpan};
pub use token::{Token, TokenType};

// Example code:
//
//   processor 6502
//   include "vcs.h"
// Start SUBROUTINE
//   ldx #$00
// .loop
//   sta WSYNC,x
//   dex
//   bne .loop       ; wait
//   jmp (Vector)
//
// ':' = optional label suffix, e.g. `my_label:`
// '$' = hex number, e.g. `$12`
// '%' = binary number, e.g. `%0101`
// '#' = immediate operand, e.g. `#$12`
// ';' = comment, e.g. `; this is a comment`

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character '{character}' at {span}")]
    UnexpectedCharacter {
        character: char,
        span: SourcePositionSpan,
    },
    #[error("Unterminated string at {0}")]
    UnterminatedString(SourcePositionSpan),
    #[error("Missing character after quote at {0}")]
    MissingCharacter(SourcePositionSpan),
    #[error("Unterminated block comment at {0}")]
    UnterminatedComment(SourcePositionSpan),
}

impl LexError {
    pub fn span(&self) -> SourcePositionSpan {
        match self {
            LexError::UnexpectedCharacter { span, .. } => *span,
            LexError::UnterminatedString(span)
            | LexError::MissingCharacter(span)
            | LexError::UnterminatedComment(span) => *span,
        }
    }
}

/// Everything a lexer run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexOutput {
    /// Tokens in source order, always terminated by [`TokenType::Eof`]
    pub tokens: Vec<Token>,
    /// Line and block comments, kept out of the token stream
    pub comments: Vec<Token>,
    pub errors: Vec<LexError>,
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Lexes source code into tokens.
///
/// The lexer is an iterator and produces tokens lazily. Comments are collected on the side and
/// unrecognized characters are recorded as errors before lexing continues with the next
/// character.
pub struct Lexer {
    input: Vec<char>,           // Input characters
    position: usize,            // Current position in input (points to current char)
    ch: Option<char>,           // Current char under examination
    location: SourcePosition,   // Line and column of the current char
    previous: Option<TokenType>, // Type of the last emitted token
    comments: Vec<Token>,
    errors: Vec<LexError>,
    finished: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let input: Vec<char> = input.chars().collect();
        let ch = input.first().copied();
        Self {
            input,
            position: 0,
            ch,
            location: SourcePosition::default(),
            previous: None,
            comments: Vec::new(),
            errors: Vec::new(),
            finished: false,
        }
    }

    fn read_char(&mut self) {
        match self.ch {
            Some('\n') => self.location.increment_line(),
            Some('\r') if self.peek_char() != Some('\n') => self.location.increment_line(),
            Some(_) => self.location.increment_column(),
            None => return,
        }
        self.position += 1;
        self.ch = self.input.get(self.position).copied();
    }

    fn peek_char(&self) -> Option<char> {
        self.peek_nth(1)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn peek_is_word_char(&self, n: usize) -> bool {
        self.peek_nth(n).map_or(false, is_word_char)
    }

    fn make_token(&self, token: TokenType, start_index: usize, start: SourcePosition) -> Token {
        let literal: String = self.input[start_index..self.position].iter().collect();
        Token {
            token,
            literal,
            span: SourcePositionSpan::new(start, self.location),
        }
    }

    /// Consume `count` chars and turn them into a token.
    fn read_fixed(&mut self, token: TokenType, count: usize) -> Token {
        let start_index = self.position;
        let start = self.location;
        for _ in 0..count {
            self.read_char();
        }
        self.make_token(token, start_index, start)
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.ch.map_or(false, &predicate) {
            self.read_char();
        }
    }

    fn read_whitespace(&mut self) -> Token {
        let start_index = self.position;
        let start = self.location;
        self.read_while(|ch| ch.is_whitespace() && ch != '\n' && ch != '\r');
        self.make_token(TokenType::Whitespace, start_index, start)
    }

    fn read_newline(&mut self) -> Token {
        let start = self.location;
        let literal = if self.ch == Some('\r') && self.peek_char() == Some('\n') {
            "\r\n"
        } else if self.ch == Some('\r') {
            "\r"
        } else {
            "\n"
        };
        for _ in literal.chars() {
            self.read_char();
        }
        let end = SourcePosition::new(start.line, start.column + literal.len());
        Token::new(TokenType::Newline, literal, SourcePositionSpan::new(start, end))
    }

    fn skip_comment(&mut self) {
        let start_index = self.position;
        let start = self.location;
        self.read_while(|ch| ch != '\n' && ch != '\r');
        let comment = self.make_token(TokenType::Comment, start_index, start);
        self.comments.push(comment);
    }

    fn skip_block_comment(&mut self) {
        let start_index = self.position;
        let start = self.location;
        self.read_char(); // '/'
        self.read_char(); // '*'
        loop {
            match self.ch {
                Some('*') if self.peek_char() == Some('/') => {
                    self.read_char();
                    self.read_char();
                    break;
                }
                Some(_) => self.read_char(),
                None => {
                    self.errors.push(LexError::UnterminatedComment(
                        SourcePositionSpan::new(start, self.location),
                    ));
                    break;
                }
            }
        }
        let comment = self.make_token(TokenType::Comment, start_index, start);
        self.comments.push(comment);
    }

    /// Instruction mnemonic, label or directive. The leading dot of local labels is included.
    fn read_identifier(&mut self) -> Token {
        let start_index = self.position;
        let start = self.location;
        if self.ch == Some('.') {
            self.read_char();
        }
        self.read_while(is_word_char);
        let mut token = self.make_token(TokenType::Identifier, start_index, start);
        if let Some(keyword) = TokenType::keyword(&token.literal) {
            token.token = keyword;
        }
        token
    }

    /// Numbers absorb every following word character so that malformed digits stay one token.
    fn read_number(&mut self, token: TokenType) -> Token {
        let start_index = self.position;
        let start = self.location;
        if matches!(self.ch, Some('$') | Some('%')) {
            self.read_char();
        }
        self.read_while(is_word_char);
        self.make_token(token, start_index, start)
    }

    fn read_string(&mut self) -> Token {
        let start_index = self.position;
        let start = self.location;
        self.read_char(); // opening quote
        self.read_while(|ch| ch != '"' && ch != '\n' && ch != '\r');
        if self.ch == Some('"') {
            self.read_char();
        } else {
            self.errors.push(LexError::UnterminatedString(SourcePositionSpan::new(
                start,
                self.location,
            )));
        }
        self.make_token(TokenType::StringLiteral, start_index, start)
    }

    fn read_dots(&mut self) -> Token {
        if self.peek_char() == Some('.') && self.peek_nth(2) == Some('.') {
            self.read_fixed(TokenType::TripleDot, 3)
        } else if self.peek_char() == Some('.') {
            self.read_fixed(TokenType::DoubleDot, 2)
        } else {
            self.read_fixed(TokenType::Dot, 1)
        }
    }

    /// `,X` `,Y` and `,X)` win over a comma followed by an identifier, but only when the register
    /// letter is not the start of a longer word.
    fn read_comma(&mut self) -> Token {
        match self.peek_char().map(|ch| ch.to_ascii_uppercase()) {
            Some('X') if !self.peek_is_word_char(2) => {
                if self.peek_nth(2) == Some(')') {
                    self.read_fixed(TokenType::CommaXParen, 3)
                } else {
                    self.read_fixed(TokenType::CommaX, 2)
                }
            }
            Some('Y') if !self.peek_is_word_char(2) => self.read_fixed(TokenType::CommaY, 2),
            _ => self.read_fixed(TokenType::Comma, 1),
        }
    }

    fn read_paren_right(&mut self) -> Token {
        let is_indirect_y = self.peek_char() == Some(',')
            && matches!(self.peek_nth(2), Some('Y') | Some('y'))
            && !self.peek_is_word_char(3);
        if is_indirect_y {
            self.read_fixed(TokenType::ParenCommaY, 3)
        } else {
            self.read_fixed(TokenType::ParenRight, 1)
        }
    }

    /// Pick between a one and a two character operator depending on the next char.
    fn read_operator(&mut self, pairs: &[(char, TokenType)], single: TokenType) -> Token {
        match pairs
            .iter()
            .find(|(second, _)| self.peek_char() == Some(*second))
        {
            Some((_, token)) => self.read_fixed(*token, 2),
            None => self.read_fixed(single, 1),
        }
    }

    fn previous_ends_operand(&self) -> bool {
        self.previous.map_or(false, |token| token.ends_operand())
    }

    pub fn next_token(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let token = loop {
            let ch = match self.ch {
                Some(ch) => ch,
                None => {
                    self.finished = true;
                    break Token::new(TokenType::Eof, "", SourcePositionSpan::empty(self.location));
                }
            };

            let token = match ch {
                '\n' | '\r' => self.read_newline(),
                ch if ch.is_whitespace() => self.read_whitespace(),
                ';' => {
                    self.skip_comment();
                    continue;
                }
                '/' if self.peek_char() == Some('*') => {
                    self.skip_block_comment();
                    continue;
                }
                '"' => self.read_string(),
                '\'' => match self.peek_char() {
                    Some(next) if next != '\n' && next != '\r' => {
                        self.read_fixed(TokenType::CharLiteral, 2)
                    }
                    _ => {
                        let start = self.location;
                        self.read_char();
                        self.errors.push(LexError::MissingCharacter(SourcePositionSpan::new(
                            start,
                            self.location,
                        )));
                        continue;
                    }
                },
                '%' if self.peek_char().map_or(false, |next| next.is_ascii_digit())
                    && !self.previous_ends_operand() =>
                {
                    self.read_number(TokenType::Binary)
                }
                '$' if self.peek_is_word_char(1) => self.read_number(TokenType::Hex),
                '0' if self.peek_char().map_or(false, |next| ('1'..='9').contains(&next)) => {
                    self.read_number(TokenType::Octal)
                }
                '0'..='9' => self.read_number(TokenType::Decimal),
                '.' if self.peek_is_word_char(1) => self.read_identifier(),
                '.' => self.read_dots(),
                ch if is_word_char(ch) => self.read_identifier(),
                ',' => self.read_comma(),
                ')' => self.read_paren_right(),
                '#' => self.read_fixed(TokenType::Hash, 1),
                ':' => self.read_fixed(TokenType::Colon, 1),
                '(' => self.read_fixed(TokenType::ParenLeft, 1),
                '[' => self.read_fixed(TokenType::BracketLeft, 1),
                ']' => self.read_fixed(TokenType::BracketRight, 1),
                '{' => self.read_fixed(TokenType::BraceLeft, 1),
                '}' => self.read_fixed(TokenType::BraceRight, 1),
                '*' => self.read_fixed(TokenType::Star, 1),
                '+' => self.read_fixed(TokenType::Plus, 1),
                '-' => self.read_fixed(TokenType::Minus, 1),
                '/' => self.read_fixed(TokenType::Slash, 1),
                '%' => self.read_fixed(TokenType::Percent, 1),
                '~' => self.read_fixed(TokenType::Tilde, 1),
                '^' => self.read_fixed(TokenType::Caret, 1),
                '?' => self.read_fixed(TokenType::Question, 1),
                '&' => self.read_operator(&[('&', TokenType::DoubleAmpersand)], TokenType::Ampersand),
                '|' => self.read_operator(&[('|', TokenType::DoublePipe)], TokenType::Pipe),
                '!' => self.read_operator(&[('=', TokenType::NotEquals)], TokenType::Bang),
                '=' => self.read_operator(&[('=', TokenType::DoubleEquals)], TokenType::Equals),
                '<' => self.read_operator(
                    &[('<', TokenType::ShiftLeft), ('=', TokenType::LessEqual)],
                    TokenType::Less,
                ),
                '>' => self.read_operator(
                    &[('>', TokenType::ShiftRight), ('=', TokenType::GreaterEqual)],
                    TokenType::Greater,
                ),
                character => {
                    let start = self.location;
                    self.read_char();
                    self.errors.push(LexError::UnexpectedCharacter {
                        character,
                        span: SourcePositionSpan::new(start, self.location),
                    });
                    continue;
                }
            };
            break token;
        };

        self.previous = Some(token.token);
        Some(token)
    }

    /// Consume the remaining input and hand back tokens, comments and errors.
    pub fn into_output(mut self) -> LexOutput {
        let tokens: Vec<Token> = self.by_ref().collect();
        LexOutput {
            tokens,
            comments: self.comments,
            errors: self.errors,
        }
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

/// Lex a whole document.
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn tokenize(input: &str) -> LexOutput {
    Lexer::new(input).into_output()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn types(input: &str) -> Vec<TokenType> {
        tokenize(input).tokens.iter().map(|token| token.token).collect()
    }

    fn literals(input: &str) -> Vec<String> {
        tokenize(input)
            .tokens
            .into_iter()
            .filter(|token| !matches!(token.token, TokenType::Whitespace | TokenType::Eof))
            .map(|token| token.literal)
            .collect()
    }

    #[test]
    fn test_peek_char() {
        let mut lexer = Lexer::new("LDA");
        assert_eq!(lexer.peek_char(), Some('D'));
        assert_eq!(lexer.peek_char(), Some('D'));
        lexer.read_char();
        assert_eq!(lexer.peek_char(), Some('A'));
    }

    #[test]
    fn test_numbers() {
        let tests = vec![
            ("$ff", TokenType::Hex),
            ("$FF", TokenType::Hex),
            ("$G1", TokenType::Hex),
            ("%0101", TokenType::Binary),
            ("%102", TokenType::Binary),
            ("017", TokenType::Octal),
            ("09", TokenType::Octal),
            ("0", TokenType::Decimal),
            ("00", TokenType::Decimal),
            ("1234", TokenType::Decimal),
        ];
        for (input, expected) in tests {
            let output = tokenize(input);
            assert_eq!(output.tokens[0].token, expected, "{}", input);
            assert_eq!(output.tokens[0].literal, input);
            assert!(output.errors.is_empty());
        }
    }

    #[test]
    fn test_percent_is_modulo_after_operand() {
        assert_eq!(
            types("A%2"),
            vec![
                TokenType::Identifier,
                TokenType::Percent,
                TokenType::Decimal,
                TokenType::Eof
            ]
        );
        assert_eq!(
            types("LDA %10"),
            vec![
                TokenType::Identifier,
                TokenType::Whitespace,
                TokenType::Binary,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn test_identifier() {
        let tests = vec![
            ("LDA", TokenType::Identifier),
            ("X", TokenType::Identifier),
            ("my_label", TokenType::Identifier),
            (".loop", TokenType::Identifier),
            ("ifconst", TokenType::IfConst),
            ("ENDM", TokenType::EndM),
            ("Repeat", TokenType::Repeat),
            ("ifconstant", TokenType::Identifier),
        ];
        for (input, expected) in tests {
            let output = tokenize(input);
            assert_eq!(output.tokens[0].token, expected, "{}", input);
            assert_eq!(output.tokens[0].literal, input);
        }
    }

    #[test]
    fn test_addressing_mode_endings() {
        let tests = vec![
            (
                "LDA $10,X",
                vec![
                    TokenType::Identifier,
                    TokenType::Whitespace,
                    TokenType::Hex,
                    TokenType::CommaX,
                    TokenType::Eof,
                ],
            ),
            (
                "LDA ($10,x)",
                vec![
                    TokenType::Identifier,
                    TokenType::Whitespace,
                    TokenType::ParenLeft,
                    TokenType::Hex,
                    TokenType::CommaXParen,
                    TokenType::Eof,
                ],
            ),
            (
                "LDA ($10),y",
                vec![
                    TokenType::Identifier,
                    TokenType::Whitespace,
                    TokenType::ParenLeft,
                    TokenType::Hex,
                    TokenType::ParenCommaY,
                    TokenType::Eof,
                ],
            ),
            (
                "DC.B 1,XPOS",
                vec![
                    TokenType::Identifier,
                    TokenType::Identifier,
                    TokenType::Whitespace,
                    TokenType::Decimal,
                    TokenType::Comma,
                    TokenType::Identifier,
                    TokenType::Eof,
                ],
            ),
            (
                "DC.B (1),Ypos",
                vec![
                    TokenType::Identifier,
                    TokenType::Identifier,
                    TokenType::Whitespace,
                    TokenType::ParenLeft,
                    TokenType::Decimal,
                    TokenType::ParenRight,
                    TokenType::Comma,
                    TokenType::Identifier,
                    TokenType::Eof,
                ],
            ),
        ];
        for (input, expected) in tests {
            assert_eq!(types(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            literals("<< >> <= >= == != && || < > ! ~ . .. ... *"),
            vec!["<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "<", ">", "!", "~", ".", "..", "...", "*"]
        );
    }

    #[test]
    fn test_strings_and_chars() {
        let output = tokenize("DC \"HELLO, WORLD\",'A");
        let tokens: Vec<(TokenType, &str)> = output
            .tokens
            .iter()
            .map(|token| (token.token, token.literal.as_str()))
            .collect();
        assert_eq!(
            tokens,
            vec![
                (TokenType::Identifier, "DC"),
                (TokenType::Whitespace, " "),
                (TokenType::StringLiteral, "\"HELLO, WORLD\""),
                (TokenType::Comma, ","),
                (TokenType::CharLiteral, "'A"),
                (TokenType::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let output = tokenize("INCLUDE \"vcs.h\n");
        assert_eq!(output.tokens[2].token, TokenType::StringLiteral);
        assert_eq!(output.tokens[2].literal, "\"vcs.h");
        assert_eq!(
            output.errors,
            vec![LexError::UnterminatedString(SourcePositionSpan::on_line(0, 8, 14))]
        );
    }

    #[test]
    fn test_comments_are_kept_aside() {
        let input = "; this is a comment\nLDA #$00 ; Another one\n/* block\n comment */NOP";
        let output = tokenize(input);
        assert_eq!(
            output
                .tokens
                .iter()
                .map(|token| token.token)
                .collect::<Vec<_>>(),
            vec![
                TokenType::Newline,
                TokenType::Identifier,
                TokenType::Whitespace,
                TokenType::Hash,
                TokenType::Hex,
                TokenType::Whitespace,
                TokenType::Newline,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
        let comments: Vec<&str> = output.comments.iter().map(|c| c.literal.as_str()).collect();
        assert_eq!(
            comments,
            vec!["; this is a comment", "; Another one", "/* block\n comment */"]
        );
        // The NOP after the block comment is on the fourth line.
        assert_eq!(output.tokens[7].span, SourcePositionSpan::on_line(3, 11, 14));
    }

    #[test]
    fn test_newline_forms() {
        let output = tokenize("A\r\nB\rC\nD");
        let lines: Vec<usize> = output
            .tokens
            .iter()
            .filter(|token| token.token == TokenType::Identifier)
            .map(|token| token.span.start.line)
            .collect();
        assert_eq!(lines, vec![0, 1, 2, 3]);
        assert_eq!(output.tokens[1].literal, "\r\n");
    }

    #[test]
    fn test_unexpected_character_recovers() {
        let output = tokenize("LDA @ $10");
        assert_eq!(
            output.errors,
            vec![LexError::UnexpectedCharacter {
                character: '@',
                span: SourcePositionSpan::on_line(0, 4, 5),
            }]
        );
        assert_eq!(literals("LDA @ $10"), vec!["LDA", "$10"]);
    }

    #[test]
    fn test_spans_of_repeated_tokens() {
        let output = tokenize("FOO   FOO FOO   FOO  ; FOO");
        let spans: Vec<SourcePositionSpan> = output
            .tokens
            .iter()
            .filter(|token| token.token == TokenType::Identifier)
            .map(|token| token.span)
            .collect();
        assert_eq!(
            spans,
            vec![
                SourcePositionSpan::on_line(0, 0, 3),
                SourcePositionSpan::on_line(0, 6, 9),
                SourcePositionSpan::on_line(0, 10, 13),
                SourcePositionSpan::on_line(0, 16, 19),
            ]
        );
        assert_eq!(output.comments[0].span, SourcePositionSpan::on_line(0, 21, 26));
    }

    #[test]
    fn test_lexing_is_idempotent() {
        let input = "  LDA ($80),Y\n.loop: dex\n  bne .loop";
        assert_eq!(tokenize(input), tokenize(input));
    }
}
