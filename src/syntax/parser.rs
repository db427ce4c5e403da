use std::collections::HashMap;
use std::ops::Range;

use crate::directive::CommandExtension;
use crate::syntax::lexer::{LexOutput, SourcePosition, SourcePositionSpan, Token, TokenType};

use self::cst::*;

/// Expressions nested deeper than this are rejected.
const MAX_NESTING: usize = 256;

/// Concrete syntax tree types.
pub mod cst;

fn describe(token: &Token) -> String {
    match token.token {
        TokenType::Newline => "end of line".to_string(),
        TokenType::Eof => "end of file".to_string(),
        _ => format!("'{}'", token.literal),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Expected {expected}, found {}", describe(.found))]
    UnexpectedToken {
        expected: &'static str,
        found: Token,
    },
    #[error("Missing {expected} for '{}'", .opened.literal)]
    UnterminatedBlock {
        expected: &'static str,
        opened: Token,
    },
    #[error("Unknown command extension '{}'", .0.literal)]
    UnknownExtension(Token),
    #[error("Expression nested deeper than {} levels", MAX_NESTING)]
    NestingTooDeep(Token),
}

impl ParseError {
    pub fn span(&self) -> SourcePositionSpan {
        match self {
            ParseError::UnexpectedToken { found, .. } => found.span,
            ParseError::UnterminatedBlock { opened, .. } => opened.span,
            ParseError::UnknownExtension(token) | ParseError::NestingTooDeep(token) => token.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    pub file: CstFile,
    pub errors: Vec<ParseError>,
    /// Rows holding macro bodies, which are not parsed
    pub raw_rows: Vec<Range<usize>>,
}

/// Byte offset of the start of every row, with the same line breaks as the lexer.
fn row_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let mut chars = source.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\r' if matches!(chars.peek(), Some((_, '\n'))) => {}
            '\n' | '\r' => starts.push(index + 1),
            _ => {}
        }
    }
    starts
}

/// Line oriented recursive descent parser over the token stream of one document.
///
/// Parse errors never abort the run. The offending line is skipped up to the next newline and
/// parsing continues with the line after it.
pub struct Parser<'a> {
    tokens: &'a [Token],
    source: &'a str,
    row_starts: Vec<usize>,
    position: usize,
    eof: Token,
    /// First comment of every row, taken by the line starting on that row
    comments: HashMap<usize, Token>,
    /// Inside round or square brackets whitespace is insignificant
    bracket_depth: usize,
    /// Depth of the expression tree being built
    nesting: usize,
    raw_rows: Vec<Range<usize>>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], comments: &[Token], source: &'a str) -> Self {
        let eof = match tokens.last() {
            Some(token) if token.is(TokenType::Eof) => token.clone(),
            Some(token) => Token::new(TokenType::Eof, "", SourcePositionSpan::empty(token.span.end)),
            None => Token::default(),
        };

        let mut by_row = HashMap::new();
        for comment in comments {
            by_row
                .entry(comment.span.start.line)
                .or_insert_with(|| comment.clone());
        }

        Self {
            tokens,
            source,
            row_starts: row_starts(source),
            position: 0,
            eof,
            comments: by_row,
            bracket_depth: 0,
            nesting: 0,
            raw_rows: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn current_token(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&self.eof)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        self.tokens.get(self.position + n).unwrap_or(&self.eof)
    }

    fn peek_token(&self) -> &Token {
        self.peek_nth(1)
    }

    fn current_token_is(&self, token_type: TokenType) -> bool {
        self.current_token().is(token_type)
    }

    fn peek_token_is(&self, token_type: TokenType) -> bool {
        self.peek_token().is(token_type)
    }

    /// Hand out the current token and move on. Eof is sticky.
    fn next_token(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    /// Returns true when any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        while self.current_token_is(TokenType::Whitespace) {
            self.next_token();
        }
        self.position != start
    }

    fn at_line_end(&self) -> bool {
        self.current_token().token.is_line_end()
    }

    fn skip_to_line_end(&mut self) {
        while !self.at_line_end() {
            self.next_token();
        }
    }

    /// Nothing but whitespace may follow the command. The newline itself is consumed.
    fn finish_line(&mut self) {
        self.skip_whitespace();
        if !self.at_line_end() {
            self.unexpected("end of line");
            self.skip_to_line_end();
        }
        if self.current_token_is(TokenType::Newline) {
            self.next_token();
        }
    }

    fn unexpected(&mut self, expected: &'static str) {
        let found = self.current_token().clone();
        self.errors
            .push(ParseError::UnexpectedToken { expected, found });
    }

    fn first_significant_token(&self) -> &Token {
        let mut n = 0;
        while self.peek_nth(n).is(TokenType::Whitespace) {
            n += 1;
        }
        self.peek_nth(n)
    }

    /// Whether the line starting at the current token is headed by one of `terminators`.
    fn at_terminator(&self, terminators: &[TokenType]) -> bool {
        terminators.contains(&self.first_significant_token().token)
    }

    fn take_terminator(&mut self, terminator: TokenType) -> Option<Token> {
        if self.at_terminator(&[terminator]) {
            self.skip_whitespace();
            Some(self.next_token())
        } else {
            None
        }
    }

    /// Parse the whole token stream.
    pub fn parse_file(&mut self) -> CstFile {
        let lines = self.parse_lines(&[]);
        let span = lines
            .iter()
            .map(|line| line.span)
            .reduce(|a, b| a.to(b))
            .unwrap_or_default();
        CstFile { lines, span }
    }

    /// Lines up to the end of file or the first line headed by one of `terminators`.
    fn parse_lines(&mut self, terminators: &[TokenType]) -> Vec<CstLine> {
        let mut lines = Vec::new();
        while !self.current_token_is(TokenType::Eof) && !self.at_terminator(terminators) {
            lines.push(self.parse_line());
        }
        lines
    }

    fn parse_line(&mut self) -> CstLine {
        let row = self.current_token().span.start.line;
        let label = self.parse_optional_label();

        let command = match (&label, self.current_token().token) {
            (Some(_), TokenType::Equals) => self.parse_command(),
            (_, TokenType::Whitespace) => {
                self.skip_whitespace();
                if self.at_line_end() {
                    None
                } else {
                    self.parse_command()
                }
            }
            (_, token) if token.is_line_end() => None,
            (None, _) => self.parse_command(),
            (Some(_), _) => {
                self.unexpected("whitespace after label");
                self.skip_to_line_end();
                None
            }
        };
        self.finish_line();

        let comment = self.comments.remove(&row);
        let span = label
            .as_ref()
            .map(|label| label.span)
            .into_iter()
            .chain(command.as_ref().map(|command| command.span()))
            .chain(comment.as_ref().map(|comment| comment.span))
            .reduce(|a, b| a.to(b))
            .unwrap_or_else(|| SourcePositionSpan::empty(SourcePosition::new(row, 0)));

        CstLine {
            label,
            command,
            comment,
            span,
        }
    }

    /// A label starts in the first column, or anywhere when directly followed by a colon.
    fn parse_optional_label(&mut self) -> Option<CstLabel> {
        let token = self.current_token().token;
        let column = self.current_token().span.start.column;
        match token {
            TokenType::Identifier | TokenType::Dot if column == 0 => {
                Some(self.parse_label())
            }
            TokenType::Whitespace
                if self.peek_token_is(TokenType::Identifier)
                    && self.peek_nth(2).is(TokenType::Colon) =>
            {
                self.skip_whitespace();
                Some(self.parse_label())
            }
            _ => None,
        }
    }

    fn parse_label(&mut self) -> CstLabel {
        let first = self.next_token();
        let is_identifier = first.is(TokenType::Identifier);
        let mut fragments = vec![first];

        while is_identifier {
            match self.current_token().token {
                TokenType::Comma if self.peek_token().token.is_word() => {
                    self.next_token();
                    fragments.push(self.next_token());
                }
                // `LABEL,X` lexes as an index ending but names the fragment `X` here
                TokenType::CommaX | TokenType::CommaY => {
                    let ending = self.next_token();
                    let start = SourcePosition::new(
                        ending.span.start.line,
                        ending.span.start.column + 1,
                    );
                    fragments.push(Token::new(
                        TokenType::Identifier,
                        &ending.literal[1..],
                        SourcePositionSpan::new(start, ending.span.end),
                    ));
                }
                _ => break,
            }
        }

        let colon = if self.current_token_is(TokenType::Colon) {
            Some(self.next_token())
        } else {
            None
        };

        let mut span = fragments[0].span;
        if let Some(last) = fragments.last() {
            span = span.to(last.span);
        }
        if let Some(colon) = &colon {
            span = span.to(colon.span);
        }

        CstLabel {
            fragments,
            colon,
            span,
        }
    }

    fn parse_command(&mut self) -> Option<CstCommand> {
        let token = self.current_token().token;
        match token {
            TokenType::If | TokenType::IfConst | TokenType::IfNConst => {
                Some(CstCommand::If(self.parse_if()))
            }
            TokenType::Repeat => Some(CstCommand::Repeat(self.parse_repeat())),
            TokenType::Mac => Some(CstCommand::Macro(self.parse_macro())),
            TokenType::Identifier | TokenType::Equals => {
                Some(CstCommand::General(self.parse_general()))
            }
            TokenType::Else | TokenType::EndIf | TokenType::Repend | TokenType::EndM => {
                self.unexpected("command");
                self.skip_to_line_end();
                None
            }
            // An argument without a command name in front of it
            token if self.starts_argument(token) => Some(CstCommand::General(self.parse_general())),
            _ => {
                self.unexpected("command");
                self.skip_to_line_end();
                None
            }
        }
    }

    fn starts_argument(&self, token: TokenType) -> bool {
        token.is_number()
            || token.is_unary_sign()
            || matches!(
                token,
                TokenType::Hash
                    | TokenType::ParenLeft
                    | TokenType::BracketLeft
                    | TokenType::BraceLeft
                    | TokenType::StringLiteral
                    | TokenType::CharLiteral
                    | TokenType::Dot
                    | TokenType::DoubleDot
                    | TokenType::TripleDot
                    | TokenType::Star
            )
    }

    /// Expression on the header line of a block. A broken one discards the rest of the line.
    fn parse_header_expression(&mut self, expected: &'static str) -> Option<CstExpression> {
        self.skip_whitespace();
        if self.at_line_end() {
            self.unexpected(expected);
            return None;
        }
        let expression = self.parse_expression();
        if expression.is_none() {
            self.skip_to_line_end();
        }
        expression
    }

    fn parse_if(&mut self) -> CstIfCommand {
        let keyword = self.next_token();
        let condition = self.parse_header_expression("condition");
        self.finish_line();

        let then_body = self.parse_lines(&[TokenType::Else, TokenType::EndIf]);
        let (else_keyword, else_body) = match self.take_terminator(TokenType::Else) {
            Some(else_keyword) => {
                self.finish_line();
                (Some(else_keyword), self.parse_lines(&[TokenType::EndIf]))
            }
            None => (None, Vec::new()),
        };

        let end = self.take_terminator(TokenType::EndIf);
        if end.is_none() {
            self.errors.push(ParseError::UnterminatedBlock {
                expected: "ENDIF",
                opened: keyword.clone(),
            });
        }

        let mut span = keyword.span;
        if let Some(condition) = &condition {
            span = span.to(condition.span());
        }
        for line in then_body.iter().chain(else_body.iter()) {
            span = span.to(line.span);
        }
        if let Some(token) = else_keyword.iter().chain(end.iter()).last() {
            span = span.to(token.span);
        }

        CstIfCommand {
            keyword,
            condition,
            then_body,
            else_keyword,
            else_body,
            end,
            span,
        }
    }

    fn parse_repeat(&mut self) -> CstRepeatCommand {
        let keyword = self.next_token();
        let count = self.parse_header_expression("repeat count");
        self.finish_line();

        let body = self.parse_lines(&[TokenType::Repend]);
        let end = self.take_terminator(TokenType::Repend);
        if end.is_none() {
            self.errors.push(ParseError::UnterminatedBlock {
                expected: "REPEND",
                opened: keyword.clone(),
            });
        }

        let mut span = keyword.span;
        if let Some(count) = &count {
            span = span.to(count.span());
        }
        for line in &body {
            span = span.to(line.span);
        }
        if let Some(end) = &end {
            span = span.to(end.span);
        }

        CstRepeatCommand {
            keyword,
            count,
            body,
            end,
            span,
        }
    }

    /// Source text of `rows`, line breaks included.
    fn row_text(&self, rows: &Range<usize>) -> String {
        let offset = |row: usize| {
            self.row_starts
                .get(row)
                .copied()
                .unwrap_or(self.source.len())
        };
        self.source
            .get(offset(rows.start)..offset(rows.end))
            .unwrap_or_default()
            .to_string()
    }

    /// The body is kept as raw text. It only becomes source once the macro is expanded.
    fn parse_macro(&mut self) -> CstMacroCommand {
        let keyword = self.next_token();
        self.skip_whitespace();
        let name = if self.at_line_end() {
            self.unexpected("macro name");
            None
        } else {
            Some(self.next_token())
        };
        self.finish_line();

        let first_row = keyword.span.start.line + 1;
        let mut last_span = None;
        while !self.current_token_is(TokenType::Eof) && !self.at_terminator(&[TokenType::EndM]) {
            loop {
                let token = self.next_token();
                last_span = Some(token.span);
                if token.token.is_line_end() || self.current_token_is(TokenType::Eof) {
                    break;
                }
            }
        }

        let end_row = if self.current_token_is(TokenType::Eof) {
            self.row_starts.len()
        } else {
            self.current_token().span.start.line
        };
        let rows = first_row..end_row.max(first_row);
        let body = self.row_text(&rows);
        self.raw_rows.push(rows);

        let end = self.take_terminator(TokenType::EndM);
        if end.is_none() {
            self.errors.push(ParseError::UnterminatedBlock {
                expected: "ENDM",
                opened: keyword.clone(),
            });
        }

        let mut span = keyword.span;
        if let Some(name) = &name {
            span = span.to(name.span);
        }
        if let Some(last) = last_span {
            span = span.to(last);
        }
        if let Some(end) = &end {
            span = span.to(end.span);
        }

        CstMacroCommand {
            keyword,
            name,
            body,
            end,
            span,
        }
    }

    fn parse_general(&mut self) -> CstGeneralCommand {
        let name = match self.current_token().token {
            TokenType::Identifier | TokenType::Equals => Some(self.next_token()),
            _ => None,
        };

        let extension = match &name {
            Some(name)
                if self.current_token_is(TokenType::Identifier)
                    && self.current_token().literal.starts_with('.')
                    && self.current_token().span.start == name.span.end =>
            {
                let extension = self.next_token();
                if CommandExtension::from_suffix(&extension.literal).is_none() {
                    self.errors
                        .push(ParseError::UnknownExtension(extension.clone()));
                }
                Some(extension)
            }
            _ => None,
        };

        let arguments = self.parse_arguments(name.is_some());

        let spans = name
            .iter()
            .chain(extension.iter())
            .map(|token| token.span)
            .chain(arguments.iter().map(|argument| argument.span()));
        let span = spans
            .reduce(|a, b| a.to(b))
            .unwrap_or_else(|| SourcePositionSpan::empty(self.current_token().span.start));

        CstGeneralCommand {
            name,
            extension,
            arguments,
            span,
        }
    }

    /// Arguments are separated by a comma, optionally padded with whitespace, or by whitespace
    /// alone.
    fn parse_arguments(&mut self, after_name: bool) -> Vec<CstArgument> {
        let mut arguments = Vec::new();
        loop {
            let spaced = self.skip_whitespace();
            if self.at_line_end() {
                break;
            }

            if !arguments.is_empty() || (after_name && !spaced) {
                if self.current_token_is(TokenType::Comma) {
                    self.next_token();
                    self.skip_whitespace();
                    if self.at_line_end() {
                        self.unexpected("argument");
                        break;
                    }
                } else if !spaced && !arguments.is_empty() {
                    self.unexpected("',' or whitespace");
                    self.skip_to_line_end();
                    break;
                }
            }

            match self.parse_argument() {
                Some(argument) => arguments.push(argument),
                None => {
                    self.skip_to_line_end();
                    break;
                }
            }
        }
        arguments
    }

    fn parse_argument(&mut self) -> Option<CstArgument> {
        match self.current_token().token {
            TokenType::Hash => {
                let hash = self.next_token();
                let value = self.parse_expression()?;
                let span = hash.span.to(value.span());
                Some(CstArgument::Immediate { hash, value, span })
            }
            TokenType::ParenLeft => self.parse_indirect_argument(),
            _ => {
                let value = self.parse_expression()?;
                Some(self.finish_address_argument(value))
            }
        }
    }

    fn finish_address_argument(&mut self, value: CstExpression) -> CstArgument {
        let ending = match self.current_token().token {
            TokenType::CommaX | TokenType::CommaY => Some(self.next_token()),
            _ => None,
        };
        let mut span = value.span();
        if let Some(ending) = &ending {
            span = span.to(ending.span);
        }
        CstArgument::Address {
            value,
            ending,
            span,
        }
    }

    /// `(expr)`, `(expr,X)` or `(expr),Y`. A closing `)` followed by an operator or an index
    /// turns out to be a bracketed address expression instead.
    fn parse_indirect_argument(&mut self) -> Option<CstArgument> {
        let open = self.next_token();
        self.bracket_depth += 1;
        self.skip_whitespace();
        let value = self.parse_expression();
        self.skip_whitespace();
        self.bracket_depth -= 1;
        let value = value?;

        match self.current_token().token {
            TokenType::ParenRight => {
                let close = self.next_token();
                let continues = self.current_token().token.is_binary_sign()
                    || self.current_token_is(TokenType::CommaX);
                if continues {
                    let round = CstExpression::Round {
                        open,
                        inner: Box::new(value),
                        close,
                    };
                    let value = self.parse_binary_tail(round)?;
                    return Some(self.finish_address_argument(value));
                }
                let span = open.span.to(close.span);
                Some(CstArgument::Indirect {
                    open,
                    value,
                    close,
                    span,
                })
            }
            TokenType::CommaXParen | TokenType::ParenCommaY => {
                let close = self.next_token();
                let span = open.span.to(close.span);
                Some(CstArgument::Indirect {
                    open,
                    value,
                    close,
                    span,
                })
            }
            _ => {
                self.unexpected("')', ',X)' or '),Y'");
                None
            }
        }
    }

    /// `unary (binarySign unary)*` folded to the left without precedence levels.
    fn parse_expression(&mut self) -> Option<CstExpression> {
        let left = self.parse_unary()?;
        self.parse_binary_tail(left)
    }

    /// Every operator of the chain adds a level to the tree, the nesting is restored afterwards.
    fn parse_binary_tail(&mut self, left: CstExpression) -> Option<CstExpression> {
        let nesting = self.nesting;
        let expression = self.parse_binary_chain(left);
        self.nesting = nesting;
        expression
    }

    fn parse_binary_chain(&mut self, mut left: CstExpression) -> Option<CstExpression> {
        loop {
            if self.bracket_depth > 0 {
                self.skip_whitespace();
            }
            if !self.current_token().token.is_binary_sign() {
                return Some(left);
            }
            let operator = self.next_token();
            if self.bracket_depth > 0 {
                self.skip_whitespace();
            }
            self.nesting += 1;
            let right = self.parse_unary()?;
            left = CstExpression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> Option<CstExpression> {
        if self.nesting >= MAX_NESTING {
            let token = self.current_token().clone();
            self.errors.push(ParseError::NestingTooDeep(token));
            return None;
        }
        self.nesting += 1;
        let expression = self.parse_operand();
        self.nesting -= 1;
        expression
    }

    fn parse_operand(&mut self) -> Option<CstExpression> {
        let token = self.current_token().token;
        match token {
            TokenType::ParenLeft => self.parse_brackets(TokenType::ParenRight),
            TokenType::BracketLeft => self.parse_brackets(TokenType::BracketRight),
            TokenType::BraceLeft => self.parse_macro_argument(),
            token if token.is_unary_sign() => {
                let operator = self.next_token();
                let operand = self.parse_unary()?;
                Some(CstExpression::Unary {
                    operator,
                    operand: Box::new(operand),
                })
            }
            TokenType::StringLiteral
            | TokenType::CharLiteral
            | TokenType::Dot
            | TokenType::DoubleDot
            | TokenType::TripleDot
            | TokenType::Star => Some(CstExpression::Atom(self.next_token())),
            token if token.is_number() => Some(CstExpression::Atom(self.next_token())),
            token if token.is_word() => Some(self.parse_label_reference()),
            _ => {
                self.unexpected("expression");
                None
            }
        }
    }

    fn parse_brackets(&mut self, closing: TokenType) -> Option<CstExpression> {
        let open = self.next_token();
        self.bracket_depth += 1;
        self.skip_whitespace();
        let inner = self.parse_expression();
        self.skip_whitespace();
        self.bracket_depth -= 1;
        let inner = Box::new(inner?);

        if !self.current_token_is(closing) {
            self.unexpected(match closing {
                TokenType::ParenRight => "')'",
                _ => "']'",
            });
            return None;
        }
        let close = self.next_token();

        Some(match closing {
            TokenType::ParenRight => CstExpression::Round { open, inner, close },
            _ => CstExpression::Square { open, inner, close },
        })
    }

    fn parse_macro_argument(&mut self) -> Option<CstExpression> {
        let open = self.next_token();
        if !self.current_token_is(TokenType::Decimal) {
            self.unexpected("macro argument number");
            return None;
        }
        let number = self.next_token();
        if !self.current_token_is(TokenType::BraceRight) {
            self.unexpected("'}'");
            return None;
        }
        let close = self.next_token();
        Some(CstExpression::MacroArgument {
            open,
            number,
            close,
        })
    }

    /// Inside brackets a comma joins identifiers into one dynamic label. At argument level the
    /// comma separates arguments instead.
    fn parse_label_reference(&mut self) -> CstExpression {
        let mut fragments = vec![self.next_token()];
        while self.bracket_depth > 0
            && self.current_token_is(TokenType::Comma)
            && self.peek_token().token.is_word()
        {
            self.next_token();
            fragments.push(self.next_token());
        }
        CstExpression::Label(fragments)
    }
}

/// Parse the tokens of a lexer run into a concrete syntax tree.
#[tracing::instrument(skip_all, fields(tokens = input.tokens.len()))]
pub fn parse(input: &LexOutput, source: &str) -> ParseOutput {
    let mut parser = Parser::new(&input.tokens, &input.comments, source);
    let file = parser.parse_file();
    if !parser.errors.is_empty() {
        tracing::debug!(errors = parser.errors.len(), "syntax errors");
    }
    ParseOutput {
        file,
        errors: parser.errors,
        raw_rows: parser.raw_rows,
    }
}
