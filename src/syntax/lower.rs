use std::str::FromStr;

use crate::ast::*;
use crate::directive::CommandExtension;
use crate::program::Uri;
use crate::syntax::lexer::{SourcePosition, SourcePositionSpan, Token, TokenType};
use crate::syntax::number::{parse_char, parse_number};
use crate::syntax::parser::cst::*;

/// Turns a concrete syntax tree into an AST for one document.
///
/// Lowering never fails. Pieces the parser could not produce become `None` or empty lists.
struct Lowering<'a> {
    uri: &'a Uri,
}

impl<'a> Lowering<'a> {
    fn location(&self, span: SourcePositionSpan) -> Location {
        Location::new(self.uri.clone(), span)
    }

    fn lower_lines(&self, lines: &[CstLine]) -> Vec<Line> {
        lines.iter().map(|line| self.lower_line(line)).collect()
    }

    fn lower_line(&self, line: &CstLine) -> Line {
        Line {
            label: line.label.as_ref().map(|label| self.lower_label(label)),
            statement: line
                .command
                .as_ref()
                .map(|command| self.lower_command(command)),
            comment: line.comment.as_ref().map(|comment| self.lower_comment(comment)),
            location: self.location(line.span),
        }
    }

    fn lower_identifier(&self, token: &Token) -> Identifier {
        Identifier {
            name: token.literal.clone(),
            program_counter: matches!(
                token.token,
                TokenType::Dot | TokenType::DoubleDot | TokenType::TripleDot | TokenType::Star
            ),
            location: self.location(token.span),
        }
    }

    /// One fragment is a plain identifier, more make a dynamic label.
    fn lower_fragments(&self, fragments: &[Token]) -> LabelName {
        match fragments {
            [single] => LabelName::Identifier(self.lower_identifier(single)),
            _ => {
                let fragments: Vec<Identifier> = fragments
                    .iter()
                    .map(|token| self.lower_identifier(token))
                    .collect();
                let span = fragments
                    .iter()
                    .map(|fragment| fragment.location.span)
                    .reduce(|a, b| a.to(b))
                    .unwrap_or_default();
                LabelName::Dynamic(DynamicLabel {
                    fragments,
                    location: self.location(span),
                })
            }
        }
    }

    fn lower_label(&self, label: &CstLabel) -> Label {
        match self.lower_fragments(&label.fragments) {
            LabelName::Identifier(identifier) => Label::Identifier(identifier),
            LabelName::Dynamic(dynamic) => Label::Dynamic(dynamic),
        }
    }

    fn lower_command(&self, command: &CstCommand) -> Statement {
        match command {
            CstCommand::General(command) => Statement::Command(Command {
                name: command
                    .name
                    .as_ref()
                    .map(|name| self.lower_identifier(name)),
                extension: command
                    .extension
                    .as_ref()
                    .and_then(|extension| CommandExtension::from_suffix(&extension.literal)),
                arguments: command
                    .arguments
                    .iter()
                    .map(|argument| self.lower_argument(argument))
                    .collect(),
                location: self.location(command.span),
            }),
            CstCommand::If(command) => Statement::If(IfDirective {
                kind: match command.keyword.token {
                    TokenType::IfConst => IfKind::IfConst,
                    TokenType::IfNConst => IfKind::IfNConst,
                    _ => IfKind::Plain,
                },
                condition: command
                    .condition
                    .as_ref()
                    .map(|condition| self.lower_expression(condition)),
                then_body: self.lower_lines(&command.then_body),
                else_body: self.lower_lines(&command.else_body),
                location: self.location(command.span),
            }),
            CstCommand::Repeat(command) => Statement::Repeat(RepeatDirective {
                count: command
                    .count
                    .as_ref()
                    .map(|count| self.lower_expression(count)),
                body: self.lower_lines(&command.body),
                location: self.location(command.span),
            }),
            CstCommand::Macro(command) => Statement::Macro(MacroDirective {
                name: command.name.as_ref().map(|name| self.lower_identifier(name)),
                body: command.body.clone(),
                location: self.location(command.span),
            }),
        }
    }

    fn lower_argument(&self, argument: &CstArgument) -> Argument {
        let (mode, value) = match argument {
            CstArgument::Immediate { value, .. } => (ArgumentMode::Immediate, value),
            CstArgument::Address { value, ending, .. } => {
                let mode = match ending.as_ref().map(|token| token.token) {
                    Some(TokenType::CommaX) => ArgumentMode::AddressX,
                    Some(TokenType::CommaY) => ArgumentMode::AddressY,
                    _ => ArgumentMode::Address,
                };
                (mode, value)
            }
            CstArgument::Indirect { value, close, .. } => {
                let mode = match close.token {
                    TokenType::CommaXParen => ArgumentMode::IndirectX,
                    TokenType::ParenCommaY => ArgumentMode::IndirectY,
                    _ => ArgumentMode::Indirect,
                };
                (mode, value)
            }
        };
        Argument {
            mode,
            value: self.lower_expression(value),
            location: self.location(argument.span()),
        }
    }

    fn lower_atom(&self, token: &Token) -> Expression {
        let location = self.location(token.span);
        match token.token {
            token_type if token_type.is_number() => Expression::NumberLiteral(NumberLiteral {
                text: token.literal.clone(),
                value: parse_number(&token.literal),
                location,
            }),
            TokenType::StringLiteral => {
                let inner = token.literal.strip_prefix('"').unwrap_or(&token.literal);
                let inner = inner.strip_suffix('"').unwrap_or(inner);
                Expression::StringLiteral(StringLiteral {
                    value: inner.to_string(),
                    location,
                })
            }
            TokenType::CharLiteral => Expression::CharLiteral(CharLiteral {
                value: parse_char(&token.literal)
                    .and_then(|code| u32::try_from(code).ok())
                    .and_then(char::from_u32)
                    .unwrap_or_default(),
                location,
            }),
            _ => Expression::Identifier(self.lower_identifier(token)),
        }
    }

    fn lower_expression(&self, expression: &CstExpression) -> Expression {
        let location = self.location(expression.span());
        match expression {
            CstExpression::Atom(token) => self.lower_atom(token),
            CstExpression::Label(fragments) => match self.lower_fragments(fragments) {
                LabelName::Identifier(identifier) => Expression::Identifier(identifier),
                LabelName::Dynamic(dynamic) => Expression::DynamicLabel(dynamic),
            },
            CstExpression::MacroArgument { number, .. } => {
                Expression::MacroArgument(MacroArgument {
                    ordinal: number.literal.parse().unwrap_or_default(),
                    location,
                })
            }
            CstExpression::Unary { operator, operand } => {
                let operand = self.lower_expression(operand);
                match UnaryOp::from_str(&operator.literal) {
                    Ok(operator) => Expression::Unary(UnaryOperator {
                        operator,
                        operand: Box::new(operand),
                        location,
                    }),
                    Err(_) => operand,
                }
            }
            CstExpression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.lower_expression(left);
                match BinaryOp::from_str(&operator.literal) {
                    Ok(operator) => Expression::Binary(BinaryOperator {
                        operator,
                        left: Box::new(left),
                        right: Box::new(self.lower_expression(right)),
                        location,
                    }),
                    Err(_) => left,
                }
            }
            CstExpression::Round { inner, .. } => Expression::Brackets(Brackets {
                kind: BracketKind::Round,
                inner: Box::new(self.lower_expression(inner)),
                location,
            }),
            CstExpression::Square { inner, .. } => Expression::Brackets(Brackets {
                kind: BracketKind::Square,
                inner: Box::new(self.lower_expression(inner)),
                location,
            }),
        }
    }

    /// Comment text without its markers. A `;` comment is narrowed to the trimmed text.
    fn lower_comment(&self, token: &Token) -> Comment {
        if let Some(rest) = token.literal.strip_prefix(';') {
            let leading = rest.chars().take_while(|ch| ch.is_whitespace()).count();
            let text = rest.trim();
            let start = token.span.start.column + 1 + leading;
            let line = token.span.start.line;
            let span = SourcePositionSpan::new(
                SourcePosition::new(line, start),
                SourcePosition::new(line, start + text.chars().count()),
            );
            return Comment {
                text: text.to_string(),
                location: self.location(span),
            };
        }

        let inner = token.literal.strip_prefix("/*").unwrap_or(&token.literal);
        let inner = inner.strip_suffix("*/").unwrap_or(inner);
        Comment {
            text: inner.trim().to_string(),
            location: self.location(token.span),
        }
    }
}

enum LabelName {
    Identifier(Identifier),
    Dynamic(DynamicLabel),
}

/// Build the AST of a document from its concrete syntax tree.
#[tracing::instrument(skip_all, fields(uri = %uri))]
pub fn lower(file: &CstFile, uri: &Uri) -> File {
    let lowering = Lowering { uri };
    File {
        lines: lowering.lower_lines(&file.lines),
        location: lowering.location(file.span),
    }
}
