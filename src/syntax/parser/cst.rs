//! Concrete syntax tree produced by the grammar parser.
//!
//! Every production keeps the tokens it consumed so the AST builder can classify them, and a
//! span running from its first to its last token.

use crate::syntax::lexer::{SourcePositionSpan, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstFile {
    pub lines: Vec<CstLine>,
    pub span: SourcePositionSpan,
}

/// `line := [label] [space command] [space]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstLine {
    pub label: Option<CstLabel>,
    pub command: Option<CstCommand>,
    /// Comment found on the first row of the line
    pub comment: Option<Token>,
    pub span: SourcePositionSpan,
}

/// `label := ('.' | dynamicLabelDefinition) [':']`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstLabel {
    /// Comma separated identifiers, more than one for a dynamic label
    pub fragments: Vec<Token>,
    pub colon: Option<Token>,
    pub span: SourcePositionSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CstCommand {
    If(CstIfCommand),
    Repeat(CstRepeatCommand),
    Macro(CstMacroCommand),
    General(CstGeneralCommand),
}

impl CstCommand {
    pub fn span(&self) -> SourcePositionSpan {
        match self {
            CstCommand::If(command) => command.span,
            CstCommand::Repeat(command) => command.span,
            CstCommand::Macro(command) => command.span,
            CstCommand::General(command) => command.span,
        }
    }
}

/// `ifCommand := ('ifconst'|'ifnconst'|'if') expression text ['else' text] endifKeyword`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstIfCommand {
    pub keyword: Token,
    pub condition: Option<CstExpression>,
    pub then_body: Vec<CstLine>,
    pub else_keyword: Option<Token>,
    pub else_body: Vec<CstLine>,
    pub end: Option<Token>,
    pub span: SourcePositionSpan,
}

/// `repeatCommand := 'repeat' expression text 'repend'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstRepeatCommand {
    pub keyword: Token,
    pub count: Option<CstExpression>,
    pub body: Vec<CstLine>,
    pub end: Option<Token>,
    pub span: SourcePositionSpan,
}

/// `macroCommand := ('mac'|'macro') nonSpaceToken macroText 'endm'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstMacroCommand {
    pub keyword: Token,
    pub name: Option<Token>,
    /// Source text between the header line and the `ENDM` line
    pub body: String,
    pub end: Option<Token>,
    pub span: SourcePositionSpan,
}

/// `generalCommand := commandName (',' argument)*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstGeneralCommand {
    pub name: Option<Token>,
    pub extension: Option<Token>,
    pub arguments: Vec<CstArgument>,
    pub span: SourcePositionSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CstArgument {
    /// `#` expression
    Immediate {
        hash: Token,
        value: CstExpression,
        span: SourcePositionSpan,
    },
    /// expression [`,X` | `,Y`]
    Address {
        value: CstExpression,
        ending: Option<Token>,
        span: SourcePositionSpan,
    },
    /// `(` expression (`)` | `,X)` | `),Y`)
    Indirect {
        open: Token,
        value: CstExpression,
        close: Token,
        span: SourcePositionSpan,
    },
}

impl CstArgument {
    pub fn span(&self) -> SourcePositionSpan {
        match self {
            CstArgument::Immediate { span, .. }
            | CstArgument::Address { span, .. }
            | CstArgument::Indirect { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CstExpression {
    /// Number, string, char or program counter token
    Atom(Token),
    /// One identifier, or several joined into a dynamic label
    Label(Vec<Token>),
    MacroArgument {
        open: Token,
        number: Token,
        close: Token,
    },
    Unary {
        operator: Token,
        operand: Box<CstExpression>,
    },
    Binary {
        left: Box<CstExpression>,
        operator: Token,
        right: Box<CstExpression>,
    },
    /// `( expression )`
    Round {
        open: Token,
        inner: Box<CstExpression>,
        close: Token,
    },
    /// `[ expression ]`
    Square {
        open: Token,
        inner: Box<CstExpression>,
        close: Token,
    },
}

impl CstExpression {
    pub fn span(&self) -> SourcePositionSpan {
        match self {
            CstExpression::Atom(token) => token.span,
            CstExpression::Label(fragments) => match (fragments.first(), fragments.last()) {
                (Some(first), Some(last)) => first.span.to(last.span),
                _ => SourcePositionSpan::default(),
            },
            CstExpression::MacroArgument { open, close, .. } => open.span.to(close.span),
            CstExpression::Unary { operator, operand } => operator.span.to(operand.span()),
            CstExpression::Binary { left, right, .. } => left.span().to(right.span()),
            CstExpression::Round { open, close, .. } | CstExpression::Square { open, close, .. } => {
                open.span.to(close.span)
            }
        }
    }
}
