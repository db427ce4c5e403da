use strum_macros::{Display, EnumString};

use super::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLiteral {
    /// Literal as written, prefix included
    pub text: String,
    /// `None` when the digits do not belong to the base
    pub value: Option<i64>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    /// `.`, `..`, `...` and `*` stand for the program counter rather than a label
    pub program_counter: bool,
    pub location: Location,
}

/// A label name built from several comma joined fragments, e.g. `NAME,IDX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicLabel {
    pub fragments: Vec<Identifier>,
    pub location: Location,
}

impl DynamicLabel {
    /// The name the label is registered under.
    pub fn key(&self) -> String {
        self.fragments
            .iter()
            .map(|fragment| fragment.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Text between the quotes
    pub value: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharLiteral {
    pub value: char,
    pub location: Location,
}

/// `{n}` inside a macro body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroArgument {
    pub ordinal: usize,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum UnaryOp {
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "~")]
    BitNot,
    #[strum(serialize = "!")]
    Not,
    /// `<` low byte
    #[strum(serialize = "<")]
    LowByte,
    /// `>` high byte
    #[strum(serialize = ">")]
    HighByte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "^")]
    Xor,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "<<")]
    ShiftLeft,
    #[strum(serialize = ">>")]
    ShiftRight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryOperator {
    pub operator: UnaryOp,
    pub operand: Box<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOperator {
    pub operator: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    /// `( )`
    Round,
    /// `[ ]`
    Square,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brackets {
    pub kind: BracketKind,
    pub inner: Box<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    NumberLiteral(NumberLiteral),
    Identifier(Identifier),
    DynamicLabel(DynamicLabel),
    StringLiteral(StringLiteral),
    CharLiteral(CharLiteral),
    MacroArgument(MacroArgument),
    Unary(UnaryOperator),
    Binary(BinaryOperator),
    Brackets(Brackets),
}

impl Expression {
    pub fn location(&self) -> &Location {
        match self {
            Expression::NumberLiteral(node) => &node.location,
            Expression::Identifier(node) => &node.location,
            Expression::DynamicLabel(node) => &node.location,
            Expression::StringLiteral(node) => &node.location,
            Expression::CharLiteral(node) => &node.location,
            Expression::MacroArgument(node) => &node.location,
            Expression::Unary(node) => &node.location,
            Expression::Binary(node) => &node.location,
            Expression::Brackets(node) => &node.location,
        }
    }

    /// Direct sub-expressions, left to right.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Unary(node) => vec![node.operand.as_ref()],
            Expression::Binary(node) => vec![node.left.as_ref(), node.right.as_ref()],
            Expression::Brackets(node) => vec![node.inner.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Visit this expression and every sub-expression in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Bare identifier name, if the expression is nothing more than that.
    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Expression::Identifier(identifier) => Some(identifier),
            _ => None,
        }
    }
}
