use crate::directive::CommandExtension;

use super::{DynamicLabel, Expression, Identifier, Location};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub lines: Vec<Line>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub label: Option<Label>,
    pub statement: Option<Statement>,
    pub comment: Option<Comment>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Command(Command),
    If(IfDirective),
    Repeat(RepeatDirective),
    Macro(MacroDirective),
}

impl Statement {
    pub fn location(&self) -> &Location {
        match self {
            Statement::Command(node) => &node.location,
            Statement::If(node) => &node.location,
            Statement::Repeat(node) => &node.location,
            Statement::Macro(node) => &node.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Identifier(Identifier),
    Dynamic(DynamicLabel),
}

impl Label {
    /// Name the label is registered under.
    pub fn key(&self) -> String {
        match self {
            Label::Identifier(identifier) => identifier.name.clone(),
            Label::Dynamic(label) => label.key(),
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Label::Identifier(identifier) => &identifier.location,
            Label::Dynamic(label) => &label.location,
        }
    }
}

/// An instruction, a directive or a macro invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: Option<Identifier>,
    pub extension: Option<CommandExtension>,
    pub arguments: Vec<Argument>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfKind {
    Plain,
    IfConst,
    IfNConst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfDirective {
    pub kind: IfKind,
    pub condition: Option<Expression>,
    pub then_body: Vec<Line>,
    /// Empty without an `ELSE`
    pub else_body: Vec<Line>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatDirective {
    pub count: Option<Expression>,
    pub body: Vec<Line>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDirective {
    pub name: Option<Identifier>,
    /// Source text of the body, unparsed
    pub body: String,
    pub location: Location,
}

/// Addressing shape of an argument, decided by its punctuation alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentMode {
    /// `expr`
    Address,
    /// `#expr`
    Immediate,
    /// `(expr)`
    Indirect,
    /// `(expr,X)`
    IndirectX,
    /// `(expr),Y`
    IndirectY,
    /// `expr,X`
    AddressX,
    /// `expr,Y`
    AddressY,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub mode: ArgumentMode,
    pub value: Expression,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment text without the comment markers, trimmed
    pub text: String,
    pub location: Location,
}

/// Visit every line in order, descending into `IF` and `REPEAT` bodies.
pub fn walk_lines<'a>(lines: &'a [Line], visit: &mut impl FnMut(&'a Line)) {
    for line in lines {
        visit(line);
        match &line.statement {
            Some(Statement::If(directive)) => {
                walk_lines(&directive.then_body, visit);
                walk_lines(&directive.else_body, visit);
            }
            Some(Statement::Repeat(directive)) => walk_lines(&directive.body, visit),
            _ => {}
        }
    }
}

/// Expressions that are direct parts of a line: arguments, conditions and repeat counts.
pub fn line_expressions(line: &Line) -> Vec<&Expression> {
    match &line.statement {
        Some(Statement::Command(command)) => command
            .arguments
            .iter()
            .map(|argument| &argument.value)
            .collect(),
        Some(Statement::If(directive)) => directive.condition.iter().collect(),
        Some(Statement::Repeat(directive)) => directive.count.iter().collect(),
        _ => Vec::new(),
    }
}
