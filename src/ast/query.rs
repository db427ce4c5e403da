//! Position lookups over an AST.
//!
//! Nodes carry no parent links. Ancestors are found by walking down from the root along the
//! nodes whose location contains the position.

use crate::syntax::lexer::SourcePosition;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Line,
    Label,
    Command,
    If,
    Repeat,
    Macro,
    Argument,
    Expression,
    Identifier,
    Comment,
}

/// Borrowed view of any AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    File(&'a File),
    Line(&'a Line),
    Label(&'a Label),
    Command(&'a Command),
    If(&'a IfDirective),
    Repeat(&'a RepeatDirective),
    Macro(&'a MacroDirective),
    Argument(&'a Argument),
    Expression(&'a Expression),
    /// Command names, macro names and dynamic label fragments
    Identifier(&'a Identifier),
    Comment(&'a Comment),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::File(_) => NodeKind::File,
            NodeRef::Line(_) => NodeKind::Line,
            NodeRef::Label(_) => NodeKind::Label,
            NodeRef::Command(_) => NodeKind::Command,
            NodeRef::If(_) => NodeKind::If,
            NodeRef::Repeat(_) => NodeKind::Repeat,
            NodeRef::Macro(_) => NodeKind::Macro,
            NodeRef::Argument(_) => NodeKind::Argument,
            NodeRef::Expression(_) => NodeKind::Expression,
            NodeRef::Identifier(_) => NodeKind::Identifier,
            NodeRef::Comment(_) => NodeKind::Comment,
        }
    }

    pub fn location(&self) -> &'a Location {
        match *self {
            NodeRef::File(node) => &node.location,
            NodeRef::Line(node) => &node.location,
            NodeRef::Label(node) => node.location(),
            NodeRef::Command(node) => &node.location,
            NodeRef::If(node) => &node.location,
            NodeRef::Repeat(node) => &node.location,
            NodeRef::Macro(node) => &node.location,
            NodeRef::Argument(node) => &node.location,
            NodeRef::Expression(node) => node.location(),
            NodeRef::Identifier(node) => &node.location,
            NodeRef::Comment(node) => &node.location,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match *self {
            NodeRef::File(file) => file.lines.iter().map(NodeRef::Line).collect(),
            NodeRef::Line(line) => {
                let mut children = Vec::new();
                if let Some(label) = &line.label {
                    children.push(NodeRef::Label(label));
                }
                match &line.statement {
                    Some(Statement::Command(node)) => children.push(NodeRef::Command(node)),
                    Some(Statement::If(node)) => children.push(NodeRef::If(node)),
                    Some(Statement::Repeat(node)) => children.push(NodeRef::Repeat(node)),
                    Some(Statement::Macro(node)) => children.push(NodeRef::Macro(node)),
                    None => {}
                }
                if let Some(comment) = &line.comment {
                    children.push(NodeRef::Comment(comment));
                }
                children
            }
            NodeRef::Label(Label::Identifier(identifier)) => vec![NodeRef::Identifier(identifier)],
            NodeRef::Label(Label::Dynamic(label)) => {
                label.fragments.iter().map(NodeRef::Identifier).collect()
            }
            NodeRef::Command(command) => command
                .name
                .iter()
                .map(NodeRef::Identifier)
                .chain(command.arguments.iter().map(NodeRef::Argument))
                .collect(),
            NodeRef::If(directive) => directive
                .condition
                .iter()
                .map(NodeRef::Expression)
                .chain(directive.then_body.iter().map(NodeRef::Line))
                .chain(directive.else_body.iter().map(NodeRef::Line))
                .collect(),
            NodeRef::Repeat(directive) => directive
                .count
                .iter()
                .map(NodeRef::Expression)
                .chain(directive.body.iter().map(NodeRef::Line))
                .collect(),
            NodeRef::Macro(directive) => directive.name.iter().map(NodeRef::Identifier).collect(),
            NodeRef::Argument(argument) => vec![NodeRef::Expression(&argument.value)],
            NodeRef::Expression(Expression::DynamicLabel(label)) => {
                label.fragments.iter().map(NodeRef::Identifier).collect()
            }
            NodeRef::Expression(expression) => expression
                .children()
                .into_iter()
                .map(NodeRef::Expression)
                .collect(),
            NodeRef::Identifier(_) | NodeRef::Comment(_) => Vec::new(),
        }
    }
}

/// Nodes containing `position`, from the file down to the innermost one.
///
/// Containment includes the end position. Where two siblings touch the first one wins.
pub fn node_path(file: &File, position: SourcePosition) -> Vec<NodeRef<'_>> {
    let mut path = vec![NodeRef::File(file)];
    let mut current = NodeRef::File(file);
    while let Some(child) = current
        .children()
        .into_iter()
        .find(|child| child.location().contains(position))
    {
        path.push(child);
        current = child;
    }
    path
}

/// Innermost node containing `position`.
pub fn node_at(file: &File, position: SourcePosition) -> Option<NodeRef<'_>> {
    let path = node_path(file, position);
    match path.last() {
        Some(NodeRef::File(_)) | None => None,
        Some(node) => Some(*node),
    }
}

/// Nearest node of `kind` containing `position`, the innermost node included.
pub fn ancestor_of_kind(file: &File, position: SourcePosition, kind: NodeKind) -> Option<NodeRef<'_>> {
    node_path(file, position)
        .into_iter()
        .rev()
        .find(|node| node.kind() == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Uri;
    use crate::syntax::parse_document;

    fn document(text: &str) -> crate::syntax::Document {
        let uri = Uri::parse("file:///query.asm").unwrap();
        parse_document(text, &uri)
    }

    #[test]
    fn test_node_at_argument_identifier() {
        let document = document("START\n  LDA TABLE,X ; load\n");
        let node = node_at(&document.file, SourcePosition::new(1, 8)).unwrap();
        match node {
            NodeRef::Expression(Expression::Identifier(identifier)) => {
                assert_eq!(identifier.name, "TABLE")
            }
            other => panic!("Unexpected node {:?}", other),
        }

        let command = ancestor_of_kind(&document.file, SourcePosition::new(1, 8), NodeKind::Command);
        assert!(matches!(command, Some(NodeRef::Command(command)) if command.arguments.len() == 1));
    }

    #[test]
    fn test_node_path_descends_into_blocks() {
        let document = document("  IF 1\n  NOP\n  ENDIF");
        let kinds: Vec<NodeKind> = node_path(&document.file, SourcePosition::new(1, 3))
            .iter()
            .map(|node| node.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::File,
                NodeKind::Line,
                NodeKind::If,
                NodeKind::Line,
                NodeKind::Command,
                NodeKind::Identifier
            ]
        );
    }

    #[test]
    fn test_label_and_comment() {
        let document = document("FOO   FOO FOO   FOO  ; FOO");
        assert!(matches!(
            node_at(&document.file, SourcePosition::new(0, 1)),
            Some(NodeRef::Identifier(identifier)) if identifier.name == "FOO"
        ));
        assert!(matches!(
            ancestor_of_kind(&document.file, SourcePosition::new(0, 1), NodeKind::Label),
            Some(NodeRef::Label(_))
        ));
        assert!(matches!(
            node_at(&document.file, SourcePosition::new(0, 24)),
            Some(NodeRef::Comment(comment)) if comment.text == "FOO"
        ));
    }

    #[test]
    fn test_nothing_outside_lines() {
        let document = document("  NOP");
        assert_eq!(node_at(&document.file, SourcePosition::new(5, 0)), None);
    }
}
