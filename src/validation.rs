//! Checks over a resolved program.
//!
//! Every document of the program is checked command by command, then the program tables are
//! cross-checked as a whole. Nothing here stops at the first finding.

use crate::ast::{line_expressions, walk_lines, Expression, Location, Statement};
use crate::diagnostics::{assemble, Diagnostic, Message};
use crate::program::Program;
use crate::syntax::Document;

/// Addressing mode and arity of single commands.
pub mod command;

/// Label cross references and relocation regions.
pub mod references;

/// Value and width of address operands.
pub mod width;

pub use command::validate_command;

fn syntax_diagnostics(document: &Document) -> impl Iterator<Item = Diagnostic> + '_ {
    document.errors.iter().map(|error| {
        Diagnostic::from_syntax_error(error, Location::new(document.uri.clone(), error.span()))
    })
}

fn number_diagnostics(document: &Document) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    walk_lines(&document.file.lines, &mut |line| {
        for expression in line_expressions(line) {
            expression.walk(&mut |node| {
                if let Expression::NumberLiteral(literal) = node {
                    if literal.value.is_none() {
                        diagnostics.push(Diagnostic::new(
                            Message::InvalidNumber(literal.text.clone()),
                            literal.location.clone(),
                        ));
                    }
                }
            });
        }
    });
    diagnostics
}

fn command_diagnostics(document: &Document, program: &Program) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    walk_lines(&document.file.lines, &mut |line| {
        if let Some(Statement::Command(command)) = &line.statement {
            diagnostics.extend(validate_command(command, program));
        }
    });
    diagnostics
}

/// Checks on the program tables as a whole.
pub fn validate_program(program: &Program) -> Vec<Diagnostic> {
    let mut diagnostics = references::validate_labels(program);
    diagnostics.extend(references::validate_relocation(program));
    for document in &program.documents {
        diagnostics.extend(number_diagnostics(document));
    }
    diagnostics
}

/// Every finding for a program: syntax errors of each document, resolution errors and the
/// results of all checks, sorted by location.
#[tracing::instrument(skip_all, fields(uri = %program.uri))]
pub fn validate(program: &Program) -> Vec<Diagnostic> {
    let mut diagnostics = program.errors.clone();
    for document in &program.documents {
        diagnostics.extend(syntax_diagnostics(document));
        diagnostics.extend(command_diagnostics(document, program));
    }
    diagnostics.extend(validate_program(program));

    let diagnostics = assemble(diagnostics);
    tracing::debug!(count = diagnostics.len(), "validated");
    diagnostics
}
