use crate::diagnostics::{Diagnostic, Message};
use crate::program::{Program, RelocationKind};

/// Cross-check label definitions against their usages.
pub fn validate_labels(program: &Program) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for label in program.all_labels().filter(|label| !label.dynamic) {
        if label.definitions.is_empty() {
            // Locals may be defined by code the analyzer never sees, e.g. a macro expansion.
            if !program.config.is_local(&label.name) {
                diagnostics.extend(label.usages.iter().map(|usage| {
                    Diagnostic::new(Message::LabelNotDefined(label.name.clone()), usage.clone())
                }));
            }
            continue;
        }

        if label.defined_as_constant && label.defined_as_variable {
            diagnostics.extend(label.definitions.iter().map(|definition| {
                Diagnostic::new(
                    Message::LabelAsVariableAndConstant(label.name.clone()),
                    definition.clone(),
                )
            }));
        }

        if !label.defined_as_variable {
            diagnostics.extend(label.definitions.iter().skip(1).map(|definition| {
                Diagnostic::new(
                    Message::TooManyDefinitions(label.name.clone()),
                    definition.clone(),
                )
            }));
        }
    }

    diagnostics
}

/// `RORG` opens a relocation region and `REND` closes it.
pub fn validate_relocation(program: &Program) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut open = false;

    for directive in &program.relocatable_directives {
        match directive.kind {
            RelocationKind::Rorg => {
                if !directive.has_argument {
                    diagnostics.push(Diagnostic::new(
                        Message::NoArgumentForRelocationDirective,
                        directive.location.clone(),
                    ));
                }
                if open {
                    diagnostics.push(Diagnostic::new(
                        Message::RelocationRegionOpenedTwice,
                        directive.location.clone(),
                    ));
                }
                open = true;
            }
            RelocationKind::Rend => {
                if !open {
                    diagnostics.push(Diagnostic::new(
                        Message::CommandOutsideRelocationRegion("REND".to_string()),
                        directive.location.clone(),
                    ));
                }
                open = false;
            }
        }
    }

    diagnostics
}
