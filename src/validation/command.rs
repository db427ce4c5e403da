use crate::ast::{Argument, ArgumentMode, Command, Expression, Identifier};
use crate::diagnostics::{Diagnostic, Message};
use crate::directive::{unify_command_name, CommandExtension, Directive};
use crate::opcode::{AddressingMode, Index, Mnemonic, OPCODE_TABLE};
use crate::program::Program;

use super::width::address_width;

fn is_accumulator(value: &Expression) -> bool {
    value
        .as_identifier()
        .map_or(false, |identifier| {
            !identifier.program_counter && identifier.name.eq_ignore_ascii_case("A")
        })
}

/// Whether a single argument fits one of the modes of `mnemonic`.
fn argument_fits(
    mnemonic: Mnemonic,
    extension: Option<CommandExtension>,
    argument: &Argument,
    program: &Program,
) -> bool {
    let has = |mode| OPCODE_TABLE.has_mode(mnemonic, mode);
    let index = match argument.mode {
        ArgumentMode::Indirect => return has(AddressingMode::Indirect),
        ArgumentMode::IndirectX => return has(AddressingMode::IndirectIndexedX),
        ArgumentMode::IndirectY => return has(AddressingMode::IndirectIndexedY),
        ArgumentMode::Immediate => return has(AddressingMode::Immediate),
        ArgumentMode::Address => Index::None,
        ArgumentMode::AddressX => Index::X,
        ArgumentMode::AddressY => Index::Y,
    };

    if matches!(index, Index::None) {
        // Branch targets are width independent.
        if mnemonic.is_branching_instruction() {
            return true;
        }
        if is_accumulator(&argument.value) && has(AddressingMode::Accumulator) {
            return true;
        }
    }

    let width = address_width(extension, &argument.value, program);
    has(AddressingMode::address(index, width))
}

fn check_opcode(
    mnemonic: Mnemonic,
    name: &Identifier,
    command: &Command,
    program: &Program,
) -> Option<Diagnostic> {
    if !OPCODE_TABLE.contains(mnemonic) {
        return Some(Diagnostic::new(
            Message::InternalError(format!("no addressing modes for {}", mnemonic)),
            name.location.clone(),
        ));
    }

    match command.arguments.as_slice() {
        [] => {
            let implied = OPCODE_TABLE.has_mode(mnemonic, AddressingMode::Implied)
                || OPCODE_TABLE.has_mode(mnemonic, AddressingMode::Accumulator);
            (!implied).then(|| {
                Diagnostic::new(
                    Message::ImpliedModeUnavailable(name.name.clone()),
                    name.location.clone(),
                )
            })
        }
        [argument] => {
            if argument_fits(mnemonic, command.extension, argument, program) {
                return None;
            }
            let message = if argument.mode == ArgumentMode::Immediate {
                Message::ImmediateModeUnavailable(name.name.clone())
            } else if OPCODE_TABLE.only_implied(mnemonic) {
                Message::ImpliedModeOnly(name.name.clone())
            } else {
                Message::WrongAddressingMode(name.name.clone())
            };
            Some(Diagnostic::new(message, argument.location.clone()))
        }
        [_, second, rest @ ..] => {
            let last = rest.last().unwrap_or(second);
            Some(Diagnostic::new(
                Message::TooManyArguments,
                second.location.to(&last.location),
            ))
        }
    }
}

/// Check a command against the instruction set.
///
/// Directives are accepted as they are. Names that are neither an opcode nor a directive must
/// be defined as a macro somewhere in the program.
pub fn validate_command(command: &Command, program: &Program) -> Vec<Diagnostic> {
    let Some(name) = &command.name else {
        return vec![Diagnostic::new(
            Message::MissingCommandName,
            command.location.clone(),
        )];
    };

    if Directive::from_command_name(&name.name).is_some() {
        return Vec::new();
    }

    match Mnemonic::from_command_name(&name.name) {
        Some(mnemonic) => check_opcode(mnemonic, name, command, program)
            .into_iter()
            .collect(),
        None if program.is_macro_defined(&unify_command_name(&name.name)) => Vec::new(),
        None => vec![Diagnostic::new(
            Message::UnknownOpcode(name.name.clone()),
            name.location.clone(),
        )],
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ast::Statement;
    use crate::config::AnalyzerConfig;
    use crate::program::{resolve, DocumentCache, MemoryFileProvider, Uri};
    use crate::syntax::lexer::SourcePositionSpan;
    use crate::syntax::parse_document;

    use pretty_assertions::assert_eq;

    /// Messages for the command on the last line of `text`.
    fn validate_last(text: &str) -> Vec<Diagnostic> {
        let uri = Uri::parse("file:///command.asm").unwrap();
        let document = Arc::new(parse_document(text, &uri));
        assert_eq!(document.errors, vec![], "{}", text);
        let program = resolve(
            document.clone(),
            &AnalyzerConfig::default(),
            &MemoryFileProvider::new(),
            &DocumentCache::new(),
        );
        match document.file.lines.last().and_then(|line| line.statement.as_ref()) {
            Some(Statement::Command(command)) => validate_command(command, &program),
            other => panic!("Expected a command, got {:?}", other),
        }
    }

    fn messages(text: &str) -> Vec<Message> {
        validate_last(text)
            .into_iter()
            .map(|diagnostic| diagnostic.message)
            .collect()
    }

    #[test]
    fn test_valid_commands() {
        let tests = vec![
            "  NOP",
            "  ASL",
            "  ASL A",
            "  LDA #$10",
            "  LDA $FF",
            "  LDA $100",
            "  LDA $10,X",
            "  LDX $10,Y",
            "  LDA ($10,X)",
            "  LDA ($10),Y",
            "  JMP ($FFFC)",
            "  JMP $1000",
            "  JSR START",
            "  LDA $144,Y",
            "LOOP\n  BNE LOOP",
            "  BNE $10",
            "  LDA.W $10",
            "  LDA (1)+2",
            "  DC.B 1,2,3",
            "  SEG.U VARS",
            "  ORG $F000",
            "  MAC WAIT\n  NOP\n  ENDM\n  WAIT 1,2",
            "ZP = $80\n  STA ZP,X",
        ];
        for input in tests {
            assert_eq!(messages(input), vec![], "{}", input);
        }
    }

    #[test]
    fn test_invalid_commands() {
        let tests = vec![
            ("  FOO", Message::UnknownOpcode("FOO".to_string())),
            ("  LDA", Message::ImpliedModeUnavailable("LDA".to_string())),
            ("  STA #$10", Message::ImmediateModeUnavailable("STA".to_string())),
            ("  NOP $10", Message::ImpliedModeOnly("NOP".to_string())),
            ("  JMP ($10),Y", Message::WrongAddressingMode("JMP".to_string())),
            ("  STX $1234,Y", Message::WrongAddressingMode("STX".to_string())),
            ("  STX.Z $1234,X", Message::WrongAddressingMode("STX".to_string())),
            ("  LDA.Z $10,Y", Message::WrongAddressingMode("LDA".to_string())),
            ("  LDA $44,Y", Message::WrongAddressingMode("LDA".to_string())),
            ("  STA $10,Y", Message::WrongAddressingMode("STA".to_string())),
            ("  JMP $10", Message::WrongAddressingMode("JMP".to_string())),
            ("  JSR 0", Message::WrongAddressingMode("JSR".to_string())),
            ("  #5", Message::MissingCommandName),
        ];
        for (input, expected) in tests {
            assert_eq!(messages(input), vec![expected], "{}", input);
        }
    }

    #[test]
    fn test_width_boundary() {
        // STX has no absolute Y form, so only a zero page operand fits.
        assert_eq!(messages("  STX 255,Y"), vec![]);
        assert_eq!(
            messages("  STX 256,Y"),
            vec![Message::WrongAddressingMode("STX".to_string())]
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let diagnostics = validate_last("  LDA 1,2,3");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, Message::TooManyArguments);
        assert_eq!(diagnostics[0].location.span, SourcePositionSpan::on_line(0, 8, 11));

        let diagnostics = validate_last("  LDA 1, 2");
        assert_eq!(diagnostics[0].location.span, SourcePositionSpan::on_line(0, 9, 10));
    }

    #[test]
    fn test_arguments_of_unknown_command() {
        assert_eq!(
            messages("  FOO 1,2"),
            vec![Message::UnknownOpcode("FOO".to_string())]
        );
        assert_eq!(messages("  MAC FOO
  NOP
  ENDM
  FOO 1,2"), vec![]);
    }
}
