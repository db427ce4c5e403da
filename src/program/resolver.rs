use std::sync::Arc;

use crate::ast::*;
use crate::config::AnalyzerConfig;
use crate::diagnostics::{Diagnostic, Message};
use crate::directive::{unify_command_name, Directive};
use crate::opcode::{AddressingMode, Mnemonic, OPCODE_TABLE};
use crate::syntax::{parse_document, Document};

use super::symbols::{record, LabelObject};
use super::{
    DocumentCache, FileProvider, LabelRef, LabelScope, Program, RelocatableDirective,
    RelocationKind, Uri,
};

/// Includes nested deeper than this are not followed.
const MAX_INCLUDE_DEPTH: usize = 64;

struct Resolver<'a> {
    provider: &'a dyn FileProvider,
    cache: &'a DocumentCache,
    program: Program,
    /// Documents currently being walked, outermost first
    include_path: Vec<Uri>,
}

/// How a label gets defined on its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Definition {
    Address,
    Constant,
    Variable,
}

/// Bare `A` operand of an instruction that works on the accumulator.
fn is_accumulator_operand(mnemonic: Option<Mnemonic>, argument: &Argument) -> bool {
    let Some(mnemonic) = mnemonic else {
        return false;
    };
    argument.mode == ArgumentMode::Address
        && argument
            .value
            .as_identifier()
            .map_or(false, |identifier| identifier.name.eq_ignore_ascii_case("A"))
        && OPCODE_TABLE.has_mode(mnemonic, AddressingMode::Accumulator)
}

fn string_argument(command: &Command) -> Option<&StringLiteral> {
    match command.arguments.as_slice() {
        [argument] if argument.mode == ArgumentMode::Address => match &argument.value {
            Expression::StringLiteral(literal) => Some(literal),
            _ => None,
        },
        _ => None,
    }
}

impl<'a> Resolver<'a> {
    fn current_scope(&self) -> usize {
        self.program.local_scopes.len() - 1
    }

    fn report(&mut self, message: Message, location: &Location) {
        self.program
            .errors
            .push(Diagnostic::new(message, location.clone()));
    }

    fn scope_for(&self, key: &str) -> LabelScope {
        if self.program.config.is_local(key) {
            LabelScope::Local(self.current_scope())
        } else {
            LabelScope::Global
        }
    }

    fn label_entry(&mut self, key: &str, location: &Location) -> &mut LabelObject {
        let scope = self.scope_for(key);
        self.program.label_refs.insert(
            location.clone(),
            LabelRef {
                scope,
                key: key.to_string(),
            },
        );
        match scope {
            LabelScope::Global => self.program.global_labels.get_or_insert(key),
            LabelScope::Local(index) => self.program.local_scopes[index].get_or_insert(key),
        }
    }

    fn define_label(&mut self, label: &Label, definition: Definition, value: Option<&Expression>) {
        let dynamic = match label {
            Label::Identifier(identifier) if identifier.program_counter => return,
            Label::Identifier(_) => false,
            Label::Dynamic(_) => true,
        };
        let location = label.location();
        let object = self.label_entry(&label.key(), location);
        record(&mut object.definitions, location);
        object.dynamic |= dynamic;
        match definition {
            Definition::Constant => {
                object.defined_as_constant = true;
                if object.value.is_none() {
                    object.value = value.cloned();
                }
            }
            Definition::Variable => object.defined_as_variable = true,
            Definition::Address => {}
        }
    }

    fn use_labels(&mut self, expression: &Expression) {
        let mut usages: Vec<(String, &Location, bool)> = Vec::new();
        expression.walk(&mut |node| match node {
            Expression::Identifier(identifier) if !identifier.program_counter => {
                usages.push((identifier.name.clone(), &identifier.location, false))
            }
            Expression::DynamicLabel(label) => usages.push((label.key(), &label.location, true)),
            _ => {}
        });
        for (key, location, dynamic) in usages {
            let object = self.label_entry(&key, location);
            record(&mut object.usages, location);
            object.dynamic |= dynamic;
        }
    }

    fn visit_line(&mut self, line: &Line, document: &Document) {
        let command = match &line.statement {
            Some(Statement::Command(command)) => Some(command),
            _ => None,
        };
        let name = command.and_then(|command| command.name.as_ref());
        let directive = name.and_then(|name| Directive::from_command_name(&name.name));
        let mnemonic = name.and_then(|name| Mnemonic::from_command_name(&name.name));

        if directive == Some(Directive::Subroutine) {
            self.program.local_scopes.push(Default::default());
        }

        if let Some(label) = &line.label {
            let definition = match directive {
                Some(directive) if directive.defines_constant() => Definition::Constant,
                Some(directive) if directive.defines_variable() => Definition::Variable,
                _ => Definition::Address,
            };
            let value = command
                .and_then(|command| command.arguments.first())
                .map(|argument| &argument.value);
            self.define_label(label, definition, value);
        }

        match &line.statement {
            Some(Statement::Command(command)) => {
                self.visit_command(command, directive, mnemonic, document)
            }
            Some(Statement::If(block)) => {
                if block.kind == IfKind::Plain {
                    if let Some(condition) = &block.condition {
                        self.use_labels(condition);
                    }
                }
            }
            Some(Statement::Repeat(block)) => {
                if let Some(count) = &block.count {
                    self.use_labels(count);
                }
            }
            Some(Statement::Macro(block)) => {
                if let Some(name) = &block.name {
                    let definition = self.program.macros.get_or_insert(&unify_command_name(&name.name));
                    record(&mut definition.definitions, &name.location);
                }
            }
            None => {}
        }
    }

    fn visit_command(
        &mut self,
        command: &Command,
        directive: Option<Directive>,
        mnemonic: Option<Mnemonic>,
        document: &Document,
    ) {
        match directive {
            Some(Directive::Include) => return self.include(command, document, true),
            Some(Directive::Incbin) => return self.include(command, document, false),
            Some(Directive::Incdir) => return self.include_folder(command, document),
            Some(Directive::Seg) => return self.segment(command),
            Some(Directive::Subroutine) => return,
            Some(Directive::Rorg) => self.relocation(command, RelocationKind::Rorg),
            Some(Directive::Rend) => self.relocation(command, RelocationKind::Rend),
            _ => {}
        }

        if let (Some(name), None, None) = (&command.name, directive, mnemonic) {
            let usage = self.program.macros.get_or_insert(&unify_command_name(&name.name));
            record(&mut usage.usages, &name.location);
        }

        for argument in &command.arguments {
            if !is_accumulator_operand(mnemonic, argument) {
                self.use_labels(&argument.value);
            }
        }
    }

    fn relocation(&mut self, command: &Command, kind: RelocationKind) {
        let seen = self
            .program
            .relocatable_directives
            .iter()
            .any(|directive| directive.location == command.location);
        if seen {
            return;
        }
        self.program.relocatable_directives.push(RelocatableDirective {
            kind,
            has_argument: !command.arguments.is_empty(),
            location: command.location.clone(),
        });
    }

    fn segment(&mut self, command: &Command) {
        let Some(argument) = command.arguments.first() else {
            return;
        };
        let name = match &argument.value {
            Expression::Identifier(identifier) => identifier.name.clone(),
            Expression::DynamicLabel(label) => label.key(),
            Expression::StringLiteral(literal) => literal.value.clone(),
            _ => return,
        };
        let location = argument.value.location();
        let segment = self.program.segments.get_or_insert(&name);
        if segment.definitions.is_empty() {
            record(&mut segment.definitions, location);
        } else if !segment.definitions.contains(location) {
            record(&mut segment.usages, location);
        }
    }

    /// Name of the file or folder a command refers to, or `None` after reporting why not.
    fn path_argument<'c>(&mut self, command: &'c Command) -> Option<&'c StringLiteral> {
        let Some(literal) = string_argument(command) else {
            let location = command
                .arguments
                .first()
                .map_or(&command.location, |argument| &argument.location);
            self.report(Message::StringLiteralExpected, location);
            return None;
        };
        if literal.value.is_empty() {
            self.report(Message::EmptyStringArgument, &literal.location);
            return None;
        }
        Some(literal)
    }

    /// First existing candidate, next to the including document and then in each `INCDIR`.
    ///
    /// Open documents count as existing. Candidates passed over are watched, creating one of them
    /// changes the outcome.
    fn find_file(&mut self, name: &str, document: &Document) -> Option<Uri> {
        let candidates: Vec<Uri> = std::iter::once(document.uri.join(name))
            .chain(
                self.program
                    .include_folders
                    .iter()
                    .map(|folder| folder.join(name)),
            )
            .flatten()
            .collect();
        for candidate in candidates {
            if self.cache.get(&candidate).is_some() || self.provider.file_exists(&candidate) {
                return Some(candidate);
            }
            self.program.watched_files.insert(candidate);
        }
        None
    }

    fn include(&mut self, command: &Command, document: &Document, descend: bool) {
        let Some(literal) = self.path_argument(command) else {
            return;
        };
        let Some(target) = self.find_file(&literal.value, document) else {
            tracing::debug!(name = %literal.value, "include not found");
            self.report(
                Message::FileNotResolvable(literal.value.clone()),
                &literal.location,
            );
            return;
        };

        if !descend {
            self.program.used_files.insert(target);
            return;
        }
        if self.include_path.contains(&target) {
            self.report(
                Message::CircularInclude(literal.value.clone()),
                &literal.location,
            );
            return;
        }
        if self.include_path.len() >= MAX_INCLUDE_DEPTH {
            tracing::warn!(uri = %target, depth = self.include_path.len(), "include nesting too deep");
            return;
        }

        let included = match self.cache.get(&target) {
            Some(included) => included,
            None => match self.provider.read_file(&target) {
                Some(text) => {
                    let included = Arc::new(parse_document(&text, &target));
                    self.cache.insert(included.clone());
                    included
                }
                None => {
                    self.report(
                        Message::FileNotResolvable(literal.value.clone()),
                        &literal.location,
                    );
                    return;
                }
            },
        };
        self.walk_document(included);
    }

    fn include_folder(&mut self, command: &Command, document: &Document) {
        let Some(literal) = self.path_argument(command) else {
            return;
        };
        let Some(folder) = document.uri.join_folder(&literal.value) else {
            self.report(
                Message::FolderNotResolvable(literal.value.clone()),
                &literal.location,
            );
            return;
        };
        if !self.provider.folder_exists(&folder) {
            self.report(
                Message::FolderNotResolvable(literal.value.clone()),
                &literal.location,
            );
        }
        if !self.program.include_folders.contains(&folder) {
            self.program.include_folders.push(folder);
        }
    }

    fn walk_document(&mut self, document: Arc<Document>) {
        tracing::debug!(uri = %document.uri, depth = self.include_path.len(), "resolving document");
        self.program.used_files.insert(document.uri.clone());
        if self.program.document(&document.uri).is_none() {
            self.program.documents.push(document.clone());
        }

        self.include_path.push(document.uri.clone());
        walk_lines(&document.file.lines, &mut |line| {
            self.visit_line(line, &document)
        });
        self.include_path.pop();
    }
}

/// Resolve the program rooted at `document`, following its includes.
///
/// Included documents are taken from `cache` when present, otherwise read through `provider`,
/// parsed and added to the cache.
#[tracing::instrument(skip_all, fields(uri = %document.uri))]
pub fn resolve(
    document: Arc<Document>,
    config: &AnalyzerConfig,
    provider: &dyn FileProvider,
    cache: &DocumentCache,
) -> Program {
    let mut resolver = Resolver {
        provider,
        cache,
        program: Program::new(document.uri.clone(), config.clone()),
        include_path: Vec::new(),
    };
    resolver.walk_document(document);
    resolver.program
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::MemoryFileProvider;
    use crate::syntax::lexer::SourcePositionSpan;

    use pretty_assertions::assert_eq;

    fn uri(name: &str) -> Uri {
        Uri::parse(&format!("file:///project/{}", name)).unwrap()
    }

    fn resolve_text(text: &str, config: &AnalyzerConfig, provider: &MemoryFileProvider) -> Program {
        let document = Arc::new(parse_document(text, &uri("main.asm")));
        resolve(document, config, provider, &DocumentCache::new())
    }

    fn messages(program: &Program) -> Vec<Message> {
        program
            .errors
            .iter()
            .map(|diagnostic| diagnostic.message.clone())
            .collect()
    }

    #[test]
    fn test_definitions_and_usages() {
        let program = resolve_text(
            "START\n  LDA TABLE,X\n  JMP START\nTABLE EQU $80\nCOUNT SET 1\n",
            &AnalyzerConfig::default(),
            &MemoryFileProvider::new(),
        );
        let start = program.global_labels.find_symbol("START").unwrap();
        assert_eq!(start.definitions.len(), 1);
        assert_eq!(start.usages.len(), 1);

        let table = program.global_labels.find_symbol("TABLE").unwrap();
        assert!(table.defined_as_constant);
        assert!(matches!(
            &table.value,
            Some(Expression::NumberLiteral(literal)) if literal.value == Some(0x80)
        ));
        assert!(program.global_labels.find_symbol("COUNT").unwrap().defined_as_variable);
        assert_eq!(program.errors, vec![]);
    }

    #[test]
    fn test_local_scopes() {
        let config = AnalyzerConfig::with_local_prefixes(["."]);
        let program = resolve_text(
            "FIRST SUBROUTINE\n.loop\n  BNE .loop\nSECOND SUBROUTINE\n.loop\n  BNE .loop\n",
            &config,
            &MemoryFileProvider::new(),
        );
        assert_eq!(program.local_scopes.len(), 3);
        assert!(program.local_scopes[0].is_empty());
        for scope in &program.local_scopes[1..] {
            let label = scope.find_symbol(".loop").unwrap();
            assert_eq!((label.definitions.len(), label.usages.len()), (1, 1));
        }
        // The label of a SUBROUTINE line is global.
        assert!(program.global_labels.find_symbol("SECOND").is_some());
    }

    #[test]
    fn test_label_for_usage() {
        let program = resolve_text(
            "PTR = $10\n  LDA (PTR),Y",
            &AnalyzerConfig::default(),
            &MemoryFileProvider::new(),
        );
        let location = Location::new(uri("main.asm"), SourcePositionSpan::on_line(1, 7, 10));
        let label = program.label_for_usage(&location).unwrap();
        assert_eq!(label.name, "PTR");
        assert!(label.defined_as_constant);
    }

    #[test]
    fn test_skipped_usages() {
        let program = resolve_text(
            "  ASL A\n  IFCONST DEBUG\n  NOP\n  ENDIF\n  SEG CODE\n  JMP *\n",
            &AnalyzerConfig::default(),
            &MemoryFileProvider::new(),
        );
        assert_eq!(program.global_labels.len(), 0);
        let segment = program.segments.find_symbol("CODE").unwrap();
        assert_eq!(segment.definitions.len(), 1);
    }

    #[test]
    fn test_macros() {
        let program = resolve_text(
            "  MAC add16\n  CLC\n  ENDM\n  ADD16 1,2\n  .add16 3,4\n  UNKNOWN\n",
            &AnalyzerConfig::default(),
            &MemoryFileProvider::new(),
        );
        let add16 = program.macros.find_symbol("ADD16").unwrap();
        assert_eq!((add16.definitions.len(), add16.usages.len()), (1, 2));
        assert!(program.is_macro_defined("ADD16"));
        assert!(!program.is_macro_defined("UNKNOWN"));
    }

    #[test]
    fn test_include_and_incbin() {
        let provider = MemoryFileProvider::new()
            .with_file(uri("inc/vcs.h"), "VSYNC = $00\n")
            .with_file(uri("gfx.bin"), "");
        let program = resolve_text(
            "  INCDIR \"inc\"\n  INCLUDE \"vcs.h\"\n  INCBIN \"gfx.bin\"\n  STA VSYNC\n",
            &AnalyzerConfig::default(),
            &provider,
        );
        assert_eq!(program.errors, vec![]);
        assert_eq!(
            program.used_files.iter().cloned().collect::<Vec<_>>(),
            vec![uri("gfx.bin"), uri("inc/vcs.h"), uri("main.asm")]
        );
        assert_eq!(program.documents.len(), 2);
        let vsync = program.global_labels.find_symbol("VSYNC").unwrap();
        assert_eq!(vsync.definitions[0].uri, uri("inc/vcs.h"));
        assert_eq!(vsync.usages[0].uri, uri("main.asm"));
    }

    #[test]
    fn test_include_errors() {
        let provider = MemoryFileProvider::new();
        let program = resolve_text(
            "  INCLUDE \"missing.h\"\n  INCLUDE \"\"\n  INCLUDE FOO\n  INCDIR \"nowhere\"\n",
            &AnalyzerConfig::default(),
            &provider,
        );
        assert_eq!(
            messages(&program),
            vec![
                Message::FileNotResolvable("missing.h".to_string()),
                Message::EmptyStringArgument,
                Message::StringLiteralExpected,
                Message::FolderNotResolvable("nowhere".to_string()),
            ]
        );
        assert_eq!(program.include_folders, vec![uri("nowhere/")]);
        assert!(program.watched_files.contains(&uri("missing.h")));
    }

    #[test]
    fn test_diamond_include() {
        let provider = MemoryFileProvider::new()
            .with_file(uri("a.h"), "  INCLUDE \"defs.h\"\n")
            .with_file(uri("b.h"), "  INCLUDE \"defs.h\"\n")
            .with_file(
                uri("defs.h"),
                "FOO = 1\n  SEG CODE\n  MAC WAIT\n  NOP\n  ENDM\n  RORG $F000\n  REND\n  LDA FOO\n",
            );
        let program = resolve_text(
            "  INCLUDE \"a.h\"\n  INCLUDE \"b.h\"\n",
            &AnalyzerConfig::default(),
            &provider,
        );

        assert_eq!(program.errors, vec![]);
        assert_eq!(program.documents.len(), 4);
        let foo = program.global_labels.find_symbol("FOO").unwrap();
        assert_eq!(foo.definitions.len(), 1);
        assert_eq!(foo.usages.len(), 1);
        let segment = program.segments.find_symbol("CODE").unwrap();
        assert_eq!((segment.definitions.len(), segment.usages.len()), (1, 0));
        assert_eq!(program.macros.find_symbol("WAIT").unwrap().definitions.len(), 1);
        assert_eq!(program.relocatable_directives.len(), 2);
    }

    #[test]
    fn test_open_document_is_an_include_target() {
        let cache = DocumentCache::new();
        cache.insert(Arc::new(parse_document("VALUE = 1\n", &uri("defs.h"))));
        let document = Arc::new(parse_document("  INCLUDE \"defs.h\"\n  LDA VALUE\n", &uri("main.asm")));
        let program = resolve(document, &AnalyzerConfig::default(), &MemoryFileProvider::new(), &cache);

        assert_eq!(program.errors, vec![]);
        assert!(program.used_files.contains(&uri("defs.h")));
        assert!(program.watched_files.is_empty());
    }

    #[test]
    fn test_circular_include() {
        let provider = MemoryFileProvider::new()
            .with_file(uri("main.asm"), "  INCLUDE \"other.asm\"\n")
            .with_file(uri("other.asm"), "  INCLUDE \"main.asm\"\n");
        let program = resolve_text("  INCLUDE \"other.asm\"\n", &AnalyzerConfig::default(), &provider);

        assert_eq!(messages(&program), vec![Message::CircularInclude("main.asm".to_string())]);
        assert_eq!(program.errors[0].location.uri, uri("other.asm"));
    }

    #[test]
    fn test_relocation_directives() {
        let program = resolve_text(
            "  RORG $F000\n  NOP\n  REND\n  RORG\n",
            &AnalyzerConfig::default(),
            &MemoryFileProvider::new(),
        );
        let kinds: Vec<(RelocationKind, bool)> = program
            .relocatable_directives
            .iter()
            .map(|directive| (directive.kind, directive.has_argument))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (RelocationKind::Rorg, true),
                (RelocationKind::Rend, false),
                (RelocationKind::Rorg, false)
            ]
        );
    }
}
