/// Reads 6502 assembly in the DASM dialect and reports what is wrong with it.
///
/// The steps are:
/// 1. **Lexing** - converting text into tokens
/// 2. **Parsing** - converting tokens into a concrete syntax tree
/// 3. **Lowering** - converting the concrete syntax tree into an AST
/// 4. **Resolving** - following includes and collecting labels, macros and segments
/// 5. **Validating** - checking commands and cross references
pub mod syntax;

/// Abstract syntax tree and position lookups.
pub mod ast;

/// Cross-file program tables.
pub mod program;

/// Command and program checks.
pub mod validation;

/// Diagnostic messages and their ordering.
pub mod diagnostics;

/// Open documents and cached analyses.
pub mod workspace;

/// 6502 instruction set.
pub mod opcode;

/// DASM directives and command extensions.
pub mod directive;

/// Analyzer settings.
pub mod config;

/// Tracing setup.
pub mod instrumentation;
