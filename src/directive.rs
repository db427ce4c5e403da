use std::str::FromStr;

use strum_macros::{Display, EnumIter, EnumString};

use crate::opcode::AddressWidth;

/// Unify a command name for lookups: the optional leading dot is dropped and case is ignored.
///
/// `.include`, `Include` and `INCLUDE` all become `INCLUDE`.
pub fn unify_command_name(name: &str) -> String {
    name.strip_prefix('.').unwrap_or(name).to_ascii_uppercase()
}

/// Commands to the assembler that are not instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Directive {
    /// Textually include another source file
    Include,
    /// Include a binary file verbatim
    Incbin,
    /// Add a folder to the include search path
    Incdir,
    /// Switch to or open a named segment
    Seg,
    Hex,
    Err,
    Dc,
    Ds,
    Dv,
    Byte,
    Word,
    Long,
    Org,
    /// Open a relocatable region
    Rorg,
    /// Close the relocatable region
    Rend,
    Align,
    /// Start a new scope for local labels
    Subroutine,
    Equ,
    #[strum(serialize = "=")]
    Assign,
    Eqm,
    Set,
    Setstr,
    Mac,
    Macro,
    Endm,
    Mexit,
    Ifconst,
    Ifnconst,
    If,
    Else,
    Endif,
    Eif,
    Repeat,
    Repend,
    Echo,
    Processor,
    List,
    Trace,
}

impl Directive {
    /// Look up a directive by command name, e.g. `.include` or `equ`.
    pub fn from_command_name(name: &str) -> Option<Directive> {
        Directive::from_str(&unify_command_name(name)).ok()
    }

    /// Directives that give the label on their line a constant value.
    pub fn defines_constant(&self) -> bool {
        matches!(self, Directive::Equ | Directive::Assign | Directive::Eqm)
    }

    /// Directives that give the label on their line a value that may be redefined.
    pub fn defines_variable(&self) -> bool {
        matches!(self, Directive::Set | Directive::Setstr)
    }
}

/// Dot suffix on a command name, e.g. the `.w` of `lda.w` or the `.b` of `dc.b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum CommandExtension {
    #[strum(serialize = "0")]
    Implied,
    A,
    Abs,
    B,
    Bx,
    By,
    D,
    Ind,
    L,
    S,
    U,
    W,
    Wx,
    Wy,
    Z,
    Zx,
    Zy,
}

impl CommandExtension {
    /// Parse the text of an extension token, with or without its leading dot.
    pub fn from_suffix(suffix: &str) -> Option<CommandExtension> {
        let suffix = suffix.strip_prefix('.').unwrap_or(suffix);
        CommandExtension::from_str(suffix).ok()
    }

    /// Address width forced by the extension, if any.
    pub fn width(&self) -> Option<AddressWidth> {
        match self {
            CommandExtension::B
            | CommandExtension::Bx
            | CommandExtension::By
            | CommandExtension::Z
            | CommandExtension::Zx
            | CommandExtension::Zy => Some(AddressWidth::ZeroPage),
            CommandExtension::W
            | CommandExtension::Wx
            | CommandExtension::Wy
            | CommandExtension::A
            | CommandExtension::Abs => Some(AddressWidth::Absolute),
            _ => None,
        }
    }
}
