use std::collections::HashMap;

use crate::ast::{Expression, Location};

/// Anything a [`SymbolTable`] can hold.
pub trait Symbol {
    /// A fresh symbol without definitions or usages.
    fn with_name(name: &str) -> Self;

    fn name(&self) -> &str;
}

/// Symbols by name, kept in the order they were first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable<T> {
    symbols: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Symbol> SymbolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_symbol(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&position| &self.symbols[position])
    }

    /// The symbol called `name`, created on first use.
    pub fn get_or_insert(&mut self, name: &str) -> &mut T {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                self.symbols.push(T::with_name(name));
                self.index.insert(name.to_string(), self.symbols.len() - 1);
                self.symbols.len() - 1
            }
        };
        &mut self.symbols[position]
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Append `location` unless it is already listed.
///
/// A document included along two paths is walked twice and must not count twice.
pub(crate) fn record(locations: &mut Vec<Location>, location: &Location) {
    if !locations.contains(location) {
        locations.push(location.clone());
    }
}

/// Everything known about one label name within one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelObject {
    pub name: String,
    /// Set by `EQU`, `=` or `EQM`
    pub defined_as_constant: bool,
    /// Set by `SET` or `SETSTR`
    pub defined_as_variable: bool,
    /// Built from comma joined fragments
    pub dynamic: bool,
    pub definitions: Vec<Location>,
    pub usages: Vec<Location>,
    /// Expression of the first constant definition
    pub value: Option<Expression>,
}

impl Symbol for LabelObject {
    fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            defined_as_constant: false,
            defined_as_variable: false,
            dynamic: false,
            definitions: Vec::new(),
            usages: Vec::new(),
            value: None,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroObject {
    /// Unified command name, upper case without a leading dot
    pub name: String,
    pub definitions: Vec<Location>,
    pub usages: Vec<Location>,
}

impl Symbol for MacroObject {
    fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            definitions: Vec::new(),
            usages: Vec::new(),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentObject {
    pub name: String,
    pub definitions: Vec<Location>,
    pub usages: Vec<Location>,
}

impl Symbol for SegmentObject {
    fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            definitions: Vec::new(),
            usages: Vec::new(),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub type LabelTable = SymbolTable<LabelObject>;
