//! Cross-file view of a program rooted at one document.
//!
//! The AST stays untouched. Definitions, usages and every other cross reference live in the
//! tables of [`Program`], rebuilt from scratch on each resolution.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::ast::Location;
use crate::config::AnalyzerConfig;
use crate::diagnostics::Diagnostic;
use crate::syntax::Document;

/// Capabilities for reading included files.
mod files;

/// Walks documents and fills the program tables.
mod resolver;

/// Label, macro and segment tables.
pub mod symbols;

/// Document identity.
mod uri;

pub use files::{FileProvider, FsFileProvider, MemoryFileProvider};
pub use resolver::resolve;
pub use uri::Uri;

use symbols::{LabelObject, LabelTable, MacroObject, SegmentObject, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelScope {
    Global,
    /// Index into [`Program::local_scopes`]
    Local(usize),
}

/// Which table entry a label definition or usage belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelRef {
    pub scope: LabelScope,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationKind {
    Rorg,
    Rend,
}

/// A `RORG` or `REND` command in program order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocatableDirective {
    pub kind: RelocationKind,
    pub has_argument: bool,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Program {
    /// Entry document
    pub uri: Uri,
    pub config: AnalyzerConfig,
    pub global_labels: LabelTable,
    /// One scope per `SUBROUTINE`, preceded by the scope of everything before the first one
    pub local_scopes: Vec<LabelTable>,
    pub macros: SymbolTable<MacroObject>,
    pub segments: SymbolTable<SegmentObject>,
    pub relocatable_directives: Vec<RelocatableDirective>,
    /// Every document the program reads, the entry document included
    pub used_files: BTreeSet<Uri>,
    /// Include candidates that did not exist when looked up
    pub watched_files: BTreeSet<Uri>,
    /// `INCDIR` folders in registration order
    pub include_folders: Vec<Uri>,
    /// Parsed documents in the order they were first visited
    pub documents: Vec<Arc<Document>>,
    pub label_refs: HashMap<Location, LabelRef>,
    /// Findings made while resolving
    pub errors: Vec<Diagnostic>,
}

impl Program {
    pub fn new(uri: Uri, config: AnalyzerConfig) -> Self {
        Self {
            uri,
            config,
            global_labels: LabelTable::new(),
            local_scopes: vec![LabelTable::new()],
            macros: SymbolTable::new(),
            segments: SymbolTable::new(),
            relocatable_directives: Vec::new(),
            used_files: BTreeSet::new(),
            watched_files: BTreeSet::new(),
            include_folders: Vec::new(),
            documents: Vec::new(),
            label_refs: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Global labels first, then every local scope in order.
    pub fn all_labels(&self) -> impl Iterator<Item = &LabelObject> {
        self.global_labels
            .iter()
            .chain(self.local_scopes.iter().flat_map(|scope| scope.iter()))
    }

    pub fn macros(&self) -> impl Iterator<Item = &MacroObject> {
        self.macros.iter()
    }

    pub fn segments(&self) -> impl Iterator<Item = &SegmentObject> {
        self.segments.iter()
    }

    pub fn lookup_label(&self, label: &LabelRef) -> Option<&LabelObject> {
        match label.scope {
            LabelScope::Global => self.global_labels.find_symbol(&label.key),
            LabelScope::Local(scope) => self
                .local_scopes
                .get(scope)
                .and_then(|table| table.find_symbol(&label.key)),
        }
    }

    /// The label defined or used at `location`.
    pub fn label_for_usage(&self, location: &Location) -> Option<&LabelObject> {
        self.label_refs
            .get(location)
            .and_then(|label| self.lookup_label(label))
    }

    /// True when a `MAC` defines the command name.
    pub fn is_macro_defined(&self, unified_name: &str) -> bool {
        self.macros
            .find_symbol(unified_name)
            .map_or(false, |definition| !definition.definitions.is_empty())
    }

    pub fn document(&self, uri: &Uri) -> Option<&Arc<Document>> {
        self.documents.iter().find(|document| &document.uri == uri)
    }
}

/// Parsed documents by URI.
///
/// Entries are replaced whole, never changed in place, so readers always see a complete
/// document.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: RwLock<HashMap<Uri, Arc<Document>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uri: &Uri) -> Option<Arc<Document>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    pub fn insert(&self, document: Arc<Document>) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.uri.clone(), document);
    }

    pub fn remove(&self, uri: &Uri) -> Option<Arc<Document>> {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
    }

    pub fn clear(&self) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_document;

    #[test]
    fn test_document_cache_replaces_entries() {
        let uri = Uri::parse("file:///cache.asm").unwrap();
        let cache = DocumentCache::new();
        assert!(cache.get(&uri).is_none());

        let first = Arc::new(parse_document("  NOP", &uri));
        cache.insert(first.clone());
        let held = cache.get(&uri).unwrap();

        cache.insert(Arc::new(parse_document("  BRK", &uri)));
        assert_eq!(held, first);
        assert_ne!(cache.get(&uri).unwrap(), first);
        assert_eq!(cache.len(), 1);

        assert!(cache.remove(&uri).is_some());
        assert!(cache.is_empty());
    }
}
