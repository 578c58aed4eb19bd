//! Queryable views over the node classes a migration touches.
//!
//! Candidate lists are computed once per class, on first use. Liveness is checked on every
//! query, so detaching a node through [`BuildFileIndex::document_mut`] is visible to the next
//! query without rebuilding anything. Migration never adds nodes of these classes, which keeps
//! the cached candidate lists complete.

use crate::document::{BuildDocument, NodeId};
use crate::error::BuildFileError;
use pkgmigrate_types::{ENSURE_IMPORTS_TARGET, MANIFEST_FILE_NAME};
use std::cell::OnceCell;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeClass {
    LegacyReference,
    ConditionalError,
    Import,
    NoneInclude,
    EnsureImportsTarget,
}

impl NodeClass {
    /// Local element name, namespace prefix ignored.
    pub fn local_name(self) -> &'static str {
        match self {
            NodeClass::LegacyReference => "Reference",
            NodeClass::ConditionalError => "Error",
            NodeClass::Import => "Import",
            NodeClass::NoneInclude => "None",
            NodeClass::EnsureImportsTarget => "Target",
        }
    }

    /// Attribute a node of this class must carry to be matched.
    pub fn key_attribute(self) -> &'static str {
        match self {
            NodeClass::LegacyReference | NodeClass::NoneInclude => "Include",
            NodeClass::ConditionalError => "Condition",
            NodeClass::Import => "Project",
            NodeClass::EnsureImportsTarget => "Name",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {} />", self.local_name(), self.key_attribute())
    }
}

#[derive(Debug)]
pub struct BuildFileIndex {
    doc: BuildDocument,
    references: OnceCell<Vec<NodeId>>,
    errors: OnceCell<Vec<NodeId>>,
    imports: OnceCell<Vec<NodeId>>,
    nones: OnceCell<Vec<NodeId>>,
    targets: OnceCell<Vec<NodeId>>,
}

impl BuildFileIndex {
    pub fn parse(text: &str) -> Result<Self, BuildFileError> {
        Ok(Self::new(BuildDocument::parse(text)?))
    }

    pub fn new(doc: BuildDocument) -> Self {
        Self {
            doc,
            references: OnceCell::new(),
            errors: OnceCell::new(),
            imports: OnceCell::new(),
            nones: OnceCell::new(),
            targets: OnceCell::new(),
        }
    }

    pub fn document(&self) -> &BuildDocument {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut BuildDocument {
        &mut self.doc
    }

    pub fn into_document(self) -> BuildDocument {
        self.doc
    }

    /// Attached nodes of `class`, in document order.
    pub fn nodes(&self, class: NodeClass) -> impl Iterator<Item = NodeId> + '_ {
        self.candidates(class)
            .iter()
            .copied()
            .filter(move |&id| self.doc.is_attached(id))
    }

    pub fn legacy_references(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes(NodeClass::LegacyReference)
    }

    pub fn conditional_errors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes(NodeClass::ConditionalError)
    }

    pub fn imports(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes(NodeClass::Import)
    }

    /// The first attached `<None Include="packages.config" />`.
    pub fn none_include(&self) -> Option<NodeId> {
        self.nodes(NodeClass::NoneInclude)
            .find(|&id| self.doc.element(id).attribute("Include") == Some(MANIFEST_FILE_NAME))
    }

    /// The first attached `<Target Name="EnsureNuGetPackageBuildImports">`.
    pub fn ensure_imports_target(&self) -> Option<NodeId> {
        self.nodes(NodeClass::EnsureImportsTarget)
            .find(|&id| self.doc.element(id).attribute("Name") == Some(ENSURE_IMPORTS_TARGET))
    }

    /// Attached `Error` elements below `id`.
    pub fn errors_within(&self, id: NodeId) -> usize {
        self.doc
            .descendants(id)
            .into_iter()
            .filter(|&d| self.doc.element(d).local_name() == NodeClass::ConditionalError.local_name())
            .count()
    }

    fn candidates(&self, class: NodeClass) -> &[NodeId] {
        let cell = match class {
            NodeClass::LegacyReference => &self.references,
            NodeClass::ConditionalError => &self.errors,
            NodeClass::Import => &self.imports,
            NodeClass::NoneInclude => &self.nones,
            NodeClass::EnsureImportsTarget => &self.targets,
        };
        cell.get_or_init(|| {
            let root = self.doc.root();
            self.doc
                .ids()
                .filter(|&id| id != root && self.doc.element(id).local_name() == class.local_name())
                .collect()
        })
    }
}
