use crate::document::{BuildDocument, NodeId};
use crate::index::{BuildFileIndex, NodeClass};
use crate::rules::{RemovalRule, builtin_rules};
use pkgmigrate_types::DependencyDeclaration;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Where the declaration block goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Right after this top-level element.
    After(NodeId),
    /// The root has no child elements; the block becomes its first child.
    IntoRoot,
}

/// The new `<PackageReference>` entries, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationBlock {
    pub declarations: Vec<DependencyDeclaration>,
}

impl DeclarationBlock {
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// A legacy node that falls in scope but cannot be matched. It is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanWarning {
    #[error("ambiguous reference: <{element}> at line {line} has no `{attribute}` attribute; skipped")]
    AmbiguousReference {
        class: NodeClass,
        element: String,
        attribute: &'static str,
        line: usize,
    },
}

#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub removals: BTreeMap<NodeId, NodeClass>,
    pub insertion: DeclarationBlock,
    pub anchor: Anchor,
    pub warnings: Vec<PlanWarning>,
    /// Element count of the document the plan was computed against.
    pub node_count: usize,
}

impl MigrationPlan {
    /// True when `id` or one of its ancestors is already marked for removal.
    pub fn covers(&self, doc: &BuildDocument, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if self.removals.contains_key(&c) {
                return true;
            }
            cur = doc.element(c).parent();
        }
        false
    }

    pub fn removal_count(&self, class: NodeClass) -> usize {
        self.removals.values().filter(|c| **c == class).count()
    }
}

pub struct MigrationPlanner {
    rules: Vec<Box<dyn RemovalRule>>,
}

impl Default for MigrationPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationPlanner {
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn RemovalRule>>) -> Self {
        Self { rules }
    }

    /// Compute removals and the declaration block for `declarations` against `index`.
    ///
    /// Dependencies are processed in manifest order and every rule sees the removals chosen for
    /// earlier dependencies, so a node is marked at most once.
    pub fn plan(
        &self,
        declarations: &[DependencyDeclaration],
        index: &BuildFileIndex,
    ) -> MigrationPlan {
        let doc = index.document();
        let anchor = match doc.last_child(doc.root()) {
            Some(id) => Anchor::After(id),
            None => Anchor::IntoRoot,
        };

        let mut plan = MigrationPlan {
            removals: BTreeMap::new(),
            insertion: DeclarationBlock::default(),
            anchor,
            warnings: ambiguous_nodes(index),
            node_count: doc.len(),
        };
        for w in &plan.warnings {
            warn!("{w}");
        }

        for dep in declarations {
            plan.insertion.declarations.push(dep.clone());

            for rule in &self.rules {
                debug!(package = %dep.id, "{}", rule.describe());
                for id in rule.matches(dep, index, &plan) {
                    debug!(
                        package = %dep.id,
                        line = doc.line_of(id),
                        element = doc.element(id).name(),
                        "marked for removal"
                    );
                    plan.removals.insert(id, rule.class());
                }
            }
        }

        debug!(
            declarations = plan.insertion.len(),
            removals = plan.removals.len(),
            "plan computed"
        );
        plan
    }
}

fn ambiguous_nodes(index: &BuildFileIndex) -> Vec<PlanWarning> {
    let doc = index.document();
    let mut out = Vec::new();
    for class in [
        NodeClass::LegacyReference,
        NodeClass::ConditionalError,
        NodeClass::Import,
    ] {
        for id in index.nodes(class) {
            let el = doc.element(id);
            if el.attribute(class.key_attribute()).is_none() {
                out.push(PlanWarning::AmbiguousReference {
                    class,
                    element: el.name().to_string(),
                    attribute: class.key_attribute(),
                    line: doc.line_of(id),
                });
            }
        }
    }
    out.sort_by_key(|w| match w {
        PlanWarning::AmbiguousReference { line, .. } => *line,
    });
    out
}
