use crate::document::NodeId;
use crate::index::{BuildFileIndex, NodeClass};
use crate::planner::MigrationPlan;
use pkgmigrate_types::DependencyDeclaration;

/// One way of finding legacy nodes tied to a dependency.
///
/// Rules run in order for each dependency and see the plan built so far; a node the plan already
/// covers (directly or through an ancestor) is never returned again.
pub trait RemovalRule: Send + Sync {
    fn describe(&self) -> &'static str;

    fn class(&self) -> NodeClass;

    fn matches(
        &self,
        dep: &DependencyDeclaration,
        index: &BuildFileIndex,
        plan: &MigrationPlan,
    ) -> Vec<NodeId>;
}

pub fn builtin_rules() -> Vec<Box<dyn RemovalRule>> {
    vec![
        Box::new(PrimaryIdentityRule),
        Box::new(ResidualTextRule),
        Box::new(MissingImportErrorRule),
        Box::new(PackageImportRule),
    ]
}

/// Remaining nodes of `class` that carry their key attribute, paired with its value.
fn open_nodes<'a>(
    index: &'a BuildFileIndex,
    plan: &'a MigrationPlan,
    class: NodeClass,
) -> impl Iterator<Item = (NodeId, &'a str)> + 'a {
    let doc = index.document();
    index
        .nodes(class)
        .filter(move |&id| !plan.covers(doc, id))
        .filter_map(move |id| {
            doc.element(id)
                .attribute(class.key_attribute())
                .map(|v| (id, v))
        })
}

/// `<Reference Include="Id, Version=..">`: first comma-delimited token equals the id, any case.
struct PrimaryIdentityRule;

impl RemovalRule for PrimaryIdentityRule {
    fn describe(&self) -> &'static str {
        "removing <Reference Include /> elements"
    }

    fn class(&self) -> NodeClass {
        NodeClass::LegacyReference
    }

    fn matches(
        &self,
        dep: &DependencyDeclaration,
        index: &BuildFileIndex,
        plan: &MigrationPlan,
    ) -> Vec<NodeId> {
        open_nodes(index, plan, self.class())
            .filter(|(_, include)| {
                let identity = include.split(',').next().unwrap_or_default().trim();
                dep.same_identity(identity)
            })
            .map(|(id, _)| id)
            .collect()
    }
}

/// Any remaining `<Reference>` whose nested content (hint path etc.) names the id.
struct ResidualTextRule;

impl RemovalRule for ResidualTextRule {
    fn describe(&self) -> &'static str {
        "removing <Reference /> elements"
    }

    fn class(&self) -> NodeClass {
        NodeClass::LegacyReference
    }

    fn matches(
        &self,
        dep: &DependencyDeclaration,
        index: &BuildFileIndex,
        plan: &MigrationPlan,
    ) -> Vec<NodeId> {
        let doc = index.document();
        open_nodes(index, plan, self.class())
            .filter(|&(id, _)| {
                doc.children(id)
                    .any(|child| doc.text_content(child).contains(dep.id.as_str()))
            })
            .map(|(id, _)| id)
            .collect()
    }
}

/// `<Error Condition="!Exists('..\packages\Id.1.0\build\Id.targets')" />`.
struct MissingImportErrorRule;

impl RemovalRule for MissingImportErrorRule {
    fn describe(&self) -> &'static str {
        "removing <Error /> elements"
    }

    fn class(&self) -> NodeClass {
        NodeClass::ConditionalError
    }

    fn matches(
        &self,
        dep: &DependencyDeclaration,
        index: &BuildFileIndex,
        plan: &MigrationPlan,
    ) -> Vec<NodeId> {
        open_nodes(index, plan, self.class())
            .filter(|(_, condition)| condition.contains(dep.id.as_str()))
            .map(|(id, _)| id)
            .collect()
    }
}

/// `<Import Project="..\packages\Id.1.0\build\Id.targets" />`.
struct PackageImportRule;

impl RemovalRule for PackageImportRule {
    fn describe(&self) -> &'static str {
        "removing <Import Project /> elements"
    }

    fn class(&self) -> NodeClass {
        NodeClass::Import
    }

    fn matches(
        &self,
        dep: &DependencyDeclaration,
        index: &BuildFileIndex,
        plan: &MigrationPlan,
    ) -> Vec<NodeId> {
        open_nodes(index, plan, self.class())
            .filter(|(_, project)| project.contains(dep.id.as_str()))
            .map(|(id, _)| id)
            .collect()
    }
}
