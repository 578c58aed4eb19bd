//! Property tests: the declaration block mirrors the manifest.

use pkgmigrate_domain::{BuildFileIndex, MigrationPlanner};
use pkgmigrate_types::DependencyDeclaration;
use proptest::prelude::*;

const PROJECT: &str = r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <ItemGroup>
    <Reference Include="Pkg0"><HintPath>..\packages\Pkg0.1.0\lib\Pkg0.dll</HintPath></Reference>
    <Reference Include="System" />
  </ItemGroup>
</Project>"#;

fn declarations() -> impl Strategy<Value = Vec<DependencyDeclaration>> {
    prop::collection::vec(
        ("[A-Z][a-z]{1,6}(\\.[A-Z][a-z]{1,6})?", "[0-9]\\.[0-9]{1,2}\\.[0-9]"),
        0..20,
    )
    .prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(id, version)| DependencyDeclaration::new(id, version))
            .collect()
    })
}

proptest! {
    #[test]
    fn block_has_one_entry_per_declaration_in_order(decls in declarations()) {
        let index = BuildFileIndex::parse(PROJECT).expect("parse");
        let plan = MigrationPlanner::new().plan(&decls, &index);
        prop_assert_eq!(&plan.insertion.declarations, &decls);
    }

    #[test]
    fn removals_never_exceed_legacy_nodes(decls in declarations()) {
        let index = BuildFileIndex::parse(PROJECT).expect("parse");
        let plan = MigrationPlanner::new().plan(&decls, &index);
        prop_assert!(plan.removals.len() <= 2);
    }
}
