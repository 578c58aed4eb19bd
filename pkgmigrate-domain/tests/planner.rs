//! Planner behaviour against realistic legacy project files.

use pkgmigrate_domain::{BuildFileIndex, MigrationPlanner, NodeClass, PlanWarning};
use pkgmigrate_manifest::{DependencyDeclaration, parse_manifest};
use pretty_assertions::assert_eq;

const PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0" DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <Import Project="..\packages\NUnit.3.13.2\build\NUnit.props" Condition="Exists('..\packages\NUnit.3.13.2\build\NUnit.props')" />
  <PropertyGroup>
    <OutputType>Library</OutputType>
  </PropertyGroup>
  <ItemGroup>
    <Reference Include="Newtonsoft.Json, Version=12.0.0.0, Culture=neutral, PublicKeyToken=30ad4fe6b2a6aeed, processorArchitecture=MSIL">
      <HintPath>..\packages\Newtonsoft.Json.12.0.3\lib\net45\Newtonsoft.Json.dll</HintPath>
    </Reference>
    <Reference Include="SomeOtherLib">
      <HintPath>..\packages\Castle.Core.4.4.1\lib\net45\Castle.Core.dll</HintPath>
    </Reference>
    <Reference Include="nunit.framework">
      <HintPath>..\packages\NUnit.3.13.2\lib\net45\nunit.framework.dll</HintPath>
    </Reference>
    <Reference Include="System" />
    <Reference Include="System.Xml" />
  </ItemGroup>
  <ItemGroup>
    <None Include="packages.config" />
  </ItemGroup>
  <Import Project="$(MSBuildToolsPath)\Microsoft.CSharp.targets" />
  <Target Name="EnsureNuGetPackageBuildImports" BeforeTargets="PrepareForBuild">
    <PropertyGroup>
      <ErrorText>This project references NuGet package(s) that are missing on this computer.</ErrorText>
    </PropertyGroup>
    <Error Condition="!Exists('..\packages\NUnit.3.13.2\build\NUnit.props')" Text="$([System.String]::Format('$(ErrorText)', '..\packages\NUnit.3.13.2\build\NUnit.props'))" />
  </Target>
</Project>
"#;

const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<packages>
  <package id="Newtonsoft.Json" version="12.0.3" targetFramework="net472" />
  <package id="Castle.Core" version="4.4.1" targetFramework="net472" />
  <package id="NUnit" version="3.13.2" targetFramework="net472" />
</packages>
"#;

fn include_of(index: &BuildFileIndex, id: pkgmigrate_domain::NodeId) -> String {
    index
        .document()
        .element(id)
        .attribute("Include")
        .unwrap_or_default()
        .to_string()
}

fn removed_includes(index: &BuildFileIndex, plan: &pkgmigrate_domain::MigrationPlan) -> Vec<String> {
    plan.removals
        .iter()
        .filter(|(_, class)| **class == NodeClass::LegacyReference)
        .map(|(id, _)| include_of(index, *id))
        .collect()
}

#[test]
fn full_project_plan_marks_every_package_node() {
    let decls = parse_manifest(MANIFEST).expect("manifest");
    let index = BuildFileIndex::parse(PROJECT).expect("project");
    let plan = MigrationPlanner::new().plan(&decls, &index);

    assert_eq!(plan.insertion.declarations, decls);
    assert_eq!(
        removed_includes(&index, &plan),
        vec![
            "Newtonsoft.Json, Version=12.0.0.0, Culture=neutral, PublicKeyToken=30ad4fe6b2a6aeed, processorArchitecture=MSIL",
            "SomeOtherLib",
            "nunit.framework",
        ]
    );
    assert_eq!(plan.removal_count(NodeClass::ConditionalError), 1);
    assert_eq!(plan.removal_count(NodeClass::Import), 1);
    assert!(plan.warnings.is_empty());
}

#[test]
fn primary_identity_match_ignores_case() {
    let index = BuildFileIndex::parse(
        r#"<Project><ItemGroup><Reference Include="newtonsoft.json, Version=12.0.0, Culture=neutral" /></ItemGroup></Project>"#,
    )
    .expect("parse");
    let plan = MigrationPlanner::new().plan(
        &[DependencyDeclaration::new("Newtonsoft.Json", "12.0.3")],
        &index,
    );
    assert_eq!(plan.removal_count(NodeClass::LegacyReference), 1);
}

#[test]
fn residual_text_match_catches_hint_paths() {
    let index = BuildFileIndex::parse(
        r#"<Project><ItemGroup><Reference Include="SomeOtherLib"><HintPath>..\packages\Newtonsoft.Json.12.0.3\lib\Newtonsoft.Json.dll</HintPath></Reference></ItemGroup></Project>"#,
    )
    .expect("parse");
    let plan = MigrationPlanner::new().plan(
        &[DependencyDeclaration::new("Newtonsoft.Json", "12.0.3")],
        &index,
    );
    assert_eq!(removed_includes(&index, &plan), vec!["SomeOtherLib"]);
}

#[test]
fn residual_text_match_is_case_sensitive() {
    let index = BuildFileIndex::parse(
        r#"<Project><ItemGroup><Reference Include="Other"><HintPath>newtonsoft.json.dll</HintPath></Reference></ItemGroup></Project>"#,
    )
    .expect("parse");
    let plan = MigrationPlanner::new().plan(
        &[DependencyDeclaration::new("Newtonsoft.Json", "12.0.3")],
        &index,
    );
    assert!(plan.removals.is_empty());
}

#[test]
fn conditional_error_matches_on_condition_substring() {
    let index = BuildFileIndex::parse(
        r#"<Project><Target Name="EnsureNuGetPackageBuildImports"><Error Condition="!Exists('..\packages\Newtonsoft.Json.1.0.0\build\x.targets')" Text="t" /></Target></Project>"#,
    )
    .expect("parse");
    let plan = MigrationPlanner::new().plan(
        &[DependencyDeclaration::new("Newtonsoft.Json", "1.0.0")],
        &index,
    );
    assert_eq!(plan.removal_count(NodeClass::ConditionalError), 1);
}

#[test]
fn dependency_without_legacy_nodes_is_still_declared() {
    let index = BuildFileIndex::parse(
        r#"<Project><ItemGroup><Reference Include="System" /></ItemGroup></Project>"#,
    )
    .expect("parse");
    let plan = MigrationPlanner::new().plan(&[DependencyDeclaration::new("Serilog", "2.10.0")], &index);
    assert!(plan.removals.is_empty());
    assert_eq!(
        plan.insertion.declarations,
        vec![DependencyDeclaration::new("Serilog", "2.10.0")]
    );
}

#[test]
fn substring_ids_match_over_inclusively() {
    let index = BuildFileIndex::parse(
        r#"<Project>
  <ItemGroup>
    <Reference Include="Foo.Bar"><HintPath>..\packages\Foo.Bar.1.0\lib\Foo.Bar.dll</HintPath></Reference>
  </ItemGroup>
  <Import Project="..\packages\Foo.Bar.1.0\build\Foo.Bar.targets" />
</Project>"#,
    )
    .expect("parse");
    // Only `Foo` is declared; the residual and import rules still claim Foo.Bar's nodes.
    let plan = MigrationPlanner::new().plan(&[DependencyDeclaration::new("Foo", "1.0")], &index);
    assert_eq!(plan.removal_count(NodeClass::LegacyReference), 1);
    assert_eq!(plan.removal_count(NodeClass::Import), 1);
}

#[test]
fn a_node_is_marked_once_across_dependencies() {
    let index = BuildFileIndex::parse(
        r#"<Project><ItemGroup><Reference Include="Foo"><HintPath>Foo.Bar.dll</HintPath></Reference></ItemGroup></Project>"#,
    )
    .expect("parse");
    let plan = MigrationPlanner::new().plan(
        &[
            DependencyDeclaration::new("Foo", "1.0"),
            DependencyDeclaration::new("Foo.Bar", "1.0"),
        ],
        &index,
    );
    assert_eq!(plan.removals.len(), 1);
}

#[test]
fn nodes_missing_their_key_attribute_are_skipped_with_a_warning() {
    let index = BuildFileIndex::parse(
        r#"<Project>
  <ItemGroup>
    <Reference><HintPath>..\packages\A.1.0\lib\A.dll</HintPath></Reference>
    <Reference Include="A" />
  </ItemGroup>
  <Import Condition="true" />
  <Target Name="EnsureNuGetPackageBuildImports">
    <Error Text="no condition" />
  </Target>
</Project>"#,
    )
    .expect("parse");
    let plan = MigrationPlanner::new().plan(&[DependencyDeclaration::new("A", "1.0")], &index);

    assert_eq!(plan.removals.len(), 1);
    let lines: Vec<(String, usize)> = plan
        .warnings
        .iter()
        .map(|w| match w {
            PlanWarning::AmbiguousReference { attribute, line, .. } => {
                (attribute.to_string(), *line)
            }
        })
        .collect();
    assert_eq!(
        lines,
        vec![
            ("Include".to_string(), 3),
            ("Project".to_string(), 6),
            ("Condition".to_string(), 8),
        ]
    );
    assert!(plan.warnings[0].to_string().contains("skipped"));
}

#[test]
fn plan_is_computed_against_live_state() {
    let mut index = BuildFileIndex::parse(
        r#"<Project><ItemGroup><Reference Include="A" /></ItemGroup></Project>"#,
    )
    .expect("parse");
    let reference = index.legacy_references().next().expect("reference");
    index.document_mut().detach(reference);

    let plan = MigrationPlanner::new().plan(&[DependencyDeclaration::new("A", "1.0")], &index);
    assert!(plan.removals.is_empty());
}
