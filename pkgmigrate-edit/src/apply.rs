use crate::error::ApplyError;
use pkgmigrate_domain::{
    Anchor, BuildDocument, BuildFileIndex, DeclarationBlock, MigrationPlan, NodeClass,
};
use pkgmigrate_types::MSBUILD_NAMESPACE;
use pkgmigrate_types::outcome::RemovalCounts;
use quick_xml::escape::escape;
use std::ops::Range;
use tracing::debug;

const DEFAULT_INDENT: &str = "  ";

/// Result of applying a plan in memory.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub text: String,
    pub removed: RemovalCounts,
    pub inserted: usize,
}

/// Apply `plan` to the document behind `index` and serialize the result.
///
/// Marked nodes are detached first, then the manifest's `<None>` entry, then the
/// `EnsureNuGetPackageBuildImports` target if no `Error` survives inside it. The text is produced
/// once, after every edit is settled.
pub fn apply_plan(
    index: &mut BuildFileIndex,
    plan: &MigrationPlan,
) -> Result<AppliedMigration, ApplyError> {
    let actual = index.document().len();
    if plan.node_count != actual {
        return Err(ApplyError::PlanMismatch {
            expected: plan.node_count,
            actual,
        });
    }

    let mut removed = RemovalCounts::default();
    for (&id, &class) in &plan.removals {
        let doc = index.document_mut();
        if doc.is_attached(id) && doc.detach(id) {
            match class {
                NodeClass::LegacyReference => removed.references += 1,
                NodeClass::ConditionalError => removed.errors += 1,
                NodeClass::Import => removed.imports += 1,
                NodeClass::NoneInclude => removed.none_include = true,
                NodeClass::EnsureImportsTarget => removed.ensure_imports_target = true,
            }
        }
    }

    if let Some(id) = index.none_include() {
        debug!("removing <None Include=\"packages.config\" />");
        index.document_mut().detach(id);
        removed.none_include = true;
    }

    if let Some(target) = index.ensure_imports_target() {
        let remaining = index.errors_within(target);
        if remaining == 0 {
            debug!("removing empty <Target Name=\"EnsureNuGetPackageBuildImports\" />");
            index.document_mut().detach(target);
            removed.ensure_imports_target = true;
        } else {
            debug!(remaining, "keeping EnsureNuGetPackageBuildImports target");
        }
    }

    if !plan.insertion.is_empty() {
        debug!(count = plan.insertion.len(), "adding <PackageReference /> elements");
    }
    let text = render(index.document(), plan);

    Ok(AppliedMigration {
        text,
        removed,
        inserted: plan.insertion.len(),
    })
}

struct Edit {
    range: Range<usize>,
    text: String,
}

fn render(doc: &BuildDocument, plan: &MigrationPlan) -> String {
    let src = doc.source();
    let nl = if src.contains("\r\n") { "\r\n" } else { "\n" };

    let mut edits: Vec<Edit> = merged_spans(src, doc)
        .into_iter()
        .map(|span| Edit {
            range: removal_range(src, span),
            text: String::new(),
        })
        .collect();

    if !plan.insertion.is_empty() {
        let xmlns = declared_namespace(doc);
        match plan.anchor {
            Anchor::After(id) => {
                let span = doc.element(id).span();
                let indent = line_indent(src, span.start);
                let unit = if indent.is_empty() { DEFAULT_INDENT } else { indent };
                let block = render_block(&plan.insertion, indent, unit, nl, xmlns);

                // A removed anchor that took its whole line gives that line to the block.
                match edits.iter_mut().find(|e| e.range.start <= span.start && span.end < e.range.end) {
                    Some(edit) => edit.text = format!("{block}{nl}"),
                    None => edits.push(Edit {
                        range: span.end..span.end,
                        text: format!("{nl}{block}"),
                    }),
                }
            }
            Anchor::IntoRoot => {
                let root = doc.element(doc.root());
                let outer = line_indent(src, root.span().start);
                let indent = format!("{outer}{DEFAULT_INDENT}");
                let block = render_block(&plan.insertion, &indent, DEFAULT_INDENT, nl, xmlns);
                if root.is_self_closing() {
                    let span = root.span();
                    let head = src[span.clone()]
                        .trim_end_matches('>')
                        .trim_end_matches('/')
                        .trim_end();
                    edits.push(Edit {
                        range: span,
                        text: format!("{head}>{nl}{block}{nl}{outer}</{}>", root.name()),
                    });
                } else {
                    let inner = root.inner();
                    let edit = if is_blank(&src[inner.clone()]) {
                        Edit {
                            range: inner,
                            text: format!("{nl}{block}{nl}{outer}"),
                        }
                    } else {
                        Edit {
                            range: inner.start..inner.start,
                            text: format!("{nl}{block}"),
                        }
                    };
                    edits.push(edit);
                }
            }
        }
    }

    edits.sort_by_key(|e| (e.range.start, e.range.end));
    splice(src, &edits)
}

fn splice(src: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(src.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            continue;
        }
        out.push_str(&src[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&src[cursor..]);
    out
}

/// Spans of the detached subtrees, with neighbours separated only by spaces or tabs joined.
fn merged_spans(src: &str, doc: &BuildDocument) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = Vec::new();
    for id in doc.detached_roots() {
        let span = doc.element(id).span();
        match spans.last_mut() {
            Some(prev) if is_inline_gap(&src[prev.end..span.start]) => prev.end = span.end,
            _ => spans.push(span),
        }
    }
    spans
}

fn is_inline_gap(s: &str) -> bool {
    s.chars().all(|c| c == ' ' || c == '\t')
}

/// `span`, widened to its whole line when nothing else shares that line.
fn removal_range(src: &str, span: Range<usize>) -> Range<usize> {
    let line_start = src[..span.start].rfind('\n').map_or(0, |i| i + 1);
    if !is_blank(&src[line_start..span.start]) {
        return span;
    }
    match src[span.end..].find('\n') {
        Some(i) if is_blank(&src[span.end..span.end + i]) => line_start..span.end + i + 1,
        _ => span,
    }
}

/// Leading whitespace of the line `pos` sits on, or "" if `pos` is not first on its line.
fn line_indent(src: &str, pos: usize) -> &str {
    let line_start = src[..pos].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &src[line_start..pos];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    }
}

fn is_blank(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

/// `Some(ns)` when the block has to declare the MSBuild namespace itself.
fn declared_namespace(doc: &BuildDocument) -> Option<&'static str> {
    match doc.element(doc.root()).attribute("xmlns") {
        Some(ns) if ns == MSBUILD_NAMESPACE => None,
        _ => Some(MSBUILD_NAMESPACE),
    }
}

fn render_block(
    block: &DeclarationBlock,
    indent: &str,
    unit: &str,
    nl: &str,
    xmlns: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(indent);
    match xmlns {
        Some(ns) => out.push_str(&format!("<ItemGroup xmlns=\"{ns}\">")),
        None => out.push_str("<ItemGroup>"),
    }
    for d in &block.declarations {
        out.push_str(nl);
        out.push_str(indent);
        out.push_str(unit);
        out.push_str(&format!(
            "<PackageReference Include=\"{}\" Version=\"{}\" />",
            escape(d.id.as_str()),
            escape(d.version.as_str())
        ));
    }
    out.push_str(nl);
    out.push_str(indent);
    out.push_str("</ItemGroup>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_range_takes_whole_line_when_alone() {
        let src = "<a>\n  <b />\n</a>";
        let start = src.find("<b").expect("b");
        let range = removal_range(src, start..start + 5);
        assert_eq!(&src[range], "  <b />\n");
    }

    #[test]
    fn removal_range_keeps_neighbours_on_shared_line() {
        let src = "<a><b /><c /></a>";
        let range = removal_range(src, 3..8);
        assert_eq!(&src[range], "<b />");
    }

    #[test]
    fn detached_neighbours_on_one_line_are_merged() {
        let src = "<a>\n  <b /> <c />\n  <d />\n</a>";
        let mut doc = BuildDocument::parse(src).expect("parse");
        let kids: Vec<_> = doc.children(doc.root()).collect();
        doc.detach(kids[0]);
        doc.detach(kids[1]);
        let spans = merged_spans(src, &doc);
        assert_eq!(spans.len(), 1);
        assert_eq!(&src[spans[0].clone()], "<b /> <c />");
        assert_eq!(&src[removal_range(src, spans[0].clone())], "  <b /> <c />\n");
    }

    #[test]
    fn removal_range_handles_crlf() {
        let src = "<a>\r\n  <b />\r\n</a>";
        let start = src.find("<b").expect("b");
        let range = removal_range(src, start..start + 5);
        assert_eq!(&src[range], "  <b />\r\n");
    }

    #[test]
    fn line_indent_ignores_inline_positions() {
        let src = "<a>\n\t<b /><c />";
        assert_eq!(line_indent(src, src.find("<b").expect("b")), "\t");
        assert_eq!(line_indent(src, src.find("<c").expect("c")), "");
    }
}
