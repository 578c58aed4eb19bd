use pkgmigrate_types::DependencyDeclaration;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("malformed manifest at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("manifest entry #{index} ({element}) is missing the `{attribute}` attribute")]
    MissingAttribute {
        index: usize,
        element: String,
        attribute: &'static str,
    },
}

/// Parse manifest text into declarations, in document order.
pub fn parse_manifest(text: &str) -> Result<Vec<DependencyDeclaration>, ManifestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut out = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| ManifestError::Malformed {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => {
                if depth == 0 {
                    claim_root(&mut seen_root, reader.buffer_position() as u64)?;
                } else if depth == 1 {
                    out.push(read_entry(&e, out.len())?);
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    claim_root(&mut seen_root, reader.buffer_position() as u64)?;
                } else if depth == 1 {
                    out.push(read_entry(&e, out.len())?);
                }
            }
            Event::End(_) => {
                depth = depth.checked_sub(1).ok_or_else(|| ManifestError::Malformed {
                    position: reader.buffer_position() as u64,
                    message: "unexpected closing tag".to_string(),
                })?;
            }
            Event::Text(t) if depth == 0 && !t.iter().all(u8::is_ascii_whitespace) => {
                return Err(ManifestError::Malformed {
                    position: reader.buffer_position() as u64,
                    message: "text outside the root element".to_string(),
                });
            }
            Event::CData(_) if depth == 0 => {
                return Err(ManifestError::Malformed {
                    position: reader.buffer_position() as u64,
                    message: "CDATA outside the root element".to_string(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ManifestError::Malformed {
            position: text.len() as u64,
            message: format!("{depth} element(s) left unclosed"),
        });
    }
    if !seen_root {
        return Err(ManifestError::Malformed {
            position: 0,
            message: "no root element".to_string(),
        });
    }

    debug!(count = out.len(), "parsed manifest entries");
    Ok(out)
}

fn claim_root(seen_root: &mut bool, position: u64) -> Result<(), ManifestError> {
    if *seen_root {
        return Err(ManifestError::Malformed {
            position,
            message: "more than one root element".to_string(),
        });
    }
    *seen_root = true;
    Ok(())
}

fn read_entry(e: &BytesStart<'_>, index: usize) -> Result<DependencyDeclaration, ManifestError> {
    let element = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut id = None;
    let mut version = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| ManifestError::Malformed {
            position: 0,
            message: format!("entry #{index}: {err}"),
        })?;
        let value = attr
            .unescape_value()
            .map_err(|err| ManifestError::Malformed {
                position: 0,
                message: format!("entry #{index}: {err}"),
            })?
            .into_owned();
        match attr.key.as_ref() {
            b"id" => id = Some(value),
            b"version" => version = Some(value),
            _ => {}
        }
    }

    let id = id.ok_or_else(|| ManifestError::MissingAttribute {
        index,
        element: element.clone(),
        attribute: "id",
    })?;
    let version = version.ok_or(ManifestError::MissingAttribute {
        index,
        element,
        attribute: "version",
    })?;

    Ok(DependencyDeclaration { id, version })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_elements_below_entries_are_ignored() {
        let decls = parse_manifest(
            r#"<packages><package id="A" version="1.0"><meta id="x" /></package></packages>"#,
        )
        .expect("parse");
        assert_eq!(decls, vec![DependencyDeclaration::new("A", "1.0")]);
    }

    #[test]
    fn escaped_attribute_values_are_decoded() {
        let decls =
            parse_manifest(r#"<packages><package id="A&amp;B" version="1.0" /></packages>"#)
                .expect("parse");
        assert_eq!(decls[0].id, "A&B");
    }
}
