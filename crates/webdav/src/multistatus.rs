//! PROPFIND `207 Multi-Status` parsing.

use chrono::{DateTime, Utc};

use crate::Error;

/// One `<d:response>` of a multistatus body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavEntry {
    /// Percent-encoded href as returned by the server.
    pub href: String,
    pub oc_id: String,
    pub file_id: String,
    /// ETag without surrounding quotes.
    pub etag: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_collection: bool,
}

/// Parses a multistatus document into its entries.
///
/// Only properties inside a `200` propstat are read.
pub fn parse_multistatus(xml: &str) -> Result<Vec<DavEntry>, Error> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| Error::Xml(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "multistatus" {
        return Err(Error::Xml(format!(
            "expected multistatus, found {}",
            root.tag_name().name()
        )));
    }

    let entries = root
        .children()
        .filter(|n| n.tag_name().name() == "response")
        .map(parse_response)
        .collect();
    Ok(entries)
}

fn parse_response(response: roxmltree::Node) -> DavEntry {
    let mut entry = DavEntry {
        href: child_text(&response, "href").unwrap_or_default(),
        ..Default::default()
    };

    for propstat in response
        .children()
        .filter(|n| n.tag_name().name() == "propstat")
    {
        let ok = child_text(&propstat, "status").is_some_and(|s| s.contains(" 200 "));
        if !ok {
            continue;
        }
        let Some(prop) = propstat.children().find(|n| n.tag_name().name() == "prop") else {
            continue;
        };
        for p in prop.children().filter(|n| n.is_element()) {
            let text = p.text().unwrap_or_default().trim();
            match p.tag_name().name() {
                "id" => entry.oc_id = text.to_owned(),
                "fileid" => entry.file_id = text.to_owned(),
                "getetag" => entry.etag = text.trim_matches('"').to_owned(),
                "getcontentlength" => entry.size = text.parse().unwrap_or(0),
                "getlastmodified" => {
                    entry.last_modified = DateTime::parse_from_rfc2822(text)
                        .ok()
                        .map(|d| d.with_timezone(&Utc));
                }
                "resourcetype" => {
                    entry.is_collection = p
                        .children()
                        .any(|c| c.tag_name().name() == "collection");
                }
                _ => {}
            }
        }
    }
    entry
}

fn child_text(node: &roxmltree::Node, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_owned())
}
