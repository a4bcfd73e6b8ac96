//! Decoding of OCS share-creation responses.
//!
//! The server answers a share request with an XML document such as
//!
//! ```xml
//! <ocs>
//!   <meta><status>ok</status><statuscode>200</statuscode><message>OK</message></meta>
//!   <data><id>7</id><url>https://cloud.example/s/abc123</url></data>
//! </ocs>
//! ```
//!
//! or, on failure, a `<status>failure</status>` with a `<message>`. Bodies that
//! do not look like XML at all are reported as a failed share, not an error.

use roxmltree::{Document, Node};

use crate::contract::ShareResult;
use crate::error::{SyncError, SyncResult};

/// Prefix of the failure message for bodies that are not XML.
pub const NOT_XML_PREFIX: &str = "Response is not in XML\n Response: ";

const FAILURE_STATUS: &str = "failure";

/// Typed view of a share response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OcsShareResponse {
    /// Text of every `<status>` element, in document order.
    pub statuses: Vec<String>,
    /// Text of the single `<message>` element, present when a status failed.
    pub failure_message: Option<String>,
    /// Text of `<data><url>`, present when no status failed.
    pub url: Option<String>,
}

impl OcsShareResponse {
    /// Parses an XML document. Exactly one `<message>` is required when a
    /// status reads `failure`; otherwise exactly one `<data>` with a `<url>`
    /// child is required. Anything else is [`SyncError::MalformedResponse`].
    pub fn parse(xml: &str) -> SyncResult<Self> {
        let document = Document::parse(xml)?;
        let root = document.root_element();

        let statuses: Vec<String> = descendants_named(root, "status")
            .map(element_text)
            .collect();

        if statuses.iter().any(|status| status == FAILURE_STATUS) {
            let message = single_descendant(root, "message")?;
            return Ok(OcsShareResponse {
                statuses,
                failure_message: Some(element_text(message)),
                url: None,
            });
        }

        let data = single_descendant(root, "data")?;
        let url = data
            .children()
            .find(|child| child.is_element() && child.has_tag_name("url"))
            .ok_or_else(|| {
                SyncError::MalformedResponse("<data> element has no <url> child".to_string())
            })?;

        Ok(OcsShareResponse {
            statuses,
            failure_message: None,
            url: Some(element_text(url)),
        })
    }

    pub fn is_failure(&self) -> bool {
        self.statuses.iter().any(|status| status == FAILURE_STATUS)
    }

    pub fn into_share_result(self) -> SyncResult<ShareResult> {
        match (self.failure_message, self.url) {
            (Some(message), _) => Ok(ShareResult::fail(message)),
            (None, Some(url)) => Ok(ShareResult::success(url)),
            (None, None) => Err(SyncError::MalformedResponse(
                "response carries neither a failure message nor a url".to_string(),
            )),
        }
    }
}

/// Turns a raw share response body into a [`ShareResult`].
pub fn decode_share_response(body: &str) -> SyncResult<ShareResult> {
    let trimmed = body.trim();
    if !(trimmed.starts_with('<') && trimmed.ends_with('>')) {
        return Ok(ShareResult::fail(format!("{NOT_XML_PREFIX}{body}")));
    }
    OcsShareResponse::parse(trimmed)?.into_share_result()
}

fn descendants_named<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    root.descendants()
        .skip(1)
        .filter(move |node| node.is_element() && node.has_tag_name(name))
}

fn single_descendant<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    name: &'a str,
) -> SyncResult<Node<'a, 'input>> {
    let mut matches = descendants_named(root, name);
    match (matches.next(), matches.next()) {
        (Some(node), None) => Ok(node),
        (None, _) => Err(SyncError::MalformedResponse(format!(
            "expected one <{name}> element, found none"
        ))),
        (Some(_), Some(_)) => Err(SyncError::MalformedResponse(format!(
            "expected one <{name}> element, found several"
        ))),
    }
}

// Concatenated text of all descendant text nodes.
fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
