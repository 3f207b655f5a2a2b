// HAR (HTTP Archive) parser for Reflector
// Uses serde to map log.entries[] onto CapturedEntry

use serde::Deserialize;
use tracing::{debug, warn};

use crate::decoder::decode_base64;
use crate::errors::ArchiveError;
use crate::models::{ArchiveParser, CapturedEntry, Param, ResponseBody};

pub struct HarParser;

impl ArchiveParser for HarParser {
    fn parse(&self, source: &str, content: &str) -> Result<Vec<CapturedEntry>, ArchiveError> {
        let har: HarFile = serde_json::from_str(content).map_err(|error| ArchiveError::Schema {
            source_name: source.to_string(),
            error,
        })?;

        debug!(source, entries = har.log.entries.len(), "parsed HAR archive");
        Ok(har
            .log
            .entries
            .into_iter()
            .map(|entry| convert_entry(source, entry))
            .collect())
    }
}

fn convert_entry(source: &str, entry: HarEntry) -> CapturedEntry {
    let request = entry.request;
    let post_data = request.post_data.unwrap_or_default();
    let response_body = entry
        .response
        .and_then(|r| r.content)
        .and_then(|content| decode_response_text(source, &request.url, content));

    CapturedEntry {
        method: request.method,
        url: request.url,
        query: request.query_string.into_iter().map(Param::from).collect(),
        form: post_data.params.into_iter().map(Param::from).collect(),
        body_text: post_data.text,
        response_body,
    }
}

/// Strip the transport encoding from `response.content.text`.
///
/// An explicit `base64` encoding is decoded. With no `encoding` field the text
/// may be either plain or base64, so both readings are kept when it decodes.
/// Any other encoding is taken as-is.
fn decode_response_text(source: &str, url: &str, content: HarContent) -> Option<ResponseBody> {
    let text = content.text?;
    let body = match content.encoding.as_deref() {
        Some("base64") => match decode_base64(&text) {
            Some(bytes) => ResponseBody::new(bytes),
            None => {
                warn!(source, url, "response body marked base64 but failed to decode");
                ResponseBody::new(text)
            }
        },
        None => match decode_base64(&text) {
            Some(bytes) if !bytes.is_empty() => {
                debug!(source, url, "unlabelled body is valid base64, keeping both readings");
                ResponseBody::ambiguous(text, bytes)
            }
            _ => ResponseBody::new(text),
        },
        Some(other) => {
            debug!(source, url, encoding = other, "unknown response encoding, using raw text");
            ResponseBody::new(text)
        }
    };
    Some(body)
}

// HAR file structures

#[derive(Debug, Deserialize)]
struct HarFile {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
    #[serde(default)]
    response: Option<HarResponse>,
}

#[derive(Debug, Deserialize)]
struct HarRequest {
    method: String,
    url: String,
    #[serde(rename = "queryString", default)]
    query_string: Vec<HarNameValue>,
    #[serde(rename = "postData", default)]
    post_data: Option<HarPostData>,
}

#[derive(Debug, Deserialize, Default)]
struct HarPostData {
    #[serde(default)]
    params: Vec<HarNameValue>,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct HarNameValue {
    name: String,
    #[serde(default)]
    value: String,
}

impl From<HarNameValue> for Param {
    fn from(nv: HarNameValue) -> Self {
        Param::new(nv.name, nv.value)
    }
}

#[derive(Debug, Deserialize)]
struct HarResponse {
    #[serde(default)]
    content: Option<HarContent>,
}

#[derive(Debug, Deserialize)]
struct HarContent {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}
