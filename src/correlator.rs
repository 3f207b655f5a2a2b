// Request/response correlation for Reflector
//
// Runs the decoder over every parameter of a captured entry and, in reflect
// mode, keeps only the leaves that show up verbatim in the response body.
//
// Responsibilities:
// - Collect leaves from query params, form params and the raw request body
// - Strip the query string from the request URL for reporting
// - Restrict entries to an allow-list of request hosts
// - Match leaves against the decoded response body
//
// Used by: main.rs for both dump and reflect modes

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, trace};
use url::Url;

use crate::decoder::Decoder;
use crate::errors::ArchiveError;
use crate::models::{CapturedEntry, KeyPath, Leaf, ParamSource, ResponseBody};

/// Allow-list of request hosts; empty allows every host
#[derive(Debug, Clone, Default)]
pub struct HostFilter {
    hosts: HashSet<String>,
}

impl HostFilter {
    /// Build from host lists, each of which may hold several space-separated names
    pub fn new<S: AsRef<str>>(lists: &[S]) -> Self {
        let hosts = lists
            .iter()
            .flat_map(|list| list.as_ref().split_whitespace())
            .map(normalize_host)
            .filter(|h| !h.is_empty())
            .collect();
        Self { hosts }
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn allows(&self, url: &Url) -> bool {
        if self.hosts.is_empty() {
            return true;
        }
        url.host_str()
            .map(|host| self.hosts.contains(&normalize_host(host)))
            .unwrap_or(false)
    }
}

fn normalize_host(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Leaves reflected in one entry's response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reflection {
    pub method: String,
    pub url: String,
    pub xss: Vec<Leaf>,
}

/// Every leaf of one entry, for dump mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRecord {
    /// `METHOD url-without-query`
    pub request: String,
    pub leaves: Vec<Leaf>,
}

pub struct Correlator {
    pub decoder: Decoder,
    pub hosts: HostFilter,
    /// Source name used in errors and diagnostics
    pub source_name: String,
}

impl Correlator {
    pub fn new(decoder: Decoder, hosts: HostFilter, source_name: impl Into<String>) -> Self {
        Self {
            decoder,
            hosts,
            source_name: source_name.into(),
        }
    }

    /// Union of all leaves from query params, form params and the raw body.
    /// Duplicate (path, value) pairs are kept once, first occurrence wins.
    pub fn collect_leaves(&self, entry: &CapturedEntry) -> Vec<Leaf> {
        let query = entry.query.iter().flat_map(|p| {
            let path = KeyPath::param(ParamSource::Query, &p.name);
            self.decoder.leaves(path, p.value.as_str())
        });
        let form = entry.form.iter().flat_map(|p| {
            let path = KeyPath::param(ParamSource::Form, &p.name);
            self.decoder.leaves(path, p.value.as_str())
        });
        let body = self
            .decoder
            .leaves(KeyPath::root(ParamSource::Body), entry.body_text.as_str());

        let mut seen = HashSet::new();
        query
            .chain(form)
            .chain(body)
            .filter(|leaf| seen.insert(leaf.clone()))
            .collect()
    }

    fn parse_url(&self, entry: &CapturedEntry) -> Result<Url, ArchiveError> {
        Url::parse(&entry.url).map_err(|error| ArchiveError::InvalidUrl {
            source_name: self.source_name.clone(),
            url: entry.url.clone(),
            error,
        })
    }

    /// Request URL with its query string removed
    pub fn stripped_url(&self, entry: &CapturedEntry) -> Result<String, ArchiveError> {
        let mut url = self.parse_url(entry)?;
        url.set_query(None);
        Ok(url.to_string())
    }

    /// `METHOD url-without-query`
    pub fn request_line(&self, entry: &CapturedEntry) -> Result<String, ArchiveError> {
        Ok(format!("{} {}", entry.method, self.stripped_url(entry)?))
    }

    pub fn dump(&self, entry: &CapturedEntry) -> Result<DumpRecord, ArchiveError> {
        let request = self.request_line(entry)?;
        let leaves = self.collect_leaves(entry);
        trace!(request = %request, leaves = leaves.len(), "dumped entry");
        Ok(DumpRecord { request, leaves })
    }

    pub fn dump_all(&self, entries: &[CapturedEntry]) -> Result<Vec<DumpRecord>, ArchiveError> {
        entries.iter().map(|entry| self.dump(entry)).collect()
    }

    /// Reflected leaves for one entry, or `None` when its host is filtered out
    pub fn reflect(&self, entry: &CapturedEntry) -> Result<Option<Reflection>, ArchiveError> {
        let mut url = self.parse_url(entry)?;
        if !self.hosts.allows(&url) {
            debug!(url = %entry.url, "host not in allow-list, skipping");
            return Ok(None);
        }
        url.set_query(None);

        let xss = match &entry.response_body {
            Some(body) => reflected_leaves(self.collect_leaves(entry), body),
            None => Vec::new(),
        };
        if !xss.is_empty() {
            debug!(method = %entry.method, url = %url, count = xss.len(), "reflected values found");
        }

        Ok(Some(Reflection {
            method: entry.method.clone(),
            url: url.to_string(),
            xss,
        }))
    }

    pub fn reflect_all(&self, entries: &[CapturedEntry]) -> Result<Vec<Reflection>, ArchiveError> {
        let mut results = Vec::new();
        for entry in entries {
            if let Some(reflection) = self.reflect(entry)? {
                results.push(reflection);
            }
        }
        Ok(results)
    }
}

/// Leaves whose exact bytes occur in `body`. Empty values never match.
pub fn reflected_leaves(leaves: Vec<Leaf>, body: &ResponseBody) -> Vec<Leaf> {
    leaves
        .into_iter()
        .filter(|leaf| body.contains(leaf.needle()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::TextFilter;
    use crate::models::Param;

    fn correlator(hosts: &[&str]) -> Correlator {
        Correlator::new(Decoder::new(TextFilter::Lossy), HostFilter::new(hosts), "test")
    }

    #[test]
    fn host_filter_splits_on_whitespace() {
        let filter = HostFilter::new(&["example.com  api.example.com", "Other.TEST."]);
        assert!(filter.allows(&Url::parse("https://api.example.com/x").unwrap()));
        assert!(filter.allows(&Url::parse("http://other.test:8080/").unwrap()));
        assert!(!filter.allows(&Url::parse("https://evil.com/").unwrap()));
    }

    #[test]
    fn empty_host_filter_allows_all() {
        let filter = HostFilter::new::<&str>(&[]);
        assert!(filter.is_empty());
        assert!(filter.allows(&Url::parse("https://anything.test/").unwrap()));
    }

    #[test]
    fn empty_values_never_reflected() {
        let leaves = vec![
            Leaf::new(KeyPath::param(ParamSource::Query, "a"), ""),
            Leaf::new(KeyPath::param(ParamSource::Query, "b"), "hit"),
        ];
        let reflected = reflected_leaves(leaves, &ResponseBody::new("a hit here"));
        assert_eq!(reflected.len(), 1);
        assert_eq!(reflected[0].value, "hit");
    }

    #[test]
    fn matching_is_case_sensitive() {
        let leaves = vec![Leaf::new(KeyPath::param(ParamSource::Query, "a"), "Hit")];
        assert!(reflected_leaves(leaves, &ResponseBody::new("a hit here")).is_empty());
    }

    #[test]
    fn stripped_url_drops_query_only() {
        let entry = CapturedEntry::new("GET", "https://example.com/p?x=1#frag");
        assert_eq!(correlator(&[]).stripped_url(&entry).unwrap(), "https://example.com/p#frag");
    }

    #[test]
    fn invalid_url_is_fatal() {
        let entry = CapturedEntry::new("GET", "not a url");
        let err = correlator(&[]).reflect(&entry).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidUrl { .. }));
    }

    #[test]
    fn collect_leaves_covers_all_sources_once() {
        let mut entry = CapturedEntry::new("POST", "https://example.com/");
        entry.query.push(Param::new("q", "same value"));
        entry.query.push(Param::new("q", "same value"));
        entry.form.push(Param::new("f", "v"));
        entry.body_text = "f=v".to_string();

        let leaves = correlator(&[]).collect_leaves(&entry);
        assert_eq!(
            leaves,
            vec![
                Leaf::new(KeyPath::param(ParamSource::Query, "q"), "same value"),
                Leaf::new(KeyPath::param(ParamSource::Form, "f"), "v"),
                Leaf::new(KeyPath::root(ParamSource::Body), "f=v"),
            ]
        );
    }

    #[test]
    fn filtered_host_produces_no_result() {
        let mut entry = CapturedEntry::new("GET", "https://other.com/?q=x");
        entry.query.push(Param::new("q", "x"));
        entry.response_body = Some(ResponseBody::new("x"));
        assert_eq!(correlator(&["example.com"]).reflect(&entry).unwrap(), None);
    }
}
