use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;
use url::Url;
use crate::error::PapertrailError;

const USER_AGENT: &str = "Papertrail/0.1 (research)";

/// Catalog and model hosts every Papertrail client may reach.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "api.semanticscholar.org", // Catalog A
    "export.arxiv.org",        // Catalog B
    "arxiv.org",               // arXiv landing pages and PDFs
    "scholar.google.com",      // Catalog C
    "localhost",               // Ollama local
    "127.0.0.1",               // Localhost alt
];

/// A capped HTTP client that only allows requests to approved domains.
///
/// Document downloads follow links to arbitrary publisher hosts, so
/// [`SandboxClient::open`] builds a client that only enforces the scheme.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    /// `None` means any http(s) host is allowed.
    allowlist: Option<HashSet<String>>,
}

impl SandboxClient {
    /// Creates a client restricted to the default catalog allowlist.
    pub fn new(timeout: Duration) -> Result<Self, PapertrailError> {
        let allowlist = DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect();
        Ok(Self { client: build_client(timeout)?, allowlist: Some(allowlist) })
    }

    /// Creates a client that may reach any http(s) host.
    pub fn open(timeout: Duration) -> Result<Self, PapertrailError> {
        Ok(Self { client: build_client(timeout)?, allowlist: None })
    }

    /// Appends an exact hostname to the allowlist. No-op for open clients.
    pub fn allow_domain(&mut self, domain: &str) {
        if let Some(allowlist) = self.allowlist.as_mut() {
            allowlist.insert(domain.to_string());
        }
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else { return false };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str() else { return false };
        match &self.allowlist {
            None => true,
            Some(allowlist) => allowlist
                .iter()
                .any(|allowed| host == allowed || host.ends_with(&format!(".{allowed}"))),
        }
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, PapertrailError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, PapertrailError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), PapertrailError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            warn!(url, "Blocked request outside the sandbox allowlist");
            Err(PapertrailError::Security(format!("domain not in allowlist for URL {url}")))
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client, PapertrailError> {
    Ok(ClientBuilder::new().timeout(timeout).user_agent(USER_AGENT).build()?)
}
