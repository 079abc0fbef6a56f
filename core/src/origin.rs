//! Same-origin decisions gating XSRF header injection.

use url::Url;

/// Decides whether a request URL shares the page's origin.
pub trait OriginCheck: Send + Sync {
    fn is_same_origin(&self, url: &str) -> bool;
}

/// Origin of the page issuing requests.
///
/// Request URLs are resolved against the page URL, so relative URLs are
/// same-origin. Scheme, host and port (with scheme defaults) must match.
#[derive(Debug, Clone)]
pub struct PageOrigin {
    page: Url,
}

impl PageOrigin {
    pub fn parse(page_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            page: Url::parse(page_url)?,
        })
    }
}

impl OriginCheck for PageOrigin {
    fn is_same_origin(&self, url: &str) -> bool {
        let Ok(target) = self.page.join(url) else {
            return false;
        };
        target.scheme() == self.page.scheme()
            && target.host_str() == self.page.host_str()
            && target.port_or_known_default() == self.page.port_or_known_default()
    }
}

/// No page origin: every request is cross-origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossOrigin;

impl OriginCheck for CrossOrigin {
    fn is_same_origin(&self, _url: &str) -> bool {
        false
    }
}
