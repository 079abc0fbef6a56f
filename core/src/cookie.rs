//! Ambient cookie lookups for XSRF tokens.

use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;

/// Reads a cookie value by name.
pub trait CookieSource: Send + Sync {
    fn read(&self, name: &str) -> Option<String>;
}

/// In-memory cookie store.
///
/// Values are stored as written (percent-encoded, as a browser would keep
/// them) and decoded on read.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<IndexMap<String, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a jar from a `Cookie` header value such as `a=1; b=2`.
    ///
    /// Pairs without `=` are skipped.
    pub fn from_cookie_header(header: &str) -> Self {
        let jar = Self::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    jar.set(name, value.trim());
                }
            }
        }
        jar
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieSource for CookieJar {
    fn read(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let raw = cookies.get(name)?;
        // Undecodable values are returned as stored.
        Some(
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.clone()),
        )
    }
}
