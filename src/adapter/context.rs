//! Per-request routing context

use crate::document::{Content, Properties, PropertyValue};

/// One routing request from the reconciliation engine
///
/// Borrows the subject mutably so that route back-references can be
/// recorded on it. Lives for a single adapter call.
pub struct UriContext<'a> {
    subject: &'a mut dyn Content,
    uri: String,
    locale: Option<String>,
    defaults: Properties,
}

impl<'a> UriContext<'a> {
    pub fn new(subject: &'a mut dyn Content, uri: impl Into<String>) -> Self {
        Self {
            subject,
            uri: uri.into(),
            locale: None,
            defaults: Properties::new(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Add a default to copy onto the created route
    pub fn with_default(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    pub fn subject(&self) -> &dyn Content {
        &*self.subject
    }

    pub fn subject_mut(&mut self) -> &mut (dyn Content + 'a) {
        &mut *self.subject
    }

    /// Candidate URI, segments joined by `/`
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn defaults(&self) -> &Properties {
        &self.defaults
    }
}

impl std::fmt::Debug for UriContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriContext")
            .field("subject", self.subject.content_id())
            .field("uri", &self.uri)
            .field("locale", &self.locale)
            .field("defaults", &self.defaults)
            .finish()
    }
}
