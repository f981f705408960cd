use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{BoundTransport, CredentialRules, TransportSettings};

type BindingKey = (String, Option<String>);

/// Binds remote URIs to credentials and transport settings.
///
/// Binding is idempotent: the same URI and credential reference always
/// yield the same `Arc<BoundTransport>`.
#[derive(Debug)]
pub struct CredentialBinder {
    rules: CredentialRules,
    settings: TransportSettings,
    bound: Mutex<HashMap<BindingKey, Arc<BoundTransport>>>,
}

impl CredentialBinder {
    pub fn new(rules: CredentialRules, settings: TransportSettings) -> Self {
        Self {
            rules,
            settings,
            bound: Mutex::new(HashMap::new()),
        }
    }

    pub fn rules(&self) -> &CredentialRules {
        &self.rules
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// Returns the transport for `uri`, binding it on first use.
    pub fn bind(&self, uri: &str, credential_ref: Option<&str>) -> Arc<BoundTransport> {
        let key = (uri.to_string(), credential_ref.map(str::to_string));
        let mut bound = self.bound.lock();

        Arc::clone(bound.entry(key).or_insert_with(|| {
            let credentials = self.rules.lookup(uri, credential_ref).clone();
            debug!(uri, kind = credentials.kind(), "Binding transport");
            Arc::new(BoundTransport::new(uri, credentials, self.settings.clone()))
        }))
    }

    /// Number of distinct bindings made so far.
    pub fn bound_count(&self) -> usize {
        self.bound.lock().len()
    }
}
