//! Signature store: one live tone signature per brand.
//!
//! # Creation policy
//! First-use creation runs under a per-brand async gate held across the
//! analysis call. Concurrent `get_or_create` calls for the same brand queue
//! on that gate and re-check the map once they hold it, so the analysis
//! collaborator runs at most once per brand and no analysis result is ever
//! discarded. Calls for different brands take different gates and never
//! wait on each other. The map lock itself is only held for single reads
//! and writes.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tonal_core::{check_id, ResourceKind, Signature, ToneError};

#[derive(Debug, Default)]
pub struct SignatureStore {
    signatures: RwLock<HashMap<String, Signature>>,

    /// Per-brand creation gates. Kept for the life of the store, like the
    /// brands they guard.
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the brand's signature, analyzing `source_text` to create it
    /// if none exists.
    ///
    /// An existing signature is returned unchanged and `analyze` is not
    /// called. On creation the new signature has version `1.0`. If `analyze`
    /// fails, nothing is stored and the error is returned as-is.
    pub async fn get_or_create<F, Fut>(
        &self,
        brand_id: &str,
        source_text: &str,
        analyze: F,
    ) -> Result<Signature, ToneError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String, ToneError>>,
    {
        check_id("brand_id", brand_id)?;

        if let Some(existing) = self.lookup(brand_id) {
            return Ok(existing);
        }

        let gate = self.gate(brand_id);
        let _held = gate.lock().await;

        // Another caller may have created it while we waited
        if let Some(existing) = self.lookup(brand_id) {
            return Ok(existing);
        }

        let signature_text = match analyze(source_text.to_string()).await {
            Ok(text) if text.trim().is_empty() => {
                return Err(ToneError::Analysis(
                    "analysis returned an empty signature".to_string(),
                ));
            }
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(brand_id, error = %e, "Signature analysis failed");
                return Err(e);
            }
        };

        // An explicit put may have landed while analysis ran; it wins.
        let stored = self
            .signatures
            .write()
            .entry(brand_id.to_string())
            .or_insert_with(|| Signature::new(brand_id, signature_text))
            .clone();

        tracing::info!(brand_id, version = %stored.version, "Created signature");
        Ok(stored)
    }

    /// Fetch the brand's signature.
    pub fn get(&self, brand_id: &str) -> Result<Signature, ToneError> {
        self.lookup(brand_id)
            .ok_or_else(|| ToneError::not_found(ResourceKind::Signature, brand_id))
    }

    /// Explicitly create or replace the brand's signature.
    ///
    /// Replacement refreshes `created_at` and keeps the version. The analysis
    /// collaborator is never involved.
    pub fn put(&self, brand_id: &str, signature_text: &str) -> Result<Signature, ToneError> {
        check_id("brand_id", brand_id)?;
        if signature_text.trim().is_empty() {
            return Err(ToneError::validation("signature must not be empty"));
        }

        let mut signatures = self.signatures.write();
        let signature = match signatures.get(brand_id) {
            Some(current) => current.superseded_by(signature_text),
            None => Signature::new(brand_id, signature_text),
        };
        signatures.insert(brand_id.to_string(), signature.clone());

        tracing::info!(brand_id, version = %signature.version, "Stored signature");
        Ok(signature)
    }

    pub fn contains(&self, brand_id: &str) -> bool {
        self.signatures.read().contains_key(brand_id)
    }

    pub fn len(&self) -> usize {
        self.signatures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, brand_id: &str) -> Option<Signature> {
        self.signatures.read().get(brand_id).cloned()
    }

    fn gate(&self, brand_id: &str) -> Arc<AsyncMutex<()>> {
        Arc::clone(
            self.gates
                .lock()
                .entry(brand_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}
