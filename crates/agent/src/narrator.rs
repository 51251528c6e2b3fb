use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use lapsight_core::domain::ProductId;
use lapsight_core::narrative::{
    extract_json, fallback_body, CachedNarrative, NarrativeCache, NarrativeKind,
    NarrativeOutcome, TEMPLATE_PROVIDER,
};

use crate::llm::LlmClient;

/// Cache-first narrative generation over an ordered list of providers.
///
/// Generation never fails from the caller's point of view: when no provider
/// returns parseable JSON the deterministic fallback body is cached for a short
/// time and returned instead.
#[derive(Clone)]
pub struct Narrator {
    providers: Vec<Arc<dyn LlmClient>>,
    cache: Arc<dyn NarrativeCache>,
}

/// What to generate and where to cache it.
#[derive(Clone, Copy, Debug)]
pub struct NarrativeRequest<'a> {
    pub prompt: &'a str,
    pub key: &'a str,
    pub kind: NarrativeKind,
    pub product_id: Option<&'a ProductId>,
}

impl Narrator {
    pub fn new(providers: Vec<Arc<dyn LlmClient>>, cache: Arc<dyn NarrativeCache>) -> Self {
        Self { providers, cache }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|provider| provider.provider().to_string()).collect()
    }

    pub async fn generate(&self, request: NarrativeRequest<'_>) -> NarrativeOutcome {
        self.generate_at(request, Utc::now()).await
    }

    pub async fn generate_at(
        &self,
        request: NarrativeRequest<'_>,
        now: DateTime<Utc>,
    ) -> NarrativeOutcome {
        if let Some(outcome) = self.cached(request.key, now).await {
            return outcome;
        }

        for provider in &self.providers {
            let name = provider.provider();
            let raw = match provider.complete(request.prompt).await {
                Ok(raw) => raw,
                Err(error) => {
                    warn!(
                        event_name = "narrative.provider.failed",
                        provider = name,
                        kind = request.kind.as_str(),
                        error = %error,
                        "narrative provider request failed"
                    );
                    continue;
                }
            };

            let text = extract_json(&raw);
            let body = match serde_json::from_str::<Value>(text) {
                Ok(body) => body,
                Err(error) => {
                    warn!(
                        event_name = "narrative.provider.unparseable",
                        provider = name,
                        kind = request.kind.as_str(),
                        error = %error,
                        "narrative provider returned invalid JSON"
                    );
                    continue;
                }
            };

            self.store(&request, name, text.to_string(), now + request.kind.ttl()).await;
            info!(
                event_name = "narrative.generated",
                provider = name,
                kind = request.kind.as_str(),
                cache_key = request.key,
                "narrative generated"
            );
            return NarrativeOutcome { body, provider: name.to_string(), cached: false };
        }

        let body = fallback_body();
        let expires_at = now + NarrativeKind::fallback_ttl();
        self.store(&request, TEMPLATE_PROVIDER, body.to_string(), expires_at).await;
        warn!(
            event_name = "narrative.fallback",
            kind = request.kind.as_str(),
            cache_key = request.key,
            providers = self.providers.len(),
            "all narrative providers failed, serving template"
        );
        NarrativeOutcome { body, provider: TEMPLATE_PROVIDER.to_string(), cached: false }
    }

    async fn cached(&self, key: &str, now: DateTime<Utc>) -> Option<NarrativeOutcome> {
        let entry = match self.cache.get(key, now).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(error) => {
                warn!(
                    event_name = "narrative.cache.read_failed",
                    cache_key = key,
                    error = %error,
                    "narrative cache lookup failed"
                );
                return None;
            }
        };

        match serde_json::from_str::<Value>(&entry.body) {
            Ok(body) => {
                debug!(
                    event_name = "narrative.cache.hit",
                    cache_key = key,
                    provider = entry.provider.as_str(),
                    "narrative served from cache"
                );
                Some(NarrativeOutcome { body, provider: entry.provider, cached: true })
            }
            Err(error) => {
                warn!(
                    event_name = "narrative.cache.corrupt",
                    cache_key = key,
                    error = %error,
                    "cached narrative is not valid JSON, regenerating"
                );
                None
            }
        }
    }

    async fn store(
        &self,
        request: &NarrativeRequest<'_>,
        provider: &str,
        body: String,
        expires_at: DateTime<Utc>,
    ) {
        let entry = CachedNarrative {
            key: request.key.to_string(),
            provider: provider.to_string(),
            body,
            product_id: request.product_id.cloned(),
            expires_at,
        };
        if let Err(error) = self.cache.put(entry).await {
            warn!(
                event_name = "narrative.cache.write_failed",
                cache_key = request.key,
                error = %error,
                "narrative cache write failed"
            );
        }
    }
}
