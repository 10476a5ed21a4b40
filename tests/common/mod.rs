//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use std::sync::Arc;
use uuid::Uuid;

use wicket::auth::TokenSigner;
use wicket::catalog::{Artifact, MemoryCatalog, Purchase};
use wicket::logging::AuditLogger;
use wicket::store::{ConsumeOutcome, MemoryTokenStore, StoreStats, TokenStore};
use wicket::tokens::{
    IssuancePolicy, ManualClock, TokenIssuer, TokenRecord, TokenRedeemer, TokenService,
};
use wicket::Result;

pub const SECRET: &str = "integration-secret-that-is-at-least-32-chars";
pub const BASE_URL: &str = "http://localhost:3000";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 7, 9, 30, 0).unwrap()
}

/// Token store that counts every call before delegating
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryTokenStore,
    inserts: AtomicUsize,
    gets: AtomicUsize,
    consumes: AtomicUsize,
    counts: AtomicUsize,
    /// Extra latency after a consume has been applied, in milliseconds
    consume_delay_ms: AtomicU64,
}

impl CountingStore {
    pub fn inner(&self) -> &MemoryTokenStore {
        &self.inner
    }

    /// Total store calls so far
    pub fn calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
            + self.gets.load(Ordering::SeqCst)
            + self.consumes.load(Ordering::SeqCst)
            + self.counts.load(Ordering::SeqCst)
    }

    pub fn consumes(&self) -> usize {
        self.consumes.load(Ordering::SeqCst)
    }

    /// Delay every consume reply, after the write has landed
    pub fn slow_consumes(&self, delay: Duration) {
        self.consume_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl TokenStore for CountingStore {
    async fn insert(&self, record: TokenRecord) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
    }

    async fn get(&self, id: &Uuid) -> Result<Option<TokenRecord>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn consume(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
        origin: Option<IpAddr>,
    ) -> Result<ConsumeOutcome> {
        self.consumes.fetch_add(1, Ordering::SeqCst);
        let outcome = self.inner.consume(id, at, origin).await;

        let delay = self.consume_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        outcome
    }

    async fn count_for_purchase(&self, purchase_id: &str) -> Result<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count_for_purchase(purchase_id).await
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.inner.stats().await
    }

    fn backend(&self) -> &'static str {
        "counting"
    }
}

/// A catalog with purchase p1 owned by u1 for artifact a1, a manual clock,
/// a counting store and a token service wired over them.
pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub catalog: Arc<MemoryCatalog>,
    pub store: Arc<CountingStore>,
    pub signer: Arc<TokenSigner>,
    pub audit: AuditLogger,
    pub policy: IssuancePolicy,
    pub service: Arc<TokenService>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_policy(IssuancePolicy::default())
    }

    pub fn with_policy(policy: IssuancePolicy) -> Self {
        let catalog = MemoryCatalog::new("/srv/reports");
        catalog.insert_artifact(Artifact {
            id: "a1".into(),
            title: "12 Harbour Rd - Building Inspection".into(),
            storage_key: "reports/a1-building.pdf".into(),
        });
        catalog.insert_purchase(Purchase {
            id: "p1".into(),
            buyer_id: "u1".into(),
            artifact_id: "a1".into(),
            purchased_at: start_time(),
        });

        let clock = Arc::new(ManualClock::new(start_time()));
        let catalog = Arc::new(catalog);
        let store = Arc::new(CountingStore::default());
        let signer = Arc::new(TokenSigner::hmac(SECRET).unwrap());
        let audit = AuditLogger::new("test-node".into());

        let service = Arc::new(wire_service(&catalog, &store, &signer, &clock, &policy, &audit));

        Self {
            clock,
            catalog,
            store,
            signer,
            audit,
            policy,
            service,
        }
    }

    /// A fresh service over the fixture's shared collaborators
    pub fn build_service(&self) -> TokenService {
        wire_service(
            &self.catalog,
            &self.store,
            &self.signer,
            &self.clock,
            &self.policy,
            &self.audit,
        )
    }
}

fn wire_service(
    catalog: &Arc<MemoryCatalog>,
    store: &Arc<CountingStore>,
    signer: &Arc<TokenSigner>,
    clock: &Arc<ManualClock>,
    policy: &IssuancePolicy,
    audit: &AuditLogger,
) -> TokenService {
    let issuer = TokenIssuer::new(
        catalog.clone(),
        store.clone(),
        Arc::clone(signer),
        clock.clone(),
        policy.clone(),
    );
    let redeemer = TokenRedeemer::new(
        store.clone(),
        catalog.clone(),
        Arc::clone(signer),
        clock.clone(),
    );
    TokenService::new(issuer, redeemer, audit.clone(), BASE_URL)
}

/// Replace the first character of a JWT's signature segment
pub fn tamper_signature(token: &str) -> String {
    let split = token.rfind('.').unwrap() + 1;
    let (head, sig) = token.split_at(split);
    let replacement = if sig.starts_with('A') { 'B' } else { 'A' };
    format!("{}{}{}", head, replacement, &sig[1..])
}
