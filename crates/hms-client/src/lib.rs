//! # hms-client
//!
//! Typed client for the HMS HTTP API, with backend discovery and an offline
//! read cache.
//!
//! ## Read Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  inventory() / patients()                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  resolver.resolve() ──► GET /api/...                                    │
//! │       │                    │                                            │
//! │       │            ok ─────┴──► cache.merge(remote)                     │
//! │       │                         return Fetched { remote, Live }         │
//! │       │                                                                 │
//! │       └── unreachable ────────► cache.load()                            │
//! │                                 return Fetched { cached, Cached }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A successful read always returns the server's data unchanged. Writes are
//! never queued: when the server is down they fail with
//! [`ClientError::Unreachable`].
//!
//! ## Usage
//! ```rust,no_run
//! use hms_client::HmsClient;
//!
//! # async fn run() -> hms_client::ClientResult<()> {
//! let client = HmsClient::connect_default()?;
//! let inventory = client.inventory().await?;
//! if inventory.is_offline() {
//!     println!("showing cached stock");
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hms_core::billing::BillLine;
use hms_core::reports::{AdminDashboard, SalesReport, UserDashboard};
use hms_core::{
    InventoryItem, LedgerEntry, LedgerFilter, Money, NewItem, NewPatient, PatientQuery,
    PatientRecord, PaymentMethod, UserProfile,
};

pub mod cache;
pub mod error;
pub mod resolver;

pub use cache::{CacheEntity, OfflineCache};
pub use error::{ClientError, ClientResult};
pub use resolver::{BackendResolver, ResolverConfig};

/// Default bound on a single API call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Wire Types
// =============================================================================

/// Where a read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Live,
    Cached,
}

/// Data plus its origin. `Cached` doubles as the offline indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub source: Source,
}

impl<T> Fetched<T> {
    fn live(data: T) -> Self {
        Fetched {
            data,
            source: Source::Live,
        }
    }

    fn cached(data: T) -> Self {
        Fetched {
            data,
            source: Source::Cached,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.source == Source::Cached
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// `sqlite` or `memory`.
    pub mode: String,
}

/// An entry of the billable service list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogService {
    pub name: String,
    pub category: String,
    pub price: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaleReceipt {
    pub sale: LedgerEntry,
    /// Full inventory after the sale.
    pub inventory: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillReceipt {
    pub bill: LedgerEntry,
    /// The patient after any discharge.
    pub patient: PatientRecord,
}

/// Body of `POST /api/billing`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    pub patient_id: String,
    pub items: Vec<BillLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Deserialize)]
struct LoginEnvelope {
    user: UserProfile,
}

#[derive(Deserialize)]
struct ItemEnvelope {
    item: InventoryItem,
}

#[derive(Deserialize)]
struct PatientEnvelope {
    patient: PatientRecord,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaleBody<'a> {
    product_name: &'a str,
    quantity: i64,
}

#[derive(Serialize)]
struct RestockBody<'a> {
    name: &'a str,
    quantity: i64,
}

#[derive(Serialize)]
struct ThresholdQuery {
    threshold: i64,
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct HmsClient {
    http: reqwest::Client,
    resolver: BackendResolver,
    cache: Option<OfflineCache>,
}

impl HmsClient {
    /// A client without an offline cache.
    pub fn new(resolver: BackendResolver) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;

        Ok(HmsClient {
            http,
            resolver,
            cache: None,
        })
    }

    /// Default ports on localhost, cache under the platform data dir.
    pub fn connect_default() -> ClientResult<Self> {
        let resolver = BackendResolver::new(ResolverConfig::default())?;
        Ok(Self::new(resolver)?.with_cache(OfflineCache::default_location()?))
    }

    pub fn with_cache(mut self, cache: OfflineCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn resolver(&self) -> &BackendResolver {
        &self.resolver
    }

    // =========================================================================
    // Health & Auth
    // =========================================================================

    pub async fn health(&self) -> ClientResult<HealthStatus> {
        self.get(&["api", "health"]).await
    }

    /// ## Errors
    /// `Http { status: 401 }` for a wrong username or password.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<UserProfile> {
        let envelope: LoginEnvelope = self
            .post(&["api", "auth", "login"], &Credentials { username, password })
            .await?;
        Ok(envelope.user)
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// The catalog, or the cached copy when the server is unreachable.
    pub async fn inventory(&self) -> ClientResult<Fetched<Vec<InventoryItem>>> {
        match self.get::<Vec<InventoryItem>>(&["api", "inventory"]).await {
            Ok(items) => {
                self.remember(CacheEntity::Inventory, &items).await;
                Ok(Fetched::live(items))
            }
            Err(e) if e.is_offline() => {
                let cached: Vec<InventoryItem> = self.fallback(CacheEntity::Inventory, e).await?;
                Ok(Fetched::cached(cached))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn item(&self, name: &str) -> ClientResult<InventoryItem> {
        self.get(&["api", "inventory", name]).await
    }

    /// Items with `0 < stock < threshold`; the server default applies when
    /// `threshold` is `None`.
    pub async fn low_stock(&self, threshold: Option<i64>) -> ClientResult<Vec<InventoryItem>> {
        let path = ["api", "inventory", "low-stock"];
        match threshold {
            Some(threshold) => self.get_with_query(&path, &ThresholdQuery { threshold }).await,
            None => self.get(&path).await,
        }
    }

    pub async fn add_item(&self, item: &NewItem) -> ClientResult<InventoryItem> {
        let envelope: ItemEnvelope = self.post(&["api", "inventory", "add"], item).await?;
        Ok(envelope.item)
    }

    pub async fn restock(&self, name: &str, quantity: i64) -> ClientResult<InventoryItem> {
        let envelope: ItemEnvelope = self
            .post(&["api", "inventory", "restock"], &RestockBody { name, quantity })
            .await?;
        Ok(envelope.item)
    }

    // =========================================================================
    // Sales & Billing
    // =========================================================================

    /// ## Errors
    /// `Http { code: "INSUFFICIENT_STOCK" }` when `quantity` exceeds stock.
    pub async fn sell(&self, product_name: &str, quantity: i64) -> ClientResult<SaleReceipt> {
        let receipt: SaleReceipt = self
            .post(&["api", "sales"], &SaleBody { product_name, quantity })
            .await?;
        self.remember(CacheEntity::Inventory, &receipt.inventory).await;
        Ok(receipt)
    }

    pub async fn services(&self) -> ClientResult<Vec<CatalogService>> {
        self.get(&["api", "services"]).await
    }

    pub async fn bills(&self, filter: &LedgerFilter) -> ClientResult<Vec<LedgerEntry>> {
        self.get_with_query(&["api", "billing"], filter).await
    }

    pub async fn create_bill(&self, bill: &NewBill) -> ClientResult<BillReceipt> {
        let receipt: BillReceipt = self.post(&["api", "billing"], bill).await?;
        self.remember(CacheEntity::Patients, std::slice::from_ref(&receipt.patient))
            .await;
        Ok(receipt)
    }

    // =========================================================================
    // Patients
    // =========================================================================

    /// Matching patients, or matching cached patients when the server is
    /// unreachable.
    pub async fn patients(&self, query: &PatientQuery) -> ClientResult<Fetched<Vec<PatientRecord>>> {
        match self.get_with_query::<Vec<PatientRecord>, _>(&["api", "patients"], query).await {
            Ok(patients) => {
                self.remember(CacheEntity::Patients, &patients).await;
                Ok(Fetched::live(patients))
            }
            Err(e) if e.is_offline() => {
                let cached: Vec<PatientRecord> = self.fallback(CacheEntity::Patients, e).await?;
                Ok(Fetched::cached(
                    cached.into_iter().filter(|p| query.matches(p)).collect(),
                ))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn patient(&self, id: &str) -> ClientResult<PatientRecord> {
        self.get(&["api", "patients", id]).await
    }

    pub async fn register_patient(&self, form: &NewPatient) -> ClientResult<PatientRecord> {
        let envelope: PatientEnvelope = self.post(&["api", "patients"], form).await?;
        self.remember(CacheEntity::Patients, std::slice::from_ref(&envelope.patient))
            .await;
        Ok(envelope.patient)
    }

    // =========================================================================
    // Reports
    // =========================================================================

    pub async fn dashboard(&self) -> ClientResult<AdminDashboard> {
        self.get(&["api", "dashboard"]).await
    }

    pub async fn user_dashboard(&self) -> ClientResult<UserDashboard> {
        self.get(&["api", "user-dashboard"]).await
    }

    pub async fn sales_report(&self) -> ClientResult<SalesReport> {
        self.get(&["api", "reports", "sales"]).await
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    async fn url(&self, segments: &[&str]) -> ClientResult<reqwest::Url> {
        let base = self.resolver.resolve().await?;
        let mut url =
            reqwest::Url::parse(&base).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let url = self.url(segments).await?;
        self.execute(self.http.get(url)).await
    }

    async fn get_with_query<T, Q>(&self, segments: &[&str], query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(segments).await?;
        self.execute(self.http.get(url).query(query)).await
    }

    async fn post<T, B>(&self, segments: &[&str], body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(segments).await?;
        self.execute(self.http.post(url).json(body)).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ClientResult<T> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                // The cached backend may have gone away; re-probe next time.
                self.resolver.invalidate().await;
                return Err(e.into());
            }
        };

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()));
        }

        let bytes = response.bytes().await?;
        let body: Option<ErrorBody> = serde_json::from_slice(&bytes).ok();
        let (message, code) = match body {
            Some(body) => (body.error, body.code),
            None => (
                status.canonical_reason().unwrap_or("Request failed").to_string(),
                None,
            ),
        };

        debug!(status = status.as_u16(), ?code, %message, "Request rejected");
        Err(ClientError::Http {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// Merges fresh server data into the cache. Failures are logged only.
    async fn remember<T>(&self, entity: CacheEntity, remote: &[T])
    where
        T: hms_core::cache::Versioned + Clone + Serialize + DeserializeOwned,
    {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.merge(entity, remote).await {
                warn!(entity = entity.file_name(), error = %e, "Failed to update offline cache");
            }
        }
    }

    /// The cached copy for an offline read, or `original` when there is
    /// nothing to show.
    async fn fallback<T: DeserializeOwned>(
        &self,
        entity: CacheEntity,
        original: ClientError,
    ) -> ClientResult<Vec<T>> {
        let Some(cache) = &self.cache else {
            return Err(original);
        };

        match cache.load::<T>(entity).await {
            Ok(cached) if !cached.is_empty() => {
                warn!(entity = entity.file_name(), entries = cached.len(), "Backend unreachable, serving cached data");
                Ok(cached)
            }
            Ok(_) => Err(original),
            Err(e) => {
                warn!(entity = entity.file_name(), error = %e, "Offline cache unreadable");
                Err(original)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use hms_core::{ReportSettings, StatusFilter};
    use hms_db::{seed_if_empty, MemoryStore};
    use hms_server::{build_router, AppState};

    /// Serves a freshly seeded in-memory backend on an ephemeral port.
    pub(crate) async fn spawn_server() -> (u16, JoinHandle<()>) {
        let store = Arc::new(MemoryStore::new());
        seed_if_empty(store.as_ref(), Utc::now()).await.unwrap();
        let app = build_router(
            AppState::new(store, ReportSettings::default()),
            Duration::from_secs(5),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (port, handle)
    }

    /// A port with nothing listening on it.
    pub(crate) async fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn client(port: u16) -> HmsClient {
        let resolver =
            BackendResolver::new(ResolverConfig::new("http://127.0.0.1", vec![port])).unwrap();
        HmsClient::new(resolver).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_login() {
        let (port, _server) = spawn_server().await;
        let client = client(port);

        let health = client.health().await.unwrap();
        assert_eq!(health.mode, "memory");

        let user = client.login("nurse", "nurse123").await.unwrap();
        assert_eq!(user.username, "nurse");
        assert_eq!(user.login_count, 1);

        let err = client.login("nurse", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.code(), Some("INVALID_CREDENTIALS"));
    }

    #[tokio::test]
    async fn test_inventory_and_sales() {
        let (port, _server) = spawn_server().await;
        let client = client(port);

        let receipt = client.sell("Syringes (10ml)", 10).await.unwrap();
        assert_eq!(receipt.sale.total, Money::from_major(50));

        // Name with spaces and parentheses goes through path encoding.
        let item = client.item("Syringes (10ml)").await.unwrap();
        assert_eq!(item.stock, 110);

        let err = client.sell("Syringes (10ml)", 200).await.unwrap_err();
        assert_eq!(err.code(), Some("INSUFFICIENT_STOCK"));

        let restocked = client.restock("Ventilators", 2).await.unwrap();
        assert_eq!(restocked.stock, 7);

        let added = client
            .add_item(&NewItem {
                name: Some("Splints".into()),
                stock: Some(4),
                price: Some(Money::from_major(30)),
                category: Some("equipment".into()),
            })
            .await
            .unwrap();
        assert_eq!(added.name, "Splints");

        let low = client.low_stock(Some(5)).await.unwrap();
        assert!(low.iter().any(|i| i.name == "Splints"));

        let report = client.sales_report().await.unwrap();
        assert_eq!(report.total_revenue, Money::from_major(50));
    }

    #[tokio::test]
    async fn test_billing_and_patients() {
        let (port, _server) = spawn_server().await;
        let client = client(port);

        let services = client.services().await.unwrap();
        assert!(services.iter().any(|s| s.name == "MRI Scan"));

        let receipt = client
            .create_bill(&NewBill {
                patient_id: "P1002".into(),
                items: vec![
                    BillLine::service("Blood Test", 2),
                    BillLine::service("Final Discharge Processing", 1),
                ],
                payment_method: Some(PaymentMethod::Insurance),
            })
            .await
            .unwrap();
        assert_eq!(receipt.bill.total, Money::from_major(250));
        assert!(receipt.patient.discharge_date.is_some());

        let discharged = client
            .patients(&PatientQuery {
                text: None,
                status: StatusFilter::Discharged,
            })
            .await
            .unwrap();
        assert_eq!(discharged.source, Source::Live);
        assert_eq!(discharged.data.len(), 1);
        assert_eq!(discharged.data[0].id, "P1002");

        let bills = client.bills(&LedgerFilter::for_patient("P1002")).await.unwrap();
        assert_eq!(bills.len(), 1);

        let err = client.patient("P0000").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_offline_reads_come_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (port, server) = spawn_server().await;

        let online = client(port).with_cache(OfflineCache::at(dir.path()));
        let live = online.inventory().await.unwrap();
        assert_eq!(live.source, Source::Live);
        online.patients(&PatientQuery::default()).await.unwrap();

        server.abort();
        let _ = server.await;

        let offline = client(port).with_cache(OfflineCache::at(dir.path()));
        let cached = offline.inventory().await.unwrap();
        assert!(cached.is_offline());
        assert_eq!(cached.data, live.data);

        let smiths = offline
            .patients(&PatientQuery {
                text: Some("smith".into()),
                status: StatusFilter::All,
            })
            .await
            .unwrap();
        assert!(smiths.is_offline());
        assert_eq!(smiths.data.len(), 1);

        // Writes are not queued.
        let err = offline.sell("Syringes (10ml)", 1).await.unwrap_err();
        assert!(err.is_offline());
    }

    #[tokio::test]
    async fn test_offline_without_cache_is_an_error() {
        let port = unused_port().await;
        let err = client(port).inventory().await.unwrap_err();
        assert!(err.is_offline());
    }
}
