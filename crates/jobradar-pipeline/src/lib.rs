//! Cycle orchestration: alert filtering, batched notification, scheduling.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use jobradar_adapters::{default_adapters, SourceAdapter};
use jobradar_core::{NormalizedJobRecord, SearchQuery, SourceStatus, StoredJobRecord};
use jobradar_storage::{
    BackoffPolicy, HttpClientConfig, HttpFetcher, JobStore, MemoryJobStore, PgJobStore,
};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

pub const CRATE_NAME: &str = "jobradar-pipeline";

/// Runtime configuration, resolved once from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub email_from: String,
    pub email_to: String,
    pub alert_keywords: Vec<String>,
    pub alert_locations: Vec<String>,
    pub scrape_interval_hours: u64,
    pub rate_limit_delay_secs: u64,
    pub max_retries: usize,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub search: SearchQuery,
    pub database_url: Option<String>,
    pub web_port: u16,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated allow-list, dropping empty entries.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            smtp_server: env_or("SMTP_SERVER", "smtp.gmail.com"),
            smtp_port: env_parse("SMTP_PORT", 587),
            smtp_username: env_or("SMTP_USERNAME", ""),
            smtp_password: env_or("SMTP_PASSWORD", ""),
            email_from: env_or("EMAIL_FROM", ""),
            email_to: env_or("EMAIL_TO", ""),
            alert_keywords: parse_list(&env_or(
                "ALERT_KEYWORDS",
                "python,developer,software engineer",
            )),
            alert_locations: parse_list(&env_or("ALERT_LOCATIONS", "remote,hybrid")),
            scrape_interval_hours: env_parse("SCRAPE_INTERVAL_HOURS", 1),
            rate_limit_delay_secs: env_parse("RATE_LIMIT_DELAY_SECS", 2),
            max_retries: env_parse("MAX_RETRIES", 3),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS", 15),
            user_agent: env_or("JOBRADAR_USER_AGENT", "jobradar-bot/0.1 (job listing aggregator)"),
            search: SearchQuery {
                keywords: env_or("SEARCH_KEYWORDS", "developer"),
                location: env_or("SEARCH_LOCATION", ""),
                max_pages: env_parse("MAX_PAGES", 1),
            },
            database_url: std::env::var("DATABASE_URL").ok(),
            web_port: env_parse("JOBRADAR_WEB_PORT", 5000),
        }
    }
}

/// Keyword/location allow-lists deciding which new records are alert-worthy.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    keywords: Vec<String>,
    locations: Vec<String>,
}

impl AlertFilter {
    pub fn new(keywords: Vec<String>, locations: Vec<String>) -> Self {
        let lower = |items: Vec<String>| {
            items
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        };
        Self {
            keywords: lower(keywords),
            locations: lower(locations),
        }
    }

    /// Both lists empty means alert on everything. A non-empty keyword list
    /// requires a title hit; a non-empty location list additionally requires
    /// a location hit.
    pub fn matches(&self, record: &NormalizedJobRecord) -> bool {
        if self.keywords.is_empty() && self.locations.is_empty() {
            return true;
        }
        if !self.keywords.is_empty() {
            let title = record.title.to_lowercase();
            if !self.keywords.iter().any(|kw| title.contains(kw)) {
                return false;
            }
        }
        if !self.locations.is_empty() {
            let location = record.location.to_lowercase();
            if !self.locations.iter().any(|loc| location.contains(loc)) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("smtp delivery failed: {0}")]
    Smtp(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Outbound message channel. One call delivers one whole batch.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn deliver(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// SMTP submission with STARTTLS and authentication.
pub struct SmtpAlertTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpAlertTransport {
    /// `Ok(None)` when credentials or addresses are unset — the notifier
    /// treats that as "configuration missing", not as an error.
    pub fn from_config(config: &PipelineConfig) -> Result<Option<Self>, NotifyError> {
        if config.email_from.is_empty()
            || config.email_to.is_empty()
            || config.smtp_username.is_empty()
            || config.smtp_password.is_empty()
        {
            return Ok(None);
        }

        let from: Mailbox = config
            .email_from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;
        let to: Mailbox = config
            .email_to
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| NotifyError::Config(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        Ok(Some(Self { transport, from, to }))
    }
}

#[async_trait]
impl AlertTransport for SmtpAlertTransport {
    async fn deliver(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        Ok(())
    }
}

/// Batches alert-worthy records into one message and records what was sent.
pub struct Notifier {
    filter: AlertFilter,
    transport: Option<Box<dyn AlertTransport>>,
    recipient: String,
}

impl Notifier {
    pub fn new(
        filter: AlertFilter,
        transport: Option<Box<dyn AlertTransport>>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            filter,
            transport,
            recipient: recipient.into(),
        }
    }

    /// Returns true only when a message actually went out. Log entries are
    /// written after the transport accepted the whole batch, never before —
    /// a failed send leaves the log untouched.
    pub async fn send_batch(&self, store: &dyn JobStore, records: &[StoredJobRecord]) -> bool {
        let matched: Vec<&StoredJobRecord> = records
            .iter()
            .filter(|stored| self.filter.matches(&stored.record))
            .collect();
        if matched.is_empty() {
            return false;
        }

        let Some(transport) = &self.transport else {
            warn!(
                records = matched.len(),
                "email configuration missing, skipping alert"
            );
            return false;
        };

        let subject = format!("Job Alert: {} New Job(s) Found", matched.len());
        let body = compose_batch_body(&matched);

        if let Err(err) = transport.deliver(&subject, &body).await {
            warn!(%err, "alert delivery failed, batch not logged");
            return false;
        }

        for stored in &matched {
            if let Err(err) = store
                .append_notification_log(stored.id, &self.recipient, &subject)
                .await
            {
                warn!(%err, job_id = %stored.id, "failed to record notification log entry");
            }
        }
        info!(records = matched.len(), "batch alert sent");
        true
    }
}

fn compose_batch_body(records: &[&StoredJobRecord]) -> String {
    let mut body = format!("Found {} new job(s):\n\n", records.len());
    for (idx, stored) in records.iter().enumerate() {
        let record = &stored.record;
        let location = if record.location.is_empty() {
            "N/A"
        } else {
            &record.location
        };
        body.push_str(&format!("{}. {} at {}\n", idx + 1, record.title, record.company));
        body.push_str(&format!("   Location: {location}\n"));
        body.push_str(&format!("   Source: {}\n", record.source_platform));
        body.push_str(&format!("   Apply: {}\n\n", record.url));
    }
    body.push_str("---\nAutomated notification from Job Radar.");
    body
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CycleError {
    #[error("a cycle is already running")]
    AlreadyRunning,
}

/// Runs every source once per cycle, isolating per-source failures, then
/// hands the aggregated new records to the notifier in one batch.
///
/// Scheduled and manual triggers share one guard: a trigger that arrives
/// while a cycle is running is rejected, not queued.
pub struct Orchestrator {
    adapters: Vec<Box<dyn SourceAdapter>>,
    store: Arc<dyn JobStore>,
    http: HttpFetcher,
    notifier: Notifier,
    query: SearchQuery,
    cycle_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        adapters: Vec<Box<dyn SourceAdapter>>,
        store: Arc<dyn JobStore>,
        http: HttpFetcher,
        notifier: Notifier,
        query: SearchQuery,
    ) -> Self {
        Self {
            adapters,
            store,
            http,
            notifier,
            query,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// One full cycle: fetch → normalize → dedup-insert per source, then one
    /// batch notification. Returns precisely the records newly accepted this
    /// cycle.
    pub async fn run_all_sources(&self) -> Result<Vec<StoredJobRecord>, CycleError> {
        let _guard = self
            .cycle_lock
            .try_lock()
            .map_err(|_| CycleError::AlreadyRunning)?;

        info!(sources = self.adapters.len(), "cycle started");
        let mut accepted = Vec::new();

        for adapter in &self.adapters {
            let platform = adapter.platform();
            let status = match adapter.fetch_postings(&self.http, &self.query).await {
                Ok(postings) => {
                    let found = postings.len();
                    let mut new_here = 0usize;
                    let mut source_ok = true;
                    for raw in postings {
                        let record = NormalizedJobRecord::from_raw(raw, platform);
                        match self.store.insert_if_absent(record).await {
                            Ok(Some(stored)) => {
                                accepted.push(stored);
                                new_here += 1;
                            }
                            Ok(None) => {}
                            Err(err) => {
                                warn!(platform, %err, "store insert failed");
                                source_ok = false;
                            }
                        }
                    }
                    info!(platform, found, new = new_here, "source finished");
                    if source_ok {
                        SourceStatus::Active
                    } else {
                        SourceStatus::Error
                    }
                }
                Err(err) => {
                    warn!(platform, %err, "source failed, continuing with remaining sources");
                    SourceStatus::Error
                }
            };
            if let Err(err) = self.store.upsert_source_status(platform, status).await {
                warn!(platform, %err, "failed to record source status");
            }
        }

        if !accepted.is_empty() {
            self.notifier.send_batch(self.store.as_ref(), &accepted).await;
        }
        info!(new_records = accepted.len(), "cycle finished");
        Ok(accepted)
    }
}

/// Background timer driving scheduled cycles at a whole-hour interval. The
/// returned scheduler still needs `.start()`.
pub async fn build_scheduler(
    orchestrator: Arc<Orchestrator>,
    interval_hours: u64,
) -> anyhow::Result<JobScheduler> {
    let sched = JobScheduler::new().await.context("creating scheduler")?;
    let interval = Duration::from_secs(interval_hours.max(1) * 3600);
    let job = Job::new_repeated_async(interval, move |_id, _sched| {
        let orchestrator = orchestrator.clone();
        Box::pin(async move {
            match orchestrator.run_all_sources().await {
                Ok(accepted) => info!(new_records = accepted.len(), "scheduled cycle complete"),
                Err(CycleError::AlreadyRunning) => {
                    info!("scheduled cycle skipped, another cycle is running")
                }
            }
        })
    })
    .context("creating scheduled cycle job")?;
    sched.add(job).await.context("adding scheduled cycle job")?;
    Ok(sched)
}

/// Postgres when `DATABASE_URL` is set, otherwise in-memory.
pub async fn store_from_env(config: &PipelineConfig) -> anyhow::Result<Arc<dyn JobStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PgJobStore::connect(url)
                .await
                .context("connecting to record store")?;
            store
                .init_schema()
                .await
                .context("initializing record store schema")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, records will not survive restarts");
            Ok(Arc::new(MemoryJobStore::new()))
        }
    }
}

/// Wire the default adapters, fetcher, filter, and notifier into one
/// orchestrator.
pub fn build_orchestrator(
    config: &PipelineConfig,
    store: Arc<dyn JobStore>,
) -> anyhow::Result<Orchestrator> {
    let http = HttpFetcher::new(HttpClientConfig {
        timeout: Duration::from_secs(config.http_timeout_secs),
        user_agent: config.user_agent.clone(),
        min_request_delay: Duration::from_secs(config.rate_limit_delay_secs),
        backoff: BackoffPolicy {
            max_attempts: config.max_retries,
            ..Default::default()
        },
    })
    .context("building http client")?;

    let transport: Option<Box<dyn AlertTransport>> = match SmtpAlertTransport::from_config(config) {
        Ok(Some(transport)) => Some(Box::new(transport)),
        Ok(None) => None,
        Err(err) => {
            warn!(%err, "invalid email configuration, alerts disabled");
            None
        }
    };
    let filter = AlertFilter::new(config.alert_keywords.clone(), config.alert_locations.clone());
    let notifier = Notifier::new(filter, transport, config.email_to.clone());

    Ok(Orchestrator::new(
        default_adapters(),
        store,
        http,
        notifier,
        config.search.clone(),
    ))
}
