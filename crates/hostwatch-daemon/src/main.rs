#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, path::PathBuf, sync::Arc};
use tokio::sync::Mutex as TokioMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use hostwatch_agent::{
    auth::{CredentialProvider, CredentialStore, EnvCredentials},
    backend::{
        client::{HttpBackend, HttpBackendConfig},
        Backend,
    },
    config::Config,
    hostinfo,
    logs::{queue::EventQueue, shipper::LogShipper, source::resolve_sources, tailer::LogTailer},
    metrics::{sampler::MetricSampler, shipper::MetricShipper},
    scheduler::{Job, JobScheduler},
};

const AUTH_TOKEN_VAR: &str = "HW_AUTH_TOKEN";

#[tokio::main]
pub async fn main() {
    let log_level = env::var("HW_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = config_from_env();
    if let Err(e) = config.validate() {
        error!("Invalid configuration on agent startup: {e}. Shutting down.");
        return;
    }

    let instance_id = match hostinfo::get_instance_id() {
        Ok(id) => id,
        Err(e) => {
            error!("Unable to resolve instance identity: {e}. Shutting down.");
            return;
        }
    };
    let hostname = hostinfo::get_hostname();
    info!("Starting hostwatch agent for instance {instance_id} on {hostname}");

    // The initial credential fetch is the session handshake and is fatal;
    // later refreshes are driven by the scheduler and are not.
    let credentials = Arc::new(CredentialStore::new());
    let provider: Arc<dyn CredentialProvider> = Arc::new(EnvCredentials::new(AUTH_TOKEN_VAR));
    if let Err(e) = credentials.refresh(provider.as_ref()).await {
        error!("Unable to establish a client session: {e}. Shutting down.");
        return;
    }

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(HttpBackendConfig {
        endpoint: config.endpoint.clone(),
        credentials: Arc::clone(&credentials),
        timeout: config.request_timeout(),
        use_compression: config.use_compression,
        compression_level: config.compression_level,
    }));

    let cancel = CancellationToken::new();

    let sources = match resolve_sources(&config.log_file_paths, config.collect_journal) {
        Ok(sources) => sources,
        Err(e) => {
            error!("Invalid log source configuration: {e}. Shutting down.");
            return;
        }
    };

    let mut tailer_handles = Vec::new();
    let mut shipping_inputs = Vec::new();
    for source in sources {
        let queue = EventQueue::new();
        tailer_handles.push(LogTailer::new(source.clone(), queue.clone(), cancel.clone()).spawn());
        shipping_inputs.push((source, queue));
    }
    info!("Following {} log sources", shipping_inputs.len());

    let group_name = config.log_group_for(&instance_id);
    let log_shipper =
        match LogShipper::initialize(Arc::clone(&backend), &group_name, shipping_inputs).await {
            Ok(shipper) => Arc::new(TokioMutex::new(shipper)),
            Err(e) => {
                error!("Failed to prepare log streams on startup: {e}. Shutting down.");
                return;
            }
        };

    // Seed relative counters so the first scheduled publish covers a real
    // interval
    let mut sampler = MetricSampler::new(config.metrics_interval());
    sampler.seed();
    let sampler = Arc::new(TokioMutex::new(sampler));
    let metric_shipper = Arc::new(MetricShipper::new(
        Arc::clone(&backend),
        &config.namespace,
        &instance_id,
        &hostname,
    ));

    let mut scheduler = JobScheduler::new(cancel.clone());

    let refresh_store = Arc::clone(&credentials);
    let refresh_provider = Arc::clone(&provider);
    scheduler.register(Job::new(
        "credential-refresh",
        config.credential_refresh(),
        move || {
            let store = Arc::clone(&refresh_store);
            let provider = Arc::clone(&refresh_provider);
            async move { store.refresh(provider.as_ref()).await }
        },
    ));

    let job_sampler = Arc::clone(&sampler);
    let job_metric_shipper = Arc::clone(&metric_shipper);
    scheduler.register(Job::new(
        "metrics",
        config.metrics_interval(),
        move || {
            let sampler = Arc::clone(&job_sampler);
            let shipper = Arc::clone(&job_metric_shipper);
            async move {
                let snapshot = { sampler.lock().await.sample() };
                shipper.ship(snapshot).await
            }
        },
    ));

    let job_log_shipper = Arc::clone(&log_shipper);
    scheduler.register(Job::new(
        "log-shipping",
        config.logs_interval(),
        move || {
            let shipper = Arc::clone(&job_log_shipper);
            async move { shipper.lock().await.ship_all().await.map(|_| ()) }
        },
    ));

    let job_handles = scheduler.spawn_all();

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {e}"),
    }
    cancel.cancel();

    // Final flush so lines collected just before shutdown are not stranded
    if let Err(e) = log_shipper.lock().await.ship_all().await {
        error!("Final log flush failed: {e}");
    }

    for handle in tailer_handles {
        let _ = handle.await;
    }
    for handle in job_handles {
        let _ = handle.await;
    }
    info!("hostwatch agent stopped");
}

/// Assembles the configuration object from environment variables. A full
/// configuration-file front end can replace this without touching the
/// core, which only sees the validated [`Config`].
fn config_from_env() -> Config {
    let mut config = Config::default();

    if let Ok(endpoint) = env::var("HW_ENDPOINT") {
        config.endpoint = endpoint.trim().to_string();
    }
    if let Ok(namespace) = env::var("HW_NAMESPACE") {
        if !namespace.trim().is_empty() {
            config.namespace = namespace.trim().to_string();
        }
    }
    if let Ok(group) = env::var("HW_LOG_GROUP_NAME") {
        if !group.trim().is_empty() {
            config.log_group_name = group.trim().to_string();
        }
    }
    if let Ok(val) = env::var("HW_METRICS_INTERVAL") {
        if let Ok(secs) = val.parse::<u64>() {
            config.metrics_collection_interval = secs;
        }
    }
    if let Ok(val) = env::var("HW_LOGS_INTERVAL") {
        if let Ok(secs) = val.parse::<u64>() {
            config.logs_collection_interval = secs;
        }
    }
    if let Ok(val) = env::var("HW_CREDENTIAL_REFRESH_INTERVAL") {
        if let Ok(secs) = val.parse::<u64>() {
            config.credential_refresh_interval = secs;
        }
    }
    if let Ok(files) = env::var("HW_LOG_FILES") {
        config.log_file_paths = files
            .split(':')
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .collect();
    }
    config.collect_journal = env::var("HW_COLLECT_JOURNAL")
        .map(|val| val.to_lowercase() == "true")
        .unwrap_or(false);
    if let Ok(val) = env::var("HW_FLUSH_TIMEOUT") {
        if let Ok(secs) = val.parse::<u64>() {
            config.flush_timeout = secs;
        }
    }
    if let Ok(val) = env::var("HW_USE_COMPRESSION") {
        config.use_compression = val.to_lowercase() != "false";
    }
    if let Ok(val) = env::var("HW_COMPRESSION_LEVEL") {
        if let Ok(level) = val.parse::<i32>() {
            config.compression_level = level;
        }
    }

    config
}
