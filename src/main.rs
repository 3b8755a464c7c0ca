use std::{process, sync::Arc, time::Duration};

use clap::Parser;
use specchio::{
    application::{
        dispatcher::{DispatchSettings, RenderDispatcher},
        prerender::PrerenderService,
        queue::RenderQueue,
        repos::{EntriesRepo, OptionsRepo, SecretsRepo},
        scheduler::{Scheduler, SchedulerPolicy},
        templates::TemplateRegistry,
    },
    cache::{EntryStore, SecretsManager, VersionCounter},
    config::{self, CliArgs, Command, ServeArgs, Settings},
    infra::{
        content::ConfiguredContent,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        renderer::HttpRenderFunction,
        telemetry,
    },
};
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher as tracing_dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &InfraError) {
    if tracing_dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    tracing_dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), InfraError> {
    let cli = CliArgs::parse();
    let settings = config::load(&cli).map_err(InfraError::configuration)?;

    telemetry::init(&settings.logging)?;

    match cli
        .command
        .unwrap_or(Command::Serve(ServeArgs::default()))
    {
        Command::Serve(_) => run_serve(settings).await,
        Command::Flush(_) => run_flush(settings).await,
    }
}

async fn connect_repositories(settings: &Settings) -> Result<PostgresRepositories, InfraError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database.url is required"))?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::database)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::database)?;

    Ok(PostgresRepositories::new(
        pool,
        settings.database.entries_table.clone(),
    ))
}

async fn run_serve(settings: Settings) -> Result<(), InfraError> {
    let repositories = connect_repositories(&settings).await?;

    let options: Arc<dyn OptionsRepo> = Arc::new(repositories.clone());
    let entries_repo: Arc<dyn EntriesRepo> = Arc::new(repositories.clone());
    let secrets_repo: Arc<dyn SecretsRepo> = Arc::new(repositories.clone());

    // The schema counter records the storage generation; the HTML counter
    // gates entry validity. Both are initialized once, never re-bumped here.
    VersionCounter::db(options.clone())
        .init()
        .await
        .map_err(InfraError::database)?;
    let html_version = Arc::new(VersionCounter::html(options.clone()));
    html_version.init().await.map_err(InfraError::database)?;

    let entries = Arc::new(EntryStore::new(
        entries_repo,
        settings.service.entry_read_cache_capacity,
    ));
    let secrets = Arc::new(SecretsManager::new(secrets_repo));
    let registry = Arc::new(TemplateRegistry::with_builtins());
    let content = Arc::new(ConfiguredContent::new(settings.site.clone()));
    let queue = Arc::new(RenderQueue::new());

    let scheduler = Arc::new(Scheduler::new(
        entries.clone(),
        registry.clone(),
        content.clone(),
        queue.clone(),
        SchedulerPolicy::with_chronological_post_type(
            settings.service.chronological_post_type.clone(),
        ),
    ));

    let endpoint = settings
        .renderer
        .endpoint
        .clone()
        .ok_or_else(|| InfraError::configuration("renderer.endpoint is required"))?;
    let public_base_url = settings
        .service
        .public_base_url
        .clone()
        .ok_or_else(|| InfraError::configuration("service.public_base_url is required"))?;
    let return_url = public_base_url
        .join(http::CALLBACK_PATH.trim_start_matches('/'))
        .map_err(InfraError::configuration)?;

    let transport = Arc::new(HttpRenderFunction::new(
        endpoint,
        settings.renderer.authorization.clone(),
    ));
    let dispatcher = Arc::new(RenderDispatcher::new(
        registry.clone(),
        content.clone(),
        secrets.clone(),
        html_version.clone(),
        transport,
        DispatchSettings {
            return_url,
            selector: settings.renderer.selector.clone(),
            variable: settings.renderer.variable.clone(),
            cache_buster: settings.renderer.cache_buster.clone(),
        },
    ));

    let prerender = Arc::new(PrerenderService::new(
        entries,
        registry,
        content,
        html_version.clone(),
        scheduler.clone(),
    ));

    let dispatch_handle = spawn_dispatch_loop(
        queue,
        dispatcher,
        settings.service.queue_interval,
        settings.service.queue_batch,
    );
    let secrets_gc_handle =
        spawn_secrets_gc_loop(secrets.clone(), settings.service.secrets_flush_interval);

    let state = HttpState {
        prerender,
        scheduler,
        secrets,
        html_version,
    };

    let listener = TcpListener::bind(settings.server.addr).await?;
    info!(addr = %settings.server.addr, "specchio listening");

    let result = axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InfraError::from);

    dispatch_handle.abort();
    let _ = dispatch_handle.await;
    secrets_gc_handle.abort();
    let _ = secrets_gc_handle.await;

    result
}

/// Drains the render queue on a fixed cadence and fires each job at the
/// remote renderer. Per-job failures are logged; they never stop the loop.
fn spawn_dispatch_loop(
    queue: Arc<RenderQueue>,
    dispatcher: Arc<RenderDispatcher>,
    interval: Duration,
    batch: usize,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // Skip the first immediate tick
        loop {
            ticker.tick().await;
            for job in queue.drain(batch) {
                if let Err(err) = dispatcher.invoke(&job).await {
                    warn!(
                        template = %job.template,
                        id = %job.id,
                        error = %err,
                        "render dispatch failed"
                    );
                }
            }
        }
    })
}

/// Garbage-collects expired render secrets so rows do not accumulate.
fn spawn_secrets_gc_loop(
    secrets: Arc<SecretsManager>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match secrets.flush_expired().await {
                Ok(0) => {}
                Ok(flushed) => {
                    metrics::counter!("specchio_secret_flushed_total").increment(flushed);
                    info!(flushed, "expired render secrets flushed");
                }
                Err(err) => warn!(error = %err, "failed to flush expired secrets"),
            }
        }
    })
}

async fn run_flush(settings: Settings) -> Result<(), InfraError> {
    let repositories = connect_repositories(&settings).await?;
    let options: Arc<dyn OptionsRepo> = Arc::new(repositories.clone());
    let secrets_repo: Arc<dyn SecretsRepo> = Arc::new(repositories.clone());

    let version = VersionCounter::html(options)
        .bump()
        .await
        .map_err(InfraError::database)?;
    let secrets_flushed = SecretsManager::new(secrets_repo)
        .flush()
        .await
        .map_err(InfraError::database)?;

    info!(version, secrets_flushed, "HTML version bumped; all entries stale");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
