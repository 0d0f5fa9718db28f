/// Process orchestration
///
/// Startup order: configuration, hub, producer feed, webserver. The process
/// then runs until a shutdown signal, a fatal feed end, or a server failure,
/// and tears everything down in reverse.
use std::time::Duration;
use tokio::io::BufReader;

use crate::{
    arguments::{
        get_config_path_override, get_host_override, get_port_override, get_root_override,
        validate_port_argument,
    },
    config::{self, Config, CONFIG_FILE_PATH},
    errors::FeedError,
    feed::{pump_lines, spawn_producer, FeedSummary},
    logger::{self, LogTag},
    webserver::{self, ws::init_hub},
};

/// How long each component gets to wind down before it is abandoned
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main entry point
pub async fn run() -> Result<(), String> {
    let config = load_effective_config()?;

    logger::info(
        LogTag::Config,
        &format!(
            "Configuration: bind={} ws_path={} queue_capacity={} send_timeout={}ms",
            config.server.bind_address(),
            config.server.ws_path,
            config.hub.queue_capacity,
            config.hub.send_timeout_ms
        ),
    );

    // 1. Hub
    let hub = init_hub(&config.hub).map_err(|e| format!("Failed to create hub: {}", e))?;
    let mut hub_task = tokio::spawn(hub.clone().run());

    // 2. Producer feed
    let mut producer = spawn_producer(&config.feed).map_err(|e| e.to_string())?;
    let stdout = producer.take_stdout().map_err(|e| e.to_string())?;
    let feed_hub = hub.clone();
    let mut feed_task =
        tokio::spawn(async move { pump_lines(BufReader::new(stdout), &feed_hub).await });

    // 3. Webserver
    let server_hub = hub.clone();
    let server_config = config.server.clone();
    let mut server_task =
        tokio::spawn(async move { webserver::start_server(server_hub, &server_config).await });

    logger::info(LogTag::System, "logcast started");

    // 4. Wait
    let mut feed_finished = false;
    let mut server_finished = false;
    let outcome = tokio::select! {
        signal = wait_for_shutdown_signal() => signal,

        result = &mut feed_task => {
            feed_finished = true;
            feed_outcome(result)
        }

        result = &mut server_task => {
            server_finished = true;
            match result {
                Ok(Ok(())) => Err("Webserver exited unexpectedly".to_string()),
                Ok(Err(e)) => Err(format!("Webserver failed: {:#}", e)),
                Err(e) => Err(format!("Webserver task panicked: {}", e)),
            }
        }
    };

    // 5. Teardown
    logger::info(LogTag::System, "Shutting down");

    producer.kill().await;
    webserver::shutdown();
    hub.shutdown();

    if !feed_finished && tokio::time::timeout(SHUTDOWN_GRACE, &mut feed_task).await.is_err() {
        logger::warning(LogTag::Feed, "Feed did not stop in time, aborting");
        feed_task.abort();
    }
    if !server_finished && tokio::time::timeout(SHUTDOWN_GRACE, &mut server_task).await.is_err() {
        logger::warning(LogTag::Webserver, "Webserver did not stop in time, aborting");
        server_task.abort();
    }
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut hub_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => logger::warning(LogTag::Hub, &format!("Hub stopped with error: {}", e)),
        Ok(Err(e)) => logger::error(LogTag::Hub, &format!("Hub task panicked: {}", e)),
        Err(_) => {
            logger::warning(LogTag::Hub, "Hub did not drain in time, aborting");
            hub_task.abort();
        }
    }

    outcome
}

pub(crate) fn feed_outcome(
    result: Result<Result<FeedSummary, FeedError>, tokio::task::JoinError>,
) -> Result<(), String> {
    match result {
        Ok(Ok(summary)) => {
            logger::info(
                LogTag::Feed,
                &format!("Feed stopped (published={})", summary.published),
            );
            Ok(())
        }
        Ok(Err(e)) => Err(format!("Producer feed failed: {}", e)),
        Err(e) => Err(format!("Feed task panicked: {}", e)),
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Load the config file, apply command-line overrides and validate
fn load_effective_config() -> Result<Config, String> {
    validate_port_argument()?;

    let path = get_config_path_override().unwrap_or_else(|| CONFIG_FILE_PATH.to_string());
    config::load_config_from_path(&path)?;

    config::update_config(|cfg| {
        apply_overrides(
            cfg,
            get_host_override(),
            get_port_override(),
            get_root_override(),
        )
    });

    let effective = config::get_config_clone();
    effective
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;
    Ok(effective)
}

fn apply_overrides(
    config: &mut Config,
    host: Option<String>,
    port: Option<u16>,
    root: Option<String>,
) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(root) = root {
        config.server.static_root = root;
    }
}

// =============================================================================
// SIGNALS
// =============================================================================

/// Wait for shutdown signal (Ctrl+C, SIGTERM on Unix)
async fn wait_for_shutdown_signal() -> Result<(), String> {
    #[cfg(unix)]
    let signal_name = {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).map_err(|e| format!("Failed to bind SIGINT: {}", e))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| format!("Failed to bind SIGTERM: {}", e))?;

        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    };

    #[cfg(not(unix))]
    let signal_name = {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;
        "CTRL_C"
    };

    logger::warning(
        LogTag::System,
        &format!(
            "Shutdown signal received ({}). Press Ctrl+C again to force exit.",
            signal_name
        ),
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::error(LogTag::System, "Second Ctrl+C detected, forcing exit");
            std::process::exit(130);
        }
    });

    Ok(())
}
