use logcast::{
    arguments::{is_help_requested, print_help},
    logger::{self, LogTag},
    webserver::ws::get_hub,
};

/// Main entry point for logcast
///
/// Streams the producer's log lines to every connected WebSocket client
/// until interrupted. Exits non-zero when startup fails or the producer
/// stream ends.
#[tokio::main]
async fn main() {
    logger::init();

    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "logcast starting up");

    let result = logcast::run::run().await;
    report_hub_totals();

    match result {
        Ok(()) => {
            logger::info(LogTag::System, "logcast exited cleanly");
            logger::flush();
        }
        Err(e) => {
            logger::error(LogTag::System, &e);
            logger::flush();
            std::process::exit(1);
        }
    }
}

/// Final delivery counters, if startup got as far as creating the hub
fn report_hub_totals() {
    let Some(hub) = get_hub() else {
        return;
    };

    let snapshot = hub.metrics().snapshot();
    logger::info(
        LogTag::System,
        &format!(
            "Stopped (published={}, deliveries={}, failures={}, send_timeouts={})",
            snapshot.payloads_published,
            snapshot.deliveries,
            snapshot.delivery_failures,
            snapshot.send_timeouts
        ),
    );
}
