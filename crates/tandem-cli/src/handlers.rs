//! Handlers command: show the published registry.

use std::path::Path;

use crate::colors;
use crate::session::Session;

pub async fn execute(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let session = Session::start(config_path).await?;
    let handlers = session.handlers().clone();

    if json {
        println!("{}", serde_json::to_string_pretty(handlers.manifest())?);
        return session.close().await;
    }

    println!("\n{}Tandem{} - Handlers\n", colors::BOLD, colors::RESET);
    for info in handlers.info() {
        let state = session
            .dispatcher()
            .state(&info.name)
            .map(|s| format!("{:?}", s).to_lowercase())
            .unwrap_or_default();
        let workers = info
            .worker_count
            .map(|n| format!(", {} workers", n))
            .unwrap_or_default();
        println!(
            "  {}{:<12}{} {}{}{} ({}{})",
            colors::CYAN,
            info.name,
            colors::RESET,
            colors::GREEN,
            state,
            colors::RESET,
            info.engine,
            workers
        );
    }

    for missing in handlers.unavailable() {
        let color = if missing.fault { colors::RED } else { colors::YELLOW };
        println!(
            "  {}{:<12}{} {}unavailable{}: {}",
            colors::CYAN,
            missing.kind.handler_name(),
            colors::RESET,
            color,
            colors::RESET,
            missing.reason
        );
    }

    println!(
        "\n  Accelerated: {}",
        colors::yes_no(handlers.supports_accelerated())
    );
    session.close().await
}
