//! Probe command: report what the host supports without loading anything.

use std::path::Path;

use tandem_core::{CapabilityFlags, HostProbe, hardware_concurrency};

use crate::colors;
use crate::session::load_config;

pub async fn execute(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let flags = CapabilityFlags::detect(&HostProbe::forced(config.threads)).await;
    let concurrency = hardware_concurrency();

    println!("\n{}Tandem{} - Host capabilities\n", colors::BOLD, colors::RESET);
    println!(
        "  Parallel execution:   {}{}",
        colors::yes_no(flags.threads()),
        if config.threads.is_some() { " (forced)" } else { "" }
    );
    println!("  Hardware concurrency: {}", concurrency);
    println!(
        "  Pool size:            {}",
        config.worker_count.unwrap_or(concurrency)
    );
    for kind in tandem_core::EngineKind::ALL {
        let source = match config.module_path(kind) {
            Some(path) => path.display().to_string(),
            None => "built-in".to_string(),
        };
        println!("  {:<22}{}{}{}", format!("{} module:", kind), colors::DIM, source, colors::RESET);
    }
    Ok(())
}
