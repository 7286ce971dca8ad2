//! Compare command: run both builds on the same problem.

use std::path::Path;

use tandem_core::{EngineKind, ProblemParams};

use crate::colors;
use crate::session::Session;

pub async fn execute(config_path: Option<&Path>, params: ProblemParams) -> anyhow::Result<()> {
    let session = Session::start(config_path).await?;
    if !session.handlers().supports_accelerated() {
        session.close().await?;
        anyhow::bail!("accelerated engine is not available on this host; nothing to compare");
    }

    println!(
        "\n{}Tandem{} - Comparing builds ({}x{}, {} iterations)\n",
        colors::BOLD,
        colors::RESET,
        params.width,
        params.height,
        params.max_iterations
    );

    let standard = session.activate(EngineKind::Standard, params).await?;
    let accelerated = session.activate(EngineKind::Accelerated, params).await?;

    for result in [&standard, &accelerated] {
        println!(
            "  {}{:<12}{} {:.3}s",
            colors::CYAN,
            result.variant().handler_name(),
            colors::RESET,
            result.elapsed().as_secs_f64()
        );
    }

    let speedup = standard.elapsed().as_secs_f64() / accelerated.elapsed().as_secs_f64().max(1e-9);
    println!("  Speedup:     {:.2}x", speedup);

    if standard.bytes() == accelerated.bytes() {
        println!("\n{}Payloads identical{} ({} bytes)", colors::GREEN, colors::RESET, standard.len());
        session.close().await
    } else {
        session.close().await?;
        anyhow::bail!("payloads differ ({} vs {} bytes)", standard.len(), accelerated.len())
    }
}
