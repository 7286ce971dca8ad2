//! Run command: activate one engine build and report the result.

use std::path::Path;
use std::time::Instant;

use tandem_core::{EngineKind, ProblemParams};

use crate::colors;
use crate::session::Session;

pub async fn execute(
    config_path: Option<&Path>,
    variant: EngineKind,
    params: ProblemParams,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let session = Session::start(config_path).await?;
    let startup = start.elapsed();

    println!(
        "\n{}Tandem{} - Running {}{}{} engine ({}x{}, {} iterations)\n",
        colors::BOLD,
        colors::RESET,
        colors::CYAN,
        variant,
        colors::RESET,
        params.width,
        params.height,
        params.max_iterations
    );

    let result = session.activate(variant, params).await?;
    println!(
        "{}Completed{} {} bytes in {:.3}s (startup: {:.3}s)",
        colors::GREEN,
        colors::RESET,
        result.len(),
        result.elapsed().as_secs_f64(),
        startup.as_secs_f64()
    );

    if let Some(path) = output {
        std::fs::write(path, result.bytes())
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
        println!("Wrote raw RGBA to {}", path.display());
    }

    session.close().await
}
