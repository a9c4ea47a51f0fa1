mod bootstrap;
mod report;

use anyhow::Result;
use lea_core::settings::Settings;
use lea_data::analysis::{analyze_logs, AnalysisOptions};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("LEA analyzer v{} starting", env!("CARGO_PKG_VERSION"));

    let options = AnalysisOptions::from_settings(&settings)?;
    tracing::info!(
        "Log path: {}, timezone: {}, buckets: {} / {}",
        options.log_path.display(),
        options.timezone.name(),
        options.bucket_size,
        options.rebuild_bucket_size
    );

    let result = analyze_logs(&options)?;

    if settings.json {
        println!("{}", report::to_json(&result)?);
    } else {
        report::log_summary(&result);
    }

    Ok(())
}
