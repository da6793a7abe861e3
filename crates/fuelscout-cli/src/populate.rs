//! The `populate` subcommand: a long-running registry sweep.

use std::path::PathBuf;
use std::time::Duration;

use fuelscout_harvester::pacing::Pacing;
use fuelscout_harvester::{Harvester, HarvestOptions, HttpStationSource};

pub async fn run(
    terms: Vec<String>,
    terms_file: Option<PathBuf>,
    max_per_area: Option<usize>,
) -> anyhow::Result<()> {
    let terms = collect_terms(terms, terms_file)?;
    anyhow::ensure!(
        !terms.is_empty(),
        "no area terms supplied; use --terms or --terms-file"
    );

    let config = fuelscout_core::load_app_config()?;
    let pool_config = fuelscout_db::PoolConfig::from_app_config(&config);
    let pool = fuelscout_db::connect_pool(&config.database_url, pool_config).await?;
    fuelscout_db::run_migrations(&pool).await?;

    tracing::info!(terms = terms.len(), "starting registry population sweep");

    let source = HttpStationSource::new(
        config.source_base_url.clone(),
        config.search_timeout_secs,
        config.detail_timeout_secs,
    )?;
    let mut harvester = Harvester::new(
        source,
        Some(pool.clone()),
        Pacing::new(config.harvest_delay_ms, config.harvest_jitter_ms),
        config.empty_streak_threshold,
        Duration::from_secs(config.block_cooldown_secs),
    );

    // No origin: a sweep has no single vantage point, so every coordinate-
    // bearing station is kept and persisted via the harvester's registry
    // write-through.
    let options = HarvestOptions {
        origin: None,
        max_per_area: max_per_area.unwrap_or(config.max_per_area),
        max_distance_km: None,
    };
    let stations = harvester.run(&terms, &options).await?;

    let with_price = stations.iter().filter(|s| s.price_per_unit.is_some()).count();
    tracing::info!(
        resolved = stations.len(),
        with_price,
        "sweep complete; resolved stations persisted to the registry"
    );
    println!(
        "populated {} stations ({} priced) from {} area terms",
        stations.len(),
        with_price,
        terms.len()
    );
    Ok(())
}

fn collect_terms(terms: Vec<String>, terms_file: Option<PathBuf>) -> anyhow::Result<Vec<String>> {
    let mut out: Vec<String> = terms
        .into_iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect();

    if let Some(path) = terms_file {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if !out.iter().any(|t| t == line) {
                out.push(line.to_owned());
            }
        }
    }
    Ok(out)
}
