use anyhow::{Result, anyhow};
use fortum_sync::config::Config;
use fortum_sync::coordinator::{Coordinator, PollingTask, PublicationSchedule};
use fortum_sync::fortum::FortumClient;
use fortum_sync::logging::init_logging;
use fortum_sync::model::ConsumptionRecord;
use fortum_sync::sensor::{CostSensor, EnergySensor, Sensor, format_currency, format_energy};
use fortum_sync::statistics::{InMemoryStore, JsonFileStore, StatisticsImporter, StatisticsStore};
use std::sync::Arc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    init_logging(&config.logging).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("fortum-sync {} starting up", env!("APP_VERSION"));

    let locale = config.fortum.locale()?;
    let schedule = PublicationSchedule::from_config(&config.schedule)?;
    let client = FortumClient::new(&config.fortum, schedule.timezone())?;
    if let Err(e) = client.verify_session().await {
        warn!("Session check failed: {}", e);
    }

    let mut coordinator = Coordinator::new(Box::new(client), schedule, locale.currency());
    if config.statistics.enabled {
        let store: Arc<dyn StatisticsStore> = if config.statistics.store_path.trim().is_empty() {
            info!("Keeping statistics in memory");
            Arc::new(InMemoryStore::new())
        } else {
            Arc::new(JsonFileStore::open(&config.statistics.store_path)?)
        };
        coordinator = coordinator.with_importer(StatisticsImporter::new(&config.statistics, store));
    }

    let energy = EnergySensor::new(&config.statistics.energy_name);
    let cost = CostSensor::new(
        &config.statistics.cost_name,
        locale.currency(),
        &config.statistics.cost_statistic_id,
    );

    let mut ticker = interval(schedule.update_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match coordinator.tick().await {
                    Ok(records) => publish(&energy, &cost, &records),
                    Err(e) => error!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    info!("fortum-sync stopped");
    Ok(())
}

fn publish(energy: &EnergySensor, cost: &CostSensor, records: &[ConsumptionRecord]) {
    info!(
        "{}: {}, {}: {}",
        energy.name(),
        format_energy(energy.native_value(Some(records)), energy.unit()),
        cost.name(),
        format_currency(cost.native_value(Some(records)), cost.unit())
    );
    if let Some(attrs) = energy.attributes(Some(records))
        && let Ok(json) = serde_json::to_string(&attrs)
    {
        debug!("{} attributes: {}", energy.name(), json);
    }
    if let Some(attrs) = cost.attributes(Some(records))
        && let Ok(json) = serde_json::to_string(&attrs)
    {
        debug!("{} attributes: {}", cost.name(), json);
    }
}
