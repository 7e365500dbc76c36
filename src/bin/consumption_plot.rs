use anyhow::Context;
use hourly_consumption::plot::parse_cli;
use hourly_consumption::{avg_production, read_data, TimeConsumption};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let (config, verbose) = parse_cli();
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!(
        "read data from {} and plot to {}",
        config.csvin.display(),
        config.output.display()
    );
    let readings = read_data(&config.csvin)?;
    let tc = TimeConsumption::from_readings(&readings)
        .with_context(|| format!("could not normalize {}", config.csvin.display()))?;

    info!(
        "{} hourly samples, total consumption {:.1} kWh",
        tc.len(),
        tc.total()
    );
    info!(
        "threshold {:.2} kWh, production estimate {:.2} kWh",
        config.threshold,
        avg_production(config.annual_production)
    );
    let above = tc.hours_above(config.threshold);
    if above > 0 {
        warn!(
            "{} of {} hours above the net-zero threshold",
            above,
            tc.len()
        );
    }

    if let Some(csvout) = &config.csvout {
        tc.to_csv(csvout)?;
    }
    tc.plot_datetime(&config, &config.output)?;
    Ok(())
}
