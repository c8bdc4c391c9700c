use crate::{
    config::Config,
    error::{ConfigError, ParseError, TickError},
    normalize::{scale, PRICE_DECIMALS},
    source::PriceSource,
    submitter::Submitter,
    types::{OraclePriceUpdate, PriceObservation},
    utils::unix_now,
};
use std::convert::Infallible;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

/// Validates `config` and relays prices until the process is terminated.
///
/// Returns only when the configuration is rejected, before any tick runs.
pub async fn run<S, T>(config: Config, source: S, submitter: T) -> Result<Infallible, ConfigError>
where
    S: PriceSource,
    T: Submitter,
{
    let relay = Relay::new(config, source, submitter)?;
    Ok(relay.start().await)
}

// --- Relay Implementation ---

/// Drives the fetch, normalize and submit cycle for a single symbol.
#[derive(Debug)]
pub struct Relay<S: PriceSource, T: Submitter> {
    config: Config,
    source: S,
    submitter: T,
}

impl<S: PriceSource, T: Submitter> Relay<S, T> {
    /// Creates a new Relay, rejecting configurations that must not run.
    pub fn new(config: Config, source: S, submitter: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            submitter,
        })
    }

    /// Starts the main relay loop. Never returns.
    ///
    /// The first tick fires one period after start. Each tick is awaited
    /// inline, so a tick that comes due while the previous one is still
    /// running is skipped rather than queued.
    #[instrument(skip(self), name = "relay_loop", fields(symbol = %self.config.symbol))]
    pub async fn start(&self) -> Infallible {
        self.tick_loop().await
    }

    async fn tick_loop(&self) -> Infallible {
        let period = self.config.update_frequency;
        info!(frequency = ?period, "Starting relay loop...");

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut idle_since = Instant::now();

        loop {
            let scheduled = ticker.tick().await;
            // Skip still hands out the first missed tick immediately; a tick
            // that came due while the last iteration was running is dropped.
            if scheduled < idle_since {
                debug!(overdue = ?idle_since - scheduled, "Dropping tick that elapsed during the previous iteration.");
                continue;
            }

            info!("updating prices");
            match self.tick().await {
                Ok(update) => {
                    info!(price = %update.price, timestamp = update.timestamp, "Price update submitted.");
                }
                Err(e) => {
                    error!(kind = e.kind(), error = %e, "Tick failed. Waiting for next tick.");
                }
            }
            idle_since = Instant::now();
        }
    }

    /// Runs one fetch, normalize and submit cycle.
    ///
    /// Each step must succeed before the next one starts; the first failure
    /// ends the tick. Nothing is retried.
    pub async fn tick(&self) -> Result<OraclePriceUpdate, TickError> {
        let observation = self.fetch().await?;
        let update = normalize(&observation)?;

        debug!(price = %update.price, "Submitting price update");
        self.submitter
            .send(update.timestamp, std::slice::from_ref(&update))
            .await
            .map_err(TickError::Submission)?;

        Ok(update)
    }

    async fn fetch(&self) -> Result<PriceObservation, TickError> {
        debug!("Fetching price");
        let raw_price = self
            .source
            .fetch(&self.config.symbol, &self.config.twelvedata_api_key)
            .await?;
        info!(price = %raw_price, "new price");

        Ok(PriceObservation {
            symbol: self.config.symbol.clone(),
            raw_price,
            fetched_at: unix_now(),
        })
    }
}

/// Turns a raw observation into the update submitted on-chain.
fn normalize(observation: &PriceObservation) -> Result<OraclePriceUpdate, ParseError> {
    debug!(raw = %observation.raw_price, "Normalizing price");
    let price = scale(&observation.raw_price, PRICE_DECIMALS)?;
    if price.starts_with('-') {
        return Err(ParseError {
            input: observation.raw_price.clone(),
            reason: "negative price".to_string(),
        });
    }

    Ok(OraclePriceUpdate {
        asset: observation.symbol.clone(),
        price,
        timestamp: observation.fetched_at,
    })
}
