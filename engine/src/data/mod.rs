pub mod aligner;
pub mod csv_parser;
pub mod eastmoney;
pub mod provider;
pub mod sina;

use crate::config::{FetchSettings, SourceSettings};
use crate::error::EngineResult;
use std::sync::Arc;
use std::time::Duration;

use csv_parser::CsvFileProvider;
use eastmoney::EastmoneyProvider;
use provider::{PriceProvider, ProviderChain, RetryPolicy};
use sina::SinaFuturesProvider;

/// Builds the provider chain in the configured order.
pub fn build_chain(settings: &FetchSettings) -> EngineResult<ProviderChain> {
    let timeout = Duration::from_secs(settings.http_timeout_secs);
    let mut providers: Vec<Arc<dyn PriceProvider>> = Vec::with_capacity(settings.sources.len());
    for source in &settings.sources {
        match source {
            SourceSettings::Eastmoney => providers.push(Arc::new(EastmoneyProvider::new(timeout)?)),
            SourceSettings::Sina => providers.push(Arc::new(SinaFuturesProvider::new(timeout)?)),
            SourceSettings::Csv { dir } => providers.push(Arc::new(CsvFileProvider::new(dir.clone()))),
        }
    }
    Ok(ProviderChain::new(providers, RetryPolicy::from(settings)))
}
