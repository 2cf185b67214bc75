use std::sync::Arc;
use tradetrace::datasource::{CoinGeckoDataSource, EtherscanDataSource, LedgerDataSource};
use tradetrace::domain::{Decimal, TokenSymbol, UnixTime};
use tradetrace::engine::PortfolioWindow;
use tradetrace::{AppError, Config, PriceLoader, SnapshotStore, Watcher, WindowLoader};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let ledger: Arc<dyn LedgerDataSource> = Arc::new(EtherscanDataSource::new(
        config.etherscan_api_url.clone(),
        config.etherscan_api_key.clone(),
    ));
    let mut loader = WindowLoader::new(ledger);
    if let Some(dir) = &config.snapshot_dir {
        loader = loader.with_store(SnapshotStore::new(dir));
    }

    let start = config.window.start();
    let now = UnixTime::now();
    let window = loader.load(&config.watch_address, start, now).await?;
    print_summary(&window, &config.base_tokens);

    if config.value_trades {
        let prices = PriceLoader::new(Arc::new(CoinGeckoDataSource::new(
            config.coingecko_api_url.clone(),
        )));
        for token in window.non_base_tokens(&config.base_tokens) {
            let Some(priced) = prices.value_trades(&window, &token).await? else {
                continue;
            };
            let unpriced = priced.iter().filter(|p| p.usd_value.is_none()).count();
            let total: Decimal = priced.iter().filter_map(|p| p.usd_value).sum();
            println!(
                "{}: net USD flow {} over {} trades ({} unpriced)",
                token,
                total,
                priced.len(),
                unpriced
            );
        }
    }

    Watcher::new(
        loader,
        config.watch_address.clone(),
        config.base_tokens.clone(),
        config.poll_interval,
        now,
    )
    .resume_after(&window)
    .run()
    .await;

    Ok(())
}

fn print_summary(window: &PortfolioWindow, base_tokens: &[TokenSymbol]) {
    println!(
        "{}: {} transfers in [{}, {}]",
        window.address(),
        window.len(),
        window.start(),
        window.end()
    );

    for token in window.non_base_tokens(base_tokens) {
        let moments = window.moments(&token);
        println!(
            "{} volume {} ({}) std dev {:.4} skew {:.4}",
            token,
            window.volume_for(&token),
            window.classify(&token),
            moments.standard_deviation,
            moments.skew
        );
        match window.reconstructed_trades(&token) {
            Ok(trades) => {
                for trade in trades {
                    println!("  {}", trade);
                }
            }
            Err(e) => tracing::warn!("Cannot reconstruct {} trades: {}", token, e),
        }
    }
}
