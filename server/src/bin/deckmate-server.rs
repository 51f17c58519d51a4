#![warn(rust_2018_idioms)]

use std::str::FromStr;

use flexi_logger::{LogSpecBuilder, LoggerHandle};
use log::{error, info, LevelFilter};
use tokio::sync::watch;

use deckmate_server::{run, settings};

fn main() -> anyhow::Result<()> {
    let settings = settings::load()?;
    let _logger = setup_logger(&settings.logging)?;
    let shutdown_rx = setup_signal()?;
    let runtime = setup_runtime(&settings.runtime)?;

    runtime.block_on(async move {
        let server = tokio::spawn(async move {
            match run(settings.server, settings.relay, shutdown_rx).await {
                Ok(stats) => info!(
                    "served {} connections in total",
                    stats.total_accepted_connections
                ),
                Err(e) => error!("server stopped: {}", e),
            }
        });
        if let Err(e) = server.await {
            error!("server task: {}", e);
        }
    });
    info!("good-bye, world!");
    Ok(())
}

fn setup_logger(l: &settings::Logging) -> anyhow::Result<LoggerHandle> {
    let mut spec_builder = LogSpecBuilder::new();
    spec_builder.default(LevelFilter::from_str(&l.level)?);
    let spec = spec_builder.build();
    let handle = flexi_logger::Logger::with(spec)
        .format(flexi_logger::default_format)
        .start()?;
    Ok(handle)
}

fn setup_signal() -> anyhow::Result<watch::Receiver<bool>> {
    let (signal_tx, signal_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        info!("received interrupt signal");
        signal_tx.send(true).ok();
    })?;
    Ok(signal_rx)
}

fn setup_runtime(r: &settings::Runtime) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = if r.threaded {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.worker_threads(r.worker_threads);
        builder
    } else {
        tokio::runtime::Builder::new_current_thread()
    };
    builder.enable_all().thread_name(&r.thread_name);
    Ok(builder.build()?)
}
