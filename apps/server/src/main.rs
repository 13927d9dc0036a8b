use anyhow::Context;
use evreg::domain::config::ApiConfig;
use evreg::kernel::config::load_config;
use evreg_logger::Logger;
use evreg_server::Server;

/// Usage: `evreg-server [CONFIG_FILE]`. Without a file, `server.toml` is used if present.
fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let cfg: ApiConfig = load_config(path.as_deref()).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_config(env!("CARGO_PKG_NAME"), &cfg.logging)?.init()?;

    let runtime = evreg_runtime::build_runtime(&cfg.runtime)?;
    runtime.block_on(async { Server::builder().config(cfg).build().await?.run().await })
}
