use portdrop::{Config, Service};
use tokio::net::TcpListener;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = start() {
        log::error!("portdrop stopped: {}", err);
        std::process::exit(1);
    }
}

fn start() -> portdrop::Result<()> {
    let config = Config::from_env()?;
    std::fs::create_dir_all(config.get_upload_dir())?;
    log::info!("storing uploads in {}", config.get_upload_dir().display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.get_workers())
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let listener = TcpListener::bind(config.get_addr()).await?;
        portdrop::run(listener, Service::new(config)).await
    })
}
