//! The social network service.

use social_network::{
    infra::{config, logging},
    lifecycle::startup,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = config::load_config()?;
    let _guard = logging::init_logging(config.log_dir.as_deref());
    startup::run(config).await
}
