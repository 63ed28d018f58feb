#![forbid(unsafe_code)]

use std::sync::Arc;

use dotenvy::dotenv;
use log::info;
use tournament::{config::ConfigError, web, App, Config};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Could not load configuration")]
    LoadConfig(#[from] ConfigError),

    #[error("Could not start tournament")]
    Start(#[from] tournament::Error),

    #[error("Could not compile templates")]
    Templates(#[from] tera::Error),
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    pretty_env_logger::init_timed();
    dotenv().ok();

    Ok(main_().await?)
}

async fn main_() -> Result<(), Error> {
    let config = Config::load()?;
    let bind = config.bind;

    let app = Arc::new(App::init(config).await?);
    let routes = web::routes(app)?;

    info!("Listening on http://{bind}");
    warp::serve(routes).run(bind).await;

    Ok(())
}
