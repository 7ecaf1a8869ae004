use orbyt::config::{merge_dotenv, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    merge_dotenv();
    pretty_env_logger::try_init()?;

    let config = Config::from_env(dotenv::vars().collect())?;
    orbyt::serve(config).await
}
