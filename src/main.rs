use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use voicefast_rs::cli::{Args, Command};
use voicefast_rs::config::Config;
use voicefast_rs::generator::workflow::launch;
use voicefast_rs::notion::NotionClient;
use voicefast_rs::telegram::{TelegramBot, bot::list_chat_ids};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "voicefast_rs=debug" } else { "voicefast_rs=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn check_notion(config: &Config) -> Result<()> {
    config.require_notion()?;
    if NotionClient::new(&config.notion).check_connection().await {
        println!("✅ Notion连接正常，数据库: {}", config.notion.database_id);
        Ok(())
    } else {
        anyhow::bail!("❌ 无法访问Notion数据库 {}", config.notion.database_id)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 不存在时忽略
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let command = args.command.clone();
    let config = args.into_config()?;
    init_tracing(config.verbose);

    match command {
        Command::Run(run) => {
            let (input, options) = run.request();
            launch(&config, input, options).await
        }
        Command::Bot => TelegramBot::new(config)?.run().await,
        Command::ChatId => list_chat_ids(&config).await,
        Command::CheckNotion => check_notion(&config).await,
    }
}
