//! Telegram投递与长轮询机器人

pub mod bot;
pub mod client;
pub mod format;
pub mod types;

pub use bot::TelegramBot;
pub use client::TelegramClient;
pub use format::{escape_markdown_v2, format_pipeline_report};
