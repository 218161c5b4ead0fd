//! Notion数据库归档

pub mod client;
pub mod page;

pub use client::NotionClient;
pub use page::{NotionPage, build_page, split_text_into_chunks, truncate_text};
