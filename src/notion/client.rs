use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::NotionConfig;
use crate::error::DeliveryError;
use crate::generator::intake::types::{InputSource, PipelineResult};
use crate::notion::page::build_page;

const SERVICE: &str = "Notion";

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

/// Notion接口客户端
#[derive(Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(config: &NotionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", &self.config.notion_version)
    }

    /// 在数据库中创建一页，返回页面链接
    pub async fn create_page(
        &self,
        result: &PipelineResult,
        source: InputSource,
        local_file: Option<&str>,
    ) -> Result<String, DeliveryError> {
        let page = build_page(result, source, local_file, Utc::now());
        let payload = json!({
            "parent": { "database_id": self.config.database_id },
            "properties": page.properties,
            "children": page.children,
        });

        let response = self
            .authorized(self.http.post(self.url("pages")))
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DeliveryError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedPage =
            serde_json::from_str(&body).map_err(|e| DeliveryError::UnexpectedResponse {
                service: SERVICE,
                detail: e.to_string(),
            })?;
        Ok(page_url(&created.id))
    }

    /// 带线性退避的重试，全部失败时返回 None
    pub async fn save_with_retry(
        &self,
        result: &PipelineResult,
        source: InputSource,
        local_file: Option<&str>,
    ) -> Option<String> {
        let max_attempts = self.config.retry_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.create_page(result, source, local_file).await {
                Ok(url) => {
                    info!(attempt, max_attempts, url = %url, "saved to notion");
                    return Some(url);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, "notion save attempt failed: {}", e);
                    if attempt < max_attempts {
                        let delay = retry_delay(self.config.retry_delay_ms, attempt);
                        info!(delay_ms = delay.as_millis() as u64, "retrying notion save");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        error!(max_attempts, "all notion save attempts failed");
        None
    }

    /// 检查数据库是否可访问
    pub async fn check_connection(&self) -> bool {
        let path = format!("databases/{}", self.config.database_id);
        let response = self.authorized(self.http.get(self.url(&path))).send().await;
        match response {
            Ok(response) if response.status().is_success() => {
                info!(database_id = %self.config.database_id, "notion connection ok");
                true
            }
            Ok(response) => {
                error!(status = response.status().as_u16(), "notion connection failed");
                false
            }
            Err(e) => {
                error!("notion connection failed: {}", e);
                false
            }
        }
    }
}

/// 第n次失败后的等待时间：基础延迟乘以n
pub fn retry_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_delay_ms.saturating_mul(u64::from(attempt)))
}

/// 页面链接：去掉id中的短横线
pub fn page_url(page_id: &str) -> String {
    format!("https://www.notion.so/{}", page_id.replace('-', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::intake::types::ExtractionRecord;

    #[test]
    fn test_page_url_strips_dashes() {
        assert_eq!(
            page_url("1a2b3c4d-0000-1111-2222-333344445555"),
            "https://www.notion.so/1a2b3c4d000011112222333344445555"
        );
    }

    #[test]
    fn test_retry_delay_is_linear() {
        assert_eq!(retry_delay(1000, 1), Duration::from_millis(1000));
        assert_eq!(retry_delay(1000, 2), Duration::from_millis(2000));
        assert_eq!(retry_delay(1000, 3), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_save_with_retry_gives_up_with_none() {
        // 不可达的地址，每次都会连接失败
        let config = NotionConfig {
            api_key: "secret".to_string(),
            database_id: "db".to_string(),
            api_base_url: "http://127.0.0.1:1".to_string(),
            retry_attempts: 3,
            retry_delay_ms: 1,
            ..Default::default()
        };
        let client = NotionClient::new(&config);
        let result = PipelineResult::assemble(
            ExtractionRecord::with_problems(vec!["x".to_string()]),
            "p".into(),
            "r".into(),
        );

        let url = client
            .save_with_retry(&result, InputSource::Text, None)
            .await;
        assert!(url.is_none());
    }
}
