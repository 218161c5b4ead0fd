use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use crate::config::TelegramConfig;
use crate::error::DeliveryError;
use crate::generator::intake::types::PipelineResult;
use crate::telegram::format::{fit_message, format_pipeline_report};
use crate::telegram::types::{ApiResponse, TelegramFile, Update};

const SERVICE: &str = "Telegram";

/// Bot API 客户端
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base_url: String,
    token: String,
    max_message_length: usize,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_key.clone(),
            max_message_length: config.max_message_length,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base_url, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DeliveryError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DeliveryError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| DeliveryError::UnexpectedResponse {
                service: SERVICE,
                detail: e.to_string(),
            })?;
        if !envelope.ok {
            return Err(DeliveryError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body: envelope.description.unwrap_or(body),
            });
        }
        envelope
            .result
            .ok_or_else(|| DeliveryError::UnexpectedResponse {
                service: SERVICE,
                detail: "response has no result".to_string(),
            })
    }

    /// 发送一条MarkdownV2消息，超长部分截断
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let text = fit_message(text, self.max_message_length);
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
            "disable_web_page_preview": true,
        });
        let _: serde_json::Value = self
            .call(self.http.post(self.method_url("sendMessage")).json(&payload))
            .await?;
        debug!(chat_id, chars = text.chars().count(), "telegram message sent");
        Ok(())
    }

    /// 发送流水线结果报告
    pub async fn send_report(&self, chat_id: &str, result: &PipelineResult) -> Result<(), DeliveryError> {
        let message = format_pipeline_report(result, chrono::Utc::now(), self.max_message_length);
        self.send_message(chat_id, &message).await?;
        info!(chat_id, "report delivered to telegram");
        Ok(())
    }

    /// 长轮询获取更新
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_seconds: u64,
    ) -> Result<Vec<Update>, DeliveryError> {
        let mut query = vec![("timeout", timeout_seconds.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        self.call(self.http.get(self.method_url("getUpdates")).query(&query))
            .await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile, DeliveryError> {
        self.call(
            self.http
                .get(self.method_url("getFile"))
                .query(&[("file_id", file_id)]),
        )
        .await
    }

    /// 按 file_id 下载文件内容
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, DeliveryError> {
        let file = self.get_file(file_id).await?;
        let file_path = file.file_path.ok_or_else(|| DeliveryError::UnexpectedResponse {
            service: SERVICE,
            detail: format!("file {} has no file_path", file_id),
        })?;

        let response = self.http.get(self.file_url(&file_path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
