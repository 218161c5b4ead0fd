//! 语音转写

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::TranscriptionConfig;
use crate::error::DeliveryError;

const SERVICE: &str = "Transcription";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// 调用 `/audio/transcriptions` 把音频转成文本
#[derive(Clone)]
pub struct Transcriber {
    http: reqwest::Client,
    config: TranscriptionConfig,
}

impl Transcriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    pub async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, DeliveryError> {
        info!(bytes = audio.len(), file_name, model = %self.config.model, "transcribing audio");

        let part = Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(audio_mime_type(file_name))?;
        let mut form = Form::new()
            .text("model", self.config.model.clone())
            .part("file", part);
        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }

        let url = format!(
            "{}/audio/transcriptions",
            self.config.api_base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
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

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| DeliveryError::UnexpectedResponse {
                service: SERVICE,
                detail: e.to_string(),
            })?;
        debug!(chars = parsed.text.chars().count(), "transcription finished");
        Ok(parsed.text)
    }

    /// 读取本地音频文件并转写
    pub async fn transcribe_file(&self, path: &Path) -> anyhow::Result<String> {
        let audio = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.ogg".to_string());
        Ok(self.transcribe(audio, &file_name).await?)
    }
}

/// 根据扩展名推断上传的MIME类型
pub fn audio_mime_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "ogg" | "oga" | "opus" => "audio/ogg",
        "mp3" | "mpga" | "mpeg" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" | "mp4" => "audio/mp4",
        "webm" => "audio/webm",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_mime_type() {
        assert_eq!(audio_mime_type("voice_42.ogg"), "audio/ogg");
        assert_eq!(audio_mime_type("memo.MP3"), "audio/mpeg");
        assert_eq!(audio_mime_type("call.m4a"), "audio/mp4");
        assert_eq!(audio_mime_type("noext"), "application/octet-stream");
    }
}
