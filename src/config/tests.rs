#[cfg(test)]
mod tests {
    use crate::config::{Config, LLMConfig, LLMProvider, NotionConfig, TelegramConfig};
    use crate::error::ConfigError;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn blank_config() -> Config {
        let mut config = Config::default();
        config.llm.api_key = String::new();
        config.telegram.api_key = String::new();
        config.telegram.chat_id = None;
        config.notion.api_key = String::new();
        config.notion.database_id = String::new();
        config.transcription.api_key = String::new();
        config
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.output_path, PathBuf::from("./output"));
        assert!(config.save_markdown);
        assert!(!config.verbose);
    }

    #[test]
    fn test_llm_config_default() {
        let llm = LLMConfig::default();

        assert_eq!(llm.provider, LLMProvider::OpenAI);
        assert_eq!(llm.api_base_url, "https://api.openai.com/v1");
        assert_eq!(llm.model_efficient, "gpt-5");
        assert_eq!(llm.model_powerful, "gpt-5");
        assert!(llm.temperature.is_none());
        assert_eq!(llm.timeout_seconds, 300);
        assert!(llm.store);
    }

    #[test]
    fn test_sink_config_defaults() {
        let telegram = TelegramConfig::default();
        assert_eq!(telegram.api_base_url, "https://api.telegram.org");
        assert_eq!(telegram.poll_timeout_seconds, 30);
        assert_eq!(telegram.max_message_length, 4096);

        let notion = NotionConfig::default();
        assert_eq!(notion.api_base_url, "https://api.notion.com/v1");
        assert_eq!(notion.retry_attempts, 3);
        assert_eq!(notion.retry_delay_ms, 1000);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!(
            "openai".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenAI
        );
        assert_eq!(
            "OpenRouter".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenRouter
        );
        assert_eq!(
            "anthropic".parse::<LLMProvider>().unwrap(),
            LLMProvider::Anthropic
        );
        assert_eq!(
            "deepseek".parse::<LLMProvider>().unwrap(),
            LLMProvider::DeepSeek
        );
        assert_eq!(
            "ollama".parse::<LLMProvider>().unwrap(),
            LLMProvider::Ollama
        );

        assert_eq!(
            "invalid".parse::<LLMProvider>(),
            Err(ConfigError::UnknownProvider("invalid".to_string()))
        );
    }

    #[test]
    fn test_llm_provider_display() {
        assert_eq!(LLMProvider::OpenAI.to_string(), "openai");
        assert_eq!(LLMProvider::OpenRouter.to_string(), "openrouter");
        assert_eq!(LLMProvider::Anthropic.to_string(), "anthropic");
        assert_eq!(LLMProvider::DeepSeek.to_string(), "deepseek");
        assert_eq!(LLMProvider::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_config_from_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("voicefast.toml");
        let content = r#"
output_path = "/tmp/intake"
save_markdown = false

[llm]
provider = "anthropic"
api_key = "sk-test"
model_efficient = "claude-haiku"

[notion]
database_id = "db-123"
retry_attempts = 5
"#;
        std::fs::write(&config_path, content).unwrap();

        let config = Config::from_file(&config_path).unwrap();

        assert_eq!(config.output_path, PathBuf::from("/tmp/intake"));
        assert!(!config.save_markdown);
        assert_eq!(config.llm.provider, LLMProvider::Anthropic);
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.model_efficient, "claude-haiku");
        // 未出现的字段回落到默认值
        assert_eq!(config.llm.model_powerful, "gpt-5");
        assert_eq!(config.notion.database_id, "db-123");
        assert_eq!(config.notion.retry_attempts, 5);
        assert_eq!(config.notion.retry_delay_ms, 1000);
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = Config::from_file(&PathBuf::from("/nonexistent/voicefast.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_from_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("voicefast.toml");
        std::fs::write(&config_path, "llm = [not valid").unwrap();

        assert!(Config::from_file(&config_path).is_err());
    }

    #[test]
    fn test_require_llm() {
        let mut config = blank_config();
        assert_eq!(
            config.require_llm(),
            Err(ConfigError::MissingCredential {
                key: "llm.api_key",
                env: "OPENAI_API_KEY",
            })
        );

        config.llm.provider = LLMProvider::Ollama;
        assert!(config.require_llm().is_ok());

        config.llm.provider = LLMProvider::OpenAI;
        config.llm.api_key = "sk-test".to_string();
        assert!(config.require_llm().is_ok());
    }

    #[test]
    fn test_require_telegram_chat() {
        let mut config = blank_config();
        assert!(matches!(
            config.require_telegram_chat(),
            Err(ConfigError::MissingCredential { env: "TELEGRAM_API_KEY", .. })
        ));

        config.telegram.api_key = "123:abc".to_string();
        assert!(config.require_telegram_bot().is_ok());
        assert!(matches!(
            config.require_telegram_chat(),
            Err(ConfigError::MissingCredential { env: "TELEGRAM_CHAT_ID", .. })
        ));

        config.telegram.chat_id = Some("42".to_string());
        assert_eq!(config.require_telegram_chat(), Ok("42"));
    }

    #[test]
    fn test_require_notion() {
        let mut config = blank_config();
        assert!(matches!(
            config.require_notion(),
            Err(ConfigError::MissingCredential { env: "NOTION_API_KEY", .. })
        ));

        config.notion.api_key = "secret".to_string();
        assert!(matches!(
            config.require_notion(),
            Err(ConfigError::MissingCredential { env: "NOTION_DATABASE_ID", .. })
        ));

        config.notion.database_id = "db".to_string();
        assert!(config.require_notion().is_ok());
    }

    #[test]
    fn test_missing_credential_message_names_env_var() {
        let err = blank_config().require_transcription().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("OPENAI_API_KEY"));
        assert!(message.contains("transcription.api_key"));
    }
}
