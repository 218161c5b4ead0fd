use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::generator::intake::types::PipelineResult;

pub mod report;

pub use report::render_markdown_report;

/// 本地保存后的文件路径
#[derive(Debug, Clone, PartialEq)]
pub struct SavedOutputs {
    pub json_path: PathBuf,
    pub markdown_path: Option<PathBuf>,
}

pub trait Outlet {
    async fn save(&self, result: &PipelineResult, input: &str) -> Result<SavedOutputs>;
}

/// 把运行结果写入输出目录
pub struct DiskOutlet {
    output_dir: PathBuf,
    save_markdown: bool,
}

impl DiskOutlet {
    pub fn new(output_dir: impl Into<PathBuf>, save_markdown: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            save_markdown,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.output_path, config.save_markdown)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_at(
        &self,
        result: &PipelineResult,
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<SavedOutputs> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir).with_context(|| {
                format!("无法创建输出目录: {}", self.output_dir.display())
            })?;
            println!("📁 已创建输出目录: {}", self.output_dir.display());
        }

        let stamp = file_timestamp(now);

        let json_path = self.output_dir.join(format!("agent-output-{}.json", stamp));
        fs::write(&json_path, serde_json::to_string_pretty(result)?)
            .with_context(|| format!("写入失败: {}", json_path.display()))?;
        println!("💾 结果已保存: {}", json_path.display());

        let markdown_path = if self.save_markdown {
            let path = self.output_dir.join(format!("agent-report-{}.md", stamp));
            fs::write(&path, render_markdown_report(result, input, now))
                .with_context(|| format!("写入失败: {}", path.display()))?;
            println!("📄 Markdown报告已保存: {}", path.display());
            Some(path)
        } else {
            None
        };

        info!(json = %json_path.display(), markdown = markdown_path.is_some(), "outputs saved");

        Ok(SavedOutputs {
            json_path,
            markdown_path,
        })
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, result: &PipelineResult, input: &str) -> Result<SavedOutputs> {
        self.write_at(result, input, Utc::now())
    }
}

/// ISO时间戳，冒号和小数点替换为短横线以便用作文件名
pub fn file_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}
