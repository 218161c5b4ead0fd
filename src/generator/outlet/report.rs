//! 人类可读的Markdown报告

use chrono::{DateTime, Utc};

use crate::generator::intake::types::PipelineResult;

const NOT_PROVIDED: &str = "Not provided";
const NOT_SPECIFIED: &str = "Not specified";

fn or_default<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

fn or_default_str<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

/// 渲染完整报告，包括原始输入、联系人、问题、约束、优先级、候选方案和调研结果
pub fn render_markdown_report(result: &PipelineResult, input: &str, now: DateTime<Utc>) -> String {
    let report = &result.full_report;
    let mut md = String::new();

    md.push_str("# VoiceFast Agent Report\n\n");
    md.push_str(&format!(
        "**Generated:** {}\n\n---\n\n",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    md.push_str(&format!("## 📝 Original Input\n\n```\n{}\n```\n\n---\n\n", input));

    md.push_str("## 👤 Contact Information\n\n");
    md.push_str(&format!("- **Name:** {}\n", or_default(&report.contact_name, NOT_PROVIDED)));
    md.push_str(&format!("- **Handle:** {}\n", or_default(&report.contact_handle, NOT_PROVIDED)));
    md.push_str(&format!(
        "- **Platform:** {}\n",
        report
            .contact_platform
            .map(|p| p.to_string())
            .unwrap_or_else(|| NOT_PROVIDED.to_string())
    ));
    md.push_str(&format!("- **Company:** {}\n\n---\n\n", or_default(&report.company, NOT_PROVIDED)));

    md.push_str("## 🚨 Problems Identified\n\n");
    if report.problems.is_empty() {
        md.push_str("No problems identified\n");
    } else {
        for (i, problem) in report.problems.iter().enumerate() {
            md.push_str(&format!("{}. {}\n", i + 1, problem));
        }
    }
    md.push_str("\n---\n\n");

    md.push_str("## 📋 Constraints\n\n");
    match &report.constraints {
        Some(c) => {
            md.push_str(&format!("- **Budget:** {}\n", or_default(&c.budget, NOT_SPECIFIED)));
            md.push_str(&format!("- **Deadline:** {}\n", or_default(&c.deadline, NOT_SPECIFIED)));
            md.push_str(&format!("- **Team Size:** {}\n", or_default(&c.team_size, NOT_SPECIFIED)));
            md.push_str(&format!("- **Tech Stack:** {}\n", or_default(&c.stack, NOT_SPECIFIED)));
        }
        None => md.push_str("No constraints provided\n"),
    }
    md.push_str("\n---\n\n");

    md.push_str("## 🎯 Priorities\n\n");
    if report.priorities().is_empty() {
        md.push_str("No priorities identified\n");
    } else {
        let sections: Vec<String> = report
            .priorities()
            .iter()
            .enumerate()
            .map(|(i, p)| {
                format!(
                    "### Priority {}\n- **Summary:** {}\n- **Impact:** {}/10\n- **Effort:** {}/10\n",
                    i + 1,
                    p.summary,
                    p.impact,
                    p.effort
                )
            })
            .collect();
        md.push_str(&sections.join("\n"));
    }
    md.push_str("\n---\n\n");

    md.push_str("## 🔍 Research Items\n\n");
    if report.research_items().is_empty() {
        md.push_str("No research items generated\n");
    } else {
        let sections: Vec<String> = report
            .research_items()
            .iter()
            .enumerate()
            .map(|(i, item)| {
                format!(
                    "### {}. {}\n\n- **URL:** {}\n- **Why Relevant:** {}\n- **Impact:** {}/10\n- **Effort:** {}/10\n",
                    i + 1,
                    item.title,
                    item.url,
                    item.why_relevant,
                    item.impact,
                    item.effort
                )
            })
            .collect();
        md.push_str(&sections.join("\n"));
    }
    md.push_str("\n---\n\n");

    md.push_str(&format!(
        "## 📊 Search Prompt Generated\n\n```\n{}\n```\n\n---\n\n",
        or_default_str(&result.search_prompt, "No search prompt generated")
    ));
    md.push_str(&format!(
        "## 🌐 Web Search Results\n\n```\n{}\n```\n\n---\n\n",
        or_default_str(&result.web_search_results, "No web search results")
    ));
    md.push_str(&format!(
        "## 📝 Full Report\n\n{}\n\n---\n\n",
        or_default(&report.report_markdown, "No report markdown generated")
    ));

    md.push_str("*Generated by VoiceFast Agent*\n");
    md
}
