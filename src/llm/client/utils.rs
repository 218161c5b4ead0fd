use rig::OneOrMany;
use rig::completion::{AssistantContent, Message};
use rig::message::{Reasoning, ToolResultContent, UserContent};

use crate::config::LLMConfig;
use crate::llm::client::types::{ConversationItem, ItemContent, ReasoningEffort, Role};

/// 按推理强度选择模型：低强度走高能效模型，其余走高质量模型
pub fn evaluate_befitting_model(llm_config: &LLMConfig, effort: ReasoningEffort) -> String {
    match effort {
        ReasoningEffort::Low => llm_config.model_efficient.clone(),
        ReasoningEffort::Medium | ReasoningEffort::High => llm_config.model_powerful.clone(),
    }
}

/// 把结构化输出要求拼接到系统指令后
pub fn instructions_with_schema(
    instructions: &str,
    output_schema: Option<&serde_json::Value>,
) -> String {
    match output_schema {
        Some(schema) => format!(
            "{}\n\n# JSON Schema\n\nRespond with a single JSON object (no code fences, no prose) that validates against this schema. Unknown fields are rejected.\n\n{}",
            instructions,
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
        ),
        None => instructions.to_string(),
    }
}

/// 改写为OpenAI严格模式可接受的schema
///
/// 每个对象的全部属性都列为必填（可选字段本身允许null），禁止额外属性，并去掉严格模式不支持的关键字。
pub fn strict_json_schema(schema: &serde_json::Value) -> serde_json::Value {
    let mut schema = schema.clone();
    make_strict(&mut schema);
    schema
}

const UNSUPPORTED_KEYWORDS: &[&str] = &["$schema", "format", "default"];

fn make_strict(node: &mut serde_json::Value) {
    match node {
        serde_json::Value::Object(map) => {
            for keyword in UNSUPPORTED_KEYWORDS {
                map.remove(*keyword);
            }
            if let Some(serde_json::Value::Object(properties)) = map.get("properties") {
                let required = properties
                    .keys()
                    .map(|key| serde_json::Value::String(key.clone()))
                    .collect();
                map.insert("required".to_string(), serde_json::Value::Array(required));
                map.insert("additionalProperties".to_string(), serde_json::Value::Bool(false));
            }
            for (key, value) in map.iter_mut() {
                match (key.as_str(), value) {
                    // 属性名与定义名不是schema关键字，只处理其下的子schema
                    ("properties" | "$defs" | "definitions", serde_json::Value::Object(children)) => {
                        children.values_mut().for_each(make_strict);
                    }
                    (_, value) => make_strict(value),
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(make_strict),
        _ => {}
    }
}

/// 将对话历史转换为rig消息，最后一条作为本轮prompt
pub fn split_history(history: &[ConversationItem]) -> Option<(Message, Vec<Message>)> {
    let (last, rest) = history.split_last()?;
    let prior = rest.iter().map(to_rig_message).collect();
    Some((to_rig_message(last), prior))
}

fn to_rig_message(item: &ConversationItem) -> Message {
    match &item.content {
        ItemContent::Text(_) | ItemContent::Structured(_) => {
            let text = item.content.as_text();
            match item.role {
                Role::User => Message::user(text),
                Role::Assistant => Message::assistant(text),
            }
        }
        ItemContent::Reasoning {
            id,
            summary,
            signature,
        } => AssistantContent::Reasoning(
            Reasoning::multi(summary.clone())
                .optional_id(id.clone())
                .with_signature(signature.clone()),
        )
        .into(),
        ItemContent::ToolCall {
            id,
            call_id,
            name,
            arguments,
        } => match call_id {
            Some(call_id) => {
                AssistantContent::tool_call_with_call_id(id, call_id.clone(), name, arguments.clone())
            }
            None => AssistantContent::tool_call(id, name, arguments.clone()),
        }
        .into(),
        ItemContent::ToolResult {
            id,
            call_id,
            output,
        } => {
            let content = OneOrMany::one(ToolResultContent::text(output.clone()));
            let result = match call_id {
                Some(call_id) => UserContent::tool_result_with_call_id(id, call_id.clone(), content),
                None => UserContent::tool_result(id, content),
            };
            result.into()
        }
    }
}

/// 把rig在本轮对话中追加的消息转换回对话条目，每段内容对应一个条目
///
/// 要求结构化输出时，最后一条助手文本若能解析为JSON则转为结构化条目。
pub fn items_from_messages(messages: &[Message], structured: bool) -> Vec<ConversationItem> {
    let mut items: Vec<ConversationItem> = messages.iter().flat_map(from_rig_message).collect();

    if structured
        && let Some(last) = items
            .iter_mut()
            .rev()
            .find(|item| item.role == Role::Assistant && matches!(item.content, ItemContent::Text(_)))
        && let ItemContent::Text(text) = &last.content
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(strip_code_fence(text))
    {
        last.content = ItemContent::Structured(value);
    }
    items
}

fn from_rig_message(message: &Message) -> Vec<ConversationItem> {
    match message {
        Message::User { content } => content
            .iter()
            .filter_map(|part| match part {
                UserContent::Text(text) => Some(ConversationItem::user_text(text.text())),
                UserContent::ToolResult(result) => Some(ConversationItem {
                    role: Role::User,
                    content: ItemContent::ToolResult {
                        id: result.id.clone(),
                        call_id: result.call_id.clone(),
                        output: result
                            .content
                            .iter()
                            .filter_map(|c| match c {
                                ToolResultContent::Text(text) => Some(text.text()),
                                _ => None,
                            })
                            .collect::<Vec<_>>()
                            .join("\n"),
                    },
                }),
                // 图片、音频等多媒体内容不进入对话历史
                _ => None,
            })
            .collect(),
        Message::Assistant { content, .. } => content
            .iter()
            .map(|part| {
                let content = match part {
                    AssistantContent::Text(text) => ItemContent::Text(text.text().to_string()),
                    AssistantContent::ToolCall(call) => ItemContent::ToolCall {
                        id: call.id.clone(),
                        call_id: call.call_id.clone(),
                        name: call.function.name.clone(),
                        arguments: call.function.arguments.clone(),
                    },
                    AssistantContent::Reasoning(reasoning) => ItemContent::Reasoning {
                        id: reasoning.id.clone(),
                        summary: reasoning.reasoning.clone(),
                        signature: reasoning.signature.clone(),
                    },
                };
                ConversationItem {
                    role: Role::Assistant,
                    content,
                }
            })
            .collect(),
    }
}

/// 去掉模型偶尔包裹在JSON外层的代码块标记
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_selection_by_effort() {
        let config = LLMConfig {
            model_efficient: "small".to_string(),
            model_powerful: "large".to_string(),
            ..Default::default()
        };

        assert_eq!(evaluate_befitting_model(&config, ReasoningEffort::Low), "small");
        assert_eq!(evaluate_befitting_model(&config, ReasoningEffort::Medium), "large");
        assert_eq!(evaluate_befitting_model(&config, ReasoningEffort::High), "large");
    }

    #[test]
    fn test_instructions_with_schema() {
        let schema = serde_json::json!({"type": "object"});
        let rendered = instructions_with_schema("Extract.", Some(&schema));
        assert!(rendered.starts_with("Extract."));
        assert!(rendered.contains("\"type\": \"object\""));

        assert_eq!(instructions_with_schema("Plain.", None), "Plain.");
    }

    #[test]
    fn test_split_history() {
        assert!(split_history(&[]).is_none());

        let history = vec![
            ConversationItem::user_text("hello"),
            ConversationItem::assistant_structured(serde_json::json!({"problems": []})),
        ];
        let (prompt, prior) = split_history(&history).unwrap();
        assert_eq!(prior.len(), 1);
        assert_eq!(prompt, Message::assistant("{\"problems\":[]}"));
    }

    #[test]
    fn test_items_from_messages_keeps_every_generated_part() {
        let messages = vec![
            Message::Assistant {
                id: None,
                content: OneOrMany::many(vec![
                    AssistantContent::Reasoning(
                        Reasoning::multi(vec!["look up vendors".to_string()])
                            .with_id("rs_1".to_string()),
                    ),
                    AssistantContent::tool_call_with_call_id(
                        "fc_1",
                        "call_1".to_string(),
                        "lookup",
                        serde_json::json!({"q": "helpdesk"}),
                    ),
                ])
                .unwrap(),
            },
            UserContent::tool_result_with_call_id(
                "fc_1",
                "call_1".to_string(),
                OneOrMany::one(ToolResultContent::text("Zendesk, Intercom")),
            )
            .into(),
            Message::assistant("1. Zendesk 2. Intercom"),
        ];

        let items = items_from_messages(&messages, false);
        assert_eq!(items.len(), 4);
        assert_eq!(
            items[0].content,
            ItemContent::Reasoning {
                id: Some("rs_1".to_string()),
                summary: vec!["look up vendors".to_string()],
                signature: None,
            }
        );
        assert!(matches!(
            &items[1].content,
            ItemContent::ToolCall { name, call_id: Some(c), .. } if name == "lookup" && c == "call_1"
        ));
        assert_eq!(items[2].role, Role::User);
        assert_eq!(items[2].content.as_text(), "Zendesk, Intercom");
        assert_eq!(items[3], ConversationItem::assistant_text("1. Zendesk 2. Intercom"));
    }

    #[test]
    fn test_items_from_messages_marks_final_json_as_structured() {
        let messages = vec![
            Message::assistant("checking the transcript"),
            Message::assistant("```json\n{\"problems\": [\"x\"]}\n```"),
        ];

        let items = items_from_messages(&messages, true);
        assert_eq!(items[0], ConversationItem::assistant_text("checking the transcript"));
        assert_eq!(
            items[1],
            ConversationItem::assistant_structured(serde_json::json!({"problems": ["x"]}))
        );

        let plain = items_from_messages(&messages[..1], true);
        assert_eq!(plain[0], ConversationItem::assistant_text("checking the transcript"));
    }

    #[test]
    fn test_generated_items_replay_unchanged() {
        let items = vec![
            ConversationItem {
                role: Role::Assistant,
                content: ItemContent::Reasoning {
                    id: Some("rs_1".to_string()),
                    summary: vec!["a".to_string(), "b".to_string()],
                    signature: Some("sig".to_string()),
                },
            },
            ConversationItem {
                role: Role::Assistant,
                content: ItemContent::ToolCall {
                    id: "fc_1".to_string(),
                    call_id: None,
                    name: "lookup".to_string(),
                    arguments: serde_json::json!({}),
                },
            },
            ConversationItem {
                role: Role::User,
                content: ItemContent::ToolResult {
                    id: "fc_1".to_string(),
                    call_id: None,
                    output: "done".to_string(),
                },
            },
        ];

        let messages: Vec<Message> = items.iter().map(to_rig_message).collect();
        assert_eq!(items_from_messages(&messages, false), items);
    }

    #[test]
    fn test_strict_schema_for_extraction_record() {
        use crate::generator::intake::types::ExtractionRecord;

        let schema = serde_json::to_value(schemars::schema_for!(ExtractionRecord)).unwrap();
        let strict = strict_json_schema(&schema);

        let required: Vec<&str> = strict["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required.len(), strict["properties"].as_object().unwrap().len());
        assert!(required.contains(&"problems"));
        assert!(required.contains(&"contact_name"));
        assert_eq!(strict["additionalProperties"], false);
        assert!(strict.get("$schema").is_none());
        assert!(!strict.to_string().contains("\"format\""));

        // 原schema不受影响
        assert_eq!(schema["required"], serde_json::json!(["problems"]));
    }

    #[test]
    fn test_strict_schema_keeps_properties_named_like_keywords() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "format": {"type": "string", "format": "date"},
                "nested": {"type": "object", "properties": {"default": {"type": "integer"}}}
            }
        });
        let strict = strict_json_schema(&schema);

        assert_eq!(strict["properties"]["format"], serde_json::json!({"type": "string"}));
        assert_eq!(strict["required"], serde_json::json!(["format", "nested"]));
        assert_eq!(strict["properties"]["nested"]["required"], serde_json::json!(["default"]));
        assert_eq!(strict["properties"]["nested"]["additionalProperties"], false);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}```"), "{\"a\":1}");
    }
}
