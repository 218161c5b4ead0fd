use serde::{Deserialize, Serialize};

use crate::llm::client::types::ConversationItem;

/// 只追加的对话历史，由编排器独占，按阶段顺序增长
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    items: Vec<ConversationItem>,
}

impl ConversationHistory {
    /// 以原始输入作为唯一一条用户消息
    pub fn seeded(input_as_text: &str) -> Self {
        Self {
            items: vec![ConversationItem::user_text(input_as_text)],
        }
    }

    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 追加一个阶段新生成的全部条目，返回扩展后的历史
    pub fn extended(mut self, new_items: Vec<ConversationItem>) -> Self {
        self.items.extend(new_items);
        self
    }

    /// 当前历史是否为另一段历史的前缀
    pub fn is_prefix_of(&self, other: &ConversationHistory) -> bool {
        other.items.starts_with(&self.items)
    }
}
