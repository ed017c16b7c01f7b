//! ContextBuilder: assembles a stable system prompt plus a dynamic runtime
//! block for each turn.
//!
//! The stable prefix (system prompt + skill descriptions known at startup)
//! must be byte-identical across turns within a session so a provider can
//! cache it; everything turn-specific goes after it.

use crate::session::{HistoryEntry, Role};

/// One message in the assembled context, in provider wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
}

/// Builds the per-turn message list from a fixed stable prefix and turn
/// specific dynamic content.
pub struct ContextBuilder {
    stable_system_prompt: String,
    history_window: usize,
}

impl ContextBuilder {
    pub fn new(stable_system_prompt: impl Into<String>, history_window: usize) -> Self {
        Self {
            stable_system_prompt: stable_system_prompt.into(),
            history_window,
        }
    }

    /// The byte-identical stable prefix for this builder's lifetime.
    pub fn stable_prefix(&self) -> &str {
        &self.stable_system_prompt
    }

    pub fn build(
        &self,
        skill_prompts: &[String],
        memory_snippets: &[String],
        history: &[HistoryEntry],
        current_user_message: &str,
    ) -> Vec<ContextMessage> {
        let mut messages = vec![ContextMessage {
            role: Role::System,
            content: self.stable_system_prompt.clone(),
        }];

        for skill_prompt in skill_prompts {
            messages.push(ContextMessage {
                role: Role::System,
                content: skill_prompt.clone(),
            });
        }

        if !memory_snippets.is_empty() {
            messages.push(ContextMessage {
                role: Role::System,
                content: format!("Relevant memory:\n{}", memory_snippets.join("\n")),
            });
        }

        let recent = if history.len() > self.history_window {
            &history[history.len() - self.history_window..]
        } else {
            history
        };
        for entry in recent {
            messages.push(ContextMessage {
                role: entry.role,
                content: entry.content.clone(),
            });
        }

        messages.push(ContextMessage {
            role: Role::User,
            content: current_user_message.to_string(),
        });

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_prefix_is_byte_identical_across_builds() {
        let builder = ContextBuilder::new("You are picoagent.", 5);
        let a = builder.build(&[], &[], &[], "hi");
        let b = builder.build(&[], &[], &[], "bye");
        assert_eq!(a[0].content, b[0].content);
        assert_eq!(a[0].content, builder.stable_prefix());
    }

    #[test]
    fn history_window_truncates_to_most_recent() {
        let builder = ContextBuilder::new("sys", 2);
        let history: Vec<HistoryEntry> = (0..5)
            .map(|i| HistoryEntry {
                role: Role::User,
                content: format!("msg{i}"),
                timestamp: i,
            })
            .collect();
        let messages = builder.build(&[], &[], &history, "now");
        let bodies: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert!(bodies.contains(&"msg3"));
        assert!(bodies.contains(&"msg4"));
        assert!(!bodies.contains(&"msg2"));
    }

    #[test]
    fn memory_snippets_and_skills_appear_after_stable_prefix() {
        let builder = ContextBuilder::new("sys", 5);
        let messages = builder.build(
            &["skill: weather".to_string()],
            &["remembered fact".to_string()],
            &[],
            "question",
        );
        assert_eq!(messages[0].content, "sys");
        assert_eq!(messages[1].content, "skill: weather");
        assert!(messages[2].content.contains("remembered fact"));
        assert_eq!(messages.last().unwrap().content, "question");
    }
}
