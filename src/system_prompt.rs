//! Instruction text for the travel assistant
//!
//! Each tool gets one line naming the questions that should trigger it, in
//! registry order, followed by guidance for plain conversation.

use crate::llm::ToolDefinition;
use std::fmt::Write;

/// Base prompt establishing the assistant's role
const BASE_PROMPT: &str = "You are a helpful and conversational AI assistant. \
Your primary job is to answer general questions and chat with the user.";

const CHAT_GUIDANCE: &str = "If the user just wants to chat (e.g., 'Hello'), answer from your own knowledge. \
When a tool reports an error, explain the problem to the user in plain language instead of retrying.";

/// Build the instruction, listing every tool and its trigger condition
pub fn build_instruction(tools: &[ToolDefinition]) -> String {
    let mut prompt = String::from(BASE_PROMPT);
    if !tools.is_empty() {
        prompt.push_str("\n\nYou ALSO have special tools. You MUST use these tools when needed:");
        for (i, tool) in tools.iter().enumerate() {
            let _ = write!(prompt, "\n{}. Use '{}': {}", i + 1, tool.name, tool.description);
        }
    }
    prompt.push_str("\n\n");
    prompt.push_str(CHAT_GUIDANCE);
    prompt
}
