//! Prompt assembly.
//!
//! Retrieved passages go into a single leading system message; the user's
//! query always follows as-is. With no passages the prompt is the query
//! alone, never an empty system message.

use crate::error::GatewayError;
use crate::models::PromptMessage;

/// Instruction placed ahead of the retrieved passages in the system message.
pub const CONTEXT_PREAMBLE: &str = "You are a helpful assistant. Answer the user's question \
using the context below. If the context does not contain the answer, say that you don't know.\n\n\
Context:\n";

/// Build the chat messages for `query`, grounded on `context`.
///
/// # Errors
///
/// [`GatewayError::EmptyQuery`] if `query` is empty or whitespace-only.
///
/// # Example
///
/// ```rust
/// use gorag::models::Role;
/// use gorag::prompt::assemble_prompt;
///
/// let messages = assemble_prompt(&[], "hello").unwrap();
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].role, Role::User);
/// assert_eq!(messages[0].content, "hello");
/// ```
pub fn assemble_prompt(
    context: &[String],
    query: &str,
) -> Result<Vec<PromptMessage>, GatewayError> {
    if query.trim().is_empty() {
        return Err(GatewayError::EmptyQuery);
    }

    let mut messages = Vec::with_capacity(2);
    if !context.is_empty() {
        let mut system = String::from(CONTEXT_PREAMBLE);
        system.push_str(&context.join("\n"));
        messages.push(PromptMessage::system(system));
    }
    messages.push(PromptMessage::user(query));

    Ok(messages)
}
