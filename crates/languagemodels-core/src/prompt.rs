//! Prompt templates and the chat demo's dialog state.

const PERSONA: &str = "Agent responses will be truthful, helpful, and harmless.";

/// Two-turn example exchange prepended to every demo prompt.
pub const DIALOG_PRIMER: &str = "User: Hi\n\n\
    Assistant: Hello.\n\n\
    User: Who are you?\n\n\
    Assistant: My name is Sidney. I'm a barista in Chicago.\n\n";

/// Wrap a single user utterance in the system/user/agent template.
pub fn chat_prompt(message: &str) -> String {
    format!("System: {PERSONA}\nUser: {message}\nAgent: ")
}

/// Running transcript for one interactive chat session.
///
/// The transcript alternates `User:` and `Assistant:` turns; the pending
/// field holds a message typed but not yet sent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dialog {
    transcript: String,
    pending: String,
}

impl Dialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn set_pending(&mut self, message: impl Into<String>) {
        self.pending = message.into();
    }

    /// Move the pending message into the transcript and return the prompt to
    /// send, or `None` if nothing is pending.
    pub fn take_turn(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let message = std::mem::take(&mut self.pending);
        self.transcript
            .push_str(&format!("User: {message}\n\nAssistant: "));
        Some(format!("{DIALOG_PRIMER}{}", self.transcript))
    }

    /// Append the assistant's reply to the open turn.
    pub fn record_response(&mut self, response: &str) {
        self.transcript.push_str(response);
        self.transcript.push_str("\n\n");
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_prompt_template() {
        assert_eq!(
            chat_prompt("What is the capital of France?"),
            "System: Agent responses will be truthful, helpful, and harmless.\n\
             User: What is the capital of France?\n\
             Agent: "
        );
    }

    #[test]
    fn no_turn_without_pending() {
        let mut dialog = Dialog::new();
        assert!(dialog.take_turn().is_none());
        assert_eq!(dialog.transcript(), "");
    }

    #[test]
    fn turn_appends_and_clears_pending() {
        let mut dialog = Dialog::new();
        dialog.set_pending("Do you like coffee?");

        let prompt = dialog.take_turn().unwrap();
        assert_eq!(dialog.pending(), "");
        assert_eq!(dialog.transcript(), "User: Do you like coffee?\n\nAssistant: ");
        assert!(prompt.starts_with("User: Hi\n\nAssistant: Hello.\n\n"));
        assert!(prompt.ends_with("User: Do you like coffee?\n\nAssistant: "));
    }

    #[test]
    fn turns_accumulate() {
        let mut dialog = Dialog::new();
        dialog.set_pending("Hello");
        dialog.take_turn().unwrap();
        dialog.record_response("Hi there.");
        dialog.set_pending("Where do you work?");
        let prompt = dialog.take_turn().unwrap();

        assert_eq!(
            dialog.transcript(),
            "User: Hello\n\nAssistant: Hi there.\n\n\
             User: Where do you work?\n\nAssistant: "
        );
        assert_eq!(prompt, format!("{DIALOG_PRIMER}{}", dialog.transcript()));
    }

    #[test]
    fn reset_clears_both_fields() {
        let mut dialog = Dialog::new();
        dialog.set_pending("one");
        dialog.take_turn();
        dialog.record_response("two");
        dialog.set_pending("three");

        dialog.reset();
        assert_eq!(dialog, Dialog::new());
    }
}
