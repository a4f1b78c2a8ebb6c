//! Interactive chat over a line-oriented input.
//!
//! Each line is sent as the next user turn with the whole dialog so far as
//! context; `/reset` starts over and `/quit` (or end of input) exits.

use std::io::Write;

use languagemodels::{Dialog, LanguageModels};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub async fn run<R, W>(lm: &LanguageModels, input: R, out: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut dialog = Dialog::new();
    let mut lines = input.lines();

    writeln!(out, "Chatbot. Type a message, /reset to start over, /quit to leave.")?;
    out.flush()?;

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                dialog.reset();
                writeln!(out, "(dialog cleared)")?;
                out.flush()?;
                continue;
            }
            message => dialog.set_pending(message),
        }

        if let Some(prompt) = dialog.take_turn() {
            let response = lm.chat(&prompt).await?;
            dialog.record_response(&response);
            writeln!(out, "{}", dialog.transcript())?;
            out.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use languagemodels::{Completion, Config, ExecutionMode, RemoteError};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Barista {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Completion for Barista {
        async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, RemoteError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            Ok(format!("Reply {}", prompts.len()))
        }
    }

    fn models(backend: &Arc<Barista>) -> LanguageModels {
        let config = Config::default().with_mode(ExecutionMode::RemoteApi {
            api_key: "demo".into(),
        });
        LanguageModels::new(config).with_completion(Arc::clone(backend) as Arc<dyn Completion>)
    }

    async fn session(input: &str, backend: &Arc<Barista>) -> String {
        let lm = models(backend);
        let mut out = Vec::new();
        run(&lm, input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn turns_carry_dialog_history() {
        let backend = Arc::new(Barista::default());
        let output = session("Hi there\n\nWhere do you work?\n", &backend).await;

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2, "blank lines are not sent");

        assert!(prompts[0].contains("User: Who are you?"));
        assert!(prompts[0].contains("User: Hi there\n\nAssistant: \nAgent: "));
        assert!(prompts[1].contains(
            "User: Hi there\n\nAssistant: Reply 1\n\nUser: Where do you work?\n\nAssistant: "
        ));

        assert!(output.ends_with(
            "User: Hi there\n\nAssistant: Reply 1\n\n\
             User: Where do you work?\n\nAssistant: Reply 2\n\n\n"
        ));
    }

    #[tokio::test]
    async fn reset_forgets_history() {
        let backend = Arc::new(Barista::default());
        let output = session("first\n/reset\nsecond\n", &backend).await;

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[1].contains("first"));
        assert!(output.contains("(dialog cleared)"));
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let backend = Arc::new(Barista::default());
        session("one\n/quit\ntwo\n", &backend).await;
        assert_eq!(backend.prompts.lock().unwrap().len(), 1);
    }
}
