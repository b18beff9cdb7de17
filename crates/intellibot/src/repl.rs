//! The interactive read-eval-print loop.

use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::{Session, SessionBuilder};

const BANNER: &str = "🧠 AI Assistant is ready! Type 'quit' to exit.";
const PROMPT: &str = "You: ";
const REPLY_PREFIX: &str = "Assistant: ";
const FAREWELL: &str = "👋 Goodbye!";
const THINKING: &str = "🤔 Thinking...";

enum TurnEvent {
    Delta(String),
    ToolCall(String),
}

/// A line-oriented chat loop over any input and output.
///
/// Each line is trimmed; `quit` in any case or the end of the input ends the
/// loop, and empty lines are skipped. Everything else is sent to the session
/// and the reply is printed as it streams in. A failed turn is reported and
/// the loop goes on.
pub struct Repl<R, W> {
    session: Session,
    events: mpsc::UnboundedReceiver<TurnEvent>,
    input: R,
    output: W,
    spinner: bool,
    colors: bool,
}

impl<R, W> Repl<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Builds the session from `builder` and attaches it to the loop.
    pub fn new(builder: SessionBuilder, input: R, output: W) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();
        let session = builder
            .on_message_delta({
                let event_tx = event_tx.clone();
                move |delta| {
                    event_tx.send(TurnEvent::Delta(delta.to_owned())).ok();
                }
            })
            .on_tool_call(move |call| {
                event_tx.send(TurnEvent::ToolCall(call.name.clone())).ok();
            })
            .build();

        Self {
            session,
            events,
            input,
            output,
            spinner: false,
            colors: false,
        }
    }

    /// Shows a progress spinner on stderr while waiting for the model.
    #[inline]
    pub fn with_spinner(mut self, spinner: bool) -> Self {
        self.spinner = spinner;
        self
    }

    /// Styles the prompts with terminal colors.
    #[inline]
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Runs until the user quits or the input ends.
    ///
    /// Only failures to read or write the terminal are returned.
    pub async fn run(mut self) -> io::Result<()> {
        writeln!(self.output, "{BANNER}\n")?;

        loop {
            if self.colors {
                write!(self.output, "{}", PROMPT.bold().green())?;
            } else {
                write!(self.output, "{PROMPT}")?;
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line).await? == 0 {
                debug!("input closed");
                writeln!(self.output)?;
                writeln!(self.output, "{FAREWELL}")?;
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.to_lowercase() == "quit" {
                writeln!(self.output, "{FAREWELL}")?;
                break;
            }

            self.run_turn(line).await?;
        }

        self.output.flush()
    }

    async fn run_turn(&mut self, line: &str) -> io::Result<()> {
        let spinner = Spinner::new(self.spinner);
        let colors = self.colors;
        let Self {
            session,
            events,
            output,
            ..
        } = self;
        let mut view = TurnView {
            output,
            spinner,
            colors,
            started: false,
        };

        view.spinner.show(THINKING);
        let mut ticker = interval(Duration::from_millis(100));
        let turn = session.send_message(line);
        tokio::pin!(turn);

        let result = loop {
            select! {
                biased;

                Some(event) = events.recv() => view.handle(event)?,
                result = &mut turn => break result,
                _ = ticker.tick() => view.spinner.tick(),
            }
        };
        // Events sent while the turn was finishing.
        while let Ok(event) = events.try_recv() {
            view.handle(event)?;
        }
        view.spinner.clear();
        view.start_reply()?;

        match result {
            Ok(_) => writeln!(view.output)?,
            Err(err) => {
                writeln!(view.output)?;
                if view.colors {
                    writeln!(view.output, "{}", format!("⚠️ {err}").yellow())?;
                } else {
                    writeln!(view.output, "⚠️ {err}")?;
                }
            }
        }
        view.output.flush()
    }
}

/// Output state of one turn.
struct TurnView<'a, W> {
    output: &'a mut W,
    spinner: Spinner,
    colors: bool,
    started: bool,
}

impl<W: Write> TurnView<'_, W> {
    fn handle(&mut self, event: TurnEvent) -> io::Result<()> {
        match event {
            TurnEvent::Delta(delta) => {
                self.spinner.clear();
                self.start_reply()?;
                write!(self.output, "{delta}")?;
                self.output.flush()
            }
            TurnEvent::ToolCall(name) => {
                debug!("model called `{name}`");
                // The spinner would draw over a partially printed reply.
                if !self.started {
                    self.spinner.show(&format!("🔧 Running {name}..."));
                }
                Ok(())
            }
        }
    }

    fn start_reply(&mut self) -> io::Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        if self.colors {
            write!(self.output, "{}", REPLY_PREFIX.bold().cyan())
        } else {
            write!(self.output, "{REPLY_PREFIX}")
        }
    }
}

struct Spinner {
    style: Option<ProgressStyle>,
    bar: Option<ProgressBar>,
}

impl Spinner {
    fn new(enabled: bool) -> Self {
        let style = enabled
            .then(|| ProgressStyle::with_template("{spinner} {wide_msg}").ok())
            .flatten()
            .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        Self { style, bar: None }
    }

    fn show(&mut self, message: &str) {
        let Some(style) = &self.style else {
            return;
        };
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(style.clone());
            bar
        });
        bar.set_message(message.to_owned());
    }

    fn tick(&self) {
        if let Some(bar) = &self.bar {
            bar.tick();
        }
    }

    fn clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use intellibot_model::{ErrorKind, ToolCallRequest};
    use intellibot_test_model::{PresetEvent, PresetResponse, TestModelProvider};
    use serde_json::json;

    use super::*;

    async fn run_script(provider: &TestModelProvider, input: &str) -> String {
        let builder = SessionBuilder::with_model_provider(provider.clone())
            .with_rng_seed(0);
        let mut output = Vec::new();
        Repl::new(builder, input.as_bytes(), &mut output)
            .run()
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_quit_in_any_case() {
        let provider = TestModelProvider::default();
        let output = run_script(&provider, "  QuIt \nhello\n").await;
        assert_eq!(
            output,
            "🧠 AI Assistant is ready! Type 'quit' to exit.\n\nYou: 👋 Goodbye!\n"
        );
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_end_of_input_quits() {
        let provider = TestModelProvider::default();
        let output = run_script(&provider, "").await;
        assert!(output.ends_with("You: \n👋 Goodbye!\n"), "{output}");
    }

    #[tokio::test]
    async fn test_streams_reply() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("Hello! How can I help?"));
        let output = run_script(&provider, "\n   \nhi\nquit\n").await;
        assert_eq!(
            output,
            "🧠 AI Assistant is ready! Type 'quit' to exit.\n\n\
             You: You: You: Assistant: Hello! How can I help?\n\
             You: 👋 Goodbye!\n"
        );
        // Blank lines never reach the model.
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_turn() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call_1".to_owned(),
                name: "unit_converter".to_owned(),
                arguments: json!({ "unit_from": "mile", "unit_to": "km", "value": 3 }),
            }),
        ]));
        provider.add_response(PresetResponse::text("3 miles is 4.83 km."));
        let output = run_script(&provider, "3 miles in km?\nquit\n").await;
        assert!(
            output.contains("You: Assistant: 3 miles is 4.83 km.\nYou: "),
            "{output}"
        );
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_looping() {
        let provider = TestModelProvider::default();
        provider.add_response(
            PresetResponse::text("Back online.")
                .with_failures(1)
                .with_failure_kind(ErrorKind::Unauthorized),
        );
        let output = run_script(&provider, "hi\nhi again\nquit\n").await;
        assert_eq!(
            output,
            "🧠 AI Assistant is ready! Type 'quit' to exit.\n\n\
             You: Assistant: \n\
             ⚠️ model request failed: scripted failure (unauthorized)\n\
             You: Assistant: Back online.\n\
             You: 👋 Goodbye!\n"
        );
    }
}
