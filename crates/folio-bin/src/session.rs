//! Interactive session: text commands from an async reader, debounce timers
//! fired in real time between them.

use crate::report::{pages_text, page_reports, status_line};
use anyhow::Result;
use core_actions::{Action, HELP, ParsedCommand, dispatch, parse_command};
use core_events::Tick;
use core_layout::{StackedMeasurer, StackedMetrics};
use core_model::EditorModel;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, info};

pub struct Session {
    model: EditorModel,
    measurer: StackedMeasurer,
    started: Instant,
    /// Where `save` writes markup, if anywhere.
    save_path: Option<PathBuf>,
}

impl Session {
    pub fn new(model: EditorModel, save_path: Option<PathBuf>) -> Self {
        let page_height = model.settings().page_height;
        let mut measurer = StackedMeasurer::new(StackedMetrics::default(), page_height);
        measurer.layout(model.document());
        let mut session = Self {
            model,
            measurer,
            started: Instant::now(),
            save_path,
        };
        session.model.relayout(&session.measurer);
        session
    }

    pub fn model(&self) -> &EditorModel {
        &self.model
    }

    fn now(&self) -> Tick {
        Tick::from_duration(self.started.elapsed())
    }

    /// Read commands until `quit` or end of input.
    pub async fn run<R, W>(&mut self, reader: R, mut out: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        out.write_all(format!("{}\n", status_line(&self.model)).as_bytes())
            .await?;
        loop {
            let sleep_for = self
                .model
                .next_deadline()
                .map(|d| d.as_duration().saturating_sub(self.started.elapsed()));
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if !self.handle_line(&line, &mut out).await? {
                        break;
                    }
                }
                _ = tokio::time::sleep(sleep_for.unwrap_or(Duration::ZERO)), if sleep_for.is_some() => {
                    self.fire_timers();
                }
            }
        }
        // Let pending snapshots and notifications settle before leaving.
        while let Some(deadline) = self.model.next_deadline() {
            tokio::time::sleep(deadline.as_duration().saturating_sub(self.started.elapsed())).await;
            self.fire_timers();
        }
        out.flush().await?;
        info!(target: "runtime", unsaved = self.model.has_unsaved_changes(), "session_finished");
        Ok(())
    }

    fn fire_timers(&mut self) {
        let report = self.model.tick(self.now(), &self.measurer);
        if report.any() {
            debug!(target: "runtime", ?report, "timers_fired");
        }
    }

    /// Returns false when the session should end.
    async fn handle_line<W: AsyncWrite + Unpin>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        if line.trim().is_empty() {
            return Ok(true);
        }
        let reply = match parse_command(line) {
            ParsedCommand::Quit => return Ok(false),
            ParsedCommand::Help => HELP.to_string(),
            ParsedCommand::Status => status_line(&self.model),
            ParsedCommand::Text => self.model.text().trim_end().to_string(),
            ParsedCommand::Markup => self.model.markup(),
            ParsedCommand::Pages => pages_text(&page_reports(&self.model)).trim_end().to_string(),
            ParsedCommand::Wait(d) => {
                tokio::time::sleep(d).await;
                self.fire_timers();
                status_line(&self.model)
            }
            ParsedCommand::Unknown(msg) => format!("error: {msg}"),
            ParsedCommand::Action(action) => self.apply(action)?,
        };
        out.write_all(reply.as_bytes()).await?;
        out.write_all(b"\n").await?;
        Ok(true)
    }

    fn apply(&mut self, action: Action) -> Result<String> {
        if let Action::Scroll(y) = action {
            self.measurer.set_scroll_top(y);
        }
        let is_save = matches!(action, Action::Save);
        let now = self.now();
        let result = dispatch(action, &mut self.model, now, &self.measurer, &[]);
        if result.relayout {
            self.measurer.layout(self.model.document());
        }
        if let Some(y) = result.scroll_to {
            self.measurer.set_scroll_top(y);
        }
        if is_save && let Some(path) = &self.save_path {
            core_model::write_markup(path, &self.model.markup())?;
        }
        Ok(if result.rejected {
            format!("rejected | {}", status_line(&self.model))
        } else {
            status_line(&self.model)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::EditorSettings;
    use pretty_assertions::assert_eq;
    use tokio::io::BufReader;

    async fn run_script(markup: &str, script: &str) -> (Session, String) {
        let model = EditorModel::from_markup(markup, EditorSettings::default());
        let mut session = Session::new(model, None);
        let mut out = Vec::new();
        session
            .run(BufReader::new(script.as_bytes()), &mut out)
            .await
            .unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn script_edits_and_reports_status() {
        let (session, out) = run_script(
            "<p>Hello world. Hello there.</p>",
            "find hello\nnext\nreplace Hi\ntext\nquit\n",
        )
        .await;
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "page 1/1 | matches - | undo no | redo no");
        assert_eq!(lines[1], "page 1/1 | matches 1/2 | undo no | redo no");
        assert_eq!(lines[2], "page 1/1 | matches 2/2 | undo no | redo no");
        assert_eq!(lines[3], "page 1/1 | matches 1/1 | undo no | redo no | unsaved");
        assert_eq!(lines[4], "Hello world. Hi there.");
        // Pending snapshot settled before the session ended.
        assert!(session.model().can_undo());
    }

    #[tokio::test]
    async fn wait_lets_history_settle_for_undo() {
        let (session, out) = run_script(
            "<p>ab</p>",
            "insert 2 c\nwait 550\nundo\nmarkup\n",
        )
        .await;
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[2], "page 1/1 | matches - | undo yes | redo no | unsaved");
        assert_eq!(lines[4], "<p>ab</p>");
        assert!(session.model().can_redo());
    }

    #[tokio::test]
    async fn bad_commands_report_errors_and_continue() {
        let (_session, out) = run_script("<p>x</p>", "bogus\ndelete 0 50\nstatus\n").await;
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[1], "error: unknown command 'bogus'");
        assert!(lines[2].starts_with("rejected | "));
        assert_eq!(lines[3], "page 1/1 | matches - | undo no | redo no");
    }

    #[tokio::test]
    async fn save_writes_markup_when_path_given() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let model = EditorModel::from_markup("<p>a</p>", EditorSettings::default());
        let mut session = Session::new(model, Some(path.clone()));
        let mut out = Vec::new();
        session
            .run(BufReader::new("insert 1 b\nsave\n".as_bytes()), &mut out)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>ab</p>");
        assert!(!session.model().has_unsaved_changes());
    }
}
