//! Sessions command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Reporter;
use crate::{OutputFormat, SessionsArgs};
use dremel_timelapse::{run_blocking, SessionCatalog, SessionSummary};

/// List sessions, or discard one when `--discard` is given
pub async fn execute_sessions(
    config: &CliConfig,
    args: &SessionsArgs,
    reporter: &Reporter,
) -> CliResult<()> {
    let catalog = SessionCatalog::new(&config.timelapse);

    if let Some(name) = args.discard.clone() {
        let path = run_blocking("discard_session", move || catalog.discard_session(&name)).await?;
        reporter.success(&format!("Session discarded: {}", path.display()));
        return Ok(());
    }

    let sessions = run_blocking("list_sessions", move || catalog.list_sessions()).await?;
    match args.format {
        OutputFormat::Json => reporter.line(&serde_json::to_string_pretty(&sessions)?),
        OutputFormat::Text => {
            reporter.header("Sessions");
            reporter.line(render_sessions_text(&sessions).trim_end());
        }
    }
    Ok(())
}

/// One line per session: name, frame count, folder
#[must_use]
pub fn render_sessions_text(sessions: &[SessionSummary]) -> String {
    if sessions.is_empty() {
        return "No sessions\n".to_string();
    }

    let width = sessions.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for session in sessions {
        let noun = if session.frame_count == 1 { "frame" } else { "frames" };
        out.push_str(&format!(
            "{:<width$}  {:>4} {noun}  {}\n",
            session.name,
            session.frame_count,
            session.path.display()
        ));
    }
    out
}
