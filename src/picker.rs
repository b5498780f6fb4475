use async_trait::async_trait;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stderr};
use tracing::debug;

use crate::app::{App, PickerCommand, PickerItem, SelectMode};
use crate::error::PickerError;
use crate::input;
use crate::kubeconfig;
use crate::model::StoredSecret;

type PickerTerminal = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Selected(Vec<usize>),
    Cancelled,
}

#[async_trait(?Send)]
pub trait Picker {
    async fn pick(
        &mut self,
        secrets: &[StoredSecret],
        mode: SelectMode,
    ) -> Result<PickOutcome, PickerError>;
}

#[derive(Debug, Default)]
pub struct TerminalPicker;

#[async_trait(?Send)]
impl Picker for TerminalPicker {
    async fn pick(
        &mut self,
        secrets: &[StoredSecret],
        mode: SelectMode,
    ) -> Result<PickOutcome, PickerError> {
        let items = secrets
            .iter()
            .map(|secret| PickerItem {
                label: secret.key.clone(),
                preview: kubeconfig::render_preview(secret),
            })
            .collect();
        let mut app = App::new(items, mode);

        let mut terminal = init_terminal()?;
        let run_result = run_loop(&mut terminal, &mut app).await;
        let restore_result = restore_terminal(&mut terminal);

        match (run_result, restore_result) {
            (Err(error), _) => Err(error),
            (_, Err(error)) => Err(error),
            (Ok(outcome), Ok(())) => Ok(outcome),
        }
    }
}

fn init_terminal() -> Result<PickerTerminal, PickerError> {
    enable_raw_mode()?;
    let mut stderr = io::stderr();
    if let Err(error) = execute!(stderr, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(error.into());
    }
    let mut terminal = Terminal::new(CrosstermBackend::new(stderr))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut PickerTerminal) -> Result<(), PickerError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_loop(terminal: &mut PickerTerminal, app: &mut App) -> Result<PickOutcome, PickerError> {
    let mut reader = EventStream::new();

    loop {
        terminal.draw(|frame| crate::ui::render(frame, app))?;

        match reader.next().await {
            Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                let Some(action) = input::map_key(app.mode(), key) else {
                    continue;
                };
                debug!("picker action={action:?}");
                match app.apply_action(action) {
                    PickerCommand::None => {}
                    PickerCommand::Accept(indices) => return Ok(PickOutcome::Selected(indices)),
                    PickerCommand::Cancel => return Ok(PickOutcome::Cancelled),
                }
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => return Err(error.into()),
            None => return Err(PickerError::StreamClosed),
        }
    }
}
