use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, SelectMode};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(root[0]);

    app.set_page_size(list_rows_visible(body[0]));
    render_list(frame, body[0], app);
    render_preview(frame, body[1], app);
    render_prompt(frame, root[1], app);
}

fn render_list(frame: &mut Frame, area: Rect, app: &App) {
    let items = app
        .matches()
        .iter()
        .filter_map(|&index| app.item(index).map(|item| (index, item)))
        .map(|(index, item)| {
            let marker = if app.is_marked(index) { "● " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(WARN)),
                Span::raw(item.label.clone()),
            ]))
        })
        .collect::<Vec<_>>();

    let title = match app.mode() {
        SelectMode::Single => " kubeconfigs ".to_string(),
        SelectMode::Multi => format!(" kubeconfigs · {} marked ", app.marked_count()),
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .title(title),
        )
        .style(Style::default().bg(PANEL).fg(Color::White))
        .highlight_style(
            Style::default()
                .bg(ACCENT)
                .fg(BG)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    if !app.matches().is_empty() {
        state.select(Some(app.cursor()));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_preview(frame: &mut Frame, area: Rect, app: &App) {
    let preview = app
        .highlighted()
        .and_then(|index| app.item(index))
        .map(|item| item.preview.as_str())
        .unwrap_or_default();
    let style = if preview.starts_with("Error parsing kubeconfig") {
        Style::default().fg(ERROR)
    } else {
        Style::default().fg(Color::White)
    };

    frame.render_widget(
        Paragraph::new(Text::styled(preview.to_string(), style))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(MUTED))
                    .title(" preview "),
            )
            .style(Style::default().bg(PANEL))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn render_prompt(frame: &mut Frame, area: Rect, app: &App) {
    let hints = match app.mode() {
        SelectMode::Single => "enter select · esc cancel",
        SelectMode::Multi => "tab mark · enter delete · esc cancel",
    };
    let counter = format!(" {}/{} ", app.matches().len(), app.total());
    let line = Line::from(vec![
        Span::styled("> ", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::raw(app.query().to_string()),
        Span::styled(counter, Style::default().fg(MUTED)),
        Span::styled(hints, Style::default().fg(MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG)), area);

    let cursor_x = area
        .x
        .saturating_add(2)
        .saturating_add(app.query().chars().count() as u16)
        .min(area.right().saturating_sub(1));
    frame.set_cursor_position(Position::new(cursor_x, area.y));
}

fn list_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(2).max(1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PickerItem;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn renders_labels_and_preview_of_highlight() {
        let mut app = App::new(
            vec![
                PickerItem {
                    label: "alpha-dev".into(),
                    preview: "Server: https://alpha".into(),
                },
                PickerItem {
                    label: "beta-prod".into(),
                    preview: "Server: https://beta".into(),
                },
            ],
            SelectMode::Single,
        );
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("alpha-dev"));
        assert!(text.contains("beta-prod"));
        assert!(text.contains("https://alpha"));
        assert!(!text.contains("https://beta"));
        assert!(text.contains("2/2"));
    }

    #[test]
    fn list_height_excludes_borders() {
        assert_eq!(list_rows_visible(Rect::new(0, 0, 10, 12)), 10);
        assert_eq!(list_rows_visible(Rect::new(0, 0, 10, 1)), 1);
    }
}
