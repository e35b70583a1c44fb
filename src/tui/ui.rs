use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::models::RegenerationStatus;

pub fn draw(frame: &mut Frame, app: &App) {
    // Main horizontal split: 1/3 left, 2/3 right
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3), // Left pane: section list
            Constraint::Ratio(2, 3), // Right pane: preview
        ])
        .split(frame.area());

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Draft header
            Constraint::Min(0),    // Section list
            Constraint::Length(1), // Key hints
        ])
        .split(main_chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Preview
            Constraint::Length(1), // Regeneration status
        ])
        .split(main_chunks[1]);

    render_header(frame, app, left_chunks[0]);
    render_section_list(frame, app, left_chunks[1]);
    render_left_status(frame, left_chunks[2]);

    render_preview(frame, app, right_chunks[0]);
    render_right_status(frame, app, right_chunks[1]);

    if app.show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" Draft #{} ", app.draft.id);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = usize::from(inner.width.max(1));
    let lines: Vec<Line> = textwrap::wrap(&app.draft.subject, width)
        .into_iter()
        .take(usize::from(inner.height.max(1)))
        .map(|l| Line::from(l.into_owned()))
        .collect();
    let paragraph = Paragraph::new(lines).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_section_list(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .sections
        .iter()
        .map(|section| {
            let marker = if app.pending.contains_key(&section.section_type) {
                Span::styled("✎ ", Style::default().fg(Color::Yellow))
            } else if !section.end_found {
                Span::styled("! ", Style::default().fg(Color::Red))
            } else {
                Span::raw("  ")
            };
            let style = if section.editable {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(Line::from(vec![marker, Span::styled(section.name.as_str(), style)]))
        })
        .collect();

    let title = format!(" Sections ({}) ", app.sections.len());
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !app.sections.is_empty() {
        state.select(Some(app.selected_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_left_status(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new("j/k:nav  g:regen  w:save  ?:help  q:quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_preview(frame: &mut Frame, app: &App, area: Rect) {
    let (title, content) = match app.displayed_section() {
        Some(section) => {
            let width = usize::from(area.width.saturating_sub(2).max(20));
            let text = html2text::from_read(section.html.as_bytes(), width)
                .unwrap_or_else(|_| section.html.clone());
            (format!(" {} ", section.name), text)
        }
        None => (
            " Preview ".to_string(),
            "No sections found in this draft.".to_string(),
        ),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn render_right_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = match app.regeneration_status {
        RegenerationStatus::Idle => "",
        RegenerationStatus::Generating => "⏳ Regenerating...",
        RegenerationStatus::Regenerated => "✓ Rewritten",
        RegenerationStatus::Failed => "❌ Failed",
        RegenerationStatus::NoApiKey => "⚠️  No Gemini key",
    };
    let dirty = if app.is_dirty() {
        format!(" | {} unsaved", app.pending.len())
    } else {
        String::new()
    };
    let message = app
        .message
        .as_deref()
        .map(|m| format!(" | {m}"))
        .unwrap_or_default();

    let paragraph = Paragraph::new(format!("{status}{dirty}{message}"))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 50, frame.area());

    let help_text = [
        "",
        " Navigation:",
        "   j / ↓    Next section",
        "   k / ↑    Previous section",
        "",
        " Editing:",
        "   g        Regenerate selected section",
        "   u        Undo pending rewrite",
        "   w        Write edits to the draft",
        "   o        Open full preview in browser",
        "",
        " General:",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
