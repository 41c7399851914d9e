//! Terminal user interface with ratatui.

use crate::api::PredictionService;
use crate::app::{App, Focus};
use crate::controller::{Phase, SuggestionPanel};
use crate::models::{PredictionStatus, format_growth};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
};

/// Colors for the UI.
pub struct UiColors {
    pub gain: Color,
    pub loss: Color,
    pub accent: Color,
    pub header_bg: Color,
    pub selected_bg: Color,
    pub border: Color,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            gain: Color::Green,
            loss: Color::Red,
            accent: Color::Cyan,
            header_bg: Color::DarkGray,
            selected_bg: Color::Rgb(40, 40, 60),
            border: Color::DarkGray,
        }
    }
}

/// Screen areas of the prediction form, reused for mouse hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormLayout {
    pub header: Rect,
    pub stock: Rect,
    pub days: Rect,
    pub status: Rect,
    pub history: Rect,
    pub footer: Rect,
    /// Suggestion dropdown, drawn over the fields below the stock input
    pub panel: Option<Rect>,
}

/// Compute the form layout for `area`.
pub fn form_layout(area: Rect, panel_rows: Option<usize>, max_rows: usize) -> FormLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Length(3), // Stock input
            Constraint::Length(3), // Days input
            Constraint::Length(3), // Status
            Constraint::Min(3),    // History
            Constraint::Length(1), // Footer
        ])
        .split(area);

    let stock = chunks[1];
    let panel = panel_rows.filter(|rows| *rows > 0).and_then(|rows| {
        let top = stock.y + stock.height;
        let bottom = area.y + area.height;
        let wanted = rows.min(max_rows.max(1)) as u16 + 2;
        let height = wanted.min(bottom.saturating_sub(top));
        (height > 2).then(|| Rect::new(stock.x, top, stock.width, height))
    });

    FormLayout {
        header: chunks[0],
        stock,
        days: chunks[2],
        status: chunks[3],
        history: chunks[4],
        footer: chunks[5],
        panel,
    }
}

/// First visible panel row so the cursor stays in view.
pub fn panel_offset(cursor: usize, visible: usize) -> usize {
    cursor.saturating_sub(visible.max(1) - 1)
}

/// Rows of the panel drawn in `area`, as `(first row, row count)`.
///
/// Rendering and mouse hit-testing both go through here so a click always
/// lands on the row that was drawn under it.
pub fn panel_window(area: Rect, cursor: usize, max_rows: usize) -> (usize, usize) {
    let visible = (area.height.saturating_sub(2) as usize).min(max_rows.max(1));
    (panel_offset(cursor, visible), visible)
}

/// Render the main UI and return the layout used.
pub fn render<S: PredictionService>(frame: &mut Frame, app: &App<S>) -> FormLayout {
    let colors = UiColors::default();
    let panel = app.controller.panel();
    let layout = form_layout(
        frame.area(),
        panel.map(|p| p.rows.len()),
        app.max_suggestions,
    );

    render_header(frame, app, layout.header, &colors);
    let stock_title = if app.controller.phase() == Phase::Fetching {
        " Stock (searching...) "
    } else {
        " Stock "
    };
    render_field(
        frame,
        stock_title,
        app.controller.input(),
        app.focus == Focus::Stock,
        layout.stock,
        &colors,
    );
    let days_title = if app.controller.is_predicting() {
        " Days (predicting...) "
    } else {
        " Days "
    };
    render_field(
        frame,
        days_title,
        &app.days,
        app.focus == Focus::Days,
        layout.days,
        &colors,
    );
    render_status(frame, app.controller.status(), layout.status, &colors);
    render_history(frame, app, layout.history, &colors);
    render_footer(frame, layout.footer, &colors);

    if let (Some(panel), Some(area)) = (panel, layout.panel) {
        render_panel(frame, panel, area, app.max_suggestions, &colors);
    }

    if app.show_help {
        render_help_overlay(frame, &colors);
    }

    layout
}

/// Render the header with the selection summary.
fn render_header<S: PredictionService>(
    frame: &mut Frame,
    app: &App<S>,
    area: Rect,
    colors: &UiColors,
) {
    let selected = match app.controller.selection() {
        Some(sel) => Span::styled(
            format!("Selected: {} ({})", sel.name, sel.symbol),
            Style::default().fg(colors.gain),
        ),
        None => Span::styled("No stock selected", Style::default().fg(Color::Gray)),
    };

    let header = Paragraph::new(vec![Line::from(vec![
        Span::styled(
            "STONKCAST ",
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("- {}  ", app.service_url)),
        selected,
    ])])
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border)),
    );

    frame.render_widget(header, area);
}

/// Render a single-line text field.
fn render_field(
    frame: &mut Frame,
    title: &str,
    text: &str,
    focused: bool,
    area: Rect,
    colors: &UiColors,
) {
    let border = if focused {
        Style::default().fg(colors.accent)
    } else {
        Style::default().fg(colors.border)
    };

    let mut spans = vec![Span::raw(text.to_string())];
    if focused {
        spans.push(Span::styled("█", Style::default().fg(colors.accent)));
    }

    let field = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border),
    );

    frame.render_widget(field, area);
}

/// Render the suggestion dropdown with the matched part of each label in bold.
fn render_panel(
    frame: &mut Frame,
    panel: &SuggestionPanel,
    area: Rect,
    max_rows: usize,
    colors: &UiColors,
) {
    let (offset, visible) = panel_window(area, panel.cursor, max_rows);
    let symbol_width = panel
        .rows
        .iter()
        .map(|row| row.symbol.chars().count())
        .max()
        .unwrap_or(0)
        .min(14);

    let lines: Vec<Line> = panel
        .highlighted()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, (row, hl))| {
            let base = if i == panel.cursor {
                Style::default().bg(colors.selected_bg)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(
                    format!(
                        "{:<width$}  ",
                        truncate_string(&row.symbol, 14),
                        width = symbol_width
                    ),
                    base.fg(Color::Yellow),
                ),
                Span::styled(hl.prefix.to_string(), base),
                Span::styled(hl.matched.to_string(), base.add_modifier(Modifier::BOLD)),
                Span::styled(hl.suffix.to_string(), base),
            ])
        })
        .collect();

    let title = format!(" {} matches ", panel.rows.len());
    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.accent)),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(widget, area);
}

/// Render the prediction status line.
fn render_status(frame: &mut Frame, status: &PredictionStatus, area: Rect, colors: &UiColors) {
    let style = match status {
        PredictionStatus::Growth(g) if *g >= 0.0 => Style::default().fg(colors.gain),
        PredictionStatus::Growth(_) => Style::default().fg(colors.loss),
        s if s.is_failure() => Style::default().fg(colors.loss),
        _ => Style::default(),
    };

    let widget = Paragraph::new(status.to_string())
        .style(style)
        .block(
            Block::default()
                .title(" Prediction ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(widget, area);
}

/// Render past predictions, newest first.
fn render_history<S: PredictionService>(
    frame: &mut Frame,
    app: &App<S>,
    area: Rect,
    colors: &UiColors,
) {
    let header = Row::new(["TIME", "SYMBOL", "NAME", "DAYS", "GROWTH"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::White))))
    .style(Style::default().bg(colors.header_bg))
    .height(1);

    let rows = app.controller.history().map(|record| {
        let color = if record.growth_percent >= 0.0 {
            colors.gain
        } else {
            colors.loss
        };
        Row::new(vec![
            Cell::from(record.at.format("%H:%M:%S").to_string()),
            Cell::from(record.symbol.clone()),
            Cell::from(truncate_string(&record.name, 24)),
            Cell::from(record.horizon_days.to_string()),
            Cell::from(format_growth(record.growth_percent)).style(Style::default().fg(color)),
        ])
    });

    let widths = [
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Length(26),
        Constraint::Length(6),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(" History ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border)),
    );

    frame.render_widget(table, area);
}

/// Render the footer with keybindings.
fn render_footer(frame: &mut Frame, area: Rect, colors: &UiColors) {
    let footer = Line::from(vec![
        Span::styled(" Tab", Style::default().fg(Color::Yellow)),
        Span::raw(":field "),
        Span::styled("↑↓", Style::default().fg(Color::Yellow)),
        Span::raw(":choose "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(":pick/predict "),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(":close/quit "),
        Span::styled("F1", Style::default().fg(Color::Yellow)),
        Span::raw(":help"),
    ]);

    let footer_widget = Paragraph::new(footer).style(Style::default().bg(colors.header_bg));

    frame.render_widget(footer_widget, area);
}

/// Render help overlay.
fn render_help_overlay(frame: &mut Frame, colors: &UiColors) {
    let area = centered_rect(60, 70, frame.area());

    let help_text = vec![
        Line::from(Span::styled(
            "STONKCAST HELP",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Stock field:"),
        Line::from("  type      Search by company name (2+ characters)"),
        Line::from("  ↑/↓       Move through suggestions"),
        Line::from("  Enter     Pick suggestion"),
        Line::from("  Esc       Close suggestions"),
        Line::from(""),
        Line::from("Days field:"),
        Line::from("  Enter     Request prediction"),
        Line::from(""),
        Line::from("Anywhere:"),
        Line::from("  Tab       Switch field"),
        Line::from("  Ctrl+P    Request prediction"),
        Line::from("  Ctrl+U    Clear field"),
        Line::from("  Esc       Quit (when no suggestions shown)"),
        Line::from("  Ctrl+C    Quit"),
        Line::from(""),
        Line::from("Editing the stock name after picking clears the pick."),
        Line::from(""),
        Line::from("Press any key to close"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

/// Create a centered rectangle.
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

/// Truncate string to max length in characters.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_without_panel() {
        let layout = form_layout(Rect::new(0, 0, 80, 30), None, 8);
        assert_eq!(layout.stock, Rect::new(0, 2, 80, 3));
        assert_eq!(layout.days, Rect::new(0, 5, 80, 3));
        assert!(layout.panel.is_none());
        assert_eq!(layout.footer.y, 29);
    }

    #[test]
    fn test_panel_sits_below_stock_field() {
        let layout = form_layout(Rect::new(0, 0, 80, 30), Some(3), 8);
        assert_eq!(layout.panel, Some(Rect::new(0, 5, 80, 5)));

        let capped = form_layout(Rect::new(0, 0, 80, 30), Some(20), 8);
        assert_eq!(capped.panel.unwrap().height, 10);

        assert!(form_layout(Rect::new(0, 0, 80, 30), Some(0), 8).panel.is_none());
    }

    #[test]
    fn test_panel_clipped_to_screen() {
        let layout = form_layout(Rect::new(0, 0, 80, 20), Some(40), 30);
        let panel = layout.panel.unwrap();
        assert_eq!(panel.y, 5);
        assert_eq!(panel.y + panel.height, 20);
    }

    #[test]
    fn test_panel_offset_keeps_cursor_visible() {
        assert_eq!(panel_offset(0, 5), 0);
        assert_eq!(panel_offset(4, 5), 0);
        assert_eq!(panel_offset(7, 5), 3);
        assert_eq!(panel_offset(3, 0), 3);
    }

    #[test]
    fn test_panel_window_uses_clipped_height() {
        // 15 rows tall, so 13 rows fit between the borders
        let clipped = Rect::new(0, 5, 80, 15);
        assert_eq!(panel_window(clipped, 0, 20), (0, 13));
        assert_eq!(panel_window(clipped, 15, 20), (3, 13));

        let roomy = Rect::new(0, 5, 80, 10);
        assert_eq!(panel_window(roomy, 15, 8), (8, 8));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Apple", 10), "Apple");
        assert_eq!(truncate_string("Apple Hospitality REIT", 10), "Apple H...");
        assert_eq!(truncate_string("Société Générale", 8), "Socié...");
        assert_eq!(truncate_string("Apple", 2), "..");
    }
}
