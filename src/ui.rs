use crate::app::Wall;
use crate::format::{format_file_size, format_speed, format_time};
use crate::model::MAX_PLAYERS;
use crate::player::Player;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use std::time::Instant;

const APP_TITLE_WITH_VERSION: &str = "VidWall v0.1.0  ";
const KEY_HINT: &str = "1-9 select | Space play | <-/-> skip | Up/Down speed | n/p next/prev | s shuffle | m mute | f full | Ctrl+N add | Del remove | : command";

#[derive(Debug, Default)]
pub struct ViewState {
    pub command_mode: bool,
    pub command_buffer: String,
    pub confirm_clear: bool,
}

#[derive(Clone, Copy)]
struct ThemePalette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    active_border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    popup_bg: Color,
}

const PALETTE: ThemePalette = ThemePalette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    border: Color::Rgb(69, 121, 176),
    active_border: Color::Rgb(100, 203, 184),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
    popup_bg: Color::Rgb(22, 33, 51),
};

pub fn draw(frame: &mut Frame, wall: &Wall, view: &ViewState) {
    let colors = PALETTE;
    let now = Instant::now();
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE_WITH_VERSION,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Players {}/{MAX_PLAYERS}", wall.len()),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!(
                "Active {}",
                wall.active_id()
                    .map_or_else(|| String::from("-"), |id| id.to_string())
            ),
            Style::default().fg(colors.alert),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("Engine {}", wall.engine_name()),
            Style::default().fg(colors.muted),
        ),
    ]))
    .block(panel_block("Video Wall", colors.panel_bg, colors.text, colors.border));
    frame.render_widget(header, vertical[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
        .split(vertical[1]);

    draw_grid(frame, wall, body[0], now, &colors);
    draw_master_playlist(frame, wall, body[1], &colors);

    let perf = wall.performance();
    let stats = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "Players {}  Active videos {}  Queued {}",
                perf.total_players, perf.active_videos, perf.queued_files
            ),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("~{} MB  Load {}% ", perf.memory_mb, perf.load_percent),
            Style::default().fg(if perf.load_percent >= 80 {
                colors.alert
            } else {
                colors.accent
            }),
        ),
        Span::styled(
            progress_bar(Some(f64::from(perf.load_percent) / 100.0), 20),
            Style::default().fg(colors.muted),
        ),
    ]))
    .block(panel_block("Performance", colors.panel_bg, colors.text, colors.border));
    frame.render_widget(stats, vertical[2]);

    let (footer_text, footer_color) = if view.command_mode {
        (format!(":{}", view.command_buffer), colors.text)
    } else if view.confirm_clear {
        (
            String::from("Clear all playlists? This cannot be undone. (y/n)"),
            colors.alert,
        )
    } else if let Some(notice) = wall.sink().notice(None, now) {
        (notice.to_string(), colors.accent)
    } else {
        (String::from(KEY_HINT), colors.muted)
    };
    let footer = Paragraph::new(Span::styled(footer_text, Style::default().fg(footer_color)))
        .block(panel_block("Status", colors.panel_bg, colors.text, colors.border));
    frame.render_widget(footer, vertical[3]);

    if let Some(alert) = wall.sink().current_alert() {
        draw_alert(frame, alert, wall.sink().pending_alerts(), &colors);
    }
}

/// Rows and columns for `count` panels, as square as possible.
pub fn grid_shape(count: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let mut cols = 1;
    while cols * cols < count {
        cols += 1;
    }
    (count.div_ceil(cols), cols)
}

fn draw_grid(frame: &mut Frame, wall: &Wall, area: Rect, now: Instant, colors: &ThemePalette) {
    if let Some(active) = wall.active().filter(|player| player.is_fullscreen()) {
        draw_player(frame, wall, active, area, now, colors);
        return;
    }

    let (rows, cols) = grid_shape(wall.len());
    if rows == 0 {
        return;
    }
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    for (row, chunk) in wall.players().chunks(cols).enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, cols as u32); cols])
            .split(row_areas[row]);
        for (col, player) in chunk.iter().enumerate() {
            draw_player(frame, wall, player, cells[col], now, colors);
        }
    }
}

fn draw_player(
    frame: &mut Frame,
    wall: &Wall,
    player: &Player,
    area: Rect,
    now: Instant,
    colors: &ThemePalette,
) {
    let active = wall.is_active(player.id());
    let title = if active {
        format!("Player {} (active)", player.id())
    } else {
        format!("Player {}", player.id())
    };
    let border = if active {
        colors.active_border
    } else {
        colors.border
    };

    let mut lines = Vec::new();
    if let Some(notice) = wall.sink().notice(Some(player.id()), now) {
        lines.push(Line::from(Span::styled(
            notice.to_string(),
            Style::default().fg(colors.alert),
        )));
    }

    match player.current_file().filter(|_| player.is_loaded()) {
        Some(file) => {
            lines.push(Line::from(Span::styled(
                file.name.clone(),
                Style::default().fg(colors.text).add_modifier(Modifier::BOLD),
            )));
            let state = if player.is_playing() { ">" } else { "||" };
            let total = player.duration();
            let ratio = total
                .map(|duration| duration.as_secs_f64())
                .filter(|secs| *secs > 0.0)
                .map(|secs| player.position().as_secs_f64() / secs);
            let bar_width = usize::from(area.width.saturating_sub(22)).min(40);
            lines.push(Line::from(Span::styled(
                format!(
                    "{state} {} / {} {}",
                    format_time(Some(player.position())),
                    format_time(total),
                    progress_bar(ratio, bar_width)
                ),
                Style::default().fg(colors.accent),
            )));
        }
        None => lines.push(Line::from(Span::styled(
            match player.last_error() {
                Some(code) => format!("Error: {code}"),
                None => format!("No video loaded in Player {}", player.id()),
            },
            Style::default().fg(colors.muted),
        ))),
    }

    let mut flags = vec![format_speed(player.speed())];
    if player.is_shuffled() {
        flags.push(String::from("shuffle"));
    }
    if player.is_output_muted() {
        flags.push(String::from("muted"));
    }
    if player.is_fullscreen() {
        flags.push(String::from("fullscreen"));
    }
    flags.push(format!("{} in playlist", player.playlist().len()));
    lines.push(Line::from(Span::styled(
        flags.join(" | "),
        Style::default().fg(colors.muted),
    )));

    let current = player.current_index();
    for (index, file) in player.playlist().iter().enumerate() {
        let marker = if Some(index) == current { "> " } else { "  " };
        let style = if Some(index) == current {
            Style::default().fg(colors.accent)
        } else {
            Style::default().fg(colors.text)
        };
        lines.push(Line::from(Span::styled(
            format!("{marker}{}. {}", index + 1, file.name),
            style,
        )));
    }

    let panel = Paragraph::new(lines)
        .block(panel_block(&title, colors.panel_bg, colors.text, border))
        .wrap(Wrap { trim: true });
    frame.render_widget(panel, area);
}

fn draw_master_playlist(frame: &mut Frame, wall: &Wall, area: Rect, colors: &ThemePalette) {
    let entries = wall.master_playlist();
    let items: Vec<ListItem> = if entries.is_empty() {
        vec![ListItem::new(Span::styled(
            "No videos loaded",
            Style::default().fg(colors.muted),
        ))]
    } else {
        entries
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(vec![
                    Span::styled(entry.name.clone(), Style::default().fg(colors.text)),
                    Span::styled(
                        format!("  P{} {}", entry.player, format_file_size(entry.size_bytes)),
                        Style::default().fg(colors.muted),
                    ),
                ]))
            })
            .collect()
    };

    let title = format!("All Videos ({})", entries.len());
    let list = List::new(items).block(panel_block(
        &title,
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(list, area);
}

fn draw_alert(frame: &mut Frame, message: &str, pending: usize, colors: &ThemePalette) {
    let popup = centered_rect(frame.area(), 70, 60);
    frame.render_widget(Clear, popup);
    let title = if pending > 1 {
        format!("Notice 1/{pending} (Enter to dismiss)")
    } else {
        String::from("Notice (Enter to dismiss)")
    };
    let body = Paragraph::new(message.to_string())
        .style(Style::default().fg(colors.text))
        .block(panel_block(&title, colors.popup_bg, colors.alert, colors.alert))
        .wrap(Wrap { trim: false });
    frame.render_widget(body, popup);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}
