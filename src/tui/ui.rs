//! Frame rendering.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use crate::cpu::registers::GPR_COUNT;
use crate::cpu::RegisterName;
use super::app::{DebuggerApp, Mode};

const KEYS: &str = "s step  r run  p pause  b breakpoint  x reset  ↑/↓ scroll  q quit";

fn panel(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn dim_if_zero(value: u32) -> Style {
    if value == 0 {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    }
}

/// Layout: program and registers on the left, memory on the right,
/// status line across the bottom.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let [body, footer] = Layout::vertical([Constraint::Min(12), Constraint::Length(4)])
        .areas(frame.area());
    let [left, memory] = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .areas(body);
    let [program, registers] = Layout::vertical([Constraint::Min(6), Constraint::Length(14)])
        .areas(left);

    draw_program(frame, program, app);
    draw_registers(frame, registers, app);
    draw_memory(frame, memory, app);
    draw_footer(frame, footer, app);
}

fn draw_program(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let items: Vec<ListItem> = app
        .listing(area.height.saturating_sub(2) as usize)
        .into_iter()
        .map(|row| {
            let marker = match (row.is_pc, row.breakpoint) {
                (true, true) => "●▶",
                (true, false) => " ▶",
                (false, true) => "● ",
                (false, false) => "  ",
            };
            let style = if row.is_pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if row.breakpoint {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            ListItem::new(format!("{} {:03}  {}", marker, row.addr, row.text)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(panel("Program", Color::Cyan)), area);
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let special: Vec<Span> = [RegisterName::Pc, RegisterName::Mar, RegisterName::Mdr, RegisterName::Ir]
        .into_iter()
        .flat_map(|name| {
            let value = regs.read(name, 0).map(|w| w.to_u32()).unwrap_or_default();
            [
                Span::raw(format!("{}=", name)),
                Span::styled(format!("{:08X}  ", value), Style::default().fg(Color::Yellow)),
            ]
        })
        .collect();

    let mut lines = vec![Line::from(special)];
    let rows = GPR_COUNT / 4;
    for row in 0..rows {
        let cells: Vec<Span> = (0..4)
            .map(|col| {
                let index = col * rows + row;
                let value = regs.gpr(index).map(|w| w.to_u32()).unwrap_or_default();
                Span::styled(format!("r{:<2} {:>10}  ", index, value), dim_if_zero(value))
            })
            .collect();
        lines.push(Line::from(cells));
    }

    frame.render_widget(Paragraph::new(lines).block(panel("Registers", Color::Green)), area);
}

fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let pc = app.pc() as usize;
    let boundary = app.cpu.mem.program_start();

    let items: Vec<ListItem> = app
        .cpu
        .mem
        .dump(app.mem_scroll, area.height.saturating_sub(2) as usize)
        .into_iter()
        .map(|(addr, word)| {
            let region = if addr < boundary { "data" } else { "prog" };
            let style = if addr == pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                dim_if_zero(word.to_u32())
            };
            ListItem::new(format!("{:03} {} {:08X} {:>10}", addr, region, word.to_u32(), word.to_u32()))
                .style(style)
        })
        .collect();

    let title = format!("Memory ({} bytes)", app.cpu.mem.len());
    frame.render_widget(List::new(items).block(panel(&title, Color::Magenta)), area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let state_style = match app.mode {
        Mode::Running => Style::default().fg(Color::Green),
        _ if app.cpu.is_running() => Style::default().fg(Color::Cyan),
        _ => Style::default().fg(Color::Red),
    };
    let lines = vec![
        Line::from(vec![
            Span::styled(format!("{:?}", app.cpu.state), state_style),
            Span::raw(format!("  cycles={}  ", app.cpu.cycles)),
            Span::raw(app.status.as_str()),
        ]),
        Line::styled(KEYS, Style::default().fg(Color::DarkGray)),
    ];

    frame.render_widget(Paragraph::new(lines).block(panel("Status", Color::White)), area);
}
