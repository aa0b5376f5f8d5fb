//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::{ExecState, Register};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: program, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(6),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_program(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, narration and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Min(6),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_output(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw the instruction table with PC marker and edit selection.
fn draw_program(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let pc = app.engine.regs.pc;

    let items: Vec<ListItem> = app
        .engine
        .program()
        .iter()
        .map(|(addr, instr)| {
            let is_current = addr == pc;
            let prefix = if is_current { "▶ " } else { "  " };
            let sel = if addr == app.selected { "›" } else { " " };
            let text = format!("{} {}{:03}: {}", sel, prefix, addr, instr);

            let style = if is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if addr == app.selected {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Program ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw register state, highlighting the ones the last step wrote.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.engine.regs;

    let content = vec![
        Line::from(vec![
            Span::raw("AC: "),
            Span::styled(format!("{:>12}", regs.ac), register_style(app, Register::Ac)),
            Span::raw("   PC: "),
            Span::styled(format!("{}", regs.pc), register_style(app, Register::Pc)),
        ]),
        Line::from(vec![
            Span::raw("IR: "),
            Span::styled(format!("{:>12}", regs.ir_text()), register_style(app, Register::Ir)),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", app.engine.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.engine.state()), state_style(app.engine.state())),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw the data cells the program references.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let touched = app.touched_address();
    let addresses = app.engine.program().data_addresses();

    let items: Vec<ListItem> = app
        .engine
        .mem
        .dump(&addresses)
        .into_iter()
        .map(|(addr, value)| {
            let text = format!("{:03}: {}", addr, value);

            let style = if touched == Some(addr) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.engine.mem.contains(addr) {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the tail of the narration log.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible = (area.height as usize).saturating_sub(2);
    let lines = app.engine.narration();
    let start = lines.len().saturating_sub(visible);

    let content: Vec<Line> = lines[start..].iter().map(|l| Line::from(l.as_str())).collect();

    let border = if app.engine.is_halted() { Color::Red } else { Color::Blue };
    let output = Paragraph::new(content)
        .block(Block::default()
            .title(" Output ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)));

    frame.render_widget(output, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  x: Reset  q: Quit"),
        Line::from("↑↓: Select  t: Type  +/-: Operand  g: Generate"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

fn register_style(app: &DebuggerApp, reg: Register) -> Style {
    if app.register_changed(reg) {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

fn state_style(state: ExecState) -> Style {
    match state {
        ExecState::Ready => Style::default().fg(Color::Green),
        ExecState::Running => Style::default().fg(Color::Cyan),
        ExecState::Halted => Style::default().fg(Color::Red),
    }
}
