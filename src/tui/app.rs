//! Debugger state and the terminal event loop.

use crate::{Cpu, MachineConfig, Word};
use crate::asm::disasm::{disassemble_instruction, format_instruction};
use crossterm::event::KeyCode;
use std::collections::HashSet;

/// What the debugger is doing between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Paused,
    Running,
    Quit,
}

/// One row of the program pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub addr: u32,
    pub text: String,
    pub is_pc: bool,
    pub breakpoint: bool,
}

/// Interactive debugger over a single loaded program.
pub struct DebuggerApp {
    pub cpu: Cpu,
    /// Words reloaded on every reset.
    image: Vec<Word>,
    /// Breakpoints, as word addresses.
    pub breakpoints: HashSet<u32>,
    pub mode: Mode,
    pub status: String,
    /// First word shown in the memory pane.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    pub fn new(config: MachineConfig, image: Vec<Word>) -> Self {
        let mut app = Self {
            cpu: Cpu::new(config),
            image,
            breakpoints: HashSet::new(),
            mode: Mode::Paused,
            status: String::new(),
            mem_scroll: 0,
        };
        app.reload();
        app
    }

    pub fn pc(&self) -> u32 {
        self.cpu.regs.pc().unwrap_or_default()
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.mode = Mode::Quit,
            KeyCode::Char('s') => {
                self.mode = Mode::Paused;
                self.single_step();
            }
            KeyCode::Char('r') => {
                self.mode = Mode::Running;
                self.status = "Running...".into();
            }
            KeyCode::Char('p') => {
                self.mode = Mode::Paused;
                self.status = format!("Paused at PC={}", self.pc());
            }
            KeyCode::Char('b') => self.toggle_breakpoint(),
            KeyCode::Char('x') => self.reload(),
            KeyCode::Up => self.mem_scroll = self.mem_scroll.saturating_sub(1),
            KeyCode::Down => {
                let last = self.cpu.mem.word_count().saturating_sub(1);
                self.mem_scroll = (self.mem_scroll + 1).min(last);
            }
            _ => {}
        }
    }

    /// Advance continuous execution by one instruction, stopping at
    /// breakpoints, halts and faults.
    pub fn tick(&mut self) {
        if self.mode != Mode::Running {
            return;
        }
        if !self.cpu.is_running() {
            self.mode = Mode::Paused;
            self.status = format!("{:?} after {} cycles", self.cpu.state, self.cpu.cycles);
            return;
        }
        let pc = self.pc();
        if self.breakpoints.contains(&pc) {
            self.mode = Mode::Paused;
            self.status = format!("Breakpoint at PC={}", pc);
            return;
        }
        self.single_step();
    }

    fn single_step(&mut self) {
        let pc = self.pc();
        self.status = match self.cpu.step() {
            Ok(instr) => format!("{:03}: {}", pc, format_instruction(&instr)),
            Err(e) => {
                self.mode = Mode::Paused;
                e.to_string()
            }
        };
    }

    fn toggle_breakpoint(&mut self) {
        let pc = self.pc();
        let verb = if self.breakpoints.insert(pc) {
            "Set"
        } else {
            self.breakpoints.remove(&pc);
            "Cleared"
        };
        self.status = format!("{} breakpoint at PC={}", verb, pc);
    }

    /// Reinitialize the machine from the loaded image. Breakpoints survive.
    fn reload(&mut self) {
        self.mode = Mode::Paused;
        self.status = match self.cpu.initialize_image(&self.image) {
            Ok(start) => format!(
                "Loaded {} words at {}. s: step  r: run  q: quit",
                self.image.len(),
                start
            ),
            Err(e) => format!("Load failed: {}", e),
        };
    }

    /// Program-region rows centred on PC where possible.
    pub fn listing(&self, rows: usize) -> Vec<ListingRow> {
        let pc = self.pc() as usize;
        let first = pc
            .saturating_sub(rows / 2)
            .max(self.cpu.mem.program_start());

        self.cpu
            .mem
            .dump(first, rows)
            .into_iter()
            .map(|(addr, word)| ListingRow {
                addr: addr as u32,
                text: disassemble_instruction(word),
                is_pc: addr == pc,
                breakpoint: self.breakpoints.contains(&(addr as u32)),
            })
            .collect()
    }
}

/// Open the terminal debugger on `image`.
pub fn run_debugger(config: MachineConfig, image: Vec<Word>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut app = DebuggerApp::new(config, image);

    while app.mode != Mode::Quit {
        terminal.draw(|frame| super::ui::draw(frame, &app))?;

        if event::poll(Duration::from_millis(30))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
        app.tick();
    }

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
