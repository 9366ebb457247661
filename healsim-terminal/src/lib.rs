/// Terminal front end: the healing scenes rendered as ASCII art
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use healsim_core::{SceneHost, SceneKind};
use std::io::{self, stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod environment;
pub mod renderer;

pub use environment::TerminalEnvironment;
pub use renderer::{AsciiRenderer, Framebuffer};

/// Rows reserved at the top of the screen for the status line
const STATUS_ROWS: u16 = 1;

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// What a key press asks the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(SceneKind),
    Quit,
}

impl Command {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
            KeyCode::Char('1') | KeyCode::Char('s') => Some(Command::Select(SceneKind::Starlight)),
            KeyCode::Char('2') | KeyCode::Char('f') => Some(Command::Select(SceneKind::Forest)),
            KeyCode::Char('3') | KeyCode::Char('o') => Some(Command::Select(SceneKind::Ocean)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    pub scene: SceneKind,
    pub seed: u64,
    pub fps: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scene: SceneKind::default(),
            seed: 0,
            fps: 30,
        }
    }
}

/// Main application struct for terminal scene rendering
pub struct TerminalApp {
    env: Rc<TerminalEnvironment>,
    host: SceneHost<TerminalEnvironment>,
    config: AppConfig,
    running: bool,
    started: Instant,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: AppConfig) -> Result<Self, TerminalError> {
        let (width, height) = terminal::size()?;
        let env = Rc::new(TerminalEnvironment::new(width, height.saturating_sub(STATUS_ROWS)));
        Ok(Self::with_environment(env, config))
    }

    pub fn with_environment(env: Rc<TerminalEnvironment>, config: AppConfig) -> Self {
        let host = SceneHost::with_seed(Rc::clone(&env), config.seed);
        Self {
            env,
            host,
            config,
            running: true,
            started: Instant::now(),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Switch scenes. A scene that cannot mount (e.g. no rows left for it)
    /// leaves the preview idle rather than ending it.
    pub fn select_scene(&mut self, kind: SceneKind) {
        if let Err(e) = self.host.select(kind) {
            log::warn!("could not show {kind}: {e}");
        }
    }

    pub fn active(&self) -> Option<SceneKind> {
        self.host.active()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> Result<(), TerminalError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        self.select_scene(self.config.scene);
        let result = self.main_loop();
        self.host.unmount();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<(), TerminalError> {
        let target_frame_time = Duration::from_millis(1000 / u64::from(self.config.fps.max(1)));

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            // Advance and render the active scene
            self.env.pump_frames(self.started.elapsed().as_secs_f64() * 1000.0);
            self.draw()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<(), TerminalError> {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                match Command::from_key(code) {
                    Some(Command::Quit) => self.running = false,
                    Some(Command::Select(scene)) => {
                        self.select_scene(scene);
                        execute!(stdout(), terminal::Clear(ClearType::All))?;
                    }
                    None => {}
                }
            }
            Event::Resize(width, height) => {
                self.env.dispatch_resize(width, height.saturating_sub(STATUS_ROWS));
                execute!(stdout(), terminal::Clear(ClearType::All))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn draw(&self) -> Result<(), TerminalError> {
        let mut stdout = stdout();

        if let Some(surface) = self.env.surface() {
            surface.borrow().draw(&mut stdout, STATUS_ROWS)?;
        }

        let label = self.host.active().map(SceneKind::label).unwrap_or("none");
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(status_line(label, self.fps)),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

fn status_line(label: &str, fps: f32) -> String {
    format!("Healing Simulator | {label} | FPS: {fps:.1} | 1=Starlight 2=Forest 3=Ocean Q=Quit")
}
