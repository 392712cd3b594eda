/// Terminal front end for the annotated STL viewer
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use log::warn;
use std::fs;
use std::io::{self, stdout, Stdout, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use stlview_core::{AnnotatedViewer, LoadedFile, PointerButton, PointerEvent, Representation};

pub mod config;
pub mod renderer;

pub use config::TerminalConfig;
pub use renderer::TerminalSurface;

/// Rows above the viewport reserved for the header
pub const HEADER_ROWS: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Color,
    Open,
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

/// What a key press outside a prompt does
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    SetRepresentation(Representation),
    CycleRepresentation,
    FocusNext,
    OpenPrompt(PromptKind),
    /// Pitch and yaw, in orbit steps
    Orbit(f32, f32),
    Nothing,
}

pub fn key_action(code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('1') => Action::SetRepresentation(Representation::Points),
        KeyCode::Char('2') => Action::SetRepresentation(Representation::Wireframe),
        KeyCode::Char('3') => Action::SetRepresentation(Representation::Surface),
        KeyCode::Char('m') => Action::CycleRepresentation,
        KeyCode::Tab => Action::FocusNext,
        KeyCode::Char('c') => Action::OpenPrompt(PromptKind::Color),
        KeyCode::Char('o') => Action::OpenPrompt(PromptKind::Open),
        KeyCode::Char('a') => Action::OpenPrompt(PromptKind::Add),
        KeyCode::Up | KeyCode::Char('k') => Action::Orbit(1.0, 0.0),
        KeyCode::Down | KeyCode::Char('j') => Action::Orbit(-1.0, 0.0),
        KeyCode::Left | KeyCode::Char('h') => Action::Orbit(0.0, -1.0),
        KeyCode::Right | KeyCode::Char('l') => Action::Orbit(0.0, 1.0),
        _ => Action::Nothing,
    }
}

/// Pointer press for a mouse-down; row 0.. of the viewport starts below the header
pub fn pointer_event(mouse: &MouseEvent) -> Option<PointerEvent> {
    let MouseEventKind::Down(button) = mouse.kind else {
        return None;
    };
    let button = match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
    };
    let position = (mouse.row >= HEADER_ROWS)
        .then(|| (mouse.column as f32, (mouse.row - HEADER_ROWS) as f32));
    Some(PointerEvent { button, position })
}

/// Read `paths` from disk; unreadable ones are reported instead of loaded
pub fn read_files(paths: &[PathBuf]) -> (Vec<LoadedFile>, Vec<String>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut errors = Vec::new();

    for path in paths {
        match fs::read(path) {
            Ok(bytes) => files.push(LoadedFile::new(file_name(path), bytes)),
            Err(e) => {
                warn!("failed to read {}: {e}", path.display());
                errors.push(format!("{}: {e}", path.display()));
            }
        }
    }

    (files, errors)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn parse_paths(input: &str) -> Vec<PathBuf> {
    input.split_whitespace().map(PathBuf::from).collect()
}

fn fit(text: String, width: u16) -> String {
    text.chars().take(width as usize).collect()
}

/// Main application struct for the terminal viewer
pub struct TerminalApp {
    viewer: AnnotatedViewer<TerminalSurface<Stdout>>,
    config: TerminalConfig,
    initial_paths: Vec<PathBuf>,
    focus: usize,
    prompt: Option<Prompt>,
    messages: Vec<String>,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: TerminalConfig, paths: Vec<PathBuf>) -> Self {
        Self {
            viewer: AnnotatedViewer::new(config.viewer.clone()),
            config,
            initial_paths: paths,
            focus: 0,
            prompt: None,
            messages: Vec::new(),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.mount().and_then(|_| self.main_loop());

        // Cleanup
        self.viewer.teardown();
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn mount(&mut self) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        let surface = TerminalSurface::new(
            stdout(),
            width,
            height.saturating_sub(HEADER_ROWS),
            HEADER_ROWS,
            self.config.cell_aspect,
        );
        self.viewer.initialize(surface);

        let paths = std::mem::take(&mut self.initial_paths);
        if !paths.is_empty() {
            self.open(&paths, false);
        }
        Ok(())
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / self.config.frame_rate.max(1) as u64);

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            // Apply finished decodes
            self.viewer.poll();

            // Render
            self.render()?;

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

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if self.prompt.is_some() {
                    self.handle_prompt_key(key.code);
                } else {
                    self.apply(key_action(key.code));
                }
            }
            Event::Mouse(mouse) => {
                if let Some(pointer) = pointer_event(&mouse) {
                    self.viewer.pointer_press(pointer);
                }
            }
            Event::Resize(width, height) => {
                let height = height.saturating_sub(HEADER_ROWS);
                if let Some(surface) = self.viewer.viewport_mut().surface_mut() {
                    surface.set_size(width, height);
                    if let Err(e) = surface.clear() {
                        warn!("failed to clear terminal after resize: {e}");
                    }
                }
                self.viewer.resize(width as u32, height as u32);
            }
            _ => {}
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::SetRepresentation(mode) => self.viewer.set_representation(mode),
            Action::CycleRepresentation => {
                let next = self.viewer.representation().next();
                self.viewer.set_representation(next);
            }
            Action::FocusNext => {
                let count = self.viewer.files().len();
                if count > 0 {
                    self.focus = (self.focus + 1) % count;
                }
            }
            Action::OpenPrompt(PromptKind::Color) => {
                if !self.viewer.config().annotations {
                    return;
                }
                if let Some(file) = self.viewer.files().get(self.focus) {
                    let current = self.viewer.color_scheme().color_or_default(file.name());
                    self.prompt = Some(Prompt {
                        kind: PromptKind::Color,
                        input: current.to_hex(),
                    });
                }
            }
            Action::OpenPrompt(kind) => {
                self.prompt = Some(Prompt {
                    kind,
                    input: String::new(),
                });
            }
            Action::Orbit(pitch, yaw) => {
                let step = self.config.orbit_step;
                self.viewer.orbit(pitch * step, yaw * step);
            }
            Action::Nothing => {}
        }
    }

    fn handle_prompt_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit(prompt);
                }
            }
            KeyCode::Backspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.input.push(c);
                }
            }
            _ => {}
        }
    }

    fn submit(&mut self, prompt: Prompt) {
        match prompt.kind {
            PromptKind::Color => {
                let name = self
                    .viewer
                    .files()
                    .get(self.focus)
                    .map(|f| f.name().to_string());
                if let Some(name) = name {
                    // Malformed input leaves the color as it was
                    self.viewer.set_color_hex(&name, prompt.input.trim());
                }
            }
            PromptKind::Open => self.open(&parse_paths(&prompt.input), false),
            PromptKind::Add => self.open(&parse_paths(&prompt.input), true),
        }
    }

    fn open(&mut self, paths: &[PathBuf], append: bool) {
        let (files, errors) = read_files(paths);
        self.messages = errors;
        if append {
            self.viewer.add_files(files);
        } else {
            self.viewer.select_files(files);
            self.focus = 0;
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.viewer.redraw();

        let mut stdout = stdout();
        self.draw_overlay(&mut stdout)?;
        stdout.flush()?;
        Ok(())
    }

    fn draw_overlay<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let (width, height) = terminal::size()?;

        queue!(
            out,
            cursor::MoveTo(0, 0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(fit(
                format!(
                    "stlview | {} | FPS: {:.1} | 1/2/3/m=Mode Tab=Focus c=Color o=Open a=Add Arrows=Orbit Click=Pick Q=Quit",
                    self.viewer.representation(),
                    self.fps
                ),
                width
            )),
            ResetColor
        )?;

        let mut row = HEADER_ROWS;
        let mut line = |out: &mut W, text: String, color: Color| -> io::Result<()> {
            queue!(
                out,
                cursor::MoveTo(1, row),
                SetForegroundColor(color),
                Print(fit(text, width.saturating_sub(1))),
                ResetColor
            )?;
            row += 1;
            Ok(())
        };

        for (i, file) in self.viewer.files().iter().enumerate() {
            let marker = if i == self.focus { '>' } else { ' ' };
            match self.viewer.color_scheme().get(file.name()) {
                Some(color) => line(
                    out,
                    format!("{marker} ██ {} {}", color.to_hex(), file.name()),
                    renderer::terminal_color(color),
                )?,
                None => line(out, format!("{marker} {}", file.name()), Color::White)?,
            }
        }

        if let Some(name) = self.viewer.clicked_file() {
            line(out, format!("Clicked File: {name}"), Color::White)?;
        }
        if self.viewer.pending() > 0 {
            line(out, format!("Loading {} file(s)...", self.viewer.pending()), Color::Grey)?;
        }
        for error in self.viewer.load_errors() {
            line(out, format!("{}: {}", error.file_name, error.error), Color::Red)?;
        }
        for message in &self.messages {
            line(out, message.clone(), Color::Red)?;
        }

        if let Some(prompt) = &self.prompt {
            let label = match prompt.kind {
                PromptKind::Color => {
                    let name = self
                        .viewer
                        .files()
                        .get(self.focus)
                        .map(|f| f.name())
                        .unwrap_or_default();
                    format!("Color for {name} (#rrggbb): ")
                }
                PromptKind::Open => "Open STL files: ".to_string(),
                PromptKind::Add => "Add STL files: ".to_string(),
            };
            queue!(
                out,
                cursor::MoveTo(0, height.saturating_sub(1)),
                Clear(ClearType::CurrentLine),
                SetForegroundColor(Color::Cyan),
                Print(fit(format!("{label}{}_", prompt.input), width)),
                ResetColor
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn mode_keys() {
        assert_eq!(
            key_action(KeyCode::Char('2')),
            Action::SetRepresentation(Representation::Wireframe)
        );
        assert_eq!(key_action(KeyCode::Char('m')), Action::CycleRepresentation);
        assert_eq!(key_action(KeyCode::Esc), Action::Quit);
        assert_eq!(key_action(KeyCode::Char('z')), Action::Nothing);
    }

    #[test]
    fn left_click_below_header_is_scene_relative() {
        let event = pointer_event(&mouse(MouseEventKind::Down(MouseButton::Left), 7, 4)).unwrap();
        assert_eq!(event.button, PointerButton::Primary);
        assert_eq!(event.position, Some((7.0, 3.0)));
    }

    #[test]
    fn click_on_header_has_no_position() {
        let event = pointer_event(&mouse(MouseEventKind::Down(MouseButton::Left), 7, 0)).unwrap();
        assert_eq!(event.position, None);
    }

    #[test]
    fn mouse_moves_are_not_presses() {
        assert!(pointer_event(&mouse(MouseEventKind::Moved, 1, 1)).is_none());
        assert!(pointer_event(&mouse(MouseEventKind::Up(MouseButton::Left), 1, 1)).is_none());
    }

    #[test]
    fn unreadable_paths_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("part.stl");
        fs::write(&good, b"solid part\nendsolid part\n").unwrap();
        let missing = dir.path().join("missing.stl");

        let (files, errors) = read_files(&[good, missing]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name(), "part.stl");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("missing.stl"));
    }

    #[test]
    fn prompt_paths_split_on_whitespace() {
        assert_eq!(
            parse_paths("  a.stl  dir/b.stl "),
            vec![PathBuf::from("a.stl"), PathBuf::from("dir/b.stl")]
        );
    }
}
