use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typist::app::{App, Signals};
use typist::config::Config;
use typist::event::{AppEvent, EventHandler, Input, translate};
use typist::keyboard::display::keys_label;
use typist::keyboard::geometry::PhysicalKeyId;
use typist::keyboard::layout::Layout;
use typist::keyboard::registry::LayoutRegistry;
use typist::keyboard::resolver::Highlight;
use typist::lesson::{Lesson, LessonRegistry, LessonSource};
use typist::session::timer::Metrics;

#[derive(Parser)]
#[command(
    name = "typist",
    version,
    about = "Touch-typing tutor with keyboard layout emulation"
)]
struct Cli {
    #[arg(short, long, help = "Keyboard layout to practice (see `typist layouts`)")]
    layout: Option<String>,

    #[arg(long, help = "Layout the host system is configured with")]
    host_layout: Option<String>,

    #[arg(long, help = "Lesson to practice (see `typist lessons`)")]
    lesson: Option<String>,

    #[arg(short = 'n', long, help = "Lesson level, starting at 1")]
    level: Option<usize>,

    #[arg(short, long, help = "Log debug output to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List the available keyboard layouts
    Layouts,
    /// List the available lessons and their levels
    Lessons,
    /// Validate a layout descriptor file
    Check { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = Config::load().unwrap_or_else(|err| {
        warn!("ignoring unreadable config: {err:#}");
        Config::default()
    });
    let layouts = LayoutRegistry::default();
    let lessons = LessonRegistry::default();

    match cli.command {
        Some(Command::Layouts) => return list_layouts(&layouts),
        Some(Command::Lessons) => return list_lessons(&lessons),
        Some(Command::Check { file }) => return check_layout(&layouts, &file),
        None => {}
    }

    if let Some(layout) = cli.layout {
        config.keyboard_layout = layout;
    }
    if let Some(host) = cli.host_layout {
        config.host_layout = host;
    }
    if let Some(lesson) = cli.lesson {
        config.lesson = lesson;
    }
    if let Some(level) = cli.level {
        config.level = level.saturating_sub(1);
    }

    let layout = load_layout(&layouts, &config.keyboard_layout)?;
    let host = load_layout(&layouts, &config.host_layout)?;
    let lesson = lessons
        .load_lesson(&config.lesson)?
        .with_context(|| format!("unknown lesson {}", config.lesson))?;
    config.normalize_level(lesson.level_count());
    info!(
        layout = %config.keyboard_layout,
        host = %config.host_layout,
        lesson = %config.lesson,
        level = config.level,
        "starting practice"
    );

    let header = header(&layout, &lesson, config.level);
    let lines = lesson.lines(config.level).to_vec();
    let mut app = App::new(layout, lines, &config, Screen::default());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let events = EventHandler::new(Duration::from_millis(25));
    let result = run_app(&mut stdout, &mut app, &host, &header, &events);

    execute!(stdout, Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn load_layout(registry: &LayoutRegistry, id: &str) -> Result<Layout> {
    registry
        .load_layout(id)
        .with_context(|| format!("loading layout {id}"))?
        .with_context(|| format!("unknown keyboard layout {id}"))
}

fn header(layout: &Layout, lesson: &Lesson, level: usize) -> String {
    let label = lesson
        .level_labels()
        .into_iter()
        .nth(level)
        .unwrap_or_default();
    format!("{} | {} | level {}", layout.name(), lesson.title, label)
}

fn list_layouts(registry: &LayoutRegistry) -> Result<()> {
    for id in registry.available_layouts() {
        match registry.load_layout(&id) {
            Ok(Some(layout)) => println!("{id:<12} {} ({})", layout.name(), layout.geometry()),
            Ok(None) => {}
            Err(err) => println!("{id:<12} invalid: {err}"),
        }
    }
    Ok(())
}

fn list_lessons(registry: &LessonRegistry) -> Result<()> {
    for id in registry.available_lessons() {
        let Some(lesson) = registry.load_lesson(&id)? else {
            continue;
        };
        println!("{id}: {}", lesson.title);
        for label in lesson.level_labels() {
            println!("  {label}");
        }
    }
    Ok(())
}

fn check_layout(registry: &LayoutRegistry, file: &Path) -> Result<()> {
    let layout = registry
        .load_layout_file(file)
        .with_context(|| format!("checking {}", file.display()))?;
    println!(
        "{}: {} ({}), {} keys, {} dead keys",
        layout.id(),
        layout.name(),
        layout.geometry(),
        layout.mappings().len(),
        layout.dead_keys().count()
    );
    Ok(())
}

/// What the terminal front end shows.
#[derive(Default)]
struct Screen {
    prompt: String,
    input: String,
    highlight: Option<Highlight>,
    error: bool,
    pressed: Vec<PhysicalKeyId>,
    metrics: Option<Metrics>,
    completed: u32,
    dirty: bool,
}

impl Signals for Screen {
    fn highlight_key(&mut self, highlight: Option<&Highlight>) {
        self.highlight = highlight.cloned();
        self.dirty = true;
    }

    fn set_error_flash(&mut self, on: bool) {
        self.error = on;
        self.dirty = true;
    }

    fn set_prompt_text(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
        self.dirty = true;
    }

    fn set_input_text(&mut self, input: &str) {
        self.input = input.to_string();
        self.dirty = true;
    }

    fn set_key_pressed(&mut self, key: PhysicalKeyId, pressed: bool) {
        if pressed {
            self.pressed.push(key);
        } else if let Some(i) = self.pressed.iter().position(|&k| k == key) {
            self.pressed.remove(i);
        }
        self.dirty = true;
    }

    fn set_metrics(&mut self, metrics: Option<&Metrics>) {
        self.metrics = metrics.cloned();
        self.dirty = true;
    }

    fn prompt_completed(&mut self) {
        self.completed += 1;
        self.dirty = true;
    }
}

fn run_app(
    out: &mut impl Write,
    app: &mut App<Screen>,
    host: &Layout,
    header: &str,
    events: &EventHandler,
) -> Result<()> {
    app.signals_mut().dirty = true;
    loop {
        if app.signals().dirty {
            render(out, app.signals(), app.layout(), header)?;
            app.signals_mut().dirty = false;
        }

        match events.next()? {
            AppEvent::Key(key) => match translate(host, &key) {
                Input::Quit => return Ok(()),
                Input::Cancel => app.cancel(),
                Input::Key(physical, level) => app.key_event(physical, level, Instant::now()),
                Input::Ignored => {}
            },
            AppEvent::Tick => {}
            AppEvent::Resize(_, _) => app.signals_mut().dirty = true,
        }
        app.tick(Instant::now());
    }
}

fn render(out: &mut impl Write, screen: &Screen, layout: &Layout, header: &str) -> io::Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0), Print(header))?;

    if screen.prompt.is_empty() {
        queue!(out, MoveTo(0, 2), Print("No exercise for this level."))?;
    } else {
        queue!(out, MoveTo(0, 2), Print(&screen.prompt), MoveTo(0, 3))?;
        let mut expected = screen.prompt.chars();
        for c in screen.input.chars() {
            let color = if expected.next() == Some(c) {
                Color::Green
            } else {
                Color::Red
            };
            queue!(out, SetForegroundColor(color), Print(c))?;
        }
        queue!(out, ResetColor)?;
        if screen.error {
            queue!(out, SetForegroundColor(Color::Red), Print("  <"), ResetColor)?;
        }
    }

    if let Some(highlight) = &screen.highlight {
        let hint = format!(
            "next: {}  ({})",
            keys_label(layout, &highlight.keys),
            highlight.finger.hint()
        );
        queue!(out, MoveTo(0, 5), SetForegroundColor(Color::Yellow), Print(hint), ResetColor)?;
    }
    if !screen.pressed.is_empty() {
        queue!(out, MoveTo(0, 6), Print(keys_label(layout, &screen.pressed)))?;
    }

    let metrics = match &screen.metrics {
        Some(m) => format!(
            "{} cpm  {:.0} wpm  {} typos  {:.0}% accuracy  ({} done)",
            m.speed, m.wpm, m.typos, m.accuracy, screen.completed
        ),
        None => format!("-  ({} done)", screen.completed),
    };
    queue!(
        out,
        MoveTo(0, 8),
        Print(metrics),
        MoveTo(0, 10),
        Print("Esc/Enter: restart prompt   Ctrl+C: quit")
    )?;
    out.flush()
}
