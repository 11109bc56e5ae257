use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::input::{collect_events, Action, AppEvent};
use crate::render::{Terminal, HUD_ROWS};
use crate::starfield::{StarStyle, Starfield, StarfieldOptions};
use crate::surface::PixelCanvas;
use crate::theme::{ThemeMode, ThemeRegistry};
use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const FPS_CAP: u32 = 60;

/// Rotating subtitle, one active at a time.
const ROLES: [&str; 4] = [
    "systems tinkerer",
    "terminal artist",
    "night-sky enthusiast",
    "warp-speed commuter",
];
const ROLE_SWITCH_MS: u128 = 2500;

const SPEED_MIN: f32 = 0.12;
const SPEED_MAX: f32 = 6.0;
const STARS_STEP: usize = 80;
const STARS_MAX: usize = 6000;

pub(crate) fn run() -> Result<()> {
    App::init()?.run()
}

struct App {
    settings: Settings,
    paths: Paths,
    registry: ThemeRegistry,
    term: Terminal,
    canvas: Option<PixelCanvas>,
    field: Option<Starfield>,
    show_help: bool,
    should_quit: bool,
    started: Instant,
}

/// Subpixel canvas covering the whole cell grid, translated so the field
/// draws below the HUD rows. `None` when the terminal reports no real
/// estate at all; the field is then never attached and the app degrades to
/// a HUD.
fn make_canvas(cols: u16, rows: u16) -> Option<PixelCanvas> {
    if cols == 0 || rows == 0 {
        return None;
    }
    let mut canvas = PixelCanvas::new(cols as u32 * 2, rows as u32 * 4);
    canvas.set_translate(0.0, HUD_ROWS as f32 * 4.0);
    Some(canvas)
}

/// The field's own dimensions: the grid minus the HUD rows, in subpixels.
/// The field floors these to 1x1 itself when they collapse.
fn field_dims(cols: u16, rows: u16) -> (u32, u32) {
    (
        cols as u32 * 2,
        rows.saturating_sub(HUD_ROWS) as u32 * 4,
    )
}

fn entropy_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ 0x9E3779B97F4A7C15
}

impl App {
    fn init() -> Result<Self> {
        let paths = project_paths()?;
        let settings = load_settings(&paths.settings_path);
        let registry = ThemeRegistry::builtin(settings.theme);

        let term = Terminal::begin()?;
        let canvas = make_canvas(term.cols, term.rows);
        let field = canvas.as_ref().map(|_| {
            let (w, h) = field_dims(term.cols, term.rows);
            Starfield::new(
                w,
                h,
                StarfieldOptions::default(),
                StdRng::seed_from_u64(entropy_seed()),
            )
        });

        Ok(Self {
            settings,
            paths,
            registry,
            term,
            canvas,
            field,
            show_help: false,
            should_quit: false,
            started: Instant::now(),
        })
    }

    fn run(&mut self) -> Result<()> {
        let frame_dt = Duration::from_nanos(1_000_000_000 / FPS_CAP.max(1) as u64);

        while !self.should_quit {
            let frame_start = Instant::now();

            for ev in collect_events(frame_dt)? {
                match ev {
                    AppEvent::Key(action) => self.apply(action),
                    AppEvent::Resized(cols, rows) => self.on_resize(cols, rows),
                }
            }
            if self.should_quit {
                break;
            }

            let palette = self.registry.palette();
            if let (Some(canvas), Some(field)) = (self.canvas.as_mut(), self.field.as_mut()) {
                field.frame(canvas, &palette);
            }

            let hud = self.hud_lines();
            self.term
                .present(self.canvas.as_ref(), &palette, &hud, self.show_help)?;

            let elapsed = frame_start.elapsed();
            if elapsed < frame_dt {
                std::thread::sleep(frame_dt - elapsed);
            }
        }

        // Unload: stop the loop, persist the theme flag, restore the terminal.
        if let Some(field) = self.field.as_mut() {
            field.teardown();
        }
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        self.term.end()?;
        Ok(())
    }

    fn on_resize(&mut self, cols: u16, rows: u16) {
        self.term.resize(cols, rows);
        self.canvas = make_canvas(cols, rows);
        if let (Some(canvas), Some(field)) = (self.canvas.as_mut(), self.field.as_mut()) {
            let (w, h) = field_dims(cols, rows);
            field.resize(canvas, w, h);
            // resize() reset the transform; restore the HUD offset.
            canvas.set_translate(0.0, HUD_ROWS as f32 * 4.0);
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ThemeToggle => {
                self.registry.toggle();
                self.settings.theme = self.registry.mode();
                self.term.invalidate();
            }
            Action::HelpToggle => {
                self.show_help = !self.show_help;
                self.term.invalidate();
            }
            Action::StyleToggle => {
                if let Some(field) = self.field.as_mut() {
                    let next = match field.style() {
                        StarStyle::Streak => StarStyle::Dot,
                        StarStyle::Dot => StarStyle::Streak,
                    };
                    field.set_style(next);
                }
            }
            Action::WarpToggle => {
                if let Some(field) = self.field.as_mut() {
                    field.toggle_warp();
                }
            }
            Action::PauseToggle => {
                if let Some(field) = self.field.as_mut() {
                    field.toggle_pause();
                }
            }
            Action::Reseed => {
                if let Some(field) = self.field.as_mut() {
                    field.reseed(StdRng::seed_from_u64(entropy_seed()));
                }
            }
            Action::SpeedUp => {
                if let Some(field) = self.field.as_mut() {
                    let s = (field.speed() * 1.08).min(SPEED_MAX);
                    field.set_speed(s);
                }
            }
            Action::SpeedDown => {
                if let Some(field) = self.field.as_mut() {
                    let s = (field.speed() / 1.08).max(SPEED_MIN);
                    field.set_speed(s);
                }
            }
            Action::StarsUp => {
                if let Some(field) = self.field.as_mut() {
                    let n = (field.count() + STARS_STEP).min(STARS_MAX);
                    field.set_count(n);
                }
            }
            Action::StarsDown => {
                if let Some(field) = self.field.as_mut() {
                    let n = field.count().saturating_sub(STARS_STEP);
                    field.set_count(n);
                }
            }
        }
    }

    fn hud_lines(&self) -> Vec<String> {
        let role_idx =
            (self.started.elapsed().as_millis() / ROLE_SWITCH_MS) as usize % ROLES.len();
        let theme = match self.registry.mode() {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        };
        let status = match self.field.as_ref() {
            Some(field) => {
                let style = match field.style() {
                    StarStyle::Streak => "streaks",
                    StarStyle::Dot => "dots",
                };
                format!(
                    "theme:{}  style:{}  stars:{}  speed:{:.2}{}  (Q quit, H help)",
                    theme,
                    style,
                    field.count(),
                    field.speed(),
                    if field.warp() { "  warp" } else { "" },
                )
            }
            None => format!("theme:{}  (no room for stars, resize me)", theme),
        };
        vec![format!("warpfield  {}", ROLES[role_idx]), status]
    }
}
