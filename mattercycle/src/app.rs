use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, map_key, Msg};
use crate::render::{frame, Terminal};
use crate::sim::SimState;
use anyhow::{bail, Result};
use std::time::{Duration, Instant};

const SIM_HZ: f32 = 30.0;

pub(crate) struct App {
    settings: Settings,
    state: SimState,
    paths: Paths,
    term: Terminal,
    should_quit: bool,
}

impl App {
    fn init() -> Result<Self> {
        let paths = project_paths()?;
        let settings = load_settings(&paths.settings_path);

        // Startup guard: refuse to draw into a terminal that cannot hold the
        // layout rather than scribbling over the shell.
        let (cols, rows) = crossterm::terminal::size()?;
        if cols < 60 || rows < 20 {
            bail!("mattercycle needs at least a 60x20 terminal, got {cols}x{rows}");
        }

        let state = SimState::new(settings.seed, settings.start_scene);
        let term = Terminal::begin()?;

        Ok(Self {
            settings,
            state,
            paths,
            term,
            should_quit: false,
        })
    }

    fn run(&mut self) -> Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 120);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let sim_step = Duration::from_secs_f32(1.0 / SIM_HZ);

        let mut last = Instant::now();
        let mut acc = Duration::ZERO;

        while !self.should_quit {
            self.term.resize_if_needed()?;

            for key in collect_input_nonblocking(frame_dt)? {
                match map_key(key) {
                    Some(Msg::Quit) => self.should_quit = true,
                    Some(Msg::Sim(action)) => self.state.apply(action),
                    None => {}
                }
            }

            let now = Instant::now();
            acc = acc.saturating_add(now.saturating_duration_since(last));
            last = now;
            while acc >= sim_step {
                self.state.tick(sim_step.as_secs_f32());
                acc = acc.saturating_sub(sim_step);
            }

            frame(&mut self.term, &self.state);
            self.term.present(self.settings.enable_color)?;

            spin_sleep(frame_dt, Instant::now());
        }

        self.settings.start_scene = self.state.scene;
        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        Ok(())
    }
}

pub(crate) fn run() -> Result<()> {
    let mut app = App::init()?;
    app.run()?;
    Ok(())
}

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
