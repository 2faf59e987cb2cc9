// Sublimation and pressure effects on states of matter.
use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, DisableLineWrap, EnableLineWrap, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const PARTICLES: usize = 10;
const SPACE: f32 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Matter {
    Solid,
    SolidSubliming,
    Liquid,
    Gas,
}

impl Matter {
    fn label(self) -> &'static str {
        match self {
            Matter::Solid => "Solid",
            Matter::SolidSubliming => "Solid (subliming)",
            Matter::Liquid => "Liquid",
            Matter::Gas => "Gas",
        }
    }
    fn color(self) -> Color {
        match self {
            Matter::Solid => Color::Yellow,
            Matter::SolidSubliming => Color::DarkYellow,
            Matter::Liquid => Color::Blue,
            Matter::Gas => Color::Green,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SceneId {
    Camphor,
    Compression,
    DryIce,
}

impl SceneId {
    fn all() -> &'static [SceneId] {
        &[SceneId::Camphor, SceneId::Compression, SceneId::DryIce]
    }
    fn title(self) -> &'static str {
        match self {
            SceneId::Camphor => "Camphor: Solid <-> Gas",
            SceneId::Compression => "Gas Compression & Liquefaction",
            SceneId::DryIce => "Dry Ice: P-T Control",
        }
    }
    fn notes(self) -> &'static [&'static str] {
        match self {
            SceneId::Camphor => &[
                "Heating solid camphor lets particles escape straight into the",
                "gas phase (sublimation); the vapour deposits back on a cool wall.",
                "Above 80 the lattice empties rapidly.",
            ],
            SceneId::Compression => &[
                "A gas liquefies when pressure packs its particles close enough",
                "for the attractive forces to take hold. Cooling helps: the same",
                "pressure goes further at low temperature.",
            ],
            SceneId::DryIce => &[
                "Solid CO2 cannot be a liquid below 5.11 atm; at room pressure it",
                "sublimes, skipping the liquid phase entirely. Push the pressure",
                "past the triple point to see liquid CO2.",
            ],
        }
    }
}

// Camphor sublimation: mild above 40, rapid above 80.
fn camphor_state(temp: f32) -> Matter {
    if temp < 40.0 {
        Matter::Solid
    } else if temp < 80.0 {
        Matter::SolidSubliming
    } else {
        Matter::Gas
    }
}

// Simple P-T demonstration: liquefaction once P/T crosses 0.15.
fn compression_state(temp: f32, pressure: f32) -> Matter {
    if pressure / temp > 0.15 {
        Matter::Liquid
    } else {
        Matter::Gas
    }
}

// Below the 5.11 atm triple-point pressure the liquid phase is skipped.
fn dry_ice_state(pressure: f32) -> Matter {
    if pressure < 5.1 {
        Matter::Gas
    } else {
        Matter::Liquid
    }
}

#[derive(Clone, Copy)]
struct Mote {
    x: f32,
    y: f32,
    rise: f32,
}

struct Sim {
    rng: StdRng,
    scene: SceneId,
    temp: f32,
    pressure: f32,
    running: bool,
    matter: Matter,
    motes: Vec<Mote>,
}

impl Sim {
    fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let motes = (0..PARTICLES)
            .map(|_| Mote {
                x: rng.gen_range(5.0..SPACE - 5.0),
                y: rng.gen_range(5.0..SPACE - 5.0),
                rise: 0.0,
            })
            .collect();
        let mut s = Self {
            rng,
            scene: SceneId::Camphor,
            temp: 50.0,
            pressure: 1.0,
            running: true,
            matter: Matter::Solid,
            motes,
        };
        s.recompute();
        s
    }

    fn recompute(&mut self) {
        self.matter = match self.scene {
            SceneId::Camphor => camphor_state(self.temp),
            SceneId::Compression => compression_state(self.temp, self.pressure),
            SceneId::DryIce => dry_ice_state(self.pressure),
        };
    }

    fn set_scene(&mut self, scene: SceneId) {
        self.scene = scene;
        // per-scene default control values
        match scene {
            SceneId::Camphor => self.temp = 50.0,
            SceneId::Compression => {
                self.temp = 50.0;
                self.pressure = 1.0;
            }
            SceneId::DryIce => self.pressure = 1.0,
        }
        for m in &mut self.motes {
            m.rise = 0.0;
        }
        self.recompute();
    }

    fn reset(&mut self) {
        self.set_scene(self.scene);
    }

    fn nudge_temp(&mut self, delta: f32) {
        if self.scene == SceneId::DryIce {
            return;
        }
        self.temp = (self.temp + delta).clamp(10.0, 100.0);
        self.recompute();
    }

    fn nudge_pressure(&mut self, delta: f32) {
        match self.scene {
            SceneId::Camphor => {}
            SceneId::Compression => {
                self.pressure = (self.pressure + delta * 0.5).clamp(1.0, 10.0);
            }
            SceneId::DryIce => {
                self.pressure = (self.pressure + delta * 0.1).clamp(0.5, 6.0);
            }
        }
        self.recompute();
    }

    // Secondary readout shown next to the state label.
    fn ratio_readout(&self) -> String {
        match self.scene {
            SceneId::Camphor => format!("T = {:.0}", self.temp),
            SceneId::Compression => format!("P/T = {:.3}", self.pressure / self.temp),
            SceneId::DryIce => format!("P = {:.1} atm (triple point 5.11)", self.pressure),
        }
    }

    fn tick(&mut self) {
        if !self.running {
            return;
        }
        let kick = (self.temp / 100.0) * 1.4;
        match self.matter {
            Matter::Solid => {
                for m in &mut self.motes {
                    m.rise = 0.0;
                }
            }
            Matter::SolidSubliming => {
                // one escaping streamer at a time; the lattice stays put
                for m in &mut self.motes {
                    if m.rise > 0.0 {
                        m.rise += 0.8;
                        if m.rise > SPACE {
                            m.rise = 0.0;
                        }
                    } else if self.rng.gen::<f32>() < 0.02 {
                        m.rise = 0.1;
                    }
                }
            }
            Matter::Liquid => {
                for m in &mut self.motes {
                    m.x = (m.x + (self.rng.gen::<f32>() - 0.5) * kick).clamp(10.0, SPACE - 10.0);
                    m.y = (m.y + (self.rng.gen::<f32>() - 0.5) * kick * 0.4)
                        .clamp(SPACE * 0.65, SPACE - 5.0);
                }
            }
            Matter::Gas => {
                for m in &mut self.motes {
                    m.x += (self.rng.gen::<f32>() - 0.5) * kick * 2.5;
                    m.y += (self.rng.gen::<f32>() - 0.5) * kick * 2.5;
                    if m.x < 2.0 || m.x > SPACE - 2.0 {
                        m.x = m.x.clamp(2.0, SPACE - 2.0);
                    }
                    if m.y < 2.0 || m.y > SPACE - 2.0 {
                        m.y = m.y.clamp(2.0, SPACE - 2.0);
                    }
                }
            }
        }
    }
}

fn lattice_pos(i: usize) -> (f32, f32) {
    let col = (i % 5) as f32;
    let row = (i / 5) as f32;
    (15.0 + col * 7.5, 22.0 + row * 7.5)
}

fn draw_frame(out: &mut impl Write, sim: &Sim, w: u16, h: u16) -> io::Result<()> {
    queue!(out, terminal::Clear(terminal::ClearType::All))?;
    if w < 44 || h < 16 {
        queue!(out, cursor::MoveTo(0, 0), Print("terminal too small"))?;
        return Ok(());
    }

    let head = format!(
        "Sublimator  [{}]  state: {:<17}  {}{}",
        sim.scene.title(),
        sim.matter.label(),
        sim.ratio_readout(),
        if sim.running { "" } else { "  [PAUSED]" }
    );
    queue!(
        out,
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::White),
        Print(head)
    )?;
    queue!(
        out,
        cursor::MoveTo(0, 1),
        SetForegroundColor(Color::DarkGrey),
        Print("Keys: 1-3 scene  ↑/↓ temp  +/- pressure  Space run/pause  R reset  Q quit")
    )?;

    // container
    let box_w = (w / 2).clamp(24, 40);
    let box_h = h - 8;
    let ox = 1u16;
    let oy = 3u16;
    queue!(out, SetForegroundColor(Color::Grey))?;
    for x in ox..ox + box_w {
        queue!(out, cursor::MoveTo(x, oy), Print("─"))?;
        queue!(out, cursor::MoveTo(x, oy + box_h - 1), Print("─"))?;
    }
    for y in oy..oy + box_h {
        queue!(out, cursor::MoveTo(ox, y), Print("│"))?;
        queue!(out, cursor::MoveTo(ox + box_w - 1, y), Print("│"))?;
    }

    // particles
    queue!(out, SetForegroundColor(sim.matter.color()))?;
    let to_cell = |x: f32, y: f32| -> (u16, u16) {
        let cx = ox + 1 + ((x / SPACE) * (box_w - 3) as f32).clamp(0.0, (box_w - 3) as f32) as u16;
        let cy = oy + 1 + ((y / SPACE) * (box_h - 3) as f32).clamp(0.0, (box_h - 3) as f32) as u16;
        (cx, cy)
    };
    for (i, m) in sim.motes.iter().enumerate() {
        match sim.matter {
            Matter::Solid | Matter::SolidSubliming => {
                let (lx, ly) = lattice_pos(i);
                let (cx, cy) = to_cell(lx, ly);
                queue!(out, cursor::MoveTo(cx, cy), Print("▣"))?;
                if m.rise > 0.0 {
                    let (sx, sy) = to_cell(lx, (ly - m.rise).max(2.0));
                    queue!(
                        out,
                        SetForegroundColor(Color::Green),
                        cursor::MoveTo(sx, sy),
                        Print("°"),
                        SetForegroundColor(sim.matter.color())
                    )?;
                }
            }
            Matter::Liquid => {
                let (cx, cy) = to_cell(m.x, m.y);
                queue!(out, cursor::MoveTo(cx, cy), Print("●"))?;
            }
            Matter::Gas => {
                let (cx, cy) = to_cell(m.x, m.y);
                queue!(out, cursor::MoveTo(cx, cy), Print("○"))?;
            }
        }
    }

    // notes panel
    let nx = ox + box_w + 2;
    queue!(out, SetForegroundColor(Color::White))?;
    for (j, line) in sim.scene.notes().iter().enumerate() {
        let avail = w.saturating_sub(nx) as usize;
        let line: String = line.chars().take(avail).collect();
        queue!(out, cursor::MoveTo(nx, oy + 1 + j as u16), Print(line))?;
    }
    queue!(out, SetForegroundColor(Color::DarkGrey))?;
    let hint = match sim.scene {
        SceneId::Camphor => "Thresholds: solid below 40, rapid sublimation from 80.",
        SceneId::Compression => "Liquefies once P/T exceeds 0.15.",
        SceneId::DryIce => "Liquid appears at 5.1 atm and above.",
    };
    queue!(out, cursor::MoveTo(nx, oy + 5), Print(hint))?;

    queue!(out, ResetColor)?;
    Ok(())
}

fn main() -> io::Result<()> {
    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen, DisableLineWrap, cursor::Hide)?;
    terminal::enable_raw_mode()?;

    let mut sim = Sim::new(23);
    let tick = Duration::from_secs_f32(1.0 / 30.0);
    let mut last = Instant::now();
    let mut acc = Duration::ZERO;
    let mut quit = false;

    while !quit {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind == KeyEventKind::Press => match k.code {
                    KeyCode::Char('q') | KeyCode::Esc => quit = true,
                    KeyCode::Char(' ') => sim.running = !sim.running,
                    KeyCode::Char('r') => sim.reset(),
                    KeyCode::Char(c @ '1'..='3') => {
                        sim.set_scene(SceneId::all()[c as usize - '1' as usize]);
                    }
                    KeyCode::Up => sim.nudge_temp(1.0),
                    KeyCode::Down => sim.nudge_temp(-1.0),
                    KeyCode::Char('+') | KeyCode::Char('=') => sim.nudge_pressure(1.0),
                    KeyCode::Char('-') => sim.nudge_pressure(-1.0),
                    _ => {}
                },
                _ => {}
            }
        }

        let now = Instant::now();
        acc += now - last;
        last = now;
        while acc >= tick {
            sim.tick();
            acc -= tick;
        }

        let (w, h) = terminal::size()?;
        queue!(out, BeginSynchronizedUpdate)?;
        draw_frame(&mut out, &sim, w, h)?;
        queue!(out, EndSynchronizedUpdate)?;
        out.flush()?;
        std::thread::sleep(Duration::from_millis(16));
    }

    terminal::disable_raw_mode()?;
    execute!(out, ResetColor, cursor::Show, EnableLineWrap, LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camphor_thresholds() {
        assert_eq!(camphor_state(10.0), Matter::Solid);
        assert_eq!(camphor_state(39.9), Matter::Solid);
        assert_eq!(camphor_state(40.0), Matter::SolidSubliming);
        assert_eq!(camphor_state(79.9), Matter::SolidSubliming);
        assert_eq!(camphor_state(80.0), Matter::Gas);
        assert_eq!(camphor_state(100.0), Matter::Gas);
    }

    #[test]
    fn compression_ratio_rule() {
        // P/T must exceed 0.15 for liquefaction
        assert_eq!(compression_state(50.0, 7.5), Matter::Gas); // exactly 0.15
        assert_eq!(compression_state(50.0, 8.0), Matter::Liquid);
        assert_eq!(compression_state(100.0, 10.0), Matter::Gas);
        assert_eq!(compression_state(10.0, 2.0), Matter::Liquid);
    }

    #[test]
    fn dry_ice_triple_point() {
        assert_eq!(dry_ice_state(0.5), Matter::Gas);
        assert_eq!(dry_ice_state(5.0), Matter::Gas);
        assert_eq!(dry_ice_state(5.1), Matter::Liquid);
        assert_eq!(dry_ice_state(6.0), Matter::Liquid);
    }

    #[test]
    fn pause_freezes_motes() {
        let mut sim = Sim::new(1);
        sim.set_scene(SceneId::Camphor);
        sim.temp = 95.0;
        sim.recompute();
        sim.running = false;
        let before: Vec<(u32, u32)> = sim.motes.iter().map(|m| (m.x.to_bits(), m.y.to_bits())).collect();
        for _ in 0..20 {
            sim.tick();
        }
        let after: Vec<(u32, u32)> = sim.motes.iter().map(|m| (m.x.to_bits(), m.y.to_bits())).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn gas_motes_stay_in_container() {
        let mut sim = Sim::new(9);
        sim.temp = 100.0;
        sim.recompute();
        assert_eq!(sim.matter, Matter::Gas);
        for _ in 0..500 {
            sim.tick();
            for m in &sim.motes {
                assert!(m.x >= 2.0 && m.x <= SPACE - 2.0);
                assert!(m.y >= 2.0 && m.y <= SPACE - 2.0);
            }
        }
    }

    #[test]
    fn liquid_motes_pool_at_the_bottom() {
        let mut sim = Sim::new(4);
        sim.set_scene(SceneId::Compression);
        sim.temp = 10.0;
        sim.pressure = 5.0;
        sim.recompute();
        assert_eq!(sim.matter, Matter::Liquid);
        for _ in 0..200 {
            sim.tick();
        }
        for m in &sim.motes {
            assert!(m.y >= SPACE * 0.65 && m.y <= SPACE - 5.0);
            assert!(m.x >= 10.0 && m.x <= SPACE - 10.0);
        }
    }

    #[test]
    fn scene_switch_restores_defaults() {
        let mut sim = Sim::new(2);
        sim.set_scene(SceneId::DryIce);
        sim.nudge_pressure(30.0);
        assert!(sim.pressure > 1.0);
        sim.reset();
        assert_eq!(sim.pressure, 1.0);
        sim.set_scene(SceneId::Compression);
        assert_eq!(sim.temp, 50.0);
        assert_eq!(sim.pressure, 1.0);
    }

    #[test]
    fn pressure_clamps_per_scene() {
        let mut sim = Sim::new(2);
        sim.set_scene(SceneId::DryIce);
        for _ in 0..100 {
            sim.nudge_pressure(1.0);
        }
        assert!(sim.pressure <= 6.0);
        assert_eq!(sim.matter, Matter::Liquid);
        for _ in 0..100 {
            sim.nudge_pressure(-1.0);
        }
        assert!(sim.pressure >= 0.5);
        assert_eq!(sim.matter, Matter::Gas);
        // temp slider is inert in the dry ice scene
        let p = sim.pressure;
        sim.nudge_temp(5.0);
        assert_eq!(sim.pressure, p);
    }
}
