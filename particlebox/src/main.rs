// src/main.rs
use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, DisableLineWrap, EnableLineWrap, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const DOT_COUNT: usize = 25;
const LENS_SPAN: f32 = 80.0;

#[derive(Clone, Copy)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb {
    fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| -> u8 {
            (x as f32 + (y as f32 - x as f32) * t).round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: mix(a.r, b.r),
            g: mix(a.g, b.g),
            b: mix(a.b, b.b),
        }
    }
    fn to_color(self) -> Color {
        Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

const COOL: Rgb = Rgb { r: 59, g: 130, b: 246 };
const HOT: Rgb = Rgb { r: 239, g: 68, b: 68 };
const LATTICE: Rgb = Rgb { r: 245, g: 158, b: 11 };

#[derive(Clone)]
struct Cell {
    ch: char,
    fg: Rgb,
    bg: Rgb,
}

const BG: Rgb = Rgb { r: 8, g: 10, b: 16 };

struct Screen {
    w: u16,
    h: u16,
    prev: Vec<Cell>,
    next: Vec<Cell>,
}

impl Screen {
    fn new(w: u16, h: u16) -> Self {
        let blank = Cell {
            ch: ' ',
            fg: Rgb { r: 220, g: 225, b: 235 },
            bg: BG,
        };
        let n = w as usize * h as usize;
        Self {
            w,
            h,
            prev: vec![blank.clone(); n],
            next: vec![blank; n],
        }
    }

    fn resize(&mut self, w: u16, h: u16) {
        if self.w != w || self.h != h {
            *self = Self::new(w, h);
        }
    }

    fn clear_next(&mut self) {
        for c in &mut self.next {
            c.ch = ' ';
            c.fg = Rgb { r: 220, g: 225, b: 235 };
            c.bg = BG;
        }
    }

    fn put(&mut self, x: u16, y: u16, ch: char, fg: Rgb) {
        if x >= self.w || y >= self.h {
            return;
        }
        let i = y as usize * self.w as usize + x as usize;
        self.next[i] = Cell { ch, fg, bg: BG };
    }

    fn text(&mut self, x: u16, y: u16, s: &str, fg: Rgb) {
        for (i, ch) in s.chars().enumerate() {
            self.put(x + i as u16, y, ch, fg);
        }
    }

    fn flush<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let mut last_fg: Option<(u8, u8, u8)> = None;
        let mut last_bg: Option<(u8, u8, u8)> = None;
        for y in 0..self.h {
            for x in 0..self.w {
                let i = y as usize * self.w as usize + x as usize;
                let a = &self.prev[i];
                let b = &self.next[i];
                if a.ch == b.ch
                    && (a.fg.r, a.fg.g, a.fg.b) == (b.fg.r, b.fg.g, b.fg.b)
                    && (a.bg.r, a.bg.g, a.bg.b) == (b.bg.r, b.bg.g, b.bg.b)
                {
                    continue;
                }
                queue!(out, cursor::MoveTo(x, y))?;
                if last_bg != Some((b.bg.r, b.bg.g, b.bg.b)) {
                    queue!(out, SetBackgroundColor(b.bg.to_color()))?;
                    last_bg = Some((b.bg.r, b.bg.g, b.bg.b));
                }
                if last_fg != Some((b.fg.r, b.fg.g, b.fg.b)) {
                    queue!(out, SetForegroundColor(b.fg.to_color()))?;
                    last_fg = Some((b.fg.r, b.fg.g, b.fg.b));
                }
                queue!(out, Print(b.ch))?;
            }
        }
        std::mem::swap(&mut self.prev, &mut self.next);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Solid,
    Liquid,
    Gas,
    Melting,
    Boiling,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Solid => "Solid",
            Phase::Liquid => "Liquid",
            Phase::Gas => "Gas",
            Phase::Melting => "Melting",
            Phase::Boiling => "Boiling",
        }
    }
    fn color(self) -> Rgb {
        match self {
            Phase::Solid => LATTICE,
            Phase::Liquid => Rgb { r: 96, g: 165, b: 250 },
            Phase::Gas => Rgb { r: 167, g: 243, b: 208 },
            Phase::Melting | Phase::Boiling => HOT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SceneId {
    Solid,
    Liquid,
    Gas,
    StateChange,
    ParticleModel,
}

impl SceneId {
    fn all() -> &'static [SceneId] {
        &[
            SceneId::Solid,
            SceneId::Liquid,
            SceneId::Gas,
            SceneId::StateChange,
            SceneId::ParticleModel,
        ]
    }
    fn name(self) -> &'static str {
        match self {
            SceneId::Solid => "Solid",
            SceneId::Liquid => "Liquid",
            SceneId::Gas => "Gas",
            SceneId::StateChange => "State Change",
            SceneId::ParticleModel => "Particle Model",
        }
    }
    // Typical control values applied when the scene is entered. ParticleModel
    // leaves the sliders wherever the user put them.
    fn preset(self) -> Option<(f32, f32, f32)> {
        match self {
            SceneId::Solid => Some((-10.0, 80.0, 30.0)),
            SceneId::Liquid => Some((30.0, 50.0, 40.0)),
            SceneId::Gas => Some((80.0, 20.0, 80.0)),
            SceneId::StateChange => None,
            SceneId::ParticleModel => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Model,
    Visual,
    Analogy,
    Cause,
    Fix,
}

impl Tab {
    fn all() -> &'static [Tab] {
        &[Tab::Model, Tab::Visual, Tab::Analogy, Tab::Cause, Tab::Fix]
    }
    fn title(self) -> &'static str {
        match self {
            Tab::Model => "Model",
            Tab::Visual => "Visual",
            Tab::Analogy => "Analogy",
            Tab::Cause => "Cause",
            Tab::Fix => "Fix",
        }
    }
    fn next(self) -> Tab {
        let all = Tab::all();
        let i = all.iter().position(|t| *t == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }
    fn body(self) -> &'static [&'static str] {
        match self {
            Tab::Model => &[
                "Particles are always in motion; temperature measures their",
                "average kinetic energy. Attractive forces are strong in solids,",
                "weaker in liquids, nearly absent in gases. Spacing sets the state.",
            ],
            Tab::Visual => &[
                "The lens shows a magnified particle view: arrangement, spacing",
                "and motion. The gauge tracks kinetic energy from the Temp slider.",
                "Readouts give mean particle distance and kinetic energy.",
            ],
            Tab::Analogy => &[
                "Solid: a tight crowd, nobody leaves their spot.",
                "Liquid: people walking a room, passing each other, still inside.",
                "Gas: people running an open field, far apart, every direction.",
            ],
            Tab::Cause => &[
                "Higher temperature -> higher kinetic energy -> faster motion",
                "-> attraction overcome -> spacing grows -> solid to liquid to gas.",
            ],
            Tab::Fix => &[
                "Particles do not expand when heated; the space between them does.",
                "Solid particles still vibrate in place; motion stops only at",
                "absolute zero. Attraction, not pressure, holds a solid's shape.",
            ],
        }
    }
}

// Three-zone rule: a stronger intermolecular force pushes both transition
// temperatures upward.
fn classify(temp: f32, force: f32) -> Phase {
    let threshold = force * 1.2;
    if temp < threshold - 20.0 {
        Phase::Solid
    } else if temp < threshold + 50.0 {
        Phase::Liquid
    } else {
        Phase::Gas
    }
}

// Water heating curve: temperature against cumulative heat, with flat
// segments for the fusion (33.4 units) and vaporisation (226 units) plateaus.
const WATER_CURVE: [(f32, f32); 6] = [
    (0.0, -20.0),
    (40.0, 0.0),
    (73.4, 0.0),
    (173.4, 100.0),
    (399.4, 100.0),
    (419.4, 120.0),
];

fn curve_max_time() -> f32 {
    WATER_CURVE[WATER_CURVE.len() - 1].0
}

fn curve_temp(time: f32) -> f32 {
    let time = time.clamp(0.0, curve_max_time());
    for i in 1..WATER_CURVE.len() {
        let (t0, temp0) = WATER_CURVE[i - 1];
        let (t1, temp1) = WATER_CURVE[i];
        if time <= t1 {
            let span = t1 - t0;
            let f = if span <= 0.0 { 0.0 } else { (time - t0) / span };
            return temp0 + (temp1 - temp0) * f;
        }
    }
    WATER_CURVE[WATER_CURVE.len() - 1].1
}

fn curve_phase(time: f32) -> Phase {
    let time = time.clamp(0.0, curve_max_time());
    if time < WATER_CURVE[1].0 {
        Phase::Solid
    } else if time < WATER_CURVE[2].0 {
        Phase::Melting
    } else if time < WATER_CURVE[3].0 {
        Phase::Liquid
    } else if time < WATER_CURVE[4].0 {
        Phase::Boiling
    } else {
        Phase::Gas
    }
}

fn kinetic_energy(temp: f32) -> f32 {
    (temp + 20.0).max(0.0)
}

// Gauge fill in 0..100.
fn ke_gauge(temp: f32) -> f32 {
    ((temp + 20.0) / 1.4).clamp(0.0, 100.0)
}

#[derive(Clone, Copy)]
struct Dot {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    angle: f32,
}

fn mean_pair_distance(dots: &[Dot]) -> f32 {
    let mut total = 0.0;
    let mut pairs = 0u32;
    for i in 0..dots.len() {
        for j in (i + 1)..dots.len() {
            let dx = dots[i].x - dots[j].x;
            let dy = dots[i].y - dots[j].y;
            total += (dx * dx + dy * dy).sqrt();
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f32
    }
}

struct Sim {
    rng: StdRng,
    scene: SceneId,
    tab: Tab,
    temp: f32,
    force: f32,
    volume: f32,
    running: bool,
    heating_time: f32,
    t: f32,
    dots: Vec<Dot>,
    phase: Phase,
    kinetic: f32,
    mean_dist: f32,
}

impl Sim {
    fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let dots = (0..DOT_COUNT)
            .map(|_| Dot {
                x: 40.0,
                y: 40.0,
                vx: 0.0,
                vy: 0.0,
                angle: rng.gen_range(0.0..std::f32::consts::TAU),
            })
            .collect();
        let mut s = Self {
            rng,
            scene: SceneId::Solid,
            tab: Tab::Model,
            temp: -10.0,
            force: 80.0,
            volume: 30.0,
            running: true,
            heating_time: 0.0,
            t: 0.0,
            dots,
            phase: Phase::Solid,
            kinetic: 0.0,
            mean_dist: 0.0,
        };
        s.recompute();
        s
    }

    fn set_scene(&mut self, scene: SceneId) {
        self.scene = scene;
        if let Some((temp, force, volume)) = scene.preset() {
            self.temp = temp;
            self.force = force;
            self.volume = volume;
        }
        self.heating_time = 0.0;
        self.recompute();
    }

    fn reset(&mut self) {
        self.heating_time = 0.0;
        if let Some((temp, force, volume)) = self.scene.preset() {
            self.temp = temp;
            self.force = force;
            self.volume = volume;
        }
        self.recompute();
    }

    // Derived fields are a pure function of the controls (plus the heating
    // accumulator); recomputing with unchanged inputs changes nothing.
    fn recompute(&mut self) {
        if self.scene == SceneId::StateChange {
            self.temp = curve_temp(self.heating_time);
            self.phase = curve_phase(self.heating_time);
        } else {
            self.phase = classify(self.temp, self.force);
        }
        self.kinetic = kinetic_energy(self.temp);
        self.mean_dist = mean_pair_distance(&self.dots);
    }

    fn tick(&mut self) {
        if !self.running {
            return;
        }
        self.t += 1.0 / 60.0;
        if self.scene == SceneId::StateChange {
            self.heating_time = (self.heating_time + 0.5).min(curve_max_time());
        }
        self.step_dots();
        self.recompute();
    }

    fn step_dots(&mut self) {
        let t_norm = ((self.temp + 20.0) / 140.0).clamp(0.0, 1.0);
        let force_norm = self.force / 100.0;
        let vol_norm = self.volume / 100.0;
        let spacing = 10.0 + (1.0 - force_norm) * 20.0 + vol_norm * 20.0;
        let speed = t_norm * 2.5;

        if self.phase == Phase::Solid {
            for (i, d) in self.dots.iter_mut().enumerate() {
                let row = (i / 5) as f32;
                let col = (i % 5) as f32;
                let tx = 20.0 + col * 10.0;
                let ty = 20.0 + row * 10.0;
                d.x = tx + (d.angle + self.t * 6.6).sin() * t_norm * 3.0;
                d.y = ty + (d.angle + self.t * 6.6).cos() * t_norm * 3.0;
                d.vx = 0.0;
                d.vy = 0.0;
            }
            return;
        }

        // Pairwise short-range repulsion; O(n^2) over at most 25 dots.
        let n = self.dots.len();
        let mut fx = vec![0.0f32; n];
        let mut fy = vec![0.0f32; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = self.dots[i].x - self.dots[j].x;
                let dy = self.dots[i].y - self.dots[j].y;
                let d2 = dx * dx + dy * dy;
                if d2 < spacing * spacing && d2 > 1e-6 {
                    let dist = d2.sqrt();
                    let f = (spacing - dist) * 0.1;
                    fx[i] += (dx / dist) * f;
                    fy[i] += (dy / dist) * f;
                }
            }
        }

        // Weak attraction toward the lens centre stands in for the
        // intermolecular force.
        let center_pull = (force_norm - 0.5) * 0.05;
        let boundary = 40.0 + vol_norm * 40.0;
        let lo = LENS_SPAN - boundary;

        for (i, d) in self.dots.iter_mut().enumerate() {
            let ax = fx[i] - (d.x - 40.0) * center_pull;
            let ay = fy[i] - (d.y - 40.0) * center_pull;

            d.vx += (self.rng.gen::<f32>() - 0.5) * speed * 0.5;
            d.vy += (self.rng.gen::<f32>() - 0.5) * speed * 0.5;
            d.vx += ax;
            d.vy += ay;
            d.vx *= 0.8;
            d.vy *= 0.8;
            d.x += d.vx;
            d.y += d.vy;

            if d.x < lo || d.x > boundary {
                d.x = d.x.clamp(lo, boundary);
                d.vx = -d.vx;
            }
            if d.y < lo || d.y > boundary {
                d.y = d.y.clamp(lo, boundary);
                d.vy = -d.vy;
            }
        }
    }

    fn sliders_locked(&self) -> bool {
        self.scene == SceneId::StateChange
    }

    fn nudge_temp(&mut self, delta: f32) {
        if self.sliders_locked() {
            return;
        }
        self.temp = (self.temp + delta).clamp(-20.0, 120.0);
        self.recompute();
    }

    fn nudge_force(&mut self, delta: f32) {
        if self.sliders_locked() {
            return;
        }
        self.force = (self.force + delta).clamp(0.0, 100.0);
        self.recompute();
    }

    fn nudge_volume(&mut self, delta: f32) {
        if self.sliders_locked() {
            return;
        }
        self.volume = (self.volume + delta).clamp(0.0, 100.0);
        self.recompute();
    }
}

/* -----------------------------
   Drawing
------------------------------ */

fn draw_box(scr: &mut Screen, x: u16, y: u16, w: u16, h: u16, fg: Rgb) {
    if w < 2 || h < 2 {
        return;
    }
    for i in 1..w - 1 {
        scr.put(x + i, y, '─', fg);
        scr.put(x + i, y + h - 1, '─', fg);
    }
    for j in 1..h - 1 {
        scr.put(x, y + j, '│', fg);
        scr.put(x + w - 1, y + j, '│', fg);
    }
    scr.put(x, y, '╭', fg);
    scr.put(x + w - 1, y, '╮', fg);
    scr.put(x, y + h - 1, '╰', fg);
    scr.put(x + w - 1, y + h - 1, '╯', fg);
}

fn draw_stage(scr: &mut Screen, sim: &Sim, x: u16, y: u16, w: u16, h: u16) {
    let edge = Rgb { r: 70, g: 90, b: 130 };
    draw_box(scr, x, y, w, h, edge);
    scr.text(x + 2, y, &format!(" {} ", sim.scene.name()), Rgb { r: 210, g: 220, b: 245 });
    if w < 10 || h < 6 {
        return;
    }
    let ix = x + 2;
    let iy = y + 2;
    let iw = w - 4;
    let ih = h - 4;
    match sim.scene {
        SceneId::Solid => {
            for yy in iy + ih / 4..iy + ih {
                for xx in ix + iw / 4..ix + 3 * iw / 4 {
                    scr.put(xx, yy, '▓', Rgb { r: 132, g: 199, b: 217 });
                }
            }
        }
        SceneId::Liquid => {
            for yy in iy + ih / 2..iy + ih {
                for xx in ix..ix + iw {
                    let ch = if yy == iy + ih / 2 { '~' } else { '≈' };
                    scr.put(xx, yy, ch, Rgb { r: 96, g: 165, b: 250 });
                }
            }
        }
        SceneId::Gas | SceneId::ParticleModel => {
            // sealed container; scattered faint motes
            for k in 0..(iw as usize * ih as usize / 12) {
                let xx = ix + ((k * 7 + 3) % iw as usize) as u16;
                let yy = iy + ((k * 5 + 1) % ih as usize) as u16;
                scr.put(xx, yy, '·', Rgb { r: 140, g: 160, b: 180 });
            }
        }
        SceneId::StateChange => draw_heating_curve(scr, sim, ix, iy, iw, ih),
    }
}

fn draw_heating_curve(scr: &mut Screen, sim: &Sim, x: u16, y: u16, w: u16, h: u16) {
    if w < 4 || h < 3 {
        return;
    }
    let max_t = curve_max_time();
    let temp_to_row = |temp: f32| -> u16 {
        let f = ((temp + 20.0) / 140.0).clamp(0.0, 1.0);
        y + h - 1 - (f * (h - 1) as f32).round() as u16
    };
    let grey = Rgb { r: 156, g: 163, b: 175 };
    for col in 0..w {
        let time = col as f32 / (w - 1).max(1) as f32 * max_t;
        scr.put(x + col, temp_to_row(curve_temp(time)), '·', grey);
    }
    let cur_col = (sim.heating_time / max_t * (w - 1) as f32).round() as u16;
    scr.put(x + cur_col.min(w - 1), temp_to_row(sim.temp), '●', HOT);
    scr.text(x, y, "°C", grey);
    let label = "heat added →";
    if w as usize > label.len() {
        scr.text(x + w - label.len() as u16, y + h - 1, label, grey);
    }
}

fn draw_lens(scr: &mut Screen, sim: &Sim, x: u16, y: u16, w: u16, h: u16) {
    let edge = Rgb { r: 70, g: 90, b: 130 };
    draw_box(scr, x, y, w, h, edge);
    scr.text(x + 2, y, " Micro View ", Rgb { r: 210, g: 220, b: 245 });
    if w < 6 || h < 4 {
        return;
    }
    let iw = (w - 2) as f32;
    let ih = (h - 2) as f32;
    let glyph = match sim.phase {
        Phase::Solid => '◆',
        Phase::Liquid => '●',
        Phase::Gas => '○',
        Phase::Melting | Phase::Boiling => '◉',
    };
    for d in &sim.dots {
        let xx = x + 1 + ((d.x / LENS_SPAN) * (iw - 1.0)).clamp(0.0, iw - 1.0) as u16;
        let yy = y + 1 + ((d.y / LENS_SPAN) * (ih - 1.0)).clamp(0.0, ih - 1.0) as u16;
        scr.put(xx, yy, glyph, sim.phase.color());
    }
}

fn draw_gauge(scr: &mut Screen, sim: &Sim, x: u16, y: u16, h: u16) {
    let fill = ke_gauge(sim.temp);
    let lit = ((fill / 100.0) * h as f32).round() as u16;
    for j in 0..h {
        let from_bottom = h - 1 - j;
        let on = from_bottom < lit;
        let t = from_bottom as f32 / h.max(1) as f32;
        let color = Rgb::lerp(COOL, HOT, t);
        scr.put(x, y + j, if on { '█' } else { '░' }, if on { color } else { Rgb { r: 60, g: 70, b: 90 } });
    }
    scr.text(x.saturating_sub(1), y + h, &format!("{:>3.0}", fill), Rgb { r: 170, g: 185, b: 210 });
}

fn draw_hud(scr: &mut Screen, sim: &Sim, w: u16) {
    let fg = Rgb { r: 210, g: 220, b: 245 };
    let dim = Rgb { r: 150, g: 165, b: 190 };
    let line1 = format!(
        "Particle Box  [{}]  T:{:>4.0}°C  F:{:>3.0}  V:{:>3.0}  state:{:<7}  KE:{:>5.1} zJ  dist:{:>5.1} pm{}",
        sim.scene.name(),
        sim.temp,
        sim.force,
        sim.volume,
        sim.phase.label(),
        sim.kinetic,
        sim.mean_dist,
        if sim.running { "" } else { "  [PAUSED]" }
    );
    let line2 = "Keys: 1-5 scene  ↑/↓ temp  ←/→ force  ,/. volume  Space run/pause  R reset  T tab  Q quit";
    for (i, ch) in line1.chars().take(w as usize).enumerate() {
        scr.put(i as u16, 0, ch, fg);
    }
    for (i, ch) in line2.chars().take(w as usize).enumerate() {
        scr.put(i as u16, 1, ch, dim);
    }
}

fn draw_tabs(scr: &mut Screen, sim: &Sim, x: u16, y: u16, w: u16, h: u16) {
    let edge = Rgb { r: 70, g: 90, b: 130 };
    let fg = Rgb { r: 210, g: 220, b: 245 };
    let dim = Rgb { r: 150, g: 165, b: 190 };
    draw_box(scr, x, y, w, h, edge);
    let mut cx = x + 2;
    for tab in Tab::all() {
        let title = tab.title();
        let color = if *tab == sim.tab { HOT } else { dim };
        scr.text(cx, y, title, color);
        cx += title.len() as u16 + 2;
    }
    for (j, line) in sim.tab.body().iter().enumerate() {
        let yy = y + 1 + j as u16;
        if yy >= y + h - 1 {
            break;
        }
        for (i, ch) in line.chars().take((w - 4) as usize).enumerate() {
            scr.put(x + 2 + i as u16, yy, ch, fg);
        }
    }
    let badge = match sim.phase {
        Phase::Melting => Some("Melting!"),
        Phase::Boiling => Some("Boiling!"),
        _ => None,
    };
    if let Some(b) = badge {
        scr.text(x + w - b.len() as u16 - 2, y, b, HOT);
    }
}

fn render(scr: &mut Screen, sim: &Sim) {
    scr.clear_next();
    let w = scr.w;
    let h = scr.h;
    if w < 40 || h < 16 {
        scr.text(0, 0, "terminal too small", HOT);
        return;
    }
    draw_hud(scr, sim, w);
    let tab_h = 6u16;
    let body_y = 2;
    let body_h = h - body_y - tab_h;
    let stage_w = w * 3 / 5;
    let gauge_w = 5;
    draw_stage(scr, sim, 0, body_y, stage_w, body_h);
    draw_lens(scr, sim, stage_w + 1, body_y, w - stage_w - 1 - gauge_w, body_h);
    draw_gauge(scr, sim, w - 3, body_y + 1, body_h.saturating_sub(3));
    draw_tabs(scr, sim, 0, h - tab_h, w, tab_h);
}

fn main() -> io::Result<()> {
    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen, DisableLineWrap, cursor::Hide)?;
    terminal::enable_raw_mode()?;

    let mut sim = Sim::new(11);
    let (w0, h0) = terminal::size()?;
    let mut scr = Screen::new(w0, h0);

    let tick = Duration::from_secs_f32(1.0 / 60.0);
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
                    KeyCode::Char('t') | KeyCode::Tab => sim.tab = sim.tab.next(),
                    KeyCode::Char(c @ '1'..='5') => {
                        let idx = c as usize - '1' as usize;
                        sim.set_scene(SceneId::all()[idx]);
                    }
                    KeyCode::Up => sim.nudge_temp(1.0),
                    KeyCode::Down => sim.nudge_temp(-1.0),
                    KeyCode::Right => sim.nudge_force(1.0),
                    KeyCode::Left => sim.nudge_force(-1.0),
                    KeyCode::Char('.') => sim.nudge_volume(1.0),
                    KeyCode::Char(',') => sim.nudge_volume(-1.0),
                    _ => {}
                },
                Event::Resize(w, h) => scr.resize(w, h),
                _ => {}
            }
        }

        let now = Instant::now();
        acc += now - last;
        last = now;
        let mut steps = 0;
        while acc >= tick && steps < 4 {
            sim.tick();
            acc -= tick;
            steps += 1;
        }

        render(&mut scr, &sim);
        queue!(out, BeginSynchronizedUpdate)?;
        scr.flush(&mut out)?;
        queue!(out, ResetColor, EndSynchronizedUpdate)?;
        out.flush()?;
        std::thread::sleep(Duration::from_millis(8));
    }

    terminal::disable_raw_mode()?;
    execute!(out, ResetColor, cursor::Show, EnableLineWrap, LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_zone_classifier() {
        // force such that melt sits at 0 and boil at 100 does not exist for
        // a single force (melt = f*1.2-20, boil = f*1.2+50); check both
        // boundaries against force = 80: melt 76, boil 146.
        assert_eq!(classify(75.9, 80.0), Phase::Solid);
        assert_eq!(classify(76.1, 80.0), Phase::Liquid);
        assert_eq!(classify(145.9, 80.0), Phase::Liquid);
        assert_eq!(classify(146.1, 80.0), Phase::Gas);
        // below melt is always Solid, at/above boil always Gas
        assert_eq!(classify(-20.0, 0.0), Phase::Solid);
        assert_eq!(classify(120.0, 0.0), Phase::Gas);
        assert_eq!(classify(50.0, 50.0), Phase::Liquid);
    }

    #[test]
    fn heating_curve_anchors() {
        assert!((curve_temp(0.0) - (-20.0)).abs() < 1e-4);
        assert!((curve_temp(40.0) - 0.0).abs() < 1e-4);
        assert!((curve_temp(56.0) - 0.0).abs() < 1e-4);
        assert!((curve_temp(73.4) - 0.0).abs() < 1e-4);
        assert!((curve_temp(123.4) - 50.0).abs() < 1e-3);
        assert!((curve_temp(399.4) - 100.0).abs() < 1e-4);
        assert!((curve_temp(419.4) - 120.0).abs() < 1e-4);
        // past the final anchor the curve stays put
        assert!((curve_temp(1000.0) - 120.0).abs() < 1e-4);
    }

    #[test]
    fn melting_plateau_is_reported() {
        assert_eq!(curve_phase(39.9), Phase::Solid);
        assert_eq!(curve_phase(40.0), Phase::Melting);
        assert_eq!(curve_phase(73.3), Phase::Melting);
        assert_eq!(curve_phase(73.4), Phase::Liquid);
        assert_eq!(curve_phase(173.4), Phase::Boiling);
        assert_eq!(curve_phase(399.3), Phase::Boiling);
        assert_eq!(curve_phase(399.4), Phase::Gas);
        // temperature stays pinned at zero across the fusion plateau
        for t in [40.0, 50.0, 60.0, 73.0] {
            assert!((curve_temp(t)).abs() < 1e-4);
        }
    }

    #[test]
    fn readouts_are_idempotent() {
        let mut sim = Sim::new(7);
        sim.temp = 42.0;
        sim.force = 33.0;
        sim.recompute();
        let a = (sim.phase, sim.kinetic, sim.mean_dist);
        sim.recompute();
        let b = (sim.phase, sim.kinetic, sim.mean_dist);
        assert_eq!(a.0, b.0);
        assert_eq!(a.1.to_bits(), b.1.to_bits());
        assert_eq!(a.2.to_bits(), b.2.to_bits());
    }

    #[test]
    fn pause_gates_the_tick() {
        let mut sim = Sim::new(7);
        sim.set_scene(SceneId::StateChange);
        sim.running = true;
        sim.tick();
        let after_one = sim.heating_time;
        assert!(after_one > 0.0);
        sim.running = false;
        for _ in 0..10 {
            sim.tick();
        }
        assert_eq!(sim.heating_time, after_one);
        let positions: Vec<(u32, u32)> = sim
            .dots
            .iter()
            .map(|d| (d.x.to_bits(), d.y.to_bits()))
            .collect();
        sim.tick();
        let again: Vec<(u32, u32)> = sim
            .dots
            .iter()
            .map(|d| (d.x.to_bits(), d.y.to_bits()))
            .collect();
        assert_eq!(positions, again);
    }

    #[test]
    fn reset_restores_scene_preset() {
        let mut sim = Sim::new(7);
        sim.set_scene(SceneId::Liquid);
        sim.nudge_temp(30.0);
        sim.nudge_force(-20.0);
        sim.reset();
        assert_eq!(sim.temp, 30.0);
        assert_eq!(sim.force, 50.0);
        assert_eq!(sim.volume, 40.0);
    }

    #[test]
    fn dots_stay_inside_bounds() {
        let mut sim = Sim::new(3);
        sim.set_scene(SceneId::ParticleModel);
        sim.temp = 110.0;
        sim.force = 10.0;
        sim.volume = 100.0;
        sim.recompute();
        for _ in 0..600 {
            sim.tick();
            let boundary = 40.0 + (sim.volume / 100.0) * 40.0;
            let lo = LENS_SPAN - boundary;
            for d in &sim.dots {
                assert!(d.x >= lo - 1e-3 && d.x <= boundary + 1e-3);
                assert!(d.y >= lo - 1e-3 && d.y <= boundary + 1e-3);
            }
        }
    }

    #[test]
    fn solid_dots_vibrate_around_the_lattice() {
        let mut sim = Sim::new(5);
        sim.set_scene(SceneId::Solid);
        assert_eq!(sim.phase, Phase::Solid);
        for _ in 0..120 {
            sim.tick();
            for (i, d) in sim.dots.iter().enumerate() {
                let tx = 20.0 + (i % 5) as f32 * 10.0;
                let ty = 20.0 + (i / 5) as f32 * 10.0;
                // amplitude bounded by t_norm * 3
                assert!((d.x - tx).abs() <= 3.01);
                assert!((d.y - ty).abs() <= 3.01);
            }
        }
    }

    #[test]
    fn kinetic_energy_floor() {
        assert_eq!(kinetic_energy(-30.0), 0.0);
        assert_eq!(kinetic_energy(-20.0), 0.0);
        assert_eq!(kinetic_energy(30.0), 50.0);
        assert!((ke_gauge(120.0) - 100.0).abs() < 1e-4);
        assert!((ke_gauge(-20.0)).abs() < 1e-4);
    }

    #[test]
    fn state_change_locks_sliders() {
        let mut sim = Sim::new(7);
        sim.set_scene(SceneId::StateChange);
        let t = sim.temp;
        sim.nudge_temp(10.0);
        sim.nudge_force(10.0);
        sim.nudge_volume(10.0);
        assert_eq!(sim.temp, t);
    }
}
