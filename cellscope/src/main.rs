use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{
        self, BeginSynchronizedUpdate, DisableLineWrap, EnableLineWrap, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as Seg, Points, Rectangle},
        *,
    },
};

#[derive(Parser, Debug, Clone)]
#[command(name = "cellscope")]
#[command(about = "Cells: structure, membrane transport, organelles and division")]
struct Cli {
    /// Start scene (1-5)
    #[arg(long, default_value_t = 1)]
    scene: u8,

    /// Frame cap
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Force monochrome (no colors)
    #[arg(long, default_value_t = false)]
    mono: bool,

    /// Seed for the particle jitter
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

const DOT_COUNT: usize = 15;
const C_CELL: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneId {
    Microscopy,
    Osmosis,
    Organelles,
    ProkVsEuk,
    Division,
}

impl SceneId {
    fn all() -> &'static [SceneId] {
        &[
            SceneId::Microscopy,
            SceneId::Osmosis,
            SceneId::Organelles,
            SceneId::ProkVsEuk,
            SceneId::Division,
        ]
    }
    fn title(self) -> &'static str {
        match self {
            SceneId::Microscopy => "Discovery & Microscopy",
            SceneId::Osmosis => "Membrane Transport & Osmosis",
            SceneId::Organelles => "Organelles",
            SceneId::ProkVsEuk => "Prokaryote vs Eukaryote",
            SceneId::Division => "Cell Division",
        }
    }
    fn sliders(self) -> &'static [Slider] {
        match self {
            SceneId::Microscopy => &[Slider::Mag, Slider::Speed],
            SceneId::Osmosis => &[Slider::Conc, Slider::Speed],
            SceneId::Organelles => &[Slider::Speed],
            SceneId::ProkVsEuk => &[Slider::SizeDiff],
            SceneId::Division => &[Slider::Speed],
        }
    }
    fn options(self) -> &'static [SceneOption] {
        match self {
            SceneId::Microscopy => &[
                SceneOption::Specimen(Specimen::Onion),
                SceneOption::Specimen(Specimen::Cheek),
                SceneOption::StainType(Stain::Iodine),
                SceneOption::StainType(Stain::Methylene),
                SceneOption::StainType(Stain::Safranin),
                SceneOption::StainType(Stain::None),
            ],
            SceneId::Osmosis => &[
                SceneOption::Tonicity(Tonicity::Hypotonic),
                SceneOption::Tonicity(Tonicity::Isotonic),
                SceneOption::Tonicity(Tonicity::Hypertonic),
            ],
            SceneId::Organelles => &[
                SceneOption::Organelle(Organelle::Mitochondria),
                SceneOption::Organelle(Organelle::Er),
                SceneOption::Organelle(Organelle::Golgi),
                SceneOption::Organelle(Organelle::Lysosome),
                SceneOption::Organelle(Organelle::Nucleus),
            ],
            SceneId::ProkVsEuk => &[
                SceneOption::Toggle(CompareToggle::Size),
                SceneOption::Toggle(CompareToggle::Organelles),
                SceneOption::Toggle(CompareToggle::Complexity),
            ],
            SceneId::Division => &[
                SceneOption::Stage(DivisionStage::MitosisMetaphase),
                SceneOption::Stage(DivisionStage::MitosisProphase),
                SceneOption::Stage(DivisionStage::MitosisAnaphase),
                SceneOption::Stage(DivisionStage::MitosisTelophase),
                SceneOption::Stage(DivisionStage::MeiosisProphase1),
                SceneOption::Stage(DivisionStage::MeiosisAnaphase1),
                SceneOption::Stage(DivisionStage::MeiosisGametes),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slider {
    Mag,
    Conc,
    Speed,
    SizeDiff,
}

impl Slider {
    fn label(self) -> &'static str {
        match self {
            Slider::Mag => "Magnification",
            Slider::Conc => "Solute Conc.",
            Slider::Speed => "Anim Speed",
            Slider::SizeDiff => "Size Difference",
        }
    }
    fn unit(self) -> &'static str {
        match self {
            Slider::Mag => "x",
            Slider::Conc => "mM",
            Slider::Speed => "x",
            Slider::SizeDiff => "x",
        }
    }
    fn range(self) -> (f32, f32, f32) {
        match self {
            Slider::Mag => (10.0, 400.0, 10.0),
            Slider::Conc => (0.0, 100.0, 5.0),
            Slider::Speed => (0.1, 2.0, 0.1),
            Slider::SizeDiff => (1.0, 10.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Specimen {
    Onion,
    Cheek,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stain {
    None,
    Iodine,
    Methylene,
    Safranin,
}

impl Stain {
    fn affinity(self) -> f32 {
        match self {
            Stain::Iodine => 0.8,
            Stain::Methylene => 0.5,
            Stain::Safranin => 0.3,
            Stain::None => 0.0,
        }
    }
    fn name(self) -> &'static str {
        match self {
            Stain::None => "no stain",
            Stain::Iodine => "iodine",
            Stain::Methylene => "methylene blue",
            Stain::Safranin => "safranin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tonicity {
    Hypotonic,
    Isotonic,
    Hypertonic,
}

impl Tonicity {
    fn offset(self) -> f32 {
        match self {
            Tonicity::Hypotonic => -10.0,
            Tonicity::Isotonic => 0.0,
            Tonicity::Hypertonic => 10.0,
        }
    }
    fn name(self) -> &'static str {
        match self {
            Tonicity::Hypotonic => "hypotonic",
            Tonicity::Isotonic => "isotonic",
            Tonicity::Hypertonic => "hypertonic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Organelle {
    Nucleus,
    Mitochondria,
    Er,
    Golgi,
    Lysosome,
}

impl Organelle {
    fn name(self) -> &'static str {
        match self {
            Organelle::Nucleus => "nucleus",
            Organelle::Mitochondria => "mitochondria",
            Organelle::Er => "ER",
            Organelle::Golgi => "Golgi",
            Organelle::Lysosome => "lysosome",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareToggle {
    Size,
    Organelles,
    Complexity,
}

impl CompareToggle {
    fn name(self) -> &'static str {
        match self {
            CompareToggle::Size => "size",
            CompareToggle::Organelles => "organelles",
            CompareToggle::Complexity => "complexity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DivisionStage {
    MitosisProphase,
    MitosisMetaphase,
    MitosisAnaphase,
    MitosisTelophase,
    MeiosisProphase1,
    MeiosisAnaphase1,
    MeiosisGametes,
}

impl DivisionStage {
    fn name(self) -> &'static str {
        match self {
            DivisionStage::MitosisProphase => "mitosis: prophase",
            DivisionStage::MitosisMetaphase => "mitosis: metaphase",
            DivisionStage::MitosisAnaphase => "mitosis: anaphase",
            DivisionStage::MitosisTelophase => "mitosis: telophase",
            DivisionStage::MeiosisProphase1 => "meiosis: prophase I",
            DivisionStage::MeiosisAnaphase1 => "meiosis: anaphase I",
            DivisionStage::MeiosisGametes => "meiosis: four gametes",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SceneOption {
    Specimen(Specimen),
    StainType(Stain),
    Tonicity(Tonicity),
    Organelle(Organelle),
    Toggle(CompareToggle),
    Stage(DivisionStage),
}

impl SceneOption {
    fn name(self) -> &'static str {
        match self {
            SceneOption::Specimen(Specimen::Onion) => "onion peel",
            SceneOption::Specimen(Specimen::Cheek) => "cheek cell",
            SceneOption::StainType(s) => s.name(),
            SceneOption::Tonicity(t) => t.name(),
            SceneOption::Organelle(o) => o.name(),
            SceneOption::Toggle(t) => t.name(),
            SceneOption::Stage(s) => s.name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Visual,
    Analogy,
    Cause,
    Model,
    Fix,
}

impl Tab {
    fn all() -> &'static [Tab] {
        &[Tab::Visual, Tab::Analogy, Tab::Cause, Tab::Model, Tab::Fix]
    }
    fn title(self) -> &'static str {
        match self {
            Tab::Visual => "Visual",
            Tab::Analogy => "Analogy",
            Tab::Cause => "Cause",
            Tab::Model => "Model",
            Tab::Fix => "Fix",
        }
    }
    fn body(self, scene: SceneId) -> &'static str {
        match (self, scene) {
            (Tab::Visual, SceneId::Microscopy) => {
                "Stains bind selectively: iodine picks out starch and the nucleus, giving contrast."
            }
            (Tab::Visual, SceneId::Osmosis) => {
                "The cell outline tracks volume: hypotonic swells it, hypertonic shrinks it."
            }
            (Tab::Visual, _) => "The lens shows each organelle's cargo moving through the cell.",
            (Tab::Analogy, SceneId::Osmosis) => {
                "Water moves toward the less crowded exit across a selective turnstile."
            }
            (Tab::Analogy, _) => {
                "Nucleus = city hall, mitochondria = power plant, ER/Golgi = shipping, lysosome = waste disposal."
            }
            (Tab::Cause, SceneId::Osmosis) => {
                "A water potential gradient across the membrane drives the net flow toward equilibrium."
            }
            (Tab::Cause, _) => {
                "Compartments let incompatible reactions run safely side by side."
            }
            (Tab::Model, SceneId::Osmosis) => {
                "Net flow ~ (C_ext - C_cell); the membrane is a selectively permeable bilayer."
            }
            (Tab::Model, _) => {
                "Proteins made on the ER are sorted in the Golgi and shipped in vesicles."
            }
            (Tab::Fix, SceneId::Osmosis) => {
                "Osmosis moves water, not solute; solute movement is diffusion or active transport."
            }
            (Tab::Fix, _) => {
                "Plant cells rarely burst: the wall resists swelling. Lysosomes are safe while membrane-bound."
            }
        }
    }
    fn next(self) -> Tab {
        let all = Tab::all();
        let i = all.iter().position(|t| *t == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }
}

/// Water transport across the membrane. Positive `diff` pushes water out of
/// the cell, negative pulls it in; the volume clamp keeps the rendering sane.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Osmosis {
    diff: f32,
    rate: f32,
    volume: f32,
}

fn osmosis(conc: f32, tonicity: Tonicity, speed: f32) -> Osmosis {
    let diff = (conc - C_CELL) * 0.05 + tonicity.offset() * 0.1;
    Osmosis {
        diff,
        rate: diff.abs() * speed,
        volume: (1.0 - diff * 0.5).clamp(0.6, 1.4),
    }
}

fn organelle_rate(organelle: Organelle, speed: f32) -> f32 {
    match organelle {
        Organelle::Mitochondria => 0.8 * speed,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DotKind {
    Water,
    Solute,
    StainBound,
    Atp,
    Protein,
    Waste,
}

#[derive(Debug, Clone, Copy)]
struct MicroDot {
    x: f32,
    y: f32,
    kind: DotKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CargoKind {
    WaterIn,
    WaterOut,
    Atp,
    Protein,
}

#[derive(Debug, Clone, Copy)]
struct CargoMote {
    x: f32,
    y: f32,
    tx: f32,
    ty: f32,
    age: f32,
    ttl: f32,
    kind: CargoKind,
}

struct SimState {
    rng: StdRng,
    scene: SceneId,
    tab: Tab,
    mag: f32,
    conc: f32,
    speed: f32,
    size_diff: f32,
    specimen: Specimen,
    stain: Stain,
    tonicity: Tonicity,
    organelle: Organelle,
    stage: DivisionStage,
    opt_idx: usize,
    running: bool,
    transport_rate: f32,
    signed_diff: f32,
    cell_volume: f32,
    dots: Vec<MicroDot>,
    cargo: Vec<CargoMote>,
    spawn_clock: f32,
}

impl SimState {
    fn new(seed: u64, scene: SceneId) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let dots = (0..DOT_COUNT)
            .map(|i| MicroDot {
                x: rng.gen_range(5.0..60.0),
                y: rng.gen_range(5.0..60.0),
                kind: if i % 2 == 0 { DotKind::Water } else { DotKind::Solute },
            })
            .collect();
        let mut s = Self {
            rng,
            scene,
            tab: Tab::Visual,
            mag: 100.0,
            conc: 10.0,
            speed: 1.0,
            size_diff: 1.0,
            specimen: Specimen::Onion,
            stain: Stain::None,
            tonicity: Tonicity::Hypotonic,
            organelle: Organelle::Mitochondria,
            stage: DivisionStage::MitosisMetaphase,
            opt_idx: 0,
            running: false,
            transport_rate: 0.0,
            signed_diff: 0.0,
            cell_volume: 1.0,
            dots,
            cargo: Vec::new(),
            spawn_clock: 0.0,
        };
        s.recompute();
        s
    }

    fn set_scene(&mut self, scene: SceneId) {
        self.scene = scene;
        self.opt_idx = 0;
        self.apply_option(scene.options()[0]);
        self.running = false;
        self.cargo.clear();
        self.spawn_clock = 0.0;
        self.recompute();
    }

    fn reset(&mut self) {
        self.mag = 100.0;
        self.conc = 10.0;
        self.speed = 1.0;
        self.size_diff = 1.0;
        self.set_scene(self.scene);
    }

    fn apply_option(&mut self, opt: SceneOption) {
        match opt {
            SceneOption::Specimen(s) => self.specimen = s,
            SceneOption::StainType(s) => self.stain = s,
            SceneOption::Tonicity(t) => self.tonicity = t,
            SceneOption::Organelle(o) => self.organelle = o,
            SceneOption::Toggle(_) => {}
            SceneOption::Stage(s) => self.stage = s,
        }
    }

    fn slider_get(&self, s: Slider) -> f32 {
        match s {
            Slider::Mag => self.mag,
            Slider::Conc => self.conc,
            Slider::Speed => self.speed,
            Slider::SizeDiff => self.size_diff,
        }
    }

    fn slider_nudge(&mut self, s: Slider, steps: f32) {
        let (min, max, step) = s.range();
        let v = (self.slider_get(s) + steps * step).clamp(min, max);
        match s {
            Slider::Mag => self.mag = v,
            Slider::Conc => self.conc = v,
            Slider::Speed => self.speed = v,
            Slider::SizeDiff => self.size_diff = v,
        }
        self.recompute();
    }

    fn cycle_option(&mut self) {
        let opts = self.scene.options();
        self.opt_idx = (self.opt_idx + 1) % opts.len();
        self.apply_option(opts[self.opt_idx]);
        self.recompute();
    }

    fn toggle(&self) -> CompareToggle {
        match self.scene.options()[self.opt_idx] {
            SceneOption::Toggle(t) => t,
            _ => CompareToggle::Size,
        }
    }

    /// Pure recomputation of the derived readouts from current inputs.
    fn recompute(&mut self) {
        match self.scene {
            SceneId::Osmosis => {
                let o = osmosis(self.conc, self.tonicity, self.speed);
                self.signed_diff = o.diff;
                self.transport_rate = o.rate;
                self.cell_volume = o.volume;
            }
            SceneId::Organelles => {
                self.signed_diff = 0.0;
                self.transport_rate = organelle_rate(self.organelle, self.speed);
                self.cell_volume = 1.0;
            }
            _ => {
                self.signed_diff = 0.0;
                self.transport_rate = 0.0;
                self.cell_volume = 1.0;
            }
        }
    }

    fn tick(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        self.step_dots();
        self.spawn_cargo(dt);
        for m in &mut self.cargo {
            m.age += dt;
        }
        self.cargo.retain(|m| m.age < m.ttl);
        self.recompute();
    }

    fn step_dots(&mut self) {
        let kick = self.speed * 1.5;
        let affinity = self.stain.affinity();
        for d in &mut self.dots {
            d.x += (self.rng.gen::<f32>() - 0.5) * kick;
            d.y += (self.rng.gen::<f32>() - 0.5) * kick;
            // wraparound lens: leave one side, re-enter the other
            if d.x < 5.0 {
                d.x = 60.0;
            } else if d.x > 60.0 {
                d.x = 5.0;
            }
            if d.y < 5.0 {
                d.y = 60.0;
            } else if d.y > 60.0 {
                d.y = 5.0;
            }

            d.kind = match self.scene {
                SceneId::Microscopy if self.stain != Stain::None => {
                    if self.rng.gen::<f32>() < affinity {
                        DotKind::StainBound
                    } else {
                        DotKind::Solute
                    }
                }
                SceneId::Organelles => match self.organelle {
                    Organelle::Mitochondria => DotKind::Atp,
                    Organelle::Er | Organelle::Golgi => DotKind::Protein,
                    Organelle::Lysosome => DotKind::Waste,
                    Organelle::Nucleus => DotKind::Solute,
                },
                _ => {
                    if (d.x + d.y) as usize % 2 == 0 {
                        DotKind::Water
                    } else {
                        DotKind::Solute
                    }
                }
            };
        }
    }

    fn spawn_cargo(&mut self, dt: f32) {
        let (rate, kind) = match self.scene {
            SceneId::Osmosis => {
                if self.signed_diff < 0.0 {
                    (self.transport_rate, CargoKind::WaterIn)
                } else if self.signed_diff > 0.0 {
                    (self.transport_rate, CargoKind::WaterOut)
                } else {
                    return;
                }
            }
            SceneId::Organelles => match self.organelle {
                Organelle::Mitochondria => (self.transport_rate, CargoKind::Atp),
                Organelle::Er => (0.8 * self.speed, CargoKind::Protein),
                _ => return,
            },
            _ => return,
        };
        if rate <= 0.0 {
            return;
        }
        self.spawn_clock += dt;
        let interval = 1.0 / (rate * 5.0);
        if self.spawn_clock < interval {
            return;
        }
        self.spawn_clock = 0.0;

        let (x, y, tx, ty, ttl) = match kind {
            CargoKind::WaterIn => {
                let sx = self.rng.gen_range(0.0..100.0);
                let sy = self.rng.gen_range(0.0..100.0);
                (sx, sy, 50.0, 50.0, 1.5 / self.speed)
            }
            CargoKind::WaterOut => {
                let tx = self.rng.gen_range(0.0..100.0);
                let ty = self.rng.gen_range(0.0..100.0);
                (50.0, 50.0, tx, ty, 1.5 / self.speed)
            }
            CargoKind::Atp => (25.0, 30.0, 50.0, 50.0, 2.0 / self.speed),
            CargoKind::Protein => (70.0, 80.0, 75.0, 60.0, 2.0 / self.speed),
        };
        self.cargo.push(CargoMote {
            x,
            y,
            tx,
            ty,
            age: 0.0,
            ttl,
            kind,
        });
    }
}

/* -----------------------------
   UI
------------------------------ */

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode()?;
    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen, DisableLineWrap, cursor::Hide)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(term: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut out = io::stdout();
    execute!(
        out,
        BeginSynchronizedUpdate,
        cursor::Show,
        EnableLineWrap,
        LeaveAlternateScreen,
        EndSynchronizedUpdate
    )?;
    terminal::disable_raw_mode()?;
    term.show_cursor()?;
    Ok(())
}

fn dot_color(kind: DotKind, mono: bool) -> Color {
    if mono {
        return Color::White;
    }
    match kind {
        DotKind::Water => Color::Rgb(96, 165, 250),
        DotKind::Solute => Color::Rgb(167, 139, 250),
        DotKind::StainBound => Color::Rgb(150, 75, 0),
        DotKind::Atp => Color::Rgb(233, 30, 99),
        DotKind::Protein => Color::Rgb(255, 193, 7),
        DotKind::Waste => Color::Rgb(96, 125, 139),
    }
}

fn membrane_color(volume: f32, mono: bool) -> Color {
    if mono {
        Color::White
    } else if volume > 1.05 {
        Color::Rgb(244, 67, 54)
    } else if volume < 0.95 {
        Color::Rgb(33, 150, 243)
    } else {
        Color::Rgb(76, 175, 80)
    }
}

fn draw_frame(term: &mut Terminal<CrosstermBackend<Stdout>>, st: &SimState, mono: bool) -> Result<()> {
    term.draw(|f| {
        let _ = execute!(io::stdout(), BeginSynchronizedUpdate);
        let area = f.size();
        let outer = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(vec![
                Span::styled(" cellscope ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    st.scene.title(),
                    Style::default().fg(if mono { Color::White } else { Color::Cyan }),
                ),
                Span::raw(if st.running { "  [running]" } else { "  [paused]" }),
            ]))
            .border_style(Style::default().fg(Color::DarkGray));
        f.render_widget(outer, area);

        let inner = area.inner(Margin {
            horizontal: 1,
            vertical: 1,
        });
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
                Constraint::Length(3),
            ])
            .split(inner);

        render_tabs(f, rows[0], st);
        render_main(f, rows[1], st, mono);
        render_tab_body(f, rows[2], st);
        render_footer(f, rows[3], st, mono);

        let _ = execute!(io::stdout(), EndSynchronizedUpdate);
    })?;
    Ok(())
}

fn render_tabs(f: &mut Frame, area: Rect, st: &SimState) {
    let titles: Vec<Line> = Tab::all()
        .iter()
        .map(|t| Line::from(Span::raw(t.title())))
        .collect();
    let idx = Tab::all().iter().position(|t| *t == st.tab).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(idx)
        .block(Block::default().borders(Borders::ALL).title("Notes"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .divider(" | ");
    f.render_widget(tabs, area);
}

fn render_tab_body(f: &mut Frame, area: Rect, st: &SimState) {
    let p = Paragraph::new(st.tab.body(st.scene))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn render_footer(f: &mut Frame, area: Rect, st: &SimState, mono: bool) {
    let mut spans = vec![
        Span::styled("1-5", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" scene  "),
        Span::styled("↑/↓ ←/→", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" sliders  "),
        Span::styled("v", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" selector  "),
        Span::styled("space", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" run/pause  "),
        Span::styled("r", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" reset  "),
        Span::styled("t", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" notes tab  "),
        Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" quit"),
    ];
    if st.transport_rate > 0.5 {
        spans.push(Span::styled(
            "   ⚑ high transport",
            Style::default().fg(if mono { Color::White } else { Color::Yellow }),
        ));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(p, area);
}

fn render_main(f: &mut Frame, area: Rect, st: &SimState, mono: bool) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    render_stage(f, cols[0], st, mono);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(8)])
        .split(cols[1]);
    render_lens(f, right[0], st, mono);
    render_controls(f, right[1], st, mono);
}

fn render_stage(f: &mut Frame, area: Rect, st: &SimState, mono: bool) {
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Stage"))
        .x_bounds([0.0, 100.0])
        .y_bounds([0.0, 100.0])
        .paint(|ctx| match st.scene {
            SceneId::Microscopy => {
                let nucleus = match st.stain {
                    Stain::Iodine => Color::Rgb(150, 75, 0),
                    Stain::Methylene => Color::Rgb(0, 0, 200),
                    Stain::Safranin => Color::Rgb(200, 40, 60),
                    Stain::None => Color::Gray,
                };
                let nucleus = if mono { Color::White } else { nucleus };
                // magnification widens the drawn specimen
                let scale = (st.mag / 400.0).clamp(0.1, 1.0) as f64;
                match st.specimen {
                    Specimen::Onion => {
                        let w = 30.0 + 50.0 * scale;
                        ctx.draw(&Rectangle {
                            x: 50.0 - w / 2.0,
                            y: 35.0,
                            width: w,
                            height: 30.0,
                            color: if mono { Color::White } else { Color::Green },
                        });
                        ctx.draw(&Circle {
                            x: 50.0 - w / 2.0 + 8.0,
                            y: 50.0,
                            radius: 4.0 + 2.0 * scale,
                            color: nucleus,
                        });
                    }
                    Specimen::Cheek => {
                        ctx.draw(&Circle {
                            x: 50.0,
                            y: 50.0,
                            radius: 15.0 + 20.0 * scale,
                            color: if mono { Color::White } else { Color::Magenta },
                        });
                        ctx.draw(&Circle {
                            x: 50.0,
                            y: 50.0,
                            radius: 5.0 + 3.0 * scale,
                            color: nucleus,
                        });
                    }
                }
            }
            SceneId::Osmosis => {
                ctx.draw(&Rectangle {
                    x: 2.0,
                    y: 2.0,
                    width: 96.0,
                    height: 96.0,
                    color: if mono { Color::White } else { Color::Blue },
                });
                ctx.draw(&Circle {
                    x: 50.0,
                    y: 50.0,
                    radius: (30.0 + st.cell_volume * 10.0) as f64,
                    color: membrane_color(st.cell_volume, mono),
                });
                for m in &st.cargo {
                    let t = (m.age / m.ttl).clamp(0.0, 1.0);
                    let x = m.x + (m.tx - m.x) * t;
                    let y = m.y + (m.ty - m.y) * t;
                    ctx.draw(&Points {
                        coords: &[(x as f64, y as f64)],
                        color: dot_color(DotKind::Water, mono),
                    });
                }
            }
            SceneId::Organelles => {
                let hi = |o: Organelle, base: Color| -> Color {
                    if mono {
                        Color::White
                    } else if st.organelle == o {
                        Color::Yellow
                    } else {
                        base
                    }
                };
                ctx.draw(&Circle {
                    x: 50.0,
                    y: 50.0,
                    radius: 45.0,
                    color: if mono { Color::White } else { Color::Green },
                });
                ctx.draw(&Circle {
                    x: 50.0,
                    y: 50.0,
                    radius: 15.0,
                    color: hi(Organelle::Nucleus, Color::Red),
                });
                ctx.draw(&Circle {
                    x: 25.0,
                    y: 30.0,
                    radius: 6.0,
                    color: hi(Organelle::Mitochondria, Color::Red),
                });
                ctx.draw(&Rectangle {
                    x: 66.0,
                    y: 74.0,
                    width: 12.0,
                    height: 12.0,
                    color: hi(Organelle::Er, Color::Magenta),
                });
                ctx.draw(&Rectangle {
                    x: 71.0,
                    y: 54.0,
                    width: 8.0,
                    height: 8.0,
                    color: hi(Organelle::Golgi, Color::Yellow),
                });
                ctx.draw(&Circle {
                    x: 30.0,
                    y: 80.0,
                    radius: 3.0,
                    color: hi(Organelle::Lysosome, Color::Gray),
                });
                for m in &st.cargo {
                    let t = (m.age / m.ttl).clamp(0.0, 1.0);
                    let x = m.x + (m.tx - m.x) * t;
                    let y = m.y + (m.ty - m.y) * t;
                    let kind = if m.kind == CargoKind::Atp {
                        DotKind::Atp
                    } else {
                        DotKind::Protein
                    };
                    ctx.draw(&Points {
                        coords: &[(x as f64, y as f64)],
                        color: dot_color(kind, mono),
                    });
                }
            }
            SceneId::ProkVsEuk => {
                // prokaryote: small, nucleoid only
                ctx.draw(&Rectangle {
                    x: 8.0,
                    y: 35.0,
                    width: 22.0,
                    height: 30.0,
                    color: if mono { Color::White } else { Color::Yellow },
                });
                ctx.draw(&Circle {
                    x: 19.0,
                    y: 50.0,
                    radius: 5.0,
                    color: if mono { Color::White } else { Color::Red },
                });
                // eukaryote: size difference slider scales it
                let r = (12.0 + st.size_diff * 2.0) as f64;
                ctx.draw(&Circle {
                    x: 65.0,
                    y: 50.0,
                    radius: r,
                    color: if mono { Color::White } else { Color::Green },
                });
                ctx.draw(&Circle {
                    x: 65.0,
                    y: 50.0,
                    radius: r * 0.3,
                    color: if mono { Color::White } else { Color::Red },
                });
                if st.toggle() == CompareToggle::Organelles {
                    ctx.draw(&Points {
                        coords: &[(58.0, 58.0), (72.0, 42.0), (60.0, 44.0)],
                        color: if mono { Color::White } else { Color::Magenta },
                    });
                }
            }
            SceneId::Division => {
                ctx.draw(&Circle {
                    x: 50.0,
                    y: 50.0,
                    radius: 40.0,
                    color: if mono { Color::White } else { Color::DarkGray },
                });
                let chrom = if mono { Color::White } else { Color::Cyan };
                match st.stage {
                    DivisionStage::MitosisProphase | DivisionStage::MeiosisProphase1 => {
                        ctx.draw(&Seg { x1: 30.0, y1: 30.0, x2: 70.0, y2: 70.0, color: chrom });
                        ctx.draw(&Seg { x1: 70.0, y1: 30.0, x2: 30.0, y2: 70.0, color: chrom });
                    }
                    DivisionStage::MitosisMetaphase => {
                        ctx.draw(&Rectangle {
                            x: 30.0,
                            y: 46.0,
                            width: 40.0,
                            height: 8.0,
                            color: chrom,
                        });
                    }
                    DivisionStage::MitosisAnaphase => {
                        ctx.draw(&Circle { x: 38.0, y: 60.0, radius: 5.0, color: chrom });
                        ctx.draw(&Circle { x: 62.0, y: 40.0, radius: 5.0, color: chrom });
                    }
                    DivisionStage::MitosisTelophase => {
                        ctx.draw(&Rectangle {
                            x: 26.0,
                            y: 66.0,
                            width: 48.0,
                            height: 8.0,
                            color: chrom,
                        });
                        ctx.draw(&Rectangle {
                            x: 26.0,
                            y: 26.0,
                            width: 48.0,
                            height: 8.0,
                            color: chrom,
                        });
                    }
                    DivisionStage::MeiosisAnaphase1 => {
                        ctx.draw(&Circle { x: 32.0, y: 68.0, radius: 8.0, color: chrom });
                        ctx.draw(&Circle { x: 68.0, y: 32.0, radius: 8.0, color: chrom });
                    }
                    DivisionStage::MeiosisGametes => {
                        for (x, y) in [(30.0, 30.0), (30.0, 70.0), (70.0, 30.0), (70.0, 70.0)] {
                            ctx.draw(&Circle { x, y, radius: 6.0, color: chrom });
                        }
                    }
                }
            }
        });
    f.render_widget(canvas, area);
}

fn render_lens(f: &mut Frame, area: Rect, st: &SimState, mono: bool) {
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Micro View"))
        .x_bounds([0.0, 65.0])
        .y_bounds([0.0, 65.0])
        .paint(|ctx| {
            for d in &st.dots {
                ctx.draw(&Points {
                    coords: &[(d.x as f64, d.y as f64)],
                    color: dot_color(d.kind, mono),
                });
            }
        });
    f.render_widget(canvas, area);
}

fn render_controls(f: &mut Frame, area: Rect, st: &SimState, mono: bool) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)])
        .split(area);

    let mut lines: Vec<Line> = Vec::new();
    for s in st.scene.sliders() {
        let (min, max, _) = s.range();
        let v = st.slider_get(*s);
        let frac = ((v - min) / (max - min)).clamp(0.0, 1.0);
        let filled = (frac * 12.0).round() as usize;
        let bar: String = (0..12).map(|i| if i < filled { '■' } else { '·' }).collect();
        lines.push(Line::from(format!(
            "{:<14} {bar} {v:.1}{}",
            s.label(),
            s.unit()
        )));
    }
    lines.push(Line::from(vec![
        Span::raw("Selector: "),
        Span::styled(
            st.scene.options()[st.opt_idx].name(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::from(format!(
        "Rate {:.2}  Volume {:.2}x",
        st.transport_rate, st.cell_volume
    )));
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Controls"));
    f.render_widget(p, rows[0]);

    let gauge_color = if mono {
        Color::White
    } else {
        membrane_color(st.cell_volume, false)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Cell Volume"))
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(((st.cell_volume - 0.6) / 0.8).clamp(0.0, 1.0) as f64)
        .label(format!("{:.2}x", st.cell_volume));
    f.render_widget(gauge, rows[1]);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let scene = SceneId::all()[(cli.scene.clamp(1, 5) - 1) as usize];
    let mut st = SimState::new(cli.seed, scene);
    let mut term = setup_terminal()?;

    let frame_dt = Duration::from_secs_f32(1.0 / cli.fps.clamp(10, 120) as f32);
    let sim_step = Duration::from_secs_f32(1.0 / 30.0);
    let mut last = Instant::now();
    let mut acc = Duration::ZERO;
    let mut quit = false;

    while !quit {
        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(k) = event::read()? {
                if k.kind != KeyEventKind::Press && k.kind != KeyEventKind::Repeat {
                    continue;
                }
                match k.code {
                    KeyCode::Char('q') | KeyCode::Esc => quit = true,
                    KeyCode::Char(' ') => st.running = !st.running,
                    KeyCode::Char('r') => st.reset(),
                    KeyCode::Char('v') => st.cycle_option(),
                    KeyCode::Char('t') | KeyCode::Tab => st.tab = st.tab.next(),
                    KeyCode::Char(c @ '1'..='5') => {
                        st.set_scene(SceneId::all()[c as usize - '1' as usize]);
                    }
                    KeyCode::Up => {
                        if let Some(s) = st.scene.sliders().first() {
                            st.slider_nudge(*s, 1.0);
                        }
                    }
                    KeyCode::Down => {
                        if let Some(s) = st.scene.sliders().first() {
                            st.slider_nudge(*s, -1.0);
                        }
                    }
                    KeyCode::Right => {
                        if let Some(s) = st.scene.sliders().get(1) {
                            st.slider_nudge(*s, 1.0);
                        }
                    }
                    KeyCode::Left => {
                        if let Some(s) = st.scene.sliders().get(1) {
                            st.slider_nudge(*s, -1.0);
                        }
                    }
                    _ => {}
                }
            }
        }

        let now = Instant::now();
        acc = acc.saturating_add(now.saturating_duration_since(last));
        last = now;
        while acc >= sim_step {
            st.tick(sim_step.as_secs_f32());
            acc = acc.saturating_sub(sim_step);
        }

        draw_frame(&mut term, &st, cli.mono)?;
        std::thread::sleep(frame_dt.min(Duration::from_millis(16)));
    }

    restore_terminal(&mut term)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osmosis_equilibrium_is_exact() {
        let o = osmosis(25.0, Tonicity::Isotonic, 1.0);
        assert_eq!(o.rate, 0.0);
        assert_eq!(o.volume, 1.0);
        assert_eq!(o.diff, 0.0);
    }

    #[test]
    fn hypotonic_pure_water_clamps_at_max_volume() {
        let o = osmosis(0.0, Tonicity::Hypotonic, 1.0);
        // raw volume would be 1 + 2.25*0.5 = 2.125
        assert!((o.diff - (-2.25)).abs() < 1e-5);
        assert_eq!(o.volume, 1.4);
        assert!(o.rate > 0.0);
    }

    #[test]
    fn hypertonic_shrinks_toward_the_floor() {
        let o = osmosis(100.0, Tonicity::Hypertonic, 1.0);
        assert!((o.diff - 4.75).abs() < 1e-5);
        assert_eq!(o.volume, 0.6);
        // more external solute means more outward transport
        let weaker = osmosis(50.0, Tonicity::Hypertonic, 1.0);
        assert!(o.rate > weaker.rate);
    }

    #[test]
    fn transport_rate_scales_with_speed() {
        let slow = osmosis(100.0, Tonicity::Hypertonic, 0.5);
        let fast = osmosis(100.0, Tonicity::Hypertonic, 2.0);
        assert!((fast.rate - 4.0 * slow.rate).abs() < 1e-5);
        // volume ignores animation speed
        assert_eq!(slow.volume, fast.volume);
    }

    #[test]
    fn mitochondria_drive_the_organelle_rate() {
        assert!((organelle_rate(Organelle::Mitochondria, 1.0) - 0.8).abs() < 1e-6);
        assert!((organelle_rate(Organelle::Mitochondria, 2.0) - 1.6).abs() < 1e-6);
        assert_eq!(organelle_rate(Organelle::Golgi, 2.0), 0.0);
        assert_eq!(organelle_rate(Organelle::Nucleus, 2.0), 0.0);
    }

    #[test]
    fn scene_control_sets() {
        assert_eq!(SceneId::Microscopy.sliders(), &[Slider::Mag, Slider::Speed]);
        assert_eq!(SceneId::Osmosis.sliders(), &[Slider::Conc, Slider::Speed]);
        assert_eq!(SceneId::Organelles.sliders(), &[Slider::Speed]);
        assert_eq!(SceneId::ProkVsEuk.sliders(), &[Slider::SizeDiff]);
        assert_eq!(SceneId::Division.sliders(), &[Slider::Speed]);
        assert_eq!(SceneId::Osmosis.options().len(), 3);
        assert_eq!(SceneId::Division.options().len(), 7);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut st = SimState::new(3, SceneId::Osmosis);
        st.conc = 80.0;
        st.tonicity = Tonicity::Hypertonic;
        st.recompute();
        let a = (
            st.transport_rate.to_bits(),
            st.cell_volume.to_bits(),
            st.signed_diff.to_bits(),
        );
        st.recompute();
        let b = (
            st.transport_rate.to_bits(),
            st.cell_volume.to_bits(),
            st.signed_diff.to_bits(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn pause_freezes_everything() {
        let mut st = SimState::new(3, SceneId::Osmosis);
        st.running = false;
        let before: Vec<(u32, u32)> = st.dots.iter().map(|d| (d.x.to_bits(), d.y.to_bits())).collect();
        for _ in 0..30 {
            st.tick(1.0 / 30.0);
        }
        let after: Vec<(u32, u32)> = st.dots.iter().map(|d| (d.x.to_bits(), d.y.to_bits())).collect();
        assert_eq!(before, after);
        assert!(st.cargo.is_empty());
    }

    #[test]
    fn dots_wrap_inside_the_lens() {
        let mut st = SimState::new(9, SceneId::Osmosis);
        st.speed = 2.0;
        st.running = true;
        st.recompute();
        for _ in 0..500 {
            st.tick(1.0 / 30.0);
            for d in &st.dots {
                assert!(d.x >= 5.0 && d.x <= 60.0);
                assert!(d.y >= 5.0 && d.y <= 60.0);
            }
        }
    }

    #[test]
    fn osmosis_cargo_follows_the_gradient() {
        // hypotonic: water moves in
        let mut st = SimState::new(5, SceneId::Osmosis);
        st.conc = 0.0;
        st.tonicity = Tonicity::Hypotonic;
        st.running = true;
        st.recompute();
        for _ in 0..60 {
            st.tick(1.0 / 30.0);
        }
        assert!(!st.cargo.is_empty());
        assert!(st.cargo.iter().all(|m| m.kind == CargoKind::WaterIn));

        // isotonic equilibrium: nothing flows
        let mut st = SimState::new(5, SceneId::Osmosis);
        st.conc = 25.0;
        st.tonicity = Tonicity::Isotonic;
        st.running = true;
        st.recompute();
        for _ in 0..60 {
            st.tick(1.0 / 30.0);
        }
        assert!(st.cargo.is_empty());

        // hypertonic: water moves out
        let mut st = SimState::new(5, SceneId::Osmosis);
        st.conc = 100.0;
        st.tonicity = Tonicity::Hypertonic;
        st.running = true;
        st.recompute();
        for _ in 0..60 {
            st.tick(1.0 / 30.0);
        }
        assert!(st.cargo.iter().all(|m| m.kind == CargoKind::WaterOut));
    }

    #[test]
    fn cargo_expires_by_ttl() {
        let mut st = SimState::new(5, SceneId::Organelles);
        st.organelle = Organelle::Mitochondria;
        st.running = true;
        st.recompute();
        for _ in 0..30 {
            st.tick(1.0 / 30.0);
        }
        assert!(!st.cargo.is_empty());
        for m in &st.cargo {
            assert!(m.age < m.ttl);
        }
        st.organelle = Organelle::Nucleus;
        st.recompute();
        for _ in 0..120 {
            st.tick(1.0 / 30.0);
        }
        assert!(st.cargo.is_empty());
    }

    #[test]
    fn reset_restores_documented_defaults() {
        let mut st = SimState::new(5, SceneId::Osmosis);
        st.slider_nudge(Slider::Conc, 10.0);
        st.slider_nudge(Slider::Speed, 5.0);
        st.running = true;
        st.reset();
        assert_eq!(st.mag, 100.0);
        assert_eq!(st.conc, 10.0);
        assert_eq!(st.speed, 1.0);
        assert_eq!(st.transport_rate, osmosis(10.0, st.tonicity, 1.0).rate);
        assert!(!st.running);
    }

    #[test]
    fn slider_clamps_to_descriptor_range() {
        let mut st = SimState::new(5, SceneId::Microscopy);
        st.slider_nudge(Slider::Mag, 1000.0);
        assert_eq!(st.mag, 400.0);
        st.slider_nudge(Slider::Mag, -1000.0);
        assert_eq!(st.mag, 10.0);
        st.slider_nudge(Slider::Speed, -100.0);
        assert!((st.speed - 0.1).abs() < 1e-6);
    }
}
