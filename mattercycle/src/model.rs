//! State shared by the input handler, the tick, and the renderer.

pub(crate) const DOT_COUNT: usize = 20;
pub(crate) const LENS_SPAN: f32 = 80.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Substance {
    Water,
    Alcohol,
    Mercury,
    Acetone,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SubstanceProps {
    pub(crate) melt_point: f32,
    pub(crate) boil_point: f32,
    pub(crate) latent_fusion: f32,
    pub(crate) latent_vapor: f32,
    pub(crate) volatility: f32,
}

impl Substance {
    pub(crate) fn all() -> &'static [Substance] {
        &[
            Substance::Water,
            Substance::Alcohol,
            Substance::Mercury,
            Substance::Acetone,
        ]
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Substance::Water => "Water",
            Substance::Alcohol => "Alcohol",
            Substance::Mercury => "Mercury",
            Substance::Acetone => "Acetone",
        }
    }

    // Latent heats in J/g, simplified teaching values.
    pub(crate) fn props(self) -> SubstanceProps {
        match self {
            Substance::Water => SubstanceProps {
                melt_point: 0.0,
                boil_point: 100.0,
                latent_fusion: 334.0,
                latent_vapor: 2260.0,
                volatility: 1.0,
            },
            Substance::Alcohol => SubstanceProps {
                melt_point: -114.0,
                boil_point: 78.0,
                latent_fusion: 108.0,
                latent_vapor: 855.0,
                volatility: 1.8,
            },
            Substance::Mercury => SubstanceProps {
                melt_point: -39.0,
                boil_point: 357.0,
                latent_fusion: 11.0,
                latent_vapor: 295.0,
                volatility: 0.1,
            },
            Substance::Acetone => SubstanceProps {
                melt_point: -95.0,
                boil_point: 56.0,
                latent_fusion: 98.0,
                latent_vapor: 539.0,
                volatility: 2.5,
            },
        }
    }

    pub(crate) fn next(self) -> Substance {
        let all = Substance::all();
        let i = all.iter().position(|s| *s == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Solid,
    Liquid,
    Gas,
    Melting,
    Boiling,
}

impl Phase {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Phase::Solid => "Solid",
            Phase::Liquid => "Liquid",
            Phase::Gas => "Gas",
            Phase::Melting => "Melting",
            Phase::Boiling => "Boiling",
        }
    }

    pub(crate) fn is_plateau(self) -> bool {
        matches!(self, Phase::Melting | Phase::Boiling)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) enum SceneId {
    ParticleEvidence,
    DiffusionRate,
    StatesOfMatter,
    LatentHeat,
    Evaporation,
}

impl SceneId {
    pub(crate) fn all() -> &'static [SceneId] {
        &[
            SceneId::ParticleEvidence,
            SceneId::DiffusionRate,
            SceneId::StatesOfMatter,
            SceneId::LatentHeat,
            SceneId::Evaporation,
        ]
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            SceneId::ParticleEvidence => "Particle Evidence",
            SceneId::DiffusionRate => "Diffusion Rate",
            SceneId::StatesOfMatter => "States of Matter",
            SceneId::LatentHeat => "Latent Heat",
            SceneId::Evaporation => "Evaporation & Cooling",
        }
    }

    pub(crate) fn rate_label(self) -> &'static str {
        match self {
            SceneId::ParticleEvidence => "Dilution Factor",
            SceneId::DiffusionRate => "Diffusion Time",
            SceneId::StatesOfMatter => "State",
            SceneId::LatentHeat => "Heat Added",
            SceneId::Evaporation => "Evap Rate",
        }
    }

    pub(crate) fn rate_unit(self) -> &'static str {
        match self {
            SceneId::ParticleEvidence => "x",
            SceneId::DiffusionRate => "s",
            SceneId::StatesOfMatter => "",
            SceneId::LatentHeat => "kJ",
            SceneId::Evaporation => "g/s",
        }
    }

    pub(crate) fn secondary_label(self) -> &'static str {
        match self {
            SceneId::ParticleEvidence => "Particle Count",
            SceneId::DiffusionRate => "Relative KE",
            SceneId::StatesOfMatter => "Volume (mL)",
            SceneId::LatentHeat => "Latent Heat (J/g)",
            SceneId::Evaporation => "Cooling Effect (°C)",
        }
    }

    /// The sliders this scene responds to; everything else is inert while the
    /// scene is active. The substance selector stays live in every scene.
    pub(crate) fn controls(self) -> &'static [ControlId] {
        match self {
            SceneId::ParticleEvidence => &[ControlId::Area],
            SceneId::DiffusionRate => &[ControlId::Temp, ControlId::Wind],
            SceneId::StatesOfMatter => &[ControlId::Temp, ControlId::Pressure],
            SceneId::LatentHeat => &[ControlId::Area],
            SceneId::Evaporation => &[ControlId::Temp, ControlId::Wind, ControlId::Area],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ControlId {
    Temp,
    Pressure,
    Wind,
    Area,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ControlDesc {
    pub(crate) id: ControlId,
    pub(crate) label: &'static str,
    pub(crate) unit: &'static str,
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) step: f32,
}

impl ControlId {
    pub(crate) fn desc(self) -> ControlDesc {
        match self {
            ControlId::Temp => ControlDesc {
                id: self,
                label: "Temperature",
                unit: "°C",
                min: -20.0,
                max: 120.0,
                step: 1.0,
            },
            ControlId::Pressure => ControlDesc {
                id: self,
                label: "Pressure",
                unit: "atm",
                min: 0.5,
                max: 3.0,
                step: 0.1,
            },
            ControlId::Wind => ControlDesc {
                id: self,
                label: "Wind Speed",
                unit: "",
                min: 0.0,
                max: 10.0,
                step: 1.0,
            },
            ControlId::Area => ControlDesc {
                id: self,
                label: "Surface Area",
                unit: "x",
                min: 0.1,
                max: 3.0,
                step: 0.1,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Controls {
    pub(crate) temp: f32,
    pub(crate) pressure: f32,
    pub(crate) wind: f32,
    pub(crate) area: f32,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            temp: 30.0,
            pressure: 1.0,
            wind: 2.0,
            area: 1.0,
        }
    }
}

impl Controls {
    pub(crate) fn get(&self, id: ControlId) -> f32 {
        match id {
            ControlId::Temp => self.temp,
            ControlId::Pressure => self.pressure,
            ControlId::Wind => self.wind,
            ControlId::Area => self.area,
        }
    }

    pub(crate) fn nudge(&mut self, id: ControlId, steps: f32) {
        let d = id.desc();
        let v = (self.get(id) + steps * d.step).clamp(d.min, d.max);
        match id {
            ControlId::Temp => self.temp = v,
            ControlId::Pressure => self.pressure = v,
            ControlId::Wind => self.wind = v,
            ControlId::Area => self.area = v,
        }
    }
}

/// Either a plain number or, for the States scene, the phase label itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum RateReadout {
    Value(f32),
    Phase(Phase),
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct MicroDot {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) angle: f32,
}

/// Transient vapor mote spawned by the evaporation scene; removed when its
/// lifetime runs out.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VaporMote {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) drift: f32,
    pub(crate) age: f32,
    pub(crate) ttl: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tab {
    Model,
    Visual,
    Analogy,
    Cause,
    Fix,
}

impl Tab {
    pub(crate) fn all() -> &'static [Tab] {
        &[Tab::Model, Tab::Visual, Tab::Analogy, Tab::Cause, Tab::Fix]
    }

    pub(crate) fn title(self) -> &'static str {
        match self {
            Tab::Model => "Model",
            Tab::Visual => "Visual",
            Tab::Analogy => "Analogy",
            Tab::Cause => "Cause",
            Tab::Fix => "Fix",
        }
    }

    pub(crate) fn next(self) -> Tab {
        let all = Tab::all();
        let i = all.iter().position(|t| *t == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }

    pub(crate) fn body(self) -> &'static [&'static str] {
        match self {
            Tab::Model => &[
                "KE grows with T. Diffusion rate goes as sqrt(T)/mass.",
                "Q = m*L across a plateau: fusion and vaporisation each",
                "absorb heat without raising the temperature.",
            ],
            Tab::Visual => &[
                "Lens: solid = vibration, liquid = close free motion,",
                "gas = chaotic and far apart. Gauge tracks kinetic energy.",
                "Rising motes are energetic particles escaping the surface.",
            ],
            Tab::Analogy => &[
                "Solid: seated audience, swaying in place. Liquid: a crowded",
                "hallway, people slipping past each other. Gas: sprinting",
                "across an open field in every direction.",
            ],
            Tab::Cause => &[
                "Heat -> more KE -> faster motion -> attraction overcome ->",
                "state change. Evaporation steals the fastest particles, so",
                "the liquid left behind cools.",
            ],
            Tab::Fix => &[
                "Evaporation is a surface effect at any temperature; boiling",
                "is a bulk effect at the boiling point only. Vapour is the gas",
                "of something liquid at room temperature.",
            ],
        }
    }
}
