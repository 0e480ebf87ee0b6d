use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::memory::LinkKind;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub physics: PhysicsConfig,
    pub links: LinkSprings,
    pub view: ViewConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    pub repulsion: f64,
    /// Distance floor for the inverse-square repulsion term.
    pub min_distance: f64,
    pub min_separation: f64,
    pub collision: f64,
    pub centering: f64,
    pub damping: f64,
    pub time_step: f64,
    pub max_force: f64,
    pub max_speed: f64,
    pub energy_threshold: f64,
    pub settle_steps: usize,
    /// Grid cell side, which is also the repulsion cutoff.
    pub cell_size: f64,
    pub seed_spread: f64,
    pub warmup_steps: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            repulsion: 6.0,
            min_distance: 1.0,
            min_separation: 4.0,
            collision: 0.5,
            centering: 0.002,
            damping: 0.8,
            time_step: 1.0,
            max_force: 10.0,
            max_speed: 8.0,
            energy_threshold: 0.02,
            settle_steps: 12,
            cell_size: 12.0,
            seed_spread: 10.0,
            warmup_steps: 50,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct LinkSpring {
    pub stiffness: f64,
    pub rest_length: f64,
}

impl LinkSpring {
    pub const fn new(stiffness: f64, rest_length: f64) -> Self {
        Self {
            stiffness,
            rest_length,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkSpringOverride {
    stiffness: Option<f64>,
    rest_length: Option<f64>,
}

/// Spring parameters per link kind. Typed relationships pull tighter than
/// plain references; contradictions sit further apart.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, LinkSpringOverride>")]
pub struct LinkSprings {
    springs: BTreeMap<LinkKind, LinkSpring>,
}

impl LinkSprings {
    const FALLBACK: LinkSpring = LinkSpring::new(0.2, 10.0);

    pub fn spring(&self, kind: LinkKind) -> LinkSpring {
        self.springs.get(&kind).copied().unwrap_or(Self::FALLBACK)
    }

    pub fn set(&mut self, kind: LinkKind, spring: LinkSpring) {
        self.springs.insert(kind, spring);
    }

    pub fn iter(&self) -> impl Iterator<Item = (LinkKind, LinkSpring)> + '_ {
        self.springs.iter().map(|(kind, spring)| (*kind, *spring))
    }
}

impl Default for LinkSprings {
    fn default() -> Self {
        let springs = LinkKind::ALL
            .into_iter()
            .map(|kind| {
                let spring = match kind {
                    LinkKind::References | LinkKind::ReferencedBy => LinkSpring::new(0.2, 10.0),
                    LinkKind::Extends | LinkKind::Implements => LinkSpring::new(0.25, 8.0),
                    LinkKind::BuildsUpon => LinkSpring::new(0.25, 8.0),
                    LinkKind::Supersedes => LinkSpring::new(0.22, 9.0),
                    LinkKind::Clarifies => LinkSpring::new(0.2, 9.0),
                    LinkKind::Contradicts => LinkSpring::new(0.12, 14.0),
                    LinkKind::Unspecified => Self::FALLBACK,
                };
                (kind, spring)
            })
            .collect();
        Self { springs }
    }
}

impl TryFrom<BTreeMap<String, LinkSpringOverride>> for LinkSprings {
    type Error = String;

    fn try_from(overrides: BTreeMap<String, LinkSpringOverride>) -> Result<Self, Self::Error> {
        let mut springs = Self::default();
        for (name, value) in overrides {
            let kind = name.parse::<LinkKind>()?;
            let mut spring = springs.spring(kind);
            if let Some(stiffness) = value.stiffness {
                spring.stiffness = stiffness;
            }
            if let Some(rest_length) = value.rest_length {
                spring.rest_length = rest_length;
            }
            springs.set(kind, spring);
        }
        Ok(springs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub pan_step: f64,
    /// Horizontal stretch applied to world x, since cells are taller than wide.
    pub cell_aspect: f64,
    pub cull_margin: u16,
    pub max_label_width: usize,
    pub tick_interval_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.3,
            max_zoom: 3.0,
            zoom_step: 1.1,
            pan_step: 2.0,
            cell_aspect: 2.0,
            cull_margin: 2,
            max_label_width: 14,
            tick_interval_ms: 33,
        }
    }
}

impl Config {
    /// Reads a TOML config, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let physics = &self.physics;
        let positive = [
            ("physics.min_distance", physics.min_distance),
            ("physics.min_separation", physics.min_separation),
            ("physics.time_step", physics.time_step),
            ("physics.max_force", physics.max_force),
            ("physics.max_speed", physics.max_speed),
            ("physics.energy_threshold", physics.energy_threshold),
            ("physics.cell_size", physics.cell_size),
            ("physics.seed_spread", physics.seed_spread),
            ("view.min_zoom", self.view.min_zoom),
            ("view.pan_step", self.view.pan_step),
            ("view.cell_aspect", self.view.cell_aspect),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                bail!("{name} must be a positive number, got {value}");
            }
        }

        let non_negative = [
            ("physics.repulsion", physics.repulsion),
            ("physics.collision", physics.collision),
            ("physics.centering", physics.centering),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                bail!("{name} must not be negative, got {value}");
            }
        }

        if !(physics.damping > 0.0 && physics.damping < 1.0) {
            bail!("physics.damping must lie in (0, 1), got {}", physics.damping);
        }
        // The grid side doubles as the repulsion cutoff, so overlaps are only
        // seen between neighbouring cells.
        if physics.cell_size < physics.min_separation {
            bail!(
                "physics.cell_size ({}) must not be below physics.min_separation ({})",
                physics.cell_size,
                physics.min_separation
            );
        }
        if physics.settle_steps == 0 {
            bail!("physics.settle_steps must be at least 1");
        }
        if !(self.view.max_zoom.is_finite() && self.view.max_zoom >= self.view.min_zoom) {
            bail!(
                "view.max_zoom ({}) must not be below view.min_zoom ({})",
                self.view.max_zoom,
                self.view.min_zoom
            );
        }
        if !(self.view.zoom_step.is_finite() && self.view.zoom_step > 1.0) {
            bail!("view.zoom_step must be greater than 1, got {}", self.view.zoom_step);
        }
        if self.view.max_label_width == 0 {
            bail!("view.max_label_width must be at least 1");
        }

        for (kind, spring) in self.links.iter() {
            if !(spring.stiffness.is_finite() && spring.stiffness >= 0.0) {
                bail!("links.{kind}.stiffness must not be negative");
            }
            if !(spring.rest_length.is_finite() && spring.rest_length >= 0.0) {
                bail!("links.{kind}.rest_length must not be negative");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().expect("defaults validate");
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [physics]
            damping = 0.7
            settle_steps = 4

            [view]
            max_zoom = 5.0

            [links.contradicts]
            rest_length = 20.0
            "#,
        )
        .unwrap();

        assert_eq!(config.physics.damping, 0.7);
        assert_eq!(config.physics.settle_steps, 4);
        assert_eq!(config.physics.repulsion, PhysicsConfig::default().repulsion);
        assert_eq!(config.view.max_zoom, 5.0);
        assert_eq!(config.view.min_zoom, 0.3);

        let contradicts = config.links.spring(LinkKind::Contradicts);
        assert_eq!(contradicts.rest_length, 20.0);
        assert_eq!(contradicts.stiffness, 0.12);
        assert_eq!(
            config.links.spring(LinkKind::Extends),
            LinkSprings::default().spring(LinkKind::Extends)
        );
    }

    #[test]
    fn unknown_link_kind_is_rejected() {
        let error = Config::from_toml("[links.teleports]\nstiffness = 1.0\n").unwrap_err();
        assert!(format!("{error:#}").contains("teleports"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for raw in [
            "[physics]\ndamping = 1.0\n",
            "[physics]\ncell_size = 0.0\n",
            "[physics]\nsettle_steps = 0\n",
            "[view]\nmin_zoom = 2.0\nmax_zoom = 1.0\n",
            "[view]\nzoom_step = 0.9\n",
            "[links.extends]\nstiffness = -1.0\n",
        ] {
            assert!(Config::from_toml(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn cell_size_must_cover_the_separation() {
        let error = Config::from_toml("[physics]\ncell_size = 1.0\n").unwrap_err();
        assert!(format!("{error:#}").contains("min_separation"));

        let config = Config::from_toml("[physics]\ncell_size = 4.0\nmin_separation = 4.0\n").unwrap();
        assert_eq!(config.physics.cell_size, config.physics.min_separation);
        assert!(Config::from_toml("[physics]\ncell_size = 6.0\nmin_separation = 8.0\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("[physics]\ngravity = 9.8\n").is_err());
    }
}
