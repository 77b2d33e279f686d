use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_iterations() -> u32 {
    10
}
const fn default_convergence_tolerance() -> f32 {
    0.01
}
const fn default_step_threshold() -> f32 {
    0.5
}
const fn default_step_speed() -> f32 {
    1.0
}
const fn default_step_height() -> f32 {
    0.2
}
const fn default_sensor_max_distance() -> f32 {
    1.5
}
const fn default_lead_radius() -> f32 {
    0.3
}
const fn default_sensor_height_offset() -> f32 {
    0.5
}
const fn default_layer_mask() -> u32 {
    u32::MAX
}
const fn default_body_height_offset() -> f32 {
    1.2
}
const fn default_correction_min() -> f32 {
    0.1
}
const fn default_correction_max() -> f32 {
    4.0
}
const fn default_rotate_rate() -> f32 {
    2.0
}
const fn default_move_speed() -> f32 {
    1.0
}
const fn default_segment_count() -> usize {
    2
}

fn require_positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} (must be > 0)")))
    }
}

fn require_non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} (must be >= 0)")))
    }
}

// ---------------------------------------------------------------------------
// SolverConfig
// ---------------------------------------------------------------------------

/// Chain solver tuning shared by every limb.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Cap on bend passes (backward + forward) per tick.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Leaf-to-goal distance below which bending stops early. Compared
    /// squared against the squared leaf error.
    #[serde(default = "default_convergence_tolerance")]
    pub convergence_tolerance: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            convergence_tolerance: default_convergence_tolerance(),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid("solver.max_iterations", "must be >= 1"));
        }
        require_positive("solver.convergence_tolerance", self.convergence_tolerance)
    }
}

// ---------------------------------------------------------------------------
// GaitConfig
// ---------------------------------------------------------------------------

/// Stepping thresholds and trajectory shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaitConfig {
    /// Foot-to-contact distance that triggers a step (compared squared).
    /// Also the minimum length of a step.
    #[serde(default = "default_step_threshold")]
    pub step_threshold: f32,

    /// Nominal step progress per second.
    #[serde(default = "default_step_speed")]
    pub step_speed: f32,

    /// Peak foot lift along the body up axis.
    #[serde(default = "default_step_height")]
    pub step_height: f32,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            step_threshold: default_step_threshold(),
            step_speed: default_step_speed(),
            step_height: default_step_height(),
        }
    }
}

impl GaitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("gait.step_threshold", self.step_threshold)?;
        require_positive("gait.step_speed", self.step_speed)?;
        require_non_negative("gait.step_height", self.step_height)
    }
}

// ---------------------------------------------------------------------------
// SensorConfig
// ---------------------------------------------------------------------------

/// Ground query geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Maximum ray length below the sensor origin.
    #[serde(default = "default_sensor_max_distance")]
    pub max_distance: f32,

    /// How far ahead of the home point (along the travel direction) the ray
    /// is cast.
    #[serde(default = "default_lead_radius")]
    pub lead_radius: f32,

    /// Offset of the ray origin along the body up axis. May be negative.
    #[serde(default = "default_sensor_height_offset")]
    pub height_offset: f32,

    /// Collision layers the ground query may hit.
    #[serde(default = "default_layer_mask")]
    pub layer_mask: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            max_distance: default_sensor_max_distance(),
            lead_radius: default_lead_radius(),
            height_offset: default_sensor_height_offset(),
            layer_mask: default_layer_mask(),
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("sensor.max_distance", self.max_distance)?;
        require_non_negative("sensor.lead_radius", self.lead_radius)?;
        if !self.height_offset.is_finite() {
            return Err(ConfigError::invalid("sensor.height_offset", "must be finite"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BodyConfig
// ---------------------------------------------------------------------------

/// When the externally supplied yaw delta is applied relative to the
/// up-vector alignment within a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YawOrder {
    /// Align up to the averaged normal, then yaw about the new up axis.
    #[default]
    AfterAlign,
    /// Yaw about world up before height and tilt correction.
    BeforeAlign,
}

/// Body stabilizer tuning and drive speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Body height above the averaged foot position, along body up.
    #[serde(default = "default_body_height_offset")]
    pub height_offset: f32,

    /// Lower clamp on the height correction speed (units/s).
    #[serde(default = "default_correction_min")]
    pub correction_min: f32,

    /// Upper clamp on the height correction speed (units/s).
    #[serde(default = "default_correction_max")]
    pub correction_max: f32,

    /// Maximum angular speed (rad/s) of the up-axis alignment.
    #[serde(default = "default_rotate_rate")]
    pub rotate_rate: f32,

    #[serde(default)]
    pub yaw_order: YawOrder,

    /// Translation speed applied to the movement direction.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            height_offset: default_body_height_offset(),
            correction_min: default_correction_min(),
            correction_max: default_correction_max(),
            rotate_rate: default_rotate_rate(),
            yaw_order: YawOrder::default(),
            move_speed: default_move_speed(),
        }
    }
}

impl BodyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.height_offset.is_finite() {
            return Err(ConfigError::invalid("body.height_offset", "must be finite"));
        }
        require_non_negative("body.correction_min", self.correction_min)?;
        require_positive("body.correction_max", self.correction_max)?;
        if self.correction_min > self.correction_max {
            return Err(ConfigError::invalid(
                "body.correction_min",
                format!(
                    "{} exceeds body.correction_max {}",
                    self.correction_min, self.correction_max
                ),
            ));
        }
        require_non_negative("body.rotate_rate", self.rotate_rate)?;
        require_non_negative("body.move_speed", self.move_speed)
    }
}

// ---------------------------------------------------------------------------
// LimbConfig
// ---------------------------------------------------------------------------

/// Per-limb settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimbConfig {
    pub name: String,

    /// Number of chain segments (joints minus one), counted back from the
    /// foot.
    #[serde(default = "default_segment_count")]
    pub segment_count: usize,

    /// Limbs that must stay grounded while this one steps.
    #[serde(default)]
    pub partners: Vec<String>,

    /// Optional bend hint in body space.
    #[serde(default)]
    pub pole: Option<[f32; 3]>,
}

impl LimbConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segment_count: default_segment_count(),
            partners: Vec::new(),
            pole: None,
        }
    }

    #[must_use]
    pub const fn with_segment_count(mut self, segment_count: usize) -> Self {
        self.segment_count = segment_count;
        self
    }

    #[must_use]
    pub fn with_partner(mut self, partner: impl Into<String>) -> Self {
        self.partners.push(partner.into());
        self
    }

    #[must_use]
    pub const fn with_pole(mut self, pole: [f32; 3]) -> Self {
        self.pole = Some(pole);
        self
    }
}

// ---------------------------------------------------------------------------
// LocomotionConfig
// ---------------------------------------------------------------------------

/// Complete creature configuration loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocomotionConfig {
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub gait: GaitConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub limbs: Vec<LimbConfig>,
}

impl LocomotionConfig {
    /// Validate every section and the limb partner graph.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.solver.validate()?;
        self.gait.validate()?;
        self.sensor.validate()?;
        self.body.validate()?;
        for limb in &self.limbs {
            if limb.segment_count == 0 {
                return Err(ConfigError::invalid(
                    format!("limbs.{}.segment_count", limb.name),
                    "must be >= 1",
                ));
            }
        }
        self.partner_indices().map(|_| ())
    }

    /// Index of the limb called `name`.
    pub fn limb_index(&self, name: &str) -> Option<usize> {
        self.limbs.iter().position(|l| l.name == name)
    }

    /// Resolve partner names into a flat adjacency list indexed like
    /// `limbs`.
    pub fn partner_indices(&self) -> Result<Vec<Vec<usize>>, ConfigError> {
        let mut seen = HashSet::new();
        for limb in &self.limbs {
            if !seen.insert(limb.name.as_str()) {
                return Err(ConfigError::DuplicateLimb(limb.name.clone()));
            }
        }

        self.limbs
            .iter()
            .map(|limb| {
                limb.partners
                    .iter()
                    .map(|partner| {
                        if partner == &limb.name {
                            return Err(ConfigError::SelfPartner(limb.name.clone()));
                        }
                        self.limb_index(partner)
                            .ok_or_else(|| ConfigError::UnknownPartner {
                                limb: limb.name.clone(),
                                partner: partner.clone(),
                            })
                    })
                    .collect()
            })
            .collect()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
