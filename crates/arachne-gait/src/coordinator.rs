//! Reactive gait: step triggering and the grounding-partner lock.
//!
//! Limbs are visited in order. A limb may only lift off while none of its
//! partners are stepping, and since a limb that starts stepping is visible to
//! every limb visited after it, two partners can never be airborne together.
//!
//! A limb that wants to step but is held down accumulates waiting ticks. A
//! grounded limb yields to any partner that has waited longer, so a pair of
//! non-partners relifting out of phase cannot starve a limb they share.

use nalgebra::Vector3;
use tracing::debug;

use arachne_core::config::GaitConfig;
use arachne_core::error::ConfigError;

use crate::limb::Limb;

/// Limbs whose state changed during one [`GaitCoordinator::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GaitReport {
    pub started: Vec<usize>,
    pub landed: Vec<usize>,
}

/// Drives every limb's stepping state machine.
#[derive(Debug, Clone, Default)]
pub struct GaitCoordinator {
    config: GaitConfig,
    /// Consecutive ticks each limb has wanted to step without lifting.
    waiting: Vec<u32>,
}

impl GaitCoordinator {
    pub const fn new(config: GaitConfig) -> Self {
        Self {
            config,
            waiting: Vec::new(),
        }
    }

    pub const fn config(&self) -> &GaitConfig {
        &self.config
    }

    /// Install partner lists on `limbs`, one list per limb.
    ///
    /// Lists are made symmetric: if `a` names `b`, `b` also gets `a`.
    pub fn link_partners(limbs: &mut [Limb], lists: &[Vec<usize>]) -> Result<(), ConfigError> {
        if lists.len() != limbs.len() {
            return Err(ConfigError::LimbCountMismatch {
                expected: limbs.len(),
                got: lists.len(),
            });
        }

        let mut symmetric: Vec<Vec<usize>> = vec![Vec::new(); limbs.len()];
        for (limb, partners) in lists.iter().enumerate() {
            for &partner in partners {
                if partner >= limbs.len() {
                    return Err(ConfigError::PartnerOutOfRange {
                        index: partner,
                        count: limbs.len(),
                    });
                }
                if partner == limb {
                    return Err(ConfigError::SelfPartner(limbs[limb].name().to_string()));
                }
                if !symmetric[limb].contains(&partner) {
                    symmetric[limb].push(partner);
                }
                if !symmetric[partner].contains(&limb) {
                    symmetric[partner].push(limb);
                }
            }
        }

        for (limb, mut partners) in limbs.iter_mut().zip(symmetric) {
            partners.sort_unstable();
            limb.set_partners(partners);
        }
        Ok(())
    }

    /// Whether any partner of `limbs[index]` is mid-step.
    pub fn partner_stepping(limbs: &[Limb], index: usize) -> bool {
        limbs[index]
            .partners()
            .iter()
            .any(|&partner| limbs[partner].is_stepping())
    }

    /// Whether a partner of `limbs[index]` has been held down longer than it.
    fn partner_waited_longer(&self, limbs: &[Limb], index: usize) -> bool {
        limbs[index]
            .partners()
            .iter()
            .any(|&partner| self.waiting[partner] > self.waiting[index])
    }

    /// Ticks `limbs[index]` has wanted to step without lifting off.
    pub fn waiting(&self, index: usize) -> u32 {
        self.waiting.get(index).copied().unwrap_or(0)
    }

    /// Start and advance steps for one tick.
    pub fn update(&mut self, limbs: &mut [Limb], up: &Vector3<f32>, dt: f32) -> GaitReport {
        let mut report = GaitReport::default();
        let threshold = self.config.step_threshold;
        self.waiting.resize(limbs.len(), 0);

        for index in 0..limbs.len() {
            if limbs[index].is_stepping() || !limbs[index].wants_step(threshold) {
                self.waiting[index] = 0;
            } else if Self::partner_stepping(limbs, index)
                || self.partner_waited_longer(limbs, index)
            {
                self.waiting[index] = self.waiting[index].saturating_add(1);
            } else {
                self.waiting[index] = 0;
                limbs[index].begin_step(threshold);
                debug!(limb = %limbs[index].name(), "step started");
                report.started.push(index);
            }

            let limb = &mut limbs[index];
            if limb.is_stepping()
                && limb.advance_step(dt, self.config.step_speed, self.config.step_height, up)
            {
                debug!(limb = %limb.name(), steps = limb.steps_taken(), "step landed");
                report.landed.push(index);
            }
        }
        report
    }
}
