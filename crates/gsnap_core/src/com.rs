//! Shrinking-sphere center of mass.
//!
//! Starting from a large sphere, repeatedly replace the center by the mean
//! of the particles inside it and shrink the radius, until the sphere holds
//! no more than a fixed fraction of all particles. Outliers far from the
//! dense core stop contributing long before the loop ends.

use crate::errors::{Result, SnapError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComConfig {
    pub initial_center: [f64; 3],
    /// Must enclose every plausible coordinate.
    pub initial_radius: f64,
    pub shrink_factor: f64,
    /// Stop once the sphere holds at most this fraction of the particles.
    pub stop_fraction: f64,
    pub max_iterations: usize,
}

impl Default for ComConfig {
    fn default() -> Self {
        Self {
            initial_center: [0.0; 3],
            initial_radius: 9001.0,
            shrink_factor: 0.99,
            stop_fraction: 0.1,
            max_iterations: 10_000,
        }
    }
}

impl ComConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: ComConfig = serde_json::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |what: &str| Err(SnapError::InvalidInput(what.to_string()));
        if !self.initial_center.iter().all(|c| c.is_finite()) {
            return bad("initial_center must be finite");
        }
        if !(self.initial_radius.is_finite() && self.initial_radius > 0.0) {
            return bad("initial_radius must be positive and finite");
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return bad("shrink_factor must lie in (0, 1)");
        }
        if !(self.stop_fraction >= 0.0 && self.stop_fraction < 1.0) {
            return bad("stop_fraction must lie in [0, 1)");
        }
        if self.max_iterations == 0 {
            return bad("max_iterations must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pos: [f64; 3],
}

impl Particle {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { pos: [x, y, z] }
    }

    pub fn position(&self) -> [f64; 3] { self.pos }

    #[inline]
    fn inside(&self, c: &[f64; 3], r2: f64) -> bool {
        let d: f64 = self.pos.iter().zip(c).map(|(x, c)| (x - c) * (x - c)).sum();
        d <= r2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComEstimate {
    pub center: [f64; 3],
    /// Radius of the last sphere that selected particles.
    pub radius: f64,
    /// Particles inside that sphere.
    pub selected: usize,
    pub iterations: usize,
    /// False when `max_iterations` ran out before the stop rule held.
    pub converged: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ParticleSet {
    particles: Vec<Particle>,
}

impl ParticleSet {
    pub fn new() -> Self { Self::default() }

    pub fn add_particle(&mut self, x: f64, y: f64, z: f64) {
        self.particles.push(Particle::new(x, y, z));
    }

    /// Build from flat xyz triples, dropping the first `skip` particles.
    /// A trailing partial triple is ignored.
    pub fn from_positions(flat: &[f32], skip: usize) -> Self {
        let particles = flat
            .chunks_exact(3)
            .skip(skip)
            .map(|p| Particle::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])))
            .collect();
        Self { particles }
    }

    pub fn len(&self) -> usize { self.particles.len() }

    pub fn is_empty(&self) -> bool { self.particles.is_empty() }

    pub fn particles(&self) -> &[Particle] { &self.particles }

    pub fn estimate(&self, cfg: &ComConfig) -> Result<ComEstimate> {
        cfg.validate()?;
        if self.particles.is_empty() {
            // nothing to trim: the starting center stands
            return Ok(ComEstimate {
                center: cfg.initial_center,
                radius: cfg.initial_radius,
                selected: 0,
                iterations: 0,
                converged: true,
            });
        }
        let total = self.particles.len();
        let stop_at = cfg.stop_fraction * total as f64;

        let mut center = cfg.initial_center;
        let mut r = cfg.initial_radius;
        let mut last = ComEstimate { center, radius: r, selected: total, iterations: 0, converged: false };

        for iteration in 1..=cfg.max_iterations {
            let r2 = r * r;
            // running mean: exact when every selected particle coincides
            let mut mean = [0.0f64; 3];
            let mut n = 0usize;
            for p in self.particles.iter().filter(|p| p.inside(&center, r2)) {
                n += 1;
                let k = n as f64;
                for (m, x) in mean.iter_mut().zip(p.pos) {
                    *m += (x - *m) / k;
                }
            }

            if n == 0 {
                if iteration == 1 {
                    return Err(SnapError::EmptySelection { radius: r });
                }
                // keep the last center that had support
                tracing::debug!(iteration, radius = r, "sphere emptied before the stop fraction");
                last.converged = true;
                return Ok(last);
            }

            center = mean;
            last = ComEstimate { center, radius: r, selected: n, iterations: iteration, converged: false };
            r *= cfg.shrink_factor;

            if (n as f64) <= stop_at {
                last.converged = true;
                tracing::debug!(iteration, selected = n, radius = last.radius, "center of mass converged");
                return Ok(last);
            }
        }

        tracing::warn!(
            iterations = cfg.max_iterations,
            selected = last.selected,
            "center of mass did not reach the stop fraction"
        );
        Ok(last)
    }
}

/// Center of mass of `points` with the default configuration.
pub fn compute(points: &[[f64; 3]]) -> Result<[f64; 3]> {
    let mut set = ParticleSet::new();
    for p in points {
        set.add_particle(p[0], p[1], p[2]);
    }
    Ok(set.estimate(&ComConfig::default())?.center)
}
