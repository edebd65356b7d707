//! Virtual-twist coupling between the panel solution and section polars
//!
//! Each station is looked up at the angle the panel solution implies,
//!
//! ```text
//! α_eff = α0 + Cl_inv / 2π - θ
//! ```
//!
//! and the twist `θ` is relaxed towards the viscous lift,
//!
//! ```text
//! θ += relaxation · (Cl_visc - Cl_inv) / 2π
//! ```
//!
//! until the largest discrepancy drops below the tolerance.

use crate::core::assembly::BoundaryState;
use crate::core::config::{FluidProperties, ViscousConfig};
use crate::core::constants::PI2;
use crate::core::error::ViscousFailure;
use crate::core::mesh::PanelMesh;
use crate::core::parallel::parallel_map_blocks;

use super::polar::{PolarProvider, PolarQuery, PolarSample};
use super::span::SpanDistribution;

/// Result of one station lookup
#[derive(Debug, Clone, Copy)]
struct StationLookup {
    reynolds: f64,
    alpha_deg: f64,
    sample: PolarSample,
}

/// Drives the polar lookups and the twist relaxation
pub struct ViscousCoupling<'a> {
    config: &'a ViscousConfig,
    fluid: &'a FluidProperties,
    polars: &'a dyn PolarProvider,
}

impl<'a> ViscousCoupling<'a> {
    /// Coupling for a configuration and a polar source
    pub fn new(
        config: &'a ViscousConfig,
        fluid: &'a FluidProperties,
        polars: &'a dyn PolarProvider,
    ) -> Self {
        Self {
            config,
            fluid,
            polars,
        }
    }

    /// Look every station up at `speed` and return the largest discrepancy
    /// between viscous and inviscid lift, as an angle (deg)
    ///
    /// Lookups run in parallel blocks; when several stations fail, the one
    /// with the lowest index is reported.
    pub fn evaluate(
        &self,
        spans: &mut [SpanDistribution],
        speed: f64,
        workers: usize,
    ) -> Result<f64, ViscousFailure> {
        let stations: Vec<(usize, usize)> = spans
            .iter()
            .enumerate()
            .flat_map(|(s, span)| (0..span.len()).map(move |i| (s, i)))
            .collect();

        let lookups: Vec<Result<StationLookup, ViscousFailure>> = {
            let spans: &[SpanDistribution] = spans;
            parallel_map_blocks(stations.len(), workers, |range| {
                range
                    .map(|k| {
                        let (s, i) = stations[k];
                        self.lookup_station(&spans[s], i, speed)
                    })
                    .collect()
            })
        };

        let mut worst = 0.0_f64;
        for (&(s, i), lookup) in stations.iter().zip(lookups) {
            let lookup = lookup?;
            let span = &mut spans[s];
            span.reynolds[i] = lookup.reynolds;
            span.alpha_effective[i] = lookup.alpha_deg;
            span.cl_viscous[i] = lookup.sample.cl;
            span.profile_drag[i] = lookup.sample.cd;
            span.xtr_top[i] = lookup.sample.xtr_top;
            span.xtr_bot[i] = lookup.sample.xtr_bot;
            let discrepancy = ((span.cl_viscous[i] - span.cl_inviscid[i]) / PI2).to_degrees();
            worst = worst.max(discrepancy.abs());
        }
        Ok(worst)
    }

    fn lookup_station(
        &self,
        span: &SpanDistribution,
        i: usize,
        speed: f64,
    ) -> Result<StationLookup, ViscousFailure> {
        let foil = &span.foil[i];
        let reynolds = speed * span.chord[i] / self.fluid.kinematic_viscosity;
        let fail = |alpha: Option<f64>, reason: String| ViscousFailure {
            surface: span.name.clone(),
            station: Some(i),
            foil: Some(foil.clone()),
            reynolds: Some(reynolds),
            alpha_deg: alpha,
            reason,
        };

        let alpha0 = self
            .polars
            .zero_lift_angle(foil, reynolds)
            .map_err(|e| fail(None, e.to_string()))?;
        let alpha_deg =
            alpha0 + (span.cl_inviscid[i] / PI2 - span.virtual_twist[i]).to_degrees();
        let sample = self
            .polars
            .lookup(foil, reynolds, PolarQuery::Alpha(alpha_deg))
            .map_err(|e| fail(Some(alpha_deg), e.to_string()))?;
        Ok(StationLookup {
            reynolds,
            alpha_deg,
            sample,
        })
    }

    /// Move every virtual twist towards the viscous lift
    pub fn relax(&self, spans: &mut [SpanDistribution]) {
        for span in spans.iter_mut() {
            for i in 0..span.len() {
                span.virtual_twist[i] +=
                    self.config.relaxation * (span.cl_viscous[i] - span.cl_inviscid[i]) / PI2;
            }
        }
    }

    /// Failure reported when the iteration budget runs out
    pub fn non_convergence(&self, spans: &[SpanDistribution], discrepancy_deg: f64) -> ViscousFailure {
        let worst = spans
            .iter()
            .flat_map(|span| (0..span.len()).map(move |i| (span, i)))
            .max_by(|a, b| {
                let gap = |(span, i): &(&SpanDistribution, usize)| {
                    (span.cl_viscous[*i] - span.cl_inviscid[*i]).abs()
                };
                gap(a).total_cmp(&gap(b))
            });
        ViscousFailure {
            surface: worst.map(|(s, _)| s.name.clone()).unwrap_or_default(),
            station: worst.map(|(_, i)| i),
            foil: worst.map(|(s, i)| s.foil[i].clone()),
            reynolds: worst.map(|(s, i)| s.reynolds[i]),
            alpha_deg: worst.map(|(s, i)| s.alpha_effective[i]),
            reason: format!(
                "no convergence after {} iterations (discrepancy {:.4}°)",
                self.config.max_iterations, discrepancy_deg
            ),
        }
    }
}

/// Tilt the normals of every station by its virtual twist
pub fn apply_twist(mesh: &PanelMesh, spans: &[SpanDistribution], state: &mut BoundaryState) {
    for span in spans {
        let Some(surface) = mesh.surfaces.get(span.surface) else {
            continue;
        };
        for (strip, &theta) in surface.strips.iter().zip(&span.virtual_twist) {
            state.rotate_normals(&strip.panels, &strip.span_axis, theta);
        }
    }
}
