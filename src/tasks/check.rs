//! Headless dry run: compile the shader and decode every binding without
//! opening a window.

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::Error;
use crate::events::EffectBinding;
use crate::processing::layout::{CoverTransform, update_cover};
use crate::render::reflect::CompiledShader;
use crate::tasks::loader;

#[derive(Debug)]
pub struct CheckSummary {
    pub image: (u32, u32),
    pub depth_map: (u32, u32),
    /// Cover for the configured window size; `None` if either side is empty.
    pub cover: Option<CoverTransform>,
}

#[derive(Debug)]
pub struct CheckReport {
    pub title: String,
    pub outcome: Result<CheckSummary, Error>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Fails only if the shader itself is unusable; per-binding load failures are
/// reported in the returned list, in binding order.
pub async fn run(bindings: Vec<EffectBinding>, surface_size: (u32, u32)) -> Result<Vec<CheckReport>> {
    let shader = CompiledShader::parallax().context("parallax shader rejected")?;
    info!(
        bindings = ?shader.bindings(),
        "parallax shader compiled",
    );

    let mut tasks = JoinSet::new();
    for (index, binding) in bindings.into_iter().enumerate() {
        tasks.spawn(async move {
            let outcome = loader::load(&binding.sources).await.map(|assets| {
                let image = assets.image.dimensions();
                CheckSummary {
                    image,
                    depth_map: assets.depth_map.dimensions(),
                    cover: update_cover(surface_size.0, surface_size.1, image.0, image.1),
                }
            });
            (index, CheckReport { title: binding.title, outcome })
        });
    }

    let mut reports = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        reports.push(joined.context("check task panicked")?);
    }
    reports.sort_by_key(|(index, _)| *index);

    let reports: Vec<CheckReport> = reports.into_iter().map(|(_, report)| report).collect();
    for report in &reports {
        match &report.outcome {
            Ok(summary) => info!(
                effect = %report.title,
                image = ?summary.image,
                depth_map = ?summary.depth_map,
                cover = ?summary.cover,
                "ok",
            ),
            Err(err) => warn!(effect = %report.title, error = %err, "failed"),
        }
    }
    Ok(reports)
}
