//! Scripted surface workloads against a screen, used by the `glint simulate` command.

use std::collections::BTreeMap;

use crate::{
    GlintBuilder, GlintOpts,
    accel::{Backend, BackendStats, BackingKind, LifecycleState, PoolStats, block_handler},
    foundation::{
        core::SurfaceUsage,
        error::{GlintError, GlintResult},
    },
    gpu::GpuDevice,
    host::{
        Screen,
        dispatch::OpCall,
        surface::{SoftwareStats, SurfaceId},
    },
};

/// A named sequence of steps.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Raw initialization flags.
    #[serde(default = "default_flags")]
    pub flags: u32,
    /// Backend tunables.
    #[serde(default)]
    pub opts: GlintOpts,
    /// Steps, run in order.
    pub steps: Vec<Step>,
}

fn default_flags() -> u32 {
    0b011
}

/// One scripted action. Surfaces are referred to by name.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Allocate a surface and remember it as `name`.
    Create {
        /// Handle for later steps.
        name: String,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Pixel depth.
        #[serde(default = "default_depth")]
        depth: u8,
        /// Allocation hint.
        #[serde(default)]
        usage: SurfaceUsage,
    },
    /// Drop one reference to `name`.
    Destroy {
        /// Surface name.
        name: String,
    },
    /// Composite `src` onto `dst`.
    Composite {
        /// Source surface name.
        src: String,
        /// Destination surface name.
        dst: String,
    },
    /// Run `count` per-frame ticks.
    Tick {
        /// Number of ticks.
        count: u64,
    },
}

fn default_depth() -> u8 {
    24
}

/// Where a named surface ended up.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SurfaceReport {
    /// Whether the surface still exists.
    pub alive: bool,
    /// Backing tag; `None` for surfaces the backend never tracked.
    pub kind: Option<BackingKind>,
    /// Whether a render target is bound.
    pub accelerated: bool,
}

/// Outcome of a scenario run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Report {
    /// Lifecycle state before teardown.
    pub state: LifecycleState,
    /// Backend counters before teardown.
    pub backend: BackendStats,
    /// Pool counters before teardown.
    pub pool: PoolStats,
    /// Software store counters.
    pub software: SoftwareStats,
    /// Rendering calls that reached the software implementation.
    pub software_calls: u64,
    /// Per-surface outcome, by name.
    pub surfaces: BTreeMap<String, SurfaceReport>,
    /// Result of closing the screen.
    pub closed: bool,
}

/// Activate the backend on a fresh screen, run `scenario`, then close the screen.
#[tracing::instrument(skip_all, fields(steps = scenario.steps.len()))]
pub fn run(device: Box<dyn GpuDevice>, scenario: &Scenario) -> GlintResult<Report> {
    let mut screen = Screen::new(0);
    let backend = GlintBuilder::new(device)
        .flags(scenario.flags)
        .opts(scenario.opts.clone())
        .init(&mut screen)?;

    let mut names = BTreeMap::new();
    for step in &scenario.steps {
        match step {
            Step::Create {
                name,
                width,
                height,
                depth,
                usage,
            } => {
                let id = screen.create_surface(*width, *height, *depth, *usage)?;
                match id {
                    Some(id) => {
                        names.insert(name.clone(), id);
                    }
                    None => tracing::warn!(%name, width, height, "host refused surface"),
                }
            }
            Step::Destroy { name } => {
                let id = lookup(&names, name)?;
                screen.destroy_surface(id)?;
            }
            Step::Composite { src, dst } => {
                let call = OpCall::Composite {
                    src: lookup(&names, src)?,
                    mask: None,
                    dst: lookup(&names, dst)?,
                };
                screen.dispatch(call)?;
            }
            Step::Tick { count } => {
                for _ in 0..*count {
                    block_handler(&mut screen)?;
                }
            }
        }
    }

    let surfaces = names
        .iter()
        .map(|(name, &id)| {
            let binding = backend.binding(id);
            let report = SurfaceReport {
                alive: screen.surfaces().contains(id),
                kind: binding.map(|b| b.kind),
                accelerated: binding.is_some_and(|b| b.target.is_some()),
            };
            (name.clone(), report)
        })
        .collect();

    let report = summarize(&backend, &screen, surfaces);
    let closed = screen.close()?;
    Ok(Report { closed, ..report })
}

fn lookup(names: &BTreeMap<String, SurfaceId>, name: &str) -> GlintResult<SurfaceId> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| GlintError::invalid_configuration(format!("unknown surface '{name}'")))
}

fn summarize(
    backend: &Backend,
    screen: &Screen,
    surfaces: BTreeMap<String, SurfaceReport>,
) -> Report {
    Report {
        state: backend.state(),
        backend: backend.stats(),
        pool: backend.pool_stats(),
        software: screen.surfaces().stats(),
        software_calls: screen.software_calls(),
        surfaces,
        closed: false,
    }
}

#[cfg(test)]
#[path = "../tests/unit/sim.rs"]
mod tests;
