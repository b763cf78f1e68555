use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use crate::{
    foundation::error::{GlintError, GlintResult},
    gpu::{GlFlavor, GpuDevice, GpuParam, GpuVersion, RawTarget, TargetDesc, TextureId},
};

/// Description of a [`HeadlessDevice`]. Deserializable so the CLI can load it from JSON.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeadlessSpec {
    /// Reported version.
    pub version: GpuVersion,
    /// Reported flavor.
    pub flavor: GlFlavor,
    /// Reported extensions.
    pub extensions: Vec<String>,
    /// `MaxRenderbufferSize`.
    pub max_renderbuffer_size: i64,
    /// `MaxTextureSize`.
    pub max_texture_size: i64,
    /// Maximum live render targets before allocation fails. `None` is unbounded.
    pub target_budget: Option<usize>,
    /// Make every `finish` report a device loss.
    pub fail_finish: bool,
}

impl Default for HeadlessSpec {
    fn default() -> Self {
        Self {
            version: GpuVersion::new(3, 0),
            flavor: GlFlavor::Desktop,
            extensions: vec![
                "GL_MESA_pack_invert".to_string(),
                "GL_EXT_framebuffer_blit".to_string(),
            ],
            max_renderbuffer_size: 8192,
            max_texture_size: 8192,
            target_budget: None,
            fail_finish: false,
        }
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_name: u64,
    live: BTreeMap<RawTarget, LiveTarget>,
    created: u64,
    bound: u64,
    destroyed: u64,
    flushes: u64,
    finishes: u64,
    calls: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy)]
struct LiveTarget {
    desc: TargetDesc,
    texture: Option<TextureId>,
}

/// In-memory [`GpuDevice`] that only does bookkeeping.
///
/// Counters live behind a shared handle so they stay observable after the device is handed to
/// the backend; see [`HeadlessDevice::probe`].
#[derive(Debug)]
pub struct HeadlessDevice {
    spec: HeadlessSpec,
    state: Rc<RefCell<HeadlessState>>,
}

/// Read-only view of a [`HeadlessDevice`]'s counters.
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessDevice {
    /// Build a device from `spec`.
    pub fn new(spec: HeadlessSpec) -> Self {
        Self {
            spec,
            state: Rc::new(RefCell::new(HeadlessState {
                next_name: 1,
                ..HeadlessState::default()
            })),
        }
    }

    /// Convenience constructor for a desktop device with the given target size limit.
    pub fn with_max_size(max: i64) -> Self {
        Self::new(HeadlessSpec {
            max_renderbuffer_size: max,
            max_texture_size: max,
            ..HeadlessSpec::default()
        })
    }

    /// Shared handle to this device's counters.
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: Rc::clone(&self.state),
        }
    }

    /// The description this device was built from.
    pub fn spec(&self) -> &HeadlessSpec {
        &self.spec
    }

    fn allocate(&mut self, desc: TargetDesc, texture: Option<TextureId>) -> GlintResult<RawTarget> {
        let mut st = self.state.borrow_mut();
        if let Some(budget) = self.spec.target_budget
            && st.live.len() >= budget
        {
            return Err(GlintError::out_of_resources(format!(
                "headless target budget {budget} exhausted"
            )));
        }
        let max = u32::try_from(self.spec.max_renderbuffer_size).unwrap_or(0);
        if desc.width > max || desc.height > max {
            return Err(GlintError::out_of_resources(format!(
                "{}x{} exceeds device limit {max}",
                desc.width, desc.height
            )));
        }
        let name = RawTarget(st.next_name);
        st.next_name += 1;
        st.live.insert(name, LiveTarget { desc, texture });
        Ok(name)
    }
}

impl GpuDevice for HeadlessDevice {
    fn version(&self) -> GpuVersion {
        self.spec.version
    }

    fn flavor(&self) -> GlFlavor {
        self.spec.flavor
    }

    fn has_extension(&self, name: &str) -> bool {
        self.spec.extensions.iter().any(|e| e == name)
    }

    fn get_integer(&self, param: GpuParam) -> i64 {
        match param {
            GpuParam::MaxRenderbufferSize => self.spec.max_renderbuffer_size,
            GpuParam::MaxTextureSize => self.spec.max_texture_size,
        }
    }

    fn flush(&mut self) {
        let mut st = self.state.borrow_mut();
        st.flushes += 1;
        st.calls.push("flush");
    }

    fn finish(&mut self) -> GlintResult<()> {
        let mut st = self.state.borrow_mut();
        st.finishes += 1;
        st.calls.push("finish");
        if self.spec.fail_finish {
            return Err(GlintError::gpu("headless device lost"));
        }
        Ok(())
    }

    fn create_render_target(&mut self, desc: TargetDesc) -> GlintResult<RawTarget> {
        let name = self.allocate(desc, None)?;
        let mut st = self.state.borrow_mut();
        st.created += 1;
        st.calls.push("create_render_target");
        Ok(name)
    }

    fn bind_texture(&mut self, texture: TextureId, desc: TargetDesc) -> GlintResult<RawTarget> {
        let name = self.allocate(desc, Some(texture))?;
        let mut st = self.state.borrow_mut();
        st.bound += 1;
        st.calls.push("bind_texture");
        Ok(name)
    }

    fn destroy_render_target(&mut self, target: RawTarget) {
        let mut st = self.state.borrow_mut();
        if st.live.remove(&target).is_some() {
            st.destroyed += 1;
        }
        st.calls.push("destroy_render_target");
    }
}

impl HeadlessProbe {
    /// Render targets currently alive on the device.
    pub fn live_targets(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Whether `target` is still alive.
    pub fn is_live(&self, target: RawTarget) -> bool {
        self.state.borrow().live.contains_key(&target)
    }

    /// Geometry of a live target.
    pub fn desc_of(&self, target: RawTarget) -> Option<TargetDesc> {
        self.state.borrow().live.get(&target).map(|t| t.desc)
    }

    /// External texture a live target was bound from.
    pub fn texture_of(&self, target: RawTarget) -> Option<TextureId> {
        self.state.borrow().live.get(&target).and_then(|t| t.texture)
    }

    /// Targets allocated with their own storage.
    pub fn created(&self) -> u64 {
        self.state.borrow().created
    }

    /// Targets wrapped around external textures.
    pub fn bound(&self) -> u64 {
        self.state.borrow().bound
    }

    /// Targets destroyed.
    pub fn destroyed(&self) -> u64 {
        self.state.borrow().destroyed
    }

    /// `flush` calls.
    pub fn flushes(&self) -> u64 {
        self.state.borrow().flushes
    }

    /// `finish` calls.
    pub fn finishes(&self) -> u64 {
        self.state.borrow().finishes
    }

    /// Ordered log of mutating device calls.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/headless.rs"]
mod tests;
