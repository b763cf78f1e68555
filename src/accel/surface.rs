use crate::{
    accel::{
        context::{Context, SharedContext, context},
        hooks::call_prior,
        registry::BackingKind,
    },
    foundation::{
        core::{MAX_SURFACE_DIMENSION, Offset, SurfaceUsage, bits_per_pixel, row_pitch},
        error::{GlintError, GlintResult},
    },
    gpu::TextureId,
    host::{
        Screen,
        dispatch::{Op, OpCall, SurfaceRequest},
        surface::{SurfaceId, SurfaceKind},
    },
};

/// Allocate a surface, backing it with a render target when the device can.
///
/// Requests the device cannot serve (too large, unsupported depth, CPU-only usage) go to the
/// software path untouched and get no binding record. Any failure while binding is absorbed the
/// same way, so the caller always gets a usable surface. `None` only when the host itself
/// refuses the request.
pub fn create_surface(screen: &mut Screen, req: SurfaceRequest) -> GlintResult<Option<SurfaceId>> {
    let ctx = context(screen)?;
    if req.width > MAX_SURFACE_DIMENSION || req.height > MAX_SURFACE_DIMENSION {
        return Ok(None);
    }

    let feasible = {
        let c = ctx.borrow();
        req.usage != SurfaceUsage::Cpu
            && c.caps.fits(req.width, req.height)
            && c.caps.supports_depth(req.depth)
    };
    if !feasible {
        return software_create(screen, &ctx, req);
    }

    let id = match screen.surfaces.create(0, 0, req.depth, req.usage) {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(error = %e, "placeholder allocation failed");
            return software_create(screen, &ctx, req);
        }
    };

    let kind = if req.usage == SurfaceUsage::Scratch {
        BackingKind::PooledTarget
    } else {
        BackingKind::Texture
    };
    let tagged = ctx.borrow_mut().registry.set_kind(id, kind);
    if let Err(e) = tagged {
        screen.surfaces.destroy(id);
        note_fallback(&ctx.borrow(), &req, &e);
        return software_create(screen, &ctx, req);
    }

    if req.width == 0 || req.height == 0 {
        return Ok(Some(id));
    }

    let bound = {
        let mut guard = ctx.borrow_mut();
        let c: &mut Context = &mut guard;
        let now = c.tick;
        match c
            .pool
            .acquire(c.device.as_mut(), req.width, req.height, req.depth, req.usage)
        {
            Ok(target) => c
                .registry
                .attach(id, target, &mut c.pool, c.device.as_mut(), now),
            Err(e) => Err(e),
        }
    };
    if let Err(e) = bound {
        {
            let mut guard = ctx.borrow_mut();
            let c: &mut Context = &mut guard;
            let now = c.tick;
            c.registry.destroy(id, &mut c.pool, c.device.as_mut(), now);
            note_fallback(c, &req, &e);
        }
        screen.surfaces.destroy(id);
        return software_create(screen, &ctx, req);
    }

    let pitch = row_pitch(req.width, bits_per_pixel(req.depth));
    screen
        .surfaces
        .modify_header(id, req.width, req.height, pitch, None)?;
    ctx.borrow_mut().stats.gpu_surfaces += 1;
    Ok(Some(id))
}

fn note_fallback(c: &Context, req: &SurfaceRequest, e: &GlintError) {
    if c.debug_level >= 1 {
        tracing::debug!(
            width = req.width,
            height = req.height,
            depth = req.depth,
            error = %e,
            "surface falls back to software"
        );
    }
}

fn software_create(
    screen: &mut Screen,
    ctx: &SharedContext,
    req: SurfaceRequest,
) -> GlintResult<Option<SurfaceId>> {
    ctx.borrow_mut().stats.software_surfaces += 1;
    if ctx.borrow().saved.is_installed(Op::CreateSurface) {
        return Ok(call_prior(screen, ctx, &OpCall::CreateSurface(req))?.surface());
    }
    Ok(screen
        .surfaces
        .create(req.width, req.height, req.depth, req.usage)
        .ok())
}

/// Drop one reference to `surface`. The binding goes away with the last reference.
pub fn destroy_surface(screen: &mut Screen, surface: SurfaceId) -> GlintResult<bool> {
    let ctx = context(screen)?;
    destroy_textured_surface(screen, &ctx, surface);
    if ctx.borrow().saved.is_installed(Op::DestroySurface) {
        return Ok(call_prior(screen, &ctx, &OpCall::DestroySurface(surface))?.flag());
    }
    Ok(screen.surfaces.destroy(surface))
}

/// Release the binding of `surface` if the caller holds its last reference.
fn destroy_textured_surface(screen: &Screen, ctx: &SharedContext, surface: SurfaceId) -> bool {
    if screen.surface(surface).map(|s| s.refcnt()) != Some(1) {
        return false;
    }
    let mut guard = ctx.borrow_mut();
    let c: &mut Context = &mut guard;
    if c.root_surface == Some(surface) {
        c.root_surface = None;
        c.root_target = None;
    }
    let now = c.tick;
    c.registry.destroy(surface, &mut c.pool, c.device.as_mut(), now)
}

/// Tag how `surface` is stored.
///
/// Tagging as [`BackingKind::Software`] converts the surface to a plain CPU one: its render
/// target goes back to the pool, the record is erased, and the surface gets CPU pixels.
pub fn set_surface_type(screen: &mut Screen, surface: SurfaceId, kind: BackingKind) -> GlintResult<()> {
    let ctx = context(screen)?;
    let (width, height, needs_pixels) = {
        let s = screen
            .surface(surface)
            .ok_or_else(|| GlintError::host("unknown surface"))?;
        (s.width, s.height, s.data.is_none() && s.kind == SurfaceKind::Pixmap)
    };

    if kind != BackingKind::Software {
        return ctx.borrow_mut().registry.set_kind(surface, kind);
    }

    {
        let mut guard = ctx.borrow_mut();
        let c: &mut Context = &mut guard;
        let now = c.tick;
        c.registry.destroy(surface, &mut c.pool, c.device.as_mut(), now);
        if c.root_surface == Some(surface) {
            c.root_surface = None;
            c.root_target = None;
        }
    }
    if needs_pixels {
        let bpp = screen.surface(surface).map_or(32, |s| s.bits_per_pixel);
        let pitch = row_pitch(width, bpp);
        let data = vec![0u8; pitch as usize * height as usize];
        screen
            .surfaces
            .modify_header(surface, width, height, pitch, (!data.is_empty()).then_some(data))?;
    }
    Ok(())
}

/// Back `surface` with an externally created texture. The texture becomes a surface-owned
/// render target: destroyed, not pooled, when the surface lets go of it.
pub fn set_surface_texture(
    screen: &mut Screen,
    surface: SurfaceId,
    texture: TextureId,
) -> GlintResult<()> {
    let ctx = context(screen)?;
    let (width, height, depth) = screen
        .surface(surface)
        .map(|s| (s.width, s.height, s.depth))
        .ok_or_else(|| GlintError::host("unknown surface"))?;

    let mut guard = ctx.borrow_mut();
    let c: &mut Context = &mut guard;
    let now = c.tick;
    let target = c
        .pool
        .wrap_texture(c.device.as_mut(), texture, width, height, depth)?;
    let raw = target.raw();
    c.registry
        .attach(surface, target, &mut c.pool, c.device.as_mut(), now)?;
    c.registry.set_kind(surface, BackingKind::Texture)?;
    if c.root_surface == Some(surface) {
        c.root_target = Some(raw);
    }
    tracing::debug!(texture = texture.0, raw = raw.0, width, height, "surface wrapped texture");
    Ok(())
}

/// Make `surface` the screen's front buffer. Its render target becomes the root target and is
/// resized to the surface's current dimensions.
pub fn set_screen_surface(screen: &mut Screen, surface: SurfaceId) -> GlintResult<()> {
    let ctx = context(screen)?;
    let (width, height) = screen
        .surface(surface)
        .map(|s| (s.width, s.height))
        .ok_or_else(|| GlintError::host("unknown surface"))?;

    let mut c = ctx.borrow_mut();
    let target = c
        .registry
        .get_mut(surface)
        .and_then(|b| b.target_mut())
        .ok_or_else(|| GlintError::invalid_state("front-buffer surface has no render target"))?;
    target.resize(width, height);
    let raw = target.raw();
    c.root_surface = Some(surface);
    c.root_target = Some(raw);
    tracing::info!(raw = raw.0, width, height, "front buffer set");
    Ok(())
}

/// Pixmap holding `drawable`'s pixels and the offset of `drawable` inside it.
pub fn drawable_pixmap(screen: &Screen, drawable: SurfaceId) -> Option<(SurfaceId, Offset)> {
    let mut id = drawable;
    let mut offset = Offset::ZERO;
    for _ in 0..16 {
        match screen.surface(id)?.kind {
            SurfaceKind::Pixmap => return Some((id, offset)),
            SurfaceKind::Window { pixmap, origin } => {
                offset.dx += origin.dx;
                offset.dy += origin.dy;
                id = pixmap;
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/accel/surface.rs"]
mod tests;
