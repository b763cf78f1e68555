use super::*;
use crate::gpu::caps::SUPPORTED_DEPTHS;

#[test]
fn depth_selects_texture_format() {
    assert_eq!(format_for_depth(8).unwrap(), wgpu::TextureFormat::R8Unorm);
    assert_eq!(format_for_depth(15).unwrap(), wgpu::TextureFormat::Rgba8Unorm);
    assert_eq!(format_for_depth(16).unwrap(), wgpu::TextureFormat::Rgba8Unorm);
    assert_eq!(format_for_depth(24).unwrap(), wgpu::TextureFormat::Bgra8Unorm);
    assert_eq!(format_for_depth(32).unwrap(), wgpu::TextureFormat::Bgra8Unorm);
    assert_eq!(format_for_depth(30).unwrap(), wgpu::TextureFormat::Rgb10a2Unorm);
}

#[test]
fn every_negotiated_depth_has_a_format() {
    for depth in SUPPORTED_DEPTHS {
        assert!(format_for_depth(depth).is_ok(), "depth {depth}");
    }
}

#[test]
fn unknown_depth_is_unsupported() {
    for depth in [0, 1, 4, 12, 64] {
        assert!(matches!(
            format_for_depth(depth),
            Err(GlintError::UnsupportedFormat(_))
        ));
    }
}
