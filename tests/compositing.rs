use std::sync::Arc;

use variant_synth::{
    AssetLocation, BlendMode, MemoryHost, Model, ModelLocation, NoProgress, PixelView,
    PropertyTargetFactory, RuleTable, SynthConfig, SynthesisSession, THROUGH_SLOTS,
    TargetFactory, VariantRule, VisualState, composite,
};

fn loc(s: &str) -> AssetLocation {
    AssetLocation::parse(s).unwrap()
}

fn ml(s: &str) -> ModelLocation {
    ModelLocation::parse(s).unwrap()
}

/// Opaque ring around a transparent 8x8 hole.
fn framed_16() -> image::RgbaImage {
    image::RgbaImage::from_fn(16, 16, |x, y| {
        if (4..12).contains(&x) && (4..12).contains(&y) {
            image::Rgba([0, 0, 0, 0])
        } else {
            image::Rgba([180, 180, 180, 255])
        }
    })
}

fn host(through: Option<&image::RgbaImage>) -> MemoryHost {
    let host = MemoryHost::new()
        .with_state(loc("minecraft:wool"), VisualState::new("color=red"), ml("minecraft:wool_red"))
        .with_state(loc("ucw:frame"), VisualState::new("plain"), ml("ucw:frame"))
        .with_model(
            ml("minecraft:wool_red"),
            Model::with_textures([("all", loc("minecraft:blocks/wool_red"))]),
        )
        .with_model(
            ml("ucw:frame"),
            Model::with_textures([("all", loc("ucw:blocks/frame"))]),
        )
        .with_image(
            loc("minecraft:blocks/wool_red"),
            &image::RgbaImage::from_pixel(16, 16, image::Rgba([200, 30, 30, 255])),
        )
        .unwrap();
    match through {
        Some(img) => host.with_image(loc("ucw:blocks/frame"), img).unwrap(),
        None => host.with_image_bytes(loc("ucw:blocks/frame"), b"not a png".to_vec()),
    }
}

fn rule(mode: BlendMode) -> VariantRule {
    let mut through: [Option<VisualState>; THROUGH_SLOTS] = Default::default();
    through[0] = Some(VisualState::new("plain"));
    let factory: Arc<dyn TargetFactory> = Arc::new(PropertyTargetFactory::new(loc("ucw:wool_frame")));
    VariantRule {
        from_family: loc("minecraft:wool"),
        overlay_family: loc("minecraft:wool"),
        through_family: loc("ucw:frame"),
        based_upon_family: loc("minecraft:wool"),
        from: vec![Some(VisualState::new("color=red"))],
        overlay: vec![Some(VisualState::new("color=red"))],
        through,
        based_upon: vec![Some(VisualState::new("color=red"))],
        mode,
        factories: vec![factory],
    }
}

#[test]
fn multiply_mask_keeps_transparent_pixels_transparent() {
    let through = framed_16();
    let host = Arc::new(host(Some(&through)));
    let mut session = SynthesisSession::new(SynthConfig::default(), host.clone());
    let out = session.synthesize(
        &RuleTable::new(vec![rule(BlendMode::MultiplyMask)]),
        &*host,
        &mut NoProgress,
    );
    assert_eq!(out.textures.len(), 1);
    assert_eq!(out.variants[0].target, ml("ucw:wool_frame#normal"));

    let px = out.textures[0].producer.produce();
    assert_eq!((px.width, px.height), (16, 16));
    for y in 0..16 {
        for x in 0..16 {
            let src = through.get_pixel(x, y).0;
            let dst = px.pixel(x, y);
            assert_eq!(dst[3], src[3], "alpha at {x},{y}");
            if src[3] == 0 {
                assert_eq!(dst, [0, 0, 0, 0], "pixel {x},{y}");
            }
        }
    }
}

#[test]
fn undecodable_through_texture_composites_over_placeholder() {
    let host = Arc::new(host(None));
    let mut session = SynthesisSession::new(SynthConfig::default(), host.clone());
    let out = session.synthesize(
        &RuleTable::new(vec![rule(BlendMode::LuminanceTransfer)]),
        &*host,
        &mut NoProgress,
    );
    assert_eq!(out.skipped_count(), 0);

    let px = out.textures[0].producer.produce();
    assert_eq!((px.width, px.height), (16, 16));
    assert!(px.rgba8.chunks_exact(4).all(|p| p[3] == 255));

    // the placeholder is cached, so a second pass in the same generation never re-decodes
    let again = session.synthesize(
        &RuleTable::new(vec![rule(BlendMode::LuminanceTransfer)]),
        &*host,
        &mut NoProgress,
    );
    again.textures[0].producer.produce();
    assert_eq!(
        session.cache().lock().decode_count(&loc("ucw:blocks/frame")),
        1
    );
}

#[test]
fn every_mode_is_deterministic_and_shaped_like_target() {
    let target = framed_16().into_raw();
    let from = vec![10u8, 200, 30, 255, 50, 60, 70, 255];
    let overlay = vec![255u8, 255, 255, 0];
    let base = vec![128u8, 128, 128, 255];

    for mode in [
        BlendMode::LuminanceTransfer,
        BlendMode::MultiplyMask,
        BlendMode::AlphaOver,
    ] {
        let run = || {
            composite(
                PixelView::new(16, 16, &target).unwrap(),
                PixelView::new(2, 1, &from).unwrap(),
                PixelView::new(1, 1, &overlay).unwrap(),
                PixelView::new(1, 1, &base).unwrap(),
                mode,
            )
        };
        let a = run();
        let b = run();
        assert_eq!(a, b, "{mode:?}");
        assert_eq!((a.width, a.height), (16, 16));
        for (t, o) in target.chunks_exact(4).zip(a.rgba8.chunks_exact(4)) {
            assert_eq!(t[3], o[3]);
        }
    }
}
