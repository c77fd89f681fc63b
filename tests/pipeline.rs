// tests/pipeline.rs
// Frame lifecycle of the parallel-split pipeline against a recording backend
// RELEVANT FILES: src/pipeline.rs, tests/common/mod.rs

mod common;

use common::{caster, plain_receiver, receiver, test_camera, RecordingBackend};
use pssm::{
    CompareMode, FilterMode, MatParam, PssmConfig, PssmShadowRenderer, RenderQueue,
    SamplingState, POST_SHADOW_TECHNIQUE,
};

fn pipeline(config: PssmConfig) -> (PssmShadowRenderer, RecordingBackend) {
    let mut backend = RecordingBackend::default();
    let mut renderer = PssmShadowRenderer::new(config).unwrap();
    renderer.initialize(&mut backend).unwrap();
    (renderer, backend)
}

fn shadowed_queue() -> RenderQueue {
    let mut queue = RenderQueue::new();
    queue.add(caster("box"));
    queue.add(receiver("ground"));
    queue
}

#[test]
fn initialize_allocates_one_target_per_split() {
    let (renderer, backend) = pipeline(PssmConfig::default());

    assert_eq!(backend.created.len(), 3);
    for (i, target) in backend.created.iter().enumerate() {
        assert_eq!(target.size, 1024);
        assert_eq!(target.label, format!("pssm.shadow-map.{i}"));
    }
    // Default hardware compare with bilinear filtering.
    assert_eq!(backend.sampling_calls.len(), 3);
    for (_, state) in &backend.sampling_calls {
        assert_eq!(
            *state,
            SamplingState {
                bilinear: true,
                compare: true
            }
        );
    }
    assert!(renderer.is_initialized());
}

#[test]
fn split_count_is_clamped_into_range() {
    let config = PssmConfig {
        split_count: 9,
        ..PssmConfig::default()
    };
    let (renderer, backend) = pipeline(config);
    assert_eq!(renderer.split_count(), 4);
    assert_eq!(backend.created.len(), 4);
}

#[test]
fn double_initialize_is_rejected() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());
    assert!(renderer.initialize(&mut backend).is_err());
}

#[test]
fn post_queue_requires_initialization() {
    let mut renderer = PssmShadowRenderer::new(PssmConfig::default()).unwrap();
    let mut backend = RecordingBackend::default();
    let mut queue = shadowed_queue();
    assert!(renderer
        .post_queue(&mut backend, &mut queue, &test_camera())
        .is_err());
}

#[test]
fn empty_queues_skip_the_frame() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());

    // Casters but no receivers, then receivers but no casters.
    let mut queue = RenderQueue::new();
    queue.add(caster("box"));
    renderer
        .post_queue(&mut backend, &mut queue, &test_camera())
        .unwrap();

    let mut queue = RenderQueue::new();
    queue.add(receiver("ground"));
    renderer
        .post_queue(&mut backend, &mut queue, &test_camera())
        .unwrap();
    renderer.post_frame(&mut backend, &mut queue).unwrap();

    assert!(backend.depth_passes.is_empty());
    assert!(backend.receiver_passes.is_empty());
    // Receiver materials were left untouched.
    let material = &queue.receivers.get(0).unwrap().material;
    assert!(material.param("Splits").is_none());
}

#[test]
fn full_frame_renders_one_depth_pass_per_split() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());
    let mut queue = shadowed_queue();
    let camera = test_camera();

    renderer.post_queue(&mut backend, &mut queue, &camera).unwrap();
    assert_eq!(backend.depth_passes.len(), 3);
    for (i, pass) in backend.depth_passes.iter().enumerate() {
        assert_eq!(pass.target.0, i);
    }
    // The box sits a few units in front of the camera, inside the first
    // slice only; the far slices have no occluders to draw.
    assert_eq!(backend.depth_passes[0].selection, vec![0]);
    assert!(backend.depth_passes[1].selection.is_empty());
    assert!(backend.depth_passes[2].selection.is_empty());
    // Depth passes flushed the caster queue, receivers remain.
    assert!(queue.casters.is_empty());
    assert_eq!(queue.receivers.len(), 1);

    renderer.post_frame(&mut backend, &mut queue).unwrap();
    assert_eq!(backend.receiver_passes.len(), 1);
    let pass = &backend.receiver_passes[0];
    assert_eq!(pass.technique, POST_SHADOW_TECHNIQUE);
    assert_eq!(pass.forced, None);
    assert_eq!(pass.receiver_count, 1);
    assert!(queue.receivers.is_empty());

    // Boundaries cover [near, far] and are monotonic.
    let boundaries = renderer.boundaries();
    assert_eq!(boundaries.len(), 4);
    assert_eq!(boundaries[0], camera.near);
    assert_eq!(boundaries[3], camera.far);
    for i in 1..boundaries.len() {
        assert!(boundaries[i] > boundaries[i - 1]);
    }
}

#[test]
fn receiver_materials_get_shadow_parameters() {
    let config = PssmConfig {
        flush_queues: false,
        ..PssmConfig::default()
    };
    let (mut renderer, mut backend) = pipeline(config);
    let mut queue = shadowed_queue();

    renderer
        .post_queue(&mut backend, &mut queue, &test_camera())
        .unwrap();
    renderer.post_frame(&mut backend, &mut queue).unwrap();

    let material = &queue.receivers.get(0).unwrap().material;
    assert!(matches!(material.param("Splits"), Some(MatParam::Vec4(_))));
    for j in 0..3 {
        assert!(matches!(
            material.param(&format!("LightViewProjectionMatrix{j}")),
            Some(MatParam::Mat4(_))
        ));
        assert!(matches!(
            material.param(&format!("ShadowMap{j}")),
            Some(MatParam::Texture(_))
        ));
    }
    assert!(matches!(
        material.param("HardwareShadows"),
        Some(MatParam::Bool(true))
    ));
    assert!(matches!(material.param("FilterMode"), Some(MatParam::Int(1))));
    assert!(matches!(
        material.param("ShadowIntensity"),
        Some(MatParam::Float(v)) if (*v - 0.7).abs() < 1e-6
    ));
    assert!(matches!(
        material.param("ShadowMapSize"),
        Some(MatParam::Float(v)) if *v == 1024.0
    ));
}

#[test]
fn receivers_without_the_technique_force_the_fallback_material() {
    let config = PssmConfig {
        flush_queues: false,
        ..PssmConfig::default()
    };
    let (mut renderer, mut backend) = pipeline(config);
    let mut queue = RenderQueue::new();
    queue.add(caster("box"));
    queue.add(plain_receiver("legacy"));

    renderer
        .post_queue(&mut backend, &mut queue, &test_camera())
        .unwrap();
    renderer.post_frame(&mut backend, &mut queue).unwrap();

    let pass = &backend.receiver_passes[0];
    assert_eq!(pass.forced.as_deref(), Some("PostShadowPSSM"));
    // The unsupporting material was not written to.
    let material = &queue.receivers.get(0).unwrap().material;
    assert!(material.param("Splits").is_none());
}

#[test]
fn filter_mode_changes_are_idempotent() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());
    let after_init = backend.sampling_calls.len();

    // Bilinear is the default; repeating it must not touch the samplers.
    renderer
        .set_filter_mode(&mut backend, FilterMode::Bilinear)
        .unwrap();
    assert_eq!(backend.sampling_calls.len(), after_init);

    // Leaving bilinear under hardware compare reconfigures every target.
    renderer.set_filter_mode(&mut backend, FilterMode::Pcf4).unwrap();
    assert_eq!(backend.sampling_calls.len(), after_init + 3);
    let (_, state) = backend.sampling_calls.last().unwrap();
    assert_eq!(
        *state,
        SamplingState {
            bilinear: false,
            compare: true
        }
    );

    renderer.set_filter_mode(&mut backend, FilterMode::Pcf4).unwrap();
    assert_eq!(backend.sampling_calls.len(), after_init + 3);
}

#[test]
fn software_compare_disables_hardware_sampling() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());

    renderer
        .set_compare_mode(&mut backend, CompareMode::Software)
        .unwrap();
    assert_eq!(
        renderer.sampling_state(),
        SamplingState {
            bilinear: false,
            compare: false
        }
    );
    let (_, state) = backend.sampling_calls.last().unwrap();
    assert_eq!(
        *state,
        SamplingState {
            bilinear: false,
            compare: false
        }
    );

    // Filter changes under software compare leave the samplers alone.
    let calls = backend.sampling_calls.len();
    renderer.set_filter_mode(&mut backend, FilterMode::Pcf8).unwrap();
    assert_eq!(backend.sampling_calls.len(), calls);
}

#[test]
fn map_size_cannot_change_after_construction() {
    let (mut renderer, _backend) = pipeline(PssmConfig::default());
    assert!(renderer.set_map_size(2048).is_err());
    assert_eq!(renderer.map_size(), 1024);
}

#[test]
fn zfar_override_caps_the_shadow_extent() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());
    renderer.set_shadow_z_extend(Some(250.0));
    let mut queue = shadowed_queue();

    renderer
        .post_queue(&mut backend, &mut queue, &test_camera())
        .unwrap();
    let boundaries = renderer.boundaries();
    assert_eq!(boundaries[boundaries.len() - 1], 250.0);
}

#[test]
fn chained_pipelines_share_the_frame_queues() {
    let config = PssmConfig {
        flush_queues: false,
        ..PssmConfig::default()
    };
    let (mut first, mut backend) = pipeline(config);
    let mut second = PssmShadowRenderer::new(PssmConfig::default()).unwrap();
    second.initialize(&mut backend).unwrap();

    let mut queue = shadowed_queue();
    let camera = test_camera();

    first.post_queue(&mut backend, &mut queue, &camera).unwrap();
    // The non-flushing pipeline left the queues intact for the next one.
    assert_eq!(queue.casters.len(), 1);
    second.post_queue(&mut backend, &mut queue, &camera).unwrap();
    assert!(queue.casters.is_empty());

    first.post_frame(&mut backend, &mut queue).unwrap();
    assert_eq!(queue.receivers.len(), 1);
    second.post_frame(&mut backend, &mut queue).unwrap();
    assert!(queue.receivers.is_empty());
    assert_eq!(backend.depth_passes.len(), 6);
    assert_eq!(backend.receiver_passes.len(), 2);
}

#[test]
fn debug_overlay_renders_even_on_skipped_frames() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());
    renderer.display_debug(true);

    let mut queue = RenderQueue::new();
    renderer
        .post_queue(&mut backend, &mut queue, &test_camera())
        .unwrap();
    renderer.post_frame(&mut backend, &mut queue).unwrap();

    assert!(backend.receiver_passes.is_empty());
    assert_eq!(backend.overlay_calls.len(), 1);
    assert_eq!(backend.overlay_calls[0].len(), 3);
}

#[test]
fn post_frame_without_a_prepared_frame_is_inert() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());
    let mut queue = shadowed_queue();

    // A complete frame, then a frame whose post_queue was skipped.
    let camera = test_camera();
    renderer.post_queue(&mut backend, &mut queue, &camera).unwrap();
    renderer.post_frame(&mut backend, &mut queue).unwrap();
    assert_eq!(backend.receiver_passes.len(), 1);

    let mut empty = RenderQueue::new();
    renderer.post_queue(&mut backend, &mut empty, &camera).unwrap();
    renderer.post_frame(&mut backend, &mut empty).unwrap();
    renderer.post_frame(&mut backend, &mut empty).unwrap();
    assert_eq!(backend.receiver_passes.len(), 1);
}

#[test]
fn cleanup_releases_targets_and_allows_reinitialization() {
    let (mut renderer, mut backend) = pipeline(PssmConfig::default());

    renderer.cleanup(&mut backend).unwrap();
    assert_eq!(backend.destroyed.len(), 3);
    assert!(!renderer.is_initialized());

    renderer.initialize(&mut backend).unwrap();
    assert_eq!(backend.created.len(), 6);
    assert!(renderer.is_initialized());
}

#[test]
fn edges_thickness_round_trips_on_the_integer_scale() {
    let (mut renderer, _backend) = pipeline(PssmConfig::default());
    assert_eq!(renderer.edges_thickness(), 10);

    renderer.set_edges_thickness(3);
    assert_eq!(renderer.edges_thickness(), 3);

    renderer.set_edges_thickness(25);
    assert_eq!(renderer.edges_thickness(), 10);
}
