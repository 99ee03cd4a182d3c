//! Device integration tests for the graphics crate.
//!
//! Every test runs against each compiled-in backend through `rstest` cases.
//!
//! # Test Categories
//!
//! - **Registry Tests**: handle lifetime and release reporting
//! - **Capability Tests**: gated operations on a reduced feature set
//! - **Program Tests**: stage composition, declaration merge, input layouts
//! - **Texture Tests**: default fill, payload upload, partial updates
//! - **Frame Tests**: presentation ring pipelining and video mode changes
//!
//! ```bash
//! cargo test --test device_tests
//! ```

mod common;

use rstest::rstest;

use common::{generate_test_pattern, shader_descriptor, TestContext};
use tessera_graphics::{
    BackendKind, BufferUsage, ClearColor, CubeFace, DataType, ErrorKind, Extent3d, Feature,
    GraphicsConfig, GraphicsInstance, ImageData, LinkError, LinkStatus, Offset3d, PipelineKind,
    RenderContextDescriptor, Sampler, SamplerDescriptor, ShaderSource, ShaderStage, ShaderStages,
    Texture, TextureDescriptor, TextureFormat, TextureKind, TextureRegion, TextureUsage,
    VertexAttribute, VertexFormat, VideoMode, Vsync, BUILD_ID,
};

fn stages_of(set: ShaderStages) -> Vec<ShaderStage> {
    ShaderStage::ALL
        .into_iter()
        .filter(|stage| set.contains(stage.flag()))
        .collect()
}

// ============================================================================
// Registry Tests
// ============================================================================

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_release_twice_reports_use_after_release(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let first = ctx.create_buffer(16, BufferUsage::VERTEX);
    let second = ctx.create_buffer(16, BufferUsage::VERTEX);
    ctx.device.write_buffer(second, 0, &[7; 16]).unwrap();

    ctx.device.release_buffer(first).unwrap();
    let err = ctx.device.release_buffer(first).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UseAfterRelease);

    assert!(ctx.device.is_alive(second));
    assert_eq!(ctx.device.read_buffer(second).unwrap(), vec![7; 16]);
    assert_eq!(ctx.device.memory_used(), 16);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_foreign_handle_is_rejected(#[case] backend: BackendKind) {
    let (Some(mut ctx), Some(mut other)) = (TestContext::new(backend), TestContext::new(backend)) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let sampler = other.device.create_sampler(&SamplerDescriptor::linear()).unwrap();
    let err = ctx.device.release_sampler(sampler).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(ctx.device.registry().count::<Sampler>(), 0);
    assert!(other.device.is_alive(sampler));
}

// ============================================================================
// Capability Tests
// ============================================================================

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_disabled_features_reject_before_allocation(#[case] backend: BackendKind) {
    let config = GraphicsConfig::default()
        .with_disabled_feature(Feature::Textures3D)
        .with_disabled_feature(Feature::GeometryShaders);
    let Some(mut ctx) = TestContext::with_config(backend, config) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let desc = TextureDescriptor::new_3d(4, 4, 4, TextureFormat::Rgba8Unorm, TextureUsage::empty());
    let err = ctx.device.create_texture(&desc, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    assert_eq!(ctx.device.memory_used(), 0);
    assert_eq!(ctx.device.registry().count::<Texture>(), 0);

    let program = ctx.device.create_program(None);
    let geometry = ctx.create_shader(ShaderStage::Geometry);
    let err = ctx.device.attach_shader(program, geometry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    assert_eq!(ctx.device.program(program).unwrap().status(), LinkStatus::Empty);
}

// ============================================================================
// Program Tests
// ============================================================================

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_link_accepts_exactly_the_legal_stage_sets(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    for bits in 0..(1u32 << ShaderStage::ALL.len()) {
        let set = ShaderStages::from_bits_truncate(bits);
        let program = ctx.create_program(&stages_of(set));
        let result = ctx.device.link_program(program);
        let legal = tessera_graphics::shader::is_legal_composition(set);

        match result {
            Ok(()) => assert!(legal, "{set:?} linked on {backend:?}"),
            Err(err) => {
                assert!(!legal, "{set:?} failed to link on {backend:?}: {err}");
                assert_eq!(err.kind(), ErrorKind::Composition);
                let program = ctx.device.program(program).unwrap();
                assert_eq!(program.status(), LinkStatus::Error(LinkError::Composition));
                assert_eq!(program.info_log(), "invalid composition of attached shaders");
            }
        }
        ctx.device.release_program(program).unwrap();
    }
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_missing_bytecode_reported_before_composition(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let program = ctx.device.create_program(Some("broken"));
    let broken = ctx
        .device
        .create_shader(&tessera_graphics::ShaderDescriptor::new(
            ShaderStage::Fragment,
            ShaderSource::code("", "main"),
        ))
        .unwrap();
    assert!(!ctx.device.shader(broken).unwrap().has_bytecode());
    let compute = ctx.create_shader(ShaderStage::Compute);
    ctx.device.attach_shader(program, broken).unwrap();
    ctx.device.attach_shader(program, compute).unwrap();

    let err = ctx.device.link_program(program).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ByteCode);
    assert_eq!(ctx.device.program(program).unwrap().info_log(), "invalid shader byte code");

    // Fixing the source keeps the slot and makes the composition the only problem.
    let fixed = ctx
        .device
        .compile_shader(broken, ShaderSource::code("void main() {}", "main"))
        .unwrap();
    assert!(fixed);
    let err = ctx.device.link_program(program).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Composition);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_merged_constant_buffers_dedup_by_name(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let vertex = ctx.create_shader_with(
        shader_descriptor(ShaderStage::Vertex)
            .with_constant_buffer("Matrices", 128)
            .with_constant_buffer("Skinning", 1024),
    );
    let fragment = ctx.create_shader_with(
        shader_descriptor(ShaderStage::Fragment)
            .with_constant_buffer("Matrices", 128)
            .with_constant_buffer("Material", 64),
    );
    let program = ctx.device.create_program(None);
    ctx.device.attach_shader(program, fragment).unwrap();
    ctx.device.attach_shader(program, vertex).unwrap();
    ctx.device.link_program(program).unwrap();

    let merged = ctx.device.program(program).unwrap().constant_buffers();
    let names: Vec<(&str, u32)> = merged.iter().map(|cbv| (cbv.name.as_str(), cbv.index)).collect();
    assert_eq!(names, vec![("Matrices", 0), ("Material", 1), ("Skinning", 2)]);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_reattach_replaces_slot_declarations(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let first = ctx.create_shader_with(shader_descriptor(ShaderStage::Vertex).with_constant_buffer("Old", 16));
    let second = ctx.create_shader_with(shader_descriptor(ShaderStage::Vertex).with_constant_buffer("New", 16));
    let program = ctx.device.create_program(None);
    ctx.device.attach_shader(program, first).unwrap();
    ctx.device.attach_shader(program, second).unwrap();

    let program = ctx.device.program(program).unwrap();
    assert_eq!(program.attached(ShaderStage::Vertex), Some(second));
    assert_eq!(program.attached_stages(), ShaderStages::VERTEX);
    let names: Vec<&str> = program.constant_buffers().iter().map(|cbv| cbv.name.as_str()).collect();
    assert_eq!(names, vec!["New"]);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_detach_all_resets_program(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let program = ctx.create_program(&[ShaderStage::Vertex, ShaderStage::Fragment]);
    ctx.device.link_program(program).unwrap();
    assert!(ctx.device.program(program).unwrap().is_linked());

    ctx.device.detach_all(program).unwrap();
    assert_eq!(ctx.device.program(program).unwrap().info_log(), "");
    let err = ctx.device.link_program(program).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Composition);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_input_layout(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let program = ctx.create_program(&[ShaderStage::Vertex, ShaderStage::Fragment]);
    let format = VertexFormat::new()
        .append(VertexAttribute::new("position", DataType::Float32, 3))
        .append(VertexAttribute::new("uv", DataType::Float32, 2));

    let err = ctx.device.build_input_layout(program, &format).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    ctx.device.link_program(program).unwrap();
    ctx.device.build_input_layout(program, &format).unwrap();
    let layout = ctx.device.program(program).unwrap().input_layout().unwrap();
    assert_eq!(layout.elements.len(), 2);
    assert_eq!(layout.elements[1].byte_offset, 12);
    assert_eq!(layout.stride, 20);

    let unmappable = format.append(VertexAttribute::new("weights", DataType::Float32, 5));
    let err = ctx.device.build_input_layout(program, &unmappable).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(
        ctx.device.program(program).unwrap().input_layout().unwrap().elements.len(),
        2
    );
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_pipeline_kind_matches_program(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let compute = ctx.create_program(&[ShaderStage::Compute]);
    let graphics = ctx.create_program(&[ShaderStage::Vertex, ShaderStage::Fragment]);

    let err = ctx.device.create_pipeline(None, PipelineKind::Compute, compute).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    ctx.device.link_program(compute).unwrap();
    ctx.device.link_program(graphics).unwrap();
    assert!(ctx.device.create_pipeline(None, PipelineKind::Compute, compute).is_ok());
    assert!(ctx.device.create_pipeline(Some("opaque"), PipelineKind::Graphics, graphics).is_ok());
    assert!(ctx.device.create_pipeline(None, PipelineKind::Graphics, compute).is_err());
}

// ============================================================================
// Texture Tests
// ============================================================================

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_texture_without_payload_reads_default_texel(#[case] backend: BackendKind) {
    let config = GraphicsConfig::default().with_default_texel([10, 20, 30, 40]);
    let Some(mut ctx) = TestContext::with_config(backend, config) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let texture = ctx.create_texture_2d(4, 3, None);
    let content = ctx.device.read_texture(texture, 0).unwrap();
    assert_eq!(content.len(), 4 * 3 * 4);
    assert!(content.chunks(4).all(|texel| texel == [10, 20, 30, 40]));
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_texture_payload_readback(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let pattern = generate_test_pattern(8 * 8 * 4);
    let texture = ctx.create_texture_2d(8, 8, Some(&pattern));
    assert_eq!(ctx.device.read_texture(texture, 0).unwrap(), pattern);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_cube_faces_upload_in_order(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let desc = TextureDescriptor::new_cube(2, TextureFormat::Rgba8Unorm, TextureUsage::empty());
    let data: Vec<u8> = (0..6u8).flat_map(|face| [face; 16]).collect();
    let texture = ctx.device.create_texture(&desc, Some(&ImageData::rgba8(&data))).unwrap();

    let content = ctx.device.read_texture(texture, 0).unwrap();
    for face in CubeFace::ALL {
        let start = face.index() as usize * 16;
        assert!(content[start..start + 16].iter().all(|b| *b == face.index() as u8));
    }
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_compressed_cube_without_payload(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let uploads = ctx.device.stats().uploads;
    let desc = TextureDescriptor::new_cube(16, TextureFormat::Bc1RgbaUnorm, TextureUsage::COPY_DST);
    let texture = ctx.device.create_texture(&desc, None).unwrap();
    assert_eq!(ctx.device.stats().uploads, uploads);

    let description = ctx.device.describe_texture(texture).unwrap();
    assert_eq!(description.kind, TextureKind::TextureCube);
    assert_eq!(description.format, TextureFormat::Bc1RgbaUnorm);
    assert_eq!(description.size, Extent3d::new_3d(16, 16, 1));

    // A later partial update fills one block of one face.
    let block = [0xAB; 8];
    let region = TextureRegion::new(Offset3d::new(0, 0, 2), Extent3d::new_2d(4, 4));
    ctx.device
        .write_texture(texture, &region, &ImageData::compressed(&block, 8))
        .unwrap();
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_out_of_bounds_write_leaves_content(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let pattern = generate_test_pattern(4 * 4 * 4);
    let texture = ctx.create_texture_2d(4, 4, Some(&pattern));

    let region = TextureRegion::new(Offset3d::new(3, 3, 0), Extent3d::new_2d(2, 2));
    let err = ctx
        .device
        .write_texture(texture, &region, &ImageData::rgba8(&[0; 16]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(ctx.device.read_texture(texture, 0).unwrap(), pattern);

    let region = TextureRegion::new(Offset3d::new(3, 3, 0), Extent3d::new_2d(1, 1));
    ctx.device
        .write_texture(texture, &region, &ImageData::rgba8(&[9, 9, 9, 9]))
        .unwrap();
    let content = ctx.device.read_texture(texture, 0).unwrap();
    assert_eq!(content[60..64], [9, 9, 9, 9]);
    assert_eq!(content[..60], pattern[..60]);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_writes_visible_to_next_read(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let buffer = ctx.create_buffer(8, BufferUsage::VERTEX | BufferUsage::COPY_DST);
    ctx.device.write_buffer(buffer, 0, &[1, 2, 3, 4]).unwrap();
    ctx.device.write_buffer(buffer, 4, &[5, 6, 7, 8]).unwrap();
    assert_eq!(ctx.device.read_buffer(buffer).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_out_of_memory_leaves_registry_unchanged(#[case] backend: BackendKind) {
    let config = GraphicsConfig::default().with_memory_budget(100);
    let Some(mut ctx) = TestContext::with_config(backend, config) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let desc = TextureDescriptor::new_2d(16, 16, TextureFormat::Rgba8Unorm, TextureUsage::empty());
    let err = ctx.device.create_texture(&desc, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceFailure);
    assert_eq!(ctx.device.registry().live_objects(), 0);
    assert_eq!(ctx.device.memory_used(), 0);

    let small = ctx.create_texture_2d(2, 2, None);
    assert!(ctx.device.is_alive(small));
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_over_budget_texture_rejected_before_staging(#[case] backend: BackendKind) {
    let config = GraphicsConfig::default().with_memory_budget(1024);
    let Some(mut ctx) = TestContext::with_config(backend, config) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let desc = TextureDescriptor::new_2d_array(16384, 16384, 2048, TextureFormat::Rgba8Unorm, TextureUsage::empty());
    let err = ctx.device.create_texture(&desc, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceFailure);
    assert_eq!(ctx.device.memory_used(), 0);
    assert_eq!(ctx.device.registry().live_objects(), 0);
}

// ============================================================================
// Frame Tests
// ============================================================================

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_fourth_present_waits_on_first_fence(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let mode = VideoMode::new(8, 8).with_swap_chain_size(3);
    let context = ctx.device.create_context(&RenderContextDescriptor::new(mode)).unwrap();

    let reports: Vec<_> = (0..4).map(|_| ctx.device.present(context).unwrap()).collect();
    let slots: Vec<usize> = reports.iter().map(|report| report.slot).collect();
    assert_eq!(slots, vec![0, 1, 2, 0]);
    assert!(reports[..3].iter().all(|report| report.waited_on.is_none()));
    assert_eq!(reports[3].waited_on, Some(reports[0].fence_value));
    assert!(reports.windows(2).all(|pair| pair[0].fence_value < pair[1].fence_value));
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_clear_reaches_back_buffer(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let descriptor =
        RenderContextDescriptor::new(VideoMode::new(2, 2)).with_color_format(TextureFormat::Rgba8Unorm);
    let context = ctx.device.create_context(&descriptor).unwrap();
    let target = ctx.device.context(context).unwrap().back_buffer();

    ctx.device.clear(context, ClearColor::new(1.0, 0.0, 0.0, 1.0)).unwrap();
    assert_eq!(ctx.device.context(context).unwrap().pending_commands(), 1);
    ctx.device.present(context).unwrap();
    ctx.device.wait_idle().unwrap();

    let content = ctx.device.read_texture(target, 0).unwrap();
    assert!(content.chunks(4).all(|texel| texel == [255, 0, 0, 255]));
    assert_ne!(ctx.device.context(context).unwrap().back_buffer(), target);
}

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_set_video_mode_rebuilds_ring(#[case] backend: BackendKind) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let mode = VideoMode::new(4, 4).with_swap_chain_size(2);
    let context = ctx.device.create_context(&RenderContextDescriptor::new(mode)).unwrap();
    let old_buffers = ctx.device.context(context).unwrap().buffers().to_vec();
    ctx.device.present(context).unwrap();

    // Unchanged mode keeps the ring and its position.
    ctx.device.set_video_mode(context, mode).unwrap();
    assert_eq!(ctx.device.context(context).unwrap().buffers(), &old_buffers[..]);
    assert_eq!(ctx.device.context(context).unwrap().current_index(), 1);

    let larger = VideoMode::new(8, 6).with_swap_chain_size(3);
    ctx.device.set_video_mode(context, larger).unwrap();
    let rc = ctx.device.context(context).unwrap();
    assert_eq!(rc.video_mode(), larger);
    assert_eq!(rc.buffer_count(), 3);
    assert_eq!(rc.current_index(), 0);
    let new_buffers = rc.buffers().to_vec();
    assert!(old_buffers.iter().all(|handle| !ctx.device.is_alive(*handle)));
    assert_eq!(ctx.device.registry().count::<Texture>(), 3);
    assert_eq!(ctx.device.texture(new_buffers[0]).unwrap().width(), 8);

    let err = ctx
        .device
        .set_video_mode(context, larger.with_swap_chain_size(5))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(ctx.device.context(context).unwrap().buffers(), &new_buffers[..]);

    ctx.device.set_vsync(context, Vsync::enabled(2)).unwrap();
    assert_eq!(ctx.device.context(context).unwrap().buffers(), &new_buffers[..]);
    assert_eq!(ctx.device.present(context).unwrap().frame, 1);
}

// ============================================================================
// Instance Tests
// ============================================================================

#[rstest]
#[case::immediate(BackendKind::Immediate)]
#[case::deferred(BackendKind::Deferred)]
#[case::explicit(BackendKind::Explicit)]
fn test_build_mismatch_is_rejected(#[case] backend: BackendKind) {
    if !backend.is_available() {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    }
    let instance = GraphicsInstance::default();

    let err = instance
        .create_device_with_build_id(backend.name(), BUILD_ID.wrapping_add(2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BuildMismatch);
    let device = instance.create_device_with_build_id(backend.name(), BUILD_ID).unwrap();
    assert_eq!(device.backend_kind(), backend);
}
