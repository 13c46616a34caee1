//! Offscreen renderer tests. Each test returns early when the machine has
//! no usable GPU adapter.

use glam::{Mat4, Vec3, Vec4};
use gloam_client::gpu::{init_headless, HeadlessGpu};
use gloam_client::mesh::{self, MeshCache, MeshHandle};
use gloam_client::renderer::{
    DeferredRenderer, FrameTiming, LightingSettings, RenderContext, TargetFormats,
};
use gloam_client::scene::{build_demo_scene, DrawItem, Material};
use gloam_client::shader::ShaderLibrary;
use gloam_client::texture::TextureCache;
use gloam_core::config::RenderConfig;
use gloam_core::shading::{shade_directional, SurfaceSample};
use gloam_core::{Camera, DirectionalLight, Extent, LightGrid, PointLight};

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct Fixture {
    gpu: HeadlessGpu,
    shaders: ShaderLibrary,
    meshes: MeshCache,
    textures: TextureCache,
    draws: Vec<DrawItem>,
    plane: MeshHandle,
    grid: LightGrid,
    config: RenderConfig,
    camera: Camera,
}

impl Fixture {
    fn new() -> Option<Self> {
        let gpu = match pollster::block_on(init_headless()) {
            Ok(gpu) => gpu,
            Err(e) => {
                eprintln!("No GPU available, skipping: {}", e);
                return None;
            }
        };
        let shaders = ShaderLibrary::embedded().unwrap();
        let mut meshes = MeshCache::new();
        let mut textures = TextureCache::new(&gpu.device, &gpu.queue);
        let scene = build_demo_scene(&gpu.device, &gpu.queue, &mut meshes, &mut textures, None);
        let plane = meshes.add(&gpu.device, "test_plane", &mesh::plane_data());
        let mut config = RenderConfig::default();
        config.light_grid.seed = Some(7);
        let grid = LightGrid::generate(config.light_grid.params(), config.light_grid.seed);
        Some(Self {
            draws: scene.draw_list(),
            plane,
            gpu,
            shaders,
            meshes,
            textures,
            grid,
            config,
            camera: Camera::default(),
        })
    }

    fn renderer(&self, extent: Extent) -> DeferredRenderer {
        DeferredRenderer::new(
            &self.gpu.device,
            TargetFormats::new(OUTPUT_FORMAT).with_gbuffer_position(self.gpu.gbuffer_position_format),
            extent,
            self.config.shadows.resolution,
            self.grid.len(),
            &self.shaders,
            &self.textures,
        )
        .unwrap()
    }

    /// Render the demo scene under the light grid.
    fn render(&self, renderer: &mut DeferredRenderer, settings: LightingSettings) -> Vec<u8> {
        let frame = Frame {
            camera: &self.camera,
            draws: &self.draws,
            directional: self.config.lighting.directional_light(),
            lights: self.grid.lights(),
        };
        self.render_frame(renderer, &frame, settings)
    }

    /// Render one frame into a fresh texture of the renderer's size and
    /// read it back as tightly packed RGBA8 rows.
    fn render_frame(
        &self,
        renderer: &mut DeferredRenderer,
        frame: &Frame<'_>,
        settings: LightingSettings,
    ) -> Vec<u8> {
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;
        let extent = renderer.extent();
        let size = wgpu::Extent3d {
            width: extent.width(),
            height: extent.height(),
            depth_or_array_layers: 1,
        };
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test_target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let ctx = RenderContext {
            camera: frame.camera,
            draws: frame.draws,
            directional: frame.directional,
            lights: frame.lights,
            settings,
            timing: FrameTiming::default(),
            meshes: &self.meshes,
            textures: &self.textures,
        };
        renderer.render_to_view(device, queue, &ctx, &view).unwrap();

        read_rgba8(device, queue, &target, extent)
    }

    /// A 20×20 ground plane at y = 0.
    fn ground(&self, material: Material) -> DrawItem {
        DrawItem {
            mesh: self.plane,
            transform: Mat4::from_scale(Vec3::new(20.0, 1.0, 20.0)),
            material,
            specular_override: None,
        }
    }
}

/// Scene inputs of one test frame.
struct Frame<'a> {
    camera: &'a Camera,
    draws: &'a [DrawItem],
    directional: DirectionalLight,
    lights: &'a [PointLight],
}

fn read_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    extent: Extent,
) -> Vec<u8> {
    let row_bytes = extent.width() * 4;
    let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("test_readback"),
        size: (padded_row_bytes * extent.height()) as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("test_readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row_bytes),
                rows_per_image: Some(extent.height()),
            },
        },
        texture.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::Maintain::Wait);
    rx.recv().unwrap().unwrap();

    let mapped = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((row_bytes * extent.height()) as usize);
    for row in mapped.chunks_exact(padded_row_bytes as usize) {
        pixels.extend_from_slice(&row[..row_bytes as usize]);
    }
    drop(mapped);
    buffer.unmap();
    pixels
}

fn max_channel_difference(a: &[u8], b: &[u8]) -> u8 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).max().unwrap_or(0)
}

#[test]
fn test_resize_reallocates_every_window_target() {
    let Some(fixture) = Fixture::new() else {
        return;
    };
    let mut renderer = fixture.renderer(Extent::new(1600, 900));
    let before = renderer.framebuffer_extents();
    // 4 G-buffer colors + depth, 1 lighting output
    assert_eq!(before.len(), 6);
    assert!(before.iter().all(|(_, e)| *e == Extent::new(1600, 900)));

    let extent = renderer.resize(&fixture.gpu.device, 800, 600).unwrap();
    assert_eq!(extent, Extent::new(800, 600));
    for (label, extent) in renderer.framebuffer_extents() {
        assert_eq!(extent, Extent::new(800, 600), "framebuffer '{}'", label);
    }
    // Shadow map is fixed-size
    assert_eq!(renderer.shadow_map_extent(), Extent::new(2048, 2048));

    renderer.resize(&fixture.gpu.device, 0, 0).unwrap();
    assert!(renderer
        .framebuffer_extents()
        .iter()
        .all(|(_, e)| *e == Extent::new(1, 1)));
}

#[test]
fn test_resize_round_trip_matches_unresized_output() {
    let Some(fixture) = Fixture::new() else {
        return;
    };
    let settings = LightingSettings::from_config(&fixture.config);

    let mut untouched = fixture.renderer(Extent::new(1600, 900));
    let expected = fixture.render(&mut untouched, settings);

    let mut resized = fixture.renderer(Extent::new(1600, 900));
    fixture.render(&mut resized, settings);
    resized.resize(&fixture.gpu.device, 800, 600).unwrap();
    let small = fixture.render(&mut resized, settings);
    assert_eq!(small.len(), 800 * 600 * 4);
    resized.resize(&fixture.gpu.device, 1600, 900).unwrap();
    let actual = fixture.render(&mut resized, settings);

    assert_eq!(resized.frames_completed(), 3);
    assert!(max_channel_difference(&expected, &actual) <= 1);
}

#[test]
fn test_demo_scene_is_lit() {
    let Some(fixture) = Fixture::new() else {
        return;
    };
    let mut renderer = fixture.renderer(Extent::new(320, 180));
    let pixels = fixture.render(&mut renderer, LightingSettings::from_config(&fixture.config));
    let lit = pixels
        .chunks_exact(4)
        .filter(|p| p[0] > 0 || p[1] > 0 || p[2] > 0)
        .count();
    assert!(lit > 0, "demo scene rendered black");
    // Composite writes opaque output
    assert!(pixels.chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn test_disabling_shadows_changes_output() {
    let Some(fixture) = Fixture::new() else {
        return;
    };
    let mut renderer = fixture.renderer(Extent::new(320, 180));
    let mut settings = LightingSettings::from_config(&fixture.config);
    let shadowed = fixture.render(&mut renderer, settings);
    settings.shadows_enabled = false;
    let unshadowed = fixture.render(&mut renderer, settings);
    assert!(max_channel_difference(&shadowed, &unshadowed) > 0);
}

#[test]
fn test_point_lights_only_add_light() {
    let Some(fixture) = Fixture::new() else {
        return;
    };
    let mut renderer = fixture.renderer(Extent::new(320, 180));
    let mut settings = LightingSettings::from_config(&fixture.config);
    settings.intensity = 0.0;
    let unlit = fixture.render(&mut renderer, settings);
    settings.intensity = 1.0;
    let lit = fixture.render(&mut renderer, settings);

    let mut brighter = 0;
    for (dark, light) in unlit.chunks_exact(4).zip(lit.chunks_exact(4)) {
        for c in 0..3 {
            assert!(light[c] >= dark[c], "point lights darkened a pixel");
            if light[c] > dark[c] {
                brighter += 1;
            }
        }
    }
    assert!(brighter > 0, "point lights added nothing");
}

#[test]
fn test_missing_texture_renders_as_background() {
    let Some(mut fixture) = Fixture::new() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let missing = fixture.textures.load(
        &fixture.gpu.device,
        &fixture.gpu.queue,
        &dir.path().join("missing.png"),
    );
    assert_eq!(missing, TextureCache::TRANSPARENT);

    let mut renderer = fixture.renderer(Extent::new(64, 64));
    let settings = LightingSettings::from_config(&fixture.config);
    let directional = fixture.config.lighting.directional_light();
    let lights = fixture.grid.lights();
    let render = |renderer: &mut DeferredRenderer, draws: &[DrawItem]| {
        let frame = Frame {
            camera: &fixture.camera,
            draws,
            directional,
            lights,
        };
        fixture.render_frame(renderer, &frame, settings)
    };

    let background = render(&mut renderer, &[]);
    let transparent = render(
        &mut renderer,
        &[fixture.ground(Material {
            diffuse: missing,
            ..Default::default()
        })],
    );
    assert_eq!(background, transparent);

    // The same plane with an opaque texture does show up
    let white = render(&mut renderer, &[fixture.ground(Material::default())]);
    assert_ne!(background, white);
}

#[test]
fn test_directional_pixel_matches_cpu_shading() {
    let Some(fixture) = Fixture::new() else {
        return;
    };
    // Odd size: the center pixel's center is exactly the camera target.
    let extent = Extent::new(33, 33);
    let mut renderer = fixture.renderer(extent);

    let camera = Camera {
        target: Vec3::ZERO,
        distance: 6.0,
        yaw: 0.0,
        pitch: 1.2,
        ..Default::default()
    };
    let tint = Vec3::new(0.8, 0.6, 0.4);
    // 0.2 and 1.0 are exact in the 8-bit specular target
    let specular = Vec4::new(0.2, 0.2, 0.2, 1.0);
    let draws = [fixture.ground(Material {
        diffuse: TextureCache::WHITE,
        tint: tint.extend(1.0),
        specular,
    })];
    let directional = DirectionalLight {
        position: Vec3::new(1.0, 3.0, 2.0),
        ..fixture.config.lighting.directional_light()
    };
    let mut settings = LightingSettings::from_config(&fixture.config);
    settings.shadows_enabled = false;

    let frame = Frame {
        camera: &camera,
        draws: &draws,
        directional,
        lights: &[],
    };
    let pixels = fixture.render_frame(&mut renderer, &frame, settings);

    let surface = SurfaceSample {
        position: Vec3::ZERO,
        normal: Vec3::Y,
        diffuse: tint,
        specular: specular.truncate(),
        glossiness_weight: specular.w,
    };
    let expected = shade_directional(
        &surface,
        &directional,
        camera.position(),
        settings.glossiness,
        1.0,
    );
    assert!(expected.max_element() < 1.0, "reference value would clip");

    let center = ((16 * extent.width() + 16) * 4) as usize;
    let actual = &pixels[center..center + 4];
    for (c, value) in expected.to_array().into_iter().enumerate() {
        let expected = (value * 255.0).round() as i32;
        assert!(
            (actual[c] as i32 - expected).abs() <= 1,
            "channel {}: gpu {} cpu {}",
            c,
            actual[c],
            expected
        );
    }
    assert_eq!(actual[3], 255);
}
