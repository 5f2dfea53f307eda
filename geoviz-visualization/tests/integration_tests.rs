//! Integration tests for geoviz-visualization
//!
//! Everything runs on the headless window system and backend, so the
//! renderer selection, resource lifecycle and event loop can be checked
//! through the recorded backend calls.

use std::cell::Cell;
use std::rc::Rc;

use approx::assert_relative_eq;
use geoviz_core::{
    Error, Geometry, GeometryKind, Image, Point3f, PointCloud, SharedGeometry, TriangleMesh, Vector2f, Vector3f,
};
use geoviz_gpu::{share_backend, HeadlessBackend, HeadlessRecorder, SharedBackend};
use geoviz_visualization::shader::{ShaderWrapper, Technique, UnitState};
use geoviz_visualization::*;

fn headless() -> (SharedBackend, HeadlessRecorder, ViewControl) {
    let backend = HeadlessBackend::new(640, 480);
    let recorder = backend.recorder();
    let mut view = ViewControl::new();
    view.change_window_size(640, 480);
    (share_backend(backend), recorder, view)
}

fn open(windowing: &mut HeadlessWindowSystem) -> (Visualizer, HeadlessRecorder) {
    let mut visualizer = Visualizer::new();
    visualizer.create_window(windowing, &WindowConfig::default()).unwrap();
    let recorder = windowing.recorder().unwrap();
    (visualizer, recorder)
}

fn cloud(offset: f32) -> SharedGeometry {
    let points = (0..8)
        .map(|i| Point3f::new(offset + i as f32, (i % 3) as f32, (i % 2) as f32))
        .collect();
    SharedGeometry::new(PointCloud::from_points(points))
}

fn cloud_with_normals() -> SharedGeometry {
    let points = vec![
        Point3f::new(0.0, 0.0, 0.0),
        Point3f::new(1.0, 0.0, 0.0),
        Point3f::new(0.0, 1.0, 0.0),
    ];
    let normals = vec![Vector3f::z(); 3];
    SharedGeometry::new(PointCloud::from_points(points).with_normals(normals))
}

fn textured_box() -> TriangleMesh {
    let mut mesh = TriangleMesh::create_box(1.0, 2.0, 3.0);
    mesh.triangle_uvs = (0..mesh.triangles.len() * 3)
        .map(|i| Vector2f::new((i % 2) as f32, (i % 3) as f32 * 0.5))
        .collect();
    mesh.texture = Some(Image::new(4, 4, 3));
    mesh
}

fn samples() -> Vec<SharedGeometry> {
    vec![
        cloud(0.0),
        SharedGeometry::new(TriangleMesh::create_box(1.0, 1.0, 1.0)),
        SharedGeometry::new(Image::new(8, 4, 3)),
        SharedGeometry::new(Geometry::CoordinateFrameMesh(TriangleMesh::create_coordinate_frame(
            1.0,
            Point3f::origin(),
        ))),
        SharedGeometry::new(Geometry::Unspecified),
    ]
}

fn render_frame(
    backend: &SharedBackend,
    renderer: &mut GeometryRenderer,
    option: &RenderOption,
    view: &ViewControl,
) -> RenderReport {
    backend.borrow_mut().begin_frame([0.0; 4]).unwrap();
    let report = renderer.render(option, view);
    backend.borrow_mut().end_frame().unwrap();
    report
}

#[test]
fn test_renderers_reject_other_kinds() {
    let (backend, _, _) = headless();
    let kinds = [
        GeometryKind::PointCloud,
        GeometryKind::TriangleMesh,
        GeometryKind::Image,
        GeometryKind::CoordinateFrameMesh,
    ];
    for kind in kinds {
        let mut renderer = GeometryRenderer::for_kind(kind, &backend).unwrap();
        let own = samples().into_iter().find(|g| g.kind() == kind).unwrap();
        renderer.add_geometry(own.clone()).unwrap();

        for other in samples().into_iter().filter(|g| g.kind() != kind) {
            let result = renderer.add_geometry(other.clone());
            assert!(
                matches!(result, Err(Error::UnsupportedGeometryKind { .. })),
                "{} accepted {:?}",
                renderer.name(),
                other.kind()
            );
            assert!(renderer.has_geometry(&own));
        }
    }
}

#[test]
fn test_empty_or_hidden_geometry_draws_nothing() {
    let (backend, recorder, view) = headless();
    let option = RenderOption {
        show_coordinate_frame: true,
        ..RenderOption::default()
    };
    let empties = [
        SharedGeometry::new(PointCloud::new()),
        SharedGeometry::new(TriangleMesh::new()),
        SharedGeometry::new(Image::default()),
        SharedGeometry::new(Geometry::CoordinateFrameMesh(TriangleMesh::new())),
    ];
    for empty in empties {
        let mut renderer = GeometryRenderer::for_kind(empty.kind(), &backend).unwrap();
        renderer.add_geometry(empty).unwrap();
        let calls = recorder.calls();
        let report = renderer.render(&option, &view);
        assert!(report.is_success());
        assert!(report.is_empty());
        assert_eq!(recorder.calls(), calls);
    }

    for geometry in samples().into_iter().filter(|g| g.kind() != GeometryKind::Unspecified) {
        let mut renderer = GeometryRenderer::for_kind(geometry.kind(), &backend).unwrap();
        renderer.add_geometry(geometry).unwrap();
        renderer.set_visible(false);
        let calls = recorder.calls();
        assert!(renderer.render(&option, &view).is_success());
        assert_eq!(recorder.calls(), calls);
    }
}

#[test]
fn test_normal_colored_points_with_overlay() {
    let (backend, recorder, view) = headless();
    let mut renderer = GeometryRenderer::for_kind(GeometryKind::PointCloud, &backend).unwrap();
    renderer.add_geometry(cloud_with_normals()).unwrap();
    let option = RenderOption {
        point_color_option: PointColorOption::Normal,
        point_show_normal: true,
        ..RenderOption::default()
    };

    let report = render_frame(&backend, &mut renderer, &option, &view);
    assert!(report.is_success());
    let drawn = recorder.log().last_frame_programs();
    assert!(drawn.contains(&"NormalShaderForPointCloud"));
    assert!(!drawn.contains(&"PhongShaderForPointCloud"));
    assert_eq!(
        drawn.iter().filter(|&&p| p == "SimpleShaderForPointCloudNormal").count(),
        1
    );
}

#[test]
fn test_textured_mesh_falls_back_without_texture() {
    let (backend, recorder, view) = headless();
    let mut renderer = GeometryRenderer::for_kind(GeometryKind::TriangleMesh, &backend).unwrap();
    let mesh = SharedGeometry::new(textured_box());
    renderer.add_geometry(mesh.clone()).unwrap();
    let option = RenderOption::default();
    assert_eq!(option.mesh_color_option, MeshColorOption::Color);

    render_frame(&backend, &mut renderer, &option, &view);
    assert_eq!(
        recorder.log().last_frame_programs(),
        vec!["TexturePhongShaderForTriangleMesh"]
    );
    assert!(recorder.log().frames[0][0].textured);

    if let Geometry::TriangleMesh(mesh) = &mut *mesh.borrow_mut() {
        mesh.texture = None;
    }
    renderer.update_geometry().unwrap();
    render_frame(&backend, &mut renderer, &option, &view);
    assert_eq!(recorder.log().last_frame_programs(), vec!["PhongShaderForTriangleMesh"]);
}

#[test]
fn test_coordinate_frame_hidden_by_default() {
    let (backend, recorder, view) = headless();
    let mut renderer = GeometryRenderer::for_kind(GeometryKind::CoordinateFrameMesh, &backend).unwrap();
    let frame = Geometry::CoordinateFrameMesh(TriangleMesh::create_coordinate_frame(3.0, Point3f::new(1.0, 2.0, 3.0)));
    renderer.add_geometry(SharedGeometry::new(frame)).unwrap();

    let report = render_frame(&backend, &mut renderer, &RenderOption::default(), &view);
    assert!(report.is_success());
    assert!(recorder.log().last_frame_programs().is_empty());
    assert_eq!(recorder.log().buffers_created, 0);
}

#[test]
fn test_remove_unknown_geometry() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, _) = open(&mut windowing);
    visualizer.add_geometry(cloud(0.0), true).unwrap();

    let stranger = cloud(0.0);
    let result = visualizer.remove_geometry(&stranger, true);
    assert!(matches!(result, Err(Error::NotFound)));
    assert_eq!(visualizer.geometry_count(), 1);
    assert_eq!(visualizer.renderers().len(), 1);
}

#[test]
fn test_add_then_remove_restores_bounds() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, _) = open(&mut windowing);
    visualizer.add_geometry(cloud(0.0), true).unwrap();
    let bounds = *visualizer.view_control().bounding_box();
    let count = visualizer.geometry_count();

    let far = cloud(100.0);
    visualizer.add_geometry(far.clone(), true).unwrap();
    assert!(visualizer.view_control().bounding_box().max_bound.x > 100.0);

    visualizer.remove_geometry(&far, true).unwrap();
    assert_eq!(visualizer.geometry_count(), count);
    let restored = visualizer.view_control().bounding_box();
    assert_relative_eq!(restored.min_bound, bounds.min_bound);
    assert_relative_eq!(restored.max_bound, bounds.max_bound);
}

#[test]
fn test_duplicate_and_unspecified_geometry_rejected() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, _) = open(&mut windowing);
    let geometry = cloud(0.0);
    visualizer.add_geometry(geometry.clone(), false).unwrap();

    assert!(matches!(
        visualizer.add_geometry(geometry.clone(), false),
        Err(Error::InvalidData(_))
    ));
    assert!(matches!(
        visualizer.add_geometry(SharedGeometry::new(Geometry::Unspecified), false),
        Err(Error::UnsupportedGeometryKind { expected: None, .. })
    ));
    assert_eq!(visualizer.geometry_count(), 1);
}

#[test]
fn test_repeated_update_renders_the_same() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, recorder) = open(&mut windowing);
    visualizer.add_geometry(cloud_with_normals(), true).unwrap();
    visualizer
        .add_geometry(SharedGeometry::new(textured_box()), true)
        .unwrap();

    visualizer.update_geometry(None).unwrap();
    assert!(visualizer.render().is_success());
    visualizer.update_geometry(None).unwrap();
    assert!(visualizer.render().is_success());

    let log = recorder.log();
    assert_eq!(log.frames.len(), 2);
    assert!(!log.frames[0].is_empty());
    assert_eq!(log.frames[0], log.frames[1]);
}

#[test]
fn test_release_twice_leaves_other_units_alone() {
    let (backend, recorder, view) = headless();
    let geometry = cloud(0.0).borrow().clone();
    let option = RenderOption::default();
    let mut first = ShaderWrapper::new(Technique::SimplePoint, backend.clone());
    let mut second = ShaderWrapper::new(Technique::SimplePoint, backend.clone());
    first.bind(&geometry, &option, &view).unwrap();
    second.bind(&geometry, &option, &view).unwrap();

    first.release();
    first.release();
    assert_eq!(first.state(), UnitState::Released);
    assert_eq!(recorder.log().invalid_destroys, 0);
    // The program and buffer of the second unit are still live
    assert_eq!(recorder.log().live_handle_count(), 2);

    backend.borrow_mut().begin_frame([0.0; 4]).unwrap();
    second.render(&geometry, &option, &view).unwrap();
    backend.borrow_mut().end_frame().unwrap();
    assert_eq!(recorder.log().last_frame_programs(), vec!["SimpleShaderForPointCloud"]);
}

#[test]
fn test_compile_failure_does_not_stop_siblings() {
    let mut windowing = HeadlessWindowSystem::new().with_failing_program("PhongShaderForPointCloud");
    let (mut visualizer, recorder) = open(&mut windowing);
    visualizer.add_geometry(cloud_with_normals(), true).unwrap();
    visualizer
        .add_geometry(SharedGeometry::new(TriangleMesh::create_box(1.0, 1.0, 1.0)), true)
        .unwrap();

    let frame = visualizer.render();
    assert!(frame.frame_error.is_none());
    assert_eq!(frame.units.failed_units(), vec!["PhongShaderForPointCloud"]);
    assert_eq!(
        recorder.log().last_frame_programs(),
        vec!["PhongShaderForTriangleMesh"]
    );
    match frame.into_result() {
        Err(Error::Render { failed }) => assert_eq!(failed, vec!["PhongShaderForPointCloud".to_string()]),
        other => panic!("unexpected frame result {other:?}"),
    }
}

#[test]
fn test_close_inside_callback_stops_without_redraw() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, recorder) = open(&mut windowing);
    visualizer.add_geometry(cloud(0.0), true).unwrap();

    let invocations = Rc::new(Cell::new(0));
    let counter = Rc::clone(&invocations);
    visualizer.register_animation_callback(Some(Box::new(move |vis: &mut Visualizer| {
        counter.set(counter.get() + 1);
        if counter.get() == 3 {
            vis.close();
        }
        false
    })));
    visualizer.run(&mut windowing).unwrap();

    assert_eq!(invocations.get(), 3);
    // One frame per iteration, none after the close
    assert_eq!(recorder.frame_count(), 3);
    // The callback still marked the frame dirty
    assert!(visualizer.is_redraw_required());
}

#[test]
fn test_callback_can_unregister_itself() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, _) = open(&mut windowing);
    let invocations = Rc::new(Cell::new(0));
    let counter = Rc::clone(&invocations);
    visualizer.register_animation_callback(Some(Box::new(move |vis: &mut Visualizer| {
        counter.set(counter.get() + 1);
        vis.register_animation_callback(None);
        true
    })));

    // Without a callback the loop waits, and waiting on no input closes
    visualizer.run(&mut windowing).unwrap();
    assert_eq!(invocations.get(), 1);
}

#[test]
fn test_animation_changes_are_rebound() {
    let mut windowing = HeadlessWindowSystem::new().with_poll_limit(3);
    let (mut visualizer, recorder) = open(&mut windowing);
    let geometry = cloud(0.0);
    visualizer.add_geometry(geometry.clone(), true).unwrap();

    let moving = geometry.clone();
    visualizer.register_animation_callback(Some(Box::new(move |_: &mut Visualizer| {
        if let Geometry::PointCloud(points) = &mut *moving.borrow_mut() {
            points.translate(&Vector3f::new(0.1, 0.0, 0.0));
        }
        true
    })));
    visualizer.run(&mut windowing).unwrap();

    let log = recorder.log();
    assert_eq!(log.frames.len(), 4);
    // One upload per frame, each replacing the last
    assert_eq!(log.buffers_created, 4);
    assert_eq!(log.live_buffers.len(), 1);
}

#[test]
fn test_dirty_flag() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, recorder) = open(&mut windowing);
    assert!(visualizer.is_redraw_required());

    assert!(visualizer.poll_events(&mut windowing));
    assert!(!visualizer.is_redraw_required());
    assert_eq!(recorder.frame_count(), 1);

    // Nothing changed, so polling again does not redraw
    assert!(visualizer.poll_events(&mut windowing));
    assert_eq!(recorder.frame_count(), 1);

    let geometry = cloud(0.0);
    visualizer.add_geometry(geometry.clone(), false).unwrap();
    assert!(visualizer.is_redraw_required());
    visualizer.render();
    assert!(!visualizer.is_redraw_required());

    visualizer.update_geometry(Some(&geometry)).unwrap();
    assert!(visualizer.is_redraw_required());
    visualizer.render();

    visualizer.remove_geometry(&geometry, false).unwrap();
    assert!(visualizer.is_redraw_required());
}

#[test]
fn test_failed_frame_keeps_redraw_pending() {
    let mut windowing = HeadlessWindowSystem::new().with_failing_frames(1);
    let (mut visualizer, recorder) = open(&mut windowing);
    visualizer.add_geometry(cloud(0.0), true).unwrap();

    let frame = visualizer.render();
    assert!(matches!(frame.frame_error, Some(Error::Gpu(_))));
    assert!(visualizer.is_redraw_required());
    assert_eq!(recorder.frame_count(), 0);

    // The next step retries the frame
    assert!(visualizer.poll_events(&mut windowing));
    assert!(!visualizer.is_redraw_required());
    assert_eq!(recorder.frame_count(), 1);
    assert_eq!(recorder.log().last_frame_programs(), vec![Technique::SimplePoint.label()]);
}

#[test]
fn test_update_single_geometry_only_rebinds_its_renderer() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, recorder) = open(&mut windowing);
    let a = cloud(0.0);
    let b = cloud(5.0);
    visualizer.add_geometry(a.clone(), true).unwrap();
    visualizer.add_geometry(b.clone(), true).unwrap();

    visualizer.render();
    assert_eq!(recorder.log().buffers_created, 2);
    visualizer.update_geometry(Some(&a)).unwrap();
    visualizer.render();
    assert_eq!(recorder.log().buffers_created, 3);
}

#[test]
fn test_failed_window_leaves_visualizer_uninitialized() {
    let mut windowing = HeadlessWindowSystem::new().fail_window();
    let mut visualizer = Visualizer::new();
    let result = visualizer.create_window(&mut windowing, &WindowConfig::default());
    assert!(matches!(result, Err(Error::Initialization(_))));
    assert!(!visualizer.is_initialized());

    assert!(matches!(
        visualizer.add_geometry(cloud(0.0), true),
        Err(Error::NotInitialized)
    ));
    assert!(matches!(
        visualizer.remove_geometry(&cloud(0.0), true),
        Err(Error::NotInitialized)
    ));
    assert!(!visualizer.poll_events(&mut windowing));
    assert!(matches!(visualizer.run(&mut windowing), Err(Error::NotInitialized)));
    visualizer.destroy_window(&mut windowing);

    let mut windowing = HeadlessWindowSystem::new().fail_backend();
    let result = visualizer.create_window(&mut windowing, &WindowConfig::default());
    assert!(matches!(result, Err(Error::Initialization(_))));
    assert!(!visualizer.is_initialized());
}

#[test]
fn test_destroy_window_releases_everything() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, recorder) = open(&mut windowing);
    visualizer.add_geometry(cloud_with_normals(), true).unwrap();
    visualizer
        .add_geometry(SharedGeometry::new(textured_box()), true)
        .unwrap();
    visualizer.render();
    assert!(recorder.log().live_handle_count() > 0);

    assert_eq!(windowing.live_windows(), 1);

    visualizer.destroy_window(&mut windowing);
    assert!(!visualizer.is_initialized());
    assert!(visualizer.window().is_none());
    assert_eq!(windowing.live_windows(), 0);
    assert_eq!(recorder.log().live_handle_count(), 0);
    assert_eq!(recorder.log().invalid_destroys, 0);
}

#[test]
fn test_recreating_window_closes_the_old_one() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, _) = open(&mut windowing);
    visualizer
        .create_window(&mut windowing, &WindowConfig::default())
        .unwrap();
    assert_eq!(windowing.live_windows(), 1);

    visualizer.destroy_window(&mut windowing);
    assert_eq!(windowing.live_windows(), 0);
}

#[test]
fn test_coordinate_frame_toggled_by_key() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, recorder) = open(&mut windowing);
    visualizer.add_geometry(cloud(0.0), true).unwrap();
    windowing.push_event(InputEvent::Key {
        key: Key::Character('f'),
        modifiers: Modifiers::NONE,
    });
    visualizer.run(&mut windowing).unwrap();

    let log = recorder.log();
    assert_eq!(log.frames.len(), 2);
    assert_eq!(
        log.frames[0].iter().map(|d| d.program).collect::<Vec<_>>(),
        vec!["SimpleShaderForPointCloud"]
    );
    assert_eq!(
        log.frames[1].iter().map(|d| d.program).collect::<Vec<_>>(),
        vec!["SimpleShaderForPointCloud", "PhongShaderForTriangleMesh"]
    );
    assert!(visualizer.coordinate_frame().is_some());
}

#[test]
fn test_reset_view_point_moves_coordinate_frame() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, _) = open(&mut windowing);
    visualizer.add_geometry(cloud(0.0), true).unwrap();
    visualizer.run(&mut windowing).unwrap();
    let frame = visualizer.coordinate_frame().cloned().unwrap();
    let before = frame.bounding_box();

    let far = cloud(50.0);
    visualizer.add_geometry(far.clone(), true).unwrap();
    visualizer.remove_geometry(&far, true).unwrap();
    visualizer.add_geometry(cloud(-20.0), false).unwrap();
    visualizer.reset_view_point(true);

    let after = frame.bounding_box();
    assert!(after.min_bound.x < before.min_bound.x);
}

#[test]
fn test_resize_reaches_backend_and_view() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, recorder) = open(&mut windowing);
    windowing.push_event(InputEvent::Resized {
        width: 800,
        height: 600,
    });
    assert!(visualizer.poll_events(&mut windowing));

    assert_eq!(visualizer.view_control().window_size(), (800, 600));
    assert_eq!(recorder.log().resizes.last(), Some(&(800, 600)));
    assert!(visualizer.is_redraw_required());
}

#[test]
fn test_close_request_and_scroll() {
    let mut windowing = HeadlessWindowSystem::new();
    let (mut visualizer, _) = open(&mut windowing);
    let zoom = visualizer.view_control().zoom();
    windowing.push_batch(vec![InputEvent::Scroll { delta: 2.0 }, InputEvent::CloseRequested]);

    assert!(!visualizer.poll_events(&mut windowing));
    assert_relative_eq!(visualizer.view_control().zoom(), zoom + 2.0 * view_control::ZOOM_STEP);
    // Later steps are refused once the window wants to close
    assert!(!visualizer.wait_events(&mut windowing));
}
