use super::*;
use crate::foundation::core::Point;
use crate::task::BlurType;

fn scene(root: Node) -> Scene {
    Scene {
        width: 8,
        height: 4,
        view: None,
        output_format: SurfaceFormat::Packed,
        working_format: SurfaceFormat::Flat,
        root,
    }
}

fn solid() -> Node {
    Node::Solid {
        color: [1.0, 0.5, 0.0, 0.5],
    }
}

#[test]
fn root_writes_persistent_output() {
    let built = build_graph(&scene(solid())).unwrap();
    let g = &built.graph;
    let root = g.root().unwrap();

    let out = g.surfaces.get(built.output).unwrap();
    assert!(out.is_created() && !out.is_temporary());
    assert_eq!(out.format, SurfaceFormat::Packed);
    assert_eq!(g[root].target, Some(built.output));
    assert_eq!(g[root].target_rect, RectInt::from_size(8, 4));
    assert_eq!(g[root].source_rect, Rect::new(0.0, 0.0, 8.0, 4.0));
    // solid colors are stored premultiplied
    let TaskKind::Solid { color } = g[root].kind else {
        panic!("expected solid");
    };
    assert_eq!(color, [0.5, 0.25, 0.0, 0.5]);
}

#[test]
fn children_get_temporary_working_surfaces() {
    let built = build_graph(&scene(Node::Blend {
        method: Default::default(),
        amount: 1.0,
        under: Box::new(solid()),
        over: Box::new(solid()),
    }))
    .unwrap();
    let g = &built.graph;
    let root = g.root().unwrap();

    assert_eq!(g[root].sub_tasks.len(), 2);
    for &sub in &g[root].sub_tasks {
        let d = g.target_desc(sub).unwrap();
        assert!(d.is_temporary() && !d.is_created());
        assert_eq!(d.format, SurfaceFormat::Flat);
        assert_eq!((d.width, d.height), (8, 4));
        assert_eq!(g[sub].source_rect, g[root].source_rect);
    }
    assert_ne!(g[g[root].sub_tasks[0]].target, g[g[root].sub_tasks[1]].target);
}

#[test]
fn blur_child_covers_kernel_margin() {
    let mut s = scene(Node::Blur {
        blur_type: BlurType::Box,
        size: [1.0, 0.5],
        child: Box::new(solid()),
    });
    // two pixels per logical unit
    s.view = Some([0.0, 0.0, 4.0, 2.0]);
    let built = build_graph(&s).unwrap();
    let g = &built.graph;
    let root = g.root().unwrap();
    let sub = g[root].sub_tasks[0];

    // pixel sizes 2 x 1 give margins 3 x 2
    assert_eq!(g[root].offset, VectorInt::new(3, 2));
    let d = g.target_desc(sub).unwrap();
    assert_eq!((d.width, d.height), (8 + 6, 4 + 4));
    assert_eq!(g[sub].source_rect, Rect::new(-1.5, -1.0, 5.5, 3.0));
}

#[test]
fn transform_stack_inverts_forward_chain() {
    let built = build_graph(&scene(Node::Transform {
        transforms: vec![
            TransformDef::Scale { x: 2.0, y: 2.0 },
            TransformDef::Translate { x: 1.0, y: 0.0 },
        ],
        child: Box::new(solid()),
    }))
    .unwrap();
    let g = &built.graph;
    let root = g.root().unwrap();
    let TaskKind::Transformation { stack } = &g[root].kind else {
        panic!("expected transformation");
    };

    // forward: child (1, 1) -> (2, 2) -> (3, 2)
    let back = stack.transform(Point::new(3.0, 2.0));
    assert!((back.p - Point::new(1.0, 1.0)).hypot() < 1e-12);
    assert!(back.visible);

    // the child covers the pulled-back view plus one pixel
    let sub = g[root].sub_tasks[0];
    let src = g[sub].source_rect;
    assert!(src.x0 <= -0.5 && src.y0 <= 0.0);
    assert!(src.x1 >= 3.5 && src.y1 >= 2.0);
}

#[test]
fn clip_and_depth_stages_are_kept() {
    let built = build_graph(&scene(Node::Transform {
        transforms: vec![
            TransformDef::Depth { depth: 2.0 },
            TransformDef::Clip {
                rect: [0.0, 0.0, 4.0, 4.0],
            },
        ],
        child: Box::new(solid()),
    }))
    .unwrap();
    let g = &built.graph;
    let TaskKind::Transformation { stack } = &g[g.root().unwrap()].kind else {
        panic!("expected transformation");
    };
    assert_eq!(stack.get_count(), 2);
    let hidden = stack.transform(Point::new(6.0, 1.0));
    assert!(!hidden.visible);
    assert_eq!(hidden.depth, 2.0);
}

#[test]
fn invalid_scene_is_rejected_before_building() {
    let mut s = scene(Node::Transform {
        transforms: vec![TransformDef::Scale { x: 0.0, y: 1.0 }],
        child: Box::new(solid()),
    });
    let err = build_graph(&s).unwrap_err();
    assert!(matches!(err, RenderError::Validation(_)));

    s.root = solid();
    s.width = 0;
    assert!(build_graph(&s).is_err());
}

#[test]
fn oversized_blur_margin_is_rejected() {
    let s = scene(Node::Blur {
        blur_type: BlurType::Gaussian,
        size: [1e12, 1e12],
        child: Box::new(solid()),
    });
    let err = build_graph(&s).unwrap_err();
    assert!(matches!(err, RenderError::Validation(_)));
    assert!(err.to_string().contains("blur child width"));
}
