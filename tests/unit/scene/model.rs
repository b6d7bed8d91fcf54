use super::*;

const BLUR_SCENE: &str = r#"{
    "width": 16,
    "height": 8,
    "root": {
        "type": "blur",
        "size": [2.0, 2.0],
        "child": {
            "type": "blend",
            "method": "screen",
            "under": { "type": "solid", "color": [0, 0, 1, 1] },
            "over": {
                "type": "transform",
                "transforms": [
                    { "op": "rotate", "degrees": 90 },
                    { "op": "translate", "x": 4, "y": 0 }
                ],
                "child": { "type": "solid", "color": [1, 0, 0, 0.5] }
            }
        }
    }
}"#;

#[test]
fn parses_with_defaults() {
    let s = Scene::from_reader(BLUR_SCENE.as_bytes()).unwrap();
    assert_eq!(s.output_format, SurfaceFormat::Packed);
    assert_eq!(s.working_format, SurfaceFormat::Flat);
    assert_eq!(s.view_rect(), Rect::new(0.0, 0.0, 16.0, 8.0));

    let Node::Blur {
        blur_type, child, ..
    } = &s.root
    else {
        panic!("expected blur root");
    };
    assert_eq!(*blur_type, BlurType::Gaussian);
    let Node::Blend { method, amount, .. } = child.as_ref() else {
        panic!("expected blend");
    };
    assert_eq!(*method, BlendMethod::Screen);
    assert_eq!(*amount, 1.0);
    s.validate().unwrap();
}

#[test]
fn parse_errors_are_validation_errors() {
    let err = Scene::from_reader(r#"{ "width": 4 }"#.as_bytes()).unwrap_err();
    assert!(matches!(err, RenderError::Validation(_)));
    assert!(err.to_string().contains("parse scene JSON"));

    let err = Scene::from_path("/nonexistent/scene.json").unwrap_err();
    assert!(err.to_string().contains("open scene JSON"));
}

#[test]
fn transform_defs_map_forward() {
    let p = TransformDef::Rotate {
        degrees: 90.0,
        center: [1.0, 1.0],
    }
    .affine()
        * kurbo::Point::new(2.0, 1.0);
    assert!((p.x - 1.0).abs() < 1e-12 && (p.y - 2.0).abs() < 1e-12);

    let a = TransformDef::Affine {
        coeffs: [1.0, 0.0, 0.0, 1.0, 3.0, 4.0],
    }
    .affine();
    assert_eq!(a, Affine::translate((3.0, 4.0)));
    assert_eq!(TransformDef::Depth { depth: 1.0 }.affine(), Affine::IDENTITY);
}

#[test]
fn validation_reports_the_offending_node() {
    let mut s = Scene::from_reader(BLUR_SCENE.as_bytes()).unwrap();
    let Node::Blur { child, .. } = &mut s.root else {
        panic!("expected blur root");
    };
    let Node::Blend { amount, .. } = child.as_mut() else {
        panic!("expected blend");
    };
    *amount = 2.0;
    let err = s.validate().unwrap_err();
    assert!(err.to_string().contains("root.child: blend amount"));

    let s = Scene {
        width: 4,
        height: 4,
        view: Some([0.0, 0.0, 0.0, 4.0]),
        output_format: SurfaceFormat::Packed,
        working_format: SurfaceFormat::Flat,
        root: Node::Solid { color: [1.0; 4] },
    };
    assert!(s.validate().unwrap_err().to_string().contains("view"));
}

#[test]
fn rejects_bad_parameters() {
    let base = |root: Node| Scene {
        width: 4,
        height: 4,
        view: None,
        output_format: SurfaceFormat::Packed,
        working_format: SurfaceFormat::Flat,
        root,
    };
    let solid = || Box::new(Node::Solid { color: [1.0; 4] });

    assert!(base(Node::Solid {
        color: [1.0, 1.0, 1.0, 1.5]
    })
    .validate()
    .is_err());
    assert!(base(Node::ColorCorrect {
        correction: ColorCorrection {
            gamma: 0.0,
            ..ColorCorrection::default()
        },
        child: solid(),
    })
    .validate()
    .is_err());
    assert!(base(Node::Blur {
        blur_type: BlurType::Box,
        size: [f64::NAN, 1.0],
        child: solid(),
    })
    .validate()
    .is_err());
    assert!(base(Node::Transform {
        transforms: vec![TransformDef::Clip {
            rect: [2.0, 0.0, 1.0, 1.0]
        }],
        child: solid(),
    })
    .validate()
    .is_err());

    let mut big = base(Node::Solid { color: [1.0; 4] });
    big.width = MAX_SURFACE_SIDE + 1;
    assert!(big.validate().is_err());
}
