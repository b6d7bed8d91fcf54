use super::*;
use crate::foundation::core::{RectInt, Vec2};
use crate::surface::{SurfaceDesc, SurfaceFormat};
use crate::task::{BlendMethod, BlurType, ColorCorrection};

struct Scenario {
    g: TaskGraph,
    output: SurfaceId,
    cc: TaskId,
    blur: TaskId,
    solid: TaskId,
}

// color correct (flat only) -> packed output
//   blur (flat only) -> flat temp
//     solid (packed writer) -> flat temp
fn scenario() -> Scenario {
    let mut g = TaskGraph::new();
    let rect = RectInt::from_size(8, 8);
    let output = g.add_surface(SurfaceDesc::persistent(SurfaceFormat::Packed, 8, 8));
    let s_blur = g.add_surface(SurfaceDesc::temporary(SurfaceFormat::Flat, 8, 8));
    let s_solid = g.add_surface(SurfaceDesc::temporary(SurfaceFormat::Flat, 8, 8));

    let solid = g.add(
        Task::new(TaskKind::Solid {
            color: [0.5, 0.0, 0.0, 0.5],
        })
        .with_target(s_solid, rect, rect.to_rect()),
    );
    let blur = g.add(
        Task::new(TaskKind::Blur {
            blur_type: BlurType::Box,
            size: Vec2::new(1.0, 1.0),
        })
        .with_target(s_blur, rect, rect.to_rect())
        .with_sub_tasks([solid]),
    );
    let cc = g.add(
        Task::new(TaskKind::ColorCorrect(ColorCorrection::default()))
            .with_target(output, rect, rect.to_rect())
            .with_sub_tasks([blur]),
    );
    g.set_root(cc);
    Scenario {
        g,
        output,
        cc,
        blur,
        solid,
    }
}

fn names(g: &TaskGraph, list: &TaskList) -> Vec<&'static str> {
    list.iter().map(|&t| g[t].kind.name()).collect()
}

#[test]
fn end_to_end_plan_for_representation_mismatch() {
    let mut s = scenario();
    let plan = OptimizerPipeline::default().run(&mut s.g).unwrap();
    let g = &s.g;
    let list = &plan.list;

    assert_eq!(
        names(g, list),
        vec![
            "surface_create",
            "solid",
            "surface_convert",
            "surface_destroy",
            "surface_create",
            "blur",
            "surface_destroy",
            "surface_create",
            "color_correct",
            "surface_destroy",
            "surface_convert",
            "surface_destroy",
        ]
    );
    assert_eq!(list[1], s.solid);
    assert_eq!(list[5], s.blur);
    assert_eq!(list[8], s.cc);

    // The solid fill now writes a packed temporary, converted into the blur's flat input.
    assert_eq!(
        g.target_desc(s.solid).map(|d| d.format),
        Some(SurfaceFormat::Packed)
    );
    assert_eq!(g[list[2]].sub_tasks.as_slice(), &[s.solid]);
    assert_eq!(g[s.blur].sub_tasks.as_slice(), &[list[2]]);

    // The color correction writes a flat temporary; the root wrapper fills the output.
    let root = g.root().unwrap();
    assert_eq!(root, list[10]);
    assert_eq!(g[root].target, Some(s.output));
    assert_eq!(g[root].sub_tasks.as_slice(), &[s.cc]);
    assert_eq!(
        g.target_desc(s.cc).map(|d| d.format),
        Some(SurfaceFormat::Flat)
    );

    assert_eq!(plan.stats.task_rewrites, 2);
    assert_eq!(plan.stats.sweeps, 2);
    assert_eq!(plan.stats.list_rewrites, 7);
    assert_eq!(plan.stats.list_rounds, 2);
}

#[test]
fn every_temporary_is_created_and_destroyed_once() {
    let mut s = scenario();
    let plan = OptimizerPipeline::default().run(&mut s.g).unwrap();
    let g = &s.g;

    for (surface, desc) in g.surfaces.iter() {
        let count = |pred: fn(&Task) -> bool| {
            plan.list
                .iter()
                .filter(|&&t| pred(&g[t]) && g[t].target == Some(surface))
                .count()
        };
        let creates = count(Task::is_surface_create);
        let destroys = count(Task::is_surface_destroy);
        if desc.is_created() {
            assert_eq!((creates, destroys), (0, 0), "{surface:?}");
        } else {
            assert_eq!(destroys, 1, "{surface:?}");
            // a surface written by a conversion is created by it
            let converted = plan
                .list
                .iter()
                .any(|&t| g[t].is_surface_convert() && g[t].target == Some(surface));
            assert_eq!(creates, usize::from(!converted), "{surface:?}");
        }
    }
    validate_plan(g, &plan.list).unwrap();
}

#[test]
fn optimizing_again_changes_nothing() {
    let mut s = scenario();
    let pipeline = OptimizerPipeline::default();
    let plan = pipeline.run(&mut s.g).unwrap();

    let mut stats = OptimizeStats::default();
    pipeline.optimize_graph(&mut s.g, &mut stats).unwrap();
    assert_eq!(stats.task_rewrites, 0);
    assert_eq!(stats.sweeps, 1);

    let mut list = plan.list.clone();
    pipeline
        .optimize_list(&mut s.g, &mut list, &mut stats)
        .unwrap();
    assert_eq!(list, plan.list);
    assert_eq!(stats.list_rewrites, 0);
}

#[test]
fn same_graph_yields_same_plan() {
    let mut a = scenario();
    let mut b = scenario();
    let pa = OptimizerPipeline::default().run(&mut a.g).unwrap();
    let pb = OptimizerPipeline::default().run(&mut b.g).unwrap();
    assert_eq!(pa.list, pb.list);
    assert_eq!(names(&a.g, &pa.list), names(&b.g, &pb.list));
}

#[test]
fn compatible_graph_only_gets_lifecycle_tasks() {
    let mut g = TaskGraph::new();
    let rect = RectInt::from_size(4, 4);
    let output = g.add_surface(SurfaceDesc::persistent(SurfaceFormat::Packed, 4, 4));
    let solid = g.add(Task::new(TaskKind::Solid { color: [1.0; 4] }).with_target(
        output,
        rect,
        rect.to_rect(),
    ));
    g.set_root(solid);

    let plan = OptimizerPipeline::default().run(&mut g).unwrap();
    assert_eq!(plan.list, vec![solid]);
    assert_eq!(plan.stats.task_rewrites, 0);
}

#[test]
fn empty_graph_gives_empty_plan() {
    let mut g = TaskGraph::new();
    let plan = OptimizerPipeline::default().run(&mut g).unwrap();
    assert!(plan.list.is_empty());
}

#[test]
fn pipeline_without_passes_only_linearizes() {
    let mut s = scenario();
    let pipeline = OptimizerPipeline::new(OptimizerOpts {
        validate: false,
        ..OptimizerOpts::default()
    });
    let plan = pipeline.run(&mut s.g).unwrap();
    assert_eq!(plan.list, vec![s.solid, s.blur, s.cc]);
}

#[test]
fn plan_without_lifecycle_passes_fails_validation() {
    let mut s = scenario();
    let pipeline = OptimizerPipeline::new(OptimizerOpts::default())
        .with_task_pass(Box::new(OptimizerSurfaceConvert));
    let err = pipeline.run(&mut s.g).unwrap_err();
    assert!(matches!(err, RenderError::Structural(_)));
}

#[derive(Debug)]
struct Flip;

// Swaps the two sub-tasks of the root forever.
impl TaskOptimizer for Flip {
    fn name(&self) -> &'static str {
        "flip"
    }

    fn run(&self, params: &mut TaskRunParams<'_>) -> RenderResult<bool> {
        let Some(id) = params.graph.edge_task(params.edge) else {
            return Ok(false);
        };
        let task = &mut params.graph[id];
        if task.sub_tasks.len() == 2 {
            task.sub_tasks.swap(0, 1);
            return Ok(true);
        }
        Ok(false)
    }
}

#[test]
fn non_terminating_rules_hit_the_iteration_cap() {
    let mut g = TaskGraph::new();
    let rect = RectInt::from_size(2, 2);
    let s = g.add_surface(SurfaceDesc::temporary(SurfaceFormat::Flat, 2, 2));
    let a = g.add(Task::new(TaskKind::Solid { color: [1.0; 4] }).with_target(
        s,
        rect,
        rect.to_rect(),
    ));
    let root = g.add(
        Task::new(TaskKind::Blend {
            method: crate::task::BlendMethod::Composite,
            amount: 1.0,
        })
        .with_target(s, rect, rect.to_rect())
        .with_sub_tasks([a, a]),
    );
    g.set_root(root);

    let pipeline = OptimizerPipeline::new(OptimizerOpts {
        max_iterations: 50,
        validate: false,
    })
    .with_task_pass(Box::new(Flip));
    let err = pipeline.run(&mut g).unwrap_err();
    assert!(matches!(err, RenderError::Structural(msg) if msg.contains("fixed point")));
}

#[test]
fn opts_deserialize_with_defaults() {
    let opts: OptimizerOpts = serde_json::from_str(r#"{ "max_iterations": 7 }"#).unwrap();
    assert_eq!(opts.max_iterations, 7);
    assert!(opts.validate);
}

#[test]
fn dangling_sub_task_is_a_structural_error() {
    let mut g = TaskGraph::new();
    let rect = RectInt::from_size(4, 4);
    let output = g.add_surface(SurfaceDesc::persistent(SurfaceFormat::Flat, 4, 4));
    let cc = g.add(
        Task::new(TaskKind::ColorCorrect(ColorCorrection::default()))
            .with_target(output, rect, rect.to_rect())
            .with_sub_tasks([TaskId(99)]),
    );
    g.set_root(cc);
    let err = OptimizerPipeline::default().run(&mut g).unwrap_err();
    assert!(matches!(err, RenderError::Structural(_)), "{err}");
}

// blend (flat only) -> flat output
//   blur (flat only) -> flat temp
//     solid (packed writer) -> flat temp
//   transformation (reads either) -> flat temp
//     solid (shared)
#[test]
fn shared_producer_outlives_all_readers() {
    let mut g = TaskGraph::new();
    let rect = RectInt::from_size(8, 8);
    let output = g.add_surface(SurfaceDesc::persistent(SurfaceFormat::Flat, 8, 8));
    let s_solid = g.add_surface(SurfaceDesc::temporary(SurfaceFormat::Flat, 8, 8));
    let s_blur = g.add_surface(SurfaceDesc::temporary(SurfaceFormat::Flat, 8, 8));
    let s_tf = g.add_surface(SurfaceDesc::temporary(SurfaceFormat::Flat, 8, 8));

    let solid = g.add(
        Task::new(TaskKind::Solid {
            color: [0.0, 0.5, 0.0, 0.5],
        })
        .with_target(s_solid, rect, rect.to_rect()),
    );
    let blur = g.add(
        Task::new(TaskKind::Blur {
            blur_type: BlurType::Box,
            size: Vec2::new(1.0, 1.0),
        })
        .with_target(s_blur, rect, rect.to_rect())
        .with_sub_tasks([solid]),
    );
    let tf = g.add(
        Task::new(TaskKind::Transformation {
            stack: crate::transform::TransformationStack::new(),
        })
        .with_target(s_tf, rect, rect.to_rect())
        .with_sub_tasks([solid]),
    );
    let blend = g.add(
        Task::new(TaskKind::Blend {
            method: BlendMethod::Composite,
            amount: 1.0,
        })
        .with_target(output, rect, rect.to_rect())
        .with_sub_tasks([blur, tf]),
    );
    g.set_root(blend);

    let plan = OptimizerPipeline::default().run(&mut g).unwrap();
    validate_plan(&g, &plan.list).unwrap();
    assert_eq!(plan.list.iter().filter(|&&t| t == solid).count(), 1);

    let shared = g[solid].target.unwrap();
    let pos = |pred: &dyn Fn(&Task) -> bool| -> Vec<usize> {
        plan.list
            .iter()
            .enumerate()
            .filter(|&(_, &t)| pred(&g[t]))
            .map(|(i, _)| i)
            .collect()
    };
    let creates = pos(&|t| t.is_surface_create() && t.target == Some(shared));
    let destroys = pos(&|t| t.is_surface_destroy() && t.target == Some(shared));
    assert_eq!(creates.len(), 1, "{:?}", names(&g, &plan.list));
    assert_eq!(destroys.len(), 1, "{:?}", names(&g, &plan.list));

    let readers = pos(&|t| {
        !t.is_surface_destroy() && t.sub_tasks.iter().any(|&s| g[s].target == Some(shared))
    });
    assert!(readers.len() >= 2, "{:?}", names(&g, &plan.list));
    assert!(readers.iter().all(|&r| r < destroys[0]));
    assert!(creates[0] < readers[0]);
}
