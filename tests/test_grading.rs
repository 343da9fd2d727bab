mod common;

use common::*;
use routegrader::config::{GraderConfig, PaletteEntry, ScoringConfig};
use routegrader::models::ColorClass;
use routegrader::{GraderError, HoldGrader, RouteGrader};

fn default_hold_grader() -> HoldGrader {
    let config = GraderConfig::default();
    HoldGrader::new(config.scoring, config.palette)
}

fn default_route_grader() -> RouteGrader {
    let config = GraderConfig::default();
    RouteGrader::new(config.scoring, config.buckets)
}

#[test]
fn degenerate_boundary_is_invalid_contour() {
    let mut contour = square_contour(10, 10, 20, 300, RED);
    // Collinear boundary: the convex hull encloses no area.
    contour.boundary = (0..10).map(|i| (i, i)).collect();

    let result = default_hold_grader().grade(&contour);
    assert!(matches!(result, Err(GraderError::InvalidContour)));
}

#[test]
fn color_cutoff_is_exclusive_on_the_matched_side() {
    let scoring = ScoringConfig {
        color_cutoff: 50.0,
        ..ScoringConfig::default()
    };
    let palette = vec![PaletteEntry {
        class: ColorClass::Red,
        rgb: [200, 0, 0],
    }];
    let grader = HoldGrader::new(scoring, palette);

    // Distance exactly 50: ambiguous, not matched.
    let at_cutoff = square_contour(10, 10, 20, 300, [150, 0, 0]);
    match grader.grade(&at_cutoff) {
        Err(GraderError::AmbiguousColorClass { distance }) => {
            assert!((distance - 50.0).abs() < 1e-3)
        }
        other => panic!("expected AmbiguousColorClass, got {other:?}"),
    }

    // One step inside the cutoff: matched.
    let inside = square_contour(10, 10, 20, 300, [151, 0, 0]);
    let hold = grader.grade(&inside).expect("should classify");
    assert_eq!(hold.color, ColorClass::Red);
}

#[test]
fn concave_holds_score_lower_than_convex_ones() -> anyhow::Result<()> {
    let grader = default_hold_grader();

    // Same bounding box and color, different enclosed area: the concave
    // region fills half its hull.
    let convex = grader.grade(&square_contour(10, 10, 20, 400, RED))?;
    let concave = grader.grade(&square_contour(10, 10, 20, 180, RED))?;

    assert!(concave.convexity < convex.convexity);
    assert!(concave.score < convex.score);
    Ok(())
}

#[test]
fn horizontal_major_axis_reads_harder_than_vertical() -> anyhow::Result<()> {
    let grader = default_hold_grader();

    let wide = grader.grade(&rect_contour(10, 10, 60, 10, RED))?;
    let tall = grader.grade(&rect_contour(10, 10, 10, 60, RED))?;

    assert!(wide.axis_angle_deg > 80.0, "wide hold lies near horizontal");
    assert!(tall.axis_angle_deg < 10.0, "tall hold lies near vertical");
    assert!(tall.score > wide.score);
    Ok(())
}

#[test]
fn larger_holds_score_higher() -> anyhow::Result<()> {
    let grader = default_hold_grader();

    let small = grader.grade(&square_contour(10, 10, 12, 140, RED))?;
    let large = grader.grade(&square_contour(10, 10, 80, 6_400, RED))?;
    assert!(large.score > small.score);
    Ok(())
}

#[test]
fn empty_route_is_rejected() {
    let result = default_route_grader().aggregate(&[]);
    assert!(matches!(result, Err(GraderError::EmptyRoute)));
}

#[test]
fn mixed_color_classes_are_rejected() {
    let holds = vec![
        make_hold(0.4, ColorClass::Red, 100, 140),
        make_hold(0.6, ColorClass::Blue, 200, 240),
    ];
    let result = default_route_grader().aggregate(&holds);
    assert!(matches!(result, Err(GraderError::MixedColorClasses)));
}

#[test]
fn grade_never_easier_than_the_limiting_hold_alone() -> anyhow::Result<()> {
    let config = GraderConfig::default();
    let grader = RouteGrader::new(config.scoring.clone(), config.buckets.clone());

    let holds = vec![
        make_hold(0.2, ColorClass::Red, 400, 450),
        make_hold(0.5, ColorClass::Red, 250, 300),
        make_hold(0.9, ColorClass::Red, 100, 150),
    ];
    let grade = grader.aggregate(&holds)?;

    let floor = grader.bucket_index(1.0 - 0.2)?;
    assert!(bucket_rank(&config, &grade.bucket) >= floor);
    Ok(())
}

#[test]
fn removing_the_easiest_hold_never_lowers_the_grade() -> anyhow::Result<()> {
    let config = GraderConfig::default();
    let grader = RouteGrader::new(config.scoring.clone(), config.buckets.clone());

    // The easiest hold sits mid-route, so the vertical span is unchanged
    // when it goes away.
    let full = vec![
        make_hold(0.2, ColorClass::Red, 400, 450),
        make_hold(0.9, ColorClass::Red, 250, 300),
        make_hold(0.5, ColorClass::Red, 100, 150),
    ];
    let reduced = vec![full[0].clone(), full[2].clone()];

    let full_grade = grader.aggregate(&full)?;
    let reduced_grade = grader.aggregate(&reduced)?;

    assert!(
        bucket_rank(&config, &reduced_grade.bucket) >= bucket_rank(&config, &full_grade.bucket)
    );
    Ok(())
}

#[test]
fn removing_an_easiest_hold_at_a_span_extreme_never_lowers_the_grade() -> anyhow::Result<()> {
    let config = GraderConfig::default();
    let grader = RouteGrader::new(config.scoring.clone(), config.buckets.clone());

    // The easiest hold tops out the route: dropping it collapses most of
    // the vertical span, which must not soften the grade.
    let full = vec![
        make_hold(0.3, ColorClass::Red, 100, 150),
        make_hold(0.4, ColorClass::Red, 250, 300),
        make_hold(0.9, ColorClass::Red, 1_900, 1_960),
    ];
    let reduced = vec![full[0].clone(), full[1].clone()];

    let full_grade = grader.aggregate(&full)?;
    let reduced_grade = grader.aggregate(&reduced)?;

    assert!(reduced_grade.difficulty >= full_grade.difficulty);
    assert!(
        bucket_rank(&config, &reduced_grade.bucket) >= bucket_rank(&config, &full_grade.bucket)
    );
    Ok(())
}

#[test]
fn size_term_reads_the_bounding_box_area() -> anyhow::Result<()> {
    let config = GraderConfig::default();
    let grader = default_hold_grader();

    // Square ring, 20x20 bbox, enclosed area 300: symmetric, so the axis
    // term is 1, and the hull is the 19x19 corner square.
    let hold = grader.grade(&square_contour(10, 10, 20, 300, RED))?;

    let scoring = &config.scoring;
    let (lo, hi) = scoring.area_range_px;
    let size_term = (400.0 - lo) / (hi - lo);
    let expected = scoring.convexity_weight * (300.0 / 361.0)
        + scoring.area_weight * size_term
        + scoring.angle_weight;
    assert!((hold.score - expected).abs() < 5e-4);
    Ok(())
}

#[test]
fn consistent_scores_give_full_confidence() -> anyhow::Result<()> {
    let grader = default_route_grader();

    let holds = vec![
        make_hold(0.6, ColorClass::Green, 100, 140),
        make_hold(0.6, ColorClass::Green, 200, 240),
        make_hold(0.6, ColorClass::Green, 300, 340),
    ];
    let grade = grader.aggregate(&holds)?;
    assert!((grade.confidence - 1.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn spread_scores_lower_confidence() -> anyhow::Result<()> {
    let grader = default_route_grader();

    let tight = grader.aggregate(&[
        make_hold(0.5, ColorClass::Blue, 100, 140),
        make_hold(0.55, ColorClass::Blue, 200, 240),
    ])?;
    let spread = grader.aggregate(&[
        make_hold(0.1, ColorClass::Blue, 100, 140),
        make_hold(0.9, ColorClass::Blue, 200, 240),
    ])?;

    assert!(spread.confidence < tight.confidence);
    Ok(())
}

#[test]
fn taller_span_reads_harder() -> anyhow::Result<()> {
    let grader = default_route_grader();

    let short = grader.aggregate(&[
        make_hold(0.5, ColorClass::Red, 100, 140),
        make_hold(0.5, ColorClass::Red, 180, 220),
    ])?;
    let tall = grader.aggregate(&[
        make_hold(0.5, ColorClass::Red, 100, 140),
        make_hold(0.5, ColorClass::Red, 1_900, 1_990),
    ])?;

    assert!(tall.difficulty > short.difficulty);
    Ok(())
}

#[test]
fn difficulty_beyond_the_scale_is_a_config_bug() {
    let mut config = GraderConfig::default();
    // A truncated scale that stops well short of 1.0.
    config.buckets.truncate(3);
    let grader = RouteGrader::new(config.scoring, config.buckets);

    let result = grader.bucket_index(0.9);
    assert!(matches!(result, Err(GraderError::GradeOutOfRange { .. })));
}

#[test]
fn full_difficulty_lands_in_the_last_bucket() -> anyhow::Result<()> {
    let config = GraderConfig::default();
    let grader = RouteGrader::new(config.scoring.clone(), config.buckets.clone());
    let index = grader.bucket_index(1.0)?;
    assert_eq!(index, config.buckets.len() - 1);
    Ok(())
}
