use super::*;
use crate::{
    codegen::{generate, ImageSlot},
    language::{
        classify::classify_variables, parser::parse_script, roles::ImageRole,
        transform::transform,
    },
};
use std::collections::BTreeMap;

fn procedure(source: &str, model: EvaluationModel) -> Arc<CompiledProcedure> {
    let params: BTreeMap<String, ImageRole> = [
        ("src".to_string(), ImageRole::Source),
        ("dest".to_string(), ImageRole::Dest),
    ]
    .into_iter()
    .collect();
    let script = parse_script(source).expect("parse");
    let classification = classify_variables(&script, &params, false);
    assert!(
        !classification.diagnostics.has_errors(),
        "{}",
        classification.diagnostics
    );
    let tree = transform(&script, &classification.roles);
    let images = classification
        .roles
        .images()
        .map(|(name, role)| ImageSlot {
            name: name.to_string(),
            role,
        })
        .collect();
    Arc::new(generate(&tree, model, images).expect("generate"))
}

fn direct(source: &str, src: &MemoryImage, dest: &MemoryImage) -> DirectRuntime {
    direct_with(source, src, dest, &JiffleOptions::default())
}

fn direct_with(
    source: &str,
    src: &MemoryImage,
    dest: &MemoryImage,
    options: &JiffleOptions,
) -> DirectRuntime {
    let bindings = Bindings::new()
        .bind("src", src.clone())
        .bind("dest", dest.clone());
    build(procedure(source, EvaluationModel::Direct), bindings, options)
        .expect("build")
        .into_direct()
        .expect("direct runtime")
}

fn run_all(runtime: &mut DirectRuntime) -> EvalResult<()> {
    for y in 0..runtime.height() {
        for x in 0..runtime.width() {
            runtime.evaluate(x, y)?;
        }
    }
    Ok(())
}

fn grid() -> MemoryImage {
    MemoryImage::from_rows(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]])
}

#[test]
fn evaluates_arithmetic_per_pixel() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let mut runtime = direct("dest = src * 2 - 1;", &src, &dest);
    run_all(&mut runtime).expect("evaluate");
    assert_eq!(
        dest.band(0),
        vec![vec![1.0, 3.0, 5.0], vec![7.0, 9.0, 11.0]]
    );
}

#[test]
fn positionals_and_neighbours() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let options = JiffleOptions {
        outside_value: Some(0.0),
        ..JiffleOptions::default()
    };
    let mut runtime = direct_with(
        "dest = src[1, 0] + 100 * x + 1000 * (y == height - 1) + width;",
        &src,
        &dest,
        &options,
    );
    run_all(&mut runtime).expect("evaluate");
    assert_eq!(
        dest.band(0),
        vec![vec![5.0, 106.0, 203.0], vec![1008.0, 1109.0, 1203.0]]
    );
}

#[test]
fn read_outside_image_without_fallback_fails() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let mut runtime = direct("dest = src[-1, 0];", &src, &dest);
    let err = runtime.evaluate(0, 0).expect_err("outside");
    assert!(matches!(err, EvalError::OutsideImage { ref name, .. } if name == "src"));
    runtime.evaluate(1, 0).expect("inside");
    assert_eq!(dest.get(1, 0, 0), Some(1.0));
}

#[test]
fn absolute_coordinates_are_floored() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let mut runtime = direct("dest = src[$2.9, $1.2];", &src, &dest);
    run_all(&mut runtime).expect("evaluate");
    assert!(dest.band(0).iter().flatten().all(|v| *v == 6.0));
}

#[test]
fn band_out_of_range_is_reported() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let mut runtime = direct("dest = src[1];", &src, &dest);
    assert!(matches!(
        runtime.evaluate(0, 0),
        Err(EvalError::BandOutOfRange { bands: 1, .. })
    ));
}

#[test]
fn control_flow_and_builtins() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let script = "\
        total = 0;\n\
        foreach (i in 1:src) { total += i; }\n\
        n = 0;\n\
        while (n < 10) { n += 3; breakif (n > 5); }\n\
        until (n >= 20) { n += 1; if (n == 15) break; }\n\
        dest = total + n * 100 + max(src, 2, NaN);";
    let mut runtime = direct(script, &src, &dest);
    run_all(&mut runtime).expect("evaluate");
    // n: 3, 6 -> breakif; then 7..15 -> break
    let rows: [[f64; 3]; 2] = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let expected: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|&v| v * (v + 1.0) / 2.0 + 1500.0 + v.max(2.0))
                .collect()
        })
        .collect();
    assert_eq!(dest.band(0), expected);
}

#[test]
fn dest_read_back_and_compound_assignment() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let mut runtime = direct("dest = src;\ndest *= 10;\ndest = dest + 1;", &src, &dest);
    runtime.evaluate(2, 1).expect("evaluate");
    assert_eq!(dest.get(2, 1, 0), Some(61.0));
}

#[test]
fn unset_local_on_untaken_branch() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let mut runtime = direct("if (src > 3) { n = 1; }\ndest = n;", &src, &dest);
    assert!(matches!(
        runtime.evaluate(0, 0),
        Err(EvalError::UnsetLocal { ref name }) if name == "n"
    ));
    runtime.evaluate(0, 1).expect("branch taken");
    // locals do not leak into the next pixel
    assert!(runtime.evaluate(1, 0).is_err());
}

#[test]
fn short_circuit_skips_right_operand() {
    let src = MemoryImage::from_rows(&[&[0.0]]);
    let dest = MemoryImage::new(1, 1, 1);
    let mut runtime = direct(
        "dest = (src != 0 && 1 / src > 1) || src == 0 ? 7 : 1 / src;",
        &src,
        &dest,
    );
    runtime.evaluate(0, 0).expect("evaluate");
    assert_eq!(dest.get(0, 0, 0), Some(7.0));
}

#[test]
fn pixel_outside_domain_is_rejected() {
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);
    let mut runtime = direct("dest = src;", &src, &dest);
    assert!(matches!(
        runtime.evaluate(3, 0),
        Err(EvalError::PixelOutsideDomain { width: 3, height: 2, .. })
    ));
}

#[test]
fn indirect_sweep_reports_every_n_rows() {
    let src = MemoryImage::from_fn(2, 5, 1, |x, y, _| (x + y) as f64);
    let dest = MemoryImage::new(2, 5, 1);
    let options = JiffleOptions {
        progress_rows: 2,
        ..JiffleOptions::default()
    };
    let bindings = Bindings::new()
        .bind("src", src.clone())
        .bind("dest", dest.clone());
    let mut runtime = build(
        procedure("dest = src + 1;", EvaluationModel::Indirect),
        bindings,
        &options,
    )
    .expect("build")
    .into_indirect()
    .expect("indirect runtime");

    let mut reports = Vec::new();
    let status = runtime
        .evaluate_all(|fraction| {
            reports.push(fraction);
            Progress::Continue
        })
        .expect("evaluate");
    assert_eq!(status, EvalStatus::Completed);
    assert_eq!(reports, vec![0.4, 0.8, 1.0]);
    assert_eq!(dest.get(1, 4, 0), Some(6.0));
}

#[test]
fn empty_sweep_still_reports_completion() {
    let src = MemoryImage::new(0, 3, 1);
    let dest = MemoryImage::new(0, 3, 1);
    let bindings = Bindings::new()
        .bind("src", src.clone())
        .bind("dest", dest.clone());
    let mut runtime = build(
        procedure("dest = src + 1;", EvaluationModel::Indirect),
        bindings,
        &JiffleOptions::default(),
    )
    .expect("build")
    .into_indirect()
    .expect("indirect runtime");

    let mut reports = Vec::new();
    let status = runtime
        .evaluate_all(|fraction| {
            reports.push(fraction);
            Progress::Continue
        })
        .expect("evaluate");
    assert_eq!(status, EvalStatus::Completed);
    assert_eq!(reports, vec![1.0]);
}

#[test]
fn binding_validation() {
    let compiled = procedure("dest = src;", EvaluationModel::Direct);
    let options = JiffleOptions::default();
    let src = grid();
    let dest = MemoryImage::new(3, 2, 1);

    let missing = Bindings::new().bind("dest", dest.clone());
    assert!(matches!(
        build(Arc::clone(&compiled), missing, &options),
        Err(BindingError::Missing { ref name }) if name == "src"
    ));

    let extra = Bindings::new()
        .bind("src", src.clone())
        .bind("dest", dest.clone())
        .bind("other", src.clone());
    assert!(matches!(
        build(Arc::clone(&compiled), extra, &options),
        Err(BindingError::Unexpected { ref name }) if name == "other"
    ));

    let unreadable = Bindings::new()
        .bind("src", src.with_access(ImageAccess::WriteOnly))
        .bind("dest", dest.clone());
    assert!(matches!(
        build(Arc::clone(&compiled), unreadable, &options),
        Err(BindingError::NotReadable { .. })
    ));

    let unwritable = Bindings::new()
        .bind("src", src.clone())
        .bind("dest", dest.with_access(ImageAccess::ReadOnly));
    assert!(matches!(
        build(Arc::clone(&compiled), unwritable, &options),
        Err(BindingError::NotWritable { .. })
    ));
}

#[test]
fn destinations_must_share_extent() {
    let params: BTreeMap<String, ImageRole> = [
        ("a".to_string(), ImageRole::Dest),
        ("b".to_string(), ImageRole::Dest),
    ]
    .into_iter()
    .collect();
    let script = parse_script("a = 1;\nb = 2;").expect("parse");
    let classification = classify_variables(&script, &params, false);
    let tree = transform(&script, &classification.roles);
    let images = classification
        .roles
        .images()
        .map(|(name, role)| ImageSlot {
            name: name.to_string(),
            role,
        })
        .collect();
    let compiled = Arc::new(generate(&tree, EvaluationModel::Direct, images).expect("generate"));
    let bindings = Bindings::new()
        .bind("a", MemoryImage::new(2, 2, 1))
        .bind("b", MemoryImage::new(3, 2, 1));
    assert!(matches!(
        build(compiled, bindings, &JiffleOptions::default()),
        Err(BindingError::DimensionMismatch { expected_width: 2, width: 3, .. })
    ));
}
