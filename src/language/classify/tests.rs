use super::*;
use crate::language::parser::parse_script;

fn params(entries: &[(&str, ImageRole)]) -> BTreeMap<String, ImageRole> {
    entries
        .iter()
        .map(|(name, role)| (name.to_string(), *role))
        .collect()
}

fn standard_params() -> BTreeMap<String, ImageRole> {
    params(&[("src", ImageRole::Source), ("dest", ImageRole::Dest)])
}

fn classify(source: &str) -> Classification {
    classify_with(source, &standard_params(), false)
}

fn classify_with(
    source: &str,
    params: &BTreeMap<String, ImageRole>,
    implicit: bool,
) -> Classification {
    classify_variables(&parse_script(source).expect("parse"), params, implicit)
}

fn codes(result: &Classification) -> Vec<(ErrorCode, String)> {
    result
        .diagnostics
        .iter()
        .map(|d| (d.code, d.name.clone()))
        .collect()
}

#[test]
fn classifies_images_locals_and_positionals() {
    let result = classify("n = src * 2;\ndest = n + x + width + M_PI;");
    assert!(result.diagnostics.is_empty(), "{}", result.diagnostics);
    assert_eq!(result.roles.get("src"), Some(VarRole::Source));
    assert_eq!(result.roles.get("dest"), Some(VarRole::Dest));
    assert_eq!(result.roles.get("n"), Some(VarRole::Local));
    assert_eq!(
        result.roles.get("x"),
        Some(VarRole::Positional(Positional::X))
    );
    assert_eq!(result.roles.get("M_PI"), Some(VarRole::Constant));
}

#[test]
fn assigning_to_source_is_an_error() {
    let result = classify("src = 1;\ndest = 2;");
    assert_eq!(
        codes(&result),
        vec![(ErrorCode::AssignmentToSrcImage, "src".to_string())]
    );
    assert!(result.diagnostics.has_errors());
}

#[test]
fn reading_dest_before_writing_is_an_error() {
    let result = classify("n = dest + src;\ndest = n;");
    assert_eq!(
        codes(&result),
        vec![(ErrorCode::ReadingFromDestImage, "dest".to_string())]
    );
}

#[test]
fn reading_dest_after_writing_is_allowed() {
    let result = classify("dest = src;\ndest = dest * 2;\ndest += 1;");
    assert!(result.diagnostics.is_empty(), "{}", result.diagnostics);
}

#[test]
fn compound_assignment_reads_its_target_first() {
    let result = classify("n += 1;\ndest = src;");
    assert_eq!(codes(&result), vec![(ErrorCode::UninitVar, "n".to_string())]);
}

#[test]
fn self_referencing_assignment_is_uninitialised() {
    let result = classify("n = n + 1;\ndest = src;");
    assert_eq!(codes(&result), vec![(ErrorCode::UninitVar, "n".to_string())]);
}

#[test]
fn every_problem_is_collected() {
    let result = classify("x = 1;\nM_E = 2;\nsrc = 3;\ndest = a + b;");
    let found = codes(&result);
    assert!(found.contains(&(ErrorCode::AssignmentToPositional, "x".into())));
    assert!(found.contains(&(ErrorCode::AssignmentToConstant, "M_E".into())));
    assert!(found.contains(&(ErrorCode::AssignmentToSrcImage, "src".into())));
    assert!(found.contains(&(ErrorCode::UninitVar, "a".into())));
    assert!(found.contains(&(ErrorCode::UninitVar, "b".into())));
}

#[test]
fn loop_variable_cannot_be_assigned_in_body() {
    let result = classify("n = 0;\nforeach (i in 1:3) { i = 2; n += i; }\ndest = n + src;");
    assert_eq!(
        codes(&result),
        vec![(ErrorCode::AssignmentToLoopVar, "i".to_string())]
    );
    assert_eq!(result.roles.get("i"), Some(VarRole::Local));
}

#[test]
fn image_cannot_be_a_loop_variable() {
    let result = classify("dest = src;\nforeach (dest in 1:3) { n = dest; }");
    assert_eq!(
        codes(&result),
        vec![(ErrorCode::ImageAsLoopVar, "dest".to_string())]
    );
    assert_eq!(result.roles.get("dest"), Some(VarRole::Dest));

    let result = classify("foreach (src in 1:3) { n = src; }\ndest = 1;");
    assert_eq!(
        codes(&result),
        vec![(ErrorCode::ImageAsLoopVar, "src".to_string())]
    );
    assert_eq!(result.roles.get("src"), Some(VarRole::Source));
}

#[test]
fn implicit_source_cannot_be_a_loop_variable() {
    let result = classify_with(
        "dest = other;\nforeach (other in 1:2) { dest = other; }",
        &params(&[("dest", ImageRole::Dest)]),
        true,
    );
    assert!(codes(&result).contains(&(ErrorCode::ImageAsLoopVar, "other".to_string())));
    assert!(result.diagnostics.has_errors());
}

#[test]
fn unused_image_is_only_a_warning() {
    let mut declared = standard_params();
    declared.insert("other".into(), ImageRole::Source);
    let result = classify_with("dest = src;", &declared, false);
    assert_eq!(
        codes(&result),
        vec![(ErrorCode::ImageNotUsed, "other".to_string())]
    );
    assert!(!result.diagnostics.has_errors());
}

#[test]
fn pixel_syntax_needs_an_image() {
    let result = classify("n = 1;\ndest = n[0] + src[1, 1];");
    assert_eq!(codes(&result), vec![(ErrorCode::NotAnImage, "n".to_string())]);
}

#[test]
fn dest_cannot_be_written_at_an_offset() {
    let result = classify("dest[0][1, 0] = src;");
    assert_eq!(codes(&result), vec![(ErrorCode::DestOffset, "dest".to_string())]);
    let ok = classify("dest[0][0, 0] = src;");
    assert!(ok.diagnostics.is_empty(), "{}", ok.diagnostics);
}

#[test]
fn implicit_sources_are_inferred_when_enabled() {
    let result = classify_with("dest = src + extra;", &standard_params(), true);
    assert_eq!(
        codes(&result),
        vec![(ErrorCode::ImplicitSource, "extra".to_string())]
    );
    assert!(!result.diagnostics.has_errors());
    assert_eq!(result.roles.get("extra"), Some(VarRole::Source));
    let images: Vec<_> = result.roles.images().map(|(name, _)| name).collect();
    assert_eq!(images, vec!["dest", "extra", "src"]);
}

#[test]
fn implicit_source_cannot_then_be_assigned() {
    let result = classify_with("dest = extra;\nextra = 1;", &standard_params(), true);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == ErrorCode::AssignmentToSrcImage && d.name == "extra"));
}
