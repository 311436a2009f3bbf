use super::*;
use crate::language::{
    ast::Script, classify::classify_variables, parser::parse_script, roles::VarRoles,
    transform::transform,
};
use std::collections::BTreeMap;

fn final_tree(source: &str) -> (Script, Vec<ImageSlot>) {
    let params: BTreeMap<String, ImageRole> = [
        ("src".to_string(), ImageRole::Source),
        ("dest".to_string(), ImageRole::Dest),
    ]
    .into_iter()
    .collect();
    let script = parse_script(source).expect("parse");
    let classification = classify_variables(&script, &params, false);
    assert!(!classification.diagnostics.has_errors());
    (
        transform(&script, &classification.roles),
        slots(&classification.roles),
    )
}

fn slots(roles: &VarRoles) -> Vec<ImageSlot> {
    roles
        .images()
        .map(|(name, role)| ImageSlot {
            name: name.to_string(),
            role,
        })
        .collect()
}

#[test]
fn direct_procedure_evaluates_once_and_halts() {
    let (tree, images) = final_tree("dest = src + 1;");
    let procedure = generate(&tree, EvaluationModel::Direct, images).expect("generate");
    assert_eq!(procedure.model, EvaluationModel::Direct);
    assert!(matches!(procedure.instructions.last(), Some(Instr::Halt)));
    assert!(!procedure
        .instructions
        .iter()
        .any(|instr| matches!(instr, Instr::SweepBegin(_) | Instr::SweepNext(_))));
    assert_eq!(procedure.image_index("dest"), Some(0));
    assert_eq!(procedure.image_index("src"), Some(1));
    assert_eq!(procedure.dest_slots().count(), 1);
}

#[test]
fn indirect_procedure_wraps_body_in_a_sweep() {
    let (tree, images) = final_tree("dest = src + 1;");
    let procedure = generate(&tree, EvaluationModel::Indirect, images).expect("generate");
    let halt = procedure.instructions.len() - 1;
    assert!(matches!(procedure.instructions[0], Instr::SweepBegin(t) if t == halt));
    assert!(matches!(procedure.instructions[halt - 1], Instr::SweepNext(1)));
}

#[test]
fn jump_targets_stay_in_bounds() {
    let (tree, images) = final_tree(
        "n = 0;\n\
         foreach (i in 1:4) { breakif (i > 2); n += i; }\n\
         while (n < 10) { n += 1; if (n == 7) break; }\n\
         dest = (src > 0 && n > 1) || src < -1 ? n : src;",
    );
    for model in [EvaluationModel::Direct, EvaluationModel::Indirect] {
        let procedure = generate(&tree, model, images.clone()).expect("generate");
        let len = procedure.instructions.len();
        for instr in &procedure.instructions {
            if let Some(target) = instr.jump_target() {
                assert!(target < len, "{instr:?} jumps out of {len}");
            }
        }
    }
}

#[test]
fn locals_include_temporaries_and_loop_bounds() {
    let (tree, images) = final_tree("foreach (i in 1:3) { n = i; }\ndest = src > 0 ? 1 : 2;");
    let procedure = generate(&tree, EvaluationModel::Direct, images).expect("generate");
    assert!(procedure.locals.contains(&"i".to_string()));
    assert!(procedure.locals.contains(&"n".to_string()));
    assert!(procedure.locals.contains(&"ternary$0".to_string()));
    assert!(procedure.locals.iter().any(|name| name.starts_with("foreach$")));
}

#[test]
fn primary_tree_nodes_are_rejected() {
    let script = parse_script("dest = src > 0 ? 1 : 2;").expect("parse");
    let images = vec![ImageSlot {
        name: "dest".to_string(),
        role: ImageRole::Dest,
    }];
    let err = generate(&script, EvaluationModel::Direct, images).expect_err("must fail");
    assert!(err.construct.contains("dest"), "{err}");
}

#[test]
fn unresolved_variable_is_rejected() {
    let (tree, images) = final_tree("dest = src;");
    let mut tree = tree;
    tree.statements.push(
        parse_script("q;")
            .expect("parse")
            .statements
            .remove(0),
    );
    let err = generate(&tree, EvaluationModel::Direct, images).expect_err("must fail");
    assert!(err.construct.contains("`q`"), "{err}");
}

#[test]
fn break_outside_loop_is_rejected() {
    let (tree, images) = final_tree("dest = src;");
    let mut tree = tree;
    tree.statements
        .push(crate::language::ast::Statement::Break(crate::language::span::Span::new(0, 0)));
    let err = generate(&tree, EvaluationModel::Direct, images).expect_err("must fail");
    assert!(err.construct.contains("break"));
}

#[test]
fn rendered_source_lists_images_and_writes() {
    let script_text = "// scale\ndest = src * 2;";
    let (tree, images) = final_tree(script_text);
    let text = source::render(
        &tree,
        EvaluationModel::Direct,
        "jiffle0",
        &images,
        Some(script_text),
    )
    .expect("render");
    assert!(text.starts_with("/**\n * // scale\n * dest = src * 2;\n */\n"));
    assert!(text.contains("procedure jiffle0 (direct) {"));
    assert!(text.contains("    image src: source;"));
    assert!(text.contains("        write(dest, 0.0, (read(src, 0.0, x, y) * 2.0));"));
}

#[test]
fn rendered_source_shows_loops_line_by_line() {
    let (tree, images) =
        final_tree("n = 0;\nforeach (i in 1:3) { breakif (i > 2); n += i; }\ndest = n;");
    let text = source::render(&tree, EvaluationModel::Direct, "loops", &images, None)
        .expect("render");
    assert!(text.contains("foreach (i in 1.0 : 3.0) {\n"), "{text}");
    assert!(text.contains("breakif ((i > 2.0));\n"), "{text}");
    assert!(text.contains("n = (n + i);\n"), "{text}");
    assert!(text.ends_with("}\n"));
}

#[test]
fn rendered_indirect_source_contains_the_sweep() {
    let (tree, images) = final_tree("dest = src;");
    let text = source::render(&tree, EvaluationModel::Indirect, "sweep", &images, None)
        .expect("render");
    assert!(!text.starts_with("/**"));
    assert!(text.contains("fn evaluate_all(progress) {"));
    assert!(text.contains("            for x in 0..width {"));
}

#[test]
fn evaluation_model_parses_case_insensitively() {
    assert_eq!("Direct".parse(), Ok(EvaluationModel::Direct));
    assert_eq!("indirect".parse(), Ok(EvaluationModel::Indirect));
    assert!("sideways".parse::<EvaluationModel>().is_err());
}
