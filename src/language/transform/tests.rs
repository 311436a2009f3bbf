use super::*;
use crate::language::{
    ast::*,
    classify::classify_variables,
    parser::parse_script,
    roles::ImageRole,
    visit::{walk_expr, walk_script, Visitor},
};
use std::collections::BTreeMap;

fn final_tree(source: &str) -> Script {
    let params: BTreeMap<String, ImageRole> = [
        ("src".to_string(), ImageRole::Source),
        ("src2".to_string(), ImageRole::Source),
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
    transform(&script, &classification.roles)
}

#[derive(Default)]
struct Census {
    ternaries: usize,
    variables: usize,
    pixels: usize,
    locals: Vec<String>,
}

impl Visitor for Census {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ternary { .. } => self.ternaries += 1,
            Expr::Variable(_) => self.variables += 1,
            Expr::Pixel(_) => self.pixels += 1,
            Expr::Local(ident) => self.locals.push(ident.name.clone()),
            _ => {}
        }
        walk_expr(self, expr);
    }
}

fn census(script: &Script) -> Census {
    let mut census = Census::default();
    walk_script(&mut census, script);
    census
}

#[test]
fn source_reference_reads_current_pixel_band_zero() {
    let script = final_tree("dest = src;");
    let Statement::WriteImage(write) = &script.statements[0] else {
        panic!("expected image write, got {:?}", script.statements[0]);
    };
    assert_eq!(write.image.name, "dest");
    assert!(matches!(write.band, Expr::Number(b, _) if b == 0.0));
    let Expr::ReadImage { image, band, x, y, .. } = &write.value else {
        panic!("expected image read, got {:?}", write.value);
    };
    assert_eq!(image.name, "src");
    assert!(matches!(**band, Expr::Number(b, _) if b == 0.0));
    assert!(matches!(**x, Expr::Positional(Positional::X, _)));
    assert!(matches!(**y, Expr::Positional(Positional::Y, _)));
}

#[test]
fn relative_offsets_are_added_and_absolute_pass_through() {
    let script = final_tree("dest = src[2][-1, $3];");
    let Statement::WriteImage(write) = &script.statements[0] else {
        panic!("expected image write");
    };
    let Expr::ReadImage { band, x, y, .. } = &write.value else {
        panic!("expected image read");
    };
    assert!(matches!(**band, Expr::Number(b, _) if b == 2.0));
    match &**x {
        Expr::Binary {
            op: BinaryOp::Add,
            left,
            right,
            ..
        } => {
            assert!(matches!(**left, Expr::Positional(Positional::X, _)));
            assert!(matches!(
                **right,
                Expr::Unary {
                    op: UnaryOp::Neg,
                    ..
                }
            ));
        }
        other => panic!("expected offset from x, got {other:?}"),
    }
    assert!(matches!(**y, Expr::Number(v, _) if v == 3.0));
}

#[test]
fn compound_assignment_to_dest_reads_back_the_written_value() {
    let script = final_tree("dest = src;\ndest += 1;");
    let Statement::WriteImage(write) = &script.statements[1] else {
        panic!("expected image write");
    };
    match &write.value {
        Expr::Binary {
            op: BinaryOp::Add,
            left,
            ..
        } => assert!(matches!(**left, Expr::ReadDest { .. })),
        other => panic!("expected dest + 1, got {other:?}"),
    }
}

#[test]
fn locals_and_constants_are_resolved() {
    let script = final_tree("n = M_PI;\nn *= 2;\ndest = n + src;");
    let Statement::Assign(first) = &script.statements[0] else {
        panic!("expected local assignment");
    };
    assert!(matches!(first.target, AssignTarget::Local(_)));
    assert!(matches!(first.value, Expr::Number(v, _) if v == std::f64::consts::PI));

    let Statement::Assign(second) = &script.statements[1] else {
        panic!("expected local assignment");
    };
    assert_eq!(second.op, AssignOp::Assign);
    assert!(matches!(
        second.value,
        Expr::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));

    let census = census(&script);
    assert_eq!(census.variables, 0);
    assert_eq!(census.pixels, 0);
}

#[test]
fn ternary_becomes_if_else_assigning_a_temporary() {
    let script = final_tree("dest = src > 0 ? src : 1 / src;");
    assert_eq!(script.statements.len(), 2);
    let Statement::If(stmt) = &script.statements[0] else {
        panic!("expected hoisted if, got {:?}", script.statements[0]);
    };
    assert!(stmt.else_branch.is_some());
    let Statement::WriteImage(write) = &script.statements[1] else {
        panic!("expected image write");
    };
    assert!(matches!(&write.value, Expr::Local(ident) if ident.name == "ternary$0"));
    assert_eq!(census(&script).ternaries, 0);
}

#[test]
fn nested_ternaries_get_distinct_temporaries() {
    let script = final_tree("dest = src > 0 ? (src > 1 ? 2 : 1) : 0;");
    let census = census(&script);
    assert_eq!(census.ternaries, 0);
    assert!(census.locals.contains(&"ternary$0".to_string()));
    assert!(census.locals.contains(&"ternary$1".to_string()));
}

#[test]
fn ternary_right_of_and_is_guarded_by_left_operand() {
    let script = final_tree("dest = src2 > 0 && (src > 0 ? 1 : 0);");
    // t = 0; if (src2 > 0) { if/else; t = ternary != 0; } dest = t;
    assert_eq!(script.statements.len(), 3);
    assert!(matches!(
        &script.statements[0],
        Statement::Assign(AssignStmt { value: Expr::Number(v, _), .. }) if *v == 0.0
    ));
    let Statement::If(guard) = &script.statements[1] else {
        panic!("expected guard, got {:?}", script.statements[1]);
    };
    assert!(guard.else_branch.is_none());
    assert!(matches!(
        guard.condition,
        Expr::Binary {
            op: BinaryOp::Gt,
            ..
        }
    ));
}

#[test]
fn ternary_right_of_or_runs_only_when_left_is_false() {
    let script = final_tree("dest = src2 > 0 || (src > 0 ? 1 : 0);");
    assert!(matches!(
        &script.statements[0],
        Statement::Assign(AssignStmt { value: Expr::Number(v, _), .. }) if *v == 1.0
    ));
    let Statement::If(guard) = &script.statements[1] else {
        panic!("expected guard");
    };
    assert!(matches!(
        guard.condition,
        Expr::Unary {
            op: UnaryOp::Not,
            ..
        }
    ));
}

#[test]
fn loop_condition_with_ternary_is_reevaluated_each_iteration() {
    let script = final_tree("n = 0;\nwhile ((n > 2 ? 0 : 1)) { n += 1; }\ndest = n + src;");
    let Statement::While(stmt) = &script.statements[1] else {
        panic!("expected while loop, got {:?}", script.statements[1]);
    };
    assert!(matches!(stmt.condition, Expr::Number(v, _) if v == 1.0));
    let Statement::Block(body) = &*stmt.body else {
        panic!("expected block body");
    };
    assert!(matches!(body.statements[0], Statement::If(_)));
    assert!(matches!(body.statements[1], Statement::BreakIf(_)));
}

#[test]
fn plain_short_circuit_is_left_alone() {
    let script = final_tree("dest = src > 0 && src2 > 0;");
    assert_eq!(script.statements.len(), 1);
    let Statement::WriteImage(write) = &script.statements[0] else {
        panic!("expected image write");
    };
    assert!(matches!(
        write.value,
        Expr::Binary {
            op: BinaryOp::And,
            ..
        }
    ));
}
