//! Readable listing of a final tree, for inspecting what a script compiles to.

use super::{CodeGenError, EvaluationModel, ImageSlot};
use crate::language::ast::*;

/// Renders the procedure for `model` as pseudo-source.
///
/// When `script` is given it is reproduced as a doc block above the listing,
/// one trimmed non-empty line at a time.
pub fn render(
    tree: &Script,
    model: EvaluationModel,
    name: &str,
    images: &[ImageSlot],
    script: Option<&str>,
) -> Result<String, CodeGenError> {
    let mut body = String::new();
    let entry = match model {
        EvaluationModel::Direct => "fn evaluate(x, y) {",
        EvaluationModel::Indirect => "fn evaluate_all(progress) {",
    };
    body.push_str(entry);
    body.push('\n');
    if model == EvaluationModel::Indirect {
        body.push_str("for y in 0..height {\nfor x in 0..width {\n");
    }
    for stmt in &tree.statements {
        statement(&mut body, stmt)?;
    }
    if model == EvaluationModel::Indirect {
        body.push_str("}\nprogress(y);\n}\n");
    }
    body.push_str("}\n");

    let mut out = String::new();
    if let Some(script) = script {
        out.push_str(&doc_block(script));
    }
    push_line(&mut out, format!("procedure {name} ({model}) {{"));
    for slot in images {
        push_line(&mut out, format!("    image {}: {};", slot.name, slot.role));
    }
    out.push_str(&indent_lines(&body, 4));
    out.push_str("}\n");
    Ok(out)
}

fn doc_block(text: &str) -> String {
    let mut out = String::from("/**\n");
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        push_line(&mut out, format!(" * {line}"));
    }
    out.push_str(" */\n");
    out
}

/// Re-indents line-oriented source: lines ending in `{` open a level and
/// lines starting with `}` close one.
fn indent_lines(source: &str, base: usize) -> String {
    let mut out = String::new();
    let mut indent = base;
    for line in source.lines().map(str::trim) {
        if line.starts_with('}') {
            indent = indent.saturating_sub(4);
        }
        push_line(&mut out, format!("{:indent$}{line}", ""));
        if line.ends_with('{') {
            indent += 4;
        }
    }
    out
}

fn statement(out: &mut String, stmt: &Statement) -> Result<(), CodeGenError> {
    match stmt {
        Statement::Assign(assign) => match (&assign.target, assign.op) {
            (AssignTarget::Local(ident), AssignOp::Assign) => {
                push_line(out, format!("{} = {};", ident.name, render_expr(&assign.value)?));
            }
            (target, op) => {
                return Err(CodeGenError::new(
                    format!("assignment `{} {}`", target.name().name, op.symbol()),
                    assign.span,
                ))
            }
        },
        Statement::Expr(stmt) => {
            push_line(out, format!("{};", render_expr(&stmt.expr)?));
        }
        Statement::Block(block) => {
            out.push_str("{\n");
            for stmt in &block.statements {
                statement(out, stmt)?;
            }
            out.push_str("}\n");
        }
        Statement::If(stmt) => {
            push_line(out, format!("if ({}) {{", render_expr(&stmt.condition)?));
            nested(out, &stmt.then_branch)?;
            if let Some(else_branch) = &stmt.else_branch {
                out.push_str("} else {\n");
                nested(out, else_branch)?;
            }
            out.push_str("}\n");
        }
        Statement::While(stmt) => {
            push_line(out, format!("while ({}) {{", render_expr(&stmt.condition)?));
            nested(out, &stmt.body)?;
            out.push_str("}\n");
        }
        Statement::Foreach(stmt) => {
            let header = format!(
                "foreach ({} in {} : {}) {{",
                stmt.var.name,
                render_expr(&stmt.start)?,
                render_expr(&stmt.end)?
            );
            push_line(out, header);
            nested(out, &stmt.body)?;
            out.push_str("}\n");
        }
        Statement::Break(_) => out.push_str("break;\n"),
        Statement::BreakIf(stmt) => {
            push_line(out, format!("breakif ({});", render_expr(&stmt.condition)?));
        }
        Statement::WriteImage(stmt) => {
            let write = format!(
                "write({}, {}, {});",
                stmt.image.name,
                render_expr(&stmt.band)?,
                render_expr(&stmt.value)?
            );
            push_line(out, write);
        }
    }
    Ok(())
}

fn push_line(out: &mut String, line: String) {
    out.push_str(&line);
    out.push('\n');
}

/// Block bodies are flattened into the enclosing braces.
fn nested(out: &mut String, stmt: &Statement) -> Result<(), CodeGenError> {
    match stmt {
        Statement::Block(block) => {
            for stmt in &block.statements {
                statement(out, stmt)?;
            }
            Ok(())
        }
        other => statement(out, other),
    }
}

fn render_expr(expr: &Expr) -> Result<String, CodeGenError> {
    Ok(match expr {
        Expr::Number(value, _) => number(*value),
        Expr::Local(ident) => ident.name.clone(),
        Expr::Positional(positional, _) => positional.name().to_string(),
        Expr::ReadImage {
            image, band, x, y, ..
        } => format!(
            "read({}, {}, {}, {})",
            image.name,
            render_expr(band)?,
            render_expr(x)?,
            render_expr(y)?
        ),
        Expr::ReadDest { image, band, .. } => format!("written({}, {})", image.name, render_expr(band)?),
        Expr::Unary { op, expr: inner, .. } => format!("{}{}", op.symbol(), render_expr(inner)?),
        Expr::Binary {
            op, left, right, ..
        } => format!("({} {} {})", render_expr(left)?, op.symbol(), render_expr(right)?),
        Expr::Call { name, args, .. } => {
            let args = args.iter().map(render_expr).collect::<Result<Vec<_>, _>>()?;
            format!("{}({})", name.name, args.join(", "))
        }
        Expr::Variable(ident) => {
            return Err(CodeGenError::new(
                format!("unresolved variable `{}`", ident.name),
                ident.span,
            ))
        }
        Expr::Pixel(pixel) => {
            return Err(CodeGenError::new(
                format!("unresolved pixel reference `{}[..]`", pixel.image.name),
                pixel.span,
            ))
        }
        Expr::Ternary { span, .. } => {
            return Err(CodeGenError::new("unlowered ternary expression", *span))
        }
    })
}

fn number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_on_braces() {
        let text = indent_lines("a {\nb;\n}\n", 0);
        assert_eq!(text, "a {\n    b;\n}\n");
    }

    #[test]
    fn doc_block_skips_blank_lines() {
        let text = doc_block("  dest = 1;\n\n   \n  x = 2;");
        assert_eq!(text, "/**\n * dest = 1;\n * x = 2;\n */\n");
    }

    #[test]
    fn whole_numbers_keep_a_decimal_point() {
        assert_eq!(number(2.0), "2.0");
        assert_eq!(number(0.5), "0.5");
        assert_eq!(number(f64::NAN), "NaN");
    }
}
