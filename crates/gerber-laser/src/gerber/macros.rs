use std::collections::HashMap;

use log::warn;

use crate::error::GerberError;
use crate::geometry::path::PathPrimitive;
use crate::geometry::shapes::{centered_rectangle, regular_polygon, rotate_point, stroke_rectangle};
use crate::types::Point;

/// Expression node for macro parameter evaluation.
/// Supports literals, variable references ($1, $2, ...) and arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    Variable(u32), // $1 = Variable(1)
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate against the current variable bindings.
    ///
    /// Returns `None` for unbound variables, division by zero and any
    /// non-finite intermediate result.
    pub fn eval(&self, vars: &HashMap<u32, f64>) -> Option<f64> {
        let v = match self {
            Expr::Literal(v) => *v,
            Expr::Variable(idx) => *vars.get(idx)?,
            Expr::Neg(a) => -a.eval(vars)?,
            Expr::Add(a, b) => a.eval(vars)? + b.eval(vars)?,
            Expr::Sub(a, b) => a.eval(vars)? - b.eval(vars)?,
            Expr::Mul(a, b) => a.eval(vars)? * b.eval(vars)?,
            Expr::Div(a, b) => {
                let denom = b.eval(vars)?;
                if denom == 0.0 {
                    return None;
                }
                a.eval(vars)? / denom
            }
        };
        v.is_finite().then_some(v)
    }
}

/// A single primitive within an aperture macro. Coordinates are in file
/// units relative to the macro origin; rotations are degrees about that origin.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroPrimitive {
    /// Code 1
    Circle {
        exposure: Expr,
        diameter: Expr,
        center: (Expr, Expr),
        rotation: Option<Expr>,
    },
    /// Code 20 (or legacy 2): a thick segment with butt ends
    VectorLine {
        exposure: Expr,
        width: Expr,
        start: (Expr, Expr),
        end: (Expr, Expr),
        rotation: Expr,
    },
    /// Code 4: closed polygon through the listed vertices
    Outline {
        exposure: Expr,
        vertices: Vec<(Expr, Expr)>,
        rotation: Expr,
    },
    /// Code 21
    CenterRectangle {
        exposure: Expr,
        width: Expr,
        height: Expr,
        center: (Expr, Expr),
        rotation: Expr,
    },
    /// Code 5: regular polygon
    Polygon {
        exposure: Expr,
        vertices: Expr,
        center: (Expr, Expr),
        diameter: Expr,
        rotation: Expr,
    },
    /// Moiré (6), thermal (7) and anything else; skipped at flash time.
    Unsupported { code: u32 },
}

/// One line of a macro body, evaluated in order.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroStatement {
    Primitive(MacroPrimitive),
    /// `$n=<expr>`
    Assign { index: u32, expr: Expr },
}

/// An aperture macro definition (from %AM...% blocks).
#[derive(Debug, Clone, PartialEq)]
pub struct MacroTemplate {
    pub name: String,
    pub statements: Vec<MacroStatement>,
}

/// Table of macro definitions, keyed by name.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, MacroTemplate>,
}

impl MacroTable {
    pub fn define(&mut self, template: MacroTemplate) {
        self.macros.insert(template.name.clone(), template);
    }

    pub fn get(&self, name: &str) -> Option<&MacroTemplate> {
        self.macros.get(name)
    }
}

// ─── Expression Parser ──────────────────────────────────────────────

/// Parse a Gerber macro expression string into an Expr tree.
/// Gerber uses 'x' or 'X' for multiplication (not '*' which is the statement terminator).
pub fn parse_expr(s: &str) -> Result<Expr, GerberError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(GerberError::ParseError("AM expr: empty field".into()));
    }
    let tokens = tokenize_expr(s)?;
    let (expr, rest) = parse_add_sub(&tokens)?;
    if !rest.is_empty() {
        return Err(GerberError::ParseError(format!(
            "AM expr: unexpected tokens after expression: {s}"
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum ExprToken {
    Num(f64),
    Var(u32),
    Plus,
    Minus,
    Mul,
    Div,
    LParen,
    RParen,
}

fn tokenize_expr(s: &str) -> Result<Vec<ExprToken>, GerberError> {
    let mut tokens = Vec::new();
    let mut chars = s.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        match ch {
            ' ' | '\t' => {}
            '+' => tokens.push(ExprToken::Plus),
            '-' => tokens.push(ExprToken::Minus),
            'x' | 'X' => tokens.push(ExprToken::Mul),
            '/' => tokens.push(ExprToken::Div),
            '(' => tokens.push(ExprToken::LParen),
            ')' => tokens.push(ExprToken::RParen),
            '$' => {
                let mut end = start + 1;
                while let Some(&(i, c)) = chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    end = i + 1;
                    chars.next();
                }
                let idx: u32 = s[start + 1..end].parse().map_err(|_| {
                    GerberError::ParseError(format!("AM expr: bad variable in: {s}"))
                })?;
                tokens.push(ExprToken::Var(idx));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + 1;
                while let Some(&(i, c)) = chars.peek() {
                    if !(c.is_ascii_digit() || c == '.') {
                        break;
                    }
                    end = i + 1;
                    chars.next();
                }
                let num = &s[start..end];
                let val: f64 = num
                    .parse()
                    .map_err(|_| GerberError::ParseError(format!("AM expr: bad number: {num}")))?;
                tokens.push(ExprToken::Num(val));
            }
            _ => {
                return Err(GerberError::ParseError(format!(
                    "AM expr: unexpected char '{ch}' in: {s}"
                )));
            }
        }
    }

    Ok(tokens)
}

// Recursive descent: add/sub -> mul/div -> unary -> atom
fn parse_add_sub(tokens: &[ExprToken]) -> Result<(Expr, &[ExprToken]), GerberError> {
    let (mut left, mut rest) = parse_mul_div(tokens)?;
    loop {
        match rest.first() {
            Some(ExprToken::Plus) => {
                let (right, r) = parse_mul_div(&rest[1..])?;
                left = Expr::Add(Box::new(left), Box::new(right));
                rest = r;
            }
            Some(ExprToken::Minus) => {
                let (right, r) = parse_mul_div(&rest[1..])?;
                left = Expr::Sub(Box::new(left), Box::new(right));
                rest = r;
            }
            _ => break,
        }
    }
    Ok((left, rest))
}

fn parse_mul_div(tokens: &[ExprToken]) -> Result<(Expr, &[ExprToken]), GerberError> {
    let (mut left, mut rest) = parse_unary(tokens)?;
    loop {
        match rest.first() {
            Some(ExprToken::Mul) => {
                let (right, r) = parse_unary(&rest[1..])?;
                left = Expr::Mul(Box::new(left), Box::new(right));
                rest = r;
            }
            Some(ExprToken::Div) => {
                let (right, r) = parse_unary(&rest[1..])?;
                left = Expr::Div(Box::new(left), Box::new(right));
                rest = r;
            }
            _ => break,
        }
    }
    Ok((left, rest))
}

fn parse_unary(tokens: &[ExprToken]) -> Result<(Expr, &[ExprToken]), GerberError> {
    match tokens.first() {
        Some(ExprToken::Minus) => {
            let (inner, rest) = parse_unary(&tokens[1..])?;
            let expr = match inner {
                Expr::Literal(v) => Expr::Literal(-v),
                other => Expr::Neg(Box::new(other)),
            };
            Ok((expr, rest))
        }
        Some(ExprToken::Plus) => parse_unary(&tokens[1..]),
        _ => parse_atom(tokens),
    }
}

fn parse_atom(tokens: &[ExprToken]) -> Result<(Expr, &[ExprToken]), GerberError> {
    match tokens.first() {
        Some(ExprToken::Num(v)) => Ok((Expr::Literal(*v), &tokens[1..])),
        Some(ExprToken::Var(idx)) => Ok((Expr::Variable(*idx), &tokens[1..])),
        Some(ExprToken::LParen) => {
            let (expr, rest) = parse_add_sub(&tokens[1..])?;
            match rest.first() {
                Some(ExprToken::RParen) => Ok((expr, &rest[1..])),
                _ => Err(GerberError::ParseError(
                    "AM expr: missing closing paren".into(),
                )),
            }
        }
        _ => Err(GerberError::ParseError(
            "AM expr: unexpected end of expression".into(),
        )),
    }
}

// ─── Macro Body Parser ──────────────────────────────────────────────

/// Parse the body lines of an aperture macro.
///
/// Each line is a comma-separated primitive like `5,1,8,0,0,1.08239X$1,22.5`
/// or an assignment like `$3=$1x2`. Malformed lines are logged and skipped.
pub fn parse_macro_body(name: &str, lines: &[String]) -> MacroTemplate {
    let mut statements = Vec::new();

    for line in lines {
        let trimmed = line.trim();
        // Comment lines start with "0"
        if trimmed.is_empty() || trimmed == "0" || trimmed.starts_with("0 ") {
            continue;
        }
        match parse_statement(trimmed) {
            Ok(MacroStatement::Primitive(MacroPrimitive::Unsupported { code })) => {
                warn!("Gerber: macro {name}: primitive code {code} not supported, skipping it");
                statements.push(MacroStatement::Primitive(MacroPrimitive::Unsupported {
                    code,
                }));
            }
            Ok(stmt) => statements.push(stmt),
            Err(e) => warn!("Gerber: macro {name}: skipping {trimmed:?}: {e}"),
        }
    }

    MacroTemplate {
        name: name.to_string(),
        statements,
    }
}

fn parse_statement(line: &str) -> Result<MacroStatement, GerberError> {
    if let Some(assign) = line.strip_prefix('$') {
        let (var, expr) = assign
            .split_once('=')
            .ok_or_else(|| GerberError::ParseError("AM: assignment without '='".into()))?;
        let index: u32 = var
            .trim()
            .parse()
            .map_err(|_| GerberError::ParseError(format!("AM: bad variable ${var}")))?;
        return Ok(MacroStatement::Assign {
            index,
            expr: parse_expr(expr)?,
        });
    }

    let code_str = line.split(',').next().unwrap_or_default().trim();
    let code: u32 = code_str
        .parse()
        .map_err(|_| GerberError::ParseError(format!("AM: bad primitive code: {code_str}")))?;

    let parse_fields = || -> Result<Vec<Expr>, GerberError> {
        line.split(',').skip(1).map(parse_expr).collect()
    };
    let prim = match code {
        1 => {
            // exposure, diameter, center_x, center_y [, rotation]
            let e = parse_fields()?;
            need(&e, 4, "circle")?;
            MacroPrimitive::Circle {
                exposure: e[0].clone(),
                diameter: e[1].clone(),
                center: (e[2].clone(), e[3].clone()),
                rotation: e.get(4).cloned(),
            }
        }
        2 | 20 => {
            // exposure, width, start_x, start_y, end_x, end_y, rotation
            let e = parse_fields()?;
            need(&e, 7, "vector line")?;
            MacroPrimitive::VectorLine {
                exposure: e[0].clone(),
                width: e[1].clone(),
                start: (e[2].clone(), e[3].clone()),
                end: (e[4].clone(), e[5].clone()),
                rotation: e[6].clone(),
            }
        }
        21 => {
            // exposure, width, height, center_x, center_y, rotation
            let e = parse_fields()?;
            need(&e, 6, "center rectangle")?;
            MacroPrimitive::CenterRectangle {
                exposure: e[0].clone(),
                width: e[1].clone(),
                height: e[2].clone(),
                center: (e[3].clone(), e[4].clone()),
                rotation: e[5].clone(),
            }
        }
        4 => parse_outline(parse_fields()?)?,
        5 => {
            // exposure, n_vertices, center_x, center_y, diameter, rotation
            let e = parse_fields()?;
            need(&e, 6, "polygon")?;
            MacroPrimitive::Polygon {
                exposure: e[0].clone(),
                vertices: e[1].clone(),
                center: (e[2].clone(), e[3].clone()),
                diameter: e[4].clone(),
                rotation: e[5].clone(),
            }
        }
        // Fields of unsupported primitives are never evaluated, so they are not parsed
        code => MacroPrimitive::Unsupported { code },
    };

    Ok(MacroStatement::Primitive(prim))
}

fn need(exprs: &[Expr], n: usize, what: &str) -> Result<(), GerberError> {
    if exprs.len() < n {
        return Err(GerberError::ParseError(format!(
            "AM {what}: need {n} params, got {}",
            exprs.len()
        )));
    }
    Ok(())
}

/// Outline: exposure, n, x0, y0, ..., xn, yn, rotation (n+1 vertex pairs).
fn parse_outline(e: Vec<Expr>) -> Result<MacroPrimitive, GerberError> {
    if e.len() < 2 {
        return Err(GerberError::ParseError("AM outline: missing fields".into()));
    }
    let coords = &e[2..];
    // A constant vertex count must agree with the fields; otherwise infer it
    let pairs = match e[1].eval(&HashMap::new()) {
        Some(n) if n >= 0.0 => {
            // Compared as f64 so a huge count never reaches usize arithmetic
            let declared = n.round();
            let available = coords.len().saturating_sub(1) / 2;
            if declared + 1.0 > available as f64 {
                return Err(GerberError::ParseError(format!(
                    "AM outline: {declared} vertices declared, {} fields present",
                    coords.len()
                )));
            }
            declared as usize + 1
        }
        _ => coords.len().saturating_sub(1) / 2,
    };
    if pairs < 3 {
        return Err(GerberError::ParseError("AM outline: too few vertices".into()));
    }
    let vertices = (0..pairs)
        .map(|k| (coords[k * 2].clone(), coords[k * 2 + 1].clone()))
        .collect();
    Ok(MacroPrimitive::Outline {
        exposure: e[0].clone(),
        vertices,
        rotation: coords[pairs * 2].clone(),
    })
}

// ─── Macro Evaluation (flash-time) ──────────────────────────────────

/// Evaluate an aperture macro at a flash position.
///
/// `params` bind to `$1..$n`. Geometry is rotated about the macro origin,
/// multiplied by `scale` (file units to mm) and translated to `origin`.
/// Primitives that fail to evaluate are dropped; the rest are kept.
pub fn evaluate_macro(
    template: &MacroTemplate,
    params: &[f64],
    scale: f64,
    origin: Point,
) -> Vec<PathPrimitive> {
    let mut vars: HashMap<u32, f64> = params
        .iter()
        .enumerate()
        .map(|(i, v)| (i as u32 + 1, *v))
        .collect();
    let mut out = Vec::new();

    for stmt in &template.statements {
        match stmt {
            MacroStatement::Assign { index, expr } => match expr.eval(&vars) {
                Some(v) => {
                    vars.insert(*index, v);
                }
                None => warn!(
                    "Gerber: macro {}: cannot evaluate ${index}, leaving it unbound",
                    template.name
                ),
            },
            MacroStatement::Primitive(MacroPrimitive::Unsupported { .. }) => {}
            MacroStatement::Primitive(prim) => match evaluate_primitive(prim, &vars) {
                Some(Some(local)) => out.push(place(local, scale, origin)),
                Some(None) => {} // exposure off or degenerate
                None => warn!(
                    "Gerber: macro {}: dropping primitive with unresolvable fields",
                    template.name
                ),
            },
        }
    }

    out
}

/// Evaluated primitive in macro coordinates, rotation already applied.
enum LocalShape {
    Circle { center: Point, radius: f64 },
    Polygon(Vec<Point>),
}

fn eval_point(p: &(Expr, Expr), vars: &HashMap<u32, f64>) -> Option<Point> {
    Some([p.0.eval(vars)?, p.1.eval(vars)?])
}

fn rotated(points: Vec<Point>, rotation: f64) -> Vec<Point> {
    points
        .into_iter()
        .map(|p| rotate_point(p, rotation))
        .collect()
}

/// `None` when a field cannot be evaluated, `Some(None)` when the primitive
/// evaluates fine but produces nothing.
fn evaluate_primitive(
    prim: &MacroPrimitive,
    vars: &HashMap<u32, f64>,
) -> Option<Option<LocalShape>> {
    let exposure = match prim {
        MacroPrimitive::Circle { exposure, .. }
        | MacroPrimitive::VectorLine { exposure, .. }
        | MacroPrimitive::Outline { exposure, .. }
        | MacroPrimitive::CenterRectangle { exposure, .. }
        | MacroPrimitive::Polygon { exposure, .. } => exposure.eval(vars)?,
        MacroPrimitive::Unsupported { .. } => return Some(None),
    };
    if exposure < 0.5 {
        return Some(None);
    }

    let shape = match prim {
        MacroPrimitive::Circle {
            diameter,
            center,
            rotation,
            ..
        } => {
            let radius = diameter.eval(vars)?.abs() / 2.0;
            let rot = match rotation {
                Some(r) => r.eval(vars)?,
                None => 0.0,
            };
            let center = rotate_point(eval_point(center, vars)?, rot);
            (radius > 0.0).then_some(LocalShape::Circle { center, radius })
        }
        MacroPrimitive::VectorLine {
            width,
            start,
            end,
            rotation,
            ..
        } => {
            let w = width.eval(vars)?;
            let (s, e) = (eval_point(start, vars)?, eval_point(end, vars)?);
            let rot = rotation.eval(vars)?;
            stroke_rectangle(s, e, w).map(|pts| LocalShape::Polygon(rotated(pts, rot)))
        }
        MacroPrimitive::CenterRectangle {
            width,
            height,
            center,
            rotation,
            ..
        } => {
            let (w, h) = (width.eval(vars)?, height.eval(vars)?);
            let c = eval_point(center, vars)?;
            let rot = rotation.eval(vars)?;
            (w > 0.0 && h > 0.0)
                .then(|| LocalShape::Polygon(rotated(centered_rectangle(c, w, h), rot)))
        }
        MacroPrimitive::Outline {
            vertices, rotation, ..
        } => {
            let mut pts = vertices
                .iter()
                .map(|v| eval_point(v, vars))
                .collect::<Option<Vec<_>>>()?;
            let rot = rotation.eval(vars)?;
            // The closing vertex repeats the first one
            if pts.len() > 1 && pts.first() == pts.last() {
                pts.pop();
            }
            (pts.len() >= 3).then(|| LocalShape::Polygon(rotated(pts, rot)))
        }
        MacroPrimitive::Polygon {
            vertices,
            center,
            diameter,
            rotation,
            ..
        } => {
            let n = vertices.eval(vars)?.round();
            if !(3.0..=12.0).contains(&n) {
                return None;
            }
            let c = eval_point(center, vars)?;
            let d = diameter.eval(vars)?;
            let rot = rotation.eval(vars)?;
            let pts = regular_polygon(c, d, n as u32, 0.0);
            (d > 0.0).then(|| LocalShape::Polygon(rotated(pts, rot)))
        }
        MacroPrimitive::Unsupported { .. } => None,
    };

    Some(shape)
}

fn place(local: LocalShape, scale: f64, origin: Point) -> PathPrimitive {
    let tx = |p: Point| [origin[0] + p[0] * scale, origin[1] + p[1] * scale];
    match local {
        LocalShape::Circle { center, radius } => PathPrimitive::Circle {
            center: tx(center),
            radius: radius * scale,
        },
        LocalShape::Polygon(pts) => {
            PathPrimitive::FilledPolygon(pts.into_iter().map(tx).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes::contour_area;
    use crate::types::shapes_bbox;
    use approx::assert_abs_diff_eq;

    fn eval(s: &str, params: &[f64]) -> Option<f64> {
        let vars = params
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u32 + 1, *v))
            .collect();
        parse_expr(s).unwrap().eval(&vars)
    }

    fn template(lines: &[&str]) -> MacroTemplate {
        let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        parse_macro_body("TEST", &lines)
    }

    #[test]
    fn test_expr_literal_and_variable() {
        assert_abs_diff_eq!(eval("42.5", &[]).unwrap(), 42.5);
        assert_abs_diff_eq!(eval("$1", &[3.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_expr_multiply() {
        assert_abs_diff_eq!(eval("1.08239X$1", &[0.1]).unwrap(), 0.108239, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("2x3", &[]).unwrap(), 6.0);
    }

    #[test]
    fn test_expr_precedence_and_parentheses() {
        assert_abs_diff_eq!(eval("2+3x4", &[]).unwrap(), 14.0);
        assert_abs_diff_eq!(eval("(2+3)x4", &[]).unwrap(), 20.0);
        assert_abs_diff_eq!(eval("$1+$2-1.0", &[3.0, 5.0]).unwrap(), 7.0);
        assert_abs_diff_eq!(eval("10/4/5", &[]).unwrap(), 0.5);
    }

    #[test]
    fn test_expr_unary_minus() {
        assert_abs_diff_eq!(eval("-1.5", &[]).unwrap(), -1.5);
        assert_abs_diff_eq!(eval("-$1", &[2.0]).unwrap(), -2.0);
        assert_abs_diff_eq!(eval("3x-(1+1)", &[]).unwrap(), -6.0);
        assert_abs_diff_eq!(eval("$1--1", &[1.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_expr_unresolvable() {
        assert_eq!(eval("$3", &[1.0]), None);
        assert_eq!(eval("1/0", &[]), None);
        assert_eq!(eval("1/($1-$1)", &[2.0]), None);
    }

    #[test]
    fn test_expr_parse_errors() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("(1+2").is_err());
        assert!(parse_expr("1+").is_err());
        assert!(parse_expr("1 2").is_err());
        assert!(parse_expr("abc").is_err());
    }

    #[test]
    fn test_parse_body_kinds() {
        let t = template(&[
            "0 comment line",
            "1,1,$1,0,0",
            "20,1,0.2,0,0,1,0,0",
            "21,1,0.5,0.3,0,0,0",
            "4,1,3,0,0,1,0,1,1,0,0,0",
            "5,1,8,0,0,1.08239X$1,22.5",
            "7,0,0,1,0.8,0.1,0",
            "$2=$1x2",
        ]);
        assert_eq!(t.statements.len(), 7);
        assert!(matches!(
            t.statements[0],
            MacroStatement::Primitive(MacroPrimitive::Circle { .. })
        ));
        assert!(matches!(
            t.statements[3],
            MacroStatement::Primitive(MacroPrimitive::Outline { ref vertices, .. }) if vertices.len() == 4
        ));
        assert_eq!(
            t.statements[5],
            MacroStatement::Primitive(MacroPrimitive::Unsupported { code: 7 })
        );
        assert!(matches!(t.statements[6], MacroStatement::Assign { index: 2, .. }));
    }

    #[test]
    fn test_parse_body_skips_malformed_lines() {
        let t = template(&["1,1", "bogus", "4,1,5,0,0,1,1", "1,1,0.5,0,0"]);
        assert_eq!(t.statements.len(), 1);
    }

    #[test]
    fn test_outline_with_huge_vertex_count_dropped() {
        let t = template(&["4,1,99999999999999999999999,0,0,1,0,1,1,0,0,0", "1,1,0.5,0,0"]);
        assert_eq!(t.statements.len(), 1);
        assert!(matches!(
            t.statements[0],
            MacroStatement::Primitive(MacroPrimitive::Circle { .. })
        ));
        // Count one past what the fields hold
        let t = template(&["4,1,4,0,0,1,0,1,1,0,0,0"]);
        assert!(t.statements.is_empty());
    }

    #[test]
    fn test_evaluate_circle_macro() {
        let t = template(&["1,1,$1,0,0"]);
        let prims = evaluate_macro(&t, &[0.5], 1.0, [10.0, 20.0]);
        assert_eq!(
            prims,
            vec![PathPrimitive::Circle {
                center: [10.0, 20.0],
                radius: 0.25
            }]
        );
    }

    #[test]
    fn test_evaluate_scaled_and_rotated_rectangle() {
        // 2 x 1 rectangle centred 1 unit right of the origin, rotated 90 degrees, in inches
        let t = template(&["21,1,2,1,1,0,90"]);
        let prims = evaluate_macro(&t, &[], 25.4, [0.0, 0.0]);
        assert_eq!(prims.len(), 1);
        let PathPrimitive::FilledPolygon(pts) = &prims[0] else {
            panic!("expected FilledPolygon, got: {:?}", prims[0]);
        };
        let bbox = shapes_bbox(&[vec![pts.clone()]]);
        assert_abs_diff_eq!(bbox.x(), -12.7, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.y(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.width(), 25.4, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.height(), 50.8, epsilon = 1e-9);
    }

    #[test]
    fn test_evaluate_polygon_macro() {
        // The OC8 macro from EAGLE
        let t = template(&["5,1,8,0,0,1.08239X$1,22.5"]);
        let prims = evaluate_macro(&t, &[1.0], 1.0, [5.0, 5.0]);
        match &prims[0] {
            PathPrimitive::FilledPolygon(pts) => assert_eq!(pts.len(), 8),
            other => panic!("expected FilledPolygon, got: {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_outline_and_vector_line() {
        let t = template(&["4,1,3,0,0,1,0,1,1,0,0,0", "20,1,0.2,0,0,2,0,0"]);
        let prims = evaluate_macro(&t, &[], 1.0, [0.0, 0.0]);
        assert_eq!(prims.len(), 2);
        match &prims[0] {
            PathPrimitive::FilledPolygon(pts) => {
                assert_eq!(pts.len(), 3);
                assert_abs_diff_eq!(contour_area(pts), 0.5);
            }
            other => panic!("expected FilledPolygon, got: {other:?}"),
        }
        match &prims[1] {
            PathPrimitive::FilledPolygon(pts) => {
                assert_abs_diff_eq!(contour_area(pts).abs(), 0.4, epsilon = 1e-12)
            }
            other => panic!("expected FilledPolygon, got: {other:?}"),
        }
    }

    #[test]
    fn test_assignment_feeds_later_primitives() {
        let t = template(&["$2=$1x2", "1,1,$2,0,0"]);
        let prims = evaluate_macro(&t, &[0.5], 1.0, [0.0, 0.0]);
        assert!(matches!(
            prims[0],
            PathPrimitive::Circle { radius, .. } if (radius - 0.5).abs() < 1e-12
        ));
    }

    #[test]
    fn test_unresolvable_primitive_dropped_rest_kept() {
        // $5 is never bound; the thermal is unsupported
        let t = template(&["1,1,$5,0,0", "7,0,0,1,0.8,0.1,0", "1,1,1,0,0"]);
        let prims = evaluate_macro(&t, &[0.3], 1.0, [0.0, 0.0]);
        assert_eq!(prims.len(), 1);
    }

    #[test]
    fn test_clear_exposure_skipped() {
        let t = template(&["1,0,1,0,0"]);
        assert!(evaluate_macro(&t, &[], 1.0, [0.0, 0.0]).is_empty());
    }
}
