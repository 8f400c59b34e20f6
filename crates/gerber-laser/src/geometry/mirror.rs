//! Horizontal mirroring of serialized path data, for the back side of a board.

use crate::geometry::path::fmt_num;
use crate::types::BBox;

const ARC_FIELDS: usize = 7;
const ARC_SWEEP_FLAG: usize = 4;
const ARC_END_X: usize = 5;

/// One command letter with its raw operands.
#[derive(Debug, Clone, PartialEq)]
struct PathCommand {
    letter: char,
    operands: Vec<String>,
}

fn is_command(ch: char) -> bool {
    matches!(
        ch.to_ascii_uppercase(),
        'M' | 'L' | 'H' | 'V' | 'C' | 'S' | 'Q' | 'T' | 'A' | 'Z'
    )
}

/// A sign starts a new operand unless it belongs to an exponent.
fn starts_new_number(current: &str) -> bool {
    !current.is_empty() && !current.ends_with(['e', 'E'])
}

fn tokenize(path: &str) -> Vec<PathCommand> {
    let mut commands: Vec<PathCommand> = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, commands: &mut Vec<PathCommand>| {
        if !current.is_empty() {
            // Operands before any command letter have nothing to attach to
            if let Some(cmd) = commands.last_mut() {
                cmd.operands.push(std::mem::take(current));
            } else {
                current.clear();
            }
        }
    };

    for ch in path.chars() {
        match ch {
            c if is_command(c) => {
                flush(&mut current, &mut commands);
                commands.push(PathCommand {
                    letter: c,
                    operands: Vec::new(),
                });
            }
            ' ' | ',' | '\n' | '\r' | '\t' => flush(&mut current, &mut commands),
            '-' | '+' if starts_new_number(&current) => {
                flush(&mut current, &mut commands);
                current.push(ch);
            }
            '.' if current.contains('.') && !current.contains(['e', 'E']) => {
                flush(&mut current, &mut commands);
                current.push(ch);
            }
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut commands);
    commands
}

/// Which operand positions of a command carry an X value.
fn is_x_operand(letter: char, index: usize) -> bool {
    match letter.to_ascii_uppercase() {
        'M' | 'L' | 'C' | 'S' | 'Q' | 'T' => index % 2 == 0,
        'H' => true,
        'A' => index % ARC_FIELDS == ARC_END_X,
        _ => false,
    }
}

fn map_number(raw: &str, f: impl Fn(f64) -> f64) -> String {
    match raw.parse::<f64>() {
        Ok(v) => fmt_num(f(v)),
        Err(_) => raw.to_string(),
    }
}

fn flip_flag(raw: &str) -> String {
    match raw {
        "0" => "1".to_string(),
        "1" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Mirror path data about the vertical line through the centre of `bbox`.
///
/// Absolute X values become `c + (c - x)`, relative X deltas are negated,
/// Y is left alone and every arc's sweep direction flips. An empty box
/// leaves the path untouched.
pub fn mirror_path(path: &str, bbox: &BBox) -> String {
    if bbox.is_empty() {
        return path.to_string();
    }
    let c = bbox.center_x();

    let mut out: Vec<String> = Vec::new();
    for (n, cmd) in tokenize(path).into_iter().enumerate() {
        // A path that opens with `m` starts from an absolute point
        let leading_move = n == 0 && cmd.letter == 'm';
        let relative = cmd.letter.is_ascii_lowercase();

        out.push(cmd.letter.to_string());
        for (i, op) in cmd.operands.iter().enumerate() {
            let is_arc = cmd.letter.eq_ignore_ascii_case(&'A');
            let mapped = if is_arc && i % ARC_FIELDS == ARC_SWEEP_FLAG {
                flip_flag(op)
            } else if !is_x_operand(cmd.letter, i) {
                op.clone()
            } else if relative && !(leading_move && i < 2) {
                map_number(op, |dx| -dx)
            } else {
                map_number(op, |x| c + (c - x))
            };
            out.push(mapped);
        }
    }
    out.join(" ")
}
