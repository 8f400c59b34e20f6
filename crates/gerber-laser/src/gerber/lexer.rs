/// A command block produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// The `*`-terminated commands sharing one `%...%` pair.
    /// Usually a single command; `%AM` macro definitions carry their body here.
    /// Example: `["FSLAX24Y24"]`, `["AMOC8", "5,1,8,0,0,1.08239X$1,22.5"]`
    Parameter(Vec<String>),
    /// An operation or mode code terminated by `*`.
    /// Example: `"D10"`, `"X100Y200D01"`, `"G36"`, `"M02"`
    Operation(String),
}

/// Split Gerber text into command blocks.
///
/// `*` terminates every command and `%` toggles parameter mode. Line breaks
/// carry no meaning and are dropped. `G04` comments are discarded here.
pub fn split_blocks(input: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut group: Option<Vec<String>> = None;

    for ch in input.chars() {
        match ch {
            '%' => {
                match group.take() {
                    Some(mut cmds) => {
                        // Unterminated text before the closing '%' still counts
                        push_command(&mut cmds, &mut current);
                        if !cmds.is_empty() {
                            blocks.push(Block::Parameter(cmds));
                        }
                    }
                    None => {
                        flush_operation(&mut blocks, &mut current);
                        group = Some(Vec::new());
                    }
                }
            }
            '*' => match group.as_mut() {
                Some(cmds) => push_command(cmds, &mut current),
                None => flush_operation(&mut blocks, &mut current),
            },
            '\n' | '\r' => {}
            c => current.push(c),
        }
    }

    // EOF inside a parameter block or after an unterminated word
    match group {
        Some(mut cmds) => {
            push_command(&mut cmds, &mut current);
            if !cmds.is_empty() {
                blocks.push(Block::Parameter(cmds));
            }
        }
        None => flush_operation(&mut blocks, &mut current),
    }

    blocks
}

fn push_command(cmds: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() && !is_comment(trimmed) {
        cmds.push(trimmed.to_string());
    }
    current.clear();
}

fn flush_operation(blocks: &mut Vec<Block>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() && !is_comment(trimmed) {
        blocks.push(Block::Operation(trimmed.to_string()));
    }
    current.clear();
}

/// Check if a command is a G04 comment.
fn is_comment(s: &str) -> bool {
    s.starts_with("G04") || s.starts_with("G4 ") || s == "G4"
}
