pub mod apertures;
pub mod commands;
pub mod coord;
pub mod interpreter;
pub mod lexer;
pub mod macros;
pub mod plotter;

use log::debug;

use crate::error::GerberError;

use self::plotter::PlotOutput;

/// Parse and plot a single Gerber file.
///
/// Fails only when the text is not Gerber at all (no `*` terminator or no
/// recognizable command). Anything recoverable inside the file is logged
/// and skipped.
pub fn parse_layer(content: &str) -> Result<PlotOutput, GerberError> {
    // Quick sanity check: Gerber files contain at least one * terminator
    if !content.contains('*') {
        return Err(GerberError::ParseError(
            "Not a Gerber file (no * terminator)".into(),
        ));
    }

    let blocks = lexer::split_blocks(content);
    let cmds = commands::parse_commands(&blocks);
    if cmds.is_empty() {
        return Err(GerberError::ParseError("No Gerber commands found".into()));
    }
    debug!("Gerber: {} blocks, {} commands", blocks.len(), cmds.len());

    Ok(interpreter::interpret(&cmds))
}
