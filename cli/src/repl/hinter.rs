use crate::session::COMMANDS;

/// Shows the argument shape once a command word is typed in full.
pub fn hint_for(line: &str, pos: usize) -> Option<String> {
    if pos < line.len() {
        return None;
    }
    let command = line.trim_start();
    if command.is_empty() || command.contains(' ') {
        return None;
    }
    let (_, usage) = COMMANDS.iter().find(|(name, _)| *name == command)?;
    let arguments = usage.strip_prefix(command)?;
    (!arguments.is_empty()).then(|| arguments.to_string())
}
