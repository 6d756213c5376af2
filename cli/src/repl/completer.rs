use rustyline::completion::Pair;

use crate::session::COMMANDS;

/// Completes the command word; arguments are left alone.
pub fn complete_line(line: &str, pos: usize) -> (usize, Vec<Pair>) {
    let safe_pos = pos.min(line.len());
    let prefix = &line[..safe_pos];
    let start = prefix.len() - prefix.trim_start().len();
    let needle = &prefix[start..];
    if needle.contains(' ') {
        return (safe_pos, Vec::new());
    }

    let names = COMMANDS
        .iter()
        .map(|(name, _)| *name)
        .chain(["exit", ".reset"])
        .filter(|name| name.starts_with(needle))
        .map(|name| Pair {
            display: name.to_string(),
            replacement: name.to_string(),
        })
        .collect();
    (start, names)
}

#[cfg(test)]
mod tests {
    use super::complete_line;

    #[test]
    fn completes_command_prefix() {
        let (start, pairs) = complete_line("  ope", 5);
        assert_eq!(start, 2);
        let names: Vec<_> = pairs.iter().map(|pair| pair.replacement.as_str()).collect();
        assert_eq!(names, vec!["open", "open-esc"]);
    }

    #[test]
    fn arguments_are_not_completed() {
        let (_, pairs) = complete_line("ref $0", 6);
        assert!(pairs.is_empty());
    }
}
