use std::borrow::Cow;

use owo_colors::OwoColorize;

/// Colors the command word, `$handle` and `&reference` operands.
pub fn highlight_line(line: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(line.len());
    for (index, word) in line.split(' ').enumerate() {
        if index > 0 {
            out.push(' ');
        }
        if index == 0 {
            out.push_str(&word.blue().bold().to_string());
        } else if word.starts_with('$') {
            out.push_str(&word.cyan().to_string());
        } else if word.starts_with('&') {
            out.push_str(&word.magenta().to_string());
        } else {
            out.push_str(word);
        }
    }
    Cow::Owned(out)
}

pub fn highlight_prompt(prompt: &str) -> Cow<'_, str> {
    if prompt == "> " {
        return Cow::Owned(format!("{} ", ">".bright_green().bold()));
    }
    Cow::Borrowed(prompt)
}

pub fn highlight_hint(hint: &str) -> Cow<'_, str> {
    Cow::Owned(hint.bright_black().to_string())
}
