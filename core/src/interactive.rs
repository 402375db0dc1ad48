use std::io;

use dialoguer::{theme::ColorfulTheme, Confirm};

fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

/// Yes/no prompt on the terminal, defaulting to "no".
pub fn ask_confirm(prompt: &str) -> io::Result<bool> {
    Confirm::with_theme(&theme())
        .with_prompt(prompt)
        .default(false)
        .interact()
}
