use scriptshift::TransliterationDetails;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(input: &str, details: &TransliterationDetails, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  {}: \"{}\"", details.id, input), ansi::CYAN)));

    if !details.steps.is_empty() {
        println!("\n{}", palette.paint("━━━ Pipeline ━━━", ansi::GRAY));
        for (idx, step) in details.steps.iter().enumerate() {
            println!("  {} {}", palette.paint(format!("[{idx}]"), ansi::GRAY), palette.paint(step, ansi::BLUE));
        }
    }

    if !details.keystrokes.is_empty() {
        println!("\n{}", palette.paint("━━━ Keystrokes ━━━", ansi::GRAY));
        print_keystrokes(details, &palette);
    }

    println!("\n{}", palette.paint("━━━ Result ━━━", ansi::GRAY));
    println!("  {}", palette.bold(palette.paint(&details.output, ansi::GREEN)));

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!("  Total: {}", palette.paint(format!("{:?}", details.total), ansi::GREEN));
    println!();
}

fn print_keystrokes(details: &TransliterationDetails, palette: &ansi::Palette) {
    for key in &details.keystrokes {
        let (done, pending): (String, String) = {
            let mut chars = key.text.chars();
            let done = chars.by_ref().take(key.committed).collect();
            (done, chars.collect())
        };
        println!(
            "  {} {} {}{}",
            palette.paint(format!("{:?}", key.input), ansi::YELLOW),
            palette.dim("→"),
            palette.paint(done, ansi::GREEN),
            palette.dim(format!("|{pending}")),
        );
    }
}
