use rockwell::{Sentence, TagRun};

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
            self.paint(s, BOLD)
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            self.paint(s, DIM)
        }
    }
}

pub fn print_run(sentence: &Sentence, run: &TagRun, color: bool) {
    let palette = ansi::Palette::new(color);
    let text = sentence.tokens.iter().map(|t| t.word.as_str()).collect::<Vec<_>>().join(" ");
    println!(
        "\n{} {}",
        palette.bold(palette.paint(format!("Sentence {}:", sentence.id), ansi::CYAN)),
        palette.paint(format!("\"{text}\""), ansi::CYAN)
    );

    println!("{}", palette.paint("━━━ Tags ━━━", ansi::GRAY));
    if run.tags.is_empty() {
        println!("{}", palette.dim("  No tags"));
    }
    for (idx, tag) in run.tags.iter().enumerate() {
        let covered = sentence.tokens[tag.start..=tag.end].iter().map(|t| t.word.as_str()).collect::<Vec<_>>().join(" ");
        println!(
            "  {} {} {} {} {}",
            palette.paint(format!("[{idx}]"), ansi::GRAY),
            palette.bold(palette.paint(&tag.tag, ansi::GREEN)),
            palette.dim("│"),
            palette.paint(format!("span {}..{}", tag.start, tag.end), ansi::YELLOW),
            palette.dim(format!("\"{covered}\"")),
        );
        println!("      {} {}", palette.dim("rule:"), palette.paint(&tag.script, ansi::BLUE));
    }

    let m = &run.metrics;
    println!("{}", palette.paint("━━━ Automaton ━━━", ansi::GRAY));
    println!(
        "  Tokens: {} fed, {} skipped of {}  │  States: {} spawned, {} advanced, {} completed",
        palette.paint(m.consumed.to_string(), ansi::BLUE),
        palette.paint(m.skipped.to_string(), ansi::BLUE),
        m.tokens,
        palette.paint(m.spawned.to_string(), ansi::YELLOW),
        palette.paint(m.advanced.to_string(), ansi::YELLOW),
        palette.paint(m.completed.to_string(), ansi::YELLOW),
    );
    println!(
        "  Pruned: {}  │  Collapsed: {}  │  Rejected: {}  │  Total: {}",
        palette.dim(m.pruned.to_string()),
        palette.dim(m.collapsed.to_string()),
        palette.dim(m.rejected.to_string()),
        palette.paint(format!("{:?}", m.total), ansi::GREEN),
    );
}
