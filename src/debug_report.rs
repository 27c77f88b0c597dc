use slugrule::{GenerateResultVerbose, OptionKey, SlugOptions};

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
            self.wrap(s.as_ref(), color)
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            self.wrap(s.as_ref(), BOLD)
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            self.wrap(s.as_ref(), DIM)
        }

        fn wrap(&self, s: &str, code: &str) -> String {
            if self.enabled { format!("{code}{s}{RESET}") } else { s.to_string() }
        }
    }
}

pub fn print_run(res: &GenerateResultVerbose, color: bool) {
    let palette = ansi::Palette::new(color);
    let details = &res.details;
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Slugifying: {:?}", res.text), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Options ━━━", ansi::GRAY));
    print_options(&details.options, &palette);

    println!("\n{}", palette.paint("━━━ Rule script ━━━", ansi::GRAY));
    if details.script.is_empty() {
        println!("{}", palette.dim("  No script: validChars is empty, every input maps to an empty slug"));
    } else {
        for line in details.script.lines() {
            println!("  {}", palette.paint(line, ansi::BLUE));
        }
    }

    println!("\n{}", palette.paint("━━━ Stages ━━━", ansi::GRAY));
    for (stage, count) in details.stages.iter() {
        let count = if count > 0 { palette.paint(count.to_string(), ansi::GREEN) } else { palette.dim("0") };
        println!("  {:<14} {}", stage.label(), count);
    }
    println!(
        "  {} {}  {} {}",
        palette.dim("set cache hits:"),
        palette.paint(details.cache.hits.to_string(), ansi::YELLOW),
        palette.dim("misses:"),
        palette.paint(details.cache.misses.to_string(), ansi::YELLOW)
    );

    println!("\n{}", palette.paint("━━━ Result ━━━", ansi::GRAY));
    if res.slug.is_empty() {
        println!("  {}", palette.dim("(empty slug)"));
    } else {
        println!("  {}", palette.bold(palette.paint(&res.slug, ansi::GREEN)));
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    let timings = &details.timings;
    println!(
        "  Total: {}  │  Build: {}  │  Compile: {}  │  Apply: {}",
        palette.paint(format!("{:?}", res.elapsed), ansi::GREEN),
        palette.paint(format!("{:?}", timings.build), ansi::CYAN),
        palette.paint(format!("{:?}", timings.compile), ansi::CYAN),
        palette.dim(format!("{:?}", timings.apply)),
    );
    println!();
}

fn print_options(options: &SlugOptions, palette: &ansi::Palette) {
    let explicit: Vec<OptionKey> = options.explicit().map(|(key, _)| key).collect();
    let rows = [
        (OptionKey::Delimiter, format!("{:?}", options.delimiter())),
        (OptionKey::ValidChars, format!("{:?}", options.valid_chars())),
        (OptionKey::IgnoreChars, format!("{:?}", options.ignore_chars())),
        (OptionKey::Locale, format!("{:?}", options.locale())),
        (OptionKey::Transforms, format!("{:?}", options.transforms())),
    ];
    for (key, value) in rows {
        let origin = if explicit.contains(&key) { palette.paint("set", ansi::YELLOW) } else { palette.dim("default") };
        println!("  {:<12} {} {}", key.name(), value, origin);
    }
}
