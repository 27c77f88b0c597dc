mod debug_report;

use slugrule::{Error, SlugGenerator, SlugOptions};
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SLUGRULE_LOG";

fn main() {
    init_logging();

    let config = match parse_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let generator = SlugGenerator::new();
    let result = if config.verbose {
        std::str::from_utf8(&config.input)
            .map_err(|err| Error::InvalidEncoding { offset: err.valid_up_to() })
            .and_then(|text| generator.generate_verbose(text, &config.options))
            .map(|res| debug_report::print_run(&res, config.color))
    } else {
        generator.generate_bytes(&config.input, &config.options).map(|slug| println!("{slug}"))
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        let code = if matches!(err, Error::InvalidEncoding { .. }) { 2 } else { 1 };
        std::process::exit(code);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

#[derive(Debug)]
struct CliConfig {
    input: Vec<u8>,
    options: SlugOptions,
    verbose: bool,
    color: bool,
}

#[derive(Default)]
struct RawOptions {
    valid: Option<String>,
    ignore: Option<String>,
    locale: Option<String>,
    delimiter: Option<String>,
    transforms: Vec<String>,
    pre: Vec<String>,
    post: Vec<String>,
}

impl RawOptions {
    /// Store `value` for a value-taking flag; `false` if `flag` takes none.
    fn accept(&mut self, flag: &str, value: String) -> bool {
        match flag {
            "--valid" => self.valid = Some(value),
            "--ignore" => self.ignore = Some(value),
            "--locale" => self.locale = Some(value),
            "--delimiter" => self.delimiter = Some(value),
            "--transform" => self.transforms.push(value),
            "--pre" => self.pre.push(value),
            "--post" => self.post.push(value),
            _ => return false,
        }
        true
    }

    fn takes_value(flag: &str) -> bool {
        matches!(flag, "--valid" | "--ignore" | "--locale" | "--delimiter" | "--transform" | "--pre" | "--post")
    }

    fn into_options(self) -> Result<SlugOptions, String> {
        let invalid = |err: Error| format!("error: {err}");
        let mut options = SlugOptions::new();
        if let Some(valid) = self.valid {
            options.set_valid_chars(valid).map_err(invalid)?;
        }
        if let Some(ignore) = self.ignore {
            options.set_ignore_chars(ignore).map_err(invalid)?;
        }
        if let Some(locale) = self.locale {
            options.set_locale(&locale).map_err(invalid)?;
        }
        if let Some(delimiter) = self.delimiter {
            options.set_delimiter(delimiter);
        }
        if !self.transforms.is_empty() {
            options.set_transforms(self.transforms).map_err(invalid)?;
        }
        if !self.pre.is_empty() {
            options.set_pre_transforms(self.pre).map_err(invalid)?;
        }
        if !self.post.is_empty() {
            options.set_post_transforms(self.post).map_err(invalid)?;
        }
        Ok(options)
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut raw = RawOptions::default();
    let mut verbose = false;
    let mut color = io::stdout().is_terminal();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("slugrule {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "-v" | "--verbose" => verbose = true,
            "--color" => color = true,
            "--no-color" => color = false,
            flag if RawOptions::takes_value(flag) => {
                let value = args.next().ok_or_else(|| format!("error: {flag} expects a value"))?;
                raw.accept(flag, value);
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.is_empty() {
                    input = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--") && arg.contains('=') => {
                let (flag, value) = arg.split_once('=').unwrap_or((arg.as_str(), ""));
                if !raw.accept(flag, value.to_string()) {
                    return Err(format!("error: unknown option '{flag}'"));
                }
            }
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                input = Some(rest);
                break;
            }
        }
    }

    let input = match input {
        Some(value) => value.into_bytes(),
        None => read_stdin_input()?,
    };

    Ok(CliConfig { input: require_input(input)?, options: raw.into_options()?, verbose, color })
}

/// Whitespace is still input and slugs to the empty string.
fn require_input(input: Vec<u8>) -> Result<Vec<u8>, String> {
    if input.is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }
    Ok(input)
}

fn read_stdin_input() -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    while buffer.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
        buffer.pop();
    }
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "slugrule {version}

Turns text into a slug through one composed transliteration script.

Usage:
  slugrule [OPTIONS] [--] <text...>
  echo <text> | slugrule [OPTIONS]

Options:
  --valid <class>            Characters kept in the slug (class body, e.g. a-z0-9).
  --ignore <class>           Characters removed before and after transforms.
  --locale <tag>             Locale for transform lookup (e.g. de, tr_TR).
  --delimiter <text>         Text placed between words. Default: -
  --transform <id|rules>     Transform to run; repeatable, replaces the defaults.
  --pre <id|rules>           Transform run before the others; repeatable.
  --post <id|rules>          Transform run after the others; repeatable.
  -v, --verbose              Print the rule script, stage counts and timings.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Every value option also accepts the --name=value form.
Logging goes to stderr and is configured with {log_env} (default: warn).

Exit codes:
  0  Success.
  1  The slug could not be generated.
  2  Invalid arguments, invalid UTF-8 or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn only_empty_input_is_missing() {
        assert!(require_input(Vec::new()).unwrap_err().starts_with("error: no input provided"));
        assert_eq!(require_input(b"   ".to_vec()).unwrap(), b"   ");
        assert_eq!(require_input(b"\t".to_vec()).unwrap(), b"\t");
    }

    #[test]
    fn whitespace_argument_is_accepted() {
        let config = parse_args(args(&["--delimiter", "_", "  "])).unwrap();
        assert_eq!(config.input, b"  ");
        assert_eq!(config.options.delimiter(), "_");
        assert_eq!(SlugGenerator::new().generate_bytes(&config.input, &config.options).unwrap(), "");
    }

    #[test]
    fn value_flags_and_trailing_words() {
        let config = parse_args(args(&["--locale=de", "-v", "Öl", "Fass"])).unwrap();
        assert_eq!(config.input, "Öl Fass".as_bytes());
        assert_eq!(config.options.locale(), "de");
        assert!(config.verbose);

        assert!(parse_args(args(&["--bogus", "x"])).unwrap_err().contains("unknown option '--bogus'"));
        assert!(parse_args(args(&["--valid"])).unwrap_err().contains("--valid expects a value"));
    }
}
