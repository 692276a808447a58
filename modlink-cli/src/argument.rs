//! Command-line argument parsing: the process-facing half of the Tool
//! Surface, translated into a [`crate::request::LinkRequest`] by the driver.

use anstyle::{AnsiColor, Style};
use clap::builder::Styles;
use clap::Parser;

const CYAN: Style = AnsiColor::Cyan.on_default();
const GREEN: Style = AnsiColor::Green.on_default();
const GREEN_BOLD: Style = AnsiColor::Green.on_default().bold();
const RED_BOLD: Style = AnsiColor::Red.on_default().bold();
const YELLOW: Style = AnsiColor::Yellow.on_default();
const STYLES: Styles = Styles::styled()
    .header(GREEN_BOLD)
    .usage(GREEN_BOLD)
    .literal(CYAN)
    .placeholder(CYAN)
    .error(RED_BOLD)
    .valid(GREEN)
    .invalid(YELLOW);

/// Resolves a root module set against a module path and links it into a
/// single image.
#[derive(Debug, Parser)]
#[command(name = "modlink", about = "Module graph resolver and linker")]
#[clap(styles = STYLES)]
pub struct Arguments {
    /// Root module names to resolve (comma-separated).
    #[arg(short = 'm', long = "add-modules", value_delimiter = ',', required = true)]
    pub add_modules: Vec<String>,

    /// Module path roots to search, in search order (colon-separated).
    #[arg(short = 'p', long = "module-path", value_delimiter = ':', required = true)]
    pub module_path: Vec<String>,

    /// Restricts the observable module universe (comma-separated).
    #[arg(long = "limit-modules", value_delimiter = ',')]
    pub limit_modules: Option<Vec<String>>,

    /// Adds a read edge, `SOURCE=TARGET` (comma-separated, repeatable).
    #[arg(long = "add-reads", value_delimiter = ',')]
    pub add_reads: Option<Vec<String>>,

    /// Adds an export, `SOURCE/PACKAGE=TARGET` (comma-separated, repeatable).
    #[arg(long = "add-exports", value_delimiter = ',')]
    pub add_exports: Option<Vec<String>>,

    /// Adds an opens, `SOURCE/PACKAGE=TARGET` (comma-separated, repeatable).
    #[arg(long = "add-opens", value_delimiter = ',')]
    pub add_opens: Option<Vec<String>>,

    /// Enables DEFLATE compression in the linked image.
    #[arg(long = "compress")]
    pub compress: bool,

    /// Compression level, 0-2 (no effect unless `--compress` is given).
    #[arg(long = "compress-level", default_value_t = 2)]
    pub compress_level: u8,

    /// Regex whitelisting which resource paths get compressed.
    #[arg(long = "compress-filter")]
    pub compress_filter: Option<String>,

    /// Comma-separated glob list; matching resources are dropped.
    #[arg(long = "exclude-resources", value_delimiter = ',')]
    pub exclude_resources: Option<Vec<String>>,

    /// Comma-separated glob list; matching loose files are dropped.
    #[arg(long = "exclude-files", value_delimiter = ',')]
    pub exclude_files: Option<Vec<String>>,

    /// Comma-separated explicit path-prefix ordering for the image.
    #[arg(long = "sort-resources", value_delimiter = ',')]
    pub sort_resources: Option<String>,

    /// Comma-separated `DEST=SRC` pairs copied into the image verbatim.
    #[arg(long = "copy-files", value_delimiter = ',')]
    pub copy_files: Option<Vec<String>>,

    /// Writes the linked image to this path.
    #[arg(short = 'o', long = "output", required = true)]
    pub output: String,

    /// Writes the image big-endian instead of the host's native order.
    #[arg(long = "big-endian")]
    pub big_endian: bool,
}

impl Arguments {
    /// Parses arguments from the process's own argument vector.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_minimum_required_arguments() {
        let args = Arguments::parse_from([
            "modlink",
            "-m",
            "app",
            "-p",
            "mods",
            "-o",
            "out.img",
        ]);
        assert_eq!(args.add_modules, vec!["app".to_string()]);
        assert_eq!(args.module_path, vec!["mods".to_string()]);
        assert_eq!(args.output, "out.img");
        assert!(!args.compress);
    }

    #[test]
    fn splits_comma_delimited_overrides() {
        let args = Arguments::parse_from([
            "modlink",
            "-m",
            "app,util",
            "-p",
            "mods",
            "-o",
            "out.img",
            "--add-reads",
            "app=util,app=java.base",
        ]);
        assert_eq!(args.add_modules, vec!["app".to_string(), "util".to_string()]);
        assert_eq!(
            args.add_reads,
            Some(vec!["app=util".to_string(), "app=java.base".to_string()])
        );
    }
}
