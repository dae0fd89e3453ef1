//! `xlsx-template`: fill an `.xlsx` template from JSON data.
//!
//! Reads a template workbook and a JSON context, resolves every `${...}`
//! placeholder in the selected sheets, and writes the filled workbook to a
//! file or to stdout. Diagnostics go to stderr through `tracing`.

use std::fmt::Display;
use std::io::{self, Read, Write};
use std::process;

use clap::{ArgAction, Parser};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;
use xlsx_template::{ContextValue, SheetSelector, Template};

/// Maximum input file size (256 MiB). Prevents accidental OOM from
/// huge files or zip bombs.
const MAX_INPUT_SIZE: usize = 256 * 1024 * 1024;

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

#[derive(Parser, Debug)]
#[command(name = "xlsx-template", version)]
#[command(about = "Fill an .xlsx template from JSON data")]
#[command(long_about = r#"
Fill an .xlsx template from JSON data.

Cells containing ${path} are replaced by the value at that path in the
context. Lists spread across the row; ${table:list.field} repeats the row
once per list element. Merged cells, defined names, tables, autofilters,
hyperlinks and the sheet dimension follow the new layout.

Examples:
  xlsx-template report.xlsx data.json -o out.xlsx
  xlsx-template -s Summary -s 3 report.xlsx data.json > out.xlsx
  curl -s https://example.test/data | xlsx-template report.xlsx - -o out.xlsx
"#)]
struct Cli {
    /// Template workbook (.xlsx), or - for stdin
    template: String,

    /// JSON context file, or - for stdin
    context: String,

    /// Output file; - or omitted writes to stdout (never to a terminal)
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Sheet to fill, by 1-based number or name; repeatable (default: all)
    #[arg(short, long = "sheet", value_name = "SHEET")]
    sheets: Vec<String>,

    /// Treat ISO-8601 date strings in the context as dates
    #[arg(short, long)]
    dates: bool,

    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.template == "-" && cli.context == "-" {
        fail("stdin", "template and context cannot both come from stdin");
    }

    let (template_bytes, template_name) = read_input(&cli.template);
    if !template_bytes.starts_with(&ZIP_MAGIC) {
        fail(&template_name, "not an .xlsx file (no ZIP signature)");
    }
    let (context_bytes, context_name) = read_input(&cli.context);

    let context = match serde_json::from_slice::<serde_json::Value>(&context_bytes) {
        Ok(json) if cli.dates => ContextValue::from_json_with_dates(json),
        Ok(json) => ContextValue::from(json),
        Err(e) => fail(&context_name, e),
    };

    let output = cli.output.as_deref().filter(|o| *o != "-");
    if output.is_none() && io::stdout().is_terminal() {
        fail(
            "stdout",
            "refusing to write a workbook to a terminal; use -o FILE or redirect",
        );
    }

    let built = fill(&template_bytes, &cli.sheets, &context);
    let bytes = match built {
        Ok(bytes) => bytes,
        Err(e) => fail(&template_name, e),
    };

    let written = match output {
        Some(path) => std::fs::write(path, &bytes).map_err(|e| (path, e)),
        None => io::stdout()
            .lock()
            .write_all(&bytes)
            .map_err(|e| ("stdout", e)),
    };
    if let Err((name, e)) = written {
        fail(name, e);
    }
}

fn fill(data: &[u8], sheets: &[String], context: &ContextValue) -> xlsx_template::Result<Vec<u8>> {
    let mut template = Template::load(data)?;
    if sheets.is_empty() {
        template.process_all(context)?;
    } else {
        for sheet in sheets {
            template.process(SheetSelector::from_arg(sheet), context)?;
        }
    }
    template.build()
}

/// Read a file, or stdin for `-`. Returns the bytes and a display name.
fn read_input(path: &str) -> (Vec<u8>, String) {
    let (buf, name) = if path == "-" {
        let mut buf = Vec::new();
        if let Err(e) = io::stdin().read_to_end(&mut buf) {
            fail("stdin", e);
        }
        (buf, "stdin".to_string())
    } else {
        match std::fs::read(path) {
            Ok(b) => (b, path.to_string()),
            Err(e) => fail(path, e),
        }
    };

    if buf.len() > MAX_INPUT_SIZE {
        #[allow(clippy::cast_precision_loss)] // only used in error message
        let size_mib = buf.len() as f64 / (1024.0 * 1024.0);
        fail(
            &name,
            format!(
                "too large ({size_mib:.1} MiB, max {} MiB)",
                MAX_INPUT_SIZE / (1024 * 1024),
            ),
        );
    }
    (buf, name)
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn fail(file: &str, e: impl Display) -> ! {
    eprintln!("xlsx-template: {file}: {e}");
    process::exit(1);
}
