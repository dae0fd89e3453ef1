use man::prelude::*;
use std::path::Path;

fn main() {
    let page = Manual::new("xlsx-template")
        .about("fill an .xlsx template from JSON data")
        .author(Author::new("xlsx-template maintainers"))
        .option(
            Opt::new("FILE")
                .short("-o")
                .long("--output")
                .help("Write the filled workbook to FILE. With \\fB-\\fR or when omitted, \
                       the workbook goes to stdout, which must not be a terminal."),
        )
        .option(
            Opt::new("SHEET")
                .short("-s")
                .long("--sheet")
                .help("Fill only this sheet, given by 1-based number or by name. \
                       Repeat to fill several. Default: every worksheet."),
        )
        .flag(
            Flag::new()
                .short("-d")
                .long("--dates")
                .help("Treat ISO-8601 strings in the context (YYYY-MM-DD, \
                       YYYY-MM-DDTHH:MM:SS) as dates and write them as date serials."),
        )
        .flag(
            Flag::new()
                .short("-v")
                .long("--verbose")
                .help("Log more to stderr. Repeat for debug and trace output."),
        )
        .flag(
            Flag::new()
                .short("-h")
                .long("--help")
                .help("Show help information."),
        )
        .flag(
            Flag::new()
                .short("-V")
                .long("--version")
                .help("Show version information."),
        )
        .arg(Arg::new("TEMPLATE"))
        .arg(Arg::new("CONTEXT"))
        .custom(
            Section::new("description")
                .paragraph(
                    "xlsx-template reads a spreadsheet template and a JSON context \
                     and writes a new workbook in which every \\fB${path}\\fR \
                     placeholder is replaced by the value at that path.",
                )
                .paragraph(
                    "Numbers, booleans and dates are written as typed cells; text \
                     goes to the shared string table, and text beginning with \
                     \\fB=\\fR becomes a formula. A list spreads across the row, \
                     moving the cells to its right. A \\fB${table:list.field}\\fR \
                     placeholder repeats its row once per list element, pushing \
                     the rows below it down.",
                )
                .paragraph(
                    "Merged cells, defined names, tables and their autofilters, \
                     hyperlinks and the sheet dimension are moved to match the new \
                     layout. Hyperlink targets may contain placeholders too. Cached \
                     formula results are dropped and the workbook recalculates on \
                     open.",
                )
                .paragraph(
                    "Either TEMPLATE or CONTEXT may be \\fB-\\fR to read from \
                     stdin. Maximum input size is 256 MiB.",
                ),
        )
        .example(
            Example::new()
                .text("Fill every sheet and write a new file")
                .command("xlsx-template report.xlsx data.json -o out.xlsx"),
        )
        .example(
            Example::new()
                .text("Fill two sheets, reading dates from the JSON")
                .command("xlsx-template -d -s Summary -s 3 report.xlsx data.json > out.xlsx"),
        )
        .example(
            Example::new()
                .text("Read the context from stdin")
                .command("curl -s https://example.test/data | xlsx-template report.xlsx - -o out.xlsx"),
        )
        .custom(
            Section::new("environment").paragraph(
                "\\fBRUST_LOG\\fR sets the log filter (for example \
                 \\fBxlsx_template=debug\\fR) and takes precedence over \\fB-v\\fR.",
            ),
        )
        .custom(
            Section::new("exit status")
                .paragraph("0 on success, 1 on any error. Errors are reported on stderr."),
        )
        .render();

    // Write to OUT_DIR (standard cargo output directory)
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir).join("xlsx-template.1");
    std::fs::write(&out_path, &page).unwrap();

    // Also write to target/man/ so packaging scripts have a stable path
    // that doesn't depend on the hash-based OUT_DIR.
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let man_dir = Path::new(&manifest_dir).join("target").join("man");
    std::fs::create_dir_all(&man_dir).unwrap();
    std::fs::write(man_dir.join("xlsx-template.1"), &page).unwrap();

    println!("cargo::rerun-if-changed=build.rs");
}
