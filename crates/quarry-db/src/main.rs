//! quarry CLI
//!
//! Interactive shell and script runner for the Quarry query engine.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use quarry_db::{Cursor, Database, Value};

/// An in-memory SQL database.
#[derive(Parser)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script file to execute; the interactive shell starts when absent.
    file: Option<PathBuf>,

    /// Execute a single statement string and exit.
    #[arg(short, long)]
    execute: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut database = Database::new();

    if let Some(sql) = cli.execute {
        return run_script(&mut database, &sql);
    }
    if let Some(path) = cli.file {
        let script = fs::read_to_string(&path)?;
        return run_script(&mut database, &script);
    }

    repl(&mut database)
}

/// Executes every statement in a script, stopping at the first error.
fn run_script(database: &mut Database, script: &str) -> anyhow::Result<()> {
    let split = split_script(script);
    for statement in &split.statements {
        if let Some(cursor) = database.execute(statement)? {
            print_cursor(&cursor)?;
        }
    }
    // An unterminated trailing statement still reaches the parser, which
    // reports the missing semicolon.
    if !split.tail.trim().is_empty() {
        if let Some(cursor) = database.execute(split.tail.trim())? {
            print_cursor(&cursor)?;
        }
    }
    Ok(())
}

/// The interactive loop: statements accumulate across lines until a
/// terminating `;`, errors are reported without ending the session.
fn repl(database: &mut Database) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut buffer = String::new();

    print!("quarry> ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        buffer.push_str(&line);
        buffer.push('\n');

        let split = split_script(&buffer);
        if !split.statements.is_empty() {
            for statement in &split.statements {
                match database.execute(statement) {
                    Ok(Some(cursor)) => print_cursor(&cursor)?,
                    Ok(None) => {}
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            buffer = split.tail;
        }

        let prompt = if buffer.trim().is_empty() {
            buffer.clear();
            "quarry> "
        } else {
            "   ...> "
        };
        print!("{prompt}");
        io::stdout().flush()?;
    }

    Ok(())
}

/// A script divided into complete (semicolon-terminated) statements and
/// an unterminated tail.
struct SplitScript {
    statements: Vec<String>,
    tail: String,
}

/// Splits a script on `;` boundaries, respecting string literals (with
/// `''` escapes) and `--` comments. Terminating semicolons stay with
/// their statements.
fn split_script(script: &str) -> SplitScript {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut in_comment = false;
    let mut previous = '\0';

    for c in script.chars() {
        current.push(c);
        match c {
            '\n' if in_comment => in_comment = false,
            _ if in_comment => {}
            '\'' => in_string = !in_string,
            '-' if !in_string && previous == '-' => in_comment = true,
            ';' if !in_string => {
                let statement = std::mem::take(&mut current);
                let statement = statement.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
            }
            _ => {}
        }
        previous = c;
    }

    SplitScript {
        statements,
        tail: current,
    }
}

/// Renders a result set as column-aligned text.
fn print_cursor(cursor: &Cursor) -> anyhow::Result<()> {
    let mut headers = Vec::new();
    for (i, column) in cursor.columns().columns().iter().enumerate() {
        headers.push(match &column.name {
            Some(name) => name.clone(),
            None => format!("col{i}"),
        });
    }

    let mut rows = Vec::new();
    for row in cursor {
        let row = row?;
        rows.push(row.iter().map(render_value).collect::<Vec<_>>());
    }

    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_row(&mut out, &headers, &widths)?;
    let divider: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&mut out, &divider, &widths)?;
    for row in &rows {
        write_row(&mut out, row, &widths)?;
    }
    writeln!(out, "({} rows)", rows.len())?;
    Ok(())
}

fn write_row(out: &mut impl Write, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let mut line = String::new();
    for (cell, &width) in cells.iter().zip(widths) {
        if !line.is_empty() {
            line.push_str("  ");
        }
        line.push_str(&format!("{cell:<width$}"));
    }
    writeln!(out, "{}", line.trim_end())
}

/// Values rendered for display: strings lose their quotes, everything
/// else uses the engine's text form.
fn render_value(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_script_basic() {
        let split = split_script("CREATE TABLE t (a INTEGER); SELECT a FROM t;");
        assert_eq!(
            split.statements,
            vec!["CREATE TABLE t (a INTEGER);", "SELECT a FROM t;"]
        );
        assert!(split.tail.trim().is_empty());
    }

    #[test]
    fn test_split_script_keeps_unterminated_tail() {
        let split = split_script("SELECT a FROM t; SELECT b");
        assert_eq!(split.statements, vec!["SELECT a FROM t;"]);
        assert_eq!(split.tail.trim(), "SELECT b");
    }

    #[test]
    fn test_split_script_ignores_semicolons_in_strings() {
        let split = split_script("INSERT INTO t VALUES ('a;b');");
        assert_eq!(split.statements.len(), 1);

        // An unterminated string swallows the semicolon.
        let open = split_script("INSERT INTO t VALUES (';");
        assert!(open.statements.is_empty());
        assert!(!open.tail.is_empty());
    }

    #[test]
    fn test_split_script_handles_escaped_quotes() {
        let split = split_script("INSERT INTO t VALUES ('it''s');");
        assert_eq!(split.statements.len(), 1);
    }

    #[test]
    fn test_split_script_ignores_comment_content() {
        let split = split_script("SELECT a -- trailing; comment\nFROM t;");
        assert_eq!(split.statements.len(), 1);
        assert!(split.statements[0].contains("FROM t;"));
    }

    #[test]
    fn test_render_value_unquotes_strings() {
        assert_eq!(render_value(&Value::Str("hi".into())), "hi");
        assert_eq!(render_value(&Value::Int(3)), "3");
        assert_eq!(render_value(&Value::Null), "NULL");
    }
}
