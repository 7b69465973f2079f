//! # mgx Shell
//!
//! Interactive shell over the in-process reference connection. Drives all
//! four cursor modes against a `MemStore`, which makes it a convenient way
//! to explore traversal semantics without a remote store.
//!
//! ```text
//! mgx> set customer(1)=Smith
//! mgx> set customer(2)=Jones
//! mgx> order customer
//! mgx> next
//! 1
//! mgx> next
//! 2
//! mgx> next
//! (end)
//! ```
//!
//! Enter `.help` for the command list. Errors print and the loop continues.

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use mgx::{
    shared, Cursor, CursorSpec, MemStore, OutputFormat, SharedConnection, SqlColumn,
    StagedStatement, StepOutput,
};

const PROMPT: &str = "mgx> ";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    if let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("mgx {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            _ => {
                print_help();
                return Ok(());
            }
        }
    }

    let mut shell = Shell::new()?;
    shell.run()
}

struct Shell {
    conn: SharedConnection<MemStore>,
    cursor: Option<Cursor<MemStore>>,
    fetch_data: bool,
    format: OutputFormat,
    editor: DefaultEditor,
}

impl Shell {
    fn new() -> Result<Self> {
        let editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;
        Ok(Self {
            conn: shared(MemStore::new()),
            cursor: None,
            fetch_data: false,
            format: OutputFormat::Structured,
            editor,
        })
    }

    fn run(&mut self) -> Result<()> {
        println!("mgx {}", env!("CARGO_PKG_VERSION"));
        println!("Enter \".help\" for usage hints, \".seed\" for demo data.");
        println!();

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let trimmed = line.trim().to_string();
                    if trimmed.is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(&trimmed).ok();
                    if !self.handle_line(&trimmed) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => println!("^C"),
                Err(ReadlineError::Eof) => {
                    println!("Bye");
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {}", err);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Returns false when the shell should exit.
    fn handle_line(&mut self, line: &str) -> bool {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((head, tail)) => (head, tail.trim()),
            None => (line, ""),
        };

        let outcome = match command {
            ".quit" | ".exit" => return false,
            ".help" => {
                print_help();
                Ok(())
            }
            ".seed" => self.seed(),
            "set" => self.cmd_set(rest),
            "kill" => self.cmd_kill(rest),
            "data" => self.cmd_data(rest),
            "format" => self.cmd_format(rest),
            "order" => self.open(self.order_spec(rest)),
            "query" => self.open(self.range_spec(rest)),
            "dir" => {
                let spec = CursorSpec::directory().fetch_data(self.fetch_data).format(self.format);
                self.open(Ok(spec))
            }
            "sql" => self.cmd_sql(rest),
            "next" => self.step(rest, true),
            "prev" => self.step(rest, false),
            "cleanup" => self.cmd_cleanup(),
            "close" => {
                if let Some(mut cursor) = self.cursor.take() {
                    cursor.close();
                    println!("(closed)");
                }
                Ok(())
            }
            other => Err(eyre::eyre!("unknown command: {} (try .help)", other)),
        };

        if let Err(e) = outcome {
            eprintln!("Error: {}", e);
        }
        true
    }

    fn seed(&mut self) -> Result<()> {
        let mut store = self.conn.lock();
        store.set("customer", &["1"], "Smith");
        store.set("customer", &["2"], "Jones");
        store.set("customer", &["2", "addr"], "London");
        store.set("customer", &["3"], "Brown");
        store.set("order", &["1", "line", "1"], "widget*3");
        store.set("order", &["1", "line", "2"], "gadget*1");
        store.stage_statement(StagedStatement::ok(
            vec![
                SqlColumn::with_type("id", "INTEGER"),
                SqlColumn::with_type("name", "VARCHAR"),
            ],
            vec![
                vec![Some("1".into()), Some("Smith".into())],
                vec![Some("2".into()), Some("Jones".into())],
                vec![Some("3".into()), None],
            ],
        ));
        println!("Seeded ^customer, ^order, and one staged SQL result.");
        Ok(())
    }

    /// `set global(k1,k2)=value`
    fn cmd_set(&mut self, rest: &str) -> Result<()> {
        let (target, value) = rest
            .split_once('=')
            .ok_or_else(|| eyre::eyre!("usage: set global(k1,k2)=value"))?;
        let (global, keys) = parse_target(target.trim())?;
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.conn.lock().set(&global, &key_refs, value.trim());
        Ok(())
    }

    /// `kill global(k1,k2)` or `kill global`
    fn cmd_kill(&mut self, rest: &str) -> Result<()> {
        let (global, keys) = parse_target(rest)?;
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.conn.lock().kill(&global, &key_refs);
        Ok(())
    }

    fn cmd_data(&mut self, rest: &str) -> Result<()> {
        self.fetch_data = match rest {
            "on" => true,
            "off" => false,
            _ => return Err(eyre::eyre!("usage: data on|off")),
        };
        println!("data retrieval {} (applies to newly opened cursors)", rest);
        Ok(())
    }

    fn cmd_format(&mut self, rest: &str) -> Result<()> {
        self.format = match rest {
            "flat" => OutputFormat::Flattened,
            "struct" => OutputFormat::Structured,
            _ => return Err(eyre::eyre!("usage: format flat|struct")),
        };
        println!("output format: {}", rest);
        Ok(())
    }

    fn order_spec(&self, rest: &str) -> Result<CursorSpec> {
        let mut parts: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
        if parts.is_empty() {
            return Err(eyre::eyre!("usage: order global [key ...]"));
        }
        let global = parts.remove(0);
        if parts.is_empty() {
            parts.push(String::new()); // start before the first subscript
        }
        Ok(CursorSpec::global_order(global, parts)
            .fetch_data(self.fetch_data)
            .format(self.format))
    }

    fn range_spec(&self, rest: &str) -> Result<CursorSpec> {
        let mut parts: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
        if parts.is_empty() {
            return Err(eyre::eyre!("usage: query global [key ...]"));
        }
        let global = parts.remove(0);
        Ok(CursorSpec::range(global, parts)
            .fetch_data(self.fetch_data)
            .format(self.format))
    }

    fn open(&mut self, spec: Result<CursorSpec>) -> Result<()> {
        let spec = spec?;
        let cursor = Cursor::open(self.conn.clone(), spec)?;
        self.cursor = Some(cursor);
        println!("(cursor ready; use next/prev)");
        Ok(())
    }

    fn cmd_sql(&mut self, statement: &str) -> Result<()> {
        if statement.is_empty() {
            return Err(eyre::eyre!("usage: sql <statement>"));
        }
        if self.cursor.as_ref().and_then(|c| c.sql_result()).is_none() {
            self.cursor = Some(Cursor::open(
                self.conn.clone(),
                CursorSpec::sql().fetch_data(self.fetch_data).format(self.format),
            )?);
        }
        let cursor = self.cursor.as_mut().expect("cursor just opened");
        let summary = cursor.execute(statement, &[])?;
        match &summary.error {
            Some(error) => println!(
                "execution failed (code {}, state {}): {}",
                summary.status_code, summary.status_state, error
            ),
            None => {
                let names: Vec<&str> = summary
                    .columns
                    .iter()
                    .flatten()
                    .map(|c| c.name.as_str())
                    .collect();
                println!(
                    "OK (code {}, state {}); columns: {}",
                    summary.status_code,
                    summary.status_state,
                    names.join(", ")
                );
            }
        }
        Ok(())
    }

    fn cmd_cleanup(&mut self) -> Result<()> {
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| eyre::eyre!("no open cursor"))?;
        let status = cursor.cleanup()?;
        println!("{}", status);
        Ok(())
    }

    fn step(&mut self, rest: &str, forward: bool) -> Result<()> {
        let count: usize = if rest.is_empty() {
            1
        } else {
            rest.parse().wrap_err("step count must be a number")?
        };
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| eyre::eyre!("no open cursor (use order/query/dir/sql)"))?;
        for _ in 0..count {
            let step = if forward { cursor.next()? } else { cursor.previous()? };
            match step {
                None => {
                    println!("(end)");
                    break;
                }
                Some(output) => print_output(&output),
            }
        }
        Ok(())
    }
}

/// Parses `global(k1,k2)` or a bare `global` into name + keys.
fn parse_target(text: &str) -> Result<(String, Vec<String>)> {
    if text.is_empty() {
        return Err(eyre::eyre!("expected a global reference"));
    }
    match text.split_once('(') {
        None => Ok((text.to_string(), Vec::new())),
        Some((name, tail)) => {
            let inner = tail
                .strip_suffix(')')
                .ok_or_else(|| eyre::eyre!("unterminated subscript list in {:?}", text))?;
            let keys = inner
                .split(',')
                .map(|part| part.trim().trim_matches('"').to_string())
                .collect();
            Ok((name.to_string(), keys))
        }
    }
}

fn print_output(output: &StepOutput) {
    match output {
        StepOutput::Value(value) => println!("{}", value),
        StepOutput::Flat(flat) => println!("{}", flat),
        StepOutput::Record { key, data } => {
            let joined = key.join(",");
            match data {
                Some(data) => println!("({}) = {}", joined, data),
                None => println!("({})", joined),
            }
        }
        StepOutput::Row(pairs) => {
            let rendered: Vec<String> = pairs
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            println!("{}", rendered.join("  "));
        }
    }
}

fn print_help() {
    println!("mgx shell commands:");
    println!("  set g(k1,k2)=v     store a value");
    println!("  kill g[(k1,..)]    remove a node and its subtree");
    println!("  order g [key ..]   walk subscripts of one global");
    println!("  query g [key ..]   walk all records under a seed key");
    println!("  dir                walk the namespace's global names");
    println!("  sql <statement>    execute a statement (see .seed)");
    println!("  next [n] / prev [n] step the open cursor");
    println!("  cleanup            release the executed statement");
    println!("  close              close the open cursor");
    println!("  data on|off        also fetch data values");
    println!("  format flat|struct flattened or structured output");
    println!("  .seed              load demo globals and one SQL result");
    println!("  .help  .quit");
}
