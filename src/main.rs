use std::io::{self, Write};
use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use spindle::buffer::AccessMode;
use spindle::{Database, DiskGeometry, Result, SpindleError};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let base_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("cannot determine working directory: {err}");
            return ExitCode::FAILURE;
        }
    };

    let db = if Database::exists(&base_dir) {
        match Database::open(&base_dir) {
            Ok(db) => db,
            Err(err) => {
                eprintln!("cannot open disk: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("No disk found, one will be created.");
        let geometry = match prompt_geometry() {
            Ok(geometry) => geometry,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        };
        match Database::create(&base_dir, geometry) {
            Ok(db) => db,
            Err(err) => {
                eprintln!("cannot create disk: {err}");
                return ExitCode::FAILURE;
            }
        }
    };

    let geometry = db.geometry();
    println!("Disk geometry:");
    println!("  plates:             {}", geometry.plates);
    println!("  tracks per surface: {}", geometry.tracks);
    println!("  sectors per track:  {}", geometry.sectors);
    println!("  bytes per sector:   {}", geometry.bytes);
    println!("  sectors per block:  {}", geometry.block_size);
    println!();

    match repl(&db) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Reads the five geometry integers off stdin. Any invalid value aborts
/// disk creation.
fn prompt_geometry() -> std::result::Result<DiskGeometry, String> {
    let geometry = DiskGeometry {
        plates: prompt_int("plates")?,
        tracks: prompt_int("tracks per surface")?,
        sectors: prompt_int("sectors per track")?,
        bytes: prompt_int("bytes per sector")?,
        block_size: prompt_int("sectors per block")?,
    };
    geometry.validate().map_err(|err| err.to_string())?;
    Ok(geometry)
}

fn prompt_int(label: &str) -> std::result::Result<i32, String> {
    print!("{label}: ");
    io::stdout().flush().map_err(|err| err.to_string())?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(|err| err.to_string())?;
    line.trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", line.trim()))
}

fn repl(db: &Database) -> rustyline::Result<()> {
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("  > ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if let Err(err) = dispatch(db, line) {
                    eprintln!("{err}");
                }
            }
            Err(ReadlineError::Interrupted) => {}
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn dispatch(db: &Database, line: &str) -> Result<()> {
    let unknown = || SpindleError::UnknownCommand(line.to_string());
    let mut words = line.split_whitespace();
    let mut stdout = io::stdout().lock();

    match words.next() {
        Some("LOAD") => {
            let name = words.next().ok_or_else(unknown)?;
            let outcome = db.load_csv(name)?;
            println!("Loaded table {name} ({} records)", outcome.records());
            Ok(())
        }
        Some("SELECT") => {
            let (Some("*"), Some("FROM"), Some(table)) =
                (words.next(), words.next(), words.next())
            else {
                return Err(unknown());
            };
            match words.next() {
                None => db.select_all(table, &mut stdout),
                Some("WHERE") => db.select_where(table, rest_after(line, "WHERE"), &mut stdout),
                Some(_) => Err(unknown()),
            }
        }
        Some("DELETE") => {
            let (Some("FROM"), Some(table), Some("WHERE")) =
                (words.next(), words.next(), words.next())
            else {
                return Err(unknown());
            };
            db.delete_where(table, rest_after(line, "WHERE"), &mut stdout)
        }
        Some("INFO") => db.disk_info(&mut stdout),
        Some("BUFFER") => {
            println!("{}", db.buffer_status());
            Ok(())
        }
        Some("REQUEST") => {
            let page = parse_page(words.next(), unknown)?;
            let mode = match words.next() {
                Some("W") => AccessMode::Write,
                Some("L") => AccessMode::Read,
                _ => return Err(unknown()),
            };
            db.request_page(page, mode)?;
            println!("{}", db.buffer_status());
            Ok(())
        }
        Some("PIN") => {
            db.pin_page(parse_page(words.next(), unknown)?);
            println!("{}", db.buffer_status());
            Ok(())
        }
        Some("UNPIN") => {
            db.unpin_page(parse_page(words.next(), unknown)?);
            println!("{}", db.buffer_status());
            Ok(())
        }
        _ => Err(unknown()),
    }
}

/// The rest of `line` after the first occurrence of `keyword`.
fn rest_after<'a>(line: &'a str, keyword: &str) -> &'a str {
    line.find(keyword)
        .map(|pos| line[pos + keyword.len()..].trim())
        .unwrap_or("")
}

fn parse_page(
    word: Option<&str>,
    unknown: impl Fn() -> SpindleError,
) -> Result<i32> {
    word.and_then(|w| w.parse().ok()).ok_or_else(unknown)
}
