//! Line-oriented front-end over a [`Session`].

use crate::config::Settings;
use crate::pdf::render::{PdfiumRenderer, DEFAULT_PREVIEW_DPI};
use crate::session::Session;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;

const HELP: &str = "\
Commands:
  show                 current page and its settings
  next | n             next page
  prev | p             previous page
  goto N | g N         jump to page N
  name TEXT            set the file name for this page
  type LABEL|NUMBER    set the document type for this page
  text                 print this page's text
  preview FILE [DPI]   render this page to a PNG file
  status               settings for every page
  categories           list document types
  save                 export this page
  save-all             export every page
  clear                reset every page's settings
  open FILE            load another PDF (settings are reset)
  help                 this message
  quit | q             leave";

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output_dir: Q, settings: Settings) -> Result<()> {
    let mut session = Session::open(&input, &output_dir, settings, Box::new(PdfiumRenderer))
        .with_context(|| format!("Cannot start session for {}", input.as_ref().display()))?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    writeln!(
        stdout,
        "Exporting into {}. Type 'help' for commands.",
        session.output_folder().display()
    )?;
    show(&session, &mut stdout)?;

    loop {
        write!(stdout, "[{}/{}]> ", session.current_index() + 1, session.total_pages())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if execute(&mut session, &line, &mut stdout)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

/// Run one command line against the session. Failures of the command itself
/// are reported to `out`; only write errors on `out` are returned.
pub fn execute<W: Write>(session: &mut Session, line: &str, out: &mut W) -> Result<Flow> {
    let line = line.trim();
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match command {
        "" | "show" => show(session, out)?,
        "next" | "n" => {
            session.next();
            show(session, out)?;
        }
        "prev" | "p" => {
            session.previous();
            show(session, out)?;
        }
        "goto" | "g" => match arg.parse::<i64>() {
            Ok(page) => {
                session.jump_to_page(page);
                show(session, out)?;
            }
            Err(_) => writeln!(out, "Usage: goto N")?,
        },
        "name" => {
            session.edit(Some(arg), None);
            show(session, out)?;
        }
        "type" => match resolve_doc_type(session, arg) {
            Some(label) => {
                session.edit(None, Some(&label));
                show(session, out)?;
            }
            None => {
                writeln!(out, "Unknown document type '{}'", arg)?;
                list_categories(session, out)?;
            }
        },
        "text" => match session.page_text() {
            Ok(text) => writeln!(out, "{}", text)?,
            Err(e) => writeln!(out, "Error: {:#}", e)?,
        },
        "preview" => preview(session, arg, out)?,
        "status" => status(session, out)?,
        "categories" => list_categories(session, out)?,
        "save" => match session.save_current() {
            Ok(path) => writeln!(out, "Saved {}", path.display())?,
            Err(e) => writeln!(out, "Error: {:#}", anyhow::Error::from(e))?,
        },
        "save-all" => match session.save_all() {
            Ok(report) => {
                writeln!(out, "Saved {} page(s)", report.success_count())?;
                for failure in &report.failures {
                    writeln!(out, "  page {}: {}", failure.page + 1, failure.error)?;
                }
            }
            Err(e) => writeln!(out, "Error: {:#}", anyhow::Error::from(e))?,
        },
        "clear" => {
            session.clear_all();
            writeln!(out, "All page settings cleared")?;
            show(session, out)?;
        }
        "open" => match session.load_document(arg) {
            Ok(()) => show(session, out)?,
            Err(e) => writeln!(out, "Error: {:#}", anyhow::Error::from(e))?,
        },
        "help" | "?" => writeln!(out, "{}", HELP)?,
        "quit" | "q" | "exit" => return Ok(Flow::Quit),
        other => writeln!(out, "Unknown command '{}'. Type 'help' for commands.", other)?,
    }
    Ok(Flow::Continue)
}

/// Accept a label as typed (case-insensitive) or its 1-based position in the list.
fn resolve_doc_type(session: &Session, arg: &str) -> Option<String> {
    let categories = session.categories();
    if let Ok(n) = arg.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| categories.labels().nth(i))
            .map(str::to_string);
    }
    categories
        .labels()
        .find(|label| label.eq_ignore_ascii_case(arg))
        .map(str::to_string)
}

fn show<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let config = session.current();
    writeln!(
        out,
        "Page {} / {}",
        session.current_index() + 1,
        session.total_pages()
    )?;
    writeln!(out, "  File name: {}", config.display_file_name())?;
    writeln!(out, "  Type:      {}", config.display_doc_type())?;
    if session.is_current_configured() {
        writeln!(out, "  Ready to save")?;
    }
    Ok(())
}

fn status<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let configurations = session.store().configurations();
    for (index, config) in configurations.iter().enumerate() {
        let marker = if index == session.current_index() { '>' } else { ' ' };
        writeln!(
            out,
            "{} {:>4}  {:<30}  {}",
            marker,
            index + 1,
            config.display_file_name(),
            config.display_doc_type()
        )?;
    }
    let unset = configurations.iter().filter(|c| c.is_unset()).count();
    if unset > 0 {
        writeln!(out, "{} of {} page(s) not started", unset, configurations.len())?;
    }
    Ok(())
}

fn list_categories<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    for (i, (label, folder)) in session.categories().iter().enumerate() {
        writeln!(out, "  {}. {} ({})", i + 1, label, folder)?;
    }
    Ok(())
}

fn preview<W: Write>(session: &Session, arg: &str, out: &mut W) -> Result<()> {
    let mut parts = arg.split_whitespace();
    let Some(file) = parts.next() else {
        writeln!(out, "Usage: preview FILE [DPI]")?;
        return Ok(());
    };
    let dpi = match parts.next().map(str::parse::<u32>) {
        None => DEFAULT_PREVIEW_DPI,
        Some(Ok(dpi)) if dpi > 0 => dpi,
        Some(_) => {
            writeln!(out, "DPI must be a positive number")?;
            return Ok(());
        }
    };

    match session.preview(dpi) {
        Ok(preview) => match std::fs::write(file, &preview.png) {
            Ok(()) if preview.placeholder => {
                writeln!(out, "Page could not be rendered; wrote a placeholder to {}", file)?
            }
            Ok(()) => writeln!(out, "Wrote {}", file)?,
            Err(e) => writeln!(out, "Error: cannot write {}: {}", file, e)?,
        },
        Err(e) => writeln!(out, "Error: {}", e)?,
    }
    Ok(())
}
