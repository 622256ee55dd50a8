//! Terminal output for plans and search matches

use crate::backend::{FileMatch, LineMatch, Stats};
use crate::query::{structural, Plan};
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

pub fn stdout(color: bool) -> StandardStream {
    StandardStream::stdout(color_choice(color))
}

pub fn stderr(color: bool) -> StandardStream {
    StandardStream::stderr(color_choice(color))
}

/// Print each plan entry as query text followed by its structure
pub fn write_plan<W: WriteColor>(out: &mut W, plan: &Plan) -> io::Result<()> {
    for (i, basic) in plan.iter().enumerate() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, "{}", i)?;
        out.reset()?;
        write!(out, ": ")?;

        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{}", basic.string_human())?;
        out.reset()?;

        out.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(out, "  {}", structural(&basic.to_nodes()))?;
        out.reset()?;
    }
    Ok(())
}

/// Display path of a file match: `repository/file_name`
pub fn match_path(file: &FileMatch) -> String {
    if file.repository.is_empty() {
        file.file_name.clone()
    } else {
        format!("{}/{}", file.repository.trim_end_matches('/'), file.file_name)
    }
}

/// Print the line matches of one file in ripgrep-style format
pub fn write_file_match<W: WriteColor>(out: &mut W, file: &FileMatch, heading: bool) -> io::Result<()> {
    let path = match_path(file);

    if heading {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
        writeln!(out, "{}", path)?;
        out.reset()?;
    }

    if file.line_matches.is_empty() && !heading {
        // File-level match (e.g. type:path)
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        writeln!(out, "{}", path)?;
        out.reset()?;
    }

    for line in &file.line_matches {
        write_line_match(out, &path, line, heading)?;
    }

    Ok(())
}

fn write_line_match<W: WriteColor>(out: &mut W, path: &str, line: &LineMatch, heading: bool) -> io::Result<()> {
    if !heading {
        // Print path prefix when not using heading mode
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{}", path)?;
        out.reset()?;
        write!(out, ":")?;
    }

    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "{}", line.line_number)?;
    out.reset()?;
    write!(out, ":")?;

    let content = line.line.trim_end_matches(['\n', '\r']);
    let mut fragments: Vec<(usize, usize)> = line
        .line_fragments
        .iter()
        .map(|f| (f.offset, f.offset.saturating_add(f.match_length).min(content.len())))
        .filter(|&(start, end)| {
            start < end && content.is_char_boundary(start) && content.is_char_boundary(end)
        })
        .collect();
    fragments.sort_unstable();

    let mut cursor = 0;
    for (start, end) in fragments {
        // Overlapping fragments are highlighted once
        if start < cursor {
            continue;
        }
        write!(out, "{}", &content[cursor..start])?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", &content[start..end])?;
        out.reset()?;
        cursor = end;
    }
    writeln!(out, "{}", &content[cursor..])?;

    Ok(())
}

/// One-line summary of a finished search
pub fn write_stats<W: WriteColor>(out: &mut W, stats: &Stats) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_dimmed(true))?;
    writeln!(
        out,
        "{} match(es) in {} file(s), {} shard(s) scanned",
        stats.match_count, stats.file_count, stats.shards_scanned
    )?;
    out.reset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LineFragment;
    use crate::query::{pipeline, ParserOptions};
    use termcolor::Buffer;

    fn render<F: FnOnce(&mut Buffer) -> io::Result<()>>(f: F) -> String {
        let mut buf = Buffer::no_color();
        f(&mut buf).unwrap();
        String::from_utf8(buf.into_inner()).unwrap()
    }

    fn sample() -> FileMatch {
        FileMatch {
            repository: "github.com/acme/api".to_string(),
            file_name: "src/main.rs".to_string(),
            language: "Rust".to_string(),
            branches: vec![],
            line_matches: vec![LineMatch {
                line: "fn main() {}\n".to_string(),
                line_number: 3,
                line_fragments: vec![LineFragment {
                    offset: 3,
                    match_length: 4,
                }],
            }],
        }
    }

    #[test]
    fn test_inline_paths() {
        let text = render(|out| write_file_match(out, &sample(), false));
        assert_eq!(text, "github.com/acme/api/src/main.rs:3:fn main() {}\n");
    }

    #[test]
    fn test_heading_mode() {
        let text = render(|out| write_file_match(out, &sample(), true));
        assert_eq!(text, "github.com/acme/api/src/main.rs\n3:fn main() {}\n");
    }

    #[test]
    fn test_bad_fragments_ignored() {
        let mut file = sample();
        file.line_matches[0].line = "héllo".to_string();
        file.line_matches[0].line_fragments = vec![
            LineFragment { offset: 2, match_length: 1 },
            LineFragment { offset: 40, match_length: 2 },
        ];
        let text = render(|out| write_file_match(out, &file, true));
        assert!(text.ends_with("3:héllo\n"));
    }

    #[test]
    fn test_plan_lines() {
        let plan = pipeline("repo:x (a or b)", &ParserOptions::default()).unwrap();
        let text = render(|out| write_plan(out, &plan));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0: repo:x a  "));
        assert!(lines[1].starts_with("1: repo:x b  "));
    }
}
