//! Text commands for scripted / interactive sessions.
//!
//! One command per line, words separated by whitespace. Trailing free text
//! (inserted text, queries, replacements, markup) runs to the end of the
//! line; `\n` and `\t` escapes inside it are expanded. Offsets are byte
//! offsets into the flattened text. Page numbers are one-based here and
//! converted to zero-based indices.
//!
//! Parsing is pure: malformed input becomes `ParsedCommand::Unknown`
//! carrying a message for the session to print.

use crate::{Action, BlockType, InlineStyle};
use core_paste::ClipboardPayload;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    Action(Action),
    Status,
    Text,
    Markup,
    Pages,
    Help,
    /// Let timers run before reading the next command.
    Wait(Duration),
    Quit,
    Unknown(String),
}

pub const HELP: &str = "\
insert <at> <text>          type text at an offset
delete <start> <end>        delete a range
paste <at> <html>           paste markup (sanitized)
paste-text <at> <text>      paste plain text
style <names> <start> <end> bold|italic|underline|strike, joined with +
block <tag> <at>            p h1 h2 h3 blockquote pre
link <start> <end> <url>    link a range (collapsed range inserts the url)
image <at> <data-uri>       insert a data:image/... uri
find <query>                set the search query
next | prev                 cycle matches
replace <text>              replace the active match
replace-all <text>          replace every match
undo | redo | save
page <n>                    jump to page n (1-based)
scroll <y>                  report a scroll offset
caret <at>|none             report a caret position
resize                      report a surface resize
wait <ms>                   let timers run
status | text | markup | pages | help | quit";

pub fn parse_command(raw: &str) -> ParsedCommand {
    let line = raw.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim_start()),
        None => (line, ""),
    };
    match parse_inner(head, rest) {
        Ok(cmd) => cmd,
        Err(msg) => ParsedCommand::Unknown(msg),
    }
}

fn parse_inner(head: &str, rest: &str) -> Result<ParsedCommand, String> {
    let act = |a: Action| Ok(ParsedCommand::Action(a));
    match head {
        "" => Err(String::new()),
        "status" => Ok(ParsedCommand::Status),
        "text" => Ok(ParsedCommand::Text),
        "markup" => Ok(ParsedCommand::Markup),
        "pages" => Ok(ParsedCommand::Pages),
        "help" | "?" => Ok(ParsedCommand::Help),
        "quit" | "q" | "exit" => Ok(ParsedCommand::Quit),
        "wait" => Ok(ParsedCommand::Wait(Duration::from_millis(number(rest, "ms")?))),
        "undo" => act(Action::Undo),
        "redo" => act(Action::Redo),
        "save" | "w" => act(Action::Save),
        "next" => act(Action::FindNext),
        "prev" => act(Action::FindPrev),
        "resize" => act(Action::Resize),
        "find" => act(Action::SetQuery(unescape(rest))),
        "replace" => act(Action::ReplaceOne(unescape(rest))),
        "replace-all" => act(Action::ReplaceAll(unescape(rest))),
        "insert" => {
            let (at, text) = offset_then_text(rest)?;
            act(Action::InsertText { at, text })
        }
        "delete" => {
            let (start, end) = range(rest)?;
            act(Action::DeleteRange { start, end })
        }
        "paste" => {
            let (at, html) = offset_then_text(rest)?;
            act(Action::Paste {
                at,
                payload: ClipboardPayload::html(html),
            })
        }
        "paste-text" => {
            let (at, text) = offset_then_text(rest)?;
            act(Action::Paste {
                at,
                payload: ClipboardPayload::text(text),
            })
        }
        "style" => {
            let (names, tail) = split_word(rest);
            let style =
                InlineStyle::parse(names).ok_or_else(|| format!("unknown style '{names}'"))?;
            let (start, end) = range(tail)?;
            act(Action::ApplyInlineStyle { start, end, style })
        }
        "block" => {
            let (tag, tail) = split_word(rest);
            let block = tag.parse::<BlockType>()?;
            act(Action::SetBlockType {
                at: number(tail, "offset")? as usize,
                block,
            })
        }
        "link" => {
            let (start, tail) = split_word(rest);
            let (end, url) = split_word(tail);
            if url.is_empty() {
                return Err("link needs <start> <end> <url>".into());
            }
            act(Action::InsertLink {
                start: number(start, "start")? as usize,
                end: number(end, "end")? as usize,
                url: url.to_string(),
            })
        }
        "image" => {
            let (at, uri) = offset_then_text(rest)?;
            act(Action::InsertImage { at, data_uri: uri })
        }
        "page" => {
            let n = number(rest, "page")?;
            if n == 0 {
                return Err("pages are numbered from 1".into());
            }
            act(Action::JumpToPage(n as usize - 1))
        }
        "scroll" => {
            let y = rest
                .trim()
                .parse::<f32>()
                .map_err(|_| format!("invalid scroll offset '{rest}'"))?;
            act(Action::Scroll(y))
        }
        "caret" => match rest.trim() {
            "none" => act(Action::SelectionChanged(None)),
            other => act(Action::SelectionChanged(Some(number(other, "offset")? as usize))),
        },
        other => Err(format!("unknown command '{other}'")),
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.trim_start().split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim_start()),
        None => (s.trim(), ""),
    }
}

fn number(s: &str, what: &str) -> Result<u64, String> {
    let s = s.trim();
    s.parse::<u64>()
        .map_err(|_| format!("invalid {what} '{s}'"))
}

fn range(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = split_word(s);
    Ok((number(a, "start")? as usize, number(b, "end")? as usize))
}

fn offset_then_text(s: &str) -> Result<(usize, String), String> {
    let (at, text) = split_word(s);
    Ok((number(at, "offset")? as usize, unescape(text)))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_insert_keeps_spacing_and_escapes() {
        assert_eq!(
            parse_command("insert 4  hello  world\\n"),
            ParsedCommand::Action(Action::InsertText {
                at: 4,
                text: "hello  world\n".into()
            })
        );
    }

    #[test]
    fn parse_find_and_replace() {
        assert_eq!(
            parse_command("find cat"),
            ParsedCommand::Action(Action::SetQuery("cat".into()))
        );
        assert_eq!(
            parse_command("replace-all big dog"),
            ParsedCommand::Action(Action::ReplaceAll("big dog".into()))
        );
    }

    #[test]
    fn parse_style_and_block() {
        assert_eq!(
            parse_command("style bold+u 0 5"),
            ParsedCommand::Action(Action::ApplyInlineStyle {
                start: 0,
                end: 5,
                style: InlineStyle::BOLD | InlineStyle::UNDERLINE
            })
        );
        assert_eq!(
            parse_command("block h2 10"),
            ParsedCommand::Action(Action::SetBlockType {
                at: 10,
                block: BlockType::Heading2
            })
        );
    }

    #[test]
    fn parse_navigation() {
        assert_eq!(
            parse_command("page 3"),
            ParsedCommand::Action(Action::JumpToPage(2))
        );
        assert_eq!(
            parse_command("caret none"),
            ParsedCommand::Action(Action::SelectionChanged(None))
        );
        assert_eq!(
            parse_command("scroll 120.5"),
            ParsedCommand::Action(Action::Scroll(120.5))
        );
        assert_eq!(
            parse_command("wait 250"),
            ParsedCommand::Wait(Duration::from_millis(250))
        );
    }

    #[test]
    fn parse_errors_carry_messages() {
        assert_eq!(
            parse_command("page 0"),
            ParsedCommand::Unknown("pages are numbered from 1".into())
        );
        assert_eq!(
            parse_command("delete 3"),
            ParsedCommand::Unknown("invalid end ''".into())
        );
        assert_eq!(
            parse_command("frobnicate"),
            ParsedCommand::Unknown("unknown command 'frobnicate'".into())
        );
        assert_eq!(
            parse_command("block h5 0"),
            ParsedCommand::Unknown("unsupported block type 'h5'".into())
        );
        assert_eq!(parse_command("   "), ParsedCommand::Unknown(String::new()));
    }

    #[test]
    fn parse_link_and_paste() {
        assert_eq!(
            parse_command("link 0 4 https://example.com"),
            ParsedCommand::Action(Action::InsertLink {
                start: 0,
                end: 4,
                url: "https://example.com".into()
            })
        );
        assert_eq!(
            parse_command("paste 2 <b>x</b>"),
            ParsedCommand::Action(Action::Paste {
                at: 2,
                payload: ClipboardPayload::html("<b>x</b>")
            })
        );
    }
}
