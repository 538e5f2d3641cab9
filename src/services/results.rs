// src/services/results.rs

//! Result table parsing.
//!
//! The postback answers with an update-panel delta whose results table looks
//! roughly like:
//!
//! ```text
//! <tr><td colspan="4" class="date">Sunday, March 3, 2024</td></tr>
//! <tr><td>9:00 PM</td><td>vs Lions</td><td>Burnaby 8 Rinks - Field 2</td></tr>
//! ```
//!
//! Every marker cell opens a [`ScheduleBlock`]; the ordinary cells after it
//! become the block's details. Blocks are then decomposed into games.

use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, NaiveTime};
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{GameRecord, ParseConfig, ScheduleBlock};
use crate::scanner::{ScanError, Tag, Token};
use crate::utils::normalize_whitespace;

/// Dates are parsed from their three-letter weekday and month prefixes.
const DATE_LAYOUT: &str = "%a, %b %d, %Y";
const TIME_LAYOUT: &str = "%I:%M %p";

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<weekday>(?:mon|tues|wednes|thurs|fri|satur|sun)day|tues|thurs|mon|tue|wed|thu|fri|sat|sun)\.?,?\s+(?P<month>[a-z]{3,9})\.?\s+(?P<day>\d{1,2}),?\s+(?P<year>\d{4})",
    )
    .expect("date pattern is valid")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<meridiem>[ap])\.?\s?m\b\.?")
        .expect("time pattern is valid")
});

static ASYNC_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\|(?P<kind>error|pageRedirect)\|(?P<code>[^|]*)\|(?P<message>[^|]*)\|")
        .expect("delta pattern is valid")
});

/// Fail when the postback answered with an error or redirect delta instead of content.
///
/// ```text
/// 52|error|500|The state information is invalid for this page|
/// 40|pageRedirect||/BURNABY8RINKS/Error.aspx|
/// ```
pub fn check_async_error(body: &str) -> Result<()> {
    match ASYNC_ERROR_RE.captures(body) {
        Some(caps) if &caps["kind"] == "pageRedirect" => Err(AppError::Rejected {
            code: "redirect".to_string(),
            message: caps["message"].to_string(),
        }),
        Some(caps) => Err(AppError::Rejected {
            code: caps["code"].to_string(),
            message: caps["message"].to_string(),
        }),
        None => Ok(()),
    }
}

/// Collect one block per marker cell, in document order.
///
/// `marker` names the attribute that marks a block cell; `None` accepts a
/// `<td>` with any attribute. The heading is the first text after the marker;
/// any later text in the marker cell becomes the block's first detail. A scan
/// that breaks off keeps the blocks read so far.
pub fn parse_blocks(
    tokens: impl IntoIterator<Item = Token>,
    marker: Option<&str>,
) -> Vec<ScheduleBlock> {
    let mut collector = BlockCollector::default();

    for token in tokens {
        match token {
            Token::StartTag(tag) if tag.name() == "td" => {
                if is_marker(&tag, marker) {
                    collector.open_block();
                } else {
                    collector.open_cell();
                }
            }
            Token::SelfClosingTag(tag) if tag.name() == "td" => {
                collector.close_cell();
            }
            Token::EndTag(name) if name == "td" || name == "tr" => collector.close_cell(),
            Token::EndTag(name) if name == "table" => collector.close_block(),
            Token::Text(text) => collector.text(&text),
            Token::Error(ScanError::EndOfStream) => break,
            Token::Error(err) => {
                log::warn!("Results markup ended early ({err}); keeping blocks read so far");
                break;
            }
            _ => {}
        }
    }

    collector.finish()
}

fn is_marker(tag: &Tag, marker: Option<&str>) -> bool {
    match marker {
        Some(attr) => tag.has_attr(attr),
        None => tag.has_attributes(),
    }
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<ScheduleBlock>,
    current: Option<ScheduleBlock>,
    cell: Option<String>,
}

impl BlockCollector {
    fn open_block(&mut self) {
        self.close_block();
        self.current = Some(ScheduleBlock::default());
        // Whatever follows the heading inside the marker cell is a detail.
        self.cell = Some(String::new());
    }

    fn open_cell(&mut self) {
        self.close_cell();
        if self.current.is_some() {
            self.cell = Some(String::new());
        }
    }

    fn close_cell(&mut self) {
        let Some(cell) = self.cell.take() else {
            return;
        };
        if let Some(block) = self.current.as_mut() {
            if !cell.is_empty() {
                block.details.push(cell);
            }
        }
    }

    fn close_block(&mut self) {
        self.close_cell();
        if let Some(block) = self.current.take() {
            if block.heading.is_empty() {
                log::debug!("Dropping marker cell without text");
            } else {
                self.blocks.push(block);
            }
        }
    }

    fn text(&mut self, raw: &str) {
        let text = normalize_whitespace(raw);
        if text.is_empty() {
            return;
        }
        let Some(block) = self.current.as_mut() else {
            return;
        };
        if block.heading.is_empty() {
            block.heading = text;
        } else if let Some(cell) = self.cell.as_mut() {
            append(cell, &text);
        }
    }

    fn finish(mut self) -> Vec<ScheduleBlock> {
        self.close_block();
        self.blocks
    }
}

fn append(target: &mut String, text: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

/// Turns schedule blocks into games.
pub struct GameParser {
    offset: FixedOffset,
}

impl GameParser {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Decompose one block.
    ///
    /// The date must appear in the heading. The time comes from the heading
    /// or else from the first detail holding one, and defaults to midnight.
    /// The remaining details give the opponent and then the location.
    pub fn parse_block(&self, block: &ScheduleBlock) -> Result<GameRecord> {
        let date = self.parse_date(&block.heading)?;

        let mut details: Vec<&str> = block.details.iter().map(String::as_str).collect();
        let time = match self.parse_time(&block.heading)? {
            Some(time) => time,
            None => match details.iter().position(|d| TIME_RE.is_match(d)) {
                Some(index) => {
                    let cell = details.remove(index);
                    self.parse_time(cell)?.unwrap_or(NaiveTime::MIN)
                }
                None => NaiveTime::MIN,
            },
        };

        let start_time = date
            .and_time(time)
            .and_local_timezone(self.offset)
            .single()
            .ok_or_else(|| AppError::parse(&block.heading, "ambiguous local time"))?;

        let mut rest = details.into_iter();
        Ok(GameRecord {
            start_time,
            opponent: rest.next().map(strip_versus).unwrap_or_default(),
            location: rest.next().map(str::to_string).unwrap_or_default(),
        })
    }

    fn parse_date(&self, text: &str) -> Result<NaiveDate> {
        let caps = DATE_RE
            .captures(text)
            .ok_or_else(|| AppError::parse(text, "no 'Weekday, Month D, YYYY' date"))?;
        let weekday = caps["weekday"].get(..3).unwrap_or_default();
        let month = caps["month"].get(..3).unwrap_or_default();
        let canonical = format!("{weekday}, {month} {}, {}", &caps["day"], &caps["year"]);
        NaiveDate::parse_from_str(&canonical, DATE_LAYOUT).map_err(|e| AppError::parse(text, e))
    }

    fn parse_time(&self, text: &str) -> Result<Option<NaiveTime>> {
        let Some(caps) = TIME_RE.captures(text) else {
            return Ok(None);
        };
        let meridiem = if caps["meridiem"].eq_ignore_ascii_case("p") {
            "PM"
        } else {
            "AM"
        };
        let canonical = format!("{}:{} {}", &caps["hour"], &caps["minute"], meridiem);
        NaiveTime::parse_from_str(&canonical, TIME_LAYOUT)
            .map(Some)
            .map_err(|e| AppError::parse(text, e))
    }
}

/// Drop a leading `vs`, `vs.` or `@` from an opponent cell.
fn strip_versus(cell: &str) -> String {
    let trimmed = cell.trim();
    let lower = trimmed.to_ascii_lowercase();
    let rest = if let Some(rest) = trimmed.strip_prefix('@') {
        rest
    } else if lower.starts_with("vs.") {
        &trimmed[3..]
    } else if lower.starts_with("vs ") || lower == "vs" {
        &trimmed[2..]
    } else {
        trimmed
    };
    rest.trim().to_string()
}

/// Parse every game in a postback response.
///
/// With `strict_dates` a block whose date cannot be read fails the whole
/// parse; otherwise it is skipped with a warning.
pub fn parse_games(
    tokens: impl IntoIterator<Item = Token>,
    config: &ParseConfig,
) -> Result<Vec<GameRecord>> {
    let parser = GameParser::new(config.offset()?);
    let blocks = parse_blocks(tokens, config.marker_attribute());
    log::debug!("Found {} schedule blocks", blocks.len());

    let mut games = Vec::with_capacity(blocks.len());
    for block in &blocks {
        match parser.parse_block(block) {
            Ok(game) => games.push(game),
            Err(e) if !config.strict_dates => {
                log::warn!("Skipping schedule block: {e}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(games)
}
