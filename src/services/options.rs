// src/services/options.rs

//! Option resolution for `<select>` lists.
//!
//! Both resolvers locate the list by its `name` attribute and never look past
//! its closing tag. Matching is exact; when several options qualify, the
//! first one in document order wins.

use crate::error::{AppError, Result};
use crate::models::{ResolvedSelection, SelectableOption, SelectionKind};
use crate::scanner::{ScanError, Token};
use crate::utils::normalize_whitespace;

/// Resolve the season the server marks as currently selected.
pub fn resolve_season(
    tokens: impl IntoIterator<Item = Token>,
    select_name: &str,
) -> Result<ResolvedSelection> {
    let mut tokens = tokens.into_iter();
    open_list(&mut tokens, select_name)?;

    while let Some(token) = tokens.next() {
        match token {
            Token::EndTag(name) if name == "select" => break,
            Token::StartTag(tag) if tag.name() == "option" && tag.has_attr("selected") => {
                let value = option_value(tag.attr("value"), select_name);
                let label = read_label(&mut tokens);
                log::debug!("Selected season option: {value} ({label})");
                return Ok(ResolvedSelection::new(
                    SelectionKind::Season,
                    SelectableOption { value, label },
                ));
            }
            Token::Error(err) => end_of_list(err, select_name)?,
            _ => {}
        }
    }

    Err(AppError::not_found("no current season"))
}

/// Resolve the option whose visible text equals `team_name`.
pub fn resolve_team(
    tokens: impl IntoIterator<Item = Token>,
    select_name: &str,
    team_name: &str,
) -> Result<ResolvedSelection> {
    let mut tokens = tokens.into_iter();
    open_list(&mut tokens, select_name)?;

    let mut current: Option<String> = None;
    for token in tokens {
        match token {
            Token::EndTag(name) if name == "select" => break,
            Token::StartTag(tag) if tag.name() == "option" => {
                current = Some(option_value(tag.attr("value"), select_name));
            }
            Token::Text(text) if text == team_name => {
                let value = current.unwrap_or_else(|| {
                    log::warn!("Team '{team_name}' matched outside any option");
                    String::new()
                });
                log::debug!("Found team '{team_name}' with value {value}");
                return Ok(ResolvedSelection::new(
                    SelectionKind::Team,
                    SelectableOption {
                        value,
                        label: text,
                    },
                ));
            }
            Token::Error(err) => end_of_list(err, select_name)?,
            _ => {}
        }
    }

    Err(AppError::not_found(format!("team not found: {team_name}")))
}

/// Advance past the `<select name="...">` start tag.
fn open_list(tokens: &mut impl Iterator<Item = Token>, select_name: &str) -> Result<()> {
    for token in tokens.by_ref() {
        match token {
            Token::StartTag(tag)
                if tag.name() == "select" && tag.attr("name") == Some(select_name) =>
            {
                log::debug!("Found select list {select_name}");
                return Ok(());
            }
            Token::Error(ScanError::EndOfStream) => break,
            Token::Error(err) => {
                return Err(AppError::malformed(format!(
                    "page ended before select list {select_name}: {err}"
                )));
            }
            _ => {}
        }
    }
    Err(AppError::not_found(format!("select list {select_name}")))
}

/// Map the terminal token inside a list to its error.
///
/// A clean end of stream is left to the caller's not-found error.
fn end_of_list(err: ScanError, select_name: &str) -> Result<()> {
    match err {
        ScanError::EndOfStream => Ok(()),
        err => Err(AppError::malformed(format!(
            "page ended inside select list {select_name}: {err}"
        ))),
    }
}

fn option_value(value: Option<&str>, select_name: &str) -> String {
    match value {
        Some(value) => value.to_string(),
        None => {
            log::warn!("Option without value attribute in {select_name}");
            String::new()
        }
    }
}

/// Visible text of the option just opened, if any comes before the next tag boundary.
fn read_label(tokens: &mut impl Iterator<Item = Token>) -> String {
    for token in tokens {
        match token {
            Token::Text(text) => {
                let text = normalize_whitespace(&text);
                if !text.is_empty() {
                    return text;
                }
            }
            Token::StartTag(_) | Token::EndTag(_) | Token::Error(_) => break,
            Token::SelfClosingTag(_) => {}
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ReplayableSource;

    const SEASON: &str = "ctl00$mainContent$ctl01$ddlSeason";
    const TEAMS: &str = "ctl00$mainContent$ctl01$ddlTeams";

    const PAGE: &str = r#"
<select name="ctl00$mainContent$ctl01$ddlSeason" id="ctl00_mainContent_ctl01_ddlSeason">
    <option value="5">2023</option>
    <option selected="selected" value="6">2024</option>
</select>
<select name="ctl00$mainContent$ctl01$ddlTeams" id="ctl00_mainContent_ctl01_ddlTeams">
    <option value="0">All Teams</option>
    <option value="10">Lions</option>
    <option value="11">Megpies FC</option>
</select>
<p>Outside Team</p>"#;

    fn source() -> ReplayableSource {
        ReplayableSource::from(PAGE)
    }

    #[test]
    fn test_resolves_selected_season() {
        let season = resolve_season(source().scan(), SEASON).unwrap();
        assert_eq!(season.kind, SelectionKind::Season);
        assert_eq!(season.value(), "6");
        assert_eq!(season.label(), "2024");
    }

    #[test]
    fn test_season_without_selected_option() {
        let html = r#"<select name="s"><option value="5">2023</option></select>
<select name="t"><option selected value="9">x</option></select>"#;
        let err = resolve_season(ReplayableSource::from(html).scan(), "s").unwrap_err();
        assert!(matches!(&err, AppError::NotFound(msg) if msg == "no current season"));
    }

    #[test]
    fn test_resolves_named_team() {
        let team = resolve_team(source().scan(), TEAMS, "Megpies FC").unwrap();
        assert_eq!(team.kind, SelectionKind::Team);
        assert_eq!(team.value(), "11");
        assert_eq!(team.label(), "Megpies FC");
    }

    #[test]
    fn test_missing_team_names_the_team() {
        let err = resolve_team(source().scan(), TEAMS, "Tigers").unwrap_err();
        assert_eq!(err.to_string(), "Not found: team not found: Tigers");
    }

    #[test]
    fn test_team_search_stops_at_list_end() {
        let err = resolve_team(source().scan(), TEAMS, "Outside Team").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_team_match_is_exact() {
        assert!(resolve_team(source().scan(), TEAMS, "megpies fc").is_err());
        assert!(resolve_team(source().scan(), TEAMS, "Megpies FC ").is_err());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let html = r#"<select name="t"><option value="1">Lions</option><option value="2">Lions</option></select>"#;
        let team = resolve_team(ReplayableSource::from(html).scan(), "t", "Lions").unwrap();
        assert_eq!(team.value(), "1");
    }

    #[test]
    fn test_missing_list_is_not_found() {
        let err = resolve_season(source().scan(), "ctl00$other").unwrap_err();
        assert!(matches!(&err, AppError::NotFound(msg) if msg.contains("ctl00$other")));
    }

    #[test]
    fn test_truncated_list_is_malformed() {
        let html = r#"<select name="t"><option value="1">Lions</option><option value="2"#;
        let err = resolve_team(ReplayableSource::from(html).scan(), "t", "Tigers").unwrap_err();
        assert!(matches!(err, AppError::MalformedMarkup(_)));
    }
}
