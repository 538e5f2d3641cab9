// src/services/hidden_state.rs

//! Hidden-state extraction.
//!
//! Collects the WebForms hidden fields a postback must echo back:
//!
//! ```text
//! <input type="hidden" name="__VIEWSTATEFIELDCOUNT" id="__VIEWSTATEFIELDCOUNT" value="3" />
//! <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="TVzIffnW..." />
//! <input type="hidden" name="__VIEWSTATE1" id="__VIEWSTATE1" value="wsUfB..." />
//! <input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="A1B2C3D4" />
//! <input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="/wEdAA..." />
//! ```

use crate::error::{AppError, Result};
use crate::models::{
    EVENT_VALIDATION, HiddenStateBundle, VIEW_STATE_FIELD_COUNT, VIEW_STATE_GENERATOR,
};
use crate::scanner::{ScanError, Tag, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HiddenField {
    ViewState,
    Validation,
    Generator,
}

impl HiddenField {
    fn from_name(name: &str) -> Option<Self> {
        if name == VIEW_STATE_GENERATOR {
            Some(Self::Generator)
        } else if name == EVENT_VALIDATION {
            Some(Self::Validation)
        } else if name.contains("VIEWSTATE") && name != VIEW_STATE_FIELD_COUNT {
            Some(Self::ViewState)
        } else {
            None
        }
    }
}

/// Extract the hidden state bundle from one full scan of a page.
///
/// Fails with [`AppError::NotFound`] when the page carries no view state and
/// with [`AppError::MalformedMarkup`] when the scan breaks off.
pub fn extract_hidden_state(tokens: impl IntoIterator<Item = Token>) -> Result<HiddenStateBundle> {
    let mut view_states = Vec::new();
    let mut validation: Option<String> = None;
    let mut generator: Option<String> = None;

    for token in tokens {
        let tag = match token {
            Token::SelfClosingTag(tag) | Token::StartTag(tag)
                if tag.name() == "input" && tag.has_attributes() =>
            {
                tag
            }
            Token::Error(ScanError::EndOfStream) => break,
            Token::Error(err) => {
                return Err(AppError::malformed(format!(
                    "page ended while reading hidden fields: {err}"
                )));
            }
            _ => continue,
        };

        match classify(tag) {
            Some((HiddenField::ViewState, value)) => {
                log::debug!("Found view state fragment {}", view_states.len() + 1);
                view_states.push(value);
            }
            Some((HiddenField::Validation, value)) => {
                validation.get_or_insert(value);
            }
            Some((HiddenField::Generator, value)) => {
                generator.get_or_insert(value);
            }
            None => {}
        }
    }

    if view_states.is_empty() {
        return Err(AppError::not_found(
            "view state hidden fields (page is not postback-capable)",
        ));
    }
    if validation.is_none() {
        log::warn!("No {EVENT_VALIDATION} field on page; posting an empty token");
    }
    if generator.is_none() {
        log::warn!("No {VIEW_STATE_GENERATOR} field on page; posting an empty token");
    }

    log::debug!("Extracted {} view state fragments", view_states.len());
    Ok(HiddenStateBundle::new(
        view_states,
        validation.unwrap_or_default(),
        generator.unwrap_or_default(),
    ))
}

/// Classify a hidden input by its attributes, in document order.
///
/// A `type` other than `hidden` abandons the element.
fn classify(tag: Tag) -> Option<(HiddenField, String)> {
    let mut hidden = false;
    let mut field = None;
    let mut value = None;

    for attr in tag.into_attributes() {
        match attr.key.as_str() {
            "type" => {
                if attr.value != "hidden" {
                    return None;
                }
                hidden = true;
            }
            "name" => field = HiddenField::from_name(&attr.value),
            "value" => value = Some(attr.value),
            _ => {}
        }
    }

    if !hidden {
        return None;
    }
    Some((field?, value.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ReplayableSource;

    fn extract(html: &str) -> Result<HiddenStateBundle> {
        extract_hidden_state(ReplayableSource::from(html).scan())
    }

    const PAGE: &str = r#"
<form method="post" action="./soccer-schedule.aspx" id="form1">
<div class="aspNetHidden">
<input type="hidden" name="__EVENTTARGET" id="__EVENTTARGET" value="" />
<input type="hidden" name="__EVENTARGUMENT" id="__EVENTARGUMENT" value="" />
<input type="hidden" name="__LASTFOCUS" id="__LASTFOCUS" value="" />
<input type="hidden" name="__VIEWSTATEFIELDCOUNT" id="__VIEWSTATEFIELDCOUNT" value="3" />
<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="first+/=" />
<input type="hidden" name="__VIEWSTATE1" id="__VIEWSTATE1" value="second" />
<input type="hidden" name="__VIEWSTATE2" id="__VIEWSTATE2" value="third" />
</div>
<div class="aspNetHidden">
<input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="G1" />
<input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="V1" />
</div>
<input type="text" name="__VIEWSTATE_DECOY" value="nope" />
</form>"#;

    #[test]
    fn test_extracts_fragments_in_document_order() {
        let bundle = extract(PAGE).unwrap();
        assert_eq!(bundle.view_states(), &["first+/=", "second", "third"]);
        assert_eq!(bundle.event_validation(), "V1");
        assert_eq!(bundle.generator(), "G1");
    }

    #[test]
    fn test_non_hidden_input_is_abandoned() {
        let bundle = extract(PAGE).unwrap();
        assert!(!bundle.view_states().iter().any(|v| v == "nope"));
    }

    #[test]
    fn test_void_input_without_slash_is_read() {
        let html = r#"<input type="hidden" name="__VIEWSTATE" value="A"><input type=hidden name=__VIEWSTATE1 value=B>"#;
        let bundle = extract(html).unwrap();
        assert_eq!(bundle.view_states(), &["A", "B"]);
    }

    #[test]
    fn test_attribute_order_does_not_matter() {
        let html = r#"<input value="A" name="__VIEWSTATE" type="hidden" />"#;
        assert_eq!(extract(html).unwrap().view_states(), &["A"]);
    }

    #[test]
    fn test_missing_tokens_default_to_empty() {
        let html = r#"<input type="hidden" name="__VIEWSTATE" value="A" />"#;
        let bundle = extract(html).unwrap();
        assert_eq!(bundle.event_validation(), "");
        assert_eq!(bundle.generator(), "");
    }

    #[test]
    fn test_page_without_view_state_is_not_found() {
        let html = r#"<input type="hidden" name="__EVENTTARGET" value="" />"#;
        assert!(matches!(extract(html), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_truncated_page_is_malformed() {
        let html = r#"<input type="hidden" name="__VIEWSTATE" value="A" /><input type="hidden" name="__VIEWSTATE1" value="B"#;
        assert!(matches!(extract(html), Err(AppError::MalformedMarkup(_))));
    }
}
