// src/services/postback.rs

//! Asynchronous partial postback.
//!
//! Rebuilds the form the page's script manager would send when the "Go"
//! button inside the results update panel is clicked, including the hidden
//! state captured from the initial page.

use url::form_urlencoded;

use crate::error::Result;
use crate::models::{
    EVENT_VALIDATION, HiddenStateBundle, ResolvedSelection, SiteConfig, VIEW_STATE_FIELD_COUNT,
    VIEW_STATE_GENERATOR,
};
use crate::utils::http::{
    Cookie, Page, Request, RetryPolicy, Transport, cookie_header, send_with_retry,
};

pub const EVENT_TARGET: &str = "__EVENTTARGET";
pub const ASYNC_POST: &str = "__ASYNCPOST";

/// Suffix of the framework-managed twin of each drop-down field.
const FRAMEWORK_SUFFIX: &str = "_f";

/// Form fields in the order they are encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostbackForm {
    fields: Vec<(String, String)>,
}

impl PostbackForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.fields {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    fn push_select(&mut self, control: &str, value: &str, framework_value: &str) {
        self.push(control, value);
        self.push(format!("{control}{FRAMEWORK_SUFFIX}"), framework_value);
    }
}

/// Assemble the postback form for one season and team.
pub fn build_form(
    site: &SiteConfig,
    bundle: &HiddenStateBundle,
    season: &ResolvedSelection,
    team: &ResolvedSelection,
) -> PostbackForm {
    let mut form = PostbackForm::new();

    form.push(
        &site.script_manager_field,
        format!("{}|{}", site.update_panel, site.go_button),
    );
    form.push_select(&site.season_select, season.value(), season.value());
    form.push_select(&site.team_select, team.value(), "0");
    form.push_select(&site.division_select, "0", "0");
    form.push(EVENT_TARGET, &site.go_button);
    form.push(VIEW_STATE_GENERATOR, bundle.generator());
    form.push(ASYNC_POST, "true");
    form.push(VIEW_STATE_FIELD_COUNT, bundle.fragment_count().to_string());
    for (name, value) in bundle.fragment_fields() {
        form.push(name, value);
    }
    form.push(EVENT_VALIDATION, bundle.event_validation());

    log::debug!(
        "Built postback form: {} fields, {} view state fragments",
        form.len(),
        bundle.fragment_count()
    );
    form
}

/// Wrap `form` in the POST an `UpdatePanel` sends, replaying `cookies`.
pub fn build_request(
    site: &SiteConfig,
    form: &PostbackForm,
    cookies: &[Cookie],
) -> Result<Request> {
    let mut request = Request::post(&site.schedule_url, form.encode())
        .header("Accept", "*/*")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "no-cache")
        .header("Pragma", "no-cache")
        .header(
            "Content-Type",
            "application/x-www-form-urlencoded; charset=UTF-8",
        )
        .header("Origin", site.origin()?)
        .header("Referer", &site.schedule_url)
        .header("X-MicrosoftAjax", "Delta=true")
        .header("X-Requested-With", "XMLHttpRequest");

    if let Some(cookie) = cookie_header(cookies) {
        request = request.header("Cookie", cookie);
    }
    Ok(request)
}

/// Send the postback and return the partial-page response.
pub async fn submit(
    transport: &dyn Transport,
    policy: &RetryPolicy,
    request: &Request,
) -> Result<Page> {
    log::info!("Submitting postback to {}", request.url);
    let page = send_with_retry(transport, policy, request).await?;
    log::debug!("Postback answered with {} bytes", page.body.len());
    Ok(page)
}
