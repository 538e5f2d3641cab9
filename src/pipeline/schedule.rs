// src/pipeline/schedule.rs

//! Schedule pipeline.
//!
//! One run walks the stages in order:
//!
//! ```text
//! Fetching -> ExtractingState -> ResolvingSeason -> ResolvingTeam
//!          -> BuildingPostback -> ParsingResults -> Done
//! ```
//!
//! Any failure moves the run to `Failed` and is reported with the stage it
//! happened in. Only the two network calls are retried.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Config, GameRecord, ResolvedSelection};
use crate::services::{
    build_form, build_request, check_async_error, extract_hidden_state, parse_games,
    resolve_season, resolve_team, submit,
};
use crate::utils::http::{Request, RetryPolicy, Transport, send_with_retry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    ExtractingState,
    ResolvingSeason,
    ResolvingTeam,
    BuildingPostback,
    ParsingResults,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetching => "Fetching",
            Stage::ExtractingState => "ExtractingState",
            Stage::ResolvingSeason => "ResolvingSeason",
            Stage::ResolvingTeam => "ResolvingTeam",
            Stage::BuildingPostback => "BuildingPostback",
            Stage::ParsingResults => "ParsingResults",
            Stage::Done => "Done",
            Stage::Failed => "Failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current stage and tags failures with it.
struct StageTracker {
    current: Stage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            current: Stage::Fetching,
        }
    }

    fn enter(&mut self, next: Stage) {
        log::debug!("Stage {} -> {}", self.current, next);
        self.current = next;
    }

    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| {
            let failed = self.current;
            self.enter(Stage::Failed);
            AppError::in_stage(failed.as_str(), e)
        })
    }
}

/// Everything a run needs besides the team name.
#[derive(Clone)]
pub struct RunContext {
    pub config: Config,
    pub transport: Arc<dyn Transport>,
}

impl RunContext {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct ScheduleRun {
    pub team: String,
    pub season: ResolvedSelection,
    pub team_selection: ResolvedSelection,
    pub games: Vec<GameRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScheduleRun {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Fetch the schedule of `team_name` for the current season.
pub async fn run_schedule(ctx: &RunContext, team_name: &str) -> Result<ScheduleRun> {
    let started_at = Utc::now();
    let site = &ctx.config.site;
    let policy = RetryPolicy::from_config(&ctx.config.http);
    let transport = ctx.transport.as_ref();
    let mut tracker = StageTracker::new();

    log::info!("Fetching schedule page {}", site.schedule_url);
    let request = Request::get(&site.schedule_url)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9");
    let page = tracker.check(send_with_retry(transport, &policy, &request).await)?;
    log::debug!(
        "Schedule page: {} bytes, {} cookies",
        page.body.len(),
        page.cookies.len()
    );

    tracker.enter(Stage::ExtractingState);
    let bundle = tracker.check(extract_hidden_state(page.body.scan()))?;

    tracker.enter(Stage::ResolvingSeason);
    let season = tracker.check(resolve_season(page.body.scan(), &site.season_select))?;
    log::info!("Current season: {} ({})", season.label(), season.value());

    tracker.enter(Stage::ResolvingTeam);
    let team = tracker.check(resolve_team(
        page.body.scan(),
        &site.team_select,
        team_name,
    ))?;
    log::info!("Team '{}' has id {}", team_name, team.value());

    tracker.enter(Stage::BuildingPostback);
    let form = build_form(site, &bundle, &season, &team);
    let request = tracker.check(build_request(site, &form, &page.cookies))?;
    let response = tracker.check(submit(transport, &policy, &request).await)?;

    tracker.enter(Stage::ParsingResults);
    tracker.check(check_async_error(&response.body.text()))?;
    let games = tracker.check(parse_games(response.body.scan(), &ctx.config.parse))?;

    tracker.enter(Stage::Done);
    let run = ScheduleRun {
        team: team_name.to_string(),
        season,
        team_selection: team,
        games,
        started_at,
        finished_at: Utc::now(),
    };
    log::info!(
        "Found {} games for '{}' in {} ms",
        run.games.len(),
        run.team,
        run.elapsed().num_milliseconds()
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ReplayableSource;
    use crate::utils::http::{Cookie, Method, Page};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use url::form_urlencoded;

    const SCHEDULE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Soccer Schedule</title>
<script type="text/javascript">var theForm = document.forms['form1']; if (a < b) {}</script>
</head><body>
<form method="post" action="./soccer-schedule.aspx" id="form1">
<input type="hidden" name="__VIEWSTATEFIELDCOUNT" id="__VIEWSTATEFIELDCOUNT" value="2" />
<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="A" />
<input type="hidden" name="__VIEWSTATE1" id="__VIEWSTATE1" value="B" />
<input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="G1" />
<input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="V1" />
<select name="ctl00$mainContent$ctl01$ddlSeason" id="ctl00_mainContent_ctl01_ddlSeason">
  <option value="5">2023</option>
  <option selected="selected" value="6">2024</option>
</select>
<select name="ctl00$mainContent$ctl01$ddlTeams" id="ctl00_mainContent_ctl01_ddlTeams">
  <option value="10">Lions</option>
  <option value="11">Megpies FC</option>
</select>
</form></body></html>"#;

    const RESULTS_DELTA: &str = r#"1|#||4|512|updatePanel|ctl00_mainContent_ctl01_UpdatePanel4|
<table>
  <tr><td colspan="3">Sunday, March 3, 2024</td></tr>
  <tr><td>9:00 PM</td><td>vs Lions</td><td>Field 2</td></tr>
  <tr><td colspan="3">Sunday, March 10, 2024</td></tr>
  <tr><td>10:15 AM</td><td>vs Tigers</td><td>Field 4</td></tr>
</table>|"#;

    struct FakeTransport {
        requests: Mutex<Vec<Request>>,
        responses: Mutex<VecDeque<Result<Page>>>,
    }

    impl FakeTransport {
        fn new(responses: Vec<Result<Page>>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            })
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: &Request) -> Result<Page> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::not_found("no canned response")))
        }
    }

    fn page(body: &str, cookies: &[(&str, &str)]) -> Result<Page> {
        Ok(Page {
            url: Config::default().site.schedule_url,
            status: 200,
            body: ReplayableSource::from(body),
            cookies: cookies
                .iter()
                .map(|(name, value)| Cookie::new(*name, *value))
                .collect(),
        })
    }

    fn unavailable() -> Result<Page> {
        Err(AppError::Status {
            url: Config::default().site.schedule_url,
            status: 503,
        })
    }

    fn context(transport: Arc<FakeTransport>) -> RunContext {
        let mut config = Config::default();
        config.http.retry_backoff_ms = 0;
        RunContext::new(config, transport)
    }

    #[tokio::test]
    async fn test_run_posts_state_and_parses_games() {
        let transport = FakeTransport::new(vec![
            page(SCHEDULE_PAGE, &[("ASP.NET_SessionId", "abc")]),
            page(RESULTS_DELTA, &[]),
        ]);
        let run = run_schedule(&context(transport.clone()), "Megpies FC")
            .await
            .unwrap();

        assert_eq!(run.season.value(), "6");
        assert_eq!(run.team_selection.value(), "11");
        assert_eq!(run.games.len(), 2);
        assert_eq!(run.games[0].opponent, "Lions");
        assert_eq!(run.games[1].location, "Field 4");
        assert_eq!(
            run.games[1].start_time.to_rfc3339(),
            "2024-03-10T10:15:00-08:00"
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::Get);

        let post = &requests[1];
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.header_value("Cookie"), Some("ASP.NET_SessionId=abc"));
        assert_eq!(post.header_value("X-MicrosoftAjax"), Some("Delta=true"));

        let body = post.body.as_deref().unwrap_or_default();
        let form: Vec<(String, String)> = form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();
        let field = |name: &str| {
            form.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(field("__VIEWSTATE"), Some("A"));
        assert_eq!(field("__VIEWSTATE1"), Some("B"));
        assert_eq!(field("__VIEWSTATEFIELDCOUNT"), Some("2"));
        assert_eq!(field("__EVENTVALIDATION"), Some("V1"));
        assert_eq!(field("ctl00$mainContent$ctl01$ddlSeason"), Some("6"));
        assert_eq!(field("ctl00$mainContent$ctl01$ddlTeams"), Some("11"));
    }

    #[tokio::test]
    async fn test_unknown_team_fails_before_postback() {
        let transport = FakeTransport::new(vec![page(SCHEDULE_PAGE, &[])]);
        let err = run_schedule(&context(transport.clone()), "Tigers")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some("ResolvingTeam"));
        assert!(err.to_string().contains("team not found: Tigers"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_is_retried_on_transport_error() {
        let transport = FakeTransport::new(vec![
            unavailable(),
            page(SCHEDULE_PAGE, &[]),
            page(RESULTS_DELTA, &[]),
        ]);
        let run = run_schedule(&context(transport.clone()), "Megpies FC")
            .await
            .unwrap();

        assert_eq!(run.games.len(), 2);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_in_fetching() {
        let transport = FakeTransport::new(vec![unavailable(), unavailable(), unavailable()]);
        let err = run_schedule(&context(transport.clone()), "Megpies FC")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some("Fetching"));
        assert!(err.is_transport());
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_page_without_state_fails_extraction() {
        let transport =
            FakeTransport::new(vec![page("<html><body>Maintenance</body></html>", &[])]);
        let err = run_schedule(&context(transport), "Megpies FC")
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some("ExtractingState"));
    }

    #[tokio::test]
    async fn test_error_delta_fails_parsing() {
        let transport = FakeTransport::new(vec![
            page(SCHEDULE_PAGE, &[]),
            page("52|error|500|The state information is invalid for this page|", &[]),
        ]);
        let err = run_schedule(&context(transport), "Megpies FC")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some("ParsingResults"));
        assert!(matches!(
            err,
            AppError::Stage { ref source, .. } if matches!(**source, AppError::Rejected { .. })
        ));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::BuildingPostback.to_string(), "BuildingPostback");
        assert_eq!(Stage::Failed.as_str(), "Failed");
    }
}
