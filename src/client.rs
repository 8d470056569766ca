use crate::extract::{self, Round};
use crate::{AllianceSelections, Award, Match};
use log::debug;
use reqwest::Client;
use reqwest::header::REFERER;
use std::fmt;
use std::time::Duration;

pub type ScrapeResult<T> = Result<T, ScrapeError>;

const RESULTS_HOST: &str = "http://www2.usfirst.org";
const TEAMLIST_HOST: &str = "https://my.usfirst.org";
/// The result site expects a site-local referer.
const REFERER_VALUE: &str = "usfirst.org";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Championship events publish their result pages under the division name
/// rather than the short event code.
const CHAMPIONSHIP_DIVISIONS: [(&str, &str); 4] = [
    ("arc", "archimedes"),
    ("cur", "curie"),
    ("gal", "galileo"),
    ("new", "newton"),
];

fn division_name(event_code: &str) -> Option<&'static str> {
    CHAMPIONSHIP_DIVISIONS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(event_code))
        .map(|(_, name)| *name)
}

/// Event code as it appears in result-page paths: championship short codes
/// map to their division name, everything else passes through unchanged.
fn event_path_code(event_code: &str) -> &str {
    division_name(event_code).unwrap_or(event_code)
}

#[derive(Debug)]
pub enum ScrapeError {
    /// The request failed or the body could not be read.
    Network(reqwest::Error, String),
    /// The fetch exceeded its 10 second budget.
    Timeout(String),
    /// The page was reachable but did not carry the expected table shape:
    /// the event has no such data (yet), or the event code is wrong.
    NoData,
    /// The match number did not parse as a non-negative integer.
    InvalidMatchNumber(String),
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ScrapeError::Timeout(url) => write!(f, "Timed out getting {url}"),
            ScrapeError::NoData => write!(f, "No data for event"),
            ScrapeError::InvalidMatchNumber(raw) => write!(f, "Invalid match number: {raw:?}"),
        }
    }
}

impl std::error::Error for ScrapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScrapeError::Network(e, _) => Some(e),
            _ => None,
        }
    }
}

/// Scraper for the legacy usfirst.org result pages. Stateless apart from the
/// pooled HTTP client; calls can run concurrently with no coordination.
#[derive(Debug, Clone)]
pub struct FrcScraper {
    client: Client,
    timeout: Duration,
    results_host: String,
    teamlist_host: String,
}

impl Default for FrcScraper {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("frc-scrape/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            timeout: FETCH_TIMEOUT,
            results_host: RESULTS_HOST.to_owned(),
            teamlist_host: TEAMLIST_HOST.to_owned(),
        }
    }
}

impl FrcScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the scraper at alternate hosts (mirrors, test servers).
    pub fn with_hosts(results_host: impl Into<String>, teamlist_host: impl Into<String>) -> Self {
        Self {
            results_host: results_host.into(),
            teamlist_host: teamlist_host.into(),
            ..Self::default()
        }
    }

    /// Alliance selections for an event, keyed by alliance rank 1..=8.
    pub async fn alliance_selections(
        &self,
        event_code: &str,
        year: u16,
    ) -> ScrapeResult<AllianceSelections> {
        let url = self.results_url(event_code, year, "scheduleelim.html");
        let page = self.fetch_page(&url).await?;
        extract::alliance_selections(&page)
    }

    /// Awards handed out at an event, in page order. A team can appear in
    /// several entries.
    pub async fn awards(&self, event_code: &str, year: u16) -> ScrapeResult<Vec<Award>> {
        let url = self.results_url(event_code, year, "awards.html");
        let page = self.fetch_page(&url).await?;
        extract::awards(&page)
    }

    /// Teams registered for an event, in page order.
    pub async fn teams(&self, event_code: &str, year: u16) -> ScrapeResult<Vec<String>> {
        let url = self.teamlist_url(event_code, year);
        let page = self.fetch_page(&url).await?;
        extract::team_roster(&page)
    }

    /// A single qualification match by match number. Labels come back as
    /// "Match {n}".
    pub async fn qualification_match(
        &self,
        event_code: &str,
        match_number: &str,
        year: u16,
    ) -> ScrapeResult<Match> {
        self.advance_match(event_code, match_number, year, Round::Qualification)
            .await
    }

    /// A single elimination match by match number. The page's own bracket
    /// label ("Qtr 1-2", "Semi 2-1", ...) is kept as-is.
    pub async fn elimination_match(
        &self,
        event_code: &str,
        match_number: &str,
        year: u16,
    ) -> ScrapeResult<Match> {
        self.advance_match(event_code, match_number, year, Round::Elimination)
            .await
    }

    async fn advance_match(
        &self,
        event_code: &str,
        match_number: &str,
        year: u16,
        round: Round,
    ) -> ScrapeResult<Match> {
        // Bad input is rejected before spending a network round trip.
        let number: usize = match_number
            .parse()
            .map_err(|_| ScrapeError::InvalidMatchNumber(match_number.to_owned()))?;

        let url = self.results_url(event_code, year, "matchresults.html");
        let page = self.fetch_page(&url).await?;
        extract::advance_match(&page, number, round)
    }

    fn results_url(&self, event_code: &str, year: u16, page: &str) -> String {
        format!(
            "{}/{}comp/events/{}/{}",
            self.results_host,
            year,
            event_path_code(event_code),
            page
        )
    }

    /// The team list lives on a different host with its own query scheme:
    /// championship divisions query `event=cmp` plus a `division` parameter,
    /// everything else queries the event code directly.
    fn teamlist_url(&self, event_code: &str, year: u16) -> String {
        let base = format!(
            "{}/myarea/index.lasso?page=teamlist&event_type=FRC&sort_teams=number&year={}",
            self.teamlist_host, year
        );
        match division_name(event_code) {
            Some(division) => format!("{base}&event=cmp&division={division}"),
            None => format!("{base}&event={event_code}"),
        }
    }

    /// One GET with the constant referer, racing the 10 second budget. The
    /// deadline aborts the in-flight request rather than leaking it. Error
    /// statuses are not special-cased: an error page body simply fails the
    /// shape predicates downstream and surfaces as NoData.
    async fn fetch_page(&self, url: &str) -> ScrapeResult<String> {
        debug!("fetching {url}");
        let response = self
            .client
            .get(url)
            .header(REFERER, REFERER_VALUE)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| fetch_error(e, url))?;
        response.text().await.map_err(|e| fetch_error(e, url))
    }
}

fn fetch_error(e: reqwest::Error, url: &str) -> ScrapeError {
    if e.is_timeout() {
        ScrapeError::Timeout(url.to_owned())
    } else {
        ScrapeError::Network(e, url.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const SCHEDULE_ELIM: &str = include_str!("../fixtures/2013_migbl_scheduleelim.html");
    const AWARDS_PAGE: &str = include_str!("../fixtures/2013_migbl_awards.html");
    const MATCH_RESULTS: &str = include_str!("../fixtures/2013_migbl_matchresults.html");
    const TEAM_LIST: &str = include_str!("../fixtures/2013_migbl_teamlist.html");

    fn scraper_for(server: &mockito::ServerGuard) -> FrcScraper {
        FrcScraper::with_hosts(server.url(), server.url())
    }

    #[test]
    fn division_codes_map_case_insensitively() {
        assert_eq!(event_path_code("gal"), "galileo");
        assert_eq!(event_path_code("GAL"), "galileo");
        assert_eq!(event_path_code("Arc"), "archimedes");
        assert_eq!(event_path_code("migbl"), "migbl");
    }

    #[test]
    fn results_url_uses_division_path() {
        let scraper = FrcScraper::new();
        assert_eq!(
            scraper.results_url("arc", 2013, "awards.html"),
            "http://www2.usfirst.org/2013comp/events/archimedes/awards.html"
        );
        assert_eq!(
            scraper.results_url("migbl", 2013, "matchresults.html"),
            "http://www2.usfirst.org/2013comp/events/migbl/matchresults.html"
        );
    }

    #[test]
    fn teamlist_url_splits_on_division() {
        let scraper = FrcScraper::new();
        assert!(
            scraper
                .teamlist_url("new", 2013)
                .ends_with("&event=cmp&division=newton")
        );
        assert!(scraper.teamlist_url("migbl", 2013).ends_with("&event=migbl"));
    }

    #[tokio::test]
    async fn fetches_alliance_selections_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/2013comp/events/migbl/scheduleelim.html")
            .match_header("referer", REFERER_VALUE)
            .with_body(SCHEDULE_ELIM)
            .create_async()
            .await;

        let selections = scraper_for(&server)
            .alliance_selections("migbl", 2013)
            .await
            .unwrap();

        page.assert_async().await;
        assert_eq!(selections.len(), 8);
        assert_eq!(selections[&1], vec!["33", "1718", "247"]);
        assert_eq!(selections[&8], vec!["3570", "3535", "3667"]);
    }

    #[tokio::test]
    async fn division_code_resolves_to_division_path() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/2013comp/events/galileo/awards.html")
            .with_body(AWARDS_PAGE)
            .create_async()
            .await;

        let awards = scraper_for(&server).awards("gal", 2013).await.unwrap();

        page.assert_async().await;
        assert_eq!(awards[0].team, "1718");
    }

    #[tokio::test]
    async fn roster_uses_cmp_query_for_division_codes() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/myarea/index.lasso")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("event".into(), "cmp".into()),
                Matcher::UrlEncoded("division".into(), "galileo".into()),
                Matcher::UrlEncoded("year".into(), "2013".into()),
            ]))
            .with_body(TEAM_LIST)
            .create_async()
            .await;

        let teams = scraper_for(&server).teams("gal", 2013).await.unwrap();

        page.assert_async().await;
        assert_eq!(teams.len(), 40);
        assert_eq!(teams[0], "33");
    }

    #[tokio::test]
    async fn roster_uses_event_query_for_plain_codes() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/myarea/index.lasso")
            .match_query(Matcher::UrlEncoded("event".into(), "migbl".into()))
            .with_body(TEAM_LIST)
            .create_async()
            .await;

        let teams = scraper_for(&server).teams("migbl", 2013).await.unwrap();

        page.assert_async().await;
        assert_eq!(teams.len(), 40);
    }

    #[tokio::test]
    async fn fetches_qualification_match_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2013comp/events/migbl/matchresults.html")
            .with_body(MATCH_RESULTS)
            .create_async()
            .await;

        let m = scraper_for(&server)
            .qualification_match("migbl", "1", 2013)
            .await
            .unwrap();

        assert_eq!(m.label, "Match 3");
        assert_eq!(m.red_alliance, vec!["1506", "302", "1025"]);
        assert_eq!(m.blue_alliance, vec!["2604", "1322", "3667"]);
    }

    #[tokio::test]
    async fn error_page_body_surfaces_as_no_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2013comp/events/bogus/scheduleelim.html")
            .with_status(404)
            .with_body("<html><body><h1>Not Found</h1></body></html>")
            .create_async()
            .await;

        let err = scraper_for(&server)
            .alliance_selections("bogus", 2013)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::NoData));
    }

    #[tokio::test]
    async fn bad_match_number_skips_the_network() {
        // Unroutable hosts: a fetch attempt would fail loudly, not NoData.
        let scraper = FrcScraper::with_hosts("http://127.0.0.1:1", "http://127.0.0.1:1");

        for bad in ["three", "-1", ""] {
            let err = scraper
                .qualification_match("migbl", bad, 2013)
                .await
                .unwrap_err();
            assert!(matches!(err, ScrapeError::InvalidMatchNumber(_)), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn transport_failure_carries_the_url() {
        let scraper = FrcScraper::with_hosts("http://127.0.0.1:1", "http://127.0.0.1:1");
        let err = scraper.awards("migbl", 2013).await.unwrap_err();
        match err {
            ScrapeError::Network(_, url) | ScrapeError::Timeout(url) => {
                assert!(url.contains("/2013comp/events/migbl/awards.html"), "{url}");
            }
            other => panic!("expected a fetch error, got {other:?}"),
        }
    }
}
