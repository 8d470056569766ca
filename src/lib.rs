//! Scraper for the legacy usfirst.org FIRST Robotics Competition result
//! pages: match results, alliance selections, awards, and event team lists.
//!
//! The pages are plain HTML tables with no stable ids or classes, so every
//! record type is located by table shape and fixed row/column offsets (see
//! `extract`). Fetching is one GET per call with a 10 second budget; there is
//! no caching, retrying, or pagination.
//!
//! ```no_run
//! use frc_scrape::FrcScraper;
//!
//! # async fn demo() -> Result<(), frc_scrape::ScrapeError> {
//! let scraper = FrcScraper::new();
//! let selections = scraper.alliance_selections("migbl", 2013).await?;
//! for (rank, teams) in &selections {
//!     println!("Alliance {rank}: {teams:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
mod extract;

pub use client::{FrcScraper, ScrapeError, ScrapeResult};

use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Domain types — clean model, independent of the page layout
// ---------------------------------------------------------------------------

/// Alliance selections keyed by alliance rank (1..=8). Each rank maps to the
/// alliance's three team numbers in pick order. When data exists the keys are
/// always exactly 1..=8.
pub type AllianceSelections = BTreeMap<u8, Vec<String>>;

/// One match from the results page. Team numbers are kept as the opaque
/// strings the page carries; they are never parsed as integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// "Match 12" for qualification rounds; the page's own bracket label
    /// ("Qtr 1-2", "Semi 2-1", ...) for elimination rounds.
    pub label: String,
    pub red_alliance: Vec<String>,
    pub blue_alliance: Vec<String>,
}

/// One award entry. The awards list preserves page order and a team can
/// appear in several entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub team: String,
    pub name: String,
}
