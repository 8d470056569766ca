//! Page-to-record extraction rules.
//!
//! The result pages identify nothing by id or class; rows are recognized by
//! their cell count and records are cut out at fixed column offsets. All of
//! those offsets live here as named constants so a page-layout change is
//! confined to one lookup table per record type.
//!
//! Everything in this module is a pure pass over an already-fetched page:
//! parse, filter rows by shape, index, clean text, assemble. Pages that do
//! not match the expected shape yield `NoData` — never a partial record.

use crate::client::{ScrapeError, ScrapeResult};
use crate::{AllianceSelections, Award, Match};
use scraper::{ElementRef, Html, Selector};
use std::ops::Range;

// ---------------------------------------------------------------------------
// Positional layout tables
// ---------------------------------------------------------------------------

/// Alliance-selection rows carry exactly this many cells.
const SELECTION_ROW_CELLS: usize = 9;
/// The six team cells of a selection row: two alliances, three picks each.
const SELECTION_TEAM_CELLS: Range<usize> = 3..9;
/// Draft rows 1..=4 cover all eight alliances.
const SELECTION_DRAFT_ROWS: usize = 4;

/// Bracket seeding convention of the source pages: draft row `i` pairs
/// alliance `SEED_PERMUTATION[i]` (left three team cells) against alliance
/// `SEED_PERMUTATION[8 - i]` (right three). Index 4 is never reached.
/// Historical data depends on this exact table; do not re-derive it.
const SEED_PERMUTATION: [u8; 9] = [1, 4, 2, 3, 0, 6, 7, 5, 8];

/// Award rows carry exactly this many cells.
const AWARD_ROW_CELLS: usize = 5;
const AWARD_NAME_CELL: usize = 0;
const AWARD_TEAM_CELL: usize = 1;
/// The first two shape-matching award rows are column headers.
const AWARD_HEADER_ROWS: usize = 2;

/// The first three rows of the team list are title and header rows.
const ROSTER_HEADER_ROWS: usize = 3;
const ROSTER_TEAM_CELL: usize = 2;

/// tbody blocks preceding the qualification results table. The elimination
/// table is the block after it.
const MATCH_TABLE_OFFSET: usize = 2;
/// Header rows preceding the first data row of a results table.
const MATCH_HEADER_ROWS: usize = 2;
const MATCH_LABEL_CELL: usize = 1;
const RED_ALLIANCE_CELL: usize = 2;
const BLUE_ALLIANCE_CELL: usize = 5;
const ALLIANCE_SIZE: usize = 3;

/// Which results table a match query reads. The numeric value doubles as the
/// column shift: elimination rows carry one extra leading cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Round {
    Qualification = 0,
    Elimination = 1,
}

impl Round {
    fn shift(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Extraction passes
// ---------------------------------------------------------------------------

pub(crate) fn alliance_selections(page: &str) -> ScrapeResult<AllianceSelections> {
    let html = Html::parse_document(page);
    let rows = rows_where(&html, |cells| cells.len() == SELECTION_ROW_CELLS);

    // Header row plus all four draft rows must be present; anything less is
    // an event that has not run its selections.
    if rows.len() < 1 + SELECTION_DRAFT_ROWS {
        return Err(ScrapeError::NoData);
    }

    let mut selections = AllianceSelections::new();
    for (i, cells) in rows[1..=SELECTION_DRAFT_ROWS].iter().enumerate() {
        let teams = &cells[SELECTION_TEAM_CELLS];
        let (left, right) = teams.split_at(ALLIANCE_SIZE);
        selections.insert(
            SEED_PERMUTATION[i],
            left.iter().copied().map(clean_text).collect(),
        );
        selections.insert(
            SEED_PERMUTATION[8 - i],
            right.iter().copied().map(clean_text).collect(),
        );
    }
    Ok(selections)
}

pub(crate) fn awards(page: &str) -> ScrapeResult<Vec<Award>> {
    let html = Html::parse_document(page);
    let rows = rows_where(&html, |cells| {
        cells.len() == AWARD_ROW_CELLS
            && cells
                .get(AWARD_TEAM_CELL)
                .is_some_and(|cell| !clean_text(*cell).is_empty())
    });

    if rows.len() <= AWARD_HEADER_ROWS {
        return Err(ScrapeError::NoData);
    }

    Ok(rows[AWARD_HEADER_ROWS..]
        .iter()
        .map(|cells| Award {
            team: clean_text(cells[AWARD_TEAM_CELL]),
            name: strip_non_ascii(&collapse_double_spaces(&clean_text(cells[AWARD_NAME_CELL]))),
        })
        .collect())
}

pub(crate) fn team_roster(page: &str) -> ScrapeResult<Vec<String>> {
    let html = Html::parse_document(page);
    let rows = rows_where(&html, |cells| !cells.is_empty());

    if rows.len() <= ROSTER_HEADER_ROWS {
        return Err(ScrapeError::NoData);
    }

    rows[ROSTER_HEADER_ROWS..]
        .iter()
        .map(|cells| {
            cells
                .get(ROSTER_TEAM_CELL)
                .map(|cell| clean_text(*cell))
                .ok_or(ScrapeError::NoData)
        })
        .collect()
}

pub(crate) fn advance_match(page: &str, match_number: usize, round: Round) -> ScrapeResult<Match> {
    let html = Html::parse_document(page);
    let tbody = Selector::parse("tbody").unwrap();
    let tr = Selector::parse("tr").unwrap();
    let td = Selector::parse("td").unwrap();

    let tables: Vec<_> = html.select(&tbody).collect();
    if tables.is_empty() {
        return Err(ScrapeError::NoData);
    }
    let table = tables
        .get(MATCH_TABLE_OFFSET + round.shift())
        .ok_or(ScrapeError::NoData)?;

    let rows: Vec<Vec<ElementRef>> = table
        .select(&tr)
        .map(|row| row.select(&td).collect::<Vec<_>>())
        .filter(|cells| cells.len() > 1)
        .collect();

    let target = match_number + MATCH_HEADER_ROWS;
    if rows.len() <= 1 || rows.len() - 1 < target {
        return Err(ScrapeError::NoData);
    }
    let cells = &rows[target];

    // Results cells are not padded, and the historical output depends on the
    // label and team text coming through untrimmed.
    let label = cells
        .get(MATCH_LABEL_CELL)
        .map(|cell| cell_text(*cell))
        .ok_or(ScrapeError::NoData)?;
    let red_alliance = alliance_cells(cells, RED_ALLIANCE_CELL + round.shift())?;
    let blue_alliance = alliance_cells(cells, BLUE_ALLIANCE_CELL + round.shift())?;

    let label = match round {
        Round::Qualification => format!("Match {label}"),
        Round::Elimination => label,
    };

    Ok(Match {
        label,
        red_alliance,
        blue_alliance,
    })
}

/// Three consecutive cells starting at `start`, raw text. A row too short to
/// hold them is NoData rather than a partial alliance.
fn alliance_cells(cells: &[ElementRef<'_>], start: usize) -> ScrapeResult<Vec<String>> {
    (start..start + ALLIANCE_SIZE)
        .map(|i| {
            cells
                .get(i)
                .map(|cell| cell_text(*cell))
                .ok_or(ScrapeError::NoData)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Row selection and text cleanup
// ---------------------------------------------------------------------------

/// All table rows in the document whose cell list passes `keep`. Cell counts
/// include nested cells, matching how the source pages have always been read.
fn rows_where<'a>(
    html: &'a Html,
    keep: impl Fn(&[ElementRef<'a>]) -> bool,
) -> Vec<Vec<ElementRef<'a>>> {
    let tr = Selector::parse("tr").unwrap();
    let td = Selector::parse("td").unwrap();
    html.select(&tr)
        .map(|row| row.select(&td).collect::<Vec<_>>())
        .filter(|cells| keep(cells))
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}

/// Trim, then drop embedded newlines. The pages wrap cell contents across
/// source lines.
fn clean_text(cell: ElementRef<'_>) -> String {
    cell_text(cell).trim().replace('\n', "")
}

/// Single pass over double spaces; the award column pads names with runs of
/// spaces. "a   b" becomes "a  b", matching the historical output.
fn collapse_double_spaces(s: &str) -> String {
    s.replace("  ", " ")
}

/// Award names on older pages carry trademark symbols and non-breaking
/// spaces; everything past ASCII is dropped.
fn strip_non_ascii(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii()).collect()
}
