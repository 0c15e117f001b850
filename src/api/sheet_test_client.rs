//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets (see `Mode::Testing`).
//!
//! Spreadsheets live in a process-wide map keyed by spreadsheet id, so that any number of
//! `TestSheet` instances, like any number of Google clients, see the same documents.

use crate::api::{Sheet, SheetProps, SheetRange, DEFAULT_SHEET_ID};
use crate::error::Res;
use crate::model::{Cell, Range};
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};
use uuid::Uuid;

/// The state of one in-memory spreadsheet, including knobs for injecting failures.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestSheetState {
    pub(crate) title: String,
    /// Sheets in tab order.
    pub(crate) tabs: Vec<TestTab>,
    next_sheet_id: i64,
    /// Every read fails.
    pub(crate) fail_reads: bool,
    /// Every write, including structural changes, fails.
    pub(crate) fail_writes: bool,
    /// Reads and writes that touch a sheet whose title starts with this prefix fail.
    pub(crate) fail_sheet_prefix: Option<String>,
    /// Deleting a sheet fails.
    pub(crate) fail_deletes: bool,
    /// Overwriting values fails. Reads, appends and structural changes still succeed.
    pub(crate) fail_updates: bool,
}

/// One sheet (tab) of an in-memory spreadsheet.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct TestTab {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) hidden: bool,
    /// The number of leading header cells that are bold.
    pub(crate) bold_columns: usize,
    pub(crate) rows: Vec<Vec<String>>,
}

impl TestSheetState {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            tabs: vec![TestTab {
                id: DEFAULT_SHEET_ID,
                title: "Sheet1".to_string(),
                ..TestTab::default()
            }],
            next_sheet_id: DEFAULT_SHEET_ID + 1,
            ..Self::default()
        }
    }

    pub(crate) fn tab(&self, title: &str) -> Option<&TestTab> {
        self.tabs.iter().find(|t| t.title == title)
    }

    fn tab_mut(&mut self, title: &str) -> Res<&mut TestTab> {
        self.tabs
            .iter_mut()
            .find(|t| t.title == title)
            .with_context(|| format!("Unable to parse range: {title}"))
    }

    /// Removes a sheet as if someone had deleted it in the browser.
    pub(crate) fn remove_tab(&mut self, title: &str) {
        self.tabs.retain(|t| t.title != title);
    }

    fn check_read(&self, sheet_title: &str) -> Res<()> {
        if self.fail_reads || self.matches_prefix(sheet_title) {
            bail!("HTTP 503: the service is currently unavailable");
        }
        Ok(())
    }

    fn check_write(&self, sheet_title: &str) -> Res<()> {
        if self.fail_writes || self.matches_prefix(sheet_title) {
            bail!("HTTP 403: the caller does not have permission");
        }
        Ok(())
    }

    fn matches_prefix(&self, sheet_title: &str) -> bool {
        self.fail_sheet_prefix
            .as_deref()
            .is_some_and(|p| sheet_title.starts_with(p))
    }
}

fn registry() -> MutexGuard<'static, HashMap<String, TestSheetState>> {
    static SPREADSHEETS: OnceLock<Mutex<HashMap<String, TestSheetState>>> = OnceLock::new();
    let spreadsheets = SPREADSHEETS.get_or_init(|| Mutex::new(HashMap::new()));
    match spreadsheets.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// An implementation of the `Sheet` trait that does not use Google sheets.
#[derive(Debug, Default)]
pub(crate) struct TestSheet {
    token: Option<String>,
}

impl TestSheet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The attached token.
    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// A copy of the state of spreadsheet `id`.
    pub(crate) fn state(id: &str) -> Option<TestSheetState> {
        registry().get(id).cloned()
    }

    /// Changes the state of spreadsheet `id` in place. Does nothing if it does not exist.
    pub(crate) fn update(id: &str, f: impl FnOnce(&mut TestSheetState)) {
        if let Some(state) = registry().get_mut(id) {
            f(state);
        }
    }

    fn check_token(&self) -> Res<()> {
        if self.token.is_none() {
            bail!("HTTP 401: request is missing required authentication credential");
        }
        Ok(())
    }

    /// Runs `f` against spreadsheet `id`, failing if it does not exist.
    fn with_state<T>(&self, id: &str, f: impl FnOnce(&mut TestSheetState) -> Res<T>) -> Res<T> {
        self.check_token()?;
        let mut registry = registry();
        let state = registry
            .get_mut(id)
            .with_context(|| format!("HTTP 404: Requested entity was not found: {id}"))?;
        f(state)
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    fn attach(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    async fn create_spreadsheet(&mut self, title: &str) -> Res<String> {
        self.check_token()?;
        let id = Uuid::new_v4().simple().to_string();
        registry().insert(id.clone(), TestSheetState::new(title));
        Ok(id)
    }

    async fn sheets(&mut self, spreadsheet_id: &str) -> Res<Vec<SheetProps>> {
        let props = self.with_state(spreadsheet_id, |state| {
            if state.fail_reads {
                bail!("HTTP 503: the service is currently unavailable");
            }
            Ok(state
                .tabs
                .iter()
                .map(|t| SheetProps {
                    id: t.id,
                    title: t.title.clone(),
                    hidden: t.hidden,
                })
                .collect::<Vec<_>>())
        })?;
        // Give concurrent callers a chance to interleave, as a network round trip would.
        tokio::task::yield_now().await;
        Ok(props)
    }

    async fn add_sheet(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        hidden: bool,
        index: Option<usize>,
    ) -> Res<i64> {
        self.with_state(spreadsheet_id, |state| {
            state.check_write(title)?;
            if state.tab(title).is_some() {
                bail!(
                    "HTTP 400: Invalid requests[0].addSheet: A sheet with the name \"{title}\" \
                    already exists. Please enter another name."
                );
            }
            let id = state.next_sheet_id;
            state.next_sheet_id += 1;
            let tab = TestTab {
                id,
                title: title.to_string(),
                hidden,
                ..TestTab::default()
            };
            let index = index.unwrap_or(state.tabs.len()).min(state.tabs.len());
            state.tabs.insert(index, tab);
            Ok(id)
        })
    }

    async fn delete_sheet(&mut self, spreadsheet_id: &str, sheet_id: i64) -> Res<()> {
        self.with_state(spreadsheet_id, |state| {
            if state.fail_writes || state.fail_deletes {
                bail!("HTTP 400: Invalid requests[0].deleteSheet");
            }
            let before = state.tabs.len();
            state.tabs.retain(|t| t.id != sheet_id);
            if state.tabs.len() == before {
                bail!("HTTP 400: No sheet with id: {sheet_id}");
            }
            if state.tabs.is_empty() {
                bail!("HTTP 400: You can't remove all the sheets in a document.");
            }
            Ok(())
        })
    }

    async fn bold_header(
        &mut self,
        spreadsheet_id: &str,
        sheet_id: i64,
        columns: usize,
    ) -> Res<()> {
        self.with_state(spreadsheet_id, |state| {
            if state.fail_writes {
                bail!("HTTP 403: the caller does not have permission");
            }
            let tab = state
                .tabs
                .iter_mut()
                .find(|t| t.id == sheet_id)
                .with_context(|| format!("HTTP 400: No grid with id: {sheet_id}"))?;
            tab.bold_columns = columns;
            Ok(())
        })
    }

    async fn get(&mut self, spreadsheet_id: &str, range: &str) -> Res<Vec<Vec<String>>> {
        let range: Range = range.parse()?;
        self.with_state(spreadsheet_id, |state| {
            state.check_read(range.sheet())?;
            let tab = state
                .tab(range.sheet())
                .with_context(|| format!("HTTP 400: Unable to parse range: {range}"))?;
            let bounds = Bounds::of(&range);
            let mut rows: Vec<Vec<String>> = tab
                .rows
                .iter()
                .enumerate()
                .filter(|(ix, _)| bounds.has_row(ix + 1))
                .map(|(_, row)| {
                    let mut cells: Vec<String> = row
                        .iter()
                        .enumerate()
                        .filter(|(ix, _)| bounds.has_col(ix + 1))
                        .map(|(_, c)| c.clone())
                        .collect();
                    while cells.last().is_some_and(|c| c.is_empty()) {
                        cells.pop();
                    }
                    cells
                })
                .collect();
            while rows.last().is_some_and(|r| r.is_empty()) {
                rows.pop();
            }
            Ok(rows)
        })
    }

    async fn update(&mut self, spreadsheet_id: &str, data: &[SheetRange]) -> Res<()> {
        let parsed = data
            .iter()
            .map(|sr| Ok((sr.range.parse::<Range>()?, &sr.values)))
            .collect::<Res<Vec<_>>>()?;
        self.with_state(spreadsheet_id, |state| {
            if state.fail_updates {
                bail!("HTTP 500: internal error encountered");
            }
            for (range, _) in &parsed {
                state.check_write(range.sheet())?;
            }
            for (range, values) in parsed {
                let bounds = Bounds::of(&range);
                let tab = state.tab_mut(range.sheet())?;
                write_cells(tab, bounds.first_row, bounds.first_col, values);
            }
            Ok(())
        })
    }

    async fn append(
        &mut self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Res<()> {
        let range: Range = range.parse()?;
        self.with_state(spreadsheet_id, |state| {
            state.check_write(range.sheet())?;
            let bounds = Bounds::of(&range);
            let tab = state.tab_mut(range.sheet())?;
            let last_data_row = tab
                .rows
                .iter()
                .rposition(|r| r.iter().any(|c| !c.is_empty()))
                .map(|ix| ix + 1)
                .unwrap_or(0);
            let first_row = (last_data_row + 1).max(bounds.first_row);
            write_cells(tab, first_row, bounds.first_col, rows);
            Ok(())
        })
    }
}

/// The inclusive, 1-indexed rows and columns covered by a range. Open ends are unbounded.
struct Bounds {
    first_row: usize,
    last_row: usize,
    first_col: usize,
    last_col: usize,
}

impl Bounds {
    fn of(range: &Range) -> Self {
        let start = range.start();
        let end = range.end().unwrap_or(match (start.col, start.row) {
            // A single cell.
            (Some(_), Some(_)) => start,
            // A whole row or column.
            _ => Cell {
                col: None,
                row: None,
            },
        });
        Self {
            first_row: start.row.unwrap_or(1),
            last_row: end.row.unwrap_or(usize::MAX),
            first_col: start.col.unwrap_or(1),
            last_col: end.col.unwrap_or(usize::MAX),
        }
    }

    fn has_row(&self, row: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
    }

    fn has_col(&self, col: usize) -> bool {
        (self.first_col..=self.last_col).contains(&col)
    }
}

/// Writes `values` with their top-left cell at (`first_row`, `first_col`), growing the grid as
/// needed.
fn write_cells(tab: &mut TestTab, first_row: usize, first_col: usize, values: &[Vec<String>]) {
    for (r, row_values) in values.iter().enumerate() {
        let row_ix = first_row - 1 + r;
        if tab.rows.len() <= row_ix {
            tab.rows.resize(row_ix + 1, Vec::new());
        }
        let row = &mut tab.rows[row_ix];
        for (c, value) in row_values.iter().enumerate() {
            let col_ix = first_col - 1 + c;
            if row.len() <= col_ix {
                row.resize(col_ix + 1, String::new());
            }
            row[col_ix] = value.clone();
        }
    }
}
