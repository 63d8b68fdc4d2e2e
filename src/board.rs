//! Leaderboard view state.
//!
//! Holds the last fetched student list, the load status, and the selected row. Fetches
//! may overlap; each gets a ticket and only the most recently issued ticket may update
//! the board, so a slow early response never overwrites a newer one.

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::{FilterCriteria, RankedStudent, StudentRecord};
use crate::ranking::compute_ranking;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug)]
pub struct LeaderboardBoard {
    students: Vec<StudentRecord>,
    criteria: FilterCriteria,
    state: LoadState,
    latest: u64,
    selected: Option<i64>,
}

impl Default for LeaderboardBoard {
    fn default() -> Self {
        Self::new(FilterCriteria::default())
    }
}

impl LeaderboardBoard {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            students: Vec::new(),
            criteria,
            state: LoadState::Idle,
            latest: 0,
            selected: None,
        }
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest += 1;
        self.state = LoadState::Loading;
        FetchTicket(self.latest)
    }

    /// Applies a fetch result if `ticket` is still the newest. Returns whether it was applied.
    pub fn finish_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<StudentRecord>, ApiError>,
    ) -> bool {
        if ticket.0 != self.latest {
            debug!(ticket = ticket.0, latest = self.latest, "discarding stale fetch");
            return false;
        }

        match result {
            Ok(students) => {
                self.students = students;
                self.state = LoadState::Loaded;
            }
            Err(err) => {
                warn!("could not load students: {err}");
                self.state = LoadState::Failed(err.message().to_string());
            }
        }
        true
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn students(&self) -> &[StudentRecord] {
        &self.students
    }

    pub fn rows(&self) -> Vec<RankedStudent<'_>> {
        compute_ranking(&self.students, &self.criteria)
    }

    /// Selects the row at 1-based `rank` of the current view, for the detail panel.
    pub fn select_rank(&mut self, rank: usize) -> Option<&StudentRecord> {
        let id = self
            .rows()
            .into_iter()
            .find(|row| row.rank == rank)
            .map(|row| row.student.id)?;
        self.selected = Some(id);
        self.selected()
    }

    pub fn selected(&self) -> Option<&StudentRecord> {
        let id = self.selected?;
        self.students.iter().find(|student| student.id == id)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::YearFilter;
    use reqwest::StatusCode;

    fn student(id: i64, name: &str, year: u8, score: u32) -> StudentRecord {
        StudentRecord {
            id,
            full_name: Some(name.to_string()),
            year: Some(year),
            total_problems: Some(score),
            ..StudentRecord::default()
        }
    }

    #[test]
    fn latest_fetch_wins() {
        let mut board = LeaderboardBoard::default();
        let first = board.begin_fetch();
        let second = board.begin_fetch();

        assert!(board.finish_fetch(second, Ok(vec![student(2, "Jules", 1, 5)])));
        assert!(!board.finish_fetch(first, Ok(vec![student(1, "Avery", 1, 9)])));

        assert_eq!(board.state(), &LoadState::Loaded);
        assert_eq!(board.students().len(), 1);
        assert_eq!(board.students()[0].id, 2);
    }

    #[test]
    fn failure_is_visible_in_state() {
        let mut board = LeaderboardBoard::default();
        let ticket = board.begin_fetch();
        assert_eq!(board.state(), &LoadState::Loading);

        board.finish_fetch(
            ticket,
            Err(ApiError::Http {
                status: StatusCode::FORBIDDEN,
                message: "Access denied".to_string(),
            }),
        );
        assert_eq!(board.state(), &LoadState::Failed("Access denied".to_string()));
        assert!(board.rows().is_empty());
    }

    #[test]
    fn selection_follows_filtered_view() {
        let mut board = LeaderboardBoard::default();
        let ticket = board.begin_fetch();
        board.finish_fetch(
            ticket,
            Ok(vec![
                student(1, "Avery", 2, 10),
                student(2, "Jules", 3, 50),
                student(3, "Kiara", 2, 30),
            ]),
        );

        board.set_criteria(FilterCriteria::new("", YearFilter::Year(2)));
        assert_eq!(board.select_rank(1).map(|s| s.id), Some(3));
        assert_eq!(board.selected().map(|s| s.id), Some(3));

        assert!(board.select_rank(5).is_none());
        board.clear_selection();
        assert!(board.selected().is_none());
    }
}
