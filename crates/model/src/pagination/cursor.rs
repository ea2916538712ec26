use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Tracks progress through a date-windowed, offset-paginated source.
///
/// The cursor walks one calendar day at a time; within a day the offset
/// grows by the page size. Advancing the date always resets the offset
/// to zero. Lifecycle is scoped to a single fetch invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchCursor {
    date: NaiveDate,
    offset: usize,
}

impl FetchCursor {
    pub fn new(start_date: NaiveDate) -> Self {
        FetchCursor {
            date: start_date,
            offset: 0,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn advance_page(&mut self, page_size: usize) {
        self.offset += page_size;
    }

    pub fn advance_date(&mut self) {
        self.date = self
            .date
            .checked_add_days(Days::new(1))
            .unwrap_or(self.date);
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn offsets_grow_by_page_size() {
        let mut cursor = FetchCursor::new(date(2024, 5, 10));
        cursor.advance_page(100);
        cursor.advance_page(100);
        assert_eq!(cursor.offset(), 200);
        assert_eq!(cursor.date(), date(2024, 5, 10));
    }

    #[test]
    fn advancing_the_date_resets_the_offset() {
        let mut cursor = FetchCursor::new(date(2024, 5, 10));
        cursor.advance_page(500);
        cursor.advance_date();
        assert_eq!(cursor.date(), date(2024, 5, 11));
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn dates_advance_one_calendar_day_across_month_ends() {
        let mut cursor = FetchCursor::new(date(2024, 2, 29));
        cursor.advance_date();
        assert_eq!(cursor.date(), date(2024, 3, 1));
    }
}
