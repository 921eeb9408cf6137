use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::progress;
use super::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Daily,
    Weekly,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }

    /// Dates covered by a report of this kind ending on `date`.
    pub fn range_ending(&self, date: NaiveDate) -> ReportRange {
        match self {
            Self::Daily => ReportRange {
                start: date,
                end: date,
            },
            Self::Weekly => ReportRange {
                start: date - Duration::days(6),
                end: date,
            },
        }
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Completed tasks whose completion day falls inside `range`, in input order.
pub fn tasks_completed_in_range<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    range: ReportRange,
) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| t.completed_on().is_some_and(|day| range.contains(day)))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    #[serde(default)]
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub completed_tasks: Vec<Task>,
    pub total_tasks: usize,
}

impl Report {
    pub fn completed_count(&self) -> usize {
        self.completed_tasks.len()
    }

    pub fn completion_percentage(&self) -> u8 {
        progress::percentage(self.completed_count(), self.total_tasks)
    }

    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            report_title(self.kind, self.date)
        } else {
            self.title.clone()
        }
    }
}

/// "April 1, 2025" for daily reports, "Week of March 24-30" for weekly ones.
pub fn report_title(kind: ReportKind, date: NaiveDate) -> String {
    match kind {
        ReportKind::Daily => format!("{} {}, {}", date.format("%B"), date.day(), date.year()),
        ReportKind::Weekly => {
            let range = kind.range_ending(date);
            if range.start.month() == range.end.month() {
                format!(
                    "Week of {} {}-{}",
                    range.start.format("%B"),
                    range.start.day(),
                    range.end.day()
                )
            } else {
                format!(
                    "Week of {} {} - {} {}",
                    range.start.format("%B"),
                    range.start.day(),
                    range.end.format("%B"),
                    range.end.day()
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Only(ReportKind),
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub kind: KindFilter,
    pub query: String,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        if let KindFilter::Only(kind) = self.kind {
            if report.kind != kind {
                return false;
            }
        }
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        report.display_title().to_lowercase().contains(&query)
            || report.summary.to_lowercase().contains(&query)
    }

    pub fn apply<'a>(&self, reports: &'a [Report]) -> Vec<&'a Report> {
        reports.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Which kinds of report exist for a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalendarMarker {
    pub has_daily: bool,
    pub has_weekly: bool,
}

pub fn reports_on(reports: &[Report], date: NaiveDate) -> Vec<&Report> {
    reports.iter().filter(|r| r.date == date).collect()
}

pub fn calendar_marker(reports: &[Report], date: NaiveDate) -> CalendarMarker {
    reports_on(reports, date)
        .into_iter()
        .fold(CalendarMarker::default(), |mut m, r| {
            match r.kind {
                ReportKind::Daily => m.has_daily = true,
                ReportKind::Weekly => m.has_weekly = true,
            }
            m
        })
}

/// The report to show first for a day: weekly wins over daily.
pub fn preferred_report(reports: &[Report], date: NaiveDate) -> Option<&Report> {
    let on_day = reports_on(reports, date);
    on_day
        .iter()
        .find(|r| r.kind == ReportKind::Weekly)
        .or_else(|| on_day.first())
        .copied()
}
