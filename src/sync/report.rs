use std::future::Future;

use chrono::NaiveDate;

use super::SyncResult;
use crate::core::report::{self, Report, ReportKind};
use crate::core::task::Task;

pub const SYSTEM_PROMPT: &str =
    "You are an AI assistant that generates concise, motivational summaries of completed tasks.";

/// Turns a prompt into free text. Implementations may fail or time out.
pub trait SummaryGenerator {
    fn summarize(
        &self,
        system: &str,
        prompt: &str,
    ) -> impl Future<Output = SyncResult<String>> + Send;
}

/// Builds daily and weekly reports over a task snapshot.
pub struct ReportBuilder<G> {
    generator: G,
}

impl<G: SummaryGenerator> ReportBuilder<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub async fn daily(&self, date: NaiveDate, tasks: &[Task]) -> SyncResult<Report> {
        self.build(ReportKind::Daily, date, tasks).await
    }

    /// Covers the seven days ending on `end`.
    pub async fn weekly(&self, end: NaiveDate, tasks: &[Task]) -> SyncResult<Report> {
        self.build(ReportKind::Weekly, end, tasks).await
    }

    pub async fn build(
        &self,
        kind: ReportKind,
        date: NaiveDate,
        tasks: &[Task],
    ) -> SyncResult<Report> {
        let range = kind.range_ending(date);
        let completed = report::tasks_completed_in_range(tasks, range);
        log::info!(
            "Generating {} report for {} ({} of {} task(s) completed)",
            kind.as_str(),
            date,
            completed.len(),
            tasks.len()
        );

        let prompt = build_prompt(kind, &completed);
        let summary = self.generator.summarize(SYSTEM_PROMPT, &prompt).await?;

        Ok(Report {
            id: format!("{}-{}", kind.as_str(), date.format("%Y-%m-%d")),
            date,
            kind,
            title: report::report_title(kind, date),
            summary: summary.trim().to_string(),
            completed_tasks: completed,
            total_tasks: tasks.len(),
        })
    }
}

fn build_prompt(kind: ReportKind, completed: &[Task]) -> String {
    let titles: Vec<&str> = completed.iter().map(|t| t.text.as_str()).collect();
    let titles = serde_json::to_string(&titles).unwrap_or_else(|_| "[]".to_string());
    match kind {
        ReportKind::Daily => format!(
            "Generate a concise daily summary based on these completed tasks: {}.\n\
             The summary should highlight accomplishments and be written in second person (you).",
            titles
        ),
        ReportKind::Weekly => format!(
            "Generate a weekly summary based on these completed tasks: {}.\n\
             The summary should highlight accomplishments, identify patterns, and be written in second person (you).",
            titles
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::list::ListId;
    use crate::sync::SyncError;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    struct Canned {
        reply: Result<String, String>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl SummaryGenerator for Canned {
        async fn summarize(&self, system: &str, prompt: &str) -> SyncResult<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), prompt.to_string()));
            self.reply.clone().map_err(SyncError::Generator)
        }
    }

    fn done_on(text: &str, day: u32) -> Task {
        let mut t = Task::new(ListId::from("1"), text);
        t.toggle(Utc.with_ymd_and_hms(2025, 4, day, 10, 0, 0).unwrap());
        t
    }

    fn sample() -> Vec<Task> {
        vec![
            done_on("Finish proposal", 1),
            done_on("Call mom", 2),
            done_on("Buy groceries", 7),
            Task::new(ListId::from("1"), "Review code"),
        ]
    }

    #[tokio::test]
    async fn daily_report_covers_one_day() {
        let builder = ReportBuilder::new(Canned::ok("  You wrapped up the proposal.  "));
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let report = builder.daily(date, &sample()).await.unwrap();

        assert_eq!(report.kind, ReportKind::Daily);
        assert_eq!(report.completed_count(), 1);
        assert_eq!(report.total_tasks, 4);
        assert_eq!(report.summary, "You wrapped up the proposal.");
        assert_eq!(report.title, "April 1, 2025");
        assert_eq!(report.id, "daily-2025-04-01");

        let prompts = builder.generator.prompts.lock().unwrap();
        assert_eq!(prompts[0].0, SYSTEM_PROMPT);
        assert!(prompts[0].1.contains(r#"["Finish proposal"]"#));
        assert!(prompts[0].1.contains("second person"));
    }

    #[tokio::test]
    async fn weekly_report_covers_seven_days() {
        let builder = ReportBuilder::new(Canned::ok("Busy week."));
        let end = NaiveDate::from_ymd_opt(2025, 4, 6).unwrap();
        let report = builder.weekly(end, &sample()).await.unwrap();

        let titles: Vec<_> = report.completed_tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(titles, ["Finish proposal", "Call mom"]);
        assert_eq!(report.title, "Week of March 31 - April 6");

        let prompts = builder.generator.prompts.lock().unwrap();
        assert!(prompts[0].1.contains("identify patterns"));
    }

    #[tokio::test]
    async fn generator_failure_propagates() {
        let builder = ReportBuilder::new(Canned {
            reply: Err("timed out".into()),
            prompts: Mutex::new(Vec::new()),
        });
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let err = builder.daily(date, &sample()).await.unwrap_err();
        assert!(matches!(err, SyncError::Generator(_)));
        assert_eq!(err.to_string(), "report generation failed: timed out");
    }

    #[tokio::test]
    async fn empty_snapshot_still_asks_for_summary() {
        let builder = ReportBuilder::new(Canned::ok("Nothing done yet."));
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let report = builder.daily(date, &[]).await.unwrap();
        assert_eq!(report.total_tasks, 0);
        assert_eq!(report.completion_percentage(), 0);
        let prompts = builder.generator.prompts.lock().unwrap();
        assert!(prompts[0].1.contains("[]"));
    }
}
