use chrono::{NaiveDate, Utc};

use tally::config::TallyConfig;
use tally::core::input::normalize_name;
use tally::core::list::ListId;
use tally::core::progress;
use tally::core::report::{Report, ReportKind};
use tally::core::snapshot::{load_snapshot, save_snapshot};
use tally::core::store::Store;
use tally::core::task::TaskId;
use tally::sync::anthropic::{self, AnthropicClient};
use tally::sync::api::ApiClient;
use tally::sync::keyring::{self, SecretKind};
use tally::sync::report::ReportBuilder;
use tally::sync::RemoteStore;

const USAGE: &str = "usage: tally <command>

commands:
  lists                          show lists, tasks and progress
  add-list <name>                create a list
  rename-list <list-id> <name>   rename a list
  delete-list <list-id>          delete a list and its tasks
  add <list-id> <text>           add a task
  toggle <task-id>               mark a task done / not done
  move <task-id> <list-id>       move a task to another list
  delete <task-id>               delete a task
  report daily|weekly [date]     generate a report (date: YYYY-MM-DD, default today)
  set-key <anthropic-key>        store the Anthropic API key in the keyring
  set-token <api-token>          store the todos API token in the keyring";

fn init_logging(config: &TallyConfig) {
    // Journal logging (`journalctl --user -t tally -f`). Our crate logs at
    // info/debug (per config), everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("tally") {
                let max = if tally::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    tally::set_debug_logging(config.debug_logging);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(j) => j.with_syslog_identifier("tally".to_string()),
        Err(e) => {
            eprintln!("journal logging unavailable: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so our debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn parse_date(arg: Option<&String>) -> Result<NaiveDate, String> {
    match arg {
        None => Ok(Utc::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| format!("invalid date `{}`: {}", s, e)),
    }
}

fn print_store(store: &Store) {
    if store.is_empty() {
        println!("No lists.");
        return;
    }
    let today = Utc::now().date_naive();
    for list in store.lists() {
        let marker = if store.active_list_id() == Some(&list.id) {
            "*"
        } else {
            " "
        };
        let p = list.progress();
        println!(
            "{} {} [{}]  {}% done, {} pending",
            marker,
            list.name,
            list.id,
            p.percentage(),
            p.pending()
        );
        for task in &list.tasks {
            let check = if task.completed { "x" } else { " " };
            let due = match task.due_date {
                Some(d) if task.is_overdue(today) => format!("  (overdue {})", d),
                Some(d) => format!("  (due {})", d),
                None => String::new(),
            };
            println!("    [{}] {} [{}]{}", check, task.text, task.id, due);
        }
    }
    let overall = progress::overall_progress(store);
    println!(
        "\n{} of {} task(s) done ({}%)",
        overall.completed,
        overall.total,
        overall.percentage()
    );
}

fn print_report(report: &Report) {
    println!("{}", report.display_title());
    println!(
        "{} of {} task(s) completed ({}%)\n",
        report.completed_count(),
        report.total_tasks,
        report.completion_percentage()
    );
    println!("{}", report.summary);
    if !report.completed_tasks.is_empty() {
        println!();
        for task in &report.completed_tasks {
            println!("  - {}", task.text);
        }
    }
}

fn arg<'a>(args: &'a [String], i: usize, what: &str) -> Result<&'a String, String> {
    args.get(i)
        .ok_or_else(|| format!("missing {}\n\n{}", what, USAGE))
}

async fn run(args: Vec<String>, config: TallyConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };

    match command {
        "set-key" => {
            let key = arg(&args, 1, "key")?;
            let client =
                AnthropicClient::with_endpoint(key.trim(), &config.anthropic_url, &config.api_model)?;
            client.test_api_key().await?;
            anthropic::store_api_key(key.trim()).await?;
            println!("API key stored.");
            return Ok(());
        }
        "set-token" => {
            let token = arg(&args, 1, "token")?;
            keyring::store_secret(SecretKind::ApiToken, token.trim()).await?;
            println!("API token stored.");
            return Ok(());
        }
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            return Ok(());
        }
        _ => {}
    }

    let token = match keyring::resolve_secret(SecretKind::ApiToken).await {
        Ok(t) => t,
        Err(e) => {
            log::warn!("Could not read API token: {}", e);
            None
        }
    };
    let snapshot_path = config.snapshot_path();
    let client = ApiClient::new(&config.api_base_url, token)?;
    let mut remote = RemoteStore::with_store(client, load_snapshot(&snapshot_path));

    if let Err(e) = remote.load().await {
        if command != "lists" {
            return Err(e.into());
        }
        log::warn!("Showing cached lists: {}", e);
        eprintln!("offline ({}), showing cached data\n", e);
    }

    match command {
        "lists" => print_store(remote.store()),
        "add-list" => {
            let name = normalize_name(arg(&args, 1, "list name")?, "list name")?;
            let id = remote.create_list(&name).await?;
            println!("Created list {} [{}]", name, id);
        }
        "rename-list" => {
            let id = ListId::from(arg(&args, 1, "list id")?.as_str());
            let name = normalize_name(arg(&args, 2, "list name")?, "list name")?;
            remote.rename_list(&id, &name).await?;
        }
        "delete-list" => {
            let id = ListId::from(arg(&args, 1, "list id")?.as_str());
            remote.delete_list(&id).await?;
        }
        "add" => {
            let list = ListId::from(arg(&args, 1, "list id")?.as_str());
            let text = normalize_name(&args[2.min(args.len())..].join(" "), "task text")?;
            let id = remote.add_task(&list, &text).await?;
            println!("Added [{}]", id);
        }
        "toggle" => {
            let id = TaskId::from(arg(&args, 1, "task id")?.as_str());
            let done = remote.toggle_task(&id).await?;
            println!("{}", if done { "Done." } else { "Reopened." });
        }
        "move" => {
            let id = TaskId::from(arg(&args, 1, "task id")?.as_str());
            let to = ListId::from(arg(&args, 2, "list id")?.as_str());
            remote.move_task(&id, &to).await?;
        }
        "delete" => {
            let id = TaskId::from(arg(&args, 1, "task id")?.as_str());
            remote.delete_task(&id).await?;
        }
        "report" => {
            let kind = ReportKind::parse(arg(&args, 1, "report type")?)
                .ok_or_else(|| format!("report type must be daily or weekly\n\n{}", USAGE))?;
            let date = parse_date(args.get(2))?;
            let key = anthropic::load_api_key()
                .await?
                .ok_or("no Anthropic API key; run `tally set-key <key>` or set ANTHROPIC_API_KEY")?;
            let generator =
                AnthropicClient::with_endpoint(&key, &config.anthropic_url, &config.api_model)?;
            let tasks: Vec<_> = remote.store().tasks().cloned().collect();
            let report = ReportBuilder::new(generator).build(kind, date, &tasks).await?;
            print_report(&report);
        }
        other => return Err(format!("unknown command `{}`\n\n{}", other, USAGE).into()),
    }

    save_snapshot(&snapshot_path, remote.store());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TallyConfig::load()?;
    init_logging(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    run(args, config).await
}
