use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use timetrack::api::time_off::{CreateTimeOff, TimeOffFilter};
use timetrack::api::timesheet::{CreateTimesheet, TimesheetFilter, TimesheetResponse};
use timetrack::client::{ApiClient, week_view};
use timetrack::model::time_off::TimeOffType;
use timetrack::timekeeping::accounting::format_hours;
use timetrack::timekeeping::entry::hhmm;
use timetrack::timekeeping::{NewBreakPeriod, NewTimeEntry, TimeOffStatus, TimesheetStatus};

/// Command-line client for the timetrack API
#[derive(Parser)]
#[command(name = "timetrack-cli", version, about, long_about = None)]
struct Cli {
    /// API base URL including the prefix
    #[arg(long, env = "TIMETRACK_URL", default_value = "http://localhost:8080/api/v1")]
    url: String,

    /// Access token from a previous `login`
    #[arg(long, env = "TIMETRACK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print an access token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TIMETRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the signed-in user
    Me,
    /// Timesheets
    #[command(subcommand)]
    Timesheet(TimesheetCommand),
    /// Time-off requests
    #[command(subcommand)]
    TimeOff(TimeOffCommand),
    /// Summary of the current week
    Dashboard,
}

#[derive(Subcommand)]
enum TimesheetCommand {
    List {
        #[arg(long)]
        employee_id: Option<u64>,
        #[arg(long)]
        status: Option<TimesheetStatus>,
    },
    /// Print a timesheet with per-day hours
    Show { id: u64 },
    Create {
        /// Monday of the week, YYYY-MM-DD
        #[arg(long)]
        week_start: NaiveDate,
        #[arg(long)]
        manager_email: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    AddEntry(AddEntryArgs),
    DeleteEntry { id: u64, entry_id: u64 },
    Submit { id: u64 },
    Approve { id: u64 },
    Reject {
        id: u64,
        #[arg(long)]
        reason: Option<String>,
    },
    Delete { id: u64 },
}

#[derive(Args)]
struct AddEntryArgs {
    id: u64,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long = "in", value_parser = parse_time)]
    in_time: NaiveTime,
    #[arg(long = "out", value_parser = parse_time)]
    out_time: NaiveTime,
    /// Break as HH:mm-HH:mm; repeatable
    #[arg(long = "break", value_parser = parse_break)]
    breaks: Vec<NewBreakPeriod>,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    note: Option<String>,
}

#[derive(Subcommand)]
enum TimeOffCommand {
    List {
        #[arg(long)]
        employee_id: Option<u64>,
        #[arg(long)]
        status: Option<TimeOffStatus>,
    },
    Create {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// vacation, sick, personal or other
        #[arg(long = "type")]
        kind: TimeOffType,
        #[arg(long)]
        manager_email: String,
        #[arg(long)]
        comment: Option<String>,
    },
    Approve {
        id: u64,
        #[arg(long)]
        comment: Option<String>,
    },
    Reject {
        id: u64,
        #[arg(long)]
        comment: Option<String>,
    },
    Delete { id: u64 },
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    hhmm::parse(raw).ok_or_else(|| format!("invalid time '{raw}', expected HH:mm"))
}

fn parse_break(raw: &str) -> Result<NewBreakPeriod, String> {
    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| format!("invalid break '{raw}', expected HH:mm-HH:mm"))?;
    Ok(NewBreakPeriod {
        start_time: Some(parse_time(start)?),
        end_time: Some(parse_time(end)?),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_week(ts: &TimesheetResponse) {
    let view = week_view(ts);
    println!(
        "Timesheet #{} | {} | week {} to {} | {}",
        ts.id, ts.employee_name, ts.week_start, ts.week_end, ts.status
    );
    for day in &view.days {
        println!(
            "  {} {}  total {:>6}  regular {:>6}  overtime {:>6}",
            day.date.format("%a"),
            day.date,
            format_hours(day.total_hours),
            format_hours(day.regular_hours),
            format_hours(day.overtime_hours),
        );
    }
    println!(
        "  Week            total {:>6}  regular {:>6}  overtime {:>6}",
        format_hours(view.total_hours),
        format_hours(view.regular_hours),
        format_hours(view.overtime_hours),
    );
}

async fn signed_in(url: &str, token: Option<&str>) -> Result<ApiClient> {
    let token = token.ok_or_else(|| anyhow!("Not signed in; run `login` and set TIMETRACK_TOKEN"))?;
    let mut client = ApiClient::new(url);
    client.resume(token).await.context("Failed to restore session")?;
    Ok(client)
}

async fn run_timesheet(client: &ApiClient, command: TimesheetCommand) -> Result<()> {
    match command {
        TimesheetCommand::List { employee_id, status } => {
            let sheets = client
                .list_timesheets(&TimesheetFilter { employee_id, status })
                .await?;
            for ts in &sheets {
                println!(
                    "#{:<5} {:<20} {}  {:<9}  {:>6}h",
                    ts.id,
                    ts.employee_name,
                    ts.week_start,
                    ts.status,
                    format_hours(ts.total_hours)
                );
            }
        }
        TimesheetCommand::Show { id } => print_week(&client.get_timesheet(id).await?),
        TimesheetCommand::Create {
            week_start,
            manager_email,
            project,
            comment,
        } => {
            let ts = client
                .create_timesheet(&CreateTimesheet {
                    week_start,
                    manager_email,
                    project,
                    comment,
                })
                .await?;
            print_week(&ts);
        }
        TimesheetCommand::AddEntry(args) => {
            let ts = client.get_timesheet(args.id).await?;
            let entry = NewTimeEntry {
                date: args.date,
                in_time: Some(args.in_time),
                out_time: Some(args.out_time),
                breaks: args.breaks,
                project: args.project,
                note: args.note,
            };
            print_week(&client.add_entry(&ts, &entry).await?);
        }
        TimesheetCommand::DeleteEntry { id, entry_id } => {
            let ts = client.get_timesheet(id).await?;
            print_week(&client.delete_entry(&ts, entry_id).await?);
        }
        TimesheetCommand::Submit { id } => {
            let ts = client.get_timesheet(id).await?;
            print_week(&client.submit_timesheet(&ts).await?);
        }
        TimesheetCommand::Approve { id } => {
            let ts = client.get_timesheet(id).await?;
            print_week(&client.approve_timesheet(&ts).await?);
        }
        TimesheetCommand::Reject { id, reason } => {
            let ts = client.get_timesheet(id).await?;
            print_week(&client.reject_timesheet(&ts, reason).await?);
        }
        TimesheetCommand::Delete { id } => {
            let ts = client.get_timesheet(id).await?;
            client.delete_timesheet(&ts).await?;
            println!("Deleted timesheet #{id}");
        }
    }
    Ok(())
}

async fn run_time_off(client: &ApiClient, command: TimeOffCommand) -> Result<()> {
    match command {
        TimeOffCommand::List { employee_id, status } => {
            print_json(&client.list_time_off(&TimeOffFilter { employee_id, status }).await?)?
        }
        TimeOffCommand::Create {
            start,
            end,
            kind,
            manager_email,
            comment,
        } => {
            let created = client
                .create_time_off(&CreateTimeOff {
                    start_date: start,
                    end_date: end,
                    kind,
                    manager_email,
                    comment,
                })
                .await?;
            print_json(&created)?;
        }
        TimeOffCommand::Approve { id, comment } => {
            let req = client.get_time_off(id).await?;
            print_json(&client.approve_time_off(&req, comment).await?)?;
        }
        TimeOffCommand::Reject { id, comment } => {
            let req = client.get_time_off(id).await?;
            print_json(&client.reject_time_off(&req, comment).await?)?;
        }
        TimeOffCommand::Delete { id } => {
            let req = client.get_time_off(id).await?;
            client.delete_time_off(&req).await?;
            println!("Deleted time off request #{id}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login { email, password } => {
            let mut client = ApiClient::new(&cli.url);
            let session = client.sign_in(&email, &password).await?;
            eprintln!("Signed in as {} ({})", session.full_name, session.role);
            println!("{}", session.access_token);
        }
        Commands::Me => {
            let client = signed_in(&cli.url, cli.token.as_deref()).await?;
            print_json(&client.me().await?)?;
        }
        Commands::Timesheet(command) => {
            let client = signed_in(&cli.url, cli.token.as_deref()).await?;
            run_timesheet(&client, command).await?;
        }
        Commands::TimeOff(command) => {
            let client = signed_in(&cli.url, cli.token.as_deref()).await?;
            run_time_off(&client, command).await?;
        }
        Commands::Dashboard => {
            let client = signed_in(&cli.url, cli.token.as_deref()).await?;
            print_json(&client.dashboard_summary().await?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_range_parses_both_ends() {
        let b = parse_break("12:00-12:45").unwrap();
        assert_eq!(b.start_time, NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(b.end_time, NaiveTime::from_hms_opt(12, 45, 0));
    }

    #[test]
    fn malformed_times_are_rejected() {
        assert!(parse_time("9am").is_err());
        assert!(parse_time("25:00").is_err());
        assert!(parse_break("12:00").is_err());
        assert!(parse_break("12:00-lunch").is_err());
    }
}
