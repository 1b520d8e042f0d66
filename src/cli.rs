use crate::commands::{self, Context};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "habitledger", version)]
#[command(
    about = "Completion log, streaks and progress analytics for daily habits",
    long_about = "habitledger keeps a per-owner log of habit completions in SQLite and derives streaks, strength scores, daily progress and motivation tiers from it. The schema converges on every start, so older databases are upgraded in place."
)]
#[command(arg_required_else_help = true)]
#[command(after_long_help = "Examples:
  habitledger habit add --owner demo@habitgain.local --name \"Drink water\"
  habitledger record --owner demo@habitgain.local --habit 1
  habitledger streak --owner demo@habitgain.local --habit 1
  habitledger panel --owner demo@habitgain.local
  habitledger completion zsh > ~/.zsh/completions/_habitledger
  habitledger man > habitledger.1")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct DbArgs {
    #[arg(
        long,
        value_name = "PATH",
        help = "Path to ledger DB (default: $XDG_STATE_HOME/habitledger/ledger.db)"
    )]
    db: Option<PathBuf>,
    #[arg(
        long,
        value_name = "DIR",
        help = "Directory holding .habitledger/config.toml (default: current directory)"
    )]
    config_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Converge the database schema",
        long_about = "Create missing tables, columns and indexes and backfill legacy data. Safe to run any number of times."
    )]
    Migrate {
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(about = "Record a habit as done for a day")]
    #[command(arg_required_else_help = true)]
    #[command(after_long_help = "Examples:
  habitledger record --owner demo@habitgain.local --habit 3
  habitledger record --owner demo@habitgain.local --habit 3 --day 2026-03-01 --log completions.ndjson")]
    Record {
        #[arg(long, value_name = "OWNER", help = "Owner the habit belongs to")]
        owner: String,
        #[arg(long, value_name = "ID", help = "Habit ID")]
        habit: i64,
        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            help = "Day being logged (default: today)"
        )]
        day: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD", help = "Override today's date")]
        today: Option<NaiveDate>,
        #[arg(long, value_name = "PATH", help = "Append NDJSON completion log to file")]
        log: Option<PathBuf>,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(about = "Show current streak, best streak and strength for a habit")]
    #[command(arg_required_else_help = true)]
    Streak {
        #[arg(long, value_name = "OWNER", help = "Owner the habit belongs to")]
        owner: String,
        #[arg(long, value_name = "ID", help = "Habit ID")]
        habit: i64,
        #[arg(long, value_name = "YYYY-MM-DD", help = "Override today's date")]
        today: Option<NaiveDate>,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(
        about = "Show today's progress panel",
        long_about = "Show completed/total for the owner's active habits. The planned total for a day only ever grows, so deactivating a habit late in the day does not inflate the percentage."
    )]
    #[command(arg_required_else_help = true)]
    Panel {
        #[arg(long, value_name = "OWNER", help = "Owner to report on")]
        owner: String,
        #[arg(long, value_name = "YYYY-MM-DD", help = "Override today's date")]
        today: Option<NaiveDate>,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(about = "Summarize activity over an inclusive date window")]
    #[command(arg_required_else_help = true)]
    #[command(after_long_help = "Example:
  habitledger window --owner demo@habitgain.local --from 2026-03-01 --to 2026-03-31")]
    Window {
        #[arg(long, value_name = "OWNER", help = "Owner to report on")]
        owner: String,
        #[arg(long, value_name = "YYYY-MM-DD", help = "First day of the window")]
        from: NaiveDate,
        #[arg(long, value_name = "YYYY-MM-DD", help = "Last day of the window")]
        to: NaiveDate,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(about = "Show motivation stats and the selected tier")]
    #[command(arg_required_else_help = true)]
    Motivation {
        #[arg(long, value_name = "OWNER", help = "Owner to report on")]
        owner: String,
        #[arg(long, value_name = "YYYY-MM-DD", help = "Override today's date")]
        today: Option<NaiveDate>,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(about = "Show system-wide counts for the admin dashboard")]
    Stats {
        #[arg(long, value_name = "YYYY-MM-DD", help = "Override today's date")]
        today: Option<NaiveDate>,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(about = "Manage habits")]
    #[command(arg_required_else_help = true)]
    Habit {
        #[command(subcommand)]
        action: HabitCommands,
    },
    #[command(about = "Print the current schema objects and version")]
    Schema {
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(
        about = "Generate shell completion script",
        long_about = "Generate shell completion script for your shell. Redirect output to your shell completion directory."
    )]
    #[command(arg_required_else_help = true)]
    #[command(after_long_help = "Examples:
  habitledger completion bash > ~/.local/share/bash-completion/completions/habitledger
  habitledger completion zsh > ~/.zsh/completions/_habitledger
  habitledger completion fish > ~/.config/fish/completions/habitledger.fish")]
    Completion {
        #[arg(value_enum, value_name = "SHELL", help = "Target shell")]
        shell: Shell,
    },
    #[command(
        about = "Generate a man page",
        long_about = "Generate a roff man page for habitledger."
    )]
    Man {
        #[arg(
            long,
            value_name = "PATH",
            help = "Write man page to file (stdout when omitted)"
        )]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum HabitCommands {
    #[command(about = "Create a habit")]
    #[command(arg_required_else_help = true)]
    Add {
        #[arg(long, value_name = "OWNER", help = "Owner of the new habit")]
        owner: String,
        #[arg(long, value_name = "NAME", help = "Habit name")]
        name: String,
        #[arg(long, value_name = "TEXT", default_value = "", help = "Short description")]
        desc: String,
        #[arg(long, value_name = "ID", help = "Category ID")]
        category: Option<i64>,
        #[arg(long, value_name = "FREQ", default_value = "daily", help = "Frequency label")]
        frequency: String,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(about = "List active habits for an owner")]
    #[command(arg_required_else_help = true)]
    List {
        #[arg(long, value_name = "OWNER", help = "Owner to list")]
        owner: String,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(about = "Deactivate or reactivate a habit")]
    #[command(arg_required_else_help = true)]
    Pause {
        #[arg(long, value_name = "OWNER", help = "Owner the habit belongs to")]
        owner: String,
        #[arg(long, value_name = "ID", help = "Habit ID")]
        habit: i64,
        #[arg(long, help = "Reactivate instead of deactivating")]
        resume: bool,
        #[command(flatten)]
        db: DbArgs,
    },
    #[command(
        about = "Delete a habit",
        long_about = "Delete a habit. Its completions are kept or removed according to [habits].on_delete in .habitledger/config.toml (default: retain)."
    )]
    #[command(arg_required_else_help = true)]
    Delete {
        #[arg(long, value_name = "OWNER", help = "Owner the habit belongs to")]
        owner: String,
        #[arg(long, value_name = "ID", help = "Habit ID")]
        habit: i64,
        #[command(flatten)]
        db: DbArgs,
    },
}

impl DbArgs {
    fn context(self) -> Context {
        Context {
            db: self.db,
            config_root: self.config_root,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Migrate { db } => commands::migrate(&db.context()),
        Commands::Record {
            owner,
            habit,
            day,
            today,
            log,
            db,
        } => commands::record(&db.context(), &owner, habit, day, today, log),
        Commands::Streak {
            owner,
            habit,
            today,
            db,
        } => commands::streak(&db.context(), &owner, habit, today),
        Commands::Panel { owner, today, db } => commands::panel(&db.context(), &owner, today),
        Commands::Window {
            owner,
            from,
            to,
            db,
        } => commands::window(&db.context(), &owner, from, to),
        Commands::Motivation { owner, today, db } => {
            commands::motivation(&db.context(), &owner, today)
        }
        Commands::Stats { today, db } => commands::stats(&db.context(), today),
        Commands::Habit { action } => match action {
            HabitCommands::Add {
                owner,
                name,
                desc,
                category,
                frequency,
                db,
            } => commands::habit_add(&db.context(), &owner, &name, &desc, category, &frequency),
            HabitCommands::List { owner, db } => commands::habit_list(&db.context(), &owner),
            HabitCommands::Pause {
                owner,
                habit,
                resume,
                db,
            } => commands::habit_set_active(&db.context(), &owner, habit, resume),
            HabitCommands::Delete { owner, habit, db } => {
                commands::habit_delete(&db.context(), &owner, habit)
            }
        },
        Commands::Schema { db } => commands::schema(&db.context()),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Man { output } => {
            let man = clap_mangen::Man::new(Cli::command());
            match output {
                Some(path) => {
                    let mut bytes = Vec::new();
                    man.render(&mut bytes)?;
                    fs::write(path, bytes)?;
                }
                None => {
                    man.render(&mut io::stdout())?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_record_with_explicit_day() {
        let cli = Cli::try_parse_from([
            "habitledger",
            "record",
            "--owner",
            "a",
            "--habit",
            "3",
            "--day",
            "2026-03-01",
            "--db",
            "/tmp/x.db",
        ])
        .unwrap();
        match cli.command {
            Commands::Record { habit, day, db, .. } => {
                assert_eq!(habit, 3);
                assert_eq!(day, NaiveDate::from_ymd_opt(2026, 3, 1));
                assert_eq!(db.db, Some(PathBuf::from("/tmp/x.db")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(
            Cli::try_parse_from(["habitledger", "panel", "--owner", "a", "--today", "03/01/2026"])
                .is_err()
        );
    }
}
