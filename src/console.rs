use std::{io::Write, path::PathBuf};

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use chronos_app::{GreetingState, ReminderViewModel, RemindersObserver};
use chronos_models::reminder::{Reminder, ReminderFireTime};
use chronos_scheduler::{DeliveryError, Notification, NotificationChannel};
use clap::{Parser, Subcommand};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};

use crate::screens::Screens;

const AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Posts reminder notifications to the terminal.
pub struct ConsoleNotificationChannel {
    screens: Screens,
}

impl ConsoleNotificationChannel {
    pub fn new(screens: Screens) -> Self {
        Self { screens }
    }
}

#[async_trait]
impl NotificationChannel for ConsoleNotificationChannel {
    async fn post(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", self.screens.notification(notification))?;
        stdout.flush()?;
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct CommandLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Sign in with an account token
    Login { token: String },
    /// Sign out
    Logout,
    /// Show the reminder list
    List,
    /// Start a new reminder
    New,
    /// Edit a reminder by list number or id
    Edit { target: String },
    /// Set the title of the reminder being edited
    Title { text: Vec<String> },
    /// Set the notes of the reminder being edited
    Notes { text: Vec<String> },
    /// Set the firing time, e.g. `at 2025-06-15 10:30`
    At { when: Vec<String> },
    /// Fire after a delay, e.g. `in 90s`, `in 5m`, `in 2h`
    In { offset: String },
    /// Attach an image file
    Image { path: PathBuf },
    /// Save the reminder being edited
    Save,
    /// Discard the reminder being edited
    Cancel,
    /// Delete a reminder by list number or id
    Delete { target: String },
    /// Ask for an AI generated message
    Greet { prompt: Vec<String> },
    /// Show the last AI message for sharing
    Share,
    /// Leave the application
    Quit,
}

fn parse_command(line: &str) -> Result<Command, clap::Error> {
    CommandLine::try_parse_from(line.split_whitespace()).map(|line| line.command)
}

/// Parses delays such as `90s`, `5m` or `2h`. A bare number means seconds.
pub fn parse_offset(input: &str) -> anyhow::Result<TimeDelta> {
    let input = input.trim();
    let (amount, unit) = match input.char_indices().last() {
        Some((index, unit)) if unit.is_ascii_alphabetic() => (&input[..index], unit),
        _ => (input, 's'),
    };
    let amount: i64 = amount
        .parse()
        .with_context(|| format!("invalid offset {input:?}"))?;

    let delta = match unit {
        's' => TimeDelta::try_seconds(amount),
        'm' => TimeDelta::try_minutes(amount),
        'h' => TimeDelta::try_hours(amount),
        'd' => TimeDelta::try_days(amount),
        other => bail!("unknown offset unit {other:?}"),
    };

    delta.ok_or_else(|| anyhow!("offset {input:?} is out of range"))
}

pub fn fire_time_after(now: DateTime<Utc>, offset: &str) -> anyhow::Result<ReminderFireTime> {
    let fire_at = now
        .checked_add_signed(parse_offset(offset)?)
        .ok_or_else(|| anyhow!("offset {offset:?} is too far from now"))?;

    Ok(ReminderFireTime::new(fire_at))
}

/// Parses a local `YYYY-MM-DD HH:MM` time in the display timezone.
pub fn parse_at(input: &str, timezone: Tz) -> anyhow::Result<ReminderFireTime> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), AT_FORMAT)
        .with_context(|| format!("expected {AT_FORMAT}, got {input:?}"))?;
    let local = timezone
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| anyhow!("{input:?} is ambiguous or skipped in {timezone}"))?;

    Ok(ReminderFireTime::new(local.to_utc()))
}

fn resolve<'a>(reminders: &'a [Reminder], target: &str) -> anyhow::Result<&'a Reminder> {
    if let Ok(number) = target.parse::<usize>() {
        if let Some(reminder) = number.checked_sub(1).and_then(|index| reminders.get(index)) {
            return Ok(reminder);
        }
    }

    reminders
        .iter()
        .find(|reminder| reminder.id == target)
        .ok_or_else(|| anyhow!("no reminder {target:?}"))
}

struct Console {
    view_model: ReminderViewModel,
    screens: Screens,
    connectivity: watch::Receiver<bool>,
    reminders: RemindersObserver,
}

enum Flow {
    Continue,
    Quit,
}

impl Console {
    fn print_list(&self) {
        println!(
            "{}",
            self.screens
                .reminder_list(*self.connectivity.borrow(), &self.reminders.current())
        );
    }

    fn print_dialog(&self) {
        let state = self.view_model.edit_state().borrow().clone();
        println!(
            "{}",
            self.screens.edit_dialog(&state, self.view_model.can_save())
        );
    }

    async fn handle(&self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::Login { token } => {
                let user = self.view_model.sign_in(&token).await?;
                println!("{}", self.screens.header(Some(&user)));
            }
            Command::Logout => {
                self.view_model.sign_out().await;
                println!("{}", self.screens.header(None));
            }
            Command::List => self.print_list(),
            Command::New => {
                self.view_model.begin_edit(None);
                self.print_dialog();
            }
            Command::Edit { target } => {
                let reminders = self.reminders.current();
                self.view_model.begin_edit(Some(resolve(&reminders, &target)?));
                self.print_dialog();
            }
            Command::Title { text } => {
                self.view_model.on_title_change(text.join(" "));
                self.print_dialog();
            }
            Command::Notes { text } => {
                self.view_model.on_notes_change(text.join(" "));
                self.print_dialog();
            }
            Command::At { when } => {
                let fire_at = parse_at(&when.join(" "), self.screens.timezone())?;
                self.view_model.on_fire_at_change(fire_at);
                self.print_dialog();
            }
            Command::In { offset } => {
                let fire_at = fire_time_after(self.view_model.now(), &offset)?;
                self.view_model.on_fire_at_change(fire_at);
                self.print_dialog();
            }
            Command::Image { path } => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                self.view_model.attach_image(bytes).await?;
                self.print_dialog();
            }
            Command::Save => {
                let saved = self.view_model.save().await?;
                println!(
                    "Saved {:?} for {}",
                    saved.title,
                    self.screens.format_time(saved.fire_at.time())
                );
            }
            Command::Cancel => self.view_model.cancel_edit(),
            Command::Delete { target } => {
                let reminders = self.reminders.current();
                let id = resolve(&reminders, &target)?.id.clone();
                self.view_model.delete(&id).await?;
            }
            Command::Greet { prompt } => {
                self.view_model.request_greeting(&prompt.join(" ")).await;
                let state = self.view_model.greeting_state().borrow().clone();
                println!("{}", self.screens.greeting(&state));
            }
            Command::Share => match self.view_model.take_greeting() {
                state @ GreetingState::Success(_) => println!("{}", self.screens.greeting(&state)),
                _ => println!("Nothing to share, use `greet` first"),
            },
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(
    view_model: ReminderViewModel,
    screens: Screens,
    connectivity: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let reminders = view_model.reminders();
    let header = view_model.user_info().borrow().clone();
    println!("{}", screens.header(header.as_ref()));

    let mut console = Console {
        view_model,
        screens,
        connectivity,
        reminders,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }

                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                match console.handle(command).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => {
                        log::debug!("Command failed: {e:?}");
                        println!("Error: {e}");
                    }
                }
            }
            Some(_) = console.reminders.changed() => console.print_list(),
            Ok(()) = console.connectivity.changed() => console.print_list(),
        }
    }

    Ok(())
}
