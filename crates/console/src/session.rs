//! Interactive console session.
//!
//! The session turns input lines into store operations and returns the
//! feedback to show. It does no I/O itself, so the event loop decides when a
//! line or a purge tick is processed.

use repairdesk_core::{NewTicket, TicketError, TicketStatus, TicketStore};

use crate::render::render_table;

/// Something to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Status line.
    Info(String),
    /// Refusal the user can fix (bad input, nothing selected).
    Warning(String),
    /// Data could not be saved or loaded.
    Error(String),
    /// Tables and help text.
    Output(String),
}

impl Feedback {
    /// Text as printed on the console.
    pub fn render(&self) -> String {
        match self {
            Feedback::Info(msg) => msg.clone(),
            Feedback::Warning(msg) => format!("warning: {msg}"),
            Feedback::Error(msg) => format!("error: {msg}"),
            Feedback::Output(text) => text.clone(),
        }
    }
}

const HELP: &str = "\
Commands:
  list               Show all tickets
  add                Enter a new device for repair
  repair <id>        Mark a device as repaired
  cancel <id>        Cancel the repair of a device
  delete <id>        Delete a ticket (asks for confirmation)
  purge              Remove repaired devices past the retention period
  help               Show this help
  quit               Exit";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Empty,
    List,
    Add,
    Repair(u64),
    Cancel(u64),
    Delete(u64),
    Purge,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(Command::Empty);
        };
        let arg = parts.next();

        match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => Ok(Command::List),
            "add" | "new" => Ok(Command::Add),
            "repair" | "repaired" => {
                parse_id(arg, "Please select a device to mark as repaired").map(Command::Repair)
            }
            "cancel" => {
                parse_id(arg, "Please select a device to cancel repair").map(Command::Cancel)
            }
            "delete" | "del" | "rm" => {
                parse_id(arg, "Please select a device to delete").map(Command::Delete)
            }
            "purge" => Ok(Command::Purge),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("Unknown command '{other}'. Type 'help' for a list.")),
        }
    }
}

fn parse_id(arg: Option<&str>, missing: &str) -> Result<u64, String> {
    match arg {
        None => Err(missing.to_string()),
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("'{raw}' is not a ticket ID")),
    }
}

/// Entry form fields, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Device,
    Serial,
    Issue,
    SubmittedBy,
    Contact,
}

impl FormField {
    fn label(&self) -> &'static str {
        match self {
            FormField::Device => "Device Name",
            FormField::Serial => "Serial Number",
            FormField::Issue => "Issue Description",
            FormField::SubmittedBy => "Submitted By",
            FormField::Contact => "Contact Info",
        }
    }

    fn next(&self) -> Option<FormField> {
        match self {
            FormField::Device => Some(FormField::Serial),
            FormField::Serial => Some(FormField::Issue),
            FormField::Issue => Some(FormField::SubmittedBy),
            FormField::SubmittedBy => Some(FormField::Contact),
            FormField::Contact => None,
        }
    }

    fn fill(&self, draft: &mut NewTicket, value: &str) {
        let slot = match self {
            FormField::Device => &mut draft.device,
            FormField::Serial => &mut draft.serial,
            FormField::Issue => &mut draft.issue,
            FormField::SubmittedBy => &mut draft.submitted_by,
            FormField::Contact => &mut draft.contact,
        };
        *slot = value.to_string();
    }
}

#[derive(Debug)]
enum Mode {
    Command,
    Form { draft: NewTicket, field: FormField },
    ConfirmDelete { id: u64, device: String },
}

/// Console state wrapped around the store.
pub struct Session {
    store: TicketStore,
    mode: Mode,
    finished: bool,
}

impl Session {
    pub fn new(store: TicketStore) -> Self {
        Self {
            store,
            mode: Mode::Command,
            finished: false,
        }
    }

    pub fn store(&self) -> &TicketStore {
        &self.store
    }

    /// Whether the user asked to exit.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Prompt for the next input line.
    pub fn prompt(&self) -> String {
        match &self.mode {
            Mode::Command => "repairdesk> ".to_string(),
            Mode::Form { field, .. } => format!("{}: ", field.label()),
            Mode::ConfirmDelete { device, .. } => {
                format!("Are you sure you want to delete '{device}'? [y/N] ")
            }
        }
    }

    /// Banner, load warning and the initial table.
    pub fn startup(&self) -> Vec<Feedback> {
        let mut out = vec![Feedback::Info(format!(
            "ITSYS repair desk - data file: {}",
            self.store.location()
        ))];
        if let Some(reason) = self.store.load_warning() {
            out.push(Feedback::Warning(format!(
                "Data file is corrupted. Starting with empty data. ({reason})"
            )));
        }
        out.push(Feedback::Output(render_table(self.store.tickets())));
        out.push(Feedback::Info("Ready. Type 'help' for commands.".to_string()));
        out
    }

    /// Process one line of input.
    pub fn handle_line(&mut self, line: &str) -> Vec<Feedback> {
        match std::mem::replace(&mut self.mode, Mode::Command) {
            Mode::Command => self.handle_command(line),
            Mode::Form { mut draft, field } => {
                field.fill(&mut draft, line);
                match field.next() {
                    Some(next) => {
                        self.mode = Mode::Form { draft, field: next };
                        Vec::new()
                    }
                    None => self.add(draft),
                }
            }
            Mode::ConfirmDelete { id, device } => {
                let answer = line.trim().to_ascii_lowercase();
                if answer == "y" || answer == "yes" {
                    self.delete(id, &device)
                } else {
                    vec![Feedback::Info(format!("Kept '{device}'"))]
                }
            }
        }
    }

    /// Scheduled purge of old repaired tickets.
    pub fn run_purge(&mut self) -> Vec<Feedback> {
        match self.store.purge_due() {
            Ok(report) if report.is_empty() => Vec::new(),
            Ok(_) => self.changed("Old repaired devices have been removed".to_string()),
            Err(e) => vec![storage_failure("Failed to save after cleanup", e)],
        }
    }

    fn handle_command(&mut self, line: &str) -> Vec<Feedback> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(msg) => return vec![Feedback::Warning(msg)],
        };

        match command {
            Command::Empty => Vec::new(),
            Command::List => vec![Feedback::Output(render_table(self.store.tickets()))],
            Command::Add => {
                self.mode = Mode::Form {
                    draft: NewTicket::default(),
                    field: FormField::Device,
                };
                Vec::new()
            }
            Command::Repair(id) => match self.store.mark_repaired(id) {
                Ok(ticket) => {
                    self.changed(format!("Device '{}' marked as repaired", ticket.device))
                }
                Err(e) => refusal_or_failure(e, "Failed to save changes"),
            },
            Command::Cancel(id) => match self.store.cancel_repair(id) {
                Ok(ticket) => {
                    self.changed(format!("Repair for '{}' has been canceled", ticket.device))
                }
                Err(e) => refusal_or_failure(e, "Failed to save changes"),
            },
            Command::Delete(id) => match self.store.get(id) {
                Some(ticket) => {
                    self.mode = Mode::ConfirmDelete {
                        id,
                        device: ticket.device.clone(),
                    };
                    Vec::new()
                }
                None => vec![refusal(&TicketError::NotFound(id))],
            },
            Command::Purge => {
                let out = self.run_purge();
                if out.is_empty() {
                    vec![Feedback::Info("No repaired devices are due for removal".to_string())]
                } else {
                    out
                }
            }
            Command::Help => vec![Feedback::Output(HELP.to_string())],
            Command::Quit => {
                self.finished = true;
                Vec::new()
            }
        }
    }

    fn add(&mut self, draft: NewTicket) -> Vec<Feedback> {
        match self.store.add(draft) {
            Ok(ticket) => self.changed(format!("Device '{}' added for repair", ticket.device)),
            Err(e) => refusal_or_failure(e, "Failed to save device"),
        }
    }

    fn delete(&mut self, id: u64, device: &str) -> Vec<Feedback> {
        match self.store.delete(id) {
            Ok(_) => self.changed(format!("Device '{device}' has been deleted")),
            Err(e) => refusal_or_failure(e, "Failed to save after deletion"),
        }
    }

    /// Status line plus the refreshed table.
    fn changed(&self, status: String) -> Vec<Feedback> {
        vec![
            Feedback::Output(render_table(self.store.tickets())),
            Feedback::Info(status),
        ]
    }
}

fn refusal_or_failure(e: TicketError, context: &str) -> Vec<Feedback> {
    if e.is_refusal() {
        vec![refusal(&e)]
    } else {
        vec![storage_failure(context, e)]
    }
}

fn refusal(e: &TicketError) -> Feedback {
    match e {
        TicketError::MissingField(_) => {
            Feedback::Warning("Device name and issue description are required!".to_string())
        }
        TicketError::NotFound(id) => Feedback::Warning(format!("No device with ID {id}")),
        TicketError::AlreadyInStatus {
            status: TicketStatus::Repaired,
            ..
        } => Feedback::Info("This device is already marked as repaired".to_string()),
        TicketError::AlreadyInStatus {
            status: TicketStatus::Canceled,
            ..
        } => Feedback::Info("This repair is already canceled".to_string()),
        TicketError::IdsExhausted => Feedback::Warning(e.to_string()),
        other => Feedback::Info(other.to_string()),
    }
}

fn storage_failure(context: &str, e: TicketError) -> Feedback {
    Feedback::Error(format!("{context}: {:#}", anyhow::Error::from(e)))
}
