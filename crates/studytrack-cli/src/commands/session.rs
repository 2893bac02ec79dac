use clap::Subcommand;
use studytrack_core::{
    SessionAction, SessionKind, SessionPayload, StudyService,
};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum SessionCmd {
    /// Create a new planned session against a topic
    Create {
        /// Topic reference
        topic: String,
        /// Session kind: study, review, or practice
        #[arg(long, default_value = "study")]
        kind: String,
        /// Planned duration in minutes (config default when omitted)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Start the planned session
    Start {
        /// Session id (defaults to the open session)
        id: Option<Uuid>,
    },
    /// Pause the active session
    Pause {
        id: Option<Uuid>,
    },
    /// Resume the paused session
    Resume {
        id: Option<Uuid>,
    },
    /// Complete the session and fix its active duration
    Complete {
        id: Option<Uuid>,
        /// Productivity rating, 1-5
        #[arg(long)]
        productivity: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel the session (no duration is recorded)
    Cancel {
        id: Option<Uuid>,
    },
    /// Delete a non-terminal session
    Delete {
        id: Uuid,
    },
    /// Print the open session as JSON
    Status,
    /// List all sessions as JSON
    List,
}

fn parse_kind(kind: &str) -> Result<SessionKind, Box<dyn std::error::Error>> {
    match kind {
        "study" => Ok(SessionKind::Study),
        "review" => Ok(SessionKind::Review),
        "practice" => Ok(SessionKind::Practice),
        other => Err(format!("unknown session kind '{other}'").into()),
    }
}

/// Resolve an explicit id, falling back to the owner's open session.
fn resolve_id(
    svc: &StudyService,
    owner: &str,
    id: Option<Uuid>,
) -> Result<Uuid, Box<dyn std::error::Error>> {
    if let Some(id) = id {
        return Ok(id);
    }
    match svc.find_open_session(owner)? {
        Some(session) => Ok(session.id),
        None => Err("no open session; pass a session id".into()),
    }
}

fn transition(
    svc: &StudyService,
    owner: &str,
    id: Option<Uuid>,
    action: SessionAction,
    payload: SessionPayload,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = resolve_id(svc, owner, id)?;
    let (_, event) = svc.transition(owner, id, action, payload, chrono::Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

pub fn run(cmd: SessionCmd, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let svc = StudyService::open()?;

    match cmd {
        SessionCmd::Create {
            topic,
            kind,
            minutes,
        } => {
            let session =
                svc.create_session(owner, &topic, parse_kind(&kind)?, minutes, chrono::Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionCmd::Start { id } => {
            transition(&svc, owner, id, SessionAction::Start, SessionPayload::default())?;
        }
        SessionCmd::Pause { id } => {
            transition(&svc, owner, id, SessionAction::Pause, SessionPayload::default())?;
        }
        SessionCmd::Resume { id } => {
            transition(&svc, owner, id, SessionAction::Resume, SessionPayload::default())?;
        }
        SessionCmd::Complete {
            id,
            productivity,
            notes,
        } => {
            transition(
                &svc,
                owner,
                id,
                SessionAction::Complete,
                SessionPayload {
                    productivity,
                    notes,
                },
            )?;
        }
        SessionCmd::Cancel { id } => {
            transition(&svc, owner, id, SessionAction::Cancel, SessionPayload::default())?;
        }
        SessionCmd::Delete { id } => {
            svc.delete_session(owner, id)?;
            eprintln!("Session deleted: {id}");
        }
        SessionCmd::Status => match svc.find_open_session(owner)? {
            Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
            None => println!("null"),
        },
        SessionCmd::List => {
            let sessions = svc.list_sessions(owner)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
