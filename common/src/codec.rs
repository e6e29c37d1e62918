//! Line-oriented control protocol spoken between controller, stubs and
//! workers.
//!
//! One message per line, fields separated by `|`, terminated by `\n`:
//!
//! | message | direction |
//! |---|---|
//! | `SPAWN\|MAP\|<id>\|<reducers>\|<temp dir>\|<manifest>[\|<host>\|<port>]` | controller -> stub |
//! | `SPAWN\|REDUCE\|<id>\|<mappers>\|<temp dir>\|<output dir>[\|<host>\|<port>]` | controller -> stub |
//! | `HELLO\|<role>\|<id>` | worker -> controller |
//! | `BEGIN` | controller -> worker |
//! | `OK[\|<pid>]` | stub -> controller |
//! | `ERR\|<reason>` | stub -> controller |
//!
//! Decoding never fails: anything unrecognised becomes `ERR|BadCommand`.

use std::fmt;
use std::path::PathBuf;

use crate::job::Endpoint;
use crate::Role;

pub const DELIMITER: char = '|';

/// Why a stub refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReason {
    /// The line was not a well-formed request.
    BadCommand,

    /// The worker executable is not in the stub's bin directory.
    WorkerExeMissing,

    /// The OS refused to start the worker.
    CreateProcessFailed,

    /// A reason this version does not know, kept verbatim.
    Other(String),
}

impl ErrorReason {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorReason::BadCommand => "BadCommand",
            ErrorReason::WorkerExeMissing => "WorkerExeMissing",
            ErrorReason::CreateProcessFailed => "CreateProcessFailed",
            ErrorReason::Other(reason) => reason,
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "BadCommand" => ErrorReason::BadCommand,
            "WorkerExeMissing" => ErrorReason::WorkerExeMissing,
            "CreateProcessFailed" => ErrorReason::CreateProcessFailed,
            other => ErrorReason::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorReason::Other(reason) if reason.is_empty() => f.write_str("unspecified"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Request for a stub to launch one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub role: Role,
    pub id: u32,

    /// Number of reducers for a mapper, number of mappers for a reducer.
    pub peer_count: u32,

    pub temp_dir: PathBuf,

    /// Manifest path for a mapper, output directory for a reducer.
    pub target: PathBuf,

    /// Rendezvous address the worker should say HELLO to. When absent the
    /// stub falls back to its own configured controller.
    pub controller: Option<Endpoint>,
}

/// One control-protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Spawn(SpawnRequest),
    Hello { role: Role, id: u32 },
    Begin,
    Ok { pid: Option<u32> },
    Err(ErrorReason),
}

impl ControlMessage {
    pub fn bad_command() -> Self {
        ControlMessage::Err(ErrorReason::BadCommand)
    }

    /// Serialize to a single newline-terminated line.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }

    /// Parse one line. Trailing `\r`/`\n` are ignored.
    pub fn decode(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(DELIMITER).collect();

        let decoded = match fields.as_slice() {
            ["SPAWN", rest @ ..] => decode_spawn(rest).map(ControlMessage::Spawn),
            ["HELLO", role, id] => role
                .parse()
                .ok()
                .zip(parse_u32(id))
                .map(|(role, id)| ControlMessage::Hello { role, id }),
            ["BEGIN"] => Some(ControlMessage::Begin),
            ["OK"] => Some(ControlMessage::Ok { pid: None }),
            ["OK", pid] => parse_u32(pid).map(|pid| ControlMessage::Ok { pid: Some(pid) }),
            ["ERR"] => Some(ControlMessage::Err(ErrorReason::Other(String::new()))),
            ["ERR", reason] => Some(ControlMessage::Err(ErrorReason::parse(reason))),
            _ => None,
        };

        decoded.unwrap_or_else(ControlMessage::bad_command)
    }
}

fn parse_u32(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

fn non_empty(s: &str) -> Option<PathBuf> {
    (!s.is_empty()).then(|| PathBuf::from(s))
}

fn decode_spawn(fields: &[&str]) -> Option<SpawnRequest> {
    let (head, controller) = match fields {
        [role, id, peers, temp, target] => ([*role, *id, *peers, *temp, *target], None),
        [role, id, peers, temp, target, host, port] => {
            if host.is_empty() {
                return None;
            }
            let port = port.trim().parse().ok()?;
            (
                [*role, *id, *peers, *temp, *target],
                Some(Endpoint::new(*host, port)),
            )
        }
        _ => return None,
    };
    let [role, id, peers, temp, target] = head;

    Some(SpawnRequest {
        role: role.parse().ok()?,
        id: parse_u32(id)?,
        peer_count: parse_u32(peers)?,
        temp_dir: non_empty(temp)?,
        target: non_empty(target)?,
        controller,
    })
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::Spawn(req) => {
                write!(
                    f,
                    "SPAWN|{}|{}|{}|{}|{}",
                    req.role,
                    req.id,
                    req.peer_count,
                    req.temp_dir.display(),
                    req.target.display()
                )?;
                if let Some(controller) = &req.controller {
                    write!(f, "|{}|{}", controller.host, controller.port)?;
                }
                Ok(())
            }
            ControlMessage::Hello { role, id } => write!(f, "HELLO|{role}|{id}"),
            ControlMessage::Begin => f.write_str("BEGIN"),
            ControlMessage::Ok { pid: None } => f.write_str("OK"),
            ControlMessage::Ok { pid: Some(pid) } => write!(f, "OK|{pid}"),
            ControlMessage::Err(ErrorReason::Other(reason)) if reason.is_empty() => {
                f.write_str("ERR")
            }
            ControlMessage::Err(reason) => write!(f, "ERR|{}", reason.as_str()),
        }
    }
}
