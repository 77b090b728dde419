//! Message catalog: per-version encoders/decoders translating between
//! [`ClientMessage`]/[`ServerMessage`] and the raw [`Value::Structure`]
//! the codec produces.
//!
//! Signature bytes are fixed across versions; what changes release to
//! release is which fields are legal in the `extra` maps and whether a
//! message exists at all (e.g. `ACK_FAILURE` only below 3.0, `LOGON`
//! only from 5.1). Callers pick the right encode path by checking
//! `ProtocolVersion` themselves; this module supplies the gating
//! predicates it can answer context-free (arity, presence of a field)
//! and leaves anything session-shaped to `bolt-connection`.

use std::collections::HashMap;

use crate::config::{AuthToken, ProtocolVersion};
use crate::error::ProtocolError;
use crate::packstream::Value;

/// Client → server message signature bytes.
pub mod client_signature {
    pub const HELLO: u8 = 0x01;
    pub const INIT: u8 = 0x01;
    pub const GOODBYE: u8 = 0x02;
    pub const ACK_FAILURE: u8 = 0x0E;
    pub const RESET: u8 = 0x0F;
    pub const RUN: u8 = 0x10;
    pub const BEGIN: u8 = 0x11;
    pub const COMMIT: u8 = 0x12;
    pub const ROLLBACK: u8 = 0x13;
    pub const DISCARD: u8 = 0x2F;
    pub const PULL: u8 = 0x3F;
    pub const LOGON: u8 = 0x6A;
}

/// Server → client message signature bytes.
pub mod server_signature {
    pub const SUCCESS: u8 = 0x70;
    pub const RECORD: u8 = 0x71;
    pub const IGNORED: u8 = 0x7E;
    pub const FAILURE: u8 = 0x7F;
}

/// Extra parameters that accompany a `RUN`/`BEGIN`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunExtra {
    pub bookmarks: Vec<String>,
    pub tx_timeout_ms: Option<i64>,
    pub tx_metadata: HashMap<String, Value>,
    pub mode: Option<String>,
    pub db: Option<String>,
    /// v≥4.4
    pub imp_user: Option<String>,
    /// v≥5.2
    pub notifications_minimum_severity: Option<String>,
}

impl RunExtra {
    fn into_map(self, version: ProtocolVersion) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        if !self.bookmarks.is_empty() {
            map.insert(
                "bookmarks".into(),
                Value::List(self.bookmarks.into_iter().map(Value::String).collect()),
            );
        }
        if let Some(timeout) = self.tx_timeout_ms {
            map.insert("tx_timeout".into(), Value::Integer(timeout));
        }
        if !self.tx_metadata.is_empty() {
            map.insert("tx_metadata".into(), Value::Map(self.tx_metadata));
        }
        if let Some(mode) = self.mode {
            map.insert("mode".into(), Value::String(mode));
        }
        if let Some(db) = self.db {
            map.insert("db".into(), Value::String(db));
        }
        if version >= ProtocolVersion::new(4, 4) {
            if let Some(imp_user) = self.imp_user {
                map.insert("imp_user".into(), Value::String(imp_user));
            }
        }
        if version >= ProtocolVersion::new(5, 2) {
            if let Some(sev) = self.notifications_minimum_severity {
                map.insert("notifications_minimum_severity".into(), Value::String(sev));
            }
        }
        map
    }
}

/// Requests the connection layer can submit. Each variant encodes to
/// exactly one outer `Structure`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Hello {
        user_agent: String,
        auth: AuthToken,
        routing: Option<HashMap<String, Value>>,
        bolt_agent: Option<HashMap<String, Value>>,
    },
    Logon {
        auth: AuthToken,
    },
    Run {
        query: String,
        parameters: HashMap<String, Value>,
        extra: RunExtra,
    },
    Pull {
        n: i64,
        qid: i64,
    },
    Discard {
        n: i64,
        qid: i64,
    },
    Begin {
        extra: RunExtra,
    },
    Commit,
    Rollback,
    Reset,
    Goodbye,
    AckFailure,
}

impl ClientMessage {
    pub fn signature(&self, version: ProtocolVersion) -> u8 {
        use client_signature::*;
        match self {
            ClientMessage::Hello { .. } => {
                if version >= ProtocolVersion::new(3, 0) {
                    HELLO
                } else {
                    INIT
                }
            }
            ClientMessage::Logon { .. } => LOGON,
            ClientMessage::Run { .. } => RUN,
            ClientMessage::Pull { .. } => PULL,
            ClientMessage::Discard { .. } => DISCARD,
            ClientMessage::Begin { .. } => BEGIN,
            ClientMessage::Commit => COMMIT,
            ClientMessage::Rollback => ROLLBACK,
            ClientMessage::Reset => RESET,
            ClientMessage::Goodbye => GOODBYE,
            ClientMessage::AckFailure => ACK_FAILURE,
        }
    }

    /// Encodes this message's `Structure` for the given negotiated
    /// version. Versions below 3 collapse `PULL`/`DISCARD` into the
    /// arity-0 `PULL_ALL`/`DISCARD_ALL` forms.
    pub fn into_value(self, version: ProtocolVersion) -> Value {
        let signature = self.signature(version);
        let fields = match self {
            ClientMessage::Hello {
                user_agent,
                auth,
                routing,
                bolt_agent,
            } => {
                let mut extra: HashMap<String, Value> = HashMap::new();
                extra.insert("user_agent".into(), Value::String(user_agent));
                if version < ProtocolVersion::new(5, 1) {
                    for (key, value) in auth.to_fields() {
                        extra.insert(key.to_string(), value);
                    }
                }
                if version >= ProtocolVersion::new(4, 1) {
                    if let Some(routing) = routing {
                        extra.insert("routing".into(), Value::Map(routing));
                    }
                }
                if version >= ProtocolVersion::new(5, 2) {
                    if let Some(bolt_agent) = bolt_agent {
                        extra.insert("bolt_agent".into(), Value::Map(bolt_agent));
                    }
                }
                vec![Value::Map(extra)]
            }
            ClientMessage::Logon { auth } => {
                let mut map = HashMap::new();
                for (key, value) in auth.to_fields() {
                    map.insert(key.to_string(), value);
                }
                vec![Value::Map(map)]
            }
            ClientMessage::Run {
                query,
                parameters,
                extra,
            } => {
                if version >= ProtocolVersion::new(3, 0) {
                    vec![
                        Value::String(query),
                        Value::Map(parameters),
                        Value::Map(extra.into_map(version)),
                    ]
                } else {
                    vec![Value::String(query), Value::Map(parameters)]
                }
            }
            ClientMessage::Pull { n, qid } => {
                if version.supports_qid() {
                    let mut map = HashMap::new();
                    map.insert("n".into(), Value::Integer(n));
                    map.insert("qid".into(), Value::Integer(qid));
                    vec![Value::Map(map)]
                } else {
                    vec![]
                }
            }
            ClientMessage::Discard { n, qid } => {
                if version.supports_qid() {
                    let mut map = HashMap::new();
                    map.insert("n".into(), Value::Integer(n));
                    map.insert("qid".into(), Value::Integer(qid));
                    vec![Value::Map(map)]
                } else {
                    vec![]
                }
            }
            ClientMessage::Begin { extra } => vec![Value::Map(extra.into_map(version))],
            ClientMessage::Commit
            | ClientMessage::Rollback
            | ClientMessage::Reset
            | ClientMessage::Goodbye
            | ClientMessage::AckFailure => vec![],
        };
        Value::Structure { signature, fields }
    }
}

/// Terminal or intermediate responses read back from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Success(HashMap<String, Value>),
    Record(Vec<Value>),
    Ignored,
    Failure { code: String, message: String },
}

impl ServerMessage {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let (signature, mut fields) = match value {
            Value::Structure { signature, fields } => (signature, fields),
            _ => return Err(ProtocolError::NotAStructure),
        };
        match signature {
            server_signature::SUCCESS => {
                let metadata = match fields.pop() {
                    Some(Value::Map(m)) => m,
                    _ => HashMap::new(),
                };
                Ok(ServerMessage::Success(metadata))
            }
            server_signature::RECORD => {
                let values = match fields.pop() {
                    Some(Value::List(items)) => items,
                    _ => vec![],
                };
                Ok(ServerMessage::Record(values))
            }
            server_signature::IGNORED => Ok(ServerMessage::Ignored),
            server_signature::FAILURE => {
                let metadata = match fields.pop() {
                    Some(Value::Map(m)) => m,
                    _ => HashMap::new(),
                };
                let code = metadata
                    .get("code")
                    .and_then(Value::as_str)
                    .unwrap_or("Neo.DatabaseError.General.UnknownError")
                    .to_string();
                let message = metadata
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                Ok(ServerMessage::Failure { code, message })
            }
            other => Err(ProtocolError::UnknownSignature(other)),
        }
    }
}

/// Terminal metadata attached to a `SUCCESS` that closes out a stream:
/// stats, bookmark, plan, profile, notifications, result type, and the
/// `has_more` continuation flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub has_more: bool,
    pub bookmark: Option<String>,
    pub result_type: Option<String>,
    pub stats: HashMap<String, Value>,
    pub plan: Option<Value>,
    pub profile: Option<Value>,
    pub notifications: Option<Value>,
    /// Normalized from `result_available_after`/`t_first` (pre-5.0 used
    /// the former name for the same timing metric).
    pub t_first_ms: Option<i64>,
    pub t_last_ms: Option<i64>,
}

impl StreamSummary {
    pub fn from_metadata(mut metadata: HashMap<String, Value>) -> Self {
        let has_more = matches!(metadata.remove("has_more"), Some(Value::Boolean(true)));
        let bookmark = metadata.remove("bookmark").and_then(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        });
        let result_type = metadata.remove("type").and_then(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        });
        let plan = metadata.remove("plan");
        let profile = metadata.remove("profile");
        let notifications = metadata.remove("notifications");
        let t_first_ms = metadata
            .remove("t_first")
            .or_else(|| metadata.remove("result_available_after"))
            .and_then(|v| v.as_integer());
        let t_last_ms = metadata
            .remove("t_last")
            .or_else(|| metadata.remove("result_consumed_after"))
            .and_then(|v| v.as_integer());
        let stats = match metadata.remove("stats") {
            Some(Value::Map(m)) => m,
            _ => HashMap::new(),
        };
        StreamSummary {
            has_more,
            bookmark,
            result_type,
            stats,
            plan,
            profile,
            notifications,
            t_first_ms,
            t_last_ms,
        }
    }
}

/// `SUCCESS` metadata from `RUN`: declared field names and the
/// version≥4 query id used to scope subsequent `PULL`/`DISCARD`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub fields: Vec<String>,
    pub qid: i64,
    pub t_first_ms: Option<i64>,
}

impl RunSummary {
    pub fn from_metadata(mut metadata: HashMap<String, Value>) -> Self {
        let fields = match metadata.remove("fields") {
            Some(Value::List(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        };
        let qid = metadata
            .remove("qid")
            .and_then(|v| v.as_integer())
            .unwrap_or(-1);
        let t_first_ms = metadata
            .remove("t_first")
            .or_else(|| metadata.remove("result_available_after"))
            .and_then(|v| v.as_integer());
        RunSummary {
            fields,
            qid,
            t_first_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_signature_switches_below_v3() {
        let hello = ClientMessage::Hello {
            user_agent: "x".into(),
            auth: AuthToken::none(),
            routing: None,
            bolt_agent: None,
        };
        assert_eq!(hello.signature(ProtocolVersion::new(2, 0)), client_signature::INIT);
        assert_eq!(hello.signature(ProtocolVersion::new(3, 0)), client_signature::HELLO);
    }

    #[test]
    fn pull_collapses_to_arity_zero_below_v4() {
        let pull = ClientMessage::Pull { n: 1000, qid: -1 };
        let value = pull.into_value(ProtocolVersion::new(3, 0));
        match value {
            Value::Structure { signature, fields } => {
                assert_eq!(signature, client_signature::PULL);
                assert!(fields.is_empty());
            }
            _ => panic!("expected structure"),
        }
    }

    #[test]
    fn pull_carries_n_and_qid_from_v4() {
        let pull = ClientMessage::Pull { n: 1000, qid: 7 };
        let value = pull.into_value(ProtocolVersion::new(4, 0));
        match value {
            Value::Structure { fields, .. } => {
                assert_eq!(fields.len(), 1);
                match &fields[0] {
                    Value::Map(m) => {
                        assert_eq!(m.get("n"), Some(&Value::Integer(1000)));
                        assert_eq!(m.get("qid"), Some(&Value::Integer(7)));
                    }
                    _ => panic!("expected map"),
                }
            }
            _ => panic!("expected structure"),
        }
    }

    #[test]
    fn run_extras_gate_imp_user_by_version() {
        let extra = RunExtra {
            imp_user: Some("alice".into()),
            ..Default::default()
        };
        let below = extra.clone().into_map(ProtocolVersion::new(4, 3));
        let at = extra.into_map(ProtocolVersion::new(4, 4));
        assert!(!below.contains_key("imp_user"));
        assert!(at.contains_key("imp_user"));
    }

    #[test]
    fn decode_success_failure_record_ignored() {
        let mut meta = HashMap::new();
        meta.insert("fields".into(), Value::List(vec![Value::String("n".into())]));
        let success = Value::Structure {
            signature: server_signature::SUCCESS,
            fields: vec![Value::Map(meta)],
        };
        match ServerMessage::decode(success).unwrap() {
            ServerMessage::Success(m) => assert!(m.contains_key("fields")),
            _ => panic!("expected success"),
        }

        let record = Value::Structure {
            signature: server_signature::RECORD,
            fields: vec![Value::List(vec![Value::Integer(1)])],
        };
        match ServerMessage::decode(record).unwrap() {
            ServerMessage::Record(values) => assert_eq!(values, vec![Value::Integer(1)]),
            _ => panic!("expected record"),
        }

        let ignored = Value::Structure {
            signature: server_signature::IGNORED,
            fields: vec![],
        };
        assert_eq!(ServerMessage::decode(ignored).unwrap(), ServerMessage::Ignored);

        let mut failure_meta = HashMap::new();
        failure_meta.insert(
            "code".into(),
            Value::String("Neo.ClientError.Statement.SyntaxError".into()),
        );
        failure_meta.insert("message".into(), Value::String("bad query".into()));
        let failure = Value::Structure {
            signature: server_signature::FAILURE,
            fields: vec![Value::Map(failure_meta)],
        };
        match ServerMessage::decode(failure).unwrap() {
            ServerMessage::Failure { code, message } => {
                assert_eq!(code, "Neo.ClientError.Statement.SyntaxError");
                assert_eq!(message, "bad query");
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn decode_rejects_unknown_signature() {
        let value = Value::Structure {
            signature: 0x00,
            fields: vec![],
        };
        assert_eq!(
            ServerMessage::decode(value),
            Err(ProtocolError::UnknownSignature(0x00))
        );
    }

    #[test]
    fn run_summary_defaults_qid_to_minus_one() {
        let summary = RunSummary::from_metadata(HashMap::new());
        assert_eq!(summary.qid, -1);
        assert!(summary.fields.is_empty());
    }

    #[test]
    fn stream_summary_normalizes_legacy_timing_field_names() {
        let mut meta = HashMap::new();
        meta.insert("result_available_after".into(), Value::Integer(5));
        meta.insert("result_consumed_after".into(), Value::Integer(9));
        let summary = StreamSummary::from_metadata(meta);
        assert_eq!(summary.t_first_ms, Some(5));
        assert_eq!(summary.t_last_ms, Some(9));
    }
}
