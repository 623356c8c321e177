//! Hand-written protobuf types for the command journal.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Field numbers are part of the on-disk format: never renumber.

use prost::Message;

// ── Envelope ───────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCommandEnvelope {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(string, tag = "2")]
    pub caller: String,
    #[prost(uint32, tag = "3")]
    pub schema_version: u32,
    #[prost(message, optional, tag = "4")]
    pub command: Option<ProtoCommand>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCommand {
    #[prost(oneof = "CommandKind", tags = "1, 2, 3, 4, 5, 6")]
    pub kind: Option<CommandKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum CommandKind {
    #[prost(message, tag = "1")]
    CreateEvent(CreateEvent),
    #[prost(message, tag = "2")]
    SetEventActive(SetEventActive),
    #[prost(message, tag = "3")]
    InitializeCredits(InitializeCredits),
    #[prost(message, tag = "4")]
    SubmitProject(SubmitProject),
    #[prost(message, tag = "5")]
    CastVote(CastVote),
    #[prost(message, tag = "6")]
    CastBallot(CastBallot),
}

// ── Command payloads ───────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct CreateEvent {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub access_code: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SetEventActive {
    #[prost(uint64, tag = "1")]
    pub event_id: u64,
    #[prost(bool, tag = "2")]
    pub active: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct InitializeCredits {
    #[prost(uint64, tag = "1")]
    pub event_id: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct SubmitProject {
    #[prost(uint64, tag = "1")]
    pub event_id: u64,
    #[prost(string, tag = "2")]
    pub metadata_ref: String,
    #[prost(string, tag = "3")]
    pub access_code: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct CastVote {
    #[prost(uint64, tag = "1")]
    pub event_id: u64,
    #[prost(uint64, tag = "2")]
    pub project_id: u64,
    #[prost(sint64, tag = "3")]
    pub votes: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct BallotLine {
    #[prost(uint64, tag = "1")]
    pub project_id: u64,
    #[prost(sint64, tag = "2")]
    pub votes: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct CastBallot {
    #[prost(uint64, tag = "1")]
    pub event_id: u64,
    #[prost(message, repeated, tag = "2")]
    pub entries: Vec<BallotLine>,
}
