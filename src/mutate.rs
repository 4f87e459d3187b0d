// Batch mutation: every input record becomes one entry of a single `/send`
// request, all with the same action kind.

use crate::api::{Endpoint, Payload, RequestContext, Transport};
use crate::error::{Error, Result};
use crate::record::Record;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Delete,
    Archive,
    /// Move an archived item back to the reading list.
    Readd,
    Favorite,
    Unfavorite,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Delete => "delete",
            Action::Archive => "archive",
            Action::Readd => "readd",
            Action::Favorite => "favorite",
            Action::Unfavorite => "unfavorite",
        }
    }
}

/// Mutation flags as given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionFlags {
    pub delete: bool,
    pub archive: Option<bool>,
    pub favorite: Option<bool>,
}

impl ActionFlags {
    /// Pick the action: delete wins over archive/readd, which wins over
    /// favorite/unfavorite.
    pub fn select(&self) -> Result<Action> {
        if self.delete {
            return Ok(Action::Delete);
        }
        match (self.archive, self.favorite) {
            (Some(true), _) => Ok(Action::Archive),
            (Some(false), _) => Ok(Action::Readd),
            (None, Some(true)) => Ok(Action::Favorite),
            (None, Some(false)) => Ok(Action::Unfavorite),
            (None, None) => Err(Error::NoActionSelected),
        }
    }
}

/// What the service said about a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationReport {
    pub action: Action,
    pub submitted: usize,
    pub succeeded: bool,
    /// Per-entry results, when the service reports them.
    pub results: Vec<Value>,
}

/// Build the `/send` body for a batch. Fails before anything is sent if a
/// record lacks the field its action needs.
pub fn batch_payload(records: &[Record], action: Action) -> Result<Payload> {
    let entries = records
        .iter()
        .enumerate()
        .map(|(index, record)| action_entry(index, record, action))
        .collect::<Result<Vec<_>>>()?;

    let mut payload = Payload::new();
    payload.insert("actions".into(), Value::Array(entries));
    Ok(payload)
}

fn action_entry(index: usize, record: &Record, action: Action) -> Result<Value> {
    let missing = |field: &'static str| Error::MissingField {
        index: index + 1,
        field,
        action: action.as_str(),
    };
    match action {
        // The service fills in the rest from the URL.
        Action::Add => {
            let link = record.link.as_deref().ok_or_else(|| missing("link"))?;
            Ok(json!({ "action": "add", "url": link }))
        }
        _ => {
            let id = record.id.as_deref().ok_or_else(|| missing("id"))?;
            Ok(json!({ "action": action.as_str(), "item_id": id }))
        }
    }
}

/// Apply `action` to every record with exactly one request.
pub fn mutate(
    transport: &dyn Transport,
    records: &[Record],
    action: Action,
) -> Result<MutationReport> {
    let mut ctx = RequestContext::new(Endpoint::Modify, batch_payload(records, action)?);
    let response = ctx.send(transport)?;

    let succeeded = match response.get("status") {
        Some(Value::Number(status)) => status.as_u64() == Some(1),
        Some(Value::String(status)) => status == "1",
        _ => false,
    };
    let results = response
        .get("action_results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    tracing::info!(action = action.as_str(), submitted = records.len(), succeeded, "batch sent");
    Ok(MutationReport {
        action,
        submitted: records.len(),
        succeeded,
        results,
    })
}
