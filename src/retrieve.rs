// Retrieval: build the filter payload, then page through `/get` until the
// service runs out of items, the requested count is reached, or the
// reported total says there is nothing left.

use crate::api::{Endpoint, Payload, RequestContext, Transport};
use crate::error::{Error, Result};
use crate::record::Record;
use chrono::{Local, NaiveDate, TimeZone};
use clap::ValueEnum;
use serde_json::Value;

/// The service never returns more than this many items per request.
pub const PAGE_CAP: usize = 30;

/// Tag name the service reserves for "items without tags".
pub const UNTAGGED: &str = "_untagged_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum State {
    #[default]
    Unread,
    Archive,
    All,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Unread => "unread",
            State::Archive => "archive",
            State::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Sort {
    #[default]
    Newest,
    Oldest,
    Title,
    Site,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Newest => "newest",
            Sort::Oldest => "oldest",
            Sort::Title => "title",
            Sort::Site => "site",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ContentType {
    #[default]
    All,
    Article,
    Video,
    Image,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::All => "all",
            ContentType::Article => "article",
            ContentType::Video => "video",
            ContentType::Image => "image",
        }
    }
}

/// Three-valued tag filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagFilter {
    /// No tag parameter at all.
    #[default]
    Any,
    /// Only items without tags.
    Untagged,
    Named(String),
}

impl TagFilter {
    /// Command-line form: `-1` means any, `0` means untagged, anything else
    /// is a tag name.
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "-1" => TagFilter::Any,
            "0" => TagFilter::Untagged,
            name => TagFilter::Named(name.to_string()),
        }
    }
}

/// Everything that narrows a retrieval, apart from the count.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub state: State,
    pub sort: Sort,
    pub content: ContentType,
    pub query: Option<String>,
    pub tag: TagFilter,
    pub favorite: Option<bool>,
    pub domain: Option<String>,
    /// Epoch seconds; see `parse_since`.
    pub since: Option<i64>,
}

impl Filters {
    /// Base request body shared by every page of one retrieval.
    pub fn payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("state".into(), self.state.as_str().into());
        payload.insert("sort".into(), self.sort.as_str().into());
        payload.insert("detailType".into(), "complete".into());
        payload.insert("total".into(), "1".into());

        if self.content != ContentType::All {
            payload.insert("contentType".into(), self.content.as_str().into());
        }
        if let Some(query) = &self.query {
            payload.insert("search".into(), query.as_str().into());
        }
        match &self.tag {
            TagFilter::Any => {}
            TagFilter::Untagged => {
                payload.insert("tag".into(), UNTAGGED.into());
            }
            TagFilter::Named(name) => {
                payload.insert("tag".into(), name.as_str().into());
            }
        }
        if let Some(favorite) = self.favorite {
            payload.insert("favorite".into(), u8::from(favorite).into());
        }
        if let Some(domain) = &self.domain {
            payload.insert("domain".into(), domain.as_str().into());
        }
        if let Some(since) = self.since {
            payload.insert("since".into(), since.into());
        }
        payload
    }
}

/// Convert a `YYYY-MM-DD` date into epoch seconds at local midnight.
pub fn parse_since(date: &str) -> Result<i64> {
    let invalid = || Error::InvalidDate(date.to_string());
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = day.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    let local = Local
        .from_local_datetime(&midnight)
        .earliest()
        .ok_or_else(invalid)?;
    Ok(local.timestamp())
}

/// Result of a retrieval. An empty first page is reported as `NoResults`
/// rather than an empty list.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Found(Vec<Record>),
    NoResults,
}

impl Retrieval {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Retrieval::Found(records) => records,
            Retrieval::NoResults => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct PageState {
    offset: usize,
    requested: Option<usize>,
    items: Vec<Record>,
    total: usize,
}

impl PageState {
    fn new(requested: Option<usize>) -> Self {
        PageState {
            offset: 0,
            requested,
            items: Vec::new(),
            total: 0,
        }
    }

    fn page_size(&self) -> usize {
        match self.requested {
            Some(requested) => PAGE_CAP.min(requested.saturating_sub(self.items.len())),
            None => PAGE_CAP,
        }
    }

    fn count_reached(&self) -> bool {
        matches!(self.requested, Some(requested) if self.items.len() >= requested)
    }
}

/// Fetch every matching record, or the first `count` of them. A count of
/// zero means "no limit".
pub fn retrieve(
    transport: &dyn Transport,
    filters: &Filters,
    count: Option<usize>,
) -> Result<Retrieval> {
    let mut state = PageState::new(count.filter(|&n| n > 0));
    let mut ctx = RequestContext::new(Endpoint::Retrieve, filters.payload());

    loop {
        let page_size = state.page_size();
        ctx.payload.insert("count".into(), page_size.into());
        ctx.payload.insert("offset".into(), state.offset.into());

        let response = ctx.send(transport)?;
        let items = page_items(response);
        tracing::debug!(offset = state.offset, page_size, received = items.len(), "page fetched");
        if items.is_empty() {
            break;
        }

        state.items.extend(items.into_iter().map(to_record));
        state.total = reported_total(response);

        if state.count_reached() {
            if let Some(requested) = state.requested {
                state.items.truncate(requested);
            }
            break;
        }
        if state.offset + page_size >= state.total {
            break;
        }
        state.offset += page_size;
    }

    tracing::info!(records = state.items.len(), total = state.total, "retrieval done");
    if state.items.is_empty() {
        Ok(Retrieval::NoResults)
    } else {
        Ok(Retrieval::Found(state.items))
    }
}

// `list` is an object keyed by item id, or `[]` when the page is empty.
fn page_items(response: &Value) -> Vec<&Value> {
    match response.get("list") {
        Some(Value::Object(items)) => items.values().collect(),
        Some(Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    }
}

fn reported_total(response: &Value) -> usize {
    match response.get("total") {
        Some(Value::String(total)) => total.parse().unwrap_or(0),
        Some(Value::Number(total)) => total.as_u64().unwrap_or(0) as usize,
        _ => 0,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_record(item: &Value) -> Record {
    Record {
        id: text(item.get("item_id")),
        title: text(item.get("resolved_title")),
        link: text(item.get("resolved_url")),
        excerpt: text(item.get("excerpt")),
        tags: item
            .get("tags")
            .and_then(Value::as_object)
            .map(|tags| tags.keys().cloned().collect())
            .unwrap_or_default(),
        time_added: text(item.get("time_added")),
        time_updated: text(item.get("time_updated")),
        domain: text(item.pointer("/domain_metadata/name")),
    }
}
