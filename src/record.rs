// Record model: the one value type that flows between retrieval, ingestion,
// mutation and output. Fields are declared in alphabetical order so the
// derived JSON serialization comes out key-sorted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One saved item. Text fields are `None` when the source did not supply
/// them (or, for parsed input, when the template did not mention them).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub domain: Option<String>,
    pub excerpt: Option<String>,
    pub id: Option<String>,
    pub link: Option<String>,
    pub tags: BTreeSet<String>,
    pub time_added: Option<String>,
    pub time_updated: Option<String>,
    pub title: Option<String>,
}

/// The known keys of a `Record`, as they appear in format templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    Link,
    Excerpt,
    Tags,
    TimeAdded,
    TimeUpdated,
    Domain,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Id,
        Field::Title,
        Field::Link,
        Field::Excerpt,
        Field::Tags,
        Field::TimeAdded,
        Field::TimeUpdated,
        Field::Domain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Title => "title",
            Field::Link => "link",
            Field::Excerpt => "excerpt",
            Field::Tags => "tags",
            Field::TimeAdded => "time_added",
            Field::TimeUpdated => "time_updated",
            Field::Domain => "domain",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown key '{}'", s))
    }
}

const TAG_SEPARATOR: char = ',';

impl Record {
    /// Text form of a field as used by templates. Absent fields are empty;
    /// tags are joined in sorted order.
    pub fn text(&self, field: Field) -> String {
        match field {
            Field::Tags => {
                let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
                tags.join(&TAG_SEPARATOR.to_string())
            }
            other => self.slot(other).cloned().flatten().unwrap_or_default(),
        }
    }

    /// Inverse of `text`. An empty value clears the field.
    pub fn set_text(&mut self, field: Field, value: &str) {
        match field {
            Field::Tags => {
                self.tags = value
                    .split(TAG_SEPARATOR)
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(String::from)
                    .collect();
            }
            other => {
                if let Some(slot) = self.slot_mut(other) {
                    *slot = Some(value.to_string()).filter(|v| !v.is_empty());
                }
            }
        }
    }

    // Tags are a set, not a text slot.
    fn slot(&self, field: Field) -> Option<&Option<String>> {
        match field {
            Field::Id => Some(&self.id),
            Field::Title => Some(&self.title),
            Field::Link => Some(&self.link),
            Field::Excerpt => Some(&self.excerpt),
            Field::TimeAdded => Some(&self.time_added),
            Field::TimeUpdated => Some(&self.time_updated),
            Field::Domain => Some(&self.domain),
            Field::Tags => None,
        }
    }

    fn slot_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Id => Some(&mut self.id),
            Field::Title => Some(&mut self.title),
            Field::Link => Some(&mut self.link),
            Field::Excerpt => Some(&mut self.excerpt),
            Field::TimeAdded => Some(&mut self.time_added),
            Field::TimeUpdated => Some(&mut self.time_updated),
            Field::Domain => Some(&mut self.domain),
            Field::Tags => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>().unwrap(), field);
        }
        assert!("url".parse::<Field>().is_err());
    }

    #[test]
    fn tags_are_a_sorted_set() {
        let mut record = Record::default();
        record.set_text(Field::Tags, "rust, cli,rust,,");
        assert_eq!(record.tags.len(), 2);
        assert_eq!(record.text(Field::Tags), "cli,rust");
    }

    #[test]
    fn empty_text_clears_field() {
        let mut record = Record {
            title: Some("old".into()),
            ..Default::default()
        };
        record.set_text(Field::Title, "");
        assert_eq!(record.title, None);
        assert_eq!(record.text(Field::Title), "");
    }

    #[test]
    fn json_keys_are_sorted() {
        let json = serde_json::to_string(&Record::default()).unwrap();
        let keys: Vec<&str> = json
            .trim_matches(|c: char| c == '{' || c == '}')
            .split(',')
            .map(|pair| pair.split(':').next().unwrap().trim_matches('"'))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
