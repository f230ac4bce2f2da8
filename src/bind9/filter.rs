use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Category a statement or clause belongs to for filtered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterTag {
    Config,
    View,
    Zone,
    NoParse,
}

impl FilterTag {
    pub const ALL: [FilterTag; 4] = [Self::Config, Self::View, Self::Zone, Self::NoParse];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::View => "view",
            Self::Zone => "zone",
            Self::NoParse => "no-parse",
        }
    }
}

impl fmt::Display for FilterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter tag {0:?}, expected one of config, view, zone, no-parse")]
pub struct UnknownFilterTag(pub String);

impl FromStr for FilterTag {
    type Err = UnknownFilterTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| UnknownFilterTag(s.to_string()))
    }
}

/// Selects which statements take part in output.
///
/// Callers pass `Option<&Filter>`; `None` accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    tags: HashSet<FilterTag>,
}

impl Filter {
    pub fn new(tags: impl IntoIterator<Item = FilterTag>) -> Self {
        Self {
            tags: tags.into_iter().collect(),
        }
    }

    /// Parses a comma separated tag list such as `config,view`.
    pub fn parse_list(list: &str) -> Result<Self, UnknownFilterTag> {
        let tags = list
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<FilterTag>, _>>()?;
        Ok(Self::new(tags))
    }

    pub fn is_enabled(&self, tag: FilterTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Whether a node carrying `tags` is emitted. Untagged nodes always are.
    pub fn accepts(filter: Option<&Filter>, tags: &[FilterTag]) -> bool {
        match filter {
            None => true,
            Some(_) if tags.is_empty() => true,
            Some(f) => tags.iter().any(|t| f.is_enabled(*t)),
        }
    }
}
