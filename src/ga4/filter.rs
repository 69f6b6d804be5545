use serde::Serialize;
use url::Url;

/// GA4 Data API dimension-filter tree. The externally tagged serde
/// representation matches the wire shape exactly:
/// `{"filter": {...}}`, `{"andGroup": {"expressions": [...]}}`,
/// `{"notExpression": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub enum FilterExpression {
    #[serde(rename = "filter")]
    Filter(FieldFilter),
    #[serde(rename = "andGroup")]
    AndGroup(ExpressionList),
    #[serde(rename = "notExpression")]
    Not(Box<FilterExpression>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionList {
    pub expressions: Vec<FilterExpression>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_filter: Option<StringFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_list_filter: Option<InListFilter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringFilter {
    pub match_type: MatchType,
    pub value: String,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Contains,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InListFilter {
    pub values: Vec<String>,
    pub case_sensitive: bool,
}

impl FilterExpression {
    fn string_match(field_name: &str, match_type: MatchType, value: &str) -> Self {
        Self::Filter(FieldFilter {
            field_name: field_name.to_string(),
            string_filter: Some(StringFilter {
                match_type,
                value: value.to_string(),
                case_sensitive: false,
            }),
            in_list_filter: None,
        })
    }

    pub fn host_in(hosts: Vec<String>) -> Self {
        Self::Filter(FieldFilter {
            field_name: "hostName".to_string(),
            string_filter: None,
            in_list_filter: Some(InListFilter {
                values: hosts,
                case_sensitive: false,
            }),
        })
    }

    /// Substring match on pagePath; the bare homepage path matches exactly
    /// so it does not swallow every page.
    pub fn path_matches(path: &str) -> Self {
        let match_type = if path == "/" {
            MatchType::Exact
        } else {
            MatchType::Contains
        };
        Self::string_match("pagePath", match_type, path)
    }

    pub fn channel_group(group: &str) -> Self {
        Self::string_match("defaultChannelGroup", MatchType::Exact, group)
    }

    pub fn source_in(values: Vec<String>, use_source_medium: bool) -> Self {
        let field_name = if use_source_medium {
            "sessionSourceMedium"
        } else {
            "sessionSource"
        };
        Self::Filter(FieldFilter {
            field_name: field_name.to_string(),
            string_filter: None,
            in_list_filter: Some(InListFilter {
                values,
                case_sensitive: false,
            }),
        })
    }

    /// Drops dev/test traffic recorded against a `localhost` host name.
    pub fn not_localhost() -> Self {
        Self::Not(Box::new(Self::string_match(
            "hostName",
            MatchType::Exact,
            "localhost",
        )))
    }

    /// Combine expressions: none stays none, a single expression passes
    /// through unchanged, several become an andGroup.
    pub fn all(mut expressions: Vec<FilterExpression>) -> Option<FilterExpression> {
        match expressions.len() {
            0 => None,
            1 => expressions.pop(),
            _ => Some(Self::AndGroup(ExpressionList { expressions })),
        }
    }
}

/// Accept a bare domain or a full URL and return tolerant host variants:
/// `example.com` also matches `www.example.com` and vice versa.
pub fn host_variants(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let with_scheme;
    let candidate = if trimmed.contains("://") {
        trimmed
    } else {
        with_scheme = format!("https://{trimmed}");
        &with_scheme
    };
    let host = match Url::parse(candidate) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => trimmed.to_lowercase(),
        },
        Err(_) => trimmed.to_lowercase(),
    };
    if host.is_empty() {
        return Vec::new();
    }

    let mut variants = vec![host.clone()];
    let toggled = match host.strip_prefix("www.") {
        Some(apex) => apex.to_string(),
        None => format!("www.{host}"),
    };
    if !variants.contains(&toggled) {
        variants.push(toggled);
    }
    variants
}
