// src/api/types.rs

use serde::Deserialize;
use serde_json::Value;

/// Response body of `/organizations/{ein}.json`.
///
/// `filings_with_data` are processed returns (newer, XML-backed);
/// `filings_without_data` are raw PDF scans of older years. Both carry
/// `pdf_url` when a scan exists. Either list may be absent or null.
#[derive(Debug, Default, Deserialize)]
pub struct OrgResponse {
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub filings_with_data: Vec<Filing>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub filings_without_data: Vec<Filing>,
}

impl OrgResponse {
    /// With-data filings first, then without-data. Order matters downstream:
    /// the filing cache is first-seen-wins, so processed returns take
    /// precedence over raw scans for the same tax year.
    pub fn all_filings(&self) -> impl Iterator<Item = &Filing> {
        self.filings_with_data
            .iter()
            .chain(self.filings_without_data.iter())
    }

    pub fn org_name(&self) -> &str {
        self.organization
            .as_ref()
            .and_then(|o| o.name.as_deref())
            .unwrap_or("Unknown Org")
    }
}

#[derive(Debug, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub ein: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One tax-year submission record.
#[derive(Debug, Default, Deserialize)]
pub struct Filing {
    /// Tax period year. Usually a JSON number, occasionally a string.
    #[serde(default)]
    pub tax_prd_yr: Option<Value>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub formtype_str: Option<String>,
    /// Tax period id, unique per submission (distinguishes amended returns).
    #[serde(default)]
    pub tax_prd_id: Option<i64>,
}

impl Filing {
    /// Lenient year parse: accepts a JSON number or a numeric string,
    /// returns `None` for anything else.
    pub fn tax_year(&self) -> Option<i32> {
        match self.tax_prd_yr.as_ref()? {
            Value::Number(n) => n.as_i64().map(|y| y as i32),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        }
    }

    /// The PDF link, if present and non-empty.
    pub fn pdf_link(&self) -> Option<&str> {
        self.pdf_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Response body of `/search.json`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub organizations: Vec<SearchHit>,
}

impl SearchResponse {
    /// First (best) match, which is all the correction workflow uses.
    pub fn top_match(&self) -> Option<&SearchHit> {
        self.organizations.first()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub ein: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

fn null_as_empty<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(de)?;
    Ok(opt.unwrap_or_default())
}
