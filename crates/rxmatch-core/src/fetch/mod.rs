//! Supplement catalogue acquisition from a paginated HTTP API.
//!
//! The fetched rows feed the supplement reference source; nothing here is
//! consulted during matching.

mod client;

pub use client::*;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ENV_API_URL: &str = "SUPPLEMENTS_API_URL";
pub const ENV_API_KEY: &str = "SUPPLEMENTS_API_KEY";
pub const ENV_USERNAME: &str = "SUPPLEMENTS_API_USERNAME";
pub const ENV_PASSWORD: &str = "SUPPLEMENTS_API_PASSWORD";

/// Fetch errors.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Authentication failed; check the API credentials")]
    Unauthorized,

    #[error("API endpoint not found: {0}")]
    NotFound(String),

    #[error("API request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response format: {0}")]
    UnexpectedSchema(String),

    #[error("Missing setting {0}; set an API key or a username and password")]
    MissingCredentials(&'static str),

    #[error("Missing setting {0}")]
    MissingSetting(&'static str),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// How requests authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Sent as `Bearer <key>`, or verbatim when it already starts with `Basic `
    ApiKey(String),
    /// HTTP basic authentication
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credentials::Basic { username, .. } => {
                write!(f, "Basic {{ username: {username:?}, password: *** }}")
            }
        }
    }
}

impl Credentials {
    /// An API key wins over a username/password pair. Blank values count as
    /// absent.
    pub fn from_parts(
        api_key: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> FetchResult<Self> {
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        if let Some(key) = present(api_key) {
            return Ok(Credentials::ApiKey(key));
        }
        match (present(username), present(password)) {
            (Some(username), Some(password)) => Ok(Credentials::Basic { username, password }),
            _ => Err(FetchError::MissingCredentials(ENV_API_KEY)),
        }
    }

    pub fn from_env() -> FetchResult<Self> {
        Self::from_parts(
            std::env::var(ENV_API_KEY).ok(),
            std::env::var(ENV_USERNAME).ok(),
            std::env::var(ENV_PASSWORD).ok(),
        )
    }
}

/// One supplement catalogue row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementRecord {
    #[serde(rename = "supplement_id")]
    pub id: String,
    pub name: String,
    pub vendor_code: String,
    pub class: String,
    pub external_ref_id: String,
    pub active: bool,
    pub description: String,
    pub vendor: String,
    pub dosage_form: String,
    pub strength: String,
    pub unit: String,
}

impl SupplementRecord {
    /// Read a record from one API item. Scalars of any JSON type are
    /// accepted for text fields; a missing `active` flag means active.
    pub fn from_json(item: &Value) -> FetchResult<Self> {
        let object = item
            .as_object()
            .ok_or_else(|| FetchError::UnexpectedSchema(format!("expected an object, got {item}")))?;

        let text = |key: &str| match object.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string(),
        };
        let active = match object.get("active") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !matches!(s.to_ascii_lowercase().as_str(), "false" | "0" | "no"),
            Some(Value::Number(n)) => n.as_i64() != Some(0),
            _ => true,
        };

        Ok(Self {
            id: text("id"),
            name: text("name"),
            vendor_code: text("vendor_code"),
            class: text("class"),
            external_ref_id: text("external_ref_id"),
            active,
            description: text("description"),
            vendor: text("vendor"),
            dosage_form: text("dosage_form"),
            strength: text("strength"),
            unit: text("unit"),
        })
    }
}

/// Extract the item list from a page body: `{"data": [...]}` or `[...]`.
pub fn parse_page(body: Value) -> FetchResult<Vec<SupplementRecord>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(FetchError::UnexpectedSchema(
                    "object without a 'data' array".into(),
                ))
            }
        },
        other => return Err(FetchError::UnexpectedSchema(other.to_string())),
    };
    items.iter().map(SupplementRecord::from_json).collect()
}

/// A paginated source of supplement rows.
pub trait SupplementPages {
    fn fetch_page(&self, limit: usize, offset: usize) -> FetchResult<Vec<SupplementRecord>>;
}

/// Pagination bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub page_size: usize,
    /// Hard cap on accumulated rows
    pub max_rows: usize,
    /// Pause between consecutive page requests
    pub page_delay: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_rows: 10_000,
            page_delay: Duration::from_millis(500),
        }
    }
}

/// Rows gathered before the loop stopped, and the error that stopped it.
#[derive(Debug)]
pub struct FetchOutcome {
    pub records: Vec<SupplementRecord>,
    pub pages: usize,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Walk pages until a short or empty page, the row cap, or an error.
///
/// Errors end the loop but never discard rows already fetched.
pub fn fetch_all<P: SupplementPages + ?Sized>(pages: &P, limits: &FetchLimits) -> FetchOutcome {
    let page_size = limits.page_size.max(1);
    let mut outcome = FetchOutcome {
        records: Vec::new(),
        pages: 0,
        error: None,
    };

    let mut offset = 0;
    loop {
        if offset > 0 && !limits.page_delay.is_zero() {
            thread::sleep(limits.page_delay);
        }

        let page = match pages.fetch_page(page_size, offset) {
            Ok(page) => page,
            Err(err) => {
                warn!(offset, error = %err, "supplement fetch stopped early");
                outcome.error = Some(err);
                break;
            }
        };
        outcome.pages += 1;

        let count = page.len();
        outcome.records.extend(page);
        debug!(offset, count, total = outcome.records.len(), "fetched page");

        if outcome.records.len() >= limits.max_rows {
            warn!(max_rows = limits.max_rows, "row cap reached; stopping");
            outcome.records.truncate(limits.max_rows);
            break;
        }
        if count < page_size {
            break;
        }
        offset += page_size;
    }

    info!(
        records = outcome.records.len(),
        pages = outcome.pages,
        complete = outcome.is_complete(),
        "supplement fetch finished"
    );
    outcome
}

pub fn write_supplements<W: Write>(writer: W, records: &[SupplementRecord]) -> FetchResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|e| FetchError::Csv(e.into()))?;
    Ok(())
}

pub fn save_supplements<P: AsRef<Path>>(path: P, records: &[SupplementRecord]) -> FetchResult<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_supplements(file, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct ScriptedPages {
        total: usize,
        fail_at_offset: Option<usize>,
        calls: RefCell<Vec<(usize, usize)>>,
    }

    impl ScriptedPages {
        fn new(total: usize) -> Self {
            Self {
                total,
                fail_at_offset: None,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SupplementPages for ScriptedPages {
        fn fetch_page(&self, limit: usize, offset: usize) -> FetchResult<Vec<SupplementRecord>> {
            self.calls.borrow_mut().push((limit, offset));
            if self.fail_at_offset == Some(offset) {
                return Err(FetchError::Unauthorized);
            }
            let end = self.total.min(offset + limit);
            Ok((offset..end)
                .map(|i| SupplementRecord::from_json(&json!({"id": i, "name": format!("item {i}")})).unwrap())
                .collect())
        }
    }

    fn limits(page_size: usize, max_rows: usize) -> FetchLimits {
        FetchLimits {
            page_size,
            max_rows,
            page_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_short_page_ends_loop() {
        let pages = ScriptedPages::new(250);
        let outcome = fetch_all(&pages, &limits(100, 10_000));

        assert!(outcome.is_complete());
        assert_eq!(outcome.records.len(), 250);
        assert_eq!(outcome.pages, 3);
        assert_eq!(*pages.calls.borrow(), vec![(100, 0), (100, 100), (100, 200)]);
    }

    #[test]
    fn test_exact_multiple_needs_empty_page() {
        let pages = ScriptedPages::new(200);
        let outcome = fetch_all(&pages, &limits(100, 10_000));
        assert_eq!(outcome.records.len(), 200);
        assert_eq!(outcome.pages, 3);
    }

    #[test]
    fn test_row_cap() {
        let pages = ScriptedPages::new(1_000);
        let outcome = fetch_all(&pages, &limits(100, 250));
        assert_eq!(outcome.records.len(), 250);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_row_cap_applies_to_short_final_page() {
        let pages = ScriptedPages::new(199);
        let outcome = fetch_all(&pages, &limits(100, 150));

        assert_eq!(outcome.records.len(), 150);
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.records.last().map(|r| r.id.as_str()), Some("149"));
    }

    #[test]
    fn test_error_keeps_partial_rows() {
        let mut pages = ScriptedPages::new(1_000);
        pages.fail_at_offset = Some(200);
        let outcome = fetch_all(&pages, &limits(100, 10_000));

        assert_eq!(outcome.records.len(), 200);
        assert!(matches!(outcome.error, Some(FetchError::Unauthorized)));
    }

    #[test]
    fn test_parse_page_shapes() {
        let wrapped = parse_page(json!({"data": [{"id": 7, "name": "Magnesium Glycinate", "class": "Mineral"}]})).unwrap();
        assert_eq!(wrapped[0].id, "7");
        assert_eq!(wrapped[0].class, "Mineral");
        assert!(wrapped[0].active);

        let bare = parse_page(json!([{"id": "x1", "name": "Zinc", "active": false, "strength": null}])).unwrap();
        assert_eq!(bare[0].id, "x1");
        assert!(!bare[0].active);
        assert_eq!(bare[0].strength, "");

        assert!(matches!(
            parse_page(json!({"items": []})),
            Err(FetchError::UnexpectedSchema(_))
        ));
    }

    #[test]
    fn test_credentials_precedence() {
        let key = Credentials::from_parts(Some("abc".into()), Some("u".into()), Some("p".into())).unwrap();
        assert_eq!(key, Credentials::ApiKey("abc".into()));

        let basic = Credentials::from_parts(Some("  ".into()), Some("u".into()), Some("p".into())).unwrap();
        assert!(matches!(basic, Credentials::Basic { .. }));

        assert!(Credentials::from_parts(None, Some("u".into()), None).is_err());
        assert!(!format!("{basic:?}").contains("\"p\""));
    }

    #[test]
    fn test_csv_columns() {
        let records = parse_page(json!([{"id": 1, "name": "Fish Oil", "vendor": "Acme"}])).unwrap();
        let mut buf = Vec::new();
        write_supplements(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with(
            "supplement_id,name,vendor_code,class,external_ref_id,active,description,vendor,dosage_form,strength,unit\n"
        ));
        assert!(text.contains("1,Fish Oil,,,,true,,Acme,,,"));
    }
}
