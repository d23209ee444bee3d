use std::collections::HashSet;
use std::path::Path;

use serde_json::Value as JsonValue;
use tokio::fs;

use crate::config::Config;
use crate::error::{AppResult, ConfigError, FileError, InputError};
use crate::models::job::{
    is_catalog_code, Identifier, JobKind, JobParams, JobSpec, JsonMap,
};

/// Load a JSON batch file and turn every entry into a `JobSpec` of `kind`
pub async fn load_batch(path: &Path, kind: JobKind, config: &Config) -> AppResult<Vec<JobSpec>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| FileError::read(path, e))?;

    let jobs = parse_batch(&content, kind, config)?;
    tracing::info!("Loaded {} entries from {}", jobs.len(), path.display());
    Ok(jobs)
}

/// Parse a JSON array of objects into job specs, indexed by position
pub fn parse_batch(content: &str, kind: JobKind, config: &Config) -> Result<Vec<JobSpec>, InputError> {
    let document: JsonValue = serde_json::from_str(content)
        .map_err(|e| InputError::malformed(format!("invalid JSON: {e}")))?;

    let JsonValue::Array(entries) = document else {
        return Err(InputError::malformed("expected a JSON array of objects"));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(position, entry)| match entry {
            JsonValue::Object(fields) => entry_to_spec(position, fields, kind, config),
            other => Err(InputError::malformed(format!(
                "entry {position} is not an object: {other}"
            ))),
        })
        .collect()
}

fn entry_to_spec(
    position: usize,
    fields: JsonMap,
    kind: JobKind,
    config: &Config,
) -> Result<JobSpec, InputError> {
    let lcsc_code = non_empty_str(&fields, "lcsc_code");
    let mpn = non_empty_str(&fields, "mpn");
    let keywords = non_empty_str(&fields, "keywords");

    let missing = |expected: &str| InputError::MissingIdentifier {
        position,
        expected: expected.to_string(),
    };

    let identifier = match kind {
        JobKind::PricingLookup | JobKind::CartAdd => {
            if let Some(code) = lcsc_code {
                if !is_catalog_code(code) {
                    tracing::warn!("Entry {}: '{}' does not look like a catalog code", position, code);
                }
                Identifier::CatalogCode(code.to_string())
            } else if let Some(mpn) = mpn {
                Identifier::PartNumber(mpn.to_string())
            } else {
                return Err(missing("lcsc_code, mpn"));
            }
        }
        JobKind::CatalogSearch => keywords
            .or(mpn)
            .or(lcsc_code)
            .map(|q| Identifier::Keywords(q.to_string()))
            .ok_or_else(|| missing("keywords, mpn, lcsc_code"))?,
        JobKind::CartList => Identifier::Cart,
    };

    let params = match kind {
        JobKind::CartAdd => JobParams {
            quantity: Some(
                positive_u64(&fields, "quantity", position)?
                    .map(|q| q as u32)
                    .unwrap_or(config.default_quantity),
            ),
            ..JobParams::default()
        },
        JobKind::CatalogSearch => JobParams {
            limit: Some(
                positive_u64(&fields, "limit", position)?
                    .map(|n| n as usize)
                    .unwrap_or(config.search_limit),
            ),
            max_pages: Some(
                positive_u64(&fields, "max_pages", position)?
                    .map(|n| n as usize)
                    .unwrap_or(config.search_max_pages),
            ),
            ..JobParams::default()
        },
        JobKind::PricingLookup | JobKind::CartList => JobParams::default(),
    };

    Ok(JobSpec::new(position, kind, identifier)
        .with_params(params)
        .with_echo(fields))
}

fn non_empty_str<'a>(fields: &'a JsonMap, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Accepts a positive number or a numeric string
fn positive_u64(fields: &JsonMap, key: &str, position: usize) -> Result<Option<u64>, InputError> {
    let parsed = match fields.get(key) {
        None | Some(JsonValue::Null) => return Ok(None),
        Some(JsonValue::Number(n)) => n.as_u64(),
        Some(JsonValue::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(n) if n > 0 && n <= u64::from(u32::MAX) => Ok(Some(n)),
        _ => Err(InputError::malformed(format!(
            "entry {position}: '{key}' must be a positive integer"
        ))),
    }
}

/// Parse an item in `CODE` or `CODE:QTY` form
pub fn parse_item_spec(spec: &str, default_qty: u32) -> Result<(Identifier, u32), InputError> {
    let spec = spec.trim();
    let (code, quantity) = match spec.split_once(':') {
        Some((code, qty)) => {
            let qty = qty.trim().parse::<u32>().ok().filter(|q| *q > 0).ok_or_else(|| {
                InputError::malformed(format!("invalid quantity in item '{spec}'"))
            })?;
            (code.trim(), qty)
        }
        None => (spec, default_qty),
    };
    if code.is_empty() {
        return Err(InputError::malformed(format!("empty part code in item '{spec}'")));
    }
    Ok((Identifier::classify(code), quantity))
}

/// Read item specs from a text file: one per line, blank lines and `#` comments skipped
pub async fn load_item_specs(path: &Path) -> AppResult<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| FileError::read(path, e))?;
    let specs: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    tracing::info!("Loaded {} items from {}", specs.len(), path.display());
    Ok(specs)
}

/// Turn parsed cart items into `CartAdd` jobs
pub fn cart_add_specs(items: Vec<(Identifier, u32)>) -> Vec<JobSpec> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, (identifier, quantity))| {
            let mut echo = JsonMap::new();
            let key = match &identifier {
                Identifier::PartNumber(_) => "mpn",
                _ => "lcsc_code",
            };
            echo.insert(key.to_string(), JsonValue::from(identifier.as_str()));
            echo.insert("quantity".to_string(), JsonValue::from(quantity));
            JobSpec::new(index, JobKind::CartAdd, identifier)
                .with_params(JobParams {
                    quantity: Some(quantity),
                    ..JobParams::default()
                })
                .with_echo(echo)
        })
        .collect()
}

/// The single job behind `list-cart`
pub fn cart_list_spec() -> JobSpec {
    JobSpec::new(0, JobKind::CartList, Identifier::Cart)
}

/// Indices must be unique within a batch
pub fn ensure_unique_indices(jobs: &[JobSpec]) -> Result<(), ConfigError> {
    let mut seen = HashSet::with_capacity(jobs.len());
    for job in jobs {
        if !seen.insert(job.index) {
            return Err(ConfigError::DuplicateJobIndex { index: job.index });
        }
    }
    Ok(())
}
