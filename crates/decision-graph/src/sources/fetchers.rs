use super::normalizer::normalize_name;
use super::reader::parse_cell;
use super::RawValue;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::FetchError;
use crate::model::FetcherSpec;
use crate::scorers::InputKind;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// External provider of one source column.
///
/// A fetch covers the whole batch of choices: it returns exactly one value per requested
/// choice, in order, or fails.
pub trait Fetcher: fmt::Debug {
    /// Datatype of the values this fetcher returns.
    fn kind(&self) -> InputKind;

    fn fetch(
        &self,
        source: &str,
        choices: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<RawValue>, FetchError>;
}

/// Fetchers keyed by the source name they provide.
#[derive(Debug, Default)]
pub struct FetcherRegistry {
    fetchers: BTreeMap<String, Box<dyn Fetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build CSV lookup fetchers from configuration; relative paths resolve against `base_dir`.
    pub fn from_specs(specs: &BTreeMap<String, FetcherSpec>, base_dir: &Path) -> Self {
        let mut registry = Self::new();
        for (source, spec) in specs {
            match spec {
                FetcherSpec::Csv {
                    path,
                    key,
                    value,
                    kind,
                } => {
                    let path = if path.is_absolute() {
                        path.clone()
                    } else {
                        base_dir.join(path)
                    };
                    registry.register(
                        source.clone(),
                        CsvLookupFetcher::new(path, key.columns(), value.clone(), *kind),
                    );
                }
            }
        }
        registry
    }

    /// Register `fetcher` for `source`, replacing any previous registration.
    pub fn register<F>(&mut self, source: impl Into<String>, fetcher: F) -> &mut Self
    where
        F: Fetcher + 'static,
    {
        self.fetchers.insert(source.into(), Box::new(fetcher));
        self
    }

    pub fn get(&self, source: &str) -> Option<&dyn Fetcher> {
        self.fetchers.get(source).map(Box::as_ref)
    }
}

/// In-memory fetcher, useful for fixed reference data and tests.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    kind: InputKind,
    values: HashMap<String, RawValue>,
}

impl StaticFetcher {
    pub fn new<I, K>(kind: InputKind, values: I) -> Self
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: Into<String>,
    {
        Self {
            kind,
            values: values
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }
}

impl Fetcher for StaticFetcher {
    fn kind(&self) -> InputKind {
        self.kind
    }

    fn fetch(
        &self,
        source: &str,
        choices: &[String],
        _diagnostics: &mut Diagnostics,
    ) -> Result<Vec<RawValue>, FetchError> {
        lookup_all(source, choices, &self.values)
    }
}

/// Separator between the parts of a composite lookup key, as in `"Des Moines, IA"`.
pub const KEY_SEPARATOR: &str = ", ";

/// Looks choices up in a reference CSV file, e.g. a published per-city dataset.
///
/// The `keys` columns, joined with [`KEY_SEPARATOR`], are matched against choice names and
/// `value` names the column returned. The first row wins when a key repeats.
#[derive(Debug, Clone)]
pub struct CsvLookupFetcher {
    path: PathBuf,
    keys: Vec<String>,
    value: String,
    kind: InputKind,
}

struct Lookup {
    values: HashMap<String, RawValue>,
    duplicates: HashSet<String>,
}

impl CsvLookupFetcher {
    pub fn new<K>(
        path: impl Into<PathBuf>,
        keys: impl IntoIterator<Item = K>,
        value: impl Into<String>,
        kind: InputKind,
    ) -> Self
    where
        K: Into<String>,
    {
        Self {
            path: path.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            value: value.into(),
            kind,
        }
    }

    fn load(&self, source: &str) -> Result<Lookup, FetchError> {
        let backend = |message: String| FetchError::Backend {
            source_name: source.to_string(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|err| backend(format!("{}: {err}", self.path.display())))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|err| backend(err.to_string()))?
            .iter()
            .map(normalize_name)
            .collect();
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| backend(format!("{} has no column '{name}'", self.path.display())))
        };
        if self.keys.is_empty() {
            return Err(backend("no key column configured".to_string()));
        }
        let key_indices = self
            .keys
            .iter()
            .map(|key| column(key))
            .collect::<Result<Vec<_>, _>>()?;
        let value_index = column(&self.value)?;

        let mut values = HashMap::new();
        let mut duplicates = HashSet::new();
        for record in reader.records() {
            let record = record.map_err(|err| backend(err.to_string()))?;
            let key = key_indices
                .iter()
                .map(|&index| normalize_name(record.get(index).unwrap_or_default()))
                .collect::<Vec<_>>()
                .join(KEY_SEPARATOR);
            let Some(value) = record.get(value_index).and_then(parse_cell) else {
                continue;
            };
            if values.contains_key(&key) {
                duplicates.insert(key);
            } else {
                values.insert(key, value);
            }
        }

        Ok(Lookup { values, duplicates })
    }
}

impl Fetcher for CsvLookupFetcher {
    fn kind(&self) -> InputKind {
        self.kind
    }

    fn fetch(
        &self,
        source: &str,
        choices: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<RawValue>, FetchError> {
        let lookup = self.load(source)?;
        tracing::debug!(
            source,
            path = %self.path.display(),
            rows = lookup.values.len(),
            "reference data loaded"
        );
        for choice in choices.iter().filter(|choice| lookup.duplicates.contains(*choice)) {
            diagnostics.warn(
                Stage::Resolution,
                source,
                format!(
                    "'{choice}' appears more than once in {}; using the first row",
                    self.path.display()
                ),
            );
        }
        lookup_all(source, choices, &lookup.values)
    }
}

fn lookup_all(
    source: &str,
    choices: &[String],
    values: &HashMap<String, RawValue>,
) -> Result<Vec<RawValue>, FetchError> {
    let missing: Vec<String> = choices
        .iter()
        .filter(|choice| !values.contains_key(choice.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(FetchError::Unresolved {
            source_name: source.to_string(),
            choices: missing,
        });
    }

    Ok(choices
        .iter()
        .filter_map(|choice| values.get(choice.as_str()).cloned())
        .collect())
}
