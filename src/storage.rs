use {
    crate::{
        aggregator::state::DashboardSnapshot,
        config::Network,
        error::DashboardError,
        validation::validate_alert_threshold,
    },
    log::{debug, warn},
    serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize},
    serde_json::{Map, Value},
    std::{
        fs,
        io::ErrorKind,
        path::{Path, PathBuf},
    },
};

/// Preferences persisted between runs. Keys keep their dashboard names so
/// the file stays readable by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub selected_network: Option<Network>,
    /// Written as a number; numeric strings are accepted when reading.
    #[serde(default, deserialize_with = "number_or_string")]
    pub alert_threshold: Option<f64>,
    #[serde(default)]
    pub validator_data: Option<DashboardSnapshot>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(value)) => Ok(Some(value)),
        Some(NumberOrString::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid alert threshold {:?}", text))),
    }
}

/// Takes one key out of the object. A value that no longer fits is dropped
/// on its own instead of taking the other keys with it.
fn take_field<T, F>(fields: &mut Map<String, Value>, key: &str, parse: F) -> Option<T>
where
    F: FnOnce(Value) -> Result<Option<T>, serde_json::Error>,
{
    let value = fields.remove(key)?;
    match parse(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Ignoring saved {}: {}", key, e);
            None
        }
    }
}

fn parse_value<T: DeserializeOwned>(value: Value) -> Result<Option<T>, serde_json::Error> {
    serde_json::from_value(value)
}

impl Preferences {
    /// Parses a preferences document key by key. Only a body that is not a
    /// JSON object is an error.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut fields: Map<String, Value> = serde_json::from_str(raw)?;

        let alert_threshold = take_field(&mut fields, "alertThreshold", number_or_string).and_then(|value| {
            validate_alert_threshold(value)
                .map_err(|e| warn!("Ignoring saved alertThreshold: {}", e))
                .ok()
        });

        Ok(Self {
            selected_network: take_field(&mut fields, "selectedNetwork", parse_value),
            alert_threshold,
            validator_data: take_field(&mut fields, "validatorData", parse_value),
        })
    }
}

/// Explicit load/save boundary for `Preferences`; nothing else touches the file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields defaults; an unreadable or malformed one is an error.
    pub fn read(&self) -> Result<Preferences, DashboardError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No saved preferences at {}", self.path.display());
                return Ok(Preferences::default());
            }
            Err(e) => {
                return Err(DashboardError::Unknown(format!(
                    "Failed to read preferences {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        Preferences::from_json(&raw).map_err(|e| {
            DashboardError::Validation(format!(
                "Malformed preferences {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Like `read`, but falls back to defaults with a warning.
    pub fn load(&self) -> Preferences {
        self.read().unwrap_or_else(|e| {
            warn!("{}; using defaults", e);
            Preferences::default()
        })
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), DashboardError> {
        let body = serde_json::to_string_pretty(prefs)
            .map_err(|e| DashboardError::Unknown(format!("Failed to encode preferences: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                DashboardError::Unknown(format!(
                    "Failed to write preferences {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }

    /// Read, apply `change`, save. A file that cannot be read is left as is.
    pub fn update<F>(&self, change: F) -> Result<Preferences, DashboardError>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut prefs = self.read()?;
        change(&mut prefs);
        self.save(&prefs)?;
        Ok(prefs)
    }
}
