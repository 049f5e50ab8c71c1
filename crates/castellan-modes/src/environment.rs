//! Mode environments and the gated configuration source.
//!
//! Each mode owns an `Environment`: a display name plus named registries
//! holding whatever structured values its level needs. Environments are
//! loaded through `Conf`, the configuration collaborator, whose `open` and
//! `read` operations are gated by a resource-local permission store.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use castellan_access::PermissionStore;
use castellan_contracts::{
    access::ConstraintId,
    agent::SubjectId,
    error::{CastellanError, CastellanResult},
};

/// Constraint id gating `Conf::open`.
pub const OPEN_CONSTRAINT: &str = "open";
/// Constraint id gating `Conf::read`.
pub const READ_CONSTRAINT: &str = "read";

/// Configuration and registries scoped to one mode level.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    display_name: String,
    registries: HashMap<String, Value>,
}

impl Environment {
    /// Create an empty environment with the given display name.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            registries: HashMap::new(),
        }
    }

    /// Build an environment from one TOML table: a `name` key for the
    /// display name, every other key becoming a registry.
    pub fn from_toml_table(fallback_name: &str, table: &toml::Table) -> Self {
        let display_name = table
            .get("name")
            .and_then(toml::Value::as_str)
            .unwrap_or(fallback_name)
            .to_string();
        let mut env = Environment::new(display_name);
        for (key, value) in table {
            if key == "name" {
                continue;
            }
            env.insert_registry(key, toml_to_json(value));
        }
        env
    }

    /// The human-readable name of this level.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Store a registry under `name`.
    pub fn insert_registry(&mut self, name: impl Into<String>, value: Value) {
        self.registries.insert(name.into(), value);
    }

    /// Look up a registry by name.
    pub fn registry(&self, name: &str) -> Option<&Value> {
        self.registries.get(name)
    }

    /// Drop the registry stored under `name`, if any.
    pub fn remove_registry(&mut self, name: &str) {
        self.registries.remove(name);
    }
}

/// Convert a TOML value into its JSON representation.
fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Value::from(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

/// The configuration collaborator: an opaque TOML source whose access is
/// gated by a resource-local permission store.
///
/// `open` parses the document; `read` returns a top-level section. Both
/// check the caller against the store first — an unregistered constraint
/// means unrestricted access, so a `Conf` with an untouched store is open
/// to everyone.
pub struct Conf {
    store: PermissionStore,
    raw: String,
    document: Option<toml::Table>,
}

impl Conf {
    /// Create a closed configuration over `raw` TOML text, gated as the
    /// named resource.
    pub fn new(resource: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            store: PermissionStore::new(resource),
            raw: raw.into(),
            document: None,
        }
    }

    /// The permission store gating this configuration.
    pub fn store_mut(&mut self) -> &mut PermissionStore {
        &mut self.store
    }

    /// Parse the document on behalf of `subject`.
    pub fn open(&mut self, subject: impl Into<SubjectId>) -> CastellanResult<()> {
        let subject = subject.into();
        if !self
            .store
            .has_permission(subject.clone(), &ConstraintId::new(OPEN_CONSTRAINT))
        {
            return Err(CastellanError::AccessDenied {
                subject: subject.to_string(),
                resource: self.store.resource().to_string(),
                constraint: OPEN_CONSTRAINT.to_string(),
                authority: self.store.resource().to_string(),
            });
        }
        let table: toml::Table = self.raw.parse().map_err(|e| CastellanError::Config {
            reason: format!("failed to parse configuration: {}", e),
        })?;
        debug!(resource = %self.store.resource(), sections = table.len(), "configuration opened");
        self.document = Some(table);
        Ok(())
    }

    /// Return the top-level `section` on behalf of `subject`.
    pub fn read(
        &self,
        subject: impl Into<SubjectId>,
        section: &str,
    ) -> CastellanResult<&toml::Value> {
        let subject = subject.into();
        if !self
            .store
            .has_permission(subject.clone(), &ConstraintId::new(READ_CONSTRAINT))
        {
            return Err(CastellanError::AccessDenied {
                subject: subject.to_string(),
                resource: self.store.resource().to_string(),
                constraint: READ_CONSTRAINT.to_string(),
                authority: self.store.resource().to_string(),
            });
        }
        let document = self.document.as_ref().ok_or_else(|| CastellanError::Config {
            reason: format!(
                "configuration '{}' was read before being opened",
                self.store.resource()
            ),
        })?;
        document.get(section).ok_or_else(|| CastellanError::Config {
            reason: format!(
                "configuration '{}' has no section '{}'",
                self.store.resource(),
                section
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use castellan_contracts::access::Constraint;

    use super::*;

    const DOC: &str = r#"
        [application]
        name = "Example App"
        modules = ["wiki", "forum"]

        [server]
        name = "Example Server"
    "#;

    #[test]
    fn ungated_conf_opens_and_reads() {
        let mut conf = Conf::new("conf:test", DOC);
        conf.open("anyone").unwrap();
        let section = conf.read("anyone", "application").unwrap();
        assert_eq!(section.get("name").unwrap().as_str(), Some("Example App"));
    }

    #[test]
    fn open_is_denied_once_constrained() {
        let mut conf = Conf::new("conf:test", DOC);
        conf.store_mut()
            .set_constraint(Constraint::new(OPEN_CONSTRAINT, "open the configuration"));
        conf.store_mut()
            .set_permission("system", &ConstraintId::new(OPEN_CONSTRAINT));

        let err = conf.open("intruder").unwrap_err();
        assert!(matches!(err, CastellanError::AccessDenied { .. }));

        conf.open("system").unwrap();
    }

    #[test]
    fn read_before_open_is_a_config_error() {
        let conf = Conf::new("conf:test", DOC);
        let err = conf.read("anyone", "application").unwrap_err();
        assert!(matches!(err, CastellanError::Config { .. }));
    }

    #[test]
    fn missing_section_is_named_in_the_error() {
        let mut conf = Conf::new("conf:test", DOC);
        conf.open("anyone").unwrap();
        let err = conf.read("anyone", "session").unwrap_err();
        assert!(err.to_string().contains("session"));
    }

    #[test]
    fn environment_from_toml_collects_registries() {
        let table: toml::Table = r#"
            name = "Example App"
            modules = ["wiki", "forum"]
        "#
        .parse()
        .unwrap();
        let env = Environment::from_toml_table("fallback", &table);
        assert_eq!(env.display_name(), "Example App");
        let modules = env.registry("modules").unwrap();
        assert_eq!(modules[0], "wiki");
        assert!(env.registry("name").is_none());
    }
}
