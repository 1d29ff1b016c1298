//! CLI command implementations
//!
//! Every command loads the config, opens the collection log (replaying
//! it), runs one store operation and prints one JSON response.

use std::path::Path;

use serde_json::{json, Value as Json};

use crate::collection::FileCollection;
use crate::config::StoreConfig;
use crate::observability::{log_event, Event, Logger};
use crate::persistence::VersionedCollection;
use crate::value::{Query, Value};
use crate::version::{Ref, Version, VersionOrRef};

use super::args::{select, Cli, Command, Selector};
use super::errors::{CliError, CliResult};
use super::io::{read_payload, write_response};

/// Versioned JSON objects in a durable collection.
pub type JsonStore = VersionedCollection<Json, FileCollection>;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(&cli.config, cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<()> {
    let config = load_config(config_path)?;
    let data = match cmd {
        Command::Init => init(&config)?,
        Command::Save {
            id,
            parent_version,
            parent_ref,
        } => {
            let payload = read_payload()?;
            let parent = select(parent_version, parent_ref.as_deref());
            save(&open(&config)?, &id, &payload, parent)?
        }
        Command::Show { id, at } => show(&open(&config)?, &id, &at)?,
        Command::History { id, from } => history(&open(&config)?, &id, &from)?,
        Command::UpdateRef {
            id,
            name,
            to_version,
            to_ref,
        } => {
            let dest = select(to_version, to_ref.as_deref());
            update_ref(&open(&config)?, &id, &name, dest)?
        }
        Command::Archive { id, off } => archive(&open(&config)?, &id, !off)?,
    };
    write_response(data)
}

/// Loads the config and applies its log level.
pub fn load_config(path: &Path) -> CliResult<StoreConfig> {
    let config = StoreConfig::load(path)?;
    Logger::set_min_severity(config.severity()?);
    log_event(
        Event::ConfigLoaded,
        &[
            ("data_dir", config.data_dir.as_str()),
            ("collection", config.collection.as_str()),
        ],
    );
    Ok(config)
}

fn is_initialized(config: &StoreConfig) -> bool {
    FileCollection::log_path(config.data_path(), &config.collection).exists()
}

fn open_collection(config: &StoreConfig) -> CliResult<JsonStore> {
    let collection = FileCollection::open(config.data_path(), &config.collection, config.fsync)?;
    Ok(VersionedCollection::with_id_key(
        collection,
        config.id_key.clone(),
    ))
}

/// Opens an initialized store.
pub fn open(config: &StoreConfig) -> CliResult<JsonStore> {
    if !is_initialized(config) {
        return Err(CliError::not_initialized());
    }
    open_collection(config)
}

/// Creates the collection log and declares the store's indexes.
pub fn init(config: &StoreConfig) -> CliResult<Json> {
    if is_initialized(config) {
        return Err(CliError::already_initialized());
    }
    let store = open_collection(config)?;
    store.ensure_indexes()?;

    Ok(json!({
        "initialized": true,
        "path": store.collection().path().display().to_string(),
    }))
}

pub fn save(
    store: &JsonStore,
    id: &str,
    payload: &Json,
    parent: Option<VersionOrRef>,
) -> CliResult<Json> {
    let version = store.save_one(id, payload, parent)?;
    Ok(json!({ "id": id, "version": version.to_string() }))
}

pub fn show(store: &JsonStore, id: &str, at: &Selector) -> CliResult<Json> {
    let query = Query::from(at.to_version_or_ref());
    let value = store.find_one(&store.identity(id), &query)?;
    Ok(value_json(&value))
}

pub fn history(store: &JsonStore, id: &str, from: &Selector) -> CliResult<Json> {
    let values = store.load(id)?;
    let versions: Vec<Json> = values
        .history(&from.to_version_or_ref())
        .iter()
        .map(value_json)
        .collect();
    Ok(json!({
        "id": id,
        "archived": values.is_archived(),
        "versions": versions,
    }))
}

pub fn update_ref(
    store: &JsonStore,
    id: &str,
    name: &str,
    dest: Option<VersionOrRef>,
) -> CliResult<Json> {
    let r = Ref::new(name);
    store.update_ref(id, &r, dest.as_ref())?;
    let version = store
        .find_meta(id, &VersionOrRef::Ref(r))?
        .map(|meta| meta.version.to_string());
    Ok(json!({ "id": id, "ref": name, "version": version }))
}

pub fn archive(store: &JsonStore, id: &str, archived: bool) -> CliResult<Json> {
    store.archive_one(&store.identity_document(id), archived)?;
    Ok(json!({ "id": id, "archived": archived }))
}

fn value_json(value: &Value<Json>) -> Json {
    let parents: Vec<String> = value.parents().iter().map(Version::to_string).collect();
    let refs: Vec<&str> = value.raw_refs().into_iter().flatten().map(Ref::as_str).collect();
    json!({
        "version": value.version().to_string(),
        "parents": parents,
        "refs": refs,
        "timestamp": value.timestamp().to_rfc3339(),
        "payload": value.payload(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use crate::collection::DocumentCollection;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StoreConfig {
        let mut config = StoreConfig::new(dir.path().to_string_lossy());
        config.fsync = false;
        config
    }

    #[test]
    fn test_init_once() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        assert_eq!(
            open(&config).err().unwrap().code(),
            &CliErrorCode::NotInitialized
        );
        init(&config).unwrap();
        assert_eq!(
            init(&config).unwrap_err().code(),
            &CliErrorCode::AlreadyInitialized
        );
        assert_eq!(open(&config).unwrap().collection().indexes().unwrap().len(), 5);
    }

    #[test]
    fn test_save_show_history_across_reopen() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        init(&config).unwrap();

        {
            let store = open(&config).unwrap();
            save(&store, "a", &json!({"title": "one"}), None).unwrap();
            save(&store, "a", &json!({"title": "two"}), None).unwrap();
        }

        let store = open(&config).unwrap();
        let shown = show(&store, "a", &Selector::default()).unwrap();
        assert_eq!(shown["payload"]["title"], json!("two"));
        assert_eq!(shown["refs"], json!(["latest"]));

        let hist = history(&store, "a", &Selector::default()).unwrap();
        let titles: Vec<&Json> = hist["versions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| &v["payload"]["title"])
            .collect();
        assert_eq!(titles, vec![&json!("two"), &json!("one")]);
    }

    #[test]
    fn test_update_ref_and_archive() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        init(&config).unwrap();
        let store = open(&config).unwrap();

        let first = save(&store, "a", &json!({"n": 1}), None).unwrap();
        save(&store, "a", &json!({"n": 2}), None).unwrap();
        let v1: Version = first["version"].as_str().unwrap().parse().unwrap();

        let moved = update_ref(&store, "a", "stable", Some(v1.into())).unwrap();
        assert_eq!(moved["version"], first["version"]);

        archive(&store, "a", true).unwrap();
        let err = save(&store, "a", &json!({"n": 3}), None).unwrap_err();
        assert_eq!(err.code_str(), "AERO_VSTORE_ARCHIVED");

        let unbound = {
            archive(&store, "a", false).unwrap();
            update_ref(&store, "a", "stable", None).unwrap()
        };
        assert_eq!(unbound["version"], Json::Null);
    }
}
