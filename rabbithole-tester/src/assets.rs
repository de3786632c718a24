//! Filesystem-backed content loading and save slots.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rabbithole_engine::{
    BaseContent, ConfigError, ContentError, ContentLoader, ContentPack, EngineConfig, GameEngine,
    PackImport, PlayerState, SaveStorage, import_packs,
};
use thiserror::Error;

const BASE_FILE: &str = "base.json";
const CONFIG_FILE: &str = "engine.json";
const PACK_DIR: &str = "packs";
const PACK_SUFFIX: &str = ".pack.json";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("save slot `{slot}` is not valid JSON: {source}")]
    Save {
        slot: String,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> AssetError + '_ {
    move |source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Which packs under `packs/` take part in the merge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PackFilter {
    #[default]
    All,
    None,
    Only(Vec<String>),
}

impl PackFilter {
    /// Parse `all`, `none` or a comma-separated list of pack file stems.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let names: Vec<String> = crate::util::split_csv(raw);
        if names.is_empty() || names.iter().any(|name| name.eq_ignore_ascii_case("all")) {
            Self::All
        } else if names.iter().any(|name| name.eq_ignore_ascii_case("none")) {
            Self::None
        } else {
            Self::Only(names)
        }
    }

    fn admits(&self, stem: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Only(names) => names.iter().any(|name| name == stem),
        }
    }
}

/// Reads `base.json`, `packs/*.pack.json` and an optional `engine.json`.
#[derive(Debug, Clone)]
pub struct DirContentLoader {
    root: PathBuf,
    packs: PackFilter,
}

impl DirContentLoader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, packs: PackFilter) -> Self {
        Self {
            root: root.into(),
            packs,
        }
    }

    /// Content shipped in the repository.
    #[must_use]
    pub fn default_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("assets")
            .join("content")
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parse every admitted pack file in file-name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pack directory exists but cannot be listed or read.
    pub fn import(&self) -> Result<PackImport, AssetError> {
        let dir = self.root.join(PACK_DIR);
        if !dir.is_dir() {
            debug!("no pack directory at {}", dir.display());
            return Ok(PackImport::default());
        }
        let mut files: Vec<(String, PathBuf)> = fs::read_dir(&dir)
            .map_err(io_error(&dir))?
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let stem = name.strip_suffix(PACK_SUFFIX)?.to_string();
                self.packs.admits(&stem).then(|| (name, entry.path()))
            })
            .collect();
        files.sort();

        let mut sources = Vec::with_capacity(files.len());
        for (name, path) in files {
            let json = fs::read_to_string(&path).map_err(io_error(&path))?;
            sources.push((name, json));
        }
        let import = import_packs(sources);
        for skipped in &import.skipped {
            warn!("skipping pack {}: {}", skipped.source, skipped.reason);
        }
        Ok(import)
    }
}

impl ContentLoader for DirContentLoader {
    type Error = AssetError;

    fn load_base_content(&self) -> Result<BaseContent, Self::Error> {
        let path = self.root.join(BASE_FILE);
        let json = fs::read_to_string(&path).map_err(io_error(&path))?;
        Ok(BaseContent::from_json(BASE_FILE, &json)?)
    }

    fn load_packs(&self) -> Result<Vec<ContentPack>, Self::Error> {
        Ok(self.import()?.packs)
    }

    fn load_config(&self) -> Result<EngineConfig, Self::Error> {
        let path = self.root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(EngineConfig::default());
        }
        let json = fs::read_to_string(&path).map_err(io_error(&path))?;
        Ok(EngineConfig::from_json(&json)?)
    }
}

/// One JSON file per save slot inside a directory.
#[derive(Debug, Clone)]
pub struct DirSaveStorage {
    root: PathBuf,
}

impl DirSaveStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.root.join(format!("{slot}.json"))
    }
}

impl SaveStorage for DirSaveStorage {
    type Error = AssetError;

    fn save_state(&self, slot: &str, state: &PlayerState) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;
        let json = serde_json::to_string_pretty(state).map_err(|source| AssetError::Save {
            slot: slot.to_string(),
            source,
        })?;
        let path = self.slot_path(slot);
        fs::write(&path, json).map_err(io_error(&path))
    }

    fn load_state(&self, slot: &str) -> Result<Option<PlayerState>, Self::Error> {
        let path = self.slot_path(slot);
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(io_error(&path))?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| AssetError::Save {
                slot: slot.to_string(),
                source,
            })
    }

    fn delete_save(&self, slot: &str) -> Result<(), Self::Error> {
        let path = self.slot_path(slot);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path)(err)),
        }
    }
}

/// Engine instance the harness plays against.
pub type TesterEngine = GameEngine<DirContentLoader, DirSaveStorage>;

/// Everything loaded once per harness invocation.
pub struct TesterAssets {
    pub engine: TesterEngine,
    pub import: PackImport,
}

impl TesterAssets {
    /// Load content from `root`, keeping saves under `save_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if base content, packs or engine configuration cannot be read.
    pub fn load(
        root: impl Into<PathBuf>,
        packs: PackFilter,
        save_dir: impl Into<PathBuf>,
    ) -> Result<Self, AssetError> {
        let loader = DirContentLoader::new(root, packs);
        let import = loader.import()?;
        let engine = GameEngine::new(loader, DirSaveStorage::new(save_dir))?;
        Ok(Self { engine, import })
    }

    /// Repository content with every pack enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the shipped content cannot be read.
    pub fn load_default() -> Result<Self, AssetError> {
        Self::load(
            DirContentLoader::default_root(),
            PackFilter::All,
            std::env::temp_dir().join("rabbithole-saves"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rabbithole-assets-{label}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn pack_filter_parses_keywords_and_lists() {
        assert_eq!(PackFilter::parse("all"), PackFilter::All);
        assert_eq!(PackFilter::parse(""), PackFilter::All);
        assert_eq!(PackFilter::parse("none"), PackFilter::None);
        assert_eq!(
            PackFilter::parse("night_shift, fame_engine"),
            PackFilter::Only(vec!["night_shift".into(), "fame_engine".into()])
        );
    }

    #[test]
    fn shipped_content_loads_with_every_pack() {
        let assets = TesterAssets::load_default().unwrap();
        assert!(assets.import.skipped.is_empty());
        let catalog = assets.engine.catalog();
        assert_eq!(catalog.pack_ids(), ["fame_engine", "night_shift"]);
        assert!(catalog.event("forum_thread").is_some());
    }

    #[test]
    fn filtered_loads_leave_packs_out() {
        let loader = DirContentLoader::new(DirContentLoader::default_root(), PackFilter::None);
        assert!(loader.load_packs().unwrap().is_empty());
        let only = DirContentLoader::new(
            DirContentLoader::default_root(),
            PackFilter::Only(vec!["night_shift".into()]),
        );
        let packs = only.load_packs().unwrap();
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].id, "night_shift");
    }

    #[test]
    fn malformed_packs_are_skipped_and_config_is_read() {
        let root = scratch_dir("malformed");
        fs::write(root.join(BASE_FILE), r#"{ "events": [] }"#).unwrap();
        fs::write(root.join(CONFIG_FILE), r#"{ "log_capacity": 7 }"#).unwrap();
        fs::create_dir_all(root.join(PACK_DIR)).unwrap();
        fs::write(root.join(PACK_DIR).join("broken.pack.json"), "{ nope").unwrap();
        fs::write(
            root.join(PACK_DIR).join("ok.pack.json"),
            r#"{ "id": "ok", "name": "Ok" }"#,
        )
        .unwrap();
        fs::write(root.join(PACK_DIR).join("notes.txt"), "ignored").unwrap();

        let loader = DirContentLoader::new(&root, PackFilter::All);
        let import = loader.import().unwrap();
        assert_eq!(import.packs.len(), 1);
        assert_eq!(import.skipped.len(), 1);
        assert_eq!(import.skipped[0].source, "broken.pack.json");
        assert_eq!(loader.load_config().unwrap().log_capacity, 7);

        fs::write(root.join(CONFIG_FILE), r#"{ "log_capacity": 0 }"#).unwrap();
        assert!(matches!(
            loader.load_config(),
            Err(AssetError::Config(ConfigError::ZeroLogCapacity))
        ));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn save_slots_roundtrip_and_delete() {
        let root = scratch_dir("saves");
        let storage = DirSaveStorage::new(root.join("slots"));
        let mut state = PlayerState::default();
        state.turn = 12;
        state.tags.push("believer".into());
        storage.save_state("one", &state).unwrap();
        let loaded = storage.load_state("one").unwrap().expect("slot exists");
        assert_eq!(loaded.turn, 12);
        assert_eq!(loaded.tags, state.tags);
        storage.delete_save("one").unwrap();
        assert!(storage.load_state("one").unwrap().is_none());
        storage.delete_save("one").unwrap();
        let _ = fs::remove_dir_all(root);
    }
}
