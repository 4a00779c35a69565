use std::fs::File;
use std::panic;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use log::{debug, info, warn};
use semver::{Version, VersionReq};
use serde::Deserialize;
use tokio::fs;

use crate::kernel::constants::PLUGIN_MANIFEST_FILE;
use crate::plugin_system::descriptor::{PluginCapability, PluginDependency, PluginDescriptor};
use crate::plugin_system::error::{PluginSystemError, PluginSystemErrorSource};
use crate::plugin_system::traits::{PluginCreateFn, ShioriPlugin, PLUGIN_CREATE_SYMBOL};

// --- Intermediate structs for manifest deserialization ---

#[derive(Deserialize, Debug)]
struct RawDependency {
    plugin_id: String,
    #[serde(default)]
    version_range: Option<String>,
    #[serde(default = "default_required")]
    required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Deserialize, Debug)]
struct RawManifest {
    id: String,
    name: String,
    version: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    capability: Option<PluginCapability>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    #[serde(default)]
    entry_point: Option<String>,
}

/// An installable unit found in the plugins directory: either an unpacked
/// plugin directory carrying a manifest, or a zip archive awaiting
/// installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginPackage {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl PluginPackage {
    pub fn path(&self) -> &Path {
        match self {
            PluginPackage::Directory(p) | PluginPackage::Archive(p) => p,
        }
    }

    fn sort_key(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Wraps a dynamically loaded plugin together with the library it came
/// from. Field order matters: the boxed plugin must drop before the
/// `Library` it points into.
struct DynamicPlugin {
    inner: Box<dyn ShioriPlugin>,
    _library: Library,
}

impl ShioriPlugin for DynamicPlugin {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> &str {
        self.inner.version()
    }

    fn init(
        &self,
        context: &crate::plugin_system::context::PluginContext,
    ) -> Result<(), PluginSystemError> {
        self.inner.init(context)
    }

    fn on_manga_loaded(&self, manga: &crate::model::Manga) -> Result<(), PluginSystemError> {
        self.inner.on_manga_loaded(manga)
    }

    fn on_chapter_loaded(
        &self,
        chapter: &crate::model::Chapter,
        manga: &crate::model::Manga,
    ) -> Result<(), PluginSystemError> {
        self.inner.on_chapter_loaded(chapter, manga)
    }

    fn on_reading_complete(
        &self,
        chapter: &crate::model::Chapter,
        manga: &crate::model::Manga,
    ) -> Result<(), PluginSystemError> {
        self.inner.on_reading_complete(chapter, manga)
    }

    fn shutdown(&self) -> Result<(), PluginSystemError> {
        self.inner.shutdown()
    }
}

/// Discovers, installs and loads plugin packages from a single plugins
/// directory.
pub struct PluginLoader {
    plugins_dir: PathBuf,
    // Shared libraries pre-opened so plugin code can resolve against
    // them. Kept alive for the lifetime of the loader.
    preloaded: Vec<Library>,
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("plugins_dir", &self.plugins_dir)
            .field("preloaded", &self.preloaded.len())
            .finish()
    }
}

impl PluginLoader {
    pub fn new(plugins_dir: PathBuf) -> Self {
        Self {
            plugins_dir,
            preloaded: Vec::new(),
        }
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Open every library on the search path and keep it resident. A
    /// library that fails to open is skipped with a warning; plugins that
    /// needed it will fail at their own load step instead.
    pub fn preload_libraries(&mut self, search_path: &[PathBuf]) {
        for path in search_path {
            match unsafe { Library::new(path) } {
                Ok(lib) => {
                    debug!("Preloaded shared library '{}'", path.display());
                    self.preloaded.push(lib);
                }
                Err(e) => {
                    warn!("Failed to preload shared library '{}': {}", path.display(), e);
                }
            }
        }
    }

    /// Scan the plugins directory for packages, in lexicographic order of
    /// file name. A missing directory is created so a fresh installation
    /// starts from an empty, valid state.
    pub async fn discover_packages(&self) -> Result<Vec<PluginPackage>, PluginSystemError> {
        if !fs::try_exists(&self.plugins_dir).await.unwrap_or(false) {
            fs::create_dir_all(&self.plugins_dir).await.map_err(|e| {
                PluginSystemError::LoadingError {
                    plugin_id: "<discovery>".to_string(),
                    path: Some(self.plugins_dir.clone()),
                    source: Box::new(PluginSystemErrorSource::Io(e)),
                }
            })?;
            return Ok(Vec::new());
        }

        let mut read_dir = fs::read_dir(&self.plugins_dir).await.map_err(|e| {
            PluginSystemError::LoadingError {
                plugin_id: "<discovery>".to_string(),
                path: Some(self.plugins_dir.clone()),
                source: Box::new(PluginSystemErrorSource::Io(e)),
            }
        })?;

        let mut packages = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
            PluginSystemError::LoadingError {
                plugin_id: "<discovery>".to_string(),
                path: Some(self.plugins_dir.clone()),
                source: Box::new(PluginSystemErrorSource::Io(e)),
            }
        })? {
            let path = entry.path();
            let metadata = match fs::metadata(&path).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Failed to stat '{}': {}", path.display(), e);
                    continue;
                }
            };

            if metadata.is_dir() {
                let manifest = path.join(PLUGIN_MANIFEST_FILE);
                if fs::try_exists(&manifest).await.unwrap_or(false) {
                    packages.push(PluginPackage::Directory(path));
                } else {
                    debug!(
                        "Skipping '{}': directory has no {}",
                        path.display(),
                        PLUGIN_MANIFEST_FILE
                    );
                }
            } else if metadata.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"))
            {
                packages.push(PluginPackage::Archive(path));
            }
        }

        packages.sort_by_key(|p| p.sort_key());
        Ok(packages)
    }

    /// Read and validate a plugin manifest, producing a descriptor.
    pub async fn load_manifest(
        &self,
        manifest_path: &Path,
    ) -> Result<PluginDescriptor, PluginSystemError> {
        let raw = self.read_raw_manifest(manifest_path).await?;
        Self::descriptor_from_raw(manifest_path, raw)
    }

    async fn read_raw_manifest(
        &self,
        manifest_path: &Path,
    ) -> Result<RawManifest, PluginSystemError> {
        let content = fs::read_to_string(manifest_path).await.map_err(|e| {
            PluginSystemError::ManifestError {
                path: manifest_path.to_path_buf(),
                message: "failed to read manifest file".to_string(),
                source: Some(Box::new(PluginSystemErrorSource::Io(e))),
            }
        })?;

        serde_json::from_str(&content).map_err(|e| PluginSystemError::ManifestError {
            path: manifest_path.to_path_buf(),
            message: "failed to parse manifest JSON".to_string(),
            source: Some(Box::new(PluginSystemErrorSource::Json(e))),
        })
    }

    fn descriptor_from_raw(
        manifest_path: &Path,
        raw: RawManifest,
    ) -> Result<PluginDescriptor, PluginSystemError> {
        if raw.id.trim().is_empty() {
            return Err(PluginSystemError::ManifestError {
                path: manifest_path.to_path_buf(),
                message: "manifest 'id' must not be empty".to_string(),
                source: None,
            });
        }

        // Versions are kept as display strings on the descriptor, but a
        // manifest carrying an unparseable one is rejected up front.
        Version::parse(&raw.version).map_err(|e| PluginSystemError::ManifestError {
            path: manifest_path.to_path_buf(),
            message: format!("invalid plugin version '{}': {}", raw.version, e),
            source: None,
        })?;

        let mut dependencies = Vec::with_capacity(raw.dependencies.len());
        for dep in raw.dependencies {
            let version_range = match dep.version_range {
                Some(range) => {
                    Some(VersionReq::parse(&range).map_err(|e| {
                        PluginSystemError::ManifestError {
                            path: manifest_path.to_path_buf(),
                            message: format!(
                                "invalid version range '{}' for dependency '{}': {}",
                                range, dep.plugin_id, e
                            ),
                            source: None,
                        }
                    })?)
                }
                None => None,
            };
            dependencies.push(PluginDependency {
                plugin_id: dep.plugin_id,
                version_range,
                required: dep.required,
            });
        }

        Ok(PluginDescriptor {
            id: raw.id,
            name: raw.name,
            version: raw.version,
            author: raw.author.unwrap_or_else(|| "Unknown".to_string()),
            description: raw.description.unwrap_or_default(),
            license: raw.license,
            website: raw.website,
            capability: raw.capability.unwrap_or_default(),
            dependencies,
        })
    }

    /// Unpack a zip archive into the plugins directory, returning the
    /// installed package directory.
    ///
    /// Entry names are lexically normalized and checked against the
    /// destination prefix before a single byte is written; any entry that
    /// would land outside the destination aborts the whole install with
    /// [`PluginSystemError::MaliciousArchive`]. Extraction happens into a
    /// temporary directory inside the plugins root and is renamed into
    /// place only once every entry has been written, so a failed install
    /// leaves no partial plugin behind.
    pub async fn install_archive(&self, archive: &Path) -> Result<PathBuf, PluginSystemError> {
        fs::create_dir_all(&self.plugins_dir).await.map_err(|e| {
            PluginSystemError::LoadingError {
                plugin_id: archive.to_string_lossy().into_owned(),
                path: Some(self.plugins_dir.clone()),
                source: Box::new(PluginSystemErrorSource::Io(e)),
            }
        })?;

        let staging = tempfile::tempdir_in(&self.plugins_dir).map_err(|e| {
            PluginSystemError::LoadingError {
                plugin_id: archive.to_string_lossy().into_owned(),
                path: Some(self.plugins_dir.clone()),
                source: Box::new(PluginSystemErrorSource::Io(e)),
            }
        })?;

        self.extract_archive(archive, staging.path())?;

        // The unpacked tree must carry a valid manifest before it is
        // allowed into the plugins directory.
        let manifest_path = staging.path().join(PLUGIN_MANIFEST_FILE);
        let descriptor = self.load_manifest(&manifest_path).await?;

        let dest = self.plugins_dir.join(&descriptor.id);
        if fs::try_exists(&dest).await.unwrap_or(false) {
            fs::remove_dir_all(&dest).await.map_err(|e| {
                PluginSystemError::LoadingError {
                    plugin_id: descriptor.id.clone(),
                    path: Some(dest.clone()),
                    source: Box::new(PluginSystemErrorSource::Io(e)),
                }
            })?;
        }

        let staged = staging.keep();
        fs::rename(&staged, &dest).await.map_err(|e| {
            PluginSystemError::LoadingError {
                plugin_id: descriptor.id.clone(),
                path: Some(dest.clone()),
                source: Box::new(PluginSystemErrorSource::Io(e)),
            }
        })?;

        info!(
            "Installed plugin '{}' v{} from '{}'",
            descriptor.id,
            descriptor.version,
            archive.display()
        );
        Ok(dest)
    }

    fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<(), PluginSystemError> {
        let file = File::open(archive).map_err(|e| PluginSystemError::LoadingError {
            plugin_id: archive.to_string_lossy().into_owned(),
            path: Some(archive.to_path_buf()),
            source: Box::new(PluginSystemErrorSource::Io(e)),
        })?;

        let mut zip = zip::ZipArchive::new(file).map_err(|e| {
            PluginSystemError::LoadingError {
                plugin_id: archive.to_string_lossy().into_owned(),
                path: Some(archive.to_path_buf()),
                source: Box::new(PluginSystemErrorSource::Zip(e)),
            }
        })?;

        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(|e| {
                PluginSystemError::LoadingError {
                    plugin_id: archive.to_string_lossy().into_owned(),
                    path: Some(archive.to_path_buf()),
                    source: Box::new(PluginSystemErrorSource::Zip(e)),
                }
            })?;

            let entry_name = entry.name().to_string();
            let relative = normalize_entry_path(&entry_name).ok_or_else(|| {
                PluginSystemError::MaliciousArchive {
                    archive: archive.to_path_buf(),
                    entry: entry_name.clone(),
                }
            })?;

            // Belt and braces: re-check the joined path against the
            // destination prefix after normalization.
            let target = dest.join(&relative);
            if !target.starts_with(dest) {
                return Err(PluginSystemError::MaliciousArchive {
                    archive: archive.to_path_buf(),
                    entry: entry_name,
                });
            }

            let io_err = |e: std::io::Error| PluginSystemError::LoadingError {
                plugin_id: archive.to_string_lossy().into_owned(),
                path: Some(target.clone()),
                source: Box::new(PluginSystemErrorSource::Io(e)),
            };

            if entry.is_dir() {
                std::fs::create_dir_all(&target).map_err(io_err)?;
            } else {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(io_err)?;
                }
                let mut out = File::create(&target).map_err(io_err)?;
                std::io::copy(&mut entry, &mut out).map_err(io_err)?;
            }
        }

        Ok(())
    }

    /// Load a plugin from an unpacked package directory. The manifest's
    /// `entry_point` names a shared library relative to the package
    /// directory; the library must export the plugin constructor symbol.
    pub async fn load_package(
        &self,
        package_dir: &Path,
    ) -> Result<(PluginDescriptor, Arc<dyn ShioriPlugin>), PluginSystemError> {
        let manifest_path = package_dir.join(PLUGIN_MANIFEST_FILE);
        let mut raw = self.read_raw_manifest(&manifest_path).await?;
        let entry_point = raw.entry_point.take();
        let descriptor = Self::descriptor_from_raw(&manifest_path, raw)?;

        let entry_point = entry_point.ok_or_else(|| PluginSystemError::ManifestError {
            path: manifest_path.clone(),
            message: "manifest is missing 'entry_point'".to_string(),
            source: None,
        })?;

        // An entry point must resolve inside the package directory.
        let entry_rel = normalize_entry_path(&entry_point).ok_or_else(|| {
            PluginSystemError::ManifestError {
                path: manifest_path.clone(),
                message: format!("entry_point '{}' escapes the package directory", entry_point),
                source: None,
            }
        })?;
        let library_path = package_dir.join(entry_rel);

        let plugin = self.load_dynamic(&descriptor.id, &library_path)?;
        info!(
            "Loaded plugin '{}' v{} from '{}'",
            descriptor.id,
            descriptor.version,
            package_dir.display()
        );
        Ok((descriptor, plugin))
    }

    fn load_dynamic(
        &self,
        plugin_id: &str,
        library_path: &Path,
    ) -> Result<Arc<dyn ShioriPlugin>, PluginSystemError> {
        let library = unsafe { Library::new(library_path) }.map_err(|e| {
            PluginSystemError::LoadingError {
                plugin_id: plugin_id.to_string(),
                path: Some(library_path.to_path_buf()),
                source: Box::new(PluginSystemErrorSource::Other(format!(
                    "failed to open plugin library: {}",
                    e
                ))),
            }
        })?;

        let constructor: libloading::Symbol<PluginCreateFn> =
            unsafe { library.get(PLUGIN_CREATE_SYMBOL) }.map_err(|e| {
                PluginSystemError::LoadingError {
                    plugin_id: plugin_id.to_string(),
                    path: Some(library_path.to_path_buf()),
                    source: Box::new(PluginSystemErrorSource::Other(format!(
                        "plugin constructor symbol not found: {}",
                        e
                    ))),
                }
            })?;

        // A panic inside the constructor must not take the host down.
        let raw = panic::catch_unwind(panic::AssertUnwindSafe(|| unsafe { constructor() }))
            .map_err(|_| PluginSystemError::LoadingError {
                plugin_id: plugin_id.to_string(),
                path: Some(library_path.to_path_buf()),
                source: Box::new(PluginSystemErrorSource::Other(
                    "plugin constructor panicked".to_string(),
                )),
            })?;

        if raw.is_null() {
            return Err(PluginSystemError::LoadingError {
                plugin_id: plugin_id.to_string(),
                path: Some(library_path.to_path_buf()),
                source: Box::new(PluginSystemErrorSource::Other(
                    "plugin constructor returned null".to_string(),
                )),
            });
        }

        let inner = unsafe { Box::from_raw(raw) };
        Ok(Arc::new(DynamicPlugin {
            inner,
            _library: library,
        }))
    }
}

/// Lexically normalize an archive entry name. Returns `None` for absolute
/// paths and for any path whose `..` components would climb above its own
/// root.
fn normalize_entry_path(name: &str) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if normalized.as_os_str().is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_entry_path;
    use std::path::PathBuf;

    #[test]
    fn normalize_accepts_plain_relative_paths() {
        assert_eq!(
            normalize_entry_path("assets/icon.png"),
            Some(PathBuf::from("assets/icon.png"))
        );
        assert_eq!(
            normalize_entry_path("./manifest.json"),
            Some(PathBuf::from("manifest.json"))
        );
    }

    #[test]
    fn normalize_resolves_interior_parent_components() {
        assert_eq!(
            normalize_entry_path("assets/../manifest.json"),
            Some(PathBuf::from("manifest.json"))
        );
    }

    #[test]
    fn normalize_rejects_escaping_paths() {
        assert_eq!(normalize_entry_path("../evil.so"), None);
        assert_eq!(normalize_entry_path("a/../../evil.so"), None);
        assert_eq!(normalize_entry_path("/etc/passwd"), None);
        assert_eq!(normalize_entry_path(""), None);
    }
}
