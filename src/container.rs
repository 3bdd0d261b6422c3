//! Read/write view of a working container.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tracing::error;

use crate::client::Buildah;
use crate::collections::{ConfigMap, ConfigSet};
use crate::config;
use crate::error::{BuildahError, Result};
use crate::image::Image;
use crate::inspect::{self, EntityKind, FieldCache};
use crate::options::Options;

/// A working container, identified by name or id.
///
/// Construction inspects the container once; derived fields are read
/// lazily from the raw report and cached until [`Container::refresh`].
/// Writable fields issue a `buildah config` call scoped to this
/// container's id and update the local cache only when that call
/// succeeds. Removing the container externally does not invalidate the
/// view; the next refresh fails.
#[derive(Debug)]
pub struct Container {
    client: Buildah,
    name_or_id: String,
    info: Value,
    cache: FieldCache,
    env: Option<ConfigMap>,
    labels: Option<ConfigMap>,
    volumes: Option<ConfigSet>,
}

impl Container {
    pub(crate) fn open(client: Buildah, name_or_id: &str) -> Result<Container> {
        let info = client.inspect(name_or_id, Some(EntityKind::Container))?;
        Ok(Container {
            client,
            name_or_id: name_or_id.to_string(),
            info,
            cache: FieldCache::default(),
            env: None,
            labels: None,
            volumes: None,
        })
    }

    /// Re-inspect and replace the cached report, dropping every derived
    /// field and collection view.
    pub fn refresh(&mut self) -> Result<()> {
        self.info = self
            .client
            .inspect(&self.name_or_id, Some(EntityKind::Container))?;
        self.cache.clear();
        self.env = None;
        self.labels = None;
        self.volumes = None;
        Ok(())
    }

    /// The raw inspect report.
    pub fn info(&self) -> &Value {
        &self.info
    }

    fn field(&self, name: &'static str, pointer: &'static str) -> Value {
        self.cache
            .get_or_compute(name, || inspect::at(&self.info, pointer).clone())
    }

    // ------------------------------------------------------------------
    // Read-only fields
    // ------------------------------------------------------------------

    pub fn id(&self) -> String {
        inspect::string(&self.field("id", "/ContainerID"))
    }

    pub fn name(&self) -> String {
        inspect::string(&self.field("name", "/Container"))
    }

    pub fn image_id(&self) -> String {
        inspect::string(&self.field("imageid", "/FromImageID"))
    }

    pub fn image_digest(&self) -> String {
        inspect::string(&self.field("imagedigest", "/FromImageDigest"))
    }

    // ------------------------------------------------------------------
    // Writable scalar fields
    // ------------------------------------------------------------------

    pub fn annotations(&self) -> BTreeMap<String, String> {
        inspect::string_map(&self.field("annotation", "/ImageAnnotations"))
    }

    /// Replace the annotations wholesale with one `config` call.
    pub fn set_annotations(&self, annotations: &BTreeMap<String, String>) -> Result<()> {
        self.set_mapping_field("annotation", annotations)?;
        self.cache.put("annotation", json!(annotations));
        Ok(())
    }

    pub fn entrypoint(&self) -> Vec<String> {
        inspect::string_vec(&self.field("entrypoint", "/OCIv1/config/Entrypoint"))
    }

    /// Entrypoint is sent as a JSON array so the array round-trips
    /// unambiguously.
    pub fn set_entrypoint(&self, entrypoint: &[String]) -> Result<()> {
        let encoded = config::entrypoint_value(entrypoint)?;
        self.configure(Options::new().arg("entrypoint", encoded))?;
        self.cache.put("entrypoint", json!(entrypoint));
        Ok(())
    }

    pub fn cmd(&self) -> Vec<String> {
        inspect::string_vec(&self.field("cmd", "/OCIv1/config/Cmd"))
    }

    /// Cmd is sent as a shell-joined string that buildah splits again.
    pub fn set_cmd(&self, cmd: &[String]) -> Result<()> {
        let encoded = config::cmd_value(cmd)?;
        self.configure(Options::new().arg("cmd", encoded))?;
        self.cache.put("cmd", json!(cmd));
        Ok(())
    }

    /// Exposed ports, e.g. `["80/tcp"]`.
    pub fn ports(&self) -> Vec<String> {
        let ports = self.cache.get_or_compute("port", || {
            let keys: Vec<String> = inspect::key_set(inspect::at(
                &self.info,
                "/OCIv1/config/ExposedPorts",
            ))
            .into_iter()
            .collect();
            json!(keys)
        });
        inspect::string_vec(&ports)
    }

    pub fn set_ports(&self, ports: &[String]) -> Result<()> {
        self.configure(Options::new().list("port", ports))?;
        self.cache.put("port", json!(ports));
        Ok(())
    }

    pub fn workingdir(&self) -> String {
        inspect::string(&self.field("workingdir", "/Config/config/WorkingDir"))
    }

    pub fn set_workingdir(&self, workingdir: &str) -> Result<()> {
        self.set_string_field("workingdir", workingdir)
    }

    pub fn user(&self) -> String {
        inspect::string(&self.field("user", "/Config/config/User"))
    }

    pub fn set_user(&self, user: &str) -> Result<()> {
        self.set_string_field("user", user)
    }

    pub fn arch(&self) -> String {
        inspect::string(&self.field("arch", "/Config/architecture"))
    }

    pub fn set_arch(&self, arch: &str) -> Result<()> {
        self.set_string_field("arch", arch)
    }

    pub fn os(&self) -> String {
        inspect::string(&self.field("os", "/Config/os"))
    }

    pub fn set_os(&self, os: &str) -> Result<()> {
        self.set_string_field("os", os)
    }

    pub fn author(&self) -> Option<String> {
        inspect::opt_string(&self.field("author", "/OCIv1/author"))
    }

    pub fn set_author(&self, author: &str) -> Result<()> {
        self.set_string_field("author", author)
    }

    /// Build-stage triggers recorded by `ONBUILD` instructions.
    pub fn onbuild(&self) -> Vec<String> {
        inspect::string_vec(&self.field("onbuild", "/Config/OnBuild"))
    }

    pub fn set_onbuild(&self, triggers: &[String]) -> Result<()> {
        self.configure(Options::new().list("onbuild", triggers))?;
        self.cache.put("onbuild", json!(triggers));
        Ok(())
    }

    pub fn stop_signal(&self) -> Option<String> {
        inspect::opt_string(&self.field("stop_signal", "/OCIv1/config/StopSignal"))
    }

    pub fn set_stop_signal(&self, signal: &str) -> Result<()> {
        self.set_string_field("stop_signal", signal)
    }

    fn set_string_field(&self, name: &'static str, value: &str) -> Result<()> {
        self.configure(Options::new().arg(name, value))?;
        self.cache.put(name, json!(value));
        Ok(())
    }

    fn configure(&self, options: Options) -> Result<()> {
        self.client.config(&self.id(), &options)
    }

    // ------------------------------------------------------------------
    // Write-through collection fields
    // ------------------------------------------------------------------

    /// Environment variables as a write-through mapping.
    pub fn env(&mut self) -> &mut ConfigMap {
        let client = self.client.clone();
        let id = self.id();
        self.env.get_or_insert_with(|| {
            let entries = inspect::env_map(inspect::at(&self.info, "/OCIv1/config/Env"));
            ConfigMap::new(client, id, "env", entries)
        })
    }

    /// Replace the environment wholesale with one `config` call.
    ///
    /// Remote variables absent from `env` are left in place, matching the
    /// CLI's additive semantics.
    pub fn set_env(&mut self, env: &BTreeMap<String, String>) -> Result<()> {
        self.set_mapping_field("env", env)?;
        self.env = Some(ConfigMap::new(
            self.client.clone(),
            self.id(),
            "env",
            env.clone(),
        ));
        Ok(())
    }

    /// Labels as a write-through mapping.
    pub fn labels(&mut self) -> &mut ConfigMap {
        let client = self.client.clone();
        let id = self.id();
        self.labels.get_or_insert_with(|| {
            let entries =
                inspect::string_map(inspect::at(&self.info, "/OCIv1/config/Labels"));
            ConfigMap::new(client, id, "label", entries)
        })
    }

    /// Replace the labels wholesale with one `config` call.
    pub fn set_labels(&mut self, labels: &BTreeMap<String, String>) -> Result<()> {
        self.set_mapping_field("label", labels)?;
        self.labels = Some(ConfigMap::new(
            self.client.clone(),
            self.id(),
            "label",
            labels.clone(),
        ));
        Ok(())
    }

    fn set_mapping_field(
        &self,
        option: &'static str,
        entries: &BTreeMap<String, String>,
    ) -> Result<()> {
        let tokens = config::mapping_values(
            entries.iter().map(|(k, v)| (k.as_str(), Some(v.as_str()))),
        );
        self.configure(Options::new().list(option, tokens))
    }

    /// Declared volumes as a write-through set.
    pub fn volumes(&mut self) -> &mut ConfigSet {
        let client = self.client.clone();
        let id = self.id();
        self.volumes.get_or_insert_with(|| {
            let items = inspect::key_set(inspect::at(&self.info, "/OCIv1/config/Volumes"));
            ConfigSet::new(client, id, "volume", items)
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Remove the working container, consuming this view.
    pub fn rm(self) -> Result<String> {
        self.client.rm(&self.id(), &Options::new())
    }

    /// Remove the image this container was created from.
    pub fn rmi(&self, options: &Options) -> Result<String> {
        self.client.rmi(&self.image_id(), options)
    }

    /// `buildah add` with this container as target; returns the content
    /// digest.
    pub fn add(&self, args: &[&str], options: &Options) -> Result<String> {
        self.client.add(&self.id(), args, options)
    }

    /// Add literal bytes at `destination` via a temp file scoped to the
    /// call; the file is removed on every exit path.
    pub fn add_bytes(
        &self,
        contents: &[u8],
        destination: &str,
        mode: Option<u32>,
        options: &Options,
    ) -> Result<String> {
        let file = tempfile::NamedTempFile::new()?;
        if let Some(mode) = mode {
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(mode))?;
        }
        let mut handle = file.as_file();
        handle.write_all(contents)?;
        let path = file.path().display().to_string();
        self.add(&[&path, destination], options)
    }

    /// `buildah copy` with this container as target.
    pub fn copy(&self, args: &[&str], options: &Options) -> Result<String> {
        self.client.copy(&self.id(), args, options)
    }

    /// Run an argv inside this container.
    pub fn run(&self, command: &[&str], options: &Options) -> Result<()> {
        self.client.run(&self.id(), command, options)
    }

    /// Run an argv inside this container and capture its stdout.
    pub fn run_captured(&self, command: &[&str], options: &Options) -> Result<String> {
        self.client.run_captured(&self.id(), command, options)
    }

    /// Run a shell snippet inside this container via `sh -c`.
    pub fn run_shell(&self, script: &str, options: &Options) -> Result<()> {
        self.client.run_shell(&self.id(), script, options)
    }

    /// [`Self::run_shell`] with captured stdout.
    pub fn run_shell_captured(&self, script: &str, options: &Options) -> Result<String> {
        self.client.run_shell_captured(&self.id(), script, options)
    }

    /// Commit this container to a named image.
    pub fn commit(&self, image_name: &str, options: &Options) -> Result<Image> {
        self.client.commit(&self.id(), image_name, options)
    }

    /// Mount this container's root filesystem.
    ///
    /// Exactly one path is expected back since exactly one id is
    /// requested; anything else is an error. The returned guard unmounts
    /// on drop.
    pub fn mount(&self, options: &Options) -> Result<MountGuard> {
        let id = self.id();
        let mounts = self.client.mount(&[&id], options)?;
        if mounts.len() > 1 {
            return Err(BuildahError::UnexpectedOutput {
                subcommand: "mount".to_string(),
                detail: format!("expected one mount path for '{id}', found {}", mounts.len()),
            });
        }
        let Some(path) = mounts.into_values().next() else {
            return Err(BuildahError::UnexpectedOutput {
                subcommand: "mount".to_string(),
                detail: format!("no mount path reported for '{id}'"),
            });
        };
        Ok(MountGuard {
            client: self.client.clone(),
            name_or_id: id,
            path,
            released: false,
        })
    }
}

/// Scoped mount of a container's root filesystem.
///
/// Unmounts exactly once: either through [`MountGuard::unmount`], which
/// propagates failure, or on drop, where failure is logged.
#[derive(Debug)]
pub struct MountGuard {
    client: Buildah,
    name_or_id: String,
    path: PathBuf,
    released: bool,
}

impl MountGuard {
    /// Where the container's root filesystem is mounted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unmount now and surface any failure.
    pub fn unmount(mut self) -> Result<()> {
        self.released = true;
        self.client.umount(&[&self.name_or_id], &Options::new())?;
        Ok(())
    }
}

impl std::ops::Deref for MountGuard {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.path
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.client.umount(&[&self.name_or_id], &Options::new()) {
            error!(container = %self.name_or_id, %err, "failed to unmount container");
        }
    }
}
