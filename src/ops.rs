//! Top-level buildah operations, one method per subcommand.

use std::collections::BTreeMap;
use std::ffi::CString;
use std::io;
use std::path::PathBuf;

use serde_json::Value;

use crate::client::Buildah;
use crate::container::Container;
use crate::error::{BuildahError, Result};
use crate::image::Image;
use crate::inspect::{self, EntityKind};
use crate::options::Options;

impl Buildah {
    /// Open a view of an existing container.
    pub fn container(&self, name_or_id: &str) -> Result<Container> {
        Container::open(self.clone(), name_or_id)
    }

    /// Open a view of an existing image.
    pub fn image(&self, name_or_id: &str) -> Result<Image> {
        Image::open(self.clone(), name_or_id)
    }

    /// Create a working container from a base image (`buildah from`).
    ///
    /// The container id is communicated through a scoped `--cidfile`
    /// because stdout carries the generated container *name*.
    pub fn from_image(&self, base: &str, name: Option<&str>, options: &Options) -> Result<Container> {
        let id = self.from_image_id(base, name, options)?;
        Container::open(self.clone(), &id)
    }

    pub(crate) fn from_image_id(
        &self,
        base: &str,
        name: Option<&str>,
        options: &Options,
    ) -> Result<String> {
        let cidfile = tempfile::NamedTempFile::new()?;
        let options = options
            .clone()
            .arg("cidfile", cidfile.path().display())
            .maybe("name", name);
        self.invoke_captured("from", &options, &[base])?;
        let id = std::fs::read_to_string(cidfile.path())?;
        Ok(id.trim().to_string())
    }

    /// Remove a working container.
    pub fn rm(&self, name_or_id: &str, options: &Options) -> Result<String> {
        self.invoke_captured("rm", options, &[name_or_id])
            .map(|out| out.trim().to_string())
    }

    /// Remove an image.
    pub fn rmi(&self, name_or_id: &str, options: &Options) -> Result<String> {
        self.invoke_captured("rmi", options, &[name_or_id])
            .map(|out| out.trim().to_string())
    }

    /// List local images as [`Image`] views.
    pub fn images(&self, options: &Options) -> Result<Vec<Image>> {
        self.invoke_list("images", options, &[], |item| {
            Image::open(self.clone(), &element_id("images", item)?)
        })
    }

    /// List working containers as [`Container`] views.
    pub fn containers(&self, options: &Options) -> Result<Vec<Container>> {
        self.invoke_list("containers", options, &[], |item| {
            Container::open(self.clone(), &element_id("containers", item)?)
        })
    }

    /// Inspect a container or image and return the raw report.
    ///
    /// The embedded `Config` field is JSON-decoded a second time (see
    /// [`crate::inspect`]). A non-zero exit is reported as
    /// [`BuildahError::NotFound`]; spawn and decode failures propagate
    /// as-is.
    pub fn inspect(&self, name_or_id: &str, kind: Option<EntityKind>) -> Result<Value> {
        let options = Options::new().maybe("type", kind);
        match self.invoke_captured("inspect", &options, &[name_or_id]) {
            Ok(stdout) => inspect::decode_report(&stdout),
            Err(err @ BuildahError::CommandFailed { .. }) => Err(BuildahError::NotFound {
                name_or_id: name_or_id.to_string(),
                source: Box::new(err),
            }),
            Err(err) => Err(err),
        }
    }

    /// Commit a working container to a named image.
    pub fn commit(&self, name_or_id: &str, image_name: &str, options: &Options) -> Result<Image> {
        let stdout = self.invoke_captured("commit", options, &[name_or_id, image_name])?;
        Image::open(self.clone(), stdout.trim())
    }

    /// Pull an image from a registry.
    pub fn pull(&self, name: &str, options: &Options) -> Result<Image> {
        let options = options.clone().flag("quiet");
        let stdout = self.invoke_captured("pull", &options, &[name])?;
        Image::open(self.clone(), stdout.trim())
    }

    /// Push an image to a destination transport/reference.
    pub fn push(&self, name_or_id: &str, destination: &str, options: &Options) -> Result<()> {
        let options = options.clone().flag("quiet");
        self.invoke("push", &options, &[name_or_id, destination])
    }

    /// Add one or more aliases to an image.
    pub fn tag(&self, name_or_id: &str, aliases: &[&str]) -> Result<()> {
        let mut args = vec![name_or_id];
        args.extend_from_slice(aliases);
        self.invoke("tag", &Options::new(), &args)
    }

    /// Copy files into a container (no URL/tar handling), returning the
    /// content digest buildah prints.
    pub fn copy(&self, name_or_id: &str, args: &[&str], options: &Options) -> Result<String> {
        self.invoke_with_target("copy", name_or_id, args, options)
    }

    /// Add files into a container (URLs and archives get expanded),
    /// returning the content digest.
    pub fn add(&self, name_or_id: &str, args: &[&str], options: &Options) -> Result<String> {
        self.invoke_with_target("add", name_or_id, args, options)
    }

    fn invoke_with_target(
        &self,
        subcommand: &str,
        name_or_id: &str,
        args: &[&str],
        options: &Options,
    ) -> Result<String> {
        let mut full = vec![name_or_id];
        full.extend_from_slice(args);
        self.invoke_captured(subcommand, options, &full)
            .map(|out| out.trim().to_string())
    }

    /// Run an argv inside a container; stdout flows to the terminal.
    pub fn run(&self, name_or_id: &str, command: &[&str], options: &Options) -> Result<()> {
        self.run_inner(name_or_id, command, options, false)
            .map(|_| ())
    }

    /// Run an argv inside a container and capture its stdout.
    pub fn run_captured(
        &self,
        name_or_id: &str,
        command: &[&str],
        options: &Options,
    ) -> Result<String> {
        self.run_inner(name_or_id, command, options, true)
    }

    /// Run a shell snippet inside a container via `sh -c`.
    pub fn run_shell(&self, name_or_id: &str, script: &str, options: &Options) -> Result<()> {
        self.run(name_or_id, &["sh", "-c", script], options)
    }

    /// [`Self::run_shell`] with captured stdout.
    pub fn run_shell_captured(
        &self,
        name_or_id: &str,
        script: &str,
        options: &Options,
    ) -> Result<String> {
        self.run_captured(name_or_id, &["sh", "-c", script], options)
    }

    fn run_inner(
        &self,
        name_or_id: &str,
        command: &[&str],
        options: &Options,
        capture: bool,
    ) -> Result<String> {
        let mut args = vec![name_or_id];
        args.extend_from_slice(command);
        if capture {
            self.invoke_captured("run", options, &args)
        } else {
            self.invoke("run", options, &args).map(|_| String::new())
        }
    }

    /// Update container metadata (`buildah config`). Values must already be
    /// encoded per [`crate::config`]; the typed setters on
    /// [`Container`] do that for you.
    pub fn config(&self, name_or_id: &str, options: &Options) -> Result<()> {
        self.invoke("config", options, &[name_or_id])
    }

    /// buildah's own view of the host environment (`buildah info`).
    ///
    /// `info` emits JSON without being asked, so no `--json` flag here.
    pub fn info(&self) -> Result<Value> {
        self.invoke_json("info", &Options::new(), &[], false)
    }

    /// Mount the root filesystems of the named containers.
    ///
    /// With exactly one name the tool prints a bare path; with zero or
    /// several it prints `id path` lines (zero names lists all current
    /// mounts).
    pub fn mount(
        &self,
        names_or_ids: &[&str],
        options: &Options,
    ) -> Result<BTreeMap<String, PathBuf>> {
        let stdout = self.invoke_captured("mount", options, names_or_ids)?;
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(BTreeMap::new());
        }
        if let [single] = names_or_ids {
            return Ok(BTreeMap::from([(single.to_string(), PathBuf::from(stdout))]));
        }
        let mut mounts = BTreeMap::new();
        for line in stdout.lines() {
            let Some((id, path)) = line.split_once(' ') else {
                return Err(BuildahError::UnexpectedOutput {
                    subcommand: "mount".to_string(),
                    detail: format!("malformed mount line '{line}'"),
                });
            };
            mounts.insert(id.to_string(), PathBuf::from(path));
        }
        Ok(mounts)
    }

    /// Unmount the named containers (or pass `--all` via `options`).
    pub fn umount(&self, names_or_ids: &[&str], options: &Options) -> Result<Vec<String>> {
        let stdout = self.invoke_captured("umount", options, names_or_ids)?;
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(Vec::new());
        }
        Ok(stdout.lines().map(str::to_string).collect())
    }

    /// Re-exec the current process under `buildah unshare` so that an
    /// unprivileged caller gets a usable user namespace.
    ///
    /// Returns immediately when `BUILDAH_ISOLATION` is already set (the
    /// escape hatch buildah exports inside the namespace); otherwise this
    /// only returns on exec failure.
    pub fn unshare(&self) -> Result<()> {
        if std::env::var_os("BUILDAH_ISOLATION").is_some() {
            return Ok(());
        }
        let cmdline = std::fs::read_to_string("/proc/self/cmdline")?;

        let mut argv: Vec<String> = vec![self.program().to_string()];
        argv.extend(self.global_options().to_args());
        argv.push("unshare".to_string());
        argv.extend(cmdline.split('\0').filter(|a| !a.is_empty()).map(str::to_string));

        let c_argv: Vec<CString> = argv
            .into_iter()
            .map(|arg| {
                CString::new(arg)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err).into())
            })
            .collect::<Result<_>>()?;
        match nix::unistd::execvp(&c_argv[0], &c_argv) {
            Err(errno) => Err(BuildahError::Io(io::Error::from(errno))),
            Ok(infallible) => match infallible {},
        }
    }
}

fn element_id(subcommand: &str, item: &Value) -> Result<String> {
    match item.get("id").and_then(Value::as_str) {
        Some(id) => Ok(id.to_string()),
        None => Err(BuildahError::UnexpectedOutput {
            subcommand: subcommand.to_string(),
            detail: format!("list element without an id: {item}"),
        }),
    }
}
