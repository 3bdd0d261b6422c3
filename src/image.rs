//! Read-only view of a local image.

use serde_json::Value;

use crate::client::Buildah;
use crate::error::Result;
use crate::inspect::{self, EntityKind, FieldCache};
use crate::options::Options;

/// A local image, identified by name or id.
///
/// Construction inspects the image once and keeps the raw report; derived
/// fields are read lazily out of it and cached until [`Image::refresh`].
/// Removing the image externally does not invalidate this view; the next
/// refresh fails instead.
#[derive(Debug)]
pub struct Image {
    client: Buildah,
    name_or_id: String,
    info: Value,
    cache: FieldCache,
}

impl Image {
    pub(crate) fn open(client: Buildah, name_or_id: &str) -> Result<Image> {
        let info = client.inspect(name_or_id, Some(EntityKind::Image))?;
        Ok(Image {
            client,
            name_or_id: name_or_id.to_string(),
            info,
            cache: FieldCache::default(),
        })
    }

    /// Re-inspect and replace the cached report, dropping all derived
    /// field values.
    pub fn refresh(&mut self) -> Result<()> {
        self.info = self.client.inspect(&self.name_or_id, Some(EntityKind::Image))?;
        self.cache.clear();
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

    pub fn id(&self) -> String {
        inspect::string(&self.field("id", "/FromImageID"))
    }

    pub fn name(&self) -> String {
        inspect::string(&self.field("name", "/FromImage"))
    }

    pub fn digest(&self) -> String {
        inspect::string(&self.field("digest", "/FromImageDigest"))
    }

    /// Remove the image, consuming this view.
    pub fn rm(self) -> Result<String> {
        self.client.rmi(&self.id(), &Options::new())
    }

    /// Push this image to a destination transport/reference.
    pub fn push(&self, destination: &str, options: &Options) -> Result<()> {
        self.client.push(&self.id(), destination, options)
    }

    /// Pull this image's reference again, returning a fresh view.
    pub fn pull(&self) -> Result<Image> {
        self.client.pull(&self.id(), &Options::new())
    }

    /// Add aliases to this image.
    pub fn tag(&self, aliases: &[&str]) -> Result<()> {
        self.client.tag(&self.id(), aliases)
    }
}
