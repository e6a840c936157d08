//! Artifact download
//!
//! Only wheel artifacts whose filename contains the package root token are
//! fetched. Each one is streamed in fixed-size chunks into the dist folder
//! under a rewritten name: the second hyphen-delimited field gets `-4`
//! appended, so `pkg-1.0.0-py3-none-any.whl` becomes
//! `pkg-1.0.0-4-py3-none-any.whl`.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::service::{ArtifactDescriptor, ArtifactQueryResponse, BuildService};
use crate::config::WHEEL_MIME_TYPE;
use crate::utils::{paths, terminal};

/// Bytes read per chunk while streaming
pub const CHUNK_SIZE: usize = 1024;

/// Appended to the second filename field
pub const BUILD_TAG_SUFFIX: &str = "-4";

/// Rewrite a wheel filename, or `None` if it has no second field
pub fn rewrite_file_name(name: &str) -> Option<String> {
    let mut parts: Vec<String> = name.split('-').map(str::to_string).collect();
    let field = parts.get_mut(1)?;
    field.push_str(BUILD_TAG_SUFFIX);
    Some(parts.join("-"))
}

/// Whether an artifact is a wheel of the wanted package
pub fn is_wanted(artifact: &ArtifactDescriptor, root_token: &str) -> bool {
    artifact.mime_type == WHEEL_MIME_TYPE && artifact.file_name().contains(root_token)
}

/// Copy `reader` into `writer` chunk by chunk, skipping empty reads
pub fn copy_chunks<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
) -> io::Result<u64> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}

/// Streams matching artifacts into a local folder
pub struct Downloader<'a, S: BuildService> {
    service: &'a S,
    dist_dir: PathBuf,
    root_token: String,
}

impl<'a, S: BuildService> Downloader<'a, S> {
    pub fn new(service: &'a S, dist_dir: impl Into<PathBuf>, root_token: impl Into<String>) -> Self {
        Self {
            service,
            dist_dir: dist_dir.into(),
            root_token: root_token.into(),
        }
    }

    /// Download every wanted artifact; returns each written path once
    ///
    /// Pure-Python wheels come back under the same name from every platform
    /// build. Only the first copy is fetched.
    pub fn download_all(&self, response: &ArtifactQueryResponse) -> Result<Vec<PathBuf>> {
        terminal::print_step("Downloading wheels...");
        paths::ensure_dir(&self.dist_dir)?;

        let mut seen = HashSet::new();
        let mut written = Vec::new();
        for build in response.builds() {
            for artifact in build.artifacts.iter().flatten() {
                if !is_wanted(artifact, &self.root_token) {
                    continue;
                }

                let Some(target_name) = rewrite_file_name(artifact.file_name()) else {
                    terminal::print_warning(&format!(
                        "Skipping {}: cannot derive an output name",
                        artifact.file_name()
                    ));
                    continue;
                };

                let target = self.dist_dir.join(target_name);
                if !seen.insert(target.clone()) {
                    terminal::print_info(&format!(
                        "{} [{}] already downloaded as {}",
                        artifact.name,
                        build.platform_id.as_deref().unwrap_or("unknown platform"),
                        target.display()
                    ));
                    continue;
                }

                let bytes = self.download_one(artifact, &target)?;
                terminal::print_info(&format!(
                    "{} [{}] -> {} ({} bytes)",
                    artifact.name,
                    build.platform_id.as_deref().unwrap_or("unknown platform"),
                    target.display(),
                    bytes
                ));
                written.push(target);
            }
        }

        Ok(written)
    }

    fn download_one(&self, artifact: &ArtifactDescriptor, target: &Path) -> Result<u64> {
        let mut reader = self.service.fetch(&artifact.uri)?;
        let file = File::create(target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        let mut writer = BufWriter::new(file);

        match copy_chunks(reader.as_mut(), &mut writer) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                drop(writer);
                let _ = std::fs::remove_file(target);
                Err(e).with_context(|| format!("Failed to download {}", artifact.uri))
            }
        }
    }
}
