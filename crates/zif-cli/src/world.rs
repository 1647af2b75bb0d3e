//! Builds virtual stores from a declarative "world" file: `repo`/
//! `package`/`requires`/`provides`/`conflicts`/`obsoletes` lines, the
//! same grammar zif-manifest's fixtures use.
//!
//! zif-rpm exposes only the trait boundary to a real RPM backend (no
//! crate in this workspace parses RPM headers or repository metadata),
//! so until one is linked in, the CLI's package universe comes from this
//! text format rather than a live rpmdb or repository fetch.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use zif_core::{Arch, Depend, Origin, Package};
use zif_store::{MetaStore, Store};

const LOCAL_STORE_ID: &str = "installed";

/// The local store plus every declared remote store, parsed from a world
/// file.
pub struct World {
    pub local: Arc<dyn Store>,
    pub remotes: Vec<Arc<dyn Store>>,
}

/// `requires`/`provides`/`conflicts`/`obsoletes` lines accumulate here and
/// flush into a single `set_*` call each, since those setters are
/// write-once-per-value and can't be called incrementally per line.
#[derive(Default)]
struct ResourceBuffers {
    requires: Vec<Depend>,
    provides: Vec<Depend>,
    conflicts: Vec<Depend>,
    obsoletes: Vec<Depend>,
}

/// Parse `path` into a [`World`].
pub fn load(path: &Path) -> Result<World> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading world file {}", path.display()))?;

    let mut packages_by_store: HashMap<String, Vec<Package>> = HashMap::new();
    let mut current: Option<Package> = None;
    let mut buffers = ResourceBuffers::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if raw_line.trim().is_empty() || raw_line.trim_start().starts_with('#') {
            continue;
        }
        if raw_line.starts_with(char::is_whitespace) {
            buffer_resource(&mut buffers, raw_line.trim(), line_no)?;
            continue;
        }
        let mut words = raw_line.split_whitespace();
        match words.next() {
            Some("repo") => {
                let id = words.next().with_context(|| format!("line {line_no}: repo needs an id"))?;
                packages_by_store.entry(id.to_string()).or_default();
            }
            Some("package") => {
                flush_resources(&current, &mut buffers)?;
                let rest: Vec<&str> = words.collect();
                let [store, name, epoch, version, release, arch] = rest[..] else {
                    bail!("line {line_no}: package needs <store> <name> <epoch> <version> <release> <arch>");
                };
                let epoch: u32 = epoch.parse().with_context(|| format!("line {line_no}: bad epoch '{epoch}'"))?;
                let origin = if store == LOCAL_STORE_ID { Origin::Installed } else { Origin::Repo(store.to_string()) };
                let package = Package::new(name, epoch, version, release, Arch::new(arch), origin);
                packages_by_store.entry(store.to_string()).or_default().push(package.clone());
                current = Some(package);
            }
            Some("install" | "remove" | "update" | "downgrade" | "run" | "expect-state" | "expect-absent" | "config") => {
                // Transaction directives belong to the CLI subcommand, not the world file; ignore them here.
            }
            Some(other) => bail!("line {line_no}: unknown world-file directive '{other}'"),
            None => {}
        }
    }
    flush_resources(&current, &mut buffers)?;

    let local_packages = packages_by_store.remove(LOCAL_STORE_ID).unwrap_or_default();
    let local: Arc<dyn Store> = Arc::new(MetaStore::new(LOCAL_STORE_ID, local_packages));
    let remotes = packages_by_store
        .into_iter()
        .map(|(id, packages)| Arc::new(MetaStore::new(id, packages)) as Arc<dyn Store>)
        .collect();

    Ok(World { local, remotes })
}

fn buffer_resource(buffers: &mut ResourceBuffers, body: &str, line_no: usize) -> Result<()> {
    let mut words = body.splitn(2, char::is_whitespace);
    let kind = words.next().unwrap_or_default();
    let description = words.next().unwrap_or_default().trim();
    if description.is_empty() {
        bail!("line {line_no}: '{kind}' needs a depend description");
    }
    let depend = Depend::parse(description).with_context(|| format!("line {line_no}: invalid depend '{description}'"))?;
    match kind {
        "requires" => buffers.requires.push(depend),
        "provides" => buffers.provides.push(depend),
        "conflicts" => buffers.conflicts.push(depend),
        "obsoletes" => buffers.obsoletes.push(depend),
        other => bail!("line {line_no}: unknown resource kind '{other}'"),
    }
    Ok(())
}

fn flush_resources(current: &Option<Package>, buffers: &mut ResourceBuffers) -> Result<()> {
    let Some(package) = current else {
        return Ok(());
    };
    if !buffers.requires.is_empty() {
        package.set_requires(std::mem::take(&mut buffers.requires))?;
    }
    if !buffers.provides.is_empty() {
        package.set_provides(std::mem::take(&mut buffers.provides))?;
    }
    if !buffers.conflicts.is_empty() {
        package.set_conflicts(std::mem::take(&mut buffers.conflicts))?;
    }
    if !buffers.obsoletes.is_empty() {
        package.set_obsoletes(std::mem::take(&mut buffers.obsoletes))?;
    }
    Ok(())
}

/// Every name declared by a `package installed <name> ...` line, in the
/// order they appear. Used by `system-upgrade`, which has no single named
/// target.
pub fn installed_package_names(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading world file {}", path.display()))?;
    let mut names = Vec::new();
    for line in text.lines() {
        let mut words = line.split_whitespace();
        if words.next() == Some("package") && words.next() == Some(LOCAL_STORE_ID) {
            if let Some(name) = words.next() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}
