//! Folder-tree search helpers.
//!
//! The walkers only descend into `Folder` children; everything else found in a
//! folder is a leaf. Results keep the server's child ordering, depth-first.

use crate::error::{PccVmError, Result};
use crate::vsphere::types::{ManagedObjectReference, ObjectKind};
use crate::vsphere::Vim;
use tracing::debug;

/// Find a datacenter by inventory path (`dc` or `folder/dc`) below the root folder.
///
/// Without a path the first datacenter found is returned.
pub fn find_datacenter<V: Vim + ?Sized>(
    vim: &V,
    path: Option<&str>,
) -> Result<Option<ManagedObjectReference>> {
    let root = vim.root_folder();

    let path = match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => path,
        None => {
            return Ok(find_all_in_folders(vim, &root, ObjectKind::Datacenter)?
                .into_iter()
                .next())
        }
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut current = root;
    for (index, segment) in segments.iter().enumerate() {
        let last = index + 1 == segments.len();
        let wanted = if last {
            ObjectKind::Datacenter
        } else {
            ObjectKind::Folder
        };

        let mut next = None;
        for child in vim.child_entities(&current)? {
            if child.is(wanted) && vim.name(&child)? == *segment {
                next = Some(child);
                break;
            }
        }

        match next {
            Some(child) => current = child,
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}

/// Like [`find_datacenter`], but a missing datacenter is an error.
pub fn require_datacenter<V: Vim + ?Sized>(
    vim: &V,
    path: Option<&str>,
) -> Result<ManagedObjectReference> {
    find_datacenter(vim, path)?.ok_or_else(|| {
        PccVmError::DatacenterNotFound(path.unwrap_or("(any)").to_string())
    })
}

/// All folders below `folder`, depth-first, excluding `folder` itself.
pub fn get_folders<V: Vim + ?Sized>(
    vim: &V,
    folder: &ManagedObjectReference,
) -> Result<Vec<ManagedObjectReference>> {
    let mut folders = Vec::new();
    for child in vim.child_entities(folder)? {
        if child.is(ObjectKind::Folder) {
            let nested = get_folders(vim, &child)?;
            folders.push(child);
            folders.extend(nested);
        }
    }
    Ok(folders)
}

/// First folder below `base` whose name is `name`.
pub fn find_folder<V: Vim + ?Sized>(
    vim: &V,
    base: &ManagedObjectReference,
    name: &str,
) -> Result<Option<ManagedObjectReference>> {
    for folder in get_folders(vim, base)? {
        if vim.name(&folder)? == name {
            return Ok(Some(folder));
        }
    }
    Ok(None)
}

/// Every object of `kind` anywhere below `folder`.
pub fn find_all_in_folders<V: Vim + ?Sized>(
    vim: &V,
    folder: &ManagedObjectReference,
    kind: ObjectKind,
) -> Result<Vec<ManagedObjectReference>> {
    let mut found = Vec::new();
    for child in vim.child_entities(folder)? {
        if child.is(kind) {
            found.push(child.clone());
        }
        if child.is(ObjectKind::Folder) {
            found.extend(find_all_in_folders(vim, &child, kind)?);
        }
    }
    debug!(%folder, ?kind, count = found.len(), "walked folder");
    Ok(found)
}

/// Object of `kind` named `name`, searching direct children before subfolders.
pub fn find_in_folders<V: Vim + ?Sized>(
    vim: &V,
    folder: &ManagedObjectReference,
    kind: ObjectKind,
    name: &str,
) -> Result<Option<ManagedObjectReference>> {
    let children = vim.child_entities(folder)?;

    for child in children.iter().filter(|c| c.is(kind)) {
        if vim.name(child)? == name {
            return Ok(Some(child.clone()));
        }
    }

    for child in children.iter().filter(|c| c.is(ObjectKind::Folder)) {
        if let Some(found) = find_in_folders(vim, child, kind, name)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

/// Locate a VM (or template) by name under the datacenter's VM folder.
pub fn require_vm<V: Vim + ?Sized>(
    vim: &V,
    datacenter: &ManagedObjectReference,
    name: &str,
) -> Result<ManagedObjectReference> {
    let vm_folder = vim.vm_folder(datacenter)?;
    find_in_folders(vim, &vm_folder, ObjectKind::VirtualMachine, name)?
        .ok_or_else(|| PccVmError::VmNotFound(name.to_string()))
}
