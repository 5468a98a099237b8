//! Deterministic task and argument fingerprints.
//!
//! Both fingerprints are the first 8 hex characters of a SHA-256 digest over
//! a canonical length-prefixed byte encoding. The encoding is part of the
//! on-disk compatibility contract: any change to it invalidates every cached
//! state entry, which is the intended failure mode.

use crate::value::ArgValue;
use sha2::{Digest, Sha256};
use tasktree_recipe::Task;

const FINGERPRINT_LEN: usize = 8;

fn put_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn put_count(hasher: &mut Sha256, count: usize) {
    hasher.update((count as u64).to_le_bytes());
}

fn finish(hasher: Sha256) -> String {
    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

/// Fingerprint of a task's execution identity: command, outputs, working
/// directory and parameter `(name, type)` pairs, in declared order.
///
/// Inputs and dependencies are deliberately not part of the identity; input
/// changes are an mtime question and dependency changes surface through the
/// dependency's own fingerprint.
pub fn task_fingerprint(task: &Task) -> String {
    let mut hasher = Sha256::new();

    put_bytes(&mut hasher, task.command.as_bytes());

    put_count(&mut hasher, task.outputs.len());
    for output in &task.outputs {
        put_bytes(&mut hasher, output.as_bytes());
    }

    put_bytes(&mut hasher, task.working_dir.to_string_lossy().as_bytes());

    put_count(&mut hasher, task.parameters.len());
    for param in &task.parameters {
        put_bytes(&mut hasher, param.name.as_bytes());
        put_bytes(&mut hasher, param.ty.tag().as_bytes());
    }

    finish(hasher)
}

/// Fingerprint of coerced argument values, in declared parameter order.
pub fn args_fingerprint(values: &[ArgValue]) -> String {
    let mut hasher = Sha256::new();

    put_count(&mut hasher, values.len());
    for value in values {
        put_bytes(&mut hasher, value.ty.tag().as_bytes());
        put_bytes(&mut hasher, value.canonical.as_bytes());
    }

    finish(hasher)
}

/// The state-file key: `task_hash` alone, or `task_hash__args_hash` for
/// parameterised tasks.
pub fn cache_key(task_hash: &str, args_hash: Option<&str>) -> String {
    match args_hash {
        Some(args_hash) => format!("{task_hash}__{args_hash}"),
        None => task_hash.to_string(),
    }
}
