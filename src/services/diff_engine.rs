//! Component- and line-level differences between versions.
//!
//! Versions are immutable, so a computed [`VersionDiff`] never goes stale. The
//! engine keeps recent results in an LRU cache keyed by the pair of version
//! identifiers.

use lru::LruCache;
use similar::{Algorithm, DiffTag, capture_diff_slices};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use tracing::instrument;

use crate::models::{
    ChangeType, Component, ComponentDiff, ComponentKey, LineChangeType, LineDiff, Parameter,
    ParameterDiff, TemplateId, Version, VersionDiff, VersionId,
};
use crate::storage::VersionStorage;
use crate::{Error, Result};

/// Default number of cached diffs.
pub const DEFAULT_DIFF_CACHE_CAPACITY: usize = 128;

type CacheKey = (VersionId, VersionId);

/// Computes differences between two versions of a template.
pub struct DiffEngine {
    storage: Arc<dyn VersionStorage>,
    /// `None` when caching is disabled.
    cache: Option<RwLock<LruCache<CacheKey, Arc<VersionDiff>>>>,
}

impl DiffEngine {
    /// Creates a diff engine with the default cache capacity.
    #[must_use]
    pub fn new(storage: Arc<dyn VersionStorage>) -> Self {
        Self::with_cache_capacity(storage, DEFAULT_DIFF_CACHE_CAPACITY)
    }

    /// Creates a diff engine caching up to `capacity` results (0 disables the cache).
    #[must_use]
    pub fn with_cache_capacity(storage: Arc<dyn VersionStorage>, capacity: usize) -> Self {
        Self {
            storage,
            cache: NonZeroUsize::new(capacity).map(|cap| RwLock::new(LruCache::new(cap))),
        }
    }

    /// Number of cached diffs.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|cache| cache.read().ok().map(|c| c.len()))
            .unwrap_or(0)
    }

    /// Compares two versions of a template by number.
    ///
    /// Either order is allowed; comparing a version with itself yields an
    /// empty diff.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template or either version does not exist.
    #[instrument(skip(self, template_id), fields(template_id = %template_id))]
    pub fn compare(
        &self,
        template_id: &TemplateId,
        from_version: u32,
        to_version: u32,
    ) -> Result<VersionDiff> {
        let from = self.load(template_id, from_version)?;
        if from_version == to_version {
            return Ok(VersionDiff {
                template_id: template_id.clone(),
                from_version,
                to_version,
                components: Vec::new(),
                parameters: Vec::new(),
            });
        }
        let to = self.load(template_id, to_version)?;
        self.diff_versions(&from, &to)
    }

    /// Compares two loaded versions, consulting the cache first.
    ///
    /// The diff is always computed from the lower version number to the higher
    /// one; a descending comparison is the inverse of the ascending one.
    ///
    /// # Errors
    ///
    /// Returns an error if components or parameters cannot be loaded.
    pub fn diff_versions(&self, from: &Version, to: &Version) -> Result<VersionDiff> {
        if from.version_number > to.version_number {
            return self.diff_versions(to, from).map(|diff| diff.inverted());
        }

        let key = (from.id.clone(), to.id.clone());

        if let Some(cached) = self.cache_get(&key) {
            metrics::counter!("diff_cache_hits_total").increment(1);
            return Ok((*cached).clone());
        }
        if self.cache.is_some() {
            metrics::counter!("diff_cache_misses_total").increment(1);
        }

        let from_components = self.storage.get_components(&from.id)?;
        let to_components = self.storage.get_components(&to.id)?;
        let from_parameters = self.storage.get_parameters(&from.id)?;
        let to_parameters = self.storage.get_parameters(&to.id)?;

        let diff = VersionDiff {
            template_id: to.template_id.clone(),
            from_version: from.version_number,
            to_version: to.version_number,
            components: diff_components(&from_components, &to_components),
            parameters: diff_parameters(&from_parameters, &to_parameters),
        };

        tracing::debug!(
            from = from.version_number,
            to = to.version_number,
            components = diff.components.len(),
            parameters = diff.parameters.len(),
            "Computed version diff"
        );

        self.cache_put(key, &diff);
        Ok(diff)
    }

    fn load(&self, template_id: &TemplateId, version_number: u32) -> Result<Version> {
        if let Some(version) = self.storage.get_version(template_id, version_number)? {
            return Ok(version);
        }
        if self.storage.get_template(template_id)?.is_none() {
            return Err(Error::NotFound(format!("template '{template_id}'")));
        }
        Err(Error::NotFound(format!(
            "version {version_number} of template '{template_id}'"
        )))
    }

    fn cache_get(&self, key: &CacheKey) -> Option<Arc<VersionDiff>> {
        // Lock poisoning fails open: a lost cache entry only costs a recompute.
        let cache = self.cache.as_ref()?.read().ok()?;
        cache.peek(key).cloned()
    }

    fn cache_put(&self, key: CacheKey, diff: &VersionDiff) {
        if let Some(cache) = &self.cache
            && let Ok(mut cache) = cache.write()
        {
            cache.put(key, Arc::new(diff.clone()));
        }
    }
}

/// Diffs two component sets matched by `(type, name)`.
///
/// Identical components are omitted; the result is ordered by key.
#[must_use]
pub fn diff_components(from: &[Component], to: &[Component]) -> Vec<ComponentDiff> {
    let from: BTreeMap<ComponentKey, &Component> = from.iter().map(|c| (c.key(), c)).collect();
    let to: BTreeMap<ComponentKey, &Component> = to.iter().map(|c| (c.key(), c)).collect();

    let mut keys: Vec<&ComponentKey> = from.keys().chain(to.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let old = from.get(key).map(|c| c.content.as_str());
            let new = to.get(key).map(|c| c.content.as_str());
            let (change_type, lines) = match (old, new) {
                (None, Some(new)) => (ChangeType::Created, diff_lines("", new)),
                (Some(old), None) => (ChangeType::Deleted, diff_lines(old, "")),
                (Some(old), Some(new)) if old != new => (ChangeType::Updated, diff_lines(old, new)),
                _ => return None,
            };
            Some(ComponentDiff {
                component_type: key.component_type,
                name: key.name.clone(),
                change_type,
                old_content: old.map(str::to_string),
                new_content: new.map(str::to_string),
                lines,
            })
        })
        .collect()
}

/// Diffs two parameter sets matched by key.
///
/// A parameter is updated when its value or its type changed.
#[must_use]
pub fn diff_parameters(from: &[Parameter], to: &[Parameter]) -> Vec<ParameterDiff> {
    let from: BTreeMap<&str, &Parameter> = from.iter().map(|p| (p.key.as_str(), p)).collect();
    let to: BTreeMap<&str, &Parameter> = to.iter().map(|p| (p.key.as_str(), p)).collect();

    let mut keys: Vec<&str> = from.keys().chain(to.keys()).copied().collect();
    keys.sort_unstable();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let old = from.get(key);
            let new = to.get(key);
            let change_type = match (old, new) {
                (None, Some(_)) => ChangeType::Created,
                (Some(_), None) => ChangeType::Deleted,
                (Some(old), Some(new)) if old != new => ChangeType::Updated,
                _ => return None,
            };
            Some(ParameterDiff {
                key: key.to_string(),
                change_type,
                old_value: old.map(|p| p.value.clone()),
                new_value: new.map(|p| p.value.clone()),
            })
        })
        .collect()
}

/// Computes a line diff using LCS alignment.
///
/// Each run of unmatched lines is paired positionally: the first
/// `min(removed, added)` lines become [`LineChangeType::Modified`], the rest
/// are [`LineChangeType::Removed`] or [`LineChangeType::Added`]. Line numbers
/// are 1-based.
///
/// `diff_lines(b, a)` is always the line-by-line inverse of `diff_lines(a, b)`.
#[must_use]
pub fn diff_lines(old: &str, new: &str) -> Vec<LineDiff> {
    if old <= new {
        canonical_line_diff(old, new)
    } else {
        invert_lines(canonical_line_diff(new, old))
    }
}

/// LCS may pick different alignments depending on argument order. Align in
/// both directions and keep the one that pairs more lines, preferring `a -> b`
/// on a tie.
fn canonical_line_diff(a: &str, b: &str) -> Vec<LineDiff> {
    let forward = align_lines(a, b);
    if forward.is_empty() {
        return forward;
    }
    let backward = invert_lines(align_lines(b, a));
    if backward.len() < forward.len() {
        backward
    } else {
        forward
    }
}

fn invert_lines(lines: Vec<LineDiff>) -> Vec<LineDiff> {
    lines.iter().map(LineDiff::inverted).collect()
}

fn align_lines(old: &str, new: &str) -> Vec<LineDiff> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let mut result = Vec::new();
    let mut run = Run::default();

    for op in capture_diff_slices(Algorithm::Lcs, &old_lines, &new_lines) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            run.flush(&old_lines, &new_lines, &mut result);
        } else {
            run.extend(old_range, new_range);
        }
    }
    run.flush(&old_lines, &new_lines, &mut result);

    result
}

/// A contiguous block of unmatched lines on both sides.
#[derive(Default)]
struct Run {
    old: Option<std::ops::Range<usize>>,
    new: Option<std::ops::Range<usize>>,
}

impl Run {
    fn extend(&mut self, old: std::ops::Range<usize>, new: std::ops::Range<usize>) {
        if !old.is_empty() {
            self.old = Some(self.old.take().map_or(old.clone(), |r| r.start..old.end));
        }
        if !new.is_empty() {
            self.new = Some(self.new.take().map_or(new.clone(), |r| r.start..new.end));
        }
    }

    fn flush(&mut self, old_lines: &[&str], new_lines: &[&str], out: &mut Vec<LineDiff>) {
        let old = self.old.take().unwrap_or_default();
        let new = self.new.take().unwrap_or_default();
        let paired = old.len().min(new.len());

        for offset in 0..paired {
            let (o, n) = (old.start + offset, new.start + offset);
            out.push(LineDiff {
                change_type: LineChangeType::Modified,
                line_number: Some(n + 1),
                old_line_number: Some(o + 1),
                old_text: old_lines.get(o).map(|s| (*s).to_string()),
                new_text: new_lines.get(n).map(|s| (*s).to_string()),
            });
        }
        for o in old.clone().skip(paired) {
            out.push(LineDiff {
                change_type: LineChangeType::Removed,
                line_number: None,
                old_line_number: Some(o + 1),
                old_text: old_lines.get(o).map(|s| (*s).to_string()),
                new_text: None,
            });
        }
        for n in new.skip(paired) {
            out.push(LineDiff {
                change_type: LineChangeType::Added,
                line_number: Some(n + 1),
                old_line_number: None,
                old_text: None,
                new_text: new_lines.get(n).map(|s| (*s).to_string()),
            });
        }
    }
}
