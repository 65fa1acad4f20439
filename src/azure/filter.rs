//! Name and glob filters shared by accounts, containers and file shares.

use tracing::{info, warn};

/// Anything selectable by name.
pub trait Named {
    fn name(&self) -> &str;
}

/// A name list and glob pattern for one kind of resource.
#[derive(Debug, Clone, Copy)]
pub struct NameFilter<'a> {
    /// Resource kind used in messages, e.g. "storage account".
    pub kind: &'a str,
    pub names: &'a [String],
    pub pattern: Option<&'a str>,
}

impl<'a> NameFilter<'a> {
    pub fn new(kind: &'a str, names: &'a [String], pattern: Option<&'a str>) -> Self {
        Self {
            kind,
            names,
            pattern,
        }
    }

    /// Keep the items this filter selects.
    ///
    /// Explicit names win over the pattern. Both compare case-insensitively.
    /// Names that match nothing are reported in `warnings`. A filter that
    /// selects nothing keeps every item.
    pub fn apply<T: Named>(
        &self,
        items: Vec<T>,
        scope: &str,
        warnings: &mut Vec<String>,
    ) -> Vec<T> {
        if !self.names.is_empty() {
            for name in self.names {
                if !items.iter().any(|i| i.name().eq_ignore_ascii_case(name)) {
                    warn!("{} '{}' not found {}", self.kind, name, scope);
                    warnings.push(format!("{} '{}' not found {}", self.kind, name, scope));
                }
            }

            let keep: Vec<bool> = items
                .iter()
                .map(|i| self.names.iter().any(|n| i.name().eq_ignore_ascii_case(n)))
                .collect();
            return retain_or_keep_all(items, keep, || {
                warn!(
                    "None of the requested {}s exist {}; processing all",
                    self.kind, scope
                )
            });
        }

        let Some(pattern) = self.pattern else {
            return items;
        };

        match glob::Pattern::new(&pattern.to_lowercase()) {
            Ok(glob) => {
                let keep: Vec<bool> = items
                    .iter()
                    .map(|i| glob.matches(&i.name().to_lowercase()))
                    .collect();
                retain_or_keep_all(items, keep, || {
                    warn!(
                        "No {}s matched pattern '{}' {}; processing all",
                        self.kind, pattern, scope
                    )
                })
            }
            Err(e) => {
                warn!("Ignoring invalid {} pattern '{}': {}", self.kind, pattern, e);
                items
            }
        }
    }
}

fn retain_or_keep_all<T>(items: Vec<T>, keep: Vec<bool>, on_empty: impl FnOnce()) -> Vec<T> {
    if !keep.iter().any(|k| *k) {
        on_empty();
        return items;
    }

    let before = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| k.then_some(item))
        .collect();
    info!("Filter kept {} of {}", kept.len(), before);
    kept
}

/// Truncate to `max` items when a limit is set.
pub fn limit<T>(mut items: Vec<T>, max: Option<usize>) -> Vec<T> {
    if let Some(max) = max {
        items.truncate(max);
    }
    items
}
