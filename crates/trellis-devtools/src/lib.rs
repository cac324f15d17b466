use std::fmt::Write as _;

use trellis_core::{Scope, ScopeSnapshot, SnapshotEntry};

/// Aggregate counts over a scope tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub scopes: usize,
    pub effects: usize,
    pub cleanups: usize,
    pub stopped: usize,
}

pub fn stats(snapshot: &ScopeSnapshot) -> Stats {
    let mut out = Stats::default();
    accumulate(&mut out, snapshot);
    out
}

fn accumulate(out: &mut Stats, snap: &ScopeSnapshot) {
    out.scopes += 1;
    out.cleanups += snap.cleanup_count;
    if !snap.active {
        out.stopped += 1;
    }
    for entry in &snap.entries {
        match entry {
            SnapshotEntry::Effect { active, .. } => {
                out.effects += 1;
                if !active {
                    out.stopped += 1;
                }
            }
            SnapshotEntry::Scope(child) => accumulate(out, child),
        }
    }
}

/// Renders an indented tree, one scope or effect per line.
pub fn format_tree(snapshot: &ScopeSnapshot) -> String {
    let mut out = String::new();
    push_scope(&mut out, snapshot, 0);
    out
}

fn push_scope(out: &mut String, snap: &ScopeSnapshot, depth: usize) {
    let pad = "  ".repeat(depth);
    let state = if snap.active { "active" } else { "stopped" };
    let detached = if snap.detached { " detached" } else { "" };
    let _ = writeln!(
        out,
        "{pad}scope #{} [{state}{detached}] ({} cleanups)",
        snap.id, snap.cleanup_count
    );
    for entry in &snap.entries {
        match entry {
            SnapshotEntry::Effect { id, active } => {
                let state = if *active { "active" } else { "stopped" };
                let _ = writeln!(out, "{pad}  effect #{id} [{state}]");
            }
            SnapshotEntry::Scope(child) => push_scope(out, child, depth + 1),
        }
    }
}

/// Logs scope trees on demand, like a HUD for effect ownership.
pub struct Inspector {
    pub enabled: bool,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self { enabled: false }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Dumps `scope`'s tree at debug level when enabled.
    pub fn dump(&self, scope: &Scope) {
        if !self.enabled {
            return;
        }
        let snap = scope.snapshot();
        let stats = stats(&snap);
        log::debug!(
            "scopes: {}  |  effects: {}  |  cleanups: {}  |  stopped: {}",
            stats.scopes,
            stats.effects,
            stats.cleanups,
            stats.stopped
        );
        for line in format_tree(&snap).lines() {
            log::debug!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use trellis_core::{Effect, Scope};

    use super::*;

    #[test]
    fn stats_count_the_whole_tree() {
        let (scope, _) = Scope::with(|s| {
            Effect::new(|| ());
            s.register_cleanup(|| ()).unwrap();
            Scope::with(|_| {
                Effect::new(|| ());
            });
        });

        let stats = stats(&scope.snapshot());
        assert_eq!(
            stats,
            Stats {
                scopes: 2,
                effects: 2,
                cleanups: 1,
                stopped: 0,
            }
        );
        scope.stop().unwrap();
    }

    #[test]
    fn tree_dump_nests_by_depth() {
        let (scope, inner) = Scope::with(|_| {
            Effect::new(|| ());
            Scope::with(|_| ()).0
        });

        let dump = format_tree(&scope.snapshot());
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(&format!("scope #{} [active]", scope.id())));
        assert!(lines[1].starts_with("  effect #"));
        assert!(lines[2].starts_with(&format!("  scope #{} [active]", inner.id())));

        scope.stop().unwrap();
        let dump = format_tree(&scope.snapshot());
        assert!(dump.starts_with(&format!("scope #{} [stopped]", scope.id())));
    }

    #[test]
    fn disabled_inspector_is_silent() {
        // dump() on a disabled inspector must not touch the snapshot API.
        let inspector = Inspector::new();
        let scope = Scope::new();
        inspector.dump(&scope);
        scope.stop().unwrap();
    }
}
