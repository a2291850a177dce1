//! Cluster directory access.
//!
//! Placement needs three things from the live cluster: which servers carry
//! each tag, how server names map to server ids, and what replication
//! activity each server reports for the table. All of it can change at any
//! moment, so a request reads it once into a snapshot and uses only the
//! snapshot afterwards.

use corelib::{ActivityReport, ServerId, ServerName, ServerTag, TableId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{PlacementError, Result};
use crate::validate::TagMembership;

/// Read access to cluster membership and per-server replication status.
pub trait ClusterDirectory: Send + Sync {
    /// Names of the servers currently carrying `tag`.
    fn servers_with_tag(&self, tag: &ServerTag) -> BTreeSet<ServerName>;

    /// Every server id currently using `name`. More than one is a collision.
    fn resolve_server(&self, name: &ServerName) -> Vec<ServerId>;

    /// Whether the server is connected and publishing its directory entry.
    fn is_reachable(&self, server: ServerId) -> bool;

    /// Activity `server` reports for `table`, if any.
    fn activity_report(&self, server: ServerId, table: TableId) -> Option<ActivityReport>;
}

impl<T: ClusterDirectory + ?Sized> ClusterDirectory for &T {
    fn servers_with_tag(&self, tag: &ServerTag) -> BTreeSet<ServerName> {
        (**self).servers_with_tag(tag)
    }

    fn resolve_server(&self, name: &ServerName) -> Vec<ServerId> {
        (**self).resolve_server(name)
    }

    fn is_reachable(&self, server: ServerId) -> bool {
        (**self).is_reachable(server)
    }

    fn activity_report(&self, server: ServerId, table: TableId) -> Option<ActivityReport> {
        (**self).activity_report(server, table)
    }
}

impl<T: ClusterDirectory + ?Sized> ClusterDirectory for Arc<T> {
    fn servers_with_tag(&self, tag: &ServerTag) -> BTreeSet<ServerName> {
        (**self).servers_with_tag(tag)
    }

    fn resolve_server(&self, name: &ServerName) -> Vec<ServerId> {
        (**self).resolve_server(name)
    }

    fn is_reachable(&self, server: ServerId) -> bool {
        (**self).is_reachable(server)
    }

    fn activity_report(&self, server: ServerId, table: TableId) -> Option<ActivityReport> {
        (**self).activity_report(server, table)
    }
}

/// Captures the membership of every tag `tags` yields.
pub fn capture_tag_membership<'a, D>(
    directory: &D,
    tags: impl IntoIterator<Item = &'a ServerTag>,
) -> TagMembership
where
    D: ClusterDirectory + ?Sized,
{
    tags.into_iter()
        .map(|tag| (tag.clone(), directory.servers_with_tag(tag)))
        .collect()
}

/// Activity reports of the servers placement may use, read once.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    reports: BTreeMap<ServerName, ActivityReport>,
}

impl DirectorySnapshot {
    /// Reads the reports of every server in `servers_with_tags` for `table`.
    ///
    /// Fails with `MissingServer` if a name resolves to no reachable server,
    /// and otherwise with `AmbiguousServerName` if a name resolves to several.
    /// A reachable server without a report for the table is not an error.
    pub fn capture<D>(
        directory: &D,
        table: TableId,
        servers_with_tags: &TagMembership,
    ) -> Result<Self>
    where
        D: ClusterDirectory + ?Sized,
    {
        let mut reports = BTreeMap::new();
        let mut missing = BTreeSet::new();
        let mut colliding = BTreeSet::new();

        for name in servers_with_tags.values().flatten() {
            let ids = directory.resolve_server(name);
            let id = match ids.as_slice() {
                [] => {
                    missing.insert(name);
                    continue;
                }
                [id] => *id,
                _ => {
                    colliding.insert(name);
                    continue;
                }
            };
            if !directory.is_reachable(id) {
                missing.insert(name);
                continue;
            }
            match directory.activity_report(id, table) {
                Some(report) => {
                    reports.insert(name.clone(), report);
                }
                None => warn!(server = %name, table = %table, "no activity reported for table"),
            }
        }

        if let Some(&server) = missing.first() {
            return Err(PlacementError::MissingServer {
                server: server.clone(),
            });
        }
        if let Some(&server) = colliding.first() {
            return Err(PlacementError::AmbiguousServerName {
                server: server.clone(),
            });
        }

        debug!(table = %table, reports = reports.len(), "captured directory snapshot");
        Ok(Self { reports })
    }

    pub fn report(&self, server: &ServerName) -> Option<&ActivityReport> {
        self.reports.get(server)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

/// A server entry of a `StaticDirectory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticServer {
    pub id: ServerId,
    pub name: ServerName,
    #[serde(default)]
    pub tags: BTreeSet<ServerTag>,
    #[serde(default = "default_reachable")]
    pub reachable: bool,
    #[serde(default)]
    pub activity: BTreeMap<TableId, ActivityReport>,
}

fn default_reachable() -> bool {
    true
}

impl StaticServer {
    pub fn new(id: ServerId, name: impl Into<ServerName>) -> Self {
        Self {
            id,
            name: name.into(),
            tags: BTreeSet::new(),
            reachable: true,
            activity: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<ServerTag>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_activity(mut self, table: TableId, report: ActivityReport) -> Self {
        self.activity.insert(table, report);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }
}

/// Fixed, in-memory cluster description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticDirectory {
    pub servers: Vec<StaticServer>,
}

impl StaticDirectory {
    pub fn new(servers: Vec<StaticServer>) -> Self {
        Self { servers }
    }

    fn by_id(&self, id: ServerId) -> Option<&StaticServer> {
        self.servers.iter().find(|s| s.id == id)
    }
}

impl ClusterDirectory for StaticDirectory {
    fn servers_with_tag(&self, tag: &ServerTag) -> BTreeSet<ServerName> {
        self.servers
            .iter()
            .filter(|s| s.tags.contains(tag))
            .map(|s| s.name.clone())
            .collect()
    }

    fn resolve_server(&self, name: &ServerName) -> Vec<ServerId> {
        self.servers
            .iter()
            .filter(|s| &s.name == name)
            .map(|s| s.id)
            .collect()
    }

    fn is_reachable(&self, server: ServerId) -> bool {
        self.by_id(server).is_some_and(|s| s.reachable)
    }

    fn activity_report(&self, server: ServerId, table: TableId) -> Option<ActivityReport> {
        self.by_id(server)?.activity.get(&table).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{Activity, ActivityRecord, KeyRange};

    const TABLE: TableId = TableId(7);

    fn primary_everywhere() -> ActivityReport {
        ActivityReport::new(vec![ActivityRecord::new(KeyRange::full(), Activity::Primary)])
            .unwrap()
    }

    fn membership(directory: &StaticDirectory, tags: &[&str]) -> TagMembership {
        let tags: Vec<ServerTag> = tags.iter().map(|&t| t.into()).collect();
        capture_tag_membership(directory, &tags)
    }

    #[test]
    fn test_tag_membership() {
        let directory = StaticDirectory::new(vec![
            StaticServer::new(ServerId(1), "s1").with_tag("a"),
            StaticServer::new(ServerId(2), "s2").with_tag("a").with_tag("b"),
            StaticServer::new(ServerId(3), "s3"),
        ]);
        let tags = membership(&directory, &["a", "b", "c"]);
        assert_eq!(tags[&ServerTag::from("a")].len(), 2);
        assert_eq!(tags[&ServerTag::from("b")].len(), 1);
        assert!(tags[&ServerTag::from("c")].is_empty());
    }

    #[test]
    fn test_snapshot_reads_reports() {
        let directory = StaticDirectory::new(vec![
            StaticServer::new(ServerId(1), "s1")
                .with_tag("a")
                .with_activity(TABLE, primary_everywhere()),
            StaticServer::new(ServerId(2), "s2").with_tag("a"),
        ]);
        let snapshot =
            DirectorySnapshot::capture(&directory, TABLE, &membership(&directory, &["a"]))
                .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.report(&"s1".into()).is_some());
        assert!(snapshot.report(&"s2".into()).is_none());
    }

    #[test]
    fn test_unreachable_server_is_missing() {
        let directory = StaticDirectory::new(vec![
            StaticServer::new(ServerId(1), "s1").with_tag("a").unreachable(),
        ]);
        let err = DirectorySnapshot::capture(&directory, TABLE, &membership(&directory, &["a"]))
            .unwrap_err();
        assert_eq!(
            err,
            PlacementError::MissingServer {
                server: "s1".into(),
            }
        );
    }

    #[test]
    fn test_unresolvable_name_is_missing() {
        let directory = StaticDirectory::default();
        let mut tags = TagMembership::new();
        tags.insert("a".into(), BTreeSet::from([ServerName::from("ghost")]));
        let err = DirectorySnapshot::capture(&directory, TABLE, &tags).unwrap_err();
        assert_eq!(
            err,
            PlacementError::MissingServer {
                server: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_name_collision() {
        let directory = StaticDirectory::new(vec![
            StaticServer::new(ServerId(1), "twin").with_tag("a"),
            StaticServer::new(ServerId(2), "twin").with_tag("a"),
        ]);
        let err = DirectorySnapshot::capture(&directory, TABLE, &membership(&directory, &["a"]))
            .unwrap_err();
        assert_eq!(
            err,
            PlacementError::AmbiguousServerName {
                server: "twin".into(),
            }
        );
    }

    #[test]
    fn test_missing_reported_before_collision() {
        let directory = StaticDirectory::new(vec![
            StaticServer::new(ServerId(1), "twin").with_tag("a"),
            StaticServer::new(ServerId(2), "twin").with_tag("a"),
            StaticServer::new(ServerId(3), "zed").with_tag("a").unreachable(),
        ]);
        let err = DirectorySnapshot::capture(&directory, TABLE, &membership(&directory, &["a"]))
            .unwrap_err();
        assert_eq!(
            err,
            PlacementError::MissingServer {
                server: "zed".into(),
            }
        );
    }

    #[test]
    fn test_static_directory_from_json() {
        let json = r#"{
            "servers": [
                {"id": "1", "name": "s1", "tags": ["a"],
                 "activity": {"7": [{"region": {"start": 0}, "activity": "primary"}]}},
                {"id": "2", "name": "s2", "tags": ["a"], "reachable": false}
            ]
        }"#;
        let directory: StaticDirectory = serde_json::from_str(json).unwrap();
        assert!(directory.is_reachable(ServerId(1)));
        assert!(!directory.is_reachable(ServerId(2)));
        assert_eq!(directory.activity_report(ServerId(1), TABLE), Some(primary_everywhere()));
    }
}
