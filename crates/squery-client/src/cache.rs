//! Explicit cache of per-connection server state.
//!
//! Nothing here performs I/O on first access: callers fetch with
//! [`HostCache::refresh`] (or the individual `fetch_*` methods) and drop stale
//! state with [`HostCache::invalidate`].

use squery_protocol::{Command, FieldValue, Record};
use tracing::debug;

use crate::client::QueryClient;
use crate::error::QueryResult;
use crate::permissions::PermissionCatalog;
use crate::transport::Transport;

/// Cached `whoami` record, server version and permission catalog.
#[derive(Debug, Clone, Default)]
pub struct HostCache {
    whoami: Option<Record>,
    version: Option<Record>,
    catalog: Option<PermissionCatalog>,
}

impl HostCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached `whoami` record.
    pub fn whoami(&self) -> Option<&Record> {
        self.whoami.as_ref()
    }

    /// One field of the cached `whoami` record.
    pub fn whoami_get(&self, ident: &str) -> Option<&FieldValue> {
        self.whoami.as_ref()?.get(ident)
    }

    /// Override one field of the cached `whoami` record, e.g. after a
    /// nickname change.
    pub fn whoami_set(&mut self, ident: &str, value: FieldValue) {
        if let Some(whoami) = self.whoami.as_mut() {
            whoami.insert(ident, value);
        }
    }

    /// The cached `version` record.
    pub fn version(&self) -> Option<&Record> {
        self.version.as_ref()
    }

    /// The cached permission catalog.
    pub fn catalog(&self) -> Option<&PermissionCatalog> {
        self.catalog.as_ref()
    }

    /// Id of the selected virtual server, if known.
    pub fn selected_server_id(&self) -> Option<i64> {
        self.whoami_get("virtualserver_id").and_then(FieldValue::as_int)
    }

    /// Forget the `whoami` record. The catalog and version are instance-wide
    /// and survive server switches.
    pub fn invalidate_whoami(&mut self) {
        self.whoami = None;
    }

    /// Forget everything.
    pub fn invalidate(&mut self) {
        self.whoami = None;
        self.version = None;
        self.catalog = None;
    }

    /// Fetch and cache `whoami`.
    pub fn fetch_whoami<T: Transport>(&mut self, client: &mut QueryClient<T>) -> QueryResult<&Record> {
        let record = first_record(client.request("whoami", true)?.records());
        Ok(self.whoami.insert(record))
    }

    /// Fetch and cache `version`.
    pub fn fetch_version<T: Transport>(&mut self, client: &mut QueryClient<T>) -> QueryResult<&Record> {
        let record = first_record(client.request("version", true)?.records());
        Ok(self.version.insert(record))
    }

    /// Fetch and cache the permission catalog.
    pub fn fetch_catalog<T: Transport>(
        &mut self,
        client: &mut QueryClient<T>,
    ) -> QueryResult<&PermissionCatalog> {
        let reply = client.request("permissionlist -new", true)?;
        let catalog = PermissionCatalog::from_reply(&reply)?;
        debug!("HostCache: loaded {} permissions", catalog.len());
        Ok(self.catalog.insert(catalog))
    }

    /// Re-fetch everything.
    pub fn refresh<T: Transport>(&mut self, client: &mut QueryClient<T>) -> QueryResult<()> {
        self.fetch_whoami(client)?;
        self.fetch_version(client)?;
        self.fetch_catalog(client)?;
        Ok(())
    }

    /// Select a virtual server with `use`, applying the configured nickname.
    ///
    /// A no-op when the cached `whoami` already shows `sid` as selected.
    pub fn select_server<T: Transport>(
        &mut self,
        client: &mut QueryClient<T>,
        sid: u64,
        virtual_start: bool,
    ) -> QueryResult<()> {
        if self.selected_server_id() == Some(sid as i64) {
            return Ok(());
        }

        let nickname = match sid {
            0 => None,
            _ => client.config().nickname.clone(),
        };
        let command = Command::new("use")
            .arg("sid", sid as i64)
            .arg("client_nickname", nickname)
            .flag(virtual_start.then_some("-virtual"));
        client.execute_command(&command)?;

        self.invalidate_whoami();
        Ok(())
    }
}

fn first_record(records: Vec<Record>) -> Record {
    records.into_iter().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::transport::ScriptedTransport;

    fn client(lines: &[&str]) -> QueryClient<ScriptedTransport> {
        let mut config = ClientConfig::default();
        config.nickname = Some("bot".to_string());
        QueryClient::new(ScriptedTransport::new().with_lines(lines.iter().copied()), config)
    }

    #[test]
    fn test_refresh_and_invalidate() {
        let mut client = client(&[
            "virtualserver_status=online virtualserver_id=1 client_nickname=serveradmin",
            "error id=0 msg=ok",
            "version=3.13.7 build=1655727713 platform=Linux",
            "error id=0 msg=ok",
            "permname=b_serverinstance_help_view|group_id_end=1",
            "error id=0 msg=ok",
        ]);
        let mut cache = HostCache::new();
        assert!(cache.whoami().is_none());

        cache.refresh(&mut client).unwrap();
        assert_eq!(cache.selected_server_id(), Some(1));
        assert_eq!(cache.version().unwrap().text("platform").unwrap(), "Linux");
        assert_eq!(cache.catalog().unwrap().len(), 1);
        assert_eq!(
            client.transport.sent(),
            ["whoami", "version", "permissionlist -new"]
        );

        cache.whoami_set("client_nickname", FieldValue::Text("bot".to_string()));
        assert_eq!(
            cache.whoami_get("client_nickname"),
            Some(&FieldValue::Text("bot".to_string()))
        );

        cache.invalidate_whoami();
        assert!(cache.whoami().is_none());
        assert!(cache.catalog().is_some());
        cache.invalidate();
        assert!(cache.catalog().is_none());
    }

    #[test]
    fn test_select_server_applies_nickname() {
        let mut client = client(&[
            "error id=0 msg=ok",
            "virtualserver_id=2",
            "error id=0 msg=ok",
        ]);
        let mut cache = HostCache::new();
        cache.select_server(&mut client, 2, true).unwrap();
        assert!(cache.whoami().is_none());

        cache.fetch_whoami(&mut client).unwrap();
        cache.select_server(&mut client, 2, false).unwrap();
        assert_eq!(
            client.transport.sent(),
            ["use sid=2 client_nickname=bot -virtual", "whoami"]
        );
    }
}
