//! Permission ids, categories and the server's permission catalog.
//!
//! Permission ids below `0x1000` are assigned by position in the server's
//! `permissionlist -new` output and belong to the category whose end marker
//! first reaches them. Larger ids carry their category in the high byte.

use std::fmt;

use squery_protocol::constants::ERROR_CODE_INVALID_PERMISSION;
use squery_protocol::{ProtocolError, Record, Reply};

/// Ids below this bound are positional.
pub const POSITIONAL_ID_LIMIT: i64 = 0x1000;

/// Prefix of the grant permission paired with every regular permission.
pub const GRANT_PREFIX: &str = "i_needed_modify_power_";

macro_rules! permission_categories {
    ($($variant:ident = $id:literal => $name:literal,)*) => {
        /// A permission category.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PermissionCategory {
            $(
                #[doc = $name]
                $variant,
            )*
        }

        impl PermissionCategory {
            /// Every category in declaration order.
            pub const ALL: &'static [PermissionCategory] = &[$(PermissionCategory::$variant,)*];

            /// The numeric category id.
            pub const fn id(self) -> i64 {
                match self {
                    $(PermissionCategory::$variant => $id,)*
                }
            }

            /// Human-readable name, e.g. `Channel / Modify`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(PermissionCategory::$variant => $name,)*
                }
            }

            /// Look up a category by id.
            pub fn from_id(id: i64) -> Option<Self> {
                match id {
                    $($id => Some(PermissionCategory::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

permission_categories! {
    Global = 0x10 => "Global",
    GlobalInformation = 0x11 => "Global / Information",
    GlobalServerMgmt = 0x12 => "Global / Virtual Server Management",
    GlobalAdmActions = 0x13 => "Global / Administration",
    GlobalSettings = 0x14 => "Global / Settings",
    Server = 0x20 => "Virtual Server",
    ServerInformation = 0x21 => "Virtual Server / Information",
    ServerAdmActions = 0x22 => "Virtual Server / Administration",
    ServerSettings = 0x23 => "Virtual Server / Settings",
    Channel = 0x30 => "Channel",
    ChannelInformation = 0x31 => "Channel / Information",
    ChannelCreate = 0x32 => "Channel / Create",
    ChannelModify = 0x33 => "Channel / Modify",
    ChannelDelete = 0x34 => "Channel / Delete",
    ChannelAccess = 0x35 => "Channel / Access",
    Group = 0x40 => "Group",
    GroupInformation = 0x41 => "Group / Information",
    GroupCreate = 0x42 => "Group / Create",
    GroupModify = 0x43 => "Group / Modify",
    GroupDelete = 0x44 => "Group / Delete",
    Client = 0x50 => "Client",
    ClientInformation = 0x51 => "Client / Information",
    ClientAdmActions = 0x52 => "Client / Admin",
    ClientBasics = 0x53 => "Client / Basics",
    ClientModify = 0x54 => "Client / Modify",
    FileTransfer = 0x60 => "File Transfer",
    NeededModifyPower = 0xFF => "Grant",
}

impl PermissionCategory {
    /// The enclosing top-level category, `None` for top-level categories
    /// and the grant category.
    pub fn parent(self) -> Option<Self> {
        let id = self.id();
        if self == PermissionCategory::NeededModifyPower || id & 0x0F == 0 {
            return None;
        }
        PermissionCategory::from_id(id & 0xF0)
    }

    /// Categories that positional permission ids are assigned to, i.e.
    /// every category except the grant category.
    pub fn positional() -> impl Iterator<Item = PermissionCategory> {
        Self::ALL
            .iter()
            .copied()
            .filter(|c| *c != PermissionCategory::NeededModifyPower)
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Id of the grant permission paired with `permid`.
pub fn permission_grant_id(permid: i64) -> i64 {
    if permid < POSITIONAL_ID_LIMIT {
        permid + 0x8000
    } else {
        (permid & 0xFF) + 0xFF00
    }
}

/// One permission of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    /// Permission id.
    pub id: i64,
    /// Symbolic name, e.g. `b_virtualserver_stop`.
    pub name: String,
    /// Description, if the server sent one.
    pub description: Option<String>,
    /// Id of the paired grant permission.
    pub grant_id: i64,
}

/// The server's permission catalog, built from `permissionlist -new`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    permissions: Vec<Permission>,
    ends: Vec<i64>,
}

impl PermissionCatalog {
    /// Build the catalog from a `permissionlist -new` reply.
    ///
    /// Rows carrying `group_id_end` mark the last positional id of each
    /// category; every other row is a permission, numbered from 1.
    pub fn from_reply(reply: &Reply) -> Result<Self, ProtocolError> {
        Self::from_records(&reply.records())
    }

    /// Build the catalog from already parsed rows.
    pub fn from_records(records: &[Record]) -> Result<Self, ProtocolError> {
        let mut catalog = PermissionCatalog::default();
        let mut next_id = 1;

        for record in records {
            if record.contains("group_id_end") {
                catalog.ends.push(record.int("group_id_end")?);
                continue;
            }
            let id = next_id;
            next_id += 1;
            catalog.permissions.push(Permission {
                id,
                name: record.text("permname")?,
                description: record.text_opt("permdesc"),
                grant_id: permission_grant_id(id),
            });
        }

        Ok(catalog)
    }

    /// Id of the permission named `name`.
    pub fn id_by_name(&self, name: &str) -> Result<i64, ProtocolError> {
        self.get(name).map(|p| p.id).ok_or_else(invalid_permission)
    }

    /// Name of the permission with id `permid`.
    pub fn name_by_id(&self, permid: i64) -> Result<&str, ProtocolError> {
        self.permissions
            .iter()
            .find(|p| p.id == permid)
            .map(|p| p.name.as_str())
            .ok_or_else(invalid_permission)
    }

    /// Category id of `permid`; `0` when a positional id lies past every
    /// category end.
    pub fn category_of(&self, permid: i64) -> i64 {
        if permid >= POSITIONAL_ID_LIMIT {
            return permid >> 8;
        }
        self.ends
            .iter()
            .zip(PermissionCategory::positional())
            .find(|(end, _)| **end >= permid)
            .map(|(_, cat)| cat.id())
            .unwrap_or(0)
    }

    /// Category of `permid`, if it is a known one.
    pub fn category(&self, permid: i64) -> Option<PermissionCategory> {
        PermissionCategory::from_id(self.category_of(permid))
    }

    /// Look up a permission by name.
    pub fn get(&self, name: &str) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.name == name)
    }

    /// Name of the grant permission paired with `name`; grant permissions
    /// have none.
    pub fn grant_name(name: &str) -> Option<String> {
        if name.starts_with(GRANT_PREFIX) {
            return None;
        }
        name.get(2..).map(|rest| format!("{}{}", GRANT_PREFIX, rest))
    }

    /// Permissions in server order.
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Category end markers in server order.
    pub fn ends(&self) -> &[i64] {
        &self.ends
    }

    /// Number of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

fn invalid_permission() -> ProtocolError {
    ProtocolError::Server {
        message: "invalid permission ID".to_string(),
        raw_message: "invalid permission ID".to_string(),
        code: ERROR_CODE_INVALID_PERMISSION,
        return_code: None,
        command: String::new(),
    }
}
