//! 通用类型定义

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::new_id;

/// 服务类型名称（例如 `WebServiceType`）
///
/// 非空，且首尾不含空白
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(try_from = "String", into = "String")]
pub struct ServiceTypeName(String);

/// 服务类型名称非法
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("invalid service type name: {name:?}")]
pub struct InvalidServiceTypeName {
    pub name: String,
}

impl ServiceTypeName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidServiceTypeName> {
        let name = name.into();
        if name.trim().is_empty() || name.trim() != name {
            return Err(InvalidServiceTypeName { name });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ServiceTypeName {
    type Error = InvalidServiceTypeName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceTypeName> for String {
    fn from(value: ServiceTypeName) -> Self {
        value.0
    }
}

/// 服务实例 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(new_id())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}
