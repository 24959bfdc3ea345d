use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize, Serializer};

/// 设备视图模型
///
/// 构造后不可修改。`timestamp` 表示设备最近一次被看到的时间（last seen），
/// 读取时保留构造时的时区偏移；相等性按时间点比较。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceViewModel {
    id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: DateTime<FixedOffset>,
}

/// RFC 3339，零偏移写成 `+00:00` 而不是 `Z`
fn serialize_timestamp<S>(timestamp: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

impl DeviceViewModel {
    /// `id` 不做校验，空字符串也会被接受
    pub fn new(id: impl Into<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            id: id.into(),
            timestamp,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }
}
