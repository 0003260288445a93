//! 账本条目的来源信息：按条目类型区分的带标签联合体，序列化后存入 metadata 列

use crate::entities::SettledVia;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryMetadata {
    Gateway {
        order_id: String,
        provider_order_id: Option<String>,
        provider_payment_id: String,
        payment_method: Option<String>,
        confirmed_via: SettledVia,
    },
    WalletRequest {
        request_id: i64,
        approver_id: i64,
    },
    Commission {
        domain_txn_id: String,
    },
    Reversal {
        domain_txn_id: String,
        original_entry_id: i64,
    },
    Cashback {
        campaign: Option<String>,
    },
    Penalty {
        reason: String,
        penalty_type: String,
        applied_by: i64,
    },
    Recharge {
        recharge_id: String,
        operator: String,
        mobile: String,
    },
    /// 无固定结构的来源信息
    Opaque {
        data: Value,
    },
}

impl EntryMetadata {
    pub fn to_json(&self) -> Value {
        // 枚举内全部字段均可序列化，失败只可能来自 serde 本身
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_is_tagged_by_kind() {
        let meta = EntryMetadata::WalletRequest {
            request_id: 7,
            approver_id: 2,
        };
        let v = meta.to_json();
        assert_eq!(v["kind"], "wallet_request");
        assert_eq!(v["request_id"], 7);
        assert_eq!(EntryMetadata::from_json(&v), Some(meta));
    }

    #[test]
    fn test_unknown_kind_is_not_parsed() {
        assert_eq!(EntryMetadata::from_json(&json!({"kind": "bonus"})), None);
    }
}
