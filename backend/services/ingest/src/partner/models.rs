use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tempora_config::OrganizationEntry;

/// One client record as returned by
/// `/clientifornitori/getallclienti/{org}/cli/0`.
///
/// Field names follow the partner's wire format. Text fields accept numbers
/// too since the partner is not consistent about postal codes and phones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientPayload {
    #[serde(deserialize_with = "external_id")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ragsoc: Option<String>,
    #[serde(rename = "coD_CONTABILE", default, deserialize_with = "lenient_text")]
    pub cod_contabile: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub piva: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub indirizzo: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cap: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub comune: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub provincia: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tel: Option<String>,
    #[serde(rename = "emaiL_ISTITUZIONALE", default, deserialize_with = "lenient_text")]
    pub email_istituzionale: Option<String>,
    #[serde(rename = "emaiL_AMMINISTRATIVA", default, deserialize_with = "lenient_text")]
    pub email_amministrativa: Option<String>,
    #[serde(rename = "flG_CLIENTE", default, deserialize_with = "lenient_flag")]
    pub flg_cliente: bool,
    #[serde(rename = "flG_FORNITORE", default, deserialize_with = "lenient_flag")]
    pub flg_fornitore: bool,
    #[serde(rename = "flG_PROSPECT", default, deserialize_with = "lenient_flag")]
    pub flg_prospect: bool,
}

impl ClientPayload {
    pub fn from_raw(raw: &Value) -> serde_json::Result<Self> {
        Self::deserialize(raw)
    }

    /// Company name, the client's display name.
    pub fn display_name(&self) -> Option<&str> {
        self.ragsoc.as_deref()
    }

    pub fn has_vat_number(&self) -> bool {
        is_present(&self.piva)
    }

    pub fn has_email(&self) -> bool {
        is_present(&self.email_istituzionale) || is_present(&self.email_amministrativa)
    }

    pub fn has_phone(&self) -> bool {
        is_present(&self.tel)
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn external_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("client id {n} is not an integer"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("client id '{s}' is not an integer"))),
        other => Err(D::Error::custom(format!("unexpected client id: {other}"))),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
        _ => false,
    })
}

/// Body of the client-list endpoint. The partner normally wraps the list as
/// `{success, data}`; a bare array is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PartnerEnvelope {
    Wrapped {
        success: bool,
        #[serde(default)]
        data: Option<Vec<Value>>,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// One page of partner clients, as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ClientPage {
    pub organization: OrganizationEntry,
    pub clients: Vec<Value>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    pub total_clients: usize,
    pub with_vat_number: usize,
    pub with_email: usize,
    pub with_phone: usize,
    pub clients: usize,
    pub suppliers: usize,
    pub prospects: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationStats {
    pub organization: OrganizationEntry,
    pub statistics: ClientStats,
}
