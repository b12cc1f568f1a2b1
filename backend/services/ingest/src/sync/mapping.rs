//! Projections from partner payloads onto local rows.

use serde_json::Value;
use uuid::Uuid;

use tempora_db::crm::models::{CustomerFields, NewOrganization};
use tempora_db::external::models::{ClientFields, ClientSnapshot, ExternalOrganization};

use crate::partner::models::ClientPayload;

const SYNCED_ORGANIZATION_SUFFIX: &str = "(Synced)";
const SYNCED_WORK_LOCATION: &str = "External API";

/// The shadow row for `payload`: the verbatim record plus its normalized fields.
pub fn client_snapshot(payload: &ClientPayload, raw: Value) -> ClientSnapshot {
    ClientSnapshot {
        external_id: payload.id,
        external_data: raw,
        fields: ClientFields {
            company_name: payload.ragsoc.clone(),
            accounting_code: payload.cod_contabile.clone(),
            vat_number: payload.piva.clone(),
            address: payload.indirizzo.clone(),
            postal_code: payload.cap.clone(),
            city: payload.comune.clone(),
            province: payload.provincia.clone(),
            phone: payload.tel.clone(),
            institutional_email: payload.email_istituzionale.clone(),
            administrative_email: payload.email_amministrativa.clone(),
            is_client: payload.flg_cliente,
            is_supplier: payload.flg_fornitore,
            is_prospect: payload.flg_prospect,
        },
    }
}

/// The customer derived from `payload`, owned by `organization_id`.
pub fn customer_fields(payload: &ClientPayload, organization_id: Uuid) -> CustomerFields {
    let name = non_blank(&payload.ragsoc)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Client {}", payload.id));

    CustomerFields {
        organization_id,
        name,
        description: Some(format!("Synced from external API - ID: {}", payload.id)),
        contact_email: non_blank(&payload.email_istituzionale)
            .or_else(|| non_blank(&payload.email_amministrativa))
            .map(str::to_string),
        contact_phone: non_blank(&payload.tel).map(str::to_string),
        address: build_full_address(payload),
        work_location: non_blank(&payload.comune).map(str::to_string),
        is_active: payload.flg_cliente,
    }
}

/// `street, postal code, city, (province)` with empty parts skipped.
pub fn build_full_address(payload: &ClientPayload) -> Option<String> {
    let province = non_blank(&payload.provincia).map(|p| format!("({p})"));
    let parts: Vec<&str> = [
        non_blank(&payload.indirizzo),
        non_blank(&payload.cap),
        non_blank(&payload.comune),
        province.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// The local organization created the first time `external` is synced.
pub fn local_organization(external: &ExternalOrganization) -> NewOrganization {
    NewOrganization {
        name: format!("{} {SYNCED_ORGANIZATION_SUFFIX}", external.external_name),
        address: Some(format!(
            "External Organization - Code: {}",
            external.external_code
        )),
        work_location: Some(SYNCED_WORK_LOCATION.to_string()),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
